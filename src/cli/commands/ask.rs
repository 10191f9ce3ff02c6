//! Ask command implementation.

use crate::cli::preflight::{self, Operation};
use crate::cli::Output;
use crate::config::Settings;
use crate::rag::RagSystem;
use anyhow::Result;

/// Run the ask command.
///
/// Sessions live in memory, so `--session` only groups questions asked within
/// this process; the id is echoed back for scripts that pass it along.
pub async fn run_ask(question: &str, session: Option<String>, settings: Settings) -> Result<()> {
    if let Err(e) = preflight::check(Operation::Ask, &settings) {
        Output::error(&format!("{}", e));
        return Err(e.into());
    }

    let rag = RagSystem::new(settings)?;
    let session_id = match session {
        Some(id) => id,
        None => rag.create_session()?,
    };

    let spinner = Output::spinner("Searching course materials...");

    match rag.query(question, Some(&session_id)).await {
        Ok(answer) => {
            spinner.finish_and_clear();

            println!("\n{}\n", answer.answer);

            if !answer.source_metadata.is_empty() {
                Output::header("Sources");
                for source in &answer.source_metadata {
                    Output::source(&source.display_name, source.link.as_deref());
                }
                println!();
            }
            Output::kv("Session", &session_id);
        }
        Err(e) => {
            spinner.finish_and_clear();
            Output::error(&format!("Failed to answer: {}", e));
            return Err(e.into());
        }
    }

    Ok(())
}
