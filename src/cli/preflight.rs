//! Pre-flight checks before expensive operations.
//!
//! Validates that required API keys are available before starting
//! operations that would otherwise fail midway.

use crate::config::Settings;
use crate::error::{Result, SyllabusError};

const EMBEDDING_KEY_ENV: &str = "OPENAI_API_KEY";

/// Requirements for different operations.
#[derive(Debug, Clone, Copy)]
pub enum Operation {
    /// Answering questions needs the model and embedding keys.
    Ask,
    /// Serving answers questions too.
    Serve,
    /// Indexing only needs embeddings.
    Ingest,
    /// Listing courses reads the local database.
    Courses,
}

/// Run pre-flight checks for the given operation.
///
/// Returns Ok(()) if all checks pass, or an error describing what's missing.
pub fn check(operation: Operation, settings: &Settings) -> Result<()> {
    match operation {
        Operation::Ask | Operation::Serve => {
            check_env(&settings.model.api_key_env)?;
            check_env(EMBEDDING_KEY_ENV)?;
        }
        Operation::Ingest => {
            check_env(EMBEDDING_KEY_ENV)?;
        }
        Operation::Courses => {}
    }
    Ok(())
}

/// Check that an API key environment variable is set and non-empty.
fn check_env(name: &str) -> Result<()> {
    match std::env::var(name) {
        Ok(key) if !key.trim().is_empty() => Ok(()),
        Ok(_) => Err(SyllabusError::Config(format!(
            "{} is empty. Set it with: export {}='...'",
            name, name
        ))),
        Err(_) => Err(SyllabusError::Config(format!(
            "{} not set. Set it with: export {}='...'",
            name, name
        ))),
    }
}
