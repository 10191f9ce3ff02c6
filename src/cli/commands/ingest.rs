//! Ingest command implementation.

use crate::cli::preflight::{self, Operation};
use crate::cli::Output;
use crate::config::Settings;
use crate::rag::RagSystem;
use anyhow::Result;
use std::path::Path;

/// Index a course document or a folder of them.
pub async fn run_ingest(path: &str, clear: bool, settings: Settings) -> Result<()> {
    if let Err(e) = preflight::check(Operation::Ingest, &settings) {
        Output::error(&format!("{}", e));
        return Err(e.into());
    }

    let path = Settings::expand_path(path);
    let rag = RagSystem::new(settings)?;

    if path.is_dir() {
        ingest_folder(&rag, &path, clear).await
    } else {
        if clear {
            Output::warning("--clear only applies to folders; ignoring it.");
        }
        ingest_file(&rag, &path).await
    }
}

async fn ingest_folder(rag: &RagSystem, dir: &Path, clear: bool) -> Result<()> {
    let spinner = Output::spinner(&format!("Indexing courses in {}...", dir.display()));

    match rag.add_course_folder(dir, clear).await {
        Ok((courses, chunks)) => {
            spinner.finish_and_clear();
            if courses == 0 {
                Output::info("No new courses found.");
            } else {
                Output::success(&format!("Indexed {} courses with {} chunks", courses, chunks));
            }
            Ok(())
        }
        Err(e) => {
            spinner.finish_and_clear();
            Output::error(&format!("Failed to index folder: {}", e));
            Err(e.into())
        }
    }
}

async fn ingest_file(rag: &RagSystem, path: &Path) -> Result<()> {
    let spinner = Output::spinner(&format!("Indexing {}...", path.display()));

    match rag.add_course_document(path).await {
        Ok((course, chunks)) => {
            spinner.finish_and_clear();
            Output::success(&format!("Indexed \"{}\"", course.title));
            Output::kv("Lessons", &course.lessons.len().to_string());
            Output::kv("Chunks", &chunks.to_string());
            if let Some(instructor) = &course.instructor {
                Output::kv("Instructor", instructor);
            }
            Ok(())
        }
        Err(e) => {
            spinner.finish_and_clear();
            Output::error(&format!("Failed to index {}: {}", path.display(), e));
            Err(e.into())
        }
    }
}
