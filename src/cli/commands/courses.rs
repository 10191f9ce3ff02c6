//! Courses command implementation.

use crate::cli::preflight::{self, Operation};
use crate::cli::Output;
use crate::config::{Settings, VectorStoreProvider};
use crate::vector_store::{SqliteVectorStore, VectorStore};
use anyhow::Result;

/// List indexed courses.
pub async fn run_courses(settings: Settings) -> Result<()> {
    preflight::check(Operation::Courses, &settings)?;

    if settings.vector_store.provider == VectorStoreProvider::Memory {
        Output::info("The memory vector store is empty outside a running server.");
        return Ok(());
    }

    let store = SqliteVectorStore::new(&settings.sqlite_path())?;
    let titles = store.course_titles().await?;

    if titles.is_empty() {
        Output::info("No courses indexed yet. Use 'syllabus ingest <path>' to add some.");
        return Ok(());
    }

    Output::header(&format!("Indexed Courses ({})", titles.len()));
    println!();

    for title in &titles {
        match store.get_course(title).await? {
            Some(course) => Output::course_info(
                &course.title,
                course.instructor.as_deref(),
                course.lessons.len(),
            ),
            None => Output::list_item(title),
        }
    }

    println!();
    Output::kv("Total chunks", &store.chunk_count().await?.to_string());

    Ok(())
}
