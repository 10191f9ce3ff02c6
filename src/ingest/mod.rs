//! Loading course documents into courses and retrievable chunks.

mod chunker;
mod parser;

pub use chunker::{split_sentences, TextChunker};
pub use parser::{parse_course, CourseDocument};

use crate::config::ChunkingSettings;
use crate::course::{Course, CourseChunk};
use crate::error::{Result, SyllabusError};
use std::path::{Path, PathBuf};
use tracing::{debug, instrument};

/// File extensions treated as course documents.
const COURSE_EXTENSIONS: &[&str] = &["txt", "md"];

/// Turn a parsed document into chunks. Each chunk is prefixed with its course
/// (and lesson) so the text carries its own context.
pub fn build_chunks(doc: &CourseDocument, chunker: &TextChunker) -> Vec<CourseChunk> {
    let title = &doc.course.title;
    let mut chunks = Vec::new();

    let mut push = |content: String, lesson_number: Option<u32>| {
        let chunk_index = chunks.len();
        chunks.push(CourseChunk {
            content,
            course_title: title.clone(),
            lesson_number,
            chunk_index,
        });
    };

    if doc.lessons.is_empty() {
        for piece in chunker.chunk(&doc.body) {
            push(format!("Course {} content: {}", title, piece), None);
        }
    } else {
        for (lesson_number, text) in &doc.lessons {
            for piece in chunker.chunk(text) {
                push(
                    format!("Course {} Lesson {} content: {}", title, lesson_number, piece),
                    Some(*lesson_number),
                );
            }
        }
    }

    chunks
}

/// Read and chunk one course file.
#[instrument(skip(settings))]
pub fn load_course_file(
    path: &Path,
    settings: &ChunkingSettings,
) -> Result<(Course, Vec<CourseChunk>)> {
    let text = std::fs::read_to_string(path)?;
    if text.trim().is_empty() {
        return Err(SyllabusError::Ingest(format!("{} is empty", path.display())));
    }

    let fallback_title = path
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| "Untitled".to_string());

    let doc = parse_course(&text, &fallback_title);
    let chunker = TextChunker::new(settings.chunk_size, settings.chunk_overlap);
    let chunks = build_chunks(&doc, &chunker);

    debug!(
        "Parsed {:?}: {} lessons, {} chunks",
        doc.course.title,
        doc.course.lessons.len(),
        chunks.len()
    );
    Ok((doc.course, chunks))
}

/// Course documents directly inside `dir`, sorted by path.
pub fn course_files(dir: &Path) -> Result<Vec<PathBuf>> {
    if !dir.is_dir() {
        return Err(SyllabusError::Ingest(format!(
            "{} is not a directory",
            dir.display()
        )));
    }

    let mut files = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        let is_course = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| COURSE_EXTENSIONS.contains(&e.to_lowercase().as_str()))
            .unwrap_or(false);
        if path.is_file() && is_course {
            files.push(path);
        }
    }

    files.sort();
    Ok(files)
}
