//! Vector store abstraction for Syllabus.
//!
//! Stores two collections: a course catalog (one embedding per course title,
//! used to resolve fuzzy course names) and the course content chunks.

mod memory;
mod sqlite;

pub use memory::MemoryVectorStore;
pub use sqlite::SqliteVectorStore;

use crate::course::{Course, CourseChunk};
use crate::error::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

/// A course catalog entry with the embedding of its title.
#[derive(Debug, Clone)]
pub struct CourseRecord {
    pub course: Course,
    pub embedding: Vec<f32>,
    pub indexed_at: DateTime<Utc>,
}

impl CourseRecord {
    pub fn new(course: Course, embedding: Vec<f32>) -> Self {
        Self {
            course,
            embedding,
            indexed_at: Utc::now(),
        }
    }
}

/// A content chunk with its embedding.
#[derive(Debug, Clone)]
pub struct ChunkRecord {
    pub id: Uuid,
    pub chunk: CourseChunk,
    pub embedding: Vec<f32>,
}

impl ChunkRecord {
    pub fn new(chunk: CourseChunk, embedding: Vec<f32>) -> Self {
        Self {
            id: Uuid::new_v4(),
            chunk,
            embedding,
        }
    }
}

/// Restricts a chunk search to one course and/or lesson.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChunkFilter {
    pub course_title: Option<String>,
    pub lesson_number: Option<u32>,
}

impl ChunkFilter {
    /// Whether a chunk passes this filter.
    pub fn matches(&self, chunk: &CourseChunk) -> bool {
        let course_ok = self
            .course_title
            .as_ref()
            .map_or(true, |title| &chunk.course_title == title);
        let lesson_ok = self
            .lesson_number
            .map_or(true, |n| chunk.lesson_number == Some(n));
        course_ok && lesson_ok
    }
}

/// A chunk search hit.
#[derive(Debug, Clone)]
pub struct ScoredChunk {
    pub chunk: CourseChunk,
    /// Similarity score (higher is better).
    pub score: f32,
}

/// A course catalog search hit.
#[derive(Debug, Clone)]
pub struct ScoredCourse {
    pub course: Course,
    pub score: f32,
}

/// Trait for vector store implementations.
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Store or replace a course catalog entry, keyed by title.
    async fn upsert_course(&self, record: &CourseRecord) -> Result<()>;

    /// Bulk insert content chunks.
    async fn upsert_chunks(&self, chunks: &[ChunkRecord]) -> Result<usize>;

    /// Find the courses whose title embedding is closest to the query.
    async fn search_courses(&self, query_embedding: &[f32], limit: usize)
        -> Result<Vec<ScoredCourse>>;

    /// Find the chunks closest to the query among those passing the filter.
    async fn search_chunks(
        &self,
        query_embedding: &[f32],
        filter: &ChunkFilter,
        limit: usize,
    ) -> Result<Vec<ScoredChunk>>;

    /// Get a course by exact title.
    async fn get_course(&self, title: &str) -> Result<Option<Course>>;

    /// Titles of all indexed courses, sorted.
    async fn course_titles(&self) -> Result<Vec<String>>;

    /// Number of indexed courses.
    async fn course_count(&self) -> Result<usize> {
        Ok(self.course_titles().await?.len())
    }

    /// Total number of stored chunks.
    async fn chunk_count(&self) -> Result<usize>;

    /// Remove every course and chunk.
    async fn clear(&self) -> Result<()>;
}

/// Compute cosine similarity between two vectors.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let dot_product: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    dot_product / (norm_a * norm_b)
}

/// Sort hits by descending score and keep the best `limit`.
pub(crate) fn rank<T>(mut hits: Vec<(T, f32)>, limit: usize) -> Vec<(T, f32)> {
    hits.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
    hits.truncate(limit);
    hits
}


#[cfg(test)]
mod tests {
    use super::test_support::chunk;
    use super::*;

    #[test]
    fn test_cosine_similarity() {
        let a = vec![1.0, 0.0, 0.0];
        let b = vec![1.0, 0.0, 0.0];
        assert!((cosine_similarity(&a, &b) - 1.0).abs() < 0.001);

        let c = vec![0.0, 1.0, 0.0];
        assert!((cosine_similarity(&a, &c)).abs() < 0.001);

        let d = vec![-1.0, 0.0, 0.0];
        assert!((cosine_similarity(&a, &d) + 1.0).abs() < 0.001);

        assert_eq!(cosine_similarity(&a, &[1.0, 0.0]), 0.0);
    }

    #[test]
    fn test_chunk_filter() {
        let c = chunk("Python Basics", Some(2), 0, "text");

        assert!(ChunkFilter::default().matches(&c));
        assert!(ChunkFilter {
            course_title: Some("Python Basics".to_string()),
            lesson_number: None,
        }
        .matches(&c));
        assert!(!ChunkFilter {
            course_title: Some("Rust Intro".to_string()),
            lesson_number: None,
        }
        .matches(&c));
        assert!(!ChunkFilter {
            course_title: None,
            lesson_number: Some(3),
        }
        .matches(&c));
        assert!(!ChunkFilter {
            course_title: None,
            lesson_number: Some(1),
        }
        .matches(&chunk("Python Basics", None, 0, "intro")));
    }
}
