//! In-memory vector store implementation.
//!
//! Useful for testing and small course collections.

use super::{
    cosine_similarity, rank, ChunkFilter, ChunkRecord, CourseRecord, ScoredChunk, ScoredCourse,
    VectorStore,
};
use crate::course::Course;
use crate::error::{Result, SyllabusError};
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

#[derive(Default)]
struct Collections {
    courses: BTreeMap<String, CourseRecord>,
    chunks: Vec<ChunkRecord>,
}

/// In-memory vector store.
#[derive(Default)]
pub struct MemoryVectorStore {
    inner: RwLock<Collections>,
}

impl MemoryVectorStore {
    /// Create a new in-memory vector store.
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, Collections>> {
        self.inner
            .read()
            .map_err(|e| SyllabusError::VectorStore(format!("Failed to acquire lock: {}", e)))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, Collections>> {
        self.inner
            .write()
            .map_err(|e| SyllabusError::VectorStore(format!("Failed to acquire lock: {}", e)))
    }
}

#[async_trait]
impl VectorStore for MemoryVectorStore {
    async fn upsert_course(&self, record: &CourseRecord) -> Result<()> {
        self.write()?
            .courses
            .insert(record.course.title.clone(), record.clone());
        Ok(())
    }

    async fn upsert_chunks(&self, chunks: &[ChunkRecord]) -> Result<usize> {
        self.write()?.chunks.extend_from_slice(chunks);
        Ok(chunks.len())
    }

    async fn search_courses(
        &self,
        query_embedding: &[f32],
        limit: usize,
    ) -> Result<Vec<ScoredCourse>> {
        let store = self.read()?;
        let hits = store
            .courses
            .values()
            .map(|r| (r.course.clone(), cosine_similarity(query_embedding, &r.embedding)))
            .collect();

        Ok(rank(hits, limit)
            .into_iter()
            .map(|(course, score)| ScoredCourse { course, score })
            .collect())
    }

    async fn search_chunks(
        &self,
        query_embedding: &[f32],
        filter: &ChunkFilter,
        limit: usize,
    ) -> Result<Vec<ScoredChunk>> {
        let store = self.read()?;
        let hits = store
            .chunks
            .iter()
            .filter(|r| filter.matches(&r.chunk))
            .map(|r| (r.chunk.clone(), cosine_similarity(query_embedding, &r.embedding)))
            .collect();

        Ok(rank(hits, limit)
            .into_iter()
            .map(|(chunk, score)| ScoredChunk { chunk, score })
            .collect())
    }

    async fn get_course(&self, title: &str) -> Result<Option<Course>> {
        Ok(self.read()?.courses.get(title).map(|r| r.course.clone()))
    }

    async fn course_titles(&self) -> Result<Vec<String>> {
        Ok(self.read()?.courses.keys().cloned().collect())
    }

    async fn chunk_count(&self) -> Result<usize> {
        Ok(self.read()?.chunks.len())
    }

    async fn clear(&self) -> Result<()> {
        let mut store = self.write()?;
        store.courses.clear();
        store.chunks.clear();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::{course, exercise_store};
    use super::*;

    #[tokio::test]
    async fn test_memory_vector_store() {
        let store = MemoryVectorStore::new();
        exercise_store(&store).await;
    }

    #[tokio::test]
    async fn test_upsert_course_replaces_by_title() {
        let store = MemoryVectorStore::new();
        store
            .upsert_course(&CourseRecord::new(course("Python Basics", 1), vec![1.0]))
            .await
            .unwrap();
        store
            .upsert_course(&CourseRecord::new(course("Python Basics", 3), vec![1.0]))
            .await
            .unwrap();

        assert_eq!(store.course_count().await.unwrap(), 1);
        let course = store.get_course("Python Basics").await.unwrap().unwrap();
        assert_eq!(course.lessons.len(), 3);
    }
}
