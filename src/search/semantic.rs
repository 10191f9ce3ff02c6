//! Embedding-backed course search.

use super::{ChunkMetadata, CourseSearch, SearchOutcome};
use crate::embedding::Embedder;
use crate::error::Result;
use crate::vector_store::{ChunkFilter, VectorStore};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, instrument, warn};

/// Semantic search over the vector store.
pub struct SemanticSearch {
    store: Arc<dyn VectorStore>,
    embedder: Arc<dyn Embedder>,
    max_results: usize,
}

impl SemanticSearch {
    pub fn new(store: Arc<dyn VectorStore>, embedder: Arc<dyn Embedder>, max_results: usize) -> Self {
        Self {
            store,
            embedder,
            max_results,
        }
    }

    /// Resolve a possibly partial course name to an indexed course title.
    ///
    /// An exact (case-insensitive) title match wins; otherwise the course whose
    /// title embedding is nearest to the name is used.
    #[instrument(skip(self))]
    pub async fn resolve_course_name(&self, course_name: &str) -> Result<Option<String>> {
        let titles = self.store.course_titles().await?;
        if let Some(title) = titles.iter().find(|t| t.eq_ignore_ascii_case(course_name.trim())) {
            return Ok(Some(title.clone()));
        }
        if titles.is_empty() {
            return Ok(None);
        }

        let embedding = self.embedder.embed(course_name).await?;
        let best = self.store.search_courses(&embedding, 1).await?;
        let resolved = best.into_iter().next().map(|hit| hit.course.title);

        debug!("Resolved course name {:?} to {:?}", course_name, resolved);
        Ok(resolved)
    }

    async fn run_search(
        &self,
        query: &str,
        course_name: Option<&str>,
        lesson_number: Option<u32>,
    ) -> Result<SearchOutcome> {
        let course_title = match course_name {
            Some(name) => match self.resolve_course_name(name).await? {
                Some(title) => Some(title),
                None => return Ok(SearchOutcome::failed(format!("No course found matching '{}'", name))),
            },
            None => None,
        };

        let filter = ChunkFilter {
            course_title,
            lesson_number,
        };

        let embedding = self.embedder.embed(query).await?;
        let hits = self
            .store
            .search_chunks(&embedding, &filter, self.max_results)
            .await?;

        debug!("Search returned {} chunks", hits.len());

        Ok(SearchOutcome::from_hits(hits.into_iter().map(|hit| {
            let metadata = ChunkMetadata {
                course_title: hit.chunk.course_title,
                lesson_number: hit.chunk.lesson_number,
                chunk_index: hit.chunk.chunk_index,
            };
            (hit.chunk.content, metadata)
        })))
    }
}

#[async_trait]
impl CourseSearch for SemanticSearch {
    #[instrument(skip(self))]
    async fn search(
        &self,
        query: &str,
        course_name: Option<&str>,
        lesson_number: Option<u32>,
    ) -> Result<SearchOutcome> {
        match self.run_search(query, course_name, lesson_number).await {
            Ok(outcome) => Ok(outcome),
            Err(e) => {
                warn!("Search failed: {}", e);
                Ok(SearchOutcome::failed(format!("Search error: {}", e)))
            }
        }
    }

    async fn lesson_link(&self, course_title: &str, lesson_number: u32) -> Result<Option<String>> {
        let course = self.store.get_course(course_title).await?;
        Ok(course
            .and_then(|c| c.lesson(lesson_number).cloned())
            .and_then(|l| l.lesson_link))
    }

    async fn course_link(&self, course_title: &str) -> Result<Option<String>> {
        let course = self.store.get_course(course_title).await?;
        Ok(course.and_then(|c| c.course_link))
    }
}
