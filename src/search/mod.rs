//! Course content search.
//!
//! The [`CourseSearch`] trait is what the search tool talks to; the concrete
//! implementation lives in [`semantic`].

mod semantic;

pub use semantic::SemanticSearch;

#[cfg(test)]
pub(crate) use semantic::test_support::KeywordEmbedder;

use crate::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Where a retrieved document came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkMetadata {
    pub course_title: String,
    pub lesson_number: Option<u32>,
    pub chunk_index: usize,
}

/// Result of one search: documents with parallel metadata, or an error message.
///
/// Fields are private so an outcome can only be built through the
/// constructors, which keep `documents` and `metadata` the same length and
/// both empty when an error is set.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SearchOutcome {
    documents: Vec<String>,
    metadata: Vec<ChunkMetadata>,
    error: Option<String>,
}

impl SearchOutcome {
    /// Build an outcome from `(document, metadata)` hits.
    pub fn from_hits(hits: impl IntoIterator<Item = (String, ChunkMetadata)>) -> Self {
        let (documents, metadata) = hits.into_iter().unzip();
        Self {
            documents,
            metadata,
            error: None,
        }
    }

    /// An outcome with no documents and no error.
    pub fn empty() -> Self {
        Self::default()
    }

    /// An outcome carrying only an error message.
    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            documents: Vec::new(),
            metadata: Vec::new(),
            error: Some(message.into()),
        }
    }

    pub fn documents(&self) -> &[String] {
        &self.documents
    }

    pub fn metadata(&self) -> &[ChunkMetadata] {
        &self.metadata
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    /// Iterate documents together with their metadata.
    pub fn hits(&self) -> impl Iterator<Item = (&String, &ChunkMetadata)> {
        self.documents.iter().zip(self.metadata.iter())
    }
}

/// Search collaborator used by the course search tool.
#[async_trait]
pub trait CourseSearch: Send + Sync {
    /// Search course content, optionally restricted to a course (fuzzy name)
    /// and/or lesson number.
    ///
    /// Not-found conditions are reported through [`SearchOutcome::failed`],
    /// not as `Err`.
    async fn search(
        &self,
        query: &str,
        course_name: Option<&str>,
        lesson_number: Option<u32>,
    ) -> Result<SearchOutcome>;

    /// Link of a lesson, if the course and lesson exist and have one.
    async fn lesson_link(&self, course_title: &str, lesson_number: u32) -> Result<Option<String>>;

    /// Link of a course, if known.
    async fn course_link(&self, course_title: &str) -> Result<Option<String>>;
}
