//! RAG (Retrieval-Augmented Generation) over course materials.
//!
//! [`RagSystem`] ties the pieces together for one query: session history, the
//! tool-calling loop with a fresh tool registry, and citation collection. It
//! also indexes course documents.

mod response;

pub use response::{CourseAnalytics, QueryAnswer};

use crate::agent::ConversationLoop;
use crate::config::{Prompts, Settings, VectorStoreProvider};
use crate::course::{Course, CourseChunk};
use crate::embedding::{Embedder, OpenAIEmbedder};
use crate::error::Result;
use crate::ingest::{course_files, load_course_file};
use crate::model::{AnthropicClient, ModelClient};
use crate::search::{CourseSearch, SemanticSearch};
use crate::session::SessionStore;
use crate::tools::{CourseSearchTool, ToolRegistry};
use crate::vector_store::{
    ChunkRecord, CourseRecord, MemoryVectorStore, SqliteVectorStore, VectorStore,
};
use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

/// Question answering and indexing over the course collection.
pub struct RagSystem {
    settings: Settings,
    prompts: Prompts,
    conversation: ConversationLoop,
    search: Arc<dyn CourseSearch>,
    store: Arc<dyn VectorStore>,
    embedder: Arc<dyn Embedder>,
    sessions: SessionStore,
}

impl RagSystem {
    /// Build the system from settings, using the configured providers.
    pub fn new(settings: Settings) -> Result<Self> {
        let prompts = Prompts::load(settings.prompts.custom_dir.as_deref())?;
        let client: Arc<dyn ModelClient> = Arc::new(AnthropicClient::new(&settings.model)?);
        let embedder: Arc<dyn Embedder> = Arc::new(OpenAIEmbedder::from_settings(&settings.embedding)?);

        let store: Arc<dyn VectorStore> = match settings.vector_store.provider {
            VectorStoreProvider::Sqlite => Arc::new(SqliteVectorStore::new(&settings.sqlite_path())?),
            VectorStoreProvider::Memory => Arc::new(MemoryVectorStore::new()),
        };

        info!(
            "Using {} vector store and model {}",
            settings.vector_store.provider, settings.model.model
        );

        Ok(Self::with_components(settings, prompts, client, store, embedder))
    }

    /// Build the system from explicit components.
    pub fn with_components(
        settings: Settings,
        prompts: Prompts,
        client: Arc<dyn ModelClient>,
        store: Arc<dyn VectorStore>,
        embedder: Arc<dyn Embedder>,
    ) -> Self {
        let conversation = ConversationLoop::new(client, prompts.clone())
            .with_max_rounds(settings.model.max_tool_rounds);
        let search: Arc<dyn CourseSearch> = Arc::new(SemanticSearch::new(
            store.clone(),
            embedder.clone(),
            settings.search.max_results,
        ));
        let sessions = SessionStore::new(settings.session.max_history)
            .with_max_sessions(settings.session.max_sessions);

        Self {
            settings,
            prompts,
            conversation,
            search,
            store,
            embedder,
            sessions,
        }
    }

    /// Replace the search collaborator used by the search tool.
    pub fn with_search(mut self, search: Arc<dyn CourseSearch>) -> Self {
        self.search = search;
        self
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn sessions(&self) -> &SessionStore {
        &self.sessions
    }

    /// Start a new conversation session.
    pub fn create_session(&self) -> Result<String> {
        self.sessions.create_session()
    }

    /// Answer a question, optionally within a session.
    ///
    /// The session records the question as asked, not the wrapped prompt.
    #[instrument(skip(self), fields(session = ?session_id))]
    pub async fn query(&self, query: &str, session_id: Option<&str>) -> Result<QueryAnswer> {
        let history = match session_id {
            Some(id) => self.sessions.get_history(id)?,
            None => None,
        };

        // One registry per query keeps citations from leaking between queries.
        let mut registry = ToolRegistry::new();
        registry.register(Arc::new(CourseSearchTool::new(self.search.clone())));
        let definitions = registry.definitions();

        let prompt = self.prompts.query_prompt(query);
        let response = self
            .conversation
            .run_detailed(&prompt, history.as_deref(), Some(&definitions), Some(&mut registry))
            .await;

        for call in &response.tool_calls {
            debug!("Tool call: {}", call);
        }

        let answer = QueryAnswer {
            answer: response.answer,
            sources: registry.last_sources(),
            source_metadata: registry.last_source_metadata(),
        };
        registry.reset_sources();

        if let Some(id) = session_id {
            self.sessions.add_exchange(id, query, &answer.answer)?;
        }

        info!(
            "Answered with {} model calls and {} sources",
            response.model_calls,
            answer.sources.len()
        );
        Ok(answer)
    }

    /// Number and titles of indexed courses.
    pub async fn course_analytics(&self) -> Result<CourseAnalytics> {
        let course_titles = self.store.course_titles().await?;
        Ok(CourseAnalytics {
            total_courses: course_titles.len(),
            course_titles,
        })
    }

    /// Index one course document. Returns the course and its chunk count.
    #[instrument(skip(self))]
    pub async fn add_course_document(&self, path: &Path) -> Result<(Course, usize)> {
        let (course, chunks) = load_course_file(path, &self.settings.chunking)?;
        let count = self.index_course(&course, chunks).await?;
        Ok((course, count))
    }

    /// Index every course document in a folder.
    ///
    /// Courses whose title is already indexed are skipped, unless
    /// `clear_existing` wipes the store first. Files that fail to load are
    /// logged and skipped. Returns `(courses_added, chunks_added)`.
    #[instrument(skip(self))]
    pub async fn add_course_folder(&self, dir: &Path, clear_existing: bool) -> Result<(usize, usize)> {
        if clear_existing {
            info!("Clearing existing course data");
            self.store.clear().await?;
        }

        let mut existing: HashSet<String> = self.store.course_titles().await?.into_iter().collect();
        let mut total_courses = 0;
        let mut total_chunks = 0;

        for path in course_files(dir)? {
            let (course, chunks) = match load_course_file(&path, &self.settings.chunking) {
                Ok(loaded) => loaded,
                Err(e) => {
                    warn!("Skipping {}: {}", path.display(), e);
                    continue;
                }
            };

            if existing.contains(&course.title) {
                debug!("Course already indexed: {}", course.title);
                continue;
            }

            total_chunks += self.index_course(&course, chunks).await?;
            total_courses += 1;
            existing.insert(course.title);
        }

        info!("Added {} courses with {} chunks", total_courses, total_chunks);
        Ok((total_courses, total_chunks))
    }

    async fn index_course(&self, course: &Course, chunks: Vec<CourseChunk>) -> Result<usize> {
        let title_embedding = self.embedder.embed(&course.title).await?;
        self.store
            .upsert_course(&CourseRecord::new(course.clone(), title_embedding))
            .await?;

        let texts: Vec<String> = chunks.iter().map(|c| c.content.clone()).collect();
        let embeddings = self.embedder.embed_batch(&texts).await?;
        let records: Vec<ChunkRecord> = chunks
            .into_iter()
            .zip(embeddings)
            .map(|(chunk, embedding)| ChunkRecord::new(chunk, embedding))
            .collect();

        self.store.upsert_chunks(&records).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::{text_response, tool_response, ScriptedModel, MODEL_ERROR_MESSAGE};
    use crate::model::{MessageContent, ModelError};
    use crate::search::KeywordEmbedder;
    use crate::tools::StubSearch;

    fn system(model: Arc<ScriptedModel>) -> RagSystem {
        RagSystem::with_components(
            Settings::default(),
            Prompts::default(),
            model,
            Arc::new(MemoryVectorStore::new()),
            Arc::new(KeywordEmbedder),
        )
    }

    const PYTHON_COURSE: &str = "Course Title: Python Basics\n\
Course Link: https://example.com/python\n\
Course Instructor: Jane Doe\n\
\n\
Lesson 1: Variables\n\
Lesson Link: https://example.com/python/1\n\
Python variables hold values.\n\
\n\
Lesson 2: Loops\n\
Python loops repeat work.\n";

    const RUST_COURSE: &str = "Course Title: Rust Intro\n\
Lesson 1: Ownership\n\
Rust ownership moves values.\n";

    #[tokio::test]
    async fn test_query_collects_and_resets_sources() {
        let model = Arc::new(ScriptedModel::new(vec![
            tool_response("toolu_1", "python variables"),
            text_response("Variables store data."),
        ]));
        let rag = system(model.clone()).with_search(Arc::new(StubSearch::with_python_hits()));

        let answer = rag.query("What are variables?", None).await.unwrap();

        assert_eq!(answer.answer, "Variables store data.");
        assert_eq!(
            answer.sources,
            vec!["Python Basics - Lesson 1", "Python Basics - Lesson 2"]
        );
        assert_eq!(answer.source_metadata[0].lesson_number, Some(1));
        assert_eq!(
            answer.source_metadata[0].link.as_deref(),
            Some("https://example.com/lesson1")
        );

        // The model saw the wrapped prompt.
        let first = &model.calls()[0].messages[0];
        assert_eq!(
            first.content,
            MessageContent::Text(
                "Answer this question about course materials: What are variables?".to_string()
            )
        );
    }

    #[tokio::test]
    async fn test_direct_answer_has_no_sources() {
        let model = Arc::new(ScriptedModel::new(vec![text_response("4")]));
        let rag = system(model);

        let answer = rag.query("What is 2 + 2?", None).await.unwrap();
        assert_eq!(answer.answer, "4");
        assert!(answer.sources.is_empty());
        assert!(answer.source_metadata.is_empty());
    }

    #[tokio::test]
    async fn test_session_records_original_query() {
        let model = Arc::new(ScriptedModel::new(vec![
            text_response("Hello!"),
            text_response("Again."),
        ]));
        let rag = system(model.clone());
        let session = rag.create_session().unwrap();

        rag.query("Hi there", Some(&session)).await.unwrap();
        assert_eq!(
            rag.sessions().get_history(&session).unwrap().as_deref(),
            Some("User: Hi there\nAssistant: Hello!")
        );

        rag.query("And now?", Some(&session)).await.unwrap();
        let second_system = &model.calls()[1].system;
        assert!(second_system.ends_with("Previous conversation:\nUser: Hi there\nAssistant: Hello!"));
    }

    #[tokio::test]
    async fn test_model_failure_is_still_an_answer() {
        let model = Arc::new(ScriptedModel::new(vec![Err(ModelError::Timeout(
            "deadline".to_string(),
        ))]));
        let rag = system(model);

        let answer = rag.query("anything", None).await.unwrap();
        assert_eq!(answer.answer, MODEL_ERROR_MESSAGE);
    }

    #[tokio::test]
    async fn test_add_course_folder_skips_existing() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("python.txt"), PYTHON_COURSE).unwrap();
        std::fs::write(dir.path().join("rust.txt"), RUST_COURSE).unwrap();
        std::fs::write(dir.path().join("empty.txt"), "").unwrap();

        let rag = system(Arc::new(ScriptedModel::default()));

        let (courses, chunks) = rag.add_course_folder(dir.path(), false).await.unwrap();
        assert_eq!((courses, chunks), (2, 3));

        let analytics = rag.course_analytics().await.unwrap();
        assert_eq!(analytics.total_courses, 2);
        assert_eq!(analytics.course_titles, vec!["Python Basics", "Rust Intro"]);

        // Second load finds nothing new.
        assert_eq!(rag.add_course_folder(dir.path(), false).await.unwrap(), (0, 0));

        // Clearing re-indexes everything.
        assert_eq!(rag.add_course_folder(dir.path(), true).await.unwrap(), (2, 3));
    }

    #[tokio::test]
    async fn test_end_to_end_search_over_indexed_course() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("python.txt"), PYTHON_COURSE).unwrap();

        let model = Arc::new(ScriptedModel::new(vec![
            tool_response("toolu_1", "python loops"),
            text_response("Loops repeat work."),
        ]));
        let rag = system(model.clone());
        rag.add_course_folder(dir.path(), false).await.unwrap();

        let answer = rag.query("How do loops work?", None).await.unwrap();

        assert_eq!(answer.answer, "Loops repeat work.");
        assert_eq!(answer.sources[0], "Python Basics - Lesson 2");
        assert_eq!(answer.source_metadata[0].link, None);

        match &model.calls()[1].messages[2].content {
            MessageContent::ToolResults(results) => {
                assert!(results[0]
                    .content
                    .starts_with("[Python Basics - Lesson 2]\nCourse Python Basics Lesson 2 content:"));
            }
            other => panic!("expected tool results, got {:?}", other),
        }
    }
}
