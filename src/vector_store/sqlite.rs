//! SQLite-based vector store implementation.
//!
//! Uses SQLite with cosine similarity computed in Rust for simplicity.
//! Course collections are small enough that a full scan per query is fine.

use super::{
    cosine_similarity, rank, ChunkFilter, ChunkRecord, CourseRecord, ScoredChunk, ScoredCourse,
    VectorStore,
};
use crate::course::{Course, CourseChunk, Lesson};
use crate::error::{Result, SyllabusError};
use async_trait::async_trait;
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use tracing::{debug, info, instrument};

const SCHEMA: &str = r#"
    CREATE TABLE IF NOT EXISTS courses (
        title TEXT PRIMARY KEY,
        course_link TEXT,
        instructor TEXT,
        lessons_json TEXT NOT NULL,
        embedding BLOB NOT NULL,
        indexed_at TEXT NOT NULL
    );

    CREATE TABLE IF NOT EXISTS chunks (
        id TEXT PRIMARY KEY,
        course_title TEXT NOT NULL,
        lesson_number INTEGER,
        chunk_index INTEGER NOT NULL,
        content TEXT NOT NULL,
        embedding BLOB NOT NULL
    );

    CREATE INDEX IF NOT EXISTS idx_chunks_course ON chunks(course_title, lesson_number);
"#;

/// SQLite-based vector store.
pub struct SqliteVectorStore {
    conn: Mutex<Connection>,
}

impl SqliteVectorStore {
    /// Open (or create) a store at the given path.
    #[instrument(skip_all)]
    pub fn new(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(path)?;
        conn.execute_batch("PRAGMA journal_mode=WAL;")?;
        conn.execute_batch(SCHEMA)?;

        info!("Initialized SQLite vector store at {:?}", path);

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Create an in-memory SQLite vector store (useful for testing).
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch(SCHEMA)?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| SyllabusError::VectorStore(format!("Failed to acquire lock: {}", e)))
    }

    fn embedding_to_bytes(embedding: &[f32]) -> Vec<u8> {
        embedding.iter().flat_map(|f| f.to_le_bytes()).collect()
    }

    fn bytes_to_embedding(bytes: &[u8]) -> Vec<f32> {
        bytes
            .chunks_exact(4)
            .map(|chunk| {
                let arr: [u8; 4] = chunk.try_into().unwrap_or_default();
                f32::from_le_bytes(arr)
            })
            .collect()
    }

    fn row_to_course(row: &rusqlite::Row<'_>) -> rusqlite::Result<(Course, Vec<u8>)> {
        let lessons_json: String = row.get(3)?;
        let lessons: Vec<Lesson> = serde_json::from_str(&lessons_json).map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(3, rusqlite::types::Type::Text, Box::new(e))
        })?;

        Ok((
            Course {
                title: row.get(0)?,
                course_link: row.get(1)?,
                instructor: row.get(2)?,
                lessons,
            },
            row.get(4)?,
        ))
    }
}

#[async_trait]
impl VectorStore for SqliteVectorStore {
    #[instrument(skip(self, record), fields(title = %record.course.title))]
    async fn upsert_course(&self, record: &CourseRecord) -> Result<()> {
        let conn = self.lock()?;
        let lessons_json = serde_json::to_string(&record.course.lessons)?;

        conn.execute(
            r#"
            INSERT OR REPLACE INTO courses
            (title, course_link, instructor, lessons_json, embedding, indexed_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
            params![
                record.course.title,
                record.course.course_link,
                record.course.instructor,
                lessons_json,
                Self::embedding_to_bytes(&record.embedding),
                record.indexed_at.to_rfc3339(),
            ],
        )?;

        debug!("Upserted course metadata");
        Ok(())
    }

    #[instrument(skip(self, chunks), fields(count = chunks.len()))]
    async fn upsert_chunks(&self, chunks: &[ChunkRecord]) -> Result<usize> {
        let conn = self.lock()?;
        let tx = conn.unchecked_transaction()?;

        for record in chunks {
            tx.execute(
                r#"
                INSERT OR REPLACE INTO chunks
                (id, course_title, lesson_number, chunk_index, content, embedding)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                "#,
                params![
                    record.id.to_string(),
                    record.chunk.course_title,
                    record.chunk.lesson_number,
                    record.chunk.chunk_index as i64,
                    record.chunk.content,
                    Self::embedding_to_bytes(&record.embedding),
                ],
            )?;
        }

        tx.commit()?;
        info!("Batch inserted {} chunks", chunks.len());
        Ok(chunks.len())
    }

    #[instrument(skip(self, query_embedding))]
    async fn search_courses(
        &self,
        query_embedding: &[f32],
        limit: usize,
    ) -> Result<Vec<ScoredCourse>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT title, course_link, instructor, lessons_json, embedding FROM courses",
        )?;

        let hits = stmt
            .query_map([], Self::row_to_course)?
            .filter_map(|row| row.ok())
            .map(|(course, bytes)| {
                let score = cosine_similarity(query_embedding, &Self::bytes_to_embedding(&bytes));
                (course, score)
            })
            .collect();

        Ok(rank(hits, limit)
            .into_iter()
            .map(|(course, score)| ScoredCourse { course, score })
            .collect())
    }

    #[instrument(skip(self, query_embedding))]
    async fn search_chunks(
        &self,
        query_embedding: &[f32],
        filter: &ChunkFilter,
        limit: usize,
    ) -> Result<Vec<ScoredChunk>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT course_title, lesson_number, chunk_index, content, embedding
            FROM chunks
            WHERE (?1 IS NULL OR course_title = ?1)
              AND (?2 IS NULL OR lesson_number = ?2)
            "#,
        )?;

        let rows = stmt.query_map(params![filter.course_title, filter.lesson_number], |row| {
            let chunk_index: i64 = row.get(2)?;
            let bytes: Vec<u8> = row.get(4)?;
            Ok((
                CourseChunk {
                    course_title: row.get(0)?,
                    lesson_number: row.get(1)?,
                    chunk_index: chunk_index as usize,
                    content: row.get(3)?,
                },
                bytes,
            ))
        })?;

        let hits = rows
            .filter_map(|row| row.ok())
            .map(|(chunk, bytes)| {
                let score = cosine_similarity(query_embedding, &Self::bytes_to_embedding(&bytes));
                (chunk, score)
            })
            .collect();

        let results: Vec<ScoredChunk> = rank(hits, limit)
            .into_iter()
            .map(|(chunk, score)| ScoredChunk { chunk, score })
            .collect();

        debug!("Found {} matching chunks", results.len());
        Ok(results)
    }

    async fn get_course(&self, title: &str) -> Result<Option<Course>> {
        let conn = self.lock()?;
        let course = conn
            .query_row(
                "SELECT title, course_link, instructor, lessons_json, embedding FROM courses WHERE title = ?1",
                params![title],
                Self::row_to_course,
            )
            .optional()?;

        Ok(course.map(|(course, _)| course))
    }

    async fn course_titles(&self) -> Result<Vec<String>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare("SELECT title FROM courses ORDER BY title")?;
        let titles = stmt
            .query_map([], |row| row.get(0))?
            .collect::<rusqlite::Result<Vec<String>>>()?;
        Ok(titles)
    }

    async fn course_count(&self) -> Result<usize> {
        let conn = self.lock()?;
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM courses", [], |row| row.get(0))?;
        Ok(count as usize)
    }

    async fn chunk_count(&self) -> Result<usize> {
        let conn = self.lock()?;
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM chunks", [], |row| row.get(0))?;
        Ok(count as usize)
    }

    #[instrument(skip(self))]
    async fn clear(&self) -> Result<()> {
        let conn = self.lock()?;
        conn.execute_batch("DELETE FROM chunks; DELETE FROM courses;")?;
        info!("Cleared all course data");
        Ok(())
    }
}
