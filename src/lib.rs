//! Syllabus - Course Materials Assistant
//!
//! Question answering over course materials. A language model answers each
//! question, calling a course search tool for up to a fixed number of rounds,
//! and the answer comes back with the lessons it cited.
//!
//! # Architecture
//!
//! The library is organized into several modules:
//!
//! - `config` - Configuration management and prompt templates
//! - `model` - Language model client (Messages API) with retry
//! - `agent` - Bounded tool-calling conversation loop
//! - `tools` - Tool trait, registry and the course search tool
//! - `search` - Course search collaborator (course name resolution, filters)
//! - `embedding` - Embedding generation
//! - `vector_store` - Vector database abstraction
//! - `ingest` - Course document parsing and chunking
//! - `session` - In-memory conversation history
//! - `rag` - Per-query coordination and indexing
//! - `cli` - Command line interface and HTTP server
//!
//! # Example
//!
//! ```rust,no_run
//! use syllabus::config::Settings;
//! use syllabus::rag::RagSystem;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let settings = Settings::load()?;
//!     let rag = RagSystem::new(settings)?;
//!
//!     rag.add_course_folder(std::path::Path::new("./docs"), false).await?;
//!
//!     let answer = rag.query("What is covered in lesson 1?", None).await?;
//!     println!("{}", answer.format_for_display());
//!
//!     Ok(())
//! }
//! ```

pub mod agent;
pub mod cli;
pub mod config;
pub mod course;
pub mod embedding;
pub mod error;
pub mod ingest;
pub mod model;
pub mod rag;
pub mod search;
pub mod session;
pub mod tools;
pub mod vector_store;

pub use error::{Result, SyllabusError};
