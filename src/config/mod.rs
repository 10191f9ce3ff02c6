//! Configuration module for Syllabus.
//!
//! Handles loading and managing application settings and prompt templates.

mod prompts;
mod settings;

pub use prompts::Prompts;
pub use settings::{
    ChunkingSettings, EmbeddingSettings, GeneralSettings, ModelSettings, PromptSettings,
    SearchSettings, ServerSettings, SessionSettings, Settings, VectorStoreProvider,
    VectorStoreSettings,
};
