//! Name-to-tool dispatch with a per-query citation slot.

use super::{SourceCitation, Tool};
use crate::error::{Result, SyllabusError};
use crate::model::ToolDefinition;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, instrument};

/// Registered tools plus the citations of the most recent call that produced any.
///
/// Build one registry per query: the citation slot is not shared safely
/// between concurrent queries.
#[derive(Default)]
pub struct ToolRegistry {
    tools: BTreeMap<String, Arc<dyn Tool>>,
    last_citations: Vec<SourceCitation>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a tool, replacing any tool with the same name.
    pub fn register(&mut self, tool: Arc<dyn Tool>) {
        self.tools.insert(tool.name().to_string(), tool);
    }

    /// Schemas of every registered tool.
    pub fn definitions(&self) -> Vec<ToolDefinition> {
        self.tools.values().map(|tool| tool.definition()).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Execute a tool by name and return its text output.
    #[instrument(skip(self, args))]
    pub async fn execute(&mut self, name: &str, args: &serde_json::Value) -> Result<String> {
        let tool = self
            .tools
            .get(name)
            .cloned()
            .ok_or_else(|| SyllabusError::UnknownTool(name.to_string()))?;

        let output = tool.execute(args).await?;
        if !output.citations.is_empty() {
            debug!("Tool {} produced {} citations", name, output.citations.len());
            self.last_citations = output.citations;
        }

        Ok(output.text)
    }

    /// Display names of the latest citations.
    pub fn last_sources(&self) -> Vec<String> {
        self.last_citations
            .iter()
            .map(|c| c.display_name.clone())
            .collect()
    }

    /// The latest citations in full.
    pub fn last_source_metadata(&self) -> Vec<SourceCitation> {
        self.last_citations.clone()
    }

    pub fn reset_sources(&mut self) {
        self.last_citations.clear();
    }
}
