//! Language model client and the Messages API wire types.
//!
//! Conversation content is modeled as sum types so that text, tool-use
//! requests and tool results are handled exhaustively.

mod anthropic;
mod retry;

pub use anthropic::AnthropicClient;
pub use retry::Backoff;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Author of a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// A single message in the conversation sent to the model.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Message {
    pub role: Role,
    pub content: MessageContent,
}

impl Message {
    /// A plain-text user message.
    pub fn user_text(text: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: MessageContent::Text(text.into()),
        }
    }

    /// The assistant's raw content, echoed back so tool results can refer to it.
    pub fn assistant_blocks(blocks: Vec<ContentBlock>) -> Self {
        Self {
            role: Role::Assistant,
            content: MessageContent::Blocks(blocks),
        }
    }

    /// A user message carrying the results of one round of tool calls.
    pub fn tool_results(results: Vec<ToolResultRecord>) -> Self {
        Self {
            role: Role::User,
            content: MessageContent::ToolResults(results),
        }
    }
}

/// Message content: plain text, content blocks, or tool results.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum MessageContent {
    Text(String),
    Blocks(Vec<ContentBlock>),
    ToolResults(Vec<ToolResultRecord>),
}

/// A content block produced by the model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentBlock {
    Text { text: String },
    ToolUse(ToolUseRequest),
    /// Block kinds this client does not handle (thinking, etc.).
    #[serde(other)]
    Unsupported,
}

/// A tool invocation requested by the model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolUseRequest {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub input: serde_json::Value,
}

/// The output of one executed tool call, matched to its request by id.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename = "tool_result")]
pub struct ToolResultRecord {
    pub tool_use_id: String,
    pub content: String,
}

/// Schema advertised to the model for one tool.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    pub input_schema: serde_json::Value,
}

/// How the model may choose tools.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ToolChoice {
    Auto,
}

/// Request body for the Messages API.
#[derive(Debug, Clone, Serialize)]
pub struct MessageRequest {
    pub model: String,
    pub system: String,
    pub messages: Vec<Message>,
    pub temperature: f32,
    pub max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tools: Option<Vec<ToolDefinition>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_choice: Option<ToolChoice>,
}

/// Why the model stopped generating.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StopReason {
    EndTurn,
    ToolUse,
    MaxTokens,
    StopSequence,
    Other(String),
}

impl From<&str> for StopReason {
    fn from(s: &str) -> Self {
        match s {
            "end_turn" => StopReason::EndTurn,
            "tool_use" => StopReason::ToolUse,
            "max_tokens" => StopReason::MaxTokens,
            "stop_sequence" => StopReason::StopSequence,
            other => StopReason::Other(other.to_string()),
        }
    }
}

/// Response body from the Messages API.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct MessageResponse {
    #[serde(default)]
    pub content: Vec<ContentBlock>,
    #[serde(default)]
    pub stop_reason: Option<String>,
}

impl MessageResponse {
    /// Parsed stop reason, if the provider sent one.
    pub fn stop_reason(&self) -> Option<StopReason> {
        self.stop_reason.as_deref().map(StopReason::from)
    }

    /// Whether the model stopped to request tool execution.
    pub fn requests_tool_use(&self) -> bool {
        self.stop_reason() == Some(StopReason::ToolUse)
    }

    /// Tool-use requests in the order the model produced them.
    pub fn tool_uses(&self) -> impl Iterator<Item = &ToolUseRequest> {
        self.content.iter().filter_map(|block| match block {
            ContentBlock::ToolUse(request) => Some(request),
            _ => None,
        })
    }

    /// Text of the first content block, if that block is text.
    pub fn first_text(&self) -> Option<&str> {
        match self.content.first() {
            Some(ContentBlock::Text { text }) => Some(text),
            _ => None,
        }
    }
}

/// Failure to obtain a response from the model provider.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ModelError {
    #[error("request failed: {0}")]
    Transport(String),

    #[error("request timed out: {0}")]
    Timeout(String),

    #[error("provider returned HTTP {status}: {message}")]
    Status { status: u16, message: String },

    #[error("invalid response body: {0}")]
    Decode(String),
}

impl ModelError {
    /// Whether retrying the same request may succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            ModelError::Transport(_) | ModelError::Timeout(_) => true,
            ModelError::Status { status, .. } => {
                matches!(status, 429 | 500 | 502 | 503 | 504 | 529)
            }
            ModelError::Decode(_) => false,
        }
    }
}

impl From<ModelError> for crate::error::SyllabusError {
    fn from(e: ModelError) -> Self {
        crate::error::SyllabusError::Model(e.to_string())
    }
}

/// A language model that answers one request per call.
#[async_trait]
pub trait ModelClient: Send + Sync {
    /// Send the conversation and return the model's response.
    ///
    /// Tool definitions are omitted from the request when `tools` is `None`.
    async fn call(
        &self,
        system: &str,
        messages: &[Message],
        tools: Option<&[ToolDefinition]>,
    ) -> std::result::Result<MessageResponse, ModelError>;
}
