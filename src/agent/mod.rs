//! Tool-calling conversation loop.
//!
//! The loop lets the model search course content for a bounded number of
//! rounds before it must answer, and turns every failure into a fixed
//! apology so callers always get a string back.

mod runner;

pub use runner::{
    extract_text, ConversationLoop, LoopResponse, ToolCallRecord, DEFAULT_MAX_ROUNDS,
    FALLBACK_MESSAGE, MODEL_ERROR_MESSAGE, TOOL_ERROR_MESSAGE,
};

#[cfg(test)]
pub(crate) use runner::test_support::{
    text_response, tool_response, tool_response_with_input, ScriptedModel,
};
