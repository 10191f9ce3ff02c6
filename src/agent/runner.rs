//! Bounded multi-round tool-calling loop.

use crate::config::Prompts;
use crate::model::{
    ContentBlock, Message, MessageResponse, ModelClient, ToolDefinition, ToolResultRecord,
};
use crate::tools::ToolRegistry;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

/// Returned when a model call fails.
pub const MODEL_ERROR_MESSAGE: &str =
    "Sorry, I encountered an error processing your request. Please try again.";

/// Returned when a tool execution fails.
pub const TOOL_ERROR_MESSAGE: &str =
    "Sorry, I encountered an error while using a tool. Please try again.";

/// Returned when the model's reply has no leading text block.
pub const FALLBACK_MESSAGE: &str =
    "I wasn't able to generate a response. Please try rephrasing your question.";

/// Default number of tool rounds before the forced final call.
pub const DEFAULT_MAX_ROUNDS: usize = 2;

/// Drives the model through up to `max_rounds` tool rounds, then forces a
/// tool-free answer.
pub struct ConversationLoop {
    client: Arc<dyn ModelClient>,
    prompts: Prompts,
    max_rounds: usize,
}

impl ConversationLoop {
    pub fn new(client: Arc<dyn ModelClient>, prompts: Prompts) -> Self {
        Self {
            client,
            prompts,
            max_rounds: DEFAULT_MAX_ROUNDS,
        }
    }

    /// Set the tool round budget.
    pub fn with_max_rounds(mut self, max_rounds: usize) -> Self {
        self.max_rounds = max_rounds;
        self
    }

    pub fn max_rounds(&self) -> usize {
        self.max_rounds
    }

    /// Answer a query, returning only the final text.
    pub async fn run(
        &self,
        query: &str,
        history: Option<&str>,
        tools: Option<&[ToolDefinition]>,
        registry: Option<&mut ToolRegistry>,
    ) -> String {
        self.run_detailed(query, history, tools, registry)
            .await
            .answer
    }

    /// Answer a query and report what happened along the way.
    ///
    /// Never fails: model and tool failures become fixed apology strings.
    #[instrument(skip_all, fields(max_rounds = self.max_rounds))]
    pub async fn run_detailed(
        &self,
        query: &str,
        history: Option<&str>,
        tools: Option<&[ToolDefinition]>,
        mut registry: Option<&mut ToolRegistry>,
    ) -> LoopResponse {
        let system = self.prompts.system_with_history(history);
        let tools = tools.filter(|t| !t.is_empty());
        let mut messages = vec![Message::user_text(query)];
        let mut trace = LoopResponse::default();

        for round in 0..self.max_rounds {
            debug!("Tool round {}", round + 1);
            trace.model_calls += 1;

            let response = match self.client.call(&system, &messages, tools).await {
                Ok(response) => response,
                Err(e) => {
                    warn!("Model call failed: {}", e);
                    return trace.finish(MODEL_ERROR_MESSAGE);
                }
            };

            let registry = match registry.as_deref_mut() {
                Some(registry) if response.requests_tool_use() => registry,
                _ => return trace.finish(extract_text(&response)),
            };

            messages.push(Message::assistant_blocks(echo_content(&response)));

            let mut results = Vec::new();
            for request in response.tool_uses() {
                info!("Calling tool {} with {}", request.name, request.input);

                match registry.execute(&request.name, &request.input).await {
                    Ok(content) => {
                        trace.tool_calls.push(ToolCallRecord {
                            name: request.name.clone(),
                            arguments: request.input.to_string(),
                            result: content.clone(),
                        });
                        results.push(ToolResultRecord {
                            tool_use_id: request.id.clone(),
                            content,
                        });
                    }
                    Err(e) => {
                        warn!("Tool {} failed: {}", request.name, e);
                        return trace.finish(TOOL_ERROR_MESSAGE);
                    }
                }
            }

            if results.is_empty() {
                debug!("Model stopped for tool use without requesting a tool");
            } else {
                messages.push(Message::tool_results(results));
            }
        }

        // Budget spent: one last call with tools disabled.
        trace.model_calls += 1;
        match self.client.call(&system, &messages, None).await {
            Ok(response) => trace.finish(extract_text(&response)),
            Err(e) => {
                warn!("Final model call failed: {}", e);
                trace.finish(MODEL_ERROR_MESSAGE)
            }
        }
    }
}

/// Text of the first content block, or the fallback message.
pub fn extract_text(response: &MessageResponse) -> String {
    response
        .first_text()
        .map(str::to_string)
        .unwrap_or_else(|| FALLBACK_MESSAGE.to_string())
}

/// The assistant content to send back, minus blocks the client cannot echo.
fn echo_content(response: &MessageResponse) -> Vec<ContentBlock> {
    response
        .content
        .iter()
        .filter(|block| !matches!(block, ContentBlock::Unsupported))
        .cloned()
        .collect()
}

/// Outcome of a loop run.
#[derive(Debug, Default)]
pub struct LoopResponse {
    /// The final answer text.
    pub answer: String,
    /// Every tool call that completed, in order.
    pub tool_calls: Vec<ToolCallRecord>,
    /// Number of model calls made.
    pub model_calls: usize,
}

impl LoopResponse {
    fn finish(mut self, answer: impl Into<String>) -> Self {
        self.answer = answer.into();
        self
    }
}

/// Record of a tool call made during the loop.
#[derive(Debug, Clone)]
pub struct ToolCallRecord {
    pub name: String,
    /// JSON arguments passed to the tool.
    pub arguments: String,
    pub result: String,
}

impl std::fmt::Display for ToolCallRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}({})", self.name, self.arguments)
    }
}


#[cfg(test)]
mod tests {
    use super::test_support::{text_response, tool_response, RecordedCall, ScriptedModel};
    use super::*;
    use crate::error::{Result, SyllabusError};
    use crate::model::{MessageContent, ModelError, Role, ToolUseRequest};
    use crate::search::SearchOutcome;
    use crate::tools::{CourseSearchTool, StubSearch, Tool, ToolOutput};
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Counts executions and optionally fails.
    struct CountingTool {
        executions: AtomicUsize,
        fail: bool,
    }

    impl CountingTool {
        fn new(fail: bool) -> Arc<Self> {
            Arc::new(Self {
                executions: AtomicUsize::new(0),
                fail,
            })
        }
    }

    #[async_trait]
    impl Tool for CountingTool {
        fn name(&self) -> &str {
            "search_course_content"
        }

        fn definition(&self) -> ToolDefinition {
            ToolDefinition {
                name: "search_course_content".to_string(),
                description: "Search".to_string(),
                input_schema: json!({"type": "object"}),
            }
        }

        async fn execute(&self, args: &serde_json::Value) -> Result<ToolOutput> {
            let n = self.executions.fetch_add(1, Ordering::SeqCst) + 1;
            if self.fail {
                return Err(SyllabusError::Search("index unavailable".to_string()));
            }
            Ok(ToolOutput::text(format!("result {} for {}", n, args["query"])))
        }
    }

    fn setup(
        responses: Vec<std::result::Result<MessageResponse, ModelError>>,
        tool: Arc<CountingTool>,
    ) -> (Arc<ScriptedModel>, ConversationLoop, ToolRegistry) {
        let model = Arc::new(ScriptedModel::new(responses));
        let conversation = ConversationLoop::new(model.clone(), Prompts::default());
        let mut registry = ToolRegistry::new();
        registry.register(tool);
        (model, conversation, registry)
    }

    #[tokio::test]
    async fn test_direct_answer_uses_single_call() {
        let tool = CountingTool::new(false);
        let (model, conversation, mut registry) =
            setup(vec![text_response("Paris.")], tool.clone());
        let definitions = registry.definitions();

        let answer = conversation
            .run("Capital of France?", None, Some(&definitions), Some(&mut registry))
            .await;

        assert_eq!(answer, "Paris.");
        assert_eq!(model.calls().len(), 1);
        assert_eq!(tool.executions.load(Ordering::SeqCst), 0);
        assert_eq!(
            model.calls()[0].tool_names,
            Some(vec!["search_course_content".to_string()])
        );
    }

    #[tokio::test]
    async fn test_two_tool_rounds_then_answer() {
        let tool = CountingTool::new(false);
        let (model, conversation, mut registry) = setup(
            vec![
                tool_response("toolu_1", "first"),
                tool_response("toolu_2", "second"),
                text_response("Final answer."),
            ],
            tool.clone(),
        );
        let definitions = registry.definitions();

        let response = conversation
            .run_detailed("Compare lessons", None, Some(&definitions), Some(&mut registry))
            .await;

        assert_eq!(response.answer, "Final answer.");
        assert_eq!(response.model_calls, 3);
        assert_eq!(response.tool_calls.len(), 2);
        assert_eq!(tool.executions.load(Ordering::SeqCst), 2);

        let calls = model.calls();
        assert_eq!(calls.len(), 3);
        assert!(calls[0].tool_names.is_some());
        assert!(calls[1].tool_names.is_some());
        // The forced final call carries no tools.
        assert!(calls[2].tool_names.is_none());

        // user, assistant, tool results, assistant, tool results
        let messages = &calls[2].messages;
        assert_eq!(messages.len(), 5);
        let roles: Vec<Role> = messages.iter().map(|m| m.role).collect();
        assert_eq!(
            roles,
            vec![Role::User, Role::Assistant, Role::User, Role::Assistant, Role::User]
        );
        match &messages[2].content {
            MessageContent::ToolResults(results) => {
                assert_eq!(results.len(), 1);
                assert_eq!(results[0].tool_use_id, "toolu_1");
                assert_eq!(results[0].content, r#"result 1 for "first""#);
            }
            other => panic!("expected tool results, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_identical_runs_give_identical_results() {
        async fn two_round_run() -> (LoopResponse, Vec<RecordedCall>, usize) {
            let tool = CountingTool::new(false);
            let (model, conversation, mut registry) = setup(
                vec![
                    tool_response("toolu_1", "first"),
                    tool_response("toolu_2", "second"),
                    text_response("Final answer."),
                ],
                tool.clone(),
            );
            let definitions = registry.definitions();
            let response = conversation
                .run_detailed("Compare lessons", None, Some(&definitions), Some(&mut registry))
                .await;
            (response, model.calls(), tool.executions.load(Ordering::SeqCst))
        }

        let (first, first_calls, first_executions) = two_round_run().await;
        let (second, second_calls, second_executions) = two_round_run().await;

        assert_eq!(first.answer, second.answer);
        assert_eq!(first.model_calls, second.model_calls);
        assert_eq!(first.tool_calls.len(), second.tool_calls.len());
        assert_eq!(first_executions, second_executions);
        assert_eq!(first_calls.len(), second_calls.len());
        for (a, b) in first_calls.iter().zip(&second_calls) {
            assert_eq!(a.system, b.system);
            assert_eq!(a.messages, b.messages);
            assert_eq!(a.tool_names, b.tool_names);
        }
    }

    #[tokio::test]
    async fn test_budget_exhausted_forces_final_call() {
        let tool = CountingTool::new(false);
        let (model, conversation, mut registry) = setup(
            vec![
                tool_response("toolu_1", "a"),
                tool_response("toolu_2", "b"),
                tool_response("toolu_3", "c"),
            ],
            tool.clone(),
        );
        let definitions = registry.definitions();

        let answer = conversation
            .run("q", None, Some(&definitions), Some(&mut registry))
            .await;

        // Third response arrives on the tool-free call and is read as text.
        assert_eq!(answer, "Let me search.");
        assert_eq!(model.calls().len(), 3);
        assert_eq!(tool.executions.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_tool_failure_stops_loop() {
        let tool = CountingTool::new(true);
        let (model, conversation, mut registry) = setup(
            vec![tool_response("toolu_1", "a"), text_response("unused")],
            tool.clone(),
        );
        let definitions = registry.definitions();

        let answer = conversation
            .run("q", None, Some(&definitions), Some(&mut registry))
            .await;

        assert_eq!(answer, TOOL_ERROR_MESSAGE);
        assert_eq!(tool.executions.load(Ordering::SeqCst), 1);
        assert_eq!(model.calls().len(), 1);
    }

    #[tokio::test]
    async fn test_unknown_tool_is_a_tool_failure() {
        let tool = CountingTool::new(false);
        let (_, conversation, mut registry) = setup(
            vec![Ok(MessageResponse {
                content: vec![ContentBlock::ToolUse(ToolUseRequest {
                    id: "toolu_1".to_string(),
                    name: "delete_everything".to_string(),
                    input: json!({}),
                })],
                stop_reason: Some("tool_use".to_string()),
            })],
            tool,
        );

        let answer = conversation.run("q", None, None, Some(&mut registry)).await;
        assert_eq!(answer, TOOL_ERROR_MESSAGE);
    }

    #[tokio::test]
    async fn test_model_failure_returns_apology() {
        let tool = CountingTool::new(false);
        let (model, conversation, mut registry) = setup(
            vec![Err(ModelError::Status {
                status: 400,
                message: "bad request".to_string(),
            })],
            tool,
        );

        let answer = conversation
            .run("q", None, None, Some(&mut registry))
            .await;

        assert_eq!(answer, MODEL_ERROR_MESSAGE);
        assert_eq!(model.calls().len(), 1);
    }

    #[tokio::test]
    async fn test_final_call_failure_returns_apology() {
        let tool = CountingTool::new(false);
        let (_, conversation, mut registry) = setup(
            vec![tool_response("toolu_1", "a")],
            tool,
        );
        let conversation = conversation.with_max_rounds(1);

        let answer = conversation
            .run("q", None, None, Some(&mut registry))
            .await;
        assert_eq!(answer, MODEL_ERROR_MESSAGE);
    }

    #[tokio::test]
    async fn test_tool_use_without_registry_returns_text() {
        let model = Arc::new(ScriptedModel::new(vec![tool_response("toolu_1", "a")]));
        let conversation = ConversationLoop::new(model.clone(), Prompts::default());

        let answer = conversation.run("q", None, None, None).await;

        assert_eq!(answer, "Let me search.");
        assert_eq!(model.calls().len(), 1);
        assert!(model.calls()[0].tool_names.is_none());
    }

    #[tokio::test]
    async fn test_tool_use_stop_without_blocks_advances_round() {
        let tool = CountingTool::new(false);
        let no_blocks = Ok(MessageResponse {
            content: vec![ContentBlock::Text {
                text: "thinking".to_string(),
            }],
            stop_reason: Some("tool_use".to_string()),
        });
        let (model, conversation, mut registry) = setup(
            vec![no_blocks, text_response("Done.")],
            tool.clone(),
        );
        let definitions = registry.definitions();

        let answer = conversation
            .run("q", None, Some(&definitions), Some(&mut registry))
            .await;

        assert_eq!(answer, "Done.");
        assert_eq!(tool.executions.load(Ordering::SeqCst), 0);
        let calls = model.calls();
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[1].messages.len(), 2);
    }

    #[tokio::test]
    async fn test_multiple_requests_batched_into_one_message() {
        let tool = CountingTool::new(false);
        let both = Ok(MessageResponse {
            content: vec![
                ContentBlock::ToolUse(ToolUseRequest {
                    id: "toolu_a".to_string(),
                    name: "search_course_content".to_string(),
                    input: json!({"query": "a"}),
                }),
                ContentBlock::ToolUse(ToolUseRequest {
                    id: "toolu_b".to_string(),
                    name: "search_course_content".to_string(),
                    input: json!({"query": "b"}),
                }),
            ],
            stop_reason: Some("tool_use".to_string()),
        });
        let (model, conversation, mut registry) =
            setup(vec![both, text_response("ok")], tool.clone());
        let definitions = registry.definitions();

        conversation
            .run("q", None, Some(&definitions), Some(&mut registry))
            .await;

        let calls = model.calls();
        assert_eq!(calls[1].messages.len(), 3);
        match &calls[1].messages[2].content {
            MessageContent::ToolResults(results) => {
                let ids: Vec<&str> = results.iter().map(|r| r.tool_use_id.as_str()).collect();
                assert_eq!(ids, vec!["toolu_a", "toolu_b"]);
            }
            other => panic!("expected tool results, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_history_appended_to_system_prompt() {
        let model = Arc::new(ScriptedModel::new(vec![text_response("ok")]));
        let conversation = ConversationLoop::new(model.clone(), Prompts::default());

        conversation
            .run("q", Some("User: hi\nAssistant: hello"), None, None)
            .await;

        let system = &model.calls()[0].system;
        assert!(system.ends_with("\n\nPrevious conversation:\nUser: hi\nAssistant: hello"));
    }

    #[tokio::test]
    async fn test_fallback_when_no_text_block() {
        let model = Arc::new(ScriptedModel::new(vec![Ok(MessageResponse::default())]));
        let conversation = ConversationLoop::new(model, Prompts::default());

        assert_eq!(conversation.run("q", None, None, None).await, FALLBACK_MESSAGE);
    }

    #[tokio::test]
    async fn test_search_tool_citations_survive_loop() {
        let model = Arc::new(ScriptedModel::new(vec![
            tool_response("toolu_1", "python"),
            text_response("Python is a language."),
        ]));
        let conversation = ConversationLoop::new(model, Prompts::default());
        let mut registry = ToolRegistry::new();
        registry.register(Arc::new(CourseSearchTool::new(Arc::new(
            StubSearch::with_python_hits(),
        ))));
        let definitions = registry.definitions();

        let answer = conversation
            .run("q", None, Some(&definitions), Some(&mut registry))
            .await;

        assert_eq!(answer, "Python is a language.");
        assert_eq!(
            registry.last_sources(),
            vec!["Python Basics - Lesson 1", "Python Basics - Lesson 2"]
        );

        // An empty outcome leaves no citations behind.
        let model = Arc::new(ScriptedModel::new(vec![
            tool_response("toolu_1", "nothing"),
            text_response("Nothing found."),
        ]));
        let conversation = ConversationLoop::new(model, Prompts::default());
        let mut registry = ToolRegistry::new();
        registry.register(Arc::new(CourseSearchTool::new(Arc::new(StubSearch::new(
            SearchOutcome::empty(),
        )))));
        conversation.run("q", None, None, Some(&mut registry)).await;
        assert!(registry.last_sources().is_empty());
    }

    #[test]
    fn test_tool_call_record_display() {
        let record = ToolCallRecord {
            name: "search_course_content".to_string(),
            arguments: r#"{"query":"test"}"#.to_string(),
            result: "[Python Basics]\ntext".to_string(),
        };
        assert_eq!(format!("{}", record), r#"search_course_content({"query":"test"})"#);
    }
}
