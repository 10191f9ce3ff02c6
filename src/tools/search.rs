//! The `search_course_content` tool.

use super::{SourceCitation, Tool, ToolOutput};
use crate::error::{Result, SyllabusError};
use crate::model::ToolDefinition;
use crate::search::{CourseSearch, SearchOutcome};
use async_trait::async_trait;
use serde::{Deserialize, Deserializer};
use serde_json::{json, Value};
use std::fmt;
use std::sync::Arc;
use tracing::instrument;

pub const SEARCH_TOOL_NAME: &str = "search_course_content";

/// Arguments the model passes to the search tool.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SearchArgs {
    pub query: String,
    #[serde(default)]
    pub course_name: Option<String>,
    #[serde(default, deserialize_with = "lenient_lesson")]
    pub lesson_number: Option<LessonNumber>,
}

/// Lesson filter as sent by the model.
///
/// Models send lesson numbers as integers, floats (`2.0`) or strings (`"2"`).
/// Anything that is not a whole non-negative number is kept as written so it
/// can be reported back as "no content in lesson ...".
#[derive(Debug, Clone, PartialEq)]
pub enum LessonNumber {
    Valid(u32),
    Unmatched(String),
}

impl LessonNumber {
    fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::Null => None,
            Value::Number(n) => Some(
                n.as_u64()
                    .and_then(|v| u32::try_from(v).ok())
                    .or_else(|| n.as_f64().and_then(whole_lesson))
                    .map_or_else(|| Self::Unmatched(n.to_string()), Self::Valid),
            ),
            Value::String(s) => {
                let trimmed = s.trim();
                let parsed = trimmed
                    .parse::<u32>()
                    .ok()
                    .or_else(|| trimmed.parse::<f64>().ok().and_then(whole_lesson));
                Some(parsed.map_or_else(|| Self::Unmatched(trimmed.to_string()), Self::Valid))
            }
            other => Some(Self::Unmatched(other.to_string())),
        }
    }

    pub fn valid(&self) -> Option<u32> {
        match self {
            Self::Valid(n) => Some(*n),
            Self::Unmatched(_) => None,
        }
    }
}

impl fmt::Display for LessonNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Valid(n) => write!(f, "{}", n),
            Self::Unmatched(raw) => write!(f, "{}", raw),
        }
    }
}

fn whole_lesson(v: f64) -> Option<u32> {
    (v.is_finite() && v.fract() == 0.0 && v >= 0.0 && v <= f64::from(u32::MAX)).then_some(v as u32)
}

fn lenient_lesson<'de, D>(deserializer: D) -> std::result::Result<Option<LessonNumber>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.and_then(LessonNumber::from_value))
}

/// Searches course content with optional course and lesson filters.
pub struct CourseSearchTool {
    search: Arc<dyn CourseSearch>,
}

impl CourseSearchTool {
    pub fn new(search: Arc<dyn CourseSearch>) -> Self {
        Self { search }
    }

    /// Run a search and format the outcome for the model.
    #[instrument(skip(self))]
    pub async fn run(&self, args: &SearchArgs) -> Result<ToolOutput> {
        let lesson = match &args.lesson_number {
            Some(number) => match number.valid() {
                Some(n) => Some(n),
                None => return Ok(ToolOutput::text(empty_message(args))),
            },
            None => None,
        };

        let outcome = self
            .search
            .search(&args.query, args.course_name.as_deref(), lesson)
            .await?;

        if let Some(error) = outcome.error() {
            return Ok(ToolOutput::text(error));
        }

        if outcome.is_empty() {
            return Ok(ToolOutput::text(empty_message(args)));
        }

        self.format_results(&outcome).await
    }

    async fn format_results(&self, outcome: &SearchOutcome) -> Result<ToolOutput> {
        let mut blocks = Vec::with_capacity(outcome.documents().len());
        let mut citations = Vec::with_capacity(outcome.documents().len());

        for (document, meta) in outcome.hits() {
            let course = meta.course_title.as_str();
            let header = match meta.lesson_number {
                Some(n) => format!("[{} - Lesson {}]", course, n),
                None => format!("[{}]", course),
            };
            blocks.push(format!("{}\n{}", header, document));

            let link = match meta.lesson_number {
                Some(n) => self.search.lesson_link(course, n).await?,
                None => self.search.course_link(course).await?,
            };
            citations.push(SourceCitation::new(course, meta.lesson_number, link));
        }

        Ok(ToolOutput {
            text: blocks.join("\n\n"),
            citations,
        })
    }
}

fn empty_message(args: &SearchArgs) -> String {
    let mut message = String::from("No relevant content found");
    if let Some(course) = &args.course_name {
        message.push_str(&format!(" in course '{}'", course));
    }
    if let Some(lesson) = &args.lesson_number {
        message.push_str(&format!(" in lesson {}", lesson));
    }
    message.push('.');
    message
}

#[async_trait]
impl Tool for CourseSearchTool {
    fn name(&self) -> &str {
        SEARCH_TOOL_NAME
    }

    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: SEARCH_TOOL_NAME.to_string(),
            description: "Search course materials with smart course name matching and lesson filtering"
                .to_string(),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "query": {
                        "type": "string",
                        "description": "What to search for in the course content"
                    },
                    "course_name": {
                        "type": "string",
                        "description": "Course title (partial matches work, e.g. 'MCP', 'Introduction')"
                    },
                    "lesson_number": {
                        "type": "integer",
                        "description": "Specific lesson number to search within (e.g. 1, 2, 3)"
                    }
                },
                "required": ["query"]
            }),
        }
    }

    async fn execute(&self, args: &serde_json::Value) -> Result<ToolOutput> {
        let args: SearchArgs = serde_json::from_value(args.clone())
            .map_err(|e| SyllabusError::Tool(format!("invalid {} arguments: {}", SEARCH_TOOL_NAME, e)))?;
        self.run(&args).await
    }
}
