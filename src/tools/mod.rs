//! Tools the model can call during a query.
//!
//! Each tool returns its text output together with the source citations it
//! produced; the [`ToolRegistry`] keeps the citations of the latest call so
//! the caller can attach them to the answer.

mod registry;
mod search;

pub use registry::ToolRegistry;
pub use search::{CourseSearchTool, LessonNumber, SearchArgs, SEARCH_TOOL_NAME};

#[cfg(test)]
pub(crate) use search::test_support::StubSearch;

use crate::error::Result;
use crate::model::ToolDefinition;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// A source a tool answer was drawn from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceCitation {
    /// `"<course> - Lesson <n>"`, or just the course title.
    #[serde(rename = "name")]
    pub display_name: String,
    #[serde(rename = "course")]
    pub course_title: String,
    #[serde(rename = "lesson")]
    pub lesson_number: Option<u32>,
    pub link: Option<String>,
}

impl SourceCitation {
    pub fn new(course_title: &str, lesson_number: Option<u32>, link: Option<String>) -> Self {
        let display_name = match lesson_number {
            Some(n) => format!("{} - Lesson {}", course_title, n),
            None => course_title.to_string(),
        };
        Self {
            display_name,
            course_title: course_title.to_string(),
            lesson_number,
            link,
        }
    }
}

/// What a tool execution hands back.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ToolOutput {
    pub text: String,
    pub citations: Vec<SourceCitation>,
}

impl ToolOutput {
    /// Output with no citations.
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            citations: Vec::new(),
        }
    }
}

/// A callable tool with a JSON schema.
#[async_trait]
pub trait Tool: Send + Sync {
    /// Name the model uses to call this tool.
    fn name(&self) -> &str;

    /// Schema advertised to the model.
    fn definition(&self) -> ToolDefinition;

    /// Run the tool with the model-supplied arguments.
    async fn execute(&self, args: &serde_json::Value) -> Result<ToolOutput>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_citation_display_name() {
        let with_lesson = SourceCitation::new("Python Basics", Some(3), None);
        assert_eq!(with_lesson.display_name, "Python Basics - Lesson 3");

        let course_only = SourceCitation::new("Python Basics", None, None);
        assert_eq!(course_only.display_name, "Python Basics");
    }

    #[test]
    fn test_citation_wire_format() {
        let citation = SourceCitation::new(
            "Python Basics",
            Some(1),
            Some("https://example.com/lesson1".to_string()),
        );

        assert_eq!(
            serde_json::to_value(&citation).unwrap(),
            json!({
                "name": "Python Basics - Lesson 1",
                "course": "Python Basics",
                "lesson": 1,
                "link": "https://example.com/lesson1"
            })
        );
    }
}
