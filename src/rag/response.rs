//! RAG response types.

use crate::tools::SourceCitation;
use serde::{Deserialize, Serialize};

/// An answer with the sources the search tool cited.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryAnswer {
    pub answer: String,
    /// Display names of the cited sources.
    pub sources: Vec<String>,
    pub source_metadata: Vec<SourceCitation>,
}

impl QueryAnswer {
    /// Format the answer for terminal display.
    pub fn format_for_display(&self) -> String {
        let mut output = self.answer.clone();

        if !self.source_metadata.is_empty() {
            output.push_str("\n\n--- Sources ---\n");
            for source in &self.source_metadata {
                output.push_str(&format!("\n{}", source.display_name));
                if let Some(link) = &source.link {
                    output.push_str(&format!("\n  {}", link));
                }
            }
        }

        output
    }
}

/// Summary of the indexed course collection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CourseAnalytics {
    pub total_courses: usize,
    pub course_titles: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_for_display() {
        let answer = QueryAnswer {
            answer: "Loops repeat work.".to_string(),
            sources: vec!["Python Basics - Lesson 2".to_string()],
            source_metadata: vec![SourceCitation::new(
                "Python Basics",
                Some(2),
                Some("https://example.com/python/2".to_string()),
            )],
        };

        assert_eq!(
            answer.format_for_display(),
            "Loops repeat work.\n\n--- Sources ---\n\nPython Basics - Lesson 2\n  https://example.com/python/2"
        );

        let bare = QueryAnswer {
            answer: "4".to_string(),
            sources: Vec::new(),
            source_metadata: Vec::new(),
        };
        assert_eq!(bare.format_for_display(), "4");
    }
}
