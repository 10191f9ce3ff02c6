//! Prompt templates for Syllabus.
//!
//! Prompts can be customized by placing a `prompts.toml` file in the custom prompts directory.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;

/// Prompt templates used when answering questions.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Prompts {
    /// System prompt sent with every model call.
    pub system: String,
    /// Wrapper applied to the user's query. `{{query}}` is replaced with the question.
    pub query: String,
}

impl Default for Prompts {
    fn default() -> Self {
        Self {
            system: r#"You are an AI assistant specialized in course materials and educational content with access to a comprehensive search tool for course information.

Search Tool Usage:
- Use the search tool **only** for questions about specific course content or detailed educational materials
- You may search again if the first results are not enough to answer, but keep searches to a minimum
- Synthesize search results into accurate, fact-based responses
- If search yields no results, state this clearly without offering alternatives

Response Protocol:
- **General knowledge questions**: Answer using existing knowledge without searching
- **Course-specific questions**: Search first, then answer
- **No meta-commentary**:
 - Provide direct answers only, with no reasoning process, search explanations, or question-type analysis
 - Do not mention "based on the search results"

All responses must be:
1. **Brief, Concise and focused** - Get to the point quickly
2. **Educational** - Maintain instructional value
3. **Clear** - Use accessible language
4. **Example-supported** - Include relevant examples when they aid understanding
Provide only the direct answer to what was asked."#
                .to_string(),

            query: "Answer this question about course materials: {{query}}".to_string(),
        }
    }
}

impl Prompts {
    /// Load prompts, overriding defaults from `<custom_dir>/prompts.toml` when present.
    pub fn load(custom_dir: Option<&str>) -> crate::error::Result<Self> {
        if let Some(dir) = custom_dir {
            let path = PathBuf::from(shellexpand::tilde(dir).to_string()).join("prompts.toml");
            if path.exists() {
                let content = std::fs::read_to_string(&path)?;
                return Ok(toml::from_str(&content)?);
            }
        }

        Ok(Prompts::default())
    }

    /// Render a prompt template with the given variables.
    pub fn render(template: &str, vars: &HashMap<String, String>) -> String {
        let mut result = template.to_string();
        for (key, value) in vars {
            result = result.replace(&format!("{{{{{}}}}}", key), value);
        }
        result
    }

    /// Wrap a user question in the query template.
    pub fn query_prompt(&self, query: &str) -> String {
        let mut vars = HashMap::new();
        vars.insert("query".to_string(), query.to_string());
        Self::render(&self.query, &vars)
    }

    /// System prompt, with prior conversation appended when there is any.
    pub fn system_with_history(&self, history: Option<&str>) -> String {
        match history {
            Some(h) if !h.is_empty() => {
                format!("{}\n\nPrevious conversation:\n{}", self.system, h)
            }
            _ => self.system.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_prompt() {
        let prompts = Prompts::default();
        assert_eq!(
            prompts.query_prompt("What are Python functions?"),
            "Answer this question about course materials: What are Python functions?"
        );
    }

    #[test]
    fn test_system_with_history() {
        let prompts = Prompts::default();
        assert_eq!(prompts.system_with_history(None), prompts.system);
        assert_eq!(prompts.system_with_history(Some("")), prompts.system);

        let history = "User: Previous question\nAssistant: Previous answer";
        let system = prompts.system_with_history(Some(history));
        assert!(system.starts_with(&prompts.system));
        assert!(system.ends_with(&format!("Previous conversation:\n{}", history)));
    }

    #[test]
    fn test_load_custom_prompts() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("prompts.toml"),
            "query = \"Q: {{query}}\"\n",
        )
        .unwrap();

        let prompts = Prompts::load(dir.path().to_str()).unwrap();
        assert_eq!(prompts.query_prompt("hi"), "Q: hi");
        assert!(!prompts.system.is_empty());
    }
}
