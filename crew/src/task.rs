//! Tasks and their outputs.

/// A natural-language instruction for one agent.
#[derive(Debug, Clone)]
pub struct Task {
    pub description: String,
    pub expected_output: String,
    /// Index of the agent in the crew.
    pub agent: usize,
    /// Indices of earlier tasks whose outputs are fed into this one.
    pub context: Vec<usize>,
}

impl Task {
    pub fn new(
        description: impl Into<String>,
        expected_output: impl Into<String>,
        agent: usize,
    ) -> Self {
        Self {
            description: description.into(),
            expected_output: expected_output.into(),
            agent,
            context: Vec::new(),
        }
    }

    pub fn with_context(mut self, context: Vec<usize>) -> Self {
        self.context = context;
        self
    }

    /// Build the user prompt, appending the outputs of context tasks.
    pub fn render_prompt(&self, context: &[&TaskOutput]) -> String {
        let mut prompt = format!(
            "{}\n\nExpected output: {}",
            self.description.trim(),
            self.expected_output.trim()
        );

        if !context.is_empty() {
            prompt.push_str("\n\nThis is the context you're working with:");
            for output in context {
                prompt.push_str(&format!("\n\n--- {} ---\n{}", output.agent_role, output.raw));
            }
        }

        prompt
    }
}

/// What one task produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskOutput {
    pub agent_role: String,
    pub description: String,
    pub raw: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prompt_without_context() {
        let task = Task::new("  Describe the inn  ", "A paragraph", 0);
        assert_eq!(
            task.render_prompt(&[]),
            "Describe the inn\n\nExpected output: A paragraph"
        );
    }

    #[test]
    fn test_prompt_with_context() {
        let plan = TaskOutput {
            agent_role: "Planner".to_string(),
            description: "plan".to_string(),
            raw: "SEARCH_QUERY_1: \"rust\"".to_string(),
        };
        let task = Task::new("Research", "Notes", 1).with_context(vec![0]);
        let prompt = task.render_prompt(&[&plan]);
        assert!(prompt.contains("--- Planner ---"));
        assert!(prompt.ends_with("SEARCH_QUERY_1: \"rust\""));
    }
}
