//! Agent personas and the tool-call loop.

use crate::backend::ChatBackend;
use crate::error::CrewError;
use crate::toolbox::Toolbox;
use llm::{CancellationToken, Message, Request, Tool, ToolChoice, ToolResult};
use tracing::{debug, info, warn};

/// A persona submitted to the model together with a task prompt.
#[derive(Debug, Clone)]
pub struct Agent {
    pub role: String,
    pub goal: String,
    pub backstory: String,
    /// Names of the toolbox entries this agent may call.
    pub tools: Vec<String>,
    pub max_tokens: usize,
    pub temperature: Option<f32>,
    /// Upper bound on request/tool rounds for a single task.
    pub max_iterations: usize,
}

impl Agent {
    /// Create a new agent with no tools.
    pub fn new(
        role: impl Into<String>,
        goal: impl Into<String>,
        backstory: impl Into<String>,
    ) -> Self {
        Self {
            role: role.into(),
            goal: goal.into(),
            backstory: backstory.into(),
            tools: Vec::new(),
            max_tokens: 1000,
            temperature: None,
            max_iterations: 8,
        }
    }

    /// Allow the agent to call the named tools.
    pub fn with_tools<I, S>(mut self, tools: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tools = tools.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: usize) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations.max(1);
        self
    }

    /// Render the persona as a system prompt.
    pub fn system_prompt(&self) -> String {
        format!(
            "You are {}.\n\nYour goal: {}\n\nBackground: {}",
            self.role, self.goal, self.backstory
        )
    }

    pub fn can_use(&self, tool: &str) -> bool {
        self.tools.iter().any(|t| t == tool)
    }

    /// Run `prompt` to completion, resolving tool calls through `toolbox`.
    ///
    /// Loops until the model answers without tool calls:
    /// 1. Send the conversation
    /// 2. Execute every requested tool the agent is allowed to use
    /// 3. Append the tool results and repeat
    pub async fn execute(
        &self,
        prompt: &str,
        backend: &dyn ChatBackend,
        toolbox: &dyn Toolbox,
        cancel: &CancellationToken,
    ) -> Result<String, CrewError> {
        let tools: Vec<Tool> = toolbox
            .definitions()
            .into_iter()
            .filter(|tool| self.can_use(&tool.name))
            .collect();

        let mut messages = vec![Message::user(prompt)];

        for iteration in 0..self.max_iterations {
            let mut request = Request::new(messages.clone())
                .with_system(self.system_prompt())
                .with_max_tokens(self.max_tokens);
            if let Some(temperature) = self.temperature {
                request = request.with_temperature(temperature);
            }
            if !tools.is_empty() {
                request = request
                    .with_tools(tools.clone())
                    .with_tool_choice(ToolChoice::Auto);
            }

            let response = backend.complete(request, cancel).await?;

            if !response.wants_tools() {
                info!(
                    agent = %self.role,
                    iterations = iteration + 1,
                    "agent finished task"
                );
                return Ok(response.text().trim().to_string());
            }

            messages.push(Message::assistant_tool_calls(
                response.content.clone(),
                response.tool_calls.clone(),
            ));

            for call in &response.tool_calls {
                if cancel.is_cancelled() {
                    return Err(CrewError::Llm(llm::Error::Cancelled));
                }

                let result = if self.can_use(&call.name) {
                    debug!(agent = %self.role, tool = %call.name, "calling tool");
                    toolbox.call(&call.name, call.input.clone()).await
                } else {
                    ToolResult::error(format!(
                        "Tool '{}' is not available to {}",
                        call.name, self.role
                    ))
                };

                if result.is_error {
                    warn!(agent = %self.role, tool = %call.name, error = %result.content, "tool call failed");
                }
                messages.push(Message::tool_result(call.id.clone(), result.content));
            }
        }

        Err(CrewError::MaxIterations {
            agent: self.role.clone(),
            max: self.max_iterations,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::ScriptedBackend;
    use crate::toolbox::NoTools;
    use async_trait::async_trait;
    use serde_json::{json, Value};

    struct Echo;

    #[async_trait]
    impl Toolbox for Echo {
        fn definitions(&self) -> Vec<Tool> {
            vec![Tool {
                name: "echo".to_string(),
                description: "Echo the input".to_string(),
                input_schema: json!({"type": "object"}),
            }]
        }

        async fn call(&self, _name: &str, input: Value) -> ToolResult {
            ToolResult::success(input.to_string())
        }
    }

    #[test]
    fn test_system_prompt_contains_persona() {
        let agent = Agent::new("Game Master", "Run the game", "A veteran GM");
        let prompt = agent.system_prompt();
        assert!(prompt.contains("Game Master"));
        assert!(prompt.contains("Run the game"));
        assert!(prompt.contains("A veteran GM"));
    }

    #[tokio::test]
    async fn test_plain_answer() {
        let backend = ScriptedBackend::new().with_text("  Hello traveller.  ");
        let agent = Agent::new("GM", "g", "b").with_temperature(0.3);

        let answer = agent
            .execute("hi", &backend, &NoTools, &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(answer, "Hello traveller.");
        let requests = backend.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].temperature, Some(0.3));
        assert!(requests[0].tools.is_none());
    }

    #[tokio::test]
    async fn test_tool_loop_feeds_results_back() {
        let backend = ScriptedBackend::new()
            .with_tool_call("echo", json!({"x": 1}))
            .with_text("done");
        let agent = Agent::new("GM", "g", "b").with_tools(["echo"]);

        let answer = agent
            .execute("go", &backend, &Echo, &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(answer, "done");
        let requests = backend.requests();
        assert_eq!(requests.len(), 2);
        let last = requests[1].messages.last().unwrap();
        assert_eq!(
            last,
            &Message::tool_result("call_0", json!({"x": 1}).to_string())
        );
    }

    #[tokio::test]
    async fn test_tools_filtered_by_agent() {
        let backend = ScriptedBackend::new()
            .with_tool_call("echo", json!({}))
            .with_text("ok");
        let agent = Agent::new("Writer", "g", "b");

        agent
            .execute("go", &backend, &Echo, &CancellationToken::new())
            .await
            .unwrap();

        let requests = backend.requests();
        assert!(requests[0].tools.is_none());
        match requests[1].messages.last().unwrap() {
            Message::Tool { content, .. } => assert!(content.contains("not available")),
            other => panic!("expected tool message, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_max_iterations() {
        let backend = ScriptedBackend::new()
            .with_tool_call("echo", json!({}))
            .with_tool_call("echo", json!({}));
        let agent = Agent::new("GM", "g", "b")
            .with_tools(["echo"])
            .with_max_iterations(2);

        let err = agent
            .execute("go", &backend, &Echo, &CancellationToken::new())
            .await
            .unwrap_err();

        assert!(matches!(err, CrewError::MaxIterations { max: 2, .. }));
    }
}
