//! Tool dispatch for agents.

use async_trait::async_trait;
use llm::{Tool, ToolResult};
use serde_json::Value;

/// A closed set of tools an agent can call.
///
/// Implementations dispatch on the tool name and report failures as
/// [`ToolResult::error`] instead of returning `Err`, so one bad call never
/// aborts the crew.
#[async_trait]
pub trait Toolbox: Send + Sync {
    /// Definitions of every tool in the box.
    fn definitions(&self) -> Vec<Tool>;

    /// Execute the named tool.
    async fn call(&self, name: &str, input: Value) -> ToolResult;
}

/// A toolbox with nothing in it.
pub struct NoTools;

#[async_trait]
impl Toolbox for NoTools {
    fn definitions(&self) -> Vec<Tool> {
        Vec::new()
    }

    async fn call(&self, name: &str, _input: Value) -> ToolResult {
        ToolResult::error(format!("Unknown tool: {name}"))
    }
}
