//! Testing utilities for crews.
//!
//! [`ScriptedBackend`] replays canned responses in order so agents, crews
//! and anything built on them can be exercised without a model server.

use crate::backend::ChatBackend;
use async_trait::async_trait;
use llm::{CancellationToken, FinishReason, Request, Response, ToolCall, Usage};
use serde_json::Value;
use std::collections::VecDeque;
use std::sync::{Mutex, PoisonError};

/// A backend that returns scripted responses and records every request.
pub struct ScriptedBackend {
    responses: Mutex<VecDeque<Result<Response, llm::Error>>>,
    requests: Mutex<Vec<Request>>,
    model: String,
}

impl Default for ScriptedBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl ScriptedBackend {
    pub fn new() -> Self {
        Self {
            responses: Mutex::new(VecDeque::new()),
            requests: Mutex::new(Vec::new()),
            model: "scripted".to_string(),
        }
    }

    /// Queue a plain text answer.
    pub fn with_text(self, text: impl Into<String>) -> Self {
        self.push(Ok(text_response(text)));
        self
    }

    /// Queue a turn requesting one tool call. The call id is `call_<n>`,
    /// where `n` is the position of this response in the script.
    pub fn with_tool_call(self, name: impl Into<String>, input: Value) -> Self {
        let id = format!("call_{}", self.queued());
        self.push(Ok(tool_call_response(vec![ToolCall {
            id,
            name: name.into(),
            input,
        }])));
        self
    }

    /// Queue a failure.
    pub fn with_error(self, error: llm::Error) -> Self {
        self.push(Err(error));
        self
    }

    /// Every request received so far.
    pub fn requests(&self) -> Vec<Request> {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Responses not yet consumed.
    pub fn remaining(&self) -> usize {
        self.queued()
    }

    fn queued(&self) -> usize {
        self.responses
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    fn push(&self, response: Result<Response, llm::Error>) {
        self.responses
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push_back(response);
    }
}

#[async_trait]
impl ChatBackend for ScriptedBackend {
    async fn complete(
        &self,
        request: Request,
        cancel: &CancellationToken,
    ) -> Result<Response, llm::Error> {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(request);

        if cancel.is_cancelled() {
            return Err(llm::Error::Cancelled);
        }

        self.responses
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop_front()
            .unwrap_or_else(|| Err(llm::Error::Connection("no scripted responses left".to_string())))
    }

    fn model(&self) -> &str {
        &self.model
    }
}

/// A finished text response.
pub fn text_response(text: impl Into<String>) -> Response {
    Response {
        id: "scripted".to_string(),
        model: "scripted".to_string(),
        content: Some(text.into()),
        tool_calls: Vec::new(),
        finish_reason: FinishReason::Stop,
        usage: Usage::default(),
    }
}

/// A response asking for the given tool calls.
pub fn tool_call_response(tool_calls: Vec<ToolCall>) -> Response {
    Response {
        id: "scripted".to_string(),
        model: "scripted".to_string(),
        content: None,
        tool_calls,
        finish_reason: FinishReason::ToolCalls,
        usage: Usage::default(),
    }
}
