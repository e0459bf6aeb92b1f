//! The seam between crews and the completion endpoint.

use async_trait::async_trait;
use llm::{CancellationToken, Request, Response};

/// Anything that can answer a chat completion request.
///
/// Implemented for [`llm::Client`]; tests use
/// [`ScriptedBackend`](crate::testing::ScriptedBackend).
#[async_trait]
pub trait ChatBackend: Send + Sync {
    async fn complete(
        &self,
        request: Request,
        cancel: &CancellationToken,
    ) -> Result<Response, llm::Error>;

    /// The model used when a request does not name one.
    fn model(&self) -> &str;
}

#[async_trait]
impl ChatBackend for llm::Client {
    async fn complete(
        &self,
        request: Request,
        cancel: &CancellationToken,
    ) -> Result<Response, llm::Error> {
        self.complete_cancellable(request, cancel).await
    }

    fn model(&self) -> &str {
        llm::Client::model(self)
    }
}
