use async_trait::async_trait;
use chat_core::{ChatRequest, Middleware, Outcome, Result};
use tracing::{debug, info};

/// Logs who called what; always continues.
pub struct RequestLoggingMiddleware;

#[async_trait]
impl Middleware for RequestLoggingMiddleware {
    async fn before(&self, request: &ChatRequest) -> Result<bool> {
        let user = request
            .actor()
            .map(|user| user.email.as_str())
            .unwrap_or("Anonymous");
        info!(
            user = %user,
            method = %request.method,
            path = %request.path,
            remote_addr = %request.remote_addr(),
            "Request"
        );
        Ok(true)
    }

    async fn after(&self, request: &ChatRequest, outcome: &Outcome) -> Result<()> {
        debug!(method = %request.method, path = %request.path, outcome = ?outcome, "Request finished");
        Ok(())
    }
}
