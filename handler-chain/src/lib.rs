//! # Handler chain
//!
//! Wraps one operation in the registered middleware: `before` runs in order and may stop the
//! request; the operation runs; `after` runs in reverse order with the operation's outcome.

use std::future::Future;
use std::sync::Arc;

use chat_core::{ChatError, ChatRequest, Middleware, Outcome, Result};
use tracing::{debug, info, instrument};

/// Ordered middleware list shared by every operation of a service.
#[derive(Clone, Default)]
pub struct HandlerChain {
    middleware: Vec<Arc<dyn Middleware>>,
}

impl HandlerChain {
    /// Creates an empty chain.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a middleware (before runs in insertion order, after in reverse).
    pub fn add_middleware(mut self, middleware: Arc<dyn Middleware>) -> Self {
        self.middleware.push(middleware);
        self
    }

    pub fn len(&self) -> usize {
        self.middleware.len()
    }

    pub fn is_empty(&self) -> bool {
        self.middleware.is_empty()
    }

    /// Runs `operation` behind the middleware.
    ///
    /// A middleware that errors in `before` stops the request with that error; one that returns
    /// `Ok(false)` stops it with `PermissionDenied`. Either way the operation and every `after`
    /// are skipped. Once the operation has run, all `after` callbacks run before its result is
    /// returned.
    #[instrument(skip(self, request, operation), fields(method = %request.method, path = %request.path))]
    pub async fn handle<T, F, Fut>(&self, request: &ChatRequest, operation: F) -> Result<T>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        for mw in &self.middleware {
            let mw_name = std::any::type_name_of_val(mw.as_ref());
            debug!(middleware = %mw_name, "step: middleware before");
            if !mw.before(request).await? {
                info!(middleware = %mw_name, "step: middleware before returned false, chain stopped");
                return Err(ChatError::PermissionDenied(
                    "Request rejected by middleware.".to_string(),
                ));
            }
        }

        let result = operation().await;
        let outcome = match &result {
            Ok(_) => Outcome::Completed,
            Err(e) => Outcome::Failed(e.to_string()),
        };

        for mw in self.middleware.iter().rev() {
            let mw_name = std::any::type_name_of_val(mw.as_ref());
            debug!(middleware = %mw_name, "step: middleware after");
            mw.after(request, &outcome).await?;
        }

        result
    }
}
