//! Unit tests for RequestLoggingMiddleware.

use chat_core::{Method, Middleware, Outcome, RequestContext};

use super::{addr, sample_user};
use crate::RequestLoggingMiddleware;

#[tokio::test]
async fn test_request_log_continues_for_anonymous() {
    let request = RequestContext::anonymous(addr(1)).request(Method::Post, "/users");
    assert!(RequestLoggingMiddleware.before(&request).await.unwrap());
}

#[tokio::test]
async fn test_request_log_continues_for_user() {
    let request =
        RequestContext::authenticated(sample_user(), addr(1)).request(Method::Get, "/conversations");
    assert!(RequestLoggingMiddleware.before(&request).await.unwrap());
    assert!(RequestLoggingMiddleware
        .after(&request, &Outcome::Failed("nope".to_string()))
        .await
        .is_ok());
}
