//! Component factory: builds the store, the gate middleware and the service from config.

use std::sync::Arc;

use anyhow::Result;
use chat_middleware::{
    RateLimitConfig, RateLimitMiddleware, RateLimitStore, RequestLoggingMiddleware,
    TimeWindowMiddleware,
};
use chat_storage::ChatStore;
use chrono::Duration;
use handler_chain::HandlerChain;
use tracing::{error, info, instrument};

use crate::config::AppConfig;
use crate::service::ChatService;

/// Builds the rate limit state shared by every request of one service.
pub fn build_rate_limit_store(config: &AppConfig) -> Arc<RateLimitStore> {
    let rate_config = RateLimitConfig::new(
        config.rate_limit_max_requests,
        Duration::seconds(config.rate_limit_window_secs),
    )
    .with_evict_after_keys(config.rate_limit_idle_evict_after);
    Arc::new(RateLimitStore::new(rate_config))
}

/// Gate order: time window, then rate limit, then the request log.
pub fn build_handler_chain(
    config: &AppConfig,
    time_window: TimeWindowMiddleware,
    rate_limits: Arc<RateLimitStore>,
) -> HandlerChain {
    info!(
        closed_from = config.chat_closed_from_hour,
        closed_until = config.chat_closed_until_hour,
        max_requests = config.rate_limit_max_requests,
        window_secs = config.rate_limit_window_secs,
        "Building handler chain"
    );
    HandlerChain::new()
        .add_middleware(Arc::new(time_window))
        .add_middleware(Arc::new(RateLimitMiddleware::new(rate_limits)))
        .add_middleware(Arc::new(RequestLoggingMiddleware))
}

/// Opens the store and wires the service with the local-time window from config.
#[instrument(skip(config), fields(database_url = %config.database_url))]
pub async fn build_chat_service(config: &AppConfig) -> Result<ChatService> {
    let time_window =
        TimeWindowMiddleware::new(config.chat_closed_from_hour, config.chat_closed_until_hour);
    build_chat_service_with(config, time_window).await
}

/// Same as [`build_chat_service`] with an explicit time window (e.g. pinned to an offset in tests).
pub async fn build_chat_service_with(
    config: &AppConfig,
    time_window: TimeWindowMiddleware,
) -> Result<ChatService> {
    let store = ChatStore::new(&config.database_url).await.map_err(|e| {
        error!(
            error = %e,
            database_url = %config.database_url,
            "Failed to initialize chat storage"
        );
        anyhow::anyhow!("Failed to initialize chat storage: {}", e)
    })?;

    let rate_limits = build_rate_limit_store(config);
    let chain = build_handler_chain(config, time_window, rate_limits.clone());

    Ok(ChatService::new(
        store,
        chain,
        rate_limits,
        config.message_page_size,
    ))
}
