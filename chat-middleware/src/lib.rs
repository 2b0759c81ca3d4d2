//! Request gate middlewares for the handler chain.
//!
//! - [`TimeWindowMiddleware`] – rejects every request inside the closed hours
//! - [`RateLimitMiddleware`] – sliding-log POST limit per remote address, backed by [`RateLimitStore`]
//! - [`RequestLoggingMiddleware`] – one log line per request

mod rate_limit;
mod request_log;
mod time_window;

#[cfg(test)]
mod test;

pub use rate_limit::{RateLimitConfig, RateLimitMiddleware, RateLimitStore};
pub use request_log::RequestLoggingMiddleware;
pub use time_window::TimeWindowMiddleware;

pub const TIME_WINDOW_REJECTION: &str = "Access to the chat is restricted during these hours.";
pub const RATE_LIMIT_REJECTION: &str =
    "Message limit exceeded. Please wait before sending more messages.";
