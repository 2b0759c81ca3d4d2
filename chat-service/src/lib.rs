//! # Chat service
//!
//! Wires chat-storage, chat-middleware and handler-chain into [`ChatService`]. Loads config from env
//! via [`AppConfig`].

pub mod components;
pub mod config;
pub mod service;

pub use components::{
    build_chat_service, build_chat_service_with, build_handler_chain, build_rate_limit_store,
};
pub use config::AppConfig;
pub use service::ChatService;
