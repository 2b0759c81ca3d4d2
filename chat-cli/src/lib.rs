//! # chat-cli
//!
//! Argument parsing for the `chat` binary.

pub mod cli;

pub use cli::{Cli, Commands};
