//! LLM completion contracts.
//!
//! The wire protocol is owned by whichever provider crate implements
//! [`CompletionClient`]; the core only needs completions and, optionally,
//! a token stream.

pub mod client;
pub mod types;

pub use client::{CompletionClient, CompletionStream};
pub use types::{ChatMessage, CompletionRequest, CompletionResponse, Role, StreamChunk, Usage};
