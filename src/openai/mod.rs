pub mod client;
pub mod core;

pub use client::{CompletionClient, CompletionError};
pub use self::core::{ChatRequest, ChatResponse, Choice, Message, Role};
