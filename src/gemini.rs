pub mod chat;
pub mod client;

pub use chat::{Chat, ChatHistory, ChatSession};
pub use client::{
    Content, GeminiClient, GeminiClientError, GeminiClientErrorKind, GeminiClientOption,
    GeminiKey, Result, Role,
};
