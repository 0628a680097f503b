use tracing::{debug, info};

use super::client::{Content, GeminiClient, GenerateContentRequest, Result, Role};

/// One "append user turn, receive model turn" exchange with a remote model.
pub trait Chat {
    fn send_turn(&mut self, history: &[Content], text: &str) -> Result<String>;
}

impl Chat for GeminiClient {
    fn send_turn(&mut self, history: &[Content], text: &str) -> Result<String> {
        let mut contents = history.to_vec();
        contents.push(Content::new(Role::User, text));
        let request = GenerateContentRequest::new(self.config(), contents);
        self.generate(&request)?.into_text()
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct ChatHistory {
    inner: Vec<Content>,
}
impl ChatHistory {
    pub fn new() -> Self {
        Self { inner: Vec::new() }
    }
    pub fn all(&self) -> &[Content] {
        &self.inner
    }
    pub fn len(&self) -> usize {
        self.inner.len()
    }
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
    fn push_exchange(&mut self, request: impl Into<String>, response: impl Into<String>) {
        self.inner.push(Content::new(Role::User, request));
        self.inner.push(Content::new(Role::Model, response));
    }
}

/// Owns the conversation; history only grows on a completed exchange.
pub struct ChatSession<T: Chat> {
    chat: T,
    history: ChatHistory,
}
impl<T: Chat> ChatSession<T> {
    pub fn new(chat: T) -> Self {
        Self {
            chat,
            history: ChatHistory::new(),
        }
    }
    pub fn send(&mut self, text: &str) -> Result<String> {
        if self.history.is_empty() {
            info!("opening conversation");
        }
        debug!(turns = self.history.len(), "sending user turn");
        let reply = self.chat.send_turn(self.history.all(), text)?;
        self.history.push_exchange(text, reply.as_str());
        info!(turns = self.history.len(), "exchange completed");
        Ok(reply)
    }
    pub fn history(&self) -> &ChatHistory {
        &self.history
    }
    pub fn chat(&self) -> &T {
        &self.chat
    }
}
