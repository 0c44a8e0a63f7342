//! Core chat types and the completion client abstraction.
//!
//! - [`ChatTurn`] / [`Role`]: one role-tagged message of a transcript
//! - [`ChatRequest`]: the body of a single completion call
//! - [`ChatClient`]: the provider seam; `complete` for one-shot calls, `stream` for
//!   incremental text deltas

use crate::error::AIError;
use async_trait::async_trait;
use futures_core::Stream;
use serde::{Deserialize, Serialize};
use std::fmt::{self, Debug};
use std::pin::Pin;

/// Stream of text deltas from a streamed completion.
pub type TextStream = Pin<Box<dyn Stream<Item = Result<String, AIError>> + Send>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::System => write!(f, "system"),
            Role::User => write!(f, "user"),
            Role::Assistant => write!(f, "assistant"),
        }
    }
}

/// One message in a transcript.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatTurn {
    pub role: Role,
    pub content: String,
}

impl ChatTurn {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self { role, content: content.into() }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::new(Role::System, content)
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }
}

/// Parameters of one chat-completion call. Serializes to the OpenAI request body.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChatRequest {
    pub model: String,
    pub messages: Vec<ChatTurn>,
    pub temperature: f32,
    pub max_tokens: u32,
    pub stream: bool,
}

/// Completion provider abstraction.
///
/// Implementors send a [`ChatRequest`] to a hosted model. `complete` returns the full
/// reply text; `stream` returns the reply as it arrives.
#[async_trait]
pub trait ChatClient: Send + Sync + Debug {
    async fn complete(&self, request: ChatRequest) -> Result<String, AIError>;

    async fn stream(&self, request: ChatRequest) -> Result<TextStream, AIError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_serializes_to_openai_body() {
        let req = ChatRequest {
            model: "gpt-4o-mini".into(),
            messages: vec![ChatTurn::system("be nice"), ChatTurn::user("hi")],
            temperature: 0.5,
            max_tokens: 64,
            stream: true,
        };
        let body = serde_json::to_value(&req).unwrap();
        assert_eq!(body["messages"][0]["role"], "system");
        assert_eq!(body["messages"][1]["content"], "hi");
        assert_eq!(body["stream"], true);
        assert_eq!(body["max_tokens"], 64);
    }
}
