use async_trait::async_trait;
use futures_util::stream;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use crate::core::{ChatClient, ChatRequest, TextStream};
use crate::error::AIError;

/// A scripted reply for [`MockClient`].
#[derive(Debug, Clone, PartialEq)]
pub enum MockResponse {
    /// Reply text; streamed back split at whitespace.
    Text(String),
    /// The call itself fails.
    Fail(String),
    /// Streaming yields the given chunks, then fails.
    FailMidStream(Vec<String>, String),
}

impl MockResponse {
    pub fn text(s: impl Into<String>) -> Self {
        Self::Text(s.into())
    }
}

/// Shared view of a [`MockClient`]'s script and the requests it received.
#[derive(Debug, Default)]
pub struct MockHandle {
    responses: Mutex<VecDeque<MockResponse>>,
    requests: Mutex<Vec<ChatRequest>>,
}

impl MockHandle {
    /// Requests received so far, in order.
    pub fn requests(&self) -> Vec<ChatRequest> {
        lock(&self.requests).clone()
    }

    pub fn request_count(&self) -> usize {
        lock(&self.requests).len()
    }
}

fn lock<T>(m: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Mock client for testing that replays scripted responses.
#[derive(Debug, Clone)]
pub struct MockClient {
    handle: Arc<MockHandle>,
}

impl MockClient {
    pub fn new() -> (Self, Arc<MockHandle>) {
        Self::with_responses(Vec::new())
    }

    pub fn with_responses(responses: Vec<MockResponse>) -> (Self, Arc<MockHandle>) {
        let handle = Arc::new(MockHandle {
            responses: Mutex::new(responses.into()),
            requests: Mutex::new(Vec::new()),
        });
        (Self { handle: handle.clone() }, handle)
    }

    fn next(&self, request: ChatRequest) -> Result<MockResponse, AIError> {
        lock(&self.handle.requests).push(request);
        lock(&self.handle.responses)
            .pop_front()
            .ok_or_else(|| AIError::Mock("no scripted response left".to_string()))
    }
}

#[async_trait]
impl ChatClient for MockClient {
    async fn complete(&self, request: ChatRequest) -> Result<String, AIError> {
        match self.next(request)? {
            MockResponse::Text(text) => Ok(text),
            MockResponse::Fail(msg) | MockResponse::FailMidStream(_, msg) => Err(AIError::Mock(msg)),
        }
    }

    async fn stream(&self, request: ChatRequest) -> Result<TextStream, AIError> {
        let items: Vec<Result<String, AIError>> = match self.next(request)? {
            MockResponse::Text(text) => text
                .split_inclusive(char::is_whitespace)
                .map(|chunk| Ok(chunk.to_string()))
                .collect(),
            MockResponse::Fail(msg) => return Err(AIError::Mock(msg)),
            MockResponse::FailMidStream(chunks, msg) => chunks
                .into_iter()
                .map(Ok)
                .chain(std::iter::once(Err(AIError::Mock(msg))))
                .collect(),
        };
        Ok(Box::pin(stream::iter(items)))
    }
}
