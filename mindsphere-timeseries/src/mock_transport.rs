//! Mock HTTP transport for unit testing
//!
//! Replies are scripted up front and handed out in order; every request is
//! recorded so tests can assert on exactly what was sent.

use async_trait::async_trait;
use mindsphere_core::error::{MindSphereError, MindSphereResult};
use parking_lot::Mutex;
use reqwest::header::HeaderValue;
use serde_json::Value;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::trace;

use crate::pagination::LINK_HEADER;
use crate::transport::{HttpTransport, TransportRequest, TransportResponse};

/// Scripted state shared between calls
#[derive(Debug, Default)]
struct MockState {
    replies: VecDeque<MindSphereResult<TransportResponse>>,
    requests: Vec<TransportRequest>,
}

/// Mock transport for unit testing
#[derive(Debug, Default)]
pub struct MockTransport {
    state: Mutex<MockState>,
    calls: AtomicU64,
}

impl MockTransport {
    /// Create a mock with no scripted replies
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a reply
    pub fn push_reply(&self, reply: MindSphereResult<TransportResponse>) -> &Self {
        self.state.lock().replies.push_back(reply);
        self
    }

    /// Queue a 200 response with the given body
    pub fn push_json(&self, data: Value) -> &Self {
        self.push_reply(Ok(TransportResponse::new(200, data)))
    }

    /// Queue a 200 page whose `link` header points at `next`
    pub fn push_page(&self, data: Value, next: &str) -> &Self {
        let link = format!("<{}>; rel=\"next\"", next);
        let response = match HeaderValue::from_str(&link) {
            Ok(value) => TransportResponse::new(200, data).with_header(LINK_HEADER, value),
            Err(_) => TransportResponse::new(200, data),
        };
        self.push_reply(Ok(response))
    }

    /// Queue a response with an arbitrary status and no body
    pub fn push_status(&self, status: u16) -> &Self {
        self.push_reply(Ok(TransportResponse::new(status, Value::Null)))
    }

    /// Queue a transport rejection
    pub fn push_error(&self, error: MindSphereError) -> &Self {
        self.push_reply(Err(error))
    }

    /// Number of requests executed so far
    pub fn call_count(&self) -> u64 {
        self.calls.load(Ordering::Relaxed)
    }

    /// All requests executed so far, in order
    pub fn requests(&self) -> Vec<TransportRequest> {
        self.state.lock().requests.clone()
    }

    /// Number of scripted replies not yet consumed
    pub fn pending_replies(&self) -> usize {
        self.state.lock().replies.len()
    }
}

#[async_trait]
impl HttpTransport for MockTransport {
    async fn execute(&self, request: TransportRequest) -> MindSphereResult<TransportResponse> {
        self.calls.fetch_add(1, Ordering::Relaxed);
        trace!(method = %request.method, url = %request.url, "Mock: executing request");

        let mut state = self.state.lock();
        state.requests.push(request);
        state
            .replies
            .pop_front()
            .unwrap_or_else(|| {
                Err(MindSphereError::transport(
                    "Mock: no scripted reply left",
                ))
            })
    }
}
