//! Test doubles for the transport port
//!
//! `MockTransport` replays scripted responses in order (falling back to a
//! handler when the script runs dry) and records every request it sees.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};

use odatalink_domain::constants::HEADER_CONTENT_TYPE;
use odatalink_domain::{ClientError, HttpResponse, RequestOptions, Result};
use serde_json::Value as Json;

use crate::ports::HttpTransport;

type Handler = Box<dyn FnMut(&RequestOptions) -> HttpResponse + Send>;

#[derive(Default)]
struct MockState {
    scripted: VecDeque<HttpResponse>,
    handler: Option<Handler>,
    requests: Vec<RequestOptions>,
}

/// In-memory transport; clones share the same script and request log.
#[derive(Clone, Default)]
pub struct MockTransport {
    state: Arc<Mutex<MockState>>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, MockState>> {
        self.state.lock().map_err(|_| ClientError::internal("mock transport lock poisoned"))
    }

    pub fn push_response(&self, response: HttpResponse) -> &Self {
        if let Ok(mut state) = self.lock() {
            state.scripted.push_back(response);
        }
        self
    }

    pub fn push_json(&self, status: u16, body: Json) -> &Self {
        self.push_response(
            HttpResponse::new(status, body.to_string())
                .with_header(HEADER_CONTENT_TYPE, "application/json"),
        )
    }

    /// Answer unscripted requests with `handler`.
    pub fn respond_with<F>(&self, handler: F) -> &Self
    where
        F: FnMut(&RequestOptions) -> HttpResponse + Send + 'static,
    {
        if let Ok(mut state) = self.lock() {
            state.handler = Some(Box::new(handler));
        }
        self
    }

    /// Every request sent so far, in order.
    pub fn requests(&self) -> Vec<RequestOptions> {
        self.lock().map(|state| state.requests.clone()).unwrap_or_default()
    }

    pub fn request_count(&self) -> usize {
        self.lock().map(|state| state.requests.len()).unwrap_or_default()
    }
}

impl HttpTransport for MockTransport {
    fn send(&self, request: &RequestOptions) -> Result<HttpResponse> {
        let mut state = self.lock()?;
        state.requests.push(request.clone());
        if let Some(response) = state.scripted.pop_front() {
            return Ok(response);
        }
        match state.handler.as_mut() {
            Some(handler) => Ok(handler(request)),
            None => Err(ClientError::transport(None, request.url.clone(), "no scripted response")),
        }
    }
}

/// Multipart `$batch` response wrapping `parts` in order.
pub fn batch_response(boundary: &str, parts: &[HttpResponse]) -> HttpResponse {
    let mut body = String::new();
    for part in parts {
        body.push_str(&format!("--{boundary}\r\n"));
        body.push_str("Content-Type: application/http\r\n");
        body.push_str("Content-Transfer-Encoding: binary\r\n\r\n");
        body.push_str(&format!("HTTP/1.1 {} {}\r\n", part.status, reason(part.status)));
        for (name, value) in &part.headers {
            body.push_str(&format!("{name}: {value}\r\n"));
        }
        body.push_str("\r\n");
        body.push_str(&part.body);
        body.push_str("\r\n");
    }
    body.push_str(&format!("--{boundary}--\r\n"));
    HttpResponse::new(200, body)
        .with_header(HEADER_CONTENT_TYPE, format!("multipart/mixed; boundary={boundary}"))
}

fn reason(status: u16) -> &'static str {
    match status {
        200 => "OK",
        201 => "Created",
        204 => "No Content",
        400 => "Bad Request",
        404 => "Not Found",
        _ => "Status",
    }
}
