//! Scripted [`Transport`] for tests.
//!
//! Outcomes are queued per URL. The last queued outcome for a URL repeats
//! forever; URLs with nothing queued fail as if the host were unreachable.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

use crate::error::ApiError;
use crate::traits::Transport;
use crate::transport::{ApiRequest, ApiResponse};

#[derive(Debug, Clone)]
enum Outcome {
    Respond(ApiResponse),
    Fail,
    Hang,
}

#[derive(Debug, Default)]
pub struct MockTransport {
    routes: Mutex<HashMap<String, VecDeque<Outcome>>>,
    log: Mutex<Vec<ApiRequest>>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    fn push(&self, url: &str, outcome: Outcome) -> &Self {
        self.routes
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .entry(url.to_string())
            .or_default()
            .push_back(outcome);
        self
    }

    /// Answer `url` with `status` and a raw body.
    pub fn respond(&self, url: &str, status: u16, body: &str) -> &Self {
        self.push(url, Outcome::Respond(ApiResponse::new(status, body)))
    }

    /// Answer `url` with `200` and a JSON body.
    pub fn respond_json(&self, url: &str, body: serde_json::Value) -> &Self {
        self.respond(url, 200, &body.to_string())
    }

    /// Fail `url` with a connection error.
    pub fn fail(&self, url: &str) -> &Self {
        self.push(url, Outcome::Fail)
    }

    /// Never answer `url`.
    pub fn hang(&self, url: &str) -> &Self {
        self.push(url, Outcome::Hang)
    }

    /// Every request sent so far, oldest first.
    pub fn requests(&self) -> Vec<ApiRequest> {
        self.log.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    /// How many requests went to `url`.
    pub fn hits(&self, url: &str) -> usize {
        self.log
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .iter()
            .filter(|r| r.url == url)
            .count()
    }

    fn next_outcome(&self, url: &str) -> Outcome {
        let mut routes = self.routes.lock().unwrap_or_else(|e| e.into_inner());
        match routes.get_mut(url) {
            Some(queue) if queue.len() > 1 => queue.pop_front().unwrap_or(Outcome::Fail),
            Some(queue) => queue.front().cloned().unwrap_or(Outcome::Fail),
            None => Outcome::Fail,
        }
    }
}

impl Transport for MockTransport {
    async fn send(&self, request: ApiRequest) -> Result<ApiResponse, ApiError> {
        let outcome = self.next_outcome(&request.url);
        let url = request.url.clone();
        self.log
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(request);

        match outcome {
            Outcome::Respond(resp) => Ok(resp),
            Outcome::Fail => Err(ApiError::Connect(format!("{url}: connection refused"))),
            Outcome::Hang => std::future::pending().await,
        }
    }
}
