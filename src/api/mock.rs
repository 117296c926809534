//! Scripted transport for unit tests

use crate::api::transport::{HttpRequest, HttpResponse, Method, Transport, TransportError};
use async_trait::async_trait;
use std::sync::{Arc, Mutex};
use tokio::sync::Notify;

/// Canned outcome for one request
#[derive(Debug, Clone)]
pub enum Reply {
    Status(u16, String),
    Offline,
}

impl Reply {
    pub fn json(status: u16, body: serde_json::Value) -> Self {
        Self::Status(status, body.to_string())
    }
}

struct Expectation {
    method: Method,
    path: String,
    reply: Reply,
    gate: Option<Arc<Notify>>,
}

/// Answers requests from a list of one-shot expectations matched by method
/// and path, in registration order. Unmatched requests fail as offline.
#[derive(Default)]
pub struct ScriptedTransport {
    expectations: Mutex<Vec<Expectation>>,
    requests: Mutex<Vec<HttpRequest>>,
}

impl ScriptedTransport {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn respond(&self, method: Method, path: &str, reply: Reply) {
        self.push(method, path, reply, None);
    }

    /// Like `respond`, but the reply is held until the returned gate is notified
    pub fn respond_gated(&self, method: Method, path: &str, reply: Reply) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        self.push(method, path, reply, Some(gate.clone()));
        gate
    }

    /// Every request received so far
    pub fn requests(&self) -> Vec<HttpRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    fn push(&self, method: Method, path: &str, reply: Reply, gate: Option<Arc<Notify>>) {
        self.expectations.lock().unwrap().push(Expectation {
            method,
            path: path.to_string(),
            reply,
            gate,
        });
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        let path = path_of(&request.url);
        let method = request.method;
        self.requests.lock().unwrap().push(request);

        let expectation = {
            let mut expectations = self.expectations.lock().unwrap();
            expectations
                .iter()
                .position(|e| e.method == method && e.path == path)
                .map(|i| expectations.remove(i))
        };

        let Some(expectation) = expectation else {
            return Err(TransportError::Connect(format!(
                "no scripted reply for {} {}",
                method, path
            )));
        };

        if let Some(gate) = expectation.gate {
            gate.notified().await;
        }

        match expectation.reply {
            Reply::Status(status, body) => Ok(HttpResponse { status, body }),
            Reply::Offline => Err(TransportError::Connect("network unreachable".to_string())),
        }
    }

    fn name(&self) -> &'static str {
        "scripted"
    }
}

/// Path component of an absolute URL, without the query
fn path_of(url: &str) -> String {
    let without_scheme = url.split_once("://").map_or(url, |(_, rest)| rest);
    let path = without_scheme
        .find('/')
        .map_or("/", |i| &without_scheme[i..]);
    path.split('?').next().unwrap_or(path).to_string()
}
