//! HTTP transport abstraction
//!
//! The gateway talks to the network only through [`Transport`], so tests can
//! script responses while production uses a blocking `ureq` agent driven
//! from tokio's blocking pool.

use crate::api::multipart::{Field, Form};
use async_trait::async_trait;
use std::fmt;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;
use ureq::typestate::WithBody;
use ureq::unversioned::multipart::{Form as WireForm, Part};
use ureq::{Agent, RequestBuilder};

/// HTTP methods used by the API
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    Get,
    Post,
    Put,
    Patch,
    Delete,
}

impl Method {
    /// Whether the request changes server state
    pub fn is_mutating(&self) -> bool {
        !matches!(self, Self::Get)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Patch => "PATCH",
            Self::Delete => "DELETE",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Request body as handed to the transport
#[derive(Debug, Clone)]
pub enum Payload {
    /// Pre-serialized bytes; the content type travels in the headers
    Bytes(Vec<u8>),
    /// `multipart/form-data`, encoded by the transport
    Form(Form),
}

/// A fully built outbound request
#[derive(Debug, Clone)]
pub struct HttpRequest {
    pub method: Method,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: Option<Payload>,
}

impl HttpRequest {
    /// Case-insensitive header lookup
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// Status and body of a completed exchange
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
}

/// Failure to obtain any response
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("connection failed: {0}")]
    Connect(String),

    #[error("request timed out")]
    Timeout,
}

/// Abstract HTTP transport
#[async_trait]
pub trait Transport: Send + Sync {
    /// Perform one exchange. Non-2xx statuses are responses, not errors.
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportError>;

    /// Human-readable transport name for diagnostics
    fn name(&self) -> &'static str;
}

/// Production transport over a shared `ureq` agent
pub struct UreqTransport {
    agent: Agent,
}

impl UreqTransport {
    pub fn new(timeout: Duration) -> Self {
        let config = Agent::config_builder()
            .timeout_global(Some(timeout))
            .http_status_as_error(false)
            .build();
        Self {
            agent: Agent::new_with_config(config),
        }
    }
}

#[async_trait]
impl Transport for UreqTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        let agent = self.agent.clone();
        tokio::task::spawn_blocking(move || execute(&agent, request))
            .await
            .map_err(|e| TransportError::Connect(format!("transport task failed: {}", e)))?
    }

    fn name(&self) -> &'static str {
        "ureq"
    }
}

fn execute(agent: &Agent, request: HttpRequest) -> Result<HttpResponse, TransportError> {
    let HttpRequest {
        method,
        url,
        headers,
        body,
    } = request;
    debug!("{} {}", method, url);

    let result = match method {
        Method::Get => with_headers(agent.get(&url), &headers).call(),
        Method::Delete => with_headers(agent.delete(&url), &headers).call(),
        Method::Post => send_body(with_headers(agent.post(&url), &headers), body),
        Method::Put => send_body(with_headers(agent.put(&url), &headers), body),
        Method::Patch => send_body(with_headers(agent.patch(&url), &headers), body),
    };

    let mut response = result.map_err(classify)?;
    let status = response.status().as_u16();
    let body = response.body_mut().read_to_string().map_err(classify)?;
    debug!("{} {} -> {}", method, url, status);

    Ok(HttpResponse { status, body })
}

fn with_headers<B>(mut builder: RequestBuilder<B>, headers: &[(String, String)]) -> RequestBuilder<B> {
    for (name, value) in headers {
        builder = builder.header(name.as_str(), value.as_str());
    }
    builder
}

fn send_body(
    builder: RequestBuilder<WithBody>,
    body: Option<Payload>,
) -> Result<ureq::http::Response<ureq::Body>, ureq::Error> {
    match body {
        Some(Payload::Bytes(bytes)) => builder.send(&bytes[..]),
        Some(Payload::Form(form)) => builder.send(wire_form(&form)?),
        None => builder.send_empty(),
    }
}

/// ureq sets the `multipart/form-data` content type and boundary itself
fn wire_form(form: &Form) -> Result<WireForm<'_>, ureq::Error> {
    let mut wire = WireForm::new();
    for field in form.fields() {
        wire = match field {
            Field::Text { name, value } => wire.text(name, value),
            Field::File { name, upload } => wire.part(
                name,
                Part::bytes(&upload.bytes)
                    .file_name(&upload.filename)
                    .mime_str(&upload.content_type)?,
            ),
        };
    }
    Ok(wire)
}

fn classify(err: ureq::Error) -> TransportError {
    match err {
        ureq::Error::Timeout(_) => TransportError::Timeout,
        other => TransportError::Connect(other.to_string()),
    }
}
