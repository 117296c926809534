//! Single point of outbound API calls
//!
//! Attaches the session credential, enforces the request timeout, turns
//! transport failures and error statuses into [`FeedError`], and emits a
//! [`MutationSignal`] after every mutating request.

use crate::api::multipart::Form;
use crate::api::transport::{HttpRequest, Method, Payload, Transport, TransportError};
use crate::config::schema::ApiConfig;
use crate::error::{FeedError, FeedResult};
use crate::session::SessionStore;
use serde::de::DeserializeOwned;
use std::sync::{Arc, RwLock};
use std::time::Duration;
use tracing::{debug, warn};

/// Longest server message echoed back verbatim when it is not JSON
const MAX_RAW_MESSAGE: usize = 200;

/// Request payload
#[derive(Debug, Clone)]
pub enum RequestBody {
    Json(serde_json::Value),
    Multipart(Form),
}

/// Whether a request needs the credential
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AuthMode {
    /// Attach the credential when one is stored
    #[default]
    Optional,
    /// Fail locally with `Auth` when no credential is stored
    Required,
    /// Never attach the credential (signin, signup)
    Anonymous,
}

/// Per-request options
#[derive(Debug, Clone, Default)]
pub struct RequestOptions {
    pub auth: AuthMode,
    pub query: Vec<(&'static str, String)>,
}

impl RequestOptions {
    pub fn authenticated() -> Self {
        Self {
            auth: AuthMode::Required,
            query: Vec::new(),
        }
    }

    pub fn anonymous() -> Self {
        Self {
            auth: AuthMode::Anonymous,
            query: Vec::new(),
        }
    }

    pub fn with_query(mut self, key: &'static str, value: impl ToString) -> Self {
        self.query.push((key, value.to_string()));
        self
    }
}

/// Successful (2xx) response
#[derive(Debug, Clone)]
pub struct ApiResponse {
    pub status: u16,
    pub path: String,
    pub body: String,
}

impl ApiResponse {
    /// Decode the JSON body
    pub fn json<T: DeserializeOwned>(&self) -> FeedResult<T> {
        serde_json::from_str(&self.body).map_err(|e| FeedError::Decode {
            path: self.path.clone(),
            reason: e.to_string(),
        })
    }
}

/// Emitted after a mutating request settles, successfully or not
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MutationSignal {
    pub method: Method,
    pub path: String,
    pub succeeded: bool,
}

type MutationListener = Box<dyn Fn(&MutationSignal) + Send + Sync>;

/// API gateway adapter
pub struct ApiGateway {
    base_url: String,
    timeout: Duration,
    transport: Arc<dyn Transport>,
    session: SessionStore,
    listeners: RwLock<Vec<MutationListener>>,
}

impl ApiGateway {
    pub fn new(config: &ApiConfig, transport: Arc<dyn Transport>, session: SessionStore) -> Self {
        Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            timeout: config.timeout(),
            transport,
            session,
            listeners: RwLock::new(Vec::new()),
        }
    }

    /// Session the credential is read from
    pub fn session(&self) -> &SessionStore {
        &self.session
    }

    /// Register a post-mutation listener
    pub fn on_mutation<F>(&self, listener: F)
    where
        F: Fn(&MutationSignal) + Send + Sync + 'static,
    {
        self.listeners
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(Box::new(listener));
    }

    /// Issue a request against `path` (relative to the configured origin)
    pub async fn request(
        &self,
        method: Method,
        path: &str,
        body: Option<RequestBody>,
        options: RequestOptions,
    ) -> FeedResult<ApiResponse> {
        let credential = match options.auth {
            AuthMode::Anonymous => None,
            _ => self.session.credential(),
        };
        if options.auth == AuthMode::Required && credential.is_none() {
            return Err(FeedError::Auth(format!(
                "{} {} requires a logged-in session",
                method, path
            )));
        }

        let request = self.build(method, path, body, &options, credential.as_deref());
        debug!("Sending {} {} via {}", method, path, self.transport.name());

        let outcome = match tokio::time::timeout(self.timeout, self.transport.send(request)).await {
            Err(_) | Ok(Err(TransportError::Timeout)) => Err(FeedError::Network(format!(
                "request timed out after {}s",
                self.timeout.as_secs()
            ))),
            Ok(Err(TransportError::Connect(reason))) => Err(FeedError::Network(reason)),
            Ok(Ok(response)) if (200..300).contains(&response.status) => Ok(ApiResponse {
                status: response.status,
                path: path.to_string(),
                body: response.body,
            }),
            Ok(Ok(response)) => Err(FeedError::api(
                response.status,
                server_message(response.status, &response.body),
            )),
        };

        if let Err(ref e) = outcome {
            warn!("{} {} failed: {}", method, path, e);
        }

        if method.is_mutating() {
            self.emit(&MutationSignal {
                method,
                path: path.to_string(),
                succeeded: outcome.is_ok(),
            });
        }

        outcome
    }

    fn build(
        &self,
        method: Method,
        path: &str,
        body: Option<RequestBody>,
        options: &RequestOptions,
        credential: Option<&str>,
    ) -> HttpRequest {
        let mut url = format!("{}{}", self.base_url, path);
        for (i, (key, value)) in options.query.iter().enumerate() {
            url.push(if i == 0 { '?' } else { '&' });
            url.push_str(key);
            url.push('=');
            url.push_str(value);
        }

        let mut headers = vec![("Accept".to_string(), "application/json".to_string())];
        if let Some(token) = credential {
            // Endpoints disagree on which header they read; send both.
            headers.push(("token".to_string(), token.to_string()));
            headers.push(("Authorization".to_string(), format!("Bearer {}", token)));
        }

        let body = body.map(|body| match body {
            RequestBody::Json(value) => {
                headers.push(("Content-Type".to_string(), "application/json".to_string()));
                Payload::Bytes(value.to_string().into_bytes())
            }
            RequestBody::Multipart(form) => Payload::Form(form),
        });

        HttpRequest {
            method,
            url,
            headers,
            body,
        }
    }

    fn emit(&self, signal: &MutationSignal) {
        let listeners = self
            .listeners
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        for listener in listeners.iter() {
            listener(signal);
        }
    }
}

/// Extract the message the server meant for the user
fn server_message(status: u16, body: &str) -> String {
    if let Ok(value) = serde_json::from_str::<serde_json::Value>(body) {
        for field in ["error", "message"] {
            if let Some(message) = value.get(field).and_then(|m| m.as_str()) {
                if !message.trim().is_empty() {
                    return message.to_string();
                }
            }
        }
    }

    let raw = body.trim();
    if !raw.is_empty() && raw.len() <= MAX_RAW_MESSAGE && !raw.starts_with('<') {
        return raw.to_string();
    }

    match status {
        400..=499 => format!("request rejected with status {}", status),
        _ => format!("server error {}", status),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::mock::{Reply, ScriptedTransport};
    use serde_json::json;
    use std::sync::Mutex;
    use tempfile::TempDir;

    async fn gateway(transport: Arc<ScriptedTransport>) -> (ApiGateway, TempDir) {
        let temp = TempDir::new().unwrap();
        let session = SessionStore::open(temp.path().join("session.json"))
            .await
            .unwrap();
        let config = ApiConfig {
            base_url: "http://api.test/".to_string(),
            timeout_secs: 1,
            ..ApiConfig::default()
        };
        (ApiGateway::new(&config, transport, session), temp)
    }

    #[tokio::test]
    async fn attaches_both_credential_headers() {
        let transport = ScriptedTransport::new();
        transport.respond(Method::Get, "/posts", Reply::json(200, json!({"posts": []})));
        let (gateway, _temp) = gateway(transport.clone()).await;
        gateway
            .session()
            .set_credential(Some("tok".to_string()))
            .await
            .unwrap();

        gateway
            .request(
                Method::Get,
                "/posts",
                None,
                RequestOptions::default().with_query("limit", 50),
            )
            .await
            .unwrap();

        let sent = transport.requests();
        assert_eq!(sent[0].url, "http://api.test/posts?limit=50");
        assert_eq!(sent[0].header("token"), Some("tok"));
        assert_eq!(sent[0].header("Authorization"), Some("Bearer tok"));
    }

    #[tokio::test]
    async fn required_auth_fails_before_network() {
        let transport = ScriptedTransport::new();
        let (gateway, _temp) = gateway(transport.clone()).await;

        let err = gateway
            .request(Method::Delete, "/posts/p1", None, RequestOptions::authenticated())
            .await
            .unwrap_err();

        assert!(matches!(err, FeedError::Auth(_)));
        assert!(transport.requests().is_empty());
    }

    #[tokio::test]
    async fn anonymous_requests_skip_credential() {
        let transport = ScriptedTransport::new();
        transport.respond(Method::Post, "/users/signin", Reply::json(200, json!({"token": "t"})));
        let (gateway, _temp) = gateway(transport.clone()).await;
        gateway
            .session()
            .set_credential(Some("old".to_string()))
            .await
            .unwrap();

        gateway
            .request(
                Method::Post,
                "/users/signin",
                Some(RequestBody::Json(json!({}))),
                RequestOptions::anonymous(),
            )
            .await
            .unwrap();

        assert_eq!(transport.requests()[0].header("token"), None);
    }

    #[tokio::test]
    async fn error_status_surfaces_server_message() {
        let transport = ScriptedTransport::new();
        transport.respond(
            Method::Post,
            "/users/signin",
            Reply::json(400, json!({"error": "incorrect email or password"})),
        );
        let (gateway, _temp) = gateway(transport).await;

        let err = gateway
            .request(Method::Post, "/users/signin", None, RequestOptions::anonymous())
            .await
            .unwrap_err();

        match err {
            FeedError::Api { status, message } => {
                assert_eq!(status, 400);
                assert_eq!(message, "incorrect email or password");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn offline_is_network_error() {
        let transport = ScriptedTransport::new();
        transport.respond(Method::Get, "/posts", Reply::Offline);
        let (gateway, _temp) = gateway(transport).await;

        let err = gateway
            .request(Method::Get, "/posts", None, RequestOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, FeedError::Network(_)));
    }

    #[tokio::test]
    async fn slow_response_times_out_as_network_error() {
        let transport = ScriptedTransport::new();
        let _gate = transport.respond_gated(Method::Get, "/posts", Reply::json(200, json!({})));
        let (gateway, _temp) = gateway(transport).await;

        let err = gateway
            .request(Method::Get, "/posts", None, RequestOptions::default())
            .await
            .unwrap_err();
        assert!(err.to_string().contains("timed out"));
    }

    #[tokio::test]
    async fn mutations_emit_signal_on_success_and_failure() {
        let transport = ScriptedTransport::new();
        transport.respond(Method::Delete, "/posts/p1", Reply::json(200, json!({})));
        transport.respond(Method::Put, "/comments/c1", Reply::json(500, json!({})));
        transport.respond(Method::Get, "/posts", Reply::json(200, json!({})));
        let (gateway, _temp) = gateway(transport).await;

        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        gateway.on_mutation(move |signal| sink.lock().unwrap().push(signal.clone()));

        gateway
            .request(Method::Delete, "/posts/p1", None, RequestOptions::default())
            .await
            .unwrap();
        let _ = gateway
            .request(Method::Put, "/comments/c1", None, RequestOptions::default())
            .await;
        gateway
            .request(Method::Get, "/posts", None, RequestOptions::default())
            .await
            .unwrap();

        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 2);
        assert!(seen[0].succeeded);
        assert_eq!(seen[1].path, "/comments/c1");
        assert!(!seen[1].succeeded);
    }

    #[test]
    fn server_message_fallbacks() {
        assert_eq!(server_message(400, r#"{"message":"fail"}"#), "fail");
        assert_eq!(server_message(404, "Not Found"), "Not Found");
        assert_eq!(
            server_message(502, "<html>bad gateway</html>"),
            "server error 502"
        );
    }
}
