//! Request construction and exchanges against the message-board API.
//!
//! # Design
//! `Probe` holds only the target and its limits and carries no state
//! between calls. Each operation is split into a `build_*` method that
//! produces an `HttpRequest` without touching the network, and an I/O
//! method that consumes a fresh `Connection` for the exchange. Header order
//! is fixed: `Host`, then `Content-Type` if there is a body, then `Cookie`
//! if there is an identity, then `Content-Length` if there is a body.

use serde::Serialize;
use tracing::warn;

use crate::connection::{self, Connection};
use crate::error::ProbeError;
use crate::http::{HttpMethod, HttpRequest, HttpResponse};
use crate::types::{Identity, ProbeConfig, Target};

/// Endpoint for posting and listing messages.
pub const MESSAGES_PATH: &str = "/api/messages";

/// Endpoint for logging in (POST) and out (DELETE).
pub const LOGIN_PATH: &str = "/api/login";

#[derive(Serialize)]
struct LoginBody<'a> {
    nickname: &'a str,
}

/// Client for the message-board endpoints of one target.
#[derive(Debug, Clone)]
pub struct Probe {
    target: Target,
    config: ProbeConfig,
}

impl Probe {
    pub fn new(target: Target, config: ProbeConfig) -> Self {
        Self { target, config }
    }

    pub fn target(&self) -> &Target {
        &self.target
    }

    pub fn config(&self) -> &ProbeConfig {
        &self.config
    }

    /// POST a message. The body is `{"message": "<message>"}` with the text
    /// inserted verbatim, so quotes or backslashes in `message` yield
    /// invalid JSON.
    pub fn build_send_message(&self, identity: Option<&Identity>, message: &str) -> HttpRequest {
        if message.contains(|c: char| c == '"' || c == '\\') {
            warn!(text = message, "message contains characters that are not escaped in the JSON body");
        }
        let body = format!("{{\"message\": \"{message}\"}}");
        self.request(HttpMethod::Post, MESSAGES_PATH, identity, Some(body))
    }

    pub fn build_fetch_messages(&self, identity: Option<&Identity>) -> HttpRequest {
        self.request(HttpMethod::Get, MESSAGES_PATH, identity, None)
    }

    pub fn build_login(&self, nickname: &str) -> Result<HttpRequest, ProbeError> {
        let body = serde_json::to_string(&LoginBody { nickname })
            .map_err(|e| ProbeError::InvalidArgument(format!("login body: {e}")))?;
        Ok(self.request(HttpMethod::Post, LOGIN_PATH, None, Some(body)))
    }

    pub fn build_logout(&self, identity: Option<&Identity>) -> HttpRequest {
        self.request(HttpMethod::Delete, LOGIN_PATH, identity, None)
    }

    fn request(
        &self,
        method: HttpMethod,
        path: &str,
        identity: Option<&Identity>,
        body: Option<String>,
    ) -> HttpRequest {
        let mut headers = vec![("Host".to_string(), self.target.host().to_string())];
        if body.is_some() {
            headers.push(("Content-Type".to_string(), "application/json".to_string()));
        }
        if let Some(identity) = identity {
            headers.push(("Cookie".to_string(), identity.cookie()));
        }
        if let Some(body) = &body {
            headers.push(("Content-Length".to_string(), body.len().to_string()));
        }
        HttpRequest {
            method,
            path: path.to_string(),
            headers,
            body,
        }
    }

    pub fn connect(&self) -> Result<Connection, ProbeError> {
        connection::connect(&self.target, &self.config)
    }

    pub fn send_message(
        &self,
        connection: Connection,
        identity: Option<&Identity>,
        message: &str,
    ) -> Result<HttpResponse, ProbeError> {
        connection.exchange(&self.build_send_message(identity, message))
    }

    pub fn fetch_messages(
        &self,
        connection: Connection,
        identity: Option<&Identity>,
    ) -> Result<HttpResponse, ProbeError> {
        connection.exchange(&self.build_fetch_messages(identity))
    }

    pub fn login(&self, connection: Connection, nickname: &str) -> Result<HttpResponse, ProbeError> {
        connection.exchange(&self.build_login(nickname)?)
    }

    pub fn logout(
        &self,
        connection: Connection,
        identity: Option<&Identity>,
    ) -> Result<HttpResponse, ProbeError> {
        connection.exchange(&self.build_logout(identity))
    }

    /// Open a fresh connection and run `request` over it.
    pub fn exchange(&self, request: &HttpRequest) -> Result<HttpResponse, ProbeError> {
        self.connect()?.exchange(request)
    }
}
