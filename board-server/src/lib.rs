use std::sync::Arc;

use axum::{
    extract::{Query, State},
    http::{header, HeaderMap, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::{net::TcpListener, sync::RwLock};
use tracing::{debug, info};

pub const NICKNAME_COOKIE: &str = "nickname";

/// Thirty days, in seconds.
pub const LOGIN_MAX_AGE: u64 = 3600 * 24 * 30;

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct MessageList {
    pub messages: Vec<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct ErrorBody {
    pub error: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct ListParams {
    pub limit: Option<usize>,
}

/// Posted messages, oldest first, each stored as `"<nickname>: <text>"`.
pub type Board = Arc<RwLock<Vec<String>>>;

pub fn app() -> Router {
    let board: Board = Arc::new(RwLock::new(Vec::new()));
    Router::new()
        .route("/api/messages", get(list_messages).post(post_message))
        .route("/api/login", post(login).delete(logout))
        .with_state(board)
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    axum::serve(listener, app()).await
}

/// The non-empty `nickname` cookie, if the request carries one.
///
/// Cookie bytes are decoded as UTF-8 so that nicknames issued by `login`
/// outside ASCII are recognised on the way back in.
pub fn nickname(headers: &HeaderMap) -> Option<String> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .map(|v| String::from_utf8_lossy(v.as_bytes()).into_owned())
        .flat_map(|v| {
            v.split(';')
                .filter_map(|pair| pair.trim().split_once('='))
                .find(|(name, _)| *name == NICKNAME_COOKIE)
                .map(|(_, value)| value.trim().to_string())
        })
        .find(|value| !value.is_empty())
}

fn forbidden() -> Response {
    (
        StatusCode::FORBIDDEN,
        Json(ErrorBody {
            error: "Not logged in".to_string(),
        }),
    )
        .into_response()
}

fn bad_request(reason: &'static str) -> Response {
    (StatusCode::BAD_REQUEST, reason).into_response()
}

/// Parse a non-empty JSON object body, or explain why not.
fn json_body(body: &str) -> Result<Value, Response> {
    if body.trim().is_empty() {
        return Err(bad_request("Empty request body"));
    }
    serde_json::from_str(body).map_err(|_| bad_request("Malformed JSON data"))
}

async fn list_messages(
    State(board): State<Board>,
    headers: HeaderMap,
    Query(params): Query<ListParams>,
) -> Response {
    if nickname(&headers).is_none() {
        return forbidden();
    }
    let board = board.read().await;
    let messages = match params.limit {
        Some(limit) if limit > 0 => board.iter().take(limit).cloned().collect(),
        _ => board.clone(),
    };
    Json(MessageList { messages }).into_response()
}

async fn post_message(State(board): State<Board>, headers: HeaderMap, body: String) -> Response {
    let Some(nick) = nickname(&headers) else {
        return forbidden();
    };
    let data = match json_body(&body) {
        Ok(data) => data,
        Err(rejection) => return rejection,
    };
    let message = data.get("message").and_then(Value::as_str).unwrap_or_default();
    if message.is_empty() {
        return bad_request("No message content");
    }

    let entry = format!("{nick}: {message}");
    info!(%entry, "message posted");
    board.write().await.push(entry);
    (StatusCode::CREATED, "Message sent").into_response()
}

async fn login(body: String) -> Response {
    let data = match json_body(&body) {
        Ok(data) => data,
        Err(rejection) => return rejection,
    };
    let nick = data
        .get("nickname")
        .and_then(Value::as_str)
        .unwrap_or("Anonymous");

    let cookie = format!("{NICKNAME_COOKIE}={nick}; HttpOnly; Max-Age={LOGIN_MAX_AGE}");
    let Ok(cookie) = HeaderValue::from_str(&cookie) else {
        return bad_request("Invalid nickname");
    };
    debug!(nick, "logged in");
    (StatusCode::OK, [(header::SET_COOKIE, cookie)], "Logged in").into_response()
}

async fn logout() -> Response {
    (
        StatusCode::OK,
        [(header::SET_COOKIE, HeaderValue::from_static("nickname=; Max-Age=0"))],
        "Logged out",
    )
        .into_response()
}
