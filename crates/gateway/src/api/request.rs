//! Body parsing shared by `/api/chat` and `/api/ad-creation`.
//!
//! Both routes accept either `{messages: [...]}` (a single message object is
//! tolerated too) or `{prompt: {role, content}, threadId}`.

use std::sync::OnceLock;

use axum::body::Bytes;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use regex::Regex;
use serde::Deserialize;
use serde_json::Value;

use felos_domain::tool::{Message, Role};

pub const SESSION_HEADER: &str = "x-session-id";

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum OneOrMany {
    Many(Vec<WireMessage>),
    One(WireMessage),
}

#[derive(Debug, Deserialize)]
struct WireMessage {
    role: String,
    #[serde(default)]
    content: Value,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireBody {
    #[serde(default)]
    messages: Option<OneOrMany>,
    #[serde(default)]
    prompt: Option<WireMessage>,
    #[serde(default)]
    thread_id: Option<String>,
    #[serde(default, rename = "thread_id")]
    thread_id_snake: Option<String>,
    #[serde(default)]
    session_id: Option<String>,
}

/// A parsed conversation request.
#[derive(Debug, Clone, PartialEq)]
pub struct ConversationRequest {
    pub session_id: String,
    /// Oldest first. Tool-role messages from the client are dropped.
    pub messages: Vec<Message>,
}

impl ConversationRequest {
    /// Text of the most recent user message.
    pub fn last_user_text(&self) -> Option<&str> {
        self.messages
            .iter()
            .rev()
            .find(|m| m.role == Role::User)
            .and_then(|m| m.content.text())
    }
}

/// 4xx response with an `{error}` body.
#[derive(Debug)]
pub struct BadRequest(pub String);

impl IntoResponse for BadRequest {
    fn into_response(self) -> Response {
        (
            StatusCode::BAD_REQUEST,
            Json(serde_json::json!({ "error": self.0 })),
        )
            .into_response()
    }
}

pub fn parse_conversation(
    headers: &HeaderMap,
    body: &Bytes,
) -> Result<ConversationRequest, BadRequest> {
    let wire: WireBody = if body.is_empty() {
        WireBody::default()
    } else {
        serde_json::from_slice(body).map_err(|e| BadRequest(format!("invalid JSON body: {e}")))?
    };

    let raw = match (wire.messages, wire.prompt) {
        (Some(OneOrMany::Many(list)), _) => list,
        (Some(OneOrMany::One(msg)), _) => vec![msg],
        (None, Some(prompt)) => vec![prompt],
        (None, None) => return Err(BadRequest("messages or prompt is required".into())),
    };

    let messages: Vec<Message> = raw.into_iter().filter_map(to_message).collect();
    if messages.is_empty() {
        return Err(BadRequest("no usable messages in request".into()));
    }

    let session_id = headers
        .get(SESSION_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::to_owned)
        .or(wire.thread_id)
        .or(wire.thread_id_snake)
        .or(wire.session_id)
        .filter(|s| !s.trim().is_empty())
        .unwrap_or_else(|| format!("session-{}", chrono::Utc::now().timestamp_millis()));

    Ok(ConversationRequest {
        session_id,
        messages,
    })
}

fn to_message(wire: WireMessage) -> Option<Message> {
    let text = content_text(&wire.content);
    match wire.role.as_str() {
        "user" => Some(Message::user(unwrap_content_tag(&text))),
        "assistant" => Some(Message::assistant(text)),
        "system" => Some(Message::system(text)),
        other => {
            tracing::debug!(role = other, "dropping client message");
            None
        }
    }
}

/// Content may be a string or a list of `{type:"text", text}` parts.
fn content_text(content: &Value) -> String {
    match content {
        Value::String(s) => s.clone(),
        Value::Array(parts) => parts
            .iter()
            .filter_map(|p| p.get("text").and_then(Value::as_str))
            .collect::<Vec<_>>()
            .join(""),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

fn content_tag() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"<content[^>]*>([\s\S]*?)</content>").expect("valid regex"))
}

/// Strip a `<content ...>...</content>` wrapper, keeping its inner text.
pub fn unwrap_content_tag(text: &str) -> String {
    match content_tag().captures(text) {
        Some(caps) => caps[1].trim().to_owned(),
        None => text.to_owned(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn parse(body: &str) -> Result<ConversationRequest, BadRequest> {
        parse_conversation(&HeaderMap::new(), &Bytes::from(body.to_owned()))
    }

    #[test]
    fn messages_array() {
        let req = parse(
            r#"{"messages":[{"role":"user","content":"hi"},{"role":"assistant","content":"hello"},{"role":"user","content":"ads please"}],"threadId":"t-1"}"#,
        )
        .unwrap();
        assert_eq!(req.session_id, "t-1");
        assert_eq!(req.messages.len(), 3);
        assert_eq!(req.last_user_text(), Some("ads please"));
    }

    #[test]
    fn prompt_with_content_wrapper() {
        let req = parse(
            r#"{"prompt":{"role":"user","content":"<content source=\"ui\">Make ads for BeanBox</content>"},"threadId":"abc"}"#,
        )
        .unwrap();
        assert_eq!(req.last_user_text(), Some("Make ads for BeanBox"));
    }

    #[test]
    fn single_message_object_is_accepted() {
        let req = parse(r#"{"messages":{"role":"user","content":"one"}}"#).unwrap();
        assert_eq!(req.messages.len(), 1);
        assert!(req.session_id.starts_with("session-"));
    }

    #[test]
    fn tool_messages_are_dropped() {
        let req = parse(
            r#"{"messages":[{"role":"tool","content":"{}"},{"role":"user","content":[{"type":"text","text":"a"},{"type":"text","text":"b"}]}]}"#,
        )
        .unwrap();
        assert_eq!(req.messages.len(), 1);
        assert_eq!(req.last_user_text(), Some("ab"));
    }

    #[test]
    fn header_session_wins() {
        let mut headers = HeaderMap::new();
        headers.insert(SESSION_HEADER, HeaderValue::from_static("hdr"));
        let req = parse_conversation(
            &headers,
            &Bytes::from_static(br#"{"prompt":{"role":"user","content":"x"},"threadId":"body"}"#),
        )
        .unwrap();
        assert_eq!(req.session_id, "hdr");
    }

    #[test]
    fn malformed_bodies_are_rejected() {
        assert!(parse("not json").is_err());
        assert!(parse("{}").is_err());
        assert!(parse(r#"{"messages":[]}"#).is_err());
        assert!(parse("").is_err());
    }
}
