//! `POST /api/chat`: runs one orchestrated turn and streams it back.
//!
//! With `Accept: text/event-stream` every [`TurnEvent`] becomes one SSE
//! event named after its `type`. Otherwise the assistant text is streamed
//! as plain text chunks.

use std::convert::Infallible;

use axum::body::{Body, Bytes};
use axum::extract::State;
use axum::http::{header, HeaderMap, HeaderValue};
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::response::{IntoResponse, Response};
use futures_util::stream::Stream;
use tokio::sync::mpsc;

use crate::api::request::parse_conversation;
use crate::runtime::{TurnEvent, TurnInput};
use crate::state::AppState;

pub async fn chat(State(state): State<AppState>, headers: HeaderMap, body: Bytes) -> Response {
    let request = match parse_conversation(&headers, &body) {
        Ok(r) => r,
        Err(e) => return e.into_response(),
    };
    tracing::debug!(
        session_id = %request.session_id,
        messages = request.messages.len(),
        "chat request"
    );

    let rx = state.orchestrator.run_turn(TurnInput {
        session_id: request.session_id,
        messages: request.messages,
    });

    if wants_event_stream(&headers) {
        Sse::new(make_sse_stream(rx))
            .keep_alive(KeepAlive::default())
            .into_response()
    } else {
        let mut resp = Body::from_stream(make_text_stream(rx)).into_response();
        resp.headers_mut().insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static("text/plain; charset=utf-8"),
        );
        resp
    }
}

fn wants_event_stream(headers: &HeaderMap) -> bool {
    headers
        .get(header::ACCEPT)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.contains("text/event-stream"))
}

pub(crate) fn event_name(event: &TurnEvent) -> &'static str {
    match event {
        TurnEvent::AssistantDelta { .. } => "assistant_delta",
        TurnEvent::ToolCallEvent { .. } => "tool_call",
        TurnEvent::ToolResult { .. } => "tool_result",
        TurnEvent::Truncated { .. } => "truncated",
        TurnEvent::Error { .. } => "error",
        TurnEvent::UsageEvent { .. } => "usage",
        TurnEvent::Done { .. } => "done",
    }
}

fn make_sse_stream(
    mut rx: mpsc::Receiver<TurnEvent>,
) -> impl Stream<Item = Result<Event, Infallible>> {
    async_stream::stream! {
        while let Some(event) = rx.recv().await {
            let data = serde_json::to_string(&event).unwrap_or_default();
            yield Ok(Event::default().event(event_name(&event)).data(data));
        }
    }
}

/// Assistant text plus the user-facing notices a plain client needs.
fn make_text_stream(
    mut rx: mpsc::Receiver<TurnEvent>,
) -> impl Stream<Item = Result<String, Infallible>> {
    async_stream::stream! {
        while let Some(event) = rx.recv().await {
            match event {
                TurnEvent::AssistantDelta { text } => yield Ok(text),
                TurnEvent::Error { message, .. } => yield Ok(message),
                TurnEvent::Truncated { rounds, .. } => {
                    yield Ok(format!("\n\n(Stopped after {rounds} tool rounds.)"))
                }
                TurnEvent::ToolCallEvent { .. }
                | TurnEvent::ToolResult { .. }
                | TurnEvent::UsageEvent { .. }
                | TurnEvent::Done { .. } => {}
            }
        }
    }
}
