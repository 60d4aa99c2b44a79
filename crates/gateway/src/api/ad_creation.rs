//! `POST /api/ad-creation`: the fixed five-style ad flow, streamed as
//! markdown.

use std::convert::Infallible;

use axum::body::{Body, Bytes};
use axum::extract::State;
use axum::http::{header, HeaderMap, HeaderValue};
use axum::response::{IntoResponse, Response};

use crate::api::request::parse_conversation;
use crate::runtime::AdCreationInput;
use crate::state::AppState;

pub async fn create_ads(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let request = match parse_conversation(&headers, &body) {
        Ok(r) => r,
        Err(e) => return e.into_response(),
    };
    let user_text = request.last_user_text().unwrap_or_default().to_owned();

    let mut rx = state.ad_creation.run(AdCreationInput {
        session_id: request.session_id,
        user_text,
    });

    let stream = async_stream::stream! {
        while let Some(chunk) = rx.recv().await {
            yield Ok::<_, Infallible>(chunk);
        }
    };

    let mut resp = Body::from_stream(stream).into_response();
    resp.headers_mut().insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("text/markdown; charset=utf-8"),
    );
    resp
}
