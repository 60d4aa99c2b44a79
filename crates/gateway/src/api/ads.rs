//! Ad click and impression tracking.
//!
//! - `POST /api/ads/click`      records a click (behind the payment gate)
//! - `POST /api/ads/impression` records an impression (behind the payment gate)
//! - `GET` on either path returns its pricing info

use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Deserialize;
use serde_json::json;

use felos_domain::money::Usd;
use felos_ledger::{AdEvent, AdEventKind};

use crate::api::request::BadRequest;
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdEventBody {
    #[serde(default)]
    pub ad_id: Option<String>,
    #[serde(default)]
    pub campaign_id: Option<String>,
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub redirect_url: Option<String>,
    #[serde(default)]
    pub placement: Option<String>,
}

/// Every field is optional, so an empty body is an empty event. Malformed
/// JSON is a 400 with an `{error}` body.
fn parse_ad_event(body: &Bytes) -> Result<AdEventBody, BadRequest> {
    if body.is_empty() {
        return Ok(AdEventBody::default());
    }
    serde_json::from_slice(body).map_err(|e| BadRequest(format!("invalid JSON body: {e}")))
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// POST handlers
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

pub async fn record_click(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let body = match parse_ad_event(&body) {
        Ok(body) => body,
        Err(rejection) => return rejection.into_response(),
    };
    let redirect_url = body.redirect_url.clone();
    let mut event = tracked_event(AdEventKind::Click, body, &headers);
    event.redirect_url = redirect_url.clone();
    let click_id = event.id.clone();

    match state.ad_events.record(event).await {
        Ok(()) => Json(json!({
            "success": true,
            "clickId": click_id,
            "message": "Ad click recorded",
            "redirectUrl": redirect_url,
        }))
        .into_response(),
        Err(e) => {
            tracing::error!(error = %e, "ad click not recorded");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "success": false, "error": "Failed to record click" })),
            )
                .into_response()
        }
    }
}

pub async fn record_impression(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let body = match parse_ad_event(&body) {
        Ok(body) => body,
        Err(rejection) => return rejection.into_response(),
    };
    let placement = body
        .placement
        .clone()
        .filter(|p| !p.trim().is_empty())
        .unwrap_or_else(|| "unknown".into());
    let mut event = tracked_event(AdEventKind::Impression, body, &headers);
    event.placement = Some(placement);
    let impression_id = event.id.clone();

    match state.ad_events.record(event).await {
        Ok(()) => Json(json!({
            "success": true,
            "impressionId": impression_id,
            "message": "Ad impression recorded",
        }))
        .into_response(),
        Err(e) => {
            tracing::error!(error = %e, "ad impression not recorded");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "success": false, "error": "Failed to record impression" })),
            )
                .into_response()
        }
    }
}

fn tracked_event(kind: AdEventKind, body: AdEventBody, headers: &HeaderMap) -> AdEvent {
    let mut event = AdEvent::new(kind, body.ad_id, body.campaign_id, body.user_id);
    if let Some(ip) = header_str(headers, "x-forwarded-for") {
        event.ip = ip;
    }
    if let Some(ua) = header_str(headers, "user-agent") {
        event.user_agent = ua;
    }
    event
}

fn header_str(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty())
        .map(str::to_owned)
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// GET pricing info
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

pub async fn click_pricing(State(state): State<AppState>) -> Json<serde_json::Value> {
    Json(pricing_info(
        &state,
        "/api/ads/click",
        "Record an ad click. Payment required via x402.",
        json!({
            "adId": "string - Unique ad identifier",
            "campaignId": "string - Campaign identifier",
            "userId": "string (optional) - User identifier",
            "redirectUrl": "string (optional) - URL to redirect after click",
        }),
    ))
}

pub async fn impression_pricing(State(state): State<AppState>) -> Json<serde_json::Value> {
    Json(pricing_info(
        &state,
        "/api/ads/impression",
        "Record an ad impression. Payment required via x402.",
        json!({
            "adId": "string - Unique ad identifier",
            "campaignId": "string - Campaign identifier",
            "userId": "string (optional) - User identifier",
            "placement": "string (optional) - Ad placement location",
        }),
    ))
}

fn pricing_info(
    state: &AppState,
    path: &str,
    description: &str,
    parameters: serde_json::Value,
) -> serde_json::Value {
    let price = state
        .payments
        .route(path)
        .map(|r| r.price)
        .unwrap_or(Usd::ZERO);
    json!({
        "endpoint": path,
        "method": "POST",
        "price": format!("{} USDC", price_label(price)),
        "network": state.config.network.id.caip2(),
        "description": description,
        "parameters": parameters,
    })
}

/// `$0.001`, `$0.0001`, `$1`: no padding zeros.
pub fn price_label(price: Usd) -> String {
    format!("${}", price.as_dollars())
}
