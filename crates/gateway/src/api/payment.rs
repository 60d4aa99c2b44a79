//! x402 middleware for the ad-tracking routes.
//!
//! Only `POST` is charged; the `GET` pricing info stays free. Attach via
//! `axum::middleware::from_fn_with_state`.

use axum::body::Body;
use axum::extract::State;
use axum::http::{Method, Request, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use axum::Json;

use felos_domain::trace::TraceEvent;

use crate::payment::{PaymentReceipt, Verdict};
use crate::state::AppState;

pub const PAYMENT_HEADER: &str = "x-payment";

pub async fn require_payment(
    State(state): State<AppState>,
    mut req: Request<Body>,
    next: Next,
) -> Response {
    if !state.payments.is_enabled() || req.method() != Method::POST {
        return next.run(req).await;
    }
    let Some(route) = state.payments.route(req.uri().path()) else {
        return next.run(req).await;
    };

    let header = req
        .headers()
        .get(PAYMENT_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::to_owned);
    let Some(header) = header else {
        return payment_required(&state, &route, "X-PAYMENT header is required");
    };

    match state.payments.verify(&header, &route).await {
        Ok(Verdict::Accepted { payer }) => {
            TraceEvent::PaymentChecked {
                resource: route.path.to_owned(),
                accepted: true,
            }
            .emit();
            state
                .ledger
                .record_incoming(route.path, route.price, None)
                .await;
            req.extensions_mut().insert(PaymentReceipt { payer });
            next.run(req).await
        }
        Ok(Verdict::Rejected(reason)) => {
            TraceEvent::PaymentChecked {
                resource: route.path.to_owned(),
                accepted: false,
            }
            .emit();
            tracing::info!(resource = route.path, reason = %reason, "payment rejected");
            payment_required(&state, &route, &reason)
        }
        Err(e) => {
            tracing::error!(resource = route.path, error = %e, "facilitator unreachable");
            (
                StatusCode::BAD_GATEWAY,
                Json(serde_json::json!({ "error": "payment verification unavailable" })),
            )
                .into_response()
        }
    }
}

fn payment_required(state: &AppState, route: &crate::payment::PricedRoute, error: &str) -> Response {
    (
        StatusCode::PAYMENT_REQUIRED,
        Json(state.payments.challenge(route, error)),
    )
        .into_response()
}
