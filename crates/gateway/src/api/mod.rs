pub mod ad_creation;
pub mod ads;
pub mod auth;
pub mod chat;
pub mod image;
pub mod payment;
pub mod request;
pub mod wallet;

use axum::middleware;
use axum::routing::{get, post};
use axum::{Json, Router};

use crate::state::AppState;

/// Build the full API router.
///
/// Routes are split into **public** (health and the image route, which
/// browsers load from `<img>` tags) and **protected** (behind the bearer
/// token middleware). The ad-tracking routes additionally sit behind the
/// x402 payment gate.
pub fn router(state: AppState) -> Router<AppState> {
    let public = Router::new()
        .route("/api/health", get(health))
        .route("/api/image/:image_id", get(image::get_image));

    let ads = Router::new()
        .route(
            "/api/ads/click",
            get(ads::click_pricing).post(ads::record_click),
        )
        .route(
            "/api/ads/impression",
            get(ads::impression_pricing).post(ads::record_impression),
        )
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            payment::require_payment,
        ));

    let protected = Router::new()
        .route("/api/chat", post(chat::chat))
        .route("/api/ad-creation", post(ad_creation::create_ads))
        .route(
            "/api/wallet",
            get(wallet::wallet_status).post(wallet::request_faucet),
        )
        .merge(ads)
        .route_layer(middleware::from_fn_with_state(
            state,
            auth::require_api_token,
        ));

    public.merge(protected)
}

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}
