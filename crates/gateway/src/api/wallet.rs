//! Service wallet status and testnet faucet.
//!
//! - `GET /api/wallet`  balances, x402 role, money-flow stats, recent ledger lines
//! - `POST /api/wallet` request faucet funds (test network only)

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::{json, Value};

use felos_ledger::{Direction, Transaction};

use crate::api::ads::price_label;
use crate::state::AppState;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// GET /api/wallet
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

pub async fn wallet_status(State(state): State<AppState>) -> Response {
    let balance = match state.wallet.balances().await {
        Ok(b) => b,
        Err(e) => {
            tracing::error!(error = %e, "wallet balance lookup failed");
            return (StatusCode::INTERNAL_SERVER_ERROR, Json(unavailable())).into_response();
        }
    };

    let network = state.wallet.network();
    let flow = state.ledger.flow().await;
    let recent = state.ledger.recent(state.config.ledger.recent_limit).await;

    let endpoints: Vec<Value> = state
        .payments
        .routes()
        .iter()
        .map(|r| {
            json!({
                "path": r.path,
                "price": price_label(r.price),
                "description": r.description,
            })
        })
        .collect();

    Json(json!({
        "wallet": {
            "address": state.wallet.address(),
            "network": network.display_name(),
            "chainId": network.caip2(),
            "explorerUrl": network.explorer_url(),
        },
        "balance": balance,
        "x402": {
            "enabled": state.wallet.is_configured(),
            "role": "buyer_and_seller",
            "facilitator": state.payments.facilitator_url(),
            "endpoints": endpoints,
        },
        "stats": {
            "totalReceived": flow.received.display_with(4),
            "totalSpent": flow.spent.display_with(4),
            "netFlow": flow.net().display_with(4),
        },
        "recentTransactions": recent.iter().map(transaction_row).collect::<Vec<_>>(),
    }))
    .into_response()
}

fn transaction_row(tx: &Transaction) -> Value {
    json!({
        "id": tx.id,
        "type": match tx.direction {
            Direction::Incoming => "incoming",
            Direction::Outgoing => "outgoing",
        },
        "service": tx.service,
        "amount": tx.amount,
        "timestamp": tx.timestamp,
        "txHash": tx.tx_hash,
    })
}

/// Same shape as a healthy response, zeroed.
fn unavailable() -> Value {
    json!({
        "wallet": { "address": null, "error": "Wallet not configured" },
        "balance": { "usdc": "0.00", "eth": "0.00" },
        "x402": { "enabled": false },
        "stats": { "totalReceived": "$0.00", "totalSpent": "$0.00", "netFlow": "$0.00" },
        "recentTransactions": [],
    })
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// POST /api/wallet
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

pub async fn request_faucet(State(state): State<AppState>) -> Response {
    if !state.wallet.network().is_testnet() {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": "Faucet only available on testnet (Base Sepolia)" })),
        )
            .into_response();
    }

    match state.wallet.request_faucet().await {
        Ok(receipt) => Json(json!({
            "success": true,
            "message": "Faucet request submitted",
            "transactions": receipt,
        }))
        .into_response(),
        Err(e) => {
            tracing::error!(error = %e, "faucet request failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({
                    "error": "Failed to request faucet funds",
                    "details": e.to_string(),
                })),
            )
                .into_response()
        }
    }
}
