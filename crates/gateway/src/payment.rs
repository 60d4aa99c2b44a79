//! x402 pay-per-request gate for the ad tracking routes.
//!
//! A gated request without an `X-PAYMENT` header is answered with HTTP 402
//! and the payment requirements. A request carrying one has the header
//! (base64 JSON) checked by the facilitator's `/verify` endpoint.

use base64::engine::general_purpose::STANDARD as B64;
use base64::Engine;
use serde::Deserialize;
use serde_json::{json, Value};

use felos_domain::config::{NetworkConfig, NetworkId, PaymentsConfig};
use felos_domain::error::{Error, Result};
use felos_domain::money::Usd;
use felos_providers::util::{from_reqwest, http_client};

pub const X402_VERSION: u32 = 1;

/// A route the gate charges for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PricedRoute {
    pub path: &'static str,
    pub price: Usd,
    pub description: &'static str,
}

/// Outcome of a facilitator check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    Accepted { payer: Option<String> },
    Rejected(String),
}

/// Attached to requests that passed the gate.
#[derive(Debug, Clone)]
pub struct PaymentReceipt {
    pub payer: Option<String>,
}

pub struct PaymentGate {
    enabled: bool,
    network: NetworkId,
    pay_to: String,
    facilitator_url: String,
    max_timeout_seconds: u64,
    routes: [PricedRoute; 2],
    http: reqwest::Client,
}

impl PaymentGate {
    /// `fallback_pay_to` is used when `payments.pay_to` is unset.
    pub fn from_config(
        cfg: &PaymentsConfig,
        network: &NetworkConfig,
        fallback_pay_to: &str,
    ) -> Result<Self> {
        Ok(Self {
            enabled: cfg.enabled,
            network: network.id,
            pay_to: cfg
                .pay_to
                .clone()
                .unwrap_or_else(|| fallback_pay_to.to_owned()),
            facilitator_url: network.facilitator_url().trim_end_matches('/').to_owned(),
            max_timeout_seconds: cfg.max_timeout_seconds,
            routes: [
                PricedRoute {
                    path: "/api/ads/click",
                    price: Usd::from_dollars(cfg.click_price),
                    description: "Ad click tracking",
                },
                PricedRoute {
                    path: "/api/ads/impression",
                    price: Usd::from_dollars(cfg.impression_price),
                    description: "Ad impression",
                },
            ],
            http: http_client(10_000)?,
        })
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn facilitator_url(&self) -> &str {
        &self.facilitator_url
    }

    pub fn routes(&self) -> &[PricedRoute] {
        &self.routes
    }

    pub fn route(&self, path: &str) -> Option<PricedRoute> {
        self.routes.iter().copied().find(|r| r.path == path)
    }

    /// One `accepts` entry. USDC has six decimals, so the atomic amount is
    /// the micro-dollar count.
    pub fn requirements(&self, route: &PricedRoute) -> Value {
        json!({
            "scheme": "exact",
            "network": network_slug(self.network),
            "maxAmountRequired": route.price.micros().to_string(),
            "resource": route.path,
            "description": route.description,
            "mimeType": "application/json",
            "payTo": self.pay_to,
            "maxTimeoutSeconds": self.max_timeout_seconds,
            "asset": self.network.usdc_address(),
            "extra": { "name": "USDC", "version": "2" },
        })
    }

    /// Body of a 402 response.
    pub fn challenge(&self, route: &PricedRoute, error: &str) -> Value {
        json!({
            "x402Version": X402_VERSION,
            "error": error,
            "accepts": [self.requirements(route)],
        })
    }

    /// Ask the facilitator whether `header` pays for `route`.
    pub async fn verify(&self, header: &str, route: &PricedRoute) -> Result<Verdict> {
        let payload = match decode_payment_header(header) {
            Some(p) => p,
            None => return Ok(Verdict::Rejected("malformed X-PAYMENT header".into())),
        };

        #[derive(Deserialize)]
        #[serde(rename_all = "camelCase")]
        struct VerifyResponse {
            #[serde(default)]
            is_valid: bool,
            #[serde(default)]
            invalid_reason: Option<String>,
            #[serde(default)]
            payer: Option<String>,
        }

        let resp = self
            .http
            .post(format!("{}/verify", self.facilitator_url))
            .json(&json!({
                "x402Version": X402_VERSION,
                "paymentPayload": payload,
                "paymentRequirements": self.requirements(route),
            }))
            .send()
            .await
            .map_err(from_reqwest)?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(Error::Facilitator(format!(
                "verify HTTP {}: {body}",
                status.as_u16()
            )));
        }
        let verdict: VerifyResponse = resp.json().await.map_err(from_reqwest)?;
        Ok(if verdict.is_valid {
            Verdict::Accepted {
                payer: verdict.payer,
            }
        } else {
            Verdict::Rejected(
                verdict
                    .invalid_reason
                    .unwrap_or_else(|| "payment rejected".into()),
            )
        })
    }
}

pub const fn network_slug(network: NetworkId) -> &'static str {
    match network {
        NetworkId::BaseSepolia => "base-sepolia",
        NetworkId::Base => "base",
    }
}

fn decode_payment_header(header: &str) -> Option<Value> {
    let bytes = B64.decode(header.trim()).ok()?;
    serde_json::from_slice(&bytes).ok()
}
