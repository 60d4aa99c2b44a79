use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use felos_domain::money::Usd;
use felos_domain::pricing::Service;

/// Which way money moved.
///
/// Tool calls are outgoing spend; settled x402 payments on the ad-tracking
/// routes are incoming.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    #[default]
    Outgoing,
    Incoming,
}

/// One ledger line. Created once, never mutated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    pub id: String,
    pub session_id: String,
    pub service: String,
    pub amount: Usd,
    #[serde(default)]
    pub duration_ms: u64,
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub direction: Direction,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tx_hash: Option<String>,
    /// Free-form context, e.g. style and headline for ad-creation images.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<serde_json::Value>,
}

impl Transaction {
    /// A new outgoing entry stamped with a fresh id and the current time.
    pub fn outgoing(
        session_id: impl Into<String>,
        service: impl Into<String>,
        amount: Usd,
        duration_ms: u64,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            session_id: session_id.into(),
            service: service.into(),
            amount,
            duration_ms,
            timestamp: Utc::now(),
            direction: Direction::Outgoing,
            tx_hash: None,
            metadata: None,
        }
    }

    /// A settled payment received on one of the ad-tracking routes.
    pub fn incoming(resource: impl Into<String>, amount: Usd, tx_hash: Option<String>) -> Self {
        Self {
            direction: Direction::Incoming,
            tx_hash,
            ..Self::outgoing("x402", resource, amount, 0)
        }
    }

    /// Shorthand for entries priced from the pricing table.
    pub fn for_service(session_id: &str, service: Service, amount: Usd, duration_ms: u64) -> Self {
        Self::outgoing(session_id, service.ledger_name(), amount, duration_ms)
    }

    pub fn with_metadata(mut self, metadata: serde_json::Value) -> Self {
        self.metadata = Some(metadata);
        self
    }
}
