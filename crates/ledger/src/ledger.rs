use std::sync::Arc;

use felos_domain::config::{LedgerBackendKind, LedgerConfig};
use felos_domain::error::Result;
use felos_domain::money::Usd;
use felos_domain::trace::TraceEvent;

use crate::jsonl::JsonlLedger;
use crate::memory::MemoryLedger;
use crate::store::LedgerStore;
use crate::summary::{FlowTotals, SessionSummary};
use crate::transaction::Transaction;

/// Front door to the ledger.
///
/// Recording never fails from the caller's point of view and every read
/// degrades to an empty/zero answer when the backend errors. A paid tool
/// that succeeded upstream is still a success even if bookkeeping broke.
#[derive(Clone)]
pub struct Ledger {
    store: Arc<dyn LedgerStore>,
}

impl Ledger {
    pub fn new(store: Arc<dyn LedgerStore>) -> Self {
        Self { store }
    }

    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryLedger::new()))
    }

    /// Build the backend named in config.
    pub fn from_config(cfg: &LedgerConfig) -> Result<Self> {
        let store: Arc<dyn LedgerStore> = match cfg.backend {
            LedgerBackendKind::Memory => Arc::new(MemoryLedger::new()),
            LedgerBackendKind::Jsonl => Arc::new(JsonlLedger::open(&cfg.state_dir)?),
        };
        tracing::info!(backend = store.backend_name(), "ledger ready");
        Ok(Self::new(store))
    }

    pub fn backend_name(&self) -> &'static str {
        self.store.backend_name()
    }

    // ── Writes ─────────────────────────────────────────────────────────

    /// Persist one outgoing entry. Failures are logged and swallowed.
    pub async fn record(
        &self,
        session_id: &str,
        service: &str,
        amount: Usd,
        duration_ms: u64,
        metadata: Option<serde_json::Value>,
    ) {
        let mut tx = Transaction::outgoing(session_id, service, amount, duration_ms);
        tx.metadata = metadata;
        self.append(tx).await;
    }

    /// Persist a settled payment received by the service.
    pub async fn record_incoming(&self, resource: &str, amount: Usd, tx_hash: Option<String>) {
        self.append(Transaction::incoming(resource, amount, tx_hash))
            .await;
    }

    async fn append(&self, tx: Transaction) {
        let session_id = tx.session_id.clone();
        let service = tx.service.clone();
        let amount = tx.amount;

        match self.store.append(tx).await {
            Ok(()) => {
                TraceEvent::LedgerWrite {
                    session_id,
                    service,
                    amount_usd: amount.as_dollars(),
                }
                .emit();
            }
            Err(e) => {
                tracing::warn!(
                    session_id = %session_id,
                    service = %service,
                    amount = %amount,
                    backend = self.store.backend_name(),
                    error = %e,
                    "failed to record transaction"
                );
            }
        }
    }

    // ── Reads ──────────────────────────────────────────────────────────

    /// Total and per-service spend for a session; zero on backend failure.
    pub async fn summarize(&self, session_id: &str) -> SessionSummary {
        match self.store.by_session(session_id).await {
            Ok(entries) => SessionSummary::from_transactions(&entries),
            Err(e) => {
                tracing::warn!(session_id = %session_id, error = %e, "ledger read failed");
                SessionSummary::default()
            }
        }
    }

    /// Most recent entries across sessions; empty on backend failure.
    pub async fn recent(&self, limit: usize) -> Vec<Transaction> {
        self.store.recent(limit).await.unwrap_or_else(|e| {
            tracing::warn!(error = %e, "ledger read failed");
            Vec::new()
        })
    }

    /// Received versus spent over the whole ledger; zero on backend failure.
    pub async fn flow(&self) -> FlowTotals {
        match self.store.all().await {
            Ok(entries) => FlowTotals::from_transactions(&entries),
            Err(e) => {
                tracing::warn!(error = %e, "ledger read failed");
                FlowTotals::default()
            }
        }
    }
}
