use std::sync::Arc;

use felos_domain::config::Config;
use felos_ledger::{AdEventLog, Ledger};
use felos_tools::ImageStore;

use crate::payment::PaymentGate;
use crate::runtime::{AdCreation, Orchestrator};
use crate::wallet::WalletClient;

/// Shared application state passed to all API handlers.
///
/// Fields are grouped by concern:
/// - **Core services**: config
/// - **Runtime**: chat turn loop and the ad-creation flow
/// - **Storage**: ledger, image store, ad event log
/// - **Payments**: service wallet and the x402 gate
/// - **Security**: API token hash
#[derive(Clone)]
pub struct AppState {
    // ── Core services ─────────────────────────────────────────────────
    pub config: Arc<Config>,

    // ── Runtime ───────────────────────────────────────────────────────
    pub orchestrator: Arc<Orchestrator>,
    pub ad_creation: Arc<AdCreation>,

    // ── Storage ───────────────────────────────────────────────────────
    pub ledger: Ledger,
    pub images: Arc<ImageStore>,
    pub ad_events: Arc<AdEventLog>,

    // ── Payments ──────────────────────────────────────────────────────
    pub wallet: Arc<WalletClient>,
    pub payments: Arc<PaymentGate>,

    // ── Security ──────────────────────────────────────────────────────
    /// SHA-256 of the API bearer token, computed once at startup.
    /// `None` disables auth.
    pub api_token_hash: Option<Vec<u8>>,
}
