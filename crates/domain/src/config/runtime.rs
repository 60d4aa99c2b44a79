use std::path::PathBuf;

use serde::{Deserialize, Serialize};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Turn loop
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TurnConfig {
    /// Maximum completion invocations per turn.
    #[serde(default = "d_10")]
    pub max_rounds: usize,
    /// Wall-clock budget for one turn. Checked before each round and while
    /// the completion stream is consumed.
    #[serde(default = "d_120")]
    pub deadline_secs: u64,
    /// Capacity of the per-turn event channel.
    #[serde(default = "d_64")]
    pub channel_capacity: usize,
    #[serde(default)]
    pub temperature: Option<f32>,
}

impl Default for TurnConfig {
    fn default() -> Self {
        Self {
            max_rounds: 10,
            deadline_secs: 120,
            channel_capacity: 64,
            temperature: None,
        }
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Ledger
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum LedgerBackendKind {
    Memory,
    /// Append-only JSONL files under `state_dir`.
    #[default]
    Jsonl,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerConfig {
    #[serde(default)]
    pub backend: LedgerBackendKind,
    /// Holds `transactions.jsonl` and `ad_events.jsonl`.
    #[serde(default = "d_state_dir")]
    pub state_dir: PathBuf,
    /// Entries shown in the wallet's recent-transactions list.
    #[serde(default = "d_recent")]
    pub recent_limit: usize,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            backend: LedgerBackendKind::Jsonl,
            state_dir: d_state_dir(),
            recent_limit: d_recent(),
        }
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Ephemeral image store
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageStoreConfig {
    /// Least recently used entries are evicted past this count.
    #[serde(default = "d_256")]
    pub max_entries: usize,
    /// Entries older than this are treated as absent and purged.
    #[serde(default = "d_3600")]
    pub ttl_secs: u64,
}

impl Default for ImageStoreConfig {
    fn default() -> Self {
        Self {
            max_entries: 256,
            ttl_secs: 3600,
        }
    }
}

// ── serde default helpers ───────────────────────────────────────────

fn d_10() -> usize {
    10
}
fn d_120() -> u64 {
    120
}
fn d_64() -> usize {
    64
}
fn d_256() -> usize {
    256
}
fn d_3600() -> u64 {
    3600
}
fn d_recent() -> usize {
    10
}
fn d_state_dir() -> PathBuf {
    PathBuf::from("./data/ledger")
}
