use felos_domain::error::Result;

use crate::transaction::Transaction;

/// Storage backend for ledger entries.
///
/// Backends only append and read; nothing is ever updated or deleted.
#[async_trait::async_trait]
pub trait LedgerStore: Send + Sync {
    /// Persist one entry.
    async fn append(&self, tx: Transaction) -> Result<()>;

    /// All entries for a session, oldest first.
    async fn by_session(&self, session_id: &str) -> Result<Vec<Transaction>>;

    /// Up to `limit` entries across all sessions, newest first.
    async fn recent(&self, limit: usize) -> Result<Vec<Transaction>>;

    /// Every entry, oldest first.
    async fn all(&self) -> Result<Vec<Transaction>>;

    /// Short label for logs.
    fn backend_name(&self) -> &'static str;
}

/// Newest-first slice of an oldest-first list.
pub(crate) fn newest_first(entries: &[Transaction], limit: usize) -> Vec<Transaction> {
    let mut out: Vec<Transaction> = entries.iter().rev().take(limit).cloned().collect();
    // Entries arrive in append order, but appends from different tasks can
    // carry timestamps slightly out of order.
    out.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
    out
}
