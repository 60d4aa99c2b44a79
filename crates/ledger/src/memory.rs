use parking_lot::RwLock;

use felos_domain::error::Result;

use crate::store::{newest_first, LedgerStore};
use crate::transaction::Transaction;

/// Process-local ledger. Contents are lost on restart.
#[derive(Default)]
pub struct MemoryLedger {
    entries: RwLock<Vec<Transaction>>,
}

impl MemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

#[async_trait::async_trait]
impl LedgerStore for MemoryLedger {
    async fn append(&self, tx: Transaction) -> Result<()> {
        self.entries.write().push(tx);
        Ok(())
    }

    async fn by_session(&self, session_id: &str) -> Result<Vec<Transaction>> {
        Ok(self
            .entries
            .read()
            .iter()
            .filter(|t| t.session_id == session_id)
            .cloned()
            .collect())
    }

    async fn recent(&self, limit: usize) -> Result<Vec<Transaction>> {
        Ok(newest_first(&self.entries.read(), limit))
    }

    async fn all(&self) -> Result<Vec<Transaction>> {
        Ok(self.entries.read().clone())
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use felos_domain::money::Usd;

    #[tokio::test]
    async fn filters_by_session() {
        let store = MemoryLedger::new();
        store
            .append(Transaction::outgoing("a", "firecrawl", Usd::from_dollars(0.01), 1))
            .await
            .unwrap();
        store
            .append(Transaction::outgoing("b", "fireworks-llm", Usd::from_dollars(0.02), 1))
            .await
            .unwrap();

        let a = store.by_session("a").await.unwrap();
        assert_eq!(a.len(), 1);
        assert_eq!(a[0].service, "firecrawl");
        assert!(store.by_session("missing").await.unwrap().is_empty());
        assert_eq!(store.len(), 2);
    }

    #[tokio::test]
    async fn recent_is_newest_first_and_limited() {
        let store = MemoryLedger::new();
        for i in 0..5 {
            let mut tx = Transaction::outgoing("s", format!("svc-{i}"), Usd::ZERO, 0);
            tx.timestamp += chrono::Duration::seconds(i);
            store.append(tx).await.unwrap();
        }
        let recent = store.recent(3).await.unwrap();
        let names: Vec<_> = recent.iter().map(|t| t.service.as_str()).collect();
        assert_eq!(names, vec!["svc-4", "svc-3", "svc-2"]);
    }
}
