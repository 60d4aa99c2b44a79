use std::collections::BTreeMap;

use serde::Serialize;

use felos_domain::money::Usd;

use crate::transaction::{Direction, Transaction};

/// Spend for one session, broken down by service.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSummary {
    pub total: Usd,
    pub by_service: BTreeMap<String, Usd>,
    pub count: usize,
}

impl SessionSummary {
    /// Fold outgoing entries; incoming payments are not spend.
    pub fn from_transactions<'a>(entries: impl IntoIterator<Item = &'a Transaction>) -> Self {
        let mut summary = Self::default();
        for tx in entries {
            if tx.direction != Direction::Outgoing {
                continue;
            }
            summary.total += tx.amount;
            *summary.by_service.entry(tx.service.clone()).or_default() += tx.amount;
            summary.count += 1;
        }
        summary
    }
}

/// Money in versus money out across the whole ledger.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct FlowTotals {
    pub received: Usd,
    pub spent: Usd,
}

impl FlowTotals {
    pub fn from_transactions<'a>(entries: impl IntoIterator<Item = &'a Transaction>) -> Self {
        entries
            .into_iter()
            .fold(Self::default(), |mut acc, tx| {
                match tx.direction {
                    Direction::Incoming => acc.received += tx.amount,
                    Direction::Outgoing => acc.spent += tx.amount,
                }
                acc
            })
    }

    pub fn net(&self) -> Usd {
        self.received - self.spent
    }
}
