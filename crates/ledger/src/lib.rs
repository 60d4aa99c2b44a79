//! Per-session transaction ledger and ad event log.
//!
//! Paid tools append one [`Transaction`] per successful call. The
//! [`Ledger`] facade sits in front of a [`LedgerStore`] backend (in-memory
//! or JSONL on disk) and never lets a backend failure escape into a turn:
//! writes are logged and swallowed, reads fall back to zero.

pub mod events;
pub mod jsonl;
pub mod ledger;
pub mod memory;
pub mod store;
pub mod summary;
pub mod transaction;

pub use events::{AdEvent, AdEventKind, AdEventLog};
pub use jsonl::JsonlLedger;
pub use ledger::Ledger;
pub use memory::MemoryLedger;
pub use store::LedgerStore;
pub use summary::{FlowTotals, SessionSummary};
pub use transaction::{Direction, Transaction};
