//! Core runtime: the chat turn loop and the fixed five-style ad-creation
//! flow. Both produce events on an mpsc channel that the HTTP layer (or the
//! CLI) drains.

pub mod ad_creation;
pub mod prompt;
pub mod turn;

pub use ad_creation::{AdCreation, AdCreationInput};
pub use turn::{Orchestrator, TurnEvent, TurnInput, TurnOutcome, TurnSettings};
