//! felos gateway: HTTP API, CLI and the turn runtime for the ad-creative
//! chat service.

pub mod api;
pub mod bootstrap;
pub mod cli;
pub mod payment;
pub mod runtime;
pub mod state;
pub mod wallet;
