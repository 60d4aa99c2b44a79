pub mod config;
pub mod error;
pub mod money;
pub mod pricing;
pub mod stream;
pub mod tool;
pub mod trace;
