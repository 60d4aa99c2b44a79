//! The ad-generation tool set.
//!
//! - `scrapeProduct`: product page extraction
//! - `generateAdCopy`: three ad copy variations from the LLM
//! - `generateAdImage`: image generation, sync or job-based
//! - `getSpendingReport`: per-session spend versus subscriptions
//! - `createExecutionPlan`: zero-cost planning echo
//!
//! [`ToolRegistry`] owns the collaborators and is the single dispatch point
//! used by the turn loop.

pub mod copy;
pub mod error;
pub mod image;
pub mod image_store;
pub mod plan;
pub mod registry;
pub mod report;
pub mod scrape;

pub use copy::{AdVariation, CopyRequest, Copywriter};
pub use error::ToolError;
pub use image::{ImageBackend, ImagePayload, JobImageBackend, SyncImageBackend};
pub use image_store::ImageStore;
pub use registry::{ToolExecutor, ToolInvocation, ToolRegistry};
pub use scrape::{FirecrawlScraper, ProductData, ProductScraper};
