pub mod openai_compat;
pub mod traits;
pub mod util;
pub(crate) mod sse;

// Re-exports for convenience.
pub use openai_compat::OpenAiCompatProvider;
pub use traits::{ChatRequest, ChatResponse, LlmProvider};
