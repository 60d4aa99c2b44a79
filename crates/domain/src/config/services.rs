use serde::{Deserialize, Serialize};

use super::llm::AuthConfig;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Product scraping
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScrapeConfig {
    /// Firecrawl-compatible API root; `/v1/scrape` is appended.
    #[serde(default = "d_firecrawl_url")]
    pub base_url: String,
    #[serde(default = "d_firecrawl_auth")]
    pub auth: AuthConfig,
    #[serde(default = "d_30000")]
    pub timeout_ms: u64,
    /// Markdown characters used as the description when extraction finds none.
    #[serde(default = "d_300")]
    pub description_chars: usize,
}

impl Default for ScrapeConfig {
    fn default() -> Self {
        Self {
            base_url: d_firecrawl_url(),
            auth: d_firecrawl_auth(),
            timeout_ms: 30_000,
            description_chars: 300,
        }
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Image generation
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ImageBackendKind {
    /// One POST returns the image (URL, base64, or raw bytes).
    #[default]
    Sync,
    /// POST returns a job id that is polled until it reaches a terminal status.
    Job,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImagesConfig {
    #[serde(default)]
    pub backend: ImageBackendKind,
    #[serde(default = "d_fireworks_url")]
    pub base_url: String,
    #[serde(default)]
    pub auth: AuthConfig,
    /// Model used by the chat `generateAdImage` tool.
    #[serde(default = "d_fast_model")]
    pub fast_model: String,
    /// Model used by the five-style ad-creation flow.
    #[serde(default = "d_dev_model")]
    pub dev_model: String,
    #[serde(default)]
    pub job: ImageJobConfig,
    /// Base64 payloads longer than this are parked in the image store and
    /// replaced by an `/api/image/...` reference.
    #[serde(default = "d_inline_limit")]
    pub inline_limit_bytes: usize,
    #[serde(default = "d_placeholder")]
    pub placeholder_url: String,
    #[serde(default = "d_60000")]
    pub timeout_ms: u64,
}

impl Default for ImagesConfig {
    fn default() -> Self {
        Self {
            backend: ImageBackendKind::Sync,
            base_url: d_fireworks_url(),
            auth: AuthConfig::default(),
            fast_model: d_fast_model(),
            dev_model: d_dev_model(),
            job: ImageJobConfig::default(),
            inline_limit_bytes: d_inline_limit(),
            placeholder_url: d_placeholder(),
            timeout_ms: 60_000,
        }
    }
}

/// Asynchronous job backend (Fireworks workflow API shape).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageJobConfig {
    #[serde(default = "d_job_model")]
    pub model: String,
    #[serde(default = "d_1000")]
    pub poll_interval_ms: u64,
    #[serde(default = "d_60")]
    pub max_poll_attempts: u32,
}

impl Default for ImageJobConfig {
    fn default() -> Self {
        Self {
            model: d_job_model(),
            poll_interval_ms: 1_000,
            max_poll_attempts: 60,
        }
    }
}

// ── serde default helpers ───────────────────────────────────────────

fn d_firecrawl_url() -> String {
    "https://api.firecrawl.dev".into()
}
fn d_firecrawl_auth() -> AuthConfig {
    AuthConfig::bearer_from_env("FIRECRAWL_API_KEY")
}
fn d_fireworks_url() -> String {
    "https://api.fireworks.ai/inference/v1".into()
}
fn d_fast_model() -> String {
    "accounts/fireworks/models/flux-1-schnell-fp8".into()
}
fn d_dev_model() -> String {
    "accounts/fireworks/models/flux-1-dev-fp8".into()
}
fn d_job_model() -> String {
    "accounts/fireworks/models/flux-kontext-pro".into()
}
fn d_inline_limit() -> usize {
    16 * 1024
}
fn d_placeholder() -> String {
    "https://placehold.co/512x512/1a1a2e/white?text=Ad+Image".into()
}
fn d_30000() -> u64 {
    30_000
}
fn d_60000() -> u64 {
    60_000
}
fn d_1000() -> u64 {
    1_000
}
fn d_60() -> u32 {
    60
}
fn d_300() -> usize {
    300
}
