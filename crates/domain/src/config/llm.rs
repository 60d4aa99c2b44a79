use serde::{Deserialize, Serialize};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Completion provider
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// The OpenAI-compatible completion endpoint used for chat turns, ad copy
/// and product extraction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    #[serde(default = "d_provider_id")]
    pub id: String,
    #[serde(default = "d_base_url")]
    pub base_url: String,
    #[serde(default)]
    pub auth: AuthConfig,
    /// Model driving the chat turn and ad copy generation.
    #[serde(default = "d_chat_model")]
    pub chat_model: String,
    /// Model used by the ad-creation flow to pull product details out of
    /// free-form text.
    #[serde(default = "d_extraction_model")]
    pub extraction_model: String,
    /// Per-request HTTP timeout.
    #[serde(default = "d_60000")]
    pub timeout_ms: u64,
    /// Optional override for the built-in chat system prompt.
    #[serde(default)]
    pub system_prompt: Option<String>,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            id: d_provider_id(),
            base_url: d_base_url(),
            auth: AuthConfig::default(),
            chat_model: d_chat_model(),
            extraction_model: d_extraction_model(),
            timeout_ms: 60_000,
            system_prompt: None,
        }
    }
}

/// How a provider's API key is resolved and sent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    /// Header name (e.g. "Authorization", "x-api-key").
    #[serde(default = "d_auth_header")]
    pub header: String,
    /// Header value prefix (e.g. "Bearer ").
    #[serde(default = "d_auth_prefix")]
    pub prefix: String,
    /// Env var containing the key.
    #[serde(default = "d_fireworks_env")]
    pub env: String,
    /// Direct key (for config-only setups; prefer `env`).
    #[serde(default)]
    pub key: Option<String>,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self::bearer_from_env(d_fireworks_env())
    }
}

impl AuthConfig {
    pub fn bearer_from_env(env: impl Into<String>) -> Self {
        Self {
            header: d_auth_header(),
            prefix: d_auth_prefix(),
            env: env.into(),
            key: None,
        }
    }
}

// ── serde default helpers ───────────────────────────────────────────

fn d_provider_id() -> String {
    "fireworks".into()
}
fn d_base_url() -> String {
    "https://api.fireworks.ai/inference/v1".into()
}
fn d_chat_model() -> String {
    "accounts/fireworks/models/llama-v3p1-70b-instruct".into()
}
fn d_extraction_model() -> String {
    "accounts/fireworks/models/llama-v3p3-70b-instruct".into()
}
fn d_60000() -> u64 {
    60_000
}
fn d_auth_header() -> String {
    "Authorization".into()
}
fn d_auth_prefix() -> String {
    "Bearer ".into()
}
fn d_fireworks_env() -> String {
    "FIREWORKS_API_KEY".into()
}
