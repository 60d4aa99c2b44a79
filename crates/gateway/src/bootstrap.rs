//! AppState construction extracted from `main.rs`.
//!
//! `serve` and `run` share [`build_app_state`] so the one-shot CLI turn
//! boots exactly the same runtime as the HTTP server.

use std::sync::Arc;

use anyhow::Context;
use sha2::{Digest, Sha256};

use felos_domain::config::{
    AuthConfig, Config, ConfigSeverity, ImageBackendKind, ImagesConfig, LedgerBackendKind,
};
use felos_domain::pricing::PricingTable;
use felos_ledger::{AdEventLog, Ledger};
use felos_providers::util::resolve_api_key;
use felos_providers::{LlmProvider, OpenAiCompatProvider};
use felos_tools::image::{FireworksWorkflowApi, ImageParams, PollPolicy};
use felos_tools::{
    Copywriter, FirecrawlScraper, ImageBackend, ImageStore, JobImageBackend, SyncImageBackend,
    ToolExecutor, ToolRegistry,
};

use crate::payment::PaymentGate;
use crate::runtime::prompt::system_prompt;
use crate::runtime::{AdCreation, Orchestrator, TurnSettings};
use crate::state::AppState;
use crate::wallet::WalletClient;

/// Validate config, initialize every subsystem and return a fully-wired
/// [`AppState`].
pub async fn build_app_state(config: Arc<Config>) -> anyhow::Result<AppState> {
    // ── Config validation ────────────────────────────────────────────
    let issues = config.validate();
    for issue in &issues {
        match issue.severity {
            ConfigSeverity::Warning => tracing::warn!("config: {issue}"),
            ConfigSeverity::Error => tracing::error!("config: {issue}"),
        }
    }
    if issues.iter().any(|i| i.severity == ConfigSeverity::Error) {
        anyhow::bail!(
            "config validation failed with {} error(s)",
            issues
                .iter()
                .filter(|i| i.severity == ConfigSeverity::Error)
                .count()
        );
    }

    let pricing = PricingTable::from_config(&config.pricing);

    // ── Completion provider ──────────────────────────────────────────
    let llm_key = optional_key("llm", &config.llm.auth).unwrap_or_default();
    let llm: Arc<dyn LlmProvider> = Arc::new(
        OpenAiCompatProvider::from_config(&config.llm, &llm_key)
            .context("initializing completion provider")?,
    );
    tracing::info!(
        provider = llm.provider_id(),
        model = llm.default_model(),
        base_url = %config.llm.base_url,
        "completion provider ready"
    );

    // ── Storage ──────────────────────────────────────────────────────
    let ledger = Ledger::from_config(&config.ledger).context("opening transaction ledger")?;
    let ad_events = Arc::new(match config.ledger.backend {
        LedgerBackendKind::Memory => AdEventLog::in_memory(),
        LedgerBackendKind::Jsonl => {
            AdEventLog::open(&config.ledger.state_dir).context("opening ad event log")?
        }
    });
    let images = Arc::new(ImageStore::from_config(&config.image_store));
    tracing::info!(
        max_entries = config.image_store.max_entries,
        ttl_secs = config.image_store.ttl_secs,
        "image store ready"
    );

    // ── Tool collaborators ───────────────────────────────────────────
    let scrape_key = optional_key("scrape", &config.scrape.auth);
    let scraper = Arc::new(
        FirecrawlScraper::from_config(&config.scrape, scrape_key.as_deref())
            .context("initializing scraper")?,
    );

    let image_key = optional_key("images", &config.images.auth);
    let chat_images = image_backend(
        &config.images,
        &config.images.fast_model,
        ImageParams::FAST,
        image_key.as_deref(),
    )?;
    let ad_images = image_backend(
        &config.images,
        &config.images.dev_model,
        ImageParams::DEV,
        image_key.as_deref(),
    )?;
    tracing::info!(backend = chat_images.backend_name(), "image backends ready");

    let registry = ToolRegistry::new(
        scraper,
        Copywriter::new(Arc::clone(&llm)).with_model(config.llm.chat_model.clone()),
        chat_images,
        Arc::clone(&images),
        ledger.clone(),
        pricing.clone(),
    )
    .with_inline_limit(config.images.inline_limit_bytes);
    let tools: Arc<dyn ToolExecutor> = Arc::new(registry);
    tracing::info!(tools = tools.definitions().len(), "tool registry ready");

    // ── Runtime ──────────────────────────────────────────────────────
    let prompt = config
        .llm
        .system_prompt
        .clone()
        .unwrap_or_else(|| system_prompt(&pricing));
    let orchestrator = Arc::new(Orchestrator::new(
        Arc::clone(&llm),
        tools,
        TurnSettings::from_config(&config.turn, prompt),
    ));
    let ad_creation = Arc::new(AdCreation::new(
        Arc::clone(&llm),
        config.llm.extraction_model.clone(),
        ad_images,
        Arc::clone(&images),
        ledger.clone(),
        pricing.clone(),
        config.images.placeholder_url.clone(),
        config.images.inline_limit_bytes,
    ));
    tracing::info!(
        max_rounds = config.turn.max_rounds,
        deadline_secs = config.turn.deadline_secs,
        "turn runtime ready"
    );

    // ── Payments ─────────────────────────────────────────────────────
    let wallet = Arc::new(
        WalletClient::from_config(&config.network, &config.wallet)
            .context("initializing wallet client")?,
    );
    let payments = Arc::new(
        PaymentGate::from_config(&config.payments, &config.network, wallet.address())
            .context("initializing payment gate")?,
    );
    tracing::info!(
        network = config.network.id.caip2(),
        address = %wallet.address(),
        payments_enabled = payments.is_enabled(),
        "wallet ready"
    );

    // ── API token (read once, hash for constant-time comparison) ────
    let api_token_hash = {
        let env_var = &config.server.api_token_env;
        match std::env::var(env_var).ok().filter(|t| !t.is_empty()) {
            Some(t) => {
                tracing::info!(source = %format!("env:{env_var}"), "API bearer-token auth enabled");
                Some(Sha256::digest(t.as_bytes()).to_vec())
            }
            None => {
                tracing::warn!("API bearer-token auth DISABLED; set the {env_var} env var");
                None
            }
        }
    };

    Ok(AppState {
        config,
        orchestrator,
        ad_creation,
        ledger,
        images,
        ad_events,
        wallet,
        payments,
        api_token_hash,
    })
}

/// A missing key is not fatal: the collaborator runs unauthenticated and its
/// upstream rejections go through the usual fallback paths.
fn optional_key(service: &str, auth: &AuthConfig) -> Option<String> {
    match resolve_api_key(auth) {
        Ok(key) => Some(key),
        Err(e) => {
            tracing::warn!(service, error = %e, "no API key; requests go out unauthenticated");
            None
        }
    }
}

fn image_backend(
    cfg: &ImagesConfig,
    model: &str,
    params: ImageParams,
    api_key: Option<&str>,
) -> anyhow::Result<Arc<dyn ImageBackend>> {
    let backend: Arc<dyn ImageBackend> = match cfg.backend {
        ImageBackendKind::Sync => Arc::new(
            SyncImageBackend::from_config(cfg, model, params, api_key)
                .context("initializing image backend")?,
        ),
        ImageBackendKind::Job => {
            let api = FireworksWorkflowApi::from_config(cfg, api_key)
                .context("initializing image job API")?;
            Arc::new(JobImageBackend::new(
                Arc::new(api),
                PollPolicy::from_config(&cfg.job),
            ))
        }
    };
    Ok(backend)
}
