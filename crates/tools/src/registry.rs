//! Tool definitions and dispatch.
//!
//! The tool set is closed: a call is parsed into a [`ToolInvocation`] and
//! matched exhaustively. Unknown names and malformed arguments become
//! `{success: false, error}` results; nothing here panics or aborts a turn.

use std::sync::Arc;
use std::time::Instant;

use serde::Deserialize;
use serde_json::{json, Value};
use tracing::Instrument;

use felos_domain::money::Usd;
use felos_domain::pricing::{PricingTable, Service};
use felos_domain::tool::{ToolCall, ToolDefinition};
use felos_domain::trace::TraceEvent;
use felos_ledger::Ledger;

use crate::copy::{CopyRequest, Copywriter};
use crate::error::ToolError;
use crate::image::ImageBackend;
use crate::image_store::ImageStore;
use crate::plan::{create_plan, PlanArgs};
use crate::report::spending_report;
use crate::scrape::ProductScraper;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Invocation
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Deserialize)]
pub struct ScrapeArgs {
    pub url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ImageArgs {
    pub prompt: String,
}

/// A parsed tool call.
#[derive(Debug, Clone)]
pub enum ToolInvocation {
    ScrapeProduct(ScrapeArgs),
    GenerateAdCopy(CopyRequest),
    GenerateAdImage(ImageArgs),
    GetSpendingReport,
    CreateExecutionPlan(PlanArgs),
}

impl ToolInvocation {
    pub const NAMES: [&'static str; 5] = [
        "scrapeProduct",
        "generateAdCopy",
        "generateAdImage",
        "getSpendingReport",
        "createExecutionPlan",
    ];

    /// Parse a tool name plus its raw JSON argument string. An empty
    /// argument string is read as `{}`.
    pub fn parse(name: &str, arguments: &str) -> Result<Self, ToolError> {
        let raw = if arguments.trim().is_empty() {
            "{}"
        } else {
            arguments
        };
        let invalid = |e: serde_json::Error| ToolError::InvalidArguments {
            tool: name.to_owned(),
            message: e.to_string(),
        };

        Ok(match name {
            "scrapeProduct" => Self::ScrapeProduct(serde_json::from_str(raw).map_err(invalid)?),
            "generateAdCopy" => Self::GenerateAdCopy(serde_json::from_str(raw).map_err(invalid)?),
            "generateAdImage" => {
                Self::GenerateAdImage(serde_json::from_str(raw).map_err(invalid)?)
            }
            "getSpendingReport" => {
                serde_json::from_str::<Value>(raw).map_err(invalid)?;
                Self::GetSpendingReport
            }
            "createExecutionPlan" => {
                Self::CreateExecutionPlan(serde_json::from_str(raw).map_err(invalid)?)
            }
            other => return Err(ToolError::UnknownTool(other.to_owned())),
        })
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::ScrapeProduct(_) => "scrapeProduct",
            Self::GenerateAdCopy(_) => "generateAdCopy",
            Self::GenerateAdImage(_) => "generateAdImage",
            Self::GetSpendingReport => "getSpendingReport",
            Self::CreateExecutionPlan(_) => "createExecutionPlan",
        }
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Executor trait
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// What the turn loop needs from a tool set.
#[async_trait::async_trait]
pub trait ToolExecutor: Send + Sync {
    fn definitions(&self) -> Vec<ToolDefinition>;

    /// Run one call for `session_id`. Always returns a JSON object with a
    /// boolean `success`.
    async fn execute(&self, session_id: &str, call: &ToolCall) -> Value;
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Registry
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

pub struct ToolRegistry {
    scraper: Arc<dyn ProductScraper>,
    copywriter: Copywriter,
    images: Arc<dyn ImageBackend>,
    image_store: Arc<ImageStore>,
    ledger: Ledger,
    pricing: PricingTable,
    inline_limit: usize,
}

impl ToolRegistry {
    pub fn new(
        scraper: Arc<dyn ProductScraper>,
        copywriter: Copywriter,
        images: Arc<dyn ImageBackend>,
        image_store: Arc<ImageStore>,
        ledger: Ledger,
        pricing: PricingTable,
    ) -> Self {
        Self {
            scraper,
            copywriter,
            images,
            image_store,
            ledger,
            pricing,
            inline_limit: 16 * 1024,
        }
    }

    /// Largest base64 payload (in bytes) returned inline as a data URL.
    pub fn with_inline_limit(mut self, bytes: usize) -> Self {
        self.inline_limit = bytes;
        self
    }

    pub fn pricing(&self) -> &PricingTable {
        &self.pricing
    }

    fn tool_definitions(&self) -> Vec<ToolDefinition> {
        let price = |s: Service| self.pricing.price(s);
        vec![
            ToolDefinition {
                name: "scrapeProduct".into(),
                description: format!(
                    "Scrape a product URL to extract product info. Costs {} via x402. Use this when user provides a URL.",
                    price(Service::Scrape)
                ),
                parameters: json!({
                    "type": "object",
                    "properties": {
                        "url": { "type": "string", "format": "uri", "description": "The product page URL to scrape" }
                    },
                    "required": ["url"]
                }),
            },
            ToolDefinition {
                name: "generateAdCopy".into(),
                description: format!(
                    "Generate 3 ad copy variations (urgent, playful, premium). Costs {} via x402.",
                    price(Service::AdCopy)
                ),
                parameters: json!({
                    "type": "object",
                    "properties": {
                        "productName": { "type": "string", "description": "Name of the product" },
                        "productDescription": { "type": "string", "description": "Description of the product" },
                        "brand": { "type": "string", "description": "Brand name" },
                        "features": { "type": "array", "items": { "type": "string" }, "description": "Key product features" },
                        "reviews": { "type": "array", "items": { "type": "string" }, "description": "Customer review snippets" }
                    },
                    "required": ["productName", "productDescription"]
                }),
            },
            ToolDefinition {
                name: "generateAdImage".into(),
                description: format!(
                    "Generate an ad image using FLUX.1. Costs {} via x402.",
                    price(Service::ImageFast)
                ),
                parameters: json!({
                    "type": "object",
                    "properties": {
                        "prompt": { "type": "string", "description": "Description of the image to generate" }
                    },
                    "required": ["prompt"]
                }),
            },
            ToolDefinition {
                name: "getSpendingReport".into(),
                description: "Get x402 spending breakdown and savings vs subscriptions. Show this as a nice visual summary.".into(),
                parameters: json!({ "type": "object", "properties": {} }),
            },
            ToolDefinition {
                name: "createExecutionPlan".into(),
                description: "Lay out the steps, tools and costs of a task before running it. Free.".into(),
                parameters: json!({
                    "type": "object",
                    "properties": {
                        "task": { "type": "string", "description": "What the plan accomplishes" },
                        "steps": {
                            "type": "array",
                            "items": {
                                "type": "object",
                                "properties": {
                                    "action": { "type": "string" },
                                    "tool": { "type": "string" },
                                    "cost": { "type": "number" },
                                    "description": { "type": "string" }
                                },
                                "required": ["action"]
                            }
                        },
                        "totalCost": { "type": "number", "description": "Total cost in USD" },
                        "estimatedTimeSeconds": { "type": "integer", "description": "Expected wall time" }
                    },
                    "required": ["task", "steps", "totalCost", "estimatedTimeSeconds"]
                }),
            },
        ]
    }

    /// Run a parsed invocation.
    pub async fn run(&self, session_id: &str, invocation: ToolInvocation) -> Value {
        match invocation {
            ToolInvocation::ScrapeProduct(args) => self.scrape_product(session_id, &args.url).await,
            ToolInvocation::GenerateAdCopy(req) => self.generate_ad_copy(session_id, &req).await,
            ToolInvocation::GenerateAdImage(args) => {
                self.generate_ad_image(session_id, &args.prompt).await
            }
            ToolInvocation::GetSpendingReport => {
                let summary = self.ledger.summarize(session_id).await;
                to_json(&spending_report(&summary, &self.pricing))
            }
            ToolInvocation::CreateExecutionPlan(args) => to_json(&create_plan(args, &self.pricing)),
        }
    }

    // ── Paid tools ─────────────────────────────────────────────────────

    async fn charge(&self, session_id: &str, service: Service, duration_ms: u64) -> Usd {
        let amount = self.pricing.price(service);
        self.ledger
            .record(session_id, service.ledger_name(), amount, duration_ms, None)
            .await;
        amount
    }

    async fn scrape_product(&self, session_id: &str, url: &str) -> Value {
        let start = Instant::now();
        match self.scraper.scrape(url).await {
            Ok(product) => {
                let duration_ms = start.elapsed().as_millis() as u64;
                let cost = self.charge(session_id, Service::Scrape, duration_ms).await;
                json!({
                    "success": true,
                    "productData": product,
                    "cost": cost,
                    "durationMs": duration_ms,
                })
            }
            Err(e) => failure(&e),
        }
    }

    async fn generate_ad_copy(&self, session_id: &str, req: &CopyRequest) -> Value {
        let start = Instant::now();
        let variations = self.copywriter.write(req).await;
        let duration_ms = start.elapsed().as_millis() as u64;
        let cost = self.charge(session_id, Service::AdCopy, duration_ms).await;
        json!({
            "success": true,
            "adVariations": variations,
            "cost": cost,
            "durationMs": duration_ms,
        })
    }

    async fn generate_ad_image(&self, session_id: &str, prompt: &str) -> Value {
        let start = Instant::now();
        let full_prompt =
            format!("Professional advertisement: {prompt}. Clean, modern, high-quality.");

        match self.images.generate(&full_prompt).await {
            Ok(payload) => {
                let duration_ms = start.elapsed().as_millis() as u64;
                let image_url = self
                    .image_store
                    .hand_off(session_id, payload, self.inline_limit);
                let cost = self.charge(session_id, Service::ImageFast, duration_ms).await;
                json!({
                    "success": true,
                    "imageUrl": image_url,
                    "cost": cost,
                    "durationMs": duration_ms,
                })
            }
            Err(e) => {
                tracing::warn!(
                    session_id = %session_id,
                    backend = self.images.backend_name(),
                    error = %e,
                    "image generation failed"
                );
                failure(&e)
            }
        }
    }
}

fn failure(e: &ToolError) -> Value {
    json!({ "success": false, "error": e.to_string() })
}

fn to_json<T: serde::Serialize>(value: &T) -> Value {
    serde_json::to_value(value)
        .unwrap_or_else(|e| json!({ "success": false, "error": format!("serializing result: {e}") }))
}

#[async_trait::async_trait]
impl ToolExecutor for ToolRegistry {
    fn definitions(&self) -> Vec<ToolDefinition> {
        self.tool_definitions()
    }

    async fn execute(&self, session_id: &str, call: &ToolCall) -> Value {
        let span = tracing::info_span!(
            "tool.call",
            tool = %call.tool_name,
            call_id = %call.call_id,
            session_id = %session_id,
        );
        let start = Instant::now();

        let result = match ToolInvocation::parse(&call.tool_name, &call.arguments) {
            Ok(invocation) => self.run(session_id, invocation).instrument(span).await,
            Err(e) => {
                tracing::warn!(tool = %call.tool_name, error = %e, "rejected tool call");
                failure(&e)
            }
        };

        TraceEvent::ToolExecuted {
            session_id: session_id.to_owned(),
            tool_name: call.tool_name.clone(),
            success: result["success"].as_bool().unwrap_or(false),
            duration_ms: start.elapsed().as_millis() as u64,
        }
        .emit();
        result
    }
}
