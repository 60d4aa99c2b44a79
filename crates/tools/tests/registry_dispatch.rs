use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;

use felos_domain::error::{Error, Result};
use felos_domain::pricing::PricingTable;
use felos_domain::stream::{BoxStream, StreamEvent};
use felos_domain::tool::ToolCall;
use felos_ledger::Ledger;
use felos_providers::{ChatRequest, ChatResponse, LlmProvider};
use felos_tools::{
    Copywriter, ImageBackend, ImagePayload, ImageStore, ProductData, ProductScraper, ToolError,
    ToolExecutor, ToolRegistry,
};

// ── Scripted collaborators ───────────────────────────────────────────

struct FixedScraper {
    fail: bool,
}

#[async_trait::async_trait]
impl ProductScraper for FixedScraper {
    async fn scrape(&self, url: &str) -> std::result::Result<ProductData, ToolError> {
        if self.fail {
            return Err(ToolError::Upstream("connection refused".into()));
        }
        Ok(ProductData {
            name: "BeanBox".into(),
            description: "Coffee".into(),
            price: "$24".into(),
            url: url.into(),
        })
    }
}

struct CannedLlm {
    content: Option<String>,
    calls: AtomicUsize,
}

#[async_trait::async_trait]
impl LlmProvider for CannedLlm {
    async fn chat(&self, _req: ChatRequest) -> Result<ChatResponse> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match &self.content {
            Some(c) => Ok(ChatResponse {
                content: c.clone(),
                tool_calls: vec![],
                usage: None,
                model: "canned".into(),
                finish_reason: Some("stop".into()),
            }),
            None => Err(Error::Provider {
                provider: "canned".into(),
                message: "HTTP 503".into(),
            }),
        }
    }

    async fn chat_stream(&self, _req: ChatRequest) -> Result<BoxStream<'static, Result<StreamEvent>>> {
        Err(Error::Other("not scripted".into()))
    }

    fn provider_id(&self) -> &str {
        "canned"
    }

    fn default_model(&self) -> &str {
        "canned"
    }
}

struct FixedImage(std::result::Result<ImagePayload, &'static str>);

#[async_trait::async_trait]
impl ImageBackend for FixedImage {
    async fn generate(&self, prompt: &str) -> std::result::Result<ImagePayload, ToolError> {
        assert!(prompt.starts_with("Professional advertisement: "));
        match &self.0 {
            Ok(p) => Ok(p.clone()),
            Err(msg) => Err(ToolError::Timeout((*msg).into())),
        }
    }

    fn backend_name(&self) -> &'static str {
        "fixed"
    }
}

struct Harness {
    registry: ToolRegistry,
    ledger: Ledger,
    store: Arc<ImageStore>,
}

fn harness(
    scrape_fails: bool,
    copy: Option<&str>,
    image: std::result::Result<ImagePayload, &'static str>,
) -> Harness {
    let ledger = Ledger::in_memory();
    let store = Arc::new(ImageStore::new(16, Duration::from_secs(60)));
    let llm = Arc::new(CannedLlm {
        content: copy.map(str::to_owned),
        calls: AtomicUsize::new(0),
    });
    let registry = ToolRegistry::new(
        Arc::new(FixedScraper { fail: scrape_fails }),
        Copywriter::new(llm),
        Arc::new(FixedImage(image)),
        Arc::clone(&store),
        ledger.clone(),
        PricingTable::default(),
    )
    .with_inline_limit(8);
    Harness {
        registry,
        ledger,
        store,
    }
}

fn call(name: &str, args: &str) -> ToolCall {
    ToolCall {
        call_id: format!("call-{name}"),
        tool_name: name.into(),
        arguments: args.into(),
    }
}

fn url_image() -> std::result::Result<ImagePayload, &'static str> {
    Ok(ImagePayload::Url("https://cdn.test/a.png".into()))
}

// ── Tests ────────────────────────────────────────────────────────────

#[tokio::test]
async fn paid_tools_write_one_entry_each() {
    let h = harness(false, Some(r#"[{"headline":"H","bodyCopy":"B","cta":"C","tone":"urgent"}]"#), url_image());

    let scraped = h
        .registry
        .execute("s", &call("scrapeProduct", r#"{"url":"https://shop.test"}"#))
        .await;
    assert_eq!(scraped["success"], true);
    assert_eq!(scraped["productData"]["name"], "BeanBox");
    assert_eq!(scraped["cost"], 0.01);

    let copy = h
        .registry
        .execute(
            "s",
            &call("generateAdCopy", r#"{"productName":"BeanBox","productDescription":"Coffee"}"#),
        )
        .await;
    assert_eq!(copy["adVariations"][0]["headline"], "H");

    let image = h
        .registry
        .execute("s", &call("generateAdImage", r#"{"prompt":"coffee"}"#))
        .await;
    assert_eq!(image["imageUrl"], "https://cdn.test/a.png");
    assert_eq!(image["cost"], 0.06);

    let summary = h.ledger.summarize("s").await;
    assert_eq!(summary.count, 3);
    assert_eq!(summary.total.to_string(), "$0.09");
    let services: Vec<_> = h
        .ledger
        .recent(10)
        .await
        .into_iter()
        .map(|t| t.service)
        .collect();
    assert!(services.contains(&"firecrawl".to_string()));
    assert!(services.contains(&"fireworks-llm".to_string()));
    assert!(services.contains(&"fireworks-flux".to_string()));
}

#[tokio::test]
async fn scrape_transport_failure_is_not_charged() {
    let h = harness(true, None, url_image());
    let result = h
        .registry
        .execute("s", &call("scrapeProduct", r#"{"url":"https://shop.test"}"#))
        .await;
    assert_eq!(result["success"], false);
    assert_eq!(result["error"], "connection refused");
    assert_eq!(h.ledger.summarize("s").await.count, 0);
}

#[tokio::test]
async fn copy_provider_failure_uses_defaults_and_still_charges() {
    let h = harness(false, None, url_image());
    let result = h
        .registry
        .execute(
            "s",
            &call("generateAdCopy", r#"{"productName":"Mug","productDescription":"Ceramic"}"#),
        )
        .await;
    assert_eq!(result["success"], true);
    assert_eq!(result["adVariations"].as_array().unwrap().len(), 3);
    assert_eq!(result["adVariations"][0]["headline"], "Get Mug Now");
    assert_eq!(h.ledger.summarize("s").await.count, 1);
}

#[tokio::test]
async fn image_failure_is_reported_and_not_charged() {
    let h = harness(false, None, Err("image job j not ready after 60 polls"));
    let result = h
        .registry
        .execute("s", &call("generateAdImage", r#"{"prompt":"x"}"#))
        .await;
    assert_eq!(result["success"], false);
    assert!(result["error"].as_str().unwrap().starts_with("timeout"));
    assert!(h.ledger.summarize("s").await.total.is_zero());
}

#[tokio::test]
async fn large_base64_is_routed_through_the_store() {
    let h = harness(false, None, Ok(ImagePayload::Base64("QUJDREVGR0hJSktM".into())));
    let result = h
        .registry
        .execute("sess-9", &call("generateAdImage", r#"{"prompt":"x"}"#))
        .await;
    let url = result["imageUrl"].as_str().unwrap();
    assert!(url.starts_with("/api/image/"));
    assert!(url.ends_with("?session=sess-9"));
    assert_eq!(h.store.len(), 1);
}

#[tokio::test]
async fn unknown_and_malformed_calls_fail_softly() {
    let h = harness(false, None, url_image());

    let unknown = h.registry.execute("s", &call("launchRocket", "{}")).await;
    assert_eq!(unknown["success"], false);
    assert!(unknown["error"].as_str().unwrap().contains("launchRocket"));

    let malformed = h
        .registry
        .execute("s", &call("scrapeProduct", r#"{"url":"#))
        .await;
    assert_eq!(malformed["success"], false);
    assert!(h.ledger.summarize("s").await.total.is_zero());
}

#[tokio::test]
async fn spending_report_is_a_pure_read() {
    let h = harness(false, None, url_image());
    h.registry
        .execute("s", &call("scrapeProduct", r#"{"url":"u"}"#))
        .await;

    let first = h.registry.execute("s", &call("getSpendingReport", "{}")).await;
    let second = h.registry.execute("s", &call("getSpendingReport", "")).await;
    assert_eq!(first, second);
    assert_eq!(first["totalSpent"], "$0.01");
    assert_eq!(first["transactionCount"], 1);
    assert_eq!(h.ledger.summarize("s").await.count, 1);
}

#[tokio::test]
async fn execution_plan_is_free() {
    let h = harness(false, None, url_image());
    let result: Value = h
        .registry
        .execute(
            "s",
            &call(
                "createExecutionPlan",
                r#"{"task":"ads","steps":[{"action":"scrape","cost":0.01}],"totalCost":0.01,"estimatedTimeSeconds":5}"#,
            ),
        )
        .await;
    assert_eq!(result["success"], true);
    assert_eq!(result["plan"]["steps"][0]["stepNumber"], 1);
    assert_eq!(h.ledger.summarize("s").await.count, 0);
}

#[test]
fn definitions_cover_the_tool_set() {
    let h = harness(false, None, url_image());
    let names: Vec<String> = h.registry.definitions().into_iter().map(|d| d.name).collect();
    assert_eq!(
        names,
        vec![
            "scrapeProduct",
            "generateAdCopy",
            "generateAdImage",
            "getSpendingReport",
            "createExecutionPlan"
        ]
    );
}
