use serde_json::json;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use felos_domain::config::{ImagesConfig, ScrapeConfig};
use felos_tools::image::{FireworksWorkflowApi, ImageParams, JobApi, JobStatus};
use felos_tools::{FirecrawlScraper, ImageBackend, ImagePayload, ProductScraper, SyncImageBackend};

fn scrape_config(server: &MockServer) -> ScrapeConfig {
    ScrapeConfig {
        base_url: server.uri(),
        ..ScrapeConfig::default()
    }
}

fn images_config(server: &MockServer) -> ImagesConfig {
    ImagesConfig {
        base_url: server.uri(),
        ..ImagesConfig::default()
    }
}

// ── Scraper ──────────────────────────────────────────────────────────

#[tokio::test]
async fn scrape_reads_extracted_fields() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/scrape"))
        .and(header("authorization", "Bearer fc-key"))
        .and(body_partial_json(json!({
            "url": "https://shop.test/beans",
            "formats": ["markdown", "extract"]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "data": {
                "extract": { "name": "BeanBox", "description": "Fresh beans monthly", "price": "$24.00" },
                "markdown": "# BeanBox"
            }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let scraper = FirecrawlScraper::from_config(&scrape_config(&server), Some("fc-key")).unwrap();
    let product = scraper.scrape("https://shop.test/beans").await.unwrap();

    assert_eq!(product.name, "BeanBox");
    assert_eq!(product.description, "Fresh beans monthly");
    assert_eq!(product.price, "$24.00");
    assert_eq!(product.url, "https://shop.test/beans");
}

#[tokio::test]
async fn scrape_error_status_yields_demo_product() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/scrape"))
        .respond_with(ResponseTemplate::new(402).set_body_string("payment required"))
        .mount(&server)
        .await;

    let scraper = FirecrawlScraper::from_config(&scrape_config(&server), None).unwrap();
    let product = scraper.scrape("https://shop.test/x").await.unwrap();

    assert_eq!(product.name, "Premium Product");
    assert_eq!(product.price, "$49.99");
    assert_eq!(product.url, "https://shop.test/x");
}

#[tokio::test]
async fn scrape_transport_failure_is_an_error() {
    let cfg = ScrapeConfig {
        // Nothing listens on port 9 on the loopback interface.
        base_url: "http://127.0.0.1:9".into(),
        timeout_ms: 2_000,
        ..ScrapeConfig::default()
    };
    let scraper = FirecrawlScraper::from_config(&cfg, None).unwrap();
    assert!(scraper.scrape("https://shop.test/x").await.is_err());
}

// ── Synchronous image backend ────────────────────────────────────────

#[tokio::test]
async fn sync_image_returns_url() {
    let server = MockServer::start().await;
    let cfg = images_config(&server);
    Mock::given(method("POST"))
        .and(path(format!("/image_generation/{}", cfg.fast_model)))
        .and(body_partial_json(json!({ "prompt": "a mug", "steps": 4, "width": 1024 })))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "data": [{ "url": "https://cdn.test/mug.png" }] })),
        )
        .mount(&server)
        .await;

    let backend =
        SyncImageBackend::from_config(&cfg, &cfg.fast_model, ImageParams::FAST, Some("k")).unwrap();
    let payload = backend.generate("a mug").await.unwrap();
    assert_eq!(payload, ImagePayload::Url("https://cdn.test/mug.png".into()));
}

#[tokio::test]
async fn sync_image_accepts_base64_and_raw_bytes() {
    let server = MockServer::start().await;
    let cfg = images_config(&server);

    Mock::given(method("POST"))
        .and(path(format!("/image_generation/{}", cfg.fast_model)))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({ "data": [{ "b64_json": "QUJD" }] })),
        )
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(format!("/image_generation/{}", cfg.dev_model)))
        .respond_with(ResponseTemplate::new(200).set_body_raw(b"ABC".to_vec(), "image/png"))
        .mount(&server)
        .await;

    let fast =
        SyncImageBackend::from_config(&cfg, &cfg.fast_model, ImageParams::FAST, None).unwrap();
    assert_eq!(
        fast.generate("x").await.unwrap(),
        ImagePayload::Base64("QUJD".into())
    );

    let dev = SyncImageBackend::from_config(&cfg, &cfg.dev_model, ImageParams::DEV, None).unwrap();
    assert_eq!(
        dev.generate("x").await.unwrap(),
        ImagePayload::Base64("QUJD".into())
    );
}

#[tokio::test]
async fn sync_image_error_status_fails() {
    let server = MockServer::start().await;
    let cfg = images_config(&server);
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .mount(&server)
        .await;

    let backend =
        SyncImageBackend::from_config(&cfg, &cfg.fast_model, ImageParams::FAST, None).unwrap();
    let err = backend.generate("x").await.unwrap_err();
    assert!(err.to_string().contains("HTTP 500"));
}

// ── Workflow job API ─────────────────────────────────────────────────

#[tokio::test]
async fn workflow_api_submits_and_reads_status() {
    let server = MockServer::start().await;
    let cfg = images_config(&server);
    let base = format!("/workflows/{}", cfg.job.model);

    Mock::given(method("POST"))
        .and(path(base.clone()))
        .and(body_partial_json(json!({ "prompt": "a mug" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "request_id": "req-7" })))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(format!("{base}/get_result")))
        .and(body_partial_json(json!({ "id": "req-7" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": "Ready",
            "result": { "sample": "https://cdn.test/job.png" }
        })))
        .mount(&server)
        .await;

    let api = FireworksWorkflowApi::from_config(&cfg, Some("k")).unwrap();
    let id = api.submit("a mug").await.unwrap();
    assert_eq!(id, "req-7");
    assert_eq!(
        api.status(&id).await.unwrap(),
        JobStatus::Ready(ImagePayload::Url("https://cdn.test/job.png".into()))
    );
}
