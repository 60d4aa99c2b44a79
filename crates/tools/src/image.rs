//! Image generation backends.
//!
//! Two shapes of upstream API are supported:
//! - synchronous: one POST answers with the image (URL, base64 or raw bytes)
//! - job-based: one POST answers with a job id, then the job is polled on a
//!   fixed interval until it is ready, fails, or runs out of attempts

use std::sync::Arc;
use std::time::Duration;

use base64::Engine as _;
use serde_json::Value;

use felos_domain::config::{ImageJobConfig, ImagesConfig};
use felos_domain::error::Result;
use felos_domain::trace::TraceEvent;
use felos_providers::util::{auth_header, from_reqwest, http_client};

use crate::error::ToolError;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Payload and backend trait
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// A generated image as handed back by a backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImagePayload {
    /// Hosted by the upstream service.
    Url(String),
    /// Base64 image data without any `data:` prefix.
    Base64(String),
}

impl ImagePayload {
    /// Classify a string the upstream returned: URLs stay URLs, anything
    /// else is treated as base64 (a `data:...;base64,` prefix is dropped).
    pub fn from_upstream(s: &str) -> Self {
        if s.starts_with("http://") || s.starts_with("https://") {
            return Self::Url(s.to_owned());
        }
        match s.split_once(";base64,") {
            Some((prefix, data)) if prefix.starts_with("data:") => Self::Base64(data.to_owned()),
            _ => Self::Base64(s.to_owned()),
        }
    }
}

#[async_trait::async_trait]
pub trait ImageBackend: Send + Sync {
    async fn generate(&self, prompt: &str) -> std::result::Result<ImagePayload, ToolError>;

    fn backend_name(&self) -> &'static str;
}

/// Find the image in a JSON response: `output[0].url`, `data[0].url`, then
/// `data[0].b64_json`.
fn payload_from_json(body: &Value) -> Option<ImagePayload> {
    let url = body["output"][0]["url"]
        .as_str()
        .or_else(|| body["data"][0]["url"].as_str())
        .filter(|s| !s.is_empty());
    if let Some(url) = url {
        return Some(ImagePayload::Url(url.to_owned()));
    }
    body["data"][0]["b64_json"]
        .as_str()
        .filter(|s| !s.is_empty())
        .map(ImagePayload::from_upstream)
}

fn with_auth(req: reqwest::RequestBuilder, auth: &Option<(String, String)>) -> reqwest::RequestBuilder {
    match auth {
        Some((name, value)) => req.header(name.as_str(), value.as_str()),
        None => req,
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Synchronous backend
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Sampler settings sent with every synchronous request.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ImageParams {
    pub steps: u32,
    pub cfg_scale: f32,
    pub width: u32,
    pub height: u32,
}

impl ImageParams {
    /// Few-step model used by the chat tool.
    pub const FAST: ImageParams = ImageParams {
        steps: 4,
        cfg_scale: 7.0,
        width: 1024,
        height: 1024,
    };

    /// Higher quality model used by the ad-creation flow.
    pub const DEV: ImageParams = ImageParams {
        steps: 25,
        cfg_scale: 3.5,
        width: 1024,
        height: 1024,
    };
}

pub struct SyncImageBackend {
    client: reqwest::Client,
    endpoint: String,
    auth: Option<(String, String)>,
    params: ImageParams,
}

impl SyncImageBackend {
    pub fn from_config(
        cfg: &ImagesConfig,
        model: &str,
        params: ImageParams,
        api_key: Option<&str>,
    ) -> Result<Self> {
        Ok(Self {
            client: http_client(cfg.timeout_ms)?,
            endpoint: format!(
                "{}/image_generation/{}",
                cfg.base_url.trim_end_matches('/'),
                model
            ),
            auth: api_key.map(|key| auth_header(&cfg.auth, key)),
            params,
        })
    }
}

#[async_trait::async_trait]
impl ImageBackend for SyncImageBackend {
    async fn generate(&self, prompt: &str) -> std::result::Result<ImagePayload, ToolError> {
        let body = serde_json::json!({
            "prompt": prompt,
            "cfg_scale": self.params.cfg_scale,
            "height": self.params.height,
            "width": self.params.width,
            "steps": self.params.steps,
        });

        let resp = with_auth(self.client.post(&self.endpoint).json(&body), &self.auth)
            .send()
            .await
            .map_err(from_reqwest)?;

        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            return Err(ToolError::Upstream(format!(
                "image generation failed: HTTP {} - {}",
                status.as_u16(),
                text.chars().take(200).collect::<String>()
            )));
        }

        let is_raw_image = resp
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|ct| ct.starts_with("image/"));

        if is_raw_image {
            let bytes = resp.bytes().await.map_err(from_reqwest)?;
            return Ok(ImagePayload::Base64(
                base64::engine::general_purpose::STANDARD.encode(&bytes),
            ));
        }

        let json: Value = resp.json().await.map_err(from_reqwest)?;
        payload_from_json(&json)
            .ok_or_else(|| ToolError::Upstream("image response carried no image".into()))
    }

    fn backend_name(&self) -> &'static str {
        "sync"
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Job backend
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// One observation of a running job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobStatus {
    Pending(String),
    Ready(ImagePayload),
    Failed(String),
}

impl JobStatus {
    /// Map an upstream status string. `Ready`, `Complete` and `Finished`
    /// succeed; `Failed` and `Error` fail; everything else is pending.
    pub fn classify(status: &str, sample: Option<ImagePayload>) -> Self {
        match status.to_ascii_lowercase().as_str() {
            "ready" | "complete" | "finished" => match sample {
                Some(p) => JobStatus::Ready(p),
                None => JobStatus::Failed(format!("{status} without an image")),
            },
            "failed" | "error" => JobStatus::Failed(status.to_owned()),
            _ => JobStatus::Pending(status.to_owned()),
        }
    }
}

/// Submit/status endpoints of a job-based image service.
#[async_trait::async_trait]
pub trait JobApi: Send + Sync {
    /// Start a job and return its id.
    async fn submit(&self, prompt: &str) -> std::result::Result<String, ToolError>;

    async fn status(&self, job_id: &str) -> std::result::Result<JobStatus, ToolError>;
}

#[derive(Debug, Clone, Copy)]
pub struct PollPolicy {
    pub interval: Duration,
    pub max_attempts: u32,
}

impl PollPolicy {
    pub fn from_config(cfg: &ImageJobConfig) -> Self {
        Self {
            interval: Duration::from_millis(cfg.poll_interval_ms),
            max_attempts: cfg.max_poll_attempts,
        }
    }
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(1),
            max_attempts: 60,
        }
    }
}

pub struct JobImageBackend {
    api: Arc<dyn JobApi>,
    policy: PollPolicy,
}

impl JobImageBackend {
    pub fn new(api: Arc<dyn JobApi>, policy: PollPolicy) -> Self {
        Self { api, policy }
    }

    /// Poll until the job settles. Sleeps `interval` before every poll.
    async fn wait_for(&self, job_id: &str) -> std::result::Result<ImagePayload, ToolError> {
        for attempt in 1..=self.policy.max_attempts {
            tokio::time::sleep(self.policy.interval).await;

            match self.api.status(job_id).await? {
                JobStatus::Ready(payload) => {
                    finished(job_id, attempt, "ready");
                    return Ok(payload);
                }
                JobStatus::Failed(reason) => {
                    finished(job_id, attempt, "failed");
                    return Err(ToolError::JobFailed(reason));
                }
                JobStatus::Pending(status) => {
                    tracing::trace!(job_id = %job_id, attempt, status = %status, "image job pending");
                }
            }
        }

        finished(job_id, self.policy.max_attempts, "timeout");
        Err(ToolError::Timeout(format!(
            "image job {job_id} not ready after {} polls",
            self.policy.max_attempts
        )))
    }
}

fn finished(job_id: &str, attempts: u32, outcome: &str) {
    TraceEvent::ImageJobFinished {
        job_id: job_id.to_owned(),
        attempts,
        outcome: outcome.to_owned(),
    }
    .emit();
}

#[async_trait::async_trait]
impl ImageBackend for JobImageBackend {
    async fn generate(&self, prompt: &str) -> std::result::Result<ImagePayload, ToolError> {
        let job_id = self.api.submit(prompt).await?;
        tracing::debug!(job_id = %job_id, "image job submitted");
        self.wait_for(&job_id).await
    }

    fn backend_name(&self) -> &'static str {
        "job"
    }
}

/// Fireworks workflow API: `POST {base}/workflows/{model}` to submit and
/// `POST {base}/workflows/{model}/get_result` to poll.
pub struct FireworksWorkflowApi {
    client: reqwest::Client,
    submit_url: String,
    result_url: String,
    auth: Option<(String, String)>,
}

impl FireworksWorkflowApi {
    pub fn from_config(cfg: &ImagesConfig, api_key: Option<&str>) -> Result<Self> {
        let base = format!(
            "{}/workflows/{}",
            cfg.base_url.trim_end_matches('/'),
            cfg.job.model
        );
        Ok(Self {
            client: http_client(cfg.timeout_ms)?,
            result_url: format!("{base}/get_result"),
            submit_url: base,
            auth: api_key.map(|key| auth_header(&cfg.auth, key)),
        })
    }

    async fn post(&self, url: &str, body: &Value) -> std::result::Result<Value, ToolError> {
        let resp = with_auth(self.client.post(url).json(body), &self.auth)
            .send()
            .await
            .map_err(from_reqwest)?;
        let status = resp.status();
        if !status.is_success() {
            return Err(ToolError::Upstream(format!(
                "image job request failed: HTTP {}",
                status.as_u16()
            )));
        }
        Ok(resp.json().await.map_err(from_reqwest)?)
    }
}

#[async_trait::async_trait]
impl JobApi for FireworksWorkflowApi {
    async fn submit(&self, prompt: &str) -> std::result::Result<String, ToolError> {
        let body = serde_json::json!({ "prompt": prompt, "aspect_ratio": "1:1" });
        let json = self.post(&self.submit_url, &body).await?;
        json["request_id"]
            .as_str()
            .or_else(|| json["id"].as_str())
            .map(str::to_owned)
            .ok_or_else(|| ToolError::Upstream("image job response carried no id".into()))
    }

    async fn status(&self, job_id: &str) -> std::result::Result<JobStatus, ToolError> {
        let json = self
            .post(&self.result_url, &serde_json::json!({ "id": job_id }))
            .await?;
        let status = json["status"].as_str().unwrap_or("Pending");
        let sample = json["result"]["sample"]
            .as_str()
            .filter(|s| !s.is_empty())
            .map(ImagePayload::from_upstream);
        Ok(JobStatus::classify(status, sample))
    }
}
