//! Product page extraction through a Firecrawl-compatible `/v1/scrape`.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use felos_domain::config::ScrapeConfig;
use felos_domain::error::Result;
use felos_providers::util::{auth_header, from_reqwest, http_client};

use crate::error::ToolError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductData {
    pub name: String,
    pub description: String,
    pub price: String,
    pub url: String,
}

impl ProductData {
    /// Demo payload used when the extraction service answers with an error.
    pub fn fallback(url: &str) -> Self {
        Self {
            name: "Premium Product".into(),
            description: "High-quality product with exceptional features and craftsmanship."
                .into(),
            price: "$49.99".into(),
            url: url.to_owned(),
        }
    }
}

/// Something that turns a product URL into [`ProductData`].
///
/// `Err` means the call itself failed (transport). An upstream error status
/// is not an `Err`: implementations answer with [`ProductData::fallback`].
#[async_trait::async_trait]
pub trait ProductScraper: Send + Sync {
    async fn scrape(&self, url: &str) -> std::result::Result<ProductData, ToolError>;
}

pub struct FirecrawlScraper {
    client: reqwest::Client,
    endpoint: String,
    auth: Option<(String, String)>,
    description_chars: usize,
}

impl FirecrawlScraper {
    /// Without an API key requests go out unauthenticated and the service's
    /// rejection turns into the fallback payload.
    pub fn from_config(cfg: &ScrapeConfig, api_key: Option<&str>) -> Result<Self> {
        Ok(Self {
            client: http_client(cfg.timeout_ms)?,
            endpoint: format!("{}/v1/scrape", cfg.base_url.trim_end_matches('/')),
            auth: api_key.map(|key| auth_header(&cfg.auth, key)),
            description_chars: cfg.description_chars,
        })
    }

    fn request_body(url: &str) -> Value {
        serde_json::json!({
            "url": url,
            "formats": ["markdown", "extract"],
            "extract": {
                "schema": {
                    "type": "object",
                    "properties": {
                        "name": { "type": "string" },
                        "description": { "type": "string" },
                        "price": { "type": "string" }
                    }
                }
            }
        })
    }

    /// Pull product fields out of a successful response body.
    fn extract(&self, url: &str, body: &Value) -> ProductData {
        let data = &body["data"];
        let field = |name: &str| {
            data["extract"][name]
                .as_str()
                .filter(|s| !s.is_empty())
                .map(str::to_owned)
        };

        let description = field("description").unwrap_or_else(|| {
            data["markdown"]
                .as_str()
                .map(|md| md.chars().take(self.description_chars).collect())
                .unwrap_or_default()
        });

        ProductData {
            name: field("name").unwrap_or_else(|| "Product".into()),
            description,
            price: field("price").unwrap_or_else(|| "$XX.XX".into()),
            url: url.to_owned(),
        }
    }
}

#[async_trait::async_trait]
impl ProductScraper for FirecrawlScraper {
    async fn scrape(&self, url: &str) -> std::result::Result<ProductData, ToolError> {
        let mut req = self.client.post(&self.endpoint).json(&Self::request_body(url));
        if let Some((name, value)) = &self.auth {
            req = req.header(name.as_str(), value.as_str());
        }

        let resp = req.send().await.map_err(from_reqwest)?;
        let status = resp.status();
        if !status.is_success() {
            tracing::warn!(url = %url, status = %status, "scrape rejected, using demo product");
            return Ok(ProductData::fallback(url));
        }

        let body: Value = resp.json().await.map_err(from_reqwest)?;
        Ok(self.extract(url, &body))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scraper() -> FirecrawlScraper {
        FirecrawlScraper::from_config(&ScrapeConfig::default(), None).unwrap()
    }

    #[test]
    fn extracted_fields_win() {
        let body = serde_json::json!({
            "data": {
                "extract": { "name": "BeanBox", "description": "Coffee", "price": "$19" },
                "markdown": "ignored"
            }
        });
        let p = scraper().extract("https://x.test", &body);
        assert_eq!(p.name, "BeanBox");
        assert_eq!(p.description, "Coffee");
        assert_eq!(p.price, "$19");
        assert_eq!(p.url, "https://x.test");
    }

    #[test]
    fn missing_fields_fall_back() {
        let markdown = "m".repeat(500);
        let body = serde_json::json!({ "data": { "extract": { "name": "" }, "markdown": markdown } });
        let p = scraper().extract("u", &body);
        assert_eq!(p.name, "Product");
        assert_eq!(p.description.len(), 300);
        assert_eq!(p.price, "$XX.XX");
    }

    #[test]
    fn empty_body_gives_empty_description() {
        let p = scraper().extract("u", &serde_json::json!({}));
        assert_eq!(p.description, "");
    }
}
