//! Ad copy generation.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use felos_domain::tool::Message;
use felos_providers::{ChatRequest, LlmProvider};

const SYSTEM_INSTRUCTION: &str = "Generate 3 ad variations as JSON array. Each with: headline, bodyCopy, cta, tone (urgent/playful/premium). Return ONLY valid JSON.";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdVariation {
    pub headline: String,
    pub body_copy: String,
    pub cta: String,
    pub tone: String,
}

/// Arguments of `generateAdCopy`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CopyRequest {
    pub product_name: String,
    pub product_description: String,
    #[serde(default)]
    pub brand: Option<String>,
    #[serde(default)]
    pub features: Vec<String>,
    #[serde(default)]
    pub reviews: Vec<String>,
}

impl CopyRequest {
    fn user_prompt(&self) -> String {
        let mut prompt = format!(
            "Product: {}\nDescription: {}",
            self.product_name, self.product_description
        );
        if let Some(brand) = self.brand.as_deref().filter(|b| !b.is_empty()) {
            prompt.push_str(&format!("\nBrand: {brand}"));
        }
        if !self.features.is_empty() {
            prompt.push_str(&format!("\nFeatures: {}", self.features.join(", ")));
        }
        if !self.reviews.is_empty() {
            prompt.push_str(&format!("\nReviews: {}", self.reviews.join(" | ")));
        }
        prompt
    }
}

/// The fixed three-variant set used whenever the model's answer is unusable.
pub fn default_variations(product_name: &str) -> Vec<AdVariation> {
    let v = |headline: String, body: &str, cta: &str, tone: &str| AdVariation {
        headline,
        body_copy: body.into(),
        cta: cta.into(),
        tone: tone.into(),
    };
    vec![
        v(
            format!("Get {product_name} Now"),
            "Limited time offer. Don't miss out!",
            "Buy Now",
            "urgent",
        ),
        v(
            format!("Love Your {product_name}"),
            "Join thousands of happy customers.",
            "Try It",
            "playful",
        ),
        v(
            format!("Premium {product_name}"),
            "Experience luxury and quality.",
            "Discover",
            "premium",
        ),
    ]
}

/// Remove a surrounding Markdown code fence (```` ```json ```` or bare).
pub fn strip_code_fences(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let rest = rest.strip_prefix("json").unwrap_or(rest);
    let rest = rest.strip_suffix("```").unwrap_or(rest);
    rest.trim()
}

/// Parse model output into variations. `None` unless it is a non-empty
/// JSON array of complete variations.
pub fn parse_variations(text: &str) -> Option<Vec<AdVariation>> {
    serde_json::from_str::<Vec<AdVariation>>(strip_code_fences(text))
        .ok()
        .filter(|v| !v.is_empty())
}

pub struct Copywriter {
    provider: Arc<dyn LlmProvider>,
    model: Option<String>,
    max_tokens: u32,
}

impl Copywriter {
    pub fn new(provider: Arc<dyn LlmProvider>) -> Self {
        Self {
            provider,
            model: None,
            max_tokens: 600,
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    /// Always yields variations: provider errors and unparseable answers
    /// fall back to [`default_variations`].
    pub async fn write(&self, req: &CopyRequest) -> Vec<AdVariation> {
        let chat = ChatRequest {
            messages: vec![
                Message::system(SYSTEM_INSTRUCTION),
                Message::user(req.user_prompt()),
            ],
            max_tokens: Some(self.max_tokens),
            model: self.model.clone(),
            ..ChatRequest::default()
        };

        match self.provider.chat(chat).await {
            Ok(resp) => parse_variations(&resp.content).unwrap_or_else(|| {
                tracing::warn!(
                    product = %req.product_name,
                    "ad copy response was not a variation array, using defaults"
                );
                default_variations(&req.product_name)
            }),
            Err(e) => {
                tracing::warn!(product = %req.product_name, error = %e, "ad copy request failed, using defaults");
                default_variations(&req.product_name)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ARRAY: &str = r#"[{"headline":"H","bodyCopy":"B","cta":"C","tone":"urgent"}]"#;

    #[test]
    fn fenced_json_parses_like_unfenced() {
        let fenced = format!("```json\n{ARRAY}\n```");
        let bare_fence = format!("```\n{ARRAY}\n```");
        assert_eq!(parse_variations(&fenced), parse_variations(ARRAY));
        assert_eq!(parse_variations(&bare_fence), parse_variations(ARRAY));
        assert_eq!(parse_variations(ARRAY).unwrap()[0].body_copy, "B");
    }

    #[test]
    fn non_arrays_are_rejected() {
        assert!(parse_variations(r#"{"headline":"H"}"#).is_none());
        assert!(parse_variations("[]").is_none());
        assert!(parse_variations("Sure! Here are your ads").is_none());
    }

    #[test]
    fn defaults_mention_product() {
        let d = default_variations("BeanBox");
        assert_eq!(d.len(), 3);
        assert_eq!(d[0].headline, "Get BeanBox Now");
        assert_eq!(d[1].tone, "playful");
        assert_eq!(d[2].cta, "Discover");
    }

    #[test]
    fn optional_context_lands_in_prompt() {
        let req = CopyRequest {
            product_name: "Mug".into(),
            product_description: "Ceramic".into(),
            brand: Some("Acme".into()),
            features: vec!["dishwasher safe".into(), "12oz".into()],
            reviews: vec![],
        };
        let prompt = req.user_prompt();
        assert!(prompt.starts_with("Product: Mug\nDescription: Ceramic"));
        assert!(prompt.contains("Brand: Acme"));
        assert!(prompt.contains("Features: dishwasher safe, 12oz"));
        assert!(!prompt.contains("Reviews"));
    }
}
