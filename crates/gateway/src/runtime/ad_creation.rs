//! Fixed five-style ad-creation flow.
//!
//! Streams markdown: an execution plan, then one entry per style with the
//! generated image, a headline and a CTA, then a cost line compared to an
//! agency fee. Product details come from a small LLM extraction call layered
//! over keyword heuristics. A style whose image fails gets a placeholder and
//! is not charged.

use std::sync::{Arc, OnceLock};

use regex::Regex;
use serde::Deserialize;
use serde_json::json;
use tokio::sync::mpsc;
use tokio::time::Instant;
use tracing::Instrument;

use felos_domain::money::Usd;
use felos_domain::pricing::{PricingTable, Service};
use felos_domain::tool::Message;
use felos_ledger::Ledger;
use felos_providers::{ChatRequest, LlmProvider};
use felos_tools::plan::{ExecutionPlan, PlanArgs, PlanStepArgs};
use felos_tools::report::savings_percent;
use felos_tools::{ImageBackend, ImageStore};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Styles and tones
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdStyle {
    HeroProduct,
    LifestyleContext,
    BoldDynamic,
    MinimalModern,
    LuxuryPremium,
}

impl AdStyle {
    pub const ALL: [AdStyle; 5] = [
        AdStyle::HeroProduct,
        AdStyle::LifestyleContext,
        AdStyle::BoldDynamic,
        AdStyle::MinimalModern,
        AdStyle::LuxuryPremium,
    ];

    pub const fn slug(self) -> &'static str {
        match self {
            AdStyle::HeroProduct => "hero-product",
            AdStyle::LifestyleContext => "lifestyle-context",
            AdStyle::BoldDynamic => "bold-dynamic",
            AdStyle::MinimalModern => "minimal-modern",
            AdStyle::LuxuryPremium => "luxury-premium",
        }
    }

    /// Heading used in the results list.
    pub const fn title(self) -> &'static str {
        match self {
            AdStyle::HeroProduct => "Hero Product",
            AdStyle::LifestyleContext => "Lifestyle Context",
            AdStyle::BoldDynamic => "Bold Dynamic",
            AdStyle::MinimalModern => "Minimal Modern",
            AdStyle::LuxuryPremium => "Luxury Premium",
        }
    }

    /// Label used in the execution plan.
    const fn plan_label(self) -> &'static str {
        match self {
            AdStyle::HeroProduct => "🖼️ Hero Product Shot",
            AdStyle::LifestyleContext => "🖼️ Lifestyle Context",
            AdStyle::BoldDynamic => "🖼️ Bold & Dynamic",
            AdStyle::MinimalModern => "🖼️ Minimal Modern",
            AdStyle::LuxuryPremium => "🖼️ Luxury Premium",
        }
    }

    /// Art direction fed to the image model.
    pub const fn direction(self) -> &'static str {
        match self {
            AdStyle::HeroProduct => {
                "centered hero composition, clean background, studio lighting, product-focused"
            }
            AdStyle::LifestyleContext => {
                "real-world context, natural lighting, candid feel, people using product"
            }
            AdStyle::BoldDynamic => {
                "dramatic 45-degree angle, vibrant colors, motion blur, energetic composition"
            }
            AdStyle::MinimalModern => {
                "extreme negative space, geometric simplicity, clean lines, minimalist design"
            }
            AdStyle::LuxuryPremium => {
                "dark moody lighting, rich deep colors, premium textures, sophisticated atmosphere"
            }
        }
    }

    pub fn headline(self, product: &str) -> String {
        match self {
            AdStyle::HeroProduct => format!("Get {product} Now"),
            AdStyle::LifestyleContext => format!("Experience {product}"),
            AdStyle::BoldDynamic => format!("{product} - Limited Time!"),
            AdStyle::MinimalModern => format!("Discover {product}"),
            AdStyle::LuxuryPremium => format!("Premium {product}"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tone {
    Urgent,
    Playful,
    #[default]
    Premium,
}

impl Tone {
    pub const fn as_str(self) -> &'static str {
        match self {
            Tone::Urgent => "urgent",
            Tone::Playful => "playful",
            Tone::Premium => "premium",
        }
    }

    pub const fn mood(self) -> &'static str {
        match self {
            Tone::Urgent => "high energy, bold colors, sense of urgency, action-oriented",
            Tone::Playful => "bright colors, fun atmosphere, friendly, approachable",
            Tone::Premium => "elegant, sophisticated, luxury, refined, high-end",
        }
    }

    pub const fn cta(self) -> &'static str {
        match self {
            Tone::Urgent => "Buy Now",
            Tone::Playful => "Try It",
            Tone::Premium => "Explore",
        }
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Product brief extraction
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProductBrief {
    pub name: String,
    pub description: String,
    pub tone: Tone,
}

fn for_product() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)for\s+([^.!?]+)").expect("valid regex"))
}

fn json_object() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\{[\s\S]*\}").expect("valid regex"))
}

const EXTRACTION_PROMPT: &str = "Extract product name and description from user message. \
Return JSON: {productName, productDescription, tone: 'urgent'|'playful'|'premium'}";

impl ProductBrief {
    /// Keyword guesses used when the extraction call gives nothing better.
    pub fn from_heuristics(text: &str) -> Self {
        let lower = text.to_lowercase();
        let mut brief = Self {
            name: "Product".into(),
            description: "High-quality product".into(),
            tone: Tone::Premium,
        };

        if lower.contains("coffee") || lower.contains("beanbox") {
            brief.name = "BeanBox Coffee Subscription".into();
            brief.description =
                "Premium coffee subscription service with curated beans from around the world"
                    .into();
        } else if lower.contains("urgent") {
            brief.tone = Tone::Urgent;
        } else if lower.contains("playful") || lower.contains("fun") {
            brief.tone = Tone::Playful;
        }

        if let Some(m) = for_product().captures(text).and_then(|c| c.get(1)) {
            let name = m.as_str().trim();
            if !name.is_empty() {
                brief.name = name.to_owned();
            }
        }
        brief
    }

    /// Overlay whatever the model managed to extract. Unparseable output
    /// leaves the brief untouched.
    pub fn merge_extraction(mut self, content: &str) -> Self {
        #[derive(Deserialize)]
        #[serde(rename_all = "camelCase")]
        struct Extracted {
            product_name: Option<String>,
            product_description: Option<String>,
            tone: Option<String>,
        }

        let Some(found) = json_object().find(content) else {
            return self;
        };
        let Ok(extracted) = serde_json::from_str::<Extracted>(found.as_str()) else {
            return self;
        };

        if let Some(name) = extracted.product_name.filter(|s| !s.trim().is_empty()) {
            self.name = name;
        }
        if let Some(desc) = extracted.product_description.filter(|s| !s.trim().is_empty()) {
            self.description = desc;
        }
        if let Some(tone) = extracted
            .tone
            .and_then(|t| serde_json::from_value::<Tone>(json!(t.to_lowercase())).ok())
        {
            self.tone = tone;
        }
        self
    }
}

pub fn build_prompt(brief: &ProductBrief, style: AdStyle, headline: &str, cta: &str) -> String {
    format!(
        r#"Professional advertisement for "{name}".

Product: {description}

{direction}

Mood: {mood}

Visual requirements:
- High-quality commercial photography, 4K resolution
- Professional composition with space for text overlay
- Headline text area: "{headline}" (top or center, bold typography)
- CTA button area: "{cta}" (bottom, prominent button style)
- Commercial quality, no watermarks, ready for social media

Style: {slug}, tone: {tone}"#,
        name = brief.name,
        description = brief.description,
        direction = style.direction(),
        mood = brief.tone.mood(),
        slug = style.slug(),
        tone = brief.tone.as_str(),
    )
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Markdown rendering
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, PartialEq)]
pub struct AdImage {
    pub style: AdStyle,
    pub image_url: String,
    pub headline: String,
    pub cta: String,
    /// False when the placeholder stands in for a failed generation.
    pub generated: bool,
}

pub fn plan_markdown(pricing: &PricingTable) -> String {
    let plan = ExecutionPlan::from_args(PlanArgs {
        task: format!(
            "Generate {} professional ad variations using FLUX.1",
            AdStyle::ALL.len()
        ),
        steps: AdStyle::ALL
            .iter()
            .map(|style| PlanStepArgs {
                action: style.plan_label().into(),
                tool: "generateAdImage".into(),
                cost: pricing.image_dev.as_dollars(),
                description: style.direction().into(),
            })
            .collect(),
        total_cost: None,
        estimated_time_seconds: 0,
    });
    format!("{}\nGenerating images now...\n\n", plan.to_markdown())
}

fn image_entry(position: usize, img: &AdImage) -> String {
    let title = img.style.title();
    format!(
        "### Option {position}: {title}\n\
         - **Image:** ![{title}]({url})\n\
         - **Headline:** {headline}\n\
         - **CTA:** {cta}\n\
         - **Style:** {direction}\n\n",
        url = img.image_url,
        headline = img.headline,
        cta = img.cta,
        direction = img.style.direction(),
    )
}

pub fn cost_line(total: Usd, agency: Usd) -> String {
    format!(
        "\n**💰 Total Cost: {total}** (vs {} agency fee = {}% savings!)\n",
        agency.display_with(0),
        savings_percent(agency - total, agency),
    )
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Flow
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

pub struct AdCreationInput {
    pub session_id: String,
    pub user_text: String,
}

pub struct AdCreation {
    extractor: Arc<dyn LlmProvider>,
    extraction_model: String,
    images: Arc<dyn ImageBackend>,
    image_store: Arc<ImageStore>,
    ledger: Ledger,
    pricing: PricingTable,
    placeholder_url: String,
    inline_limit: usize,
}

impl AdCreation {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        extractor: Arc<dyn LlmProvider>,
        extraction_model: impl Into<String>,
        images: Arc<dyn ImageBackend>,
        image_store: Arc<ImageStore>,
        ledger: Ledger,
        pricing: PricingTable,
        placeholder_url: impl Into<String>,
        inline_limit: usize,
    ) -> Self {
        Self {
            extractor,
            extraction_model: extraction_model.into(),
            images,
            image_store,
            ledger,
            pricing,
            placeholder_url: placeholder_url.into(),
            inline_limit,
        }
    }

    /// Spawn the flow; markdown chunks arrive on the returned channel.
    pub fn run(self: &Arc<Self>, input: AdCreationInput) -> mpsc::Receiver<String> {
        let (tx, rx) = mpsc::channel(16);
        let this = Arc::clone(self);
        let span = tracing::info_span!("ad_creation", session_id = %input.session_id);
        tokio::spawn(
            async move {
                this.drive(input, tx).await;
            }
            .instrument(span),
        );
        rx
    }

    /// Run the flow on the current task. Returns the images produced before
    /// the flow ended or the receiver went away.
    pub async fn drive(&self, input: AdCreationInput, tx: mpsc::Sender<String>) -> Vec<AdImage> {
        let mut images = Vec::with_capacity(AdStyle::ALL.len());

        if tx.send(plan_markdown(&self.pricing)).await.is_err() {
            return images;
        }

        let brief = self.extract_brief(&input.user_text).await;
        tracing::debug!(product = %brief.name, tone = brief.tone.as_str(), "product brief ready");

        for style in AdStyle::ALL {
            if tx.is_closed() {
                tracing::debug!(generated = images.len(), "client went away; stopping");
                return images;
            }
            images.push(self.generate_style(&input.session_id, &brief, style).await);
        }

        let charged = images.iter().filter(|img| img.generated).count();
        let total = Usd::from_micros(self.pricing.image_dev.micros() * charged as i64);

        let mut body = String::from("\n## 🎨 Generated Ad Images\n\n");
        body.push_str(&format!(
            "I've generated {} unique ad variations:\n\n",
            images.len()
        ));
        for (i, img) in images.iter().enumerate() {
            body.push_str(&image_entry(i + 1, img));
        }
        body.push_str(&cost_line(total, self.pricing.agency_reference));

        let _ = tx.send(body).await;
        tracing::info!(images = images.len(), charged, total = %total, "ad set finished");
        images
    }

    async fn extract_brief(&self, text: &str) -> ProductBrief {
        let brief = ProductBrief::from_heuristics(text);
        let req = ChatRequest {
            messages: vec![Message::system(EXTRACTION_PROMPT), Message::user(text)],
            tools: Vec::new(),
            temperature: Some(0.3),
            max_tokens: Some(200),
            model: Some(self.extraction_model.clone()),
        };
        match self.extractor.chat(req).await {
            Ok(resp) => brief.merge_extraction(&resp.content),
            Err(e) => {
                tracing::warn!(error = %e, "product extraction failed; using heuristics");
                brief
            }
        }
    }

    async fn generate_style(&self, session_id: &str, brief: &ProductBrief, style: AdStyle) -> AdImage {
        let headline = style.headline(&brief.name);
        let cta = brief.tone.cta().to_owned();
        let prompt = build_prompt(brief, style, &headline, &cta);
        let started = Instant::now();

        match self.images.generate(&prompt).await {
            Ok(payload) => {
                let image_url = self
                    .image_store
                    .hand_off(session_id, payload, self.inline_limit);
                self.ledger
                    .record(
                        session_id,
                        Service::ImageDev.ledger_name(),
                        self.pricing.image_dev,
                        started.elapsed().as_millis() as u64,
                        Some(json!({
                            "productName": brief.name,
                            "style": style.slug(),
                            "headline": headline,
                            "cta": cta,
                        })),
                    )
                    .await;
                AdImage {
                    style,
                    image_url,
                    headline,
                    cta,
                    generated: true,
                }
            }
            Err(e) => {
                tracing::warn!(
                    style = style.slug(),
                    backend = self.images.backend_name(),
                    error = %e,
                    "ad image failed; using placeholder"
                );
                AdImage {
                    style,
                    image_url: self.placeholder_url.clone(),
                    headline,
                    cta,
                    generated: false,
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn coffee_keyword_sets_the_demo_product() {
        let brief = ProductBrief::from_heuristics("make some ads about coffee");
        assert_eq!(brief.name, "BeanBox Coffee Subscription");
        assert_eq!(brief.tone, Tone::Premium);
    }

    #[test]
    fn for_clause_names_the_product() {
        let brief = ProductBrief::from_heuristics("Playful ads for Glow Candles. Thanks!");
        assert_eq!(brief.name, "Glow Candles");
        assert_eq!(brief.tone, Tone::Playful);
    }

    #[test]
    fn extraction_overrides_only_present_fields() {
        let base = ProductBrief::from_heuristics("ads please");
        let merged = base.clone().merge_extraction(
            "Sure! {\"productName\": \"Trail Shoes\", \"tone\": \"Urgent\"} hope that helps",
        );
        assert_eq!(merged.name, "Trail Shoes");
        assert_eq!(merged.description, "High-quality product");
        assert_eq!(merged.tone, Tone::Urgent);

        assert_eq!(base.clone().merge_extraction("no json here"), base);
        assert_eq!(base.clone().merge_extraction("{\"tone\": \"sleepy\"}"), base);
    }

    #[test]
    fn plan_lists_five_priced_steps() {
        let md = plan_markdown(&PricingTable::default());
        assert!(md.starts_with("📋 **Execution Plan**\n"));
        assert!(md.contains("**Task:** Generate 5 professional ad variations using FLUX.1\n"));
        assert!(md.contains("1. 🖼️ Hero Product Shot - $0.06\n"));
        assert!(md.contains("5. 🖼️ Luxury Premium - $0.06\n"));
        assert!(md.contains("**Total Cost:** $0.30\n"));
        assert!(md.ends_with("\nGenerating images now...\n\n"));
    }

    #[test]
    fn prompt_carries_headline_cta_and_direction() {
        let brief = ProductBrief {
            name: "Mug".into(),
            description: "Ceramic".into(),
            tone: Tone::Urgent,
        };
        let p = build_prompt(&brief, AdStyle::BoldDynamic, "Mug - Limited Time!", "Buy Now");
        assert!(p.starts_with("Professional advertisement for \"Mug\"."));
        assert!(p.contains("dramatic 45-degree angle"));
        assert!(p.contains("Mood: high energy"));
        assert!(p.contains("CTA button area: \"Buy Now\""));
        assert!(p.ends_with("Style: bold-dynamic, tone: urgent"));
    }

    #[test]
    fn cost_line_against_agency_fee() {
        let line = cost_line(Usd::from_dollars(0.30), Usd::from_dollars(500.0));
        assert_eq!(
            line,
            "\n**💰 Total Cost: $0.30** (vs $500 agency fee = 99.9% savings!)\n"
        );
    }
}
