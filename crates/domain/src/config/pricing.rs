use serde::{Deserialize, Serialize};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Pricing (USD)
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Per-call prices in dollars. Resolved into
/// [`PricingTable`](crate::pricing::PricingTable) at startup.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PricingConfig {
    #[serde(default = "d_scrape")]
    pub scrape: f64,
    #[serde(default = "d_ad_copy")]
    pub ad_copy: f64,
    #[serde(default = "d_image")]
    pub image_fast: f64,
    #[serde(default = "d_image")]
    pub image_dev: f64,
    #[serde(default)]
    pub subscription: SubscriptionConfig,
    #[serde(default = "d_agency")]
    pub agency_reference: f64,
}

impl Default for PricingConfig {
    fn default() -> Self {
        Self {
            scrape: d_scrape(),
            ad_copy: d_ad_copy(),
            image_fast: d_image(),
            image_dev: d_image(),
            subscription: SubscriptionConfig::default(),
            agency_reference: d_agency(),
        }
    }
}

/// Monthly prices of the equivalent subscriptions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubscriptionConfig {
    #[serde(default = "d_firecrawl")]
    pub firecrawl: f64,
    #[serde(default = "d_fireworks")]
    pub fireworks: f64,
    #[serde(default = "d_image_gen")]
    pub image_gen: f64,
    #[serde(default = "d_copy_ai")]
    pub copy_ai: f64,
}

impl Default for SubscriptionConfig {
    fn default() -> Self {
        Self {
            firecrawl: d_firecrawl(),
            fireworks: d_fireworks(),
            image_gen: d_image_gen(),
            copy_ai: d_copy_ai(),
        }
    }
}

fn d_scrape() -> f64 {
    0.01
}
fn d_ad_copy() -> f64 {
    0.02
}
fn d_image() -> f64 {
    0.06
}
fn d_agency() -> f64 {
    500.0
}
fn d_firecrawl() -> f64 {
    99.0
}
fn d_fireworks() -> f64 {
    50.0
}
fn d_image_gen() -> f64 {
    20.0
}
fn d_copy_ai() -> f64 {
    30.0
}
