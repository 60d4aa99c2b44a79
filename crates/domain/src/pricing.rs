//! Static service prices and the subscription reference they are compared
//! against.

use serde::Serialize;

use crate::config::PricingConfig;
use crate::money::Usd;

/// Billable external services. The ledger stores [`Service::ledger_name`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Service {
    /// Product page extraction.
    Scrape,
    /// Ad copy completion.
    AdCopy,
    /// Fast image model (chat tool).
    ImageFast,
    /// Higher quality image model (ad-creation flow).
    ImageDev,
}

impl Service {
    pub const ALL: [Service; 4] = [
        Service::Scrape,
        Service::AdCopy,
        Service::ImageFast,
        Service::ImageDev,
    ];

    pub const fn ledger_name(self) -> &'static str {
        match self {
            Service::Scrape => "firecrawl",
            Service::AdCopy => "fireworks-llm",
            Service::ImageFast => "fireworks-flux",
            Service::ImageDev => "FLUX.1 dev",
        }
    }

    pub fn from_ledger_name(name: &str) -> Option<Service> {
        Service::ALL.into_iter().find(|s| s.ledger_name() == name)
    }
}

/// Monthly subscription costs of the tools the pay-per-call flow replaces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscriptionReference {
    pub firecrawl: Usd,
    pub fireworks: Usd,
    pub image_gen: Usd,
    pub copy_ai: Usd,
}

impl SubscriptionReference {
    pub fn total(&self) -> Usd {
        self.firecrawl + self.fireworks + self.image_gen + self.copy_ai
    }
}

/// Resolved price table, built once from [`PricingConfig`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PricingTable {
    pub scrape: Usd,
    pub ad_copy: Usd,
    pub image_fast: Usd,
    pub image_dev: Usd,
    pub subscription: SubscriptionReference,
    /// Agency fee for a five-ad set, used by the ad-creation summary.
    pub agency_reference: Usd,
}

impl PricingTable {
    pub fn from_config(cfg: &PricingConfig) -> Self {
        Self {
            scrape: Usd::from_dollars(cfg.scrape),
            ad_copy: Usd::from_dollars(cfg.ad_copy),
            image_fast: Usd::from_dollars(cfg.image_fast),
            image_dev: Usd::from_dollars(cfg.image_dev),
            subscription: SubscriptionReference {
                firecrawl: Usd::from_dollars(cfg.subscription.firecrawl),
                fireworks: Usd::from_dollars(cfg.subscription.fireworks),
                image_gen: Usd::from_dollars(cfg.subscription.image_gen),
                copy_ai: Usd::from_dollars(cfg.subscription.copy_ai),
            },
            agency_reference: Usd::from_dollars(cfg.agency_reference),
        }
    }

    pub fn price(&self, service: Service) -> Usd {
        match service {
            Service::Scrape => self.scrape,
            Service::AdCopy => self.ad_copy,
            Service::ImageFast => self.image_fast,
            Service::ImageDev => self.image_dev,
        }
    }

    /// Cost of one complete ad: scrape, copy and one image.
    pub fn per_ad(&self) -> Usd {
        self.scrape + self.ad_copy + self.image_fast
    }
}

impl Default for PricingTable {
    fn default() -> Self {
        Self::from_config(&PricingConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_prices() {
        let p = PricingTable::default();
        assert_eq!(p.price(Service::Scrape), Usd::from_dollars(0.01));
        assert_eq!(p.price(Service::AdCopy), Usd::from_dollars(0.02));
        assert_eq!(p.price(Service::ImageFast), Usd::from_dollars(0.06));
        assert_eq!(p.per_ad(), Usd::from_dollars(0.09));
        assert_eq!(p.subscription.total(), Usd::from_dollars(199.0));
    }

    #[test]
    fn ledger_names_round_trip() {
        for s in Service::ALL {
            assert_eq!(Service::from_ledger_name(s.ledger_name()), Some(s));
        }
        assert_eq!(Service::from_ledger_name("unknown"), None);
    }
}
