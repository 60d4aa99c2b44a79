//! `getSpendingReport`: session spend against the subscription reference.

use std::collections::BTreeMap;

use serde::Serialize;

use felos_domain::money::Usd;
use felos_domain::pricing::PricingTable;
use felos_ledger::SessionSummary;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SpendingReport {
    pub success: bool,
    pub total_spent: String,
    pub by_service: BTreeMap<String, f64>,
    pub subscription_cost: String,
    pub savings: String,
    pub savings_percent: String,
    pub ads_for_subscription_price: u64,
    pub transaction_count: usize,
}

/// `$199/mo` for whole-dollar totals, `$199.50/mo` otherwise.
pub fn monthly(amount: Usd) -> String {
    if amount.micros() % 1_000_000 == 0 {
        format!("{}/mo", amount.display_with(0))
    } else {
        format!("{amount}/mo")
    }
}

/// Savings as a percentage of `reference`, one decimal.
pub fn savings_percent(savings: Usd, reference: Usd) -> String {
    if reference.is_zero() {
        return "0.0".into();
    }
    format!(
        "{:.1}",
        savings.micros() as f64 / reference.micros() as f64 * 100.0
    )
}

pub fn spending_report(summary: &SessionSummary, pricing: &PricingTable) -> SpendingReport {
    let subscription = pricing.subscription.total();
    let savings = subscription - summary.total;

    SpendingReport {
        success: true,
        total_spent: summary.total.to_string(),
        by_service: summary
            .by_service
            .iter()
            .map(|(service, amount)| (service.clone(), amount.as_dollars()))
            .collect(),
        subscription_cost: monthly(subscription),
        savings: savings.to_string(),
        savings_percent: savings_percent(savings, subscription),
        ads_for_subscription_price: subscription.whole_units_of(pricing.per_ad()),
        transaction_count: summary.count,
    }
}
