//! `createExecutionPlan`: a zero-cost, side-effect-free echo of what the
//! model intends to do, with the cost framed against subscriptions.

use serde::{Deserialize, Serialize};

use felos_domain::money::Usd;
use felos_domain::pricing::PricingTable;

use crate::report::{monthly, savings_percent};

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanStepArgs {
    pub action: String,
    #[serde(default)]
    pub tool: String,
    #[serde(default)]
    pub cost: f64,
    #[serde(default)]
    pub description: String,
}

/// Arguments of `createExecutionPlan`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanArgs {
    pub task: String,
    #[serde(default)]
    pub steps: Vec<PlanStepArgs>,
    /// Sum of step costs when absent.
    #[serde(default)]
    pub total_cost: Option<f64>,
    #[serde(default)]
    pub estimated_time_seconds: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanStep {
    pub step_number: usize,
    pub action: String,
    pub tool: String,
    pub cost: Usd,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionPlan {
    pub task: String,
    pub steps: Vec<PlanStep>,
    pub total_cost: Usd,
    pub estimated_time_seconds: u64,
}

impl ExecutionPlan {
    /// Number the steps from 1 and settle the total.
    pub fn from_args(args: PlanArgs) -> Self {
        let steps: Vec<PlanStep> = args
            .steps
            .into_iter()
            .enumerate()
            .map(|(i, s)| PlanStep {
                step_number: i + 1,
                action: s.action,
                tool: s.tool,
                cost: Usd::from_dollars(s.cost.max(0.0)),
                description: s.description,
            })
            .collect();
        let total_cost = match args.total_cost {
            Some(total) if total.is_finite() && total >= 0.0 => Usd::from_dollars(total),
            _ => steps.iter().map(|s| s.cost).sum(),
        };
        Self {
            task: args.task,
            steps,
            total_cost,
            estimated_time_seconds: args.estimated_time_seconds,
        }
    }

    /// The boxed plan block streamed before the ad-creation flow runs.
    pub fn to_markdown(&self) -> String {
        const RULE: &str = "━━━━━━━━━━━━━━━━━━━━━";
        let mut out = format!(
            "📋 **Execution Plan**\n{RULE}\n**Task:** {}\n**Steps:**\n",
            self.task
        );
        for step in &self.steps {
            out.push_str(&format!("{}. {} - {}\n", step.step_number, step.action, step.cost));
        }
        out.push_str(&format!("**Total Cost:** {}\n{RULE}\n", self.total_cost));
        out
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanResult {
    pub success: bool,
    pub plan: ExecutionPlan,
    pub subscription_cost: String,
    pub savings: String,
    pub savings_percent: String,
    pub summary: String,
}

pub fn create_plan(args: PlanArgs, pricing: &PricingTable) -> PlanResult {
    let plan = ExecutionPlan::from_args(args);
    let subscription = pricing.subscription.total();
    let savings = subscription - plan.total_cost;
    let percent = savings_percent(savings, subscription);
    let summary = format!(
        "{} steps for {} with pay-per-call pricing versus {} in subscriptions: {} saved ({}%).",
        plan.steps.len(),
        plan.total_cost,
        monthly(subscription),
        savings,
        percent
    );

    PlanResult {
        success: true,
        plan,
        subscription_cost: monthly(subscription),
        savings: savings.to_string(),
        savings_percent: percent,
        summary,
    }
}
