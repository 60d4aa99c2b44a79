use serde::Serialize;

/// Structured trace events emitted across all felos crates.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event")]
pub enum TraceEvent {
    LlmRequest {
        provider: String,
        model: String,
        streaming: bool,
        round: usize,
        duration_ms: u64,
        prompt_tokens: Option<u32>,
        completion_tokens: Option<u32>,
    },
    ToolExecuted {
        session_id: String,
        tool_name: String,
        success: bool,
        duration_ms: u64,
    },
    LedgerWrite {
        session_id: String,
        service: String,
        amount_usd: f64,
    },
    ImageStored {
        key: String,
        bytes: usize,
        evicted: usize,
    },
    ImageJobFinished {
        job_id: String,
        attempts: u32,
        outcome: String,
    },
    TurnFinished {
        session_id: String,
        rounds: usize,
        outcome: String,
    },
    AdEventRecorded {
        kind: String,
        ad_id: String,
        campaign_id: String,
    },
    PaymentChecked {
        resource: String,
        accepted: bool,
    },
}

impl TraceEvent {
    pub fn emit(&self) {
        let json = serde_json::to_string(self).unwrap_or_default();
        tracing::info!(trace_event = %json, "felos_event");
    }
}
