//! Turn execution loop: streams completions, assembles tool calls from
//! index-keyed fragments, runs them in order and feeds the results back
//! until the model answers without tools or the round limit is reached.
//!
//! Entry point: [`Orchestrator::run_turn`] spawns the loop and returns a
//! channel of [`TurnEvent`]s.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use futures_util::StreamExt;
use serde::Serialize;
use serde_json::Value;
use tokio::sync::mpsc;
use tokio::time::{timeout_at, Instant};
use tracing::Instrument;

use felos_domain::config::TurnConfig;
use felos_domain::stream::{StreamEvent, Usage};
use felos_domain::tool::{Message, ToolCall};
use felos_domain::trace::TraceEvent;
use felos_providers::{ChatRequest, LlmProvider};
use felos_tools::ToolExecutor;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// TurnEvent: the streamed event type
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Events emitted during a single chat turn.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type")]
pub enum TurnEvent {
    /// Incremental text from the assistant.
    #[serde(rename = "assistant_delta")]
    AssistantDelta { text: String },

    /// The model is invoking a tool.
    #[serde(rename = "tool_call")]
    ToolCallEvent {
        call_id: String,
        tool_name: String,
        arguments: Value,
    },

    /// Tool execution result.
    #[serde(rename = "tool_result")]
    ToolResult {
        call_id: String,
        tool_name: String,
        content: Value,
        #[serde(skip_serializing_if = "std::ops::Not::not")]
        is_error: bool,
    },

    /// The round limit was reached while the model still wanted tools.
    /// The named calls were not executed.
    #[serde(rename = "truncated")]
    Truncated {
        rounds: usize,
        tool_calls: Vec<PendingCall>,
    },

    /// The turn failed. `message` is written for the end user; `detail`
    /// is the upstream cause and stays server-side.
    #[serde(rename = "error")]
    Error {
        message: String,
        #[serde(skip)]
        detail: String,
    },

    /// Token usage for the turn.
    #[serde(rename = "usage")]
    UsageEvent {
        input_tokens: u32,
        output_tokens: u32,
        total_tokens: u32,
    },

    /// The model answered without requesting tools.
    #[serde(rename = "done")]
    Done { content: String },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PendingCall {
    pub call_id: String,
    pub tool_name: String,
}

/// How a turn ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnOutcome {
    Answered,
    Truncated,
    Failed,
    Disconnected,
}

impl TurnOutcome {
    pub fn as_str(self) -> &'static str {
        match self {
            TurnOutcome::Answered => "answered",
            TurnOutcome::Truncated => "truncated",
            TurnOutcome::Failed => "failed",
            TurnOutcome::Disconnected => "disconnected",
        }
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Run parameters
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Input to a single turn.
pub struct TurnInput {
    pub session_id: String,
    /// Prior conversation, oldest first. The system prompt is prepended by
    /// the orchestrator.
    pub messages: Vec<Message>,
}

#[derive(Debug, Clone)]
pub struct TurnSettings {
    pub max_rounds: usize,
    pub deadline: Duration,
    pub channel_capacity: usize,
    pub temperature: Option<f32>,
    pub system_prompt: Arc<str>,
}

impl TurnSettings {
    pub fn from_config(cfg: &TurnConfig, system_prompt: impl Into<Arc<str>>) -> Self {
        Self {
            max_rounds: cfg.max_rounds,
            deadline: Duration::from_secs(cfg.deadline_secs),
            channel_capacity: cfg.channel_capacity.max(1),
            temperature: cfg.temperature,
            system_prompt: system_prompt.into(),
        }
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Tool-call assembly
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Accumulates the fragments of one tool call.
#[derive(Debug, Default)]
struct CallSlot {
    call_id: Option<String>,
    tool_name: Option<String>,
    arguments: String,
}

impl CallSlot {
    fn absorb(&mut self, call_id: Option<String>, tool_name: Option<String>, fragment: &str) {
        if self.call_id.is_none() {
            self.call_id = call_id.filter(|id| !id.is_empty());
        }
        if self.tool_name.is_none() {
            self.tool_name = tool_name.filter(|name| !name.is_empty());
        }
        self.arguments.push_str(fragment);
    }
}

/// Slots in index order. A call whose id never arrived gets a synthetic one.
fn assemble(slots: BTreeMap<u32, CallSlot>, round: usize) -> Vec<ToolCall> {
    slots
        .into_iter()
        .map(|(index, slot)| ToolCall {
            call_id: slot
                .call_id
                .unwrap_or_else(|| format!("call_{round}_{index}")),
            tool_name: slot.tool_name.unwrap_or_default(),
            arguments: slot.arguments,
        })
        .collect()
}

fn display_arguments(raw: &str) -> Value {
    if raw.trim().is_empty() {
        return Value::Object(Default::default());
    }
    serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_owned()))
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Failures
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug)]
enum Failure {
    Deadline(Duration),
    Provider(String),
}

impl Failure {
    fn into_event(self) -> TurnEvent {
        match self {
            Failure::Deadline(budget) => TurnEvent::Error {
                message: "Sorry, that request took too long to finish. Please try again, \
                          or ask for fewer ads at once."
                    .into(),
                detail: format!("turn exceeded its {}s deadline", budget.as_secs()),
            },
            Failure::Provider(detail) => TurnEvent::Error {
                message: "Sorry, I couldn't reach the language model to finish your request. \
                          Please try again in a moment."
                    .into(),
                detail,
            },
        }
    }
}

enum RoundEnd {
    Finished {
        text: String,
        slots: BTreeMap<u32, CallSlot>,
        usage: Option<Usage>,
    },
    Failed(Failure),
    Disconnected,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Orchestrator
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

pub struct Orchestrator {
    provider: Arc<dyn LlmProvider>,
    tools: Arc<dyn ToolExecutor>,
    settings: TurnSettings,
}

impl Orchestrator {
    pub fn new(
        provider: Arc<dyn LlmProvider>,
        tools: Arc<dyn ToolExecutor>,
        settings: TurnSettings,
    ) -> Self {
        Self {
            provider,
            tools,
            settings,
        }
    }

    pub fn settings(&self) -> &TurnSettings {
        &self.settings
    }

    /// Spawn the turn and return its event stream. The channel closes when
    /// the turn ends, whatever the outcome.
    pub fn run_turn(self: &Arc<Self>, input: TurnInput) -> mpsc::Receiver<TurnEvent> {
        let (tx, rx) = mpsc::channel(self.settings.channel_capacity);
        let this = Arc::clone(self);
        let turn_span = tracing::info_span!("turn", session_id = %input.session_id);

        tokio::spawn(
            async move {
                tracing::debug!("turn started");
                this.drive(input, tx).await;
            }
            .instrument(turn_span),
        );
        rx
    }

    /// Run the turn to completion on the current task, sending events to
    /// `tx`. Dropping the receiver counts as a client disconnect.
    pub async fn drive(&self, input: TurnInput, tx: mpsc::Sender<TurnEvent>) -> TurnOutcome {
        let TurnInput {
            session_id,
            messages: history,
        } = input;

        let mut messages = Vec::with_capacity(history.len() + 1);
        messages.push(Message::system(self.settings.system_prompt.as_ref()));
        messages.extend(history);

        let mut usage = Usage::default();
        let (outcome, rounds) = self
            .run_rounds(&session_id, messages, &tx, &mut usage)
            .await;

        if usage.total_tokens > 0 && outcome != TurnOutcome::Disconnected {
            let _ = tx
                .send(TurnEvent::UsageEvent {
                    input_tokens: usage.prompt_tokens,
                    output_tokens: usage.completion_tokens,
                    total_tokens: usage.total_tokens,
                })
                .await;
        }

        tracing::info!(rounds, outcome = outcome.as_str(), "turn finished");
        TraceEvent::TurnFinished {
            session_id,
            rounds,
            outcome: outcome.as_str().into(),
        }
        .emit();
        outcome
    }

    async fn run_rounds(
        &self,
        session_id: &str,
        mut messages: Vec<Message>,
        tx: &mpsc::Sender<TurnEvent>,
        total_usage: &mut Usage,
    ) -> (TurnOutcome, usize) {
        let deadline = Instant::now() + self.settings.deadline;
        let tool_defs = self.tools.definitions();
        let max_rounds = self.settings.max_rounds;

        for round in 1..=max_rounds {
            if tx.is_closed() {
                return (TurnOutcome::Disconnected, round - 1);
            }
            if Instant::now() >= deadline {
                let failure = Failure::Deadline(self.settings.deadline);
                tracing::warn!(round, "turn deadline passed before round");
                let _ = tx.send(failure.into_event()).await;
                return (TurnOutcome::Failed, round - 1);
            }

            let req = ChatRequest {
                messages: messages.clone(),
                tools: tool_defs.clone(),
                temperature: self.settings.temperature,
                max_tokens: None,
                model: None,
            };

            let llm_call_span = tracing::info_span!(
                "llm.call",
                round,
                provider = self.provider.provider_id(),
                input_tokens = tracing::field::Empty,
                output_tokens = tracing::field::Empty,
            );
            let started = Instant::now();
            let end = self
                .stream_round(req, deadline, tx)
                .instrument(llm_call_span.clone())
                .await;

            let (text, slots, usage) = match end {
                RoundEnd::Finished { text, slots, usage } => (text, slots, usage),
                RoundEnd::Disconnected => {
                    tracing::debug!(round, "client went away mid-stream");
                    return (TurnOutcome::Disconnected, round);
                }
                RoundEnd::Failed(failure) => {
                    tracing::warn!(round, error = ?failure, "completion failed");
                    let _ = tx.send(failure.into_event()).await;
                    return (TurnOutcome::Failed, round);
                }
            };

            if let Some(u) = &usage {
                llm_call_span.record("input_tokens", u.prompt_tokens);
                llm_call_span.record("output_tokens", u.completion_tokens);
                total_usage.add(u);
            }
            TraceEvent::LlmRequest {
                provider: self.provider.provider_id().into(),
                model: self.provider.default_model().into(),
                streaming: true,
                round,
                duration_ms: started.elapsed().as_millis() as u64,
                prompt_tokens: usage.map(|u| u.prompt_tokens),
                completion_tokens: usage.map(|u| u.completion_tokens),
            }
            .emit();

            let calls = assemble(slots, round);

            if calls.is_empty() {
                let _ = tx.send(TurnEvent::Done { content: text }).await;
                return (TurnOutcome::Answered, round);
            }

            if round == max_rounds {
                tracing::warn!(
                    round,
                    pending = calls.len(),
                    "round limit reached with tool calls outstanding"
                );
                let _ = tx
                    .send(TurnEvent::Truncated {
                        rounds: round,
                        tool_calls: calls
                            .iter()
                            .map(|c| PendingCall {
                                call_id: c.call_id.clone(),
                                tool_name: c.tool_name.clone(),
                            })
                            .collect(),
                    })
                    .await;
                return (TurnOutcome::Truncated, round);
            }

            messages.push(Message::assistant_tool_calls(&text, &calls));

            for call in &calls {
                // A call already running finishes; none start after the
                // client is gone.
                if tx.is_closed() {
                    return (TurnOutcome::Disconnected, round);
                }

                let _ = tx
                    .send(TurnEvent::ToolCallEvent {
                        call_id: call.call_id.clone(),
                        tool_name: call.tool_name.clone(),
                        arguments: display_arguments(&call.arguments),
                    })
                    .await;

                let result = self.tools.execute(session_id, call).await;
                let is_error = result.get("success") == Some(&Value::Bool(false));
                let content = result.to_string();

                let _ = tx
                    .send(TurnEvent::ToolResult {
                        call_id: call.call_id.clone(),
                        tool_name: call.tool_name.clone(),
                        content: result,
                        is_error,
                    })
                    .await;

                messages.push(Message::tool_result(&call.call_id, content));
            }
        }

        (TurnOutcome::Truncated, max_rounds)
    }

    /// Consume one completion stream. Text is forwarded as it arrives; tool
    /// fragments are collected by index.
    async fn stream_round(
        &self,
        req: ChatRequest,
        deadline: Instant,
        tx: &mpsc::Sender<TurnEvent>,
    ) -> RoundEnd {
        let budget = self.settings.deadline;
        let mut stream = match timeout_at(deadline, self.provider.chat_stream(req)).await {
            Err(_) => return RoundEnd::Failed(Failure::Deadline(budget)),
            Ok(Err(e)) => return RoundEnd::Failed(Failure::Provider(e.to_string())),
            Ok(Ok(stream)) => stream,
        };

        let mut text = String::new();
        let mut slots: BTreeMap<u32, CallSlot> = BTreeMap::new();
        let mut usage = None;

        loop {
            let next = tokio::select! {
                biased;
                _ = tx.closed() => return RoundEnd::Disconnected,
                next = timeout_at(deadline, stream.next()) => next,
            };

            match next {
                Err(_) => return RoundEnd::Failed(Failure::Deadline(budget)),
                Ok(None) => break,
                Ok(Some(Err(e))) => return RoundEnd::Failed(Failure::Provider(e.to_string())),
                Ok(Some(Ok(event))) => match event {
                    StreamEvent::Token { text: delta } => {
                        if delta.is_empty() {
                            continue;
                        }
                        text.push_str(&delta);
                        if tx.send(TurnEvent::AssistantDelta { text: delta }).await.is_err() {
                            return RoundEnd::Disconnected;
                        }
                    }
                    StreamEvent::ToolCallFragment {
                        index,
                        call_id,
                        tool_name,
                        arguments,
                    } => {
                        slots
                            .entry(index)
                            .or_default()
                            .absorb(call_id, tool_name, &arguments);
                    }
                    StreamEvent::Done { usage: u, .. } => {
                        if u.is_some() {
                            usage = u;
                        }
                    }
                    StreamEvent::Error { message } => {
                        return RoundEnd::Failed(Failure::Provider(message));
                    }
                },
            }
        }

        RoundEnd::Finished { text, slots, usage }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_id_and_name_win_and_arguments_concatenate() {
        let mut slot = CallSlot::default();
        slot.absorb(Some("call_a".into()), Some("scrapeProduct".into()), "{\"url\":");
        slot.absorb(Some("call_b".into()), Some("other".into()), "\"https://x\"");
        slot.absorb(None, None, "}");
        assert_eq!(slot.call_id.as_deref(), Some("call_a"));
        assert_eq!(slot.tool_name.as_deref(), Some("scrapeProduct"));
        assert_eq!(slot.arguments, "{\"url\":\"https://x\"}");
    }

    #[test]
    fn assembly_follows_index_order_and_fills_missing_ids() {
        let mut slots = BTreeMap::new();
        slots.insert(
            1,
            CallSlot {
                call_id: Some("b".into()),
                tool_name: Some("generateAdCopy".into()),
                arguments: "{}".into(),
            },
        );
        slots.insert(
            0,
            CallSlot {
                call_id: None,
                tool_name: Some("scrapeProduct".into()),
                arguments: String::new(),
            },
        );
        let calls = assemble(slots, 3);
        assert_eq!(calls[0].call_id, "call_3_0");
        assert_eq!(calls[0].tool_name, "scrapeProduct");
        assert_eq!(calls[1].call_id, "b");
    }

    #[test]
    fn display_arguments_tolerates_garbage() {
        assert_eq!(display_arguments(""), serde_json::json!({}));
        assert_eq!(display_arguments("{\"a\":1}"), serde_json::json!({"a": 1}));
        assert_eq!(display_arguments("{\"a\":"), Value::String("{\"a\":".into()));
    }

    #[test]
    fn events_serialize_with_type_tags() {
        let ev = TurnEvent::ToolResult {
            call_id: "c".into(),
            tool_name: "t".into(),
            content: serde_json::json!({"success": true}),
            is_error: false,
        };
        let v = serde_json::to_value(&ev).unwrap();
        assert_eq!(v["type"], "tool_result");
        assert!(v.get("is_error").is_none());

        let truncated = TurnEvent::Truncated {
            rounds: 10,
            tool_calls: vec![PendingCall {
                call_id: "c".into(),
                tool_name: "generateAdImage".into(),
            }],
        };
        let v = serde_json::to_value(&truncated).unwrap();
        assert_eq!(v["type"], "truncated");
        assert_eq!(v["tool_calls"][0]["tool_name"], "generateAdImage");
    }

    #[test]
    fn error_events_keep_the_upstream_cause_private() {
        let ev = Failure::Provider("provider openai: HTTP 503: upstream down".into()).into_event();
        let v = serde_json::to_value(&ev).unwrap();
        assert_eq!(v["type"], "error");
        assert!(v["message"].as_str().unwrap().starts_with("Sorry"));
        assert!(v.get("detail").is_none());
        assert!(!v.to_string().contains("HTTP 503"));
    }
}
