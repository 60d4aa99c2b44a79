use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use serde_json::{json, Value};
use tokio::sync::{mpsc, oneshot};

use felos_domain::error::{Error, Result};
use felos_domain::stream::{BoxStream, StreamEvent, Usage};
use felos_domain::tool::{ContentPart, Message, MessageContent, Role, ToolCall, ToolDefinition};
use felos_gateway::runtime::{Orchestrator, TurnEvent, TurnInput, TurnOutcome, TurnSettings};
use felos_providers::{ChatRequest, ChatResponse, LlmProvider};
use felos_tools::ToolExecutor;

// ── Scripted collaborators ───────────────────────────────────────────

enum Reply {
    Events(Vec<StreamEvent>),
    Fail(&'static str),
    Hang,
}

/// Replays one [`Reply`] per completion call; `repeat` answers once the
/// script runs out.
struct ScriptedLlm {
    script: Mutex<VecDeque<Reply>>,
    repeat: Option<Vec<StreamEvent>>,
    requests: Mutex<Vec<ChatRequest>>,
}

impl ScriptedLlm {
    fn new(script: Vec<Reply>) -> Arc<Self> {
        Arc::new(Self {
            script: Mutex::new(script.into()),
            repeat: None,
            requests: Mutex::new(Vec::new()),
        })
    }

    fn repeating(events: Vec<StreamEvent>) -> Arc<Self> {
        Arc::new(Self {
            script: Mutex::new(VecDeque::new()),
            repeat: Some(events),
            requests: Mutex::new(Vec::new()),
        })
    }

    fn calls(&self) -> usize {
        self.requests.lock().len()
    }
}

#[async_trait::async_trait]
impl LlmProvider for ScriptedLlm {
    async fn chat(&self, _req: ChatRequest) -> Result<ChatResponse> {
        Err(Error::Other("not scripted".into()))
    }

    async fn chat_stream(&self, req: ChatRequest) -> Result<BoxStream<'static, Result<StreamEvent>>> {
        self.requests.lock().push(req);
        let next = self.script.lock().pop_front();
        let reply = match (next, &self.repeat) {
            (Some(r), _) => r,
            (None, Some(events)) => Reply::Events(events.clone()),
            (None, None) => return Err(Error::Other("script exhausted".into())),
        };
        match reply {
            Reply::Events(events) => Ok(Box::pin(futures_util::stream::iter(
                events.into_iter().map(Ok),
            ))),
            Reply::Fail(msg) => Err(Error::Provider {
                provider: "scripted".into(),
                message: msg.into(),
            }),
            Reply::Hang => Ok(Box::pin(futures_util::stream::pending::<Result<StreamEvent>>())),
        }
    }

    fn provider_id(&self) -> &str {
        "scripted"
    }

    fn default_model(&self) -> &str {
        "scripted-model"
    }
}

/// Records every call; optionally parks the first one until released.
struct RecordingTools {
    calls: Mutex<Vec<(String, ToolCall)>>,
    gate: Mutex<Option<oneshot::Receiver<()>>>,
}

impl RecordingTools {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            calls: Mutex::new(Vec::new()),
            gate: Mutex::new(None),
        })
    }

    fn gated(gate: oneshot::Receiver<()>) -> Arc<Self> {
        Arc::new(Self {
            calls: Mutex::new(Vec::new()),
            gate: Mutex::new(Some(gate)),
        })
    }

    fn calls(&self) -> Vec<(String, ToolCall)> {
        self.calls.lock().clone()
    }
}

#[async_trait::async_trait]
impl ToolExecutor for RecordingTools {
    fn definitions(&self) -> Vec<ToolDefinition> {
        vec![ToolDefinition {
            name: "scrapeProduct".into(),
            description: "scrape".into(),
            parameters: json!({ "type": "object" }),
        }]
    }

    async fn execute(&self, session_id: &str, call: &ToolCall) -> Value {
        self.calls.lock().push((session_id.to_owned(), call.clone()));
        let gate = self.gate.lock().take();
        if let Some(gate) = gate {
            let _ = gate.await;
        }
        if call.tool_name == "broken" {
            return json!({ "success": false, "error": "boom" });
        }
        json!({ "success": true, "tool": call.tool_name })
    }
}

// ── Helpers ──────────────────────────────────────────────────────────

fn settings(max_rounds: usize, deadline: Duration) -> TurnSettings {
    TurnSettings {
        max_rounds,
        deadline,
        channel_capacity: 64,
        temperature: None,
        system_prompt: Arc::from("You are a test agent."),
    }
}

fn orchestrator(
    llm: Arc<ScriptedLlm>,
    tools: Arc<RecordingTools>,
    settings: TurnSettings,
) -> Arc<Orchestrator> {
    Arc::new(Orchestrator::new(llm, tools, settings))
}

fn input(text: &str) -> TurnInput {
    TurnInput {
        session_id: "sess-1".into(),
        messages: vec![Message::user(text)],
    }
}

fn fragment(index: u32, id: Option<&str>, name: Option<&str>, args: &str) -> StreamEvent {
    StreamEvent::ToolCallFragment {
        index,
        call_id: id.map(str::to_owned),
        tool_name: name.map(str::to_owned),
        arguments: args.to_owned(),
    }
}

fn token(text: &str) -> StreamEvent {
    StreamEvent::Token { text: text.into() }
}

fn done(usage: Option<Usage>) -> StreamEvent {
    StreamEvent::Done {
        usage,
        finish_reason: None,
    }
}

async fn collect(mut rx: mpsc::Receiver<TurnEvent>) -> Vec<TurnEvent> {
    let mut events = Vec::new();
    while let Some(ev) = rx.recv().await {
        events.push(ev);
    }
    events
}

fn tool_result_id(msg: &Message) -> Option<&str> {
    match &msg.content {
        MessageContent::Parts(parts) => parts.iter().find_map(|p| match p {
            ContentPart::ToolResult { tool_use_id, .. } => Some(tool_use_id.as_str()),
            _ => None,
        }),
        MessageContent::Text(_) => None,
    }
}

// ── Tests ────────────────────────────────────────────────────────────

#[tokio::test]
async fn fragments_concatenate_into_the_executed_arguments() {
    let llm = ScriptedLlm::new(vec![
        Reply::Events(vec![
            fragment(0, Some("call_1"), Some("scrapeProduct"), ""),
            fragment(0, None, None, "{\"url\":"),
            fragment(0, None, None, "\"https://beanbox.co\"}"),
            done(Some(Usage {
                prompt_tokens: 10,
                completion_tokens: 5,
                total_tokens: 15,
            })),
        ]),
        Reply::Events(vec![token("Here "), token("you go"), done(None)]),
    ]);
    let tools = RecordingTools::new();
    let orch = orchestrator(llm.clone(), tools.clone(), settings(10, Duration::from_secs(120)));

    let events = collect(orch.run_turn(input("scrape beanbox"))).await;

    let calls = tools.calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].0, "sess-1");
    assert_eq!(calls[0].1.arguments, "{\"url\":\"https://beanbox.co\"}");

    assert!(matches!(
        &events[0],
        TurnEvent::ToolCallEvent { call_id, arguments, .. }
            if call_id == "call_1" && arguments["url"] == "https://beanbox.co"
    ));
    assert!(matches!(&events[1], TurnEvent::ToolResult { is_error: false, .. }));
    let text: String = events
        .iter()
        .filter_map(|e| match e {
            TurnEvent::AssistantDelta { text } => Some(text.as_str()),
            _ => None,
        })
        .collect();
    assert_eq!(text, "Here you go");
    assert!(events.contains(&TurnEvent::Done {
        content: "Here you go".into()
    }));
    assert_eq!(
        events.last(),
        Some(&TurnEvent::UsageEvent {
            input_tokens: 10,
            output_tokens: 5,
            total_tokens: 15,
        })
    );
    assert_eq!(llm.calls(), 2);
}

#[tokio::test]
async fn tool_round_appends_assistant_then_results_in_index_order() {
    let llm = ScriptedLlm::new(vec![
        Reply::Events(vec![
            // Index 1 arrives first; execution still follows index order.
            fragment(1, Some("call_b"), Some("broken"), "{}"),
            fragment(0, Some("call_a"), Some("scrapeProduct"), "{\"url\":\"u\"}"),
            done(None),
        ]),
        Reply::Events(vec![token("ok"), done(None)]),
    ]);
    let tools = RecordingTools::new();
    let orch = orchestrator(llm.clone(), tools.clone(), settings(10, Duration::from_secs(120)));

    let events = collect(orch.run_turn(input("go"))).await;

    let executed: Vec<String> = tools.calls().into_iter().map(|(_, c)| c.call_id).collect();
    assert_eq!(executed, ["call_a", "call_b"]);

    let requests = llm.requests.lock();
    let msgs = &requests[1].messages;
    assert_eq!(msgs.len(), 5);
    assert_eq!(msgs[0].role, Role::System);
    assert_eq!(msgs[1].role, Role::User);
    assert_eq!(msgs[2].role, Role::Assistant);
    let uses: Vec<&str> = msgs[2].tool_uses().into_iter().map(|(id, _, _)| id).collect();
    assert_eq!(uses, ["call_a", "call_b"]);
    assert_eq!(msgs[3].role, Role::Tool);
    assert_eq!(tool_result_id(&msgs[3]), Some("call_a"));
    assert_eq!(tool_result_id(&msgs[4]), Some("call_b"));

    let failed = events.iter().find_map(|e| match e {
        TurnEvent::ToolResult {
            call_id, is_error, ..
        } if call_id == "call_b" => Some(*is_error),
        _ => None,
    });
    assert_eq!(failed, Some(true));
}

#[tokio::test]
async fn round_limit_caps_completion_calls_and_reports_truncation() {
    let llm = ScriptedLlm::repeating(vec![
        fragment(0, Some("loop"), Some("scrapeProduct"), "{}"),
        done(None),
    ]);
    let tools = RecordingTools::new();
    let orch = orchestrator(llm.clone(), tools.clone(), settings(10, Duration::from_secs(120)));

    let (tx, rx) = mpsc::channel(256);
    let outcome = orch.drive(input("forever"), tx).await;
    let events = collect(rx).await;

    assert_eq!(outcome, TurnOutcome::Truncated);
    assert_eq!(llm.calls(), 10);
    // The tenth round's calls are reported, not executed.
    assert_eq!(tools.calls().len(), 9);
    match events.last() {
        Some(TurnEvent::Truncated { rounds, tool_calls }) => {
            assert_eq!(*rounds, 10);
            assert_eq!(tool_calls.len(), 1);
            assert_eq!(tool_calls[0].tool_name, "scrapeProduct");
        }
        other => panic!("expected truncated event, got {other:?}"),
    }
}

#[tokio::test]
async fn provider_failure_becomes_an_apology() {
    let llm = ScriptedLlm::new(vec![Reply::Fail("HTTP 503")]);
    let tools = RecordingTools::new();
    let orch = orchestrator(llm, tools.clone(), settings(10, Duration::from_secs(120)));

    let (tx, rx) = mpsc::channel(16);
    let outcome = orch.drive(input("hi"), tx).await;
    let events = collect(rx).await;

    assert_eq!(outcome, TurnOutcome::Failed);
    assert!(tools.calls().is_empty());
    match &events[..] {
        [TurnEvent::Error { message, detail }] => {
            assert!(message.starts_with("Sorry"));
            assert!(detail.contains("HTTP 503"));
        }
        other => panic!("unexpected events: {other:?}"),
    }
}

#[tokio::test(start_paused = true)]
async fn stalled_stream_hits_the_deadline() {
    let llm = ScriptedLlm::new(vec![Reply::Hang]);
    let tools = RecordingTools::new();
    let orch = orchestrator(llm, tools, settings(10, Duration::from_secs(5)));

    let (tx, rx) = mpsc::channel(16);
    let outcome = orch.drive(input("hi"), tx).await;
    let events = collect(rx).await;

    assert_eq!(outcome, TurnOutcome::Failed);
    assert!(matches!(
        &events[..],
        [TurnEvent::Error { detail, .. }] if detail.contains("5s deadline")
    ));
}

#[tokio::test]
async fn closed_client_stops_before_any_completion() {
    let llm = ScriptedLlm::new(vec![Reply::Events(vec![token("never"), done(None)])]);
    let tools = RecordingTools::new();
    let orch = orchestrator(llm.clone(), tools, settings(10, Duration::from_secs(120)));

    let (tx, rx) = mpsc::channel(16);
    drop(rx);
    let outcome = orch.drive(input("hi"), tx).await;

    assert_eq!(outcome, TurnOutcome::Disconnected);
    assert_eq!(llm.calls(), 0);
}

#[tokio::test]
async fn disconnect_mid_tool_lets_it_finish_but_starts_nothing_new() {
    let llm = ScriptedLlm::new(vec![
        Reply::Events(vec![
            fragment(0, Some("first"), Some("scrapeProduct"), "{}"),
            fragment(1, Some("second"), Some("scrapeProduct"), "{}"),
            done(None),
        ]),
        Reply::Events(vec![token("unreachable"), done(None)]),
    ]);
    let (release, gate) = oneshot::channel();
    let tools = RecordingTools::gated(gate);
    let orch = orchestrator(llm.clone(), tools.clone(), settings(10, Duration::from_secs(120)));

    let (tx, mut rx) = mpsc::channel(16);
    let driver = {
        let orch = Arc::clone(&orch);
        tokio::spawn(async move { orch.drive(input("go"), tx).await })
    };

    let first = rx.recv().await;
    assert!(matches!(first, Some(TurnEvent::ToolCallEvent { ref call_id, .. }) if call_id == "first"));
    drop(rx);
    release.send(()).ok();

    let outcome = driver.await.unwrap();
    assert_eq!(outcome, TurnOutcome::Disconnected);
    let executed: Vec<String> = tools.calls().into_iter().map(|(_, c)| c.call_id).collect();
    assert_eq!(executed, ["first"]);
    assert_eq!(llm.calls(), 1);
}
