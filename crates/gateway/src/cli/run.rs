//! `felos run`: one-shot turn.
//!
//! Boots the same runtime as `serve`, sends a single message, streams the
//! answer to stdout and exits. Tool activity goes to stderr.

use std::io::Write;
use std::sync::Arc;

use felos_domain::config::Config;
use felos_domain::tool::Message;

use crate::bootstrap;
use crate::runtime::{TurnEvent, TurnInput};

pub async fn run(
    config: Arc<Config>,
    message: String,
    session_id: String,
    json_output: bool,
) -> anyhow::Result<()> {
    let state = bootstrap::build_app_state(config).await?;

    let mut rx = state.orchestrator.run_turn(TurnInput {
        session_id,
        messages: vec![Message::user(message)],
    });

    let mut failed = false;
    let mut collected: Vec<TurnEvent> = Vec::new();

    while let Some(event) = rx.recv().await {
        if matches!(event, TurnEvent::Error { .. }) {
            failed = true;
        }
        if json_output {
            collected.push(event);
            continue;
        }
        match &event {
            TurnEvent::AssistantDelta { text } => {
                print!("{text}");
                std::io::stdout().flush().ok();
            }
            TurnEvent::ToolCallEvent { tool_name, .. } => {
                eprintln!("\x1b[2m[tool: {tool_name}]\x1b[0m");
            }
            TurnEvent::ToolResult {
                tool_name,
                is_error: true,
                ..
            } => {
                eprintln!("\x1b[2m[tool failed: {tool_name}]\x1b[0m");
            }
            TurnEvent::Truncated { rounds, .. } => {
                eprintln!("turn stopped after {rounds} rounds");
            }
            TurnEvent::Error { message, detail } => {
                eprintln!("error: {message} ({detail})");
            }
            TurnEvent::Done { .. } => println!(),
            TurnEvent::ToolResult { .. } | TurnEvent::UsageEvent { .. } => {}
        }
    }

    if json_output {
        let json = serde_json::to_string_pretty(&collected)
            .map_err(|e| anyhow::anyhow!("serializing events: {e}"))?;
        println!("{json}");
    }

    if failed {
        std::process::exit(1);
    }
    Ok(())
}
