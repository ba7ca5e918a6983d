//! `fieldrep chat`: one-shot or interactive chat mode.
//!
//! History is kept here, client-side, as user and assistant turns only. Each
//! message is dispatched on a fresh conversation rebuilt from that history,
//! exactly as the HTTP chat endpoint does.

use anyhow::Context;
use fieldrep_core::event::{DomainEvent, EventBus};
use fieldrep_core::message::{Conversation, Message};
use fieldrep_gateway::AppState;
use std::io::Write;
use std::path::Path;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};

pub async fn run(
    config_path: Option<&Path>,
    message: Option<String>,
    verbose: bool,
) -> anyhow::Result<()> {
    let config = super::load_config(config_path)?;

    if !config.has_api_key() {
        eprintln!();
        eprintln!("  ERROR: No API key configured!");
        eprintln!();
        eprintln!("  Set one of these environment variables:");
        eprintln!("    FIELDREP_API_KEY=...");
        eprintln!("    GROQ_API_KEY=...");
        eprintln!();
        eprintln!("  Or add `api_key` to your config file:");
        eprintln!("    {}", fieldrep_config::AppConfig::config_path().display());
        eprintln!();
        anyhow::bail!("No API key found. See above for setup instructions.");
    }

    let store = super::open_store(&config).await?;
    if config.database.seed_on_start {
        fieldrep_store::seed_if_empty(store.as_ref()).await?;
    }
    let provider = fieldrep_providers::build_from_config(&config)
        .context("Failed to configure the model provider")?;

    let event_bus = Arc::new(EventBus::default());
    if verbose {
        spawn_tool_printer(&event_bus);
    }

    let provider_name = config.provider.clone();
    let model = config.model.clone();
    let state = AppState::with_event_bus(config, store, provider, event_bus);
    let mut history: Vec<Message> = Vec::new();

    if let Some(msg) = message {
        let reply = send(&state, &mut history, msg).await?;
        println!("{reply}");
        return Ok(());
    }

    println!();
    println!("  FieldRep Assistant, interactive mode");
    println!();
    println!("  Provider:  {provider_name}");
    println!("  Model:     {model}");
    println!("  Tools:     {}", state.tools.names().join(", "));
    println!();
    println!("  Type your message and press Enter.");
    println!("  Type 'exit' or Ctrl+D to quit.");
    println!();

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        print!("  You > ");
        std::io::stdout().flush()?;

        let Some(line) = lines.next_line().await? else {
            break;
        };
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if matches!(line, "exit" | "quit") {
            break;
        }

        eprint!("  ...");
        let reply = send(&state, &mut history, line.to_string()).await;
        eprint!("\r     \r");
        match reply {
            Ok(reply) => println!("  Assistant > {reply}\n"),
            Err(e) => eprintln!("  Error: {e}\n"),
        }
    }

    println!("  Goodbye!");
    Ok(())
}

/// Dispatch one user message and record both turns in `history`.
async fn send(state: &AppState, history: &mut Vec<Message>, text: String) -> anyhow::Result<String> {
    let mut conversation = Conversation::from_history(history.clone());
    conversation.push(Message::user(&text));

    let outcome = state.dispatch.run(&mut conversation).await?;

    history.push(Message::user(text));
    history.push(Message::assistant(&outcome.reply));
    Ok(outcome.reply)
}

fn spawn_tool_printer(bus: &EventBus) {
    let mut rx = bus.subscribe();
    tokio::spawn(async move {
        while let Ok(event) = rx.recv().await {
            if let DomainEvent::ToolExecuted {
                tool_name,
                status,
                record_id,
                duration_ms,
                ..
            } = event.as_ref()
            {
                let record = record_id.map(|id| format!(" #{id}")).unwrap_or_default();
                eprintln!("  [tool] {tool_name} -> {status}{record} ({duration_ms}ms)");
            }
        }
    });
}
