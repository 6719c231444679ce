// SPDX-FileCopyrightText: 2026 Reverie Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `reverie chat` command implementation.
//!
//! Interactive REPL with colored prompt, streaming output, and readline
//! history. Turns go through the same orchestrator as the gateway, so
//! extraction runs in the background while the user keeps writing.

use std::io::Write;
use std::time::Duration;

use colored::Colorize;
use reverie_agent::{Reverie, TurnEvent};
use reverie_config::ReverieConfig;
use reverie_core::{JourneyRegistry, ReverieError};
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;

/// How long exit waits for in-flight extraction.
const DRAIN_TIMEOUT: Duration = Duration::from_secs(30);

const HELP: &str = "\
/new             start a new conversation
/journeys        list available journeys
/journey <id>    start a guided journey
/profile         show what Reverie has learned
/quit            exit";

/// One line of REPL input.
#[derive(Debug, PartialEq, Eq)]
enum Input {
    Empty,
    Message(String),
    Quit,
    Help,
    New,
    Journeys,
    Journey(String),
    Profile,
    Unknown(String),
}

fn parse_input(line: &str) -> Input {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return Input::Empty;
    }
    let Some(command) = trimmed.strip_prefix('/') else {
        return Input::Message(trimmed.to_string());
    };

    let (name, arg) = match command.split_once(char::is_whitespace) {
        Some((name, arg)) => (name, arg.trim()),
        None => (command, ""),
    };
    match (name, arg) {
        ("quit" | "exit", _) => Input::Quit,
        ("help", _) => Input::Help,
        ("new", _) => Input::New,
        ("journeys", _) => Input::Journeys,
        ("journey", id) if !id.is_empty() => Input::Journey(id.to_string()),
        ("profile", _) => Input::Profile,
        _ => Input::Unknown(trimmed.to_string()),
    }
}

pub async fn run_chat(
    config: ReverieConfig,
    conversation: Option<String>,
    journey: Option<String>,
) -> Result<(), ReverieError> {
    let reverie = Reverie::build(config).await?;
    let result = repl(&reverie, conversation, journey).await;
    reverie.shutdown(DRAIN_TIMEOUT).await?;
    result
}

async fn repl(
    reverie: &Reverie,
    conversation: Option<String>,
    journey: Option<String>,
) -> Result<(), ReverieError> {
    let orchestrator = reverie.orchestrator();

    let mut current = match (conversation, journey) {
        (Some(id), _) => Some(orchestrator.get_conversation(&id).await?.conversation.id),
        (None, Some(journey_id)) => {
            let conversation = orchestrator.start_journey(&journey_id).await?;
            announce_conversation(conversation.title.as_deref());
            Some(conversation.id)
        }
        (None, None) => None,
    };

    let mut rl = DefaultEditor::new()
        .map_err(|e| ReverieError::Internal(format!("failed to initialize readline: {e}")))?;

    println!("{}", reverie.config().agent.name.bold().green());
    println!("Type {} for commands, {} to exit.\n", "/help".yellow(), "/quit".yellow());

    let prompt = format!("{}> ", "you".green());
    loop {
        let line = match rl.readline(&prompt) {
            Ok(line) => line,
            Err(ReadlineError::Interrupted | ReadlineError::Eof) => break,
            Err(e) => {
                eprintln!("{}: {e}", "error".red());
                break;
            }
        };
        let input = parse_input(&line);
        if !matches!(input, Input::Empty) {
            let _ = rl.add_history_entry(line.trim());
        }

        match input {
            Input::Empty => {}
            Input::Quit => break,
            Input::Help => println!("{HELP}"),
            Input::New => match orchestrator.new_conversation().await {
                Ok(conversation) => {
                    current = Some(conversation.id);
                    println!("{}", "(new conversation)".dimmed());
                }
                Err(e) => eprintln!("{}: {e}", "error".red()),
            },
            Input::Journeys => {
                let journeys = reverie.journeys().list();
                if journeys.is_empty() {
                    println!("{}", "no journeys configured".dimmed());
                }
                for journey in journeys {
                    println!("{}  {}", journey.id.cyan(), journey.title);
                    if !journey.description.is_empty() {
                        println!("    {}", journey.description.dimmed());
                    }
                }
            }
            Input::Journey(id) => match orchestrator.start_journey(&id).await {
                Ok(conversation) => {
                    announce_conversation(conversation.title.as_deref());
                    current = Some(conversation.id);
                }
                Err(e) => eprintln!("{}: {e}", "error".red()),
            },
            Input::Profile => match orchestrator.profile().await {
                Ok(view) => {
                    let summary = view.profile.summary_text(view.narrative.as_ref());
                    if summary.is_empty() {
                        println!("{}", "nothing learned yet".dimmed());
                    } else {
                        println!("{summary}");
                    }
                }
                Err(e) => eprintln!("{}: {e}", "error".red()),
            },
            Input::Unknown(command) => {
                eprintln!("unknown command {}; try {}", command.yellow(), "/help".yellow());
            }
            Input::Message(text) => match stream_reply(reverie, &text, current.as_deref()).await {
                Ok(conversation_id) => current = Some(conversation_id),
                Err(e) => eprintln!("{}: {e}", "error".red()),
            },
        }
    }

    Ok(())
}

fn announce_conversation(title: Option<&str>) {
    if let Some(title) = title {
        println!("{}", format!("(journey: {title})").dimmed());
    }
}

/// Streams one turn to stdout. Returns the conversation it landed in.
async fn stream_reply(
    reverie: &Reverie,
    text: &str,
    conversation_id: Option<&str>,
) -> Result<String, ReverieError> {
    let mut rx = reverie
        .orchestrator()
        .stream_turn(text, conversation_id)
        .await?;

    let mut stdout = std::io::stdout();
    let mut thinking_shown = false;
    while let Some(event) = rx.recv().await {
        match event {
            TurnEvent::Thinking => {
                if !thinking_shown {
                    print!("{}", "thinking... ".dimmed());
                    thinking_shown = true;
                }
            }
            TurnEvent::Chunk { text } => print!("{text}"),
            TurnEvent::Done {
                conversation_id,
                title,
                ..
            } => {
                println!();
                if let Some(title) = title {
                    println!("{}", format!("(titled: {title})").dimmed());
                }
                return Ok(conversation_id);
            }
            TurnEvent::Error { message } => {
                println!();
                return Err(ReverieError::provider(message));
            }
        }
        let _ = stdout.flush();
    }

    Err(ReverieError::Internal("turn ended without a result".to_string()))
}
