//! CLI command execution.

use std::future::Future;
use std::io::Write;

use anyhow::{bail, Context, Result};
use chrono::Local;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader, Lines};
use tracing::debug;

use crate::client::AnswerClient;
use crate::config::{Config, ConfigOverrides};
use crate::models::{Message, MessageId, MessageRole};
use crate::session::{ChatSession, ExchangeReport};
use crate::stream::StreamEvent;

use super::args::{Cli, Commands};

/// A line typed in the interactive chat.
#[derive(Debug, Clone, PartialEq, Eq)]
enum ChatCommand {
    /// Ask the line as a question.
    Ask(String),
    /// Toggle the sources of the n-th message (1-based).
    Sources(usize),
    Clear,
    Export,
    History,
    Help,
    Quit,
    /// Blank line.
    Nothing,
    /// Unrecognized slash command.
    Unknown(String),
}

fn parse_command(line: &str) -> ChatCommand {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return ChatCommand::Nothing;
    }
    if !trimmed.starts_with('/') {
        return ChatCommand::Ask(line.trim_end_matches(['\r', '\n']).to_string());
    }

    let mut parts = trimmed.split_whitespace();
    let name = parts.next().unwrap_or_default();
    match (name, parts.next()) {
        ("/quit" | "/exit", None) => ChatCommand::Quit,
        ("/clear", None) => ChatCommand::Clear,
        ("/export", None) => ChatCommand::Export,
        ("/history", None) => ChatCommand::History,
        ("/help", None) => ChatCommand::Help,
        ("/sources", Some(n)) => n
            .parse::<usize>()
            .ok()
            .filter(|&n| n > 0)
            .map_or_else(|| ChatCommand::Unknown(trimmed.to_string()), ChatCommand::Sources),
        _ => ChatCommand::Unknown(trimmed.to_string()),
    }
}

// === Command Execution ===

pub async fn execute(cli: Cli) -> Result<()> {
    let config = Config::load(&ConfigOverrides::from(&cli.global))?;

    match cli.command {
        Commands::Ask { question, export } => {
            let question = question.join(" ");
            if question.trim().is_empty() {
                bail!("Question is required for ask command");
            }
            ask(&config, &question, export).await
        }
        Commands::Chat => chat(&config).await,
        Commands::Health => health(&config).await,
    }
}

async fn ask(config: &Config, question: &str, export: bool) -> Result<()> {
    let mut session = ChatSession::from_config(config);
    let report = run_exchange(&mut session, question).await?;

    if report.succeeded() {
        session.toggle_disclosure(report.message_id);
    } else if let Some(answer) = session.messages().iter().find(|m| m.id == report.message_id) {
        println!("\n{}", answer.content);
    }
    print_sources(&session, report.message_id, None);

    if export {
        let path = session.write_transcript(&config.export_dir)?;
        println!("\nTranscript written to {}", path.display());
    }

    match report.error {
        Some(e) => Err(e).context("Could not fetch reply"),
        None => Ok(()),
    }
}

async fn chat(config: &Config) -> Result<()> {
    let mut session = ChatSession::from_config(config);

    println!("LawMate - AI Legal Assistant ({})", session.client().endpoint());
    println!("Type a question, or /help for commands.");
    println!();
    print_message(&session, 1, &session.messages()[0]);

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        print!("\n> ");
        std::io::stdout().flush().context("Failed to flush stdout")?;

        let Some(line) = next_input(&mut lines, tokio::signal::ctrl_c()).await? else {
            break;
        };

        match parse_command(&line) {
            ChatCommand::Nothing => {}
            ChatCommand::Quit => break,
            ChatCommand::Help => print_help(),
            ChatCommand::Unknown(cmd) => println!("Unknown command: {cmd} (try /help)"),
            ChatCommand::Clear => {
                session.reset_conversation()?;
                println!("Conversation cleared.\n");
                print_message(&session, 1, &session.messages()[0]);
            }
            ChatCommand::Export => {
                let path = session.write_transcript(&config.export_dir)?;
                println!("Transcript written to {}", path.display());
            }
            ChatCommand::History => {
                for (i, message) in session.snapshot().iter().enumerate() {
                    print_message(&session, i + 1, message);
                }
            }
            ChatCommand::Sources(n) => {
                let Some(message) = session.messages().get(n - 1) else {
                    println!("No message #{n}.");
                    continue;
                };
                if !message.has_sources() {
                    println!("Message #{n} has no references.");
                    continue;
                }
                let id = message.id;
                session.toggle_disclosure(id);
                print_sources(&session, id, Some(n));
            }
            ChatCommand::Ask(question) => {
                let report = run_exchange(&mut session, &question).await?;
                let position = session.messages().len();
                if !report.succeeded() {
                    println!("\n{}", session.messages()[position - 1].content);
                }
                print_sources(&session, report.message_id, Some(position));
            }
        }
    }

    Ok(())
}

/// Read the next chat line; `None` on end of input or when `interrupt`
/// fires at the prompt.
async fn next_input<R, I>(lines: &mut Lines<R>, interrupt: I) -> Result<Option<String>>
where
    R: AsyncBufRead + Unpin,
    I: Future<Output = std::io::Result<()>>,
{
    tokio::select! {
        line = lines.next_line() => line.context("Failed to read input"),
        Ok(()) = interrupt => {
            debug!("interrupted at prompt");
            println!();
            Ok(None)
        }
    }
}

async fn health(config: &Config) -> Result<()> {
    let client = AnswerClient::new(config.endpoint.clone());
    let message = client
        .health()
        .await
        .with_context(|| format!("Answering service at {} is not reachable", config.endpoint))?;
    println!("{message}");
    Ok(())
}

/// Submit `question`, echoing tokens to stdout as they arrive.
///
/// Ctrl-C while the answer streams aborts the exchange. The signal handler
/// stays installed afterwards, so the chat prompt listens for it too.
async fn run_exchange(session: &mut ChatSession, question: &str) -> Result<ExchangeReport> {
    let mut stdout = std::io::stdout();
    let outcome = tokio::select! {
        report = session.submit_question(question, |event| {
            if let StreamEvent::Token(fragment) = event {
                print!("{fragment}");
                if let Err(e) = stdout.flush() {
                    debug!(error = %e, "failed to flush stdout");
                }
            }
        }) => Some(report),
        Ok(()) = tokio::signal::ctrl_c() => None,
    };
    println!();

    match outcome {
        Some(report) => Ok(report?),
        None => Ok(session.abort_exchange()?),
    }
}

fn print_message(session: &ChatSession, position: usize, message: &Message) {
    let time = message.timestamp.with_timezone(&Local).format("%H:%M:%S");
    let who = match message.role {
        MessageRole::User => "You",
        MessageRole::Assistant => "LawMate",
    };
    println!("#{position} [{time}] {who}: {}", message.content);
    print_sources(session, message.id, Some(position));
}

/// Print the reference block of a message, honoring its disclosure flag.
fn print_sources(session: &ChatSession, id: MessageId, position: Option<usize>) {
    let Some(message) = session.messages().iter().find(|m| m.id == id) else {
        return;
    };
    if !message.has_sources() {
        return;
    }

    let expanded = session.disclosure().is_expanded(id);
    match (expanded, position) {
        (false, Some(n)) => println!(
            "   References ({}) - /sources {n} to show",
            message.sources.len()
        ),
        (false, None) => println!("   References ({})", message.sources.len()),
        (true, _) => {
            println!("   References:");
            for entry in session.source_preview(id).unwrap_or_default() {
                println!("     {entry}");
            }
        }
    }
}

fn print_help() {
    println!("Commands:");
    println!("  /sources <N>   Show or hide the references of message N");
    println!("  /history       Print the conversation");
    println!("  /export        Write the transcript to the export directory");
    println!("  /clear         Start the conversation over");
    println!("  /quit          Leave");
    println!();
    println!("Anything else is sent as a question. Ctrl-C stops an answer in progress.");
}
