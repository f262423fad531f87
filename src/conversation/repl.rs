//! Interactive chat loop.
//!
//! Cancellation is observed at two points: while reading input (rustyline
//! reports Ctrl-C and Ctrl-D as values) and while awaiting the model (raced
//! against `tokio::signal::ctrl_c`). Both lead to the same shutdown path.

use std::future::Future;
use std::io::{self, Write};
use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;
use tracing::debug;

use super::commands::{self, Command};
use super::session::{Conversation, RememberOutcome, ShutdownOutcome};
use super::transcript::open_session;
use crate::config::SmalaConfig;
use crate::llm::http::HttpLanguageModel;
use crate::memory::local_now;
use crate::memory::store::MemoryStore;

const PROMPT: &str = ">>> ";
const TURN_SEPARATOR: &str = "--------------------";
const TURN_END: &str = "====================";

/// What the loop does after handling one input.
enum Flow {
    Continue,
    Interrupted,
}

/// Run an interactive conversation until the user exits or interrupts.
pub async fn run(config: &SmalaConfig, resume: Option<&Path>) -> Result<()> {
    let llm = HttpLanguageModel::new(&config.llm).context("failed to build HTTP client")?;

    let memory_path = config.resolved_memory_path();
    let mut store = MemoryStore::load(&memory_path, &config.memory)
        .with_context(|| format!("failed to load memories from {}", memory_path.display()))?;
    store
        .apply_decay(config.memory.decay_threshold, config.memory.decay_days)
        .context("failed to apply memory decay")?;

    let session = open_session(resume, &config.resolved_conversation_dir(), local_now());
    if let Some(notice) = &session.notice {
        println!("Warning: {notice}");
    }
    tracing::info!(
        transcript = %session.path.display(),
        turns = session.transcript.len(),
        api_url = llm.api_url(),
        "conversation ready"
    );

    let mut conversation = Conversation::new(config, &llm, store, session);
    let mut editor = DefaultEditor::new().context("failed to create line editor")?;

    print_banner();

    loop {
        let line = match editor.readline(PROMPT) {
            Ok(line) => line,
            Err(ReadlineError::Interrupted) => {
                println!("\nReceived interrupt (Ctrl+C).");
                return shutdown(config, &mut conversation, true).await;
            }
            Err(ReadlineError::Eof) => {
                println!("\nReceived EOF signal (Ctrl+D).");
                return shutdown(config, &mut conversation, true).await;
            }
            Err(e) => return Err(e).context("failed to read input"),
        };
        if let Err(e) = editor.add_history_entry(line.as_str()) {
            debug!(error = %e, "could not add line to history");
        }

        let command = match commands::parse(&line) {
            Command::MultilineStart(first) => match read_multiline(&mut editor, first)? {
                Some(text) => commands::parse_prompt(&text),
                None => {
                    println!("\nReceived interrupt.");
                    return shutdown(config, &mut conversation, true).await;
                }
            },
            other => other,
        };

        let flow = match command {
            Command::Empty | Command::MultilineStart(_) => Flow::Continue,
            Command::Exit => {
                let summarize =
                    confirm(&mut editor, "Would you like to summarize the conversation? (y/n): ")?;
                return shutdown(config, &mut conversation, summarize).await;
            }
            Command::RememberPrevious => {
                match until_interrupted(conversation.remember_previous()).await {
                    Some(outcome) => {
                        report_remember(outcome?);
                        Flow::Continue
                    }
                    None => Flow::Interrupted,
                }
            }
            Command::RememberInline(text) => {
                match until_interrupted(conversation.remember_inline(&text)).await {
                    Some(outcome) => {
                        report_remember(outcome?);
                        if text.is_empty() {
                            Flow::Continue
                        } else {
                            take_turn(config, &mut conversation, &text).await?
                        }
                    }
                    None => Flow::Interrupted,
                }
            }
            Command::Prompt(text) => take_turn(config, &mut conversation, &text).await?,
        };

        if let Flow::Interrupted = flow {
            println!("\nReceived interrupt (Ctrl+C).");
            return shutdown(config, &mut conversation, true).await;
        }
    }
}

fn print_banner() {
    println!("Welcome to the Local LLM Assistant!");
    println!("Type '\"\"\"' to start multi-line input mode.");
    println!(
        "Type '/remember' as part of a prompt to store a summary of it, \
         or type only '/remember' to save a summary of the last turn."
    );
    println!("Type '/exit' to exit.");
}

/// Send one prompt and print the reply.
async fn take_turn(
    config: &SmalaConfig,
    conversation: &mut Conversation<'_>,
    prompt: &str,
) -> Result<Flow> {
    let streaming = config.llm.stream;
    println!("{TURN_SEPARATOR}");

    let spinner = if streaming {
        print!("Assistant: ");
        io::stdout().flush().ok();
        None
    } else {
        Some(spinner("thinking..."))
    };

    let mut print_fragment = |fragment: &str| {
        print!("{fragment}");
        io::stdout().flush().ok();
    };
    let outcome = until_interrupted(conversation.process_turn(prompt, &mut print_fragment)).await;

    if let Some(spinner) = spinner {
        spinner.finish_and_clear();
    }

    let Some(reply) = outcome else {
        return Ok(Flow::Interrupted);
    };

    match reply.context("failed to save conversation")? {
        Some(_) if streaming => println!("\n"),
        Some(reply) => println!("Assistant: {reply}"),
        None => {
            if streaming {
                println!();
            }
            println!("Assistant: Sorry, I couldn't process that request.");
        }
    }
    println!("{TURN_END}");
    Ok(Flow::Continue)
}

fn report_remember(outcome: RememberOutcome) {
    match outcome {
        RememberOutcome::Stored(text) => println!("Remembered: {text}"),
        RememberOutcome::NoReply => {
            println!("Could not create a memory: the language model did not respond.")
        }
        RememberOutcome::NothingToRemember => println!("Nothing to remember yet."),
    }
}

/// Summarize (if asked), save the transcript, and report.
async fn shutdown(
    config: &SmalaConfig,
    conversation: &mut Conversation<'_>,
    summarize: bool,
) -> Result<()> {
    println!("Gracefully shutting down.");
    let spinner = (summarize && !conversation.transcript().is_empty()).then(|| {
        println!("Summarizing conversation...");
        spinner("summarizing...")
    });

    let timeout = Duration::from_secs(config.conversation.shutdown_timeout_secs);
    let outcome = until_interrupted(conversation.shutdown(summarize, timeout)).await;

    if let Some(spinner) = spinner {
        spinner.finish_and_clear();
    }

    let outcome = match outcome {
        Some(outcome) => outcome.context("failed to save conversation")?,
        None => {
            // A second interrupt abandons the summary but still keeps the transcript.
            conversation
                .save_transcript()
                .context("failed to save conversation")?;
            ShutdownOutcome::NoSummary
        }
    };

    match outcome {
        ShutdownOutcome::Summarized(_) => {
            println!("Assistant: The conversation has been summarized and saved.")
        }
        ShutdownOutcome::NotSummarized => println!("Conversation not summarized."),
        ShutdownOutcome::NoSummary => println!("Could not summarize the conversation."),
        ShutdownOutcome::TimedOut => println!("Summarizing took too long and was skipped."),
        ShutdownOutcome::EmptySession => println!("Nothing to summarize."),
    }
    if !conversation.transcript().is_empty() {
        println!("Conversation saved to {}", conversation.path().display());
    }
    println!("Exiting...");
    Ok(())
}

/// Read lines until the closing `"""`. `None` if interrupted.
fn read_multiline(editor: &mut DefaultEditor, first: String) -> Result<Option<String>> {
    let mut rest = Vec::new();
    loop {
        match editor.readline(PROMPT) {
            Ok(line) if commands::is_multiline_end(&line) => break,
            Ok(line) => rest.push(line),
            Err(ReadlineError::Interrupted | ReadlineError::Eof) => return Ok(None),
            Err(e) => return Err(e).context("failed to read input"),
        }
    }
    Ok(Some(commands::join_multiline(first, rest)))
}

/// Ask a yes/no question. An interrupt counts as yes.
fn confirm(editor: &mut DefaultEditor, question: &str) -> Result<bool> {
    match editor.readline(question) {
        Ok(answer) => Ok(answer.trim().eq_ignore_ascii_case("y")),
        Err(ReadlineError::Interrupted | ReadlineError::Eof) => Ok(true),
        Err(e) => Err(e).context("failed to read input"),
    }
}

/// Race `fut` against Ctrl-C. `None` if the interrupt came first.
async fn until_interrupted<F: Future>(fut: F) -> Option<F::Output> {
    tokio::select! {
        out = fut => Some(out),
        _ = tokio::signal::ctrl_c() => None,
    }
}

fn spinner(message: &'static str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::default_spinner().template("{spinner} {msg}") {
        pb.set_style(style);
    }
    pb.set_message(message);
    pb.enable_steady_tick(Duration::from_millis(100));
    pb
}
