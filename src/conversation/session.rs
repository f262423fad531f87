//! Turn processing, `/remember` routing, and shutdown for one conversation.
//!
//! [`Conversation`] owns the transcript, its file, and the memory store. It does
//! no console I/O, so the interactive loop in [`super::repl`] and the tests drive
//! it the same way.

use std::path::{Path, PathBuf};
use std::time::Duration;

use tracing::{info, warn};

use super::transcript::{SessionFile, Transcript};
use crate::config::SmalaConfig;
use crate::error::PersistenceError;
use crate::llm::{non_empty, LanguageModel, Message};
use crate::memory::store::MemoryStore;
use crate::memory::types::{CATEGORY_GENERAL, CATEGORY_IMPERATIVE};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RememberOutcome {
    /// The distilled text that was stored.
    Stored(String),
    /// The model gave no usable reply; nothing was stored.
    NoReply,
    /// Bare `/remember` with an empty transcript.
    NothingToRemember,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShutdownOutcome {
    /// Summary stored as a memory and appended to the saved transcript.
    Summarized(String),
    /// Summarization was not requested; transcript saved.
    NotSummarized,
    /// The model gave no summary; transcript saved without one.
    NoSummary,
    /// The model did not answer in time; transcript saved without a summary.
    TimedOut,
    /// No turns were taken; nothing was summarized or written.
    EmptySession,
}

pub struct Conversation<'a> {
    config: &'a SmalaConfig,
    llm: &'a dyn LanguageModel,
    store: MemoryStore,
    transcript: Transcript,
    path: PathBuf,
}

impl<'a> Conversation<'a> {
    pub fn new(
        config: &'a SmalaConfig,
        llm: &'a dyn LanguageModel,
        store: MemoryStore,
        session: SessionFile,
    ) -> Self {
        Self {
            config,
            llm,
            store,
            transcript: session.transcript,
            path: session.path,
        }
    }

    pub fn transcript(&self) -> &Transcript {
        &self.transcript
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn store(&self) -> &MemoryStore {
        &self.store
    }

    /// Everything sent to the model for the next turn: the system message, the
    /// memory context with its acknowledgement, then the transcript so far.
    pub fn context_messages(&self) -> Vec<Message> {
        let mut messages = Vec::with_capacity(self.transcript.len() + 3);
        messages.push(Message::system(self.config.llm.system_message.as_str()));
        messages.push(Message::user(self.store.build_memory_context()));
        messages.push(Message::assistant(
            self.config.memory.memory_acknowledgement.as_str(),
        ));
        messages.extend(self.transcript.turns().iter().cloned());
        messages
    }

    /// Append `prompt` as a user turn and ask the model for a reply.
    ///
    /// In streaming mode each fragment goes to `on_fragment` as it arrives. A
    /// reply is appended as an assistant turn and the transcript saved; without
    /// one the user turn stays in the transcript and `None` is returned.
    pub async fn process_turn(
        &mut self,
        prompt: &str,
        on_fragment: &mut (dyn for<'s> FnMut(&'s str) + Send),
    ) -> Result<Option<String>, PersistenceError> {
        self.transcript.push(Message::user(prompt));
        let messages = self.context_messages();

        let reply = if self.config.llm.stream {
            self.llm.generate_streaming(&messages, on_fragment).await
        } else {
            self.llm.generate(&messages, None).await
        };

        let Some(reply) = non_empty(reply) else {
            warn!(turns = self.transcript.len(), "no reply for this turn");
            return Ok(None);
        };

        self.transcript.push(Message::assistant(reply.as_str()));
        self.transcript.save(&self.path)?;
        Ok(Some(reply))
    }

    /// Bare `/remember`: distill the most recent turn into a general memory.
    pub async fn remember_previous(&mut self) -> Result<RememberOutcome, PersistenceError> {
        let Some(previous) = self
            .transcript
            .last()
            .map(|m| m.content.clone())
            .filter(|c| !c.trim().is_empty())
        else {
            return Ok(RememberOutcome::NothingToRemember);
        };

        let priority = self.config.memory.default_priority;
        let stored = self
            .store
            .remember(self.llm, &previous, CATEGORY_GENERAL, priority)
            .await?;
        Ok(stored.map_or(RememberOutcome::NoReply, RememberOutcome::Stored))
    }

    /// `/remember <text>`: distill `text` into an imperative memory.
    pub async fn remember_inline(&mut self, text: &str) -> Result<RememberOutcome, PersistenceError> {
        if text.trim().is_empty() {
            return Ok(RememberOutcome::NothingToRemember);
        }

        let priority = self.config.memory.priority_imperative_memories;
        let stored = self
            .store
            .remember(self.llm, text, CATEGORY_IMPERATIVE, priority)
            .await?;
        Ok(stored.map_or(RememberOutcome::NoReply, RememberOutcome::Stored))
    }

    /// Write the transcript as it stands. An empty transcript is not written.
    pub fn save_transcript(&self) -> Result<(), PersistenceError> {
        if self.transcript.is_empty() {
            return Ok(());
        }
        self.transcript.save(&self.path)
    }

    /// Orderly end of the session.
    ///
    /// With `summarize`, one summarization round trip is attempted, bounded by
    /// `timeout`. Whatever happens to it, the transcript ends up on disk. An
    /// empty session is left alone.
    pub async fn shutdown(
        &mut self,
        summarize: bool,
        timeout: Duration,
    ) -> Result<ShutdownOutcome, PersistenceError> {
        if self.transcript.is_empty() {
            return Ok(ShutdownOutcome::EmptySession);
        }
        if !summarize {
            self.save_transcript()?;
            return Ok(ShutdownOutcome::NotSummarized);
        }

        let attempt = tokio::time::timeout(
            timeout,
            self.store
                .summarize_and_save(self.llm, &mut self.transcript, &self.path),
        )
        .await;

        let outcome = match attempt {
            Ok(Ok(Some(summary))) => return Ok(ShutdownOutcome::Summarized(summary)),
            Ok(Ok(None)) => ShutdownOutcome::NoSummary,
            Ok(Err(e)) => return Err(e),
            Err(_) => {
                warn!(timeout_secs = timeout.as_secs(), "summarization timed out");
                ShutdownOutcome::TimedOut
            }
        };

        self.save_transcript()?;
        info!(path = %self.path.display(), ?outcome, "transcript saved without summary");
        Ok(outcome)
    }
}
