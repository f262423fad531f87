//! The memory store: an in-memory list of [`Memory`] records mirrored to a JSON file.
//!
//! The whole list is loaded once at construction and the whole file is rewritten
//! after every mutation ([`MemoryStore::add`], [`MemoryStore::apply_decay`]).
//! Reads and writes go through the advisory locks in [`super::lock`].

use std::path::{Path, PathBuf};

use chrono::NaiveDateTime;
use tracing::{debug, info, warn};

use super::lock;
use super::maintenance::{decay_memories, DecayResult};
use super::stats::{memory_stats, MemoryStats};
use super::types::{Memory, CATEGORY_CONVERSATION_SUMMARY};
use crate::config::MemoryConfig;
use crate::conversation::transcript::Transcript;
use crate::error::PersistenceError;
use crate::llm::{non_empty, LanguageModel, Message};

#[derive(Debug)]
pub struct MemoryStore {
    path: PathBuf,
    memories: Vec<Memory>,
    config: MemoryConfig,
}

impl MemoryStore {
    /// Load the store from `path`.
    ///
    /// A missing file is created empty, and a zero-length file counts as empty.
    /// A file that exists but does not parse is an error: it is never treated
    /// as an empty store.
    pub fn load(path: impl Into<PathBuf>, config: &MemoryConfig) -> Result<Self, PersistenceError> {
        let path = path.into();

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| PersistenceError::io(parent, e))?;
        }

        let existed = path.exists();
        let memories = if existed {
            parse_memories(&path, &lock::read_shared(&path)?)?
        } else {
            Vec::new()
        };

        let store = Self {
            path,
            memories,
            config: config.clone(),
        };

        if !existed {
            store.save()?;
        }

        info!(
            path = %store.path.display(),
            total = store.memories.len(),
            created = !existed,
            "memory store loaded"
        );
        Ok(store)
    }

    /// Overwrite the backing file with the full list.
    pub fn save(&self) -> Result<(), PersistenceError> {
        let json = serde_json::to_vec_pretty(&self.memories).map_err(|source| {
            PersistenceError::Serialize {
                what: "memories",
                source,
            }
        })?;
        lock::write_exclusive(&self.path, &json)?;
        debug!(path = %self.path.display(), total = self.memories.len(), "memories saved");
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Every record, active or not, in insertion order.
    pub fn memories(&self) -> &[Memory] {
        &self.memories
    }

    pub fn len(&self) -> usize {
        self.memories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.memories.is_empty()
    }

    /// Append a new memory created now and persist.
    pub fn add(&mut self, text: &str, category: &str, priority: i64) -> Result<&Memory, PersistenceError> {
        self.add_at(text, category, priority, super::local_now())
    }

    /// Append a new memory created at `timestamp` and persist.
    pub fn add_at(
        &mut self,
        text: &str,
        category: &str,
        priority: i64,
        timestamp: NaiveDateTime,
    ) -> Result<&Memory, PersistenceError> {
        self.memories
            .push(Memory::new(text, category, priority, timestamp));
        self.save()?;

        info!(category, priority, total = self.memories.len(), "memory added");
        Ok(&self.memories[self.memories.len() - 1])
    }

    /// Deactivate memories below `threshold` older than `decay_days`, then persist.
    pub fn apply_decay(&mut self, threshold: i64, decay_days: u64) -> Result<DecayResult, PersistenceError> {
        self.apply_decay_at(threshold, decay_days, super::local_now())
    }

    /// [`apply_decay`](Self::apply_decay) evaluated at `now`.
    ///
    /// The file is rewritten even when nothing changed.
    pub fn apply_decay_at(
        &mut self,
        threshold: i64,
        decay_days: u64,
        now: NaiveDateTime,
    ) -> Result<DecayResult, PersistenceError> {
        let result = decay_memories(&mut self.memories, threshold, decay_days, now);
        self.save()?;

        info!(
            threshold,
            decay_days,
            examined = result.examined,
            deactivated = result.deactivated,
            "decay applied"
        );
        Ok(result)
    }

    /// Active memories in insertion order.
    pub fn get_active_memories(&self) -> Vec<&Memory> {
        self.memories.iter().filter(|m| m.active).collect()
    }

    /// The "how to use memories" preamble followed by every active memory's
    /// content, newline-joined.
    pub fn build_memory_context(&self) -> String {
        let joined = self
            .get_active_memories()
            .iter()
            .map(|m| m.content.as_str())
            .collect::<Vec<_>>()
            .join("\n");
        format!("{}{joined}", self.config.how_to_use_memories)
    }

    pub fn stats(&self) -> MemoryStats {
        memory_stats(&self.memories)
    }

    /// Distill `text` with the language model and store the result.
    ///
    /// Returns the stored text, or `None` when the model gave no usable reply,
    /// in which case nothing is added.
    pub async fn remember(
        &mut self,
        llm: &dyn LanguageModel,
        text: &str,
        category: &str,
        priority: i64,
    ) -> Result<Option<String>, PersistenceError> {
        let messages = [Message::user(text)];
        let reply = llm
            .generate(&messages, Some(self.config.how_to_remember.as_str()))
            .await;

        match non_empty(reply) {
            Some(distilled) => {
                self.add(&distilled, category, priority)?;
                Ok(Some(distilled))
            }
            None => {
                warn!(category, "language model gave no reply, nothing remembered");
                Ok(None)
            }
        }
    }

    /// Summarize the whole conversation into a `conversation_summary` memory.
    ///
    /// On success the summary is also appended to `conversation` as an assistant
    /// turn and the transcript is written to `conversation_file`. When the model
    /// gives no usable reply, or the conversation is empty, neither the store nor
    /// the transcript changes.
    pub async fn summarize_and_save(
        &mut self,
        llm: &dyn LanguageModel,
        conversation: &mut Transcript,
        conversation_file: &Path,
    ) -> Result<Option<String>, PersistenceError> {
        if conversation.is_empty() {
            debug!("empty conversation, nothing to summarize");
            return Ok(None);
        }

        let messages = [Message::user(conversation.joined_text())];
        let reply = llm
            .generate(&messages, Some(self.config.how_to_extract_relevant_info.as_str()))
            .await;

        let Some(summary) = non_empty(reply) else {
            warn!("language model gave no summary, conversation not summarized");
            return Ok(None);
        };

        let priority = self.config.priority_conversation_summaries;
        self.add(&summary, CATEGORY_CONVERSATION_SUMMARY, priority)?;

        conversation.push(Message::assistant(summary.clone()));
        conversation.save(conversation_file)?;

        info!(path = %conversation_file.display(), turns = conversation.len(), "conversation summarized");
        Ok(Some(summary))
    }
}

fn parse_memories(path: &Path, contents: &str) -> Result<Vec<Memory>, PersistenceError> {
    if contents.trim().is_empty() {
        return Ok(Vec::new());
    }
    serde_json::from_str(contents).map_err(|source| PersistenceError::Corrupt {
        path: path.to_path_buf(),
        source,
    })
}
