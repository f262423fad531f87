#![allow(dead_code)]

use std::collections::VecDeque;
use std::path::Path;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{NaiveDate, NaiveDateTime};
use smala::config::SmalaConfig;
use smala::llm::{LanguageModel, Message};
use smala::memory::store::MemoryStore;

/// One recorded call to [`ScriptedModel`].
#[derive(Debug, Clone)]
pub struct Call {
    pub messages: Vec<Message>,
    pub system_message: Option<String>,
}

/// Language model that replays canned replies in order and records every call.
/// `None` entries (and running out of replies) behave like a failed request.
pub struct ScriptedModel {
    replies: Mutex<VecDeque<Option<String>>>,
    calls: Mutex<Vec<Call>>,
    delay: Option<Duration>,
}

impl ScriptedModel {
    pub fn new<'a>(replies: impl IntoIterator<Item = Option<&'a str>>) -> Self {
        Self {
            replies: Mutex::new(replies.into_iter().map(|r| r.map(String::from)).collect()),
            calls: Mutex::new(Vec::new()),
            delay: None,
        }
    }

    /// A model that never answers successfully.
    pub fn failing() -> Self {
        Self::new([])
    }

    /// Sleep this long before every reply.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl LanguageModel for ScriptedModel {
    async fn generate(&self, messages: &[Message], system_message: Option<&str>) -> Option<String> {
        self.calls.lock().unwrap().push(Call {
            messages: messages.to_vec(),
            system_message: system_message.map(String::from),
        });
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.replies.lock().unwrap().pop_front().flatten()
    }
}

/// Default config with every file under `dir` and streaming off.
pub fn test_config(dir: &Path) -> SmalaConfig {
    let mut config = SmalaConfig::default();
    config.memory.file = dir.join("memories").join("memory.json").to_string_lossy().into_owned();
    config.conversation.dir = dir.join("conversations").to_string_lossy().into_owned();
    config.llm.stream = false;
    config
}

/// Open the store configured by [`test_config`].
pub fn test_store(config: &SmalaConfig) -> MemoryStore {
    MemoryStore::load(config.resolved_memory_path(), &config.memory).unwrap()
}

/// Noon on the given date.
pub fn day(y: i32, m: u32, d: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(y, m, d)
        .unwrap()
        .and_hms_opt(12, 0, 0)
        .unwrap()
}
