//! Language-model access.
//!
//! Provides [`Role`] and [`Message`] (the role-tagged turns shared with the
//! transcript), the [`LanguageModel`] trait consumed by the memory store and the
//! conversation loop, and [`http::HttpLanguageModel`], the implementation that
//! talks to a local chat endpoint.

pub mod http;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Who authored a turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    System,
    User,
    Assistant,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::System => "system",
            Self::User => "user",
            Self::Assistant => "assistant",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single role-tagged turn.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::new(Role::System, content)
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }
}

/// Something that can turn a message history into a reply.
///
/// Failures are the implementation's to log; callers only see `None` and treat
/// it as "no reply for this turn". The full history is sent as-is, with no
/// truncation or token budgeting.
#[async_trait]
pub trait LanguageModel: Send + Sync {
    /// Non-streaming generation. `system_message` overrides the configured
    /// default for this call only.
    async fn generate(&self, messages: &[Message], system_message: Option<&str>)
        -> Option<String>;

    /// Streaming generation. Every content fragment is handed to `on_fragment`
    /// as it arrives; the assembled reply is returned at the end.
    ///
    /// The default delivers the non-streaming reply as a single fragment.
    async fn generate_streaming(
        &self,
        messages: &[Message],
        on_fragment: &mut (dyn for<'s> FnMut(&'s str) + Send),
    ) -> Option<String> {
        let reply = self.generate(messages, None).await?;
        on_fragment(&reply);
        Some(reply)
    }
}

/// Collapse an empty or whitespace-only reply into `None`.
pub fn non_empty(reply: Option<String>) -> Option<String> {
    reply.filter(|text| !text.trim().is_empty())
}
