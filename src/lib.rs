//! Conversational assistant for local language models with a persistent memory.
//!
//! Smala talks to a chat endpoint on the local machine (Ollama's `/api/chat`
//! by default) and remembers things across conversations. Memories are short
//! free-text facts, each tagged with a category and a priority:
//!
//! | Source | Category | Default priority |
//! |--------|----------|------------------|
//! | `/remember` (bare, previous turn) | `general` | 3 |
//! | `/remember <text>` | `imperative_memory` | 5 |
//! | End-of-conversation summary | `conversation_summary` | 4 |
//!
//! At startup, memories with a priority below the decay threshold that are
//! older than the decay window are deactivated. They stay in the file but are
//! no longer placed in the model's context. Nothing is ever reactivated.
//!
//! # Modules
//!
//! - [`config`]: Configuration loading from TOML files and environment variables
//! - [`error`]: Error types for persistence, the language model, and user input
//! - [`llm`]: Role-tagged messages, the [`llm::LanguageModel`] trait, and the HTTP client
//! - [`memory`]: The memory store: records, persistence, locking, decay, and context assembly
//! - [`conversation`]: Transcripts, command parsing, turn processing, and the interactive loop

pub mod config;
pub mod conversation;
pub mod error;
pub mod llm;
pub mod memory;
