//! Core memory type definitions.
//!
//! Defines [`Memory`], a persisted fact distilled from a conversation, and the
//! provenance prefix baked into its content at creation time.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Category for plain memories.
pub const CATEGORY_GENERAL: &str = "general";
/// Category for the summary written when a conversation ends.
pub const CATEGORY_CONVERSATION_SUMMARY: &str = "conversation_summary";
/// Category for inline `/remember <text>` requests.
pub const CATEGORY_IMPERATIVE: &str = "imperative_memory";

/// A memory record as stored in the backing file.
///
/// Only `active` ever changes after creation, and only from `true` to `false`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Memory {
    /// Provenance prefix followed by the distilled text. This is the exact
    /// string placed into the model's context.
    pub content: String,
    /// Free-form tag, e.g. `"general"` or `"conversation_summary"`.
    #[serde(default = "default_category")]
    pub category: String,
    /// Nominally 1 to 5, higher survives decay. Other integers are kept as-is.
    pub priority: i64,
    /// Local creation time, ISO 8601 without offset.
    pub timestamp: NaiveDateTime,
    /// `false` once decayed. Inactive memories stay in the file.
    #[serde(default = "default_active")]
    pub active: bool,
    /// Keys written by other tools; carried through load and save untouched.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

fn default_category() -> String {
    CATEGORY_GENERAL.to_string()
}

fn default_active() -> bool {
    true
}

impl Memory {
    /// Build a new active memory, prefixing `text` with its provenance.
    pub fn new(text: &str, category: &str, priority: i64, timestamp: NaiveDateTime) -> Self {
        Self {
            content: format!("{}{text}", provenance_prefix(category, priority, timestamp)),
            category: category.to_string(),
            priority,
            timestamp,
            active: true,
            extra: Map::new(),
        }
    }
}

/// `This is a {category} memory with priority {priority}/5 from a conversation held on {YYYY-MM-DD}: `
pub fn provenance_prefix(category: &str, priority: i64, timestamp: NaiveDateTime) -> String {
    format!(
        "This is a {category} memory with priority {priority}/5 from a conversation held on {}: ",
        timestamp.format("%Y-%m-%d")
    )
}
