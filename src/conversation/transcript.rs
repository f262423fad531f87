//! The per-session conversation transcript and its file.
//!
//! A transcript file is a JSON array of `{role, content}` turns, rewritten in
//! full on every save.

use std::path::{Path, PathBuf};

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{InputError, PersistenceError};
use crate::llm::Message;

/// Ordered turns of one conversation. Only ever appended to.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Transcript {
    turns: Vec<Message>,
}

impl Transcript {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn turns(&self) -> &[Message] {
        &self.turns
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    pub fn last(&self) -> Option<&Message> {
        self.turns.last()
    }

    pub fn push(&mut self, message: Message) {
        self.turns.push(message);
    }

    /// Every turn's content, newline-joined, in order.
    pub fn joined_text(&self) -> String {
        self.turns
            .iter()
            .map(|m| m.content.as_str())
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Load a transcript. `Ok(None)` when the file does not exist.
    pub fn load(path: &Path) -> Result<Option<Self>, InputError> {
        if !path.exists() {
            return Ok(None);
        }
        let contents = std::fs::read_to_string(path).map_err(|source| InputError::Unreadable {
            path: path.to_path_buf(),
            source,
        })?;
        let transcript = serde_json::from_str(&contents).map_err(|source| InputError::Malformed {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(Some(transcript))
    }

    /// Overwrite `path` with the full transcript, creating parent directories.
    pub fn save(&self, path: &Path) -> Result<(), PersistenceError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| PersistenceError::io(parent, e))?;
        }
        let json = serde_json::to_string_pretty(self).map_err(|source| {
            PersistenceError::Serialize {
                what: "conversation transcript",
                source,
            }
        })?;
        std::fs::write(path, json).map_err(|e| PersistenceError::io(path, e))
    }
}

/// Where a new session's transcript goes: `<dir>/<YYYYmmdd_HHMMSS>.json`.
pub fn new_session_path(dir: &Path, now: NaiveDateTime) -> PathBuf {
    dir.join(format!("{}.json", now.format("%Y%m%d_%H%M%S")))
}

/// Transcript and file a session starts with.
#[derive(Debug)]
pub struct SessionFile {
    pub transcript: Transcript,
    pub path: PathBuf,
    /// Set when a requested resume did not happen; shown to the user.
    pub notice: Option<String>,
}

/// Resume `resume` if given and usable, otherwise start fresh.
///
/// A resume path that does not exist yet becomes the new session's file. A
/// file that exists but cannot be read or parsed is left untouched and the
/// session gets a newly named file instead.
pub fn open_session(resume: Option<&Path>, conversation_dir: &Path, now: NaiveDateTime) -> SessionFile {
    let Some(path) = resume else {
        return SessionFile {
            transcript: Transcript::new(),
            path: new_session_path(conversation_dir, now),
            notice: None,
        };
    };

    match Transcript::load(path) {
        Ok(Some(transcript)) => SessionFile {
            transcript,
            path: path.to_path_buf(),
            notice: None,
        },
        Ok(None) => SessionFile {
            transcript: Transcript::new(),
            path: path.to_path_buf(),
            notice: Some(format!(
                "No existing conversation found at {}. Starting a new conversation.",
                path.display()
            )),
        },
        Err(e) => {
            let fresh = new_session_path(conversation_dir, now);
            warn!(error = %e, fallback = %fresh.display(), "could not resume conversation");
            let cause = std::error::Error::source(&e)
                .map(|s| format!(" ({s})"))
                .unwrap_or_default();
            SessionFile {
                transcript: Transcript::new(),
                notice: Some(format!(
                    "{e}{cause}. Starting a new conversation in {}.",
                    fresh.display()
                )),
                path: fresh,
            }
        }
    }
}
