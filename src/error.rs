//! Error taxonomy shared across the crate.
//!
//! [`PersistenceError`] covers the memory and transcript files and is fatal to the
//! operation that raised it. [`LlmError`] never leaves the language-model client:
//! it is logged and the caller sees `None`. [`InputError`] is reported to the user
//! and the session falls back to a fresh transcript.

use std::path::PathBuf;

use thiserror::Error;

/// Failure reading or writing a backing file.
#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("failed to access {}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{} exists but could not be parsed", path.display())]
    Corrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to serialize {what}")]
    Serialize {
        what: &'static str,
        #[source]
        source: serde_json::Error,
    },
}

impl PersistenceError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// Failure talking to the language-model backend.
#[derive(Debug, Error)]
pub enum LlmError {
    #[error("request to language model failed")]
    Transport(#[from] reqwest::Error),

    #[error("language model returned HTTP {0}")]
    Status(reqwest::StatusCode),

    #[error("malformed response body")]
    MalformedBody(#[source] serde_json::Error),

    #[error("response carried no message content")]
    MissingContent,

    #[error("unparseable stream fragment: {line}")]
    Fragment {
        line: String,
        #[source]
        source: serde_json::Error,
    },
}

/// A conversation file passed for resumption could not be used.
#[derive(Debug, Error)]
pub enum InputError {
    #[error("conversation file {} could not be read", path.display())]
    Unreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("conversation file {} is not a valid transcript", path.display())]
    Malformed {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}
