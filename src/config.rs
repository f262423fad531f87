use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::info;

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct SmalaConfig {
    pub log: LogConfig,
    pub llm: LlmConfig,
    pub memory: MemoryConfig,
    pub conversation: ConversationConfig,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct LogConfig {
    pub level: String,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct LlmConfig {
    pub api_url: String,
    pub model: String,
    pub system_message: String,
    pub stream: bool,
    pub verbose: bool,
    pub request_timeout_secs: u64,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct MemoryConfig {
    pub file: String,
    pub decay_threshold: i64,
    pub decay_days: u64,
    pub default_priority: i64,
    pub priority_conversation_summaries: i64,
    pub priority_imperative_memories: i64,
    /// Preamble placed in front of the active memories in every conversation.
    pub how_to_use_memories: String,
    /// System message used when distilling a whole conversation.
    pub how_to_extract_relevant_info: String,
    /// System message used for explicit `/remember` requests.
    pub how_to_remember: String,
    /// Assistant turn that follows the memory context.
    pub memory_acknowledgement: String,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ConversationConfig {
    pub dir: String,
    pub shutdown_timeout_secs: u64,
}

impl Default for SmalaConfig {
    fn default() -> Self {
        Self {
            log: LogConfig::default(),
            llm: LlmConfig::default(),
            memory: MemoryConfig::default(),
            conversation: ConversationConfig::default(),
        }
    }
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "warn".into(),
        }
    }
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            api_url: "http://localhost:11434/api/chat".into(),
            model: "llama3.2".into(),
            system_message: "You are a helpful assistant running locally on the user's machine. \
                             Answer clearly and concisely."
                .into(),
            stream: true,
            verbose: false,
            request_timeout_secs: 300,
        }
    }
}

impl Default for MemoryConfig {
    fn default() -> Self {
        let file = default_smala_dir()
            .join("memories")
            .join("memory.json")
            .to_string_lossy()
            .into_owned();
        Self {
            file,
            decay_threshold: 2,
            decay_days: 30,
            default_priority: 3,
            priority_conversation_summaries: 4,
            priority_imperative_memories: 5,
            how_to_use_memories: "The following are memories from earlier conversations with \
                                  the user. Use them when they are relevant to the current \
                                  request and ignore them otherwise.\n"
                .into(),
            how_to_extract_relevant_info: "Extract the facts from the following conversation \
                                           that are worth remembering about the user: \
                                           preferences, decisions, ongoing projects and \
                                           personal details. Reply with a short summary only."
                .into(),
            how_to_remember: "The user explicitly asked you to remember the following. \
                              Restate it as a single short, self-contained fact."
                .into(),
            memory_acknowledgement: "I'm aware of these memories, and will use relevant \
                                     information from them when needed to assist you in the \
                                     best possible way."
                .into(),
        }
    }
}

impl Default for ConversationConfig {
    fn default() -> Self {
        let dir = default_smala_dir()
            .join("conversations")
            .to_string_lossy()
            .into_owned();
        Self {
            dir,
            shutdown_timeout_secs: 60,
        }
    }
}

/// Returns `~/.smala/`, or `./.smala/` when no home directory is known.
pub fn default_smala_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".smala")
}

/// Returns the default config file path: `~/.smala/config.toml`
pub fn default_config_path() -> PathBuf {
    default_smala_dir().join("config.toml")
}

impl SmalaConfig {
    /// Load config from the default TOML file (if it exists) then apply env var overrides.
    pub fn load() -> Result<Self> {
        Self::load_from(default_config_path())
    }

    /// Load from a specific path, then apply env var overrides.
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let mut config = if path.exists() {
            let contents =
                std::fs::read_to_string(path).context("failed to read config file")?;
            toml::from_str(&contents).context("failed to parse config TOML")?
        } else {
            info!("no config file at {}, using defaults", path.display());
            SmalaConfig::default()
        };

        config.apply_env_overrides();
        Ok(config)
    }

    /// Apply environment variable overrides
    /// (SMALA_API_URL, SMALA_MODEL, SMALA_MEMORY_FILE, SMALA_LOG_LEVEL).
    fn apply_env_overrides(&mut self) {
        if let Ok(val) = std::env::var("SMALA_API_URL") {
            self.llm.api_url = val;
        }
        if let Ok(val) = std::env::var("SMALA_MODEL") {
            self.llm.model = val;
        }
        if let Ok(val) = std::env::var("SMALA_MEMORY_FILE") {
            self.memory.file = val;
        }
        if let Ok(val) = std::env::var("SMALA_LOG_LEVEL") {
            self.log.level = val;
        }
    }

    /// Directives for the tracing `EnvFilter`: `log.level`, plus the request
    /// dump target when `llm.verbose` is on so it shows at any level.
    pub fn log_filter(&self) -> String {
        if self.llm.verbose {
            format!("{},{}=info", self.log.level, crate::llm::http::REQUEST_LOG_TARGET)
        } else {
            self.log.level.clone()
        }
    }

    /// Resolve the memory file path, expanding `~` if needed.
    pub fn resolved_memory_path(&self) -> PathBuf {
        expand_tilde(&self.memory.file)
    }

    /// Resolve the directory new conversation transcripts are written to.
    pub fn resolved_conversation_dir(&self) -> PathBuf {
        expand_tilde(&self.conversation.dir)
    }
}

pub fn expand_tilde(path: &str) -> PathBuf {
    match (path.strip_prefix("~/"), dirs::home_dir()) {
        (Some(rest), Some(home)) => home.join(rest),
        _ => PathBuf::from(path),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verbose_enables_request_log_over_quiet_level() {
        use tracing::level_filters::LevelFilter;
        use tracing_subscriber::EnvFilter;

        let mut config = SmalaConfig::default();
        assert_eq!(config.log_filter(), "warn");

        config.llm.verbose = true;
        let directives = config.log_filter();
        assert_eq!(directives, "warn,smala::request=info");
        let filter = EnvFilter::try_new(&directives).unwrap();
        assert_eq!(filter.max_level_hint(), Some(LevelFilter::INFO));
    }

    #[test]
    fn default_config_is_valid() {
        let config = SmalaConfig::default();
        assert_eq!(config.log.level, "warn");
        assert!(config.llm.stream);
        assert!(!config.llm.verbose);
        assert_eq!(config.memory.decay_threshold, 2);
        assert_eq!(config.memory.decay_days, 30);
        assert!(config.memory.file.ends_with("memory.json"));
        assert!(config.conversation.dir.ends_with("conversations"));
    }

    #[test]
    fn parse_toml_config() {
        let toml_str = r#"
[log]
level = "debug"

[llm]
api_url = "http://gpu-box:11434/api/chat"
stream = false

[memory]
file = "/tmp/memories.json"
decay_days = 7
"#;
        let config: SmalaConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.log.level, "debug");
        assert_eq!(config.llm.api_url, "http://gpu-box:11434/api/chat");
        assert!(!config.llm.stream);
        assert_eq!(config.memory.file, "/tmp/memories.json");
        assert_eq!(config.memory.decay_days, 7);
        // defaults still apply for unset fields
        assert_eq!(config.llm.model, "llama3.2");
        assert_eq!(config.memory.decay_threshold, 2);
        assert_eq!(config.conversation.shutdown_timeout_secs, 60);
    }

    #[test]
    fn env_overrides_apply() {
        let mut config = SmalaConfig::default();
        std::env::set_var("SMALA_API_URL", "http://override:1234/api/chat");
        std::env::set_var("SMALA_MODEL", "mistral");
        std::env::set_var("SMALA_MEMORY_FILE", "/tmp/override.json");
        std::env::set_var("SMALA_LOG_LEVEL", "trace");

        config.apply_env_overrides();

        assert_eq!(config.llm.api_url, "http://override:1234/api/chat");
        assert_eq!(config.llm.model, "mistral");
        assert_eq!(config.memory.file, "/tmp/override.json");
        assert_eq!(config.log.level, "trace");

        // Clean up
        std::env::remove_var("SMALA_API_URL");
        std::env::remove_var("SMALA_MODEL");
        std::env::remove_var("SMALA_MEMORY_FILE");
        std::env::remove_var("SMALA_LOG_LEVEL");
    }

    #[test]
    fn tilde_expands_to_home() {
        let expanded = expand_tilde("~/notes/memory.json");
        assert!(expanded.ends_with("notes/memory.json"));
        assert_eq!(expand_tilde("/abs/path.json"), PathBuf::from("/abs/path.json"));
    }
}
