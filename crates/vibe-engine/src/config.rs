//! Engine configuration loaded from environment variables.
//!
//! All settings have defaults so a node can start with zero configuration.

use std::path::PathBuf;

/// Engine configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    /// SQLite file holding vibe records.
    /// Env: `VIBE_DB_PATH`
    /// Default: none (platform data directory).
    pub database_path: Option<PathBuf>,

    /// Keep records in memory only; nothing survives a restart.
    /// Env: `VIBE_IN_MEMORY` (true/false)
    /// Default: `false`
    pub in_memory: bool,

    /// Capacity of the local action channel.
    /// Env: `VIBE_ACTION_QUEUE`
    /// Default: `64`
    pub action_queue_capacity: usize,

    /// Capacity of the inbound frame channel fed by the transport.
    /// Env: `VIBE_INBOUND_QUEUE`
    /// Default: `256`
    pub inbound_queue_capacity: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            database_path: None,
            in_memory: false,
            action_queue_capacity: 64,
            inbound_queue_capacity: 256,
        }
    }
}

impl EngineConfig {
    /// Load configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`from_env`](Self::from_env) with an explicit variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        if let Some(path) = lookup("VIBE_DB_PATH") {
            if !path.trim().is_empty() {
                config.database_path = Some(PathBuf::from(path));
            }
        }

        if let Some(val) = lookup("VIBE_IN_MEMORY") {
            config.in_memory = val == "true" || val == "1";
        }

        if let Some(val) = lookup("VIBE_ACTION_QUEUE") {
            config.action_queue_capacity =
                parse_capacity("VIBE_ACTION_QUEUE", &val, config.action_queue_capacity);
        }

        if let Some(val) = lookup("VIBE_INBOUND_QUEUE") {
            config.inbound_queue_capacity =
                parse_capacity("VIBE_INBOUND_QUEUE", &val, config.inbound_queue_capacity);
        }

        config
    }
}

// tokio channels panic on a zero capacity
fn parse_capacity(key: &str, value: &str, default: usize) -> usize {
    match value.parse::<usize>() {
        Ok(n) if n > 0 => n,
        _ => {
            tracing::warn!(key, value, "Invalid queue capacity, using default");
            default
        }
    }
}
