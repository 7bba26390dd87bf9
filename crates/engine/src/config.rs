//! Sync configuration

use anyhow::{bail, Result};
use std::path::PathBuf;
use std::str::FromStr;

const DEFAULT_BASE_URL: &str = "https://nof1.ai/api";

/// Competition models tracked by default; override via config or
/// `ARENA_SYNC_MODELS`
pub const DEFAULT_MODELS: &[&str] = &[
    "qwen3-max",
    "deepseek-chat-v3.1",
    "claude-sonnet-4-5",
    "grok-4",
    "gemini-2.5-pro",
    "gpt-5",
];

/// Which field-naming convention the source API speaks.
///
/// A run is bound to exactly one variant; the two are never mixed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchemaVersion {
    /// Flat snake_case fields (`id`, `num_trades`, `return_pct`)
    V1,
    /// camelCase fields (`aiModelId`, `totalTrades`, `returnPct`)
    V2,
}

impl FromStr for SchemaVersion {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "v1" => Ok(Self::V1),
            "v2" => Ok(Self::V2),
            other => bail!("unknown schema version '{other}' (expected v1 or v2)"),
        }
    }
}

/// Configuration for one sync pipeline
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// Base URL of the source API
    pub base_url: String,
    /// Model identifiers for the per-model analytics fan-out
    pub models: Vec<String>,
    /// Source schema variant for leaderboard/trade data
    pub schema: SchemaVersion,
    /// Bounded window for the recent-trades cache
    pub recent_trades_limit: usize,
    /// Per-request timeout in seconds
    pub timeout_secs: u64,
    /// Durable copy of the generated batch, written every run
    pub audit_path: PathBuf,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            models: DEFAULT_MODELS.iter().map(|m| m.to_string()).collect(),
            schema: SchemaVersion::V1,
            recent_trades_limit: 50,
            timeout_secs: 30,
            audit_path: PathBuf::from("data/last-sync.sql"),
        }
    }
}

impl SyncConfig {
    /// Defaults overridden by `ARENA_SYNC_*` environment variables
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();

        if let Ok(url) = std::env::var("ARENA_SYNC_BASE_URL") {
            config.base_url = url;
        }
        if let Ok(models) = std::env::var("ARENA_SYNC_MODELS") {
            config.models = models
                .split(',')
                .map(|m| m.trim().to_string())
                .filter(|m| !m.is_empty())
                .collect();
        }
        if let Ok(schema) = std::env::var("ARENA_SYNC_SCHEMA") {
            config.schema = schema.parse()?;
        }
        if let Ok(limit) = std::env::var("ARENA_SYNC_RECENT_LIMIT") {
            config.recent_trades_limit = limit.parse()?;
        }
        if let Ok(timeout) = std::env::var("ARENA_SYNC_TIMEOUT_SECS") {
            config.timeout_secs = timeout.parse()?;
        }
        if let Ok(path) = std::env::var("ARENA_SYNC_AUDIT_PATH") {
            config.audit_path = PathBuf::from(path);
        }

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schema_version_parsing() {
        assert_eq!("v1".parse::<SchemaVersion>().unwrap(), SchemaVersion::V1);
        assert_eq!("V2".parse::<SchemaVersion>().unwrap(), SchemaVersion::V2);
        assert!("v3".parse::<SchemaVersion>().is_err());
    }

    #[test]
    fn test_default_models() {
        let config = SyncConfig::default();
        assert_eq!(config.models.len(), 6);
        assert_eq!(config.recent_trades_limit, 50);
    }
}
