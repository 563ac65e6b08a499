//! Configuration loading from TOML with environment variable resolution.
//!
//! Reads `config.toml` and deserializes into strongly-typed structs.
//! Secrets (the Telegram token) are referenced by env-var name in the config
//! and resolved at runtime via `std::env::var`.
//!
//! `CycleConfig` is the value injected into every `run_cycle` call. It is
//! rebuilt from the `[execution]` section once per cycle; malformed values
//! fall back to documented defaults instead of failing the cycle.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::PathBuf;
use tracing::warn;

use crate::types::{ExecutionMode, PlanTier};

/// Threshold used when neither the plan nor the override yields one.
pub const DEFAULT_THRESHOLD: u8 = 85;

/// Accepted range for an operator override threshold.
pub const OVERRIDE_RANGE: std::ops::RangeInclusive<i64> = 50..=100;

const DEFAULT_COMMANDER: &str = "Commander";

/// Top-level application configuration.
#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub agent: AgentConfig,
    pub execution: ExecutionConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub signals: SignalsConfig,
    #[serde(default)]
    pub broker: BrokerConfig,
    #[serde(default)]
    pub notifier: NotifierConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AgentConfig {
    pub name: String,
    pub cycle_interval_secs: u64,
}

/// Raw `[execution]` section. Strings are kept as written so a typo in the
/// file degrades to defaults rather than refusing to start.
#[derive(Debug, Deserialize, Clone)]
pub struct ExecutionConfig {
    #[serde(default = "default_mode")]
    pub mode: String,
    #[serde(default = "default_plan")]
    pub plan: String,
    #[serde(default)]
    pub override_threshold: Option<toml::Value>,
    #[serde(default)]
    pub commander_name: Option<String>,
    #[serde(default = "default_true")]
    pub boost_enabled: bool,
    #[serde(default)]
    pub min_signal_confidence: u8,
    #[serde(default = "default_true")]
    pub dry_run: bool,
    #[serde(default = "default_timeout_ms")]
    pub collaborator_timeout_ms: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct StorageConfig {
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
        }
    }
}

impl StorageConfig {
    pub fn pattern_memory_path(&self) -> PathBuf {
        self.data_dir.join("pattern_memory.json")
    }

    pub fn execution_log_path(&self) -> PathBuf {
        self.data_dir.join("execution_log.json")
    }

    pub fn approval_queue_path(&self) -> PathBuf {
        self.data_dir.join("approval_queue.json")
    }

    pub fn approved_path(&self) -> PathBuf {
        self.data_dir.join("approved_signals.json")
    }

    pub fn weights_path(&self) -> PathBuf {
        self.data_dir.join("signal_weights.json")
    }

    pub fn signal_log_path(&self) -> PathBuf {
        self.data_dir.join("signal_log.json")
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct SignalsConfig {
    #[serde(default = "default_signals_path")]
    pub path: PathBuf,
}

impl Default for SignalsConfig {
    fn default() -> Self {
        Self {
            path: default_signals_path(),
        }
    }
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct BrokerConfig {
    pub webhook_url: Option<String>,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct NotifierConfig {
    pub telegram_bot_token_env: Option<String>,
    pub telegram_chat_id_env: Option<String>,
}

fn default_mode() -> String {
    "auto".to_string()
}

fn default_plan() -> String {
    "pro".to_string()
}

fn default_true() -> bool {
    true
}

fn default_timeout_ms() -> u64 {
    5_000
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("logs")
}

fn default_signals_path() -> PathBuf {
    PathBuf::from("signals.json")
}

impl AppConfig {
    /// Load configuration from a TOML file.
    pub fn load(path: &str) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {path}"))?;
        Self::parse(&contents).with_context(|| format!("Failed to parse config file: {path}"))
    }

    /// Parse configuration from TOML text.
    pub fn parse(contents: &str) -> Result<Self> {
        let config: AppConfig = toml::from_str(contents)?;
        Ok(config)
    }

    /// Resolve an environment variable name to its value.
    pub fn resolve_env(env_name: &str) -> Result<String> {
        std::env::var(env_name)
            .with_context(|| format!("Environment variable not set: {env_name}"))
    }

    /// The per-cycle configuration described by the `[execution]` section.
    pub fn cycle_config(&self) -> CycleConfig {
        CycleConfig::from_execution(&self.execution)
    }
}

// ---------------------------------------------------------------------------
// Per-cycle configuration
// ---------------------------------------------------------------------------

/// Explicit configuration for one pipeline cycle.
#[derive(Debug, Clone, PartialEq)]
pub struct CycleConfig {
    pub mode: ExecutionMode,
    pub plan: PlanTier,
    /// Only consulted for plans outside the tier table.
    pub override_threshold: Option<u8>,
    pub commander_name: String,
    /// When false the booster chain is bypassed.
    pub boost_enabled: bool,
    /// Signals below this raw confidence are dropped before boosting.
    pub min_signal_confidence: u8,
}

impl Default for CycleConfig {
    fn default() -> Self {
        Self {
            mode: ExecutionMode::Auto,
            plan: PlanTier::Pro,
            override_threshold: None,
            commander_name: DEFAULT_COMMANDER.to_string(),
            boost_enabled: true,
            min_signal_confidence: 0,
        }
    }
}

impl CycleConfig {
    pub fn new(mode: ExecutionMode, plan: PlanTier) -> Self {
        Self {
            mode,
            plan,
            ..Self::default()
        }
    }

    pub fn with_override(mut self, threshold: u8) -> Self {
        self.override_threshold = Some(threshold);
        self
    }

    /// Build from the raw `[execution]` section, logging each fallback.
    pub fn from_execution(raw: &ExecutionConfig) -> Self {
        let mode = raw.mode.parse::<ExecutionMode>().unwrap_or_else(|e| {
            warn!(mode = %raw.mode, error = %e, "Unknown mode, falling back to auto");
            ExecutionMode::Auto
        });

        let override_threshold = raw
            .override_threshold
            .as_ref()
            .and_then(|value| match parse_override(value) {
                Ok(threshold) => Some(threshold),
                Err(e) => {
                    warn!(error = %e, "Ignoring override threshold");
                    None
                }
            });

        let commander_name = raw
            .commander_name
            .as_deref()
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .unwrap_or(DEFAULT_COMMANDER)
            .to_string();

        Self {
            mode,
            plan: PlanTier::parse(&raw.plan),
            override_threshold,
            commander_name,
            boost_enabled: raw.boost_enabled,
            min_signal_confidence: raw.min_signal_confidence,
        }
    }
}

/// Accepts an integer or a numeric string within `OVERRIDE_RANGE`.
fn parse_override(value: &toml::Value) -> std::result::Result<u8, crate::types::PipelineError> {
    use crate::types::PipelineError;

    let number = match value {
        toml::Value::Integer(n) => Some(*n),
        toml::Value::String(s) => s.trim().parse::<i64>().ok(),
        _ => None,
    };
    match number {
        Some(n) if OVERRIDE_RANGE.contains(&n) => Ok(n as u8),
        Some(n) => Err(PipelineError::Config(format!(
            "override threshold {n} outside {}..={}",
            OVERRIDE_RANGE.start(),
            OVERRIDE_RANGE.end()
        ))),
        None => Err(PipelineError::Config(format!(
            "override threshold is not an integer: {value}"
        ))),
    }
}
