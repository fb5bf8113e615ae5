//! Runtime configuration.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::scoring::ScoringPolicy;

/// Top-level evalua configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluaConfig {
    /// Budget in milliseconds for each store call and lock wait.
    #[serde(default = "default_store_timeout_ms")]
    pub store_timeout_ms: u64,
    /// How answers earn points.
    #[serde(default)]
    pub scoring: ScoringPolicy,
    /// Snapshot file used when `--state` is not given.
    #[serde(default = "default_state_path")]
    pub state_path: PathBuf,
}

fn default_store_timeout_ms() -> u64 {
    5000
}
fn default_state_path() -> PathBuf {
    PathBuf::from("./evalua-state.json")
}

impl Default for EvaluaConfig {
    fn default() -> Self {
        Self {
            store_timeout_ms: default_store_timeout_ms(),
            scoring: ScoringPolicy::default(),
            state_path: default_state_path(),
        }
    }
}

impl EvaluaConfig {
    pub fn store_timeout(&self) -> Duration {
        Duration::from_millis(self.store_timeout_ms)
    }
}

/// Expand `${VAR}` references in a path setting.
///
/// Unset variables expand to nothing. Expanded values are copied as is, so a
/// value that itself contains `${` is not expanded again. An unterminated
/// `${` is kept literally.
fn expand_env(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut rest = s;
    while let Some(open) = rest.find("${") {
        out.push_str(&rest[..open]);
        let tail = &rest[open + 2..];
        let Some(close) = tail.find('}') else {
            out.push_str(&rest[open..]);
            return out;
        };
        out.push_str(&std::env::var(&tail[..close]).unwrap_or_default());
        rest = &tail[close + 1..];
    }
    out.push_str(rest);
    out
}

/// Load configuration from well-known paths.
///
/// Search order:
/// 1. `evalua.toml` in the current directory
/// 2. `~/.config/evalua/config.toml`
///
/// Environment variable override: `EVALUA_STORE_TIMEOUT_MS`.
pub fn load_config() -> Result<EvaluaConfig> {
    load_config_from(None)
}

/// Load config from an explicit path, or search the default locations.
pub fn load_config_from(path: Option<&Path>) -> Result<EvaluaConfig> {
    let config_path = if let Some(p) = path {
        if p.exists() {
            Some(p.to_path_buf())
        } else {
            anyhow::bail!("config file not found: {}", p.display());
        }
    } else {
        let local = PathBuf::from("evalua.toml");
        if local.exists() {
            Some(local)
        } else {
            dirs_path()
                .map(|home| home.join("config.toml"))
                .filter(|global| global.exists())
        }
    };

    let mut config = match config_path {
        Some(path) => {
            let content = std::fs::read_to_string(&path)
                .with_context(|| format!("failed to read config: {}", path.display()))?;
            parse_config(&content)
                .with_context(|| format!("failed to parse config: {}", path.display()))?
        }
        None => EvaluaConfig::default(),
    };

    if let Ok(value) = std::env::var("EVALUA_STORE_TIMEOUT_MS") {
        config.store_timeout_ms = value
            .trim()
            .parse()
            .with_context(|| format!("EVALUA_STORE_TIMEOUT_MS is not a number: {value}"))?;
    }

    config.state_path = PathBuf::from(expand_env(&config.state_path.to_string_lossy()));
    if config.store_timeout_ms == 0 {
        anyhow::bail!("store_timeout_ms must be greater than zero");
    }

    Ok(config)
}

/// Parse a config document without touching the environment.
pub fn parse_config(content: &str) -> Result<EvaluaConfig> {
    Ok(toml::from_str::<EvaluaConfig>(content)?)
}

fn dirs_path() -> Option<PathBuf> {
    std::env::var("HOME")
        .ok()
        .map(|h| PathBuf::from(h).join(".config").join("evalua"))
}
