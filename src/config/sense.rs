// src/config/sense.rs
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use std::{env, fs};
use tracing::{info, warn};

use crate::error::{Result, SenseError};

pub const DEFAULT_CONFIG_PATH: &str = "config/moviesense.toml";

pub const ENV_CONFIG_PATH: &str = "MOVIESENSE_CONFIG_PATH";
pub const ENV_PRIMARY_URL: &str = "MOVIESENSE_PRIMARY_URL";
pub const ENV_FALLBACK_URL: &str = "MOVIESENSE_FALLBACK_URL";
pub const ENV_UPSTREAM_URL: &str = "MOVIESENSE_UPSTREAM_URL";
pub const ENV_STORAGE_DIR: &str = "MOVIESENSE_STORAGE_DIR";
pub const ENV_MOCK_DELAY_MS: &str = "MOVIESENSE_MOCK_DELAY_MS";

fn default_primary_url() -> String {
    "http://localhost:5000/analyze".to_string()
}
fn default_fallback_url() -> Option<String> {
    Some("http://localhost:5000/analyze/lightweight".to_string())
}
fn default_upstream_url() -> String {
    "http://localhost:5000/analyze".to_string()
}
fn default_primary_timeout_ms() -> u64 {
    15_000
}
fn default_fallback_timeout_ms() -> u64 {
    10_000
}
fn default_mock_enabled() -> bool {
    true
}
fn default_mock_delay_ms() -> u64 {
    1_000
}
fn default_storage_dir() -> PathBuf {
    PathBuf::from("data")
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SenseConfig {
    /// First tier of the analysis chain.
    #[serde(default = "default_primary_url")]
    pub primary_url: String,
    /// Second tier; `None` skips straight to the mock.
    #[serde(default = "default_fallback_url")]
    pub fallback_url: Option<String>,
    /// Target of the `/api/analyze-sentiment` pass-through route.
    #[serde(default = "default_upstream_url")]
    pub upstream_url: String,
    #[serde(default = "default_primary_timeout_ms")]
    pub primary_timeout_ms: u64,
    #[serde(default = "default_fallback_timeout_ms")]
    pub fallback_timeout_ms: u64,
    #[serde(default = "default_mock_enabled")]
    pub mock_enabled: bool,
    /// Simulated latency of the local heuristic.
    #[serde(default = "default_mock_delay_ms")]
    pub mock_delay_ms: u64,
    /// Directory holding `reviewHistory.json` / `aggregatedRatings.json`.
    #[serde(default = "default_storage_dir")]
    pub storage_dir: PathBuf,
}

impl Default for SenseConfig {
    fn default() -> Self {
        Self {
            primary_url: default_primary_url(),
            fallback_url: default_fallback_url(),
            upstream_url: default_upstream_url(),
            primary_timeout_ms: default_primary_timeout_ms(),
            fallback_timeout_ms: default_fallback_timeout_ms(),
            mock_enabled: default_mock_enabled(),
            mock_delay_ms: default_mock_delay_ms(),
            storage_dir: default_storage_dir(),
        }
    }
}

impl SenseConfig {
    pub fn from_toml_str(s: &str) -> Result<Self> {
        let mut cfg: SenseConfig =
            toml::from_str(s).map_err(|e| SenseError::Config(e.to_string()))?;
        cfg.sanitize();
        Ok(cfg)
    }

    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let data = fs::read_to_string(path)
            .map_err(|e| SenseError::Config(format!("reading {}: {e}", path.display())))?;
        Self::from_toml_str(&data)
    }

    /// Load order:
    /// 1) $MOVIESENSE_CONFIG_PATH (must exist)
    /// 2) config/moviesense.toml (optional)
    /// 3) built-in defaults
    ///
    /// Environment overrides are applied on top in every case.
    pub fn load() -> Result<Self> {
        let mut cfg = match env::var(ENV_CONFIG_PATH) {
            Ok(p) => Self::load_from_file(PathBuf::from(p))?,
            Err(_) => {
                let default_path = Path::new(DEFAULT_CONFIG_PATH);
                if default_path.exists() {
                    Self::load_from_file(default_path)?
                } else {
                    info!(target: "config", "no config file found; using defaults");
                    Self::default()
                }
            }
        };
        cfg.apply_env();
        cfg.sanitize();
        Ok(cfg)
    }

    pub fn apply_env(&mut self) {
        if let Some(v) = env_non_empty(ENV_PRIMARY_URL) {
            self.primary_url = v;
        }
        if let Ok(v) = env::var(ENV_FALLBACK_URL) {
            // an explicitly empty value disables the fallback tier
            let v = v.trim().to_string();
            self.fallback_url = if v.is_empty() { None } else { Some(v) };
        }
        if let Some(v) = env_non_empty(ENV_UPSTREAM_URL) {
            self.upstream_url = v;
        }
        if let Some(v) = env_non_empty(ENV_STORAGE_DIR) {
            self.storage_dir = PathBuf::from(v);
        }
        if let Some(v) = env_non_empty(ENV_MOCK_DELAY_MS) {
            match v.parse::<u64>() {
                Ok(ms) => self.mock_delay_ms = ms,
                Err(_) => warn!(target: "config", value = %v, "ignoring unparsable {ENV_MOCK_DELAY_MS}"),
            }
        }
    }

    /// Replace values that cannot work with their defaults.
    fn sanitize(&mut self) {
        if self.primary_url.trim().is_empty() {
            warn!(target: "config", "empty primary_url; using default");
            self.primary_url = default_primary_url();
        }
        if self.upstream_url.trim().is_empty() {
            warn!(target: "config", "empty upstream_url; using default");
            self.upstream_url = default_upstream_url();
        }
        if matches!(self.fallback_url.as_deref(), Some(u) if u.trim().is_empty()) {
            self.fallback_url = None;
        }
        if self.primary_timeout_ms == 0 {
            warn!(target: "config", "primary_timeout_ms=0; using default");
            self.primary_timeout_ms = default_primary_timeout_ms();
        }
        if self.fallback_timeout_ms == 0 {
            warn!(target: "config", "fallback_timeout_ms=0; using default");
            self.fallback_timeout_ms = default_fallback_timeout_ms();
        }
    }

    pub fn primary_timeout(&self) -> Duration {
        Duration::from_millis(self.primary_timeout_ms)
    }

    pub fn fallback_timeout(&self) -> Duration {
        Duration::from_millis(self.fallback_timeout_ms)
    }

    pub fn mock_delay(&self) -> Duration {
        Duration::from_millis(self.mock_delay_ms)
    }
}

fn env_non_empty(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
