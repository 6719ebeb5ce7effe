//! Application configuration.
//!
//! Configuration is loaded from a TOML file at:
//! 1. `$MAILINDEX_CONFIG` (environment variable)
//! 2. `~/.config/mailindex/config.toml` (Linux/macOS)
//!    `%APPDATA%\mailindex\config.toml` (Windows)
//! 3. Built-in defaults

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::ingest::{IngestOptions, MAX_INGEST};
use crate::parser::{HeaderPolicy, ParserOptions};

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// General behavior settings.
    pub general: GeneralConfig,
    /// Parsing and indexing.
    pub ingest: IngestConfig,
    /// Which files under the corpus root are read.
    pub corpus: CorpusConfig,
}

/// General behavior settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Override cache directory for logs.
    pub cache_dir: Option<PathBuf>,
    /// Log level: "error", "warn", "info", "debug", "trace".
    pub log_level: String,
}

/// Parsing and indexing settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IngestConfig {
    /// Default upper bound on messages read per run (at most 100000).
    pub max_messages: usize,
    /// "strict" (canonical header order) or "scan" (any order).
    pub header_policy: HeaderPolicy,
    /// Join folded header lines before parsing.
    pub unfold_continuations: bool,
    /// Index recipients as well as senders.
    pub index_recipients: bool,
    /// Parse on all cores.
    pub parallel: bool,
    /// Messages read from disk per parse batch.
    pub batch_size: usize,
}

/// Corpus traversal settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CorpusConfig {
    /// Only read files whose name ends with this string.
    pub file_suffix: Option<String>,
    /// Follow symbolic links while walking.
    pub follow_links: bool,
}

// ── Default implementations ─────────────────────────────────────

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            cache_dir: None,
            log_level: "warn".to_string(),
        }
    }
}

impl Default for IngestConfig {
    fn default() -> Self {
        let options = IngestOptions::default();
        Self {
            max_messages: MAX_INGEST,
            header_policy: options.parser.policy,
            unfold_continuations: options.parser.unfold_continuations,
            index_recipients: true,
            parallel: options.parallel,
            batch_size: options.batch_size,
        }
    }
}

impl IngestConfig {
    /// The ingestion options these settings describe.
    pub fn options(&self) -> IngestOptions {
        IngestOptions {
            parser: ParserOptions {
                policy: self.header_policy,
                unfold_continuations: self.unfold_continuations,
            },
            parallel: self.parallel,
            batch_size: self.batch_size,
        }
    }
}

// ── Load / save ─────────────────────────────────────────────────

/// Where the active configuration came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigOrigin {
    /// Parsed from this file.
    File(PathBuf),
    /// No config file exists.
    Defaults,
    /// A config file exists but could not be used; defaults apply.
    Fallback { path: PathBuf, reason: String },
}

impl ConfigOrigin {
    /// Report the outcome. Call once a tracing subscriber is installed.
    pub fn log(&self) {
        match self {
            ConfigOrigin::File(path) => {
                tracing::info!(path = %path.display(), "Loaded config");
            }
            ConfigOrigin::Defaults => tracing::debug!("No config file, using defaults"),
            ConfigOrigin::Fallback { path, reason } => {
                tracing::warn!(
                    path = %path.display(),
                    error = %reason,
                    "Failed to load config, using defaults"
                );
            }
        }
    }
}

/// Load configuration, searching standard locations.
///
/// Returns the default configuration if no file is found or on parse error.
pub fn load_config() -> (Config, ConfigOrigin) {
    match config_file_path() {
        Some(path) => load_config_from(&path),
        None => (Config::default(), ConfigOrigin::Defaults),
    }
}

/// Load configuration from `path`, falling back to defaults.
pub fn load_config_from(path: &Path) -> (Config, ConfigOrigin) {
    if !path.exists() {
        return (Config::default(), ConfigOrigin::Defaults);
    }

    let fallback = |reason: String| {
        (
            Config::default(),
            ConfigOrigin::Fallback {
                path: path.to_path_buf(),
                reason,
            },
        )
    };

    match std::fs::read_to_string(path) {
        Ok(contents) => match toml::from_str::<Config>(&contents) {
            Ok(cfg) => (cfg, ConfigOrigin::File(path.to_path_buf())),
            Err(e) => fallback(e.to_string()),
        },
        Err(e) => fallback(e.to_string()),
    }
}

/// Save configuration to the standard location.
pub fn save_config(config: &Config) -> anyhow::Result<()> {
    let path = config_file_path()
        .ok_or_else(|| anyhow::anyhow!("Could not determine config file path"))?;

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let contents = toml::to_string_pretty(config)?;
    std::fs::write(&path, contents)?;
    tracing::info!(path = %path.display(), "Saved config");
    Ok(())
}

/// Determine the config file path (checking env var first, then standard dirs).
pub fn config_file_path() -> Option<PathBuf> {
    // 1. Environment variable override
    if let Ok(env_path) = std::env::var("MAILINDEX_CONFIG") {
        return Some(PathBuf::from(env_path));
    }

    // 2. Standard config directory
    dirs::config_dir().map(|d| d.join("mailindex").join("config.toml"))
}

/// Return the cache directory for logs.
pub fn cache_dir(config: &Config) -> PathBuf {
    if let Some(ref dir) = config.general.cache_dir {
        return dir.clone();
    }
    dirs::cache_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("mailindex")
}

/// Return the log file path.
pub fn log_file_path(config: &Config) -> PathBuf {
    cache_dir(config).join("mailindex.log")
}
