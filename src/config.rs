//! Configuration
//!
//! Resolved in layers: built-in defaults, then a JSON file
//! (`EC_RAG_CONFIG` or `<config_dir>/ec-rag/config.json`), then environment
//! overrides. An unreadable or invalid configuration is logged and replaced
//! by the defaults so the core always starts.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::chunker::{ChunkParams, SeparatorLadder, DEFAULT_MAX_SIZE, DEFAULT_OVERLAP, DEFAULT_SEPARATORS};

pub const ENV_CONFIG_PATH: &str = "EC_RAG_CONFIG";
pub const ENV_BACKEND: &str = "EC_RAG_BACKEND";
pub const ENV_MAX_SIZE: &str = "EC_RAG_MAX_SIZE";
pub const ENV_OVERLAP: &str = "EC_RAG_OVERLAP";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

impl Serialize for ConfigError {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

/// Which backend the dispatcher may use
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackendPreference {
    /// Try the accelerated backend, fall back to the reference one
    #[default]
    Auto,
    /// Always use the reference backend
    Reference,
}

impl std::str::FromStr for BackendPreference {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "auto" | "accelerated" | "native" => Ok(Self::Auto),
            "reference" => Ok(Self::Reference),
            other => Err(ConfigError::Invalid(format!("unknown backend: {}", other))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ChunkingConfig {
    /// Maximum chunk size in characters
    pub max_size: usize,
    /// Characters carried over from the end of one chunk into the next
    pub overlap: usize,
    /// Separator ladder, highest priority first
    pub separators: Vec<String>,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            max_size: DEFAULT_MAX_SIZE,
            overlap: DEFAULT_OVERLAP,
            separators: DEFAULT_SEPARATORS.iter().map(|s| s.to_string()).collect(),
        }
    }
}

impl ChunkingConfig {
    pub fn params(&self) -> Result<ChunkParams, ConfigError> {
        ChunkParams::new(self.max_size, self.overlap).map_err(|e| ConfigError::Invalid(e.to_string()))
    }

    pub fn ladder(&self) -> Result<SeparatorLadder, ConfigError> {
        SeparatorLadder::new(self.separators.iter().cloned())
            .map_err(|e| ConfigError::Invalid(e.to_string()))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct BackendConfig {
    pub preference: BackendPreference,
    /// Run the conformance battery before accepting the accelerated backend
    pub self_test: bool,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            preference: BackendPreference::Auto,
            self_test: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RetrievalConfig {
    /// Results returned per query
    pub top_k: usize,
    /// Candidate pool size for MMR re-ranking
    pub fetch_k: usize,
    /// MMR balance: 1.0 = pure relevance, 0.0 = pure diversity
    pub lambda: f64,
    pub use_mmr: bool,
    /// Drop hits scoring below this value
    pub min_score: Option<f64>,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            top_k: 3,
            fetch_k: 10,
            lambda: 0.5,
            use_mmr: true,
            min_score: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct IngestConfig {
    /// Chunks per embedding request (providers commonly cap at 64)
    pub batch_size: usize,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self { batch_size: 60 }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Config {
    pub chunking: ChunkingConfig,
    pub backend: BackendConfig,
    pub retrieval: RetrievalConfig,
    pub ingest: IngestConfig,
}

impl Config {
    /// Read and validate a JSON config file. Missing sections use defaults.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path)?;
        let config: Config = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Resolve the effective configuration. Never fails.
    pub fn load() -> Self {
        Self::resolve(config_path().as_deref(), |key| std::env::var(key).ok())
    }

    /// Layer the file at `path` (if any) and the overrides from `lookup`
    /// over the defaults. A rejected layer is logged and dropped; the layers
    /// beneath it are kept.
    pub fn resolve<F>(path: Option<&Path>, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let base = match path {
            Some(path) if path.exists() => match Self::from_file(path) {
                Ok(config) => {
                    info!(path = %path.display(), "Loaded configuration");
                    config
                }
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "Ignoring invalid configuration file");
                    Self::default()
                }
            },
            _ => {
                debug!("No configuration file, using defaults");
                Self::default()
            }
        };

        let mut config = base.clone();
        config.apply_env_overrides(lookup);
        if let Err(e) = config.validate() {
            warn!(error = %e, "Ignoring environment overrides that produce an invalid configuration");
            return base;
        }
        config
    }

    /// Apply `EC_RAG_*` overrides; `lookup` abstracts the environment.
    /// Unparseable values are logged and skipped.
    pub fn apply_env_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(value) = lookup(ENV_BACKEND) {
            match value.parse() {
                Ok(preference) => self.backend.preference = preference,
                Err(e) => warn!(var = ENV_BACKEND, error = %e, "Ignoring override"),
            }
        }
        if let Some(value) = lookup(ENV_MAX_SIZE) {
            match value.trim().parse() {
                Ok(max_size) => self.chunking.max_size = max_size,
                Err(_) => warn!(var = ENV_MAX_SIZE, value = %value, "Ignoring override"),
            }
        }
        if let Some(value) = lookup(ENV_OVERLAP) {
            match value.trim().parse() {
                Ok(overlap) => self.chunking.overlap = overlap,
                Err(_) => warn!(var = ENV_OVERLAP, value = %value, "Ignoring override"),
            }
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.chunking.params()?;
        self.chunking.ladder()?;

        let retrieval = &self.retrieval;
        if retrieval.top_k == 0 {
            return Err(ConfigError::Invalid("retrieval.topK must be greater than 0".to_string()));
        }
        if !(0.0..=1.0).contains(&retrieval.lambda) {
            return Err(ConfigError::Invalid(format!(
                "retrieval.lambda must be within [0, 1], got {}",
                retrieval.lambda
            )));
        }
        if self.ingest.batch_size == 0 {
            return Err(ConfigError::Invalid("ingest.batchSize must be greater than 0".to_string()));
        }
        Ok(())
    }

    /// Write the configuration as pretty JSON, atomically.
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        self.validate()?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string_pretty(self)?;
        let tmp_path = path.with_extension("json.tmp");
        fs::write(&tmp_path, content)?;
        fs::rename(&tmp_path, path)?;
        Ok(())
    }
}

/// Default location: `<config_dir>/ec-rag/config.json`
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("ec-rag").join("config.json"))
}

/// `EC_RAG_CONFIG` when set, otherwise the default location
pub fn config_path() -> Option<PathBuf> {
    std::env::var_os(ENV_CONFIG_PATH)
        .map(PathBuf::from)
        .or_else(default_config_path)
}
