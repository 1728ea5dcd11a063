use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::digest::DEFAULT_ALGORITHM;
use crate::error::Error;

/// Environment variable that overrides the configured hash algorithm.
pub const ALGORITHM_ENV: &str = "LOGSEAL_ALGORITHM";

/// Default number of events per aggregator chunk.
pub const DEFAULT_CHUNK_SIZE: usize = 256;

// ---------------------------------------------------------------------------
// Engine configuration
// ---------------------------------------------------------------------------

/// How a finalized tree resolves a digest to its node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LookupStrategy {
    /// Digest-to-node map kept alongside the arena: O(1) lookups, O(n) memory.
    #[default]
    Indexed,
    /// Depth-first search from the root: O(n) lookups, no extra memory.
    Search,
}

impl FromStr for LookupStrategy {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Error> {
        match s.trim().to_ascii_lowercase().as_str() {
            "indexed" | "mem" | "memory" => Ok(Self::Indexed),
            "search" | "cpu" => Ok(Self::Search),
            other => Err(Error::InvalidConfig(format!(
                "unknown lookup strategy '{other}' (expected indexed or search)"
            ))),
        }
    }
}

impl fmt::Display for LookupStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Indexed => f.write_str("indexed"),
            Self::Search => f.write_str("search"),
        }
    }
}

/// Settings for a single [`crate::Tree`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TreeConfig {
    /// Algorithm name. Validated lazily, at the first digest.
    #[serde(default = "default_algorithm")]
    pub algorithm: String,
    #[serde(default)]
    pub lookup: LookupStrategy,
}

impl Default for TreeConfig {
    fn default() -> Self {
        Self {
            algorithm: default_algorithm(),
            lookup: LookupStrategy::default(),
        }
    }
}

impl TreeConfig {
    #[must_use]
    pub fn with_algorithm(algorithm: impl Into<String>) -> Self {
        Self {
            algorithm: algorithm.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub const fn lookup(mut self, lookup: LookupStrategy) -> Self {
        self.lookup = lookup;
        self
    }
}

/// Chunking and worker-pool settings for the [`crate::Aggregator`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkingConfig {
    /// Events per chunk task. Must be a power of two.
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,
    /// Worker threads; `None` sizes the pool to the available parallelism.
    #[serde(default)]
    pub workers: Option<usize>,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            chunk_size: default_chunk_size(),
            workers: None,
        }
    }
}

/// Everything an [`crate::Aggregator`] needs.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AggregatorConfig {
    pub tree: TreeConfig,
    pub chunking: ChunkingConfig,
}

impl AggregatorConfig {
    #[must_use]
    pub fn new(tree: TreeConfig, chunking: ChunkingConfig) -> Self {
        Self { tree, chunking }
    }

    #[must_use]
    pub const fn chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunking.chunk_size = chunk_size;
        self
    }

    #[must_use]
    pub const fn workers(mut self, workers: usize) -> Self {
        self.chunking.workers = Some(workers);
        self
    }

    /// Check ranges that the aggregator relies on.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfig`] if the chunk size is not a power of
    /// two or the worker count is zero.
    pub fn validate(&self) -> Result<(), Error> {
        if !self.chunking.chunk_size.is_power_of_two() {
            return Err(Error::InvalidConfig(format!(
                "chunk_size must be a power of two, got {}",
                self.chunking.chunk_size
            )));
        }
        if self.chunking.workers == Some(0) {
            return Err(Error::InvalidConfig("workers must be at least 1".into()));
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Config files
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignConfig {
    /// Sign new logs as append-only by default.
    #[serde(default)]
    pub allow_append: bool,
}

/// On-disk configuration, shared by the project and user config files.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectConfig {
    #[serde(default)]
    pub tree: TreeConfig,
    #[serde(default)]
    pub chunking: ChunkingConfig,
    #[serde(default)]
    pub sign: SignConfig,
}

impl ProjectConfig {
    #[must_use]
    pub fn aggregator(&self) -> AggregatorConfig {
        AggregatorConfig::new(self.tree.clone(), self.chunking.clone())
    }
}

/// Where the effective configuration came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigSource {
    Project(PathBuf),
    User(PathBuf),
    Defaults,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EffectiveConfig {
    pub config: ProjectConfig,
    pub source: ConfigSource,
}

/// Path of the project config file under `project_root`.
#[must_use]
pub fn project_config_path(project_root: &Path) -> PathBuf {
    project_root.join(".logseal/config.toml")
}

/// Read and parse one config file, `Ok(None)` when it does not exist.
///
/// # Errors
///
/// Fails if the file exists but cannot be read or is not valid TOML.
pub fn load_config_file(path: &Path) -> Result<Option<ProjectConfig>> {
    if !path.exists() {
        return Ok(None);
    }

    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;

    toml::from_str::<ProjectConfig>(&content)
        .map(Some)
        .with_context(|| format!("Failed to parse {}", path.display()))
}

pub fn load_project_config(project_root: &Path) -> Result<Option<ProjectConfig>> {
    load_config_file(&project_config_path(project_root))
}

pub fn load_user_config() -> Result<Option<(PathBuf, ProjectConfig)>> {
    let Some(config_dir) = dirs::config_dir() else {
        return Ok(None);
    };

    let path = config_dir.join("logseal/config.toml");
    Ok(load_config_file(&path)?.map(|config| (path, config)))
}

/// Resolve the configuration for `project_root`.
///
/// Precedence (highest wins):
/// 1. `LOGSEAL_ALGORITHM` env var (algorithm only)
/// 2. `.logseal/config.toml` in the project
/// 3. `<config_dir>/logseal/config.toml` for the user
/// 4. Built-in defaults
///
/// # Errors
///
/// Fails if a config file that exists cannot be read or parsed.
pub fn resolve_config(project_root: &Path) -> Result<EffectiveConfig> {
    let mut effective = if let Some(config) = load_project_config(project_root)? {
        EffectiveConfig {
            config,
            source: ConfigSource::Project(project_config_path(project_root)),
        }
    } else if let Some((path, config)) = load_user_config()? {
        EffectiveConfig {
            config,
            source: ConfigSource::User(path),
        }
    } else {
        EffectiveConfig {
            config: ProjectConfig::default(),
            source: ConfigSource::Defaults,
        }
    };

    if let Some(algorithm) = env::var(ALGORITHM_ENV).ok().filter(|v| !v.trim().is_empty()) {
        effective.config.tree.algorithm = algorithm;
    }

    Ok(effective)
}

fn default_algorithm() -> String {
    DEFAULT_ALGORITHM.to_string()
}

const fn default_chunk_size() -> usize {
    DEFAULT_CHUNK_SIZE
}
