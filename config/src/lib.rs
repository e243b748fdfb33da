//! Umbra Configuration
//!
//! Shared configuration crate for all Umbra components.
//!
//! Handles loading configuration from:
//! 1. UMBRA_CONFIG env var (explicit path)
//! 2. ./umbra.toml (current directory)
//! 3. ~/.umbra/umbra.toml (user home)
//!
//! Environment variables take precedence over TOML config.

use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use std::{env, fs};

/// Global config instance for convenience access
pub static GLOBAL_CONFIG: OnceLock<UmbraConfig> = OnceLock::new();

const CONFIG_FILE_NAME: &str = "umbra.toml";
const CONFIG_DIR_NAME: &str = ".umbra";

// ============================================================================
// Default Constants
// ============================================================================

const DEFAULT_DB_PATH: &str = "./umbra-db";
const DEFAULT_RING_MAX: usize = 256;
const DEFAULT_ROOT_HISTORY: usize = 100;

/// Largest ring a statement exponent byte can describe on 64-bit targets.
pub const RING_MAX_LIMIT: u64 = 1 << 63;

// ============================================================================
// Config Structs
// ============================================================================

/// Root configuration structure (matches TOML layout)
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UmbraConfig {
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub ledger: LedgerConfig,
    #[serde(default)]
    pub staking: StakingConfig,
}

/// Storage engine selection
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DatabaseBackend {
    #[default]
    Memory,
    Rocksdb,
}

/// Database configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_db_path")]
    pub path: String,
    #[serde(default)]
    pub backend: DatabaseBackend,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: DEFAULT_DB_PATH.into(),
            backend: DatabaseBackend::default(),
        }
    }
}

fn default_db_path() -> String {
    DEFAULT_DB_PATH.into()
}

/// Ledger protocol limits
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerConfig {
    /// Largest accepted ring. Must be a power of two.
    #[serde(default = "default_ring_max")]
    pub ring_max: usize,
    /// Number of recent state roots a statement may be bound to.
    #[serde(default = "default_root_history")]
    pub root_history: usize,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            ring_max: DEFAULT_RING_MAX,
            root_history: DEFAULT_ROOT_HISTORY,
        }
    }
}

fn default_ring_max() -> usize {
    DEFAULT_RING_MAX
}
fn default_root_history() -> usize {
    DEFAULT_ROOT_HISTORY
}

/// Ordering of the stake-selection heap
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HeapKindToml {
    #[default]
    Max,
    Min,
}

/// Staking selector configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StakingConfig {
    #[serde(default)]
    pub heap_kind: HeapKindToml,
}

// ============================================================================
// Environment Variable Helpers
// ============================================================================

/// Source of override values, keyed by env var name
type Lookup<'a> = &'a dyn Fn(&str) -> Option<String>;

/// Set field from env var if present
fn env_string(lookup: Lookup<'_>, key: &str, field: &mut String) {
    if let Some(v) = lookup(key) {
        *field = v;
    }
}

/// Set field from env var if present and parseable
fn env_parse<T: std::str::FromStr>(lookup: Lookup<'_>, key: &str, field: &mut T) {
    if let Some(v) = lookup(key) {
        match v.parse() {
            Ok(parsed) => *field = parsed,
            Err(_) => log::warn!("Ignoring unparseable {}={}", key, v),
        }
    }
}

impl std::str::FromStr for DatabaseBackend {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "memory" => Ok(Self::Memory),
            "rocksdb" => Ok(Self::Rocksdb),
            other => Err(format!("unknown database backend: {other}")),
        }
    }
}

impl std::str::FromStr for HeapKindToml {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "max" => Ok(Self::Max),
            "min" => Ok(Self::Min),
            other => Err(format!("unknown heap kind: {other}")),
        }
    }
}

// ============================================================================
// Implementation
// ============================================================================

impl UmbraConfig {
    /// Load configuration from config file with env var overrides
    pub fn load() -> Result<Self> {
        let mut config = match Self::find_config_file() {
            Some(path) => {
                log::info!("Loading config from: {}", path.display());
                Self::parse_file(&path)?
            }
            None => {
                log::info!("No config file found, using defaults and environment variables");
                Self::default()
            }
        };

        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a specific file path
    pub fn load_from(path: &Path) -> Result<Self> {
        let mut config = Self::parse_file(path)?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    fn parse_file(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    /// Find the config file path
    fn find_config_file() -> Option<PathBuf> {
        // 1. Check UMBRA_CONFIG env var
        if let Ok(path) = env::var("UMBRA_CONFIG") {
            let path = PathBuf::from(path);
            if path.exists() {
                return Some(path);
            }
            log::warn!("UMBRA_CONFIG points at missing file: {}", path.display());
        }

        // 2. Check ./umbra.toml (current directory)
        let local_path = PathBuf::from(CONFIG_FILE_NAME);
        if local_path.exists() {
            return Some(local_path);
        }

        // 3. Check ~/.umbra/umbra.toml
        Self::default_config_path().filter(|p| p.exists())
    }

    /// Apply environment variable overrides
    fn apply_env_overrides(&mut self) {
        self.apply_overrides(&|key| env::var(key).ok());
    }

    /// Apply overrides from `lookup`; unparseable values keep the configured one.
    fn apply_overrides(&mut self, lookup: Lookup<'_>) {
        // Database
        env_string(lookup, "UMBRA_DB_PATH", &mut self.database.path);
        env_parse(lookup, "UMBRA_DB_BACKEND", &mut self.database.backend);

        // Ledger
        env_parse(lookup, "UMBRA_RING_MAX", &mut self.ledger.ring_max);
        env_parse(lookup, "UMBRA_ROOT_HISTORY", &mut self.ledger.root_history);

        // Staking
        env_parse(lookup, "UMBRA_HEAP_KIND", &mut self.staking.heap_kind);
    }

    /// Reject limits the ledger cannot honour.
    pub fn validate(&self) -> Result<()> {
        let ring_max = self.ledger.ring_max;
        if ring_max < 2 || !ring_max.is_power_of_two() || ring_max as u64 > RING_MAX_LIMIT {
            bail!(
                "ledger.ring_max must be a power of two in [2, 2^63], got {}",
                ring_max
            );
        }
        if self.ledger.root_history == 0 {
            bail!("ledger.root_history must be greater than zero");
        }
        if self.database.backend == DatabaseBackend::Rocksdb && self.database.path.is_empty() {
            bail!("database.path is required for the rocksdb backend");
        }
        Ok(())
    }

    /// Get the default config file path
    pub fn default_config_path() -> Option<PathBuf> {
        dirs::home_dir().map(|h| h.join(CONFIG_DIR_NAME).join(CONFIG_FILE_NAME))
    }

    /// Generate a sample config file
    pub fn generate_sample() -> String {
        let mut sample = Self::default();
        sample.database.backend = DatabaseBackend::Rocksdb;
        toml::to_string_pretty(&sample).unwrap_or_default()
    }

    /// Get the global config instance, initializing it if necessary.
    ///
    /// Falls back to defaults if loading fails.
    pub fn global() -> &'static UmbraConfig {
        GLOBAL_CONFIG.get_or_init(|| {
            Self::load().unwrap_or_else(|e| {
                log::warn!("Failed to load config: {:#}, using defaults", e);
                Self::default()
            })
        })
    }

    /// Try to get the global config instance.
    ///
    /// Returns `None` if config hasn't been initialized yet.
    pub fn try_global() -> Option<&'static UmbraConfig> {
        GLOBAL_CONFIG.get()
    }

    /// Initialize the global config with a specific instance.
    ///
    /// Returns `Err(config)` if already initialized.
    pub fn set_global(config: UmbraConfig) -> std::result::Result<(), UmbraConfig> {
        GLOBAL_CONFIG.set(config)
    }
}

/// Shorthand for `UmbraConfig::global()`.
#[inline]
pub fn global_config() -> &'static UmbraConfig {
    UmbraConfig::global()
}

// ============================================================================
// Tests
// ============================================================================
