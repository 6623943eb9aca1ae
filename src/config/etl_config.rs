//! ETL Configuration - record store, database, export and blob settings
//!
//! Every section implements `Default`, so an empty or partial TOML file is
//! valid and missing keys fall back to the built-in values.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Environment variable pointing at a config file
pub const CONFIG_ENV: &str = "ETL_CONFIG";

/// Config file looked up in the working directory
pub const LOCAL_CONFIG_FILE: &str = "etl_config.toml";

// ============================================================================
// Top-Level Config
// ============================================================================

/// Root configuration for an ETL deployment.
///
/// Load with `EtlConfig::load()` which searches:
/// 1. `$ETL_CONFIG` env var
/// 2. `./etl_config.toml`
/// 3. Built-in defaults
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EtlConfig {
    /// Record store (paginated batch reads)
    #[serde(default)]
    pub source: SourceConfig,

    /// Relational store for location buckets
    #[serde(default)]
    pub database: DatabaseConfig,

    /// Sensor table rendering
    #[serde(default)]
    pub export: ExportConfig,

    /// Blob storage for exported tables
    #[serde(default)]
    pub blob: BlobConfig,

    /// Batch orchestration
    #[serde(default)]
    pub pipeline: PipelineConfig,
}

impl EtlConfig {
    /// Load configuration using the standard search order:
    /// 1. `$ETL_CONFIG` environment variable
    /// 2. `./etl_config.toml` in the current working directory
    /// 3. Built-in defaults
    pub fn load() -> Self {
        // 1. Check env var
        if let Ok(path) = std::env::var(CONFIG_ENV) {
            let p = PathBuf::from(&path);
            if p.exists() {
                match Self::load_from_file(&p) {
                    Ok(config) => {
                        info!(path = %p.display(), "Loaded ETL config from ETL_CONFIG");
                        return config;
                    }
                    Err(e) => {
                        warn!(path = %p.display(), error = %e, "Failed to load config from ETL_CONFIG, falling back");
                    }
                }
            } else {
                warn!(path = %path, "ETL_CONFIG points to non-existent file, falling back");
            }
        }

        // 2. Check ./etl_config.toml
        let local = PathBuf::from(LOCAL_CONFIG_FILE);
        if local.exists() {
            match Self::load_from_file(&local) {
                Ok(config) => {
                    info!("Loaded ETL config from ./etl_config.toml");
                    return config;
                }
                Err(e) => {
                    warn!(error = %e, "Failed to load ./etl_config.toml, using defaults");
                }
            }
        }

        // 3. Defaults
        info!("No etl_config.toml found, using built-in defaults");
        Self::default()
    }

    /// Load from a specific TOML file path.
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents =
            std::fs::read_to_string(path).map_err(|e| ConfigError::Io(path.to_path_buf(), e))?;
        let config = Self::from_toml_str(&contents).map_err(|e| match e {
            ConfigError::Parse(_, err) => ConfigError::Parse(path.to_path_buf(), err),
            other => other,
        })?;
        Ok(config)
    }

    /// Parse and validate a TOML document.
    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        let config: Self =
            toml::from_str(contents).map_err(|e| ConfigError::Parse(PathBuf::new(), e))?;
        config.validate()?;
        Ok(config)
    }

    /// Apply environment overrides that take precedence over the file.
    ///
    /// - `DATABASE_URL` replaces `database.url`
    pub fn apply_env_overrides(&mut self) {
        if let Ok(url) = std::env::var("DATABASE_URL") {
            if !url.is_empty() {
                self.database.url = url;
            }
        }
    }

    /// Validate all settings, collecting every problem found.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut errors: Vec<String> = Vec::new();

        if self.source.page_size == 0 {
            errors.push("source.page_size must be > 0".to_string());
        }

        if self.database.max_connections == 0 {
            errors.push("database.max_connections must be > 0".to_string());
        }

        if !(1..=22).contains(&self.export.compression_level) {
            errors.push(format!(
                "export.compression_level must be within 1..=22, got {}",
                self.export.compression_level
            ));
        }
        if self.export.file_prefix.is_empty() {
            errors.push("export.file_prefix must not be empty".to_string());
        }
        if let Err(msg) = self.export.delimiter_char() {
            errors.push(msg);
        }

        if self.blob.backend == BlobBackend::Http {
            if self.blob.endpoint.is_empty() {
                errors.push("blob.endpoint is required when blob.backend = \"http\"".to_string());
            }
            if self.blob.bucket.is_empty() {
                errors.push("blob.bucket is required when blob.backend = \"http\"".to_string());
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::Validation(errors))
        }
    }
}

// ============================================================================
// Error Type
// ============================================================================

#[derive(Debug)]
pub enum ConfigError {
    Io(PathBuf, std::io::Error),
    Parse(PathBuf, toml::de::Error),
    Validation(Vec<String>),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Io(path, e) => write!(f, "Config I/O error ({}): {}", path.display(), e),
            ConfigError::Parse(path, e) => {
                write!(f, "Config parse error ({}): {}", path.display(), e)
            }
            ConfigError::Validation(errors) => {
                write!(f, "Config validation failed:")?;
                for e in errors {
                    write!(f, "\n  - {}", e)?;
                }
                Ok(())
            }
        }
    }
}

impl std::error::Error for ConfigError {}

// ============================================================================
// Sections
// ============================================================================

/// Embedded record store
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceConfig {
    /// sled database directory
    pub db_path: PathBuf,
    /// Keys read per page when scanning a batch
    pub page_size: usize,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            db_path: PathBuf::from("./data/records.db"),
            page_size: 500,
        }
    }
}

/// PostgreSQL connection for the aggregate sink
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// Connection URL; `DATABASE_URL` overrides it
    pub url: String,
    pub max_connections: u32,
    pub acquire_timeout_secs: u64,
    /// Apply embedded migrations on connect
    pub run_migrations: bool,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            max_connections: 20,
            acquire_timeout_secs: 10,
            run_migrations: true,
        }
    }
}

/// Sensor table rendering
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportConfig {
    /// Object name prefix: `{file_prefix}_{batch}_{millis}.csv`
    pub file_prefix: String,
    /// Single-character cell delimiter
    pub delimiter: String,
    /// zstd level (1..=22)
    pub compression_level: i32,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            file_prefix: "sensors".to_string(),
            delimiter: ",".to_string(),
            compression_level: crate::export::DEFAULT_LEVEL,
        }
    }
}

impl ExportConfig {
    /// The delimiter as a char, rejecting multi-character, quote and
    /// line-break delimiters.
    pub fn delimiter_char(&self) -> Result<char, String> {
        let mut chars = self.delimiter.chars();
        match (chars.next(), chars.next()) {
            (Some(c), None) if !matches!(c, '"' | '\r' | '\n') => Ok(c),
            _ => Err(format!(
                "export.delimiter must be a single character other than a quote or line break, got {:?}",
                self.delimiter
            )),
        }
    }
}

/// Where exported tables are written
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum BlobBackend {
    /// Local object directory
    #[default]
    Fs,
    /// HTTP object store (PUT/GET by key)
    Http,
}

/// Blob storage settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BlobConfig {
    pub backend: BlobBackend,
    /// Root directory for the `fs` backend
    pub root: PathBuf,
    /// Base URL for the `http` backend
    pub endpoint: String,
    pub bucket: String,
    /// Prepended to every object name
    pub key_prefix: String,
    /// Env var holding a bearer token for the `http` backend
    pub token_env: String,
    pub request_timeout_secs: u64,
}

impl Default for BlobConfig {
    fn default() -> Self {
        Self {
            backend: BlobBackend::Fs,
            root: PathBuf::from("./data/objects"),
            endpoint: String::new(),
            bucket: "telemetry-csv".to_string(),
            key_prefix: "sensors/".to_string(),
            token_env: "BLOB_TOKEN".to_string(),
            request_timeout_secs: 30,
        }
    }
}

impl BlobConfig {
    /// Bearer token read from `token_env`, if set and non-empty.
    pub fn token(&self) -> Option<String> {
        if self.token_env.is_empty() {
            return None;
        }
        std::env::var(&self.token_env).ok().filter(|t| !t.is_empty())
    }
}

/// Batch orchestration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Run bucketizer and resampler concurrently
    pub parallel_stages: bool,
    /// Deadline for one batch in seconds (0 = none)
    pub timeout_secs: u64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            parallel_stages: true,
            timeout_secs: 0,
        }
    }
}

impl PipelineConfig {
    pub fn deadline(&self) -> Option<std::time::Duration> {
        (self.timeout_secs > 0).then(|| std::time::Duration::from_secs(self.timeout_secs))
    }
}
