/// Storage configuration
///
/// Selects the backend and the data directory from environment variables.
///
/// # Environment Variables
///
/// - `TASKTRACK_BACKEND`: `flat_file` (default) or `memory`
/// - `TASKTRACK_DATA_DIR`: directory holding the record files (default: `./data`)
///
/// # Example
///
/// ```no_run
/// use tasktrack_shared::config::StorageConfig;
///
/// # fn example() -> Result<(), tasktrack_shared::config::ConfigError> {
/// let config = StorageConfig::from_env()?;
/// println!("Users live in {}", config.layout().users.display());
/// # Ok(())
/// # }
/// ```

use serde::{Deserialize, Serialize};
use std::env;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use thiserror::Error;

/// Default data directory
pub const DEFAULT_DATA_DIR: &str = "./data";

/// Configuration errors
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    /// A variable holds a value outside its allowed set
    #[error("invalid value '{value}' for {name}: {reason}")]
    InvalidValue {
        name: &'static str,
        value: String,
        reason: String,
    },
}

/// Storage backend selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackendKind {
    /// Delimited text files in the data directory
    FlatFile,

    /// In-process document collections, lost on exit
    Memory,
}

impl BackendKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            BackendKind::FlatFile => "flat_file",
            BackendKind::Memory => "memory",
        }
    }
}

impl FromStr for BackendKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "flat_file" | "file" => Ok(BackendKind::FlatFile),
            "memory" => Ok(BackendKind::Memory),
            _ => Err(ConfigError::InvalidValue {
                name: "TASKTRACK_BACKEND",
                value: s.to_string(),
                reason: "expected 'flat_file' or 'memory'".to_string(),
            }),
        }
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Storage configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Which backend to wire
    pub backend: BackendKind,

    /// Directory holding the record files (flat-file backend only)
    pub data_dir: PathBuf,
}

impl StorageConfig {
    /// Loads configuration from `.env` (if present) and the environment
    ///
    /// # Errors
    ///
    /// Returns `InvalidValue` if `TASKTRACK_BACKEND` names an unknown backend
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env if present
        dotenvy::dotenv().ok();

        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Builds the configuration from an arbitrary variable lookup
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let backend = match lookup("TASKTRACK_BACKEND") {
            Some(value) if !value.trim().is_empty() => value.parse()?,
            _ => BackendKind::FlatFile,
        };

        let data_dir = lookup("TASKTRACK_DATA_DIR")
            .filter(|dir| !dir.trim().is_empty())
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_DATA_DIR));

        Ok(Self { backend, data_dir })
    }

    /// Flat-file backend rooted at `data_dir`
    pub fn flat_file(data_dir: impl AsRef<Path>) -> Self {
        Self {
            backend: BackendKind::FlatFile,
            data_dir: data_dir.as_ref().to_path_buf(),
        }
    }

    /// In-memory backend
    pub fn memory() -> Self {
        Self {
            backend: BackendKind::Memory,
            data_dir: PathBuf::from(DEFAULT_DATA_DIR),
        }
    }

    /// File names under the data directory
    pub fn layout(&self) -> FileLayout {
        FileLayout::new(&self.data_dir)
    }
}

/// Paths of the record files
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileLayout {
    pub audits: PathBuf,
    pub auth: PathBuf,
    pub users: PathBuf,
    pub projects: PathBuf,
    pub tasks: PathBuf,
}

impl FileLayout {
    pub fn new(data_dir: impl AsRef<Path>) -> Self {
        let dir = data_dir.as_ref();
        Self {
            audits: dir.join("audits.csv"),
            auth: dir.join("auth.csv"),
            users: dir.join("users.csv"),
            projects: dir.join("projects.csv"),
            tasks: dir.join("tasks.csv"),
        }
    }
}
