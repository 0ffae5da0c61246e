//! # Configuration Module
//!
//! Data directory setup and runtime configuration for nextwall.
//!
//! ## Data Storage
//!
//! Nextwall keeps its files in the platform-standard data directory:
//! - Linux: `~/.local/share/nextwall/`
//! - macOS: `~/Library/Application Support/nextwall/`
//! - Windows: `%APPDATA%\nextwall\`
//!
//! | File                  | Content                        |
//! |-----------------------|--------------------------------|
//! | `nextwall.db`         | wallpaper catalog (SQLite)     |
//! | `brightness-net.json` | brightness classifier weights  |
//! | `config.json`         | optional settings, see below   |
//!
//! ## Config File
//!
//! Every key is optional:
//!
//! ```json
//! {
//!   "wallpaper_dir": "/home/me/Pictures/Wallpapers",
//!   "location": { "latitude": 52.37, "longitude": 4.89 },
//!   "retry_limit": 5,
//!   "sample_limit": 1000
//! }
//! ```
//!
//! Command line flags win over the file.

use crate::selection::{DEFAULT_RETRY_LIMIT, DEFAULT_SAMPLE_LIMIT};
use crate::solar::Location;
use anyhow::{Context, Result};
use log::debug;
use path_absolutize::Absolutize;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

const APP_DIR: &str = "nextwall";
const DB_FILE: &str = "nextwall.db";
const CLASSIFIER_FILE: &str = "brightness-net.json";
const CONFIG_FILE: &str = "config.json";
const DEFAULT_WALLPAPER_DIR: &str = "/usr/share/backgrounds";

fn data_dir_location() -> Result<PathBuf> {
    let data_dir = dirs::data_dir().ok_or_else(|| anyhow::anyhow!(
        "Could not determine system data directory. Please ensure your platform supports standard data directories."
    ))?;
    Ok(data_dir.join(APP_DIR))
}

/// Returns the nextwall data directory, creating it if needed.
///
/// # Errors
///
/// This function will return an error if:
/// - The system data directory cannot be determined
/// - The nextwall subdirectory cannot be created due to permissions
pub fn get_data_dir() -> Result<PathBuf> {
    let dir = data_dir_location()?;
    fs::create_dir_all(&dir).with_context(|| format!(
        "Failed to create nextwall data directory at {}. Please check file permissions.",
        dir.display()
    ))?;
    Ok(dir)
}

/// Returns the platform-appropriate database file path.
///
/// # Errors
///
/// Same as [`get_data_dir`].
pub fn get_db_path() -> Result<PathBuf> {
    Ok(get_data_dir()?.join(DB_FILE))
}

/// Turn a relative path into an absolute one, based on the working directory.
///
/// # Errors
///
/// Fails if the working directory cannot be determined.
pub fn absolutize(path: &Path) -> Result<PathBuf> {
    let absolute = path
        .absolutize()
        .with_context(|| format!("Cannot make {} absolute", path.display()))?;
    Ok(absolute.into_owned())
}

/// The wallpaper directory as the scanner stores it: canonical, with
/// symlinks resolved. A directory that does not exist (any more) is only
/// made absolute.
///
/// # Errors
///
/// Fails if the working directory cannot be determined.
pub fn canonical_dir(path: &Path) -> Result<PathBuf> {
    match fs::canonicalize(path) {
        Ok(canonical) => Ok(canonical),
        Err(err) => {
            debug!("Cannot canonicalize {}: {err}", path.display());
            absolutize(path)
        }
    }
}

/// Configuration for runtime behavior
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RuntimeConfig {
    /// Path to the database file
    pub db_path: PathBuf,
    /// Path to the classifier weights
    pub classifier_path: PathBuf,
    /// Directory scanned and sampled when no directory is given
    pub wallpaper_dir: PathBuf,
    /// Where to compute sunrise and sunset for time-based selection
    pub location: Option<Location>,
    /// How often the current wallpaper may come up again before giving up
    pub retry_limit: u32,
    /// Maximum number of wallpapers sampled per run
    pub sample_limit: usize,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        let dir = data_dir_location().unwrap_or_else(|_| PathBuf::from("."));
        Self {
            db_path: dir.join(DB_FILE),
            classifier_path: dir.join(CLASSIFIER_FILE),
            wallpaper_dir: PathBuf::from(DEFAULT_WALLPAPER_DIR),
            location: None,
            retry_limit: DEFAULT_RETRY_LIMIT,
            sample_limit: DEFAULT_SAMPLE_LIMIT,
        }
    }
}

impl RuntimeConfig {
    /// Load `config.json` from the data directory, or the defaults if there is
    /// none.
    ///
    /// # Errors
    ///
    /// Fails if the data directory cannot be created or the config file is
    /// unreadable or malformed.
    pub fn load() -> Result<Self> {
        let path = get_data_dir()?.join(CONFIG_FILE);
        Self::from_file(&path)
    }

    /// Load configuration from `path`. A missing file gives the defaults.
    ///
    /// # Errors
    ///
    /// Fails if the file exists but cannot be read or parsed.
    pub fn from_file(path: &Path) -> Result<Self> {
        if !path.exists() {
            debug!("No config file at {}, using defaults", path.display());
            return Ok(Self::default());
        }
        let raw = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let config: Self = serde_json::from_str(&raw)
            .with_context(|| format!("Invalid config file {}", path.display()))?;
        if let Some(location) = config.location {
            Location::new(location.latitude, location.longitude)
                .with_context(|| format!("Invalid location in {}", path.display()))?;
        }
        debug!("Loaded config from {}", path.display());
        Ok(config)
    }

    /// Create configuration with explicit database path
    #[must_use]
    pub fn with_db_path(mut self, db_path: PathBuf) -> Self {
        self.db_path = db_path;
        self
    }

    /// Make every configured path absolute.
    ///
    /// # Errors
    ///
    /// Fails if the working directory cannot be determined.
    pub fn absolutize_paths(&mut self) -> Result<()> {
        self.db_path = absolutize(&self.db_path)?;
        self.classifier_path = absolutize(&self.classifier_path)?;
        self.wallpaper_dir = absolutize(&self.wallpaper_dir)?;
        Ok(())
    }

    /// Whether the classifier path is the default one in the data directory.
    #[must_use]
    pub fn uses_default_classifier(&self) -> bool {
        self.classifier_path == Self::default().classifier_path
    }
}
