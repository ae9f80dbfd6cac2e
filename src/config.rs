//! # Watchdog Configuration
//!
//! Reads the optional `watchdog.toml` from the application root:
//!
//! ```toml
//! [watchdog]
//! version = "0.7.6"
//! process_type = "web"
//! sha256 = "..."          # optional
//!
//! [watchdog.env]
//! mode = "http"
//! ```
//!
//! Every key is optional. Absent and empty `version`/`process_type` both fall
//! back to [`DEFAULT_VERSION`]/[`DEFAULT_PROCESS_TYPE`]. A missing file yields
//! the defaults; a file that exists but does not parse is an error, never a
//! silent fallback.

use crate::constants::{CONFIG_FILENAME, DEFAULT_PROCESS_TYPE, DEFAULT_VERSION, LAUNCHER_PREFIX};
use crate::error::{Error, Result};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Resolved `[watchdog]` table.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct WatchdogConfig {
    /// Watchdog release to install.
    pub version: String,
    /// Process type the watchdog asks the launcher to run.
    pub process_type: String,
    /// Extra launch-time environment.
    pub env: BTreeMap<String, String>,
    /// Expected SHA-256 of the downloaded binary (hex). Unchecked when unset.
    pub sha256: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct ConfigFile {
    #[serde(default)]
    watchdog: WatchdogConfig,
}

impl Default for WatchdogConfig {
    fn default() -> Self {
        Self {
            version: DEFAULT_VERSION.to_string(),
            process_type: DEFAULT_PROCESS_TYPE.to_string(),
            env: BTreeMap::new(),
            sha256: None,
        }
    }
}

impl WatchdogConfig {
    /// Parses `watchdog.toml` contents and fills empty fields with defaults.
    pub fn parse(contents: &str) -> std::result::Result<Self, toml::de::Error> {
        let file: ConfigFile = toml::from_str(contents)?;
        Ok(file.watchdog.with_defaults())
    }

    /// Loads the config for an application directory.
    ///
    /// Returns the defaults when `watchdog.toml` does not exist.
    pub fn resolve(app_dir: &Path) -> Result<Self> {
        let path = config_path(app_dir);

        let bytes = match fs::read(&path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "no config file, using defaults");
                return Ok(Self::default());
            }
            Err(e) => return Err(Error::Io(e)),
        };

        // Not UTF-8 means not TOML: the file exists but is malformed.
        let contents = String::from_utf8(bytes).map_err(|e| Error::Parse {
            path: path.clone(),
            reason: e.to_string(),
        })?;

        let config = Self::parse(&contents).map_err(|e| Error::Parse {
            path: path.clone(),
            reason: e.to_string(),
        })?;

        debug!(
            version = %config.version,
            process_type = %config.process_type,
            env_vars = config.env.len(),
            "resolved watchdog config"
        );
        Ok(config)
    }

    /// Value of the derived `function_process` binding.
    pub fn launcher_command(&self) -> String {
        format!("{}{}", LAUNCHER_PREFIX, self.process_type)
    }

    fn with_defaults(mut self) -> Self {
        if self.version.is_empty() {
            self.version = DEFAULT_VERSION.to_string();
        }
        if self.process_type.is_empty() {
            self.process_type = DEFAULT_PROCESS_TYPE.to_string();
        }
        if self.sha256.as_deref().is_some_and(str::is_empty) {
            self.sha256 = None;
        }
        self
    }
}

/// Path of `watchdog.toml` inside an application directory.
pub fn config_path(app_dir: &Path) -> PathBuf {
    app_dir.join(CONFIG_FILENAME)
}

/// Reports whether the config file exists.
///
/// A missing file is `Ok(false)`; any other stat failure is an error.
pub fn config_exists(path: &Path) -> Result<bool> {
    match fs::metadata(path) {
        Ok(_) => Ok(true),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(Error::Io(e)),
    }
}
