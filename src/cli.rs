//! Command-level glue shared by the `detect` and `build` executables.
//!
//! Buildpack API 0.2 invokes both from the application root:
//!
//! ```sh
//! bin/detect <platform> <plan>
//! bin/build <layers> <platform> <plan>
//! ```
//!
//! Each command maps its outcome to one of the exit codes in
//! [`crate::constants`] and logs the error before returning it.

use crate::config::{WatchdogConfig, config_exists, config_path};
use crate::constants::{DETECT_FAIL, DETECT_PASS, UNEXPECTED_ERROR};
use crate::contributor::Contributor;
use crate::fetch::HttpClient;
use crate::layers::FsLayers;
use std::path::{Path, PathBuf};
use tracing::{Level, debug, error, info};
use tracing_subscriber::FmtSubscriber;

/// Env var that switches logging to debug level.
pub const DEBUG_ENV: &str = "BP_DEBUG";

/// Installs the global subscriber. `BP_DEBUG` (any value) enables debug
/// output.
pub fn init_logging() {
    let level = if std::env::var_os(DEBUG_ENV).is_some() {
        Level::DEBUG
    } else {
        Level::INFO
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_ansi(false)
        .with_writer(std::io::stderr)
        .compact()
        .finish();

    if tracing::subscriber::set_global_default(subscriber).is_err() {
        eprintln!("Failed to set tracing subscriber");
    }
}

/// Arguments of `bin/build`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildArgs {
    /// Layers directory owned by this buildpack.
    pub layers_dir: PathBuf,
    /// Platform directory (unused).
    pub platform_dir: Option<PathBuf>,
    /// Build plan path (unused).
    pub plan_path: Option<PathBuf>,
}

impl BuildArgs {
    /// Parses `argv[1..]`.
    pub fn parse(args: &[String]) -> std::result::Result<Self, String> {
        let mut args = args.iter().map(PathBuf::from);
        let layers_dir = args
            .next()
            .ok_or_else(|| "build requires <layers> <platform> <plan>".to_string())?;

        Ok(Self {
            layers_dir,
            platform_dir: args.next(),
            plan_path: args.next(),
        })
    }
}

/// Detection passes when the application has a `watchdog.toml`.
pub fn detect(app_dir: &Path) -> u8 {
    let path = config_path(app_dir);
    match config_exists(&path) {
        Ok(true) => {
            debug!("Detection passed. Exiting with {}.", DETECT_PASS);
            DETECT_PASS
        }
        Ok(false) => {
            debug!("Detection failed. Exiting with {}.", DETECT_FAIL);
            DETECT_FAIL
        }
        Err(e) => {
            error!(path = %path.display(), error = %e, "checking for config file");
            UNEXPECTED_ERROR
        }
    }
}

/// Resolves the config and contributes the watchdog layer.
pub fn build<C: HttpClient>(app_dir: &Path, args: &BuildArgs, client: C) -> u8 {
    let config = match WatchdogConfig::resolve(app_dir) {
        Ok(config) => config,
        Err(e) => {
            error!(error = %e, "resolving watchdog config");
            return e.exit_code();
        }
    };

    let layers = match FsLayers::new(&args.layers_dir) {
        Ok(layers) => layers,
        Err(e) => {
            error!(error = %e, "opening layers directory");
            return UNEXPECTED_ERROR;
        }
    };

    match Contributor::new(client).contribute(&layers, &config) {
        Ok(_) => {
            info!(version = %config.version, "watchdog buildpack finished");
            0
        }
        Err(e) => {
            error!(error = %e, "contributing watchdog layer");
            e.exit_code()
        }
    }
}
