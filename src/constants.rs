//! # Buildpack Constants
//!
//! Fixed literals shared by the config resolver, the artifact fetcher and the
//! contribution orchestrator. Nothing here is mutable; defaults are applied by
//! copying these values, never by consulting process-wide state.
//!
//! ## Cross-References
//!
//! - [`crate::config`]: Uses the default version and process type
//! - [`crate::fetch`]: Uses the download URL template and executable mode
//! - [`crate::env`]: Uses the launcher prefix for the derived binding
//! - [`crate::process`]: Uses the `faas` process type

use std::time::Duration;

// =============================================================================
// Configuration Defaults
// =============================================================================

/// Name of the optional configuration file in the application root.
///
/// Its presence is also what makes detection pass.
pub const CONFIG_FILENAME: &str = "watchdog.toml";

/// Watchdog release installed when `watchdog.version` is absent or empty.
pub const DEFAULT_VERSION: &str = "0.7.6";

/// Process type handed to the launcher when `watchdog.process_type` is
/// absent or empty.
pub const DEFAULT_PROCESS_TYPE: &str = "web";

// =============================================================================
// Layer Layout
// =============================================================================

/// Name of the layer holding the watchdog binary.
pub const LAYER_NAME: &str = "watchdog";

/// File name of the downloaded binary inside the layer root.
pub const EXECUTABLE_NAME: &str = "watchdog";

/// Permission bits applied to the downloaded binary.
///
/// Matches the usual container-image convention (`os.ModePerm`); the layer
/// is not a security boundary.
pub const EXECUTABLE_MODE: u32 = 0o777;

// =============================================================================
// Artifact Download
// =============================================================================

/// Release download location. `{version}` is replaced verbatim.
pub const DOWNLOAD_URL_TEMPLATE: &str =
    "https://github.com/openfaas-incubator/of-watchdog/releases/download/{version}/of-watchdog";

/// Placeholder substituted in [`DOWNLOAD_URL_TEMPLATE`].
pub const VERSION_PLACEHOLDER: &str = "{version}";

/// Upper bound for a single download through the default transport.
///
/// Only [`crate::fetch::ReqwestClient`] applies it. A caller-supplied
/// [`crate::fetch::HttpClient`] owns its own deadline.
pub const DOWNLOAD_TIMEOUT: Duration = Duration::from_secs(300);

// =============================================================================
// Launch Configuration
// =============================================================================

/// Environment variable read by the watchdog to find the function process.
pub const FUNCTION_PROCESS_ENV: &str = "function_process";

/// Prefix of the derived `function_process` value. The resolved process
/// type is appended to it.
pub const LAUNCHER_PREFIX: &str = "/cnb/lifecycle/launcher ";

/// Process type under which the watchdog is declared in `launch.toml`.
pub const FAAS_PROCESS_TYPE: &str = "faas";

/// File in the layers directory that carries process declarations.
pub const LAUNCH_METADATA_FILE: &str = "launch.toml";

/// Directory inside a layer holding launch-time environment bindings.
pub const LAUNCH_ENV_DIR: &str = "env.launch";

// =============================================================================
// Exit Codes
// =============================================================================
//
// Buildpack API 0.2 reserves 0 for a passing detection and 100 for a failing
// one. Errors are numbered upwards from 100.
// =============================================================================

/// Detection passed.
pub const DETECT_PASS: u8 = 0;

/// Detection failed: the application has no `watchdog.toml`.
pub const DETECT_FAIL: u8 = 100;

/// `watchdog.toml` exists but could not be parsed.
pub const PARSE_CONFIG_ERROR: u8 = DETECT_FAIL + 1;

/// The watchdog layer could not be contributed.
pub const LAYER_CREATION_ERROR: u8 = DETECT_FAIL + 2;

/// Any other failure (bad arguments, unreadable working directory, ...).
pub const UNEXPECTED_ERROR: u8 = DETECT_FAIL + 9;
