//! # Process Registrar
//!
//! Declares the `faas` process that runs the watchdog. The declaration is
//! appended to the application metadata next to whatever other buildpacks
//! already declared; those entries are left alone.
//!
//! `direct = false` makes the launcher run the command through a shell, so
//! `$function_process` and friends are expanded at launch.

use crate::constants::{EXECUTABLE_NAME, FAAS_PROCESS_TYPE};
use crate::error::Result;
use crate::layers::Layers;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::info;

/// One `[[processes]]` entry of `launch.toml`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Process {
    /// Process type, e.g. `web` or `faas`.
    #[serde(rename = "type")]
    pub process_type: String,
    /// Command line, absolute path for the watchdog.
    pub command: String,
    /// Arguments passed to `command`.
    #[serde(default)]
    pub args: Vec<String>,
    /// Exec directly instead of through a shell.
    #[serde(default)]
    pub direct: bool,
}

impl Process {
    /// The watchdog declaration for a layer rooted at `layer_root`.
    pub fn faas(layer_root: &Path) -> Self {
        Self {
            process_type: FAAS_PROCESS_TYPE.to_string(),
            command: layer_root.join(EXECUTABLE_NAME).to_string_lossy().into_owned(),
            args: Vec::new(),
            direct: false,
        }
    }
}

/// Appends the `faas` process for `layer_root`.
///
/// Must run once per successful contribution.
pub fn register<L: Layers>(layers: &L, layer_root: &Path) -> Result<Process> {
    let process = Process::faas(layer_root);
    layers.append_process(process.clone())?;
    info!(process_type = %process.process_type, command = %process.command, "declared process");
    Ok(process)
}
