//! # Layer Abstraction
//!
//! The build platform hands the buildpack a layers directory. This module
//! reduces what the contributor needs from it to two narrow traits:
//!
//! - [`Layer`]: a named cache directory with a small metadata record and
//!   launch-time environment bindings.
//! - [`Layers`]: hands out layers and accepts process declarations.
//!
//! ## Backends
//!
//! | Backend          | Storage                        | Use                 |
//! |------------------|--------------------------------|---------------------|
//! | [`FsLayers`]     | Buildpack API 0.2 on-disk format | Real builds       |
//! | [`MemoryLayers`] | In-process maps                | Tests, fault injection |
//!
//! Both keep the artifact itself on disk under [`Layer::root`]; only the
//! bookkeeping differs.
//!
//! ## Concurrency
//!
//! A layer is owned by one contribution at a time. Nothing here locks the
//! layers directory; running two builds against the same cache is not
//! supported.

pub mod fs;
pub mod memory;

pub use fs::{FsLayer, FsLayers};
pub use memory::{MemoryLayer, MemoryLayers};

use crate::cache::{LayerFlags, LayerMetadata};
use crate::error::Result;
use crate::process::Process;
use std::path::Path;

/// A named directory persisted between builds.
pub trait Layer {
    /// Layer name.
    fn name(&self) -> &str;

    /// Absolute path of the layer contents. May not exist yet.
    fn root(&self) -> &Path;

    /// Reads the recorded metadata. No record yields the empty metadata.
    fn read_metadata(&self) -> Result<LayerMetadata>;

    /// Records `metadata` together with the layer flags.
    fn write_metadata(&self, metadata: &LayerMetadata, flags: LayerFlags) -> Result<()>;

    /// Drops the recorded metadata. A missing record is not an error.
    fn remove_metadata(&self) -> Result<()>;

    /// Binds `key=value` at launch with default (overridable) semantics.
    fn default_launch_env(&self, key: &str, value: &str) -> Result<()>;
}

/// The set of layers of one buildpack plus its application metadata.
pub trait Layers {
    /// Layer handle type.
    type Layer: Layer;

    /// Returns the handle for layer `name`, creating nothing on disk.
    fn layer(&self, name: &str) -> Result<Self::Layer>;

    /// Appends a process declaration to the application metadata.
    ///
    /// Existing declarations of other types are preserved. An earlier
    /// declaration of the same type is replaced.
    fn append_process(&self, process: Process) -> Result<()>;
}

/// Rejects env keys that cannot be a single file under `env.launch/`.
pub(crate) fn validate_env_key(key: &str) -> std::result::Result<(), &'static str> {
    if key.is_empty() {
        return Err("key is empty");
    }
    if key.contains('/') || key.contains('\\') || key.contains('\0') {
        return Err("key contains path separators");
    }
    if key == "." || key == ".." {
        return Err("key is a relative path component");
    }
    if key.contains('=') {
        return Err("key contains '='");
    }
    Ok(())
}

/// Rejects layer names outside `[A-Za-z0-9._-]` or starting with a dot.
///
/// The name becomes both a directory and a `<name>.toml` file next to
/// `launch.toml`, so it must stay a plain, visible path component.
pub(crate) fn validate_layer_name(name: &str) -> std::result::Result<(), &'static str> {
    if name.is_empty() {
        return Err("name is empty");
    }
    if name.starts_with('.') {
        return Err("name starts with '.'");
    }
    if !name
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
    {
        return Err("name contains characters other than [A-Za-z0-9._-]");
    }
    if name == "launch" {
        return Err("name collides with launch.toml");
    }
    Ok(())
}

/// Merges `process` into `processes`, replacing a same-typed entry in place.
pub(crate) fn merge_process(processes: &mut Vec<Process>, process: Process) {
    match processes
        .iter_mut()
        .find(|p| p.process_type == process.process_type)
    {
        Some(existing) => *existing = process,
        None => processes.push(process),
    }
}
