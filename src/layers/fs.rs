//! # Filesystem Layers
//!
//! Buildpack API 0.2 layout under the layers directory handed to `build`:
//!
//! ```text
//! <layers>/
//! ├── launch.toml              [[processes]] declarations
//! ├── watchdog.toml            launch/build/cache flags + [metadata]
//! └── watchdog/                layer root
//!     ├── watchdog             downloaded binary
//!     └── env.launch/
//!         ├── function_process.default
//!         └── <KEY>.default
//! ```
//!
//! Metadata files are written through a uniquely named temp file and a
//! rename, so a crash never leaves a half-written record behind.

use super::{Layer, Layers, validate_env_key, validate_layer_name};
use crate::cache::{LayerFlags, LayerMetadata};
use crate::constants::{LAUNCH_ENV_DIR, LAUNCH_METADATA_FILE};
use crate::error::{Error, Result};
use crate::process::Process;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::debug;

/// On-disk shape of `<layers>/<name>.toml`.
#[derive(Debug, Default, Serialize, Deserialize)]
struct LayerToml {
    #[serde(default)]
    launch: bool,
    #[serde(default)]
    build: bool,
    #[serde(default)]
    cache: bool,
    #[serde(default)]
    metadata: LayerMetadata,
}

/// Layers directory of one buildpack.
#[derive(Debug, Clone)]
pub struct FsLayers {
    root: PathBuf,
}

impl FsLayers {
    /// Opens the layers directory at `root`.
    ///
    /// Relative paths are resolved against the working directory so that
    /// every layer root and process command is absolute.
    pub fn new(root: impl AsRef<Path>) -> Result<Self> {
        let root = std::path::absolute(root.as_ref())?;
        Ok(Self { root })
    }

    /// Returns the layers directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path of `launch.toml`.
    pub fn launch_metadata_path(&self) -> PathBuf {
        self.root.join(LAUNCH_METADATA_FILE)
    }

    /// Reads the process declarations currently in `launch.toml`.
    pub fn processes(&self) -> Result<Vec<Process>> {
        let mut table = self.read_launch_table()?;
        take_processes(&mut table)
    }

    fn read_launch_table(&self) -> Result<toml::Table> {
        let path = self.launch_metadata_path();
        match fs::read_to_string(&path) {
            Ok(contents) => contents.parse::<toml::Table>().map_err(|e| Error::Metadata {
                stage: "decoding launch metadata",
                reason: e.to_string(),
            }),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(toml::Table::new()),
            Err(e) => Err(Error::Metadata {
                stage: "reading launch metadata",
                reason: e.to_string(),
            }),
        }
    }
}

impl Layers for FsLayers {
    type Layer = FsLayer;

    fn layer(&self, name: &str) -> Result<FsLayer> {
        validate_layer_name(name).map_err(|reason| Error::Metadata {
            stage: "resolving layer",
            reason: format!("invalid layer name '{}': {}", name, reason),
        })?;

        Ok(FsLayer {
            name: name.to_string(),
            root: self.root.join(name),
            metadata_path: self.root.join(format!("{}.toml", name)),
        })
    }

    fn append_process(&self, process: Process) -> Result<()> {
        // Entries and keys we do not own (slices, other processes, their
        // `default`/`working-dir` keys, ...) are carried over as raw values.
        let mut table = self.read_launch_table()?;

        let entry = toml::Value::try_from(&process).map_err(|e| Error::Metadata {
            stage: "encoding launch metadata",
            reason: e.to_string(),
        })?;

        let processes = table
            .entry("processes".to_string())
            .or_insert_with(|| toml::Value::Array(Vec::new()));
        let toml::Value::Array(entries) = processes else {
            return Err(Error::Metadata {
                stage: "decoding launch metadata",
                reason: "`processes` is not an array".to_string(),
            });
        };

        let same_type = entries.iter_mut().find(|existing| {
            existing.get("type").and_then(toml::Value::as_str) == Some(process.process_type.as_str())
        });
        match same_type {
            Some(existing) => *existing = entry,
            None => entries.push(entry),
        }

        let contents = toml::to_string(&table).map_err(|e| Error::Metadata {
            stage: "encoding launch metadata",
            reason: e.to_string(),
        })?;

        write_atomic(&self.launch_metadata_path(), contents.as_bytes()).map_err(|e| {
            Error::Metadata {
                stage: "writing launch metadata",
                reason: e.to_string(),
            }
        })
    }
}

fn take_processes(table: &mut toml::Table) -> Result<Vec<Process>> {
    match table.remove("processes") {
        Some(value) => value.try_into().map_err(|e: toml::de::Error| Error::Metadata {
            stage: "decoding launch metadata",
            reason: e.to_string(),
        }),
        None => Ok(Vec::new()),
    }
}

/// A layer inside an [`FsLayers`] directory.
#[derive(Debug, Clone)]
pub struct FsLayer {
    name: String,
    root: PathBuf,
    metadata_path: PathBuf,
}

impl FsLayer {
    /// Path of `<layers>/<name>.toml`.
    pub fn metadata_path(&self) -> &Path {
        &self.metadata_path
    }

    /// Reads the flags currently recorded for this layer.
    pub fn read_flags(&self) -> Result<LayerFlags> {
        let toml = self.read_layer_toml()?;
        Ok(LayerFlags {
            launch: toml.launch,
            build: toml.build,
            cache: toml.cache,
        })
    }

    fn read_layer_toml(&self) -> Result<LayerToml> {
        match fs::read_to_string(&self.metadata_path) {
            Ok(contents) => toml::from_str(&contents).map_err(|e| Error::Metadata {
                stage: "decoding layer metadata",
                reason: e.to_string(),
            }),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(LayerToml::default()),
            Err(e) => Err(Error::Metadata {
                stage: "reading layer metadata",
                reason: e.to_string(),
            }),
        }
    }
}

impl Layer for FsLayer {
    fn name(&self) -> &str {
        &self.name
    }

    fn root(&self) -> &Path {
        &self.root
    }

    fn read_metadata(&self) -> Result<LayerMetadata> {
        Ok(self.read_layer_toml()?.metadata)
    }

    fn write_metadata(&self, metadata: &LayerMetadata, flags: LayerFlags) -> Result<()> {
        let toml = LayerToml {
            launch: flags.launch,
            build: flags.build,
            cache: flags.cache,
            metadata: metadata.clone(),
        };
        let contents = toml::to_string(&toml).map_err(|e| Error::Metadata {
            stage: "encoding layer metadata",
            reason: e.to_string(),
        })?;

        write_atomic(&self.metadata_path, contents.as_bytes()).map_err(|e| Error::Metadata {
            stage: "writing layer metadata",
            reason: e.to_string(),
        })?;

        debug!(layer = %self.name, version = %metadata.version, "wrote layer metadata");
        Ok(())
    }

    fn remove_metadata(&self) -> Result<()> {
        match fs::remove_file(&self.metadata_path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(Error::Metadata {
                stage: "removing layer metadata",
                reason: e.to_string(),
            }),
        }
    }

    fn default_launch_env(&self, key: &str, value: &str) -> Result<()> {
        validate_env_key(key).map_err(|reason| Error::ConfigWrite {
            key: key.to_string(),
            reason: reason.to_string(),
        })?;

        let env_dir = self.root.join(LAUNCH_ENV_DIR);
        let write = || -> io::Result<()> {
            fs::create_dir_all(&env_dir)?;
            fs::write(env_dir.join(format!("{}.default", key)), value)
        };

        write().map_err(|e| Error::ConfigWrite {
            key: key.to_string(),
            reason: e.to_string(),
        })
    }
}

/// Writes `data` to `path` via a unique temp file and a rename.
fn write_atomic(path: &Path, data: &[u8]) -> io::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    let temp_path = path.with_extension(format!("tmp.{}", uuid::Uuid::now_v7()));
    fs::write(&temp_path, data)?;
    fs::rename(&temp_path, path).inspect_err(|_| {
        let _ = fs::remove_file(&temp_path);
    })
}
