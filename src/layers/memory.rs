//! In-memory layers for tests.
//!
//! Metadata, env bindings and process declarations live in shared maps; the
//! layer root is still a real directory so the fetcher can write the binary.
//! Individual operations can be made to fail to exercise error paths.

use super::{Layer, Layers, merge_process, validate_env_key};
use crate::cache::{LayerFlags, LayerMetadata};
use crate::error::{Error, Result};
use crate::process::Process;
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};

#[derive(Debug, Default)]
struct LayerState {
    metadata: Option<(LayerMetadata, LayerFlags)>,
    launch_env: BTreeMap<String, String>,
    metadata_removals: usize,
}

#[derive(Debug, Default)]
struct Faults {
    read_metadata: AtomicBool,
    write_metadata: AtomicBool,
    launch_env: AtomicBool,
    append_process: AtomicBool,
}

/// Layers kept in memory, rooted at a real directory.
#[derive(Debug, Clone)]
pub struct MemoryLayers {
    root: PathBuf,
    layers: Arc<RwLock<HashMap<String, Arc<RwLock<LayerState>>>>>,
    processes: Arc<RwLock<Vec<Process>>>,
    faults: Arc<Faults>,
}

impl MemoryLayers {
    /// Creates an empty set of layers under `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            layers: Arc::default(),
            processes: Arc::default(),
            faults: Arc::default(),
        }
    }

    /// Seeds a process declaration as if an earlier buildpack wrote it.
    pub fn with_process(self, process: Process) -> Self {
        write_lock(&self.processes).push(process);
        self
    }

    /// Declared processes, in order.
    pub fn processes(&self) -> Vec<Process> {
        read_lock(&self.processes).clone()
    }

    /// Makes `read_metadata` fail on every layer.
    pub fn fail_read_metadata(&self, fail: bool) {
        self.faults.read_metadata.store(fail, Ordering::SeqCst);
    }

    /// Makes `write_metadata` fail on every layer.
    pub fn fail_write_metadata(&self, fail: bool) {
        self.faults.write_metadata.store(fail, Ordering::SeqCst);
    }

    /// Makes `default_launch_env` fail on every layer.
    pub fn fail_launch_env(&self, fail: bool) {
        self.faults.launch_env.store(fail, Ordering::SeqCst);
    }

    /// Makes `append_process` fail.
    pub fn fail_append_process(&self, fail: bool) {
        self.faults.append_process.store(fail, Ordering::SeqCst);
    }
}

impl Layers for MemoryLayers {
    type Layer = MemoryLayer;

    fn layer(&self, name: &str) -> Result<MemoryLayer> {
        let state = write_lock(&self.layers)
            .entry(name.to_string())
            .or_default()
            .clone();

        Ok(MemoryLayer {
            name: name.to_string(),
            root: self.root.join(name),
            state,
            faults: self.faults.clone(),
        })
    }

    fn append_process(&self, process: Process) -> Result<()> {
        if self.faults.append_process.load(Ordering::SeqCst) {
            return Err(Error::Metadata {
                stage: "writing launch metadata",
                reason: "injected failure".to_string(),
            });
        }
        merge_process(&mut write_lock(&self.processes), process);
        Ok(())
    }
}

/// Handle to a layer of [`MemoryLayers`].
#[derive(Debug, Clone)]
pub struct MemoryLayer {
    name: String,
    root: PathBuf,
    state: Arc<RwLock<LayerState>>,
    faults: Arc<Faults>,
}

impl MemoryLayer {
    /// Recorded flags, if metadata was written.
    pub fn flags(&self) -> Option<LayerFlags> {
        read_lock(&self.state).metadata.as_ref().map(|(_, flags)| *flags)
    }

    /// Launch env bindings written so far.
    pub fn launch_env(&self) -> BTreeMap<String, String> {
        read_lock(&self.state).launch_env.clone()
    }

    /// How often the metadata was removed.
    pub fn metadata_removals(&self) -> usize {
        read_lock(&self.state).metadata_removals
    }
}

impl Layer for MemoryLayer {
    fn name(&self) -> &str {
        &self.name
    }

    fn root(&self) -> &Path {
        &self.root
    }

    fn read_metadata(&self) -> Result<LayerMetadata> {
        if self.faults.read_metadata.load(Ordering::SeqCst) {
            return Err(Error::Metadata {
                stage: "decoding layer metadata",
                reason: "injected failure".to_string(),
            });
        }
        Ok(read_lock(&self.state)
            .metadata
            .as_ref()
            .map(|(metadata, _)| metadata.clone())
            .unwrap_or_default())
    }

    fn write_metadata(&self, metadata: &LayerMetadata, flags: LayerFlags) -> Result<()> {
        if self.faults.write_metadata.load(Ordering::SeqCst) {
            return Err(Error::Metadata {
                stage: "writing layer metadata",
                reason: "injected failure".to_string(),
            });
        }
        write_lock(&self.state).metadata = Some((metadata.clone(), flags));
        Ok(())
    }

    fn remove_metadata(&self) -> Result<()> {
        let mut state = write_lock(&self.state);
        state.metadata = None;
        state.metadata_removals += 1;
        Ok(())
    }

    fn default_launch_env(&self, key: &str, value: &str) -> Result<()> {
        validate_env_key(key).map_err(|reason| Error::ConfigWrite {
            key: key.to_string(),
            reason: reason.to_string(),
        })?;
        if self.faults.launch_env.load(Ordering::SeqCst) {
            return Err(Error::ConfigWrite {
                key: key.to_string(),
                reason: "injected failure".to_string(),
            });
        }
        write_lock(&self.state)
            .launch_env
            .insert(key.to_string(), value.to_string());
        Ok(())
    }
}

// A poisoned lock only means another test thread panicked mid-update; the
// maps are still usable.
fn read_lock<T>(lock: &RwLock<T>) -> std::sync::RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(|e| e.into_inner())
}

fn write_lock<T>(lock: &RwLock<T>) -> std::sync::RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(|e| e.into_inner())
}
