//! # watchdog-cnb
//!
//! **Cloud Native Buildpack that adds the OpenFaaS of-watchdog to an image**
//!
//! Turns any application with a `watchdog.toml` into a function image: the
//! watchdog binary is downloaded into a cached launch layer, told which of
//! the application's own process types to run, and declared as the `faas`
//! process.
//!
//! # Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                     bin/detect, bin/build                       │
//! │              (cli: arguments, logging, exit codes)              │
//! ├─────────────────────────────────────────────────────────────────┤
//! │  WatchdogConfig::resolve ──► Contributor::contribute            │
//! │                                  │                              │
//! │        ┌─────────────────────────┼──────────────────────┐       │
//! │        ▼                         ▼                      ▼       │
//! │  CacheDecision ──► ArtifactFetcher    configure_launch_env      │
//! │  (reuse/evict/fetch)  (HttpClient)    process::register         │
//! ├─────────────────────────────────────────────────────────────────┤
//! │        Layers / Layer traits  (FsLayers, MemoryLayers)          │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Cache Semantics
//!
//! The layer records the installed version in its metadata. A matching
//! version skips the download; any other recorded version is evicted first.
//! The record is written before the env and process steps, so a build that
//! fails late resumes from the cached binary on the next run.
//!
//! # Example
//!
//! ```rust,ignore
//! use watchdog_cnb::{Contributor, FsLayers, ReqwestClient, WatchdogConfig};
//!
//! let config = WatchdogConfig::resolve(app_dir)?;
//! let layers = FsLayers::new(layers_dir)?;
//! let layer = Contributor::new(ReqwestClient::new()?).contribute(&layers, &config)?;
//! ```

pub mod cache;
pub mod cli;
pub mod config;
pub mod constants;
pub mod contributor;
pub mod env;
pub mod error;
pub mod fetch;
pub mod layers;
pub mod process;

// Re-exports
pub use cache::{CacheDecision, LayerFlags, LayerMetadata};
pub use config::{WatchdogConfig, config_exists, config_path};
pub use constants::*;
pub use contributor::Contributor;
pub use env::configure_launch_env;
pub use error::{Error, ErrorKind, Result};
pub use fetch::{ArtifactFetcher, HttpClient, HttpResponse, ReqwestClient, download_url};
pub use layers::{FsLayer, FsLayers, Layer, Layers, MemoryLayer, MemoryLayers};
pub use process::Process;
