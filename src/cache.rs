//! # Version Cache Gate
//!
//! Decides whether the binary already sitting in the watchdog layer may be
//! reused. The only input is the version recorded in the layer metadata by
//! the previous build:
//!
//! | Recorded             | Decision  | Effect                               |
//! |----------------------|-----------|--------------------------------------|
//! | equal to desired     | `Reuse`   | no download                          |
//! | other, non-empty     | `Evict`   | remove metadata, then download       |
//! | empty / no record    | `Fetch`   | download                             |
//!
//! The decision is taken once per contribution. Metadata is rewritten after
//! both `Reuse` and a successful download so that a damaged record is
//! repaired by the next build.

use serde::{Deserialize, Serialize};

/// Metadata stored next to the watchdog layer between builds.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LayerMetadata {
    /// Version of the binary present in the layer root. Empty means none.
    #[serde(default)]
    pub version: String,
}

impl LayerMetadata {
    /// Metadata recording `version` as installed.
    pub fn for_version(version: impl Into<String>) -> Self {
        Self {
            version: version.into(),
        }
    }
}

/// Layer flags written together with the metadata.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LayerFlags {
    /// Exposed to the application at launch.
    pub launch: bool,
    /// Exposed to subsequent buildpacks.
    pub build: bool,
    /// Restored from cache on the next build.
    pub cache: bool,
}

impl LayerFlags {
    /// Cached between builds and available at launch. The watchdog layer
    /// always uses these flags.
    pub const CACHED_LAUNCH: LayerFlags = LayerFlags {
        launch: true,
        build: false,
        cache: true,
    };
}

/// Outcome of comparing the recorded version with the desired one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheDecision {
    /// The layer already holds the desired version.
    Reuse,
    /// The layer holds another version: drop its metadata and download.
    Evict,
    /// Nothing recorded: download.
    Fetch,
}

impl CacheDecision {
    /// Classifies `recorded` against `desired`.
    pub fn decide(recorded: &LayerMetadata, desired: &str) -> Self {
        if recorded.version.is_empty() {
            CacheDecision::Fetch
        } else if recorded.version == desired {
            CacheDecision::Reuse
        } else {
            CacheDecision::Evict
        }
    }

    /// Whether this decision requires a download.
    pub fn needs_fetch(self) -> bool {
        !matches!(self, CacheDecision::Reuse)
    }
}
