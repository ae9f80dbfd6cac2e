//! Error types for the watchdog buildpack.

use crate::constants::{LAYER_CREATION_ERROR, PARSE_CONFIG_ERROR, UNEXPECTED_ERROR};
use std::path::PathBuf;

/// Result type alias for buildpack operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while detecting or building.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    // =========================================================================
    // Configuration Errors
    // =========================================================================
    /// `watchdog.toml` exists but is not valid TOML or has wrong types.
    #[error("failed to parse {path}: {reason}")]
    Parse { path: PathBuf, reason: String },

    // =========================================================================
    // Metadata Errors
    // =========================================================================
    /// Layer or application metadata could not be read or written.
    #[error("{stage}: {reason}")]
    Metadata { stage: &'static str, reason: String },

    // =========================================================================
    // Fetch Errors
    // =========================================================================
    /// The HTTP request itself failed (DNS, TLS, connection, timeout).
    #[error("requesting '{url}': {reason}")]
    Transport { url: String, reason: String },

    /// The server answered with anything other than 200.
    #[error("downloading from '{url}' returned status code '{status}'")]
    UnexpectedStatus { url: String, status: u16 },

    /// The downloaded bytes do not hash to the configured digest.
    #[error("checksum mismatch: expected sha256 {expected}, computed {computed}")]
    ChecksumMismatch { expected: String, computed: String },

    /// Materializing the artifact on disk failed.
    #[error("{stage}: {reason}")]
    Fetch { stage: &'static str, reason: String },

    // =========================================================================
    // Launch Environment Errors
    // =========================================================================
    /// A launch-time environment binding could not be written.
    #[error("writing {key} env var: {reason}")]
    ConfigWrite { key: String, reason: String },

    // =========================================================================
    // Contribution Errors
    // =========================================================================
    /// A contribution step failed; `stage` names the step.
    #[error("{stage}: {source}")]
    Stage {
        stage: &'static str,
        #[source]
        source: Box<Error>,
    },

    // =========================================================================
    // I/O Errors
    // =========================================================================
    /// Generic I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Failure category of an [`Error`], independent of stage wrapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Malformed configuration.
    Parse,
    /// Cache bookkeeping or application metadata.
    Metadata,
    /// Network, status or on-disk artifact failure.
    Fetch,
    /// Launch environment binding.
    ConfigWrite,
    /// Anything else surfaced by the OS.
    Io,
}

impl Error {
    /// Wraps `self` with the label of the contribution step that failed.
    pub fn in_stage(self, stage: &'static str) -> Self {
        Error::Stage {
            stage,
            source: Box::new(self),
        }
    }

    /// Returns the failure category, looking through stage wrappers.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Parse { .. } => ErrorKind::Parse,
            Error::Metadata { .. } => ErrorKind::Metadata,
            Error::Transport { .. }
            | Error::UnexpectedStatus { .. }
            | Error::ChecksumMismatch { .. }
            | Error::Fetch { .. } => ErrorKind::Fetch,
            Error::ConfigWrite { .. } => ErrorKind::ConfigWrite,
            Error::Stage { source, .. } => source.kind(),
            Error::Io(_) => ErrorKind::Io,
        }
    }

    /// Exit status the `build` command reports for this error.
    ///
    /// Parse failures have their own code. Every other failure reaching the
    /// build command came out of a contribution step, except bare I/O errors
    /// which are raised before any layer work starts.
    pub fn exit_code(&self) -> u8 {
        match self.kind() {
            ErrorKind::Parse => PARSE_CONFIG_ERROR,
            ErrorKind::Io if !matches!(self, Error::Stage { .. }) => UNEXPECTED_ERROR,
            _ => LAYER_CREATION_ERROR,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_wrapping_keeps_kind() {
        let err = Error::UnexpectedStatus {
            url: "https://example.com/x".to_string(),
            status: 404,
        }
        .in_stage("downloading binary");

        assert_eq!(err.kind(), ErrorKind::Fetch);
        assert_eq!(
            err.to_string(),
            "downloading binary: downloading from 'https://example.com/x' returned status code '404'"
        );
    }

    #[test]
    fn test_exit_codes() {
        let parse = Error::Parse {
            path: PathBuf::from("watchdog.toml"),
            reason: "bad".to_string(),
        };
        assert_eq!(parse.exit_code(), PARSE_CONFIG_ERROR);

        let io = Error::Io(std::io::Error::other("boom"));
        assert_eq!(io.exit_code(), UNEXPECTED_ERROR);

        let staged_io = Error::Io(std::io::Error::other("boom")).in_stage("writing metadata");
        assert_eq!(staged_io.exit_code(), LAYER_CREATION_ERROR);

        let md = Error::Metadata {
            stage: "read metadata",
            reason: "bad".to_string(),
        };
        assert_eq!(md.exit_code(), LAYER_CREATION_ERROR);
    }
}
