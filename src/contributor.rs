//! # Contribution Orchestrator
//!
//! Composes the cache gate, fetcher, env configurator and process registrar
//! into one pass:
//!
//! ```text
//! resolve layer
//!   → read metadata → CacheDecision::decide
//!       Reuse ─────────────────────────────┐
//!       Evict → remove metadata → fetch ───┤
//!       Fetch ─────────────────→ fetch ────┤
//!   → write metadata (always)  ◄───────────┘
//!   → launch env
//!   → process declaration
//! ```
//!
//! ## Crash Resume
//!
//! Metadata is written right after the binary is in place and before the
//! env and process steps. If a later step fails, the next build sees a
//! matching version, reuses the binary and retries only the remaining
//! steps. Do not move the metadata write to the end.
//!
//! Every failure is wrapped with the label of the step that failed and
//! aborts the contribution. Nothing is rolled back and nothing is retried.

use crate::cache::{CacheDecision, LayerFlags, LayerMetadata};
use crate::config::WatchdogConfig;
use crate::constants::LAYER_NAME;
use crate::env::configure_launch_env;
use crate::error::Result;
use crate::fetch::{ArtifactFetcher, HttpClient};
use crate::layers::{Layer, Layers};
use crate::process;
use tracing::{debug, info, instrument};

/// Contributes the watchdog layer.
#[derive(Debug, Clone)]
pub struct Contributor<C> {
    fetcher: ArtifactFetcher<C>,
}

impl<C: HttpClient> Contributor<C> {
    /// Creates a contributor downloading through `client`.
    pub fn new(client: C) -> Self {
        Self {
            fetcher: ArtifactFetcher::new(client),
        }
    }

    /// Runs one contribution and returns the watchdog layer.
    #[instrument(skip_all, fields(version = %config.version, process_type = %config.process_type))]
    pub fn contribute<L: Layers>(&self, layers: &L, config: &WatchdogConfig) -> Result<L::Layer> {
        let layer = layers
            .layer(LAYER_NAME)
            .map_err(|e| e.in_stage("resolving layer"))?;

        self.install(&layer, config)?;

        configure_launch_env(&layer, config).map_err(|e| e.in_stage("writing launch env"))?;

        process::register(layers, layer.root()).map_err(|e| e.in_stage("writing app metadata"))?;

        info!(layer = layer.name(), root = %layer.root().display(), "watchdog layer contributed");
        Ok(layer)
    }

    /// Ensures the layer holds `config.version` and records it.
    fn install<L: Layer>(&self, layer: &L, config: &WatchdogConfig) -> Result<()> {
        let recorded = layer
            .read_metadata()
            .map_err(|e| e.in_stage("read metadata"))?;

        let decision = CacheDecision::decide(&recorded, &config.version);
        match decision {
            CacheDecision::Reuse => {
                info!(version = %config.version, "using cached watchdog");
            }
            CacheDecision::Evict => {
                debug!(cached = %recorded.version, wanted = %config.version, "evicting cached watchdog");
                layer
                    .remove_metadata()
                    .map_err(|e| e.in_stage("removing old metadata"))?;
            }
            CacheDecision::Fetch => {
                debug!(wanted = %config.version, "no cached watchdog");
            }
        }

        if decision.needs_fetch() {
            self.fetcher
                .fetch(&config.version, layer.root(), config.sha256.as_deref())
                .map_err(|e| e.in_stage("downloading binary"))?;
        }

        layer
            .write_metadata(
                &LayerMetadata::for_version(config.version.clone()),
                LayerFlags::CACHED_LAUNCH,
            )
            .map_err(|e| e.in_stage("writing metadata"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{Error, ErrorKind};
    use crate::fetch::HttpResponse;
    use crate::layers::MemoryLayers;
    use crate::process::Process;
    use std::cell::Cell;
    use std::fs;
    use tempfile::TempDir;

    struct Counting {
        status: u16,
        body: &'static str,
        calls: Cell<usize>,
    }

    impl Counting {
        fn ok(body: &'static str) -> Self {
            Self {
                status: 200,
                body,
                calls: Cell::new(0),
            }
        }
    }

    impl HttpClient for Counting {
        fn get(&self, _url: &str) -> Result<HttpResponse> {
            self.calls.set(self.calls.get() + 1);
            Ok(HttpResponse::from_bytes(self.status, self.body))
        }
    }

    fn config(version: &str) -> WatchdogConfig {
        WatchdogConfig {
            version: version.to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_metadata_survives_failed_registration() {
        let temp = TempDir::new().unwrap();
        let layers = MemoryLayers::new(temp.path());
        let client = Counting::ok("version 0.0.1");
        layers.fail_append_process(true);

        let err = Contributor::new(&client)
            .contribute(&layers, &config("0.0.1"))
            .unwrap_err();
        assert!(err.to_string().starts_with("writing app metadata"));
        assert_eq!(err.kind(), ErrorKind::Metadata);

        let layer = layers.layer(LAYER_NAME).unwrap();
        assert_eq!(layer.read_metadata().unwrap().version, "0.0.1");

        // Retry resumes from the cached binary.
        layers.fail_append_process(false);
        Contributor::new(&client)
            .contribute(&layers, &config("0.0.1"))
            .unwrap();

        assert_eq!(client.calls.get(), 1);
        assert_eq!(layers.processes().len(), 1);
    }

    #[test]
    fn test_evict_removes_metadata_before_fetch() {
        let temp = TempDir::new().unwrap();
        let layers = MemoryLayers::new(temp.path());

        Contributor::new(Counting::ok("a"))
            .contribute(&layers, &config("0.0.1"))
            .unwrap();

        let failing = Counting {
            status: 500,
            body: "",
            calls: Cell::new(0),
        };
        let err = Contributor::new(&failing)
            .contribute(&layers, &config("0.0.2"))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Fetch);

        let layer = layers.layer(LAYER_NAME).unwrap();
        assert_eq!(layer.metadata_removals(), 1);
        assert_eq!(layer.read_metadata().unwrap(), LayerMetadata::default());
    }

    #[test]
    fn test_corrupt_metadata_aborts() {
        let temp = TempDir::new().unwrap();
        let layers = MemoryLayers::new(temp.path());
        let client = Counting::ok("x");
        layers.fail_read_metadata(true);

        let err = Contributor::new(&client)
            .contribute(&layers, &config("0.0.1"))
            .unwrap_err();

        assert!(matches!(err, Error::Stage { stage: "read metadata", .. }));
        assert_eq!(client.calls.get(), 0);
    }

    #[test]
    fn test_reuse_rewrites_metadata_and_env() {
        let temp = TempDir::new().unwrap();
        let layers = MemoryLayers::new(temp.path());
        let client = Counting::ok("version 0.0.1");

        Contributor::new(&client)
            .contribute(&layers, &config("0.0.1"))
            .unwrap();

        let second = WatchdogConfig {
            process_type: "worker".to_string(),
            ..config("0.0.1")
        };
        let layer = Contributor::new(&client).contribute(&layers, &second).unwrap();

        assert_eq!(client.calls.get(), 1);
        assert_eq!(layer.flags(), Some(LayerFlags::CACHED_LAUNCH));
        assert_eq!(
            layer.launch_env()["function_process"],
            "/cnb/lifecycle/launcher worker"
        );
        assert_eq!(
            fs::read_to_string(layer.root().join("watchdog")).unwrap(),
            "version 0.0.1"
        );
    }

    #[test]
    fn test_metadata_write_failure_stops_before_registration() {
        let temp = TempDir::new().unwrap();
        let layers = MemoryLayers::new(temp.path());
        let client = Counting::ok("version 0.0.1");
        layers.fail_write_metadata(true);

        let err = Contributor::new(&client)
            .contribute(&layers, &config("0.0.1"))
            .unwrap_err();

        assert!(err.to_string().starts_with("writing metadata"), "{}", err);
        assert_eq!(err.kind(), ErrorKind::Metadata);
        assert_eq!(client.calls.get(), 1);
        assert!(layers.processes().is_empty());

        let layer = layers.layer(LAYER_NAME).unwrap();
        assert!(layer.launch_env().is_empty());
        assert_eq!(layer.read_metadata().unwrap(), LayerMetadata::default());
    }

    #[test]
    fn test_existing_processes_preserved() {
        let temp = TempDir::new().unwrap();
        let web = Process {
            process_type: "web".to_string(),
            command: "npm start".to_string(),
            args: vec!["--port".to_string(), "8081".to_string()],
            direct: true,
        };
        let layers = MemoryLayers::new(temp.path()).with_process(web.clone());

        let layer = Contributor::new(Counting::ok("bin"))
            .contribute(&layers, &WatchdogConfig::default())
            .unwrap();

        let processes = layers.processes();
        assert_eq!(processes, vec![web, Process::faas(layer.root())]);
    }
}
