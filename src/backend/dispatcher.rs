//! Fallback dispatcher.
//!
//! The accelerated backend is probed once per process. On failure the
//! reason is logged a single time and every subsequent call goes to the
//! reference backend; callers never see the failure.

use serde::Serialize;
use std::sync::OnceLock;
use tracing::{debug, info, warn};

use super::{Backend, BackendError, ImplementationMode, NativeBackend, ReferenceBackend};
use crate::chunker::{ChunkParams, ChunkSequence, SeparatorLadder};
use crate::config::Config;
use crate::error::Result;

static DISPATCHER: OnceLock<Dispatcher> = OnceLock::new();

/// Snapshot of the dispatcher's decision, for diagnostics
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DispatcherStatus {
    pub mode: ImplementationMode,
    pub backend: &'static str,
    pub load_failure: Option<BackendError>,
    pub separators: Vec<String>,
}

pub struct Dispatcher {
    backend: Box<dyn Backend>,
    ladder: SeparatorLadder,
    load_failure: Option<BackendError>,
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("backend", &self.backend.name())
            .field("ladder", &self.ladder)
            .field("load_failure", &self.load_failure)
            .finish()
    }
}

impl Dispatcher {
    /// Build a dispatcher from configuration, probing the accelerated backend.
    pub fn detect(config: &Config) -> Self {
        let ladder = match config.chunking.ladder() {
            Ok(ladder) => ladder,
            Err(e) => {
                warn!(error = %e, "Invalid separator ladder, using default");
                SeparatorLadder::default()
            }
        };
        let backend_config = config.backend.clone();
        Self::with_probe(ladder, move || NativeBackend::load(&backend_config))
    }

    /// Build a dispatcher whose accelerated backend comes from `probe`.
    ///
    /// `probe` runs exactly once. Any error selects the reference backend.
    pub fn with_probe<F>(ladder: SeparatorLadder, probe: F) -> Self
    where
        F: FnOnce() -> std::result::Result<NativeBackend, BackendError>,
    {
        match probe() {
            Ok(native) => {
                info!(backend = native.name(), "Using accelerated backend");
                Self {
                    backend: Box::new(native),
                    ladder,
                    load_failure: None,
                }
            }
            Err(BackendError::Disabled) => {
                info!("Accelerated backend disabled, using reference backend");
                Self {
                    backend: Box::new(ReferenceBackend),
                    ladder,
                    load_failure: Some(BackendError::Disabled),
                }
            }
            Err(e) => {
                warn!(error = %e, "Accelerated backend unavailable, falling back to reference backend");
                Self {
                    backend: Box::new(ReferenceBackend),
                    ladder,
                    load_failure: Some(e),
                }
            }
        }
    }

    /// Always the reference backend, no probing.
    pub fn reference(ladder: SeparatorLadder) -> Self {
        Self::with_probe(ladder, || Err(BackendError::Disabled))
    }

    pub fn mode(&self) -> ImplementationMode {
        self.backend.mode()
    }

    pub fn ladder(&self) -> &SeparatorLadder {
        &self.ladder
    }

    pub fn load_failure(&self) -> Option<&BackendError> {
        self.load_failure.as_ref()
    }

    pub fn status(&self) -> DispatcherStatus {
        DispatcherStatus {
            mode: self.backend.mode(),
            backend: self.backend.name(),
            load_failure: self.load_failure.clone(),
            separators: self.ladder.iter().map(str::to_string).collect(),
        }
    }

    /// Split `text` with the configured ladder. Validates the parameters.
    pub fn chunk(&self, text: &str, max_size: usize, overlap: usize) -> Result<ChunkSequence> {
        let params = ChunkParams::new(max_size, overlap)?;
        Ok(self.chunk_with(text, params))
    }

    pub fn chunk_with(&self, text: &str, params: ChunkParams) -> ChunkSequence {
        let chunks = self.backend.chunk(text, params, &self.ladder);
        debug!(
            backend = self.backend.name(),
            chars = text.chars().count(),
            chunks = chunks.len(),
            "Chunked text"
        );
        chunks
    }

    pub fn similarity(&self, a: &[f64], b: &[f64]) -> Result<f64> {
        self.backend.similarity(a, b)
    }
}

/// Process-wide dispatcher, initialized from [`Config::load`] on first use.
pub fn dispatcher() -> &'static Dispatcher {
    DISPATCHER.get_or_init(|| Dispatcher::detect(&Config::load()))
}

/// Initialize the process-wide dispatcher from `config`.
///
/// The decision is made once; later calls return the existing dispatcher.
pub fn init_dispatcher(config: &Config) -> &'static Dispatcher {
    if let Some(existing) = DISPATCHER.get() {
        debug!(mode = ?existing.mode(), "Dispatcher already initialized");
        return existing;
    }
    DISPATCHER.get_or_init(|| Dispatcher::detect(config))
}

/// Chunk `text` through the process-wide dispatcher.
pub fn chunk(text: &str, max_size: usize, overlap: usize) -> Result<ChunkSequence> {
    dispatcher().chunk(text, max_size, overlap)
}

/// Score two vectors through the process-wide dispatcher.
pub fn similarity(a: &[f64], b: &[f64]) -> Result<f64> {
    dispatcher().similarity(a, b)
}
