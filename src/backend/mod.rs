//! Backend Selection
//!
//! Two interchangeable implementations of the chunker and scorer sit behind
//! the [`Backend`] trait: the accelerated [`NativeBackend`] and the portable
//! [`ReferenceBackend`]. The [`Dispatcher`] picks one exactly once and every
//! caller goes through it.

mod dispatcher;
mod native;
mod reference;
pub mod selftest;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::chunker::{ChunkParams, ChunkSequence, SeparatorLadder};
use crate::error::Result;

pub use dispatcher::{chunk, dispatcher, init_dispatcher, similarity, Dispatcher, DispatcherStatus};
pub use native::NativeBackend;
pub use reference::ReferenceBackend;

/// Which implementation services calls
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImplementationMode {
    Accelerated,
    Reference,
}

/// Reasons the accelerated backend could not be acquired
#[derive(Error, Debug, Clone, PartialEq)]
pub enum BackendError {
    #[error("Accelerated backend disabled by configuration")]
    Disabled,
    #[error("Accelerated backend unavailable: {0}")]
    Unavailable(String),
    #[error("Accelerated backend failed self-test: {0}")]
    SelfTestFailed(String),
    #[error("Accelerated backend panicked while loading: {0}")]
    Panicked(String),
}

impl Serialize for BackendError {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

/// Chunker + scorer implementation.
///
/// Implementations must agree on every defined input: identical chunk
/// boundaries and similarity within floating-point tolerance.
pub trait Backend: Send + Sync {
    fn mode(&self) -> ImplementationMode;

    fn name(&self) -> &'static str;

    fn chunk(&self, text: &str, params: ChunkParams, ladder: &SeparatorLadder) -> ChunkSequence;

    fn similarity(&self, a: &[f64], b: &[f64]) -> Result<f64>;
}
