use super::{Backend, ImplementationMode};
use crate::chunker::{recursive, ChunkParams, ChunkSequence, SeparatorLadder};
use crate::error::Result;
use crate::similarity;

/// Portable implementation, always available
#[derive(Debug, Clone, Copy, Default)]
pub struct ReferenceBackend;

impl Backend for ReferenceBackend {
    fn mode(&self) -> ImplementationMode {
        ImplementationMode::Reference
    }

    fn name(&self) -> &'static str {
        "reference"
    }

    fn chunk(&self, text: &str, params: ChunkParams, ladder: &SeparatorLadder) -> ChunkSequence {
        recursive::split(text, params, ladder)
    }

    fn similarity(&self, a: &[f64], b: &[f64]) -> Result<f64> {
        similarity::similarity(a, b)
    }
}
