//! Text Chunking
//!
//! Splits raw document text into bounded, overlapping chunks for embedding.
//! Cut points are chosen by walking a separator ladder; sizes are counted in
//! code points so a cut never lands inside a multi-byte character.

mod ladder;
pub mod recursive;

use serde::{Deserialize, Serialize};
use std::ops::Deref;

use crate::error::{CoreError, Result};

pub use ladder::{SeparatorLadder, DEFAULT_SEPARATORS};

/// Default maximum chunk size in characters
pub const DEFAULT_MAX_SIZE: usize = 500;

/// Default overlap between consecutive chunks in characters
pub const DEFAULT_OVERLAP: usize = 50;

/// Validated chunking parameters.
///
/// `max_size > 0` and `overlap < max_size` hold for every value of this type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChunkParams {
    max_size: usize,
    overlap: usize,
}

impl ChunkParams {
    pub fn new(max_size: usize, overlap: usize) -> Result<Self> {
        if max_size == 0 {
            return Err(CoreError::InvalidParameter(
                "max_size must be greater than 0".to_string(),
            ));
        }
        if overlap >= max_size {
            return Err(CoreError::InvalidParameter(format!(
                "overlap ({}) must be less than max_size ({})",
                overlap, max_size
            )));
        }
        Ok(Self { max_size, overlap })
    }

    pub fn max_size(&self) -> usize {
        self.max_size
    }

    pub fn overlap(&self) -> usize {
        self.overlap
    }

    /// Start of the next window, in chars, after cutting `cut` chars.
    ///
    /// Always in `1..=cut` for `cut > 0`: when the cut falls inside the
    /// overlap the overlap is dropped for that step.
    pub fn next_start(&self, cut: usize) -> usize {
        match cut.saturating_sub(self.overlap) {
            0 => cut,
            next => next,
        }
    }
}

impl Default for ChunkParams {
    fn default() -> Self {
        Self {
            max_size: DEFAULT_MAX_SIZE,
            overlap: DEFAULT_OVERLAP,
        }
    }
}

/// A trimmed, non-empty slice of the source text
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Chunk {
    /// Position within the sequence
    pub index: u32,
    /// Trimmed content
    pub content: String,
    /// Byte offset of `content` in the input text
    pub start_pos: usize,
    /// Byte offset one past the end of `content`
    pub end_pos: usize,
}

impl Chunk {
    pub fn char_len(&self) -> usize {
        self.content.chars().count()
    }
}

/// Ordered chunks in document order. Owned by the caller; dropping it
/// releases every chunk.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ChunkSequence {
    chunks: Vec<Chunk>,
}

impl ChunkSequence {
    pub(crate) fn push(&mut self, content: String, start_pos: usize, end_pos: usize) {
        let index = self.chunks.len() as u32;
        self.chunks.push(Chunk {
            index,
            content,
            start_pos,
            end_pos,
        });
    }

    /// Chunk contents in order
    pub fn texts(&self) -> Vec<&str> {
        self.chunks.iter().map(|c| c.content.as_str()).collect()
    }

    pub fn into_texts(self) -> Vec<String> {
        self.chunks.into_iter().map(|c| c.content).collect()
    }

    pub fn into_inner(self) -> Vec<Chunk> {
        self.chunks
    }
}

impl Deref for ChunkSequence {
    type Target = [Chunk];

    fn deref(&self) -> &[Chunk] {
        &self.chunks
    }
}

impl IntoIterator for ChunkSequence {
    type Item = Chunk;
    type IntoIter = std::vec::IntoIter<Chunk>;

    fn into_iter(self) -> Self::IntoIter {
        self.chunks.into_iter()
    }
}

impl<'a> IntoIterator for &'a ChunkSequence {
    type Item = &'a Chunk;
    type IntoIter = std::slice::Iter<'a, Chunk>;

    fn into_iter(self) -> Self::IntoIter {
        self.chunks.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_params_reject_zero_max_size() {
        assert!(matches!(
            ChunkParams::new(0, 0),
            Err(CoreError::InvalidParameter(_))
        ));
    }

    #[test]
    fn test_params_reject_overlap_at_or_above_max() {
        assert!(ChunkParams::new(10, 10).is_err());
        assert!(ChunkParams::new(10, 11).is_err());
        assert!(ChunkParams::new(10, 9).is_ok());
        assert!(ChunkParams::new(1, 0).is_ok());
    }

    #[test]
    fn test_next_start_keeps_overlap() {
        let params = ChunkParams::new(20, 5).unwrap();
        assert_eq!(params.next_start(20), 15);
        assert_eq!(params.next_start(6), 1);
    }

    #[test]
    fn test_next_start_always_advances() {
        let params = ChunkParams::new(20, 5).unwrap();
        // Cut inside the overlap would otherwise restart at 0
        assert_eq!(params.next_start(5), 5);
        assert_eq!(params.next_start(2), 2);
        for cut in 1..=20 {
            assert!(params.next_start(cut) > 0);
            assert!(params.next_start(cut) <= cut);
        }
    }

    #[test]
    fn test_sequence_indexes_in_order() {
        let mut seq = ChunkSequence::default();
        seq.push("a".to_string(), 0, 1);
        seq.push("b".to_string(), 2, 3);
        assert_eq!(seq.len(), 2);
        assert_eq!(seq[1].index, 1);
        assert_eq!(seq.texts(), vec!["a", "b"]);
        assert_eq!(seq.into_texts(), vec!["a".to_string(), "b".to_string()]);
    }
}
