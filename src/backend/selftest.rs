//! Conformance battery shared by backend loading and the test suites.
//!
//! A candidate backend must produce the same chunk boundaries as the
//! reference for every sample, and similarity scores within
//! [`SCORE_TOLERANCE`].

use super::{Backend, BackendError};
use crate::chunker::{ChunkParams, SeparatorLadder};

pub const SCORE_TOLERANCE: f64 = 1e-9;

pub const SAMPLE_TEXTS: &[&str] = &[
    "",
    "   \n\t  ",
    "Short text.",
    "Paragraph one text here.\n\nParagraph two is short.\nLine three follows. And a final sentence.",
    "第一句话。第二句话，还有更多内容。第三句！第四句？最后、一句。",
    "noseparatorsanywhereinthisveryveryverylongtokenwithoutbreaks",
    "  leading\n\n\n\ntrailing  \n  \n",
    "emoji 🦀🦀 crab\n\n🦀 text with ， mixed 。 punctuation",
    "a\nb\nc\nd\ne\nf\ng\nh\ni\nj\nk",
];

/// `(max_size, overlap)` pairs exercised against every sample
pub const PARAM_PAIRS: &[(usize, usize)] = &[(20, 5), (7, 0), (3, 2), (1, 0), (500, 50)];

fn vector_pairs() -> Vec<(Vec<f64>, Vec<f64>)> {
    let long_a: Vec<f64> = (0..37).map(|i| (i as f64 * 0.37).sin()).collect();
    let long_b: Vec<f64> = (0..37).map(|i| (i as f64 * 0.11).cos()).collect();
    vec![
        (vec![1.0, 2.0, 3.0], vec![1.0, 2.0, 3.0]),
        (vec![1.0, 0.0], vec![0.0, 1.0]),
        (vec![3.0, 4.0], vec![4.0, 3.0]),
        (vec![1.0, -2.0, 3.5, 0.25, 9.0], vec![-1.0, 2.0, -3.5, -0.25, -9.0]),
        (vec![0.0; 8], vec![1.0; 8]),
        (vec![], vec![]),
        (vec![1e-200, 2e-200, 3e-200], vec![1e-200, 2e-200, 3e-200]),
        (vec![1e200, 1e200, -1e200, 5e199, 1e200], vec![1e200, -1e200, 1e200, 1e200, 2e199]),
        (long_a, long_b),
    ]
}

fn ladders() -> Vec<SeparatorLadder> {
    let mut ladders = vec![SeparatorLadder::default()];
    if let Ok(english) = SeparatorLadder::new(["\n\n", "\n", ". ", " "]) {
        ladders.push(english);
    }
    ladders
}

/// Compare `candidate` against `reference` over the whole battery.
pub fn verify(candidate: &dyn Backend, reference: &dyn Backend) -> Result<(), BackendError> {
    for ladder in ladders() {
        for &(max_size, overlap) in PARAM_PAIRS {
            let params = ChunkParams::new(max_size, overlap)
                .map_err(|e| BackendError::SelfTestFailed(e.to_string()))?;

            for (i, text) in SAMPLE_TEXTS.iter().enumerate() {
                let expected = reference.chunk(text, params, &ladder);
                let actual = candidate.chunk(text, params, &ladder);
                if expected != actual {
                    return Err(BackendError::SelfTestFailed(format!(
                        "chunk mismatch on sample {} with max_size={} overlap={}: expected {} chunks, got {}",
                        i,
                        max_size,
                        overlap,
                        expected.len(),
                        actual.len()
                    )));
                }
            }
        }
    }

    for (i, (a, b)) in vector_pairs().iter().enumerate() {
        let expected = reference
            .similarity(a, b)
            .map_err(|e| BackendError::SelfTestFailed(e.to_string()))?;
        let actual = candidate
            .similarity(a, b)
            .map_err(|e| BackendError::SelfTestFailed(e.to_string()))?;
        if (expected - actual).abs() > SCORE_TOLERANCE {
            return Err(BackendError::SelfTestFailed(format!(
                "similarity mismatch on pair {}: expected {}, got {}",
                i, expected, actual
            )));
        }
    }

    if candidate.similarity(&[1.0, 2.0], &[1.0]).is_ok() {
        return Err(BackendError::SelfTestFailed(
            "length mismatch was not rejected".to_string(),
        ));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{ImplementationMode, ReferenceBackend};
    use crate::chunker::ChunkSequence;
    use crate::error::Result;

    /// Drops the last chunk of every result
    struct Lossy;

    impl Backend for Lossy {
        fn mode(&self) -> ImplementationMode {
            ImplementationMode::Accelerated
        }

        fn name(&self) -> &'static str {
            "lossy"
        }

        fn chunk(&self, text: &str, params: ChunkParams, ladder: &SeparatorLadder) -> ChunkSequence {
            let mut chunks = ReferenceBackend.chunk(text, params, ladder).into_inner();
            chunks.pop();
            let mut sequence = ChunkSequence::default();
            for chunk in chunks {
                sequence.push(chunk.content, chunk.start_pos, chunk.end_pos);
            }
            sequence
        }

        fn similarity(&self, a: &[f64], b: &[f64]) -> Result<f64> {
            ReferenceBackend.similarity(a, b)
        }
    }

    #[test]
    fn test_reference_conforms_to_itself() {
        assert!(verify(&ReferenceBackend, &ReferenceBackend).is_ok());
    }

    #[test]
    fn test_divergent_backend_is_rejected() {
        let err = verify(&Lossy, &ReferenceBackend).unwrap_err();
        assert!(matches!(err, BackendError::SelfTestFailed(msg) if msg.contains("chunk mismatch")));
    }

    #[test]
    fn test_extreme_pairs_score_nonzero() {
        let pairs = vector_pairs();
        let tiny = pairs.iter().find(|(a, _)| a[..] == [1e-200, 2e-200, 3e-200]).unwrap();
        let huge = pairs.iter().find(|(a, _)| a.first() == Some(&1e200)).unwrap();
        for (a, b) in [tiny, huge] {
            assert_ne!(ReferenceBackend.similarity(a, b).unwrap(), 0.0);
        }
    }

    #[test]
    fn test_param_pairs_are_valid() {
        for &(max_size, overlap) in PARAM_PAIRS {
            assert!(ChunkParams::new(max_size, overlap).is_ok());
        }
    }
}
