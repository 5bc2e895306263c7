//! Accelerated backend.
//!
//! Chunking searches UTF-8 bytes directly (`str::rfind` inside a window that
//! ends on a char boundary) instead of decoding the whole text, and the
//! scorer accumulates in four independent lanes.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};

use super::{selftest, Backend, BackendError, ImplementationMode, ReferenceBackend};
use crate::chunker::{ChunkParams, ChunkSequence, SeparatorLadder};
use crate::config::{BackendConfig, BackendPreference};
use crate::error::Result;
use crate::similarity::{check_dimensions, scale_factors, weighted_cosine, UNDEFINED_SIMILARITY};

#[derive(Debug, Clone, Copy)]
pub struct NativeBackend {
    _private: (),
}

impl NativeBackend {
    /// Acquire the accelerated backend, verifying it against the reference
    /// implementation when `config.self_test` is set.
    pub fn load(config: &BackendConfig) -> std::result::Result<Self, BackendError> {
        if config.preference == BackendPreference::Reference {
            return Err(BackendError::Disabled);
        }

        let backend = NativeBackend { _private: () };
        if config.self_test {
            let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
                selftest::verify(&backend, &ReferenceBackend)
            }));
            match outcome {
                Ok(result) => result?,
                Err(payload) => return Err(BackendError::Panicked(panic_message(payload.as_ref()))),
            }
        }

        Ok(backend)
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

/// Byte offset of the `n`th char of `s`, or `None` if `s` has `n` chars or fewer
fn char_boundary(s: &str, n: usize) -> Option<usize> {
    s.char_indices().nth(n).map(|(i, _)| i)
}

fn push_trimmed(sequence: &mut ChunkSequence, text: &str, start: usize, end: usize) {
    let piece = &text[start..end];
    let trimmed = piece.trim();
    if trimmed.is_empty() {
        return;
    }
    let from = start + (piece.len() - piece.trim_start().len());
    sequence.push(trimmed.to_string(), from, from + trimmed.len());
}

fn split(text: &str, params: ChunkParams, ladder: &SeparatorLadder) -> ChunkSequence {
    let mut sequence = ChunkSequence::default();
    let mut base = 0usize;

    loop {
        let rest = &text[base..];
        let window_end = match char_boundary(rest, params.max_size()) {
            Some(end) => end,
            None => {
                push_trimmed(&mut sequence, text, base, text.len());
                break;
            }
        };

        // A match found inside the window ends at or before max_size chars
        let window = &rest[..window_end];
        let cut = ladder
            .iter()
            .find_map(|sep| window.rfind(sep).map(|pos| pos + sep.len()))
            .unwrap_or(window_end);

        push_trimmed(&mut sequence, text, base, base + cut);

        let cut_chars = rest[..cut].chars().count();
        let next = params.next_start(cut_chars);
        base += char_boundary(rest, next).unwrap_or(cut);
    }

    sequence
}

impl Backend for NativeBackend {
    fn mode(&self) -> ImplementationMode {
        ImplementationMode::Accelerated
    }

    fn name(&self) -> &'static str {
        "native"
    }

    fn chunk(&self, text: &str, params: ChunkParams, ladder: &SeparatorLadder) -> ChunkSequence {
        split(text, params, ladder)
    }

    fn similarity(&self, a: &[f64], b: &[f64]) -> Result<f64> {
        check_dimensions(a, b)?;

        let Some((scale_a, scale_b)) = scale_factors(a, b) else {
            return Ok(UNDEFINED_SIMILARITY);
        };

        let mut dot = [0.0f64; 4];
        let mut norm_a = [0.0f64; 4];
        let mut norm_b = [0.0f64; 4];

        let a_lanes = a.chunks_exact(4);
        let b_lanes = b.chunks_exact(4);
        let (a_tail, b_tail) = (a_lanes.remainder(), b_lanes.remainder());

        for (x, y) in a_lanes.zip(b_lanes) {
            for lane in 0..4 {
                let (x, y) = (x[lane] / scale_a, y[lane] / scale_b);
                dot[lane] += x * y;
                norm_a[lane] += x * x;
                norm_b[lane] += y * y;
            }
        }

        let mut dot: f64 = dot.iter().sum();
        let mut norm_a: f64 = norm_a.iter().sum();
        let mut norm_b: f64 = norm_b.iter().sum();

        for (x, y) in a_tail.iter().zip(b_tail) {
            let (x, y) = (x / scale_a, y / scale_b);
            dot += x * y;
            norm_a += x * x;
            norm_b += y * y;
        }

        Ok(weighted_cosine(dot, norm_a, norm_b))
    }
}
