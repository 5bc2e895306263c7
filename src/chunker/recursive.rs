//! Reference recursive splitter.
//!
//! Works on a decoded `Vec<char>` so every position is a code point. Each
//! recursion level is a pure [`cut_step`]; [`split`] folds the steps into a
//! sequence iteratively so long separator-free input cannot exhaust the stack.

use super::{ChunkParams, ChunkSequence, SeparatorLadder};

/// Outcome of one recursion level, in chars relative to the remaining text
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cut {
    /// End of the piece to emit (before trimming)
    pub end: usize,
    /// Start of the remainder, `None` when this was the final piece
    pub next: Option<usize>,
}

/// Decide where the head of `rest` ends and where the remainder begins.
pub fn cut_step(rest: &[char], params: ChunkParams, separators: &[Vec<char>]) -> Cut {
    let max_size = params.max_size();
    if rest.len() <= max_size {
        return Cut {
            end: rest.len(),
            next: None,
        };
    }

    let end = find_cut(rest, max_size, separators).unwrap_or(max_size);
    Cut {
        end,
        next: Some(params.next_start(end)),
    }
}

/// Scan each ladder tier backward from `max_size - len(sep)`; the cut sits
/// right after the first match of the highest tier that has one.
fn find_cut(rest: &[char], max_size: usize, separators: &[Vec<char>]) -> Option<usize> {
    separators.iter().find_map(|sep| {
        let last = max_size.checked_sub(sep.len())?;
        (0..=last)
            .rev()
            .find(|&pos| rest[pos..pos + sep.len()] == sep[..])
            .map(|pos| pos + sep.len())
    })
}

/// Trimmed bounds of `chars[start..end]`, or `None` if it is all whitespace
fn trim_bounds(chars: &[char], start: usize, end: usize) -> Option<(usize, usize)> {
    let first = (start..end).find(|&i| !chars[i].is_whitespace())?;
    let last = (first..end).rev().find(|&i| !chars[i].is_whitespace())?;
    Some((first, last + 1))
}

/// Split `text` into chunks of at most `params.max_size()` chars.
pub fn split(text: &str, params: ChunkParams, ladder: &SeparatorLadder) -> ChunkSequence {
    let chars: Vec<char> = text.chars().collect();
    let byte_offsets: Vec<usize> = text
        .char_indices()
        .map(|(i, _)| i)
        .chain(std::iter::once(text.len()))
        .collect();
    let separators = ladder.to_char_vecs();

    let mut sequence = ChunkSequence::default();
    let mut start = 0usize;

    loop {
        let cut = cut_step(&chars[start..], params, &separators);

        if let Some((first, last)) = trim_bounds(&chars, start, start + cut.end) {
            let (from, to) = (byte_offsets[first], byte_offsets[last]);
            sequence.push(text[from..to].to_string(), from, to);
        }

        match cut.next {
            Some(next) => {
                debug_assert!(next > 0, "chunker must advance");
                start += next;
            }
            None => break,
        }
    }

    sequence
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(max_size: usize, overlap: usize) -> ChunkParams {
        ChunkParams::new(max_size, overlap).unwrap()
    }

    fn chars(s: &str) -> Vec<char> {
        s.chars().collect()
    }

    #[test]
    fn test_empty_text() {
        let chunks = split("", params(10, 2), &SeparatorLadder::default());
        assert!(chunks.is_empty());
    }

    #[test]
    fn test_whitespace_only_text() {
        let chunks = split(" \n\n\t  ", params(3, 1), &SeparatorLadder::default());
        assert!(chunks.is_empty());
    }

    #[test]
    fn test_short_text_single_trimmed_chunk() {
        let chunks = split("  Short text.\n", params(500, 50), &SeparatorLadder::default());
        assert_eq!(chunks.texts(), vec!["Short text."]);
        assert_eq!(chunks[0].start_pos, 2);
        assert_eq!(chunks[0].end_pos, 13);
    }

    #[test]
    fn test_terminal_step_has_no_next() {
        let step = cut_step(&chars("abc"), params(3, 1), &[]);
        assert_eq!(step, Cut { end: 3, next: None });
    }

    #[test]
    fn test_step_prefers_higher_tier() {
        // "\n" appears later in the window but "\n\n" ranks higher
        let rest = chars("ab\n\ncd\nefghij");
        let seps = vec![chars("\n\n"), chars("\n")];
        let step = cut_step(&rest, params(10, 0), &seps);
        assert_eq!(step.end, 4);
    }

    #[test]
    fn test_step_takes_last_match_in_tier() {
        let rest = chars("a.b.c.defghijkl");
        let step = cut_step(&rest, params(8, 0), &[chars(".")]);
        assert_eq!(step.end, 6);
        assert_eq!(step.next, Some(6));
    }

    #[test]
    fn test_separator_must_fit_in_window() {
        // "\n\n" starts at 4 and would end at 6, past max_size 5
        let rest = chars("abcd\n\nefgh");
        let step = cut_step(&rest, params(5, 0), &[chars("\n\n")]);
        assert_eq!(step.end, 5);
    }

    #[test]
    fn test_separator_longer_than_window_is_skipped() {
        let rest = chars("\n\nabc");
        let step = cut_step(&rest, params(1, 0), &[chars("\n\n")]);
        assert_eq!(step.end, 1);
    }

    #[test]
    fn test_hard_cut_without_separators() {
        let text = "x".repeat(25);
        let chunks = split(&text, params(10, 0), &SeparatorLadder::default());
        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks[0].content, "x".repeat(10));
        assert_eq!(chunks[2].content, "x".repeat(5));
    }

    #[test]
    fn test_hard_cut_with_overlap() {
        let text = "abcdefghijklmnop";
        let chunks = split(text, params(6, 2), &SeparatorLadder::default());
        assert_eq!(chunks.texts(), vec!["abcdef", "efghij", "ijklmn", "mnop"]);
    }

    #[test]
    fn test_separator_at_start_cannot_stall() {
        // Every window's only separator is at position 0, inside the overlap
        let text = "\nabcdefgh\nijklmnop\nqrstuvwx";
        let chunks = split(text, params(6, 4), &SeparatorLadder::default());
        assert!(!chunks.is_empty());
        for chunk in &chunks {
            assert!(chunk.char_len() <= 6);
        }
    }

    #[test]
    fn test_paragraph_break_scenario() {
        let text = "Paragraph one text here.\n\nParagraph two is short.";
        let ladder = SeparatorLadder::new(["\n\n", "\n", ". "]).unwrap();
        let chunks = split(text, params(20, 5), &ladder);

        assert_eq!(
            chunks.texts(),
            vec![
                "Paragraph one text h",
                "ext here.",
                "re.",
                "Paragraph two is sho",
                "s short.",
            ]
        );
        for chunk in &chunks {
            assert!(chunk.char_len() <= 20);
            assert!(!chunk.content.contains("\n\n"));
        }
    }

    #[test]
    fn test_cjk_ladder() {
        let text = "第一句话。第二句话，还有更多内容。第三句";
        let chunks = split(text, params(8, 0), &SeparatorLadder::default());
        assert_eq!(chunks.texts(), vec!["第一句话。", "第二句话，", "还有更多内容。", "第三句"]);
    }

    #[test]
    fn test_multibyte_offsets_are_char_boundaries() {
        let text = "héllo wörld 🎉 ünïcode téxt ñ";
        let chunks = split(text, params(4, 1), &SeparatorLadder::default());
        for chunk in &chunks {
            assert!(text.is_char_boundary(chunk.start_pos));
            assert!(text.is_char_boundary(chunk.end_pos));
            assert_eq!(&text[chunk.start_pos..chunk.end_pos], chunk.content);
            assert!(chunk.char_len() <= 4);
        }
    }

    #[test]
    fn test_every_non_whitespace_char_is_covered() {
        let text = "Alpha beta.\n\nGamma delta epsilon, zeta.\nEta theta iota kappa lambda mu nu xi omicron.\n\n\nPi rho";
        for (max_size, overlap) in [(7, 0), (12, 3), (25, 10), (5, 4)] {
            let chunks = split(text, params(max_size, overlap), &SeparatorLadder::default());
            for (i, c) in text.char_indices() {
                if c.is_whitespace() {
                    continue;
                }
                assert!(
                    chunks.iter().any(|ch| ch.start_pos <= i && i < ch.end_pos),
                    "char {:?} at {} not covered with ({}, {})",
                    c, i, max_size, overlap
                );
            }
        }
    }

    #[test]
    fn test_rechunking_short_chunk_is_identity() {
        let text = "One.\nTwo two.\nThree three three.\nFour.";
        let p = params(15, 4);
        let ladder = SeparatorLadder::default();
        for chunk in split(text, p, &ladder) {
            let again = split(&chunk.content, p, &ladder);
            assert_eq!(again.texts(), vec![chunk.content.as_str()]);
        }
    }
}
