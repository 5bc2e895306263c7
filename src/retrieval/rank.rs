//! Ranking over the dispatcher's similarity.
//!
//! MMR = λ × sim(query, doc) − (1 − λ) × max(sim(doc, selected))
//!
//! λ = 1.0 is pure relevance, λ = 0.0 pure diversity. Scores reported for
//! every result are the query similarity, not the MMR objective.

use serde::Serialize;
use std::cmp::Ordering;

use crate::backend::Dispatcher;
use crate::error::{CoreError, Result};

/// A vector to rank, borrowed from the caller
#[derive(Debug, Clone, Copy)]
pub struct Candidate<'a> {
    pub id: &'a str,
    pub vector: &'a [f64],
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Ranked {
    pub id: String,
    pub score: f64,
}

fn descending(a: f64, b: f64) -> Ordering {
    b.partial_cmp(&a).unwrap_or(Ordering::Equal)
}

fn score_all(
    dispatcher: &Dispatcher,
    query: &[f64],
    candidates: &[Candidate<'_>],
) -> Result<Vec<(usize, f64)>> {
    candidates
        .iter()
        .enumerate()
        .map(|(i, c)| dispatcher.similarity(query, c.vector).map(|s| (i, s)))
        .collect()
}

fn check_k(k: usize) -> Result<()> {
    if k == 0 {
        return Err(CoreError::InvalidParameter(
            "top_k must be greater than 0".to_string(),
        ));
    }
    Ok(())
}

/// Score every candidate against `query` and keep the `k` best.
/// Ties keep input order.
pub fn rank_top_k(
    dispatcher: &Dispatcher,
    query: &[f64],
    candidates: &[Candidate<'_>],
    k: usize,
) -> Result<Vec<Ranked>> {
    check_k(k)?;
    let mut scored = score_all(dispatcher, query, candidates)?;
    scored.sort_by(|a, b| descending(a.1, b.1));
    scored.truncate(k);

    Ok(scored
        .into_iter()
        .map(|(i, score)| Ranked {
            id: candidates[i].id.to_string(),
            score,
        })
        .collect())
}

/// Drop results scoring below `min_score`.
pub fn apply_threshold(results: Vec<Ranked>, min_score: f64) -> Vec<Ranked> {
    results.into_iter().filter(|r| r.score >= min_score).collect()
}

/// Maximal marginal relevance selection.
///
/// Takes the `fetch_k` most similar candidates, then greedily picks `k` of
/// them, each time maximizing the MMR objective against those already picked.
pub fn mmr_select(
    dispatcher: &Dispatcher,
    query: &[f64],
    candidates: &[Candidate<'_>],
    k: usize,
    fetch_k: usize,
    lambda: f64,
) -> Result<Vec<Ranked>> {
    if !(0.0..=1.0).contains(&lambda) {
        return Err(CoreError::InvalidParameter(format!(
            "lambda must be within [0, 1], got {}",
            lambda
        )));
    }
    check_k(k)?;
    if candidates.is_empty() {
        return Ok(Vec::new());
    }

    let mut pool = score_all(dispatcher, query, candidates)?;
    pool.sort_by(|a, b| descending(a.1, b.1));
    pool.truncate(fetch_k.max(k));

    let k = k.min(pool.len());
    let mut selected: Vec<(usize, f64)> = Vec::with_capacity(k);

    while selected.len() < k {
        let mut best: Option<(usize, f64)> = None;

        for (pos, &(idx, relevance)) in pool.iter().enumerate() {
            let mut redundancy = if selected.is_empty() { 0.0 } else { f64::NEG_INFINITY };
            for &(chosen, _) in &selected {
                let sim = dispatcher.similarity(candidates[idx].vector, candidates[chosen].vector)?;
                redundancy = redundancy.max(sim);
            }

            let objective = lambda * relevance - (1.0 - lambda) * redundancy;
            if best.map_or(true, |(_, b)| objective > b) {
                best = Some((pos, objective));
            }
        }

        match best {
            Some((pos, _)) => selected.push(pool.remove(pos)),
            None => break,
        }
    }

    Ok(selected
        .into_iter()
        .map(|(i, score)| Ranked {
            id: candidates[i].id.to_string(),
            score,
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chunker::SeparatorLadder;

    fn dispatcher() -> Dispatcher {
        Dispatcher::reference(SeparatorLadder::default())
    }

    fn ids(results: &[Ranked]) -> Vec<&str> {
        results.iter().map(|r| r.id.as_str()).collect()
    }

    #[test]
    fn test_top_k_orders_by_score() {
        let d = dispatcher();
        let candidates = [
            Candidate { id: "far", vector: &[0.0, 1.0] },
            Candidate { id: "exact", vector: &[1.0, 0.0] },
            Candidate { id: "near", vector: &[1.0, 0.5] },
        ];
        let results = rank_top_k(&d, &[1.0, 0.0], &candidates, 2).unwrap();
        assert_eq!(ids(&results), vec!["exact", "near"]);
        assert!((results[0].score - 1.2).abs() < 1e-12);
    }

    #[test]
    fn test_top_k_ties_keep_input_order() {
        let d = dispatcher();
        let candidates = [
            Candidate { id: "a", vector: &[2.0, 0.0] },
            Candidate { id: "b", vector: &[1.0, 0.0] },
        ];
        let results = rank_top_k(&d, &[1.0, 0.0], &candidates, 5).unwrap();
        assert_eq!(ids(&results), vec!["a", "b"]);
    }

    #[test]
    fn test_top_k_propagates_length_mismatch() {
        let d = dispatcher();
        let candidates = [Candidate { id: "bad", vector: &[1.0] }];
        assert_eq!(
            rank_top_k(&d, &[1.0, 0.0], &candidates, 1).unwrap_err(),
            CoreError::LengthMismatch { left: 2, right: 1 }
        );
    }

    #[test]
    fn test_top_k_rejects_zero() {
        let d = dispatcher();
        let candidates = [Candidate { id: "a", vector: &[1.0, 0.0] }];
        assert!(matches!(
            rank_top_k(&d, &[1.0, 0.0], &candidates, 0),
            Err(CoreError::InvalidParameter(_))
        ));
        assert!(rank_top_k(&d, &[1.0, 0.0], &[], 3).unwrap().is_empty());
    }

    #[test]
    fn test_threshold() {
        let results = vec![
            Ranked { id: "a".into(), score: 0.9 },
            Ranked { id: "b".into(), score: 0.2 },
        ];
        assert_eq!(ids(&apply_threshold(results, 0.5)), vec!["a"]);
    }

    #[test]
    fn test_mmr_prefers_diverse_results() {
        let d = dispatcher();
        let candidates = [
            Candidate { id: "a", vector: &[1.0, 0.1] },
            Candidate { id: "a_dup", vector: &[1.0, 0.11] },
            Candidate { id: "b", vector: &[0.6, -0.8] },
        ];
        let plain = rank_top_k(&d, &[1.0, 0.0], &candidates, 2).unwrap();
        assert_eq!(ids(&plain), vec!["a", "a_dup"]);

        let diverse = mmr_select(&d, &[1.0, 0.0], &candidates, 2, 10, 0.5).unwrap();
        assert_eq!(ids(&diverse), vec!["a", "b"]);
    }

    #[test]
    fn test_mmr_lambda_one_is_top_k() {
        let d = dispatcher();
        let candidates = [
            Candidate { id: "x", vector: &[0.2, 1.0] },
            Candidate { id: "y", vector: &[1.0, 0.1] },
            Candidate { id: "z", vector: &[1.0, 0.11] },
        ];
        let mmr = mmr_select(&d, &[1.0, 0.0], &candidates, 3, 3, 1.0).unwrap();
        let top = rank_top_k(&d, &[1.0, 0.0], &candidates, 3).unwrap();
        assert_eq!(mmr, top);
    }

    #[test]
    fn test_mmr_fetch_k_limits_pool() {
        let d = dispatcher();
        let candidates = [
            Candidate { id: "best", vector: &[1.0, 0.0] },
            Candidate { id: "second", vector: &[1.0, 0.2] },
            Candidate { id: "worst", vector: &[0.0, 1.0] },
        ];
        let results = mmr_select(&d, &[1.0, 0.0], &candidates, 2, 2, 0.0).unwrap();
        assert!(!ids(&results).contains(&"worst"));
    }

    #[test]
    fn test_mmr_edge_cases() {
        let d = dispatcher();
        let candidates = [Candidate { id: "only", vector: &[1.0, 0.0] }];
        assert!(matches!(
            mmr_select(&d, &[1.0, 0.0], &candidates, 0, 10, 0.5),
            Err(CoreError::InvalidParameter(_))
        ));
        assert!(mmr_select(&d, &[1.0, 0.0], &[], 3, 10, 0.5).unwrap().is_empty());
        assert_eq!(mmr_select(&d, &[1.0, 0.0], &candidates, 3, 10, 0.5).unwrap().len(), 1);
        assert!(matches!(
            mmr_select(&d, &[1.0, 0.0], &candidates, 1, 10, 1.5),
            Err(CoreError::InvalidParameter(_))
        ));
    }
}
