use serde::Serialize;
use std::cmp::Ordering;
use thiserror::Error;

/// Errors reported by [`rank`]
#[derive(Debug, Error, PartialEq)]
pub enum RankError {
    #[error("dimension mismatch at candidate {index}: expected {expected}, got {actual}")]
    DimensionMismatch {
        index: usize,
        expected: usize,
        actual: usize,
    },

    #[error("invalid argument: {0}")]
    InvalidArgument(String),
}

/// A record paired with its cosine similarity to the query
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Ranked<R> {
    #[serde(flatten)]
    pub record: R,
    pub similarity: f64,
}

/// Ranks candidates by cosine similarity to `query`, highest first.
///
/// Candidates with equal scores keep their input order. Returns at most
/// `top_k` entries; every candidate vector must match the query's length.
pub fn rank<R: Clone>(
    query: &[f32],
    candidates: &[(R, Vec<f32>)],
    top_k: usize,
) -> Result<Vec<Ranked<R>>, RankError> {
    if top_k < 1 {
        return Err(RankError::InvalidArgument("top_k must be at least 1".into()));
    }
    if query.is_empty() {
        return Err(RankError::InvalidArgument("query vector is empty".into()));
    }
    if candidates.is_empty() {
        return Err(RankError::InvalidArgument("no candidates to rank".into()));
    }

    // Validate everything up front so a bad row fails the whole call
    for (index, (_, vector)) in candidates.iter().enumerate() {
        if vector.len() != query.len() {
            return Err(RankError::DimensionMismatch {
                index,
                expected: query.len(),
                actual: vector.len(),
            });
        }
    }

    let query_norm = norm(query);
    let mut scored: Vec<(usize, f64)> = candidates
        .iter()
        .enumerate()
        .map(|(i, (_, vector))| (i, cosine_with_norm(query, query_norm, vector)))
        .collect();

    // Scores are always finite, so partial_cmp is total here.
    // sort_by is stable: equal scores stay in input order.
    scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(Ordering::Equal));
    scored.truncate(top_k);

    Ok(scored
        .into_iter()
        .map(|(i, similarity)| Ranked {
            record: candidates[i].0.clone(),
            similarity,
        })
        .collect())
}

/// Computes cosine similarity between two vectors of equal length.
/// Zero-norm inputs yield 0.0.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f64 {
    cosine_with_norm(a, norm(a), b)
}

fn cosine_with_norm(a: &[f32], norm_a: f64, b: &[f32]) -> f64 {
    let mut dot = 0.0f64;
    let mut norm_b = 0.0f64;
    for (x, y) in a.iter().zip(b.iter()) {
        let x = *x as f64;
        let y = *y as f64;
        dot += x * y;
        norm_b += y * y;
    }
    let denom = norm_a * norm_b.sqrt();
    if denom == 0.0 {
        return 0.0;
    }
    let sim = dot / denom;
    if sim.is_finite() {
        sim.clamp(-1.0, 1.0)
    } else {
        0.0
    }
}

fn norm(v: &[f32]) -> f64 {
    v.iter()
        .map(|x| {
            let x = *x as f64;
            x * x
        })
        .sum::<f64>()
        .sqrt()
}
