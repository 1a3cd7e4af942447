//! Score-weighted reciprocal rank fusion and exploration injection.
//!
//! Each signal contributes `weight * raw_score / (k + rank + 1)` for every
//! candidate it ranked (zero-based ranks). Candidates merge by title and
//! keep their per-signal raw scores for debugging; ties break by insertion
//! order. After trimming, the bottom of the list is replaced with random
//! unseen notes so popularity bias cannot starve the tail of the corpus.

use rand::seq::SliceRandom;
use rand::Rng;
use serde::Serialize;
use std::collections::HashMap;

use super::{ScoredCandidate, Signal};

/// One signal's ranked output plus its fusion weight.
pub struct SignalList {
    pub signal: Signal,
    pub weight: f64,
    pub hits: Vec<ScoredCandidate>,
}

/// A fused candidate. `signal_scores` holds the raw per-signal scores the
/// fused score was derived from.
#[derive(Debug, Clone, Serialize)]
pub struct FusedHit {
    pub title: String,
    pub score: f64,
    pub signal_scores: HashMap<Signal, f64>,
    /// Set on entries injected by exploration, which carry score 0.
    pub exploration: bool,
}

/// Merge ranked signal lists with score-weighted RRF.
pub fn fuse(lists: &[SignalList], k: usize) -> Vec<FusedHit> {
    let mut order: Vec<FusedHit> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();

    for list in lists {
        for (rank, candidate) in list.hits.iter().enumerate() {
            let contribution =
                list.weight * candidate.score / (k as f64 + rank as f64 + 1.0);

            let at = *index.entry(candidate.title.clone()).or_insert_with(|| {
                order.push(FusedHit {
                    title: candidate.title.clone(),
                    score: 0.0,
                    signal_scores: HashMap::new(),
                    exploration: false,
                });
                order.len() - 1
            });
            order[at].score += contribution;
            order[at].signal_scores.insert(list.signal, candidate.score);
        }
    }

    // Stable sort keeps insertion order on ties
    order.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    order
}

/// Replace the bottom `floor(limit * budget)` positions (at least one when
/// the budget is positive) with uniformly random titles not already
/// present. Injected entries carry score 0 and the exploration flag. When
/// there are fewer unseen titles than slots, the shortfall keeps the
/// original tail entries instead of duplicating picks.
pub fn inject_exploration(
    hits: &mut Vec<FusedHit>,
    all_titles: &[String],
    budget: f64,
    limit: usize,
    rng: &mut impl Rng,
) {
    if budget <= 0.0 || limit == 0 || hits.is_empty() {
        return;
    }
    let slots = ((limit as f64 * budget).floor() as usize).max(1).min(hits.len());

    let seen: std::collections::HashSet<&str> =
        hits.iter().map(|h| h.title.as_str()).collect();
    let mut unseen: Vec<&String> = all_titles
        .iter()
        .filter(|t| !seen.contains(t.as_str()))
        .collect();
    unseen.shuffle(rng);

    let replacements = slots.min(unseen.len());
    let start = hits.len() - replacements;
    for (offset, title) in unseen.into_iter().take(replacements).enumerate() {
        hits[start + offset] = FusedHit {
            title: title.clone(),
            score: 0.0,
            signal_scores: HashMap::new(),
            exploration: true,
        };
    }
}
