//! Six-space composite scoring of embedding records against a query.
//!
//! Every note gets a weighted similarity across the text, temporal,
//! vitality, importance, type, and community spaces. Scalar signals go
//! through the piecewise-linear encoding so cosine against an encoded
//! target is monotone in the underlying value. Per-space scores ride along
//! on the output for observability.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashMap;

use crate::index::encode::{cosine, piecewise_encode};
use crate::index::store::EmbeddingRecord;

use super::intent::{importance_target, space_weights, split_weights, type_target, Intent};

/// Recency half-life input: `recency = exp(-days_since_index / 30)`.
const RECENCY_SCALE_DAYS: f64 = 30.0;

/// Placeholder similarity for notes that carry a community projection.
/// A query-side community inference could replace this.
const COMMUNITY_PLACEHOLDER: f64 = 0.5;

/// Non-text signals for one note, computed by the caller from the graph
/// snapshot.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoteSignals {
    /// Vitality in [0, 1].
    pub vitality: f64,
    /// Authority normalized by the corpus maximum, in [0, 1].
    pub importance: f64,
}

/// Per-space similarity breakdown.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct SpaceScores {
    pub text: f64,
    pub temporal: f64,
    pub vitality: f64,
    pub importance: f64,
    #[serde(rename = "type")]
    pub note_type: f64,
    pub community: f64,
}

/// One composite-ranked candidate.
#[derive(Debug, Clone, Serialize)]
pub struct CompositeHit {
    pub title: String,
    pub score: f64,
    pub spaces: SpaceScores,
}

/// Score every record against the query, best first, truncated to `limit`.
pub fn score_composite(
    query_vec: &[f32],
    records: &[EmbeddingRecord],
    signals: &HashMap<String, NoteSignals>,
    intent: Intent,
    bins: usize,
    now: DateTime<Utc>,
    limit: usize,
) -> Vec<CompositeHit> {
    let sw = space_weights(intent);
    let splits = split_weights(intent);
    let target_type = type_target(intent);
    let target_full = piecewise_encode(1.0, bins);
    let target_importance = piecewise_encode(importance_target(intent), bins);

    let mut hits: Vec<CompositeHit> = records
        .iter()
        .map(|record| {
            let note_signals = signals.get(&record.title).copied().unwrap_or_default();

            let text = splits.title * cosine(query_vec, &record.title_vec)
                + splits.description * cosine(query_vec, &record.desc_vec)
                + splits.body * cosine(query_vec, &record.body_vec);

            let note_type = cosine(&target_type, &record.type_vec);

            let community = if record.community_vec.iter().any(|&x| x != 0.0) {
                COMMUNITY_PLACEHOLDER
            } else {
                0.0
            };

            let recency = (-days_since(&record.indexed_at, now) / RECENCY_SCALE_DAYS).exp();
            let temporal = cosine(&piecewise_encode(recency, bins), &target_full);

            let vitality = cosine(&piecewise_encode(note_signals.vitality, bins), &target_full);

            let importance = cosine(
                &piecewise_encode(note_signals.importance, bins),
                &target_importance,
            );

            let spaces = SpaceScores {
                text,
                temporal,
                vitality,
                importance,
                note_type,
                community,
            };
            let score = sw.text * text
                + sw.temporal * temporal
                + sw.vitality * vitality
                + sw.importance * importance
                + sw.note_type * note_type
                + sw.community * community;

            CompositeHit {
                title: record.title.clone(),
                score,
                spaces,
            }
        })
        .collect();

    hits.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.title.cmp(&b.title))
    });
    hits.truncate(limit);
    hits
}

/// Whole days between the record's indexing timestamp and `now`, never
/// negative. Unparseable timestamps count as fresh.
fn days_since(indexed_at: &str, now: DateTime<Utc>) -> f64 {
    DateTime::parse_from_rfc3339(indexed_at)
        .map(|t| (now - t.with_timezone(&Utc)).num_days().max(0) as f64)
        .unwrap_or(0.0)
}
