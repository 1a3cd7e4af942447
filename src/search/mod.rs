//! Retrieval pipeline — intent, signals, fusion, and the access ledger.
//!
//! Three candidate producers feed one fusion step: the six-space composite
//! scorer ([`composite`]), the field-weighted BM25 index ([`bm25`]), and
//! the personalized graph walk. [`fusion`] merges them with score-weighted
//! reciprocal rank fusion, injects exploration, and [`propensity`] records
//! what was served.

pub mod bm25;
pub mod composite;
pub mod fusion;
pub mod intent;
pub mod propensity;

use serde::Serialize;

/// The three candidate-producing signals. A closed set — fusion consumes
/// exactly these, no open extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Signal {
    Composite,
    Keyword,
    Graph,
}

impl Signal {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Composite => "composite",
            Self::Keyword => "keyword",
            Self::Graph => "graph",
        }
    }
}

impl std::fmt::Display for Signal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One ranked candidate from a single signal.
#[derive(Debug, Clone, Serialize)]
pub struct ScoredCandidate {
    pub title: String,
    pub score: f64,
}

impl ScoredCandidate {
    pub fn new(title: impl Into<String>, score: f64) -> Self {
        Self {
            title: title.into(),
            score,
        }
    }
}
