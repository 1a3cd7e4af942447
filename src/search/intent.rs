//! Query intent classification and ranking weight profiles.
//!
//! A fixed ordered rule table of case-insensitive patterns maps the query
//! to one of four intents; the intent with the most matches wins and ties
//! default to semantic. The classifier also extracts entity seeds by
//! substring-matching known titles, preferring longer matches.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;

/// Query intent — selects the space and split weight profiles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Intent {
    Semantic,
    Episodic,
    Procedural,
    Decision,
}

impl Intent {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Semantic => "semantic",
            Self::Episodic => "episodic",
            Self::Procedural => "procedural",
            Self::Decision => "decision",
        }
    }
}

impl std::fmt::Display for Intent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Classification outcome: the winning intent, a reported (but unused
/// downstream) confidence, and entity seeds found in the query.
#[derive(Debug, Clone, Serialize)]
pub struct QueryIntent {
    pub intent: Intent,
    pub confidence: f64,
    /// Known titles mentioned by the query, longest matches first claimed.
    pub entities: Vec<String>,
}

/// Weights over the six similarity spaces. Each profile sums to 1.
#[derive(Debug, Clone, Copy)]
pub struct SpaceWeights {
    pub text: f64,
    pub temporal: f64,
    pub vitality: f64,
    pub importance: f64,
    pub note_type: f64,
    pub community: f64,
}

/// Weights over the three text splits. Each profile sums to 1.
#[derive(Debug, Clone, Copy)]
pub struct SplitWeights {
    pub title: f64,
    pub description: f64,
    pub body: f64,
}

/// Classify a query and extract entity seeds from the known title set.
pub fn classify(query: &str, known_titles: &[String]) -> QueryIntent {
    let counts: Vec<(Intent, usize)> = rule_table()
        .iter()
        .map(|(intent, patterns)| {
            (*intent, patterns.iter().filter(|p| p.is_match(query)).count())
        })
        .collect();

    let best_count = counts.iter().map(|&(_, c)| c).max().unwrap_or(0);
    // Ties go to semantic; otherwise first in table order wins
    let best = if best_count == 0
        || counts
            .iter()
            .any(|&(i, c)| i == Intent::Semantic && c == best_count)
    {
        Intent::Semantic
    } else {
        counts
            .iter()
            .find(|&&(_, c)| c == best_count)
            .map(|&(i, _)| i)
            .unwrap_or(Intent::Semantic)
    };

    let confidence = match best_count {
        0 => 0.5,
        1 => 0.7,
        _ => 1.0,
    };

    QueryIntent {
        intent: best,
        confidence,
        entities: extract_entities(query, known_titles),
    }
}

/// The fixed ordered rule table. Compiled once per process.
fn rule_table() -> &'static [(Intent, Vec<Regex>)] {
    static TABLE: OnceLock<Vec<(Intent, Vec<Regex>)>> = OnceLock::new();
    TABLE.get_or_init(|| {
        let compile = |patterns: &[&str]| -> Vec<Regex> {
            patterns
                .iter()
                .map(|p| Regex::new(&format!("(?i){p}")).expect("intent pattern is valid"))
                .collect()
        };
        vec![
            (
                Intent::Episodic,
                compile(&[
                    r"\bwhen did\b",
                    r"\byesterday\b",
                    r"\blast (week|month|time)\b",
                    r"\brecently\b",
                    r"\bwhat happened\b",
                    r"\bago\b",
                    r"\bdid we\b",
                ]),
            ),
            (
                Intent::Procedural,
                compile(&[
                    r"\bhow (do|to|can)\b",
                    r"\bsteps?\b",
                    r"\bguide\b",
                    r"\brunbook\b",
                    r"\bdeploy\b",
                    r"\binstall\b",
                    r"\bconfigure\b",
                    r"\bset ?up\b",
                    r"\bworkflow\b",
                    r"\bprocess\b",
                ]),
            ),
            (
                Intent::Decision,
                compile(&[
                    r"\bwhy (did|do|was)\b",
                    r"\bdecided?\b",
                    r"\bdecision\b",
                    r"\bch(ose|oose|osen)\b",
                    r"\brationale\b",
                    r"\btrade-?off\b",
                    r"\boption\b",
                    r"\binstead of\b",
                ]),
            ),
            (
                Intent::Semantic,
                compile(&[
                    r"\bwhat (is|are)\b",
                    r"\bdefine\b",
                    r"\bexplain\b",
                    r"\bmeaning\b",
                    r"\boverview\b",
                    r"\brelated to\b",
                    r"\babout\b",
                ]),
            ),
        ]
    })
}

/// Substring-match known titles against the lowercased query, longer
/// titles claiming their span first.
fn extract_entities(query: &str, known_titles: &[String]) -> Vec<String> {
    let query_lower = query.to_lowercase();
    let mut ordered: Vec<&String> = known_titles.iter().collect();
    ordered.sort_by(|a, b| b.len().cmp(&a.len()).then(a.cmp(b)));

    let mut claimed: Vec<(usize, usize)> = Vec::new();
    let mut entities = Vec::new();

    for title in ordered {
        let needle = title.to_lowercase();
        if needle.is_empty() {
            continue;
        }
        if let Some(at) = query_lower.find(&needle) {
            let span = (at, at + needle.len());
            if claimed.iter().any(|&(s, e)| span.0 < e && s < span.1) {
                continue;
            }
            claimed.push(span);
            entities.push(title.clone());
        }
    }

    entities
}

/// Space weight profile per intent.
pub fn space_weights(intent: Intent) -> SpaceWeights {
    match intent {
        Intent::Episodic => SpaceWeights {
            text: 0.40,
            temporal: 0.25,
            vitality: 0.15,
            importance: 0.05,
            note_type: 0.05,
            community: 0.10,
        },
        Intent::Procedural => SpaceWeights {
            text: 0.30,
            temporal: 0.05,
            vitality: 0.10,
            importance: 0.30,
            note_type: 0.10,
            community: 0.15,
        },
        Intent::Semantic => SpaceWeights {
            text: 0.65,
            temporal: 0.05,
            vitality: 0.10,
            importance: 0.10,
            note_type: 0.05,
            community: 0.05,
        },
        Intent::Decision => SpaceWeights {
            text: 0.30,
            temporal: 0.15,
            vitality: 0.10,
            importance: 0.10,
            note_type: 0.30,
            community: 0.05,
        },
    }
}

/// Title/description/body split profile per intent.
pub fn split_weights(intent: Intent) -> SplitWeights {
    match intent {
        Intent::Semantic => SplitWeights {
            title: 0.50,
            description: 0.30,
            body: 0.20,
        },
        Intent::Episodic => SplitWeights {
            title: 0.20,
            description: 0.20,
            body: 0.60,
        },
        Intent::Decision => SplitWeights {
            title: 0.40,
            description: 0.40,
            body: 0.20,
        },
        Intent::Procedural => SplitWeights {
            title: 0.30,
            description: 0.30,
            body: 0.40,
        },
    }
}

/// Query-implied target over the six type slots (idea, decision, learning,
/// insight, blocker, opportunity).
pub fn type_target(intent: Intent) -> Vec<f32> {
    match intent {
        Intent::Decision => vec![0.0, 1.0, 0.0, 0.0, 0.0, 0.0],
        Intent::Procedural => vec![0.0, 0.0, 1.0, 1.0, 0.0, 0.0],
        Intent::Episodic => vec![1.0, 0.0, 1.0, 1.0, 0.0, 0.0],
        // body-heavy semantic bias: idea dominates, learning and insight
        // contribute
        Intent::Semantic => vec![1.0, 0.0, 0.5, 0.5, 0.0, 0.0],
    }
}

/// Target authority level for the importance space.
pub fn importance_target(intent: Intent) -> f64 {
    match intent {
        Intent::Procedural | Intent::Decision => 0.8,
        _ => 0.5,
    }
}
