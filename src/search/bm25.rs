//! Field-weighted Okapi BM25 over the note corpus.
//!
//! Each document is a weighted bag of tokens: title tokens count
//! `title_boost` times, description tokens `description_boost` times, body
//! tokens once. Document length is the weighted token count. Scoring is
//! standard Okapi with `idf = ln((N - n + 0.5) / (n + 0.5) + 1)`.

use std::collections::HashMap;

use crate::config::Bm25Config;
use crate::vault::note::Note;

use super::ScoredCandidate;

/// Minimum token length kept by the tokenizer.
const MIN_TOKEN_LEN: usize = 2;

/// Fixed English stopword list.
const STOPWORDS: &[&str] = &[
    "a", "an", "and", "are", "as", "at", "be", "but", "by", "do", "for", "from", "had", "has",
    "have", "he", "her", "his", "how", "i", "if", "in", "is", "it", "its", "my", "no", "not",
    "of", "on", "or", "our", "she", "so", "that", "the", "their", "them", "they", "this", "to",
    "was", "we", "were", "what", "when", "where", "which", "who", "why", "will", "with", "you",
    "your",
];

/// Inverted index: term -> (doc -> weighted frequency), plus per-doc
/// weighted lengths.
pub struct Bm25Index {
    postings: HashMap<String, HashMap<usize, f64>>,
    doc_len: Vec<f64>,
    avg_len: f64,
    titles: Vec<String>,
    k1: f64,
    b: f64,
}

impl Bm25Index {
    pub fn build(notes: &[Note], config: &Bm25Config) -> Self {
        let mut postings: HashMap<String, HashMap<usize, f64>> = HashMap::new();
        let mut doc_len = vec![0.0; notes.len()];

        for (doc, note) in notes.iter().enumerate() {
            let fields: [(&str, f64); 3] = [
                (&note.title, config.title_boost),
                (note.description.as_deref().unwrap_or(""), config.description_boost),
                (&note.body, 1.0),
            ];
            for (text, weight) in fields {
                for token in tokenize(text) {
                    *postings.entry(token).or_default().entry(doc).or_insert(0.0) += weight;
                    doc_len[doc] += weight;
                }
            }
        }

        let avg_len = if notes.is_empty() {
            0.0
        } else {
            doc_len.iter().sum::<f64>() / notes.len() as f64
        };

        Self {
            postings,
            doc_len,
            avg_len,
            titles: notes.iter().map(|n| n.title.clone()).collect(),
            k1: config.k1,
            b: config.b,
        }
    }

    /// Score the query against every matching document, best first.
    pub fn search(&self, query: &str, limit: usize) -> Vec<ScoredCandidate> {
        let n_docs = self.titles.len();
        if n_docs == 0 || self.avg_len == 0.0 {
            return Vec::new();
        }

        let mut scores: HashMap<usize, f64> = HashMap::new();
        for term in tokenize(query) {
            let Some(posting) = self.postings.get(&term) else {
                continue;
            };
            let df = posting.len() as f64;
            let idf = ((n_docs as f64 - df + 0.5) / (df + 0.5) + 1.0).ln();

            for (&doc, &tf) in posting {
                let norm = tf * (self.k1 + 1.0)
                    / (tf
                        + self.k1
                            * (1.0 - self.b + self.b * self.doc_len[doc] / self.avg_len));
                *scores.entry(doc).or_insert(0.0) += idf * norm;
            }
        }

        let mut ranked: Vec<(usize, f64)> = scores.into_iter().collect();
        ranked.sort_by(|a, b| {
            b.1.partial_cmp(&a.1)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.0.cmp(&b.0))
        });
        ranked.truncate(limit);

        ranked
            .into_iter()
            .map(|(doc, score)| ScoredCandidate::new(self.titles[doc].clone(), score))
            .collect()
    }
}

/// Lowercase, split on non-alphanumerics, drop short tokens and stopwords.
fn tokenize(text: &str) -> Vec<String> {
    text.to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|t| t.len() >= MIN_TOKEN_LEN)
        .filter(|t| !STOPWORDS.contains(t))
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn note(title: &str, body: &str) -> Note {
        let today = NaiveDate::from_ymd_opt(2026, 8, 1).unwrap();
        Note::body_only(title, body, today)
    }

    fn note_with_desc(title: &str, desc: &str, body: &str) -> Note {
        let mut n = note(title, body);
        n.description = Some(desc.to_string());
        n
    }

    fn index(notes: &[Note]) -> Bm25Index {
        Bm25Index::build(notes, &Bm25Config::default())
    }

    #[test]
    fn tokenize_drops_stopwords_and_short_tokens() {
        assert_eq!(
            tokenize("How do I deploy the broker?"),
            vec!["deploy", "broker"]
        );
        assert_eq!(tokenize("a an I x"), Vec::<String>::new());
    }

    #[test]
    fn matching_document_scores_positive() {
        let idx = index(&[
            note("broker runbook", "deploy steps for the broker"),
            note("garden plan", "tomatoes and peppers"),
        ]);
        let hits = idx.search("deploy broker", 10);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].title, "broker runbook");
        assert!(hits[0].score > 0.0);
    }

    #[test]
    fn title_match_beats_body_match() {
        let idx = index(&[
            note("deploy", "unrelated text here"),
            note("unrelated title", "some deploy text inside body"),
        ]);
        let hits = idx.search("deploy", 10);
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].title, "deploy");
        assert!(hits[0].score > hits[1].score);
    }

    #[test]
    fn description_boost_outranks_body() {
        let idx = index(&[
            note_with_desc("first", "covers deploy topics", "filler filler filler"),
            note("second", "deploy appears in body filler filler"),
        ]);
        let hits = idx.search("deploy", 10);
        assert_eq!(hits[0].title, "first");
    }

    #[test]
    fn raising_title_boost_never_hurts_matching_doc() {
        let notes = vec![
            note("deploy notes", "short body"),
            note("other", "completely different content"),
        ];
        let low = Bm25Index::build(
            &notes,
            &Bm25Config {
                title_boost: 1.0,
                ..Bm25Config::default()
            },
        );
        let high = Bm25Index::build(
            &notes,
            &Bm25Config {
                title_boost: 5.0,
                ..Bm25Config::default()
            },
        );

        let low_hits = low.search("deploy", 10);
        let high_hits = high.search("deploy", 10);
        assert_eq!(low_hits[0].title, "deploy notes");
        assert_eq!(high_hits[0].title, "deploy notes");
        assert!(high_hits[0].score >= low_hits[0].score * 0.99);
    }

    #[test]
    fn empty_query_returns_nothing() {
        let idx = index(&[note("a", "body")]);
        assert!(idx.search("", 10).is_empty());
        assert!(idx.search("the and of", 10).is_empty());
    }

    #[test]
    fn empty_corpus_returns_nothing() {
        let idx = index(&[]);
        assert!(idx.search("anything", 10).is_empty());
    }

    #[test]
    fn limit_truncates_results() {
        let notes: Vec<Note> = (0..5)
            .map(|i| note(&format!("doc{i}"), "shared token alpha"))
            .collect();
        let idx = index(&notes);
        assert_eq!(idx.search("alpha", 3).len(), 3);
    }

    #[test]
    fn rarer_terms_weigh_more() {
        let idx = index(&[
            note("a", "common rare"),
            note("b", "common"),
            note("c", "common"),
        ]);
        let hits = idx.search("rare common", 10);
        assert_eq!(hits[0].title, "a");
    }
}
