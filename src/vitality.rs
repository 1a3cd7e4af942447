//! Per-note aliveness scoring.
//!
//! Vitality is a scalar in [0, 1] built in six steps, each operating on the
//! running value: ACT-R-style base activation from access count and age,
//! per-space metabolic decay, a structural boost from in-degree, access
//! saturation, a revival bonus for freshly re-linked notes, and a floor for
//! bridge nodes.

use chrono::NaiveDate;

use crate::config::VitalityConfig;
use crate::graph::LinkGraph;
use crate::vault::note::{Note, Space};

/// Magnitude of the revival bonus before exponential falloff.
const REVIVAL_BONUS: f64 = 0.2;

/// Scores notes against one graph snapshot. Node indices are the corpus
/// positions shared with the graph arena.
pub struct VitalityEngine<'a> {
    config: &'a VitalityConfig,
    graph: &'a LinkGraph,
    notes: &'a [Note],
    bridges: &'a [bool],
    bridge_floor: f64,
    today: NaiveDate,
}

impl<'a> VitalityEngine<'a> {
    pub fn new(
        config: &'a VitalityConfig,
        graph: &'a LinkGraph,
        notes: &'a [Note],
        bridges: &'a [bool],
        bridge_floor: f64,
        today: NaiveDate,
    ) -> Self {
        Self {
            config,
            graph,
            notes,
            bridges,
            bridge_floor,
            today,
        }
    }

    /// Score every note, aligned by node index.
    pub fn score_all(&self) -> Vec<f64> {
        (0..self.notes.len()).map(|i| self.score(i)).collect()
    }

    pub fn score(&self, node: usize) -> f64 {
        let note = &self.notes[node];

        // 1 + 2: base activation under the space's metabolic decay
        let decay = self.effective_decay(note.space);
        let mut vitality = base_activation(
            note.access_count,
            note.age_days(self.today),
            decay,
        );

        // 3: structural boost from in-degree
        let capped_in = (self.graph.in_degree(node) as u32).min(self.config.structural_boost_cap);
        let boost =
            (1.0 + self.config.structural_boost_per_link * capped_in as f64).min(2.0);
        vitality *= boost;

        // 4: access saturation
        let n = note.access_count as f64;
        vitality *= 0.5 + 0.5 * (1.0 - (-n / self.config.access_saturation_k).exp());

        // 5: revival bonus for a new incoming link inside the window
        if let Some(days) = self.days_since_new_connection(node) {
            if days <= self.config.revival_window_days {
                vitality += REVIVAL_BONUS * (-self.config.revival_decay_rate * days as f64).exp();
            }
        }

        // 6: bridge floor
        if self.bridges.get(node).copied().unwrap_or(false) {
            vitality = vitality.max(self.bridge_floor);
        }

        vitality.clamp(0.0, 1.0)
    }

    fn effective_decay(&self, space: Space) -> f64 {
        let rate = match space {
            Space::Identity => self.config.metabolic_rates.identity,
            Space::Notes => self.config.metabolic_rates.notes,
            Space::Ops => self.config.metabolic_rates.ops,
        };
        (self.config.actr_decay * rate).clamp(0.01, 0.99)
    }

    /// Days since the newest incoming link appeared. The engine never sees
    /// link-creation events, so the linking note's own creation date is the
    /// proxy.
    fn days_since_new_connection(&self, node: usize) -> Option<i64> {
        self.graph
            .in_neighbors(node)
            .iter()
            .map(|&src| self.notes[src].created)
            .max()
            .map(|newest| (self.today - newest).num_days().max(0))
    }
}

/// ACT-R base-level activation, sigmoid-normalized to [0, 1].
///
/// `B = ln(n / (1 - d)) - d * ln(L)` for access count `n`, lifetime in days
/// `L`, and decay `d`. Cold start (`n = 0`) scores 0.5; a note created
/// today (`L = 0`) scores 1.0.
pub fn base_activation(access_count: u32, age_days: i64, decay: f64) -> f64 {
    if access_count == 0 {
        return 0.5;
    }
    if age_days == 0 {
        return 1.0;
    }
    let d = decay.clamp(0.01, 0.99);
    let activation =
        (access_count as f64 / (1.0 - d)).ln() - d * (age_days as f64).ln();
    sigmoid(activation)
}

fn sigmoid(x: f64) -> f64 {
    1.0 / (1.0 + (-x).exp())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vault::note::Note;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 8, 1).unwrap()
    }

    fn note(title: &str, body: &str) -> Note {
        let mut n = Note::body_only(title, body, today());
        n.links = crate::vault::reader::extract_links(body);
        n
    }

    fn scored(notes: Vec<Note>) -> (LinkGraph, Vec<Note>, Vec<f64>) {
        let mut sorted = notes;
        sorted.sort_by(|a, b| a.title.cmp(&b.title));
        let graph = LinkGraph::build(&sorted);
        let config = VitalityConfig::default();
        let bridges = vec![false; graph.len()];
        let engine = VitalityEngine::new(&config, &graph, &sorted, &bridges, 0.5, today());
        let scores = engine.score_all();
        (graph, sorted, scores)
    }

    #[test]
    fn base_activation_edge_cases() {
        assert!((base_activation(0, 100, 0.5) - 0.5).abs() < 1e-12);
        assert!((base_activation(5, 0, 0.5) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn base_activation_decreases_with_age() {
        let young = base_activation(5, 10, 0.5);
        let old = base_activation(5, 1000, 0.5);
        assert!(young > old);
    }

    #[test]
    fn base_activation_increases_with_access() {
        let few = base_activation(2, 100, 0.5);
        let many = base_activation(50, 100, 0.5);
        assert!(many > few);
    }

    #[test]
    fn scores_stay_in_unit_interval() {
        let mut hot = note("hot", "");
        hot.access_count = 10_000;
        let mut cold = note("cold", "");
        cold.created = NaiveDate::from_ymd_opt(2016, 1, 1).unwrap();
        let (_, _, scores) = scored(vec![hot, cold, note("linked", ""), note("x", "[[linked]]")]);
        for s in scores {
            assert!((0.0..=1.0).contains(&s), "out of range: {s}");
        }
    }

    #[test]
    fn untouched_old_note_fades_below_accessed_one() {
        // Structurally equivalent apart from access history and links
        let ninety_days_ago = today() - chrono::Duration::days(90);
        let mut fading = note("fading", "");
        fading.created = ninety_days_ago;

        let mut alive = note("alive", "");
        alive.created = ninety_days_ago;
        alive.access_count = 20;

        let mut linkers = Vec::new();
        for i in 0..3 {
            let mut l = note(&format!("l{i}"), "[[alive]]");
            l.created = ninety_days_ago;
            linkers.push(l);
        }

        let mut notes = vec![fading, alive];
        notes.append(&mut linkers);
        let (graph, sorted, scores) = scored(notes);

        let fading_score = scores[graph.node("fading").unwrap()];
        let alive_score = scores[graph.node("alive").unwrap()];
        assert!(fading_score < 0.5, "fading note at {fading_score}");
        assert!(alive_score > 0.5, "alive note at {alive_score}");
    }

    #[test]
    fn in_degree_never_hurts() {
        let ninety = today() - chrono::Duration::days(90);
        let mut isolated = note("isolated", "");
        isolated.created = ninety;
        isolated.access_count = 5;
        let mut linked = note("linked", "");
        linked.created = ninety;
        linked.access_count = 5;
        let mut linker = note("linker", "[[linked]]");
        linker.created = ninety;

        let (graph, _, scores) = scored(vec![isolated, linked, linker]);
        assert!(
            scores[graph.node("linked").unwrap()] >= scores[graph.node("isolated").unwrap()]
        );
    }

    #[test]
    fn revival_bonus_applies_within_window() {
        let ninety = today() - chrono::Duration::days(90);
        let mut stale = note("stale", "");
        stale.created = ninety;
        stale.access_count = 3;
        let mut revived = note("revived", "");
        revived.created = ninety;
        revived.access_count = 3;

        // Old linker for stale, fresh linker for revived
        let mut old_linker = note("old linker", "[[stale]]");
        old_linker.created = ninety;
        let mut fresh_linker = note("fresh linker", "[[revived]]");
        fresh_linker.created = today() - chrono::Duration::days(2);

        let (graph, _, scores) = scored(vec![stale, revived, old_linker, fresh_linker]);
        assert!(
            scores[graph.node("revived").unwrap()] > scores[graph.node("stale").unwrap()]
        );
    }

    #[test]
    fn bridge_floor_holds() {
        let old = today() - chrono::Duration::days(2000);
        let mut ancient = note("ancient", "");
        ancient.created = old;

        let notes = vec![ancient];
        let graph = LinkGraph::build(&notes);
        let config = VitalityConfig::default();
        let bridges = vec![true];
        let engine = VitalityEngine::new(&config, &graph, &notes, &bridges, 0.5, today());
        assert!(engine.score(0) >= 0.5);
    }

    #[test]
    fn identity_space_decays_slower() {
        let age = 365;
        let identity = base_activation(3, age, 0.5 * 0.1);
        let ops = base_activation(3, age, (0.5f64 * 3.0).clamp(0.01, 0.99));
        assert!(identity > ops);
    }
}
