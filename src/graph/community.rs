//! Modularity-based community detection on the undirected view.
//!
//! Single-level Louvain-style local moving: every node repeatedly moves to
//! the neighboring community with the highest modularity gain until a full
//! pass makes no move. The optimum is not unique and no deterministic seed
//! is required — downstream consumers only use community identifiers.

use std::collections::HashMap;

use super::LinkGraph;

/// Bound on local-moving passes; vault-scale graphs settle in a handful.
const MAX_PASSES: usize = 16;

/// Assign every node a community id, densely renumbered by first
/// appearance in node order. Returns `(assignment, community_count)`.
/// Isolated nodes keep singleton communities.
pub fn detect_communities(graph: &LinkGraph) -> (Vec<usize>, usize) {
    let n = graph.len();
    if n == 0 {
        return (Vec::new(), 0);
    }

    let adj = graph.undirected_adjacency();
    let degree: Vec<f64> = adj.iter().map(|a| a.len() as f64).collect();
    let two_m: f64 = degree.iter().sum();

    let mut community: Vec<usize> = (0..n).collect();

    if two_m > 0.0 {
        // Sum of member degrees per community
        let mut community_degree = degree.clone();
        let mut moved = true;
        let mut passes = 0;

        while moved && passes < MAX_PASSES {
            moved = false;
            passes += 1;

            for v in 0..n {
                if adj[v].is_empty() {
                    continue;
                }
                let current = community[v];
                community_degree[current] -= degree[v];

                let mut links: HashMap<usize, f64> = HashMap::new();
                for &w in &adj[v] {
                    *links.entry(community[w]).or_insert(0.0) += 1.0;
                }

                let gain = |c: usize, l: f64| l - degree[v] * community_degree[c] / two_m;
                let mut best = current;
                let mut best_gain = gain(current, links.get(&current).copied().unwrap_or(0.0));
                for (&c, &l) in &links {
                    let g = gain(c, l);
                    if g > best_gain + 1e-12 {
                        best_gain = g;
                        best = c;
                    }
                }

                community_degree[best] += degree[v];
                if best != current {
                    community[v] = best;
                    moved = true;
                }
            }
        }
    }

    renumber(community)
}

/// Map arbitrary community labels to dense ids ordered by first appearance.
fn renumber(raw: Vec<usize>) -> (Vec<usize>, usize) {
    let mut mapping = HashMap::new();
    let mut dense = Vec::with_capacity(raw.len());
    for label in raw {
        let next = mapping.len();
        let id = *mapping.entry(label).or_insert(next);
        dense.push(id);
    }
    let count = mapping.len();
    (dense, count)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vault::note::Note;
    use chrono::NaiveDate;

    fn note(title: &str, body: &str) -> Note {
        let today = NaiveDate::from_ymd_opt(2026, 8, 1).unwrap();
        let mut n = Note::body_only(title, body, today);
        n.links = crate::vault::reader::extract_links(body);
        n
    }

    fn graph_of(notes: &[Note]) -> LinkGraph {
        let mut sorted = notes.to_vec();
        sorted.sort_by(|a, b| a.title.cmp(&b.title));
        LinkGraph::build(&sorted)
    }

    #[test]
    fn empty_graph_has_no_communities() {
        let (assignment, count) = detect_communities(&LinkGraph::build(&[]));
        assert!(assignment.is_empty());
        assert_eq!(count, 0);
    }

    #[test]
    fn isolated_nodes_keep_singleton_communities() {
        let graph = graph_of(&[note("a", ""), note("b", ""), note("c", "")]);
        let (assignment, count) = detect_communities(&graph);
        assert_eq!(count, 3);
        let mut sorted = assignment.clone();
        sorted.sort_unstable();
        assert_eq!(sorted, vec![0, 1, 2]);
    }

    #[test]
    fn two_cliques_split_into_two_communities() {
        // clique one: a-b-c, clique two: x-y-z, no cross edges
        let graph = graph_of(&[
            note("a", "[[b]] [[c]]"),
            note("b", "[[c]]"),
            note("c", ""),
            note("x", "[[y]] [[z]]"),
            note("y", "[[z]]"),
            note("z", ""),
        ]);
        let (assignment, count) = detect_communities(&graph);
        assert_eq!(count, 2);

        let a = assignment[graph.node("a").unwrap()];
        let b = assignment[graph.node("b").unwrap()];
        let c = assignment[graph.node("c").unwrap()];
        let x = assignment[graph.node("x").unwrap()];
        assert_eq!(a, b);
        assert_eq!(b, c);
        assert_ne!(a, x);
    }

    #[test]
    fn ids_are_dense() {
        let graph = graph_of(&[
            note("a", "[[b]]"),
            note("b", ""),
            note("solo", ""),
        ]);
        let (assignment, count) = detect_communities(&graph);
        let max = assignment.iter().copied().max().unwrap();
        assert_eq!(max + 1, count);
    }
}
