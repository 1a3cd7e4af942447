//! Directed link graph over the note corpus.
//!
//! Nodes live in an arena indexed by position; the two adjacency tables
//! (forward and reverse) store indices, never references between node
//! records. The graph is derived state, rebuilt from the corpus in one
//! pass. Structural metrics live in [`metrics`]; community detection in
//! [`community`].

pub mod community;
pub mod metrics;

use std::collections::{BTreeSet, HashMap, HashSet};

use crate::vault::note::Note;

/// The link graph arena. Node `i` corresponds to `notes[i]` of the corpus
/// the graph was built from (corpus order is stable: sorted by title).
#[derive(Debug, Default)]
pub struct LinkGraph {
    titles: Vec<String>,
    index: HashMap<String, usize>,
    outgoing: Vec<Vec<usize>>,
    incoming: Vec<Vec<usize>>,
    /// Link targets naming notes that do not exist.
    dangling: BTreeSet<String>,
    /// Per-node project tags, for connector queries.
    projects: Vec<Vec<String>>,
}

impl LinkGraph {
    /// Build from a corpus in one pass. Multi-edges collapse; self-loops
    /// are dropped (they are ignored by every metric and do not count
    /// toward degree).
    pub fn build(notes: &[Note]) -> Self {
        let titles: Vec<String> = notes.iter().map(|n| n.title.clone()).collect();
        let index: HashMap<String, usize> = titles
            .iter()
            .enumerate()
            .map(|(i, t)| (t.clone(), i))
            .collect();

        let mut outgoing = vec![Vec::new(); notes.len()];
        let mut incoming = vec![Vec::new(); notes.len()];
        let mut dangling = BTreeSet::new();

        for (source, note) in notes.iter().enumerate() {
            let mut seen = HashSet::new();
            for target_title in &note.links {
                match index.get(target_title) {
                    Some(&target) if target != source && seen.insert(target) => {
                        outgoing[source].push(target);
                        incoming[target].push(source);
                    }
                    Some(_) => {}
                    None => {
                        dangling.insert(target_title.clone());
                    }
                }
            }
        }

        Self {
            index,
            outgoing,
            incoming,
            dangling,
            projects: notes.iter().map(|n| n.projects.clone()).collect(),
            titles,
        }
    }

    pub fn len(&self) -> usize {
        self.titles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.titles.is_empty()
    }

    pub fn title(&self, node: usize) -> &str {
        &self.titles[node]
    }

    pub fn node(&self, title: &str) -> Option<usize> {
        self.index.get(title).copied()
    }

    pub fn out_neighbors(&self, node: usize) -> &[usize] {
        &self.outgoing[node]
    }

    pub fn in_neighbors(&self, node: usize) -> &[usize] {
        &self.incoming[node]
    }

    pub fn out_degree(&self, node: usize) -> usize {
        self.outgoing[node].len()
    }

    pub fn in_degree(&self, node: usize) -> usize {
        self.incoming[node].len()
    }

    /// Total directed edge count.
    pub fn edge_count(&self) -> usize {
        self.outgoing.iter().map(Vec::len).sum()
    }

    /// Project tags of a node.
    pub fn node_projects(&self, node: usize) -> &[String] {
        &self.projects[node]
    }

    /// Titles of notes linking to `title`. Empty for unknown titles.
    pub fn backlinks(&self, title: &str) -> Vec<String> {
        self.node(title)
            .map(|n| {
                self.incoming[n]
                    .iter()
                    .map(|&s| self.titles[s].clone())
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Titles with no incoming links.
    pub fn orphans(&self) -> Vec<String> {
        (0..self.len())
            .filter(|&i| self.incoming[i].is_empty())
            .map(|i| self.titles[i].clone())
            .collect()
    }

    /// Link targets that name no existing note, sorted.
    pub fn dangling(&self) -> Vec<String> {
        self.dangling.iter().cloned().collect()
    }

    /// Notes tagged with two or more projects — the corpus's cross-project
    /// connectors — ordered by in-degree descending, title ascending.
    pub fn cross_project(&self) -> Vec<String> {
        let mut connectors: Vec<usize> = (0..self.len())
            .filter(|&i| distinct_projects(&self.projects[i]) >= 2)
            .collect();
        connectors.sort_by(|&a, &b| {
            self.in_degree(b)
                .cmp(&self.in_degree(a))
                .then_with(|| self.titles[a].cmp(&self.titles[b]))
        });
        connectors.into_iter().map(|i| self.titles[i].clone()).collect()
    }

    /// Symmetrized neighbor sets (self-loops already absent), for the
    /// undirected algorithms: communities, articulation points, betweenness.
    pub fn undirected_adjacency(&self) -> Vec<Vec<usize>> {
        let mut adj: Vec<BTreeSet<usize>> = vec![BTreeSet::new(); self.len()];
        for (source, targets) in self.outgoing.iter().enumerate() {
            for &target in targets {
                adj[source].insert(target);
                adj[target].insert(source);
            }
        }
        adj.into_iter().map(|s| s.into_iter().collect()).collect()
    }
}

fn distinct_projects(projects: &[String]) -> usize {
    projects.iter().collect::<HashSet<_>>().len()
}
