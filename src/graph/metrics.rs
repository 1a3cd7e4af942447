//! Structural metrics over the link graph.
//!
//! Authority is a damped random walk (uniform teleport); the personalized
//! variant concentrates the teleport on seed nodes and runs a fixed number
//! of power iterations for query-time use. Betweenness (Brandes) is
//! computed for reporting only. The bridge set unions the classic
//! articulation-point condition with three structural-role heuristics.

use crate::config::GraphConfig;

use super::community::detect_communities;
use super::LinkGraph;

/// Damping iterations for the global authority walk.
const PAGERANK_MAX_ITER: usize = 50;
const PAGERANK_TOLERANCE: f64 = 1e-9;

/// Fixed iteration count for query-time personalized walks.
const PERSONALIZED_ITER: usize = 20;

/// All derived structural metrics for one graph snapshot, aligned by node
/// index.
#[derive(Debug)]
pub struct GraphMetrics {
    pub pagerank: Vec<f64>,
    pub betweenness: Vec<f64>,
    pub communities: Vec<usize>,
    pub community_count: usize,
    pub bridges: Vec<bool>,
    pub median_in_degree: f64,
}

impl GraphMetrics {
    pub fn compute(graph: &LinkGraph, config: &GraphConfig) -> Self {
        let (communities, community_count) = detect_communities(graph);
        let articulation = articulation_points(graph);
        let median = median_in_degree(graph);
        let bridges = bridge_set(graph, &articulation, median, config.hub_degree_multiplier);

        Self {
            pagerank: pagerank(graph, config.pagerank_alpha),
            betweenness: betweenness(graph),
            communities,
            community_count,
            bridges,
            median_in_degree: median,
        }
    }

    pub fn max_pagerank(&self) -> f64 {
        self.pagerank.iter().copied().fold(0.0, f64::max)
    }
}

/// Authority via the standard damped iteration with uniform teleport.
/// Mass from sink nodes is redistributed uniformly each round.
pub fn pagerank(graph: &LinkGraph, alpha: f64) -> Vec<f64> {
    power_iterate(graph, alpha, None, PAGERANK_MAX_ITER, PAGERANK_TOLERANCE)
}

/// Damped walk with the teleport distribution concentrated on `seeds`
/// (uniform over seeds; uniform over all nodes when `seeds` is empty).
/// Runs a fixed iteration count — enough for query-time ranking.
pub fn personalized_walk(graph: &LinkGraph, seeds: &[usize], alpha: f64) -> Vec<f64> {
    let teleport = if seeds.is_empty() {
        None
    } else {
        let mut t = vec![0.0; graph.len()];
        let share = 1.0 / seeds.len() as f64;
        for &s in seeds {
            t[s] += share;
        }
        Some(t)
    };
    power_iterate(graph, alpha, teleport, PERSONALIZED_ITER, 0.0)
}

/// Shared power iteration. `teleport` of `None` means uniform. A non-zero
/// `tolerance` allows early exit on convergence.
fn power_iterate(
    graph: &LinkGraph,
    alpha: f64,
    teleport: Option<Vec<f64>>,
    max_iter: usize,
    tolerance: f64,
) -> Vec<f64> {
    let n = graph.len();
    if n == 0 {
        return Vec::new();
    }
    let uniform = 1.0 / n as f64;
    let teleport = teleport.unwrap_or_else(|| vec![uniform; n]);

    let mut rank = vec![uniform; n];
    let mut next = vec![0.0; n];

    for _ in 0..max_iter {
        // Sink mass follows the teleport distribution
        let sink_mass: f64 = (0..n)
            .filter(|&i| graph.out_degree(i) == 0)
            .map(|i| rank[i])
            .sum();

        for (i, slot) in next.iter_mut().enumerate() {
            *slot = (1.0 - alpha + alpha * sink_mass) * teleport[i];
        }
        for source in 0..n {
            let out = graph.out_neighbors(source);
            if out.is_empty() {
                continue;
            }
            let share = alpha * rank[source] / out.len() as f64;
            for &target in out {
                next[target] += share;
            }
        }

        let delta: f64 = rank
            .iter()
            .zip(next.iter())
            .map(|(a, b)| (a - b).abs())
            .sum();
        std::mem::swap(&mut rank, &mut next);

        if tolerance > 0.0 && delta < tolerance {
            break;
        }
    }

    rank
}

/// Brandes betweenness centrality on the undirected view, unweighted.
/// Pair contributions are halved so each unordered pair counts once.
pub fn betweenness(graph: &LinkGraph) -> Vec<f64> {
    let n = graph.len();
    let adj = graph.undirected_adjacency();
    let mut centrality = vec![0.0; n];

    for source in 0..n {
        // BFS from source
        let mut stack = Vec::new();
        let mut predecessors: Vec<Vec<usize>> = vec![Vec::new(); n];
        let mut sigma = vec![0.0f64; n];
        let mut distance = vec![-1i64; n];
        sigma[source] = 1.0;
        distance[source] = 0;

        let mut queue = std::collections::VecDeque::new();
        queue.push_back(source);
        while let Some(v) = queue.pop_front() {
            stack.push(v);
            for &w in &adj[v] {
                if distance[w] < 0 {
                    distance[w] = distance[v] + 1;
                    queue.push_back(w);
                }
                if distance[w] == distance[v] + 1 {
                    sigma[w] += sigma[v];
                    predecessors[w].push(v);
                }
            }
        }

        // Back-propagate dependencies
        let mut delta = vec![0.0f64; n];
        while let Some(w) = stack.pop() {
            for &v in &predecessors[w] {
                delta[v] += sigma[v] / sigma[w] * (1.0 + delta[w]);
            }
            if w != source {
                centrality[w] += delta[w];
            }
        }
    }

    for c in &mut centrality {
        *c /= 2.0;
    }
    centrality
}

/// Classic articulation points on the undirected view (low-link DFS,
/// iterative so vault-scale graphs cannot overflow the stack).
pub fn articulation_points(graph: &LinkGraph) -> Vec<bool> {
    let n = graph.len();
    let adj = graph.undirected_adjacency();
    let mut disc = vec![usize::MAX; n];
    let mut low = vec![0usize; n];
    let mut is_articulation = vec![false; n];
    let mut timer = 0;

    for root in 0..n {
        if disc[root] != usize::MAX {
            continue;
        }
        let mut root_children = 0;
        // (node, parent, next-neighbor cursor)
        let mut stack: Vec<(usize, usize, usize)> = vec![(root, usize::MAX, 0)];
        disc[root] = timer;
        low[root] = timer;
        timer += 1;

        while !stack.is_empty() {
            let top = stack.len() - 1;
            let (v, parent) = (stack[top].0, stack[top].1);
            if stack[top].2 < adj[v].len() {
                let w = adj[v][stack[top].2];
                stack[top].2 += 1;
                if disc[w] == usize::MAX {
                    disc[w] = timer;
                    low[w] = timer;
                    timer += 1;
                    if v == root {
                        root_children += 1;
                    }
                    stack.push((w, v, 0));
                } else if w != parent {
                    low[v] = low[v].min(disc[w]);
                }
            } else {
                stack.pop();
                if let Some(&(u, _, _)) = stack.last() {
                    low[u] = low[u].min(low[v]);
                    if u != root && low[v] >= disc[u] {
                        is_articulation[u] = true;
                    }
                }
            }
        }

        is_articulation[root] = root_children >= 2;
    }

    is_articulation
}

/// Median in-degree over all nodes (mean of middle pair for even counts).
pub fn median_in_degree(graph: &LinkGraph) -> f64 {
    let n = graph.len();
    if n == 0 {
        return 0.0;
    }
    let mut degrees: Vec<usize> = (0..n).map(|i| graph.in_degree(i)).collect();
    degrees.sort_unstable();
    if n % 2 == 1 {
        degrees[n / 2] as f64
    } else {
        (degrees[n / 2 - 1] + degrees[n / 2]) as f64 / 2.0
    }
}

/// A node is a bridge when any of the following holds:
/// articulation point, in-degree hub (greater than `hub_multiplier` times
/// the median), role-based title ("… map" or "index"), or cross-project
/// connector (two or more project tags with in-degree at least 3).
pub fn bridge_set(
    graph: &LinkGraph,
    articulation: &[bool],
    median_in_degree: f64,
    hub_multiplier: f64,
) -> Vec<bool> {
    (0..graph.len())
        .map(|i| {
            if articulation[i] {
                return true;
            }
            if graph.in_degree(i) as f64 > hub_multiplier * median_in_degree
                && graph.in_degree(i) > 0
            {
                return true;
            }
            let title = graph.title(i);
            if title.ends_with(" map") || title == "index" {
                return true;
            }
            graph.node_projects(i).len() >= 2 && graph.in_degree(i) >= 3
        })
        .collect()
}
