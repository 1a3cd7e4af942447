//! The engine facade — every operation the vault exposes to collaborators.
//!
//! One `Engine` serves one vault. Operations are synchronous; the corpus,
//! graph, and metrics are ephemeral and recomputed per call (the corpus on
//! disk owns truth), while the embedding store and access ledger are the
//! only derived state. Read paths return best-available answers with
//! explanatory warnings; only an unidentifiable vault root or an invalid
//! config is fatal.

use anyhow::{Context, Result};
use chrono::Utc;
use serde::Serialize;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::config::{find_vault_root, OriConfig};
use crate::embedding::{cached_provider, EmbeddingProvider};
use crate::graph::community::detect_communities;
use crate::graph::metrics::{personalized_walk, GraphMetrics};
use crate::graph::LinkGraph;
use crate::index::store::{EmbeddingStore, StoreHealth};
use crate::index::{build_index, gc_index, IndexReport};
use crate::search::bm25::Bm25Index;
use crate::search::composite::{score_composite, CompositeHit, NoteSignals, SpaceScores};
use crate::search::fusion::{fuse, inject_exploration, FusedHit, SignalList};
use crate::search::intent::{classify, QueryIntent};
use crate::search::propensity::{AccessEvent, PropensityLedger, ServedEntry};
use crate::search::{ScoredCandidate, Signal};
use crate::vault::reader::{find_title_mentions, read_corpus, Corpus, TitleMention};
use crate::vault::VaultLayout;
use crate::vitality::VitalityEngine;

/// Response from the full ranked pipeline.
#[derive(Debug, Serialize)]
pub struct RankedResponse {
    pub intent: QueryIntent,
    pub results: Vec<RankedResult>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
}

/// One served result. `spaces` is present when the composite signal saw
/// the note.
#[derive(Debug, Serialize)]
pub struct RankedResult {
    pub title: String,
    pub score: f64,
    pub exploration: bool,
    pub signal_scores: HashMap<Signal, f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub spaces: Option<SpaceScores>,
}

/// A note under the fading threshold.
#[derive(Debug, Serialize)]
pub struct FadingNote {
    pub title: String,
    pub vitality: f64,
}

/// Structural report for the whole graph.
#[derive(Debug, Serialize)]
pub struct GraphReport {
    pub note_count: usize,
    pub edge_count: usize,
    pub orphan_count: usize,
    pub dangling_count: usize,
    pub community_count: usize,
    pub bridge_count: usize,
    pub median_in_degree: f64,
    pub top_authorities: Vec<ScoredCandidate>,
    pub top_betweenness: Vec<ScoredCandidate>,
}

/// One detected community and its members.
#[derive(Debug, Serialize)]
pub struct CommunityReport {
    pub id: usize,
    pub size: usize,
    pub members: Vec<String>,
}

/// How many entries the structural reports list.
const REPORT_TOP_N: usize = 10;

/// The engine. Single writer per vault — callers arrange exclusivity.
pub struct Engine {
    layout: VaultLayout,
    config: OriConfig,
    store: EmbeddingStore,
    provider: Arc<dyn EmbeddingProvider>,
    ledger: PropensityLedger,
}

/// One consistent view of the vault for a single operation.
struct Snapshot {
    corpus: Corpus,
    graph: LinkGraph,
    metrics: GraphMetrics,
    vitality: Vec<f64>,
}

impl Engine {
    /// Discover the vault root upward from `start`, load its config, and
    /// open the engine.
    pub fn open(start: impl AsRef<Path>) -> Result<Self> {
        let root = find_vault_root(start)?;
        let config = OriConfig::load(&root)?;
        Self::with_config(root, config)
    }

    /// Open a vault root with an explicit config.
    pub fn with_config(root: impl AsRef<Path>, config: OriConfig) -> Result<Self> {
        let layout = VaultLayout::new(root, &config);
        let store = EmbeddingStore::open(&layout.db_path)?;
        let provider = cached_provider(
            &config.engine.embedding_model,
            config.engine.embedding_dims,
            &layout.model_dir,
        )?;
        let ledger = PropensityLedger::new(
            layout.log_path.clone(),
            config.ips.enabled,
            config.ips.epsilon,
        );
        info!(root = %layout.root.display(), "engine ready");

        Ok(Self {
            layout,
            config,
            store,
            provider,
            ledger,
        })
    }

    pub fn config(&self) -> &OriConfig {
        &self.config
    }

    pub fn root(&self) -> &Path {
        &self.layout.root
    }

    // ── Ranked retrieval ─────────────────────────────────────────────────

    /// The full pipeline: intent, three signals, fusion, exploration, and
    /// the ledger append.
    pub fn query_ranked(&self, query: &str, limit: Option<usize>) -> Result<RankedResponse> {
        let limit = limit.unwrap_or(self.config.retrieval.default_limit);

        if query.trim().is_empty() {
            return Ok(RankedResponse {
                intent: classify(query, &[]),
                results: Vec::new(),
                warnings: Vec::new(),
            });
        }

        let snapshot = self.snapshot()?;
        let mut warnings = snapshot.corpus.warnings.clone();

        if snapshot.corpus.is_empty() {
            return Ok(RankedResponse {
                intent: classify(query, &[]),
                results: Vec::new(),
                warnings,
            });
        }

        self.ensure_indexed(&snapshot, &mut warnings)?;

        let titles = snapshot.corpus.titles();
        let intent = classify(query, &titles);
        let candidates = limit * self.config.retrieval.candidate_multiplier.max(1);

        // Composite signal — degrades to keyword + graph on model failure
        let composite_hits = match self.provider.embed(query) {
            Ok(query_vec) => {
                let records = self.store.load_all()?;
                let signals = self.note_signals(&snapshot);
                score_composite(
                    &query_vec,
                    &records,
                    &signals,
                    intent.intent,
                    self.config.engine.piecewise_bins,
                    Utc::now(),
                    candidates,
                )
            }
            Err(e) => {
                warn!(error = %e, "embedding model failed, serving keyword and graph only");
                warnings.push(format!("embedding model failed, text signal skipped: {e}"));
                Vec::new()
            }
        };

        // Keyword signal
        let bm25 = Bm25Index::build(&snapshot.corpus.notes, &self.config.bm25);
        let keyword_hits = bm25.search(query, candidates);

        // Graph signal, seeded by query entities
        let seeds: Vec<usize> = intent
            .entities
            .iter()
            .filter_map(|t| snapshot.graph.node(t))
            .collect();
        let walk = personalized_walk(&snapshot.graph, &seeds, self.config.graph.pagerank_alpha);
        let graph_hits = top_walk_candidates(&snapshot.graph, &walk, candidates);

        let spaces_by_title: HashMap<String, SpaceScores> = composite_hits
            .iter()
            .map(|h| (h.title.clone(), h.spaces))
            .collect();

        let weights = &self.config.retrieval.signal_weights;
        let lists = vec![
            SignalList {
                signal: Signal::Composite,
                weight: weights.composite,
                hits: composite_hits
                    .into_iter()
                    .map(|h| ScoredCandidate::new(h.title, h.score))
                    .collect(),
            },
            SignalList {
                signal: Signal::Keyword,
                weight: weights.keyword,
                hits: keyword_hits,
            },
            SignalList {
                signal: Signal::Graph,
                weight: weights.graph,
                hits: graph_hits,
            },
        ];

        let mut fused = fuse(&lists, self.config.retrieval.rrf_k);
        fused.truncate(limit);
        inject_exploration(
            &mut fused,
            &titles,
            self.config.retrieval.exploration_budget,
            limit,
            &mut rand::thread_rng(),
        );

        self.log_access(query, &intent, &fused);

        let results = fused
            .into_iter()
            .map(|h| {
                let spaces = spaces_by_title.get(&h.title).copied();
                RankedResult {
                    spaces: if h.exploration { None } else { spaces },
                    title: h.title,
                    score: h.score,
                    exploration: h.exploration,
                    signal_scores: h.signal_scores,
                }
            })
            .collect();

        Ok(RankedResponse {
            intent,
            results,
            warnings,
        })
    }

    /// Composite signal only.
    pub fn query_similar(&self, query: &str, limit: Option<usize>) -> Result<Vec<CompositeHit>> {
        let limit = limit.unwrap_or(self.config.retrieval.default_limit);
        if query.trim().is_empty() {
            return Ok(Vec::new());
        }

        let snapshot = self.snapshot()?;
        if snapshot.corpus.is_empty() {
            return Ok(Vec::new());
        }
        let mut warnings = Vec::new();
        self.ensure_indexed(&snapshot, &mut warnings)?;

        let titles = snapshot.corpus.titles();
        let intent = classify(query, &titles);
        let query_vec = self.provider.embed(query).context("failed to embed query")?;
        let records = self.store.load_all()?;
        let signals = self.note_signals(&snapshot);

        Ok(score_composite(
            &query_vec,
            &records,
            &signals,
            intent.intent,
            self.config.engine.piecewise_bins,
            Utc::now(),
            limit,
        ))
    }

    /// Notes ranked by authority, best first.
    pub fn query_important(&self, limit: Option<usize>) -> Result<Vec<ScoredCandidate>> {
        let limit = limit.unwrap_or(self.config.retrieval.default_limit);
        let snapshot = self.snapshot()?;

        let mut ranked: Vec<ScoredCandidate> = (0..snapshot.graph.len())
            .map(|i| ScoredCandidate::new(snapshot.graph.title(i), snapshot.metrics.pagerank[i]))
            .collect();
        ranked.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.title.cmp(&b.title))
        });
        ranked.truncate(limit);
        Ok(ranked)
    }

    /// Notes below the vitality threshold, most faded first.
    pub fn query_fading(&self, threshold: f64, limit: Option<usize>) -> Result<Vec<FadingNote>> {
        let limit = limit.unwrap_or(self.config.retrieval.default_limit);
        let snapshot = self.snapshot()?;

        let mut fading: Vec<FadingNote> = snapshot
            .vitality
            .iter()
            .enumerate()
            .filter(|&(_, &v)| v < threshold)
            .map(|(i, &v)| FadingNote {
                title: snapshot.graph.title(i).to_string(),
                vitality: v,
            })
            .collect();
        fading.sort_by(|a, b| {
            a.vitality
                .partial_cmp(&b.vitality)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.title.cmp(&b.title))
        });
        fading.truncate(limit);
        Ok(fading)
    }

    // ── Graph queries ────────────────────────────────────────────────────

    pub fn query_orphans(&self) -> Result<Vec<String>> {
        let (_, graph) = self.corpus_and_graph()?;
        Ok(graph.orphans())
    }

    pub fn query_dangling(&self) -> Result<Vec<String>> {
        let (_, graph) = self.corpus_and_graph()?;
        Ok(graph.dangling())
    }

    pub fn query_backlinks(&self, title: &str) -> Result<Vec<String>> {
        let (_, graph) = self.corpus_and_graph()?;
        Ok(graph.backlinks(title))
    }

    pub fn query_cross_project(&self) -> Result<Vec<String>> {
        let (_, graph) = self.corpus_and_graph()?;
        Ok(graph.cross_project())
    }

    // ── Index lifecycle ──────────────────────────────────────────────────

    /// Incremental index build: hash-skip unless `force`. A recorded
    /// embedding model that differs from the configured one forces a full
    /// re-embed. Stale rows are garbage-collected afterward.
    pub fn index_build(&self, force: bool) -> Result<IndexReport> {
        let (corpus, graph) = self.corpus_and_graph()?;
        let (communities, community_count) = detect_communities(&graph);

        let force = force || self.model_changed()?;
        let report = build_index(
            &self.store,
            self.provider.as_ref(),
            &corpus.notes,
            &communities,
            community_count,
            &self.config.engine,
            force,
        )?;
        gc_index(&self.store, &corpus.notes)?;
        Ok(report)
    }

    /// Delete embedding rows whose note no longer exists.
    pub fn index_gc(&self) -> Result<usize> {
        let (corpus, _) = self.corpus_and_graph()?;
        gc_index(&self.store, &corpus.notes)
    }

    pub fn store_health(&self) -> Result<StoreHealth> {
        self.store.health()
    }

    // ── Reporting ────────────────────────────────────────────────────────

    pub fn graph_metrics(&self) -> Result<GraphReport> {
        let snapshot = self.snapshot()?;
        let graph = &snapshot.graph;
        let metrics = &snapshot.metrics;

        let mut authorities: Vec<ScoredCandidate> = (0..graph.len())
            .map(|i| ScoredCandidate::new(graph.title(i), metrics.pagerank[i]))
            .collect();
        authorities.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        authorities.truncate(REPORT_TOP_N);

        let mut central: Vec<ScoredCandidate> = (0..graph.len())
            .map(|i| ScoredCandidate::new(graph.title(i), metrics.betweenness[i]))
            .collect();
        central.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        central.truncate(REPORT_TOP_N);

        Ok(GraphReport {
            note_count: graph.len(),
            edge_count: graph.edge_count(),
            orphan_count: graph.orphans().len(),
            dangling_count: graph.dangling().len(),
            community_count: metrics.community_count,
            bridge_count: metrics.bridges.iter().filter(|&&b| b).count(),
            median_in_degree: metrics.median_in_degree,
            top_authorities: authorities,
            top_betweenness: central,
        })
    }

    pub fn graph_communities(&self) -> Result<Vec<CommunityReport>> {
        let snapshot = self.snapshot()?;
        let mut members: HashMap<usize, Vec<String>> = HashMap::new();
        for (node, &community) in snapshot.metrics.communities.iter().enumerate() {
            members
                .entry(community)
                .or_default()
                .push(snapshot.graph.title(node).to_string());
        }

        let mut reports: Vec<CommunityReport> = members
            .into_iter()
            .map(|(id, mut members)| {
                members.sort();
                CommunityReport {
                    id,
                    size: members.len(),
                    members,
                }
            })
            .collect();
        reports.sort_by(|a, b| b.size.cmp(&a.size).then(a.id.cmp(&b.id)));
        Ok(reports)
    }

    // ── Capture support ──────────────────────────────────────────────────

    /// Mentions of existing titles inside a draft body, for the capture
    /// collaborator's link promotion.
    pub fn title_mentions(&self, body: &str) -> Result<Vec<TitleMention>> {
        let (corpus, _) = self.corpus_and_graph()?;
        Ok(find_title_mentions(body, &corpus.titles()))
    }

    /// Post-hoc propensities from the access ledger.
    pub fn propensities(&self) -> Result<HashMap<String, f64>> {
        self.ledger.propensities()
    }

    // ── Internals ────────────────────────────────────────────────────────

    fn corpus_and_graph(&self) -> Result<(Corpus, LinkGraph)> {
        let corpus = read_corpus(&self.layout)?;
        let graph = LinkGraph::build(&corpus.notes);
        Ok((corpus, graph))
    }

    fn snapshot(&self) -> Result<Snapshot> {
        let corpus = read_corpus(&self.layout)?;
        let graph = LinkGraph::build(&corpus.notes);
        let metrics = GraphMetrics::compute(&graph, &self.config.graph);
        let vitality = VitalityEngine::new(
            &self.config.vitality,
            &graph,
            &corpus.notes,
            &metrics.bridges,
            self.config.graph.bridge_vitality_floor,
            Utc::now().date_naive(),
        )
        .score_all();

        Ok(Snapshot {
            corpus,
            graph,
            metrics,
            vitality,
        })
    }

    /// Cold-start tolerance: a missing or empty index is a build request,
    /// served synchronously with a warning before the query proceeds.
    fn ensure_indexed(&self, snapshot: &Snapshot, warnings: &mut Vec<String>) -> Result<()> {
        let model_changed = self.model_changed()?;
        if self.store.row_count()? > 0 && !model_changed {
            return Ok(());
        }

        warn!("embedding index missing or stale, building before serving");
        build_index(
            &self.store,
            self.provider.as_ref(),
            &snapshot.corpus.notes,
            &snapshot.metrics.communities,
            snapshot.metrics.community_count,
            &self.config.engine,
            model_changed,
        )?;
        warnings.push("embedding index was missing and has been built".to_string());
        Ok(())
    }

    fn model_changed(&self) -> Result<bool> {
        Ok(self
            .store
            .embedding_model()?
            .map(|stored| stored != self.config.engine.embedding_model)
            .unwrap_or(false))
    }

    fn note_signals(&self, snapshot: &Snapshot) -> HashMap<String, NoteSignals> {
        let max_pagerank = snapshot.metrics.max_pagerank();
        (0..snapshot.graph.len())
            .map(|i| {
                (
                    snapshot.graph.title(i).to_string(),
                    NoteSignals {
                        vitality: snapshot.vitality[i],
                        importance: if max_pagerank > 0.0 {
                            snapshot.metrics.pagerank[i] / max_pagerank
                        } else {
                            0.0
                        },
                    },
                )
            })
            .collect()
    }

    fn log_access(&self, query: &str, intent: &QueryIntent, served: &[FusedHit]) {
        let event = AccessEvent {
            ts: Utc::now().to_rfc3339(),
            query: query.to_string(),
            intent: intent.intent,
            results: served
                .iter()
                .enumerate()
                .map(|(rank, h)| ServedEntry {
                    title: h.title.clone(),
                    rank,
                    score: h.score,
                    propensity: 0.0,
                    exploration: h.exploration,
                })
                .collect(),
        };
        self.ledger.append_or_warn(&event);
        debug!(query, served = served.len(), "access event recorded");
    }
}

/// Rank every node by walk probability, best first.
fn top_walk_candidates(graph: &LinkGraph, walk: &[f64], limit: usize) -> Vec<ScoredCandidate> {
    let mut ranked: Vec<ScoredCandidate> = walk
        .iter()
        .enumerate()
        .map(|(i, &score)| ScoredCandidate::new(graph.title(i), score))
        .collect();
    ranked.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.title.cmp(&b.title))
    });
    ranked.truncate(limit);
    ranked
}
