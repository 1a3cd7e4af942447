//! Ori — a local, file-backed memory substrate for autonomous agents.
//!
//! A *vault* is a directory of plain-text notes with YAML metadata headers;
//! edges between notes are `[[wiki-style]]` link tokens embedded in note
//! bodies. Ori turns that corpus into ranked answers to natural-language
//! queries through three cooperating retrieval signals:
//!
//! | Signal | Source | Default weight |
//! |--------|--------|----------------|
//! | **Composite** | Multi-space vector similarity (text, temporal, vitality, importance, type, community) | 2.0 |
//! | **Keyword** | Field-weighted Okapi BM25 inverted index | 1.0 |
//! | **Graph** | Personalized damped walk seeded from query entities | 1.5 |
//!
//! The signals are fused by score-weighted reciprocal rank fusion, the tail
//! of the served list is replaced with random unseen notes (exploration), and
//! every serve is appended to a JSONL access ledger for off-policy
//! propensity correction.
//!
//! # Architecture
//!
//! - **Storage**: SQLite holding one row per note — five embedding vectors,
//!   a SHA-256 content fingerprint, and an indexing timestamp — so rebuilds
//!   are incremental
//! - **Embeddings**: Local ONNX Runtime with all-MiniLM-L6-v2 (384
//!   dimensions), or a deterministic feature-hashing provider for
//!   model-free environments
//! - **Graph**: arena-backed directed link graph with authority (damped
//!   random walk), modularity communities, articulation points, and
//!   betweenness
//! - **Vitality**: ACT-R-inspired per-note aliveness score from access
//!   history, age, connectivity, and structural role
//!
//! # Modules
//!
//! - [`config`] — Configuration from `ori.config.yaml` and vault discovery
//! - [`vault`] — Note model and corpus reader (headers, links, mentions)
//! - [`graph`] — Link graph and structural metrics
//! - [`vitality`] — Per-note aliveness scoring
//! - [`embedding`] — Text-to-vector providers
//! - [`index`] — Incremental embedding index and its SQLite store
//! - [`search`] — Intent, BM25, composite scoring, fusion, propensity ledger
//! - [`engine`] — The facade exposing every vault operation

pub mod config;
pub mod embedding;
pub mod engine;
pub mod graph;
pub mod index;
pub mod search;
pub mod vault;
pub mod vitality;

pub use engine::Engine;
