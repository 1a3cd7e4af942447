//! Configuration loading from `ori.config.yaml` and vault discovery.
//!
//! Every section deserializes with `#[serde(default)]` so a partial config
//! file only overrides what it names. Missing files yield full defaults;
//! an unparseable file or out-of-range value is fatal at load time.

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::info;

/// Name of the vault marker entry (file or directory) used by discovery.
pub const VAULT_MARKER: &str = ".ori";

/// Name of the config file at the vault root.
pub const CONFIG_FILE: &str = "ori.config.yaml";

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct OriConfig {
    pub engine: EngineConfig,
    pub retrieval: RetrievalConfig,
    pub bm25: Bm25Config,
    pub graph: GraphConfig,
    pub vitality: VitalityConfig,
    pub ips: IpsConfig,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct EngineConfig {
    /// Embedding provider: a model name for the local ONNX provider, or
    /// `"hashed"` for the deterministic feature-hashing provider.
    pub embedding_model: String,
    pub embedding_dims: usize,
    /// Bin count for piecewise-linear encoding of scalar signals.
    pub piecewise_bins: usize,
    /// Dimension of the community projection vector.
    pub community_dims: usize,
    /// Embedding store path, relative to the vault root.
    pub db_path: String,
    /// Where ONNX model files live, relative to the vault root.
    pub model_dir: String,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct RetrievalConfig {
    pub default_limit: usize,
    /// Each signal produces `limit * candidate_multiplier` candidates.
    pub candidate_multiplier: usize,
    pub rrf_k: usize,
    pub signal_weights: SignalWeights,
    /// Fraction of the served list replaced with random unseen notes.
    pub exploration_budget: f64,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct SignalWeights {
    pub composite: f64,
    pub keyword: f64,
    pub graph: f64,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct Bm25Config {
    pub k1: f64,
    pub b: f64,
    pub title_boost: f64,
    pub description_boost: f64,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct GraphConfig {
    pub pagerank_alpha: f64,
    pub bridge_vitality_floor: f64,
    /// A node is a hub when in-degree exceeds this multiple of the median.
    pub hub_degree_multiplier: f64,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct VitalityConfig {
    pub actr_decay: f64,
    pub metabolic_rates: MetabolicRates,
    pub access_saturation_k: f64,
    pub structural_boost_per_link: f64,
    /// In-degree cap for the structural boost.
    pub structural_boost_cap: u32,
    pub revival_decay_rate: f64,
    pub revival_window_days: i64,
}

/// Per-space decay multipliers. Identity files decay slowest, operational
/// files fastest.
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct MetabolicRates {
    #[serde(rename = "self")]
    pub identity: f64,
    pub notes: f64,
    pub ops: f64,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct IpsConfig {
    pub enabled: bool,
    /// Propensity floor for off-policy correction.
    pub epsilon: f64,
    /// Access ledger path, relative to the vault root.
    pub log_path: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            embedding_model: "all-MiniLM-L6-v2".into(),
            embedding_dims: 384,
            piecewise_bins: 8,
            community_dims: 16,
            db_path: ".ori/embeddings.db".into(),
            model_dir: ".ori/models".into(),
        }
    }
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            default_limit: 10,
            candidate_multiplier: 5,
            rrf_k: 60,
            signal_weights: SignalWeights::default(),
            exploration_budget: 0.10,
        }
    }
}

impl Default for SignalWeights {
    fn default() -> Self {
        Self {
            composite: 2.0,
            keyword: 1.0,
            graph: 1.5,
        }
    }
}

impl Default for Bm25Config {
    fn default() -> Self {
        Self {
            k1: 1.2,
            b: 0.75,
            title_boost: 3.0,
            description_boost: 2.0,
        }
    }
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self {
            pagerank_alpha: 0.85,
            bridge_vitality_floor: 0.5,
            hub_degree_multiplier: 2.0,
        }
    }
}

impl Default for VitalityConfig {
    fn default() -> Self {
        Self {
            actr_decay: 0.5,
            metabolic_rates: MetabolicRates::default(),
            access_saturation_k: 10.0,
            structural_boost_per_link: 0.1,
            structural_boost_cap: 10,
            revival_decay_rate: 0.2,
            revival_window_days: 14,
        }
    }
}

impl Default for MetabolicRates {
    fn default() -> Self {
        Self {
            identity: 0.1,
            notes: 1.0,
            ops: 3.0,
        }
    }
}

impl Default for IpsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            epsilon: 0.01,
            log_path: "ops/access.jsonl".into(),
        }
    }
}

impl OriConfig {
    /// Load the config for a vault root: `<root>/ori.config.yaml` if present,
    /// otherwise full defaults.
    pub fn load(root: impl AsRef<Path>) -> Result<Self> {
        Self::load_from(root.as_ref().join(CONFIG_FILE))
    }

    /// Load from a specific path. A missing file yields defaults; a file
    /// that cannot be parsed or fails validation is fatal.
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let config = if path.exists() {
            let contents =
                std::fs::read_to_string(path).context("failed to read config file")?;
            serde_yaml::from_str(&contents).context("failed to parse config YAML")?
        } else {
            info!("no config file at {}, using defaults", path.display());
            OriConfig::default()
        };

        config.validate()?;
        Ok(config)
    }

    /// Reject structurally valid but out-of-range values.
    pub fn validate(&self) -> Result<()> {
        if self.engine.embedding_dims == 0 {
            bail!("engine.embedding_dims must be positive");
        }
        if self.engine.piecewise_bins == 0 {
            bail!("engine.piecewise_bins must be positive");
        }
        if self.engine.community_dims == 0 {
            bail!("engine.community_dims must be positive");
        }
        if !(0.0..1.0).contains(&self.graph.pagerank_alpha) {
            bail!(
                "graph.pagerank_alpha must be in [0, 1), got {}",
                self.graph.pagerank_alpha
            );
        }
        if !(0.0..=1.0).contains(&self.retrieval.exploration_budget) {
            bail!(
                "retrieval.exploration_budget must be in [0, 1], got {}",
                self.retrieval.exploration_budget
            );
        }
        if self.bm25.k1 < 0.0 || !(0.0..=1.0).contains(&self.bm25.b) {
            bail!("bm25.k1 must be >= 0 and bm25.b in [0, 1]");
        }
        if self.ips.epsilon <= 0.0 || self.ips.epsilon > 1.0 {
            bail!("ips.epsilon must be in (0, 1], got {}", self.ips.epsilon);
        }
        Ok(())
    }
}

/// Walk upward from `start` until a directory containing the `.ori` marker
/// is found. Fatal if the filesystem root is reached without one.
pub fn find_vault_root(start: impl AsRef<Path>) -> Result<PathBuf> {
    let start = start.as_ref();
    let mut current = if start.is_absolute() {
        start.to_path_buf()
    } else {
        std::env::current_dir()
            .context("failed to resolve current directory")?
            .join(start)
    };

    loop {
        if current.join(VAULT_MARKER).exists() {
            return Ok(current);
        }
        if !current.pop() {
            bail!(
                "no vault found: walked up from {} without finding a {} marker",
                start.display(),
                VAULT_MARKER
            );
        }
    }
}
