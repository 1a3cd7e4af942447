//! Append-only access ledger for off-policy propensity correction.
//!
//! Every served result list is appended as one JSON object per line. The
//! engine writes `propensity: 0.0` at serve time; actual propensities are
//! computed post-hoc by scanning the ledger — appearance count over total
//! events, floored at epsilon. The stream is monotonic and never
//! compacted here.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::io::{BufRead, Write};
use std::path::PathBuf;
use tracing::warn;

use super::intent::Intent;

/// One served entry inside an access event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServedEntry {
    pub title: String,
    pub rank: usize,
    pub score: f64,
    /// Propensity at serve time. Always 0 — corrected offline.
    pub propensity: f64,
    pub exploration: bool,
}

/// One append-only ledger record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessEvent {
    /// RFC 3339 UTC serve timestamp.
    pub ts: String,
    pub query: String,
    pub intent: Intent,
    pub results: Vec<ServedEntry>,
}

/// The ledger file. Append failures must never fail a query — the caller
/// uses [`append_or_warn`](Self::append_or_warn).
pub struct PropensityLedger {
    path: PathBuf,
    enabled: bool,
    epsilon: f64,
}

impl PropensityLedger {
    pub fn new(path: PathBuf, enabled: bool, epsilon: f64) -> Self {
        Self {
            path,
            enabled,
            epsilon,
        }
    }

    /// Append one event as a JSON line, creating parent directories on
    /// first use.
    pub fn append(&self, event: &AccessEvent) -> Result<()> {
        if !self.enabled {
            return Ok(());
        }
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }
        let mut file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .with_context(|| format!("failed to open ledger {}", self.path.display()))?;

        let line = serde_json::to_string(event)?;
        writeln!(file, "{line}").context("failed to append access event")?;
        Ok(())
    }

    /// Append, logging instead of failing — the query result must survive
    /// a broken ledger.
    pub fn append_or_warn(&self, event: &AccessEvent) {
        if let Err(e) = self.append(event) {
            warn!(error = %e, "failed to append access event, continuing");
        }
    }

    /// Read the full event stream. A missing file is an empty stream;
    /// unparseable lines are skipped with a warning.
    pub fn read_events(&self) -> Result<Vec<AccessEvent>> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }
        let file = std::fs::File::open(&self.path)
            .with_context(|| format!("failed to open ledger {}", self.path.display()))?;

        let mut events = Vec::new();
        for (lineno, line) in std::io::BufReader::new(file).lines().enumerate() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str(&line) {
                Ok(event) => events.push(event),
                Err(e) => {
                    warn!(line = lineno + 1, error = %e, "skipping malformed ledger line")
                }
            }
        }
        Ok(events)
    }

    /// Per-title propensity: appearance count over total events, floored
    /// at epsilon. Empty when no events exist.
    pub fn propensities(&self) -> Result<HashMap<String, f64>> {
        let events = self.read_events()?;
        if events.is_empty() {
            return Ok(HashMap::new());
        }

        let total = events.len() as f64;
        let mut appearances: HashMap<String, f64> = HashMap::new();
        for event in &events {
            for entry in &event.results {
                *appearances.entry(entry.title.clone()).or_insert(0.0) += 1.0;
            }
        }

        Ok(appearances
            .into_iter()
            .map(|(title, count)| (title, (count / total).max(self.epsilon)))
            .collect())
    }
}
