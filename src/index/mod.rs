//! The incremental embedding index.
//!
//! Build protocol: graph metrics are computed once up front so community
//! ids are available, then every note is fingerprinted and re-embedded
//! only when its hash differs from the stored one (or the build is
//! forced). Each note commits as a single row upsert, so an interrupted
//! build leaves a consistent store and the next invocation finishes the
//! rest via hash-skip.

pub mod encode;
pub mod store;

use anyhow::Result;
use serde::Serialize;
use std::collections::HashSet;
use std::time::Instant;
use tracing::{debug, info};

use crate::config::EngineConfig;
use crate::embedding::EmbeddingProvider;
use crate::vault::note::Note;

use encode::{community_projection, content_hash, enriched_body, one_hot_type};
use store::{EmbeddingRecord, EmbeddingStore};

/// Outcome of one `index_build` invocation.
#[derive(Debug, Serialize)]
pub struct IndexReport {
    pub indexed: usize,
    pub skipped: usize,
    pub total: usize,
    pub duration_ms: u64,
}

/// Embed every note whose content fingerprint changed (all notes when
/// `force`). `communities` is the per-note community assignment aligned
/// with `notes`; `community_count` is cached once for the projection.
pub fn build_index(
    db: &EmbeddingStore,
    provider: &dyn EmbeddingProvider,
    notes: &[Note],
    communities: &[usize],
    community_count: usize,
    config: &EngineConfig,
    force: bool,
) -> Result<IndexReport> {
    let started = Instant::now();
    let mut indexed = 0;
    let mut skipped = 0;

    for (i, note) in notes.iter().enumerate() {
        let hash = content_hash(note);
        if !force {
            if let Some(stored) = db.stored_hash(&note.title)? {
                if stored == hash {
                    skipped += 1;
                    continue;
                }
            }
        }

        let description = note.description.as_deref().unwrap_or(&note.title);
        let enriched = enriched_body(note);
        let texts = [note.title.as_str(), description, enriched.as_str()];
        let mut vectors = provider.embed_batch(&texts)?.into_iter();
        let (Some(title_vec), Some(desc_vec), Some(body_vec)) =
            (vectors.next(), vectors.next(), vectors.next())
        else {
            anyhow::bail!("embedding provider returned short batch for '{}'", note.title);
        };

        db.upsert(&EmbeddingRecord {
            title: note.title.clone(),
            title_vec,
            desc_vec,
            body_vec,
            type_vec: one_hot_type(note.note_type),
            community_vec: community_projection(
                communities[i],
                community_count,
                config.community_dims,
            ),
            content_hash: hash,
            indexed_at: chrono::Utc::now().to_rfc3339(),
        })?;

        debug!(title = %note.title, "note embedded");
        indexed += 1;
    }

    db.set_embedding_model(&config.embedding_model)?;

    let report = IndexReport {
        indexed,
        skipped,
        total: notes.len(),
        duration_ms: started.elapsed().as_millis() as u64,
    };
    info!(
        indexed = report.indexed,
        skipped = report.skipped,
        total = report.total,
        "index build finished"
    );
    Ok(report)
}

/// Delete rows whose note no longer exists. Returns how many were removed.
pub fn gc_index(db: &EmbeddingStore, notes: &[Note]) -> Result<usize> {
    let live: HashSet<&str> = notes.iter().map(|n| n.title.as_str()).collect();
    let mut removed = 0;
    for title in db.titles()? {
        if !live.contains(title.as_str()) {
            db.delete(&title)?;
            removed += 1;
        }
    }
    if removed > 0 {
        info!(removed, "garbage-collected stale embedding rows");
    }
    Ok(removed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embedding::hashed::HashedProvider;
    use chrono::NaiveDate;

    fn note(title: &str, body: &str) -> Note {
        let today = NaiveDate::from_ymd_opt(2026, 8, 1).unwrap();
        let mut n = Note::body_only(title, body, today);
        n.links = crate::vault::reader::extract_links(body);
        n
    }

    fn build(
        db: &EmbeddingStore,
        notes: &[Note],
        force: bool,
    ) -> IndexReport {
        let provider = HashedProvider::new(64);
        let config = EngineConfig {
            embedding_model: "hashed".into(),
            embedding_dims: 64,
            ..EngineConfig::default()
        };
        let communities = vec![0; notes.len()];
        build_index(db, &provider, notes, &communities, 1, &config, force).unwrap()
    }

    #[test]
    fn first_build_embeds_everything() {
        let db = EmbeddingStore::open_in_memory().unwrap();
        let notes = vec![note("a", "body a"), note("b", "body b")];
        let report = build(&db, &notes, false);

        assert_eq!(report.indexed, 2);
        assert_eq!(report.skipped, 0);
        assert_eq!(report.total, 2);
        assert_eq!(db.row_count().unwrap(), 2);
    }

    #[test]
    fn second_build_skips_everything() {
        let db = EmbeddingStore::open_in_memory().unwrap();
        let notes = vec![note("a", "body a"), note("b", "body b")];
        build(&db, &notes, false);
        let report = build(&db, &notes, false);

        assert_eq!(report.indexed, 0);
        assert_eq!(report.skipped, 2);
        assert_eq!(db.row_count().unwrap(), 2);
    }

    #[test]
    fn mutated_note_alone_is_rebuilt() {
        let db = EmbeddingStore::open_in_memory().unwrap();
        let mut notes = vec![note("a", "body a"), note("b", "body b")];
        build(&db, &notes, false);

        notes[1].body = "body b changed".into();
        let report = build(&db, &notes, false);
        assert_eq!(report.indexed, 1);
        assert_eq!(report.skipped, 1);
    }

    #[test]
    fn force_rebuilds_everything() {
        let db = EmbeddingStore::open_in_memory().unwrap();
        let notes = vec![note("a", "body a")];
        build(&db, &notes, false);
        let report = build(&db, &notes, true);
        assert_eq!(report.indexed, 1);
        assert_eq!(report.skipped, 0);
    }

    #[test]
    fn build_records_embedding_model() {
        let db = EmbeddingStore::open_in_memory().unwrap();
        build(&db, &[note("a", "")], false);
        assert_eq!(db.embedding_model().unwrap().as_deref(), Some("hashed"));
    }

    #[test]
    fn gc_removes_rows_without_notes() {
        let db = EmbeddingStore::open_in_memory().unwrap();
        let notes = vec![note("a", ""), note("b", "")];
        build(&db, &notes, false);

        let removed = gc_index(&db, &notes[..1]).unwrap();
        assert_eq!(removed, 1);
        assert_eq!(db.titles().unwrap(), vec!["a"]);
    }

    #[test]
    fn description_falls_back_to_title() {
        let db = EmbeddingStore::open_in_memory().unwrap();
        let notes = vec![note("solo title", "")];
        build(&db, &notes, false);

        let all = db.load_all().unwrap();
        assert_eq!(all[0].title_vec, all[0].desc_vec);
    }
}
