//! SQLite persistence for embedding records.
//!
//! One row per note keyed by title: five vector blobs, a SHA-256 content
//! fingerprint, and an indexing timestamp. Each upsert is a single-row
//! statement, so a concurrent reader observing a half-built index sees a
//! consistent subset of notes, never torn rows. An `index_meta` table
//! records the embedding model the vectors came from.

use anyhow::{Context, Result};
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;

/// One note's persisted embedding state.
#[derive(Debug, Clone)]
pub struct EmbeddingRecord {
    pub title: String,
    pub title_vec: Vec<f32>,
    pub desc_vec: Vec<f32>,
    pub body_vec: Vec<f32>,
    pub type_vec: Vec<f32>,
    pub community_vec: Vec<f32>,
    pub content_hash: String,
    /// RFC 3339 UTC timestamp of the last (re-)embedding.
    pub indexed_at: String,
}

/// Snapshot of store health for diagnostics.
#[derive(Debug)]
pub struct StoreHealth {
    pub row_count: u64,
    pub embedding_model: Option<String>,
    pub integrity_ok: bool,
    pub integrity_details: String,
}

const SCHEMA_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS embeddings (
    title TEXT PRIMARY KEY,
    title_vec BLOB NOT NULL,
    desc_vec BLOB NOT NULL,
    body_vec BLOB NOT NULL,
    type_vec BLOB NOT NULL,
    community_vec BLOB NOT NULL,
    content_hash TEXT NOT NULL,
    indexed_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_embeddings_hash ON embeddings(content_hash);

CREATE TABLE IF NOT EXISTS index_meta (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL
);
"#;

/// The embedding store. Single writer per vault — arranged by the caller,
/// not enforced here.
pub struct EmbeddingStore {
    conn: Connection,
}

impl EmbeddingStore {
    /// Open (or create) the store at the given path with schema applied.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("failed to create directory {}", parent.display()))?;
        }

        let conn = Connection::open(path)
            .with_context(|| format!("failed to open embedding store at {}", path.display()))?;

        // WAL for concurrent readers, generous lock wait
        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.pragma_update(None, "busy_timeout", "5000")?;
        conn.execute_batch(SCHEMA_SQL)
            .context("failed to initialize embedding schema")?;

        let integrity: String =
            conn.pragma_query_value(None, "quick_check", |row| row.get(0))?;
        if integrity != "ok" {
            anyhow::bail!(
                "embedding store integrity check failed: {integrity}. \
                 Delete {} and rebuild the index.",
                path.display()
            );
        }

        tracing::info!(path = %path.display(), "embedding store ready");
        Ok(Self { conn })
    }

    /// In-memory store for tests.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().context("failed to open in-memory store")?;
        conn.execute_batch(SCHEMA_SQL)?;
        Ok(Self { conn })
    }

    /// Insert or replace a record. One statement — atomic per note.
    pub fn upsert(&self, record: &EmbeddingRecord) -> Result<()> {
        self.conn.execute(
            "INSERT OR REPLACE INTO embeddings \
             (title, title_vec, desc_vec, body_vec, type_vec, community_vec, content_hash, indexed_at) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                record.title,
                vec_to_bytes(&record.title_vec),
                vec_to_bytes(&record.desc_vec),
                vec_to_bytes(&record.body_vec),
                vec_to_bytes(&record.type_vec),
                vec_to_bytes(&record.community_vec),
                record.content_hash,
                record.indexed_at,
            ],
        )?;
        Ok(())
    }

    /// Stored content hash for a title, if indexed.
    pub fn stored_hash(&self, title: &str) -> Result<Option<String>> {
        let hash = self
            .conn
            .query_row(
                "SELECT content_hash FROM embeddings WHERE title = ?1",
                params![title],
                |row| row.get(0),
            )
            .optional()?;
        Ok(hash)
    }

    /// Load every record. The composite scorer works over the full set.
    pub fn load_all(&self) -> Result<Vec<EmbeddingRecord>> {
        let mut stmt = self.conn.prepare(
            "SELECT title, title_vec, desc_vec, body_vec, type_vec, community_vec, \
             content_hash, indexed_at FROM embeddings ORDER BY title",
        )?;
        let records = stmt
            .query_map([], |row| {
                Ok(EmbeddingRecord {
                    title: row.get(0)?,
                    title_vec: bytes_to_vec(&row.get::<_, Vec<u8>>(1)?),
                    desc_vec: bytes_to_vec(&row.get::<_, Vec<u8>>(2)?),
                    body_vec: bytes_to_vec(&row.get::<_, Vec<u8>>(3)?),
                    type_vec: bytes_to_vec(&row.get::<_, Vec<u8>>(4)?),
                    community_vec: bytes_to_vec(&row.get::<_, Vec<u8>>(5)?),
                    content_hash: row.get(6)?,
                    indexed_at: row.get(7)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(records)
    }

    pub fn row_count(&self) -> Result<u64> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM embeddings", [], |row| row.get(0))?;
        Ok(count as u64)
    }

    /// All indexed titles, sorted.
    pub fn titles(&self) -> Result<Vec<String>> {
        let mut stmt = self
            .conn
            .prepare("SELECT title FROM embeddings ORDER BY title")?;
        let titles = stmt
            .query_map([], |row| row.get(0))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(titles)
    }

    /// Delete a record. Returns whether a row existed.
    pub fn delete(&self, title: &str) -> Result<bool> {
        let rows = self
            .conn
            .execute("DELETE FROM embeddings WHERE title = ?1", params![title])?;
        Ok(rows > 0)
    }

    /// The embedding model the stored vectors came from, if recorded.
    pub fn embedding_model(&self) -> Result<Option<String>> {
        let model = self
            .conn
            .query_row(
                "SELECT value FROM index_meta WHERE key = 'embedding_model'",
                [],
                |row| row.get(0),
            )
            .optional()?;
        Ok(model)
    }

    pub fn set_embedding_model(&self, model: &str) -> Result<()> {
        self.conn.execute(
            "INSERT OR REPLACE INTO index_meta (key, value) VALUES ('embedding_model', ?1)",
            params![model],
        )?;
        Ok(())
    }

    pub fn health(&self) -> Result<StoreHealth> {
        let integrity_details: String = self
            .conn
            .pragma_query_value(None, "integrity_check", |row| row.get(0))
            .context("failed to run integrity check")?;

        Ok(StoreHealth {
            row_count: self.row_count()?,
            embedding_model: self.embedding_model()?,
            integrity_ok: integrity_details == "ok",
            integrity_details,
        })
    }
}

/// Little-endian f32 blob encoding.
pub fn vec_to_bytes(v: &[f32]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(v.len() * 4);
    for &x in v {
        bytes.extend_from_slice(&x.to_le_bytes());
    }
    bytes
}

pub fn bytes_to_vec(bytes: &[u8]) -> Vec<f32> {
    bytes
        .chunks_exact(4)
        .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(title: &str, hash: &str) -> EmbeddingRecord {
        EmbeddingRecord {
            title: title.to_string(),
            title_vec: vec![1.0, 0.0],
            desc_vec: vec![0.0, 1.0],
            body_vec: vec![0.5, 0.5],
            type_vec: vec![0.0, 1.0, 0.0, 0.0, 0.0, 0.0],
            community_vec: vec![0.1; 16],
            content_hash: hash.to_string(),
            indexed_at: "2026-08-01T00:00:00Z".to_string(),
        }
    }

    #[test]
    fn blob_codec_round_trips() {
        let v = vec![0.0f32, 1.5, -2.25, f32::MIN_POSITIVE];
        assert_eq!(bytes_to_vec(&vec_to_bytes(&v)), v);
    }

    #[test]
    fn upsert_then_load() {
        let store = EmbeddingStore::open_in_memory().unwrap();
        store.upsert(&record("alpha", "h1")).unwrap();

        let all = store.load_all().unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].title, "alpha");
        assert_eq!(all[0].title_vec, vec![1.0, 0.0]);
        assert_eq!(all[0].content_hash, "h1");
    }

    #[test]
    fn upsert_replaces_existing_row() {
        let store = EmbeddingStore::open_in_memory().unwrap();
        store.upsert(&record("alpha", "h1")).unwrap();
        store.upsert(&record("alpha", "h2")).unwrap();

        assert_eq!(store.row_count().unwrap(), 1);
        assert_eq!(store.stored_hash("alpha").unwrap().as_deref(), Some("h2"));
    }

    #[test]
    fn stored_hash_missing_is_none() {
        let store = EmbeddingStore::open_in_memory().unwrap();
        assert!(store.stored_hash("ghost").unwrap().is_none());
    }

    #[test]
    fn delete_reports_existence() {
        let store = EmbeddingStore::open_in_memory().unwrap();
        store.upsert(&record("alpha", "h1")).unwrap();
        assert!(store.delete("alpha").unwrap());
        assert!(!store.delete("alpha").unwrap());
        assert_eq!(store.row_count().unwrap(), 0);
    }

    #[test]
    fn embedding_model_round_trips() {
        let store = EmbeddingStore::open_in_memory().unwrap();
        assert!(store.embedding_model().unwrap().is_none());
        store.set_embedding_model("hashed").unwrap();
        assert_eq!(store.embedding_model().unwrap().as_deref(), Some("hashed"));
    }

    #[test]
    fn open_creates_parent_directories() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join(".ori").join("embeddings.db");
        let store = EmbeddingStore::open(&path).unwrap();
        assert!(path.exists());
        assert_eq!(store.row_count().unwrap(), 0);
    }

    #[test]
    fn health_reports_ok_on_fresh_store() {
        let store = EmbeddingStore::open_in_memory().unwrap();
        let health = store.health().unwrap();
        assert!(health.integrity_ok);
        assert_eq!(health.row_count, 0);
    }
}
