//! Vault layout and the note corpus.
//!
//! A vault is a directory with a `.ori` marker, an optional
//! `ori.config.yaml`, and a `notes/` directory holding the corpus. Type
//! definitions live in [`note`]; file parsing in [`reader`].

pub mod note;
pub mod reader;

use std::path::{Path, PathBuf};

/// Resolved paths for a single vault. All derived state lives under the
/// vault root so a vault is fully self-contained.
#[derive(Debug, Clone)]
pub struct VaultLayout {
    pub root: PathBuf,
    pub notes_dir: PathBuf,
    pub inbox_dir: PathBuf,
    pub db_path: PathBuf,
    pub log_path: PathBuf,
    pub model_dir: PathBuf,
}

impl VaultLayout {
    /// Resolve the layout for a root directory using the configured
    /// (vault-relative) derived-state paths.
    pub fn new(root: impl AsRef<Path>, config: &crate::config::OriConfig) -> Self {
        let root = root.as_ref().to_path_buf();
        Self {
            notes_dir: root.join("notes"),
            inbox_dir: root.join("inbox"),
            db_path: root.join(&config.engine.db_path),
            log_path: root.join(&config.ips.log_path),
            model_dir: root.join(&config.engine.model_dir),
            root,
        }
    }
}
