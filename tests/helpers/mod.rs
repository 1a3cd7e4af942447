#![allow(dead_code)]

use ori::config::OriConfig;
use ori::Engine;
use tempfile::TempDir;

/// Engine config for tests: the deterministic hashed provider, small
/// dimension, no model files needed.
pub fn test_config() -> OriConfig {
    let mut config = OriConfig::default();
    config.engine.embedding_model = "hashed".into();
    config.engine.embedding_dims = 64;
    config
}

/// A fresh vault on disk (marker, notes dir) plus an engine over it.
pub fn test_vault() -> (TempDir, Engine) {
    test_vault_with(test_config())
}

pub fn test_vault_with(config: OriConfig) -> (TempDir, Engine) {
    let tmp = TempDir::new().unwrap();
    std::fs::write(tmp.path().join(".ori"), "").unwrap();
    std::fs::create_dir_all(tmp.path().join("notes")).unwrap();
    let engine = Engine::with_config(tmp.path(), config).unwrap();
    (tmp, engine)
}

/// Write a body-only note file.
pub fn write_note(vault: &TempDir, title: &str, body: &str) {
    std::fs::write(
        vault.path().join("notes").join(format!("{title}.md")),
        body,
    )
    .unwrap();
}

/// Write a note with a full metadata header.
#[allow(clippy::too_many_arguments)]
pub fn write_note_with_header(
    vault: &TempDir,
    title: &str,
    note_type: &str,
    description: &str,
    projects: &[&str],
    created: &str,
    access_count: u32,
    body: &str,
) {
    let mut content = String::from("---\n");
    content.push_str(&format!("type: {note_type}\n"));
    if !description.is_empty() {
        content.push_str(&format!("description: {description}\n"));
    }
    if !projects.is_empty() {
        content.push_str("project:\n");
        for p in projects {
            content.push_str(&format!("  - {p}\n"));
        }
    }
    content.push_str("status: active\n");
    content.push_str(&format!("created: {created}\n"));
    content.push_str(&format!("last_accessed: {created}\n"));
    content.push_str(&format!("access_count: {access_count}\n"));
    content.push_str("---\n");
    content.push_str(body);
    write_note(vault, title, &content);
}

/// Delete a note file.
pub fn delete_note(vault: &TempDir, title: &str) {
    std::fs::remove_file(vault.path().join("notes").join(format!("{title}.md"))).unwrap();
}
