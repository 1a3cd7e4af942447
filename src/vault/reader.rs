//! Corpus reading — header splitting, link extraction, title mentions.
//!
//! Note files are optional YAML headers between `---` lines followed by a
//! free-text body. A missing or malformed header yields a body-only note
//! with a non-fatal warning; schema validation beyond that is a
//! collaborator's concern. Link tokens are `[[target title]]` occurrences
//! in the body.

use anyhow::{Context, Result};
use chrono::NaiveDate;
use regex::Regex;
use std::path::Path;
use std::sync::OnceLock;
use tracing::warn;

use super::note::{Note, NoteStatus, NoteType, Space};
use super::VaultLayout;

/// The parsed corpus plus any non-fatal warnings collected while reading.
#[derive(Debug, Default)]
pub struct Corpus {
    /// Sorted by title. Index positions are stable for a given vault state
    /// and shared with the link graph arena.
    pub notes: Vec<Note>,
    pub warnings: Vec<String>,
}

impl Corpus {
    pub fn is_empty(&self) -> bool {
        self.notes.is_empty()
    }

    pub fn len(&self) -> usize {
        self.notes.len()
    }

    pub fn get(&self, title: &str) -> Option<&Note> {
        self.notes
            .binary_search_by(|n| n.title.as_str().cmp(title))
            .ok()
            .map(|i| &self.notes[i])
    }

    pub fn titles(&self) -> Vec<String> {
        self.notes.iter().map(|n| n.title.clone()).collect()
    }
}

/// A detected mention of an existing title inside a body, suitable for
/// promotion to a `[[link]]` by the capture collaborator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TitleMention {
    /// Byte offset of the match start.
    pub start: usize,
    /// Byte offset one past the match end.
    pub end: usize,
    /// The canonical title that matched (not the matched text).
    pub title: String,
}

/// Read every `.md` file in the vault's notes directory.
///
/// A missing notes directory yields an empty corpus. Unreadable files are
/// skipped with a warning; the loop never fails on a single bad file.
pub fn read_corpus(layout: &VaultLayout) -> Result<Corpus> {
    read_corpus_at(&layout.notes_dir)
}

/// Read a corpus from an arbitrary directory of note files.
pub fn read_corpus_at(dir: &Path) -> Result<Corpus> {
    let mut corpus = Corpus::default();
    let today = chrono::Utc::now().date_naive();

    if !dir.exists() {
        corpus
            .warnings
            .push(format!("notes directory missing: {}", dir.display()));
        return Ok(corpus);
    }

    let entries = std::fs::read_dir(dir)
        .with_context(|| format!("failed to list notes directory {}", dir.display()))?;

    let mut paths: Vec<_> = entries
        .filter_map(|e| e.ok().map(|e| e.path()))
        .filter(|p| p.extension().and_then(|e| e.to_str()) == Some("md"))
        .collect();
    paths.sort();

    let space = dir
        .file_name()
        .and_then(|n| n.to_str())
        .map(Space::from_dir_name)
        .unwrap_or(Space::Notes);

    for path in paths {
        let Some(title) = path.file_stem().and_then(|s| s.to_str()) else {
            continue;
        };
        let content = match std::fs::read_to_string(&path) {
            Ok(c) => c,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "skipping unreadable note");
                corpus
                    .warnings
                    .push(format!("unreadable note {}: {e}", path.display()));
                continue;
            }
        };

        let (note, warning) = parse_note(title, &content, space, today);
        if let Some(w) = warning {
            corpus.warnings.push(w);
        }
        corpus.notes.push(note);
    }

    corpus.notes.sort_by(|a, b| a.title.cmp(&b.title));
    Ok(corpus)
}

/// Parse one note file's content. Never fails: a malformed header degrades
/// to a body-only note and a warning.
pub fn parse_note(
    title: &str,
    content: &str,
    space: Space,
    today: NaiveDate,
) -> (Note, Option<String>) {
    let (header, body) = split_header(content);
    let mut note = Note::body_only(title, body, today);
    note.space = space;
    note.links = extract_links(body);

    let warning = match header {
        HeaderBlock::None => None,
        HeaderBlock::Malformed => {
            warn!(title, "malformed note header, treating as body-only");
            Some(format!("malformed header in note '{title}'"))
        }
        HeaderBlock::Yaml(raw) => match serde_yaml::from_str::<serde_yaml::Value>(raw) {
            Ok(value) => {
                apply_header(&mut note, &value);
                None
            }
            Err(e) => {
                warn!(title, error = %e, "unparseable note header, treating as body-only");
                Some(format!("unparseable header in note '{title}': {e}"))
            }
        },
    };

    // last_accessed can never precede creation
    if note.last_accessed < note.created {
        note.last_accessed = note.created;
    }

    (note, warning)
}

enum HeaderBlock<'a> {
    None,
    Malformed,
    Yaml(&'a str),
}

/// Split an optional `---`-delimited header block from the body.
fn split_header(content: &str) -> (HeaderBlock<'_>, &str) {
    let Some(rest) = content.strip_prefix("---") else {
        return (HeaderBlock::None, content);
    };
    // The opening fence must be alone on its line
    let Some(rest) = rest.strip_prefix('\n').or_else(|| rest.strip_prefix("\r\n")) else {
        return (HeaderBlock::None, content);
    };

    for (offset, line) in line_offsets(rest) {
        if line.trim_end() == "---" {
            let header = &rest[..offset];
            let body_start = offset + line.len();
            let body = rest[body_start..].trim_start_matches(['\r', '\n']);
            return (HeaderBlock::Yaml(header), body);
        }
    }

    // Opening fence without a closing one
    (HeaderBlock::Malformed, content)
}

/// Iterate lines with their byte offsets, line terminators included.
fn line_offsets(s: &str) -> impl Iterator<Item = (usize, &str)> {
    let mut offset = 0;
    s.split_inclusive('\n').map(move |line| {
        let at = offset;
        offset += line.len();
        (at, line)
    })
}

/// Copy recognized header keys onto the note. Unknown keys are ignored;
/// unparseable values keep the default (validation is not the engine's job).
fn apply_header(note: &mut Note, value: &serde_yaml::Value) {
    if !value.is_mapping() {
        return;
    }

    if let Some(t) = str_key(value, "type") {
        if let Ok(parsed) = t.parse::<NoteType>() {
            note.note_type = parsed;
        }
    }
    if let Some(d) = str_key(value, "description") {
        let trimmed = d.trim();
        if !trimmed.is_empty() {
            note.description = Some(trimmed.to_string());
        }
    }
    if let Some(s) = str_key(value, "status") {
        if let Ok(parsed) = s.parse::<NoteStatus>() {
            note.status = parsed;
        }
    }
    if let Some(projects) = value.get("project") {
        note.projects = match projects {
            serde_yaml::Value::String(s) => vec![s.trim().to_string()],
            serde_yaml::Value::Sequence(seq) => seq
                .iter()
                .filter_map(|v| v.as_str())
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect(),
            _ => Vec::new(),
        };
    }
    if let Some(d) = str_key(value, "created").and_then(parse_date) {
        note.created = d;
        note.last_accessed = d;
    }
    if let Some(d) = str_key(value, "last_accessed").and_then(parse_date) {
        note.last_accessed = d;
    }
    if let Some(n) = value.get("access_count").and_then(|v| v.as_u64()) {
        note.access_count = n.min(u32::MAX as u64) as u32;
    }
}

fn str_key<'a>(value: &'a serde_yaml::Value, key: &str) -> Option<&'a str> {
    value.get(key).and_then(|v| v.as_str())
}

fn parse_date(s: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d").ok()
}

fn link_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\[\[([^\[\]]+)\]\]").expect("link pattern is valid"))
}

/// Extract distinct outgoing link targets from a body, trimmed, in order
/// of first appearance. Case is preserved — titles are case-sensitive.
pub fn extract_links(body: &str) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    let mut links = Vec::new();
    for cap in link_regex().captures_iter(body) {
        let target = cap[1].trim();
        if !target.is_empty() && seen.insert(target.to_string()) {
            links.push(target.to_string());
        }
    }
    links
}

/// Byte spans of all `[[...]]` tokens in a body.
fn link_spans(body: &str) -> Vec<(usize, usize)> {
    link_regex()
        .find_iter(body)
        .map(|m| (m.start(), m.end()))
        .collect()
}

/// Find every non-overlapping mention of an existing title inside a body.
///
/// Titles are matched case-insensitively with word-boundary semantics and a
/// slug-flexible inner pattern: interior dashes match dash-or-whitespace and
/// whitespace matches whitespace-or-dash. Longer titles win overlapping
/// positions, and text already inside `[[ ]]` is never matched.
pub fn find_title_mentions(body: &str, titles: &[String]) -> Vec<TitleMention> {
    let mut ordered: Vec<&String> = titles.iter().collect();
    ordered.sort_by(|a, b| b.chars().count().cmp(&a.chars().count()).then(a.cmp(b)));

    let mut claimed = link_spans(body);
    let mut mentions = Vec::new();

    for title in ordered {
        let Ok(re) = Regex::new(&mention_pattern(title)) else {
            continue;
        };
        for m in re.find_iter(body) {
            let span = (m.start(), m.end());
            if overlaps_any(span, &claimed) {
                continue;
            }
            claimed.push(span);
            mentions.push(TitleMention {
                start: span.0,
                end: span.1,
                title: title.clone(),
            });
        }
    }

    mentions.sort_by_key(|m| m.start);
    mentions
}

/// Build the slug-flexible, case-insensitive pattern for one title.
fn mention_pattern(title: &str) -> String {
    let mut pattern = String::from(r"(?i)\b");
    let mut in_separator = false;
    for c in title.trim().chars() {
        if c == '-' || c.is_whitespace() {
            if !in_separator {
                pattern.push_str(r"[\s-]+");
                in_separator = true;
            }
        } else {
            pattern.push_str(&regex::escape(&c.to_string()));
            in_separator = false;
        }
    }
    pattern.push_str(r"\b");
    pattern
}

fn overlaps_any(span: (usize, usize), claimed: &[(usize, usize)]) -> bool {
    claimed.iter().any(|&(s, e)| span.0 < e && s < span.1)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 8, 1).unwrap()
    }

    #[test]
    fn parses_full_header() {
        let content = "---\ntype: decision\ndescription: Chose sqlite over sled\nproject:\n  - infra\n  - storage\nstatus: active\ncreated: 2026-01-15\nlast_accessed: 2026-03-02\naccess_count: 7\n---\nWe compared [[storage options]] and settled.\n";
        let (note, warning) = parse_note("db choice", content, Space::Notes, today());

        assert!(warning.is_none());
        assert_eq!(note.note_type, NoteType::Decision);
        assert_eq!(note.description.as_deref(), Some("Chose sqlite over sled"));
        assert_eq!(note.projects, vec!["infra", "storage"]);
        assert_eq!(note.status, NoteStatus::Active);
        assert_eq!(note.created, NaiveDate::from_ymd_opt(2026, 1, 15).unwrap());
        assert_eq!(
            note.last_accessed,
            NaiveDate::from_ymd_opt(2026, 3, 2).unwrap()
        );
        assert_eq!(note.access_count, 7);
        assert_eq!(note.links, vec!["storage options"]);
        assert!(note.body.starts_with("We compared"));
    }

    #[test]
    fn missing_header_is_body_only_without_warning() {
        let (note, warning) = parse_note("plain", "just a body", Space::Notes, today());
        assert!(warning.is_none());
        assert_eq!(note.body, "just a body");
        assert_eq!(note.note_type, NoteType::Idea);
        assert_eq!(note.created, today());
    }

    #[test]
    fn unterminated_header_warns_and_keeps_body() {
        let content = "---\ntype: idea\nno closing fence";
        let (note, warning) = parse_note("broken", content, Space::Notes, today());
        assert!(warning.is_some());
        assert_eq!(note.body, content);
    }

    #[test]
    fn unparseable_yaml_warns() {
        let content = "---\ntype: [unclosed\n---\nbody text\n";
        let (note, warning) = parse_note("bad yaml", content, Space::Notes, today());
        assert!(warning.is_some());
        assert_eq!(note.body, "body text\n");
        assert_eq!(note.note_type, NoteType::Idea);
    }

    #[test]
    fn project_accepts_single_string() {
        let content = "---\nproject: infra\n---\nbody\n";
        let (note, _) = parse_note("p", content, Space::Notes, today());
        assert_eq!(note.projects, vec!["infra"]);
    }

    #[test]
    fn last_accessed_clamped_to_created() {
        let content = "---\ncreated: 2026-02-01\nlast_accessed: 2025-01-01\n---\nbody\n";
        let (note, _) = parse_note("clamp", content, Space::Notes, today());
        assert_eq!(note.last_accessed, note.created);
    }

    #[test]
    fn extract_links_dedups_and_trims() {
        let body = "See [[ alpha ]] then [[beta]] and [[alpha]] again, but not [[]]";
        assert_eq!(extract_links(body), vec!["alpha", "beta"]);
    }

    #[test]
    fn links_are_case_sensitive() {
        let body = "[[Alpha]] and [[alpha]]";
        assert_eq!(extract_links(body), vec!["Alpha", "alpha"]);
    }

    #[test]
    fn mentions_match_case_insensitively_with_word_boundaries() {
        let titles = vec!["rate limiter".to_string()];
        let mentions = find_title_mentions("The Rate Limiter needs work", &titles);
        assert_eq!(mentions.len(), 1);
        assert_eq!(mentions[0].title, "rate limiter");
        assert_eq!(
            &"The Rate Limiter needs work"[mentions[0].start..mentions[0].end],
            "Rate Limiter"
        );
    }

    #[test]
    fn mentions_are_slug_flexible() {
        let titles = vec!["rate-limiter".to_string()];
        let body = "the rate limiter broke";
        let mentions = find_title_mentions(body, &titles);
        assert_eq!(mentions.len(), 1);
        assert_eq!(&body[mentions[0].start..mentions[0].end], "rate limiter");

        let titles = vec!["rate limiter".to_string()];
        let body = "the rate-limiter broke";
        let mentions = find_title_mentions(body, &titles);
        assert_eq!(mentions.len(), 1);
    }

    #[test]
    fn mentions_skip_existing_links() {
        let titles = vec!["alpha".to_string()];
        let body = "[[alpha]] and alpha again";
        let mentions = find_title_mentions(body, &titles);
        assert_eq!(mentions.len(), 1);
        assert_eq!(&body[mentions[0].start..mentions[0].end], "alpha");
        assert!(mentions[0].start > 9);
    }

    #[test]
    fn longer_titles_claim_overlapping_text() {
        let titles = vec!["cache".to_string(), "cache invalidation".to_string()];
        let body = "thinking about cache invalidation today";
        let mentions = find_title_mentions(body, &titles);
        assert_eq!(mentions.len(), 1);
        assert_eq!(mentions[0].title, "cache invalidation");
    }

    #[test]
    fn no_partial_word_mentions() {
        let titles = vec!["broker".to_string()];
        let mentions = find_title_mentions("the brokerage account", &titles);
        assert!(mentions.is_empty());
    }

    #[test]
    fn read_corpus_missing_dir_is_empty_with_warning() {
        let tmp = tempfile::TempDir::new().unwrap();
        let corpus = read_corpus_at(&tmp.path().join("notes")).unwrap();
        assert!(corpus.is_empty());
        assert_eq!(corpus.warnings.len(), 1);
    }

    #[test]
    fn read_corpus_sorts_by_title_and_skips_non_md() {
        let tmp = tempfile::TempDir::new().unwrap();
        let dir = tmp.path().join("notes");
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join("zeta.md"), "z body").unwrap();
        std::fs::write(dir.join("alpha.md"), "a body").unwrap();
        std::fs::write(dir.join("ignored.txt"), "not a note").unwrap();

        let corpus = read_corpus_at(&dir).unwrap();
        assert_eq!(corpus.len(), 2);
        assert_eq!(corpus.notes[0].title, "alpha");
        assert_eq!(corpus.notes[1].title, "zeta");
        assert!(corpus.get("alpha").is_some());
        assert!(corpus.get("missing").is_none());
    }
}
