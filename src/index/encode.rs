//! Vector encodings for the embedding index.
//!
//! Covers everything that is not the text model: the piecewise-linear
//! encoding that turns scalar signals into cosine-comparable vectors, the
//! type one-hot, the deterministic community projection, the enriched body
//! text, content fingerprints, and cosine similarity itself.

use sha2::{Digest, Sha256};

use crate::vault::note::{Note, NoteType};

/// Fixed primes for the community projection.
const PROJECTION_PRIMES: [u64; 16] = [2, 3, 5, 7, 11, 13, 17, 19, 23, 29, 31, 37, 41, 43, 47, 53];

/// How many outgoing link targets the enriched body mentions.
const MAX_CONNECTED: usize = 10;

/// Piecewise-linear encoding of `v` in [0, 1] into `bins` bins.
///
/// Bins strictly below `floor(v * bins)` are 1, the bin containing
/// `v * bins` holds the fractional part, higher bins are 0. `v = 1` sets
/// every bin. The result is monotone per bin, so cosine similarity against
/// `encode(1.0)` is monotone in `v`.
pub fn piecewise_encode(v: f64, bins: usize) -> Vec<f32> {
    let v = v.clamp(0.0, 1.0);
    let scaled = v * bins as f64;
    let full = scaled.floor() as usize;

    let mut out = vec![0.0f32; bins];
    for slot in out.iter_mut().take(full.min(bins)) {
        *slot = 1.0;
    }
    if full < bins {
        out[full] = (scaled - full as f64) as f32;
    }
    out
}

/// One-hot vector over the six note types.
pub fn one_hot_type(note_type: NoteType) -> Vec<f32> {
    let mut v = vec![0.0f32; NoteType::ALL.len()];
    v[note_type.slot()] = 1.0;
    v
}

/// Deterministic low-dimensional projection of a community id: alternating
/// sine/cosine of `community_id * prime_d / total_communities`. Zero when
/// there are no communities.
pub fn community_projection(community_id: usize, total_communities: usize, dims: usize) -> Vec<f32> {
    if total_communities == 0 {
        return vec![0.0; dims];
    }
    (0..dims)
        .map(|d| {
            let prime = PROJECTION_PRIMES[d % PROJECTION_PRIMES.len()] as f64;
            let angle = community_id as f64 * prime / total_communities as f64;
            if d % 2 == 0 {
                angle.sin() as f32
            } else {
                angle.cos() as f32
            }
        })
        .collect()
}

/// The text embedded as the note's body vector: a `[TYPE] [projects]`
/// prefix line, the title, the description, and up to ten outgoing link
/// targets. The raw body text is deliberately absent — it only feeds the
/// content fingerprint.
pub fn enriched_body(note: &Note) -> String {
    let mut out = String::new();

    out.push('[');
    out.push_str(&note.note_type.as_str().to_uppercase());
    out.push(']');
    if !note.projects.is_empty() {
        out.push_str(" [");
        out.push_str(&note.projects.join(", "));
        out.push(']');
    }
    out.push('\n');

    out.push_str(&note.title);
    out.push('\n');
    if let Some(desc) = &note.description {
        out.push_str(desc);
        out.push('\n');
    }
    if !note.links.is_empty() {
        let connected: Vec<&str> = note
            .links
            .iter()
            .take(MAX_CONNECTED)
            .map(String::as_str)
            .collect();
        out.push_str("Connected: ");
        out.push_str(&connected.join(", "));
    }

    out
}

/// Hex-encoded SHA-256 over `title \n description \n body` — the content
/// fingerprint that gates incremental rebuilds.
pub fn content_hash(note: &Note) -> String {
    let mut hasher = Sha256::new();
    hasher.update(note.title.as_bytes());
    hasher.update(b"\n");
    hasher.update(note.description.as_deref().unwrap_or("").as_bytes());
    hasher.update(b"\n");
    hasher.update(note.body.as_bytes());
    let digest = hasher.finalize();
    digest.iter().map(|b| format!("{b:02x}")).collect()
}

/// Cosine similarity. Zero if either vector is zero or lengths differ.
pub fn cosine(a: &[f32], b: &[f32]) -> f64 {
    if a.len() != b.len() {
        return 0.0;
    }
    let mut dot = 0.0f64;
    let mut norm_a = 0.0f64;
    let mut norm_b = 0.0f64;
    for (&x, &y) in a.iter().zip(b.iter()) {
        dot += x as f64 * y as f64;
        norm_a += x as f64 * x as f64;
        norm_b += y as f64 * y as f64;
    }
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a.sqrt() * norm_b.sqrt())
}
