//! Text-to-vector embedding providers.
//!
//! The engine treats embedding as a pure `(string) -> vector` function of a
//! fixed dimension. Two realizations: [`local`] runs all-MiniLM-L6-v2 via
//! ONNX Runtime, [`hashed`] is a deterministic token-hashing projection for
//! environments without model files. Provider handles are cached
//! process-wide — loading a local model is expensive.

pub mod hashed;
pub mod local;

use anyhow::Result;
use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, Mutex, OnceLock};

/// Trait for embedding text into vectors.
///
/// Implementations produce L2-normalized vectors of exactly
/// [`dimensions`](Self::dimensions) entries. All methods are synchronous;
/// queries batch their strings into one call since model invocation is the
/// dominant latency term.
pub trait EmbeddingProvider: Send + Sync {
    /// Embed a single text string into a vector.
    fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// Embed a batch of text strings. Implementations may override for
    /// batched inference.
    fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        texts.iter().map(|t| self.embed(t)).collect()
    }

    /// Number of dimensions this provider produces.
    fn dimensions(&self) -> usize;
}

/// Create a provider for a model name. `"hashed"` selects the
/// feature-hashing provider; anything else loads ONNX model files from
/// `model_dir`.
pub fn create_provider(
    model: &str,
    dims: usize,
    model_dir: &Path,
) -> Result<Box<dyn EmbeddingProvider>> {
    match model {
        "hashed" => Ok(Box::new(hashed::HashedProvider::new(dims))),
        _ => {
            let provider = local::LocalProvider::new(model_dir)?;
            Ok(Box::new(provider))
        }
    }
}

/// Fetch or create the process-wide cached provider for a model name.
///
/// The cache is keyed by model name and dimension; two vaults configured
/// with the same model share one handle, while same-named providers with
/// different dimensions never alias.
pub fn cached_provider(
    model: &str,
    dims: usize,
    model_dir: &Path,
) -> Result<Arc<dyn EmbeddingProvider>> {
    static CACHE: OnceLock<Mutex<HashMap<String, Arc<dyn EmbeddingProvider>>>> = OnceLock::new();
    let cache = CACHE.get_or_init(|| Mutex::new(HashMap::new()));

    let mut cache = cache
        .lock()
        .map_err(|e| anyhow::anyhow!("provider cache lock poisoned: {e}"))?;

    let key = format!("{model}@{dims}");
    if let Some(provider) = cache.get(&key) {
        return Ok(provider.clone());
    }

    let provider: Arc<dyn EmbeddingProvider> = Arc::from(create_provider(model, dims, model_dir)?);
    cache.insert(key, provider.clone());
    Ok(provider)
}

/// L2-normalize a vector in place. A zero vector stays zero.
pub(crate) fn l2_normalize(v: &mut [f32]) {
    let norm: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 {
        for x in v.iter_mut() {
            *x /= norm;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn l2_normalize_unit_length() {
        let mut v = vec![3.0, 4.0];
        l2_normalize(&mut v);
        assert!((v[0] - 0.6).abs() < 1e-6);
        assert!((v[1] - 0.8).abs() < 1e-6);
    }

    #[test]
    fn l2_normalize_zero_vector_unchanged() {
        let mut v = vec![0.0, 0.0, 0.0];
        l2_normalize(&mut v);
        assert_eq!(v, vec![0.0, 0.0, 0.0]);
    }

    #[test]
    fn hashed_provider_via_factory() {
        let provider =
            create_provider("hashed", 64, Path::new("/nonexistent")).unwrap();
        assert_eq!(provider.dimensions(), 64);
        let v = provider.embed("hello world").unwrap();
        assert_eq!(v.len(), 64);
    }

    #[test]
    fn cached_provider_returns_same_handle() {
        let a = cached_provider("hashed", 64, Path::new("/nonexistent")).unwrap();
        let b = cached_provider("hashed", 64, Path::new("/nonexistent")).unwrap();
        assert!(Arc::ptr_eq(&a, &b));
    }
}
