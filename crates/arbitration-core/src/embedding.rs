//! Embedder trait and vector utilities.
//!
//! Defines the [`Embedder`] trait that all embedding backends implement,
//! plus pure helpers for normalization and cosine similarity.
//!
//! Concrete embedders (fastembed, OpenAI, Ollama, caching wrapper) live in
//! the `arbitration-estimator` app crate.

use anyhow::Result;
use async_trait::async_trait;

/// Guards normalization against zero-length vectors.
pub const NORM_EPSILON: f32 = 1e-9;

/// A text embedding backend.
///
/// Implementations must return exactly one vector per input text, in input
/// order, and must be deterministic for identical text.
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Returns the model identifier (e.g. `"all-minilm-l6-v2"`).
    fn model_name(&self) -> &str;

    /// Embed a batch of texts.
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;
}

/// Scale `v` to unit length. A zero vector stays (numerically) zero.
pub fn normalize(v: &[f32]) -> Vec<f32> {
    let norm = v.iter().map(|x| x * x).sum::<f32>().sqrt();
    v.iter().map(|x| x / (norm + NORM_EPSILON)).collect()
}

/// Cosine similarity between two embedding vectors.
///
/// Both vectors are normalized before the dot product. The result is
/// clamped to `[-1.0, 1.0]`. Returns `0.0` for empty vectors or vectors of
/// different lengths.
///
/// ```text
///            a · b
/// cos(θ) = ─────────
///          ‖a‖ × ‖b‖
/// ```
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let a = normalize(a);
    let b = normalize(b);
    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();

    if dot.is_nan() {
        return 0.0;
    }
    dot.clamp(-1.0, 1.0)
}
