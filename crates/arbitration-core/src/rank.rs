//! Semantic relevance ranking.
//!
//! The query is embedded once, each document's text is embedded from a
//! bounded prefix, and documents are ordered by cosine similarity to the
//! query. The sort is stable, so equal similarities keep their incoming
//! order, and contains no randomness: identical inputs always produce the
//! same order.

use anyhow::{bail, Result};

use crate::embedding::{cosine_similarity, Embedder};
use crate::models::Document;
use crate::text::truncate_chars;

/// Default number of characters of document text fed to the embedder.
pub const DEFAULT_DOC_PREFIX_CHARS: usize = 2048;

/// Rank `docs` by similarity to `query`.
///
/// Returns an empty list for empty input without touching the embedder.
///
/// # Errors
///
/// Fails if the embedder fails or returns the wrong number of vectors.
/// Callers decide how to degrade; see [`assign_similarities`].
pub async fn rank<E: Embedder + ?Sized>(
    embedder: &E,
    query: &str,
    docs: Vec<Document>,
    doc_prefix_chars: usize,
) -> Result<Vec<Document>> {
    if docs.is_empty() {
        return Ok(Vec::new());
    }

    let query_vec = embedder
        .embed(&[query.to_string()])
        .await?
        .into_iter()
        .next()
        .ok_or_else(|| anyhow::anyhow!("Empty embedding response for query"))?;

    let doc_texts: Vec<String> = docs
        .iter()
        .map(|d| truncate_chars(&d.text, doc_prefix_chars).to_string())
        .collect();
    let doc_vecs = embedder.embed(&doc_texts).await?;

    if doc_vecs.len() != docs.len() {
        bail!(
            "Embedder returned {} vectors for {} documents",
            doc_vecs.len(),
            docs.len()
        );
    }

    let sims: Vec<f32> = doc_vecs
        .iter()
        .map(|v| cosine_similarity(&query_vec, v))
        .collect();

    Ok(assign_similarities(docs, &sims))
}

/// Annotate each document with its similarity and sort descending.
///
/// `sims[i]` belongs to `docs[i]`. Missing or non-finite values count as
/// `0.0`. Ties keep their incoming order.
pub fn assign_similarities(mut docs: Vec<Document>, sims: &[f32]) -> Vec<Document> {
    for (i, doc) in docs.iter_mut().enumerate() {
        let sim = sims.get(i).copied().filter(|s| s.is_finite()).unwrap_or(0.0);
        // Adding +0.0 folds -0.0 into 0.0 so the two tie under total_cmp.
        doc.similarity = Some(sim + 0.0);
    }
    docs.sort_by(|a, b| b.similarity_or_zero().total_cmp(&a.similarity_or_zero()));
    docs
}
