//! Core data models that flow through the estimation pipeline.
//!
//! A [`SearchHit`] lives only inside the search stage. Each surviving hit
//! becomes exactly one [`Document`] in the fetch stage, which the ranker
//! later annotates with a similarity value.

use serde::{Deserialize, Serialize};

/// The two search strings produced by query expansion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryPair {
    /// Broad query: case type, jurisdiction, legal issues.
    pub main: String,
    /// Query focused on monetary outcomes (awards, damages, amounts).
    pub amount_focused: String,
}

impl QueryPair {
    /// Both queries set to the user's own text.
    pub fn fallback(user_query: &str) -> Self {
        Self {
            main: user_query.to_string(),
            amount_focused: user_query.to_string(),
        }
    }
}

/// A scored hit from one search configuration.
///
/// `url` is unique across one search call; `source` is the label of the
/// configuration that saw the URL first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchHit {
    pub title: String,
    pub url: String,
    pub snippet: String,
    /// Lexical relevance points (see [`crate::scoring`]).
    pub score: u32,
    pub source: String,
}

/// A candidate case document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub url: String,
    pub title: String,
    /// Extracted page text, or the search snippet when extraction failed.
    pub text: String,
    /// True iff `text` came from a successful page extraction.
    pub full_fetch: bool,
    pub score: u32,
    pub source: String,
    /// Cosine similarity to the query. `None` until the ranker has run.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub similarity: Option<f32>,
}

impl Document {
    /// Degraded document carrying the hit's snippet as its text.
    pub fn from_snippet(hit: &SearchHit) -> Self {
        Self {
            url: hit.url.clone(),
            title: hit.title.clone(),
            text: hit.snippet.clone(),
            full_fetch: false,
            score: hit.score,
            source: hit.source.clone(),
            similarity: None,
        }
    }

    /// Fully fetched document carrying extracted page text.
    pub fn from_page(hit: &SearchHit, text: String) -> Self {
        Self {
            url: hit.url.clone(),
            title: hit.title.clone(),
            text,
            full_fetch: true,
            score: hit.score,
            source: hit.source.clone(),
            similarity: None,
        }
    }

    /// Similarity as a value, `0.0` before ranking.
    pub fn similarity_or_zero(&self) -> f32 {
        self.similarity.unwrap_or(0.0)
    }
}
