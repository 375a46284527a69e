//! Search plan and deduplicating hit merger.
//!
//! The multi-source search runs a fixed, ordered list of
//! [`SearchConfig`]s. Raw results from every configuration flow through a
//! [`HitMerger`], which keeps only the first occurrence of each URL,
//! scores it, and finally returns the hits sorted by score.
//!
//! # Ordering
//!
//! 1. Hits are accumulated in configuration order, then provider order.
//! 2. A URL already seen in this search call is skipped.
//! 3. [`HitMerger::finish`] sorts by score descending with a stable sort,
//!    so equal scores keep their first-seen order.
//! 4. The list is truncated to the requested limit.

use std::collections::HashSet;

use crate::models::{QueryPair, SearchHit};
use crate::scoring::lexical_score;

/// One provider request: a query string and the label its hits carry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchConfig {
    pub label: &'static str,
    pub query: String,
}

pub const LABEL_AWARD_FOCUSED: &str = "Award-focused (Legal DBs)";
pub const LABEL_CASE_LAW: &str = "Case Law Sites";
pub const LABEL_AMOUNT_SPECIFIC: &str = "Amount-specific";

/// Upper bound on configurations per search call.
pub const MAX_CONFIGS: usize = 3;

/// Build the ordered search plan for a pair of expanded queries.
///
/// The amount-focused query targets investment and arbitration award
/// databases; the broad query targets case-law portals and then a pure
/// amount-phrase search.
pub fn search_plan(queries: &QueryPair) -> Vec<SearchConfig> {
    vec![
        SearchConfig {
            label: LABEL_AWARD_FOCUSED,
            query: format!(
                "{} award damages compensation (site:jusmundi.com OR site:italaw.com OR site:arbitrationindia.com)",
                queries.amount_focused
            ),
        },
        SearchConfig {
            label: LABEL_CASE_LAW,
            query: format!(
                "{} arbitration award final decision (site:manupatra.com OR site:sci.gov.in OR site:hcourt.gov.in)",
                queries.main
            ),
        },
        SearchConfig {
            label: LABEL_AMOUNT_SPECIFIC,
            query: format!(
                "{} \"awarded\" \"crore\" OR \"million\" OR \"USD\" OR \"INR\" arbitration",
                queries.main
            ),
        },
    ]
}

/// Accumulates hits across configurations, deduplicating by URL.
#[derive(Debug, Default)]
pub struct HitMerger {
    seen: HashSet<String>,
    hits: Vec<SearchHit>,
}

impl HitMerger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Offer a raw result from configuration `label`.
    ///
    /// Returns `false` when the result was dropped: empty URL, or a URL
    /// already accepted earlier in this search call.
    pub fn offer(&mut self, label: &str, title: &str, url: &str, snippet: &str) -> bool {
        if url.is_empty() || self.seen.contains(url) {
            return false;
        }
        self.seen.insert(url.to_string());
        self.hits.push(SearchHit {
            title: title.to_string(),
            url: url.to_string(),
            snippet: snippet.to_string(),
            score: lexical_score(title, snippet, url),
            source: label.to_string(),
        });
        true
    }

    pub fn len(&self) -> usize {
        self.hits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hits.is_empty()
    }

    /// Sort by score (desc, stable) and keep at most `limit` hits.
    pub fn finish(self, limit: usize) -> Vec<SearchHit> {
        let mut hits = self.hits;
        hits.sort_by(|a, b| b.score.cmp(&a.score));
        hits.truncate(limit);
        hits
    }
}
