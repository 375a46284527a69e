//! Multi-source search stage.
//!
//! Runs every configuration of the search plan in order against the
//! provider, merges the results through a [`HitMerger`], and returns the
//! top hits by lexical score.
//!
//! A configuration that fails (timeout, non-200, undecodable body) is
//! logged and contributes nothing; the remaining configurations still run.

use arbitration_core::models::{QueryPair, SearchHit};
use arbitration_core::search::{search_plan, HitMerger, MAX_CONFIGS};
use std::time::Instant;
use tracing::{info, warn};

use crate::search_provider::SearchProvider;

/// Search all configured sources and return at most `limit` hits.
pub async fn multi_search(
    provider: &dyn SearchProvider,
    queries: &QueryPair,
    results_per_query: u32,
    limit: usize,
) -> Vec<SearchHit> {
    let mut merger = HitMerger::new();

    for config in search_plan(queries).into_iter().take(MAX_CONFIGS) {
        let started = Instant::now();
        match provider.search(&config.query, results_per_query).await {
            Ok(results) => {
                let raw = results.len();
                let mut accepted = 0usize;
                for r in results {
                    let Some(link) = r.link.as_deref() else {
                        continue;
                    };
                    if merger.offer(
                        config.label,
                        r.title.as_deref().unwrap_or(""),
                        link,
                        r.snippet.as_deref().unwrap_or(""),
                    ) {
                        accepted += 1;
                    }
                }
                info!(
                    label = config.label,
                    raw,
                    accepted,
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "search configuration done"
                );
            }
            Err(e) => {
                warn!(label = config.label, error = %e, "search configuration failed");
            }
        }
    }

    merger.finish(limit)
}
