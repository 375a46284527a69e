//! Estimation pipeline orchestrator.
//!
//! Runs the stages in fixed order over one [`WorkflowState`]:
//!
//! ```text
//! expand + search ──▶ fetch ──▶ rank ──▶ synthesize ──▶ finish
//! ```
//!
//! Each stage takes the state by value and returns it. Only the search
//! stage can fail a run (no search credential, or zero hits); once the
//! state carries an error, every later stage passes it through untouched.
//! Fetch, rank and synthesis degrade instead of failing.
//!
//! Providers are held behind trait objects so tests can inject stubs with
//! [`Pipeline::new`]; [`Pipeline::from_config`] wires the real clients from
//! configuration and environment.

use anyhow::{Context, Result};
use arbitration_core::embedding::Embedder;
use arbitration_core::rank::{assign_similarities, rank};
use arbitration_core::state::WorkflowState;
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, info_span, warn, Instrument};

use crate::config::{Config, Credentials};
use crate::expand::expand;
use crate::fetch::{fetch_documents, PageFetcher, ReqwestPageFetcher};
use crate::llm::{ChatModel, OpenAiCompatibleChat};
use crate::search::multi_search;
use crate::search_provider::{SearchProvider, SerpApiProvider};
use crate::synthesize::synthesize;

pub const NO_RESULTS_MESSAGE: &str = "No search results found.";

pub fn missing_search_credential_message(api_key_env: &str) -> String {
    format!("{} not found. Cannot search for similar cases.", api_key_env)
}

/// Provider handles used by a [`Pipeline`].
///
/// `search` and `chat` are `None` when their credential is absent.
#[derive(Clone)]
pub struct PipelineParts {
    pub search: Option<Arc<dyn SearchProvider>>,
    pub fetcher: Arc<dyn PageFetcher>,
    pub embedder: Arc<dyn Embedder>,
    pub chat: Option<Arc<dyn ChatModel>>,
}

#[derive(Clone)]
pub struct Pipeline {
    config: Config,
    parts: PipelineParts,
}

impl Pipeline {
    pub fn new(config: Config, parts: PipelineParts) -> Self {
        Self { config, parts }
    }

    /// Build the production pipeline.
    ///
    /// Credentials come from the environment variables named in `config`.
    /// The embedder is passed in so one model handle can serve the whole
    /// process.
    pub fn from_config(config: &Config, embedder: Arc<dyn Embedder>) -> Result<Self> {
        let creds = Credentials::from_env(config);

        let search: Option<Arc<dyn SearchProvider>> = match creds.search_api_key {
            Some(key) => Some(Arc::new(
                SerpApiProvider::new(&config.search, key).context("Failed to build search client")?,
            )),
            None => None,
        };

        let chat: Option<Arc<dyn ChatModel>> = match creds.llm_api_key {
            Some(key) => Some(Arc::new(
                OpenAiCompatibleChat::new(&config.llm, key).context("Failed to build LLM client")?,
            )),
            None => None,
        };

        let fetcher: Arc<dyn PageFetcher> = Arc::new(
            ReqwestPageFetcher::new(&config.fetch).context("Failed to build page fetch client")?,
        );

        Ok(Self::new(
            config.clone(),
            PipelineParts {
                search,
                fetcher,
                embedder,
                chat,
            },
        ))
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn has_search(&self) -> bool {
        self.parts.search.is_some()
    }

    pub fn has_llm(&self) -> bool {
        self.parts.chat.is_some()
    }

    pub fn embedding_model(&self) -> &str {
        self.parts.embedder.model_name()
    }

    /// Run every stage for `query` and return the final state.
    ///
    /// Never returns an error: a failed run is reported through
    /// `WorkflowState::error`.
    pub async fn run(&self, query: &str) -> WorkflowState {
        let state = WorkflowState::new(query);
        let span = info_span!("estimate", run_id = %state.run_id);

        async move {
            let started = Instant::now();
            let state = self.search_stage(state).await;
            let state = self.fetch_stage(state).await;
            let state = self.rank_stage(state).await;
            let state = self.synth_stage(state).await;
            let state = state.finish();

            info!(
                stage = ?state.stage,
                hits = state.search_results.len(),
                docs = state.docs.len(),
                elapsed_ms = started.elapsed().as_millis() as u64,
                "estimate finished"
            );
            state
        }
        .instrument(span)
        .await
    }

    /// Expand the query and search every configured source.
    pub async fn search_stage(&self, mut state: WorkflowState) -> WorkflowState {
        if state.is_failed() {
            return state;
        }
        let Some(provider) = self.parts.search.as_deref() else {
            warn!(env = %self.config.search.api_key_env, "search credential missing");
            return state.fail(missing_search_credential_message(&self.config.search.api_key_env));
        };

        let queries = expand(self.parts.chat.as_deref(), &self.config.expansion, state.query()).await;
        info!(main = %queries.main, amount = %queries.amount_focused, "queries expanded");
        state.enhanced_query = Some(queries.main.clone());
        state.amount_query = Some(queries.amount_focused.clone());

        let hits = multi_search(
            provider,
            &queries,
            self.config.search.results_per_query,
            self.config.search.limit,
        )
        .await;
        info!(hits = hits.len(), "search stage done");
        state.search_results = hits;

        if state.search_results.is_empty() {
            return state.fail(NO_RESULTS_MESSAGE);
        }
        state.advance()
    }

    /// Fetch each hit's page, falling back to its snippet.
    pub async fn fetch_stage(&self, mut state: WorkflowState) -> WorkflowState {
        if state.is_failed() {
            return state;
        }
        state.docs = fetch_documents(
            Arc::clone(&self.parts.fetcher),
            &state.search_results,
            &self.config.fetch,
        )
        .await;
        state.advance()
    }

    /// Order documents by semantic similarity to the user's query.
    ///
    /// If embedding fails every document gets similarity `0.0` and the
    /// fetch order is kept.
    pub async fn rank_stage(&self, mut state: WorkflowState) -> WorkflowState {
        if state.is_failed() {
            return state;
        }
        let started = Instant::now();
        let ranked = rank(
            self.parts.embedder.as_ref(),
            state.query(),
            state.docs.clone(),
            self.config.ranking.doc_prefix_chars,
        )
        .await;

        state.ranked = match ranked {
            Ok(ranked) => {
                info!(
                    model = self.parts.embedder.model_name(),
                    docs = ranked.len(),
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "rank stage done"
                );
                ranked
            }
            Err(e) => {
                warn!(error = %e, "embedding failed, keeping fetch order");
                assign_similarities(state.docs.clone(), &[])
            }
        };
        state.advance()
    }

    /// Write the analysis report.
    pub async fn synth_stage(&self, mut state: WorkflowState) -> WorkflowState {
        if state.is_failed() {
            return state;
        }
        let report = synthesize(
            self.parts.chat.as_deref(),
            &self.config.synthesis,
            &self.config.llm.api_key_env,
            state.query(),
            &state.ranked,
        )
        .await;
        state.llm_response = Some(report);
        state.advance()
    }
}
