//! End-to-end pipeline runs with in-process providers.

use anyhow::Result;
use arbitration_core::embedding::Embedder;
use arbitration_core::search::{LABEL_AWARD_FOCUSED, LABEL_CASE_LAW};
use arbitration_core::state::PipelineStage;
use arbitration_estimator::config::Config;
use arbitration_estimator::fetch::{FailureKind, FetchError, PageFetcher};
use arbitration_estimator::llm::{ChatModel, ChatRequest, LlmError};
use arbitration_estimator::pipeline::{Pipeline, PipelineParts, NO_RESULTS_MESSAGE};
use arbitration_estimator::search_provider::{OrganicResult, SearchError, SearchProvider};
use arbitration_estimator::synthesize::NO_DOCUMENTS_MESSAGE;
use async_trait::async_trait;
use pretty_assertions::assert_eq;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

// ─── Stub providers ─────────────────────────────────────────────────

/// Replies per call index; `None` simulates a provider failure.
struct ScriptedSearch {
    pages: Vec<Option<Vec<OrganicResult>>>,
    queries: Mutex<Vec<String>>,
}

impl ScriptedSearch {
    fn new(pages: Vec<Option<Vec<OrganicResult>>>) -> Self {
        Self {
            pages,
            queries: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl SearchProvider for ScriptedSearch {
    async fn search(&self, query: &str, _num: u32) -> Result<Vec<OrganicResult>, SearchError> {
        let call = {
            let mut queries = self.queries.lock().unwrap();
            queries.push(query.to_string());
            queries.len() - 1
        };
        match self.pages.get(call) {
            Some(Some(results)) => Ok(results.clone()),
            Some(None) => Err(SearchError::Status(500)),
            None => Ok(Vec::new()),
        }
    }
}

fn result(url: &str, title: &str, snippet: &str) -> OrganicResult {
    OrganicResult {
        link: Some(url.to_string()),
        title: Some(title.to_string()),
        snippet: Some(snippet.to_string()),
    }
}

struct Offline;

#[async_trait]
impl PageFetcher for Offline {
    async fn fetch(&self, _url: &str) -> Result<String, FetchError> {
        Err(FetchError::new(FailureKind::Network, "connection refused"))
    }
}

struct StaticPages(HashMap<String, String>);

#[async_trait]
impl PageFetcher for StaticPages {
    async fn fetch(&self, url: &str) -> Result<String, FetchError> {
        self.0
            .get(url)
            .cloned()
            .ok_or_else(|| FetchError::new(FailureKind::HttpStatus(404), "not found"))
    }
}

/// Two-dimensional embedding: does the text mention a tribunal or not.
struct TribunalEmbedder;

#[async_trait]
impl Embedder for TribunalEmbedder {
    fn model_name(&self) -> &str {
        "tribunal"
    }

    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        Ok(texts
            .iter()
            .map(|t| {
                if t.to_lowercase().contains("tribunal") {
                    vec![1.0, 0.0]
                } else {
                    vec![0.0, 1.0]
                }
            })
            .collect())
    }
}

struct BrokenEmbedder;

#[async_trait]
impl Embedder for BrokenEmbedder {
    fn model_name(&self) -> &str {
        "broken"
    }

    async fn embed(&self, _texts: &[String]) -> Result<Vec<Vec<f32>>> {
        anyhow::bail!("model download failed")
    }
}

struct RecordingChat {
    reply: String,
    seen: Mutex<Vec<ChatRequest>>,
}

impl RecordingChat {
    fn new(reply: &str) -> Self {
        Self {
            reply: reply.to_string(),
            seen: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl ChatModel for RecordingChat {
    fn model_name(&self) -> &str {
        "recording"
    }

    async fn complete(&self, request: &ChatRequest) -> Result<String, LlmError> {
        self.seen.lock().unwrap().push(request.clone());
        Ok(self.reply.clone())
    }
}

fn pipeline(
    search: Option<Arc<dyn SearchProvider>>,
    fetcher: Arc<dyn PageFetcher>,
    embedder: Arc<dyn Embedder>,
    chat: Option<Arc<dyn ChatModel>>,
) -> Pipeline {
    Pipeline::new(
        Config::default(),
        PipelineParts {
            search,
            fetcher,
            embedder,
            chat,
        },
    )
}

/// Three hits whose lexical scores are 2, 8 and 5, in that provider order.
fn three_hits() -> Vec<OrganicResult> {
    vec![
        result("https://c.test/2", "Hearing", "the tribunal met"),
        result("https://a.test/8", "Claim", "damages of USD 4 million"),
        result("https://b.test/5", "Report", "a sum of 3 million"),
    ]
}

// ─── Scenarios ──────────────────────────────────────────────────────

#[tokio::test]
async fn test_zero_hits_fails_the_run() {
    let search = Arc::new(ScriptedSearch::new(vec![]));
    let p = pipeline(
        Some(search.clone()),
        Arc::new(Offline),
        Arc::new(TribunalEmbedder),
        None,
    );

    let state = p.run("Construction delay dispute, $50M project").await;

    assert_eq!(state.stage, PipelineStage::Failed);
    assert_eq!(state.error.as_deref(), Some(NO_RESULTS_MESSAGE));
    assert!(state.search_results.is_empty());
    assert!(state.docs.is_empty());
    assert!(state.ranked.is_empty());
    assert_eq!(state.llm_response, None);
    assert!(state.finished_at.is_some());
    // All three configurations were tried.
    assert_eq!(search.queries.lock().unwrap().len(), 3);
}

#[tokio::test]
async fn test_all_fetches_failing_degrades_to_snippets() {
    let search = Arc::new(ScriptedSearch::new(vec![Some(three_hits())]));
    let chat = Arc::new(RecordingChat::new("Estimated award: USD 3-5 million."));
    let p = pipeline(
        Some(search),
        Arc::new(Offline),
        Arc::new(TribunalEmbedder),
        Some(chat.clone()),
    );

    let state = p.run("tribunal delay dispute").await;

    assert_eq!(state.stage, PipelineStage::Done);
    assert_eq!(state.error, None);

    let scores: Vec<u32> = state.search_results.iter().map(|h| h.score).collect();
    assert_eq!(scores, vec![8, 5, 2]);

    assert_eq!(state.docs.len(), 3);
    assert!(state.docs.iter().all(|d| !d.full_fetch));
    let texts: Vec<&str> = state.docs.iter().map(|d| d.text.as_str()).collect();
    assert_eq!(
        texts,
        vec!["damages of USD 4 million", "a sum of 3 million", "the tribunal met"]
    );

    // Similarity is computed over snippet text; ties keep fetch order.
    let ranked: Vec<&str> = state.ranked.iter().map(|d| d.url.as_str()).collect();
    assert_eq!(
        ranked,
        vec!["https://c.test/2", "https://a.test/8", "https://b.test/5"]
    );
    assert!((state.ranked[0].similarity_or_zero() - 1.0).abs() < 1e-5);
    assert!(state.ranked[1].similarity_or_zero().abs() < 1e-5);

    assert_eq!(
        state.llm_response.as_deref(),
        Some("Estimated award: USD 3-5 million.")
    );
    let seen = chat.seen.lock().unwrap();
    // Expansion (non-JSON reply, so it falls back) then synthesis.
    assert_eq!(seen.len(), 2);
    assert!(seen[1].user.contains("TOP 3 MOST RELEVANT CASES"));
    assert!(seen[1].user.contains("the tribunal met"));
}

#[tokio::test]
async fn test_duplicate_url_keeps_first_configuration() {
    let search = Arc::new(ScriptedSearch::new(vec![
        Some(vec![result("https://x.test/a", "first", "award")]),
        Some(vec![
            result("https://x.test/a", "second", "award"),
            result("https://x.test/b", "other", "award"),
        ]),
    ]));
    let p = pipeline(
        Some(search),
        Arc::new(Offline),
        Arc::new(TribunalEmbedder),
        None,
    );

    let state = p.run("q").await;

    let for_a: Vec<_> = state
        .search_results
        .iter()
        .filter(|h| h.url == "https://x.test/a")
        .collect();
    assert_eq!(for_a.len(), 1);
    assert_eq!(for_a[0].source, LABEL_AWARD_FOCUSED);
    assert_eq!(for_a[0].title, "first");

    let b = state
        .search_results
        .iter()
        .find(|h| h.url == "https://x.test/b")
        .unwrap();
    assert_eq!(b.source, LABEL_CASE_LAW);
}

#[tokio::test]
async fn test_failing_configuration_does_not_stop_search() {
    let search = Arc::new(ScriptedSearch::new(vec![
        None,
        Some(vec![result("https://x.test/a", "A", "award")]),
    ]));
    let p = pipeline(
        Some(search),
        Arc::new(Offline),
        Arc::new(TribunalEmbedder),
        None,
    );

    let state = p.run("q").await;
    assert_eq!(state.stage, PipelineStage::Done);
    assert_eq!(state.search_results.len(), 1);
    assert_eq!(state.search_results[0].source, LABEL_CASE_LAW);
}

#[tokio::test]
async fn test_missing_search_credential_fails_before_search() {
    let chat = Arc::new(RecordingChat::new("{}"));
    let p = pipeline(
        None,
        Arc::new(Offline),
        Arc::new(TribunalEmbedder),
        Some(chat.clone()),
    );

    let state = p.run("q").await;

    assert_eq!(state.stage, PipelineStage::Failed);
    assert_eq!(
        state.error.as_deref(),
        Some("SERPAPI_API_KEY not found. Cannot search for similar cases.")
    );
    assert_eq!(state.enhanced_query, None);
    assert!(chat.seen.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_expanded_queries_reach_search_and_state() {
    let search = Arc::new(ScriptedSearch::new(vec![Some(three_hits())]));
    let chat = Arc::new(RecordingChat::new(
        r#"{"main_query": "EPC delay arbitration", "amount_query": "delay damages crore"}"#,
    ));
    let p = pipeline(
        Some(search.clone()),
        Arc::new(Offline),
        Arc::new(TribunalEmbedder),
        Some(chat),
    );

    let state = p.run("Construction delay").await;

    assert_eq!(state.enhanced_query.as_deref(), Some("EPC delay arbitration"));
    assert_eq!(state.amount_query.as_deref(), Some("delay damages crore"));
    let queries = search.queries.lock().unwrap();
    assert!(queries[0].starts_with("delay damages crore "));
    assert!(queries[1].starts_with("EPC delay arbitration "));
    assert!(queries[2].starts_with("EPC delay arbitration "));
}

#[tokio::test]
async fn test_embedding_failure_keeps_fetch_order() {
    let search = Arc::new(ScriptedSearch::new(vec![Some(three_hits())]));
    let p = pipeline(
        Some(search),
        Arc::new(Offline),
        Arc::new(BrokenEmbedder),
        None,
    );

    let state = p.run("tribunal delay").await;

    assert_eq!(state.stage, PipelineStage::Done);
    let docs: Vec<&str> = state.docs.iter().map(|d| d.url.as_str()).collect();
    let ranked: Vec<&str> = state.ranked.iter().map(|d| d.url.as_str()).collect();
    assert_eq!(ranked, docs);
    assert!(state.ranked.iter().all(|d| d.similarity == Some(0.0)));
    assert_eq!(
        state.llm_response.as_deref(),
        Some("GROQ_API_KEY not found. Cannot generate LLM analysis.")
    );
}

#[tokio::test]
async fn test_fetched_pages_become_full_documents() {
    let body = format!(
        "<html><body><footer>site footer</footer><p>{}</p></body></html>",
        "The tribunal awarded damages. ".repeat(10)
    );
    let mut pages = HashMap::new();
    pages.insert("https://a.test/8".to_string(), body);

    let search = Arc::new(ScriptedSearch::new(vec![Some(three_hits())]));
    let p = pipeline(
        Some(search),
        Arc::new(StaticPages(pages)),
        Arc::new(TribunalEmbedder),
        None,
    );

    let state = p.run("tribunal").await;

    let full: Vec<&str> = state
        .docs
        .iter()
        .filter(|d| d.full_fetch)
        .map(|d| d.url.as_str())
        .collect();
    assert_eq!(full, vec!["https://a.test/8"]);
    assert!(!state.docs[0].text.contains("site footer"));
    // Both tribunal documents tie at the top; fetch order breaks the tie.
    assert_eq!(state.ranked[0].url, "https://a.test/8");
    assert_eq!(state.ranked[1].url, "https://c.test/2");
}

#[tokio::test]
async fn test_search_limit_truncates_hits() {
    let mut config = Config::default();
    config.search.limit = 2;
    let p = Pipeline::new(
        config,
        PipelineParts {
            search: Some(Arc::new(ScriptedSearch::new(vec![Some(three_hits())]))),
            fetcher: Arc::new(Offline),
            embedder: Arc::new(TribunalEmbedder),
            chat: None,
        },
    );

    let state = p.run("q").await;
    let scores: Vec<u32> = state.search_results.iter().map(|h| h.score).collect();
    assert_eq!(scores, vec![8, 5]);
    assert_eq!(state.docs.len(), 2);
}

#[tokio::test]
async fn test_synthesis_stage_with_no_ranked_documents() {
    let chat = Arc::new(RecordingChat::new("unused"));
    let p = pipeline(
        None,
        Arc::new(Offline),
        Arc::new(TribunalEmbedder),
        Some(chat.clone()),
    );

    let state = p
        .synth_stage(arbitration_core::state::WorkflowState::new("q"))
        .await;
    assert_eq!(state.llm_response.as_deref(), Some(NO_DOCUMENTS_MESSAGE));
    assert!(chat.seen.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_state_serializes_for_presentation() {
    let search = Arc::new(ScriptedSearch::new(vec![Some(three_hits())]));
    let p = pipeline(
        Some(search),
        Arc::new(Offline),
        Arc::new(TribunalEmbedder),
        None,
    );

    let state = p.run("q").await;
    let json = serde_json::to_value(&state).unwrap();
    assert_eq!(json["stage"], "done");
    assert_eq!(json["query"], "q");
    assert!(json.get("error").is_none());
    assert_eq!(json["ranked"].as_array().unwrap().len(), 3);
    assert!(json["ranked"][0]["similarity"].is_number());
}
