//! Workflow state threaded through the pipeline stages.
//!
//! Each stage takes a [`WorkflowState`] by value and hands back the updated
//! state, so there is exactly one owner at any time. Fields written by a
//! stage are never reset by a later stage.
//!
//! # Stage machine
//!
//! ```text
//! Start ──▶ Searched ──▶ Fetched ──▶ Ranked ──▶ Synthesized ──▶ Done
//!   │
//!   └──▶ Failed   (no search hits, or no search credential)
//! ```
//!
//! `Failed` is absorbing: once `error` is set no later stage does work.

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::models::{Document, SearchHit};

/// Position of a run in the stage machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineStage {
    Start,
    Searched,
    Fetched,
    Ranked,
    Synthesized,
    Done,
    Failed,
}

impl PipelineStage {
    /// The unconditional successor on the success path.
    ///
    /// `Done` and `Failed` have no successor.
    pub fn next(self) -> Option<PipelineStage> {
        match self {
            PipelineStage::Start => Some(PipelineStage::Searched),
            PipelineStage::Searched => Some(PipelineStage::Fetched),
            PipelineStage::Fetched => Some(PipelineStage::Ranked),
            PipelineStage::Ranked => Some(PipelineStage::Synthesized),
            PipelineStage::Synthesized => Some(PipelineStage::Done),
            PipelineStage::Done | PipelineStage::Failed => None,
        }
    }
}

/// The single record passed between stages and returned to callers.
#[derive(Debug, Clone, Serialize)]
pub struct WorkflowState {
    /// Unique id of this pipeline invocation.
    pub run_id: Uuid,
    query: String,
    pub stage: PipelineStage,
    /// Broad query derived by expansion.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enhanced_query: Option<String>,
    /// Amount-focused query derived by expansion.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub amount_query: Option<String>,
    pub search_results: Vec<SearchHit>,
    pub docs: Vec<Document>,
    pub ranked: Vec<Document>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub llm_response: Option<String>,
    /// Terminal failure message. Present only when `stage` is `Failed`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub started_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub finished_at: Option<DateTime<Utc>>,
}

impl WorkflowState {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            query: query.into(),
            stage: PipelineStage::Start,
            enhanced_query: None,
            amount_query: None,
            search_results: Vec::new(),
            docs: Vec::new(),
            ranked: Vec::new(),
            llm_response: None,
            error: None,
            started_at: Utc::now(),
            finished_at: None,
        }
    }

    /// The user's case description. Immutable for the life of the run.
    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn is_failed(&self) -> bool {
        self.error.is_some()
    }

    /// Moves to the next stage on the success path.
    ///
    /// A failed or finished run stays where it is.
    pub fn advance(mut self) -> Self {
        if self.is_failed() {
            return self;
        }
        if let Some(next) = self.stage.next() {
            self.stage = next;
        }
        self
    }

    /// Records the terminal error and enters `Failed`.
    pub fn fail(mut self, message: impl Into<String>) -> Self {
        self.error = Some(message.into());
        self.stage = PipelineStage::Failed;
        self
    }

    /// Stamps the finish time. Successful runs end in `Done`.
    pub fn finish(mut self) -> Self {
        if !self.is_failed() {
            self.stage = PipelineStage::Done;
        }
        self.finished_at = Some(Utc::now());
        self
    }
}
