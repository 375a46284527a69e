//! Report synthesis.
//!
//! Feeds the top ranked documents to the generative model and returns its
//! analysis. The result is always a string: empty input, a missing
//! credential, and API failures each map to a fixed message.

use arbitration_core::models::Document;
use arbitration_core::prompt::{synthesis_user_prompt, SYNTHESIS_SYSTEM_PROMPT};
use tracing::{info, warn};

use crate::config::SynthesisConfig;
use crate::llm::{ChatModel, ChatRequest, LlmError};

pub const NO_DOCUMENTS_MESSAGE: &str = "No documents available for analysis.";
pub const NO_RESPONSE_MESSAGE: &str = "No response generated.";

/// Message returned when no model is configured.
pub fn missing_credential_message(api_key_env: &str) -> String {
    format!("{} not found. Cannot generate LLM analysis.", api_key_env)
}

/// Produce the analysis report for `query` from ranked `docs`.
///
/// Only the first `config.top_k` documents are used, each capped at
/// `config.doc_text_chars` characters.
pub async fn synthesize(
    model: Option<&dyn ChatModel>,
    config: &SynthesisConfig,
    api_key_env: &str,
    query: &str,
    docs: &[Document],
) -> String {
    if docs.is_empty() {
        return NO_DOCUMENTS_MESSAGE.to_string();
    }
    let Some(model) = model else {
        return missing_credential_message(api_key_env);
    };

    let selected = &docs[..docs.len().min(config.top_k)];
    let request = ChatRequest {
        system: SYNTHESIS_SYSTEM_PROMPT.to_string(),
        user: synthesis_user_prompt(query, selected, config.doc_text_chars),
        temperature: config.temperature,
        max_tokens: config.max_tokens,
    };

    match model.complete(&request).await {
        Ok(report) => {
            info!(model = model.model_name(), docs = selected.len(), "synthesis done");
            report
        }
        Err(LlmError::EmptyResponse) => NO_RESPONSE_MESSAGE.to_string(),
        Err(e) => {
            warn!(error = %e, "synthesis failed");
            format!("Error calling LLM API: {}", e)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::Mutex;

    struct EchoModel {
        seen: Mutex<Vec<ChatRequest>>,
        fail_with: Option<fn() -> LlmError>,
    }

    impl EchoModel {
        fn ok() -> Self {
            Self {
                seen: Mutex::new(Vec::new()),
                fail_with: None,
            }
        }

        fn failing(make: fn() -> LlmError) -> Self {
            Self {
                seen: Mutex::new(Vec::new()),
                fail_with: Some(make),
            }
        }
    }

    #[async_trait]
    impl ChatModel for EchoModel {
        fn model_name(&self) -> &str {
            "echo"
        }

        async fn complete(&self, request: &ChatRequest) -> Result<String, LlmError> {
            self.seen.lock().unwrap().push(request.clone());
            match self.fail_with {
                Some(make) => Err(make()),
                None => Ok("estimated range: USD 2-4 million".to_string()),
            }
        }
    }

    fn doc(i: usize) -> Document {
        Document {
            url: format!("https://case.test/{}", i),
            title: format!("Case {}", i),
            text: "award text".to_string(),
            full_fetch: true,
            score: 3,
            source: "Case Law Sites".to_string(),
            similarity: Some(0.9 - i as f32 * 0.1),
        }
    }

    #[tokio::test]
    async fn test_empty_docs_message() {
        let model = EchoModel::ok();
        let out = synthesize(Some(&model), &SynthesisConfig::default(), "GROQ_API_KEY", "q", &[]).await;
        assert_eq!(out, NO_DOCUMENTS_MESSAGE);
        assert!(model.seen.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_missing_model_message() {
        let out = synthesize(None, &SynthesisConfig::default(), "GROQ_API_KEY", "q", &[doc(0)]).await;
        assert_eq!(out, "GROQ_API_KEY not found. Cannot generate LLM analysis.");
    }

    #[tokio::test]
    async fn test_only_top_k_in_prompt() {
        let model = EchoModel::ok();
        let docs: Vec<Document> = (0..8).map(doc).collect();
        let out = synthesize(Some(&model), &SynthesisConfig::default(), "GROQ_API_KEY", "q", &docs).await;
        assert_eq!(out, "estimated range: USD 2-4 million");

        let seen = model.seen.lock().unwrap();
        let prompt = &seen[0].user;
        assert!(prompt.contains("TOP 5 MOST RELEVANT CASES"));
        assert!(prompt.contains("https://case.test/4"));
        assert!(!prompt.contains("https://case.test/5"));
        assert_eq!(seen[0].max_tokens, 4000);
    }

    #[tokio::test]
    async fn test_api_error_becomes_message() {
        let model = EchoModel::failing(|| LlmError::Status {
            status: 503,
            body: "overloaded".to_string(),
        });
        let out = synthesize(Some(&model), &SynthesisConfig::default(), "GROQ_API_KEY", "q", &[doc(0)]).await;
        assert_eq!(out, "Error calling LLM API: LLM API error 503: overloaded");
    }

    #[tokio::test]
    async fn test_empty_choices_message() {
        let model = EchoModel::failing(|| LlmError::EmptyResponse);
        let out = synthesize(Some(&model), &SynthesisConfig::default(), "GROQ_API_KEY", "q", &[doc(0)]).await;
        assert_eq!(out, NO_RESPONSE_MESSAGE);
    }
}
