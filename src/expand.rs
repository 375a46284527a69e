//! Query expansion.
//!
//! Turns one case description into a broad query and an amount-focused
//! query. The operation is total: with no model configured, or on any
//! model or parsing failure, both queries equal the user's text.

use arbitration_core::keywords::extract_legal_keywords;
use arbitration_core::models::QueryPair;
use arbitration_core::prompt::{expansion_user_prompt, parse_expansion, EXPANSION_SYSTEM_PROMPT};
use tracing::{debug, warn};

use crate::config::ExpansionConfig;
use crate::llm::{ChatModel, ChatRequest};

/// Expand `user_query` into a [`QueryPair`].
pub async fn expand(
    model: Option<&dyn ChatModel>,
    config: &ExpansionConfig,
    user_query: &str,
) -> QueryPair {
    let Some(model) = model else {
        debug!("no LLM configured, using the raw query for both searches");
        return QueryPair::fallback(user_query);
    };

    let keywords = if config.extract_keywords {
        extract_legal_keywords(user_query)
    } else {
        Vec::new()
    };
    debug!(keywords = ?keywords, "expansion keywords");

    let request = ChatRequest {
        system: EXPANSION_SYSTEM_PROMPT.to_string(),
        user: expansion_user_prompt(user_query, &keywords),
        temperature: config.temperature,
        max_tokens: config.max_tokens,
    };

    let content = match model.complete(&request).await {
        Ok(content) => content,
        Err(e) => {
            warn!(error = %e, "query expansion failed, using the raw query");
            return QueryPair::fallback(user_query);
        }
    };

    match parse_expansion(&content, user_query) {
        Ok(pair) => pair,
        Err(e) => {
            warn!(error = %e, "query expansion returned malformed JSON, using the raw query");
            QueryPair::fallback(user_query)
        }
    }
}
