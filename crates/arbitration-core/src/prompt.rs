//! Prompt construction and strict parsing of model output.
//!
//! Two generative calls exist in the pipeline:
//!
//! - **Expansion** asks for a JSON object `{"main_query", "amount_query"}`.
//!   [`parse_expansion`] deserializes it against a fixed schema; anything
//!   that is not a JSON object of optional strings is rejected so the
//!   caller can fall back to the raw user query.
//! - **Synthesis** embeds the top ranked documents into a comparative
//!   analysis request ([`synthesis_user_prompt`]).

use serde::Deserialize;

use crate::models::{Document, QueryPair};
use crate::text::truncate_chars;

pub const EXPANSION_SYSTEM_PROMPT: &str = r#"You are a legal search expert specializing in finding arbitration awards with monetary damages.

Your goal is to generate two distinct search queries in JSON format:
{
  "main_query": "A broad search for the case type and key legal issues.",
  "amount_query": "A specific search focused on monetary outcomes like awards, damages, or compensation."
}

For main_query: Include case type, jurisdiction, and legal issues.
For amount_query: Add terms like "award amount", "damages awarded", "compensation", "INR/USD", "crore/million".

Return ONLY valid JSON, no other text."#;

pub const SYNTHESIS_SYSTEM_PROMPT: &str = r#"You are an expert arbitration analyst with deep knowledge of case law and dispute resolution. Your task is to:
1. **Analyze Each Case Thoroughly**: Read all provided cases carefully. For each case, identify:
   - Parties involved and their relationship
   - Nature of the dispute (construction, commercial, employment, etc.)
   - Key facts and timeline
   - Claims made and amounts sought
   - Legal issues and arguments
   - Final award/outcome (if mentioned)
2. **Draw Detailed Analogies**: Create a comprehensive comparison showing:
   - Which case is MOST similar to the user's situation and why (detailed comparison)
   - Specific parallels in facts, claims, and circumstances
   - Key differences that might affect the outcome
   - Patterns across multiple cases that apply to user's scenario
3. **Estimate Arbitration Amount**: Based on the analyzed cases, provide:
   - A reasonable range or specific estimate
   - Clear explanation of how you arrived at this figure
   - Factors that could increase or decrease the amount
   - Confidence level in your estimate
4. **Strategic Insights**: Provide actionable insights:
   - Precedents that favor/disfavor the claim
   - Critical success factors from similar cases
   - Potential risks and opportunities
Be thorough, specific, and reference exact details from the cases. Use numbers, dates, and facts from the documents."#;

/// Build the user message for query expansion.
///
/// When `keywords` is non-empty they are listed as anchor terms.
pub fn expansion_user_prompt(user_query: &str, keywords: &[String]) -> String {
    let keyword_section = if keywords.is_empty() {
        String::new()
    } else {
        format!(
            "Important keywords identified: [{}]\n\nUse these keywords as the foundation for your search queries.\n",
            keywords.join(", ")
        )
    };

    format!(
        "Case: {}\n\n{}Generate optimized search queries based on the provided information (JSON format only).",
        user_query, keyword_section
    )
}

/// Expected shape of the expansion response.
#[derive(Debug, Deserialize)]
struct ExpansionResponse {
    #[serde(default)]
    main_query: Option<String>,
    #[serde(default)]
    amount_query: Option<String>,
}

/// Parse the expansion response into a [`QueryPair`].
///
/// The content (trimmed) must be a JSON object whose `main_query` and
/// `amount_query` members, when present, are strings. A missing, null, or
/// blank member falls back to `user_query` for that member only.
///
/// # Errors
///
/// Returns the deserialization error for non-JSON content, non-object
/// JSON, or members of the wrong type.
pub fn parse_expansion(content: &str, user_query: &str) -> Result<QueryPair, serde_json::Error> {
    let value: serde_json::Value = serde_json::from_str(content.trim())?;
    if !value.is_object() {
        return Err(serde::de::Error::custom("expected a JSON object"));
    }
    let parsed: ExpansionResponse = serde_json::from_value(value)?;

    let pick = |value: Option<String>| {
        value
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
            .unwrap_or_else(|| user_query.to_string())
    };

    Ok(QueryPair {
        main: pick(parsed.main_query),
        amount_focused: pick(parsed.amount_query),
    })
}

/// Render one document as a numbered case block.
fn case_block(index: usize, doc: &Document, max_chars: usize) -> String {
    let title = if doc.title.is_empty() {
        "Untitled"
    } else {
        doc.title.as_str()
    };
    format!(
        "\n### CASE {} (Relevance: {:.1}%)\n**Title**: {}\n**Source**: {}\n**Full Content**:\n{}\n---\n",
        index,
        doc.similarity_or_zero() * 100.0,
        title,
        doc.url,
        truncate_chars(&doc.text, max_chars)
    )
}

/// Build the user message for synthesis over already-selected documents.
///
/// Each document's text is capped at `doc_text_chars` characters.
pub fn synthesis_user_prompt(query: &str, docs: &[Document], doc_text_chars: usize) -> String {
    let context = docs
        .iter()
        .enumerate()
        .map(|(i, d)| case_block(i + 1, d, doc_text_chars))
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        "**USER'S ARBITRATION CASE:**\n{}\n\n**TOP {} MOST RELEVANT CASES (Ranked by AI Similarity):**\n{}\nPlease provide a comprehensive analysis with detailed analogies to help understand how these cases relate to the user's situation.",
        query,
        docs.len(),
        context
    )
}
