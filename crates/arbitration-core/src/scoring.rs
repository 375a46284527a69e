//! Lexical relevance scoring for search hits.
//!
//! A hit earns fixed points for each keyword category that appears anywhere
//! in the lower-cased `title + " " + snippet`, plus a bonus when its URL
//! belongs to a recognized legal source. Each category counts at most once.
//!
//! | Category | Points |
//! |----------|--------|
//! | Damages / award terms | 3 |
//! | Currency / magnitude terms | 5 |
//! | Arbitration / tribunal terms | 2 |
//! | Finality terms | 2 |
//! | Recognized domain (URL) | 4 |
//!
//! The score is only used to order and truncate the search output. It is
//! not combined with semantic similarity later on.

/// A keyword category and the points it is worth.
#[derive(Debug, Clone, Copy)]
pub struct ScoreRule {
    pub terms: &'static [&'static str],
    pub points: u32,
}

pub const AWARD_TERMS: ScoreRule = ScoreRule {
    terms: &["award", "awarded", "damages", "compensation"],
    points: 3,
};

pub const AMOUNT_TERMS: ScoreRule = ScoreRule {
    terms: &["crore", "million", "billion", "usd", "inr", "₹", "$"],
    points: 5,
};

pub const FORUM_TERMS: ScoreRule = ScoreRule {
    terms: &["tribunal", "arbitration", "arbitral"],
    points: 2,
};

pub const FINALITY_TERMS: ScoreRule = ScoreRule {
    terms: &["final", "decision", "order", "judgment"],
    points: 2,
};

/// Text rules, applied in this order.
pub const TEXT_RULES: [ScoreRule; 4] = [AWARD_TERMS, AMOUNT_TERMS, FORUM_TERMS, FINALITY_TERMS];

/// URL fragments that identify established arbitration and case-law sources.
pub const RECOGNIZED_DOMAINS: &[&str] = &[
    "jusmundi",
    "italaw",
    "manupatra",
    "sci.gov",
    "hcourt",
    "arbitration",
];

pub const RECOGNIZED_DOMAIN_POINTS: u32 = 4;

/// Score a hit from its title, snippet, and URL.
pub fn lexical_score(title: &str, snippet: &str, url: &str) -> u32 {
    let content = format!("{} {}", title, snippet).to_lowercase();

    let mut score: u32 = TEXT_RULES
        .iter()
        .filter(|rule| rule.terms.iter().any(|term| content.contains(term)))
        .map(|rule| rule.points)
        .sum();

    if is_recognized_domain(url) {
        score += RECOGNIZED_DOMAIN_POINTS;
    }

    score
}

/// True when `url` contains one of [`RECOGNIZED_DOMAINS`].
pub fn is_recognized_domain(url: &str) -> bool {
    RECOGNIZED_DOMAINS.iter().any(|domain| url.contains(domain))
}
