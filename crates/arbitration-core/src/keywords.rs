//! Legal keyword extraction for query expansion.
//!
//! Scans a case description for known legal phrases (dispute types,
//! remedies, forums) and monetary expressions such as `$50M`,
//! `₹10 crore`, or `USD 5 million`. The result is handed to the expansion
//! prompt as a list of anchor terms; an empty list simply omits that
//! section of the prompt.
//!
//! Matching is deterministic: terms come back in the order they first
//! appear in the query, without duplicates. Longer phrases are matched
//! first and claim their span, so `liquidated damages` does not also
//! yield `damages`.

/// Legal phrases recognised in case descriptions.
pub const LEGAL_LEXICON: &[&str] = &[
    "arbitral award",
    "arbitration",
    "bank guarantee",
    "breach of contract",
    "charter party",
    "compensation",
    "concession agreement",
    "construction",
    "cost overrun",
    "damages",
    "defective work",
    "delay",
    "demurrage",
    "employment",
    "epc contract",
    "expropriation",
    "force majeure",
    "injunction",
    "insurance",
    "interest",
    "investment treaty",
    "joint venture",
    "licence",
    "license",
    "liquidated damages",
    "lost profits",
    "royalty",
    "shareholder",
    "specific performance",
    "supply agreement",
    "termination",
    "tribunal",
    "wrongful dismissal",
];

const CURRENCY_SYMBOLS: &[char] = &['$', '₹', '€', '£'];
const CURRENCY_WORDS: &[&str] = &["usd", "inr", "eur", "gbp", "rs", "rs."];
const MAGNITUDE_WORDS: &[&str] = &[
    "crore", "crores", "lakh", "lakhs", "million", "millions", "billion", "billions", "thousand",
];

/// Extract ordered, de-duplicated legal terms and amounts from `query`.
pub fn extract_legal_keywords(query: &str) -> Vec<String> {
    let mut found: Vec<(usize, String)> = Vec::new();
    found.extend(find_lexicon_terms(query));
    found.extend(find_amounts(query));
    found.sort_by_key(|(pos, _)| *pos);

    let mut seen = std::collections::HashSet::new();
    found
        .into_iter()
        .filter(|(_, term)| seen.insert(term.to_lowercase()))
        .map(|(_, term)| term)
        .collect()
}

fn find_lexicon_terms(query: &str) -> Vec<(usize, String)> {
    let lower = query.to_lowercase();
    // Lowercasing can change byte offsets for some scripts; positions are
    // only used for ordering, so offsets into `lower` are sufficient.
    let mut lexicon: Vec<&str> = LEGAL_LEXICON.to_vec();
    lexicon.sort_by_key(|term| std::cmp::Reverse(term.len()));

    let mut claimed: Vec<(usize, usize)> = Vec::new();
    let mut out = Vec::new();

    for term in lexicon {
        let hit = lower.match_indices(term).find(|(start, _)| {
            let end = start + term.len();
            is_word_start(&lower, *start)
                && !claimed.iter().any(|(s, e)| *start < *e && end > *s)
        });
        if let Some((start, _)) = hit {
            claimed.push((start, start + term.len()));
            out.push((start, term.to_string()));
        }
    }

    out
}

fn is_word_start(text: &str, byte_idx: usize) -> bool {
    text[..byte_idx]
        .chars()
        .next_back()
        .map_or(true, |c| !c.is_alphanumeric())
}

fn find_amounts(query: &str) -> Vec<(usize, String)> {
    let mut tokens: Vec<(usize, &str)> = Vec::new();
    let mut offset = 0;
    for raw in query.split_whitespace() {
        let pos = query[offset..].find(raw).map_or(offset, |p| p + offset);
        offset = pos + raw.len();
        tokens.push((pos, raw));
    }

    let mut out = Vec::new();
    let mut i = 0;
    while i < tokens.len() {
        let (pos, raw) = tokens[i];
        let token = clean_token(raw);
        let next = tokens.get(i + 1).map(|(_, t)| clean_token(t));
        let next_is_magnitude = next
            .map(|t| MAGNITUDE_WORDS.contains(&t.to_lowercase().as_str()))
            .unwrap_or(false);

        if !token.chars().any(|c| c.is_ascii_digit()) {
            i += 1;
            continue;
        }

        let prev_currency = i > 0 && {
            let prev = clean_token(tokens[i - 1].1).to_lowercase();
            CURRENCY_WORDS.contains(&prev.as_str())
        };
        let has_symbol = token.starts_with(CURRENCY_SYMBOLS);

        if has_symbol || prev_currency || next_is_magnitude {
            let (start, mut amount) = if prev_currency {
                (
                    tokens[i - 1].0,
                    format!("{} {}", clean_token(tokens[i - 1].1), token),
                )
            } else {
                (pos, token.to_string())
            };
            if next_is_magnitude {
                if let Some(word) = next {
                    amount.push(' ');
                    amount.push_str(word);
                }
                i += 1;
            }
            out.push((start, amount));
        }
        i += 1;
    }

    out
}

fn clean_token(raw: &str) -> &str {
    raw.trim_start_matches(&['(', '[', '"', '\''][..])
        .trim_end_matches(&[',', '.', ';', ':', ')', ']', '"', '\'', '!', '?'][..])
}
