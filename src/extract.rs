//! HTML to plain-text extraction.
//!
//! Walks the parsed document, skipping subtrees that never hold case text
//! (scripts, styles, navigation, page headers and footers), and flattens
//! the remaining text nodes into a single whitespace-normalized string.

use arbitration_core::text::collapse_whitespace;
use ego_tree::iter::Edge;
use scraper::{Html, Node};

/// Elements whose entire subtree is dropped before flattening.
pub const STRIPPED_TAGS: &[&str] = &["script", "style", "noscript", "header", "footer", "nav"];

/// Extract readable text from an HTML page.
///
/// The tree is walked iteratively, so nesting depth is bounded only by
/// memory.
pub fn html_to_text(html: &str) -> String {
    let doc = Html::parse_document(html);
    let mut parts: Vec<&str> = Vec::new();
    // Open elements inside a stripped subtree, counting its root.
    let mut skip_depth = 0usize;

    for edge in doc.root_element().traverse() {
        match edge {
            Edge::Open(node) => match node.value() {
                Node::Element(el) => {
                    if skip_depth > 0 || STRIPPED_TAGS.contains(&el.name()) {
                        skip_depth += 1;
                    }
                }
                Node::Text(text) if skip_depth == 0 => parts.push(&**text),
                _ => {}
            },
            Edge::Close(node) => {
                if skip_depth > 0 && node.value().is_element() {
                    skip_depth -= 1;
                }
            }
        }
    }

    collapse_whitespace(&parts.join(" "))
}
