// SPDX-FileCopyrightText: 2026 Mimir Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Term segmentation for the FTS5 keyword index.
//!
//! SQLite's unicode61 tokenizer splits on whitespace and punctuation, which
//! leaves unsegmented CJK text as one long token. Content is therefore
//! stored pre-segmented: lowercased alphanumeric runs, with every CJK
//! character emitted as its own term.

/// Lowercased alphanumeric terms; CJK characters are emitted one per term.
pub fn tokenize(text: &str) -> Vec<String> {
    let mut terms = Vec::new();
    let mut current = String::new();
    for c in text.chars().flat_map(char::to_lowercase) {
        if mimir_router::markers::is_cjk(c) && c.is_alphanumeric() {
            if !current.is_empty() {
                terms.push(std::mem::take(&mut current));
            }
            terms.push(c.to_string());
        } else if c.is_alphanumeric() {
            current.push(c);
        } else if !current.is_empty() {
            terms.push(std::mem::take(&mut current));
        }
    }
    if !current.is_empty() {
        terms.push(current);
    }
    terms
}

/// Value stored in `memory_items.search_terms`.
pub fn search_terms(content: &str) -> String {
    tokenize(content).join(" ")
}

/// FTS5 MATCH expression: any query term, each quoted so no input can be
/// read as query syntax. `None` when the query has no terms.
pub fn match_expression(query: &str) -> Option<String> {
    let mut terms = tokenize(query);
    terms.sort();
    terms.dedup();
    if terms.is_empty() {
        return None;
    }
    Some(
        terms
            .iter()
            .map(|t| format!("\"{t}\""))
            .collect::<Vec<_>>()
            .join(" OR "),
    )
}
