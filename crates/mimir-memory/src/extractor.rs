// SPDX-FileCopyrightText: 2026 Mimir Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! LLM-based episodic fact extraction from a finished conversation.
//!
//! The LLM output is untrusted. Parsing validates every item and falls back
//! to an empty result on any doubt; extraction never returns an error.

use std::sync::Arc;
use std::time::Duration;

use mimir_config::model::ExtractionConfig;
use mimir_core::traits::ProviderAdapter;
use mimir_core::types::{Message, ProviderMessage, ProviderRequest};
use serde_json::Value;
use tracing::{debug, warn};

use crate::types::{EpisodicCategory, ExtractedFact, truncate_chars};

/// System prompt for fact extraction.
const EXTRACTION_PROMPT: &str = r#"You extract durable facts about the USER from a conversation so they can be remembered in future conversations.

Output a JSON array. Each element is an object with:
- "content": the fact as a short standalone statement (e.g. "User prefers dark mode")
- "category": one of "preference", "factual", "habit", "entity"
- "confidence": a number between 0 and 1

Only include facts the user stated or clearly implied about themselves. Ignore facts about the assistant, small talk, and one-off requests.

If there is nothing worth remembering, return []

Output the JSON array only, no explanation."#;

/// Mines episodic facts from transcripts.
pub struct EpisodicExtractor {
    provider: Arc<dyn ProviderAdapter>,
    config: ExtractionConfig,
}

impl EpisodicExtractor {
    pub fn new(provider: Arc<dyn ProviderAdapter>, config: ExtractionConfig) -> Self {
        Self { provider, config }
    }

    /// Extract facts from a transcript. Provider errors, timeouts and
    /// unparseable output all yield an empty list.
    pub async fn extract(&self, messages: &[Message]) -> Vec<ExtractedFact> {
        let window = transcript_window(messages, self.config.max_turns, self.config.max_turn_chars);
        if window.is_empty() {
            return Vec::new();
        }

        let request = ProviderRequest {
            model: self.config.model.clone(),
            system_prompt: Some(EXTRACTION_PROMPT.to_string()),
            messages: vec![ProviderMessage {
                role: "user".to_string(),
                content: format!("Conversation:\n{window}"),
            }],
            max_tokens: self.config.max_tokens,
        };

        let timeout = Duration::from_secs(self.config.timeout_secs);
        let response = match tokio::time::timeout(timeout, self.provider.complete(request)).await {
            Ok(Ok(response)) => response,
            Ok(Err(e)) => {
                warn!(error = %e, "extraction call failed");
                return Vec::new();
            }
            Err(_) => {
                warn!(timeout_secs = self.config.timeout_secs, "extraction call timed out");
                return Vec::new();
            }
        };

        let facts = parse_extraction_response(&response.content, self.config.default_confidence);
        debug!(
            count = facts.len(),
            input_tokens = response.usage.input_tokens,
            output_tokens = response.usage.output_tokens,
            "facts extracted"
        );
        facts
    }
}

/// Format the last `max_turns` messages, each truncated to `max_turn_chars`.
fn transcript_window(messages: &[Message], max_turns: usize, max_turn_chars: usize) -> String {
    let start = messages.len().saturating_sub(max_turns);
    let mut out = String::new();
    for msg in &messages[start..] {
        let text = msg.content.trim();
        if text.is_empty() {
            continue;
        }
        let role = match msg.role.as_str() {
            "user" => "User",
            "assistant" => "Assistant",
            other => other,
        };
        out.push_str(role);
        out.push_str(": ");
        out.push_str(truncate_chars(text, max_turn_chars));
        out.push('\n');
    }
    out
}

/// The first `[` in `response` that opens a complete JSON array, parsed.
///
/// Prose, markdown fences and stray brackets around the array are skipped;
/// anything after the array is ignored.
fn find_json_array(response: &str) -> Option<Vec<Value>> {
    response.match_indices('[').find_map(|(start, _)| {
        let mut values = serde_json::Deserializer::from_str(&response[start..]).into_iter::<Value>();
        match values.next() {
            Some(Ok(Value::Array(items))) => Some(items),
            _ => None,
        }
    })
}

/// Parse and validate the LLM response.
///
/// Items with empty content, an unknown category, or a non-numeric
/// confidence are dropped individually. Confidence is clamped to [0, 1] and
/// defaults to `default_confidence` when absent.
pub fn parse_extraction_response(response: &str, default_confidence: f64) -> Vec<ExtractedFact> {
    let Some(items) = find_json_array(response) else {
        warn!("extraction response contained no parseable JSON array");
        debug!(raw = response, "raw extraction response");
        return Vec::new();
    };

    let total = items.len();
    let facts: Vec<ExtractedFact> = items
        .iter()
        .filter_map(|item| validate_item(item, default_confidence))
        .collect();
    if facts.len() < total {
        debug!(dropped = total - facts.len(), "invalid extracted items dropped");
    }
    facts
}

fn validate_item(item: &Value, default_confidence: f64) -> Option<ExtractedFact> {
    let obj = item.as_object()?;
    let content = obj.get("content")?.as_str()?.trim();
    if content.is_empty() {
        return None;
    }
    let category = EpisodicCategory::parse(obj.get("category")?.as_str()?)?;
    let confidence = match obj.get("confidence") {
        None | Some(Value::Null) => default_confidence,
        Some(v) => v.as_f64()?,
    };
    Some(ExtractedFact {
        content: content.to_string(),
        category,
        confidence: confidence.clamp(0.0, 1.0),
    })
}
