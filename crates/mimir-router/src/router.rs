// SPDX-FileCopyrightText: 2026 Mimir Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Partition routing from query intent markers.
//!
//! Policy: only episodic markers -> episodic; only knowledge markers ->
//! knowledge; both, neither, or an empty query -> hybrid. A contextual
//! marker ("earlier", "之前") counts as episodic only next to a personal
//! pronoun; otherwise it is reported as a hint and ignored.

use mimir_config::model::RouterConfig;
use tracing::debug;

use crate::markers::{
    CONTEXTUAL_EPISODIC_MARKERS, EPISODIC_MARKERS, KNOWLEDGE_MARKERS, Marker, PERSONAL_PRONOUNS,
    tokenize,
};

/// Which partitions a query should search.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteTarget {
    /// Conversation-derived facts about the user.
    Episodic,
    /// General reference knowledge.
    Knowledge,
    /// Both partitions.
    Hybrid,
}

impl std::fmt::Display for RouteTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RouteTarget::Episodic => write!(f, "episodic"),
            RouteTarget::Knowledge => write!(f, "knowledge"),
            RouteTarget::Hybrid => write!(f, "hybrid"),
        }
    }
}

/// Routing result with the markers that produced it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteDecision {
    pub target: RouteTarget,
    pub episodic_matches: Vec<String>,
    pub knowledge_matches: Vec<String>,
    /// Contextual markers found without a personal pronoun.
    pub episodic_hints: Vec<String>,
}

/// Marker-based query router. Stateless after construction; share freely.
#[derive(Debug, Clone)]
pub struct QueryRouter {
    episodic: Vec<Marker>,
    contextual: Vec<Marker>,
    pronouns: Vec<Marker>,
    knowledge: Vec<Marker>,
}

impl QueryRouter {
    /// Router with the built-in multilingual marker tables.
    pub fn new() -> Self {
        Self::with_extra_markers(&[], &[])
    }

    /// Router with the built-in tables plus markers from configuration.
    pub fn from_config(config: &RouterConfig) -> Self {
        Self::with_extra_markers(
            &config.extra_episodic_markers,
            &config.extra_knowledge_markers,
        )
    }

    fn with_extra_markers(extra_episodic: &[String], extra_knowledge: &[String]) -> Self {
        let episodic = EPISODIC_MARKERS
            .iter()
            .copied()
            .chain(extra_episodic.iter().map(String::as_str))
            .filter_map(Marker::compile)
            .collect();
        let knowledge = KNOWLEDGE_MARKERS
            .iter()
            .copied()
            .chain(extra_knowledge.iter().map(String::as_str))
            .filter_map(Marker::compile)
            .collect();
        Self {
            episodic,
            contextual: compile_all(CONTEXTUAL_EPISODIC_MARKERS),
            pronouns: compile_all(PERSONAL_PRONOUNS),
            knowledge,
        }
    }

    /// Classify a query.
    pub fn route(&self, query: &str) -> RouteDecision {
        let lower = query.trim().to_lowercase();
        if lower.is_empty() {
            return RouteDecision {
                target: RouteTarget::Hybrid,
                episodic_matches: Vec::new(),
                knowledge_matches: Vec::new(),
                episodic_hints: Vec::new(),
            };
        }

        let words = tokenize(&lower);
        let collect = |markers: &[Marker]| -> Vec<String> {
            markers
                .iter()
                .filter(|m| m.matches(&lower, &words))
                .map(Marker::phrase)
                .collect()
        };
        let mut episodic_matches = collect(&self.episodic);
        let knowledge_matches = collect(&self.knowledge);
        let mut episodic_hints = collect(&self.contextual);
        if !episodic_hints.is_empty() && self.pronouns.iter().any(|p| p.matches(&lower, &words)) {
            episodic_matches.append(&mut episodic_hints);
        }

        let target = match (episodic_matches.is_empty(), knowledge_matches.is_empty()) {
            (false, true) => RouteTarget::Episodic,
            (true, false) => RouteTarget::Knowledge,
            _ => RouteTarget::Hybrid,
        };

        debug!(
            %target,
            episodic = ?episodic_matches,
            knowledge = ?knowledge_matches,
            hints = ?episodic_hints,
            "query routed"
        );

        RouteDecision {
            target,
            episodic_matches,
            knowledge_matches,
            episodic_hints,
        }
    }
}

fn compile_all(phrases: &[&str]) -> Vec<Marker> {
    phrases.iter().copied().filter_map(Marker::compile).collect()
}

impl Default for QueryRouter {
    fn default() -> Self {
        Self::new()
    }
}
