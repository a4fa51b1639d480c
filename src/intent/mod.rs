//! Intent resolution: free-form query in, store action out.
//!
//! Tiered resolver, cheapest first:
//!
//! 1. `rules` — ordered bilingual regex table, first hit wins, confidence 1.0
//! 2. embedding similarity against the action catalog
//! 3. generative classification fallback for the low-confidence band
//! 4. clarification: no action, top candidates surfaced to the user
//!
//! The resolver never fails a request; every provider error degrades to the
//! next tier down.

pub mod resolver;
pub mod rules;

pub use resolver::IntentResolver;

use crate::actions::StoreAction;

/// How a query was classified.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchMethod {
    Rule,
    Embedding,
    GenerativeFallback,
    Clarification,
    /// Orchestrator shortcut, no resolver tier involved.
    Help,
    /// Orchestrator shortcut for out-of-domain queries.
    Guardrail,
}

impl MatchMethod {
    /// Audit-row label.
    pub fn as_str(&self) -> &'static str {
        match self {
            MatchMethod::Rule => "rule",
            MatchMethod::Embedding => "embedding",
            MatchMethod::GenerativeFallback => "generative_fallback",
            MatchMethod::Clarification => "clarification",
            MatchMethod::Help => "help",
            MatchMethod::Guardrail => "guardrail",
        }
    }
}

/// One scored catalog action, kept for the audit trail.
#[derive(Debug, Clone, PartialEq)]
pub struct ActionCandidate {
    pub name: String,
    pub score: f32,
}

/// Outcome of intent resolution for one query.
#[derive(Debug, Clone)]
pub struct IntentMatch {
    /// `None` means clarification: nothing scored well enough to act on.
    pub action: Option<StoreAction>,
    pub confidence: f32,
    pub method: MatchMethod,
    /// Top-scoring candidates (at most 3), best first.
    pub candidates: Vec<ActionCandidate>,
}

impl IntentMatch {
    pub fn rule(action: StoreAction) -> Self {
        Self {
            action: Some(action),
            confidence: 1.0,
            method: MatchMethod::Rule,
            candidates: vec![ActionCandidate {
                name: action.name().to_string(),
                score: 1.0,
            }],
        }
    }

    pub fn clarification(best_score: f32, candidates: Vec<ActionCandidate>) -> Self {
        Self {
            action: None,
            confidence: best_score,
            method: MatchMethod::Clarification,
            candidates,
        }
    }
}
