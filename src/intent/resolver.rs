//! Tiered intent resolver.
//!
//! Order of attempts: rule table, embedding similarity, generative
//! classification, clarification. Deterministic given a fixed catalog and
//! embedder; the generative tier only runs for the low-confidence band
//! between the floor and the base threshold.

use std::sync::Arc;

use tracing::{debug, info, instrument, warn};

use crate::actions::StoreAction;
use crate::ai::prompts::classification_prompt;
use crate::ai::{cosine_similarity, ChatMessage, ChatProvider, Embedder};
use crate::config::SimilarityThresholds;
use crate::store::models::SemanticAction;

use super::{rules, ActionCandidate, IntentMatch, MatchMethod};

pub struct IntentResolver {
    embedder: Arc<dyn Embedder>,
    chat: Arc<dyn ChatProvider>,
    thresholds: SimilarityThresholds,
}

impl IntentResolver {
    pub fn new(
        embedder: Arc<dyn Embedder>,
        chat: Arc<dyn ChatProvider>,
        thresholds: SimilarityThresholds,
    ) -> Self {
        Self {
            embedder,
            chat,
            thresholds,
        }
    }

    /// Classify one query against the action catalog. Never fails: provider
    /// errors degrade to the next tier, bottoming out at clarification.
    #[instrument(skip(self, catalog), fields(query = %query))]
    pub async fn resolve(&self, query: &str, catalog: &[SemanticAction]) -> IntentMatch {
        if let Some(action) = rules::rule_match(query) {
            info!(action = action.name(), "rule tier matched");
            return IntentMatch::rule(action);
        }

        if catalog.is_empty() {
            warn!("action catalog is empty, cannot score");
            return IntentMatch::clarification(0.0, Vec::new());
        }

        let query_vec = match self.embedder.embed(query).await {
            Ok(v) => v,
            Err(e) => {
                // Vector backend down: jump straight to the generative tier.
                warn!(error = %e, "embedding failed, trying generative classification");
                return match self.classify_generative(query, catalog).await {
                    Some(action) => IntentMatch {
                        action: Some(action),
                        confidence: 0.0,
                        method: MatchMethod::GenerativeFallback,
                        candidates: Vec::new(),
                    },
                    None => IntentMatch::clarification(0.0, Vec::new()),
                };
            }
        };

        let has_individual = catalog.iter().any(|a| a.has_individual_embeddings());
        let mut scored: Vec<(&SemanticAction, f32)> = catalog
            .iter()
            .map(|action| (action, score_action(&query_vec, action)))
            .collect();
        // Stable descending sort keeps catalog order among equal scores.
        scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));

        let candidates: Vec<ActionCandidate> = scored
            .iter()
            .take(3)
            .map(|(action, score)| ActionCandidate {
                name: action.name.clone(),
                score: *score,
            })
            .collect();

        let (best, best_score) = (scored[0].0, scored[0].1);
        let second_score = scored.get(1).map(|(_, s)| *s).unwrap_or(0.0);
        debug!(
            best = %best.name,
            best_score,
            second_score,
            has_individual,
            "embedding tier scored"
        );

        let base = if has_individual {
            self.thresholds.multi_vector
        } else {
            self.thresholds.combined
        };

        if best_score >= self.thresholds.high_confidence {
            info!(action = %best.name, score = best_score, "high-confidence embedding match");
            return self.embedding_match(best, best_score, candidates);
        }

        if best_score >= base {
            let gap = best_score - second_score;
            if gap < self.thresholds.confidence_gap {
                // Accepted anyway; the gap check is diagnostic only.
                warn!(action = %best.name, score = best_score, gap, "low runner-up gap");
            }
            info!(action = %best.name, score = best_score, "embedding match");
            return self.embedding_match(best, best_score, candidates);
        }

        if best_score >= self.thresholds.generative_floor {
            info!(score = best_score, base, "below base threshold, trying generative tier");
            if let Some(action) = self.classify_generative(query, catalog).await {
                info!(action = action.name(), "generative tier classified");
                return IntentMatch {
                    action: Some(action),
                    confidence: best_score,
                    method: MatchMethod::GenerativeFallback,
                    candidates,
                };
            }
        }

        info!(best_score, "no tier matched, asking for clarification");
        IntentMatch::clarification(best_score, candidates)
    }

    fn embedding_match(
        &self,
        best: &SemanticAction,
        score: f32,
        candidates: Vec<ActionCandidate>,
    ) -> IntentMatch {
        match StoreAction::from_name(&best.name) {
            Some(action) => IntentMatch {
                action: Some(action),
                confidence: score,
                method: MatchMethod::Embedding,
                candidates,
            },
            None => {
                // Catalog row that no executor handles; treat as unresolved.
                warn!(name = %best.name, "catalog action has no executor");
                IntentMatch::clarification(score, candidates)
            }
        }
    }

    /// Generative classification: the provider must answer with exactly one
    /// catalog action name or `NONE`. Anything else is a miss.
    async fn classify_generative(
        &self,
        query: &str,
        catalog: &[SemanticAction],
    ) -> Option<StoreAction> {
        let prompt = classification_prompt(query, catalog);
        let reply = match self
            .chat
            .complete(&[ChatMessage::user(prompt)], 0.0, 16)
            .await
        {
            Ok(r) => r,
            Err(e) => {
                warn!(error = %e, "generative classification failed");
                return None;
            }
        };

        let name = reply.trim().trim_matches(|c| c == '"' || c == '\'' || c == '.');
        if name.eq_ignore_ascii_case("none") {
            return None;
        }
        if !catalog.iter().any(|a| a.name == name) {
            debug!(reply = %reply, "generative reply is not a catalog action");
            return None;
        }
        StoreAction::from_name(name)
    }
}

/// Multi-vector score: weighted blend of best example similarity and best
/// description similarity. Falls back to the combined vector for rows seeded
/// without per-text vectors.
fn score_action(query_vec: &[f32], action: &SemanticAction) -> f32 {
    if action.has_individual_embeddings() {
        let max_example = action
            .example_embeddings
            .iter()
            .map(|e| cosine_similarity(query_vec, e))
            .fold(0.0f32, f32::max);
        let max_desc = action
            .description_embeddings
            .iter()
            .map(|e| cosine_similarity(query_vec, e))
            .fold(0.0f32, f32::max);
        0.6 * max_example + 0.4 * max_desc
    } else if let Some(combined) = &action.combined_embedding {
        cosine_similarity(query_vec, combined)
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::ProviderError;
    use async_trait::async_trait;
    use std::collections::HashMap;

    struct StubEmbedder {
        vectors: HashMap<String, Vec<f32>>,
        fail: bool,
    }

    #[async_trait]
    impl Embedder for StubEmbedder {
        async fn embed(&self, text: &str) -> Result<Vec<f32>, ProviderError> {
            if self.fail {
                return Err(ProviderError::Malformed("stubbed failure".into()));
            }
            Ok(self
                .vectors
                .get(text)
                .cloned()
                .unwrap_or_else(|| vec![0.0, 0.0, 1.0]))
        }
    }

    struct StubChat {
        reply: Result<String, ()>,
    }

    #[async_trait]
    impl ChatProvider for StubChat {
        async fn complete(
            &self,
            _messages: &[ChatMessage],
            _temperature: f32,
            _max_tokens: u32,
        ) -> Result<String, ProviderError> {
            self.reply
                .clone()
                .map_err(|_| ProviderError::Malformed("stubbed failure".into()))
        }
    }

    fn action(id: i64, name: &str, examples: Vec<Vec<f32>>) -> SemanticAction {
        SemanticAction {
            id,
            name: name.into(),
            description: format!("{name} description"),
            examples: vec![],
            combined_embedding: None,
            description_embeddings: vec![],
            example_embeddings: examples,
        }
    }

    fn resolver(embedder: StubEmbedder, chat: StubChat) -> IntentResolver {
        IntentResolver::new(
            Arc::new(embedder),
            Arc::new(chat),
            SimilarityThresholds::default(),
        )
    }

    #[tokio::test]
    async fn rule_tier_wins_without_touching_providers() {
        let r = resolver(
            StubEmbedder {
                vectors: HashMap::new(),
                fail: true,
            },
            StubChat {
                reply: Err(()),
            },
        );
        let m = r.resolve("agrega Dune al carrito", &[]).await;
        assert_eq!(m.action, Some(StoreAction::AddToCart));
        assert_eq!(m.method, MatchMethod::Rule);
        assert_eq!(m.confidence, 1.0);
    }

    #[tokio::test]
    async fn embedding_tier_picks_highest_blend() {
        let mut vectors = HashMap::new();
        vectors.insert("novedades de la tienda".to_string(), vec![1.0, 0.0, 0.0]);
        let catalog = vec![
            action(1, "search_books_for_sale", vec![vec![1.0, 0.0, 0.0]]),
            action(2, "cancel_order", vec![vec![0.0, 1.0, 0.0]]),
        ];
        let r = resolver(
            StubEmbedder {
                vectors,
                fail: false,
            },
            StubChat { reply: Err(()) },
        );

        let m = r.resolve("novedades de la tienda", &catalog).await;
        assert_eq!(m.action, Some(StoreAction::SearchBooks));
        assert_eq!(m.method, MatchMethod::Embedding);
        assert!(m.confidence >= 0.45);
        assert_eq!(m.candidates[0].name, "search_books_for_sale");
    }

    #[tokio::test]
    async fn low_gap_still_accepts_best() {
        let mut vectors = HashMap::new();
        vectors.insert("algo de la tienda".to_string(), vec![1.0, 0.0, 0.0]);
        // Near-identical example vectors: scores differ by far less than 0.05.
        let catalog = vec![
            action(1, "search_books_for_sale", vec![vec![1.0, 0.0, 0.0]]),
            action(2, "get_order_status", vec![vec![0.999, 0.04, 0.0]]),
        ];
        let r = resolver(
            StubEmbedder {
                vectors,
                fail: false,
            },
            StubChat { reply: Err(()) },
        );

        let m = r.resolve("algo de la tienda", &catalog).await;
        assert_eq!(m.action, Some(StoreAction::SearchBooks));
        assert_eq!(m.method, MatchMethod::Embedding);
    }

    #[tokio::test]
    async fn generative_tier_runs_only_in_band() {
        let mut vectors = HashMap::new();
        // Similarity ~0.35 against the single example: above the floor,
        // below the multi-vector base of 0.45 (blend = 0.6 * sim).
        vectors.insert("xyzzy".to_string(), vec![0.6, 0.8, 0.0]);
        let catalog = vec![action(1, "recommend_books_for_purchase", vec![vec![1.0, 0.0, 0.0]])];
        let r = resolver(
            StubEmbedder {
                vectors,
                fail: false,
            },
            StubChat {
                reply: Ok("recommend_books_for_purchase".into()),
            },
        );

        let m = r.resolve("xyzzy", &catalog).await;
        assert_eq!(m.action, Some(StoreAction::RecommendBooks));
        assert_eq!(m.method, MatchMethod::GenerativeFallback);
    }

    #[tokio::test]
    async fn generative_none_reply_falls_to_clarification() {
        let mut vectors = HashMap::new();
        vectors.insert("xyzzy".to_string(), vec![0.6, 0.8, 0.0]);
        let catalog = vec![action(1, "recommend_books_for_purchase", vec![vec![1.0, 0.0, 0.0]])];
        let r = resolver(
            StubEmbedder {
                vectors,
                fail: false,
            },
            StubChat {
                reply: Ok("NONE".into()),
            },
        );

        let m = r.resolve("xyzzy", &catalog).await;
        assert!(m.action.is_none());
        assert_eq!(m.method, MatchMethod::Clarification);
        assert!(!m.candidates.is_empty());
    }

    #[tokio::test]
    async fn unknown_generative_reply_is_a_miss() {
        let mut vectors = HashMap::new();
        vectors.insert("xyzzy".to_string(), vec![0.6, 0.8, 0.0]);
        let catalog = vec![action(1, "recommend_books_for_purchase", vec![vec![1.0, 0.0, 0.0]])];
        let r = resolver(
            StubEmbedder {
                vectors,
                fail: false,
            },
            StubChat {
                reply: Ok("make_coffee".into()),
            },
        );

        let m = r.resolve("xyzzy", &catalog).await;
        assert!(m.action.is_none());
        assert_eq!(m.method, MatchMethod::Clarification);
    }

    #[tokio::test]
    async fn embedder_failure_degrades_to_generative() {
        let catalog = vec![action(1, "check_book_stock", vec![vec![1.0, 0.0, 0.0]])];
        let r = resolver(
            StubEmbedder {
                vectors: HashMap::new(),
                fail: true,
            },
            StubChat {
                reply: Ok("check_book_stock".into()),
            },
        );

        let m = r.resolve("zzz unrelated", &catalog).await;
        assert_eq!(m.action, Some(StoreAction::CheckStock));
        assert_eq!(m.method, MatchMethod::GenerativeFallback);
    }

    #[tokio::test]
    async fn everything_down_means_clarification() {
        let catalog = vec![action(1, "check_book_stock", vec![vec![1.0, 0.0, 0.0]])];
        let r = resolver(
            StubEmbedder {
                vectors: HashMap::new(),
                fail: true,
            },
            StubChat { reply: Err(()) },
        );

        let m = r.resolve("zzz unrelated", &catalog).await;
        assert!(m.action.is_none());
        assert_eq!(m.method, MatchMethod::Clarification);
    }
}
