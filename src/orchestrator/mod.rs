//! Top-level coordinator: one query in, one response and one audit row out.
//!
//! Order of business per query:
//!
//! 1. help/greeting shortcut (no resolver, no providers)
//! 2. intent resolution against the action catalog
//! 3. unresolved queries hit the domain guard, then clarification
//! 4. parameter and entity extraction for the matched action
//! 5. dispatch: workflow engine for mutations, direct executor for reads
//! 6. exactly one audit row, whatever path was taken
//!
//! Audit failures are logged and swallowed; they never affect the response.

pub mod direct;
pub mod guard;

use std::sync::Arc;

use chrono::Utc;
use serde_json::{json, Value};
use tracing::{error, info, instrument};

use crate::actions::StoreAction;
use crate::ai::{ChatProvider, Embedder};
use crate::config::Settings;
use crate::entity::{self, EntityResolution};
use crate::error::AgentError;
use crate::extract::{extract_number, NumberContext};
use crate::flow::{ActionParams, FlowEngine};
use crate::intent::{ActionCandidate, IntentMatch, IntentResolver, MatchMethod};
use crate::response;
use crate::store::models::{Book, ExecutionLogEntry};
use crate::store::Store;

/// Outcome of one handled query.
#[derive(Debug, Clone)]
pub struct OrchestratorResult {
    pub response: String,
    pub action: Option<StoreAction>,
    pub method: MatchMethod,
    pub confidence: f32,
    /// Literal workflow trace, present only when the flow engine ran.
    pub state_trace: Option<Value>,
    pub candidates: Vec<ActionCandidate>,
    /// Catalog rows for the caller to render next to the text: search and
    /// recommendation hits, book details, or disambiguation candidates.
    pub books: Option<Vec<Book>>,
}

pub struct Orchestrator {
    store: Arc<dyn Store>,
    chat: Arc<dyn ChatProvider>,
    resolver: IntentResolver,
    engine: FlowEngine,
}

impl Orchestrator {
    pub fn new(
        store: Arc<dyn Store>,
        embedder: Arc<dyn Embedder>,
        chat: Arc<dyn ChatProvider>,
        settings: &Settings,
    ) -> Self {
        let resolver = IntentResolver::new(embedder, chat.clone(), settings.thresholds);
        let engine = FlowEngine::new(store.clone(), settings.payment_approval_rate);
        Self {
            store,
            chat,
            resolver,
            engine,
        }
    }

    /// Handle one user query end to end.
    #[instrument(skip(self, query), fields(user_id, query = %query))]
    pub async fn handle_query(
        &self,
        query: &str,
        user_id: i64,
        session_id: Option<i64>,
    ) -> Result<OrchestratorResult, AgentError> {
        // Shortcut: greetings and help never reach the resolver.
        if let Some(text) = guard::help_or_greeting(query) {
            let result = OrchestratorResult {
                response: text.to_string(),
                action: None,
                method: MatchMethod::Help,
                confidence: 1.0,
                state_trace: None,
                candidates: Vec::new(),
                books: None,
            };
            self.audit(user_id, session_id, query, &result).await;
            return Ok(result);
        }

        let catalog = self.store.semantic_actions().await?;
        let intent = self.resolver.resolve(query, &catalog).await;

        let Some(action) = intent.action else {
            return self.handle_unresolved(query, user_id, session_id, intent).await;
        };
        info!(action = action.name(), method = intent.method.as_str(), "dispatching");

        let params = self.extract_params(query, action);

        if action.is_transactional() {
            self.run_workflow(query, user_id, session_id, action, params, intent)
                .await
        } else {
            self.run_direct(query, user_id, session_id, action, intent)
                .await
        }
    }

    /// Clarification or guardrail for queries no tier could classify.
    async fn handle_unresolved(
        &self,
        query: &str,
        user_id: i64,
        session_id: Option<i64>,
        intent: IntentMatch,
    ) -> Result<OrchestratorResult, AgentError> {
        let result = if !guard::is_domain_relevant(query) {
            info!("out-of-domain query refused");
            OrchestratorResult {
                response: crate::ai::prompts::DOMAIN_GUARDRAIL.to_string(),
                action: None,
                method: MatchMethod::Guardrail,
                confidence: 0.0,
                state_trace: None,
                candidates: intent.candidates,
                books: None,
            }
        } else {
            OrchestratorResult {
                response: response::CLARIFICATION_RESPONSE.to_string(),
                action: None,
                method: MatchMethod::Clarification,
                confidence: intent.confidence,
                state_trace: None,
                candidates: intent.candidates,
                books: None,
            }
        };
        self.audit(user_id, session_id, query, &result).await;
        Ok(result)
    }

    async fn run_workflow(
        &self,
        query: &str,
        user_id: i64,
        session_id: Option<i64>,
        action: StoreAction,
        mut params: ActionParams,
        intent: IntentMatch,
    ) -> Result<OrchestratorResult, AgentError> {
        // Cart mutations need a concrete book before the workflow starts.
        if action.needs_book() && params.book_id.is_none() {
            let books = self.store.all_books().await?;
            match entity::resolve_book(query, &books) {
                EntityResolution::Found(book) => {
                    info!(title = %book.title, id = book.id, "book resolved");
                    params.book_id = Some(book.id);
                }
                EntityResolution::Ambiguous(candidates) => {
                    let result = OrchestratorResult {
                        response: response::ambiguous_books(&candidates),
                        action: Some(action),
                        method: intent.method,
                        confidence: intent.confidence,
                        state_trace: None,
                        candidates: intent.candidates,
                        books: Some(candidates),
                    };
                    self.audit(user_id, session_id, query, &result).await;
                    return Ok(result);
                }
                EntityResolution::NotFound => {
                    let result = OrchestratorResult {
                        response: response::BOOK_NOT_FOUND.to_string(),
                        action: Some(action),
                        method: intent.method,
                        confidence: intent.confidence,
                        state_trace: None,
                        candidates: intent.candidates,
                        books: None,
                    };
                    self.audit(user_id, session_id, query, &result).await;
                    return Ok(result);
                }
            }
        }

        let state = self.engine.run(action, user_id, query, params).await?;
        let result = OrchestratorResult {
            response: state.response.clone(),
            action: Some(action),
            method: intent.method,
            confidence: intent.confidence,
            state_trace: Some(state.trace_json()),
            candidates: intent.candidates,
            books: None,
        };
        self.audit(user_id, session_id, query, &result).await;
        Ok(result)
    }

    async fn run_direct(
        &self,
        query: &str,
        user_id: i64,
        session_id: Option<i64>,
        action: StoreAction,
        intent: IntentMatch,
    ) -> Result<OrchestratorResult, AgentError> {
        let action_result = direct::execute(&self.store, action, query, user_id).await?;

        // Cart contents render from the fixed template like every other
        // cart-affecting view; other reads get provider wording.
        let response = if action == StoreAction::ViewCart {
            response::transactional(action, &action_result)
        } else {
            response::natural(self.chat.as_ref(), action, &action_result, query).await
        };

        let books = action_result.display_books();
        let result = OrchestratorResult {
            response,
            action: Some(action),
            method: intent.method,
            confidence: intent.confidence,
            state_trace: None,
            candidates: intent.candidates,
            books,
        };
        self.audit(user_id, session_id, query, &result).await;
        Ok(result)
    }

    fn extract_params(&self, query: &str, action: StoreAction) -> ActionParams {
        let mut params = ActionParams::default();
        if action == StoreAction::AddToCart {
            params.quantity = extract_number(query, NumberContext::Quantity);
        }
        if matches!(
            action,
            StoreAction::ProcessPayment
                | StoreAction::ConfirmPayment
                | StoreAction::CancelOrder
                | StoreAction::OrderStatus
        ) {
            params.order_id = extract_number(query, NumberContext::OrderId);
        }
        params
    }

    /// One audit row per query. Failures are logged, never surfaced.
    async fn audit(
        &self,
        user_id: i64,
        session_id: Option<i64>,
        query: &str,
        result: &OrchestratorResult,
    ) {
        let entry = ExecutionLogEntry {
            user_id,
            session_id,
            query: query.to_string(),
            matched_action: result
                .action
                .map(|a| a.name().to_string())
                .unwrap_or_default(),
            similarity: result.confidence,
            method: result.method.as_str().to_string(),
            top_candidates: Value::Array(
                result
                    .candidates
                    .iter()
                    .map(|c| json!({ "name": c.name, "score": round4(c.score) }))
                    .collect(),
            ),
            state_trace: result.state_trace.clone(),
            result: result.response.clone(),
            created_at: Utc::now(),
        };
        if let Err(e) = self.store.log_execution(&entry).await {
            error!(error = %e, "failed to write audit row");
        }
    }
}

fn round4(score: f32) -> f64 {
    (score as f64 * 10_000.0).round() / 10_000.0
}
