//! Workflow engine: drives one action through the state machine.

use std::sync::Arc;

use rand::Rng;
use tracing::{info, instrument, warn};

use crate::actions::StoreAction;
use crate::error::AgentError;
use crate::response;
use crate::store::Store;

use super::apply;
use super::state::{ActionParams, ActionResult, FlowContext, FlowState, FlowStep};

pub struct FlowEngine {
    store: Arc<dyn Store>,
    /// Probability the simulated payment gateway approves. Pinned to 0.0 or
    /// 1.0 in tests.
    payment_approval_rate: f64,
}

impl FlowEngine {
    pub fn new(store: Arc<dyn Store>, payment_approval_rate: f64) -> Self {
        Self {
            store,
            payment_approval_rate,
        }
    }

    /// Run one workflow to completion. Storage read errors abort the run;
    /// persist errors do not: the failure is logged and the staged result
    /// still produces a response.
    #[instrument(skip(self, query, params), fields(action = action.name(), user_id))]
    pub async fn run(
        &self,
        action: StoreAction,
        user_id: i64,
        query: &str,
        params: ActionParams,
    ) -> Result<FlowState, AgentError> {
        if !action.is_transactional() {
            return Err(AgentError::UnknownAction(format!(
                "{} is not a workflow action",
                action.name()
            )));
        }

        let mut state = FlowState::new(user_id, action, query, params);

        // VALIDATE_INPUT
        state.visit(FlowStep::ValidateInput);
        validate(&mut state);
        if state.needs_input {
            state.visit(FlowStep::AskInput);
            state.response = ask_input_message(&state.missing_fields);
            info!(missing = ?state.missing_fields, "asking user for missing input");
            return Ok(state);
        }

        // LOAD_CONTEXT
        state.visit(FlowStep::LoadContext);
        let ctx = self.load_context(&state).await?;

        // APPLY_ACTION
        state.visit(FlowStep::ApplyAction);
        let (mut result, writes) = match action {
            StoreAction::AddToCart => apply::add_to_cart(user_id, &state.params, &ctx),
            StoreAction::RemoveFromCart => apply::remove_from_cart(&state.params, &ctx),
            StoreAction::Checkout => apply::checkout(user_id, &ctx),
            StoreAction::ProcessPayment => apply::request_payment_confirmation(&ctx),
            StoreAction::ConfirmPayment => {
                let approved = rand::thread_rng().gen::<f64>() < self.payment_approval_rate;
                apply::confirm_payment(&ctx, approved)
            }
            StoreAction::CancelOrder => apply::cancel_order(&ctx),
            _ => unreachable!("guarded by is_transactional"),
        };

        // PERSIST
        state.visit(FlowStep::Persist);
        if writes.is_empty() {
            info!("nothing staged, persist is a no-op");
        } else {
            match self.store.persist(&writes).await {
                Ok(receipt) => {
                    // Patch ids minted during persist into the result.
                    match &mut result {
                        ActionResult::OrderCreated { order_id, .. } if order_id.is_none() => {
                            *order_id = receipt.order_id;
                        }
                        ActionResult::AddedToCart { cart_id, .. } if cart_id.is_none() => {
                            *cart_id = receipt.cart_id;
                        }
                        _ => {}
                    }
                }
                Err(e) => {
                    // The response below is still built from the staged
                    // result even though nothing was written.
                    warn!(error = %e, "persist failed, rolled back");
                }
            }
        }

        // BUILD_RESPONSE
        state.visit(FlowStep::BuildResponse);
        state.response = response::transactional(action, &result);
        state.result = Some(result);
        info!(trace = ?state.trace, "workflow finished");
        Ok(state)
    }

    async fn load_context(&self, state: &FlowState) -> Result<FlowContext, AgentError> {
        let mut ctx = FlowContext::default();

        match state.action {
            StoreAction::AddToCart | StoreAction::RemoveFromCart => {
                if let Some(book_id) = state.params.book_id {
                    ctx.book = self.store.book(book_id).await?;
                }
                if let Some(cart) = self.store.active_cart(state.user_id).await? {
                    ctx.cart_id = Some(cart.id);
                    ctx.cart_lines = self.store.cart_lines(cart.id).await?;
                }
            }
            StoreAction::Checkout => {
                if let Some(cart) = self.store.active_cart(state.user_id).await? {
                    ctx.cart_id = Some(cart.id);
                    ctx.cart_lines = self.store.cart_lines(cart.id).await?;
                }
            }
            StoreAction::ProcessPayment | StoreAction::ConfirmPayment | StoreAction::CancelOrder => {
                ctx.order = match state.params.order_id {
                    Some(order_id) => self.store.order(order_id, state.user_id).await?,
                    // No explicit id: fall back to the newest payable order.
                    None => self.store.latest_created_order(state.user_id).await?,
                };
            }
            _ => {}
        }

        Ok(ctx)
    }
}

fn validate(state: &mut FlowState) {
    let mut missing = Vec::new();

    match state.action {
        StoreAction::AddToCart => {
            if state.params.book_id.is_none() {
                missing.push("book_id");
            }
            if state.params.quantity.is_none() {
                state.params.quantity = Some(1);
            }
        }
        StoreAction::RemoveFromCart => {
            if state.params.book_id.is_none() {
                missing.push("book_id");
            }
        }
        StoreAction::CancelOrder => {
            if state.params.order_id.is_none() {
                missing.push("order_id");
            }
        }
        // Payment tolerates a missing order id; checkout needs nothing.
        _ => {}
    }

    state.needs_input = !missing.is_empty();
    state.missing_fields = missing;
}

fn ask_input_message(missing: &[&'static str]) -> String {
    let names: Vec<&str> = missing
        .iter()
        .map(|f| match *f {
            "book_id" => "el ID del libro",
            "order_id" => "el número de orden",
            "quantity" => "la cantidad",
            other => other,
        })
        .collect();
    format!("Para continuar, necesito que me indiques {}.", names.join(", "))
}
