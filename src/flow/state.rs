//! Working state of one workflow run.

use serde_json::{json, Value};

use crate::actions::StoreAction;
use crate::store::models::{Book, CartLine, Order, OrderStatus};

/// States of the action workflow. The trace stores these as literal names.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlowStep {
    ValidateInput,
    AskInput,
    LoadContext,
    ApplyAction,
    Persist,
    BuildResponse,
}

impl FlowStep {
    pub fn as_str(&self) -> &'static str {
        match self {
            FlowStep::ValidateInput => "VALIDATE_INPUT",
            FlowStep::AskInput => "ASK_INPUT",
            FlowStep::LoadContext => "LOAD_CONTEXT",
            FlowStep::ApplyAction => "APPLY_ACTION",
            FlowStep::Persist => "PERSIST",
            FlowStep::BuildResponse => "BUILD_RESPONSE",
        }
    }
}

/// Parameters extracted from the query before the workflow starts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ActionParams {
    pub book_id: Option<i64>,
    pub quantity: Option<i64>,
    pub order_id: Option<i64>,
}

/// Context loaded by `LOAD_CONTEXT` for the action to act on.
#[derive(Debug, Clone, Default)]
pub struct FlowContext {
    pub book: Option<Book>,
    pub cart_id: Option<i64>,
    pub cart_lines: Vec<CartLine>,
    pub order: Option<Order>,
}

/// Outcome of `APPLY_ACTION`, consumed by the response templates.
///
/// Ids that are minted during `PERSIST` start out as `None` and are patched
/// in from the receipt.
#[derive(Debug, Clone)]
pub enum ActionResult {
    /// Business-rule refusal with a user-facing message. Not an engine error:
    /// the run still persists (a no-op batch) and builds a response.
    Failure { message: String },
    AddedToCart {
        title: String,
        quantity: i64,
        cart_id: Option<i64>,
    },
    RemovedFromCart,
    OrderCreated {
        order_id: Option<i64>,
        total: f64,
        items_count: usize,
    },
    PaymentConfirmationNeeded {
        order_id: i64,
        amount: f64,
    },
    PaymentOutcome {
        order_id: i64,
        amount: f64,
        approved: bool,
    },
    OrderCancelled {
        order_id: i64,
    },
    CartContents {
        lines: Vec<CartLine>,
        total: f64,
    },
    SearchResults {
        books: Vec<Book>,
    },
    Recommendations {
        books: Vec<Book>,
    },
    BookDetails {
        book: Book,
    },
    StockStatus {
        title: String,
        stock: i32,
    },
    OrderStatusReport {
        order_id: i64,
        status: OrderStatus,
        total: f64,
    },
}

impl ActionResult {
    /// Books a transport caller may want to render alongside the response
    /// text. `None` for results that carry no catalog rows.
    pub fn display_books(&self) -> Option<Vec<Book>> {
        match self {
            ActionResult::SearchResults { books } | ActionResult::Recommendations { books } => {
                Some(books.clone())
            }
            ActionResult::BookDetails { book } => Some(vec![book.clone()]),
            _ => None,
        }
    }

    /// Structured view for the generative response prompt and debugging.
    pub fn to_json(&self) -> Value {
        match self {
            ActionResult::Failure { message } => json!({ "error": message }),
            ActionResult::AddedToCart {
                title,
                quantity,
                cart_id,
            } => json!({ "book": title, "quantity": quantity, "cart_id": cart_id }),
            ActionResult::RemovedFromCart => json!({ "success": true }),
            ActionResult::OrderCreated {
                order_id,
                total,
                items_count,
            } => json!({ "order_id": order_id, "total": total, "items_count": items_count }),
            ActionResult::PaymentConfirmationNeeded { order_id, amount } => {
                json!({ "needs_confirmation": true, "order_id": order_id, "amount": amount })
            }
            ActionResult::PaymentOutcome {
                order_id,
                amount,
                approved,
            } => json!({ "order_id": order_id, "amount": amount, "approved": approved }),
            ActionResult::OrderCancelled { order_id } => json!({ "order_id": order_id }),
            ActionResult::CartContents { lines, total } => json!({
                "items": lines
                    .iter()
                    .map(|l| json!({
                        "title": l.title,
                        "quantity": l.quantity,
                        "subtotal": l.subtotal(),
                    }))
                    .collect::<Vec<_>>(),
                "total": total,
            }),
            ActionResult::SearchResults { books } => json!({
                "books": books.iter().map(book_json).collect::<Vec<_>>(),
                "count": books.len(),
            }),
            ActionResult::Recommendations { books } => json!({
                "recommendations": books.iter().map(book_json).collect::<Vec<_>>(),
            }),
            ActionResult::BookDetails { book } => book_json(book),
            ActionResult::StockStatus { title, stock } => {
                json!({ "title": title, "stock": stock, "available": *stock > 0 })
            }
            ActionResult::OrderStatusReport {
                order_id,
                status,
                total,
            } => json!({ "order_id": order_id, "status": status.as_str(), "total": total }),
        }
    }
}

fn book_json(b: &Book) -> Value {
    json!({
        "id": b.id,
        "title": b.title,
        "author": b.author,
        "genre": b.genre,
        "price": b.price,
        "stock": b.stock,
        "description": b.description,
    })
}

/// One workflow run, created fresh per invocation and discarded after the
/// response is built. Only the action/result/trace projection reaches the
/// audit log.
#[derive(Debug, Clone)]
pub struct FlowState {
    pub user_id: i64,
    pub action: StoreAction,
    pub query: String,
    pub params: ActionParams,
    pub result: Option<ActionResult>,
    pub response: String,
    pub trace: Vec<FlowStep>,
    pub needs_input: bool,
    pub missing_fields: Vec<&'static str>,
}

impl FlowState {
    pub fn new(user_id: i64, action: StoreAction, query: &str, params: ActionParams) -> Self {
        Self {
            user_id,
            action,
            query: query.to_string(),
            params,
            result: None,
            response: String::new(),
            trace: Vec::new(),
            needs_input: false,
            missing_fields: Vec::new(),
        }
    }

    pub fn visit(&mut self, step: FlowStep) {
        self.trace.push(step);
    }

    /// Trace as a JSON array of literal state names for the audit row.
    pub fn trace_json(&self) -> Value {
        Value::Array(
            self.trace
                .iter()
                .map(|s| Value::String(s.as_str().to_string()))
                .collect(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trace_serializes_to_literal_names() {
        let mut state = FlowState::new(1, StoreAction::AddToCart, "q", ActionParams::default());
        state.visit(FlowStep::ValidateInput);
        state.visit(FlowStep::LoadContext);
        state.visit(FlowStep::ApplyAction);
        assert_eq!(
            state.trace_json(),
            serde_json::json!(["VALIDATE_INPUT", "LOAD_CONTEXT", "APPLY_ACTION"])
        );
    }
}
