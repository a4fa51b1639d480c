//! `APPLY_ACTION` implementations.
//!
//! Each function is a pure decision over the loaded context: it either
//! refuses with a user-facing [`ActionResult::Failure`] or produces a result
//! plus the writes `PERSIST` must execute. Nothing here touches storage.

use tracing::info;

use crate::store::models::{OrderStatus, PaymentStatus};
use crate::store::StagedWrite;

use super::state::{ActionParams, ActionResult, FlowContext};

pub type Applied = (ActionResult, Vec<StagedWrite>);

fn refuse(message: impl Into<String>) -> Applied {
    (
        ActionResult::Failure {
            message: message.into(),
        },
        Vec::new(),
    )
}

pub fn add_to_cart(user_id: i64, params: &ActionParams, ctx: &FlowContext) -> Applied {
    let Some(book) = &ctx.book else {
        return refuse("Libro no encontrado");
    };
    let quantity = params.quantity.unwrap_or(1);
    if (book.stock as i64) < quantity {
        return refuse("Stock insuficiente");
    }

    let mut writes = Vec::new();
    if ctx.cart_id.is_none() {
        writes.push(StagedWrite::CreateCart { user_id });
    }
    writes.push(StagedWrite::UpsertCartItem {
        cart_id: ctx.cart_id,
        book_id: book.id,
        quantity: quantity as i32,
    });

    info!(title = %book.title, quantity, "staging cart addition");
    (
        ActionResult::AddedToCart {
            title: book.title.clone(),
            quantity,
            cart_id: ctx.cart_id,
        },
        writes,
    )
}

pub fn remove_from_cart(params: &ActionParams, ctx: &FlowContext) -> Applied {
    let Some(cart_id) = ctx.cart_id else {
        return refuse("No tienes un carrito activo");
    };
    let Some(book_id) = params.book_id else {
        return refuse("Libro no encontrado");
    };
    if !ctx.cart_lines.iter().any(|l| l.book_id == book_id) {
        return refuse("El libro no está en tu carrito");
    }

    (
        ActionResult::RemovedFromCart,
        vec![StagedWrite::RemoveCartItem { cart_id, book_id }],
    )
}

pub fn checkout(user_id: i64, ctx: &FlowContext) -> Applied {
    let Some(cart_id) = ctx.cart_id else {
        return refuse("Tu carrito está vacío");
    };
    if ctx.cart_lines.is_empty() {
        return refuse("Tu carrito está vacío");
    }

    let total: f64 = ctx.cart_lines.iter().map(|l| l.subtotal()).sum();
    let items = ctx
        .cart_lines
        .iter()
        .map(|l| (l.book_id, l.quantity, l.unit_price))
        .collect::<Vec<_>>();
    let items_count = items.len();

    info!(total, items_count, "staging order creation");
    (
        ActionResult::OrderCreated {
            order_id: None, // minted at persist
            total,
            items_count,
        },
        vec![
            StagedWrite::CreateOrder {
                user_id,
                total,
                items,
            },
            StagedWrite::MarkCartCheckedOut { cart_id },
        ],
    )
}

/// First half of the two-step payment: never charges, only asks.
pub fn request_payment_confirmation(ctx: &FlowContext) -> Applied {
    let (order_id, amount) = match payable_order(ctx) {
        Ok(order) => order,
        Err(applied) => return applied,
    };

    (
        ActionResult::PaymentConfirmationNeeded { order_id, amount },
        Vec::new(),
    )
}

/// Second half: runs the simulated gateway. `approved` is decided by the
/// caller so the approval rate stays configurable.
pub fn confirm_payment(ctx: &FlowContext, approved: bool) -> Applied {
    let (order_id, amount) = match payable_order(ctx) {
        Ok(order) => order,
        Err(applied) => return applied,
    };

    let status = if approved {
        PaymentStatus::Approved
    } else {
        PaymentStatus::Rejected
    };
    let mut writes = vec![StagedWrite::InsertPayment {
        order_id: Some(order_id),
        amount,
        status,
    }];
    if approved {
        writes.push(StagedWrite::SetOrderStatus {
            order_id: Some(order_id),
            status: OrderStatus::Paid,
        });
    }

    info!(order_id, amount, approved, "staging payment");
    (
        ActionResult::PaymentOutcome {
            order_id,
            amount,
            approved,
        },
        writes,
    )
}

pub fn cancel_order(ctx: &FlowContext) -> Applied {
    let Some(order) = &ctx.order else {
        return refuse("Orden no encontrada");
    };
    match order.status {
        OrderStatus::Paid => {
            return refuse(format!(
                "No se puede cancelar la orden **#{}** porque ya fue pagada.",
                order.id
            ))
        }
        OrderStatus::Cancelled => {
            return refuse(format!("La orden **#{}** ya está cancelada.", order.id))
        }
        OrderStatus::Created => {}
    }

    (
        ActionResult::OrderCancelled { order_id: order.id },
        vec![StagedWrite::SetOrderStatus {
            order_id: Some(order.id),
            status: OrderStatus::Cancelled,
        }],
    )
}

/// Shared payment guards: the order must exist and still be `created`.
fn payable_order(ctx: &FlowContext) -> Result<(i64, f64), Applied> {
    let Some(order) = &ctx.order else {
        return Err(refuse(
            "No se encontró una orden pendiente de pago. Primero haz checkout de tu carrito.",
        ));
    };
    match order.status {
        OrderStatus::Paid => Err(refuse(format!(
            "La orden **#{}** ya fue pagada anteriormente.",
            order.id
        ))),
        OrderStatus::Cancelled => Err(refuse(format!(
            "La orden **#{}** fue cancelada y no se puede pagar.",
            order.id
        ))),
        OrderStatus::Created => Ok((order.id, order.total)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::models::{Book, CartLine, Order};

    fn dune() -> Book {
        Book {
            id: 1,
            title: "Dune".into(),
            author: "Frank Herbert".into(),
            genre: Some("ciencia ficción".into()),
            price: 19.99,
            stock: 25,
            description: None,
        }
    }

    fn line(book_id: i64, quantity: i32, unit_price: f64) -> CartLine {
        CartLine {
            book_id,
            title: "Dune".into(),
            unit_price,
            quantity,
        }
    }

    fn order(status: OrderStatus) -> Order {
        Order {
            id: 7,
            user_id: 1,
            status,
            total: 39.98,
        }
    }

    #[test]
    fn add_defaults_quantity_to_one() {
        let ctx = FlowContext {
            book: Some(dune()),
            cart_id: Some(3),
            ..FlowContext::default()
        };
        let (result, writes) = add_to_cart(1, &ActionParams::default(), &ctx);
        match result {
            ActionResult::AddedToCart { quantity, .. } => assert_eq!(quantity, 1),
            other => panic!("unexpected result {other:?}"),
        }
        assert_eq!(
            writes,
            vec![StagedWrite::UpsertCartItem {
                cart_id: Some(3),
                book_id: 1,
                quantity: 1,
            }]
        );
    }

    #[test]
    fn add_without_cart_stages_cart_creation_first() {
        let ctx = FlowContext {
            book: Some(dune()),
            ..FlowContext::default()
        };
        let params = ActionParams {
            quantity: Some(2),
            ..ActionParams::default()
        };
        let (_, writes) = add_to_cart(1, &params, &ctx);
        assert_eq!(writes[0], StagedWrite::CreateCart { user_id: 1 });
        assert_eq!(
            writes[1],
            StagedWrite::UpsertCartItem {
                cart_id: None,
                book_id: 1,
                quantity: 2,
            }
        );
    }

    #[test]
    fn add_rejects_insufficient_stock() {
        let mut book = dune();
        book.stock = 1;
        let ctx = FlowContext {
            book: Some(book),
            cart_id: Some(3),
            ..FlowContext::default()
        };
        let params = ActionParams {
            quantity: Some(2),
            ..ActionParams::default()
        };
        let (result, writes) = add_to_cart(1, &params, &ctx);
        assert!(matches!(result, ActionResult::Failure { ref message } if message == "Stock insuficiente"));
        assert!(writes.is_empty());
    }

    #[test]
    fn add_at_exact_stock_boundary_succeeds() {
        let mut book = dune();
        book.stock = 2;
        let ctx = FlowContext {
            book: Some(book),
            cart_id: Some(3),
            ..FlowContext::default()
        };
        let params = ActionParams {
            quantity: Some(2),
            ..ActionParams::default()
        };
        let (result, _) = add_to_cart(1, &params, &ctx);
        assert!(matches!(result, ActionResult::AddedToCart { .. }));
    }

    #[test]
    fn remove_missing_line_refuses() {
        let ctx = FlowContext {
            cart_id: Some(3),
            cart_lines: vec![line(9, 1, 5.0)],
            ..FlowContext::default()
        };
        let params = ActionParams {
            book_id: Some(1),
            ..ActionParams::default()
        };
        let (result, writes) = remove_from_cart(&params, &ctx);
        assert!(matches!(result, ActionResult::Failure { ref message } if message == "El libro no está en tu carrito"));
        assert!(writes.is_empty());
    }

    #[test]
    fn checkout_totals_and_marks_cart() {
        let ctx = FlowContext {
            cart_id: Some(3),
            cart_lines: vec![line(1, 2, 19.99), line(2, 1, 10.0)],
            ..FlowContext::default()
        };
        let (result, writes) = checkout(1, &ctx);
        match result {
            ActionResult::OrderCreated {
                order_id,
                total,
                items_count,
            } => {
                assert!(order_id.is_none());
                assert!((total - 49.98).abs() < 1e-9);
                assert_eq!(items_count, 2);
            }
            other => panic!("unexpected result {other:?}"),
        }
        assert!(matches!(writes[0], StagedWrite::CreateOrder { .. }));
        assert_eq!(writes[1], StagedWrite::MarkCartCheckedOut { cart_id: 3 });
    }

    #[test]
    fn checkout_empty_cart_refuses() {
        let (result, writes) = checkout(1, &FlowContext::default());
        assert!(matches!(result, ActionResult::Failure { ref message } if message == "Tu carrito está vacío"));
        assert!(writes.is_empty());
    }

    #[test]
    fn payment_request_never_stages_writes() {
        let ctx = FlowContext {
            order: Some(order(OrderStatus::Created)),
            ..FlowContext::default()
        };
        let (result, writes) = request_payment_confirmation(&ctx);
        assert!(matches!(
            result,
            ActionResult::PaymentConfirmationNeeded {
                order_id: 7,
                ..
            }
        ));
        assert!(writes.is_empty());
    }

    #[test]
    fn paying_a_paid_order_refuses() {
        let ctx = FlowContext {
            order: Some(order(OrderStatus::Paid)),
            ..FlowContext::default()
        };
        let (result, _) = request_payment_confirmation(&ctx);
        assert!(matches!(result, ActionResult::Failure { .. }));
        let (result, writes) = confirm_payment(&ctx, true);
        assert!(matches!(result, ActionResult::Failure { .. }));
        assert!(writes.is_empty());
    }

    #[test]
    fn approved_payment_stages_payment_and_status() {
        let ctx = FlowContext {
            order: Some(order(OrderStatus::Created)),
            ..FlowContext::default()
        };
        let (result, writes) = confirm_payment(&ctx, true);
        assert!(matches!(result, ActionResult::PaymentOutcome { approved: true, .. }));
        assert_eq!(writes.len(), 2);
        assert!(matches!(
            writes[1],
            StagedWrite::SetOrderStatus {
                status: OrderStatus::Paid,
                ..
            }
        ));
    }

    #[test]
    fn rejected_payment_keeps_order_created() {
        let ctx = FlowContext {
            order: Some(order(OrderStatus::Created)),
            ..FlowContext::default()
        };
        let (result, writes) = confirm_payment(&ctx, false);
        assert!(matches!(result, ActionResult::PaymentOutcome { approved: false, .. }));
        // Rejected payments are recorded, the order stays payable.
        assert_eq!(writes.len(), 1);
        assert!(matches!(writes[0], StagedWrite::InsertPayment { .. }));
    }

    #[test]
    fn cancel_guards_terminal_states() {
        let paid = FlowContext {
            order: Some(order(OrderStatus::Paid)),
            ..FlowContext::default()
        };
        assert!(matches!(cancel_order(&paid).0, ActionResult::Failure { .. }));

        let created = FlowContext {
            order: Some(order(OrderStatus::Created)),
            ..FlowContext::default()
        };
        let (result, writes) = cancel_order(&created);
        assert!(matches!(result, ActionResult::OrderCancelled { order_id: 7 }));
        assert!(matches!(
            writes[0],
            StagedWrite::SetOrderStatus {
                status: OrderStatus::Cancelled,
                ..
            }
        ));
    }
}
