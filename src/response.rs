//! User-facing response text.
//!
//! Transactional confirmations are deterministic templates: anything that
//! touches money or order state must never depend on provider wording.
//! Read-only results go through the generative provider when it is up and
//! fall back to the plain templates here when it is not.

use tracing::warn;

use crate::actions::StoreAction;
use crate::ai::prompts::{natural_response_prompt, FALLBACK_RESPONSE};
use crate::ai::{ChatMessage, ChatProvider};
use crate::flow::ActionResult;
use crate::store::models::Book;

pub const GREETING_RESPONSE: &str = "Hola! Soy tu asistente de la librería. \
     Puedo buscar libros, darte recomendaciones, agregar al carrito y más. \
     ¿Qué te gustaría hacer?";

pub const HELP_RESPONSE: &str = "Puedo ayudarte con todo lo relacionado a nuestra librería:\n\n\
     - Buscar libros por género, autor o tema\n\
     - Darte recomendaciones personalizadas\n\
     - Mostrarte detalles de un libro específico\n\
     - Verificar stock y disponibilidad\n\
     - Agregar libros a tu carrito\n\
     - Hacer checkout y procesar pagos\n\
     - Consultar el estado de tus pedidos\n\n\
     Prueba escribiendo algo como: \"Buscar libros de fantasía\" o \"Agregar Dune al carrito\"";

pub const CLARIFICATION_RESPONSE: &str = "No estoy seguro de entender tu solicitud. Puedo ayudarte con:\n\n\
     - Buscar libros por género, autor o tema\n\
     - Recomendaciones personalizadas\n\
     - Ver detalles de un libro\n\
     - Verificar stock/disponibilidad\n\
     - Agregar o quitar libros del carrito\n\
     - Hacer checkout y pagar\n\
     - Consultar estado de pedidos\n\n\
     ¿Qué te gustaría hacer?";

pub const BOOK_NOT_FOUND: &str = "No encontré ningún libro con ese nombre. \
     ¿Podrías darme más detalles o el nombre exacto?";

/// Disambiguation listing for an ambiguous book reference.
pub fn ambiguous_books(books: &[Book]) -> String {
    let titles = books
        .iter()
        .enumerate()
        .map(|(i, b)| format!("  {}) {} — {}", i + 1, b.title, b.author))
        .collect::<Vec<_>>()
        .join("\n");
    format!(
        "Encontré varios libros que coinciden. ¿Te refieres a alguno de estos?\n\n{titles}\n\nDime el número o nombre del libro."
    )
}

fn fmt_id(id: Option<i64>) -> String {
    id.map(|v| v.to_string()).unwrap_or_else(|| "?".to_string())
}

/// Deterministic templates for money- and order-affecting actions.
pub fn transactional(action: StoreAction, result: &ActionResult) -> String {
    match result {
        ActionResult::Failure { message } => message.clone(),

        ActionResult::AddedToCart {
            title, quantity, ..
        } => format!(
            "**{title}** (x{quantity}) agregado al carrito.\n\n\
             ¿Qué deseas hacer ahora?\n\
             - Escribe **\"ver mi carrito\"** para ver el contenido\n\
             - Escribe **\"hacer checkout\"** para crear tu orden"
        ),

        ActionResult::RemovedFromCart => {
            "Libro eliminado del carrito. Escribe **\"ver mi carrito\"** para ver el contenido actualizado."
                .to_string()
        }

        ActionResult::OrderCreated {
            order_id,
            total,
            items_count,
        } => {
            let id = fmt_id(*order_id);
            format!(
                "Orden **#{id}** creada con {items_count} item(s).\n\
                 **Total: ${total:.2}**\n\n\
                 Para pagar, escribe **\"pagar orden #{id}\"**."
            )
        }

        ActionResult::PaymentConfirmationNeeded { order_id, amount } => format!(
            "Estás a punto de pagar **${amount:.2}** para la orden **#{order_id}**.\n\n\
             Responde **\"sí, confirmo el pago\"** para procesar el pago."
        ),

        ActionResult::PaymentOutcome {
            order_id,
            amount,
            approved: true,
        } => format!(
            "Pago **aprobado** para la orden **#{order_id}**.\n\
             Monto: **${amount:.2}**.\n\n\
             ¡Gracias por tu compra!"
        ),

        ActionResult::PaymentOutcome {
            order_id,
            approved: false,
            ..
        } => format!("El pago para la orden **#{order_id}** fue rechazado. Intenta de nuevo."),

        ActionResult::OrderCancelled { order_id } => {
            format!("Orden **#{order_id}** cancelada exitosamente.")
        }

        ActionResult::CartContents { lines, total } => {
            if lines.is_empty() {
                return "Tu carrito está vacío. Escribe **\"buscar libros\"** para explorar el catálogo."
                    .to_string();
            }
            let mut parts = vec!["**Tu carrito:**\n".to_string()];
            for line in lines {
                parts.push(format!(
                    "- {} (x{}) — ${:.2}",
                    line.title,
                    line.quantity,
                    line.subtotal()
                ));
            }
            parts.push(format!("\n**Total: ${total:.2}**"));
            parts.push("\nEscribe **\"hacer checkout\"** para crear tu orden.".to_string());
            parts.join("\n")
        }

        _ => fallback(action, result),
    }
}

/// Plain-data templates used when the generative provider is unavailable.
pub fn fallback(_action: StoreAction, result: &ActionResult) -> String {
    match result {
        ActionResult::Failure { message } => message.clone(),

        ActionResult::SearchResults { books } => {
            if books.is_empty() {
                return "No encontre libros con esos criterios.".to_string();
            }
            let mut parts = vec![format!("Encontre {} libro(s):\n", books.len())];
            for b in books.iter().take(10) {
                parts.push(format!("- {} por {} -- ${:.2}", b.title, b.author, b.price));
            }
            parts.join("\n")
        }

        ActionResult::Recommendations { books } => {
            if books.is_empty() {
                return "No tengo recomendaciones por ahora.".to_string();
            }
            let mut parts = vec!["Te recomiendo:\n".to_string()];
            for b in books {
                parts.push(format!("- {} por {} -- ${:.2}", b.title, b.author, b.price));
            }
            parts.join("\n")
        }

        ActionResult::BookDetails { book } => format!(
            "{}\nAutor: {}\nGenero: {}\nPrecio: ${:.2}\nStock: {} unidades\n{}",
            book.title,
            book.author,
            book.genre.as_deref().unwrap_or("?"),
            book.price,
            book.stock,
            book.description.as_deref().unwrap_or("")
        ),

        ActionResult::StockStatus { title, stock } => {
            if *stock > 0 {
                format!("{title} tiene {stock} unidades disponibles.")
            } else {
                format!("{title} esta agotado.")
            }
        }

        ActionResult::OrderStatusReport {
            order_id,
            status,
            total,
        } => format!(
            "Orden #{order_id}: estado {}, total ${total:.2}.",
            status.as_str()
        ),

        ActionResult::AddedToCart {
            title, quantity, ..
        } => format!("{title} (x{quantity}) agregado al carrito."),

        ActionResult::RemovedFromCart => "Libro eliminado del carrito.".to_string(),

        ActionResult::OrderCreated {
            order_id,
            total,
            items_count,
        } => format!(
            "Orden #{} creada. Total: ${total:.2}. {items_count} item(s).",
            fmt_id(*order_id)
        ),

        _ => FALLBACK_RESPONSE.to_string(),
    }
}

/// Natural wording for read-only results: provider first, template on any
/// failure or empty reply.
pub async fn natural(
    chat: &dyn ChatProvider,
    action: StoreAction,
    result: &ActionResult,
    query: &str,
) -> String {
    let prompt = natural_response_prompt(action.name(), &result.to_json(), query);
    match chat.complete(&[ChatMessage::user(prompt)], 0.7, 400).await {
        Ok(text) if !text.trim().is_empty() => text,
        Ok(_) => fallback(action, result),
        Err(e) => {
            warn!(error = %e, "provider unavailable for wording, using template");
            fallback(action, result)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::models::CartLine;

    #[test]
    fn added_to_cart_template() {
        let result = ActionResult::AddedToCart {
            title: "Dune".into(),
            quantity: 2,
            cart_id: Some(1),
        };
        let text = transactional(StoreAction::AddToCart, &result);
        assert!(text.contains("**Dune** (x2) agregado al carrito."));
        assert!(text.contains("hacer checkout"));
    }

    #[test]
    fn checkout_template_names_the_payment_command() {
        let result = ActionResult::OrderCreated {
            order_id: Some(7),
            total: 39.98,
            items_count: 1,
        };
        let text = transactional(StoreAction::Checkout, &result);
        assert!(text.contains("Orden **#7** creada con 1 item(s)."));
        assert!(text.contains("**Total: $39.98**"));
        assert!(text.contains("pagar orden #7"));
    }

    #[test]
    fn confirmation_prompt_quotes_the_exact_phrase() {
        let result = ActionResult::PaymentConfirmationNeeded {
            order_id: 7,
            amount: 39.98,
        };
        let text = transactional(StoreAction::ProcessPayment, &result);
        assert!(text.contains("$39.98"));
        assert!(text.contains("\"sí, confirmo el pago\""));
    }

    #[test]
    fn empty_cart_template() {
        let result = ActionResult::CartContents {
            lines: vec![],
            total: 0.0,
        };
        let text = transactional(StoreAction::ViewCart, &result);
        assert!(text.contains("Tu carrito está vacío"));
    }

    #[test]
    fn cart_contents_list_subtotals_and_total() {
        let result = ActionResult::CartContents {
            lines: vec![CartLine {
                book_id: 1,
                title: "Dune".into(),
                unit_price: 19.99,
                quantity: 2,
            }],
            total: 39.98,
        };
        let text = transactional(StoreAction::ViewCart, &result);
        assert!(text.contains("- Dune (x2) — $39.98"));
        assert!(text.contains("**Total: $39.98**"));
    }

    #[test]
    fn failure_message_passes_through_unchanged() {
        let result = ActionResult::Failure {
            message: "Stock insuficiente".into(),
        };
        assert_eq!(transactional(StoreAction::AddToCart, &result), "Stock insuficiente");
    }

    #[test]
    fn search_fallback_lists_books() {
        let result = ActionResult::SearchResults {
            books: vec![crate::store::models::Book {
                id: 1,
                title: "Dune".into(),
                author: "Frank Herbert".into(),
                genre: None,
                price: 19.99,
                stock: 25,
                description: None,
            }],
        };
        let text = fallback(StoreAction::SearchBooks, &result);
        assert!(text.contains("Encontre 1 libro(s):"));
        assert!(text.contains("- Dune por Frank Herbert -- $19.99"));
    }
}
