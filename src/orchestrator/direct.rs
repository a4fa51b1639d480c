//! Direct executors for read-only actions.
//!
//! No workflow, no staged writes: one storage read, one result. Failures here
//! are user-facing messages, not errors.

use std::sync::Arc;

use tracing::{debug, info};

use crate::actions::StoreAction;
use crate::entity::{self, EntityResolution};
use crate::error::AgentError;
use crate::extract::{extract_keywords, extract_number, NumberContext};
use crate::flow::ActionResult;
use crate::store::Store;

const SEARCH_LIMIT: i64 = 10;
const RECOMMEND_LIMIT: i64 = 5;

pub async fn execute(
    store: &Arc<dyn Store>,
    action: StoreAction,
    query: &str,
    user_id: i64,
) -> Result<ActionResult, AgentError> {
    match action {
        StoreAction::SearchBooks => search_books(store, query).await,
        StoreAction::RecommendBooks => recommend_books(store, query).await,
        StoreAction::BookDetails => book_details(store, query).await,
        StoreAction::CheckStock => check_stock(store, query).await,
        StoreAction::ViewCart => view_cart(store, user_id).await,
        StoreAction::OrderStatus => order_status(store, query, user_id).await,
        other => Err(AgentError::UnknownAction(format!(
            "{} is not a direct action",
            other.name()
        ))),
    }
}

async fn search_books(store: &Arc<dyn Store>, query: &str) -> Result<ActionResult, AgentError> {
    let keywords = extract_keywords(query);
    let books = if keywords.is_empty() {
        let mut all = store.all_books().await?;
        all.truncate(SEARCH_LIMIT as usize);
        all
    } else {
        store.search_books(&keywords, SEARCH_LIMIT).await?
    };
    info!(keywords = ?keywords, results = books.len(), "book search");
    Ok(ActionResult::SearchResults { books })
}

async fn recommend_books(store: &Arc<dyn Store>, query: &str) -> Result<ActionResult, AgentError> {
    let keywords = extract_keywords(query);
    let books = if keywords.is_empty() {
        let mut all = store.all_books().await?;
        all.truncate(RECOMMEND_LIMIT as usize);
        all
    } else {
        store.books_by_genre(&keywords, RECOMMEND_LIMIT).await?
    };
    info!(results = books.len(), "recommendations");
    Ok(ActionResult::Recommendations { books })
}

async fn book_details(store: &Arc<dyn Store>, query: &str) -> Result<ActionResult, AgentError> {
    match resolve(store, query).await? {
        Ok(book) => {
            debug!(title = %book.title, "book details");
            Ok(ActionResult::BookDetails { book })
        }
        Err(message) => Ok(ActionResult::Failure { message }),
    }
}

async fn check_stock(store: &Arc<dyn Store>, query: &str) -> Result<ActionResult, AgentError> {
    match resolve(store, query).await? {
        Ok(book) => {
            debug!(title = %book.title, stock = book.stock, "stock check");
            Ok(ActionResult::StockStatus {
                title: book.title,
                stock: book.stock,
            })
        }
        Err(message) => Ok(ActionResult::Failure { message }),
    }
}

async fn view_cart(store: &Arc<dyn Store>, user_id: i64) -> Result<ActionResult, AgentError> {
    let lines = match store.active_cart(user_id).await? {
        Some(cart) => store.cart_lines(cart.id).await?,
        None => Vec::new(),
    };
    let total = lines.iter().map(|l| l.subtotal()).sum();
    Ok(ActionResult::CartContents { lines, total })
}

async fn order_status(
    store: &Arc<dyn Store>,
    query: &str,
    user_id: i64,
) -> Result<ActionResult, AgentError> {
    let order = match extract_number(query, NumberContext::OrderId) {
        Some(order_id) => store.order(order_id, user_id).await?,
        None => store.latest_order(user_id).await?,
    };
    match order {
        Some(order) => Ok(ActionResult::OrderStatusReport {
            order_id: order.id,
            status: order.status,
            total: order.total,
        }),
        None => Ok(ActionResult::Failure {
            message: "No se encontró la orden".to_string(),
        }),
    }
}

async fn resolve(
    store: &Arc<dyn Store>,
    query: &str,
) -> Result<Result<crate::store::models::Book, String>, AgentError> {
    let books = store.all_books().await?;
    Ok(match entity::resolve_book(query, &books) {
        EntityResolution::Found(book) => Ok(book),
        EntityResolution::Ambiguous(_) => {
            Err("Encontré varios libros, sé más específico".to_string())
        }
        EntityResolution::NotFound => Err("No pude identificar el libro".to_string()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::models::{Book, OrderStatus};
    use crate::store::MemStore;

    fn catalog() -> Vec<Book> {
        vec![
            Book {
                id: 1,
                title: "Dune".into(),
                author: "Frank Herbert".into(),
                genre: Some("ciencia ficción".into()),
                price: 19.99,
                stock: 25,
                description: Some("Arrakis".into()),
            },
            Book {
                id: 2,
                title: "El Resplandor".into(),
                author: "Stephen King".into(),
                genre: Some("terror".into()),
                price: 15.50,
                stock: 0,
                description: None,
            },
        ]
    }

    fn store() -> Arc<dyn Store> {
        Arc::new(MemStore::with_books(catalog()))
    }

    #[tokio::test]
    async fn search_filters_by_keyword() {
        let result = execute(&store(), StoreAction::SearchBooks, "busca libros de terror", 1)
            .await
            .unwrap();
        let ActionResult::SearchResults { books } = result else {
            panic!("expected SearchResults");
        };
        assert_eq!(books.len(), 1);
        assert_eq!(books[0].id, 2);
    }

    #[tokio::test]
    async fn recommend_filters_by_genre_only() {
        let result = execute(&store(), StoreAction::RecommendBooks, "recomiéndame terror", 1)
            .await
            .unwrap();
        let ActionResult::Recommendations { books } = result else {
            panic!("expected Recommendations");
        };
        assert_eq!(books.len(), 1);
        assert_eq!(books[0].genre.as_deref(), Some("terror"));
    }

    #[tokio::test]
    async fn details_resolves_the_book() {
        let result = execute(&store(), StoreAction::BookDetails, "cuéntame sobre Dune", 1)
            .await
            .unwrap();
        let ActionResult::BookDetails { book } = result else {
            panic!("expected BookDetails");
        };
        assert_eq!(book.id, 1);
    }

    #[tokio::test]
    async fn stock_check_reports_zero_stock() {
        let result = execute(&store(), StoreAction::CheckStock, "hay stock de El Resplandor?", 1)
            .await
            .unwrap();
        let ActionResult::StockStatus { stock, .. } = result else {
            panic!("expected StockStatus");
        };
        assert_eq!(stock, 0);
    }

    #[tokio::test]
    async fn unknown_book_is_a_user_message() {
        let result = execute(&store(), StoreAction::CheckStock, "hay stock de Rayuela?", 1)
            .await
            .unwrap();
        assert!(matches!(result, ActionResult::Failure { .. }));
    }

    #[tokio::test]
    async fn view_cart_without_cart_is_empty() {
        let result = execute(&store(), StoreAction::ViewCart, "ver mi carrito", 1)
            .await
            .unwrap();
        let ActionResult::CartContents { lines, total } = result else {
            panic!("expected CartContents");
        };
        assert!(lines.is_empty());
        assert_eq!(total, 0.0);
    }

    #[tokio::test]
    async fn order_status_uses_marker_or_latest() {
        let mem = MemStore::with_books(catalog());
        let first = mem.seed_order(1, OrderStatus::Paid, 10.0);
        let latest = mem.seed_order(1, OrderStatus::Created, 20.0);
        let store: Arc<dyn Store> = Arc::new(mem);

        let result = execute(&store, StoreAction::OrderStatus, &format!("estado de la orden #{first}"), 1)
            .await
            .unwrap();
        let ActionResult::OrderStatusReport { order_id, .. } = result else {
            panic!("expected report");
        };
        assert_eq!(order_id, first);

        let result = execute(&store, StoreAction::OrderStatus, "cómo va mi pedido", 1)
            .await
            .unwrap();
        let ActionResult::OrderStatusReport { order_id, .. } = result else {
            panic!("expected report");
        };
        assert_eq!(order_id, latest);
    }
}
