//! In-memory [`Store`] used by the test suites and the offline demo mode.
//!
//! Mirrors `PgStore` behavior closely enough for workflow tests: id minting,
//! receipt chaining inside a write batch, and all-or-nothing batches (the
//! snapshot is only swapped in after every write applies cleanly).

use std::sync::Mutex;

use async_trait::async_trait;
use tracing::debug;

use super::models::{
    Book, Cart, CartItem, CartLine, CartStatus, ExecutionLogEntry, Order, OrderItem, OrderStatus,
    PaymentStatus, SemanticAction,
};
use super::{PersistReceipt, StagedWrite, Store, StoreError};

#[derive(Debug, Default, Clone)]
struct Inner {
    books: Vec<Book>,
    carts: Vec<Cart>,
    cart_items: Vec<CartItem>,
    orders: Vec<Order>,
    order_items: Vec<OrderItem>,
    payments: Vec<PaymentRow>,
    actions: Vec<SemanticAction>,
    logs: Vec<ExecutionLogEntry>,
    next_cart_id: i64,
    next_cart_item_id: i64,
    next_order_id: i64,
}

#[derive(Debug, Clone)]
struct PaymentRow {
    order_id: i64,
    amount: f64,
    status: PaymentStatus,
}

#[derive(Debug, Default)]
pub struct MemStore {
    inner: Mutex<Inner>,
}

impl MemStore {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Inner {
                next_cart_id: 1,
                next_cart_item_id: 1,
                next_order_id: 1,
                ..Inner::default()
            }),
        }
    }

    pub fn with_books(books: Vec<Book>) -> Self {
        let store = Self::new();
        store.lock().books = books;
        store
    }

    pub fn add_action(&self, action: SemanticAction) {
        self.lock().actions.push(action);
    }

    /// Seed an active cart with lines, returning the cart id.
    pub fn seed_cart(&self, user_id: i64, lines: &[(i64, i32)]) -> i64 {
        let mut inner = self.lock();
        let cart_id = inner.next_cart_id;
        inner.next_cart_id += 1;
        inner.carts.push(Cart {
            id: cart_id,
            user_id,
            status: CartStatus::Active,
        });
        for &(book_id, quantity) in lines {
            let id = inner.next_cart_item_id;
            inner.next_cart_item_id += 1;
            inner.cart_items.push(CartItem {
                id,
                cart_id,
                book_id,
                quantity,
            });
        }
        cart_id
    }

    /// Seed an order directly, returning the order id.
    pub fn seed_order(&self, user_id: i64, status: OrderStatus, total: f64) -> i64 {
        let mut inner = self.lock();
        let order_id = inner.next_order_id;
        inner.next_order_id += 1;
        inner.orders.push(Order {
            id: order_id,
            user_id,
            status,
            total,
        });
        order_id
    }

    pub fn book_stock(&self, book_id: i64) -> Option<i32> {
        self.lock().books.iter().find(|b| b.id == book_id).map(|b| b.stock)
    }

    pub fn order_status(&self, order_id: i64) -> Option<OrderStatus> {
        self.lock().orders.iter().find(|o| o.id == order_id).map(|o| o.status)
    }

    pub fn payment_count(&self) -> usize {
        self.lock().payments.len()
    }

    pub fn execution_logs(&self) -> Vec<ExecutionLogEntry> {
        self.lock().logs.clone()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        match self.inner.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

fn keyword_hit(book: &Book, keyword: &str) -> bool {
    let needle = keyword.to_lowercase();
    book.title.to_lowercase().contains(&needle)
        || book.author.to_lowercase().contains(&needle)
        || book
            .genre
            .as_deref()
            .map(|g| g.to_lowercase().contains(&needle))
            .unwrap_or(false)
}

#[async_trait]
impl Store for MemStore {
    async fn book(&self, id: i64) -> Result<Option<Book>, StoreError> {
        Ok(self.lock().books.iter().find(|b| b.id == id).cloned())
    }

    async fn all_books(&self) -> Result<Vec<Book>, StoreError> {
        Ok(self.lock().books.clone())
    }

    async fn search_books(&self, keywords: &[String], limit: i64) -> Result<Vec<Book>, StoreError> {
        let inner = self.lock();
        let hits = inner
            .books
            .iter()
            .filter(|b| keywords.iter().any(|k| keyword_hit(b, k)))
            .take(limit as usize)
            .cloned()
            .collect();
        Ok(hits)
    }

    async fn books_by_genre(
        &self,
        keywords: &[String],
        limit: i64,
    ) -> Result<Vec<Book>, StoreError> {
        let inner = self.lock();
        let hits = inner
            .books
            .iter()
            .filter(|b| {
                let genre = b.genre.as_deref().unwrap_or("").to_lowercase();
                keywords.iter().any(|k| genre.contains(&k.to_lowercase()))
            })
            .take(limit as usize)
            .cloned()
            .collect();
        Ok(hits)
    }

    async fn semantic_actions(&self) -> Result<Vec<SemanticAction>, StoreError> {
        Ok(self.lock().actions.clone())
    }

    async fn active_cart(&self, user_id: i64) -> Result<Option<Cart>, StoreError> {
        Ok(self
            .lock()
            .carts
            .iter()
            .find(|c| c.user_id == user_id && c.status == CartStatus::Active)
            .cloned())
    }

    async fn cart_lines(&self, cart_id: i64) -> Result<Vec<CartLine>, StoreError> {
        let inner = self.lock();
        let mut lines = Vec::new();
        for item in inner.cart_items.iter().filter(|i| i.cart_id == cart_id) {
            let book = inner
                .books
                .iter()
                .find(|b| b.id == item.book_id)
                .ok_or_else(|| {
                    StoreError::Corrupt(format!("cart line references missing book {}", item.book_id))
                })?;
            lines.push(CartLine {
                book_id: book.id,
                title: book.title.clone(),
                unit_price: book.price,
                quantity: item.quantity,
            });
        }
        Ok(lines)
    }

    async fn order(&self, order_id: i64, user_id: i64) -> Result<Option<Order>, StoreError> {
        Ok(self
            .lock()
            .orders
            .iter()
            .find(|o| o.id == order_id && o.user_id == user_id)
            .cloned())
    }

    async fn latest_created_order(&self, user_id: i64) -> Result<Option<Order>, StoreError> {
        Ok(self
            .lock()
            .orders
            .iter()
            .filter(|o| o.user_id == user_id && o.status == OrderStatus::Created)
            .max_by_key(|o| o.id)
            .cloned())
    }

    async fn latest_order(&self, user_id: i64) -> Result<Option<Order>, StoreError> {
        Ok(self
            .lock()
            .orders
            .iter()
            .filter(|o| o.user_id == user_id)
            .max_by_key(|o| o.id)
            .cloned())
    }

    async fn persist(&self, writes: &[StagedWrite]) -> Result<PersistReceipt, StoreError> {
        let mut inner = self.lock();
        // Apply against a copy so a mid-batch failure leaves nothing behind.
        let mut draft = inner.clone();
        let mut receipt = PersistReceipt::default();

        for write in writes {
            apply_write(&mut draft, write, &mut receipt)?;
        }

        debug!(writes = writes.len(), ?receipt, "persisted write batch");
        *inner = draft;
        Ok(receipt)
    }

    async fn log_execution(&self, entry: &ExecutionLogEntry) -> Result<(), StoreError> {
        self.lock().logs.push(entry.clone());
        Ok(())
    }
}

fn apply_write(
    draft: &mut Inner,
    write: &StagedWrite,
    receipt: &mut PersistReceipt,
) -> Result<(), StoreError> {
    match write {
        StagedWrite::CreateCart { user_id } => {
            let id = draft.next_cart_id;
            draft.next_cart_id += 1;
            draft.carts.push(Cart {
                id,
                user_id: *user_id,
                status: CartStatus::Active,
            });
            receipt.cart_id = Some(id);
        }
        StagedWrite::UpsertCartItem {
            cart_id,
            book_id,
            quantity,
        } => {
            let cart_id = cart_id.or(receipt.cart_id).ok_or_else(|| {
                StoreError::Corrupt("UpsertCartItem staged without a cart".into())
            })?;
            if let Some(item) = draft
                .cart_items
                .iter_mut()
                .find(|i| i.cart_id == cart_id && i.book_id == *book_id)
            {
                item.quantity += quantity;
            } else {
                let id = draft.next_cart_item_id;
                draft.next_cart_item_id += 1;
                draft.cart_items.push(CartItem {
                    id,
                    cart_id,
                    book_id: *book_id,
                    quantity: *quantity,
                });
            }
        }
        StagedWrite::RemoveCartItem { cart_id, book_id } => {
            draft
                .cart_items
                .retain(|i| !(i.cart_id == *cart_id && i.book_id == *book_id));
        }
        StagedWrite::CreateOrder {
            user_id,
            total,
            items,
        } => {
            let id = draft.next_order_id;
            draft.next_order_id += 1;
            draft.orders.push(Order {
                id,
                user_id: *user_id,
                status: OrderStatus::Created,
                total: *total,
            });
            for &(book_id, quantity, unit_price) in items {
                draft.order_items.push(OrderItem {
                    order_id: id,
                    book_id,
                    quantity,
                    unit_price,
                });
            }
            receipt.order_id = Some(id);
        }
        StagedWrite::MarkCartCheckedOut { cart_id } => {
            let cart = draft
                .carts
                .iter_mut()
                .find(|c| c.id == *cart_id)
                .ok_or_else(|| {
                    StoreError::Corrupt(format!("MarkCartCheckedOut on missing cart {cart_id}"))
                })?;
            cart.status = CartStatus::CheckedOut;
        }
        StagedWrite::InsertPayment {
            order_id,
            amount,
            status,
        } => {
            let order_id = order_id.or(receipt.order_id).ok_or_else(|| {
                StoreError::Corrupt("InsertPayment staged without an order".into())
            })?;
            draft.payments.push(PaymentRow {
                order_id,
                amount: *amount,
                status: *status,
            });
        }
        StagedWrite::SetOrderStatus { order_id, status } => {
            let order_id = order_id.or(receipt.order_id).ok_or_else(|| {
                StoreError::Corrupt("SetOrderStatus staged without an order".into())
            })?;
            let order = draft
                .orders
                .iter_mut()
                .find(|o| o.id == order_id)
                .ok_or_else(|| {
                    StoreError::Corrupt(format!("SetOrderStatus on missing order {order_id}"))
                })?;
            order.status = *status;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn book(id: i64, title: &str, genre: &str, price: f64, stock: i32) -> Book {
        Book {
            id,
            title: title.to_string(),
            author: "A. Autor".to_string(),
            genre: Some(genre.to_string()),
            price,
            stock,
            description: None,
        }
    }

    #[tokio::test]
    async fn upsert_merges_quantity_into_existing_line() {
        let store = MemStore::with_books(vec![book(1, "Dune", "sci-fi", 19.99, 10)]);
        store
            .persist(&[
                StagedWrite::CreateCart { user_id: 1 },
                StagedWrite::UpsertCartItem {
                    cart_id: None,
                    book_id: 1,
                    quantity: 2,
                },
            ])
            .await
            .unwrap();
        let cart = store.active_cart(1).await.unwrap().unwrap();
        store
            .persist(&[StagedWrite::UpsertCartItem {
                cart_id: Some(cart.id),
                book_id: 1,
                quantity: 3,
            }])
            .await
            .unwrap();

        let lines = store.cart_lines(cart.id).await.unwrap();
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].quantity, 5);
    }

    #[tokio::test]
    async fn failed_batch_leaves_state_untouched() {
        let store = MemStore::with_books(vec![book(1, "Dune", "sci-fi", 19.99, 10)]);
        let err = store
            .persist(&[
                StagedWrite::CreateCart { user_id: 1 },
                StagedWrite::SetOrderStatus {
                    order_id: Some(99),
                    status: OrderStatus::Paid,
                },
            ])
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Corrupt(_)));
        assert!(store.active_cart(1).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn create_order_feeds_following_payment() {
        let store = MemStore::new();
        let receipt = store
            .persist(&[
                StagedWrite::CreateOrder {
                    user_id: 1,
                    total: 39.98,
                    items: vec![(1, 2, 19.99)],
                },
                StagedWrite::InsertPayment {
                    order_id: None,
                    amount: 39.98,
                    status: PaymentStatus::Approved,
                },
                StagedWrite::SetOrderStatus {
                    order_id: None,
                    status: OrderStatus::Paid,
                },
            ])
            .await
            .unwrap();

        let order_id = receipt.order_id.unwrap();
        assert_eq!(store.order_status(order_id), Some(OrderStatus::Paid));
        assert_eq!(store.payment_count(), 1);
    }
}
