//! Storage collaborator.
//!
//! The core talks to persistence through the [`Store`] trait: simple
//! equality/prefix reads plus a single transactional [`Store::persist`] per
//! workflow. `PgStore` is the Postgres implementation; `MemStore` is the
//! in-memory double the tests run against.
//!
//! Concurrency note: no application-level locking happens here. Two
//! simultaneous requests from the same user race at the database level and
//! are serialized only by the one-commit-per-workflow transaction.

pub mod memory;
pub mod models;
pub mod postgres;

pub use memory::MemStore;
pub use postgres::PgStore;

use async_trait::async_trait;
use thiserror::Error;

use models::{
    Book, Cart, CartLine, ExecutionLogEntry, Order, OrderStatus, PaymentStatus, SemanticAction,
};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("inconsistent row data: {0}")]
    Corrupt(String),
}

/// A side effect staged by `APPLY_ACTION`, executed by `PERSIST`.
///
/// Writes that depend on a row created earlier in the same batch reference it
/// implicitly: `UpsertCartItem { cart_id: None }` targets the cart created by
/// a preceding `CreateCart`, and `CreateOrder` feeds the order id into any
/// following `InsertPayment`/`SetOrderStatus` with `order_id: None`.
#[derive(Debug, Clone, PartialEq)]
pub enum StagedWrite {
    CreateCart {
        user_id: i64,
    },
    /// Merge `quantity` into an existing line or insert a new one.
    UpsertCartItem {
        cart_id: Option<i64>,
        book_id: i64,
        quantity: i32,
    },
    RemoveCartItem {
        cart_id: i64,
        book_id: i64,
    },
    CreateOrder {
        user_id: i64,
        total: f64,
        items: Vec<(i64, i32, f64)>, // (book_id, quantity, unit_price)
    },
    MarkCartCheckedOut {
        cart_id: i64,
    },
    InsertPayment {
        order_id: Option<i64>,
        amount: f64,
        status: PaymentStatus,
    },
    SetOrderStatus {
        order_id: Option<i64>,
        status: OrderStatus,
    },
}

/// Row ids minted while persisting a write batch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PersistReceipt {
    pub cart_id: Option<i64>,
    pub order_id: Option<i64>,
}

#[async_trait]
pub trait Store: Send + Sync {
    // -- catalog reads ------------------------------------------------------

    async fn book(&self, id: i64) -> Result<Option<Book>, StoreError>;

    async fn all_books(&self) -> Result<Vec<Book>, StoreError>;

    /// Keyword search over title/author/genre, case-insensitive substring per
    /// keyword, capped at `limit`.
    async fn search_books(&self, keywords: &[String], limit: i64) -> Result<Vec<Book>, StoreError>;

    /// Genre-filtered selection for recommendations, capped at `limit`.
    async fn books_by_genre(&self, keywords: &[String], limit: i64)
        -> Result<Vec<Book>, StoreError>;

    async fn semantic_actions(&self) -> Result<Vec<SemanticAction>, StoreError>;

    // -- cart / order reads -------------------------------------------------

    async fn active_cart(&self, user_id: i64) -> Result<Option<Cart>, StoreError>;

    async fn cart_lines(&self, cart_id: i64) -> Result<Vec<CartLine>, StoreError>;

    async fn order(&self, order_id: i64, user_id: i64) -> Result<Option<Order>, StoreError>;

    /// Latest order in `created` state, used when pay/cancel arrives without
    /// an explicit order id.
    async fn latest_created_order(&self, user_id: i64) -> Result<Option<Order>, StoreError>;

    /// Latest order regardless of state, used by order-status queries.
    async fn latest_order(&self, user_id: i64) -> Result<Option<Order>, StoreError>;

    // -- writes -------------------------------------------------------------

    /// Execute a staged write batch in one transaction. Rolls back the whole
    /// batch on any failure.
    async fn persist(&self, writes: &[StagedWrite]) -> Result<PersistReceipt, StoreError>;

    /// Append one audit row. Callers swallow errors from this; it must never
    /// block a user-facing response.
    async fn log_execution(&self, entry: &ExecutionLogEntry) -> Result<(), StoreError>;
}
