//! Postgres implementation of the [`Store`] trait.
//!
//! Plain `sqlx::query` with binds; no joins beyond following foreign keys.
//! Embeddings are stored as JSON arrays alongside the catalog rows, loaded
//! wholesale per resolution (the action catalog is a handful of rows).

use async_trait::async_trait;
use chrono::Utc;
use sqlx::{PgPool, Postgres, Row, Transaction};
use tracing::debug;

use super::models::{
    Book, Cart, CartLine, CartStatus, ExecutionLogEntry, Order, OrderStatus, SemanticAction,
};
use super::{PersistReceipt, StagedWrite, Store, StoreError};

pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    fn book_from_row(row: &sqlx::postgres::PgRow) -> Book {
        Book {
            id: row.get("id"),
            title: row.get("title"),
            author: row.get("author"),
            genre: row.get("genre"),
            price: row.get("price"),
            stock: row.get("stock"),
            description: row.get("description"),
        }
    }

    fn order_from_row(row: &sqlx::postgres::PgRow) -> Result<Order, StoreError> {
        let status: String = row.get("status");
        let status = OrderStatus::parse(&status)
            .ok_or_else(|| StoreError::Corrupt(format!("unknown order status '{status}'")))?;
        Ok(Order {
            id: row.get("id"),
            user_id: row.get("user_id"),
            status,
            total: row.get("total"),
        })
    }

    fn vectors_from_json(value: &serde_json::Value) -> Vec<f32> {
        value
            .as_array()
            .map(|arr| arr.iter().filter_map(|v| v.as_f64()).map(|v| v as f32).collect())
            .unwrap_or_default()
    }
}

#[async_trait]
impl Store for PgStore {
    async fn book(&self, id: i64) -> Result<Option<Book>, StoreError> {
        let row = sqlx::query("SELECT id, title, author, genre, price, stock, description FROM books WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(|r| Self::book_from_row(&r)))
    }

    async fn all_books(&self) -> Result<Vec<Book>, StoreError> {
        let rows = sqlx::query(
            "SELECT id, title, author, genre, price, stock, description FROM books ORDER BY id",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.iter().map(Self::book_from_row).collect())
    }

    async fn search_books(&self, keywords: &[String], limit: i64) -> Result<Vec<Book>, StoreError> {
        if keywords.is_empty() {
            let rows = sqlx::query(
                "SELECT id, title, author, genre, price, stock, description FROM books LIMIT $1",
            )
            .bind(limit)
            .fetch_all(&self.pool)
            .await?;
            return Ok(rows.iter().map(Self::book_from_row).collect());
        }

        // One ILIKE condition per keyword over title/author/genre
        let patterns: Vec<String> = keywords.iter().map(|k| format!("%{k}%")).collect();
        let rows = sqlx::query(
            r#"
            SELECT id, title, author, genre, price, stock, description
            FROM books
            WHERE EXISTS (
                SELECT 1 FROM unnest($1::text[]) AS kw
                WHERE title ILIKE kw OR author ILIKE kw OR COALESCE(genre, '') ILIKE kw
            )
            LIMIT $2
            "#,
        )
        .bind(&patterns)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.iter().map(Self::book_from_row).collect())
    }

    async fn books_by_genre(
        &self,
        keywords: &[String],
        limit: i64,
    ) -> Result<Vec<Book>, StoreError> {
        if keywords.is_empty() {
            let rows = sqlx::query(
                "SELECT id, title, author, genre, price, stock, description FROM books LIMIT $1",
            )
            .bind(limit)
            .fetch_all(&self.pool)
            .await?;
            return Ok(rows.iter().map(Self::book_from_row).collect());
        }

        let patterns: Vec<String> = keywords.iter().map(|k| format!("%{k}%")).collect();
        let rows = sqlx::query(
            r#"
            SELECT id, title, author, genre, price, stock, description
            FROM books
            WHERE EXISTS (
                SELECT 1 FROM unnest($1::text[]) AS kw
                WHERE COALESCE(genre, '') ILIKE kw
            )
            LIMIT $2
            "#,
        )
        .bind(&patterns)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.iter().map(Self::book_from_row).collect())
    }

    async fn semantic_actions(&self) -> Result<Vec<SemanticAction>, StoreError> {
        let rows = sqlx::query(
            "SELECT id, name, description, examples, embedding FROM semantic_actions ORDER BY id",
        )
        .fetch_all(&self.pool)
        .await?;

        let mut actions = Vec::with_capacity(rows.len());
        for row in &rows {
            let examples: serde_json::Value = row.get("examples");
            let combined: Option<serde_json::Value> = row.get("embedding");
            actions.push(SemanticAction {
                id: row.get("id"),
                name: row.get("name"),
                description: row.get("description"),
                examples: examples
                    .as_array()
                    .map(|arr| {
                        arr.iter()
                            .filter_map(|v| v.as_str().map(String::from))
                            .collect()
                    })
                    .unwrap_or_default(),
                combined_embedding: combined.as_ref().map(Self::vectors_from_json),
                description_embeddings: Vec::new(),
                example_embeddings: Vec::new(),
            });
        }

        // Per-text vectors, grouped onto their actions
        let emb_rows = sqlx::query(
            "SELECT action_id, kind, embedding FROM semantic_action_embeddings ORDER BY id",
        )
        .fetch_all(&self.pool)
        .await?;
        for row in &emb_rows {
            let action_id: i64 = row.get("action_id");
            let kind: String = row.get("kind");
            let embedding: serde_json::Value = row.get("embedding");
            let vector = Self::vectors_from_json(&embedding);
            if let Some(action) = actions.iter_mut().find(|a| a.id == action_id) {
                match kind.as_str() {
                    "description" => action.description_embeddings.push(vector),
                    "example" => action.example_embeddings.push(vector),
                    other => {
                        return Err(StoreError::Corrupt(format!(
                            "unknown embedding kind '{other}' for action {action_id}"
                        )))
                    }
                }
            }
        }

        Ok(actions)
    }

    async fn active_cart(&self, user_id: i64) -> Result<Option<Cart>, StoreError> {
        let row = sqlx::query("SELECT id, user_id, status FROM carts WHERE user_id = $1 AND status = 'active'")
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?;
        row.map(|r| {
            let status: String = r.get("status");
            let status = CartStatus::parse(&status)
                .ok_or_else(|| StoreError::Corrupt(format!("unknown cart status '{status}'")))?;
            Ok(Cart {
                id: r.get("id"),
                user_id: r.get("user_id"),
                status,
            })
        })
        .transpose()
    }

    async fn cart_lines(&self, cart_id: i64) -> Result<Vec<CartLine>, StoreError> {
        let rows = sqlx::query(
            r#"
            SELECT ci.book_id, b.title, b.price, ci.quantity
            FROM cart_items ci
            JOIN books b ON b.id = ci.book_id
            WHERE ci.cart_id = $1
            ORDER BY ci.id
            "#,
        )
        .bind(cart_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows
            .iter()
            .map(|r| CartLine {
                book_id: r.get("book_id"),
                title: r.get("title"),
                unit_price: r.get("price"),
                quantity: r.get("quantity"),
            })
            .collect())
    }

    async fn order(&self, order_id: i64, user_id: i64) -> Result<Option<Order>, StoreError> {
        let row = sqlx::query(
            "SELECT id, user_id, status, total FROM orders WHERE id = $1 AND user_id = $2",
        )
        .bind(order_id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;
        row.map(|r| Self::order_from_row(&r)).transpose()
    }

    async fn latest_created_order(&self, user_id: i64) -> Result<Option<Order>, StoreError> {
        let row = sqlx::query(
            r#"
            SELECT id, user_id, status, total FROM orders
            WHERE user_id = $1 AND status = 'created'
            ORDER BY created_at DESC LIMIT 1
            "#,
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;
        row.map(|r| Self::order_from_row(&r)).transpose()
    }

    async fn latest_order(&self, user_id: i64) -> Result<Option<Order>, StoreError> {
        let row = sqlx::query(
            "SELECT id, user_id, status, total FROM orders WHERE user_id = $1 ORDER BY created_at DESC LIMIT 1",
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;
        row.map(|r| Self::order_from_row(&r)).transpose()
    }

    async fn persist(&self, writes: &[StagedWrite]) -> Result<PersistReceipt, StoreError> {
        let mut tx = self.pool.begin().await?;
        let mut receipt = PersistReceipt::default();

        for write in writes {
            apply_write(&mut tx, write, &mut receipt).await?;
        }

        tx.commit().await?;
        debug!(?receipt, "persisted {} staged write(s)", writes.len());
        Ok(receipt)
    }

    async fn log_execution(&self, entry: &ExecutionLogEntry) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO execution_logs
                (user_id, session_id, query, matched_action, similarity, method,
                 top_candidates, state_trace, result, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            "#,
        )
        .bind(entry.user_id)
        .bind(entry.session_id)
        .bind(&entry.query)
        .bind(&entry.matched_action)
        .bind(entry.similarity)
        .bind(&entry.method)
        .bind(&entry.top_candidates)
        .bind(&entry.state_trace)
        .bind(&entry.result)
        .bind(entry.created_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

async fn apply_write(
    tx: &mut Transaction<'_, Postgres>,
    write: &StagedWrite,
    receipt: &mut PersistReceipt,
) -> Result<(), StoreError> {
    match write {
        StagedWrite::CreateCart { user_id } => {
            let row =
                sqlx::query("INSERT INTO carts (user_id, status) VALUES ($1, 'active') RETURNING id")
                    .bind(user_id)
                    .fetch_one(&mut **tx)
                    .await?;
            receipt.cart_id = Some(row.get("id"));
        }
        StagedWrite::UpsertCartItem {
            cart_id,
            book_id,
            quantity,
        } => {
            let cart_id = cart_id.or(receipt.cart_id).ok_or_else(|| {
                StoreError::Corrupt("UpsertCartItem staged without a cart".into())
            })?;
            let existing = sqlx::query(
                "SELECT id, quantity FROM cart_items WHERE cart_id = $1 AND book_id = $2",
            )
            .bind(cart_id)
            .bind(book_id)
            .fetch_optional(&mut **tx)
            .await?;
            match existing {
                Some(row) => {
                    let id: i64 = row.get("id");
                    let current: i32 = row.get("quantity");
                    sqlx::query("UPDATE cart_items SET quantity = $1 WHERE id = $2")
                        .bind(current + quantity)
                        .bind(id)
                        .execute(&mut **tx)
                        .await?;
                }
                None => {
                    sqlx::query(
                        "INSERT INTO cart_items (cart_id, book_id, quantity) VALUES ($1, $2, $3)",
                    )
                    .bind(cart_id)
                    .bind(book_id)
                    .bind(quantity)
                    .execute(&mut **tx)
                    .await?;
                }
            }
            receipt.cart_id = Some(cart_id);
        }
        StagedWrite::RemoveCartItem { cart_id, book_id } => {
            sqlx::query("DELETE FROM cart_items WHERE cart_id = $1 AND book_id = $2")
                .bind(cart_id)
                .bind(book_id)
                .execute(&mut **tx)
                .await?;
        }
        StagedWrite::CreateOrder {
            user_id,
            total,
            items,
        } => {
            let row = sqlx::query(
                "INSERT INTO orders (user_id, status, total, created_at) VALUES ($1, 'created', $2, $3) RETURNING id",
            )
            .bind(user_id)
            .bind(total)
            .bind(Utc::now())
            .fetch_one(&mut **tx)
            .await?;
            let order_id: i64 = row.get("id");
            for (book_id, quantity, unit_price) in items {
                sqlx::query(
                    "INSERT INTO order_items (order_id, book_id, quantity, unit_price) VALUES ($1, $2, $3, $4)",
                )
                .bind(order_id)
                .bind(book_id)
                .bind(quantity)
                .bind(unit_price)
                .execute(&mut **tx)
                .await?;
            }
            receipt.order_id = Some(order_id);
        }
        StagedWrite::MarkCartCheckedOut { cart_id } => {
            sqlx::query("UPDATE carts SET status = 'checked_out' WHERE id = $1")
                .bind(cart_id)
                .execute(&mut **tx)
                .await?;
        }
        StagedWrite::InsertPayment {
            order_id,
            amount,
            status,
        } => {
            let order_id = order_id.or(receipt.order_id).ok_or_else(|| {
                StoreError::Corrupt("InsertPayment staged without an order".into())
            })?;
            sqlx::query(
                "INSERT INTO payments (order_id, amount, status, created_at) VALUES ($1, $2, $3, $4)",
            )
            .bind(order_id)
            .bind(amount)
            .bind(status.as_str())
            .bind(Utc::now())
            .execute(&mut **tx)
            .await?;
        }
        StagedWrite::SetOrderStatus { order_id, status } => {
            let order_id = order_id.or(receipt.order_id).ok_or_else(|| {
                StoreError::Corrupt("SetOrderStatus staged without an order".into())
            })?;
            sqlx::query("UPDATE orders SET status = $1 WHERE id = $2")
                .bind(status.as_str())
                .bind(order_id)
                .execute(&mut **tx)
                .await?;
        }
    }
    Ok(())
}
