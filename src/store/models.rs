//! Row types for the storage collaborator.
//!
//! Integer surrogate keys throughout; statuses are typed enums persisted as
//! text, with `created → paid|cancelled` monotone for orders and
//! `active → checked_out` exactly-once for carts.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Book {
    pub id: i64,
    pub title: String,
    pub author: String,
    pub genre: Option<String>,
    pub price: f64,
    pub stock: i32,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CartStatus {
    Active,
    CheckedOut,
}

impl CartStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CartStatus::Active => "active",
            CartStatus::CheckedOut => "checked_out",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "active" => Some(CartStatus::Active),
            "checked_out" => Some(CartStatus::CheckedOut),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Cart {
    pub id: i64,
    pub user_id: i64,
    pub status: CartStatus,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CartItem {
    pub id: i64,
    pub cart_id: i64,
    pub book_id: i64,
    pub quantity: i32,
}

/// A cart line joined with its book, as the checkout and view-cart paths
/// consume it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CartLine {
    pub book_id: i64,
    pub title: String,
    pub unit_price: f64,
    pub quantity: i32,
}

impl CartLine {
    pub fn subtotal(&self) -> f64 {
        self.unit_price * self.quantity as f64
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    Created,
    Paid,
    Cancelled,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Created => "created",
            OrderStatus::Paid => "paid",
            OrderStatus::Cancelled => "cancelled",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "created" => Some(OrderStatus::Created),
            "paid" => Some(OrderStatus::Paid),
            "cancelled" => Some(OrderStatus::Cancelled),
            _ => None,
        }
    }

    /// `paid` and `cancelled` are terminal; no transition is defined out of
    /// either.
    pub fn is_terminal(&self) -> bool {
        matches!(self, OrderStatus::Paid | OrderStatus::Cancelled)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    pub id: i64,
    pub user_id: i64,
    pub status: OrderStatus,
    pub total: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderItem {
    pub order_id: i64,
    pub book_id: i64,
    pub quantity: i32,
    pub unit_price: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    Approved,
    Rejected,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Approved => "approved",
            PaymentStatus::Rejected => "rejected",
        }
    }
}

/// Catalog definition of one resolvable action, with its reference vectors.
///
/// `description_embeddings` / `example_embeddings` are the per-text vectors
/// used by the multi-vector scoring path; `combined_embedding` is the legacy
/// single vector used when per-text vectors are absent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SemanticAction {
    pub id: i64,
    pub name: String,
    pub description: String,
    pub examples: Vec<String>,
    pub combined_embedding: Option<Vec<f32>>,
    pub description_embeddings: Vec<Vec<f32>>,
    pub example_embeddings: Vec<Vec<f32>>,
}

impl SemanticAction {
    pub fn has_individual_embeddings(&self) -> bool {
        !self.description_embeddings.is_empty() || !self.example_embeddings.is_empty()
    }
}

/// Append-only audit record, one per processed query.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionLogEntry {
    pub user_id: i64,
    pub session_id: Option<i64>,
    pub query: String,
    pub matched_action: String,
    pub similarity: f32,
    pub method: String,
    pub top_candidates: serde_json::Value,
    pub state_trace: Option<serde_json::Value>,
    pub result: String,
    pub created_at: DateTime<Utc>,
}
