//! The fixed set of store actions.
//!
//! Dispatch is keyed on this enum rather than on raw catalog strings, so every
//! action has exactly one route (flow engine or direct executor) checked at
//! compile time. Catalog rows still carry the string names; `from_name` /
//! `name` round-trip them.

use serde::{Deserialize, Serialize};

/// One of the store operations the agent can perform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StoreAction {
    SearchBooks,
    RecommendBooks,
    BookDetails,
    CheckStock,
    AddToCart,
    RemoveFromCart,
    ViewCart,
    Checkout,
    /// Request payment confirmation for an order (returns a prompt, mutates
    /// nothing).
    ProcessPayment,
    /// Execute a previously confirmed payment through the simulated gateway.
    ConfirmPayment,
    CancelOrder,
    OrderStatus,
}

impl StoreAction {
    pub const ALL: [StoreAction; 12] = [
        StoreAction::SearchBooks,
        StoreAction::RecommendBooks,
        StoreAction::BookDetails,
        StoreAction::CheckStock,
        StoreAction::AddToCart,
        StoreAction::RemoveFromCart,
        StoreAction::ViewCart,
        StoreAction::Checkout,
        StoreAction::ProcessPayment,
        StoreAction::ConfirmPayment,
        StoreAction::CancelOrder,
        StoreAction::OrderStatus,
    ];

    /// Catalog name as stored in `semantic_actions.name`.
    pub fn name(&self) -> &'static str {
        match self {
            StoreAction::SearchBooks => "search_books_for_sale",
            StoreAction::RecommendBooks => "recommend_books_for_purchase",
            StoreAction::BookDetails => "get_book_product_details",
            StoreAction::CheckStock => "check_book_stock",
            StoreAction::AddToCart => "add_book_to_cart",
            StoreAction::RemoveFromCart => "remove_book_from_cart",
            StoreAction::ViewCart => "view_cart",
            StoreAction::Checkout => "checkout_order",
            StoreAction::ProcessPayment => "process_payment",
            StoreAction::ConfirmPayment => "confirm_payment",
            StoreAction::CancelOrder => "cancel_order",
            StoreAction::OrderStatus => "get_order_status",
        }
    }

    pub fn from_name(name: &str) -> Option<StoreAction> {
        Self::ALL.iter().copied().find(|a| a.name() == name)
    }

    /// Transactional actions run through the flow engine; the rest execute as
    /// direct reads.
    pub fn is_transactional(&self) -> bool {
        matches!(
            self,
            StoreAction::AddToCart
                | StoreAction::RemoveFromCart
                | StoreAction::Checkout
                | StoreAction::ProcessPayment
                | StoreAction::ConfirmPayment
                | StoreAction::CancelOrder
        )
    }

    /// Actions that reference a concrete book and therefore need entity
    /// resolution before they can run.
    pub fn needs_book(&self) -> bool {
        matches!(
            self,
            StoreAction::AddToCart
                | StoreAction::RemoveFromCart
                | StoreAction::BookDetails
                | StoreAction::CheckStock
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_round_trip() {
        for action in StoreAction::ALL {
            assert_eq!(StoreAction::from_name(action.name()), Some(action));
        }
    }

    #[test]
    fn unknown_name_is_none() {
        assert_eq!(StoreAction::from_name("fly_to_the_moon"), None);
    }

    #[test]
    fn every_action_has_exactly_one_route() {
        let transactional: Vec<_> = StoreAction::ALL
            .iter()
            .filter(|a| a.is_transactional())
            .collect();
        assert_eq!(transactional.len(), 6);
        // view_cart and order status are reads, even though their responses
        // use deterministic templates
        assert!(!StoreAction::ViewCart.is_transactional());
        assert!(!StoreAction::OrderStatus.is_transactional());
    }
}
