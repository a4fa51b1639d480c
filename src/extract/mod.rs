//! Deterministic parameter extraction from raw queries.
//!
//! No providers involved: quoted titles, capitalization heuristics and
//! context-gated number patterns cover what the storefront actions need.

pub mod keywords;
pub mod numbers;

pub use keywords::extract_keywords;
pub use numbers::{extract_number, NumberContext};
