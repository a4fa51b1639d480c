//! Crate-level error type.
//!
//! Provider failures are deliberately NOT part of this enum: the resolver and
//! response builder recover from them locally (fallback tiers, templates) and
//! they must never surface to the user as technical errors. What remains here
//! are the failures the orchestrator genuinely cannot recover from.

use thiserror::Error;

use crate::store::StoreError;

#[derive(Debug, Error)]
pub enum AgentError {
    /// Storage failed on a read the pipeline cannot proceed without
    /// (catalog load, context load). Persist failures are handled inside the
    /// flow engine and do not produce this variant.
    #[error("storage error: {0}")]
    Store(#[from] StoreError),

    /// An action name from the catalog does not map to a known `StoreAction`.
    /// Indicates catalog/seed drift, not a user error.
    #[error("unknown action in catalog: {0}")]
    UnknownAction(String),
}
