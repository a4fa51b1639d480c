//! Shelf Agent — conversational storefront assistant for an online bookstore.
//!
//! Turns a free-form natural-language query into one of a fixed set of store
//! actions and executes it through a short, auditable workflow:
//!
//! ```text
//! query ──► Orchestrator ──► help/guardrail shortcut
//!              │
//!              ▼
//!        IntentResolver (rules → embeddings → generative fallback → clarification)
//!              │
//!              ▼
//!        entity + parameter extraction
//!              │
//!              ├─► FlowEngine (cart / checkout / payment / cancel)
//!              └─► direct read-only executors (search / recommend / details / …)
//!              │
//!              ▼
//!        response + one audit row per query
//! ```
//!
//! The embedding and generative backends are external collaborators behind the
//! [`ai::Embedder`] and [`ai::ChatProvider`] traits; storage sits behind
//! [`store::Store`]. Both are injected at construction so the whole pipeline
//! runs against test doubles.

pub mod actions;
pub mod ai;
pub mod config;
pub mod entity;
pub mod error;
pub mod extract;
pub mod flow;
pub mod intent;
pub mod orchestrator;
pub mod response;
pub mod store;

pub use actions::StoreAction;
pub use error::AgentError;
pub use intent::{IntentMatch, MatchMethod};
pub use orchestrator::{Orchestrator, OrchestratorResult};
