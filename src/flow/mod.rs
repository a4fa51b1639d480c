//! Stateful action workflows.
//!
//! Cart and order mutations run through a small state machine:
//!
//! ```text
//! VALIDATE_INPUT ──► ASK_INPUT            (missing required fields)
//!        │
//!        ▼
//! LOAD_CONTEXT ──► APPLY_ACTION ──► PERSIST ──► BUILD_RESPONSE
//! ```
//!
//! Every visited state is appended to the trace, which survives into the
//! audit log as the literal record of the run. `APPLY_ACTION` is pure: it
//! reads the loaded context and stages writes; `PERSIST` executes the staged
//! batch in one transaction.

pub mod apply;
pub mod engine;
pub mod state;

pub use engine::FlowEngine;
pub use state::{ActionParams, ActionResult, FlowState, FlowStep};
