//! Optimistic mutations
//!
//! Every post and comment mutation walks the same lifecycle:
//!
//! | State | Cache | Description |
//! |-------|-------|-------------|
//! | Idle | untouched | Validated, queued behind earlier mutations of the same entity |
//! | OptimisticApplied | patched | Request in flight |
//! | Settling | patched | Response received |
//! | Confirmed | server data | Temporary ids replaced, fields reconciled |
//! | RolledBack | restored | Prior values put back, error returned to the caller |
//!
//! Validation and missing-session failures return before `Idle` and leave
//! no trace.

pub mod locks;
pub mod mutations;
pub mod state;

pub use locks::{EntityGuard, EntityLocks};
pub use mutations::MutationCoordinator;
pub use state::{MutationKind, MutationState, PendingMutation};
