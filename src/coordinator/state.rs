//! Mutation lifecycle

use crate::cache::{EntityRef, EntrySnapshot};
use crate::error::{FeedError, FeedResult};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;
use uuid::Uuid;

/// Where a mutation is in its lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MutationState {
    /// Submitted, waiting for earlier mutations of the same entity
    Idle,
    /// Cache patched, request in flight
    OptimisticApplied,
    /// Response received, reconciling
    Settling,
    Confirmed,
    RolledBack,
}

impl MutationState {
    pub fn can_transition_to(self, next: MutationState) -> bool {
        use MutationState::*;
        matches!(
            (self, next),
            (Idle, OptimisticApplied)
                | (OptimisticApplied, Settling)
                | (Settling, Confirmed)
                | (Settling, RolledBack)
        )
    }

    pub fn is_settled(self) -> bool {
        matches!(self, Self::Confirmed | Self::RolledBack)
    }
}

impl fmt::Display for MutationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Idle => "idle",
            Self::OptimisticApplied => "optimistic_applied",
            Self::Settling => "settling",
            Self::Confirmed => "confirmed",
            Self::RolledBack => "rolled_back",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MutationKind {
    Create,
    Update,
    Delete,
}

impl fmt::Display for MutationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Create => f.write_str("create"),
            Self::Update => f.write_str("update"),
            Self::Delete => f.write_str("delete"),
        }
    }
}

/// A submitted mutation that has not settled yet
#[derive(Debug, Clone)]
pub struct PendingMutation {
    pub id: Uuid,
    pub target: EntityRef,
    pub kind: MutationKind,
    /// Entries as they were before the optimistic patch, in patch order
    pub snapshots: Vec<EntrySnapshot>,
    pub submitted_at: DateTime<Utc>,
    state: MutationState,
}

impl PendingMutation {
    pub fn new(target: EntityRef, kind: MutationKind) -> Self {
        Self {
            id: Uuid::new_v4(),
            target,
            kind,
            snapshots: Vec::new(),
            submitted_at: Utc::now(),
            state: MutationState::Idle,
        }
    }

    pub fn state(&self) -> MutationState {
        self.state
    }

    /// Move to `next`, rejecting anything off the lifecycle graph
    pub fn advance(&mut self, next: MutationState) -> FeedResult<()> {
        if !self.state.can_transition_to(next) {
            return Err(FeedError::IllegalTransition {
                from: self.state.to_string(),
                to: next.to_string(),
            });
        }
        self.state = next;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::PostId;

    #[test]
    fn happy_path() {
        let mut m = PendingMutation::new(EntityRef::Post(PostId::new("p1")), MutationKind::Update);
        m.advance(MutationState::OptimisticApplied).unwrap();
        m.advance(MutationState::Settling).unwrap();
        m.advance(MutationState::Confirmed).unwrap();
        assert!(m.state().is_settled());
    }

    #[test]
    fn skipping_settling_is_rejected() {
        let mut m = PendingMutation::new(EntityRef::Post(PostId::new("p1")), MutationKind::Delete);
        m.advance(MutationState::OptimisticApplied).unwrap();

        let err = m.advance(MutationState::RolledBack).unwrap_err();
        assert!(matches!(err, FeedError::IllegalTransition { .. }));
        assert_eq!(m.state(), MutationState::OptimisticApplied);
    }

    #[test]
    fn settled_states_are_final() {
        for terminal in [MutationState::Confirmed, MutationState::RolledBack] {
            for next in [
                MutationState::Idle,
                MutationState::OptimisticApplied,
                MutationState::Settling,
                MutationState::Confirmed,
                MutationState::RolledBack,
            ] {
                assert!(!terminal.can_transition_to(next));
            }
        }
    }
}
