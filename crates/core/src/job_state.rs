//! Job lifecycle state machine.
//!
//! The lifecycle is strictly one-directional:
//!
//! ```text
//! pending_assignment -> offered -> claimed -> in_progress -> completed
//! ```
//!
//! with `cancelled` reachable from every non-terminal state. Each edge is
//! owned by exactly one component (dispatcher, claim arbiter, or the
//! external execution collaborator via the start/complete endpoints), and
//! the repositories enforce the same edges with conditional updates so a
//! transition can never be skipped under concurrency.

use serde::Serialize;

/// A job's position in its lifecycle.
///
/// Discriminants match the seed data in the `job_statuses` lookup table.
#[repr(i16)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum JobState {
    PendingAssignment = 1,
    Offered = 2,
    Claimed = 3,
    InProgress = 4,
    Completed = 5,
    Cancelled = 6,
}

impl JobState {
    /// The SMALLINT id stored in the `job_statuses` lookup table.
    pub fn id(self) -> i16 {
        self as i16
    }

    /// Whether the job can leave this state at all.
    pub fn is_terminal(self) -> bool {
        matches!(self, JobState::Completed | JobState::Cancelled)
    }

    /// Whether the edge `self -> next` is legal.
    ///
    /// Backward edges exist only for the re-dispatch path: a job whose
    /// offers all resolved without an accept returns from `Offered` to
    /// `PendingAssignment`.
    pub fn can_transition_to(self, next: JobState) -> bool {
        use JobState::*;
        match (self, next) {
            (PendingAssignment, Offered) => true,
            (Offered, Claimed) => true,
            (Offered, PendingAssignment) => true,
            (Claimed, InProgress) => true,
            (InProgress, Completed) => true,
            (from, Cancelled) => !from.is_terminal(),
            _ => false,
        }
    }
}
