// Vote submission coordination: per-poll option selection and in-flight
// tracking.
//
// Selections are transient client state keyed by poll id. At most one vote
// submission per poll may be in flight; other polls remain independently
// votable. A failed submission keeps the selection so the user can retry
// without re-selecting; a successful one clears it.

use std::collections::{HashMap, HashSet};

use thiserror::Error;
use tracing::{debug, warn};

use crate::model::Poll;

// ---------------------------------------------------------------------------
// Error type
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VoteError {
    #[error("no option selected for poll {poll_id}")]
    NoSelection { poll_id: u64 },

    #[error("a vote for poll {poll_id} is already in flight")]
    VoteInFlight { poll_id: u64 },

    #[error("option {option_id} does not belong to poll {poll_id}")]
    UnknownOption { poll_id: u64, option_id: u64 },

    #[error("selection for poll {poll_id} no longer matches its options")]
    StaleSelection { poll_id: u64 },
}

// ---------------------------------------------------------------------------
// VoteCoordinator
// ---------------------------------------------------------------------------

/// Owns the per-poll selection map and the set of polls with a vote in
/// flight. Purely synchronous; the orchestrator performs the actual network
/// call between `begin_submit` and `finish_submit`.
#[derive(Debug, Default)]
pub struct VoteCoordinator {
    selections: HashMap<u64, u64>,
    in_flight: HashSet<u64>,
}

impl VoteCoordinator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the user's choice for a poll, overwriting any prior selection.
    /// Rejects option ids that don't belong to the poll's current option set.
    pub fn select_option(&mut self, poll: &Poll, option_id: u64) -> Result<(), VoteError> {
        if !poll.has_option(option_id) {
            return Err(VoteError::UnknownOption {
                poll_id: poll.id,
                option_id,
            });
        }
        self.selections.insert(poll.id, option_id);
        debug!(poll_id = poll.id, option_id, "option selected");
        Ok(())
    }

    /// Current selection for a poll, if any.
    pub fn selection(&self, poll_id: u64) -> Option<u64> {
        self.selections.get(&poll_id).copied()
    }

    /// Whether a submission for this poll is currently in flight.
    pub fn is_in_flight(&self, poll_id: u64) -> bool {
        self.in_flight.contains(&poll_id)
    }

    /// Validate and lock a submission for `poll`, returning the option id to
    /// send. Fails fast, before any network call, when nothing is selected,
    /// a submission is already in flight for this poll, or the selection
    /// references an option the poll no longer has.
    pub fn begin_submit(&mut self, poll: &Poll) -> Result<u64, VoteError> {
        let option_id = self
            .selection(poll.id)
            .ok_or(VoteError::NoSelection { poll_id: poll.id })?;
        if self.is_in_flight(poll.id) {
            return Err(VoteError::VoteInFlight { poll_id: poll.id });
        }
        if !poll.has_option(option_id) {
            // The poll's option set changed under a recorded selection.
            self.selections.remove(&poll.id);
            return Err(VoteError::StaleSelection { poll_id: poll.id });
        }
        self.in_flight.insert(poll.id);
        Ok(option_id)
    }

    /// Unlock the poll after the network call resolves. Success clears the
    /// selection; failure keeps it intact for retry. A retried submission
    /// after a transient failure may record a duplicate vote server-side;
    /// no client-side idempotency key is attached.
    pub fn finish_submit(&mut self, poll_id: u64, success: bool) {
        self.in_flight.remove(&poll_id);
        if success {
            self.selections.remove(&poll_id);
        }
    }

    /// Drop any selection for `poll` that references an option no longer in
    /// its option set. Called after a poll refresh so stale selections never
    /// survive an option-list change. Returns whether a selection was
    /// discarded.
    pub fn reconcile(&mut self, poll: &Poll) -> bool {
        match self.selections.get(&poll.id) {
            Some(&option_id) if !poll.has_option(option_id) => {
                warn!(
                    poll_id = poll.id,
                    option_id, "discarding stale selection after option-set change"
                );
                self.selections.remove(&poll.id);
                true
            }
            _ => false,
        }
    }

    /// Drop all selections. Called when the poll list is reloaded.
    pub fn clear_selections(&mut self) {
        self.selections.clear();
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
