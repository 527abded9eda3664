//! Batch lease: engine-enforced mutual exclusion between the proposal
//! protocol and the direct assignment mutators.
//!
//! One global lease, tied to a draft id. `propose` acquires it,
//! `confirm_all`/`cancel` release it, and `reassign` refuses to run while
//! it is held. The invariant lives in the engine rather than in caller
//! discipline.

use crate::error::{EngineError, ErrorCode};

/// Registry for the single outstanding batch lease.
#[derive(Debug, Default)]
pub struct LeaseRegistry {
    holder: Option<String>,
}

impl LeaseRegistry {
    /// Acquire the global lease for a draft.
    ///
    /// # Errors
    ///
    /// Returns a conflict error if any draft already holds the lease.
    pub fn acquire(&mut self, draft_id: &str) -> Result<(), EngineError> {
        if let Some(holder) = &self.holder {
            return Err(EngineError::conflict(
                ErrorCode::DraftOutstanding,
                format!("draft '{holder}' is awaiting confirmation or cancellation"),
            ));
        }
        tracing::debug!(draft_id, "batch lease acquired");
        self.holder = Some(draft_id.to_string());
        Ok(())
    }

    /// Check that `draft_id` is the current lease holder.
    ///
    /// # Errors
    ///
    /// Returns a conflict error if the lease is free or held by another
    /// draft (a stale draft object round-tripped back too late).
    pub fn verify(&self, draft_id: &str) -> Result<(), EngineError> {
        match &self.holder {
            Some(holder) if holder == draft_id => Ok(()),
            _ => Err(EngineError::conflict(
                ErrorCode::StaleDraft,
                format!("draft '{draft_id}' does not hold the batch lease"),
            )),
        }
    }

    /// Ensure no lease is held (for operations that bypass drafts).
    ///
    /// # Errors
    ///
    /// Returns a conflict error while any draft holds the lease.
    pub fn ensure_free(&self) -> Result<(), EngineError> {
        match &self.holder {
            None => Ok(()),
            Some(holder) => Err(EngineError::conflict(
                ErrorCode::DraftOutstanding,
                format!("draft '{holder}' is awaiting confirmation or cancellation"),
            )),
        }
    }

    /// Release the lease held by `draft_id`; releasing a lease that is not
    /// held is a no-op so cancellation stays idempotent.
    pub fn release(&mut self, draft_id: &str) {
        if self.holder.as_deref() == Some(draft_id) {
            tracing::debug!(draft_id, "batch lease released");
            self.holder = None;
        }
    }

    #[must_use]
    pub const fn is_held(&self) -> bool {
        self.holder.is_some()
    }
}
