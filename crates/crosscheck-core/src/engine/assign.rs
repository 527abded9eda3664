//! Proposal/confirmation protocol and the direct assignment mutators.

use anyhow::Context as _;
use rand::Rng;

use super::Engine;
use crate::draft::{DraftBatch, DraftProposal};
use crate::error::{EngineError, ErrorCode};
use crate::load::LoadIndex;
use crate::matcher::match_batch;
use crate::select::select_teams;
use crate::store::{query, write};

/// Per-project result shape of `confirm_all`: counts plus reasons, never
/// a single boolean.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfirmOutcome {
    pub confirmed: usize,
    pub failed: Vec<ConfirmFailure>,
}

/// One project whose confirmation failed; the others are unaffected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfirmFailure {
    pub project_id: String,
    pub code: ErrorCode,
    pub reason: String,
}

impl Engine {
    /// Match every currently-unassigned project and return the result as
    /// an unconfirmed draft holding the batch lease.
    ///
    /// # Errors
    ///
    /// Returns a conflict error if a draft is already outstanding, or a
    /// storage error if reading the roster fails.
    pub fn propose<R: Rng>(&mut self, rng: &mut R) -> Result<DraftBatch, EngineError> {
        self.leases.ensure_free()?;

        let roster = query::list_teams(&self.conn)?;
        let projects = query::list_unassigned_projects(&self.conn)?;
        let active = query::list_assignments(
            &self.conn,
            &query::AssignmentFilter {
                active_only: true,
                ..query::AssignmentFilter::default()
            },
        )?;
        let index = LoadIndex::from_assignments(&active, None);

        let batch = match_batch(&projects, &roster, index, &self.config, rng);
        let draft = DraftBatch::from_match(
            write::new_entity_id("dft"),
            batch,
            crate::store::now_us(),
        );
        self.leases.acquire(&draft.draft_id)?;
        tracing::info!(
            draft_id = %draft.draft_id,
            proposals = draft.proposals.len(),
            unplaced = draft.unplaced.len(),
            "proposal draft created"
        );
        Ok(draft)
    }

    /// Re-select the testing teams for one project inside the leased
    /// draft, replacing its proposal in place.
    ///
    /// The load index is rebuilt from durable state with the project
    /// excluded, then the draft's other proposals are counted on top so
    /// the reroll cannot drift past the cap. Rerolling is only honored
    /// for the draft that holds the batch lease.
    ///
    /// # Errors
    ///
    /// Returns a conflict error for a stale draft, a not-found error if
    /// the draft does not cover the project, or a storage error.
    pub fn reroll<R: Rng>(
        &mut self,
        draft: &mut DraftBatch,
        project_id: &str,
        rng: &mut R,
    ) -> Result<(), EngineError> {
        self.leases.verify(&draft.draft_id)?;
        if draft.proposal_for(project_id).is_none()
            && !draft.unplaced.iter().any(|p| p == project_id)
        {
            return Err(EngineError::not_found(
                ErrorCode::ProjectNotFound,
                "draft project",
                project_id,
            ));
        }

        let project = Self::require_project(&self.conn, project_id)?;
        let roster = query::list_teams(&self.conn)?;
        let active = query::list_assignments(
            &self.conn,
            &query::AssignmentFilter {
                active_only: true,
                ..query::AssignmentFilter::default()
            },
        )?;
        let mut index = LoadIndex::from_assignments(&active, Some(project_id));
        for proposal in &draft.proposals {
            if proposal.project_id == project_id {
                continue;
            }
            index.bump(&proposal.team1);
            if let Some(team2) = &proposal.team2 {
                index.bump(team2);
            }
        }

        let selection = select_teams(&project, &roster, &mut index, &self.config, rng);
        let replacement = selection.team1.map(|team1| DraftProposal {
            project_id: project_id.to_string(),
            team1,
            team2: selection.team2,
        });
        draft.replace_proposal(project_id, replacement);
        Ok(())
    }

    /// Confirm every proposal in the draft, each project as its own
    /// atomic unit: one project's failure never rolls back another's
    /// replacement. Releases the batch lease regardless of outcome.
    ///
    /// # Errors
    ///
    /// Returns a conflict error for a stale draft. Per-project failures
    /// are reported in the outcome, not as an `Err`.
    pub fn confirm_all(&mut self, draft: &DraftBatch) -> Result<ConfirmOutcome, EngineError> {
        self.leases.verify(&draft.draft_id)?;

        let mut outcome = ConfirmOutcome::default();
        for proposal in &draft.proposals {
            match self.confirm_one(proposal) {
                Ok(()) => outcome.confirmed += 1,
                Err(error) => {
                    tracing::warn!(
                        project_id = %proposal.project_id,
                        error = %error,
                        "project confirmation failed"
                    );
                    outcome.failed.push(ConfirmFailure {
                        project_id: proposal.project_id.clone(),
                        code: error.code(),
                        reason: error.to_string(),
                    });
                }
            }
        }

        self.leases.release(&draft.draft_id);
        self.notifier
            .batch_confirmed(outcome.confirmed, outcome.failed.len());
        Ok(outcome)
    }

    /// Discard a draft and release its lease. Idempotent: cancelling a
    /// stale or unknown draft is a no-op. Durable state was never touched
    /// by the draft, so there is nothing to roll back.
    pub fn cancel(&mut self, draft: &DraftBatch) {
        self.leases.release(&draft.draft_id);
    }

    /// Operator override: assign exactly two teams to an unassigned
    /// project, bypassing the batch flow.
    ///
    /// Strict where the matcher is lenient: no subgroup preference, no
    /// single-team fallback; either team at the cap fails the whole
    /// operation before any write.
    ///
    /// Forbidden while any proposal draft is outstanding, like
    /// [`Self::reassign`]: confirmation would delete-then-recreate the
    /// project's set from the stale proposal.
    ///
    /// # Errors
    ///
    /// Conflict while a draft is outstanding; validation, capacity,
    /// not-found, or storage errors otherwise. Nothing is written unless
    /// the whole pair passes.
    pub fn manual_assign(
        &mut self,
        project_id: &str,
        team1: &str,
        team2: &str,
    ) -> Result<(), EngineError> {
        self.leases.ensure_free()?;
        let cap = self.config.load_cap;
        let tx = self
            .conn
            .transaction()
            .context("begin manual_assign transaction")?;

        let project = Self::require_project(&tx, project_id)?;
        if !query::assignments_for_project(&tx, project_id)?.is_empty() {
            return Err(EngineError::validation(
                ErrorCode::ProjectNotUnassigned,
                format!("project '{project_id}' already has assignments"),
            ));
        }
        Self::validate_slot(&tx, &project, team1, Some(team2))?;
        Self::validate_slot(&tx, &project, team2, Some(team1))?;
        Self::validate_capacity(&tx, project_id, &[team1, team2], cap)?;

        let lock = query::active_report_for_project(&tx, project_id)?.map(|r| r.id);
        for team_id in [team1, team2] {
            write::insert_assignment(
                &tx,
                &write::NewAssignment::new(
                    project_id,
                    team_id,
                    &project.owner_team_id,
                    lock.as_deref(),
                ),
            )?;
        }
        tx.commit().context("commit manual_assign")?;
        tracing::info!(project_id, team1, team2, "manual assignment written");
        Ok(())
    }

    /// Replace an assigned project's assignment set with zero, one, or
    /// two new entries (`None` clears a slot), atomically.
    ///
    /// Forbidden while any proposal draft is outstanding: the draft's
    /// load index would silently go stale otherwise.
    ///
    /// # Errors
    ///
    /// Conflict while a draft is outstanding; validation, capacity,
    /// not-found, or storage errors otherwise.
    pub fn reassign(
        &mut self,
        project_id: &str,
        team1: Option<&str>,
        team2: Option<&str>,
    ) -> Result<(), EngineError> {
        self.leases.ensure_free()?;
        let cap = self.config.load_cap;

        let tx = self
            .conn
            .transaction()
            .context("begin reassign transaction")?;

        let project = Self::require_project(&tx, project_id)?;
        if query::assignments_for_project(&tx, project_id)?.is_empty() {
            return Err(EngineError::validation(
                ErrorCode::ProjectNotAssigned,
                format!("project '{project_id}' has no assignments to replace"),
            ));
        }

        let teams: Vec<&str> = [team1, team2].into_iter().flatten().collect();
        match teams.as_slice() {
            [a, b] => {
                Self::validate_slot(&tx, &project, a, Some(b))?;
                Self::validate_slot(&tx, &project, b, Some(a))?;
            }
            [a] => Self::validate_slot(&tx, &project, a, None)?,
            _ => {}
        }
        Self::validate_capacity(&tx, project_id, &teams, cap)?;

        // New entries on a link-blocked project start locked so approval
        // still unlocks the complete set.
        let lock = query::active_report_for_project(&tx, project_id)?.map(|r| r.id);
        write::delete_project_assignments(&tx, project_id)?;
        for team_id in &teams {
            write::insert_assignment(
                &tx,
                &write::NewAssignment::new(
                    project_id,
                    team_id,
                    &project.owner_team_id,
                    lock.as_deref(),
                ),
            )?;
        }
        tx.commit().context("commit reassign")?;
        tracing::info!(project_id, slots = teams.len(), "project reassigned");
        Ok(())
    }

    /// Confirm one project's proposal as a single atomic unit.
    fn confirm_one(&mut self, proposal: &DraftProposal) -> Result<(), EngineError> {
        let cap = self.config.load_cap;
        let tx = self
            .conn
            .transaction()
            .context("begin confirmation transaction")?;

        let project = Self::require_project(&tx, &proposal.project_id)?;
        Self::validate_slot(&tx, &project, &proposal.team1, proposal.team2.as_deref())?;
        if let Some(team2) = &proposal.team2 {
            Self::validate_slot(&tx, &project, team2, Some(proposal.team1.as_str()))?;
        }

        // Durable state may have moved since proposal time; the cap is
        // re-checked here against live rows, not trusted from the draft.
        let mut teams = vec![proposal.team1.as_str()];
        if let Some(team2) = &proposal.team2 {
            teams.push(team2.as_str());
        }
        Self::validate_capacity(&tx, &proposal.project_id, &teams, cap)?;

        let lock = query::active_report_for_project(&tx, &proposal.project_id)?.map(|r| r.id);
        write::delete_project_assignments(&tx, &proposal.project_id)?;
        for team_id in &teams {
            write::insert_assignment(
                &tx,
                &write::NewAssignment::new(
                    &proposal.project_id,
                    team_id,
                    &project.owner_team_id,
                    lock.as_deref(),
                ),
            )?;
        }
        tx.commit().context("commit confirmation")?;
        Ok(())
    }
}
