//! Proposal drafts: the explicit, round-tripped value object between
//! `propose` and `confirm_all`/`cancel`.
//!
//! Nothing in a draft is durable. The store never sees a draft; the
//! link-report machinery never sees one either. A draft is only honored
//! while its id holds the engine's batch lease.

use serde::{Deserialize, Serialize};

use crate::matcher::{BatchMatch, MatchOutcome};

/// Proposed testing-team pair for a single project.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DraftProposal {
    pub project_id: String,
    pub team1: String,
    pub team2: Option<String>,
}

/// An unconfirmed batch of proposed assignments.
///
/// Serializable so an operator UI can hold it across requests and send it
/// back for confirmation, editing, or cancellation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DraftBatch {
    pub draft_id: String,
    /// Projects with at least one proposed team.
    pub proposals: Vec<DraftProposal>,
    /// Projects the matcher could not place this round.
    pub unplaced: Vec<String>,
    pub created_at_us: i64,
}

impl DraftBatch {
    /// Build a draft from a matcher batch outcome.
    #[must_use]
    pub fn from_match(draft_id: String, batch: BatchMatch, created_at_us: i64) -> Self {
        let mut proposals = Vec::new();
        let mut unplaced = Vec::new();
        for m in batch.matches {
            match m.outcome {
                MatchOutcome::Full { team1, team2 } => proposals.push(DraftProposal {
                    project_id: m.project_id,
                    team1,
                    team2: Some(team2),
                }),
                MatchOutcome::Partial { team1 } => proposals.push(DraftProposal {
                    project_id: m.project_id,
                    team1,
                    team2: None,
                }),
                MatchOutcome::Failed => unplaced.push(m.project_id),
            }
        }
        Self {
            draft_id,
            proposals,
            unplaced,
            created_at_us,
        }
    }

    /// Find the proposal for a project, if the draft covers it.
    #[must_use]
    pub fn proposal_for(&self, project_id: &str) -> Option<&DraftProposal> {
        self.proposals.iter().find(|p| p.project_id == project_id)
    }

    pub(crate) fn replace_proposal(&mut self, project_id: &str, proposal: Option<DraftProposal>) {
        self.proposals.retain(|p| p.project_id != project_id);
        self.unplaced.retain(|p| p != project_id);
        match proposal {
            Some(p) => self.proposals.push(p),
            None => self.unplaced.push(project_id.to_string()),
        }
    }
}
