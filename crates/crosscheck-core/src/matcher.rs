//! Batch matching of unassigned projects to testing teams.
//!
//! Iterates the batch once, threading a single in-memory load index
//! through every selection so a 30-project batch respects the load cap
//! across the whole batch, not just within each call. Pure: nothing here
//! is persisted; the draft/confirmation layer decides what becomes
//! durable.

use rand::Rng;

use crate::config::EngineConfig;
use crate::load::LoadIndex;
use crate::model::{Project, Team};
use crate::select::{Selection, select_teams};

/// Per-project outcome of a matching batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MatchOutcome {
    /// Both testing slots filled.
    Full { team1: String, team2: String },
    /// Only the first slot could be filled.
    Partial { team1: String },
    /// No eligible team at all this round; valid, not an error.
    Failed,
}

impl MatchOutcome {
    fn from_selection(selection: Selection) -> Self {
        match (selection.team1, selection.team2) {
            (Some(team1), Some(team2)) => Self::Full { team1, team2 },
            (Some(team1), None) => Self::Partial { team1 },
            _ => Self::Failed,
        }
    }
}

/// One project's outcome within a batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectMatch {
    pub project_id: String,
    pub outcome: MatchOutcome,
}

/// Outcome of matching a whole batch of unassigned projects.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchMatch {
    pub matches: Vec<ProjectMatch>,
}

impl BatchMatch {
    #[must_use]
    pub fn full_count(&self) -> usize {
        self.matches
            .iter()
            .filter(|m| matches!(m.outcome, MatchOutcome::Full { .. }))
            .count()
    }

    #[must_use]
    pub fn partial_count(&self) -> usize {
        self.matches
            .iter()
            .filter(|m| matches!(m.outcome, MatchOutcome::Partial { .. }))
            .count()
    }

    #[must_use]
    pub fn failed_count(&self) -> usize {
        self.matches
            .iter()
            .filter(|m| matches!(m.outcome, MatchOutcome::Failed))
            .count()
    }
}

/// Match every project in `projects` against the roster, starting from a
/// load index seeded with all currently active durable assignments.
///
/// Projects are processed in input order; order affects which team gets
/// which project under contention but never violates the cap.
pub fn match_batch<R: Rng>(
    projects: &[Project],
    roster: &[Team],
    mut index: LoadIndex,
    config: &EngineConfig,
    rng: &mut R,
) -> BatchMatch {
    let mut batch = BatchMatch::default();
    for project in projects {
        let selection = select_teams(project, roster, &mut index, config, rng);
        batch.matches.push(ProjectMatch {
            project_id: project.id.clone(),
            outcome: MatchOutcome::from_selection(selection),
        });
    }
    tracing::debug!(
        projects = projects.len(),
        full = batch.full_count(),
        partial = batch.partial_count(),
        failed = batch.failed_count(),
        "matched assignment batch"
    );
    batch
}
