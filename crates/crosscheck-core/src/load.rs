//! Team load index: read-side aggregation of active testing obligations.
//!
//! Recomputed from scratch for every matcher batch and every manual or
//! reassign validation. Durable state can change between proposal and
//! confirmation, so staleness is handled by re-validation, never by
//! caching this index across calls.

use std::collections::HashMap;

use crate::model::Assignment;

/// Count of active (non-terminal) assignments per testing team.
///
/// Teams absent from the map have load zero; unknown team ids are never an
/// error on the read side.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadIndex {
    counts: HashMap<String, u32>,
}

impl LoadIndex {
    /// Build the index from an assignment set, counting only active rows.
    ///
    /// `exclude_project` drops that project's own assignments from the
    /// counts, so re-evaluating a single project does not let its possibly
    /// stale entries inflate its candidates' loads.
    #[must_use]
    pub fn from_assignments<'a, I>(assignments: I, exclude_project: Option<&str>) -> Self
    where
        I: IntoIterator<Item = &'a Assignment>,
    {
        let mut counts: HashMap<String, u32> = HashMap::new();
        for assignment in assignments {
            if !assignment.is_active() {
                continue;
            }
            if exclude_project == Some(assignment.project_id.as_str()) {
                continue;
            }
            *counts
                .entry(assignment.testing_team_id.clone())
                .or_insert(0) += 1;
        }
        Self { counts }
    }

    /// Current load of a team; unknown teams read as zero.
    #[must_use]
    pub fn load_of(&self, team_id: &str) -> u32 {
        self.counts.get(team_id).copied().unwrap_or(0)
    }

    /// Record one more obligation for a team.
    pub fn bump(&mut self, team_id: &str) {
        *self.counts.entry(team_id.to_string()).or_insert(0) += 1;
    }
}
