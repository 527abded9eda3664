use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

use super::assignment::{Assignment, Workflow};

/// A submitted project awaiting or undergoing peer testing.
///
/// The project's lifecycle status is never stored: it is derived from the
/// assignment set and the presence of an unresolved link report (see
/// [`ProjectStatus::derive`]).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Project {
    pub id: String,
    pub owner_team_id: String,
    pub subgroup: String,
    pub deployed_link: String,
    pub created_at_us: i64,
    pub updated_at_us: i64,
}

/// Externally-visible project status, derived on read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProjectStatus {
    Unassigned,
    Assigned,
    Completed,
    BlockedLink,
}

impl ProjectStatus {
    const fn as_str(self) -> &'static str {
        match self {
            Self::Unassigned => "unassigned",
            Self::Assigned => "assigned",
            Self::Completed => "completed",
            Self::BlockedLink => "blocked_link",
        }
    }

    /// Derive the status from the project's assignment set and whether an
    /// unresolved link report exists.
    ///
    /// Precedence: an open report always wins, then completion of every
    /// assignment, then plain assigned/unassigned.
    #[must_use]
    pub fn derive(assignments: &[Assignment], has_open_report: bool) -> Self {
        if has_open_report {
            return Self::BlockedLink;
        }
        if assignments.is_empty() {
            return Self::Unassigned;
        }
        if assignments
            .iter()
            .all(|a| a.workflow == Workflow::Completed)
        {
            return Self::Completed;
        }
        Self::Assigned
    }
}

impl fmt::Display for ProjectStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProjectStatus {
    type Err = super::assignment::ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "unassigned" => Ok(Self::Unassigned),
            "assigned" => Ok(Self::Assigned),
            "completed" => Ok(Self::Completed),
            "blocked_link" => Ok(Self::BlockedLink),
            _ => Err(super::assignment::ParseEnumError {
                expected: "project status",
                got: s.to_string(),
            }),
        }
    }
}
