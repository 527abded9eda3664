use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

/// Testing workflow state of an assignment, orthogonal to link locking.
///
/// The legacy data model overloaded a single status field with both the
/// workflow dimension and the link-report lock; here they are split and
/// recombined on read via [`Assignment::status`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Workflow {
    Assigned,
    Completed,
}

impl Workflow {
    const fn as_str(self) -> &'static str {
        match self {
            Self::Assigned => "assigned",
            Self::Completed => "completed",
        }
    }
}

/// The combined single-label view of an assignment's state.
///
/// This is what the UI collaborator renders; it is derived, never stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssignmentStatus {
    Assigned,
    LinkReported,
    Completed,
}

impl AssignmentStatus {
    const fn as_str(self) -> &'static str {
        match self {
            Self::Assigned => "assigned",
            Self::LinkReported => "link_reported",
            Self::Completed => "completed",
        }
    }
}

/// The central entity: one team's obligation to test one project.
///
/// Invariants enforced by the engine (not by this struct):
/// - at most two assignments reference the same project at steady state
/// - `testing_team_id` never equals the project's owning team
/// - no team holds more than the load cap of active assignments
/// - `lock_report_id` is set only while a link report against the project
///   is unresolved
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Assignment {
    pub id: String,
    pub project_id: String,
    pub testing_team_id: String,
    /// Denormalized copy of the project's owning team for query convenience.
    pub owner_team_id: String,
    pub workflow: Workflow,
    /// The unresolved link report locking this assignment, if any.
    pub lock_report_id: Option<String>,
    pub created_at_us: i64,
    pub updated_at_us: i64,
}

impl Assignment {
    /// Combined status label: an active lock takes precedence over the
    /// workflow state, completion over everything.
    #[must_use]
    pub fn status(&self) -> AssignmentStatus {
        match (self.workflow, &self.lock_report_id) {
            (Workflow::Completed, _) => AssignmentStatus::Completed,
            (Workflow::Assigned, Some(_)) => AssignmentStatus::LinkReported,
            (Workflow::Assigned, None) => AssignmentStatus::Assigned,
        }
    }

    /// Whether this assignment still counts toward its testing team's load.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.workflow != Workflow::Completed
    }
}

/// Error returned when parsing an enum value from text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseEnumError {
    pub expected: &'static str,
    pub got: String,
}

impl fmt::Display for ParseEnumError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid {}: '{}'", self.expected, self.got)
    }
}

impl std::error::Error for ParseEnumError {}

impl fmt::Display for Workflow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for AssignmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Workflow {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "assigned" => Ok(Self::Assigned),
            "completed" => Ok(Self::Completed),
            _ => Err(ParseEnumError {
                expected: "workflow",
                got: s.to_string(),
            }),
        }
    }
}

impl FromStr for AssignmentStatus {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "assigned" => Ok(Self::Assigned),
            "link_reported" => Ok(Self::LinkReported),
            "completed" => Ok(Self::Completed),
            _ => Err(ParseEnumError {
                expected: "assignment status",
                got: s.to_string(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{Assignment, AssignmentStatus, Workflow};
    use std::str::FromStr;

    fn base() -> Assignment {
        Assignment {
            id: "asg-1".to_string(),
            project_id: "prj-1".to_string(),
            testing_team_id: "team-b".to_string(),
            owner_team_id: "team-a".to_string(),
            workflow: Workflow::Assigned,
            lock_report_id: None,
            created_at_us: 0,
            updated_at_us: 0,
        }
    }

    #[test]
    fn status_combines_workflow_and_lock() {
        let mut a = base();
        assert_eq!(a.status(), AssignmentStatus::Assigned);

        a.lock_report_id = Some("rpt-1".to_string());
        assert_eq!(a.status(), AssignmentStatus::LinkReported);

        // Completion wins even with a stale lock reference.
        a.workflow = Workflow::Completed;
        assert_eq!(a.status(), AssignmentStatus::Completed);
    }

    #[test]
    fn active_means_not_completed() {
        let mut a = base();
        assert!(a.is_active());
        a.lock_report_id = Some("rpt-1".to_string());
        assert!(a.is_active());
        a.workflow = Workflow::Completed;
        assert!(!a.is_active());
    }

    #[test]
    fn enum_round_trips() {
        for value in [Workflow::Assigned, Workflow::Completed] {
            assert_eq!(Workflow::from_str(&value.to_string()).expect("parse"), value);
        }
        for value in [
            AssignmentStatus::Assigned,
            AssignmentStatus::LinkReported,
            AssignmentStatus::Completed,
        ] {
            assert_eq!(
                AssignmentStatus::from_str(&value.to_string()).expect("parse"),
                value
            );
        }
        assert!(Workflow::from_str("locked").is_err());
        assert!(AssignmentStatus::from_str("blocked").is_err());
    }
}
