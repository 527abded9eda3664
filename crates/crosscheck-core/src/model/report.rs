use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

use super::assignment::ParseEnumError;

/// Lifecycle states of a broken-link report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportStatus {
    Open,
    PendingApproval,
    Declined,
    Closed,
}

impl ReportStatus {
    const fn as_str(self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::PendingApproval => "pending_approval",
            Self::Declined => "declined",
            Self::Closed => "closed",
        }
    }

    /// Whether the report still blocks its project.
    #[must_use]
    pub const fn is_unresolved(self) -> bool {
        !matches!(self, Self::Closed)
    }

    /// Validate whether a transition from self to `target` is allowed.
    ///
    /// Valid transitions:
    /// - `open -> pending_approval` (owner submits a replacement URL)
    /// - `pending_approval -> closed` (approver accepts)
    /// - `pending_approval -> declined` (approver rejects)
    /// - `declined -> pending_approval` (owner resubmits)
    pub fn can_transition_to(self, target: Self) -> Result<(), InvalidTransition> {
        let allowed = matches!(
            (self, target),
            (Self::Open, Self::PendingApproval)
                | (Self::PendingApproval, Self::Closed)
                | (Self::PendingApproval, Self::Declined)
                | (Self::Declined, Self::PendingApproval)
        );

        if allowed {
            Ok(())
        } else {
            Err(InvalidTransition {
                from: self,
                to: target,
            })
        }
    }
}

/// Error returned when a report transition is invalid.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InvalidTransition {
    pub from: ReportStatus,
    pub to: ReportStatus,
}

impl fmt::Display for InvalidTransition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid report transition {} -> {}", self.from, self.to)
    }
}

impl std::error::Error for InvalidTransition {}

/// A broken-link report against a project's deployed URL.
///
/// At most one unresolved report may exist per project; resolved reports
/// are retained forever for audit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkReport {
    pub id: String,
    pub project_id: String,
    /// The team that uploaded the project (and must fix the link).
    pub owner_team_id: String,
    /// The testing team that reported the link as broken.
    pub reporter_team_id: String,
    pub status: ReportStatus,
    /// Replacement URL awaiting approval; cleared on decline.
    pub proposed_url: Option<String>,
    pub created_at_us: i64,
    pub updated_at_us: i64,
}

/// Actions recorded in a report's append-only history log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogAction {
    Opened,
    LinkSubmitted,
    Approved,
    Declined,
}

impl LogAction {
    const fn as_str(self) -> &'static str {
        match self {
            Self::Opened => "opened",
            Self::LinkSubmitted => "link_submitted",
            Self::Approved => "approved",
            Self::Declined => "declined",
        }
    }
}

impl fmt::Display for LogAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LogAction {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "opened" => Ok(Self::Opened),
            "link_submitted" => Ok(Self::LinkSubmitted),
            "approved" => Ok(Self::Approved),
            "declined" => Ok(Self::Declined),
            _ => Err(ParseEnumError {
                expected: "log action",
                got: s.to_string(),
            }),
        }
    }
}

impl fmt::Display for ReportStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ReportStatus {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "open" => Ok(Self::Open),
            "pending_approval" => Ok(Self::PendingApproval),
            "declined" => Ok(Self::Declined),
            "closed" => Ok(Self::Closed),
            _ => Err(ParseEnumError {
                expected: "report status",
                got: s.to_string(),
            }),
        }
    }
}

/// One timestamped entry in a report's history log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportLogEntry {
    pub entry_id: i64,
    pub report_id: String,
    pub action: LogAction,
    pub detail: String,
    pub created_at_us: i64,
}

#[cfg(test)]
mod tests {
    use super::{InvalidTransition, LogAction, ReportStatus};
    use std::str::FromStr;

    #[test]
    fn transition_rules() {
        use ReportStatus::{Closed, Declined, Open, PendingApproval};

        assert!(Open.can_transition_to(PendingApproval).is_ok());
        assert!(PendingApproval.can_transition_to(Closed).is_ok());
        assert!(PendingApproval.can_transition_to(Declined).is_ok());
        assert!(Declined.can_transition_to(PendingApproval).is_ok());

        // Closed is terminal.
        for target in [Open, PendingApproval, Declined] {
            assert!(matches!(
                Closed.can_transition_to(target),
                Err(InvalidTransition { from: Closed, .. })
            ));
        }

        // An open report cannot be approved or declined before a URL exists.
        assert!(Open.can_transition_to(Closed).is_err());
        assert!(Open.can_transition_to(Declined).is_err());

        // No self-transitions.
        for status in [Open, PendingApproval, Declined, Closed] {
            assert!(status.can_transition_to(status).is_err());
        }
    }

    #[test]
    fn unresolved_covers_everything_but_closed() {
        assert!(ReportStatus::Open.is_unresolved());
        assert!(ReportStatus::PendingApproval.is_unresolved());
        assert!(ReportStatus::Declined.is_unresolved());
        assert!(!ReportStatus::Closed.is_unresolved());
    }

    #[test]
    fn enum_round_trips() {
        for value in [
            ReportStatus::Open,
            ReportStatus::PendingApproval,
            ReportStatus::Declined,
            ReportStatus::Closed,
        ] {
            assert_eq!(
                ReportStatus::from_str(&value.to_string()).expect("parse"),
                value
            );
        }
        for value in [
            LogAction::Opened,
            LogAction::LinkSubmitted,
            LogAction::Approved,
            LogAction::Declined,
        ] {
            assert_eq!(LogAction::from_str(&value.to_string()).expect("parse"), value);
        }
        assert!(ReportStatus::from_str("resolved").is_err());
    }
}
