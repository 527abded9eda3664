use thiserror::Error;

use crate::model::report::InvalidTransition;

/// Machine-readable error codes for operator tooling and UI collaborators.
///
/// Code families follow the error taxonomy: `E1xxx` configuration, `E2xxx`
/// validation, `E3xxx` capacity, `E4xxx` conflict, `E5xxx` storage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    ConfigParseError,
    TeamNotFound,
    ProjectNotFound,
    ReportNotFound,
    DuplicateTeamSelection,
    SelfTestingForbidden,
    MissingReplacementUrl,
    InvalidReportTransition,
    ProjectNotUnassigned,
    ProjectNotAssigned,
    ReporterNotAssigned,
    TeamAtLoadCap,
    DraftOutstanding,
    StaleDraft,
    ReportAlreadyOpen,
    BatchWriteFailed,
}

impl ErrorCode {
    /// Stable code identifier (`E####`) for machine parsing.
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::ConfigParseError => "E1001",
            Self::TeamNotFound => "E2001",
            Self::ProjectNotFound => "E2002",
            Self::ReportNotFound => "E2003",
            Self::DuplicateTeamSelection => "E2101",
            Self::SelfTestingForbidden => "E2102",
            Self::MissingReplacementUrl => "E2103",
            Self::InvalidReportTransition => "E2104",
            Self::ProjectNotUnassigned => "E2105",
            Self::ProjectNotAssigned => "E2106",
            Self::ReporterNotAssigned => "E2107",
            Self::TeamAtLoadCap => "E3001",
            Self::DraftOutstanding => "E4001",
            Self::StaleDraft => "E4002",
            Self::ReportAlreadyOpen => "E4003",
            Self::BatchWriteFailed => "E5001",
        }
    }

    /// Short human-facing summary for logs and terminal output.
    #[must_use]
    pub const fn message(self) -> &'static str {
        match self {
            Self::ConfigParseError => "Config file parse error",
            Self::TeamNotFound => "Team not found",
            Self::ProjectNotFound => "Project not found",
            Self::ReportNotFound => "Link report not found",
            Self::DuplicateTeamSelection => "Same team selected for both slots",
            Self::SelfTestingForbidden => "A team may not test its own project",
            Self::MissingReplacementUrl => "Replacement URL is missing or empty",
            Self::InvalidReportTransition => "Invalid link-report transition",
            Self::ProjectNotUnassigned => "Project already has assignments",
            Self::ProjectNotAssigned => "Project has no assignments",
            Self::ReporterNotAssigned => "Reporter is not a testing team of this project",
            Self::TeamAtLoadCap => "Team is at the load cap",
            Self::DraftOutstanding => "A proposal draft is already outstanding",
            Self::StaleDraft => "Draft is stale or unknown",
            Self::ReportAlreadyOpen => "An unresolved link report already exists",
            Self::BatchWriteFailed => "Atomic batch write failed",
        }
    }

    /// Optional remediation hint that can be surfaced to operators.
    #[must_use]
    pub const fn hint(self) -> Option<&'static str> {
        match self {
            Self::ConfigParseError => Some("Fix syntax in crosscheck.toml and retry."),
            Self::DuplicateTeamSelection => Some("Pick two distinct testing teams."),
            Self::SelfTestingForbidden => Some("Pick a team other than the project's owner."),
            Self::MissingReplacementUrl => Some("Submit a non-empty replacement URL."),
            Self::InvalidReportTransition => {
                Some("Follow valid transitions: open -> pending_approval -> closed/declined.")
            }
            Self::ProjectNotUnassigned => Some("Use reassign for already-assigned projects."),
            Self::ProjectNotAssigned => Some("Use manual assignment for unassigned projects."),
            Self::TeamAtLoadCap => Some("Pick a team with fewer active testing obligations."),
            Self::DraftOutstanding | Self::StaleDraft => {
                Some("Confirm or cancel the outstanding proposal draft first.")
            }
            Self::ReportAlreadyOpen => Some("Resolve the existing report before opening another."),
            Self::BatchWriteFailed => Some("Retry once. If persistent, check the store file."),
            Self::TeamNotFound
            | Self::ProjectNotFound
            | Self::ReportNotFound
            | Self::ReporterNotAssigned => None,
        }
    }
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Typed error surface of the engine's persistence-touching operations.
///
/// Algorithmic components (load index, selector, matcher) never return
/// these: malformed input degrades to empty results there. Everything that
/// touches the store surfaces its failure here; nothing is retried
/// internally.
#[derive(Debug, Error)]
pub enum EngineError {
    /// Input rejected before any write.
    #[error("{code}: {reason}")]
    Validation { code: ErrorCode, reason: String },

    /// A team is at or above the load cap; reported per team so the caller
    /// can identify which side failed.
    #[error("E3001: team '{team_id}' is at the load cap ({load}/{cap})")]
    Capacity { team_id: String, load: u32, cap: u32 },

    /// Conflicting operation in flight; caller must resolve it first.
    #[error("{code}: {reason}")]
    Conflict { code: ErrorCode, reason: String },

    /// Referenced entity does not exist.
    #[error("{code}: {entity} '{id}' not found")]
    NotFound {
        code: ErrorCode,
        entity: &'static str,
        id: String,
    },

    /// Link-report lifecycle violation.
    #[error("E2104: {0}")]
    Transition(#[from] InvalidTransition),

    /// The underlying store failed; the atomic batch was rolled back.
    #[error(transparent)]
    Storage(#[from] anyhow::Error),
}

impl EngineError {
    /// Machine-readable code for this error.
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::Validation { code, .. }
            | Self::Conflict { code, .. }
            | Self::NotFound { code, .. } => *code,
            Self::Capacity { .. } => ErrorCode::TeamAtLoadCap,
            Self::Transition(_) => ErrorCode::InvalidReportTransition,
            Self::Storage(_) => ErrorCode::BatchWriteFailed,
        }
    }

    pub(crate) fn validation(code: ErrorCode, reason: impl Into<String>) -> Self {
        Self::Validation {
            code,
            reason: reason.into(),
        }
    }

    pub(crate) fn conflict(code: ErrorCode, reason: impl Into<String>) -> Self {
        Self::Conflict {
            code,
            reason: reason.into(),
        }
    }

    pub(crate) fn not_found(code: ErrorCode, entity: &'static str, id: impl Into<String>) -> Self {
        Self::NotFound {
            code,
            entity,
            id: id.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{EngineError, ErrorCode};
    use std::collections::HashSet;

    const ALL: &[ErrorCode] = &[
        ErrorCode::ConfigParseError,
        ErrorCode::TeamNotFound,
        ErrorCode::ProjectNotFound,
        ErrorCode::ReportNotFound,
        ErrorCode::DuplicateTeamSelection,
        ErrorCode::SelfTestingForbidden,
        ErrorCode::MissingReplacementUrl,
        ErrorCode::InvalidReportTransition,
        ErrorCode::ProjectNotUnassigned,
        ErrorCode::ProjectNotAssigned,
        ErrorCode::ReporterNotAssigned,
        ErrorCode::TeamAtLoadCap,
        ErrorCode::DraftOutstanding,
        ErrorCode::StaleDraft,
        ErrorCode::ReportAlreadyOpen,
        ErrorCode::BatchWriteFailed,
    ];

    #[test]
    fn all_codes_are_unique() {
        let mut seen = HashSet::new();
        for code in ALL {
            assert!(seen.insert(code.code()), "duplicate code {}", code.code());
        }
    }

    #[test]
    fn code_format_is_machine_friendly() {
        for code in ALL {
            let rendered = code.code();
            assert_eq!(rendered.len(), 5);
            assert!(rendered.starts_with('E'));
            assert!(rendered.chars().skip(1).all(|c| c.is_ascii_digit()));
        }
    }

    #[test]
    fn capacity_error_names_the_team() {
        let err = EngineError::Capacity {
            team_id: "team-x".to_string(),
            load: 2,
            cap: 2,
        };
        assert_eq!(err.code(), ErrorCode::TeamAtLoadCap);
        assert!(err.to_string().contains("team-x"));
        assert!(err.to_string().starts_with("E3001"));
    }
}
