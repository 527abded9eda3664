//! Link-report state machine: open, submit, approve, decline.
//!
//! Each transition is one atomic batch. Approval is the critical one: the
//! set of assignments to unlock is re-queried inside the same transaction
//! that closes the report and updates the project link, so an assignment
//! added while the report was open is still released.

use anyhow::Context as _;

use super::Engine;
use crate::error::{EngineError, ErrorCode};
use crate::model::{LogAction, ReportStatus};
use crate::store::{query, write};

impl Engine {
    /// A testing team reports the project's deployed link as broken.
    ///
    /// Creates the report and locks every active assignment of the
    /// project in one transaction; the link is shared, so all testing
    /// teams stop, not only the reporter. Returns the new report's id.
    ///
    /// # Errors
    ///
    /// Conflict if an unresolved report already exists; validation if the
    /// reporter holds no active assignment on the project; not-found or
    /// storage errors otherwise.
    pub fn report_broken_link(
        &mut self,
        project_id: &str,
        reporter_team_id: &str,
        description: &str,
    ) -> Result<String, EngineError> {
        let tx = self
            .conn
            .transaction()
            .context("begin report transaction")?;

        let project = Self::require_project(&tx, project_id)?;
        if query::get_team(&tx, reporter_team_id)?.is_none() {
            return Err(EngineError::not_found(
                ErrorCode::TeamNotFound,
                "team",
                reporter_team_id,
            ));
        }
        if let Some(existing) = query::active_report_for_project(&tx, project_id)? {
            return Err(EngineError::conflict(
                ErrorCode::ReportAlreadyOpen,
                format!(
                    "report '{}' against project '{project_id}' is still {}",
                    existing.id, existing.status
                ),
            ));
        }

        let holds_active = query::assignments_for_project(&tx, project_id)?
            .iter()
            .any(|a| a.testing_team_id == reporter_team_id && a.is_active());
        if !holds_active {
            return Err(EngineError::validation(
                ErrorCode::ReporterNotAssigned,
                format!("team '{reporter_team_id}' holds no active assignment on '{project_id}'"),
            ));
        }

        let report_id = write::insert_report(
            &tx,
            &write::NewReport {
                project_id: project_id.to_string(),
                owner_team_id: project.owner_team_id,
                reporter_team_id: reporter_team_id.to_string(),
            },
        )?;
        write::append_report_log(&tx, &report_id, LogAction::Opened, description)?;
        let locked = write::lock_project_assignments(&tx, project_id, &report_id)?;
        tx.commit().context("commit report transaction")?;

        tracing::info!(project_id, report_id, locked, "broken link reported");
        self.notifier.report_opened(project_id, &report_id);
        Ok(report_id)
    }

    /// The owning team submits a replacement URL for approval.
    ///
    /// Valid from `open` and from `declined` (resubmission); the history
    /// log accumulates every attempt. Assignments stay locked.
    ///
    /// # Errors
    ///
    /// Validation for an empty URL, transition errors from terminal or
    /// pending states, not-found or storage errors otherwise.
    pub fn submit_replacement_link(
        &mut self,
        report_id: &str,
        url: &str,
    ) -> Result<(), EngineError> {
        let url = url.trim();
        if url.is_empty() {
            return Err(EngineError::validation(
                ErrorCode::MissingReplacementUrl,
                "replacement URL is empty",
            ));
        }

        let report = Self::require_report(&self.conn, report_id)?;
        report.status.can_transition_to(ReportStatus::PendingApproval)?;

        let tx = self
            .conn
            .transaction()
            .context("begin submit transaction")?;
        write::update_report(&tx, report_id, ReportStatus::PendingApproval, Some(url))?;
        write::append_report_log(&tx, report_id, LogAction::LinkSubmitted, url)?;
        tx.commit().context("commit submit transaction")?;

        tracing::info!(report_id, "replacement link submitted");
        Ok(())
    }

    /// A coordinator approves the pending replacement link.
    ///
    /// One atomic batch: the project's deployed link is updated, the
    /// report closes, and every assignment of the project still locked at
    /// this moment returns to its unlocked workflow state.
    ///
    /// # Errors
    ///
    /// Transition errors unless the report is pending approval; storage
    /// errors leave report and assignments in their pre-approval state.
    pub fn approve(&mut self, report_id: &str) -> Result<(), EngineError> {
        let report = Self::require_report(&self.conn, report_id)?;
        report.status.can_transition_to(ReportStatus::Closed)?;
        let url = report.proposed_url.ok_or_else(|| {
            EngineError::validation(
                ErrorCode::MissingReplacementUrl,
                format!("report '{report_id}' is pending approval without a URL"),
            )
        })?;

        let tx = self
            .conn
            .transaction()
            .context("begin approval transaction")?;
        write::set_project_deployed_link(&tx, &report.project_id, &url)?;
        write::update_report(&tx, report_id, ReportStatus::Closed, Some(&url))?;
        write::append_report_log(&tx, report_id, LogAction::Approved, &url)?;
        let unlocked = write::unlock_project_assignments(&tx, &report.project_id)?;
        tx.commit().context("commit approval transaction")?;

        tracing::info!(
            report_id,
            project_id = %report.project_id,
            unlocked,
            "replacement link approved"
        );
        self.notifier.report_closed(&report.project_id, report_id);
        Ok(())
    }

    /// A coordinator rejects the pending replacement link with a reason.
    ///
    /// The proposed URL is cleared, the report returns to `declined`, and
    /// assignments remain locked until a later submission is approved.
    ///
    /// # Errors
    ///
    /// Transition errors unless the report is pending approval; storage
    /// errors leave state unchanged.
    pub fn decline(&mut self, report_id: &str, reason: &str) -> Result<(), EngineError> {
        let report = Self::require_report(&self.conn, report_id)?;
        report.status.can_transition_to(ReportStatus::Declined)?;

        let tx = self
            .conn
            .transaction()
            .context("begin decline transaction")?;
        write::update_report(&tx, report_id, ReportStatus::Declined, None)?;
        write::append_report_log(&tx, report_id, LogAction::Declined, reason)?;
        tx.commit().context("commit decline transaction")?;

        tracing::info!(report_id, "replacement link declined");
        Ok(())
    }

    fn require_report(
        conn: &rusqlite::Connection,
        report_id: &str,
    ) -> Result<crate::model::LinkReport, EngineError> {
        query::get_report(conn, report_id)?.ok_or_else(|| {
            EngineError::not_found(ErrorCode::ReportNotFound, "report", report_id)
        })
    }
}
