//! Write-side store helpers.
//!
//! Single-row helpers here do not open their own transactions; the engine
//! composes them inside one rusqlite transaction per atomic unit. The
//! registration functions exist for the external team/project
//! collaborators (and for tests and the simulator, which play that role).

use anyhow::{Context, Result, bail};
use rand::Rng;
use rusqlite::{Connection, params};

use super::now_us;
use crate::model::{LogAction, ReportStatus, Team};

/// Generate a fresh entity id: `prefix-` plus 12 random hex digits.
#[must_use]
pub fn new_entity_id(prefix: &str) -> String {
    let suffix: u64 = rand::thread_rng().r#gen::<u64>() & 0xffff_ffff_ffff;
    format!("{prefix}-{suffix:012x}")
}

// ---------------------------------------------------------------------------
// Teams and projects (external collaborator surface)
// ---------------------------------------------------------------------------

/// Insert a team into the roster.
pub fn register_team(conn: &Connection, team: &Team) -> Result<()> {
    conn.execute(
        "INSERT INTO teams (team_id, name, subgroup) VALUES (?1, ?2, ?3)",
        params![team.id, team.name, team.subgroup],
    )
    .with_context(|| format!("register team '{}'", team.id))?;
    Ok(())
}

/// Insert a submitted project.
pub fn register_project(
    conn: &Connection,
    project_id: &str,
    owner_team_id: &str,
    subgroup: &str,
    deployed_link: &str,
) -> Result<()> {
    let now = now_us();
    conn.execute(
        "INSERT INTO projects (project_id, owner_team_id, subgroup, deployed_link, \
                               created_at_us, updated_at_us) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?5)",
        params![project_id, owner_team_id, subgroup, deployed_link, now],
    )
    .with_context(|| format!("register project '{project_id}'"))?;
    Ok(())
}

/// Replace a project's deployed link.
pub fn set_project_deployed_link(conn: &Connection, project_id: &str, url: &str) -> Result<()> {
    let changed = conn
        .execute(
            "UPDATE projects SET deployed_link = ?2, updated_at_us = ?3 WHERE project_id = ?1",
            params![project_id, url, now_us()],
        )
        .with_context(|| format!("set deployed link for '{project_id}'"))?;
    if changed == 0 {
        bail!("project '{project_id}' not found");
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Assignments
// ---------------------------------------------------------------------------

/// Field set for inserting a fresh assignment row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewAssignment {
    pub project_id: String,
    pub testing_team_id: String,
    pub owner_team_id: String,
    pub lock_report_id: Option<String>,
}

impl NewAssignment {
    #[must_use]
    pub fn new(
        project_id: &str,
        testing_team_id: &str,
        owner_team_id: &str,
        lock_report_id: Option<&str>,
    ) -> Self {
        Self {
            project_id: project_id.to_string(),
            testing_team_id: testing_team_id.to_string(),
            owner_team_id: owner_team_id.to_string(),
            lock_report_id: lock_report_id.map(str::to_string),
        }
    }
}

/// Insert an assignment row, returning its generated id.
pub fn insert_assignment(conn: &Connection, assignment: &NewAssignment) -> Result<String> {
    let id = new_entity_id("asg");
    let now = now_us();
    conn.execute(
        "INSERT INTO assignments (assignment_id, project_id, testing_team_id, owner_team_id, \
                                  workflow, lock_report_id, created_at_us, updated_at_us) \
         VALUES (?1, ?2, ?3, ?4, 'assigned', ?5, ?6, ?6)",
        params![
            id,
            assignment.project_id,
            assignment.testing_team_id,
            assignment.owner_team_id,
            assignment.lock_report_id,
            now
        ],
    )
    .with_context(|| {
        format!(
            "insert assignment of '{}' to '{}'",
            assignment.project_id, assignment.testing_team_id
        )
    })?;
    Ok(id)
}

/// Delete every assignment row for a project, returning how many went.
pub fn delete_project_assignments(conn: &Connection, project_id: &str) -> Result<usize> {
    conn.execute(
        "DELETE FROM assignments WHERE project_id = ?1",
        params![project_id],
    )
    .with_context(|| format!("delete assignments for '{project_id}'"))
}

/// Mark an assignment's testing work as completed (external testing
/// completion event).
pub fn complete_assignment(conn: &Connection, assignment_id: &str) -> Result<()> {
    let changed = conn
        .execute(
            "UPDATE assignments SET workflow = 'completed', updated_at_us = ?2 \
             WHERE assignment_id = ?1",
            params![assignment_id, now_us()],
        )
        .with_context(|| format!("complete assignment '{assignment_id}'"))?;
    if changed == 0 {
        bail!("assignment '{assignment_id}' not found");
    }
    Ok(())
}

/// Lock every active assignment of a project to a report. Returns how
/// many rows were locked.
pub fn lock_project_assignments(
    conn: &Connection,
    project_id: &str,
    report_id: &str,
) -> Result<usize> {
    conn.execute(
        "UPDATE assignments SET lock_report_id = ?2, updated_at_us = ?3 \
         WHERE project_id = ?1 AND workflow <> 'completed'",
        params![project_id, report_id, now_us()],
    )
    .with_context(|| format!("lock assignments for '{project_id}'"))
}

/// Clear the lock on every locked assignment of a project. Returns how
/// many rows were unlocked.
///
/// Deliberately keyed by project and re-run at commit time: the unlocked
/// set is whatever is locked *now*, not a remembered list.
pub fn unlock_project_assignments(conn: &Connection, project_id: &str) -> Result<usize> {
    conn.execute(
        "UPDATE assignments SET lock_report_id = NULL, updated_at_us = ?2 \
         WHERE project_id = ?1 AND lock_report_id IS NOT NULL",
        params![project_id, now_us()],
    )
    .with_context(|| format!("unlock assignments for '{project_id}'"))
}

// ---------------------------------------------------------------------------
// Link reports
// ---------------------------------------------------------------------------

/// Field set for opening a fresh link report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewReport {
    pub project_id: String,
    pub owner_team_id: String,
    pub reporter_team_id: String,
}

/// Insert an open report row, returning its generated id.
pub fn insert_report(conn: &Connection, report: &NewReport) -> Result<String> {
    let id = new_entity_id("rpt");
    let now = now_us();
    conn.execute(
        "INSERT INTO link_reports (report_id, project_id, owner_team_id, reporter_team_id, \
                                   status, proposed_url, created_at_us, updated_at_us) \
         VALUES (?1, ?2, ?3, ?4, 'open', NULL, ?5, ?5)",
        params![
            id,
            report.project_id,
            report.owner_team_id,
            report.reporter_team_id,
            now
        ],
    )
    .with_context(|| format!("insert link report for '{}'", report.project_id))?;
    Ok(id)
}

/// Move a report to a new status, replacing the proposed URL wholesale
/// (pass `None` to clear it).
pub fn update_report(
    conn: &Connection,
    report_id: &str,
    status: ReportStatus,
    proposed_url: Option<&str>,
) -> Result<()> {
    let changed = conn
        .execute(
            "UPDATE link_reports SET status = ?2, proposed_url = ?3, updated_at_us = ?4 \
             WHERE report_id = ?1",
            params![report_id, status.to_string(), proposed_url, now_us()],
        )
        .with_context(|| format!("update report '{report_id}'"))?;
    if changed == 0 {
        bail!("report '{report_id}' not found");
    }
    Ok(())
}

/// Append one entry to a report's history log.
pub fn append_report_log(
    conn: &Connection,
    report_id: &str,
    action: LogAction,
    detail: &str,
) -> Result<()> {
    conn.execute(
        "INSERT INTO report_log (report_id, action, detail, created_at_us) \
         VALUES (?1, ?2, ?3, ?4)",
        params![report_id, action.to_string(), detail, now_us()],
    )
    .with_context(|| format!("append log for report '{report_id}'"))?;
    Ok(())
}
