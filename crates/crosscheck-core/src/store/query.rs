//! Typed read-side queries over the store.
//!
//! All functions take a shared `&Connection`, return `anyhow::Result`
//! with model types (never raw rows), and treat "not found" as `None`
//! rather than an error.

use anyhow::{Context, Result};
use rusqlite::{Connection, Row, params, types::Type};
use std::str::FromStr;

use crate::model::{Assignment, LinkReport, LogAction, Project, ProjectStatus, ReportLogEntry, ReportStatus, Team, Workflow};

// ---------------------------------------------------------------------------
// Row mapping
// ---------------------------------------------------------------------------

fn parse_col<T>(idx: usize, raw: &str) -> rusqlite::Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    raw.parse()
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

fn row_to_team(row: &Row<'_>) -> rusqlite::Result<Team> {
    Ok(Team {
        id: row.get(0)?,
        name: row.get(1)?,
        subgroup: row.get(2)?,
    })
}

fn row_to_project(row: &Row<'_>) -> rusqlite::Result<Project> {
    Ok(Project {
        id: row.get(0)?,
        owner_team_id: row.get(1)?,
        subgroup: row.get(2)?,
        deployed_link: row.get(3)?,
        created_at_us: row.get(4)?,
        updated_at_us: row.get(5)?,
    })
}

fn row_to_assignment(row: &Row<'_>) -> rusqlite::Result<Assignment> {
    let workflow: String = row.get(4)?;
    Ok(Assignment {
        id: row.get(0)?,
        project_id: row.get(1)?,
        testing_team_id: row.get(2)?,
        owner_team_id: row.get(3)?,
        workflow: parse_col::<Workflow>(4, &workflow)?,
        lock_report_id: row.get(5)?,
        created_at_us: row.get(6)?,
        updated_at_us: row.get(7)?,
    })
}

fn row_to_report(row: &Row<'_>) -> rusqlite::Result<LinkReport> {
    let status: String = row.get(4)?;
    Ok(LinkReport {
        id: row.get(0)?,
        project_id: row.get(1)?,
        owner_team_id: row.get(2)?,
        reporter_team_id: row.get(3)?,
        status: parse_col::<ReportStatus>(4, &status)?,
        proposed_url: row.get(5)?,
        created_at_us: row.get(6)?,
        updated_at_us: row.get(7)?,
    })
}

const ASSIGNMENT_COLS: &str = "assignment_id, project_id, testing_team_id, owner_team_id, \
     workflow, lock_report_id, created_at_us, updated_at_us";

const REPORT_COLS: &str = "report_id, project_id, owner_team_id, reporter_team_id, \
     status, proposed_url, created_at_us, updated_at_us";

// ---------------------------------------------------------------------------
// Teams and projects
// ---------------------------------------------------------------------------

/// Full team roster, ordered by id for reproducibility.
pub fn list_teams(conn: &Connection) -> Result<Vec<Team>> {
    let mut stmt = conn
        .prepare("SELECT team_id, name, subgroup FROM teams ORDER BY team_id")
        .context("prepare list_teams")?;
    let teams = stmt
        .query_map([], row_to_team)
        .context("query list_teams")?
        .collect::<rusqlite::Result<Vec<_>>>()
        .context("map team rows")?;
    Ok(teams)
}

/// Fetch a single team by id.
pub fn get_team(conn: &Connection, team_id: &str) -> Result<Option<Team>> {
    let result = conn.query_row(
        "SELECT team_id, name, subgroup FROM teams WHERE team_id = ?1",
        params![team_id],
        row_to_team,
    );
    match result {
        Ok(team) => Ok(Some(team)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e).context(format!("get_team '{team_id}'")),
    }
}

/// Fetch a single project by id.
pub fn get_project(conn: &Connection, project_id: &str) -> Result<Option<Project>> {
    let result = conn.query_row(
        "SELECT project_id, owner_team_id, subgroup, deployed_link, created_at_us, updated_at_us \
         FROM projects WHERE project_id = ?1",
        params![project_id],
        row_to_project,
    );
    match result {
        Ok(project) => Ok(Some(project)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e).context(format!("get_project '{project_id}'")),
    }
}

/// Projects with no assignment rows at all, ordered by id.
pub fn list_unassigned_projects(conn: &Connection) -> Result<Vec<Project>> {
    let mut stmt = conn
        .prepare(
            "SELECT p.project_id, p.owner_team_id, p.subgroup, p.deployed_link, \
                    p.created_at_us, p.updated_at_us \
             FROM projects p \
             WHERE NOT EXISTS (SELECT 1 FROM assignments a WHERE a.project_id = p.project_id) \
             ORDER BY p.project_id",
        )
        .context("prepare list_unassigned_projects")?;
    let projects = stmt
        .query_map([], row_to_project)
        .context("query list_unassigned_projects")?
        .collect::<rusqlite::Result<Vec<_>>>()
        .context("map project rows")?;
    Ok(projects)
}

// ---------------------------------------------------------------------------
// Assignments
// ---------------------------------------------------------------------------

/// Filter criteria for assignment listings; fields combine with AND.
#[derive(Debug, Clone, Default)]
pub struct AssignmentFilter {
    pub project_id: Option<String>,
    pub testing_team_id: Option<String>,
    /// Only non-terminal rows (`workflow <> 'completed'`).
    pub active_only: bool,
    /// Only rows held by an unresolved link report.
    pub locked_only: bool,
}

/// List assignments matching the filter, ordered by id.
pub fn list_assignments(conn: &Connection, filter: &AssignmentFilter) -> Result<Vec<Assignment>> {
    let mut conditions: Vec<String> = Vec::new();
    let mut param_values: Vec<Box<dyn rusqlite::types::ToSql>> = Vec::new();

    if let Some(ref project_id) = filter.project_id {
        param_values.push(Box::new(project_id.clone()));
        conditions.push(format!("project_id = ?{}", param_values.len()));
    }
    if let Some(ref team_id) = filter.testing_team_id {
        param_values.push(Box::new(team_id.clone()));
        conditions.push(format!("testing_team_id = ?{}", param_values.len()));
    }
    if filter.active_only {
        conditions.push("workflow <> 'completed'".to_string());
    }
    if filter.locked_only {
        conditions.push("lock_report_id IS NOT NULL".to_string());
    }

    let where_clause = if conditions.is_empty() {
        String::new()
    } else {
        format!(" WHERE {}", conditions.join(" AND "))
    };
    let sql =
        format!("SELECT {ASSIGNMENT_COLS} FROM assignments{where_clause} ORDER BY assignment_id");

    let mut stmt = conn.prepare(&sql).context("prepare list_assignments")?;
    let assignments = stmt
        .query_map(
            rusqlite::params_from_iter(param_values.iter().map(AsRef::as_ref)),
            row_to_assignment,
        )
        .context("query list_assignments")?
        .collect::<rusqlite::Result<Vec<_>>>()
        .context("map assignment rows")?;
    Ok(assignments)
}

/// All assignments for one project.
pub fn assignments_for_project(conn: &Connection, project_id: &str) -> Result<Vec<Assignment>> {
    list_assignments(
        conn,
        &AssignmentFilter {
            project_id: Some(project_id.to_string()),
            ..AssignmentFilter::default()
        },
    )
}

// ---------------------------------------------------------------------------
// Link reports
// ---------------------------------------------------------------------------

/// The unresolved (non-closed) report for a project, if one exists.
///
/// The partial unique index guarantees at most one row can match.
pub fn active_report_for_project(
    conn: &Connection,
    project_id: &str,
) -> Result<Option<LinkReport>> {
    let sql = format!(
        "SELECT {REPORT_COLS} FROM link_reports \
         WHERE project_id = ?1 AND status <> 'closed'"
    );
    let result = conn.query_row(&sql, params![project_id], row_to_report);
    match result {
        Ok(report) => Ok(Some(report)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e).context(format!("active_report_for_project '{project_id}'")),
    }
}

/// All unresolved (non-closed) reports across projects, ordered by id.
pub fn list_unresolved_reports(conn: &Connection) -> Result<Vec<LinkReport>> {
    let sql = format!(
        "SELECT {REPORT_COLS} FROM link_reports \
         WHERE status <> 'closed' ORDER BY report_id"
    );
    let mut stmt = conn.prepare(&sql).context("prepare list_unresolved_reports")?;
    let reports = stmt
        .query_map([], row_to_report)
        .context("query list_unresolved_reports")?
        .collect::<rusqlite::Result<Vec<_>>>()
        .context("map report rows")?;
    Ok(reports)
}

/// Fetch a single report by id.
pub fn get_report(conn: &Connection, report_id: &str) -> Result<Option<LinkReport>> {
    let sql = format!("SELECT {REPORT_COLS} FROM link_reports WHERE report_id = ?1");
    let result = conn.query_row(&sql, params![report_id], row_to_report);
    match result {
        Ok(report) => Ok(Some(report)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e).context(format!("get_report '{report_id}'")),
    }
}

/// A report's full history log in append order.
pub fn report_log(conn: &Connection, report_id: &str) -> Result<Vec<ReportLogEntry>> {
    let mut stmt = conn
        .prepare(
            "SELECT entry_id, report_id, action, detail, created_at_us \
             FROM report_log WHERE report_id = ?1 ORDER BY entry_id",
        )
        .context("prepare report_log")?;
    let entries = stmt
        .query_map(params![report_id], |row| {
            let action: String = row.get(2)?;
            Ok(ReportLogEntry {
                entry_id: row.get(0)?,
                report_id: row.get(1)?,
                action: parse_col::<LogAction>(2, &action)?,
                detail: row.get(3)?,
                created_at_us: row.get(4)?,
            })
        })
        .context("query report_log")?
        .collect::<rusqlite::Result<Vec<_>>>()
        .context("map report log rows")?;
    Ok(entries)
}

// ---------------------------------------------------------------------------
// Derived status
// ---------------------------------------------------------------------------

/// Derive a project's externally-visible status; `None` if the project
/// does not exist.
pub fn project_status(conn: &Connection, project_id: &str) -> Result<Option<ProjectStatus>> {
    if get_project(conn, project_id)?.is_none() {
        return Ok(None);
    }
    let assignments = assignments_for_project(conn, project_id)?;
    let has_open_report = active_report_for_project(conn, project_id)?.is_some();
    Ok(Some(ProjectStatus::derive(&assignments, has_open_report)))
}

#[cfg(test)]
mod tests {
    use super::{AssignmentFilter, list_assignments, list_unassigned_projects, project_status};
    use crate::model::{ProjectStatus, Team, Workflow};
    use crate::store::{open_in_memory, write};

    fn seeded() -> rusqlite::Connection {
        let conn = open_in_memory().expect("open store");
        for (id, subgroup) in [("t1", "x"), ("t2", "x"), ("t3", "y")] {
            write::register_team(&conn, &Team::new(id, format!("Team {id}"), subgroup))
                .expect("register team");
        }
        write::register_project(&conn, "p1", "t1", "x", "https://example.invalid/p1")
            .expect("register project");
        write::register_project(&conn, "p2", "t2", "x", "https://example.invalid/p2")
            .expect("register project");
        conn
    }

    #[test]
    fn unassigned_projects_shrink_as_assignments_land() {
        let conn = seeded();
        assert_eq!(list_unassigned_projects(&conn).expect("list").len(), 2);

        write::insert_assignment(&conn, &write::NewAssignment::new("p1", "t2", "t1", None))
            .expect("insert");
        let unassigned = list_unassigned_projects(&conn).expect("list");
        assert_eq!(unassigned.len(), 1);
        assert_eq!(unassigned[0].id, "p2");
    }

    #[test]
    fn filters_compose_with_and_semantics() {
        let conn = seeded();
        let a1 = write::insert_assignment(&conn, &write::NewAssignment::new("p1", "t2", "t1", None))
            .expect("insert");
        write::insert_assignment(&conn, &write::NewAssignment::new("p1", "t3", "t1", None))
            .expect("insert");
        write::insert_assignment(&conn, &write::NewAssignment::new("p2", "t3", "t2", None))
            .expect("insert");
        write::complete_assignment(&conn, &a1).expect("complete");

        let active_t3 = list_assignments(
            &conn,
            &AssignmentFilter {
                testing_team_id: Some("t3".to_string()),
                active_only: true,
                ..AssignmentFilter::default()
            },
        )
        .expect("list");
        assert_eq!(active_t3.len(), 2);

        let active_p1 = list_assignments(
            &conn,
            &AssignmentFilter {
                project_id: Some("p1".to_string()),
                active_only: true,
                ..AssignmentFilter::default()
            },
        )
        .expect("list");
        assert_eq!(active_p1.len(), 1);
        assert_eq!(active_p1[0].testing_team_id, "t3");
        assert_eq!(active_p1[0].workflow, Workflow::Assigned);
    }

    #[test]
    fn project_status_derivation_via_store() {
        let conn = seeded();
        assert_eq!(
            project_status(&conn, "p1").expect("status"),
            Some(ProjectStatus::Unassigned)
        );
        assert_eq!(project_status(&conn, "nope").expect("status"), None);

        let a1 = write::insert_assignment(&conn, &write::NewAssignment::new("p1", "t2", "t1", None))
            .expect("insert");
        assert_eq!(
            project_status(&conn, "p1").expect("status"),
            Some(ProjectStatus::Assigned)
        );

        write::complete_assignment(&conn, &a1).expect("complete");
        assert_eq!(
            project_status(&conn, "p1").expect("status"),
            Some(ProjectStatus::Completed)
        );
    }
}
