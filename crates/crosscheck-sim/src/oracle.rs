//! Invariant oracle over the engine's durable state.
//!
//! The checks read the store directly, so they hold regardless of which
//! code path produced the state. Every checker returns an
//! [`OracleResult`]; `check_all` merges them.

use std::collections::HashMap;

use anyhow::Result;
use rusqlite::Connection;

use crosscheck_core::LoadIndex;
use crosscheck_core::config::TEAMS_PER_PROJECT;
use crosscheck_core::store::query;

// ── Result types ─────────────────────────────────────────────────────────

/// Outcome of one invariant check, or of the whole suite.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OracleResult {
    /// `true` iff no violations were found.
    pub passed: bool,
    /// Every invariant that was violated.
    pub violations: Vec<InvariantViolation>,
}

impl OracleResult {
    fn pass() -> Self {
        Self {
            passed: true,
            violations: Vec::new(),
        }
    }

    fn fail(violations: Vec<InvariantViolation>) -> Self {
        Self {
            passed: false,
            violations,
        }
    }

    fn from_violations(violations: Vec<InvariantViolation>) -> Self {
        if violations.is_empty() {
            Self::pass()
        } else {
            Self::fail(violations)
        }
    }

    /// Merge another result into this one; failures accumulate.
    #[must_use]
    fn merge(mut self, other: Self) -> Self {
        if !other.passed {
            self.passed = false;
            self.violations.extend(other.violations);
        }
        self
    }
}

/// Diagnostic for a single failed invariant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InvariantViolation {
    /// A team is assigned to test its own project.
    SelfTesting { project_id: String, team_id: String },
    /// A team's active obligations exceed the load cap.
    OverCap { team_id: String, load: u32, cap: u32 },
    /// A project carries more than two assignment rows.
    TooManyTesters { project_id: String, count: usize },
    /// A project has more than one unresolved link report.
    ReportSingleton { project_id: String, count: usize },
    /// An assignment is locked by a report that is closed, missing, or
    /// belongs to another project.
    OrphanLock {
        assignment_id: String,
        report_id: String,
    },
    /// A project has an unresolved report but an active assignment that
    /// is not locked by it.
    MissingLock {
        assignment_id: String,
        report_id: String,
    },
}

// ── Checkers ─────────────────────────────────────────────────────────────

/// The full invariant suite.
pub struct ConsistencyOracle;

impl ConsistencyOracle {
    /// Run every checker and merge the results.
    ///
    /// # Errors
    ///
    /// Returns an error if reading the store fails.
    pub fn check_all(conn: &Connection, load_cap: u32) -> Result<OracleResult> {
        Ok(Self::check_no_self_testing(conn)?
            .merge(Self::check_load_cap(conn, load_cap)?)
            .merge(Self::check_team_pair_size(conn)?)
            .merge(Self::check_report_singleton(conn)?)
            .merge(Self::check_lock_consistency(conn)?))
    }

    /// No assignment row may pair a project with its own team.
    ///
    /// # Errors
    ///
    /// Returns an error if reading the store fails.
    pub fn check_no_self_testing(conn: &Connection) -> Result<OracleResult> {
        let assignments = query::list_assignments(conn, &query::AssignmentFilter::default())?;
        let violations = assignments
            .iter()
            .filter(|a| a.testing_team_id == a.owner_team_id)
            .map(|a| InvariantViolation::SelfTesting {
                project_id: a.project_id.clone(),
                team_id: a.testing_team_id.clone(),
            })
            .collect();
        Ok(OracleResult::from_violations(violations))
    }

    /// No team's active obligations may exceed the cap.
    ///
    /// # Errors
    ///
    /// Returns an error if reading the store fails.
    pub fn check_load_cap(conn: &Connection, cap: u32) -> Result<OracleResult> {
        let assignments = query::list_assignments(conn, &query::AssignmentFilter::default())?;
        let index = LoadIndex::from_assignments(&assignments, None);
        let violations = query::list_teams(conn)?
            .iter()
            .filter_map(|team| {
                let load = index.load_of(&team.id);
                (load > cap).then(|| InvariantViolation::OverCap {
                    team_id: team.id.clone(),
                    load,
                    cap,
                })
            })
            .collect();
        Ok(OracleResult::from_violations(violations))
    }

    /// At most two testing teams per project.
    ///
    /// # Errors
    ///
    /// Returns an error if reading the store fails.
    pub fn check_team_pair_size(conn: &Connection) -> Result<OracleResult> {
        let assignments = query::list_assignments(conn, &query::AssignmentFilter::default())?;
        let mut per_project: HashMap<&str, usize> = HashMap::new();
        for a in &assignments {
            *per_project.entry(a.project_id.as_str()).or_insert(0) += 1;
        }
        let violations = per_project
            .into_iter()
            .filter(|&(_, count)| count > TEAMS_PER_PROJECT)
            .map(|(project_id, count)| InvariantViolation::TooManyTesters {
                project_id: project_id.to_string(),
                count,
            })
            .collect();
        Ok(OracleResult::from_violations(violations))
    }

    /// At most one unresolved report per project.
    ///
    /// # Errors
    ///
    /// Returns an error if reading the store fails.
    pub fn check_report_singleton(conn: &Connection) -> Result<OracleResult> {
        let reports = query::list_unresolved_reports(conn)?;
        let mut per_project: HashMap<&str, usize> = HashMap::new();
        for report in &reports {
            *per_project.entry(report.project_id.as_str()).or_insert(0) += 1;
        }
        let violations = per_project
            .into_iter()
            .filter(|&(_, count)| count > 1)
            .map(|(project_id, count)| InvariantViolation::ReportSingleton {
                project_id: project_id.to_string(),
                count,
            })
            .collect();
        Ok(OracleResult::from_violations(violations))
    }

    /// Locks and unresolved reports must agree in both directions: a
    /// locked assignment points at the unresolved report of its own
    /// project, and a blocked project has no unlocked active assignment.
    ///
    /// # Errors
    ///
    /// Returns an error if reading the store fails.
    pub fn check_lock_consistency(conn: &Connection) -> Result<OracleResult> {
        let assignments = query::list_assignments(conn, &query::AssignmentFilter::default())?;
        let unresolved: HashMap<String, String> = query::list_unresolved_reports(conn)?
            .into_iter()
            .map(|r| (r.project_id, r.id))
            .collect();

        let mut violations = Vec::new();
        for a in &assignments {
            match (&a.lock_report_id, unresolved.get(&a.project_id)) {
                (Some(lock), Some(report_id)) if lock != report_id => {
                    violations.push(InvariantViolation::OrphanLock {
                        assignment_id: a.id.clone(),
                        report_id: lock.clone(),
                    });
                }
                // No unresolved report on this project means the lock is
                // stale or points across projects.
                (Some(lock), None) => {
                    violations.push(InvariantViolation::OrphanLock {
                        assignment_id: a.id.clone(),
                        report_id: lock.clone(),
                    });
                }
                (None, Some(report_id)) if a.is_active() => {
                    violations.push(InvariantViolation::MissingLock {
                        assignment_id: a.id.clone(),
                        report_id: report_id.clone(),
                    });
                }
                _ => {}
            }
        }
        Ok(OracleResult::from_violations(violations))
    }
}
