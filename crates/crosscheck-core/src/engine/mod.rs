//! The engine: proposal/confirmation transaction manager and link-report
//! state machine over one shared store connection.
//!
//! Single-writer semantics: the engine owns its connection, and every
//! multi-record mutation runs inside one rusqlite transaction. The batch
//! lease serializes the proposal protocol against the direct mutators.

mod assign;
mod report;

pub use assign::{ConfirmFailure, ConfirmOutcome};

use anyhow::Result;
use rusqlite::Connection;
use std::path::Path;

use crate::config::EngineConfig;
use crate::error::{EngineError, ErrorCode};
use crate::lease::LeaseRegistry;
use crate::load::LoadIndex;
use crate::model::Project;
use crate::notify::{LogNotifier, Notifier};
use crate::store::{self, query};

pub struct Engine {
    conn: Connection,
    config: EngineConfig,
    leases: LeaseRegistry,
    notifier: Box<dyn Notifier>,
}

impl Engine {
    /// Open an engine over the store at `path` with default config and the
    /// logging notifier.
    ///
    /// # Errors
    ///
    /// Returns an error if opening or migrating the store fails.
    pub fn open(path: &Path) -> Result<Self> {
        Ok(Self::new(
            store::open_store(path)?,
            EngineConfig::default(),
            Box::new(LogNotifier),
        ))
    }

    /// Open an engine over a fresh in-memory store, for tests and
    /// simulations.
    ///
    /// # Errors
    ///
    /// Returns an error if migrating the store fails.
    pub fn open_in_memory() -> Result<Self> {
        Ok(Self::new(
            store::open_in_memory()?,
            EngineConfig::default(),
            Box::new(LogNotifier),
        ))
    }

    #[must_use]
    pub fn new(conn: Connection, config: EngineConfig, notifier: Box<dyn Notifier>) -> Self {
        Self {
            conn,
            config,
            leases: LeaseRegistry::default(),
            notifier,
        }
    }

    /// Read-side access to the underlying store connection.
    #[must_use]
    pub const fn connection(&self) -> &Connection {
        &self.conn
    }

    #[must_use]
    pub const fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Whether a proposal draft currently holds the batch lease.
    #[must_use]
    pub const fn has_outstanding_draft(&self) -> bool {
        self.leases.is_held()
    }

    /// Fetch a project or produce the engine-level not-found error.
    fn require_project(conn: &Connection, project_id: &str) -> Result<Project, EngineError> {
        query::get_project(conn, project_id)?.ok_or_else(|| {
            EngineError::not_found(ErrorCode::ProjectNotFound, "project", project_id)
        })
    }

    /// Validate a team slot against existence, self-testing, and the
    /// other slot.
    fn validate_slot(
        conn: &Connection,
        project: &Project,
        team_id: &str,
        other: Option<&str>,
    ) -> Result<(), EngineError> {
        if query::get_team(conn, team_id)?.is_none() {
            return Err(EngineError::not_found(
                ErrorCode::TeamNotFound,
                "team",
                team_id,
            ));
        }
        if team_id == project.owner_team_id {
            return Err(EngineError::validation(
                ErrorCode::SelfTestingForbidden,
                format!("team '{team_id}' owns project '{}'", project.id),
            ));
        }
        if other == Some(team_id) {
            return Err(EngineError::validation(
                ErrorCode::DuplicateTeamSelection,
                format!("team '{team_id}' selected for both slots"),
            ));
        }
        Ok(())
    }

    /// Re-validate the load cap for each selected team against live
    /// durable state, with `project_id`'s own rows excluded.
    fn validate_capacity(
        conn: &Connection,
        project_id: &str,
        teams: &[&str],
        cap: u32,
    ) -> Result<(), EngineError> {
        let active = query::list_assignments(
            conn,
            &query::AssignmentFilter {
                active_only: true,
                ..query::AssignmentFilter::default()
            },
        )?;
        let index = LoadIndex::from_assignments(&active, Some(project_id));
        for team_id in teams {
            let load = index.load_of(team_id);
            if load >= cap {
                return Err(EngineError::Capacity {
                    team_id: (*team_id).to_string(),
                    load,
                    cap,
                });
            }
        }
        Ok(())
    }
}
