//! Canonical SQLite schema for the crosscheck store.
//!
//! Layout notes:
//! - `assignments` splits the legacy single status field into an explicit
//!   `workflow` column and a nullable `lock_report_id`; the combined label
//!   is derived on read
//! - the partial unique index on `link_reports` enforces the at-most-one
//!   unresolved report per project invariant at the storage layer
//! - `report_log` is append-only; rows are never updated or deleted while
//!   their report exists

/// Migration v1: core tables plus store metadata.
pub const MIGRATION_V1_SQL: &str = r"
CREATE TABLE IF NOT EXISTS teams (
    team_id TEXT PRIMARY KEY CHECK (length(trim(team_id)) > 0),
    name TEXT NOT NULL,
    subgroup TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS projects (
    project_id TEXT PRIMARY KEY CHECK (length(trim(project_id)) > 0),
    owner_team_id TEXT NOT NULL REFERENCES teams(team_id),
    subgroup TEXT NOT NULL,
    deployed_link TEXT NOT NULL,
    created_at_us INTEGER NOT NULL,
    updated_at_us INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS link_reports (
    report_id TEXT PRIMARY KEY,
    project_id TEXT NOT NULL REFERENCES projects(project_id) ON DELETE CASCADE,
    owner_team_id TEXT NOT NULL REFERENCES teams(team_id),
    reporter_team_id TEXT NOT NULL REFERENCES teams(team_id),
    status TEXT NOT NULL DEFAULT 'open'
        CHECK (status IN ('open', 'pending_approval', 'declined', 'closed')),
    proposed_url TEXT,
    created_at_us INTEGER NOT NULL,
    updated_at_us INTEGER NOT NULL
);

CREATE UNIQUE INDEX IF NOT EXISTS idx_link_reports_one_unresolved
    ON link_reports(project_id) WHERE status <> 'closed';

CREATE TABLE IF NOT EXISTS assignments (
    assignment_id TEXT PRIMARY KEY,
    project_id TEXT NOT NULL REFERENCES projects(project_id) ON DELETE CASCADE,
    testing_team_id TEXT NOT NULL REFERENCES teams(team_id),
    owner_team_id TEXT NOT NULL REFERENCES teams(team_id),
    workflow TEXT NOT NULL DEFAULT 'assigned'
        CHECK (workflow IN ('assigned', 'completed')),
    lock_report_id TEXT REFERENCES link_reports(report_id),
    created_at_us INTEGER NOT NULL,
    updated_at_us INTEGER NOT NULL,
    UNIQUE (project_id, testing_team_id),
    CHECK (testing_team_id <> owner_team_id)
);

CREATE TABLE IF NOT EXISTS report_log (
    entry_id INTEGER PRIMARY KEY AUTOINCREMENT,
    report_id TEXT NOT NULL REFERENCES link_reports(report_id) ON DELETE CASCADE,
    action TEXT NOT NULL
        CHECK (action IN ('opened', 'link_submitted', 'approved', 'declined')),
    detail TEXT NOT NULL,
    created_at_us INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS store_meta (
    id INTEGER PRIMARY KEY CHECK (id = 1),
    schema_version INTEGER NOT NULL
);

INSERT OR IGNORE INTO store_meta (id, schema_version) VALUES (1, 1);
";

/// Migration v2: read-path indexes for the load index and lock queries.
pub const MIGRATION_V2_SQL: &str = r"
CREATE INDEX IF NOT EXISTS idx_assignments_project
    ON assignments(project_id);

CREATE INDEX IF NOT EXISTS idx_assignments_team_workflow
    ON assignments(testing_team_id, workflow);

CREATE INDEX IF NOT EXISTS idx_assignments_lock
    ON assignments(lock_report_id) WHERE lock_report_id IS NOT NULL;

CREATE INDEX IF NOT EXISTS idx_report_log_report
    ON report_log(report_id, entry_id);
";
