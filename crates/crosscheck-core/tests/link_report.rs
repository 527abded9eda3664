//! End-to-end tests for the link-report state machine and its interplay
//! with the assignment set.

use std::sync::{Arc, Mutex};

use crosscheck_core::config::EngineConfig;
use crosscheck_core::model::{AssignmentStatus, LogAction, ProjectStatus, ReportStatus, Team};
use crosscheck_core::notify::Notifier;
use crosscheck_core::store::{self, query, write};
use crosscheck_core::{Engine, ErrorCode};

fn engine_with_assigned_project() -> Engine {
    let mut engine = Engine::open_in_memory().expect("open engine");
    for (id, subgroup) in [("owner", "x"), ("t1", "y"), ("t2", "y"), ("t3", "z"), ("t4", "z")] {
        write::register_team(
            engine.connection(),
            &Team::new(id, format!("Team {id}"), subgroup),
        )
        .expect("register team");
    }
    write::register_project(
        engine.connection(),
        "p1",
        "owner",
        "x",
        "https://apps.example.invalid/v1",
    )
    .expect("register project");
    engine.manual_assign("p1", "t1", "t2").expect("assign");
    engine
}

fn statuses(engine: &Engine, project_id: &str) -> Vec<AssignmentStatus> {
    query::assignments_for_project(engine.connection(), project_id)
        .expect("list")
        .iter()
        .map(crosscheck_core::model::Assignment::status)
        .collect()
}

#[test]
fn report_locks_every_testing_team_not_only_the_reporter() {
    let mut engine = engine_with_assigned_project();

    let report_id = engine
        .report_broken_link("p1", "t1", "site returns 502")
        .expect("report");

    assert_eq!(
        statuses(&engine, "p1"),
        vec![AssignmentStatus::LinkReported, AssignmentStatus::LinkReported]
    );
    assert_eq!(
        query::project_status(engine.connection(), "p1").expect("status"),
        Some(ProjectStatus::BlockedLink)
    );

    let report = query::get_report(engine.connection(), &report_id)
        .expect("get")
        .expect("exists");
    assert_eq!(report.status, ReportStatus::Open);
    assert_eq!(report.reporter_team_id, "t1");
    assert_eq!(report.owner_team_id, "owner");
    assert!(report.proposed_url.is_none());
}

#[test]
fn full_lifecycle_open_submit_approve() {
    let mut engine = engine_with_assigned_project();
    let report_id = engine
        .report_broken_link("p1", "t2", "certificate expired")
        .expect("report");

    engine
        .submit_replacement_link(&report_id, "https://apps.example.invalid/v2")
        .expect("submit");
    let report = query::get_report(engine.connection(), &report_id)
        .expect("get")
        .expect("exists");
    assert_eq!(report.status, ReportStatus::PendingApproval);
    // Submission alone never unlocks anything.
    assert_eq!(
        statuses(&engine, "p1"),
        vec![AssignmentStatus::LinkReported, AssignmentStatus::LinkReported]
    );

    engine.approve(&report_id).expect("approve");

    let project = query::get_project(engine.connection(), "p1")
        .expect("get")
        .expect("exists");
    assert_eq!(project.deployed_link, "https://apps.example.invalid/v2");
    assert_eq!(
        query::get_report(engine.connection(), &report_id)
            .expect("get")
            .expect("exists")
            .status,
        ReportStatus::Closed
    );
    assert_eq!(
        statuses(&engine, "p1"),
        vec![AssignmentStatus::Assigned, AssignmentStatus::Assigned]
    );
    assert_eq!(
        query::project_status(engine.connection(), "p1").expect("status"),
        Some(ProjectStatus::Assigned)
    );

    let log: Vec<LogAction> = query::report_log(engine.connection(), &report_id)
        .expect("log")
        .iter()
        .map(|e| e.action)
        .collect();
    assert_eq!(
        log,
        vec![LogAction::Opened, LogAction::LinkSubmitted, LogAction::Approved]
    );
}

#[test]
fn decline_keeps_the_lock_and_resubmission_accumulates_history() {
    let mut engine = engine_with_assigned_project();
    let report_id = engine
        .report_broken_link("p1", "t1", "404 on landing page")
        .expect("report");
    engine
        .submit_replacement_link(&report_id, "https://apps.example.invalid/broken-too")
        .expect("submit");

    engine
        .decline(&report_id, "replacement also 404s")
        .expect("decline");
    let report = query::get_report(engine.connection(), &report_id)
        .expect("get")
        .expect("exists");
    assert_eq!(report.status, ReportStatus::Declined);
    assert!(report.proposed_url.is_none(), "declined URL is cleared");
    assert_eq!(
        statuses(&engine, "p1"),
        vec![AssignmentStatus::LinkReported, AssignmentStatus::LinkReported]
    );

    engine
        .submit_replacement_link(&report_id, "https://apps.example.invalid/v3")
        .expect("resubmit");
    engine.approve(&report_id).expect("approve");

    let log: Vec<LogAction> = query::report_log(engine.connection(), &report_id)
        .expect("log")
        .iter()
        .map(|e| e.action)
        .collect();
    assert_eq!(
        log,
        vec![
            LogAction::Opened,
            LogAction::LinkSubmitted,
            LogAction::Declined,
            LogAction::LinkSubmitted,
            LogAction::Approved,
        ]
    );
}

#[test]
fn only_one_unresolved_report_per_project() {
    let mut engine = engine_with_assigned_project();
    let report_id = engine
        .report_broken_link("p1", "t1", "first report")
        .expect("report");

    let err = engine
        .report_broken_link("p1", "t2", "second report")
        .expect_err("singleton invariant");
    assert_eq!(err.code(), ErrorCode::ReportAlreadyOpen);

    engine
        .submit_replacement_link(&report_id, "https://apps.example.invalid/v2")
        .expect("submit");
    engine.approve(&report_id).expect("approve");

    // Once closed, a fresh report is a fresh instance.
    let second = engine
        .report_broken_link("p1", "t2", "broke again")
        .expect("fresh report");
    assert_ne!(second, report_id);
}

#[test]
fn approval_unlocks_assignments_added_while_the_report_was_open() {
    let mut engine = engine_with_assigned_project();
    let report_id = engine
        .report_broken_link("p1", "t1", "host unreachable")
        .expect("report");

    // Reassignment while the report is open: the replacement set inherits
    // the lock, and approval must release it all the same.
    engine
        .reassign("p1", Some("t3"), Some("t4"))
        .expect("reassign during open report");
    let replaced = query::assignments_for_project(engine.connection(), "p1").expect("list");
    assert_eq!(replaced.len(), 2);
    assert!(
        replaced
            .iter()
            .all(|a| a.lock_report_id.as_deref() == Some(report_id.as_str())),
        "new assignments start locked"
    );

    engine
        .submit_replacement_link(&report_id, "https://apps.example.invalid/v2")
        .expect("submit");
    engine.approve(&report_id).expect("approve");

    let after = query::assignments_for_project(engine.connection(), "p1").expect("list");
    assert_eq!(after.len(), 2);
    assert!(
        after.iter().all(|a| a.lock_report_id.is_none()),
        "approval re-queries: nothing stays locked"
    );
    assert_eq!(
        statuses(&engine, "p1"),
        vec![AssignmentStatus::Assigned, AssignmentStatus::Assigned]
    );
}

#[test]
fn invalid_callers_and_transitions_are_rejected() {
    let mut engine = engine_with_assigned_project();

    let err = engine
        .report_broken_link("p9", "t1", "no such project")
        .expect_err("unknown project");
    assert_eq!(err.code(), ErrorCode::ProjectNotFound);

    let err = engine
        .report_broken_link("p1", "t3", "not a tester of p1")
        .expect_err("reporter must hold an assignment");
    assert_eq!(err.code(), ErrorCode::ReporterNotAssigned);

    let report_id = engine
        .report_broken_link("p1", "t1", "legit report")
        .expect("report");

    let err = engine.approve(&report_id).expect_err("approve from open");
    assert_eq!(err.code(), ErrorCode::InvalidReportTransition);

    let err = engine
        .decline(&report_id, "nothing to decline")
        .expect_err("decline from open");
    assert_eq!(err.code(), ErrorCode::InvalidReportTransition);

    let err = engine
        .submit_replacement_link(&report_id, "   ")
        .expect_err("blank URL");
    assert_eq!(err.code(), ErrorCode::MissingReplacementUrl);

    // State is untouched by any of the rejected calls.
    assert_eq!(
        query::get_report(engine.connection(), &report_id)
            .expect("get")
            .expect("exists")
            .status,
        ReportStatus::Open
    );
}

#[derive(Default)]
struct RecordingNotifier {
    events: Arc<Mutex<Vec<String>>>,
}

impl Notifier for RecordingNotifier {
    fn report_opened(&self, project_id: &str, report_id: &str) {
        self.events
            .lock()
            .expect("lock")
            .push(format!("opened {project_id} {report_id}"));
    }

    fn report_closed(&self, project_id: &str, report_id: &str) {
        self.events
            .lock()
            .expect("lock")
            .push(format!("closed {project_id} {report_id}"));
    }

    fn batch_confirmed(&self, confirmed: usize, failed: usize) {
        self.events
            .lock()
            .expect("lock")
            .push(format!("confirmed {confirmed} {failed}"));
    }
}

#[test]
fn notifications_fire_after_open_and_close_only() {
    let events = Arc::new(Mutex::new(Vec::new()));
    let notifier = RecordingNotifier {
        events: Arc::clone(&events),
    };
    let mut engine = Engine::new(
        store::open_in_memory().expect("open store"),
        EngineConfig::default(),
        Box::new(notifier),
    );

    for (id, subgroup) in [("owner", "x"), ("t1", "y"), ("t2", "y")] {
        write::register_team(
            engine.connection(),
            &Team::new(id, format!("Team {id}"), subgroup),
        )
        .expect("register team");
    }
    write::register_project(
        engine.connection(),
        "p1",
        "owner",
        "x",
        "https://apps.example.invalid/v1",
    )
    .expect("register project");
    engine.manual_assign("p1", "t1", "t2").expect("assign");

    let report_id = engine
        .report_broken_link("p1", "t1", "broken")
        .expect("report");
    engine
        .submit_replacement_link(&report_id, "https://apps.example.invalid/v2")
        .expect("submit");
    engine.decline(&report_id, "still broken").expect("decline");
    engine
        .submit_replacement_link(&report_id, "https://apps.example.invalid/v3")
        .expect("resubmit");
    engine.approve(&report_id).expect("approve");

    let seen = events.lock().expect("lock").clone();
    assert_eq!(
        seen,
        vec![
            format!("opened p1 {report_id}"),
            format!("closed p1 {report_id}"),
        ],
        "submit and decline never notify"
    );
}
