//! Notification boundary.
//!
//! E-mail delivery belongs to an external collaborator; the engine only
//! fires these hooks after a state transition has durably committed.
//! Implementations must handle their own failures: a lost notification
//! never rolls back engine state.

/// Post-commit notification hooks.
pub trait Notifier: Send {
    /// A broken-link report was opened against `project_id`.
    fn report_opened(&self, project_id: &str, report_id: &str);

    /// A report was approved and closed; the project's link is fixed.
    fn report_closed(&self, project_id: &str, report_id: &str);

    /// A proposal batch was confirmed with the given per-project counts.
    fn batch_confirmed(&self, confirmed: usize, failed: usize);
}

/// Default notifier: structured log lines only.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn report_opened(&self, project_id: &str, report_id: &str) {
        tracing::info!(project_id, report_id, "link report opened");
    }

    fn report_closed(&self, project_id: &str, report_id: &str) {
        tracing::info!(project_id, report_id, "link report approved and closed");
    }

    fn batch_confirmed(&self, confirmed: usize, failed: usize) {
        tracing::info!(confirmed, failed, "assignment batch confirmed");
    }
}
