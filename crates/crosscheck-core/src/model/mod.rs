//! Domain model: teams, projects, assignments, and link reports.

pub mod assignment;
pub mod project;
pub mod report;
pub mod team;

pub use assignment::{Assignment, AssignmentStatus, Workflow};
pub use project::{Project, ProjectStatus};
pub use report::{LinkReport, LogAction, ReportLogEntry, ReportStatus};
pub use team::Team;
