//! crosscheck-core: peer-testing assignment matching and link-report
//! consistency for student project courses.
//!
//! The crate is a library invoked by request-handling collaborators; it
//! owns no wire protocol or CLI. Two subsystems share the assignment
//! entity and the same store:
//!
//! - the matcher and its propose/confirm protocol ([`Engine::propose`],
//!   [`Engine::confirm_all`] and friends), which place projects with
//!   testing teams under the load cap and no-self-testing rules
//! - the link-report state machine ([`Engine::report_broken_link`]
//!   through [`Engine::approve`]), which locks and atomically unlocks
//!   whole assignment sets while a deployed link is broken
//!
//! # Conventions
//!
//! - **Errors**: store plumbing returns `anyhow::Result`; engine
//!   operations return [`error::EngineError`] with stable machine codes.
//! - **Logging**: `tracing` macros (`info!`, `warn!`, `debug!`).

pub mod config;
pub mod draft;
pub mod engine;
pub mod error;
pub mod lease;
pub mod load;
pub mod matcher;
pub mod model;
pub mod notify;
pub mod select;
pub mod store;

pub use config::EngineConfig;
pub use draft::{DraftBatch, DraftProposal};
pub use engine::{ConfirmFailure, ConfirmOutcome, Engine};
pub use error::{EngineError, ErrorCode};
pub use load::LoadIndex;
pub use matcher::{BatchMatch, MatchOutcome, match_batch};
pub use select::{Selection, select_teams};
