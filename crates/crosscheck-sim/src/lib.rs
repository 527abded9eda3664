//! Randomized operation-stream harness for the crosscheck engine.
//!
//! A scenario seeds an in-memory engine with a generated roster and
//! project list, then drives it with a seeded stream of operations
//! (propose, reroll, confirm, cancel, manual assign, reassign, report,
//! submit, approve, decline, external completion). Rejections the engine
//! is supposed to produce are tolerated and counted; storage errors
//! abort the run. After every round an oracle checks the durable state
//! against the engine's invariants.
//!
//! # Conventions
//!
//! - **Errors**: `anyhow::Result` for harness-internal failures.
//! - **Logging**: `tracing` macros.

pub mod campaign;
pub mod oracle;
pub mod scenario;

pub use campaign::{CampaignConfig, CampaignReport, SeedFailure, run_campaign, run_single_seed};
pub use oracle::{ConsistencyOracle, InvariantViolation, OracleResult};
pub use scenario::{Scenario, ScenarioConfig, ScenarioResult};
