//! Campaign runner: many seeds, one verdict.
//!
//! Runs the scenario for every seed in a range, checks the oracle after
//! each run, and reports the first failing seed for replay.

use std::ops::Range;

use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::oracle::{ConsistencyOracle, InvariantViolation};
use crate::scenario::{Scenario, ScenarioConfig, ScenarioResult};

/// Campaign-level configuration: which seeds to run, and the scenario
/// parameters shared by all of them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CampaignConfig {
    /// Range of seeds to execute, e.g. `0..100`.
    pub seed_range: Range<u64>,
    pub team_count: usize,
    pub subgroup_count: usize,
    pub project_count: usize,
    pub rounds: u64,
    pub load_cap: u32,
}

impl Default for CampaignConfig {
    fn default() -> Self {
        let scenario = ScenarioConfig::default();
        Self {
            seed_range: 0..100,
            team_count: scenario.team_count,
            subgroup_count: scenario.subgroup_count,
            project_count: scenario.project_count,
            rounds: scenario.rounds,
            load_cap: scenario.load_cap,
        }
    }
}

impl CampaignConfig {
    /// Build a [`ScenarioConfig`] for one seed.
    #[must_use]
    pub fn scenario_for_seed(&self, seed: u64) -> ScenarioConfig {
        ScenarioConfig {
            seed,
            team_count: self.team_count,
            subgroup_count: self.subgroup_count,
            project_count: self.project_count,
            rounds: self.rounds,
            load_cap: self.load_cap,
        }
    }

    /// Validate before running.
    ///
    /// # Errors
    ///
    /// Returns an error if the seed range is empty or the scenario
    /// parameters are out of range.
    pub fn validate(&self) -> Result<()> {
        if self.seed_range.is_empty() {
            anyhow::bail!("seed_range must not be empty");
        }
        self.scenario_for_seed(0).validate()
    }
}

/// Failure details for a single seed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeedFailure {
    /// The seed that failed.
    pub seed: u64,
    /// Invariant violations, formatted for humans.
    pub violations: Vec<String>,
}

/// Aggregate report for a campaign run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CampaignReport {
    pub seeds_run: usize,
    pub seeds_passed: usize,
    /// First failing seed, for prioritized replay.
    pub first_failure: Option<u64>,
    pub failures: Vec<SeedFailure>,
    /// Operations the engine accepted, summed over all seeds.
    pub total_ops_applied: usize,
    /// Operations the engine rejected, summed over all seeds.
    pub total_ops_rejected: usize,
}

impl CampaignReport {
    /// True if every seed passed.
    #[must_use]
    pub fn all_passed(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Run every seed in the configured range.
///
/// # Errors
///
/// Returns an error if validation fails or a scenario hits a storage
/// error; invariant violations are collected, not raised.
pub fn run_campaign(config: &CampaignConfig) -> Result<CampaignReport> {
    config.validate()?;

    let mut report = CampaignReport {
        seeds_run: 0,
        seeds_passed: 0,
        first_failure: None,
        failures: Vec::new(),
        total_ops_applied: 0,
        total_ops_rejected: 0,
    };

    for seed in config.seed_range.clone() {
        report.seeds_run += 1;
        let (result, violations) = run_single_seed(seed, config)?;
        report.total_ops_applied += result.ops_applied;
        report.total_ops_rejected += result.ops_rejected;

        if violations.is_empty() {
            report.seeds_passed += 1;
        } else {
            if report.first_failure.is_none() {
                report.first_failure = Some(seed);
            }
            tracing::warn!(seed, violations = violations.len(), "seed failed");
            report.failures.push(SeedFailure {
                seed,
                violations: violations.iter().map(format_violation).collect(),
            });
        }
    }

    Ok(report)
}

/// Run one seed and return its scenario result plus any violations.
///
/// # Errors
///
/// Returns an error only for harness or storage failures.
pub fn run_single_seed(
    seed: u64,
    config: &CampaignConfig,
) -> Result<(ScenarioResult, Vec<InvariantViolation>)> {
    let mut scenario = Scenario::new(config.scenario_for_seed(seed))?;
    let result = scenario.run()?;
    let oracle = ConsistencyOracle::check_all(
        scenario.engine().connection(),
        scenario.load_cap(),
    )?;
    Ok((result, oracle.violations))
}

/// Format a violation into a replay-friendly line.
fn format_violation(v: &InvariantViolation) -> String {
    match v {
        InvariantViolation::SelfTesting {
            project_id,
            team_id,
        } => format!("SelfTesting: team {team_id} tests its own project {project_id}"),
        InvariantViolation::OverCap { team_id, load, cap } => {
            format!("OverCap: team {team_id} holds {load} active assignments (cap {cap})")
        }
        InvariantViolation::TooManyTesters { project_id, count } => {
            format!("TooManyTesters: project {project_id} has {count} assignment rows")
        }
        InvariantViolation::ReportSingleton { project_id, count } => {
            format!("ReportSingleton: project {project_id} has {count} unresolved reports")
        }
        InvariantViolation::OrphanLock {
            assignment_id,
            report_id,
        } => format!("OrphanLock: assignment {assignment_id} locked by resolved report {report_id}"),
        InvariantViolation::MissingLock {
            assignment_id,
            report_id,
        } => format!(
            "MissingLock: assignment {assignment_id} unlocked while report {report_id} is unresolved"
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::{CampaignConfig, run_campaign, run_single_seed};

    #[test]
    fn default_config_is_valid() {
        assert!(CampaignConfig::default().validate().is_ok());
    }

    #[test]
    fn empty_seed_range_is_rejected() {
        let config = CampaignConfig {
            seed_range: 5..5,
            ..CampaignConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn single_seed_holds_every_invariant() {
        let config = CampaignConfig {
            seed_range: 0..1,
            ..CampaignConfig::default()
        };
        let (result, violations) = run_single_seed(0, &config).expect("run");
        assert!(violations.is_empty(), "violations: {violations:?}");
        assert_eq!(result.rounds, config.rounds);
    }

    #[test]
    fn small_campaign_passes() {
        let config = CampaignConfig {
            seed_range: 0..25,
            rounds: 64,
            ..CampaignConfig::default()
        };
        let report = run_campaign(&config).expect("campaign");
        assert_eq!(report.seeds_run, 25);
        assert!(
            report.all_passed(),
            "first failure at seed {:?}: {:?}",
            report.first_failure,
            report.failures
        );
        assert!(report.total_ops_applied > 0);
    }

    #[test]
    fn tight_cap_campaign_still_passes() {
        // Cap 1 forces constant capacity rejections without ever letting
        // the durable state break an invariant.
        let config = CampaignConfig {
            seed_range: 0..10,
            load_cap: 1,
            rounds: 80,
            ..CampaignConfig::default()
        };
        let report = run_campaign(&config).expect("campaign");
        assert!(report.all_passed(), "failures: {:?}", report.failures);
        assert!(report.total_ops_rejected > 0);
    }

    #[test]
    fn report_serializes_to_json() {
        let config = CampaignConfig {
            seed_range: 0..2,
            rounds: 16,
            ..CampaignConfig::default()
        };
        let report = run_campaign(&config).expect("campaign");
        let json = serde_json::to_string(&report).expect("serialize");
        assert!(json.contains("\"seeds_run\":2"));
    }
}
