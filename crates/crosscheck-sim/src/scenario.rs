//! Seeded scenario generation and execution.
//!
//! A scenario owns one engine over an in-memory store, a generated
//! roster, and a seeded RNG. Each round draws one operation from the
//! full engine surface and applies it. Operations the engine rightly
//! refuses (capacity, conflicts, bad transitions) are counted as
//! rejections, not failures; only storage errors abort the run.

use anyhow::{Context, Result, bail};
use rand::Rng;
use rand::SeedableRng;
use rand::rngs::StdRng;
use serde::{Deserialize, Serialize};

use crosscheck_core::config::EngineConfig;
use crosscheck_core::model::Team;
use crosscheck_core::notify::LogNotifier;
use crosscheck_core::store::{self, query, write};
use crosscheck_core::{DraftBatch, Engine, EngineError};

/// Parameters for one scenario run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScenarioConfig {
    /// Seed for the operation stream and every tie-break inside it.
    pub seed: u64,
    /// Number of generated teams.
    pub team_count: usize,
    /// Number of subgroups the teams are spread across.
    pub subgroup_count: usize,
    /// Number of generated projects.
    pub project_count: usize,
    /// Number of operations to draw.
    pub rounds: u64,
    /// Per-team cap on concurrent testing obligations.
    pub load_cap: u32,
}

impl Default for ScenarioConfig {
    fn default() -> Self {
        Self {
            seed: 0,
            team_count: 8,
            subgroup_count: 3,
            project_count: 6,
            rounds: 48,
            load_cap: 2,
        }
    }
}

impl ScenarioConfig {
    /// Validate parameters before running.
    ///
    /// # Errors
    ///
    /// Returns an error if any parameter is out of range.
    pub fn validate(&self) -> Result<()> {
        if self.team_count < 2 {
            bail!("team_count must be >= 2");
        }
        if self.subgroup_count == 0 {
            bail!("subgroup_count must be > 0");
        }
        if self.project_count == 0 {
            bail!("project_count must be > 0");
        }
        if self.rounds == 0 {
            bail!("rounds must be > 0");
        }
        if self.load_cap == 0 {
            bail!("load_cap must be > 0");
        }
        Ok(())
    }
}

/// Counters and trace from one completed scenario run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScenarioResult {
    pub rounds: u64,
    pub ops_applied: usize,
    pub ops_rejected: usize,
    pub ops_skipped: usize,
    pub projects_confirmed: usize,
    pub reports_opened: usize,
    pub reports_approved: usize,
    /// One line per round, for failure triage.
    pub trace: Vec<String>,
}

/// One engine plus the generated world it operates on.
pub struct Scenario {
    config: ScenarioConfig,
    engine: Engine,
    rng: StdRng,
    teams: Vec<String>,
    projects: Vec<String>,
    draft: Option<DraftBatch>,
}

enum Op {
    Applied(String),
    Rejected(String),
    Skipped(&'static str),
}

impl Scenario {
    /// Build the engine and register the generated roster and projects.
    ///
    /// # Errors
    ///
    /// Returns an error if validation or store setup fails.
    pub fn new(config: ScenarioConfig) -> Result<Self> {
        config.validate()?;

        let engine_config = EngineConfig {
            load_cap: config.load_cap,
            prefer_subgroup_diversity: true,
        };
        let conn = store::open_in_memory().context("open scenario store")?;
        let engine = Engine::new(conn, engine_config, Box::new(LogNotifier));

        let teams: Vec<String> = (0..config.team_count)
            .map(|i| format!("team-{i:02}"))
            .collect();
        for (i, id) in teams.iter().enumerate() {
            let subgroup = format!("sg-{}", i % config.subgroup_count);
            write::register_team(
                engine.connection(),
                &Team::new(id.clone(), format!("Team {i:02}"), subgroup),
            )?;
        }

        let projects: Vec<String> = (0..config.project_count)
            .map(|i| format!("project-{i:02}"))
            .collect();
        for (i, id) in projects.iter().enumerate() {
            let owner_index = i % config.team_count;
            let subgroup = format!("sg-{}", owner_index % config.subgroup_count);
            write::register_project(
                engine.connection(),
                id,
                &teams[owner_index],
                &subgroup,
                &format!("https://apps.sim.invalid/{id}"),
            )?;
        }

        let rng = StdRng::seed_from_u64(config.seed);
        Ok(Self {
            config,
            engine,
            rng,
            teams,
            projects,
            draft: None,
        })
    }

    /// The engine's durable state, for oracle checks after a run.
    #[must_use]
    pub fn engine(&self) -> &Engine {
        &self.engine
    }

    #[must_use]
    pub fn load_cap(&self) -> u32 {
        self.config.load_cap
    }

    /// Draw and apply `rounds` operations.
    ///
    /// # Errors
    ///
    /// Returns an error only for storage-level failures; engine
    /// rejections are counted in the result.
    pub fn run(&mut self) -> Result<ScenarioResult> {
        let mut result = ScenarioResult {
            rounds: self.config.rounds,
            ops_applied: 0,
            ops_rejected: 0,
            ops_skipped: 0,
            projects_confirmed: 0,
            reports_opened: 0,
            reports_approved: 0,
            trace: Vec::new(),
        };

        for round in 0..self.config.rounds {
            let op = match self.rng.gen_range(0..11_u32) {
                0 => self.op_propose(),
                1 => self.op_reroll(),
                2 => self.op_confirm(&mut result),
                3 => self.op_cancel(),
                4 => self.op_manual_assign(),
                5 => self.op_reassign(),
                6 => self.op_report(&mut result),
                7 => self.op_submit(round),
                8 => self.op_approve(&mut result),
                9 => self.op_decline(),
                _ => self.op_complete(),
            }?;
            match op {
                Op::Applied(desc) => {
                    result.ops_applied += 1;
                    result.trace.push(format!("round {round}: {desc}"));
                }
                Op::Rejected(desc) => {
                    result.ops_rejected += 1;
                    result.trace.push(format!("round {round}: {desc}"));
                }
                Op::Skipped(what) => {
                    result.ops_skipped += 1;
                    result.trace.push(format!("round {round}: skipped {what}"));
                }
            }
        }

        // Leave no lease dangling between runs.
        if let Some(draft) = self.draft.take() {
            self.engine.cancel(&draft);
        }

        tracing::debug!(
            seed = self.config.seed,
            applied = result.ops_applied,
            rejected = result.ops_rejected,
            skipped = result.ops_skipped,
            "scenario complete"
        );
        Ok(result)
    }

    // -- individual operations ----------------------------------------------

    fn op_propose(&mut self) -> Result<Op> {
        match self.engine.propose(&mut self.rng) {
            Ok(draft) => {
                let desc = format!(
                    "propose {}: {} proposals, {} unplaced",
                    draft.draft_id,
                    draft.proposals.len(),
                    draft.unplaced.len()
                );
                self.draft = Some(draft);
                Ok(Op::Applied(desc))
            }
            Err(e) => reject("propose", e),
        }
    }

    fn op_reroll(&mut self) -> Result<Op> {
        let Some(draft) = self.draft.as_mut() else {
            return Ok(Op::Skipped("reroll: no draft"));
        };
        if draft.proposals.is_empty() {
            return Ok(Op::Skipped("reroll: empty draft"));
        }
        let idx = self.rng.gen_range(0..draft.proposals.len());
        let project_id = draft.proposals[idx].project_id.clone();
        match self.engine.reroll(draft, &project_id, &mut self.rng) {
            Ok(()) => Ok(Op::Applied(format!("reroll {project_id}"))),
            Err(e) => reject("reroll", e),
        }
    }

    fn op_confirm(&mut self, result: &mut ScenarioResult) -> Result<Op> {
        let Some(draft) = self.draft.take() else {
            return Ok(Op::Skipped("confirm: no draft"));
        };
        match self.engine.confirm_all(&draft) {
            Ok(outcome) => {
                result.projects_confirmed += outcome.confirmed;
                Ok(Op::Applied(format!(
                    "confirm {}: {} confirmed, {} failed",
                    draft.draft_id,
                    outcome.confirmed,
                    outcome.failed.len()
                )))
            }
            Err(e) => reject("confirm", e),
        }
    }

    fn op_cancel(&mut self) -> Result<Op> {
        let Some(draft) = self.draft.take() else {
            return Ok(Op::Skipped("cancel: no draft"));
        };
        self.engine.cancel(&draft);
        Ok(Op::Applied(format!("cancel {}", draft.draft_id)))
    }

    fn op_manual_assign(&mut self) -> Result<Op> {
        let project_id = pick(&mut self.rng, &self.projects);
        // Unconstrained picks on purpose: duplicate or owner teams
        // exercise the validation path.
        let team1 = pick(&mut self.rng, &self.teams);
        let team2 = pick(&mut self.rng, &self.teams);
        match self.engine.manual_assign(&project_id, &team1, &team2) {
            Ok(()) => Ok(Op::Applied(format!(
                "manual_assign {project_id} <- {team1}, {team2}"
            ))),
            Err(e) => reject("manual_assign", e),
        }
    }

    fn op_reassign(&mut self) -> Result<Op> {
        let project_id = pick(&mut self.rng, &self.projects);
        let (team1, team2) = match self.rng.gen_range(0..3_u32) {
            0 => (Some(pick(&mut self.rng, &self.teams)), Some(pick(&mut self.rng, &self.teams))),
            1 => (Some(pick(&mut self.rng, &self.teams)), None),
            _ => (None, None),
        };
        match self
            .engine
            .reassign(&project_id, team1.as_deref(), team2.as_deref())
        {
            Ok(()) => Ok(Op::Applied(format!(
                "reassign {project_id} <- {team1:?}, {team2:?}"
            ))),
            Err(e) => reject("reassign", e),
        }
    }

    fn op_report(&mut self, result: &mut ScenarioResult) -> Result<Op> {
        let project_id = pick(&mut self.rng, &self.projects);
        // Mostly a real tester of the project; sometimes any team so the
        // reporter check gets exercised too.
        let reporter = if self.rng.gen_range(0..4_u32) == 0 {
            pick(&mut self.rng, &self.teams)
        } else {
            let assignments =
                query::assignments_for_project(self.engine.connection(), &project_id)?;
            let active: Vec<String> = assignments
                .iter()
                .filter(|a| a.is_active())
                .map(|a| a.testing_team_id.clone())
                .collect();
            if active.is_empty() {
                return Ok(Op::Skipped("report: project has no testers"));
            }
            pick(&mut self.rng, &active)
        };
        match self
            .engine
            .report_broken_link(&project_id, &reporter, "simulated broken deployment link")
        {
            Ok(report_id) => {
                result.reports_opened += 1;
                Ok(Op::Applied(format!("report {project_id} -> {report_id}")))
            }
            Err(e) => reject("report", e),
        }
    }

    fn op_submit(&mut self, round: u64) -> Result<Op> {
        let Some(report_id) = self.pick_unresolved_report()? else {
            return Ok(Op::Skipped("submit: no unresolved report"));
        };
        let url = format!("https://apps.sim.invalid/replacement-{round}");
        match self.engine.submit_replacement_link(&report_id, &url) {
            Ok(()) => Ok(Op::Applied(format!("submit {report_id}"))),
            Err(e) => reject("submit", e),
        }
    }

    fn op_approve(&mut self, result: &mut ScenarioResult) -> Result<Op> {
        let Some(report_id) = self.pick_unresolved_report()? else {
            return Ok(Op::Skipped("approve: no unresolved report"));
        };
        match self.engine.approve(&report_id) {
            Ok(()) => {
                result.reports_approved += 1;
                Ok(Op::Applied(format!("approve {report_id}")))
            }
            Err(e) => reject("approve", e),
        }
    }

    fn op_decline(&mut self) -> Result<Op> {
        let Some(report_id) = self.pick_unresolved_report()? else {
            return Ok(Op::Skipped("decline: no unresolved report"));
        };
        match self.engine.decline(&report_id, "replacement still broken") {
            Ok(()) => Ok(Op::Applied(format!("decline {report_id}"))),
            Err(e) => reject("decline", e),
        }
    }

    /// External collaborator event: a testing team finishes its pass.
    fn op_complete(&mut self) -> Result<Op> {
        let active = query::list_assignments(
            self.engine.connection(),
            &query::AssignmentFilter {
                active_only: true,
                ..query::AssignmentFilter::default()
            },
        )?;
        if active.is_empty() {
            return Ok(Op::Skipped("complete: no active assignment"));
        }
        let idx = self.rng.gen_range(0..active.len());
        let assignment_id = active[idx].id.clone();
        write::complete_assignment(self.engine.connection(), &assignment_id)?;
        Ok(Op::Applied(format!("complete {assignment_id}")))
    }

    // -- helpers ------------------------------------------------------------

    fn pick_unresolved_report(&mut self) -> Result<Option<String>> {
        let reports = query::list_unresolved_reports(self.engine.connection())?;
        if reports.is_empty() {
            return Ok(None);
        }
        let idx = self.rng.gen_range(0..reports.len());
        Ok(Some(reports[idx].id.clone()))
    }
}

fn pick(rng: &mut StdRng, pool: &[String]) -> String {
    pool[rng.gen_range(0..pool.len())].clone()
}

/// Map an engine rejection to a trace entry; storage errors bubble up.
fn reject(op: &str, err: EngineError) -> Result<Op> {
    match err {
        EngineError::Storage(e) => Err(e.context(format!("{op} storage failure"))),
        e => Ok(Op::Rejected(format!("{op} rejected: {e}"))),
    }
}
