//! Property tests for the selector and the batch matcher.

use proptest::prelude::*;
use rand::SeedableRng;
use rand::rngs::StdRng;

use crosscheck_core::config::{EngineConfig, TEAMS_PER_PROJECT};
use crosscheck_core::load::LoadIndex;
use crosscheck_core::model::{Project, Team};
use crosscheck_core::{MatchOutcome, match_batch, select_teams};

const SUBGROUPS: [&str; 3] = ["x", "y", "z"];

fn roster(size: usize, picks: &[usize]) -> Vec<Team> {
    (0..size)
        .map(|i| {
            let subgroup = SUBGROUPS[picks[i] % SUBGROUPS.len()];
            Team::new(format!("team-{i}"), format!("Team {i}"), subgroup)
        })
        .collect()
}

fn project(id: &str, owner: &Team) -> Project {
    Project {
        id: id.to_string(),
        owner_team_id: owner.id.clone(),
        subgroup: owner.subgroup.clone(),
        deployed_link: "https://example.invalid/app".to_string(),
        created_at_us: 0,
        updated_at_us: 0,
    }
}

proptest! {
    #[test]
    fn selection_respects_hard_constraints(
        size in 2usize..10,
        picks in proptest::collection::vec(0usize..3, 10),
        cap in 1u32..4,
        diversity in any::<bool>(),
        seed in any::<u64>(),
    ) {
        let roster = roster(size, &picks);
        let prj = project("p", &roster[0]);
        let config = EngineConfig { load_cap: cap, prefer_subgroup_diversity: diversity };

        let mut index = LoadIndex::default();
        let mut rng = StdRng::seed_from_u64(seed);
        let selection = select_teams(&prj, &roster, &mut index, &config, &mut rng);

        if let Some(t1) = &selection.team1 {
            prop_assert_ne!(t1, &prj.owner_team_id);
            prop_assert!(index.load_of(t1) <= cap);
        }
        if let Some(t2) = &selection.team2 {
            prop_assert_ne!(t2, &prj.owner_team_id);
            prop_assert_ne!(Some(t2), selection.team1.as_ref());
            prop_assert!(index.load_of(t2) <= cap);
        }

        // Starting from an empty index every non-owner team is eligible,
        // so the selection is only short when the roster is.
        let non_owner = size - 1;
        prop_assert_eq!(selection.len(), non_owner.min(TEAMS_PER_PROJECT));
    }

    #[test]
    fn batch_matching_never_exceeds_the_cap(
        size in 2usize..10,
        picks in proptest::collection::vec(0usize..3, 10),
        projects in 1usize..8,
        cap in 1u32..4,
        seed in any::<u64>(),
    ) {
        let roster = roster(size, &picks);
        let batch: Vec<Project> = (0..projects)
            .map(|i| project(&format!("p{i}"), &roster[i % size]))
            .collect();
        let config = EngineConfig { load_cap: cap, prefer_subgroup_diversity: true };

        let mut rng = StdRng::seed_from_u64(seed);
        let outcome = match_batch(&batch, &roster, LoadIndex::default(), &config, &mut rng);

        let mut loads: std::collections::HashMap<&str, u32> = std::collections::HashMap::new();
        for m in &outcome.matches {
            let owner = &batch
                .iter()
                .find(|p| p.id == m.project_id)
                .expect("matched project is from the batch")
                .owner_team_id;
            match &m.outcome {
                MatchOutcome::Full { team1, team2 } => {
                    prop_assert_ne!(team1, owner);
                    prop_assert_ne!(team2, owner);
                    prop_assert_ne!(team1, team2);
                    *loads.entry(team1).or_insert(0) += 1;
                    *loads.entry(team2).or_insert(0) += 1;
                }
                MatchOutcome::Partial { team1 } => {
                    prop_assert_ne!(team1, owner);
                    *loads.entry(team1).or_insert(0) += 1;
                }
                MatchOutcome::Failed => {}
            }
        }
        for (team_id, load) in loads {
            prop_assert!(load <= cap, "team {} over cap: {}", team_id, load);
        }
    }

    #[test]
    fn matching_is_deterministic_for_a_fixed_seed(
        size in 2usize..8,
        picks in proptest::collection::vec(0usize..3, 10),
        projects in 1usize..6,
        seed in any::<u64>(),
    ) {
        let roster = roster(size, &picks);
        let batch: Vec<Project> = (0..projects)
            .map(|i| project(&format!("p{i}"), &roster[i % size]))
            .collect();
        let config = EngineConfig::default();

        let run = |seed: u64| {
            let mut rng = StdRng::seed_from_u64(seed);
            match_batch(&batch, &roster, LoadIndex::default(), &config, &mut rng)
        };
        prop_assert_eq!(run(seed), run(seed));
    }
}
