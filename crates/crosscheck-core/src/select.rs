//! Candidate selection for a single project.
//!
//! Subgroup diversity is a soft preference that degrades tier by tier;
//! the hard constraints are only "not the owner", "not the same team
//! twice", and "under the load cap". A small roster therefore degrades to
//! partial or empty selections instead of failing outright.

use rand::Rng;

use crate::config::EngineConfig;
use crate::load::LoadIndex;
use crate::model::{Project, Team};

/// Result of selecting testing teams for one project.
///
/// Zero, one, or two teams; `team2` is only ever set when `team1` is.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Selection {
    pub team1: Option<String>,
    pub team2: Option<String>,
}

impl Selection {
    /// Number of teams selected.
    #[must_use]
    pub const fn len(&self) -> usize {
        match (&self.team1, &self.team2) {
            (Some(_), Some(_)) => 2,
            (Some(_), None) => 1,
            _ => 0,
        }
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.team1.is_none()
    }
}

/// Select up to two testing teams for `project` and record the picks in
/// `index` so callers threading one index through a batch see them.
///
/// Slot 1 prefers a team from a different subgroup than the project's,
/// relaxing to any subgroup. Slot 2 prefers a subgroup different from both
/// the project's and slot 1's, relaxing in two steps. Within a tier the
/// minimum-load team wins; ties break uniformly at random.
pub fn select_teams<R: Rng>(
    project: &Project,
    roster: &[Team],
    index: &mut LoadIndex,
    config: &EngineConfig,
    rng: &mut R,
) -> Selection {
    let cap = config.load_cap;
    let mut selection = Selection::default();

    let eligible = |team: &Team| team.id != project.owner_team_id && index.load_of(&team.id) < cap;

    // Slot 1: diverse subgroup, then any.
    let team1 = if config.prefer_subgroup_diversity {
        pick_min_load(
            roster
                .iter()
                .filter(|t| eligible(t) && t.subgroup != project.subgroup),
            index,
            rng,
        )
        .or_else(|| pick_min_load(roster.iter().filter(|t| eligible(t)), index, rng))
    } else {
        pick_min_load(roster.iter().filter(|t| eligible(t)), index, rng)
    };

    let Some(team1) = team1 else {
        return selection;
    };
    // Slot 2 must see slot 1's pick in the load counts.
    index.bump(&team1.id);
    selection.team1 = Some(team1.id.clone());

    let eligible2 =
        |team: &Team| team.id != team1.id && team.id != project.owner_team_id && index.load_of(&team.id) < cap;

    let team2 = if config.prefer_subgroup_diversity {
        pick_min_load(
            roster.iter().filter(|t| {
                eligible2(t) && t.subgroup != project.subgroup && t.subgroup != team1.subgroup
            }),
            index,
            rng,
        )
        .or_else(|| {
            pick_min_load(
                roster
                    .iter()
                    .filter(|t| eligible2(t) && t.subgroup != project.subgroup),
                index,
                rng,
            )
        })
        .or_else(|| pick_min_load(roster.iter().filter(|t| eligible2(t)), index, rng))
    } else {
        pick_min_load(roster.iter().filter(|t| eligible2(t)), index, rng)
    };

    if let Some(team2) = team2 {
        index.bump(&team2.id);
        selection.team2 = Some(team2.id.clone());
    }

    selection
}

/// Minimum-load team among `candidates`; ties break uniformly at random.
fn pick_min_load<'a, R, I>(candidates: I, index: &LoadIndex, rng: &mut R) -> Option<&'a Team>
where
    R: Rng,
    I: Iterator<Item = &'a Team>,
{
    let mut best: Vec<&Team> = Vec::new();
    let mut best_load = u32::MAX;
    for team in candidates {
        let load = index.load_of(&team.id);
        if load < best_load {
            best_load = load;
            best.clear();
            best.push(team);
        } else if load == best_load {
            best.push(team);
        }
    }
    match best.len() {
        0 => None,
        1 => Some(best[0]),
        n => Some(best[rng.gen_range(0..n)]),
    }
}

#[cfg(test)]
mod tests {
    use super::select_teams;
    use crate::config::EngineConfig;
    use crate::load::LoadIndex;
    use crate::model::{Project, Team};
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn team(id: &str, subgroup: &str) -> Team {
        Team::new(id, format!("Team {id}"), subgroup)
    }

    fn project(owner: &str, subgroup: &str) -> Project {
        Project {
            id: "prj-1".to_string(),
            owner_team_id: owner.to_string(),
            subgroup: subgroup.to_string(),
            deployed_link: "https://example.invalid/app".to_string(),
            created_at_us: 0,
            updated_at_us: 0,
        }
    }

    #[test]
    fn prefers_other_subgroup_over_same() {
        // Roster from the course scenario: owner A and B in X, C and D in Y.
        let roster = vec![team("a", "x"), team("b", "x"), team("c", "y"), team("d", "y")];
        let prj = project("a", "x");
        let config = EngineConfig::default();

        for seed in 0..64 {
            let mut rng = StdRng::seed_from_u64(seed);
            let mut index = LoadIndex::default();
            let selection = select_teams(&prj, &roster, &mut index, &config, &mut rng);

            let t1 = selection.team1.expect("slot 1");
            let t2 = selection.team2.expect("slot 2");
            // Both slots must come from subgroup y; never the owner, never b.
            assert!(["c", "d"].contains(&t1.as_str()), "unexpected slot 1 {t1}");
            assert!(["c", "d"].contains(&t2.as_str()), "unexpected slot 2 {t2}");
            assert_ne!(t1, t2);
        }
    }

    #[test]
    fn falls_back_to_same_subgroup_when_diverse_teams_are_capped() {
        let roster = vec![team("a", "x"), team("b", "x"), team("c", "y"), team("d", "y")];
        let prj = project("a", "x");
        let config = EngineConfig::default();

        let mut index = LoadIndex::default();
        for _ in 0..config.load_cap {
            index.bump("c");
            index.bump("d");
        }

        let mut rng = StdRng::seed_from_u64(7);
        let selection = select_teams(&prj, &roster, &mut index, &config, &mut rng);
        // Only b has capacity left; selector must still return it.
        assert_eq!(selection.team1.as_deref(), Some("b"));
        assert_eq!(selection.team2, None);
    }

    #[test]
    fn never_selects_the_owner() {
        let roster = vec![team("a", "x"), team("b", "y")];
        let prj = project("a", "x");
        let config = EngineConfig::default();

        let mut rng = StdRng::seed_from_u64(1);
        let mut index = LoadIndex::default();
        let selection = select_teams(&prj, &roster, &mut index, &config, &mut rng);
        assert_eq!(selection.team1.as_deref(), Some("b"));
        assert_eq!(selection.team2, None);
        assert_eq!(selection.len(), 1);
    }

    #[test]
    fn empty_when_everyone_is_capped_or_owner() {
        let roster = vec![team("a", "x"), team("b", "y")];
        let prj = project("a", "x");
        let config = EngineConfig::default();

        let mut index = LoadIndex::default();
        index.bump("b");
        index.bump("b");

        let mut rng = StdRng::seed_from_u64(2);
        let selection = select_teams(&prj, &roster, &mut index, &config, &mut rng);
        assert!(selection.is_empty());
        assert_eq!(selection.len(), 0);
    }

    #[test]
    fn min_load_wins_over_subgroup_peer() {
        let roster = vec![team("a", "x"), team("b", "y"), team("c", "y")];
        let prj = project("a", "x");
        let config = EngineConfig::default();

        let mut index = LoadIndex::default();
        index.bump("b");

        let mut rng = StdRng::seed_from_u64(3);
        let mut idx = index.clone();
        let selection = select_teams(&prj, &roster, &mut idx, &config, &mut rng);
        // c has load 0, b has load 1: c must take slot 1.
        assert_eq!(selection.team1.as_deref(), Some("c"));
        assert_eq!(selection.team2.as_deref(), Some("b"));
    }

    #[test]
    fn selection_updates_the_shared_index() {
        let roster = vec![team("a", "x"), team("b", "y"), team("c", "y")];
        let prj = project("a", "x");
        let config = EngineConfig::default();

        let mut rng = StdRng::seed_from_u64(4);
        let mut index = LoadIndex::default();
        let selection = select_teams(&prj, &roster, &mut index, &config, &mut rng);

        for id in [selection.team1.expect("t1"), selection.team2.expect("t2")] {
            assert_eq!(index.load_of(&id), 1);
        }
    }

    #[test]
    fn diversity_toggle_off_uses_hard_constraints_only() {
        let roster = vec![team("a", "x"), team("b", "x"), team("c", "y")];
        let prj = project("a", "x");
        let config = EngineConfig {
            prefer_subgroup_diversity: false,
            ..EngineConfig::default()
        };

        let mut rng = StdRng::seed_from_u64(5);
        let mut index = LoadIndex::default();
        let selection = select_teams(&prj, &roster, &mut index, &config, &mut rng);
        assert_eq!(selection.len(), 2);
        let picked = [selection.team1.expect("t1"), selection.team2.expect("t2")];
        assert!(!picked.contains(&"a".to_string()));
    }
}
