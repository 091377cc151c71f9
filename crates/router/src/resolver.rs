//! Preference resolution across the active profiles.
//!
//! Each active profile may rank options for a category. The resolver turns
//! those rankings into one decision per category, or an explicit conflict
//! when no strict winner exists. The decision rule is a pluggable
//! [`ResolutionPolicy`]; [`RankSumPolicy`] is the default.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tracing::{debug, warn};

use switchyard_config::{RANK_SUM_POLICY, ResolverConfig};
use switchyard_core::{CategoryRanking, Error, Profile, Result, normalize_key};
use switchyard_profiles::ProfileSnapshot;

use crate::classifier::ActiveProfile;

/// One active profile's ranking for the category being resolved.
#[derive(Debug, Clone, Copy)]
pub struct Contributor<'a> {
    pub profile: &'a Profile,
    pub ranking: &'a CategoryRanking,
    pub confidence: f64,
}

/// A rule that merges several rankings of one category.
///
/// `contributors` is never empty and arrives in classification-confidence
/// order.
pub trait ResolutionPolicy: Send + Sync {
    fn name(&self) -> &str;

    fn resolve(&self, category: &str, contributors: &[Contributor<'_>]) -> ResolvedPreference;
}

/// The outcome for one category.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum Resolution {
    /// A single winning option.
    Chosen { option: String, rationale: String },
    /// Any of these options is acceptable to every contributor.
    AnyOf { options: Vec<String> },
    /// No strict winner; the engine does not guess.
    Conflict { candidates: Vec<String> },
}

/// How a `Chosen` or `AnyOf` outcome was reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DecidedBy {
    /// Only one profile ranks the category.
    Sole,
    /// Lowest combined rank.
    RankSum,
    /// Rank-sum tie broken by the more confident profile.
    Confidence,
    /// Every contributor gave an unordered set.
    Intersection,
}

/// Combined rank of one option.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OptionTally {
    pub option: String,
    pub rank_sum: usize,
}

/// The resolved preference for one category, with its audit trail.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolvedPreference {
    pub category: String,
    #[serde(flatten)]
    pub resolution: Resolution,
    /// Profiles that rank this category, in confidence order.
    pub contributors: Vec<String>,
    /// Rank sums, best first. Empty when no ranks were combined.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tally: Vec<OptionTally>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub decided_by: Option<DecidedBy>,
}

impl ResolvedPreference {
    pub fn is_conflict(&self) -> bool {
        matches!(self.resolution, Resolution::Conflict { .. })
    }

    /// The decided option, or the `Conflict` error. For `AnyOf` the first
    /// acceptable option is returned.
    pub fn chosen(&self) -> Result<&str> {
        match &self.resolution {
            Resolution::Chosen { option, .. } => Ok(option.as_str()),
            Resolution::AnyOf { options } => options
                .first()
                .map(String::as_str)
                .ok_or_else(|| self.conflict_error(Vec::new())),
            Resolution::Conflict { candidates } => Err(self.conflict_error(candidates.clone())),
        }
    }

    fn conflict_error(&self, candidates: Vec<String>) -> Error {
        Error::Conflict {
            category: self.category.clone(),
            candidates,
        }
    }
}

/// Lowest rank sum wins; an option a profile does not rank costs that
/// profile's worst rank. Rank-sum ties are broken level by level from the
/// most confident profiles down; what survives every level is a conflict.
#[derive(Debug, Clone, Copy, Default)]
pub struct RankSumPolicy;

impl ResolutionPolicy for RankSumPolicy {
    fn name(&self) -> &str {
        RANK_SUM_POLICY
    }

    fn resolve(&self, category: &str, contributors: &[Contributor<'_>]) -> ResolvedPreference {
        let contributor_ids: Vec<String> =
            contributors.iter().map(|c| c.profile.id.clone()).collect();
        let decide = |resolution, tally, decided_by| ResolvedPreference {
            category: category.to_string(),
            resolution,
            contributors: contributor_ids,
            tally,
            decided_by,
        };

        if let [sole] = contributors {
            let ranking = sole.ranking;
            let resolution = if ranking.unordered && ranking.options.len() > 1 {
                Resolution::AnyOf {
                    options: ranking.options.iter().map(|o| o.name.clone()).collect(),
                }
            } else {
                match ranking.top() {
                    Some(top) => chosen(top.name.clone(), top.rationale.clone()),
                    None => Resolution::Conflict { candidates: vec![] },
                }
            };
            return decide(resolution, Vec::new(), Some(DecidedBy::Sole));
        }

        if contributors.iter().all(|c| c.ranking.unordered) {
            let (resolution, decided_by) = intersect(contributors);
            return decide(resolution, Vec::new(), decided_by);
        }

        let options = option_universe(contributors);
        let mut tally: Vec<OptionTally> = options
            .iter()
            .map(|option| OptionTally {
                option: option.clone(),
                rank_sum: rank_sum(option, contributors),
            })
            .collect();
        tally.sort_by_key(|t| t.rank_sum);

        let best = tally.first().map_or(0, |t| t.rank_sum);
        let mut tied: Vec<String> = tally
            .iter()
            .take_while(|t| t.rank_sum == best)
            .map(|t| t.option.clone())
            .collect();

        if tied.len() == 1 {
            let winner = tied.remove(0);
            let rationale = rationale_for(&winner, contributors);
            return decide(chosen(winner, rationale), tally, Some(DecidedBy::RankSum));
        }

        for level in confidence_levels(contributors) {
            let sums: Vec<usize> = tied.iter().map(|o| rank_sum(o, &level)).collect();
            let level_best = sums.iter().copied().min().unwrap_or(0);
            tied = tied
                .into_iter()
                .zip(sums)
                .filter(|(_, sum)| *sum == level_best)
                .map(|(option, _)| option)
                .collect();
            if tied.len() == 1 {
                let winner = tied.remove(0);
                let rationale = rationale_for(&winner, contributors);
                return decide(chosen(winner, rationale), tally, Some(DecidedBy::Confidence));
            }
        }

        decide(Resolution::Conflict { candidates: tied }, tally, None)
    }
}

fn chosen(option: String, rationale: String) -> Resolution {
    Resolution::Chosen { option, rationale }
}

/// Every option any contributor mentions, in first-appearance order.
fn option_universe(contributors: &[Contributor<'_>]) -> Vec<String> {
    let mut seen = HashSet::new();
    contributors
        .iter()
        .flat_map(|c| c.ranking.options.iter())
        .filter(|o| seen.insert(normalize_key(&o.name)))
        .map(|o| o.name.clone())
        .collect()
}

fn rank_sum(option: &str, contributors: &[Contributor<'_>]) -> usize {
    contributors
        .iter()
        .map(|c| {
            c.ranking
                .rank_of(option)
                .unwrap_or_else(|| c.ranking.worst_rank())
        })
        .sum()
}

/// Group contributors by confidence, highest first. Confidences within
/// `f64::EPSILON` of each other share a level.
fn confidence_levels<'a>(contributors: &[Contributor<'a>]) -> Vec<Vec<Contributor<'a>>> {
    let mut sorted = contributors.to_vec();
    sorted.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));

    let mut levels: Vec<Vec<Contributor<'a>>> = Vec::new();
    for contributor in sorted {
        let same_level = levels.last().is_some_and(|level| {
            (level[0].confidence - contributor.confidence).abs() <= f64::EPSILON
        });
        if let (true, Some(level)) = (same_level, levels.last_mut()) {
            level.push(contributor);
        } else {
            levels.push(vec![contributor]);
        }
    }
    levels
}

/// The rationale from the most confident contributor that ranks `option`.
fn rationale_for(option: &str, contributors: &[Contributor<'_>]) -> String {
    contributors
        .iter()
        .find_map(|c| c.ranking.option(option))
        .map(|o| o.rationale.clone())
        .unwrap_or_default()
}

fn intersect(contributors: &[Contributor<'_>]) -> (Resolution, Option<DecidedBy>) {
    let Some((first, rest)) = contributors.split_first() else {
        return (Resolution::Conflict { candidates: vec![] }, None);
    };
    let common: Vec<String> = first
        .ranking
        .options
        .iter()
        .filter(|o| rest.iter().all(|c| c.ranking.option(&o.name).is_some()))
        .map(|o| o.name.clone())
        .collect();

    match common.len() {
        0 => (
            Resolution::Conflict {
                candidates: option_universe(contributors),
            },
            None,
        ),
        1 => {
            let option = common[0].clone();
            let rationale = rationale_for(&option, contributors);
            (chosen(option, rationale), Some(DecidedBy::Intersection))
        }
        _ => (
            Resolution::AnyOf { options: common },
            Some(DecidedBy::Intersection),
        ),
    }
}

/// Resolves categories for a set of active profiles with one policy.
pub struct Resolver {
    policy: Box<dyn ResolutionPolicy>,
}

impl std::fmt::Debug for Resolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Resolver")
            .field("policy", &self.policy.name())
            .finish()
    }
}

impl Default for Resolver {
    fn default() -> Self {
        Self::new(Box::new(RankSumPolicy))
    }
}

impl Resolver {
    pub fn new(policy: Box<dyn ResolutionPolicy>) -> Self {
        Self { policy }
    }

    /// Select the policy named in configuration.
    pub fn from_config(config: &ResolverConfig) -> Result<Self> {
        match config.policy.as_str() {
            RANK_SUM_POLICY => Ok(Self::default()),
            other => Err(Error::validation(
                "resolver.policy",
                format!("unknown resolution policy '{other}'"),
            )),
        }
    }

    pub fn policy_name(&self) -> &str {
        self.policy.name()
    }

    /// Resolve one category across the active profiles.
    ///
    /// Fails with `NotFound` if an active profile is not in the snapshot and
    /// with `Validation` if no active profile ranks the category.
    pub fn resolve(
        &self,
        active: &[ActiveProfile],
        profiles: &ProfileSnapshot,
        category: &str,
    ) -> Result<ResolvedPreference> {
        let resolved = lookup_active(active, profiles)?;
        self.resolve_among(&resolved, category).ok_or_else(|| {
            Error::validation(category, "no active profile ranks this category")
        })
    }

    /// Resolve every category any active profile ranks, in order of first
    /// appearance over the active profiles.
    pub fn resolve_all(
        &self,
        active: &[ActiveProfile],
        profiles: &ProfileSnapshot,
    ) -> Result<Vec<ResolvedPreference>> {
        let resolved = lookup_active(active, profiles)?;

        let mut seen = HashSet::new();
        let categories: Vec<&str> = resolved
            .iter()
            .flat_map(|(profile, _)| profile.rankings.iter())
            .filter(|r| seen.insert(normalize_key(&r.category)))
            .map(|r| r.category.as_str())
            .collect();

        Ok(categories
            .into_iter()
            .filter_map(|category| self.resolve_among(&resolved, category))
            .collect())
    }

    fn resolve_among(
        &self,
        resolved: &[(std::sync::Arc<Profile>, f64)],
        category: &str,
    ) -> Option<ResolvedPreference> {
        let contributors: Vec<Contributor<'_>> = resolved
            .iter()
            .filter_map(|(profile, confidence)| {
                profile.ranking(category).map(|ranking| Contributor {
                    profile,
                    ranking,
                    confidence: *confidence,
                })
            })
            .collect();
        if contributors.is_empty() {
            return None;
        }

        let preference = self.policy.resolve(category, &contributors);
        match &preference.resolution {
            Resolution::Conflict { candidates } => {
                warn!(category, candidates = ?candidates, "Unresolved preference conflict")
            }
            other => debug!(
                category,
                resolution = ?other,
                decided_by = ?preference.decided_by,
                "Resolved preference"
            ),
        }
        Some(preference)
    }
}

fn lookup_active(
    active: &[ActiveProfile],
    profiles: &ProfileSnapshot,
) -> Result<Vec<(std::sync::Arc<Profile>, f64)>> {
    active
        .iter()
        .map(|a| {
            profiles
                .get(&a.profile_id)
                .map(|p| (p, a.confidence))
                .ok_or_else(|| Error::profile_not_found(&a.profile_id))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use switchyard_core::{CollaborationContract, RankedOption};

    fn ranking(category: &str, options: &[&str]) -> CategoryRanking {
        CategoryRanking {
            category: category.into(),
            unordered: false,
            options: options
                .iter()
                .map(|name| RankedOption {
                    name: name.to_string(),
                    rationale: format!("{name} rationale"),
                })
                .collect(),
        }
    }

    fn unordered(category: &str, options: &[&str]) -> CategoryRanking {
        CategoryRanking {
            unordered: true,
            ..ranking(category, options)
        }
    }

    fn profile(id: &str, rankings: Vec<CategoryRanking>) -> Profile {
        Profile {
            id: id.into(),
            description: String::new(),
            tags: vec![id.to_string()],
            rankings,
            template: vec![],
            contract: CollaborationContract::default(),
        }
    }

    fn active(entries: &[(&str, f64)]) -> Vec<ActiveProfile> {
        entries
            .iter()
            .map(|(id, confidence)| ActiveProfile {
                profile_id: id.to_string(),
                confidence: *confidence,
            })
            .collect()
    }

    fn resolve(
        profiles: Vec<Profile>,
        entries: &[(&str, f64)],
        category: &str,
    ) -> ResolvedPreference {
        let snapshot: ProfileSnapshot = profiles.into_iter().collect();
        Resolver::default()
            .resolve(&active(entries), &snapshot, category)
            .unwrap()
    }

    #[test]
    fn sole_contributor_top_option_verbatim() {
        let pref = resolve(
            vec![profile("a", vec![ranking("db", &["postgresql", "sqlite"])])],
            &[("a", 0.4)],
            "db",
        );
        assert_eq!(
            pref.resolution,
            Resolution::Chosen {
                option: "postgresql".into(),
                rationale: "postgresql rationale".into()
            }
        );
        assert_eq!(pref.decided_by, Some(DecidedBy::Sole));
        assert_eq!(pref.chosen().unwrap(), "postgresql");
    }

    #[test]
    fn mirrored_rankings_at_equal_confidence_conflict() {
        let pref = resolve(
            vec![
                profile("p", vec![ranking("x", &["A", "B"])]),
                profile("q", vec![ranking("x", &["B", "A"])]),
            ],
            &[("p", 0.5), ("q", 0.5)],
            "x",
        );
        assert_eq!(
            pref.resolution,
            Resolution::Conflict {
                candidates: vec!["A".into(), "B".into()]
            }
        );
        assert!(pref.decided_by.is_none());
        assert!(matches!(pref.chosen(), Err(Error::Conflict { .. })));
    }

    #[test]
    fn mirrored_rankings_broken_by_confidence() {
        let pref = resolve(
            vec![
                profile("p", vec![ranking("x", &["A", "B"])]),
                profile("q", vec![ranking("x", &["B", "A"])]),
            ],
            &[("q", 0.6), ("p", 0.5)],
            "x",
        );
        assert_eq!(pref.chosen().unwrap(), "B");
        assert_eq!(pref.decided_by, Some(DecidedBy::Confidence));
    }

    #[test]
    fn lowest_rank_sum_wins() {
        // a: [x, y, z]  b: [z, y, x]  c: [y, x, z]  => y: 2+2+1 = 5
        let pref = resolve(
            vec![
                profile("a", vec![ranking("k", &["x", "y", "z"])]),
                profile("b", vec![ranking("k", &["z", "y", "x"])]),
                profile("c", vec![ranking("k", &["y", "x", "z"])]),
            ],
            &[("a", 0.5), ("b", 0.5), ("c", 0.5)],
            "k",
        );
        assert_eq!(pref.chosen().unwrap(), "y");
        assert_eq!(pref.decided_by, Some(DecidedBy::RankSum));
        assert_eq!(pref.tally[0], OptionTally { option: "y".into(), rank_sum: 5 });
    }

    #[test]
    fn absent_option_gets_worst_rank_not_excluded() {
        // p: [rest, graphql, grpc]  q: [graphql, rest]
        // rest 1+2=3, graphql 2+1=3, grpc 3+3=6
        let pref = resolve(
            vec![
                profile("p", vec![ranking("api", &["rest", "graphql", "grpc"])]),
                profile("q", vec![ranking("api", &["graphql", "rest"])]),
            ],
            &[("p", 0.25), ("q", 0.25)],
            "api",
        );
        let grpc = pref.tally.iter().find(|t| t.option == "grpc").unwrap();
        assert_eq!(grpc.rank_sum, 6);
        assert!(pref.is_conflict());
    }

    #[test]
    fn shared_top_choice_wins() {
        let pref = resolve(
            vec![
                profile("p", vec![ranking("t", &["unit", "e2e"])]),
                profile("q", vec![ranking("t", &["unit", "component"])]),
            ],
            &[("p", 0.5), ("q", 0.5)],
            "t",
        );
        assert_eq!(pref.chosen().unwrap(), "unit");
    }

    #[test]
    fn tied_top_level_falls_through_to_next_level() {
        // A and B both sum to 6. The two 0.8 profiles cancel out, the 0.5
        // profile prefers A, the 0.2 profile's vote for B never counts.
        let pref = resolve(
            vec![
                profile("h1", vec![ranking("x", &["A", "B"])]),
                profile("h2", vec![ranking("x", &["B", "A"])]),
                profile("mid", vec![ranking("x", &["A", "B"])]),
                profile("lo", vec![ranking("x", &["B", "A"])]),
            ],
            &[("h1", 0.8), ("h2", 0.8), ("mid", 0.5), ("lo", 0.2)],
            "x",
        );
        assert_eq!(pref.chosen().unwrap(), "A");
        assert_eq!(pref.decided_by, Some(DecidedBy::Confidence));
    }

    #[test]
    fn unordered_sets_intersect() {
        let pref = resolve(
            vec![
                profile("p", vec![unordered("os", &["linux", "macos", "windows"])]),
                profile("q", vec![unordered("os", &["windows", "linux"])]),
            ],
            &[("p", 0.5), ("q", 0.5)],
            "os",
        );
        assert_eq!(
            pref.resolution,
            Resolution::AnyOf {
                options: vec!["linux".into(), "windows".into()]
            }
        );
        assert_eq!(pref.decided_by, Some(DecidedBy::Intersection));
        assert_eq!(pref.chosen().unwrap(), "linux");
    }

    #[test]
    fn disjoint_unordered_sets_conflict() {
        let pref = resolve(
            vec![
                profile("p", vec![unordered("os", &["linux"])]),
                profile("q", vec![unordered("os", &["windows"])]),
            ],
            &[("p", 0.5), ("q", 0.5)],
            "os",
        );
        assert_eq!(
            pref.resolution,
            Resolution::Conflict {
                candidates: vec!["linux".into(), "windows".into()]
            }
        );
    }

    #[test]
    fn unordered_set_ranks_members_equally_against_ordered() {
        // p unordered {A, B}: A=1, B=1, C=2. q ordered [B, C, A]: B=1, C=2, A=3.
        let pref = resolve(
            vec![
                profile("p", vec![unordered("x", &["A", "B"])]),
                profile("q", vec![ranking("x", &["B", "C", "A"])]),
            ],
            &[("p", 0.5), ("q", 0.5)],
            "x",
        );
        assert_eq!(pref.chosen().unwrap(), "B");
    }

    #[test]
    fn resolve_all_follows_first_appearance() {
        let snapshot: ProfileSnapshot = vec![
            profile("p", vec![ranking("db", &["pg"]), ranking("api", &["rest"])]),
            profile("q", vec![ranking("ui", &["react"]), ranking("api", &["rest"])]),
        ]
        .into_iter()
        .collect();
        let prefs = Resolver::default()
            .resolve_all(&active(&[("q", 0.6), ("p", 0.5)]), &snapshot)
            .unwrap();
        let categories: Vec<_> = prefs.iter().map(|p| p.category.as_str()).collect();
        assert_eq!(categories, vec!["ui", "api", "db"]);
        assert_eq!(prefs[1].contributors, vec!["q", "p"]);
    }

    #[test]
    fn unknown_active_profile_is_not_found() {
        let snapshot = ProfileSnapshot::default();
        let err = Resolver::default()
            .resolve_all(&active(&[("ghost", 1.0)]), &snapshot)
            .unwrap_err();
        assert!(matches!(err, Error::NotFound { .. }));
    }

    #[test]
    fn unranked_category_is_rejected() {
        let snapshot: ProfileSnapshot = vec![profile("p", vec![ranking("db", &["pg"])])]
            .into_iter()
            .collect();
        let err = Resolver::default()
            .resolve(&active(&[("p", 1.0)]), &snapshot, "styling")
            .unwrap_err();
        assert!(matches!(err, Error::Validation { .. }));
    }

    #[test]
    fn unknown_policy_rejected_from_config() {
        let config = ResolverConfig {
            policy: "coin_flip".into(),
        };
        assert!(Resolver::from_config(&config).is_err());
        assert_eq!(
            Resolver::from_config(&ResolverConfig::default())
                .unwrap()
                .policy_name(),
            "rank_sum"
        );
    }

    #[test]
    fn custom_policy_is_pluggable() {
        struct FirstContributor;
        impl ResolutionPolicy for FirstContributor {
            fn name(&self) -> &str {
                "first"
            }
            fn resolve(
                &self,
                category: &str,
                contributors: &[Contributor<'_>],
            ) -> ResolvedPreference {
                let top = &contributors[0].ranking.options[0];
                ResolvedPreference {
                    category: category.into(),
                    resolution: chosen(top.name.clone(), top.rationale.clone()),
                    contributors: vec![contributors[0].profile.id.clone()],
                    tally: vec![],
                    decided_by: Some(DecidedBy::Sole),
                }
            }
        }

        let snapshot: ProfileSnapshot = vec![
            profile("p", vec![ranking("x", &["A", "B"])]),
            profile("q", vec![ranking("x", &["B", "A"])]),
        ]
        .into_iter()
        .collect();
        let resolver = Resolver::new(Box::new(FirstContributor));
        let pref = resolver
            .resolve(&active(&[("q", 0.5), ("p", 0.5)]), &snapshot, "x")
            .unwrap();
        assert_eq!(pref.chosen().unwrap(), "B");
    }

    #[test]
    fn preference_serializes_flat() {
        let pref = resolve(
            vec![profile("a", vec![ranking("db", &["pg"])])],
            &[("a", 1.0)],
            "db",
        );
        let json = serde_json::to_value(&pref).unwrap();
        assert_eq!(json["outcome"], "chosen");
        assert_eq!(json["option"], "pg");
        assert_eq!(json["decided_by"], "sole");
    }
}
