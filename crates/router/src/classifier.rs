//! Request classification: how strongly each registered profile applies.
//!
//! A profile's confidence is the share of its tags the request signals.
//! Every profile within `tie_threshold` of the best score (and above
//! `min_confidence`) is active; composition merges them.

use serde::{Deserialize, Serialize};
use tracing::debug;

use switchyard_config::ClassifierConfig;
use switchyard_core::{Error, Result, TaskRequest};
use switchyard_profiles::ProfileSnapshot;

use crate::signals::RequestSignals;

/// Scores one request against a registry snapshot.
#[derive(Debug, Clone)]
pub struct Classifier {
    min_confidence: f64,
    tie_threshold: f64,
}

impl Default for Classifier {
    fn default() -> Self {
        Self::from_config(&ClassifierConfig::default())
    }
}

impl Classifier {
    pub fn new(min_confidence: f64, tie_threshold: f64) -> Self {
        Self {
            min_confidence,
            tie_threshold,
        }
    }

    pub fn from_config(config: &ClassifierConfig) -> Self {
        Self::new(config.min_confidence, config.tie_threshold)
    }

    pub fn min_confidence(&self) -> f64 {
        self.min_confidence
    }

    /// Classify a request.
    ///
    /// Fails with `AmbiguousRequest` when no profile reaches the minimum
    /// confidence, when nothing in the request matches any profile, or when
    /// the registry is empty.
    pub fn classify(
        &self,
        request: &TaskRequest,
        profiles: &ProfileSnapshot,
    ) -> Result<ClassificationResult> {
        let signals = RequestSignals::extract(request);

        let scores: Vec<ProfileScore> = profiles
            .iter()
            .map(|profile| {
                let matched_tags: Vec<String> = profile
                    .tags
                    .iter()
                    .filter(|tag| signals.matches_tag(tag))
                    .cloned()
                    .collect();
                let forced = signals.names_profile(&profile.id);
                let confidence = if forced {
                    1.0
                } else {
                    matched_tags.len() as f64 / profile.tags.len() as f64
                };
                debug!(
                    profile = %profile.id,
                    confidence,
                    matched = matched_tags.len(),
                    forced,
                    "Scored profile"
                );
                ProfileScore {
                    profile_id: profile.id.clone(),
                    confidence,
                    matched_tags,
                    forced,
                }
            })
            .collect();

        let best = scores
            .iter()
            .enumerate()
            .max_by(|(ia, a), (ib, b)| {
                a.confidence
                    .total_cmp(&b.confidence)
                    .then_with(|| ib.cmp(ia))
            })
            .map(|(_, s)| s);

        let top = best.map_or(0.0, |s| s.confidence);
        if best.is_none() || top < self.min_confidence || top == 0.0 {
            return Err(Error::AmbiguousRequest {
                best_confidence: top,
                min_confidence: self.min_confidence,
                best_profile: best.filter(|s| s.confidence > 0.0).map(|s| s.profile_id.clone()),
            });
        }

        let mut active: Vec<(usize, ActiveProfile)> = scores
            .iter()
            .enumerate()
            .filter(|(_, s)| s.confidence >= self.min_confidence)
            .filter(|(_, s)| top - s.confidence <= self.tie_threshold + f64::EPSILON)
            .map(|(i, s)| {
                (
                    i,
                    ActiveProfile {
                        profile_id: s.profile_id.clone(),
                        confidence: s.confidence,
                    },
                )
            })
            .collect();
        active.sort_by(|(ia, a), (ib, b)| {
            b.confidence
                .total_cmp(&a.confidence)
                .then_with(|| ia.cmp(ib))
        });

        Ok(ClassificationResult {
            scores,
            active: active.into_iter().map(|(_, a)| a).collect(),
        })
    }
}

/// One profile's score for a request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProfileScore {
    pub profile_id: String,
    /// In `[0, 1]`.
    pub confidence: f64,
    /// Tags the request signalled, in the profile's tag order.
    pub matched_tags: Vec<String>,
    /// A hint named this profile directly.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub forced: bool,
}

/// A profile selected for composition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActiveProfile {
    pub profile_id: String,
    pub confidence: f64,
}

/// Scores for every registered profile, plus the active subset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassificationResult {
    /// Every profile, in registry order.
    pub scores: Vec<ProfileScore>,
    /// Co-primary profiles, by confidence then registry order.
    pub active: Vec<ActiveProfile>,
}

impl ClassificationResult {
    pub fn confidence(&self, profile_id: &str) -> Option<f64> {
        self.scores
            .iter()
            .find(|s| s.profile_id == profile_id)
            .map(|s| s.confidence)
    }

    pub fn active_ids(&self) -> Vec<&str> {
        self.active.iter().map(|a| a.profile_id.as_str()).collect()
    }

    pub fn is_multi_profile(&self) -> bool {
        self.active.len() > 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use switchyard_core::{CollaborationContract, Profile};

    fn profile(id: &str, tags: &[&str]) -> Profile {
        Profile {
            id: id.into(),
            description: String::new(),
            tags: tags.iter().map(|t| t.to_string()).collect(),
            rankings: vec![],
            template: vec![],
            contract: CollaborationContract::default(),
        }
    }

    fn snapshot() -> ProfileSnapshot {
        vec![
            profile("backend", &["api", "database", "server"]),
            profile("frontend", &["ui", "component", "browser"]),
        ]
        .into_iter()
        .collect()
    }

    #[test]
    fn scores_are_matched_over_total() {
        let result = Classifier::default()
            .classify(&TaskRequest::new("design the user table and API"), &snapshot())
            .unwrap();
        assert!((result.confidence("backend").unwrap() - 1.0 / 3.0).abs() < 1e-9);
        assert_eq!(result.confidence("frontend"), Some(0.0));
        assert_eq!(result.active_ids(), vec!["backend"]);
        assert_eq!(result.scores[0].matched_tags, vec!["api"]);
    }

    #[test]
    fn classification_is_deterministic() {
        let classifier = Classifier::default();
        let request = TaskRequest::new("server side api with a browser ui");
        let a = classifier.classify(&request, &snapshot()).unwrap();
        let b = classifier.classify(&request, &snapshot()).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn disjoint_tags_favor_matching_profile() {
        let result = Classifier::default()
            .classify(&TaskRequest::new("database server tuning"), &snapshot())
            .unwrap();
        assert!(result.confidence("backend").unwrap() > result.confidence("frontend").unwrap());
        assert!(!result.is_multi_profile());
    }

    #[test]
    fn near_equal_scores_are_co_primary() {
        let result = Classifier::default()
            .classify(&TaskRequest::new("wire the api into the ui"), &snapshot())
            .unwrap();
        assert_eq!(result.active_ids(), vec!["backend", "frontend"]);
        assert!(result.is_multi_profile());
    }

    #[test]
    fn active_sorted_by_confidence() {
        let result = Classifier::new(0.1, 0.7)
            .classify(
                &TaskRequest::new("ui component for the api in a browser"),
                &snapshot(),
            )
            .unwrap();
        assert_eq!(result.active_ids(), vec!["frontend", "backend"]);
    }

    #[test]
    fn below_minimum_is_ambiguous() {
        let err = Classifier::new(0.5, 0.05)
            .classify(&TaskRequest::new("an api"), &snapshot())
            .unwrap_err();
        match err {
            Error::AmbiguousRequest {
                best_confidence,
                best_profile,
                ..
            } => {
                assert!(best_confidence < 0.5);
                assert_eq!(best_profile.as_deref(), Some("backend"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn no_signal_is_ambiguous_even_at_zero_minimum() {
        let err = Classifier::new(0.0, 0.05)
            .classify(&TaskRequest::new("write a haiku"), &snapshot())
            .unwrap_err();
        assert!(matches!(err, Error::AmbiguousRequest { best_profile: None, .. }));
    }

    #[test]
    fn empty_registry_is_ambiguous() {
        let err = Classifier::default()
            .classify(&TaskRequest::new("api"), &ProfileSnapshot::default())
            .unwrap_err();
        assert!(matches!(err, Error::AmbiguousRequest { .. }));
    }

    #[test]
    fn profile_hint_forces_full_confidence() {
        let request = TaskRequest::new("write a haiku").with_hint("frontend");
        let result = Classifier::default().classify(&request, &snapshot()).unwrap();
        assert_eq!(result.confidence("frontend"), Some(1.0));
        assert!(result.scores[1].forced);
        assert_eq!(result.active_ids(), vec!["frontend"]);
    }

    #[test]
    fn tag_hint_counts_as_match() {
        let request = TaskRequest::new("make it faster").with_hints(["database", "server"]);
        let result = Classifier::default().classify(&request, &snapshot()).unwrap();
        assert!((result.confidence("backend").unwrap() - 2.0 / 3.0).abs() < 1e-9);
    }
}
