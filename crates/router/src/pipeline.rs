//! The synchronous classify, resolve, compose pipeline.

use serde::{Deserialize, Serialize};
use tracing::info;

use switchyard_config::AppConfig;
use switchyard_core::{Result, TaskRequest};
use switchyard_profiles::ProfileSnapshot;

use crate::classifier::{ClassificationResult, Classifier};
use crate::composer::{CompositionResult, compose};
use crate::resolver::Resolver;

/// Classification and composition of one request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Routed {
    pub classification: ClassificationResult,
    pub composition: CompositionResult,
}

/// Classifier plus resolver. Holds no per-task state, so one instance
/// serves any number of concurrent requests.
#[derive(Debug, Default)]
pub struct RoutingPipeline {
    classifier: Classifier,
    resolver: Resolver,
}

impl RoutingPipeline {
    pub fn new(classifier: Classifier, resolver: Resolver) -> Self {
        Self {
            classifier,
            resolver,
        }
    }

    pub fn from_config(config: &AppConfig) -> Result<Self> {
        Ok(Self::new(
            Classifier::from_config(&config.classifier),
            Resolver::from_config(&config.resolver)?,
        ))
    }

    /// Run the whole pipeline against one registry snapshot.
    pub fn route(&self, request: &TaskRequest, profiles: &ProfileSnapshot) -> Result<Routed> {
        let classification = self.classifier.classify(request, profiles)?;
        let preferences = self
            .resolver
            .resolve_all(&classification.active, profiles)?;
        let composition = compose(&classification, &preferences, profiles)?;

        info!(
            active = ?classification.active_ids(),
            sections = composition.sections.len(),
            conflicts = composition.conflicts().len(),
            "Routed request"
        );
        Ok(Routed {
            classification,
            composition,
        })
    }
}
