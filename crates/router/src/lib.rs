//! # Switchyard Router
//!
//! Decides which specialist profiles apply to a request and merges their
//! guidance into one working context:
//!
//! 1. [`signals`] reduces the request to folded word tokens and hints.
//! 2. [`classifier`] scores every registered profile and picks the active set.
//! 3. [`resolver`] merges the active profiles' rankings per category.
//! 4. [`composer`] builds the merged template skeleton.
//!
//! [`RoutingPipeline`] runs all four against a registry snapshot. Nothing
//! here performs I/O or suspends.

pub mod classifier;
pub mod composer;
pub mod pipeline;
pub mod resolver;
pub mod signals;

pub use classifier::{ActiveProfile, ClassificationResult, Classifier, ProfileScore};
pub use composer::{Attribution, CompositionResult, SectionSlot, SlotContent, compose};
pub use pipeline::{Routed, RoutingPipeline};
pub use resolver::{
    Contributor, DecidedBy, OptionTally, RankSumPolicy, Resolution, ResolutionPolicy,
    ResolvedPreference, Resolver,
};
