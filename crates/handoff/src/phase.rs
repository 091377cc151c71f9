//! Handoff phases.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A task's position in the delivery workflow. Transitions only move
/// forward, one phase at a time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Intake,
    Analysis,
    Design,
    /// Only visited by multi-profile tasks; gates `Implementation` on the
    /// participants' collaboration contracts.
    Collaboration,
    Implementation,
    Delivery,
    Closed,
}

const MULTI_PROFILE: [Phase; 7] = [
    Phase::Intake,
    Phase::Analysis,
    Phase::Design,
    Phase::Collaboration,
    Phase::Implementation,
    Phase::Delivery,
    Phase::Closed,
];

const SINGLE_PROFILE: [Phase; 6] = [
    Phase::Intake,
    Phase::Analysis,
    Phase::Design,
    Phase::Implementation,
    Phase::Delivery,
    Phase::Closed,
];

impl Phase {
    /// Every phase a task with this many profiles passes through, in order.
    pub fn sequence(multi_profile: bool) -> &'static [Phase] {
        if multi_profile {
            &MULTI_PROFILE
        } else {
            &SINGLE_PROFILE
        }
    }

    /// The phase after this one, or `None` at `Closed`.
    pub fn next(self, multi_profile: bool) -> Option<Phase> {
        let sequence = Self::sequence(multi_profile);
        sequence
            .iter()
            .position(|p| *p == self)
            .and_then(|i| sequence.get(i + 1))
            .copied()
    }

    pub fn is_terminal(self) -> bool {
        self == Phase::Closed
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Phase::Intake => "intake",
            Phase::Analysis => "analysis",
            Phase::Design => "design",
            Phase::Collaboration => "collaboration",
            Phase::Implementation => "implementation",
            Phase::Delivery => "delivery",
            Phase::Closed => "closed",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Phase {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        MULTI_PROFILE
            .iter()
            .copied()
            .find(|p| p.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("unknown phase '{s}'"))
    }
}
