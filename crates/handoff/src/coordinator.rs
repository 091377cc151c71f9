//! The per-task handoff state machine.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use switchyard_core::{Error, Result, TaskId, normalize_key};

use crate::contract::{self, ContractStatus};
use crate::phase::Phase;

/// One completed transition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhaseTransition {
    pub from: Phase,
    pub to: Phase,
    pub version: u64,
    pub at: DateTime<Utc>,
}

/// Current phase plus each participant's contract fulfilment.
///
/// `version` increases on every mutation; callers pass the version they
/// read to detect that someone else moved the task first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HandoffState {
    pub task_id: TaskId,
    pub phase: Phase,
    pub version: u64,
    pub participants: Vec<ContractStatus>,
    /// Contract items provided from outside the task.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub supplied: Vec<String>,
    #[serde(default)]
    pub history: Vec<PhaseTransition>,
}

/// Result of one `advance` call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum Advance {
    /// The task moved forward. `unsatisfied` is set when the task just
    /// entered `Collaboration` with open requirements.
    Moved {
        from: Phase,
        to: Phase,
        version: u64,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        unsatisfied: Option<Vec<String>>,
    },
    /// The task stays in `Collaboration` until these items are provided.
    Parked { phase: Phase, missing: Vec<String> },
}

impl HandoffState {
    /// Start a task at `Intake`. One participant means a single-profile
    /// task; two or more route through `Collaboration`.
    pub fn new(task_id: TaskId, mut participants: Vec<ContractStatus>) -> Self {
        contract::evaluate(&mut participants, &[]);
        Self {
            task_id,
            phase: Phase::Intake,
            version: 0,
            participants,
            supplied: Vec::new(),
            history: Vec::new(),
        }
    }

    pub fn is_multi_profile(&self) -> bool {
        self.participants.len() > 1
    }

    pub fn next_phase(&self) -> Option<Phase> {
        self.phase.next(self.is_multi_profile())
    }

    /// Requirements still open across all participants.
    pub fn unsatisfied(&self) -> Vec<String> {
        contract::missing_items(&self.participants)
    }

    /// Whether the task is parked on its contracts right now.
    pub fn is_parked(&self) -> bool {
        self.phase == Phase::Collaboration && !self.unsatisfied().is_empty()
    }

    /// Move one phase forward.
    ///
    /// Leaving `Collaboration` with open requirements does not move the task
    /// and is reported as `Advance::Parked`. Advancing a closed task fails
    /// with `StaleTransition`.
    pub fn advance(&mut self) -> Result<Advance> {
        let Some(next) = self.next_phase() else {
            return Err(Error::StaleTransition {
                task_id: self.task_id.to_string(),
                expected: self.version,
                actual: self.version,
            });
        };

        if self.phase == Phase::Collaboration {
            let missing = self.unsatisfied();
            if !missing.is_empty() {
                warn!(
                    task_id = %self.task_id,
                    missing = ?missing,
                    "Collaboration parked on unsatisfied contract"
                );
                return Ok(Advance::Parked {
                    phase: self.phase,
                    missing,
                });
            }
        }

        let from = self.phase;
        self.phase = next;
        self.version += 1;
        self.history.push(PhaseTransition {
            from,
            to: next,
            version: self.version,
            at: Utc::now(),
        });
        info!(task_id = %self.task_id, %from, to = %next, version = self.version, "Phase changed");

        let unsatisfied = (next == Phase::Collaboration)
            .then(|| self.unsatisfied())
            .filter(|missing| !missing.is_empty());
        Ok(Advance::Moved {
            from,
            to: next,
            version: self.version,
            unsatisfied,
        })
    }

    /// Record contract items provided from outside the task. Returns the
    /// items that were not already supplied.
    pub fn supply(&mut self, items: &[String]) -> Vec<String> {
        let mut added = Vec::new();
        for item in items {
            let key = normalize_key(item);
            if key.is_empty() || self.supplied.iter().any(|s| normalize_key(s) == key) {
                continue;
            }
            self.supplied.push(item.trim().to_string());
            added.push(item.trim().to_string());
        }
        if !added.is_empty() {
            contract::evaluate(&mut self.participants, &self.supplied);
            self.version += 1;
            info!(
                task_id = %self.task_id,
                items = ?added,
                version = self.version,
                "Contract items supplied"
            );
        }
        added
    }
}
