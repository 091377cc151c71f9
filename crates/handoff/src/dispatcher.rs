//! Task dispatch: submission, query and per-task handoff transitions.
//!
//! The dispatcher owns one record per submitted task. Routing runs against a
//! registry snapshot taken at submission. Each record has a transition gate
//! taken with `try_lock`, so a concurrent transition on the same task fails
//! fast with `StaleTransition`; readers only lock the record's progress and
//! never trip the gate.
//!
//! Closed and cancelled tasks are retained up to a limit, after which the
//! oldest finished task is evicted and reports `NotFound`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, RwLock, TryLockError};
use tracing::{debug, info, warn};

use switchyard_config::AppConfig;
use switchyard_core::{DomainEvent, Error, EventBus, Result, TaskId, TaskRequest};
use switchyard_profiles::ProfileRegistry;
use switchyard_router::{
    ClassificationResult, CompositionResult, Resolution, Routed, RoutingPipeline,
};

use crate::contract::ContractStatus;
use crate::coordinator::{Advance, HandoffState};
use crate::phase::Phase;

/// Finished tasks kept queryable before the oldest are evicted.
pub const MAX_FINISHED_TASKS: usize = 1_000;

/// Lifecycle of a task record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Open,
    Closed,
    Cancelled,
}

/// A condition the caller needs to act on.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Condition {
    ContractUnsatisfied { missing: Vec<String> },
    Conflict { category: String, candidates: Vec<String> },
}

/// What `submit` and `rework` return.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Submission {
    pub task_id: TaskId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub supersedes: Option<TaskId>,
    pub classification: ClassificationResult,
    pub composition: CompositionResult,
    /// Present only when more than one profile is active.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub handoff: Option<HandoffState>,
}

/// A point-in-time view of one task.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskSnapshot {
    pub task_id: TaskId,
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub supersedes: Option<TaskId>,
    pub submitted_at: DateTime<Utc>,
    pub status: TaskStatus,
    pub phase: Phase,
    pub version: u64,
    pub active_profiles: Vec<String>,
    /// Present while a multi-profile task is open.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub handoff: Option<HandoffState>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub conditions: Vec<Condition>,
}

/// Mutable part of a task record.
#[derive(Debug)]
struct Progress {
    status: TaskStatus,
    phase: Phase,
    version: u64,
    /// Dropped once the task closes or is cancelled.
    state: Option<HandoffState>,
}

#[derive(Debug)]
struct TaskRecord {
    id: TaskId,
    request: TaskRequest,
    routed: Routed,
    submitted_at: DateTime<Utc>,
    /// Held for the whole of a transition.
    transition: Mutex<()>,
    progress: Mutex<Progress>,
    /// Last committed `Progress::version`, readable while a transition holds
    /// the gate.
    version: AtomicU64,
}

impl TaskRecord {
    fn commit(&self, progress: &Progress) {
        self.version.store(progress.version, Ordering::Release);
    }
}

#[derive(Debug, Default)]
struct TaskTable {
    order: Vec<TaskId>,
    records: HashMap<TaskId, Arc<TaskRecord>>,
    /// Closed or cancelled, oldest first.
    finished: VecDeque<TaskId>,
}

/// Entry point for task submission and the handoff coordinator.
pub struct Dispatcher {
    registry: Arc<ProfileRegistry>,
    pipeline: RoutingPipeline,
    events: Arc<EventBus>,
    tasks: RwLock<TaskTable>,
    retention: usize,
}

impl Dispatcher {
    pub fn new(
        registry: Arc<ProfileRegistry>,
        pipeline: RoutingPipeline,
        events: Arc<EventBus>,
    ) -> Self {
        Self {
            registry,
            pipeline,
            events,
            tasks: RwLock::new(TaskTable::default()),
            retention: MAX_FINISHED_TASKS,
        }
    }

    /// Keep at most `limit` finished tasks queryable.
    pub fn with_retention(mut self, limit: usize) -> Self {
        self.retention = limit;
        self
    }

    /// Build the registry and pipeline from configuration.
    pub fn from_config(config: &AppConfig) -> Result<Self> {
        let registry = switchyard_profiles::from_config(config)?;
        let pipeline = RoutingPipeline::from_config(config)?;
        Ok(Self::new(
            Arc::new(registry),
            pipeline,
            Arc::new(EventBus::default()),
        ))
    }

    pub fn registry(&self) -> &Arc<ProfileRegistry> {
        &self.registry
    }

    pub fn events(&self) -> &Arc<EventBus> {
        &self.events
    }

    /// Classify, resolve and compose a request, then open its handoff.
    ///
    /// A request that supersedes another task must name a known task.
    pub fn submit(&self, request: TaskRequest) -> Result<Submission> {
        if let Some(prior) = request.supersedes() {
            self.record(prior)?;
        }

        let snapshot = self.registry.all();
        let routed = self.pipeline.route(&request, &snapshot)?;

        let participants = routed
            .composition
            .profiles
            .iter()
            .map(|active| {
                snapshot
                    .get(&active.profile_id)
                    .map(|p| ContractStatus::new(&p.id, &p.contract))
                    .ok_or_else(|| Error::profile_not_found(&active.profile_id))
            })
            .collect::<Result<Vec<_>>>()?;

        let id = TaskId::new();
        let state = HandoffState::new(id.clone(), participants);
        let handoff = state.is_multi_profile().then(|| state.clone());

        let record = Arc::new(TaskRecord {
            id: id.clone(),
            request: request.clone(),
            routed: routed.clone(),
            submitted_at: Utc::now(),
            transition: Mutex::new(()),
            progress: Mutex::new(Progress {
                status: TaskStatus::Open,
                phase: state.phase,
                version: state.version,
                state: Some(state),
            }),
            version: AtomicU64::new(0),
        });
        {
            let mut tasks = self.tasks.write().unwrap_or_else(|e| e.into_inner());
            tasks.order.push(id.clone());
            tasks.records.insert(id.clone(), record);
        }

        let active: Vec<String> = routed
            .composition
            .profile_ids()
            .into_iter()
            .map(String::from)
            .collect();
        info!(
            task_id = %id,
            active = ?active,
            supersedes = ?request.supersedes(),
            "Task submitted"
        );
        self.events.publish(DomainEvent::TaskSubmitted {
            task_id: id.to_string(),
            active_profiles: active,
            timestamp: Utc::now(),
        });
        for conflict in routed.composition.conflicts() {
            let candidates = match &conflict.resolution {
                Resolution::Conflict { candidates } => candidates.clone(),
                _ => Vec::new(),
            };
            warn!(
                task_id = %id,
                category = %conflict.category,
                candidates = ?candidates,
                "Preference conflict"
            );
            self.events.publish(DomainEvent::PreferenceConflict {
                task_id: id.to_string(),
                category: conflict.category.clone(),
                candidates,
                timestamp: Utc::now(),
            });
        }

        Ok(Submission {
            task_id: id,
            supersedes: request.supersedes().cloned(),
            classification: routed.classification,
            composition: routed.composition,
            handoff,
        })
    }

    /// Start a new task that reworks `prior`. The prior task is untouched.
    /// Without a new description the prior request's description and hints
    /// are reused.
    pub fn rework(&self, prior: &TaskId, description: Option<String>) -> Result<Submission> {
        let record = self.record(prior)?;
        let request = match description {
            Some(description) => TaskRequest::new(description),
            None => TaskRequest::new(record.request.description())
                .with_hints(record.request.hints().iter().cloned()),
        }
        .superseding(prior.clone());
        self.submit(request)
    }

    /// Current view of a task.
    pub fn query(&self, id: &TaskId) -> Result<TaskSnapshot> {
        let record = self.record(id)?;
        let progress = record.progress.lock().unwrap_or_else(|e| e.into_inner());
        Ok(snapshot_of(&record, &progress))
    }

    /// Every task, in submission order.
    pub fn list(&self) -> Vec<TaskSnapshot> {
        let records: Vec<Arc<TaskRecord>> = {
            let tasks = self.tasks.read().unwrap_or_else(|e| e.into_inner());
            tasks
                .order
                .iter()
                .filter_map(|id| tasks.records.get(id).cloned())
                .collect()
        };
        records
            .iter()
            .map(|record| {
                let progress = record.progress.lock().unwrap_or_else(|e| e.into_inner());
                snapshot_of(record, &progress)
            })
            .collect()
    }

    /// Move a task one phase forward.
    ///
    /// With `expected_version`, the call fails with `StaleTransition` unless
    /// the task is still at that version. A transition already in flight on
    /// the same task also fails with `StaleTransition`.
    pub fn advance(&self, id: &TaskId, expected_version: Option<u64>) -> Result<Advance> {
        let record = self.record(id)?;
        let _gate = begin_transition(&record, expected_version)?;
        let mut progress = record.progress.lock().unwrap_or_else(|e| e.into_inner());
        check_version(&record.id, &progress, expected_version)?;

        let Some(state) = progress.state.as_mut() else {
            return Err(Error::StaleTransition {
                task_id: id.to_string(),
                expected: expected_version.unwrap_or(progress.version),
                actual: progress.version,
            });
        };

        let outcome = state.advance()?;
        let (phase, version) = (state.phase, state.version);
        progress.phase = phase;
        progress.version = version;
        record.commit(&progress);

        match &outcome {
            Advance::Moved {
                from,
                to,
                version,
                unsatisfied,
            } => {
                self.events.publish(DomainEvent::PhaseChanged {
                    task_id: id.to_string(),
                    from: from.to_string(),
                    to: to.to_string(),
                    version: *version,
                    timestamp: Utc::now(),
                });
                if let Some(missing) = unsatisfied {
                    self.publish_unsatisfied(id, missing);
                }
                if to.is_terminal() {
                    progress.status = TaskStatus::Closed;
                    progress.state = None;
                    info!(task_id = %id, "Task closed");
                    self.events.publish(DomainEvent::TaskClosed {
                        task_id: id.to_string(),
                        timestamp: Utc::now(),
                    });
                }
            }
            Advance::Parked { missing, .. } => self.publish_unsatisfied(id, missing),
        }
        let closed = progress.status == TaskStatus::Closed;
        drop(progress);
        if closed {
            self.retire(id);
        }
        Ok(outcome)
    }

    /// Provide contract items from outside the task. Returns the task's
    /// snapshot after the update.
    pub fn supply(&self, id: &TaskId, items: &[String]) -> Result<TaskSnapshot> {
        let record = self.record(id)?;
        let _gate = begin_transition(&record, None)?;
        let mut progress = record.progress.lock().unwrap_or_else(|e| e.into_inner());

        let Some(state) = progress.state.as_mut() else {
            return Err(Error::StaleTransition {
                task_id: id.to_string(),
                expected: progress.version,
                actual: progress.version,
            });
        };
        if items.iter().all(|item| item.trim().is_empty()) {
            return Err(Error::validation(id.to_string(), "no contract items supplied"));
        }

        state.supply(items);
        let version = state.version;
        progress.version = version;
        record.commit(&progress);
        Ok(snapshot_of(&record, &progress))
    }

    /// Discard a task's handoff state. The task stays queryable as cancelled.
    pub fn cancel(&self, id: &TaskId) -> Result<TaskSnapshot> {
        let record = self.record(id)?;
        let _gate = begin_transition(&record, None)?;
        let mut progress = record.progress.lock().unwrap_or_else(|e| e.into_inner());
        if progress.status != TaskStatus::Open {
            return Err(Error::StaleTransition {
                task_id: id.to_string(),
                expected: progress.version,
                actual: progress.version,
            });
        }

        progress.status = TaskStatus::Cancelled;
        progress.state = None;
        progress.version += 1;
        record.commit(&progress);
        info!(task_id = %id, phase = %progress.phase, "Task cancelled");
        self.events.publish(DomainEvent::TaskCancelled {
            task_id: id.to_string(),
            timestamp: Utc::now(),
        });
        let snapshot = snapshot_of(&record, &progress);
        drop(progress);
        self.retire(id);
        Ok(snapshot)
    }

    pub fn len(&self) -> usize {
        self.tasks
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .order
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn record(&self, id: &TaskId) -> Result<Arc<TaskRecord>> {
        self.tasks
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .records
            .get(id)
            .cloned()
            .ok_or_else(|| Error::task_not_found(id.as_str()))
    }

    /// Mark a task finished and evict the oldest beyond the retention limit.
    fn retire(&self, id: &TaskId) {
        let mut tasks = self.tasks.write().unwrap_or_else(|e| e.into_inner());
        tasks.finished.push_back(id.clone());
        while tasks.finished.len() > self.retention {
            let Some(oldest) = tasks.finished.pop_front() else {
                break;
            };
            tasks.records.remove(&oldest);
            tasks.order.retain(|t| t != &oldest);
            debug!(task_id = %oldest, "Evicted finished task");
        }
    }

    fn publish_unsatisfied(&self, id: &TaskId, missing: &[String]) {
        self.events.publish(DomainEvent::ContractUnsatisfied {
            task_id: id.to_string(),
            missing: missing.to_vec(),
            timestamp: Utc::now(),
        });
    }
}

fn begin_transition(
    record: &TaskRecord,
    expected_version: Option<u64>,
) -> Result<MutexGuard<'_, ()>> {
    match record.transition.try_lock() {
        Ok(guard) => Ok(guard),
        Err(TryLockError::Poisoned(e)) => Ok(e.into_inner()),
        Err(TryLockError::WouldBlock) => {
            let actual = record.version.load(Ordering::Acquire);
            warn!(task_id = %record.id, version = actual, "Concurrent transition rejected");
            Err(Error::StaleTransition {
                task_id: record.id.to_string(),
                expected: expected_version.unwrap_or(actual),
                actual,
            })
        }
    }
}

fn check_version(id: &TaskId, progress: &Progress, expected: Option<u64>) -> Result<()> {
    match expected {
        Some(expected) if expected != progress.version => Err(Error::StaleTransition {
            task_id: id.to_string(),
            expected,
            actual: progress.version,
        }),
        _ => Ok(()),
    }
}

fn snapshot_of(record: &TaskRecord, progress: &Progress) -> TaskSnapshot {
    let composition = &record.routed.composition;
    let mut conditions: Vec<Condition> = composition
        .conflicts()
        .into_iter()
        .filter_map(|pref| match &pref.resolution {
            Resolution::Conflict { candidates } => Some(Condition::Conflict {
                category: pref.category.clone(),
                candidates: candidates.clone(),
            }),
            _ => None,
        })
        .collect();

    if let Some(state) = progress.state.as_ref().filter(|s| s.is_parked()) {
        conditions.insert(
            0,
            Condition::ContractUnsatisfied {
                missing: state.unsatisfied(),
            },
        );
    }

    TaskSnapshot {
        task_id: record.id.clone(),
        description: record.request.description().to_string(),
        supersedes: record.request.supersedes().cloned(),
        submitted_at: record.submitted_at,
        status: progress.status,
        phase: progress.phase,
        version: progress.version,
        active_profiles: composition
            .profile_ids()
            .into_iter()
            .map(String::from)
            .collect(),
        handoff: progress
            .state
            .as_ref()
            .filter(|s| s.is_multi_profile())
            .cloned(),
        conditions,
    }
}
