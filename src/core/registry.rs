//! Execution tracker
//!
//! Maps a workflow-run identifier to the remote execution that workflow started. The map
//! is shared by every request handler; records are replaced as whole units so no finer
//! locking than the map's own shards is needed.

use std::{
    sync::Arc,
    time::{Duration, Instant},
};

use dashmap::DashMap;
use log::{debug, info};
use tokio::sync::{watch, Mutex, OwnedMutexGuard};

use crate::services::{lambda, ServiceKind};

/// Status of an asynchronous invocation as published by the invocation runner.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvocationStatus {
    Running,
    Succeeded,
    Failed,
}

impl InvocationStatus {
    /// Native token, normalized through the owning service's status table.
    pub fn as_str(&self) -> &'static str {
        match self {
            InvocationStatus::Running => lambda::STATUS_RUNNING,
            InvocationStatus::Succeeded => lambda::STATUS_SUCCEEDED,
            InvocationStatus::Failed => lambda::STATUS_FAILED,
        }
    }
}

/// Consistent snapshot of an invocation's status and message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvocationState {
    pub status: InvocationStatus,
    pub message: String,
}

/// Write side of an invocation record. Owned by the runner, consumed on publish so a
/// record receives exactly one terminal update.
#[derive(Debug)]
pub struct InvocationPublisher {
    sender: watch::Sender<InvocationState>,
}

impl InvocationPublisher {
    pub fn publish(self, status: InvocationStatus, message: String) {
        // send_replace stores the value even when the record was already evicted
        self.sender.send_replace(InvocationState { status, message });
    }
}

/// What the workflow started remotely.
#[derive(Debug)]
pub struct ExecutionRecord {
    service: ServiceKind,
    resource_arn: String,
    execution_id: String,
    created_at: Instant,
    invocation: Option<watch::Receiver<InvocationState>>,
}

impl ExecutionRecord {
    /// Record for a poll-style run identified by the service's execution id.
    pub fn started(service: ServiceKind, resource_arn: String, execution_id: String) -> Self {
        Self {
            service,
            resource_arn,
            execution_id,
            created_at: Instant::now(),
            invocation: None,
        }
    }

    /// Record for an asynchronous invocation, initially running.
    pub fn invocation(
        service: ServiceKind,
        resource_arn: String,
        execution_id: String,
        message: String,
    ) -> (Self, InvocationPublisher) {
        let (sender, receiver) = watch::channel(InvocationState {
            status: InvocationStatus::Running,
            message,
        });
        let record = Self {
            service,
            resource_arn,
            execution_id,
            created_at: Instant::now(),
            invocation: Some(receiver),
        };
        (record, InvocationPublisher { sender })
    }

    pub fn service(&self) -> ServiceKind {
        self.service
    }

    pub fn resource_arn(&self) -> &str {
        &self.resource_arn
    }

    pub fn execution_id(&self) -> &str {
        &self.execution_id
    }

    pub fn age(&self) -> Duration {
        self.created_at.elapsed()
    }

    /// Current invocation state, `None` for poll-style records.
    pub fn invocation_state(&self) -> Option<InvocationState> {
        self.invocation
            .as_ref()
            .map(|receiver| receiver.borrow().clone())
    }
}

/// Exclusive right to start an execution for one workflow. Released on drop.
pub struct StartGuard<'a> {
    tracker: &'a ExecutionTracker,
    workflow_id: String,
    guard: Option<OwnedMutexGuard<()>>,
}

impl Drop for StartGuard<'_> {
    fn drop(&mut self) {
        drop(self.guard.take());
        // Only the map still holds the lock when nobody else is waiting on it
        self.tracker
            .starting
            .remove_if(&self.workflow_id, |_, lock| Arc::strong_count(lock) == 1);
    }
}

/// Registry of executions started per workflow run.
pub struct ExecutionTracker {
    records: DashMap<String, Arc<ExecutionRecord>>,
    starting: DashMap<String, Arc<Mutex<()>>>,
}

impl Default for ExecutionTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl ExecutionTracker {
    pub fn new() -> Self {
        Self {
            records: DashMap::new(),
            starting: DashMap::new(),
        }
    }

    /// Get the record of a workflow run, if one is tracked
    pub fn get(&self, workflow_id: &str) -> Option<Arc<ExecutionRecord>> {
        self.records
            .get(workflow_id)
            .map(|entry| entry.value().clone())
    }

    /// Insert or replace the record of a workflow run
    pub fn put(&self, workflow_id: String, record: Arc<ExecutionRecord>) {
        debug!(
            "Tracking execution {} for workflow {}",
            record.execution_id(),
            workflow_id
        );
        self.records.insert(workflow_id, record);
    }

    /// Wait for the exclusive right to start an execution for `workflow_id`.
    ///
    /// Callers must re-check [`get`](Self::get) after acquiring the guard: a concurrent
    /// holder may have recorded an execution in the meantime.
    pub async fn lock_start(&self, workflow_id: &str) -> StartGuard<'_> {
        let lock = self
            .starting
            .entry(workflow_id.to_string())
            .or_default()
            .value()
            .clone();
        let guard = lock.lock_owned().await;
        StartGuard {
            tracker: self,
            workflow_id: workflow_id.to_string(),
            guard: Some(guard),
        }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Drop records older than `retention`, then the oldest records beyond `capacity`.
    ///
    /// Returns the number of evicted records.
    pub fn evict(&self, retention: Duration, capacity: usize) -> usize {
        let before = self.records.len();
        self.records.retain(|_, record| record.age() <= retention);

        let overflow = self.records.len().saturating_sub(capacity);
        if overflow > 0 {
            let mut by_age: Vec<(String, Instant)> = self
                .records
                .iter()
                .map(|entry| (entry.key().clone(), entry.value().created_at))
                .collect();
            by_age.sort_by_key(|(_, created_at)| *created_at);
            for (workflow_id, _) in by_age.into_iter().take(overflow) {
                self.records.remove(&workflow_id);
            }
        }

        let evicted = before.saturating_sub(self.records.len());
        if evicted > 0 {
            info!(
                "Evicted {} tracked executions, {} remaining",
                evicted,
                self.records.len()
            );
        }
        evicted
    }
}
