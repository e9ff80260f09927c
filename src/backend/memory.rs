//! In-memory simulation of one AWS service.
//!
//! Resources come from the `backends` section of the configuration. Every resource has
//! a scripted sequence of native status tokens; each poll of a run returns the next
//! token and the run stays on the last one once the script is exhausted. Responses are
//! shaped like the service's own describe/start/get calls.
//!
//! Runs follow the tracker's retention and capacity: expired and overflowing runs are
//! dropped whenever a new run starts.

use std::{
    collections::HashMap,
    time::{Duration, Instant},
};

use async_trait::async_trait;
use dashmap::DashMap;
use log::{debug, info};
use serde_json::{json, Value as JsonValue};
use uuid::Uuid;

use crate::{
    collaborator_error,
    config,
    core::{BridgeResult, ExecutionStatus, Outcome, ServiceClient, ServiceRequest, StartedExecution},
    services::ServiceKind,
};

struct SimulatedRun {
    resource: String,
    polls: usize,
    started_at: Instant,
}

pub struct MemoryClient {
    service: ServiceKind,
    resources: HashMap<String, config::Resource>,
    runs: DashMap<String, SimulatedRun>,
    retention: Duration,
    capacity: usize,
}

impl MemoryClient {
    pub fn new(service: ServiceKind, resources: Vec<config::Resource>) -> Self {
        let limits = config::Tracker::default();
        Self {
            service,
            resources: resources
                .into_iter()
                .map(|resource| (resource.name.clone(), resource))
                .collect(),
            runs: DashMap::new(),
            retention: Duration::from_secs(limits.retention),
            capacity: limits.capacity,
        }
    }

    pub fn from_config(
        service: ServiceKind,
        backend: &config::Backend,
        limits: &config::Tracker,
    ) -> Self {
        Self::new(service, backend.resources.clone()).with_limits(
            Duration::from_secs(limits.retention),
            limits.capacity,
        )
    }

    pub fn with_limits(mut self, retention: Duration, capacity: usize) -> Self {
        self.retention = retention;
        self.capacity = capacity;
        self
    }

    /// Number of runs currently kept.
    pub fn active_runs(&self) -> usize {
        self.runs.len()
    }

    /// Drop runs older than the retention, then the oldest runs so that one more fits
    /// within the capacity.
    fn evict(&self) -> usize {
        let before = self.runs.len();
        self.runs
            .retain(|_, run| run.started_at.elapsed() <= self.retention);

        let overflow = (self.runs.len() + 1).saturating_sub(self.capacity);
        if overflow > 0 {
            let mut by_age: Vec<(String, Instant)> = self
                .runs
                .iter()
                .map(|entry| (entry.key().clone(), entry.value().started_at))
                .collect();
            by_age.sort_by_key(|(_, started_at)| *started_at);
            for (execution_id, _) in by_age.into_iter().take(overflow) {
                self.runs.remove(&execution_id);
            }
        }
        before.saturating_sub(self.runs.len())
    }

    fn resource(&self, request: &ServiceRequest) -> BridgeResult<&config::Resource> {
        self.resources.get(&request.name).ok_or_else(|| {
            collaborator_error!(
                "{} {} not found",
                self.service.display_name(),
                request.resource_arn
            )
        })
    }

    fn success_status(&self) -> &'static str {
        self.service
            .documented_statuses()
            .iter()
            .copied()
            .find(|status| self.service.normalize_status(status) == Outcome::Success)
            .unwrap_or("SUCCEEDED")
    }

    fn new_execution_id(&self, request: &ServiceRequest) -> String {
        let id = Uuid::new_v4();
        match self.service {
            ServiceKind::SageMakerPipelines => format!(
                "{}/execution/{}",
                request.resource_arn,
                &id.simple().to_string()[..12]
            ),
            ServiceKind::Glue => format!("jr_{}", id.simple()),
            ServiceKind::StepFunctions => format!(
                "arn:aws:states:{}:{}:execution:{}:{}",
                request.region, request.account_id, request.name, id
            ),
            ServiceKind::Lambda => id.to_string(),
        }
    }

    fn describe(&self, request: &ServiceRequest) -> JsonValue {
        match self.service {
            ServiceKind::SageMakerPipelines => json!({
                "PipelineArn": request.resource_arn,
                "PipelineName": request.name,
                "PipelineStatus": "Active",
            }),
            ServiceKind::Glue => json!({
                "Job": {"Name": request.name}
            }),
            ServiceKind::StepFunctions => json!({
                "name": request.name,
                "stateMachineArn": request.resource_arn,
                "status": "ACTIVE",
            }),
            ServiceKind::Lambda => json!({
                "Configuration": {
                    "FunctionArn": request.resource_arn,
                    "FunctionName": request.name,
                }
            }),
        }
    }

    fn started(&self, execution_id: &str) -> JsonValue {
        match self.service {
            ServiceKind::SageMakerPipelines => json!({"PipelineExecutionArn": execution_id}),
            ServiceKind::Glue => json!({"JobRunId": execution_id}),
            ServiceKind::StepFunctions => json!({"executionArn": execution_id}),
            ServiceKind::Lambda => json!({}),
        }
    }

    fn run_status(&self, execution_id: &str, status: &str) -> JsonValue {
        match self.service {
            ServiceKind::SageMakerPipelines => json!({
                "PipelineExecutionArn": execution_id,
                "PipelineExecutionStatus": status,
            }),
            ServiceKind::Glue => json!({
                "JobRun": {"Id": execution_id, "JobRunState": status}
            }),
            ServiceKind::StepFunctions => json!({
                "executionArn": execution_id,
                "status": status,
            }),
            ServiceKind::Lambda => json!({"Status": status}),
        }
    }
}

#[async_trait]
impl ServiceClient for MemoryClient {
    async fn existence_check(&self, request: &ServiceRequest) -> BridgeResult<JsonValue> {
        self.resource(request)?;
        Ok(self.describe(request))
    }

    async fn start(&self, request: &ServiceRequest) -> BridgeResult<StartedExecution> {
        let resource = self.resource(request)?;
        if resource.fail_start {
            return Err(collaborator_error!(
                "failed to start {} {}",
                self.service.display_name(),
                request.resource_arn
            ));
        }

        let evicted = self.evict();
        if evicted > 0 {
            debug!(
                "Dropped {} expired simulated {} runs",
                evicted,
                self.service.display_name()
            );
        }

        let execution_id = self.new_execution_id(request);
        self.runs.insert(
            execution_id.clone(),
            SimulatedRun {
                resource: resource.name.clone(),
                polls: 0,
                started_at: Instant::now(),
            },
        );
        info!(
            "Started simulated {} run {} ({} active)",
            self.service.display_name(),
            execution_id,
            self.active_runs()
        );

        Ok(StartedExecution {
            descriptor: self.started(&execution_id),
            execution_id,
        })
    }

    async fn poll(
        &self,
        _request: &ServiceRequest,
        execution_id: &str,
    ) -> BridgeResult<ExecutionStatus> {
        let mut run = self.runs.get_mut(execution_id).ok_or_else(|| {
            collaborator_error!(
                "{} execution {} not found",
                self.service.display_name(),
                execution_id
            )
        })?;

        let statuses = self
            .resources
            .get(&run.resource)
            .map(|resource| resource.statuses.as_slice())
            .unwrap_or_default();
        let status = match statuses.len() {
            0 => self.success_status().to_string(),
            len => statuses[run.polls.min(len - 1)].clone(),
        };
        run.polls += 1;
        debug!(
            "Simulated {} run {} is {}",
            self.service.display_name(),
            execution_id,
            status
        );

        Ok(ExecutionStatus {
            descriptor: self.run_status(execution_id, &status),
            status,
        })
    }

    async fn invoke(
        &self,
        request: &ServiceRequest,
        payload: &JsonValue,
    ) -> BridgeResult<JsonValue> {
        let resource = self.resource(request)?;
        if let Some(message) = &resource.invoke_error {
            return Err(collaborator_error!(
                "{} invocation failed: {}",
                self.service.display_name(),
                message
            ));
        }

        debug!(
            "Invoked simulated {} {} with {}",
            self.service.display_name(),
            request.resource_arn,
            payload
        );
        Ok(resource
            .result
            .clone()
            .unwrap_or_else(|| json!({"StatusCode": 202})))
    }
}
