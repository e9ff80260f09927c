//! Service dispatcher
//!
//! Routes a validated request to existence check, start or poll. The tracker decides
//! between start and poll: the first `execute` of a workflow run starts the remote
//! execution, every later one checks it.

use std::{sync::Arc, time::Duration};

use log::{debug, error, info, warn};
use serde_json::Value as JsonValue;
use uuid::Uuid;

use crate::{
    backend::Backends,
    collaborator_error, config,
    core::{
        Action, BridgeResult, ErrorContext, ExecutionRecord, ExecutionTracker, Outcome,
        PluginResponse, ServiceRequest,
    },
    service::metrics,
    services::{ExecutionStyle, ServiceKind},
    validation_error,
};

use super::{invoker, mock};

/// Requeue intervals handed back with running outcomes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequeuePolicy {
    /// Poll-style services and mocked running requests.
    pub poll: Duration,
    /// Asynchronous invocations.
    pub invoke: Duration,
}

impl Default for RequeuePolicy {
    fn default() -> Self {
        Self {
            poll: Duration::from_secs(60),
            invoke: Duration::from_secs(5),
        }
    }
}

impl From<&config::Requeue> for RequeuePolicy {
    fn from(requeue: &config::Requeue) -> Self {
        Self {
            poll: requeue.poll_interval(),
            invoke: requeue.invoke_interval(),
        }
    }
}

pub struct Dispatcher {
    backends: Backends,
    tracker: Arc<ExecutionTracker>,
    requeue: RequeuePolicy,
}

impl Dispatcher {
    pub fn new(backends: Backends, tracker: Arc<ExecutionTracker>, requeue: RequeuePolicy) -> Self {
        Self {
            backends,
            tracker,
            requeue,
        }
    }

    pub fn tracker(&self) -> &Arc<ExecutionTracker> {
        &self.tracker
    }

    pub fn requeue(&self) -> RequeuePolicy {
        self.requeue
    }

    pub async fn dispatch(&self, workflow_id: &str, request: &ServiceRequest) -> PluginResponse {
        if let Some(state) = request.mock {
            debug!(
                "Mocked {} {} for workflow {}",
                request.action, request.resource_arn, workflow_id
            );
            return mock::respond(state, self.requeue.poll);
        }

        match request.action {
            Action::Validate => self.validate(request).await,
            Action::Execute => self.execute(workflow_id, request).await,
        }
    }

    async fn validate(&self, request: &ServiceRequest) -> PluginResponse {
        let display_name = request.service.display_name();
        let client = self.backends.client(request.service);

        let descriptor = match client.existence_check(request).await {
            Ok(descriptor) => descriptor,
            Err(e) => {
                warn!("Failed to describe {} {}: {}", display_name, request.resource_arn, e);
                return PluginResponse::failed(e);
            }
        };

        match pack(&descriptor, display_name, "check") {
            Ok(message) => PluginResponse::success(message),
            Err(e) => PluginResponse::failed(e),
        }
    }

    async fn execute(&self, workflow_id: &str, request: &ServiceRequest) -> PluginResponse {
        // The uid keys the tracker record
        if workflow_id.trim().is_empty() {
            warn!("Refusing to execute {} without a workflow uid", request.resource_arn);
            return PluginResponse::failed(validation_error!("workflow uid is empty"));
        }

        if let Some(record) = self.tracked(workflow_id, request) {
            return self.check(request, &record).await;
        }

        // At most one start per workflow run; re-check once the guard is held
        let _guard = self.tracker.lock_start(workflow_id).await;
        if let Some(record) = self.tracked(workflow_id, request) {
            return self.check(request, &record).await;
        }

        match request.service.execution_style() {
            ExecutionStyle::Poll => self.start(workflow_id, request).await,
            ExecutionStyle::Invoke => self.start_invocation(workflow_id, request),
        }
    }

    /// Record of the workflow run, if it belongs to the requested resource.
    fn tracked(&self, workflow_id: &str, request: &ServiceRequest) -> Option<Arc<ExecutionRecord>> {
        let record = self.tracker.get(workflow_id)?;
        if record.service() == request.service && record.resource_arn() == request.resource_arn {
            return Some(record);
        }
        warn!(
            "Workflow {} tracks {} execution {} of {}, starting a new one for {}",
            workflow_id,
            record.service(),
            record.execution_id(),
            record.resource_arn(),
            request.resource_arn
        );
        None
    }

    async fn start(&self, workflow_id: &str, request: &ServiceRequest) -> PluginResponse {
        let display_name = request.service.display_name();
        let client = self.backends.client(request.service);

        let started = match client.start(request).await {
            Ok(started) => started,
            Err(e) => {
                error!("Failed to start {} {}: {}", display_name, request.resource_arn, e);
                return PluginResponse::failed(e);
            }
        };

        if started.execution_id.is_empty() {
            return PluginResponse::failed(collaborator_error!(
                "{} start response has no execution id",
                display_name
            ));
        }

        let message = match pack(&started.descriptor, display_name, "start") {
            Ok(message) => message,
            Err(e) => return PluginResponse::failed(e),
        };

        info!(
            "Started {} execution {} for workflow {}",
            display_name, started.execution_id, workflow_id
        );
        self.record(
            workflow_id,
            ExecutionRecord::started(
                request.service,
                request.resource_arn.clone(),
                started.execution_id,
            ),
        );

        PluginResponse::running(message, Some(self.requeue.poll))
    }

    fn start_invocation(&self, workflow_id: &str, request: &ServiceRequest) -> PluginResponse {
        let display_name = request.service.display_name();
        let execution_id = Uuid::new_v4().to_string();
        let (record, publisher) = ExecutionRecord::invocation(
            request.service,
            request.resource_arn.clone(),
            execution_id.clone(),
            format!("running {display_name} async execution"),
        );
        self.record(workflow_id, record);

        invoker::spawn(
            self.backends.client(request.service),
            request.clone(),
            publisher,
        );
        info!(
            "Started {} async execution {} for workflow {}",
            display_name, execution_id, workflow_id
        );

        PluginResponse::running(
            format!("started {display_name} async execution"),
            Some(self.requeue.invoke),
        )
    }

    async fn check(&self, request: &ServiceRequest, record: &ExecutionRecord) -> PluginResponse {
        let service = record.service();
        let display_name = service.display_name();

        if let Some(state) = record.invocation_state() {
            debug!(
                "Checking {} async execution {}: {}",
                display_name,
                record.execution_id(),
                state.status.as_str()
            );
            return respond(
                service,
                state.status.as_str(),
                state.message,
                self.requeue.invoke,
            );
        }

        let client = self.backends.client(service);
        let status = match client.poll(request, record.execution_id()).await {
            Ok(status) => status,
            Err(e) => {
                warn!(
                    "Failed to check {} execution {}: {}",
                    display_name,
                    record.execution_id(),
                    e
                );
                return PluginResponse::failed(e);
            }
        };

        info!(
            "Checked {} execution {}: {}",
            display_name,
            record.execution_id(),
            status.status
        );
        match pack(&status.descriptor, display_name, "execution") {
            Ok(message) => respond(service, &status.status, message, self.requeue.poll),
            Err(e) => PluginResponse::failed(e),
        }
    }

    fn record(&self, workflow_id: &str, record: ExecutionRecord) {
        self.tracker.put(workflow_id.to_string(), Arc::new(record));
        metrics::set_tracked_executions(self.tracker.len());
    }
}

fn respond(service: ServiceKind, status: &str, message: String, requeue: Duration) -> PluginResponse {
    match service.normalize_status(status) {
        Outcome::Success => PluginResponse::success(message),
        Outcome::Running => PluginResponse::running(message, Some(requeue)),
        Outcome::Error | Outcome::Unknown => PluginResponse::error(message),
    }
}

fn pack(descriptor: &JsonValue, display_name: &str, what: &str) -> BridgeResult<String> {
    serde_json::to_string(descriptor)
        .with_context(&format!("failed to pack {display_name} {what} response"))
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use serde_json::json;

    use super::*;
    use crate::core::{
        BridgeError, ExecutionStatus, MockState, NodePhase, ServiceClient, StartedExecution,
        DEFAULT_REQUEUE,
    };

    /// Poll-style client that counts starts and replays a status script.
    struct ScriptedClient {
        starts: AtomicUsize,
        polls: AtomicUsize,
        statuses: Vec<&'static str>,
        fail_starts: AtomicUsize,
        empty_id: bool,
    }

    impl ScriptedClient {
        fn new(statuses: &[&'static str]) -> Self {
            Self {
                starts: AtomicUsize::new(0),
                polls: AtomicUsize::new(0),
                statuses: statuses.to_vec(),
                fail_starts: AtomicUsize::new(0),
                empty_id: false,
            }
        }
    }

    #[async_trait]
    impl ServiceClient for ScriptedClient {
        async fn existence_check(&self, request: &ServiceRequest) -> BridgeResult<JsonValue> {
            if request.name == "missing" {
                return Err(collaborator_error!("{} not found", request.resource_arn));
            }
            Ok(json!({"Name": request.name}))
        }

        async fn start(&self, _request: &ServiceRequest) -> BridgeResult<StartedExecution> {
            // widen the window for concurrent starts
            tokio::time::sleep(Duration::from_millis(20)).await;
            if self.fail_starts.load(Ordering::SeqCst) > 0 {
                self.fail_starts.fetch_sub(1, Ordering::SeqCst);
                return Err(collaborator_error!("throttled"));
            }
            let n = self.starts.fetch_add(1, Ordering::SeqCst) + 1;
            let execution_id = if self.empty_id {
                String::new()
            } else {
                format!("run-{n}")
            };
            Ok(StartedExecution {
                descriptor: json!({"RunId": execution_id}),
                execution_id,
            })
        }

        async fn poll(
            &self,
            _request: &ServiceRequest,
            execution_id: &str,
        ) -> BridgeResult<ExecutionStatus> {
            let n = self.polls.fetch_add(1, Ordering::SeqCst);
            let status = self.statuses[n.min(self.statuses.len() - 1)].to_string();
            Ok(ExecutionStatus {
                descriptor: json!({"RunId": execution_id, "State": status}),
                status,
            })
        }

        async fn invoke(
            &self,
            _request: &ServiceRequest,
            _payload: &JsonValue,
        ) -> BridgeResult<JsonValue> {
            tokio::time::sleep(Duration::from_millis(20)).await;
            Ok(json!({"StatusCode": 202}))
        }
    }

    fn request(service: ServiceKind, action: Action, name: &str) -> ServiceRequest {
        ServiceRequest {
            service,
            action,
            account_id: "100000000002".to_string(),
            region: "us-west-2".to_string(),
            name: name.to_string(),
            resource_arn: service.resource_arn("us-west-2", "100000000002", name),
            parameters: None,
            mock: None,
        }
    }

    fn dispatcher(service: ServiceKind, client: Arc<ScriptedClient>) -> Dispatcher {
        Dispatcher::new(
            Backends::new().with_client(service, client),
            Arc::new(ExecutionTracker::new()),
            RequeuePolicy::default(),
        )
    }

    #[tokio::test]
    async fn test_validate_existing_and_missing() {
        let client = Arc::new(ScriptedClient::new(&["SUCCEEDED"]));
        let dispatcher = dispatcher(ServiceKind::Glue, client);

        let resp = dispatcher
            .dispatch("wf-1", &request(ServiceKind::Glue, Action::Validate, "etl"))
            .await;
        assert_eq!(resp.outcome, Outcome::Success);
        assert_eq!(resp.message, r#"{"Name":"etl"}"#);

        let resp = dispatcher
            .dispatch("wf-1", &request(ServiceKind::Glue, Action::Validate, "missing"))
            .await;
        assert_eq!(resp.outcome, Outcome::Error);
        assert!(matches!(resp.execution_error, Some(BridgeError::Collaborator(_))));
        assert!(dispatcher.tracker().is_empty());
    }

    #[tokio::test]
    async fn test_execute_starts_once_then_polls() {
        let client = Arc::new(ScriptedClient::new(&["RUNNING", "SUCCEEDED"]));
        let dispatcher = dispatcher(ServiceKind::Glue, client.clone());
        let req = request(ServiceKind::Glue, Action::Execute, "etl");

        let resp = dispatcher.dispatch("wf-1", &req).await;
        assert_eq!(resp.outcome, Outcome::Running);
        assert_eq!(resp.requeue_after, Some(Duration::from_secs(60)));
        assert_eq!(resp.message, r#"{"RunId":"run-1"}"#);

        let resp = dispatcher.dispatch("wf-1", &req).await;
        assert_eq!(resp.outcome, Outcome::Running);
        assert!(resp.message.contains("RUNNING"));

        let resp = dispatcher.dispatch("wf-1", &req).await;
        assert_eq!(resp.outcome, Outcome::Success);

        assert_eq!(client.starts.load(Ordering::SeqCst), 1);
        assert_eq!(client.polls.load(Ordering::SeqCst), 2);
        assert_eq!(
            dispatcher.tracker().get("wf-1").unwrap().execution_id(),
            "run-1"
        );
    }

    #[tokio::test]
    async fn test_failed_status_is_error_node() {
        let client = Arc::new(ScriptedClient::new(&["TIMED_OUT"]));
        let dispatcher = dispatcher(ServiceKind::StepFunctions, client);
        let req = request(ServiceKind::StepFunctions, Action::Execute, "flow");

        dispatcher.dispatch("wf-1", &req).await;
        let reply = dispatcher
            .dispatch("wf-1", &req)
            .await
            .into_reply(DEFAULT_REQUEUE)
            .unwrap();
        assert_eq!(reply.node.phase, NodePhase::Error);
        assert!(reply.node.message.contains("TIMED_OUT"));
        assert_eq!(reply.requeue, None);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_first_execute_starts_once() {
        let client = Arc::new(ScriptedClient::new(&["Executing"]));
        let dispatcher = Arc::new(dispatcher(ServiceKind::SageMakerPipelines, client.clone()));
        let req = request(ServiceKind::SageMakerPipelines, Action::Execute, "train");

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let dispatcher = dispatcher.clone();
                let req = req.clone();
                tokio::spawn(async move { dispatcher.dispatch("wf-1", &req).await })
            })
            .collect();
        for handle in handles {
            assert_eq!(handle.await.unwrap().outcome, Outcome::Running);
        }

        assert_eq!(client.starts.load(Ordering::SeqCst), 1);
        assert_eq!(dispatcher.tracker().len(), 1);
    }

    #[tokio::test]
    async fn test_failed_start_records_nothing() {
        let client = Arc::new(ScriptedClient::new(&["RUNNING"]));
        client.fail_starts.store(1, Ordering::SeqCst);
        let dispatcher = dispatcher(ServiceKind::Glue, client.clone());
        let req = request(ServiceKind::Glue, Action::Execute, "etl");

        let resp = dispatcher.dispatch("wf-1", &req).await;
        assert_eq!(resp.outcome, Outcome::Error);
        assert!(dispatcher.tracker().get("wf-1").is_none());

        // next poll starts again
        let resp = dispatcher.dispatch("wf-1", &req).await;
        assert_eq!(resp.outcome, Outcome::Running);
        assert_eq!(client.starts.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_empty_execution_id_is_failure() {
        let mut client = ScriptedClient::new(&["RUNNING"]);
        client.empty_id = true;
        let dispatcher = dispatcher(ServiceKind::Glue, Arc::new(client));

        let resp = dispatcher
            .dispatch("wf-1", &request(ServiceKind::Glue, Action::Execute, "etl"))
            .await;
        assert_eq!(resp.outcome, Outcome::Error);
        assert!(resp
            .execution_error
            .unwrap()
            .to_string()
            .contains("has no execution id"));
        assert!(dispatcher.tracker().is_empty());
    }

    #[tokio::test]
    async fn test_different_resource_starts_new_execution() {
        let client = Arc::new(ScriptedClient::new(&["RUNNING"]));
        let dispatcher = dispatcher(ServiceKind::Glue, client.clone());

        dispatcher
            .dispatch("wf-1", &request(ServiceKind::Glue, Action::Execute, "etl"))
            .await;
        dispatcher
            .dispatch("wf-1", &request(ServiceKind::Glue, Action::Execute, "other"))
            .await;

        assert_eq!(client.starts.load(Ordering::SeqCst), 2);
        let record = dispatcher.tracker().get("wf-1").unwrap();
        assert_eq!(record.execution_id(), "run-2");
        assert!(record.resource_arn().ends_with("job/other"));
    }

    #[tokio::test]
    async fn test_invocation_flow() {
        let client = Arc::new(ScriptedClient::new(&["RUNNING"]));
        let dispatcher = dispatcher(ServiceKind::Lambda, client);
        let req = request(ServiceKind::Lambda, Action::Execute, "resize");

        let resp = dispatcher.dispatch("wf-1", &req).await;
        assert_eq!(resp.outcome, Outcome::Running);
        assert_eq!(resp.requeue_after, Some(Duration::from_secs(5)));
        assert_eq!(resp.message, "started aws lambda function async execution");

        let resp = dispatcher.dispatch("wf-1", &req).await;
        assert_eq!(resp.outcome, Outcome::Running);
        assert_eq!(resp.message, "running aws lambda function async execution");
        assert_eq!(resp.requeue_after, Some(Duration::from_secs(5)));

        tokio::time::sleep(Duration::from_millis(100)).await;
        let resp = dispatcher.dispatch("wf-1", &req).await;
        assert_eq!(resp.outcome, Outcome::Success);
        assert_eq!(resp.message, r#"{"StatusCode":202}"#);
    }

    #[tokio::test]
    async fn test_invocation_without_backend_fails() {
        let dispatcher = Dispatcher::new(
            Backends::new(),
            Arc::new(ExecutionTracker::new()),
            RequeuePolicy::default(),
        );
        let req = request(ServiceKind::Lambda, Action::Execute, "resize");

        dispatcher.dispatch("wf-1", &req).await;
        tokio::time::sleep(Duration::from_millis(50)).await;

        let reply = dispatcher
            .dispatch("wf-1", &req)
            .await
            .into_reply(DEFAULT_REQUEUE)
            .unwrap();
        assert_eq!(reply.node.phase, NodePhase::Error);
        assert!(reply.node.message.contains("no backend configured"));
    }

    #[tokio::test]
    async fn test_execute_requires_workflow_uid() {
        let client = Arc::new(ScriptedClient::new(&["RUNNING"]));
        let dispatcher = dispatcher(ServiceKind::Glue, client.clone());
        let req = request(ServiceKind::Glue, Action::Execute, "etl");

        for workflow_id in ["", "  "] {
            let reply = dispatcher
                .dispatch(workflow_id, &req)
                .await
                .into_reply(DEFAULT_REQUEUE)
                .unwrap();
            assert_eq!(reply.node.phase, NodePhase::Error);
            assert_eq!(reply.node.message, "malformed plugin input: workflow uid is empty");
        }
        assert_eq!(client.starts.load(Ordering::SeqCst), 0);
        assert!(dispatcher.tracker().is_empty());

        // validate does not touch the tracker
        let req = request(ServiceKind::Glue, Action::Validate, "etl");
        assert_eq!(dispatcher.dispatch("", &req).await.outcome, Outcome::Success);
    }

    #[tokio::test]
    async fn test_mock_skips_tracker_and_backends() {
        let client = Arc::new(ScriptedClient::new(&["RUNNING"]));
        let dispatcher = dispatcher(ServiceKind::Glue, client.clone());
        let mut req = request(ServiceKind::Glue, Action::Execute, "etl");

        for (state, outcome) in [
            (MockState::Success, Outcome::Success),
            (MockState::Running, Outcome::Running),
            (MockState::Error, Outcome::Error),
        ] {
            req.mock = Some(state);
            assert_eq!(dispatcher.dispatch("wf-1", &req).await.outcome, outcome);
        }
        assert_eq!(client.starts.load(Ordering::SeqCst), 0);
        assert!(dispatcher.tracker().is_empty());
    }
}
