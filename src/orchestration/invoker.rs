//! Async invocation runner
//!
//! Runs a fire-and-forget invocation on its own task and publishes the terminal outcome
//! into the execution record. The invocation itself runs in an inner task so a panic in
//! the client surfaces as a `JoinError` and is recorded as a failure.

use std::{any::Any, sync::Arc};

use log::{info, warn};
use tokio::task::{JoinError, JoinHandle};

use crate::core::{InvocationPublisher, InvocationStatus, ServiceClient, ServiceRequest};

pub fn spawn(
    client: Arc<dyn ServiceClient>,
    request: ServiceRequest,
    publisher: InvocationPublisher,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let display_name = request.service.display_name();
        let resource_arn = request.resource_arn.clone();

        let invocation = tokio::spawn(async move {
            let payload = request.payload();
            client.invoke(&request, &payload).await
        });

        let (status, message) = match invocation.await {
            Ok(Ok(result)) => match serde_json::to_string(&result) {
                Ok(message) => {
                    info!("Completed {} invocation of {}", display_name, resource_arn);
                    (InvocationStatus::Succeeded, message)
                }
                Err(e) => (
                    InvocationStatus::Failed,
                    format!("failed to pack {display_name} invocation response: {e}"),
                ),
            },
            Ok(Err(e)) => {
                warn!("{} invocation of {} failed: {}", display_name, resource_arn, e);
                (
                    InvocationStatus::Failed,
                    format!("{display_name} invocation failed: {e}"),
                )
            }
            Err(e) => {
                let reason = join_error_reason(e);
                warn!(
                    "{} invocation of {} aborted: {}",
                    display_name, resource_arn, reason
                );
                (
                    InvocationStatus::Failed,
                    format!("{display_name} invocation aborted: {reason}"),
                )
            }
        };

        publisher.publish(status, message);
    })
}

fn join_error_reason(err: JoinError) -> String {
    if err.is_cancelled() {
        return "task was cancelled".to_string();
    }
    match err.try_into_panic() {
        Ok(payload) => panic_message(payload.as_ref()),
        Err(err) => err.to_string(),
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        format!("panic: {msg}")
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        format!("panic: {msg}")
    } else {
        "panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use serde_json::{json, Value as JsonValue};

    use super::*;
    use crate::{
        collaborator_error,
        core::{Action, BridgeResult, ExecutionRecord, ExecutionStatus, StartedExecution},
        services::ServiceKind,
    };

    enum Behavior {
        Succeed,
        Fail,
        Panic,
    }

    struct InvokeClient(Behavior);

    #[async_trait]
    impl ServiceClient for InvokeClient {
        async fn existence_check(&self, _request: &ServiceRequest) -> BridgeResult<JsonValue> {
            unreachable!()
        }

        async fn start(&self, _request: &ServiceRequest) -> BridgeResult<StartedExecution> {
            unreachable!()
        }

        async fn poll(
            &self,
            _request: &ServiceRequest,
            _execution_id: &str,
        ) -> BridgeResult<ExecutionStatus> {
            unreachable!()
        }

        async fn invoke(
            &self,
            _request: &ServiceRequest,
            payload: &JsonValue,
        ) -> BridgeResult<JsonValue> {
            match self.0 {
                Behavior::Succeed => Ok(json!({"StatusCode": 202, "Payload": payload})),
                Behavior::Fail => Err(collaborator_error!("throttled")),
                Behavior::Panic => panic!("client exploded"),
            }
        }
    }

    fn request() -> ServiceRequest {
        let mut parameters = serde_json::Map::new();
        parameters.insert("bucket".to_string(), json!("raw-images"));
        ServiceRequest {
            service: ServiceKind::Lambda,
            action: Action::Execute,
            account_id: "100000000002".to_string(),
            region: "us-west-2".to_string(),
            name: "resize".to_string(),
            resource_arn: "arn:aws:lambda:us-west-2:100000000002:function:resize".to_string(),
            parameters: Some(parameters),
            mock: None,
        }
    }

    async fn run(behavior: Behavior) -> (InvocationStatus, String) {
        let (record, publisher) = ExecutionRecord::invocation(
            ServiceKind::Lambda,
            request().resource_arn,
            "inv-1".to_string(),
            "running".to_string(),
        );
        spawn(Arc::new(InvokeClient(behavior)), request(), publisher)
            .await
            .unwrap();
        let state = record.invocation_state().unwrap();
        (state.status, state.message)
    }

    #[tokio::test]
    async fn test_success_publishes_result() {
        let (status, message) = run(Behavior::Succeed).await;
        assert_eq!(status, InvocationStatus::Succeeded);
        let result: JsonValue = serde_json::from_str(&message).unwrap();
        assert_eq!(
            result,
            json!({"StatusCode": 202, "Payload": {"bucket": "raw-images"}})
        );
    }

    #[tokio::test]
    async fn test_client_error_publishes_failure() {
        let (status, message) = run(Behavior::Fail).await;
        assert_eq!(status, InvocationStatus::Failed);
        assert!(message.contains("throttled"));
    }

    #[tokio::test]
    async fn test_panic_publishes_failure() {
        let (status, message) = run(Behavior::Panic).await;
        assert_eq!(status, InvocationStatus::Failed);
        assert!(message.contains("client exploded"));
    }
}
