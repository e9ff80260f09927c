//! Client for services without a configured backend.

use async_trait::async_trait;
use serde_json::Value as JsonValue;

use crate::{
    collaborator_error,
    core::{BridgeResult, ExecutionStatus, ServiceClient, ServiceRequest, StartedExecution},
    services::ServiceKind,
};

/// Every call fails with a collaborator error naming the service and resource.
pub struct UnavailableClient {
    service: ServiceKind,
}

impl UnavailableClient {
    pub fn new(service: ServiceKind) -> Self {
        Self { service }
    }
}

#[async_trait]
impl ServiceClient for UnavailableClient {
    async fn existence_check(&self, request: &ServiceRequest) -> BridgeResult<JsonValue> {
        Err(collaborator_error!(
            "no backend configured for {}, cannot describe {}",
            self.service,
            request.resource_arn
        ))
    }

    async fn start(&self, request: &ServiceRequest) -> BridgeResult<StartedExecution> {
        Err(collaborator_error!(
            "no backend configured for {}, cannot start {}",
            self.service,
            request.resource_arn
        ))
    }

    async fn poll(
        &self,
        _request: &ServiceRequest,
        execution_id: &str,
    ) -> BridgeResult<ExecutionStatus> {
        Err(collaborator_error!(
            "no backend configured for {}, cannot check {}",
            self.service,
            execution_id
        ))
    }

    async fn invoke(
        &self,
        request: &ServiceRequest,
        _payload: &JsonValue,
    ) -> BridgeResult<JsonValue> {
        Err(collaborator_error!(
            "no backend configured for {}, cannot invoke {}",
            self.service,
            request.resource_arn
        ))
    }
}
