//! Core traits for the plugin
//!
//! The dispatcher only talks to external services through [`ServiceClient`], so any
//! backend (simulated, stubbed or a real SDK wrapper) can be plugged in per service.

use async_trait::async_trait;
use serde_json::Value as JsonValue;

use super::{error::BridgeResult, request::ServiceRequest};

/// Result of a successful start call.
#[derive(Debug, Clone, PartialEq)]
pub struct StartedExecution {
    /// Opaque identifier of the remote run, used for every later poll.
    pub execution_id: String,
    /// Native response, echoed back as the node message.
    pub descriptor: JsonValue,
}

/// Result of a successful poll call.
#[derive(Debug, Clone, PartialEq)]
pub struct ExecutionStatus {
    /// Native status token, e.g. `Executing` or `SUCCEEDED`.
    pub status: String,
    pub descriptor: JsonValue,
}

/// Operations one external job-execution service offers.
///
/// Poll-style services implement `start` and `poll`; invocation-style services implement
/// `invoke`. Each call either returns or fails; no timeouts are imposed here.
#[async_trait]
pub trait ServiceClient: Send + Sync {
    /// Check that the target resource exists and describe it.
    async fn existence_check(&self, request: &ServiceRequest) -> BridgeResult<JsonValue>;

    /// Start a new run of the target resource.
    async fn start(&self, request: &ServiceRequest) -> BridgeResult<StartedExecution>;

    /// Fetch the status of a previously started run.
    async fn poll(
        &self,
        request: &ServiceRequest,
        execution_id: &str,
    ) -> BridgeResult<ExecutionStatus>;

    /// Invoke the target with a JSON payload and return the native response.
    async fn invoke(&self, request: &ServiceRequest, payload: &JsonValue)
        -> BridgeResult<JsonValue>;
}
