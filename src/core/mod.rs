//! Core abstractions for the plugin
//!
//! Request normalization, canonical outcomes, the execution tracker, the response
//! builder and the collaborator trait every service backend implements.

pub mod error;
pub mod outcome;
pub mod registry;
pub mod request;
pub mod response;
pub mod traits;


// Re-export commonly used types
pub use error::{BridgeError, BridgeResult, ErrorContext};
pub use outcome::Outcome;
pub use registry::{
    ExecutionRecord, ExecutionTracker, InvocationPublisher, InvocationState, InvocationStatus,
};
pub use request::{Action, ExecuteTemplateArgs, MockState, PluginRequest, ServiceRequest};
pub use response::{ExecuteTemplateReply, NodePhase, PluginResponse, DEFAULT_REQUEUE};
pub use traits::{ExecutionStatus, ServiceClient, StartedExecution};
