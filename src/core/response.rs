//! Plugin response and the reply sent back to the orchestration engine.

use std::time::Duration;

use serde::{Serialize, Serializer};

use super::{error::BridgeError, outcome::Outcome};

/// Requeue applied to running poll-style executions when none was supplied.
pub const DEFAULT_REQUEUE: Duration = Duration::from_secs(60);

const DEFAULT_SUCCESS_MESSAGE: &str = "success";
const DEFAULT_RUNNING_MESSAGE: &str = "running";
const DEFAULT_ERROR_MESSAGE: &str = "error";

/// Result of dispatching one request, before it is rendered for the engine.
#[derive(Debug, Default)]
pub struct PluginResponse {
    pub message: String,
    pub outcome: Outcome,
    pub should_requeue: bool,
    pub requeue_after: Option<Duration>,
    /// Malformed request; rendered as HTTP 400 without a node result.
    pub request_error: Option<BridgeError>,
    /// Failed execution; rendered as a terminal `Error` node.
    pub execution_error: Option<BridgeError>,
}

impl PluginResponse {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            outcome: Outcome::Success,
            ..Default::default()
        }
    }

    pub fn running(message: impl Into<String>, requeue_after: Option<Duration>) -> Self {
        Self {
            message: message.into(),
            outcome: Outcome::Running,
            should_requeue: true,
            requeue_after,
            ..Default::default()
        }
    }

    /// Terminal failure reported by the service itself, e.g. a `FAILED` run.
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            outcome: Outcome::Error,
            ..Default::default()
        }
    }

    pub fn failed(err: BridgeError) -> Self {
        Self {
            outcome: Outcome::Error,
            execution_error: Some(err),
            ..Default::default()
        }
    }

    pub fn rejected(err: BridgeError) -> Self {
        Self {
            outcome: Outcome::Error,
            request_error: Some(err),
            ..Default::default()
        }
    }

    /// Render the response for the engine.
    ///
    /// Returns the request error instead when the request itself was malformed.
    pub fn into_reply(self, default_requeue: Duration) -> Result<ExecuteTemplateReply, BridgeError> {
        if let Some(err) = self.request_error {
            return Err(err);
        }

        let reply = match self.outcome {
            Outcome::Success => ExecuteTemplateReply::node(
                NodePhase::Succeeded,
                non_empty_or(self.message, DEFAULT_SUCCESS_MESSAGE),
                None,
            ),
            Outcome::Running => ExecuteTemplateReply::node(
                NodePhase::Running,
                non_empty_or(self.message, DEFAULT_RUNNING_MESSAGE),
                Some(self.requeue_after.unwrap_or(default_requeue)),
            ),
            Outcome::Error | Outcome::Unknown => {
                let message = match self.execution_error {
                    Some(err) => err.to_string(),
                    None => non_empty_or(self.message, DEFAULT_ERROR_MESSAGE),
                };
                ExecuteTemplateReply::node(NodePhase::Error, message, None)
            }
        };
        Ok(reply)
    }
}

fn non_empty_or(message: String, default: &str) -> String {
    if message.is_empty() {
        default.to_string()
    } else {
        message
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum NodePhase {
    Succeeded,
    Error,
    Running,
}

impl NodePhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            NodePhase::Succeeded => "Succeeded",
            NodePhase::Error => "Error",
            NodePhase::Running => "Running",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NodeResult {
    pub phase: NodePhase,
    pub message: String,
}

/// Reply body of `template.execute`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExecuteTemplateReply {
    pub node: NodeResult,
    #[serde(
        skip_serializing_if = "Option::is_none",
        serialize_with = "serialize_requeue"
    )]
    pub requeue: Option<Duration>,
}

impl ExecuteTemplateReply {
    fn node(phase: NodePhase, message: String, requeue: Option<Duration>) -> Self {
        Self {
            node: NodeResult { phase, message },
            requeue,
        }
    }
}

fn serialize_requeue<S: Serializer>(
    requeue: &Option<Duration>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    match requeue {
        Some(d) => serializer.serialize_str(&format_duration(*d)),
        None => serializer.serialize_none(),
    }
}

/// Formats a duration the way the engine's duration fields expect, e.g. `1m0s` or `5s`.
pub fn format_duration(d: Duration) -> String {
    if d.is_zero() {
        return "0s".to_string();
    }

    let total_secs = d.as_secs();
    let nanos = d.subsec_nanos();

    if total_secs == 0 {
        return if nanos % 1_000_000 == 0 {
            format!("{}ms", nanos / 1_000_000)
        } else if nanos % 1_000 == 0 {
            format!("{}µs", nanos / 1_000)
        } else {
            format!("{nanos}ns")
        };
    }

    let hours = total_secs / 3600;
    let minutes = (total_secs % 3600) / 60;
    let mut seconds = (total_secs % 60).to_string();
    if nanos > 0 {
        let fraction = format!("{nanos:09}");
        seconds = format!("{}.{}", seconds, fraction.trim_end_matches('0'));
    }

    if hours > 0 {
        format!("{hours}h{minutes}m{seconds}s")
    } else if minutes > 0 {
        format!("{minutes}m{seconds}s")
    } else {
        format!("{seconds}s")
    }
}
