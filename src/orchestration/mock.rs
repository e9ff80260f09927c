//! Canned responses for `mock: true` requests.

use std::time::Duration;

use crate::core::{BridgeError, MockState, PluginResponse};

pub const MOCK_ERROR_MESSAGE: &str = "expected mock error";

/// Response for a mocked request. Touches neither the tracker nor any service.
pub fn respond(state: MockState, requeue: Duration) -> PluginResponse {
    match state {
        MockState::Success => PluginResponse::success(""),
        MockState::Running => PluginResponse::running("", Some(requeue)),
        MockState::Error => {
            PluginResponse::failed(BridgeError::Execution(MOCK_ERROR_MESSAGE.to_string()))
        }
    }
}
