use async_trait::async_trait;
use http::{Response, StatusCode};
use serde::Serialize;

use super::http::{Handler, IncomingRequest};
use crate::utils::response::ResponseBuilder;

#[derive(Serialize)]
struct StatusResponse {
    status_code: u16,
}

/// Liveness probe: answers 200 whenever the listener is up.
pub struct HealthzHandler;

#[async_trait]
impl Handler for HealthzHandler {
    async fn handle(&self, _request: &IncomingRequest) -> Response<Vec<u8>> {
        log::debug!("Received healthcheck request");
        ResponseBuilder::success_json(&StatusResponse {
            status_code: StatusCode::OK.as_u16(),
        })
    }
}

#[cfg(test)]
mod tests {
    use http::Method;

    use super::*;

    #[tokio::test]
    async fn test_healthz() {
        let response = HealthzHandler
            .handle(&IncomingRequest {
                method: Method::GET,
                content_type: None,
                body: Vec::new(),
            })
            .await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.body(), br#"{"status_code":200}"#);
    }
}
