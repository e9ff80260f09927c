//! Response helpers shared by the HTTP handlers.

use http::{header, HeaderValue, Response, StatusCode};
use serde::Serialize;

/// Standard content types
pub mod content_type {
    pub const TEXT_PLAIN: &str = "text/plain";
    pub const APPLICATION_JSON: &str = "application/json";
}

/// Whether a `Content-Type` header value denotes JSON. Parameters such as `charset` are
/// ignored.
pub fn is_json_content_type(value: Option<&str>) -> bool {
    value
        .and_then(|v| v.split(';').next())
        .map(|essence| essence.trim().eq_ignore_ascii_case(content_type::APPLICATION_JSON))
        .unwrap_or(false)
}

pub struct ResponseBuilder;

impl ResponseBuilder {
    /// Build a success HTTP Response
    pub fn success_http(body: Vec<u8>, content_type: Option<&str>) -> Response<Vec<u8>> {
        let mut builder = Response::builder().status(StatusCode::OK);

        if let Some(ct) = content_type {
            match HeaderValue::from_str(ct) {
                Ok(header_value) => {
                    builder = builder.header(header::CONTENT_TYPE, header_value);
                }
                Err(e) => {
                    log::error!("Invalid content type '{}': {}", ct, e);
                }
            }
        }

        builder.body(body).unwrap_or_else(|e| {
            log::error!("Failed to build success response: {}", e);
            Self::error_http(StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error")
        })
    }

    /// Build an error HTTP Response with a plain text body
    pub fn error_http(status: StatusCode, message: &str) -> Response<Vec<u8>> {
        Response::builder()
            .status(status)
            .header(header::CONTENT_TYPE, content_type::TEXT_PLAIN)
            .body(message.as_bytes().to_vec())
            .unwrap_or_else(|e| {
                log::error!("Failed to build error response: {}", e);
                Self::fallback(StatusCode::INTERNAL_SERVER_ERROR, b"Internal Server Error")
            })
    }

    /// Build a bodiless HTTP Response
    pub fn empty_http(status: StatusCode) -> Response<Vec<u8>> {
        Response::builder()
            .status(status)
            .body(Vec::new())
            .unwrap_or_else(|e| {
                log::error!("Failed to build empty response: {}", e);
                Self::fallback(status, b"")
            })
    }

    /// Build a JSON success HTTP Response
    pub fn success_json<T: Serialize>(data: &T) -> Response<Vec<u8>> {
        match serde_json::to_vec(data) {
            Ok(json_body) => Self::success_http(json_body, Some(content_type::APPLICATION_JSON)),
            Err(e) => {
                log::error!("Failed to serialize JSON response: {}", e);
                Self::error_http(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "JSON serialization failed",
                )
            }
        }
    }

    fn fallback(status: StatusCode, body: &[u8]) -> Response<Vec<u8>> {
        let mut response = Response::new(body.to_vec());
        *response.status_mut() = status;
        response
    }
}

/// Common error response helpers
pub struct CommonErrors;

impl CommonErrors {
    /// Rejected plugin requests carry no body.
    pub fn bad_request() -> Response<Vec<u8>> {
        ResponseBuilder::empty_http(StatusCode::BAD_REQUEST)
    }

    pub fn not_found() -> Response<Vec<u8>> {
        ResponseBuilder::error_http(StatusCode::NOT_FOUND, "Not Found")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_success_response() {
        let response =
            ResponseBuilder::success_http(b"OK".to_vec(), Some(content_type::TEXT_PLAIN));
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.body(), b"OK");
    }

    #[test]
    fn test_json_response() {
        use serde_json::json;
        let data = json!({"status_code": 200});
        let response = ResponseBuilder::success_json(&data);
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers().get(header::CONTENT_TYPE).unwrap(),
            "application/json"
        );
        assert_eq!(response.body(), br#"{"status_code":200}"#);
    }

    #[test]
    fn test_common_errors() {
        let response = CommonErrors::bad_request();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert!(response.body().is_empty());

        let response = CommonErrors::not_found();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_json_content_type() {
        assert!(is_json_content_type(Some("application/json")));
        assert!(is_json_content_type(Some("application/json; charset=utf-8")));
        assert!(is_json_content_type(Some("Application/JSON")));
        assert!(!is_json_content_type(Some("text/plain")));
        assert!(!is_json_content_type(Some("application/jsonl")));
        assert!(!is_json_content_type(None));
    }
}
