//! HTTP surface: the executor plugin endpoint, health check and metrics.

pub mod http;
pub mod metrics;
pub mod status;

pub use self::http::BridgeHttpApp;
