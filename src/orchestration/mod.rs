//! Request orchestration layer
//!
//! Coordinates the tracker, the service clients and the invocation runner for one
//! validated request.

pub mod dispatcher;
pub mod invoker;
pub mod janitor;
pub mod mock;

pub use dispatcher::{Dispatcher, RequeuePolicy};
pub use janitor::TrackerJanitor;
