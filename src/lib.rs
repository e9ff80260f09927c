//! Argo Workflows executor plugin bridging workflow steps to AWS job services.
//!
//! It defines the modules for configuration, request normalization, dispatch and the
//! HTTP service the orchestration engine calls.

pub mod backend;
pub mod config;
pub mod core;
pub mod logging;
pub mod orchestration;
pub mod service;
pub mod services;
pub(crate) mod utils;
