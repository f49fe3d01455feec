//! fnexec turns "invoke function F" into a running, invocation-ready
//! service for F.
//!
//! It reuses registered services when possible and otherwise creates one,
//! making sure concurrent requests for the same function version trigger a
//! single creation.

pub mod cache;
pub mod config;
pub mod core;
pub mod logging;
pub mod metadata;
pub mod metrics;
pub mod orchestration;

pub use crate::core::{ExecutorError, ExecutorResult, FunctionIdentity, ObjectMeta};
pub use orchestration::Executor;
