//! Creation orchestration layer
//!
//! Environment resolution, backend dispatch, and the request coordinator
//! that deduplicates concurrent creations per function.

pub mod coordinator;
pub mod dispatcher;
pub mod executor;
pub mod resolver;

#[cfg(test)]
pub(crate) mod testing;

pub use coordinator::{CoordinatorStats, CreationResult, RequestCoordinator, ResultSink};
pub use dispatcher::BackendDispatcher;
pub use executor::Executor;
pub use resolver::{EnvironmentCache, EnvironmentResolver};
