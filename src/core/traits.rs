//! Core traits for fnexec collaborators
//!
//! These interfaces decouple the creation pipeline from the metadata
//! store, the pool manager, the service registry, and the cache.

use std::{sync::Arc, time::Duration};

use async_trait::async_trait;

use super::{
    error::ExecutorResult,
    identity::FunctionIdentity,
    types::{Environment, Function, ServiceHandle},
};

/// Read access to function and environment definitions.
#[async_trait]
pub trait MetadataClient: Send + Sync {
    /// Fetch a function definition, `NotFound` if absent
    async fn get_function(&self, namespace: &str, name: &str) -> ExecutorResult<Function>;

    /// Fetch an environment definition, `NotFound` if absent
    async fn get_environment(&self, namespace: &str, name: &str) -> ExecutorResult<Environment>;
}

/// Warm instances of one environment, specialized on demand.
#[async_trait]
pub trait Pool: Send + Sync {
    /// Specialize an instance for the function.
    ///
    /// Implementations register the resulting service in the service
    /// registry before returning.
    async fn get_func_svc(&self, function: &FunctionIdentity) -> ExecutorResult<Arc<ServiceHandle>>;
}

/// Owner of the per-environment pools.
#[async_trait]
pub trait PoolManager: Send + Sync {
    async fn get_pool(&self, environment: &Environment) -> ExecutorResult<Arc<dyn Pool>>;
}

/// Lookup of running services by function.
pub trait ServiceRegistry: Send + Sync {
    fn get_by_function(&self, function: &FunctionIdentity) -> ExecutorResult<Arc<ServiceHandle>>;
}

/// Point lookups with fixed-expiry writes.
pub trait TtlCache<K, V>: Send + Sync {
    fn get(&self, key: &K) -> Option<V>;

    fn set(&self, key: K, value: V, ttl: Duration);
}
