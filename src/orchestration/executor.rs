//! Function service executor
//!
//! Entry point for callers: returns a running service for a function,
//! reusing a registered one when possible and otherwise asking the
//! coordinator to create it.

use std::sync::Arc;

use log::{debug, info};
use uuid::Uuid;
use validator::Validate;

use crate::{
    config::Config,
    core::{
        error::{ExecutorError, ExecutorResult},
        identity::{FunctionIdentity, ObjectMeta},
        traits::{MetadataClient, PoolManager, ServiceRegistry},
        types::ServiceHandle,
    },
};

use super::{
    coordinator::{CoordinatorStats, Pipeline, RequestCoordinator},
    dispatcher::BackendDispatcher,
    resolver::{EnvironmentCache, EnvironmentResolver},
};

pub struct Executor {
    instance_id: Uuid,
    registry: Arc<dyn ServiceRegistry>,
    coordinator: RequestCoordinator,
}

impl Executor {
    /// Wire the executor from a validated configuration.
    ///
    /// The backend is fixed here for the lifetime of the executor. Must be
    /// called inside a tokio runtime.
    pub fn new(
        config: &Config,
        metadata: Arc<dyn MetadataClient>,
        pool_manager: Arc<dyn PoolManager>,
        registry: Arc<dyn ServiceRegistry>,
    ) -> Self {
        let instance_id = Uuid::new_v4();
        info!(
            "Starting executor {} with {:?} backend, env cache ttl {}s",
            instance_id, config.executor.backend, config.executor.env_cache_ttl
        );

        let pipeline = Pipeline {
            resolver: EnvironmentResolver::new(
                metadata,
                Arc::new(EnvironmentCache::new()),
                config.executor.env_cache_ttl(),
            ),
            dispatcher: BackendDispatcher::new(config.executor.backend, pool_manager),
            registry: registry.clone(),
        };

        Self {
            instance_id,
            registry,
            coordinator: RequestCoordinator::start(Arc::new(pipeline)),
        }
    }

    pub fn instance_id(&self) -> Uuid {
        self.instance_id
    }

    pub fn coordinator(&self) -> &RequestCoordinator {
        &self.coordinator
    }

    /// Return a running service for the function, creating one if needed.
    pub async fn get_service_for_function(
        &self,
        meta: &ObjectMeta,
    ) -> ExecutorResult<Arc<ServiceHandle>> {
        meta.validate()?;
        let function = FunctionIdentity::from(meta);

        match self.registry.get_by_function(&function) {
            Ok(fsvc) => {
                debug!("[{}] using cached function service {}", function, fsvc.id);
                return Ok(fsvc);
            }
            Err(err) if err.is_not_found() => {}
            Err(err) => return Err(err),
        }

        self.coordinator.create(function.clone()).await?.ok_or_else(|| {
            ExecutorError::Unavailable(format!("backend produced no service for {function}"))
        })
    }

    pub async fn stats(&self) -> ExecutorResult<CoordinatorStats> {
        self.coordinator.stats().await
    }

    pub async fn shutdown(self) {
        info!("Stopping executor {}", self.instance_id);
        self.coordinator.shutdown().await;
    }
}
