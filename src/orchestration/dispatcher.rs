//! Backend dispatch
//!
//! Hands a resolved environment to the creation strategy chosen at
//! startup.

use std::sync::Arc;

use log::info;

use crate::{
    config::ExecutorBackend,
    core::{
        error::ExecutorResult,
        identity::FunctionIdentity,
        traits::PoolManager,
        types::{Environment, ServiceHandle},
    },
};

pub struct BackendDispatcher {
    backend: ExecutorBackend,
    pool_manager: Arc<dyn PoolManager>,
}

impl BackendDispatcher {
    pub fn new(backend: ExecutorBackend, pool_manager: Arc<dyn PoolManager>) -> Self {
        Self {
            backend,
            pool_manager,
        }
    }

    pub fn backend(&self) -> ExecutorBackend {
        self.backend
    }

    /// Obtain a ready service for `function`.
    ///
    /// The deploy backend is not implemented yet and yields `Ok(None)`.
    pub async fn create_service(
        &self,
        function: &FunctionIdentity,
        environment: &Environment,
    ) -> ExecutorResult<Option<Arc<ServiceHandle>>> {
        match self.backend {
            ExecutorBackend::Deploy => Ok(None),
            ExecutorBackend::Pool => {
                let pool = self.pool_manager.get_pool(environment).await?;
                // the pool registers the service as it specializes
                info!("[{}] getting function service from pool", function);
                let fsvc = pool.get_func_svc(function).await?;
                Ok(Some(fsvc))
            }
        }
    }
}
