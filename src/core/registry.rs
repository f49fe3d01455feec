//! Function service registry
//!
//! In-memory index of running services keyed by function identity. Pool
//! managers populate it while specializing; duplicate requesters read it
//! once the creation they joined has finished.

use std::sync::Arc;

use dashmap::DashMap;
use log::{debug, info};

use super::{
    error::ExecutorResult,
    identity::FunctionIdentity,
    traits::ServiceRegistry,
    types::ServiceHandle,
};
use crate::not_found_error;

/// Registry of services indexed by the function they serve
pub struct FunctionServiceRegistry {
    services: DashMap<FunctionIdentity, Arc<ServiceHandle>>,
}

impl Default for FunctionServiceRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl FunctionServiceRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self {
            services: DashMap::new(),
        }
    }

    /// Insert or update the service for a function
    pub fn insert(&self, service: Arc<ServiceHandle>) {
        debug!("Registering service {} for function {}", service.id, service.function);
        self.services.insert(service.function.clone(), service);
    }

    /// Remove the service for a function
    pub fn remove(&self, function: &FunctionIdentity) -> Option<Arc<ServiceHandle>> {
        debug!("Removing service for function {}", function);
        self.services.remove(function).map(|(_, service)| service)
    }

    /// Drop every service whose function is not in `keep`
    pub fn retain_functions(&self, keep: &[FunctionIdentity]) {
        let before = self.services.len();
        self.services.retain(|function, _| keep.contains(function));
        info!(
            "Pruned {} stale services from registry",
            before - self.services.len()
        );
    }

    /// All registered services
    pub fn list(&self) -> Vec<Arc<ServiceHandle>> {
        self.services.iter().map(|entry| entry.value().clone()).collect()
    }

    pub fn get_stats(&self) -> RegistryStats {
        RegistryStats {
            service_count: self.services.len(),
        }
    }
}

impl ServiceRegistry for FunctionServiceRegistry {
    fn get_by_function(&self, function: &FunctionIdentity) -> ExecutorResult<Arc<ServiceHandle>> {
        self.services
            .get(function)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| not_found_error!("no service registered for function {}", function))
    }
}

/// Statistics about registry contents
#[derive(Debug, Clone)]
pub struct RegistryStats {
    pub service_count: usize,
}
