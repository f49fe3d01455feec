//! Environment resolution
//!
//! Maps a function identity to the environment it runs in. Results are
//! cached under the function identity, not the environment, so functions
//! sharing an environment each pay for their own lookup.

use std::{sync::Arc, time::Duration};

use log::debug;

use crate::{
    cache::ExpiringCache,
    core::{
        error::ExecutorResult,
        identity::FunctionIdentity,
        traits::{MetadataClient, TtlCache},
        types::Environment,
    },
    metrics::ENV_CACHE,
};

/// Default environment cache, keyed by function identity
pub type EnvironmentCache = ExpiringCache<FunctionIdentity, Arc<Environment>>;

pub struct EnvironmentResolver {
    metadata: Arc<dyn MetadataClient>,
    cache: Arc<dyn TtlCache<FunctionIdentity, Arc<Environment>>>,
    ttl: Duration,
}

impl EnvironmentResolver {
    pub fn new(
        metadata: Arc<dyn MetadataClient>,
        cache: Arc<dyn TtlCache<FunctionIdentity, Arc<Environment>>>,
        ttl: Duration,
    ) -> Self {
        Self {
            metadata,
            cache,
            ttl,
        }
    }

    /// Resolve the environment of a function.
    ///
    /// A cached entry is returned as is until it expires. Fetch failures
    /// are not cached.
    pub async fn resolve(&self, function: &FunctionIdentity) -> ExecutorResult<Arc<Environment>> {
        if let Some(env) = self.cache.get(function) {
            ENV_CACHE.with_label_values(&["hit"]).inc();
            return Ok(env);
        }
        ENV_CACHE.with_label_values(&["miss"]).inc();

        let f = self
            .metadata
            .get_function(function.namespace(), function.name())
            .await?;

        let env_ref = &f.spec.environment;
        debug!("[{}] getting env {}/{}", function, env_ref.namespace, env_ref.name);
        let env = Arc::new(
            self.metadata
                .get_environment(&env_ref.namespace, &env_ref.name)
                .await?,
        );

        self.cache.set(function.clone(), env.clone(), self.ttl);

        Ok(env)
    }
}
