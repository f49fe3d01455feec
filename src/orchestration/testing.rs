//! In-memory collaborators for tests.

use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc, Mutex,
};

use async_trait::async_trait;
use dashmap::{DashMap, DashSet};
use tokio::sync::watch;

use crate::{
    core::{
        error::{ExecutorError, ExecutorResult},
        identity::{FunctionIdentity, ObjectMeta},
        registry::FunctionServiceRegistry,
        traits::{MetadataClient, Pool, PoolManager},
        types::{
            Environment, EnvironmentReference, EnvironmentSpec, Function, FunctionSpec, Runtime,
            ServiceHandle,
        },
    },
    not_found_error,
};

pub(crate) const NAMESPACE: &str = "default";

pub(crate) fn init_log() {
    let _ = env_logger::builder().is_test(true).try_init();
}

pub(crate) fn function_identity(name: &str, version: &str) -> FunctionIdentity {
    FunctionIdentity::new(NAMESPACE, name, version)
}

pub(crate) fn environment(name: &str) -> Environment {
    Environment {
        metadata: ObjectMeta::new(NAMESPACE, name, "1"),
        spec: EnvironmentSpec {
            runtime: Runtime {
                image: format!("registry.local/{name}-env"),
            },
            ..Default::default()
        },
    }
}

#[derive(Default)]
pub(crate) struct FakeMetadata {
    functions: DashMap<(String, String), Function>,
    environments: DashMap<(String, String), Environment>,
    function_fetches: AtomicUsize,
    environment_fetches: AtomicUsize,
}

impl FakeMetadata {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn add_function(&self, namespace: &str, name: &str, env: &str) {
        let function = Function {
            metadata: ObjectMeta::new(namespace, name, "1"),
            spec: FunctionSpec {
                environment: EnvironmentReference {
                    namespace: namespace.to_string(),
                    name: env.to_string(),
                },
                package: None,
            },
        };
        self.functions
            .insert((namespace.to_string(), name.to_string()), function);
    }

    pub(crate) fn add_environment(&self, namespace: &str, name: &str) {
        self.environments
            .insert((namespace.to_string(), name.to_string()), environment(name));
    }

    pub(crate) fn function_fetches(&self) -> usize {
        self.function_fetches.load(Ordering::SeqCst)
    }

    pub(crate) fn environment_fetches(&self) -> usize {
        self.environment_fetches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl MetadataClient for FakeMetadata {
    async fn get_function(&self, namespace: &str, name: &str) -> ExecutorResult<Function> {
        self.function_fetches.fetch_add(1, Ordering::SeqCst);
        self.functions
            .get(&(namespace.to_string(), name.to_string()))
            .map(|entry| entry.value().clone())
            .ok_or_else(|| not_found_error!("function {}/{}", namespace, name))
    }

    async fn get_environment(&self, namespace: &str, name: &str) -> ExecutorResult<Environment> {
        self.environment_fetches.fetch_add(1, Ordering::SeqCst);
        self.environments
            .get(&(namespace.to_string(), name.to_string()))
            .map(|entry| entry.value().clone())
            .ok_or_else(|| not_found_error!("environment {}/{}", namespace, name))
    }
}

struct PoolState {
    registry: Arc<FunctionServiceRegistry>,
    pool_requests: AtomicUsize,
    specializations: DashMap<FunctionIdentity, usize>,
    gates: DashMap<FunctionIdentity, watch::Sender<bool>>,
    pool_failure: Mutex<Option<ExecutorError>>,
    failures: DashMap<FunctionIdentity, ExecutorError>,
    panics: DashSet<FunctionIdentity>,
}

/// Pool manager whose pools register a fresh service per specialization.
///
/// A function can be held at the gate until the test opens it, fail once,
/// or panic once.
pub(crate) struct FakePoolManager {
    state: Arc<PoolState>,
}

impl FakePoolManager {
    pub(crate) fn new(registry: Arc<FunctionServiceRegistry>) -> Self {
        Self {
            state: Arc::new(PoolState {
                registry,
                pool_requests: AtomicUsize::new(0),
                specializations: DashMap::new(),
                gates: DashMap::new(),
                pool_failure: Mutex::new(None),
                failures: DashMap::new(),
                panics: DashSet::new(),
            }),
        }
    }

    /// Hold specializations of `function` until [`Self::open`]
    pub(crate) fn hold(&self, function: &FunctionIdentity) {
        let (gate, _) = watch::channel(false);
        self.state.gates.insert(function.clone(), gate);
    }

    pub(crate) fn open(&self, function: &FunctionIdentity) {
        if let Some(gate) = self.state.gates.get(function) {
            gate.send_replace(true);
        }
    }

    pub(crate) fn fail_pool_with(&self, err: ExecutorError) {
        *self.state.pool_failure.lock().unwrap() = Some(err);
    }

    /// Fail the next specialization of `function`
    pub(crate) fn fail_next(&self, function: &FunctionIdentity, err: ExecutorError) {
        self.state.failures.insert(function.clone(), err);
    }

    /// Panic during the next specialization of `function`
    pub(crate) fn panic_next(&self, function: &FunctionIdentity) {
        self.state.panics.insert(function.clone());
    }

    pub(crate) fn pool_requests(&self) -> usize {
        self.state.pool_requests.load(Ordering::SeqCst)
    }

    pub(crate) fn specializations(&self, function: &FunctionIdentity) -> usize {
        self.state
            .specializations
            .get(function)
            .map(|count| *count)
            .unwrap_or(0)
    }
}

#[async_trait]
impl PoolManager for FakePoolManager {
    async fn get_pool(&self, environment: &Environment) -> ExecutorResult<Arc<dyn Pool>> {
        self.state.pool_requests.fetch_add(1, Ordering::SeqCst);
        let failure = self.state.pool_failure.lock().unwrap().clone();
        if let Some(err) = failure {
            return Err(err);
        }
        Ok(Arc::new(FakePool {
            environment: environment.reference(),
            state: self.state.clone(),
        }))
    }
}

struct FakePool {
    environment: EnvironmentReference,
    state: Arc<PoolState>,
}

#[async_trait]
impl Pool for FakePool {
    async fn get_func_svc(&self, function: &FunctionIdentity) -> ExecutorResult<Arc<ServiceHandle>> {
        *self
            .state
            .specializations
            .entry(function.clone())
            .or_insert(0) += 1;

        let gate = self.state.gates.get(function).map(|gate| gate.subscribe());
        if let Some(mut gate) = gate {
            let _ = gate.wait_for(|open| *open).await;
        }

        if self.state.panics.remove(function).is_some() {
            panic!("specialization of {function} crashed");
        }
        if let Some((_, err)) = self.state.failures.remove(function) {
            return Err(err);
        }

        let fsvc = Arc::new(ServiceHandle::new(
            function.clone(),
            self.environment.clone(),
            format!("10.0.0.{}:8888", self.state.registry.get_stats().service_count + 1),
        ));
        self.state.registry.insert(fsvc.clone());
        Ok(fsvc)
    }
}
