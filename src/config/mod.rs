use std::fs;
use std::time::Duration;

use log::{debug, info, trace};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::core::error::{ExecutorError, ExecutorResult};

/// Environment variable that overrides `executor.backend`
pub const BACKEND_ENV: &str = "EXECUTOR_BACKEND";

#[derive(Default, Debug, Serialize, Deserialize, Validate)]
pub struct Config {
    #[serde(default)]
    #[validate(nested)]
    pub executor: Executor,

    #[validate(nested)]
    pub etcd: Option<Etcd>,

    pub log: Option<Log>,
}

// Config file load and validation
impl Config {
    pub fn load_from_yaml<P>(path: P) -> ExecutorResult<Self>
    where
        P: AsRef<std::path::Path> + std::fmt::Display,
    {
        let conf_str = fs::read_to_string(&path).map_err(|e| {
            ExecutorError::Configuration(format!("Unable to read conf file from {path}: {e}"))
        })?;
        debug!("Conf file read from {path}");
        Self::from_yaml(&conf_str)
    }

    pub fn from_yaml(conf_str: &str) -> ExecutorResult<Self> {
        trace!("Read conf file: {conf_str}");
        let conf: Config = serde_yaml::from_str(conf_str)?;

        trace!("Loaded conf: {conf:?}");

        conf.validate()?;

        Ok(conf)
    }

    #[allow(dead_code)]
    pub fn to_yaml(&self) -> String {
        serde_yaml::to_string(self).unwrap_or_default()
    }

    /// Apply `EXECUTOR_BACKEND` on top of the file settings
    pub fn merge_with_env(&mut self) {
        if let Ok(value) = std::env::var(BACKEND_ENV) {
            self.merge_backend_override(&value);
        }
    }

    fn merge_backend_override(&mut self, value: &str) {
        let backend = ExecutorBackend::from_env_value(value);
        info!("{BACKEND_ENV}={value} selects the {backend:?} backend");
        self.executor.backend = backend;
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, Validate)]
pub struct Executor {
    #[serde(default)]
    pub backend: ExecutorBackend,
    /// Seconds a resolved environment stays cached
    #[serde(default = "Executor::default_env_cache_ttl")]
    #[validate(range(min = 1))]
    pub env_cache_ttl: u64,
}

impl Executor {
    fn default_env_cache_ttl() -> u64 {
        10
    }

    pub fn env_cache_ttl(&self) -> Duration {
        Duration::from_secs(self.env_cache_ttl)
    }
}

impl Default for Executor {
    fn default() -> Self {
        Self {
            backend: ExecutorBackend::default(),
            env_cache_ttl: Self::default_env_cache_ttl(),
        }
    }
}

/// Strategy used to obtain a function service
#[derive(Copy, Clone, Default, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExecutorBackend {
    #[default]
    Pool,
    Deploy,
}

impl ExecutorBackend {
    /// `DEPLOY` selects the deploy backend; any other value falls back to the pool
    pub fn from_env_value(value: &str) -> Self {
        if value == "DEPLOY" {
            ExecutorBackend::Deploy
        } else {
            ExecutorBackend::Pool
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, Validate)]
pub struct Etcd {
    #[validate(length(min = 1))]
    pub host: Vec<String>,
    #[serde(default = "Etcd::default_prefix")]
    pub prefix: String,
    pub timeout: Option<u32>,
    pub connect_timeout: Option<u32>,
    pub user: Option<String>,
    pub password: Option<String>,
}

impl Etcd {
    fn default_prefix() -> String {
        "/fnexec".to_string()
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Log {
    pub path: String,
}
