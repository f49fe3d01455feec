//! Resource definitions exchanged with the metadata store and the pool manager.

use std::time::SystemTime;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::identity::{FunctionIdentity, ObjectMeta};

/// Reference from a function to the environment it runs in.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EnvironmentReference {
    pub namespace: String,
    pub name: String,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct FunctionSpec {
    pub environment: EnvironmentReference,
    #[serde(default)]
    pub package: Option<String>,
}

/// A deployed function definition.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Function {
    pub metadata: ObjectMeta,
    pub spec: FunctionSpec,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Runtime {
    pub image: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EnvironmentSpec {
    #[serde(default = "EnvironmentSpec::default_version")]
    pub version: u32,
    pub runtime: Runtime,
    #[serde(default = "EnvironmentSpec::default_poolsize")]
    pub poolsize: u32,
}

impl EnvironmentSpec {
    fn default_version() -> u32 {
        1
    }

    fn default_poolsize() -> u32 {
        3
    }
}

impl Default for EnvironmentSpec {
    fn default() -> Self {
        Self {
            version: Self::default_version(),
            runtime: Runtime::default(),
            poolsize: Self::default_poolsize(),
        }
    }
}

/// Execution environment: runtime image and pool sizing for its functions.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Environment {
    pub metadata: ObjectMeta,
    pub spec: EnvironmentSpec,
}

impl Environment {
    pub fn reference(&self) -> EnvironmentReference {
        EnvironmentReference {
            namespace: self.metadata.namespace.clone(),
            name: self.metadata.name.clone(),
        }
    }
}

/// A ready-to-invoke function instance.
///
/// Created, reused, and torn down by the pool manager; the executor only
/// transports it.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ServiceHandle {
    pub id: Uuid,
    pub function: FunctionIdentity,
    pub environment: EnvironmentReference,
    pub address: String,
    pub created_at: SystemTime,
}

impl ServiceHandle {
    pub fn new(
        function: FunctionIdentity,
        environment: EnvironmentReference,
        address: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            function,
            environment,
            address: address.into(),
            created_at: SystemTime::now(),
        }
    }
}
