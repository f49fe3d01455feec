//! Function identity
//!
//! A [`FunctionIdentity`] names exactly one version of a function
//! definition. Any update to the definition bumps `resource_version`,
//! so a stale instance can never be reused across versions.

use std::fmt;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

// DNS-1123 label
static NAME_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-z0-9]([-a-z0-9]{0,61}[a-z0-9])?$").unwrap());

/// Object metadata shared by functions and environments.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize, Validate)]
pub struct ObjectMeta {
    #[validate(custom(function = "validate_name"))]
    pub namespace: String,
    #[validate(custom(function = "validate_name"))]
    pub name: String,
    #[serde(default)]
    pub resource_version: String,
}

impl ObjectMeta {
    pub fn new(
        namespace: impl Into<String>,
        name: impl Into<String>,
        resource_version: impl Into<String>,
    ) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
            resource_version: resource_version.into(),
        }
    }
}

fn validate_name(name: &str) -> Result<(), ValidationError> {
    if NAME_RE.is_match(name) {
        Ok(())
    } else {
        let mut err = ValidationError::new("invalid_object_name");
        err.add_param("name".into(), &name.to_string());
        Err(err)
    }
}

/// Key identifying one specific version of a function definition.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct FunctionIdentity {
    namespace: String,
    name: String,
    resource_version: String,
}

impl FunctionIdentity {
    pub fn new(
        namespace: impl Into<String>,
        name: impl Into<String>,
        resource_version: impl Into<String>,
    ) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
            resource_version: resource_version.into(),
        }
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn resource_version(&self) -> &str {
        &self.resource_version
    }
}

impl From<&ObjectMeta> for FunctionIdentity {
    fn from(meta: &ObjectMeta) -> Self {
        Self::new(&meta.namespace, &meta.name, &meta.resource_version)
    }
}

impl fmt::Display for FunctionIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}@{}", self.namespace, self.name, self.resource_version)
    }
}
