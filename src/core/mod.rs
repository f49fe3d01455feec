//! Core abstractions and interfaces for fnexec
//!
//! This module provides the identities, resource types, collaborator
//! traits, and error type shared by the rest of the crate.

pub mod error;
pub mod identity;
pub mod registry;
pub mod traits;
pub mod types;


// Re-export commonly used types
pub use error::{ExecutorError, ExecutorResult};
pub use identity::{FunctionIdentity, ObjectMeta};
pub use registry::FunctionServiceRegistry;
pub use traits::*;
pub use types::{Environment, Function, ServiceHandle};
