use crate::instance_provider::ErrorPtr;
use itertools::Itertools;
use std::fmt::{Display, Formatter};
use std::sync::Arc;
use thiserror::Error;

/// Errors related to registering definitions and declaring scopes. These are start-up errors and
/// are never recovered from automatically.
#[derive(Error, Clone, Ord, PartialOrd, Eq, PartialEq, Hash, Debug)]
pub enum DefinitionRegistryError {
    #[error("Definition name cannot be empty")]
    EmptyName,
    #[error("Attempted to register a duplicated definition with name: {0}")]
    DuplicateName(String),
    #[error("Definition '{name}' references an undeclared scope: {scope}")]
    UnknownScope { name: String, scope: String },
    #[error("Invalid scope list: {0}")]
    InvalidScopeList(String),
}

/// Failure of a single close function during teardown.
#[derive(Clone, Debug)]
pub struct CloseFailure {
    /// Name of the definition whose instance failed to close.
    pub name: String,
    pub error: ErrorPtr,
}

impl Display for CloseFailure {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "'{}': {}", self.name, self.error)
    }
}

/// Errors related to retrieving instances and managing containers.
#[derive(Error, Clone, Debug)]
pub enum ContainerError {
    #[error("Cannot find definition: {0}")]
    UnknownDefinition(String),
    #[error("Definition '{name}' belongs to scope '{scope}', which is narrower than the container scope '{container_scope}'")]
    ScopeMismatch {
        name: String,
        scope: String,
        container_scope: String,
    },
    #[error("Cannot create a sub-container of a container in the narrowest scope: {0}")]
    NoDeeperScope(String),
    #[error("The container is closed")]
    ContainerClosed,
    #[error("Instance '{name}' cannot be cast to {expected}")]
    TypeMismatch {
        name: String,
        expected: &'static str,
    },
    #[error("Error building '{name}': {source}")]
    Construction {
        name: String,
        #[source]
        source: ErrorPtr,
    },
    #[error("Dependency cycle detected while building: {0}")]
    CyclicDependency(String),
    #[error("Cannot delete a container with {0} open sub-container(s)")]
    HasChildren(usize),
    #[error("Error closing instances: {}", .0.iter().join(", "))]
    Teardown(Vec<CloseFailure>),
}

impl From<ContainerError> for ErrorPtr {
    fn from(value: ContainerError) -> Self {
        Arc::new(value)
    }
}

impl From<DefinitionRegistryError> for ErrorPtr {
    fn from(value: DefinitionRegistryError) -> Self {
        Arc::new(value)
    }
}
