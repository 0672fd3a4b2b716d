//! A [Definition] describes how to build, share and close a single named object. Definitions are
//! supplied by application layers at start-up and loaded into a
//! [DefinitionRegistry](crate::definition_registry::DefinitionRegistry).
//!
//! ```
//! use scopeline_di::definition::Definition;
//! use scopeline_di::instance_provider::TypedInstanceProvider;
//! use scopeline_di::scope::{APP, REQUEST};
//!
//! struct Pool;
//! struct Session;
//!
//! let pool = Definition::new(|_| Ok(Pool)).with_name("pool").with_scope(APP);
//! let session = Definition::new(|container| {
//!     let _pool = container.safe_get::<Pool>("pool")?;
//!     Ok(Session)
//! })
//! .with_name("session")
//! .with_scope(REQUEST)
//! .with_close(|_session: &Session| Ok(()));
//! ```

use crate::container::Container;
use crate::instance_provider::{downcast, ErrorPtr, InstanceAnyPtr, InstancePtr};
use derivative::Derivative;
use std::sync::Arc;

/// Type-erased build function.
pub type BuildFunction =
    Arc<dyn Fn(&Container) -> Result<InstanceAnyPtr, ErrorPtr> + Send + Sync + 'static>;

/// Type-erased close function, called with the definition name and the instance.
pub type CloseFunction =
    Arc<dyn Fn(&str, InstanceAnyPtr) -> Result<(), ErrorPtr> + Send + Sync + 'static>;

/// Definition of a named object managed by a container.
#[derive(Derivative, Clone)]
#[derivative(Debug)]
pub struct Definition {
    /// Unique name, used to request the instance.
    pub name: String,

    /// Scope which owns built instances. `None` binds instances to the scope of whichever
    /// container requests them.
    pub scope: Option<String>,

    /// Creates a new instance. The container passed in is the owner of the instance and can be
    /// used to resolve dependencies.
    #[derivative(Debug = "ignore")]
    pub build: BuildFunction,

    /// Releases resources held by an instance when its owning container gets deleted.
    #[derivative(Debug = "ignore")]
    pub close: Option<CloseFunction>,

    /// Unshared definitions produce a new instance on every retrieval. Such instances are never
    /// cached nor closed by the container.
    pub unshared: bool,
}

impl Definition {
    /// Creates an unnamed, shared definition from a typed build function. The name should be set
    /// with [Definition::with_name] before registration.
    pub fn new<T, F>(build: F) -> Self
    where
        T: Send + Sync + 'static,
        F: Fn(&Container) -> Result<T, ErrorPtr> + Send + Sync + 'static,
    {
        Self {
            name: String::new(),
            scope: None,
            build: Arc::new(move |container: &Container| {
                build(container).map(|instance| InstancePtr::new(instance) as InstanceAnyPtr)
            }),
            close: None,
            unshared: false,
        }
    }

    /// Creates a definition for an already built object.
    pub fn with_value<T: Send + Sync + 'static>(name: impl Into<String>, value: T) -> Self {
        let instance = InstancePtr::new(value) as InstanceAnyPtr;
        Self {
            name: name.into(),
            scope: None,
            build: Arc::new(move |_: &Container| -> Result<InstanceAnyPtr, ErrorPtr> {
                Ok(instance.clone())
            }),
            close: None,
            unshared: false,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_scope(mut self, scope: impl Into<String>) -> Self {
        self.scope = Some(scope.into());
        self
    }

    /// Sets a typed close function. Calling it with an instance of a different type results in a
    /// [ContainerError::TypeMismatch](crate::error::ContainerError::TypeMismatch).
    pub fn with_close<T, F>(mut self, close: F) -> Self
    where
        T: Send + Sync + 'static,
        F: Fn(&T) -> Result<(), ErrorPtr> + Send + Sync + 'static,
    {
        self.close = Some(Arc::new(move |name: &str, instance: InstanceAnyPtr| {
            let instance = downcast::<T>(name, instance)?;
            close(&instance)
        }));
        self
    }

    /// Marks the definition as unshared.
    pub fn unshared(mut self) -> Self {
        self.unshared = true;
        self
    }
}
