//! Core functionality for creating root [Container]s.

use crate::container::Container;
use crate::definition::Definition;
use crate::definition_registry::DefinitionRegistry;
use crate::error::DefinitionRegistryError;
use crate::instance_provider::{ErrorPtr, InstanceAnyPtr, InstancePtr};
use crate::scope::ScopeList;
use std::sync::Arc;
use tracing::debug;

/// Builder for root [Container]s. Collects definitions for a declared scope hierarchy, then
/// produces containers in the most generic scope.
#[derive(Clone, Debug)]
pub struct Builder {
    registry: DefinitionRegistry,
    values: Vec<(String, InstanceAnyPtr)>,
}

impl Builder {
    /// Creates a new builder for given scopes, ordered from the most generic one.
    pub fn new<I, S>(scopes: I) -> Result<Self, DefinitionRegistryError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Ok(Self::with_scope_list(ScopeList::new(scopes)?))
    }

    /// Creates a new builder with the default [app](crate::scope::APP),
    /// [request](crate::scope::REQUEST) and [subrequest](crate::scope::SUBREQUEST) scopes.
    pub fn with_default_scopes() -> Self {
        Self::with_scope_list(ScopeList::default())
    }

    pub fn with_scope_list(scopes: ScopeList) -> Self {
        Self {
            registry: DefinitionRegistry::new(scopes),
            values: Default::default(),
        }
    }

    /// Adds definitions. Fails without adding anything on duplicated names or undeclared scopes.
    pub fn add<I>(&mut self, definitions: I) -> Result<(), DefinitionRegistryError>
    where
        I: IntoIterator<Item = Definition>,
    {
        self.registry.load(definitions)
    }

    /// Registers an already built object in the most generic scope, bypassing its build function.
    /// An existing definition with the same name gets replaced, which makes this useful for
    /// substituting objects in tests.
    pub fn set<T: Send + Sync + 'static>(
        &mut self,
        name: impl Into<String>,
        value: T,
    ) -> Result<(), DefinitionRegistryError> {
        let name = name.into();
        let root_scope = self
            .registry
            .scopes()
            .name(0)
            .map(str::to_string)
            .unwrap_or_default();

        let instance = InstancePtr::new(value) as InstanceAnyPtr;
        let definition = Definition {
            name: name.clone(),
            scope: Some(root_scope),
            build: Arc::new({
                let instance = instance.clone();
                move |_: &Container| -> Result<InstanceAnyPtr, ErrorPtr> { Ok(instance.clone()) }
            }),
            close: None,
            unshared: false,
        };

        self.registry.replace(definition)?;
        self.values.retain(|(existing, _)| *existing != name);
        self.values.push((name, instance));

        Ok(())
    }

    /// Returns the registry with definitions added so far.
    #[inline]
    pub fn registry(&self) -> &DefinitionRegistry {
        &self.registry
    }

    /// Builds a root container in the most generic scope. Later changes to the builder don't
    /// affect already built containers.
    pub fn build(&self) -> Container {
        debug!(
            scopes = ?self.registry.scopes().as_slice(),
            definitions = self.registry.len(),
            "Building root container"
        );

        Container::root(Arc::new(self.registry.clone()), self.values.clone())
    }
}

/// Creates a root container for given scopes (or the default ones, if none are given), with given
/// definitions.
pub fn new_container<S, D>(scopes: S, definitions: D) -> Result<Container, DefinitionRegistryError>
where
    S: IntoIterator,
    S::Item: Into<String>,
    D: IntoIterator<Item = Definition>,
{
    let scopes = scopes.into_iter().map(Into::into).collect::<Vec<String>>();
    let mut builder = if scopes.is_empty() {
        Builder::with_default_scopes()
    } else {
        Builder::new(scopes)?
    };

    builder.add(definitions)?;
    Ok(builder.build())
}

#[cfg(test)]
mod tests {
    use crate::builder::{new_container, Builder};
    use crate::definition::Definition;
    use crate::error::DefinitionRegistryError;
    use crate::instance_provider::{ErrorPtr, TypedInstanceProvider};
    use crate::scope::{APP, REQUEST};

    #[test]
    fn should_reject_invalid_scope_list() {
        assert!(matches!(
            Builder::new(Vec::<String>::new()),
            Err(DefinitionRegistryError::InvalidScopeList(_))
        ));
    }

    #[test]
    fn should_build_root_in_most_generic_scope() {
        let builder = Builder::new(["main", "job"]).unwrap();
        let container = builder.build();

        assert_eq!(container.scope(), "main");
        assert!(container.parent().is_none());
        assert!(!container.is_closed());
    }

    #[test]
    fn should_bypass_build_for_set_values() {
        let mut builder = Builder::with_default_scopes();
        builder
            .add([Definition::new(|_| -> Result<u32, ErrorPtr> { panic!("should not be built") })
                .with_name("port")
                .with_scope(REQUEST)])
            .unwrap();
        builder.set("port", 8080u32).unwrap();

        let app = builder.build();
        assert_eq!(*app.get::<u32>("port"), 8080);
        assert_eq!(
            builder.registry().definition("port").unwrap().scope.as_deref(),
            Some(APP)
        );
    }

    #[test]
    fn should_snapshot_registry() {
        let mut builder = Builder::with_default_scopes();
        let before = builder.build();
        builder
            .add([Definition::new(|_| Ok(1u8)).with_name("late")])
            .unwrap();

        assert!(!before.is_defined("late"));
        assert!(builder.build().is_defined("late"));
    }

    #[test]
    fn should_create_container_with_default_scopes() {
        let container = new_container(Vec::<String>::new(), []).unwrap();
        assert_eq!(container.scopes().len(), 3);
    }
}
