//! Functionality related to registering [Definition]s. Containers create instances based on those
//! definitions, looking them up by name.

use crate::definition::Definition;
use crate::error::DefinitionRegistryError;
use crate::scope::ScopeList;
use fxhash::{FxHashMap, FxHashSet};

/// Ordered registry of definitions, indexed by name.
#[derive(Clone, Debug)]
pub struct DefinitionRegistry {
    scopes: ScopeList,
    definitions: Vec<Definition>,
    names: FxHashMap<String, usize>,
}

impl DefinitionRegistry {
    /// Creates an empty registry accepting definitions for given scopes.
    pub fn new(scopes: ScopeList) -> Self {
        Self {
            scopes,
            definitions: Default::default(),
            names: Default::default(),
        }
    }

    /// Loads a batch of definitions. Either all of them get registered, or none when an error is
    /// returned.
    pub fn load<I>(&mut self, definitions: I) -> Result<(), DefinitionRegistryError>
    where
        I: IntoIterator<Item = Definition>,
    {
        let definitions: Vec<Definition> = definitions.into_iter().collect();

        let mut batch_names = FxHashSet::default();
        for definition in &definitions {
            Self::check_name(definition)?;

            if self.names.contains_key(&definition.name)
                || !batch_names.insert(definition.name.as_str())
            {
                return Err(DefinitionRegistryError::DuplicateName(
                    definition.name.clone(),
                ));
            }

            self.check_scope(definition)?;
        }

        for definition in definitions {
            self.names
                .insert(definition.name.clone(), self.definitions.len());
            self.definitions.push(definition);
        }

        Ok(())
    }

    /// Registers a definition, replacing any existing one with the same name. Reserved for
    /// overriding definitions, e.g. in tests.
    pub fn replace(&mut self, definition: Definition) -> Result<(), DefinitionRegistryError> {
        Self::check_name(&definition)?;
        self.check_scope(&definition)?;

        if let Some(index) = self.names.get(&definition.name) {
            self.definitions[*index] = definition;
        } else {
            self.names
                .insert(definition.name.clone(), self.definitions.len());
            self.definitions.push(definition);
        }

        Ok(())
    }

    /// Returns a definition with given name.
    #[inline]
    pub fn definition(&self, name: &str) -> Option<&Definition> {
        self.names
            .get(name)
            .and_then(|index| self.definitions.get(*index))
    }

    /// Checks if there's a definition with given name.
    #[inline]
    pub fn is_defined(&self, name: &str) -> bool {
        self.names.contains_key(name)
    }

    /// Returns definition names in registration order.
    pub fn definition_names(&self) -> impl Iterator<Item = &str> {
        self.definitions
            .iter()
            .map(|definition| definition.name.as_str())
    }

    #[inline]
    pub fn scopes(&self) -> &ScopeList {
        &self.scopes
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }

    fn check_name(definition: &Definition) -> Result<(), DefinitionRegistryError> {
        if definition.name.is_empty() {
            Err(DefinitionRegistryError::EmptyName)
        } else {
            Ok(())
        }
    }

    fn check_scope(&self, definition: &Definition) -> Result<(), DefinitionRegistryError> {
        match &definition.scope {
            Some(scope) if self.scopes.index_of(scope).is_none() => {
                Err(DefinitionRegistryError::UnknownScope {
                    name: definition.name.clone(),
                    scope: scope.clone(),
                })
            }
            _ => Ok(()),
        }
    }
}
