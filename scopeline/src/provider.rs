//! Application layers (configuration, persistence, business logic, API etc.) contribute their
//! definitions through [DefinitionProvider]s. The [Application](crate::application::Application)
//! loads all providers into a single builder, so a name defined by two layers is a start-up error.

#[cfg(test)]
use mockall::automock;
use scopeline_di::definition::Definition;
use scopeline_di::instance_provider::ErrorPtr;

pub type DefinitionProviderPtr = Box<dyn DefinitionProvider + Send + Sync>;

/// Source of definitions for a single application layer.
#[cfg_attr(test, automock)]
pub trait DefinitionProvider {
    /// Name of the layer, used for diagnostics.
    fn name(&self) -> &'static str;

    /// Returns definitions of this layer. Called once, when the application container is built.
    fn definitions(&self) -> Result<Vec<Definition>, ErrorPtr>;
}

/// Provider returning a fixed list of definitions.
#[derive(Clone, Debug)]
pub struct StaticDefinitionProvider {
    name: &'static str,
    definitions: Vec<Definition>,
}

impl StaticDefinitionProvider {
    pub fn new<I: IntoIterator<Item = Definition>>(name: &'static str, definitions: I) -> Self {
        Self {
            name,
            definitions: definitions.into_iter().collect(),
        }
    }
}

impl DefinitionProvider for StaticDefinitionProvider {
    fn name(&self) -> &'static str {
        self.name
    }

    fn definitions(&self) -> Result<Vec<Definition>, ErrorPtr> {
        Ok(self.definitions.clone())
    }
}
