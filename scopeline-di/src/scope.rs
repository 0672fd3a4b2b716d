//! Instances live in containers bound to scopes. Scopes form a strictly linear hierarchy, from
//! the most generic one (typically the whole application) to the most specific one (e.g. a part
//! of a single request). A container in a given scope can use instances from containers in more
//! generic scopes, but never from more specific ones - those would not outlive it.
//!
//! The default hierarchy is [APP] ⊃ [REQUEST] ⊃ [SUBREQUEST].

use crate::error::DefinitionRegistryError;
use fxhash::FxHashSet;

/// Name of the application-wide scope.
pub const APP: &str = "app";

/// Name of the per-request scope.
pub const REQUEST: &str = "request";

/// Name of the per-sub-request scope.
pub const SUBREQUEST: &str = "subrequest";

/// Validated, ordered list of scope names, from the most generic to the most specific.
#[derive(Clone, Eq, PartialEq, Debug)]
pub struct ScopeList {
    scopes: Vec<String>,
}

impl Default for ScopeList {
    fn default() -> Self {
        Self {
            scopes: vec![APP.to_string(), REQUEST.to_string(), SUBREQUEST.to_string()],
        }
    }
}

impl ScopeList {
    /// Creates a new list. The list must not be empty, and names must be non-empty and unique.
    pub fn new<I, S>(scopes: I) -> Result<Self, DefinitionRegistryError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let scopes: Vec<String> = scopes.into_iter().map(Into::into).collect();
        if scopes.is_empty() {
            return Err(DefinitionRegistryError::InvalidScopeList(
                "at least one scope is required".to_string(),
            ));
        }

        let mut seen = FxHashSet::default();
        for scope in &scopes {
            if scope.is_empty() {
                return Err(DefinitionRegistryError::InvalidScopeList(
                    "scope names cannot be empty".to_string(),
                ));
            }

            if !seen.insert(scope.as_str()) {
                return Err(DefinitionRegistryError::InvalidScopeList(format!(
                    "scope '{scope}' is declared more than once"
                )));
            }
        }

        Ok(Self { scopes })
    }

    /// Returns the position of a given scope, where 0 is the most generic one.
    #[inline]
    pub fn index_of(&self, scope: &str) -> Option<usize> {
        self.scopes.iter().position(|candidate| candidate == scope)
    }

    /// Returns the scope name at a given position.
    #[inline]
    pub fn name(&self, index: usize) -> Option<&str> {
        self.scopes.get(index).map(String::as_str)
    }

    /// Number of declared scopes.
    #[inline]
    pub fn len(&self) -> usize {
        self.scopes.len()
    }

    /// Always false for a validated list; present for API completeness.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.scopes.is_empty()
    }

    #[inline]
    pub fn as_slice(&self) -> &[String] {
        &self.scopes
    }

    /// Scopes more generic than the one at `index`.
    #[inline]
    pub fn parents_of(&self, index: usize) -> &[String] {
        &self.scopes[..index.min(self.scopes.len())]
    }

    /// Scopes more specific than the one at `index`.
    #[inline]
    pub fn children_of(&self, index: usize) -> &[String] {
        self.scopes.get(index + 1..).unwrap_or_default()
    }
}
