//! Access to instances managed by a [Container](crate::container::Container). The untyped
//! [InstanceProvider] is the seam between the container and anything able to resolve named
//! instances, while [TypedInstanceProvider] adds strongly-typed access on top of it.

use crate::error::ContainerError;
#[cfg(test)]
use mockall::automock;
use std::any::{type_name, Any};
use std::error::Error;
use std::sync::Arc;

/// Shared pointer to an instance.
pub type InstancePtr<T> = Arc<T>;

/// Type-erased shared pointer to an instance, as stored in container caches.
pub type InstanceAnyPtr = InstancePtr<dyn Any + Send + Sync + 'static>;

/// Shared pointer to an error returned by user-supplied build and close functions.
pub type ErrorPtr = Arc<dyn Error + Send + Sync>;

/// How to resolve a name relative to the container it is requested from.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug, Default)]
pub enum Resolution {
    /// The definition must belong to the container scope or a more generic one.
    #[default]
    Scoped,
    /// The definition may belong to a more specific scope, in which case a private sub-container
    /// chain is created and kept until [Container::clean](crate::container::Container::clean).
    Unscoped,
}

/// Generic provider for named instances.
#[cfg_attr(test, automock)]
pub trait InstanceProvider {
    /// Returns the instance for given name, respecting scope boundaries. If the instance does not
    /// exist yet, it gets built and cached (unless unshared).
    fn safe_get_any(&self, name: &str) -> Result<InstanceAnyPtr, ContainerError>;

    /// Like [InstanceProvider::safe_get_any], but allows retrieving instances belonging to more
    /// specific scopes.
    fn unscoped_safe_get_any(&self, name: &str) -> Result<InstanceAnyPtr, ContainerError>;
}

/// Helper trait for [InstanceProvider] providing strongly-typed access.
pub trait TypedInstanceProvider {
    /// Resolves an instance with given name and casts it to `T`.
    fn instance<T: Send + Sync + 'static>(
        &self,
        name: &str,
        resolution: Resolution,
    ) -> Result<InstancePtr<T>, ContainerError>;

    /// Typesafe version of [InstanceProvider::safe_get_any].
    #[inline]
    fn safe_get<T: Send + Sync + 'static>(
        &self,
        name: &str,
    ) -> Result<InstancePtr<T>, ContainerError> {
        self.instance(name, Resolution::Scoped)
    }

    /// Like [TypedInstanceProvider::safe_get], but panics on error.
    #[inline]
    fn get<T: Send + Sync + 'static>(&self, name: &str) -> InstancePtr<T> {
        match self.safe_get(name) {
            Ok(instance) => instance,
            Err(error) => panic!("Cannot get '{name}': {error}"),
        }
    }

    /// Resolves an instance like [TypedInstanceProvider::safe_get] and stores it in `destination`.
    /// The destination is left untouched on error.
    #[inline]
    fn fill<T: Send + Sync + 'static>(
        &self,
        name: &str,
        destination: &mut Option<InstancePtr<T>>,
    ) -> Result<(), ContainerError> {
        *destination = Some(self.safe_get(name)?);
        Ok(())
    }

    /// Typesafe version of [InstanceProvider::unscoped_safe_get_any].
    #[inline]
    fn unscoped_safe_get<T: Send + Sync + 'static>(
        &self,
        name: &str,
    ) -> Result<InstancePtr<T>, ContainerError> {
        self.instance(name, Resolution::Unscoped)
    }

    /// Like [TypedInstanceProvider::unscoped_safe_get], but panics on error.
    #[inline]
    fn unscoped_get<T: Send + Sync + 'static>(&self, name: &str) -> InstancePtr<T> {
        match self.unscoped_safe_get(name) {
            Ok(instance) => instance,
            Err(error) => panic!("Cannot get '{name}' outside of its scope: {error}"),
        }
    }

    /// Unscoped version of [TypedInstanceProvider::fill].
    #[inline]
    fn unscoped_fill<T: Send + Sync + 'static>(
        &self,
        name: &str,
        destination: &mut Option<InstancePtr<T>>,
    ) -> Result<(), ContainerError> {
        *destination = Some(self.unscoped_safe_get(name)?);
        Ok(())
    }
}

impl<P: InstanceProvider + ?Sized> TypedInstanceProvider for P {
    fn instance<T: Send + Sync + 'static>(
        &self,
        name: &str,
        resolution: Resolution,
    ) -> Result<InstancePtr<T>, ContainerError> {
        let instance = match resolution {
            Resolution::Scoped => self.safe_get_any(name)?,
            Resolution::Unscoped => self.unscoped_safe_get_any(name)?,
        };

        downcast(name, instance)
    }
}

/// Casts a type-erased instance to a concrete type.
pub fn downcast<T: Send + Sync + 'static>(
    name: &str,
    instance: InstanceAnyPtr,
) -> Result<InstancePtr<T>, ContainerError> {
    instance
        .downcast::<T>()
        .map_err(|_| ContainerError::TypeMismatch {
            name: name.to_string(),
            expected: type_name::<T>(),
        })
}

#[cfg(test)]
mod tests {
    use crate::error::ContainerError;
    use crate::instance_provider::{
        InstanceAnyPtr, InstancePtr, MockInstanceProvider, Resolution, TypedInstanceProvider,
    };
    use mockall::predicate::*;

    fn provider_returning(value: i32) -> MockInstanceProvider {
        let mut provider = MockInstanceProvider::new();
        provider
            .expect_safe_get_any()
            .with(eq("value"))
            .returning(move |_| Ok(InstancePtr::new(value) as InstanceAnyPtr));
        provider
    }

    #[test]
    fn should_cast_typed_instance() {
        let provider = provider_returning(5);
        assert_eq!(*provider.safe_get::<i32>("value").unwrap(), 5);
    }

    #[test]
    fn should_report_type_mismatch() {
        let provider = provider_returning(5);
        assert!(matches!(
            provider.safe_get::<String>("value").unwrap_err(),
            ContainerError::TypeMismatch { name, .. } if name == "value"
        ));
    }

    #[test]
    fn should_fill_destination() {
        let provider = provider_returning(7);

        let mut destination = None;
        provider.fill::<i32>("value", &mut destination).unwrap();
        assert_eq!(destination.as_deref(), Some(&7));
    }

    #[test]
    fn should_not_touch_destination_on_mismatch() {
        let provider = provider_returning(7);

        let mut destination: Option<InstancePtr<u8>> = None;
        assert!(provider.fill("value", &mut destination).is_err());
        assert!(destination.is_none());
    }

    #[test]
    fn should_forward_unscoped_resolution() {
        let mut provider = MockInstanceProvider::new();
        provider.expect_safe_get_any().times(0);
        provider
            .expect_unscoped_safe_get_any()
            .with(eq("narrow"))
            .times(1)
            .returning(|_| Ok(InstancePtr::new(1u8) as InstanceAnyPtr));

        assert_eq!(
            *provider
                .instance::<u8>("narrow", Resolution::Unscoped)
                .unwrap(),
            1
        );
    }

    #[test]
    #[should_panic]
    fn should_panic_on_get_error() {
        let mut provider = MockInstanceProvider::new();
        provider
            .expect_safe_get_any()
            .returning(|name| Err(ContainerError::UnknownDefinition(name.to_string())));

        provider.get::<i32>("missing");
    }
}
