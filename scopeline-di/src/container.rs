//! The runtime object graph. A [Container] is bound to a single scope, has a parent in the
//! next more generic scope (unless it's the root) and may have children in the next more
//! specific one.
//!
//! Instances are built lazily on first retrieval and cached in the container bound to the scope
//! declared by their [Definition]: a request-scoped container asking for an application-scoped
//! instance gets the one cached in the application container. Deleting a container closes all
//! shared instances it owns, in reverse build order.
//!
//! ```
//! use scopeline_di::builder::Builder;
//! use scopeline_di::definition::Definition;
//! use scopeline_di::instance_provider::TypedInstanceProvider;
//! use scopeline_di::scope::{APP, REQUEST};
//!
//! let mut builder = Builder::with_default_scopes();
//! builder
//!     .add([
//!         Definition::new(|_| Ok(String::from("postgres://localhost")))
//!             .with_name("url")
//!             .with_scope(APP),
//!         Definition::new(|container| Ok(container.safe_get::<String>("url")?.len()))
//!             .with_name("url_length")
//!             .with_scope(REQUEST),
//!     ])
//!     .unwrap();
//!
//! let app = builder.build();
//! let request = app.sub_container().unwrap();
//! assert_eq!(*request.get::<usize>("url_length"), 20);
//!
//! request.delete().unwrap();
//! app.delete().unwrap();
//! ```

mod resolution;

use crate::container::resolution::{ResolutionGuard, WaitGuard};
use crate::definition::Definition;
use crate::definition_registry::DefinitionRegistry;
use crate::error::{CloseFailure, ContainerError};
use crate::instance_provider::{InstanceAnyPtr, InstanceProvider};
use fxhash::FxHashMap;
use std::fmt::{Debug, Formatter};
use std::mem;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError, Weak};
use std::thread::{self, ThreadId};
use tracing::{debug, warn};

static NEXT_CONTAINER_ID: AtomicU64 = AtomicU64::new(0);

#[derive(Copy, Clone, Eq, PartialEq, Debug, Default)]
enum Lifecycle {
    #[default]
    Open,
    /// Deletion started - new retrievals are rejected, builds in progress are being joined.
    Closing,
    Closed,
}

#[derive(Default)]
struct ContainerState {
    lifecycle: Lifecycle,
    instances: FxHashMap<String, InstanceAnyPtr>,
    build_order: Vec<String>,
    building: FxHashMap<String, ThreadId>,
    unshared_builds: Vec<(String, ThreadId)>,
    children: FxHashMap<u64, Weak<ContainerInner>>,
    unscoped_child: Option<Container>,
}

impl ContainerState {
    fn store(&mut self, name: String, instance: InstanceAnyPtr) {
        self.build_order.push(name.clone());
        self.instances.insert(name, instance);
    }

    fn take_instances(&mut self) -> Vec<(String, InstanceAnyPtr)> {
        let mut instances = mem::take(&mut self.instances);
        mem::take(&mut self.build_order)
            .into_iter()
            .filter_map(|name| instances.remove(&name).map(|instance| (name, instance)))
            .collect()
    }

    fn open_children(&mut self) -> usize {
        self.children.retain(|_, child| child.strong_count() > 0);
        self.children.len()
    }

    /// Returns any build in progress on a thread other than the given one.
    fn foreign_build(&self, thread: ThreadId) -> Option<(String, ThreadId)> {
        self.building
            .iter()
            .chain(self.unshared_builds.iter().map(|(name, builder)| (name, builder)))
            .find(|(_, builder)| **builder != thread)
            .map(|(name, builder)| (name.clone(), *builder))
    }
}

/// Link to the parent container. Private sub-containers created by unscoped retrievals are owned
/// by their parent, so they refer back to it weakly.
enum ParentLink {
    Strong(Container),
    Weak(Weak<ContainerInner>),
}

impl ParentLink {
    fn upgrade(&self) -> Option<Container> {
        match self {
            Self::Strong(parent) => Some(parent.clone()),
            Self::Weak(parent) => parent.upgrade().map(|inner| Container { inner }),
        }
    }
}

struct ContainerInner {
    id: u64,
    scope_index: usize,
    registry: Arc<DefinitionRegistry>,
    parent: Option<ParentLink>,
    state: Mutex<ContainerState>,
    build_finished: Condvar,
}

impl Drop for ContainerInner {
    fn drop(&mut self) {
        let state = self
            .state
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner);

        // the private chain closes first
        drop(state.unscoped_child.take());

        if state.lifecycle == Lifecycle::Closed {
            return;
        }

        state.lifecycle = Lifecycle::Closed;
        let instances = state.take_instances();

        if !instances.is_empty() {
            warn!(
                scope = self.registry.scopes().name(self.scope_index),
                count = instances.len(),
                "Container dropped without being deleted - closing its instances"
            );
        }

        close_instances(&self.registry, instances);

        if let Some(parent) = self.parent.as_ref().and_then(ParentLink::upgrade) {
            detach(&parent, self.id);
        }
    }
}

/// Dependency injection container bound to a single scope. Cloning a container is cheap and
/// yields another handle to the same container.
#[derive(Clone)]
pub struct Container {
    inner: Arc<ContainerInner>,
}

impl Debug for Container {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Container")
            .field("id", &self.inner.id)
            .field("scope", &self.scope())
            .field("closed", &self.is_closed())
            .finish()
    }
}

impl Container {
    pub(crate) fn root(
        registry: Arc<DefinitionRegistry>,
        instances: Vec<(String, InstanceAnyPtr)>,
    ) -> Self {
        let mut state = ContainerState::default();
        for (name, instance) in instances {
            state.store(name, instance);
        }

        Self::create(registry, 0, None, state)
    }

    fn create(
        registry: Arc<DefinitionRegistry>,
        scope_index: usize,
        parent: Option<ParentLink>,
        state: ContainerState,
    ) -> Self {
        Self {
            inner: Arc::new(ContainerInner {
                id: NEXT_CONTAINER_ID.fetch_add(1, Ordering::Relaxed),
                scope_index,
                registry,
                parent,
                state: Mutex::new(state),
                build_finished: Condvar::new(),
            }),
        }
    }

    /// Returns the scope of this container.
    #[inline]
    pub fn scope(&self) -> &str {
        self.scopes()[self.inner.scope_index].as_str()
    }

    /// Returns all declared scopes, from the most generic one.
    #[inline]
    pub fn scopes(&self) -> &[String] {
        self.inner.registry.scopes().as_slice()
    }

    /// Returns scopes more generic than the scope of this container.
    #[inline]
    pub fn parent_scopes(&self) -> &[String] {
        self.inner.registry.scopes().parents_of(self.inner.scope_index)
    }

    /// Returns scopes more specific than the scope of this container.
    #[inline]
    pub fn sub_scopes(&self) -> &[String] {
        self.inner
            .registry
            .scopes()
            .children_of(self.inner.scope_index)
    }

    /// Returns the parent container, if this is not the root. The parent of a private
    /// sub-container created by an unscoped retrieval is not kept alive by it, and is not returned
    /// once dropped.
    #[inline]
    pub fn parent(&self) -> Option<Container> {
        self.inner.parent.as_ref().and_then(ParentLink::upgrade)
    }

    /// Checks if there's a definition with given name.
    #[inline]
    pub fn is_defined(&self, name: &str) -> bool {
        self.inner.registry.is_defined(name)
    }

    /// Returns true if the container has been deleted (or is being deleted). A closed container
    /// rejects all operations.
    pub fn is_closed(&self) -> bool {
        self.lock_state().lifecycle != Lifecycle::Open
    }

    /// Creates a new container in the next more specific scope, with this container as parent.
    pub fn sub_container(&self) -> Result<Container, ContainerError> {
        let mut state = self.lock_state();
        self.create_child(&mut state, false)
    }

    /// Deletes the private sub-containers created by unscoped retrievals, closing their instances.
    /// This container stays usable.
    pub fn clean(&self) -> Result<(), ContainerError> {
        let child = self.lock_state().unscoped_child.take();
        match child.map(|child| child.delete_with_sub_containers()) {
            None | Some(Ok(())) | Some(Err(ContainerError::ContainerClosed)) => Ok(()),
            Some(Err(error)) => Err(error),
        }
    }

    /// Closes all instances owned by this container and marks it as closed. Fails if there are
    /// sub-containers which have not been deleted yet. Close failures don't stop the teardown -
    /// they are reported together once all instances have been closed.
    ///
    /// Builds in progress on other threads are joined first. If one of them waits for a build owned
    /// by the calling thread, the container stays open and
    /// [ContainerError::CyclicDependency] is returned.
    pub fn delete(&self) -> Result<(), ContainerError> {
        let failures = self.teardown()?;
        if failures.is_empty() {
            Ok(())
        } else {
            Err(ContainerError::Teardown(failures))
        }
    }

    /// Deletes all sub-containers and then this container. Sub-containers get deleted even if
    /// they are still in use elsewhere, which makes further use of them fail.
    pub fn delete_with_sub_containers(&self) -> Result<(), ContainerError> {
        let children: Vec<Container> = self
            .lock_state()
            .children
            .values()
            .filter_map(Weak::upgrade)
            .map(|inner| Container { inner })
            .collect();

        let mut failures = Vec::new();
        for child in children {
            match child.delete_with_sub_containers() {
                Ok(()) | Err(ContainerError::ContainerClosed) => {}
                Err(ContainerError::Teardown(child_failures)) => failures.extend(child_failures),
                Err(error) => return Err(error),
            }
        }

        failures.extend(self.teardown()?);
        if failures.is_empty() {
            Ok(())
        } else {
            Err(ContainerError::Teardown(failures))
        }
    }

    #[inline]
    fn lock_state(&self) -> MutexGuard<'_, ContainerState> {
        self.inner
            .state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn create_child(
        &self,
        state: &mut ContainerState,
        unscoped: bool,
    ) -> Result<Container, ContainerError> {
        if state.lifecycle != Lifecycle::Open {
            return Err(ContainerError::ContainerClosed);
        }

        let scope_index = self.inner.scope_index + 1;
        if scope_index >= self.scopes().len() {
            return Err(ContainerError::NoDeeperScope(self.scope().to_string()));
        }

        let parent = if unscoped {
            ParentLink::Weak(Arc::downgrade(&self.inner))
        } else {
            ParentLink::Strong(self.clone())
        };

        let child = Self::create(
            self.inner.registry.clone(),
            scope_index,
            Some(parent),
            Default::default(),
        );
        state
            .children
            .insert(child.inner.id, Arc::downgrade(&child.inner));

        debug!(
            parent_scope = self.scope(),
            scope = child.scope(),
            "Created sub-container"
        );

        Ok(child)
    }

    fn teardown(&self) -> Result<Vec<CloseFailure>, ContainerError> {
        let instances = {
            let mut state = self.lock_state();
            if state.lifecycle != Lifecycle::Open {
                return Err(ContainerError::ContainerClosed);
            }

            let children = state.open_children();
            if children > 0 {
                return Err(ContainerError::HasChildren(children));
            }

            state.lifecycle = Lifecycle::Closing;

            let thread = thread::current().id();
            while let Some((name, builder)) = state.foreign_build(thread) {
                let wait = match WaitGuard::enter(&name, builder) {
                    Ok(wait) => wait,
                    Err(error) => {
                        state.lifecycle = Lifecycle::Open;
                        drop(state);

                        self.inner.build_finished.notify_all();
                        return Err(error);
                    }
                };

                state = self
                    .inner
                    .build_finished
                    .wait(state)
                    .unwrap_or_else(PoisonError::into_inner);
                drop(wait);
            }

            state.lifecycle = Lifecycle::Closed;
            state.take_instances()
        };

        if let Some(parent) = self.parent() {
            detach(&parent, self.inner.id);
        }

        debug!(
            scope = self.scope(),
            count = instances.len(),
            "Deleting container"
        );

        Ok(close_instances(&self.inner.registry, instances))
    }

    fn definition(&self, name: &str) -> Result<&Definition, ContainerError> {
        self.inner
            .registry
            .definition(name)
            .ok_or_else(|| ContainerError::UnknownDefinition(name.to_string()))
    }

    fn ensure_open(&self) -> Result<(), ContainerError> {
        if self.is_closed() {
            Err(ContainerError::ContainerClosed)
        } else {
            Ok(())
        }
    }

    /// Position of the scope owning instances of given definition.
    fn owner_scope_index(&self, definition: &Definition) -> usize {
        definition
            .scope
            .as_deref()
            .and_then(|scope| self.inner.registry.scopes().index_of(scope))
            .unwrap_or(self.inner.scope_index)
    }

    fn owner(&self, definition: &Definition) -> Result<Container, ContainerError> {
        let scope_index = self.owner_scope_index(definition);
        let scope_mismatch = || ContainerError::ScopeMismatch {
            name: definition.name.clone(),
            scope: definition.scope.clone().unwrap_or_default(),
            container_scope: self.scope().to_string(),
        };

        if scope_index > self.inner.scope_index {
            return Err(scope_mismatch());
        }

        let mut owner = self.clone();
        while owner.inner.scope_index > scope_index {
            let parent = match &owner.inner.parent {
                Some(parent) => parent.upgrade().ok_or(ContainerError::ContainerClosed)?,
                None => return Err(scope_mismatch()),
            };

            owner = parent;
        }

        Ok(owner)
    }

    fn unscoped_child(&self) -> Result<Container, ContainerError> {
        let mut state = self.lock_state();
        if let Some(child) = &state.unscoped_child {
            return Ok(child.clone());
        }

        let child = self.create_child(&mut state, true)?;
        state.unscoped_child = Some(child.clone());
        Ok(child)
    }

    fn resolve(&self, definition: &Definition) -> Result<InstanceAnyPtr, ContainerError> {
        let _resolution = ResolutionGuard::enter(self.inner.id, &definition.name)?;

        if definition.unshared {
            return self.resolve_unshared(definition);
        }

        let name = definition.name.as_str();
        let thread = thread::current().id();

        let pending = {
            let mut state = self.lock_state();
            if state.lifecycle != Lifecycle::Open {
                return Err(ContainerError::ContainerClosed);
            }

            loop {
                if let Some(instance) = state.instances.get(name) {
                    return Ok(instance.clone());
                }

                match state.building.get(name).copied() {
                    None => break,
                    Some(builder) if builder == thread => {
                        return Err(ContainerError::CyclicDependency(name.to_string()));
                    }
                    Some(builder) => {
                        let _wait = WaitGuard::enter(name, builder)?;
                        state = self
                            .inner
                            .build_finished
                            .wait(state)
                            .unwrap_or_else(PoisonError::into_inner);
                    }
                }

                if state.lifecycle == Lifecycle::Closed {
                    return Err(ContainerError::ContainerClosed);
                }
            }

            state.building.insert(name.to_string(), thread);
            PendingBuild {
                container: self,
                name,
                shared: true,
                thread,
                finished: false,
            }
        };

        let instance = self.build(definition)?;
        pending.finish(instance)
    }

    fn resolve_unshared(&self, definition: &Definition) -> Result<InstanceAnyPtr, ContainerError> {
        let thread = thread::current().id();
        let _pending = {
            let mut state = self.lock_state();
            if state.lifecycle != Lifecycle::Open {
                return Err(ContainerError::ContainerClosed);
            }

            state
                .unshared_builds
                .push((definition.name.clone(), thread));
            PendingBuild {
                container: self,
                name: &definition.name,
                shared: false,
                thread,
                finished: false,
            }
        };

        self.build(definition)
    }

    fn build(&self, definition: &Definition) -> Result<InstanceAnyPtr, ContainerError> {
        debug!(
            name = definition.name.as_str(),
            scope = self.scope(),
            unshared = definition.unshared,
            "Building instance"
        );

        (definition.build)(self).map_err(|error| {
            if let Some(cycle @ ContainerError::CyclicDependency(_)) =
                error.downcast_ref::<ContainerError>()
            {
                return cycle.clone();
            }

            ContainerError::Construction {
                name: definition.name.clone(),
                source: error,
            }
        })
    }
}

impl InstanceProvider for Container {
    fn safe_get_any(&self, name: &str) -> Result<InstanceAnyPtr, ContainerError> {
        self.ensure_open()?;

        let definition = self.definition(name)?;
        self.owner(definition)?.resolve(definition)
    }

    fn unscoped_safe_get_any(&self, name: &str) -> Result<InstanceAnyPtr, ContainerError> {
        self.ensure_open()?;

        let definition = self.definition(name)?;
        if self.owner_scope_index(definition) <= self.inner.scope_index {
            return self.owner(definition)?.resolve(definition);
        }

        self.unscoped_child()?.unscoped_safe_get_any(name)
    }
}

/// A build registered in the container state. Dropping it without finishing (on build error or
/// panic) unregisters the build and wakes up waiting threads.
struct PendingBuild<'a> {
    container: &'a Container,
    name: &'a str,
    shared: bool,
    thread: ThreadId,
    finished: bool,
}

impl PendingBuild<'_> {
    fn finish(mut self, instance: InstanceAnyPtr) -> Result<InstanceAnyPtr, ContainerError> {
        let stored = {
            let mut state = self.container.lock_state();
            self.unregister(&mut state);

            let stored = state.lifecycle != Lifecycle::Closed;
            if stored && self.shared {
                state.store(self.name.to_string(), instance.clone());
            }

            stored
        };

        self.finished = true;
        self.container.inner.build_finished.notify_all();

        if stored {
            Ok(instance)
        } else {
            // the container got deleted by the building thread itself
            if self.shared {
                close_instances(
                    &self.container.inner.registry,
                    vec![(self.name.to_string(), instance)],
                );
            }

            Err(ContainerError::ContainerClosed)
        }
    }

    fn unregister(&self, state: &mut ContainerState) {
        if self.shared {
            state.building.remove(self.name);
        } else if let Some(index) = state
            .unshared_builds
            .iter()
            .position(|(name, builder)| *builder == self.thread && name == self.name)
        {
            state.unshared_builds.swap_remove(index);
        }
    }
}

impl Drop for PendingBuild<'_> {
    fn drop(&mut self) {
        if self.finished {
            return;
        }

        self.unregister(&mut self.container.lock_state());
        self.container.inner.build_finished.notify_all();
    }
}

fn detach(parent: &Container, id: u64) {
    let unscoped_child = {
        let mut state = parent.lock_state();
        state.children.remove(&id);

        let is_unscoped_child = state
            .unscoped_child
            .as_ref()
            .map_or(false, |child| child.inner.id == id);

        if is_unscoped_child {
            state.unscoped_child.take()
        } else {
            None
        }
    };

    drop(unscoped_child);
}

fn close_instances(
    registry: &DefinitionRegistry,
    instances: Vec<(String, InstanceAnyPtr)>,
) -> Vec<CloseFailure> {
    instances
        .into_iter()
        .rev()
        .filter_map(|(name, instance)| {
            let close = registry.definition(&name)?.close.clone()?;

            debug!(name = name.as_str(), "Closing instance");
            close(&name, instance).err().map(|error| {
                warn!(name = name.as_str(), %error, "Error closing instance");
                CloseFailure { name, error }
            })
        })
        .collect()
}
