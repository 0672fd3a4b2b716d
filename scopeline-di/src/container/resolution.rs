//! Bookkeeping of builds in progress, used to detect dependency cycles.
//!
//! Cycles within a single thread are found with a thread-local set of the (container, name) pairs
//! currently being resolved. Cycles spanning threads (one thread waiting for a build owned by
//! another one, which in turn waits for the first) are found with a global wait-for graph.

use crate::error::ContainerError;
use fxhash::{FxHashMap, FxHashSet};
use once_cell::sync::Lazy;
use std::cell::RefCell;
use std::sync::{Mutex, PoisonError};
use std::thread::{self, ThreadId};

thread_local! {
    static RESOLVING: RefCell<FxHashSet<ResolutionKey>> = RefCell::new(FxHashSet::default());
}

static WAITING_FOR: Lazy<Mutex<FxHashMap<ThreadId, ThreadId>>> = Lazy::new(Default::default);

#[derive(Clone, Eq, PartialEq, Hash, Debug)]
struct ResolutionKey {
    container: u64,
    name: String,
}

/// Marks a name as being resolved in a given container by the current thread, for as long as the
/// guard lives.
pub(super) struct ResolutionGuard {
    key: ResolutionKey,
}

impl ResolutionGuard {
    pub(super) fn enter(container: u64, name: &str) -> Result<Self, ContainerError> {
        let key = ResolutionKey {
            container,
            name: name.to_string(),
        };

        RESOLVING.with(|resolving| {
            if resolving.borrow_mut().insert(key.clone()) {
                Ok(Self { key })
            } else {
                Err(ContainerError::CyclicDependency(name.to_string()))
            }
        })
    }
}

impl Drop for ResolutionGuard {
    fn drop(&mut self) {
        RESOLVING.with(|resolving| {
            resolving.borrow_mut().remove(&self.key);
        });
    }
}

/// Records that the current thread waits for a build owned by `builder`, for as long as the guard
/// lives.
pub(super) struct WaitGuard {
    thread: ThreadId,
}

impl WaitGuard {
    pub(super) fn enter(name: &str, builder: ThreadId) -> Result<Self, ContainerError> {
        let thread = thread::current().id();
        let mut waiting_for = WAITING_FOR.lock().unwrap_or_else(PoisonError::into_inner);

        let mut next = Some(builder);
        while let Some(waited) = next {
            if waited == thread {
                return Err(ContainerError::CyclicDependency(name.to_string()));
            }

            next = waiting_for.get(&waited).copied();
        }

        waiting_for.insert(thread, builder);
        Ok(Self { thread })
    }
}

impl Drop for WaitGuard {
    fn drop(&mut self) {
        WAITING_FOR
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&self.thread);
    }
}
