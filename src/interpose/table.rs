/*!
 * Handle Table
 * Maps opaque caller-visible handles to process-lifetime lock instances
 *
 * # Performance
 * - Sharded map, readers of distinct handles never contend
 * - Resolution of an installed handle is one shard read, no allocation
 */

use crate::core::types::Handle;
use ahash::RandomState;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::fmt;

/// Handle to `&'static T` resolution with create-on-first-use
pub struct HandleTable<T: 'static> {
    entries: DashMap<Handle, &'static T, RandomState>,
}

impl<T: Send + Sync + 'static> HandleTable<T> {
    /// Create an empty table
    pub fn new() -> Self {
        Self {
            entries: DashMap::with_hasher(RandomState::new()),
        }
    }

    /// Instance installed for `handle`, if any
    #[inline]
    pub fn get(&self, handle: Handle) -> Option<&'static T> {
        self.entries.get(&handle).map(|entry| *entry.value())
    }

    /// Instance for `handle`, installing one built by `make` if absent
    ///
    /// Racing first uses of the same handle all get the same instance. A
    /// thread whose candidate lost the race drops it.
    pub fn resolve_or_create<F>(&self, handle: Handle, make: F) -> &'static T
    where
        F: FnOnce() -> T,
    {
        if let Some(existing) = self.get(handle) {
            return existing;
        }

        // Built outside the shard lock
        let candidate = Box::new(make());
        match self.entries.entry(handle) {
            Entry::Occupied(entry) => {
                drop(candidate);
                *entry.get()
            }
            Entry::Vacant(entry) => *entry.insert(Box::leak(candidate)),
        }
    }

    /// Number of installed handles
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no handle has been installed
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<T: Send + Sync + 'static> Default for HandleTable<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: 'static> fmt::Debug for HandleTable<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandleTable")
            .field("len", &self.entries.len())
            .finish()
    }
}
