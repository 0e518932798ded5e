/// Generic keyed owning cache for one GPU object kind
///
/// The registry holds one reference per entry. Objects are released when
/// their entry is removed or replaced, or when the registry is dropped,
/// each exactly once.

use std::borrow::Borrow;
use std::fmt::Debug;
use std::hash::Hash;
use rustc_hash::FxHashMap;
use crate::error::{Error, Result};
use crate::{engine_trace, engine_warn};

pub struct ResourceRegistry<K, R> {
    /// Object kind, used in log messages (e.g. "pipeline")
    kind: &'static str,
    entries: FxHashMap<K, R>,
}

impl<K, R> ResourceRegistry<K, R>
where
    K: Eq + Hash + Clone + Debug,
    R: Clone,
{
    /// Create an empty registry
    pub fn new(kind: &'static str) -> Self {
        Self {
            kind,
            entries: FxHashMap::default(),
        }
    }

    /// Create an object with `create` and store it under `key`
    ///
    /// Creation errors are propagated and leave the registry unchanged.
    /// An existing entry under `key` is replaced and released.
    pub fn add<F>(&mut self, key: K, create: F) -> Result<R>
    where
        F: FnOnce() -> Result<R>,
    {
        let resource = create()?;
        self.insert(key, resource.clone());
        Ok(resource)
    }

    /// Store an already created object under `key`
    ///
    /// Returns the replaced object, if any.
    pub fn insert(&mut self, key: K, resource: R) -> Option<R> {
        engine_trace!("umbra::ResourceRegistry", "Registered {} {:?}", self.kind, key);
        let previous = self.entries.insert(key.clone(), resource);
        if previous.is_some() {
            engine_warn!("umbra::ResourceRegistry",
                "{} {:?} registered twice, previous object released", self.kind, key);
        }
        previous
    }

    /// Get the object stored under `key`
    pub fn get<Q>(&self, key: &Q) -> Option<&R>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.entries.get(key)
    }

    /// Get the object stored under `key`, or an `InvalidResource` error
    pub fn require<Q>(&self, key: &Q) -> Result<&R>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + Debug + ?Sized,
    {
        self.entries.get(key).ok_or_else(|| {
            engine_warn!("umbra::ResourceRegistry", "{} {:?} not registered", self.kind, key);
            Error::InvalidResource(format!("{} {:?} not registered", self.kind, key))
        })
    }

    /// Whether `key` is registered
    pub fn present<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.entries.contains_key(key)
    }

    /// Remove and return the object stored under `key`
    pub fn remove<Q>(&mut self, key: &Q) -> Option<R>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.entries.remove(key)
    }

    /// Number of entries
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// All registered keys (unordered)
    pub fn keys(&self) -> Vec<&K> {
        self.entries.keys().collect()
    }

    /// Release every entry
    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

#[cfg(test)]
#[path = "resource_registry_tests.rs"]
mod tests;
