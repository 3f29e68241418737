//! Keyed memoization for derived views over store snapshots.

use std::{collections::HashMap, hash::Hash, rc::Rc};

use crate::{collection::EntityCollection, entities::EntityId, model::ClientConfig};

/// A selector input that can tell whether it changed since a previous snapshot.
pub trait Dependency {
    fn unchanged(&self, previous: &Self) -> bool;
}

impl<E> Dependency for EntityCollection<E> {
    fn unchanged(&self, previous: &Self) -> bool {
        self.ptr_eq(previous)
    }
}

impl Dependency for Rc<ClientConfig> {
    fn unchanged(&self, previous: &Self) -> bool {
        Rc::ptr_eq(self, previous)
    }
}

impl Dependency for Option<EntityId> {
    fn unchanged(&self, previous: &Self) -> bool {
        self == previous
    }
}

macro_rules! tuple_dependency {
    ($($name:ident : $idx:tt),+) => {
        impl<$($name: Dependency),+> Dependency for ($($name,)+) {
            fn unchanged(&self, previous: &Self) -> bool {
                true $(&& self.$idx.unchanged(&previous.$idx))+
            }
        }
    };
}

tuple_dependency!(A: 0, B: 1);
tuple_dependency!(A: 0, B: 1, C: 2);
tuple_dependency!(A: 0, B: 1, C: 2, D: 3);
tuple_dependency!(A: 0, B: 1, C: 2, D: 3, F: 4);

/// Caches one derived value per key, recomputed only when its dependencies change.
///
/// All keys are expected to read the same dependencies. A miss caused by changed
/// dependencies evicts every entry computed from the old ones, so the cache never holds more
/// than the keys queried since the last change.
#[derive(Debug)]
pub struct KeyedMemo<K, D, O> {
    entries: HashMap<K, (D, Rc<O>)>,
    hits: u64,
    misses: u64,
}

impl<K, D, O> Default for KeyedMemo<K, D, O> {
    fn default() -> Self {
        Self {
            entries: HashMap::new(),
            hits: 0,
            misses: 0,
        }
    }
}

impl<K: Eq + Hash, D: Dependency, O> KeyedMemo<K, D, O> {
    /// Returns the cached value for `key` when `deps` are unchanged, otherwise computes and stores
    /// a fresh one.
    pub fn get_or_compute(&mut self, key: K, deps: D, compute: impl FnOnce(&D) -> O) -> Rc<O> {
        if let Some((cached_deps, value)) = self.entries.get(&key) {
            if deps.unchanged(cached_deps) {
                self.hits += 1;
                return Rc::clone(value);
            }
        }
        self.misses += 1;
        self.entries.retain(|_, (cached_deps, _)| deps.unchanged(cached_deps));
        let value = Rc::new(compute(&deps));
        self.entries.insert(key, (deps, Rc::clone(&value)));
        value
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// `(hits, misses)` since creation.
    pub fn stats(&self) -> (u64, u64) {
        (self.hits, self.misses)
    }
}
