// SPDX-License-Identifier: LGPL-2.1-or-later
// See Notices.txt for copyright information

use crate::config::PrecisionPolicy;
use rand::RngCore;
use rand::SeedableRng;
use rand_pcg::Pcg64Mcg;
use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::fmt;
use std::hash::Hash;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

/// the id handed to the first real number of every registry
pub const FIRST_ID: u64 = 2147483659;

const DEFAULT_SEED: u64 = 0x853c_49e6_748f_ea9b;

/// tables are swept for dead entries whenever their size reaches a multiple of this
const SWEEP_INTERVAL: usize = 256;

type Tables = HashMap<TypeId, Box<dyn Any + Send>>;

struct RegistryInner {
    next_id: AtomicU64,
    policy: PrecisionPolicy,
    seeds: Mutex<Pcg64Mcg>,
    tables: Mutex<Tables>,
}

#[derive(Clone)]
pub struct Registry(Arc<RegistryInner>);

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl Registry {
    /// a registry with the environment's precision policy
    pub fn new() -> Self {
        Self::with_policy(PrecisionPolicy::from_env())
    }
    pub fn with_policy(policy: PrecisionPolicy) -> Self {
        Self::with_policy_and_seed(policy, DEFAULT_SEED)
    }
    /// `seed` determines the sequence of seeds handed out to fresh random numbers
    pub fn with_policy_and_seed(policy: PrecisionPolicy, seed: u64) -> Self {
        Registry(Arc::new(RegistryInner {
            next_id: AtomicU64::new(FIRST_ID),
            policy,
            seeds: Mutex::new(Pcg64Mcg::seed_from_u64(seed)),
            tables: Mutex::new(HashMap::new()),
        }))
    }
    pub fn policy(&self) -> &PrecisionPolicy {
        &self.0.policy
    }
    pub fn ptr_eq(&self, other: &Registry) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
    pub(crate) fn next_id(&self) -> u64 {
        self.0.next_id.fetch_add(1, Ordering::Relaxed)
    }
    pub(crate) fn next_seed(&self) -> u64 {
        lock(&self.0.seeds).next_u64()
    }
    /// returns the live object stored under `key`, or stores and returns `create()`.
    ///
    /// `create` runs with the table locked and must not intern anything itself.
    pub(crate) fn intern<K, V, F>(&self, key: K, create: F) -> Arc<V>
    where
        K: Hash + Eq + Send + 'static,
        V: Send + Sync + 'static,
        F: FnOnce() -> Arc<V>,
    {
        let mut tables = lock(&self.0.tables);
        let table = tables
            .entry(TypeId::of::<(K, V)>())
            .or_insert_with(|| Box::new(HashMap::<K, Weak<V>>::new()));
        let table = match table.downcast_mut::<HashMap<K, Weak<V>>>() {
            Some(table) => table,
            None => return create(),
        };
        if let Some(existing) = table.get(&key).and_then(Weak::upgrade) {
            return existing;
        }
        let created = create();
        table.insert(key, Arc::downgrade(&created));
        if table.len() % SWEEP_INTERVAL == 0 {
            table.retain(|_, value| value.strong_count() > 0);
        }
        created
    }
    /// the live object stored under `key`, if any
    pub(crate) fn lookup<K, V>(&self, key: &K) -> Option<Arc<V>>
    where
        K: Hash + Eq + Send + 'static,
        V: Send + Sync + 'static,
    {
        let tables = lock(&self.0.tables);
        tables
            .get(&TypeId::of::<(K, V)>())?
            .downcast_ref::<HashMap<K, Weak<V>>>()?
            .get(key)?
            .upgrade()
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

impl PartialEq for Registry {
    fn eq(&self, other: &Registry) -> bool {
        self.ptr_eq(other)
    }
}

impl Eq for Registry {}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("Registry")
            .field("next_id", &self.0.next_id.load(Ordering::Relaxed))
            .field("policy", &self.0.policy)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_intern() {
        let registry = Registry::new();
        let first = registry.intern("a".to_string(), || Arc::new(1u32));
        let second = registry.intern("a".to_string(), || Arc::new(2u32));
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(*second, 1);
        let other = registry.intern("b".to_string(), || Arc::new(3u32));
        assert_eq!(*other, 3);
        // a different value type is a different table
        let text = registry.intern("a".to_string(), || Arc::new("text"));
        assert_eq!(*text, "text");
        assert_eq!(
            registry.lookup::<String, u32>(&"a".to_string()).as_deref(),
            Some(&1)
        );
    }

    #[test]
    fn test_dead_entries_are_replaced() {
        let registry = Registry::new();
        drop(registry.intern(1u64, || Arc::new(1u32)));
        assert!(registry.lookup::<u64, u32>(&1).is_none());
        let replacement = registry.intern(1u64, || Arc::new(2u32));
        assert_eq!(*replacement, 2);
    }

    #[test]
    fn test_registries_are_independent() {
        let a = Registry::new();
        let b = Registry::new();
        let x = a.intern(0u8, || Arc::new(1u32));
        let y = b.intern(0u8, || Arc::new(2u32));
        assert!(!Arc::ptr_eq(&x, &y));
        assert!(a != b);
        assert!(a == a.clone());
        assert_eq!(a.next_id(), FIRST_ID);
        assert_eq!(a.next_id(), FIRST_ID + 1);
        assert_eq!(b.next_id(), FIRST_ID);
    }

    #[test]
    fn test_seeds_are_reproducible() {
        let policy = PrecisionPolicy::default();
        let a = Registry::with_policy_and_seed(policy, 7);
        let b = Registry::with_policy_and_seed(policy, 7);
        assert_eq!(a.next_seed(), b.next_seed());
        assert_ne!(a.next_seed(), a.next_seed());
    }
}
