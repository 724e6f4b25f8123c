// Copyright 2026 shutter Project Authors
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use std::{fmt::Debug, sync::Arc};

use ordered_hash_map::OrderedHashMap;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use shutter_common::code::{Key, Value};

/// The weighter for the in-memory cache.
///
/// The weighter is used to calculate the charge of a cache entry, in bytes.
pub trait Weighter<K, V>: Fn(&K, &V) -> usize + Send + Sync + 'static {}
impl<K, V, T> Weighter<K, V> for T where T: Fn(&K, &V) -> usize + Send + Sync + 'static {}

/// Counters of the in-memory cache.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemoryStats {
    /// Lookups answered from the cache.
    pub hits: u64,
    /// Lookups not answered from the cache.
    pub misses: u64,
    /// Entries inserted or replaced.
    pub insertions: u64,
    /// Entries removed by capacity pressure.
    pub evictions: u64,
}

struct CacheEntry<V> {
    value: V,
    charge: usize,
}

/// State guarded by the cache mutex.
///
/// The LRU order map and the charge ledger only mutate together, under one
/// lock, so the order can never reference a removed key and a charge can
/// never be counted twice.
struct CacheState<K, V>
where
    K: Key,
    V: Value,
{
    // Front is the least recently used end.
    entries: OrderedHashMap<K, CacheEntry<V>>,
    charge: usize,
    stats: MemoryStats,
}

struct Shared<K, V>
where
    K: Key,
    V: Value,
{
    state: Mutex<CacheState<K, V>>,
    capacity: usize,
    charge_capacity: Option<usize>,
    weighter: Box<dyn Fn(&K, &V) -> usize + Send + Sync>,
}

/// In-memory LRU cache.
///
/// Cheaply clonable handle; clones share the same entries. All operations
/// are synchronous, serialized behind a single mutex, and infallible: a
/// cache is allowed to not contain an entry.
pub struct MemoryCache<K, V>
where
    K: Key,
    V: Value,
{
    shared: Arc<Shared<K, V>>,
}

impl<K, V> Debug for MemoryCache<K, V>
where
    K: Key,
    V: Value,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryCache")
            .field("capacity", &self.shared.capacity)
            .field("charge_capacity", &self.shared.charge_capacity)
            .finish()
    }
}

impl<K, V> Clone for MemoryCache<K, V>
where
    K: Key,
    V: Value,
{
    fn clone(&self) -> Self {
        Self {
            shared: self.shared.clone(),
        }
    }
}

impl<K, V> MemoryCache<K, V>
where
    K: Key,
    V: Value,
{
    /// Get the cached value for `key` and promote the entry to most
    /// recently used. A miss has no side effect besides the counter.
    pub fn get(&self, key: &K) -> Option<V> {
        let mut state = self.shared.state.lock();
        match state.entries.remove(key) {
            Some(entry) => {
                let value = entry.value.clone();
                // Re-link under the owned key to move it to the MRU end.
                state.entries.insert(key.clone(), entry);
                state.stats.hits += 1;
                Some(value)
            }
            None => {
                state.stats.misses += 1;
                None
            }
        }
    }

    /// Whether `key` is cached, without promoting it.
    pub fn contains(&self, key: &K) -> bool {
        self.shared.state.lock().entries.contains_key(key)
    }

    /// Insert or replace the entry for `key`.
    ///
    /// Insertion always succeeds. If the cache then exceeds its entry or
    /// charge budget, least recently used entries are evicted until it is
    /// back under budget. A lone entry larger than the whole charge budget
    /// is still admitted; it becomes the next eviction victim instead.
    pub fn insert(&self, key: K, value: V) {
        let charge = (self.shared.weighter)(&key, &value);

        let mut state = self.shared.state.lock();
        if let Some(old) = state.entries.remove(&key) {
            state.charge -= old.charge;
        }
        state.entries.insert(key, CacheEntry { value, charge });
        state.charge += charge;
        state.stats.insertions += 1;

        self.evict(&mut state);
    }

    /// Remove the entry for `key`.
    pub fn remove(&self, key: &K) -> Option<V> {
        let mut state = self.shared.state.lock();
        let entry = state.entries.remove(key)?;
        state.charge -= entry.charge;
        Some(entry.value)
    }

    /// Remove every entry whose key satisfies `pred` and return how many
    /// were removed.
    ///
    /// This is a filtered scan over the key set; group removal is not a hot
    /// path.
    pub fn remove_matching(&self, pred: impl Fn(&K) -> bool) -> usize {
        let mut state = self.shared.state.lock();
        let victims: Vec<K> = state
            .entries
            .iter()
            .filter(|&(k, _)| pred(k))
            .map(|(k, _)| k.clone())
            .collect();
        for key in &victims {
            if let Some(entry) = state.entries.remove(key) {
                state.charge -= entry.charge;
            }
        }
        victims.len()
    }

    /// Clear every entry unconditionally.
    pub fn clear(&self) {
        let mut state = self.shared.state.lock();
        state.entries.clear();
        state.charge = 0;
    }

    /// Up to `n` cached keys, ordered from least to most recently used.
    ///
    /// Diagnostic surface; lets callers verify LRU ordering without
    /// depending on the internal structure.
    pub fn least_recently_used(&self, n: usize) -> Vec<K> {
        let state = self.shared.state.lock();
        state.entries.iter().take(n).map(|(k, _)| k.clone()).collect()
    }

    /// Number of cached entries.
    pub fn len(&self) -> usize {
        self.shared.state.lock().entries.len()
    }

    /// Whether the cache is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Total charge of the cached entries, in bytes.
    pub fn charge(&self) -> usize {
        self.shared.state.lock().charge
    }

    /// Entry-count budget.
    pub fn capacity(&self) -> usize {
        self.shared.capacity
    }

    /// Charge budget, if configured.
    pub fn charge_capacity(&self) -> Option<usize> {
        self.shared.charge_capacity
    }

    /// Snapshot of the cache counters.
    pub fn stats(&self) -> MemoryStats {
        self.shared.state.lock().stats
    }

    fn over_budget(&self, state: &CacheState<K, V>) -> bool {
        if state.entries.len() > self.shared.capacity {
            return true;
        }
        match self.shared.charge_capacity {
            Some(limit) => state.charge > limit,
            None => false,
        }
    }

    fn evict(&self, state: &mut CacheState<K, V>) {
        let mut evicted = 0usize;
        // Leave the last entry in place even when it alone exceeds the
        // charge budget.
        while self.over_budget(state) && state.entries.len() > 1 {
            let Some(victim) = state.entries.iter().next().map(|(k, _)| k.clone()) else {
                break;
            };
            if let Some(entry) = state.entries.remove(&victim) {
                state.charge -= entry.charge;
                state.stats.evictions += 1;
                evicted += 1;
            }
        }
        if evicted > 0 {
            tracing::debug!(
                evicted,
                len = state.entries.len(),
                charge = state.charge,
                "memory cache eviction"
            );
        }
    }
}

/// Builder of [`MemoryCache`].
pub struct MemoryCacheBuilder<K, V>
where
    K: Key,
    V: Value,
{
    capacity: usize,
    charge_capacity: Option<usize>,
    weighter: Box<dyn Fn(&K, &V) -> usize + Send + Sync>,
}

impl<K, V> MemoryCacheBuilder<K, V>
where
    K: Key,
    V: Value,
{
    /// Create a builder with the entry-count budget.
    ///
    /// # Panics
    ///
    /// Panics if `capacity` is zero.
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "memory cache capacity must be non-zero");
        Self {
            capacity,
            charge_capacity: None,
            weighter: Box::new(|_, _| 1),
        }
    }

    /// Also bound the cache by total entry charge, in bytes.
    pub fn with_charge_capacity(mut self, charge_capacity: usize) -> Self {
        self.charge_capacity = Some(charge_capacity);
        self
    }

    /// Set the weighter computing each entry's charge.
    ///
    /// The default weighter charges every entry `1`.
    pub fn with_weighter(mut self, weighter: impl Weighter<K, V>) -> Self {
        self.weighter = Box::new(weighter);
        self
    }

    /// Build the cache.
    pub fn build(self) -> MemoryCache<K, V> {
        MemoryCache {
            shared: Arc::new(Shared {
                state: Mutex::new(CacheState {
                    entries: OrderedHashMap::with_capacity(self.capacity),
                    charge: 0,
                    stats: MemoryStats::default(),
                }),
                capacity: self.capacity,
                charge_capacity: self.charge_capacity,
                weighter: self.weighter,
            }),
        }
    }
}
