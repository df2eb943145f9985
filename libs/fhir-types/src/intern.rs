//! Weak-reference interners
//!
//! An [`Interner`] maps a key to one shared instance. The table only holds
//! [`Weak`] references, so a cache entry never keeps a value alive: once the
//! last outside `Arc` is dropped the entry is dead and is transparently rebuilt
//! on the next lookup with an equal key.
//!
//! Element tables ([`ValueInterner`]) are keyed by the structural digest of the
//! value rather than by a copy of it. A dead entry is then just 32 bytes and a
//! weak pointer; it holds nothing of the value's children.
//!
//! ## Concurrency
//!
//! Tables are [`DashMap`]s. A miss takes the shard write lock through the
//! entry API and builds the value while holding it, so when two threads race
//! on an equal key exactly one value is created and both observe it.
//!
//! ## Reclamation
//!
//! Dead entries are swept once the table grows past a threshold; after each
//! sweep the next threshold is twice the number of live entries (but never
//! below the configured minimum).

use crate::config::TypesConfig;
use crate::hash::Hash as Digest;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::hash::Hash;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Weak};

/// Interner for shared strings such as extension URLs.
pub type StringInterner = Interner<Box<str>, str>;

/// Interner for element values, keyed by their structural digest.
pub type ValueInterner<V> = Interner<Digest, V>;

/// Hit/miss counters of one interner.
#[derive(Debug, Default)]
struct InternerStatistics {
    hits: AtomicU64,
    misses: AtomicU64,
    sweeps: AtomicU64,
    evicted: AtomicU64,
}

/// A point-in-time snapshot of interner statistics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InternerStats {
    pub name: &'static str,
    pub hits: u64,
    pub misses: u64,
    pub sweeps: u64,
    pub evicted: u64,
    /// Table entries including dead ones not yet swept.
    pub entries: usize,
}

pub struct Interner<K, V: ?Sized> {
    name: &'static str,
    table: DashMap<K, Weak<V>>,
    enabled: bool,
    min_sweep: usize,
    /// Approximate table length, reset by each sweep.
    entries: AtomicUsize,
    next_sweep: AtomicUsize,
    sweeping: AtomicBool,
    stats: InternerStatistics,
}

impl<K, V: ?Sized> std::fmt::Debug for Interner<K, V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Interner")
            .field("name", &self.name)
            .field("enabled", &self.enabled)
            .field("entries", &self.entries.load(Ordering::Relaxed))
            .finish_non_exhaustive()
    }
}

impl<K: Eq + Hash, V: ?Sized> Interner<K, V> {
    pub fn new(name: &'static str, config: &TypesConfig) -> Self {
        let min_sweep = config.sweep_threshold.max(1);
        Self {
            name,
            table: DashMap::with_capacity(config.initial_capacity),
            enabled: config.interning,
            min_sweep,
            entries: AtomicUsize::new(0),
            next_sweep: AtomicUsize::new(min_sweep),
            sweeping: AtomicBool::new(false),
            stats: InternerStatistics::default(),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Return the live instance for `key`, creating it with `create` on a miss.
    ///
    /// `create` runs under the shard lock of this table and must not intern
    /// into the same interner.
    pub fn intern_with<F>(&self, key: K, create: F) -> Arc<V>
    where
        F: FnOnce(&K) -> Arc<V>,
    {
        if !self.enabled {
            return create(&key);
        }

        if let Some(existing) = self.table.get(&key).and_then(|weak| weak.upgrade()) {
            self.stats.hits.fetch_add(1, Ordering::Relaxed);
            return existing;
        }

        let value = match self.table.entry(key) {
            Entry::Occupied(mut entry) => {
                if let Some(existing) = entry.get().upgrade() {
                    self.stats.hits.fetch_add(1, Ordering::Relaxed);
                    return existing;
                }
                // entry died in the interim
                let value = create(entry.key());
                entry.insert(Arc::downgrade(&value));
                value
            }
            Entry::Vacant(entry) => {
                let value = create(entry.key());
                entry.insert(Arc::downgrade(&value));
                self.entries.fetch_add(1, Ordering::Relaxed);
                value
            }
        };

        self.stats.misses.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(interner = self.name, "intern miss");
        self.maybe_sweep();
        value
    }

    /// Number of table entries, including dead ones that were not swept yet.
    pub fn len(&self) -> usize {
        self.table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    /// Number of entries whose value is still referenced somewhere.
    pub fn live_count(&self) -> usize {
        self.table
            .iter()
            .filter(|entry| entry.value().strong_count() > 0)
            .count()
    }

    /// Drop all dead entries now and return how many were removed.
    pub fn purge(&self) -> usize {
        let before = self.table.len();
        self.table.retain(|_, weak| weak.strong_count() > 0);
        let live = self.table.len();
        let removed = before.saturating_sub(live);

        self.entries.store(live, Ordering::Relaxed);
        self.next_sweep
            .store(self.min_sweep.max(live.saturating_mul(2)), Ordering::Relaxed);
        self.stats.sweeps.fetch_add(1, Ordering::Relaxed);
        self.stats.evicted.fetch_add(removed as u64, Ordering::Relaxed);

        tracing::debug!(
            interner = self.name,
            removed,
            remaining = live,
            "swept dead interner entries"
        );
        removed
    }

    pub fn stats(&self) -> InternerStats {
        InternerStats {
            name: self.name,
            hits: self.stats.hits.load(Ordering::Relaxed),
            misses: self.stats.misses.load(Ordering::Relaxed),
            sweeps: self.stats.sweeps.load(Ordering::Relaxed),
            evicted: self.stats.evicted.load(Ordering::Relaxed),
            entries: self.table.len(),
        }
    }

    fn maybe_sweep(&self) {
        if self.entries.load(Ordering::Relaxed) < self.next_sweep.load(Ordering::Relaxed) {
            return;
        }
        if self
            .sweeping
            .compare_exchange(false, true, Ordering::Acquire, Ordering::Relaxed)
            .is_err()
        {
            return;
        }
        self.purge();
        self.sweeping.store(false, Ordering::Release);
    }
}

/// Object-safe view used to report on and purge every table of a context.
pub(crate) trait Table {
    fn stats(&self) -> InternerStats;

    fn purge(&self) -> usize;
}

impl<K: Eq + Hash, V: ?Sized> Table for Interner<K, V> {
    fn stats(&self) -> InternerStats {
        Interner::stats(self)
    }

    fn purge(&self) -> usize {
        Interner::purge(self)
    }
}

impl<K: Eq + Hash, V> Interner<K, V> {
    /// Sized convenience over [`Interner::intern_with`].
    pub fn intern<F>(&self, key: K, create: F) -> Arc<V>
    where
        F: FnOnce(&K) -> V,
    {
        self.intern_with(key, |k| Arc::new(create(k)))
    }
}

impl<V: Eq + Clone> ValueInterner<V> {
    /// Return the live instance equal to `value`, whose digest is `digest`.
    ///
    /// A digest shared with an unequal live value leaves that value in the
    /// table and returns `value` unshared.
    pub fn intern_value(&self, digest: Digest, value: V) -> Arc<V> {
        let interned = self.intern(digest, |_| value.clone());
        if *interned == value {
            return interned;
        }
        tracing::warn!(interner = self.name, %digest, "digest collision");
        Arc::new(value)
    }
}

impl StringInterner {
    pub fn intern_str(&self, value: &str) -> Arc<str> {
        if self.enabled {
            if let Some(existing) = self.table.get(value).and_then(|weak| weak.upgrade()) {
                self.stats.hits.fetch_add(1, Ordering::Relaxed);
                return existing;
            }
        }
        self.intern_with(Box::from(value), |key| Arc::from(&**key))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn interner(config: &TypesConfig) -> Interner<(u32, String), String> {
        Interner::new("Test", config)
    }

    #[test]
    fn equal_keys_share_one_instance() {
        let interner = interner(&TypesConfig::default());
        let a = interner.intern((1, "a".into()), |(n, s)| format!("{n}{s}"));
        let b = interner.intern((1, "a".into()), |_| unreachable!("must hit the cache"));
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(interner.stats().hits, 1);
        assert_eq!(interner.stats().misses, 1);
    }

    #[test]
    fn dead_entries_are_rebuilt() {
        let interner = interner(&TypesConfig::default());
        let first = interner.intern((7, "x".into()), |_| "first".to_string());
        drop(first);
        assert_eq!(interner.live_count(), 0);

        let second = interner.intern((7, "x".into()), |_| "second".to_string());
        assert_eq!(*second, "second");
        assert_eq!(interner.len(), 1);
    }

    #[test]
    fn cache_does_not_keep_values_alive() {
        let interner = interner(&TypesConfig::default());
        let value = interner.intern((1, "a".into()), |_| "v".to_string());
        let weak = Arc::downgrade(&value);
        drop(value);
        assert!(weak.upgrade().is_none());
    }

    #[test]
    fn sweep_runs_when_threshold_reached() {
        let config = TypesConfig::default().with_sweep_threshold(4);
        let interner = interner(&config);
        for i in 0..4 {
            drop(interner.intern((i, String::new()), |_| String::new()));
        }
        // the value created by the fourth call is still alive during the sweep
        let stats = interner.stats();
        assert_eq!(stats.sweeps, 1);
        assert_eq!(stats.evicted, 3);
        assert_eq!(interner.len(), 1);
    }

    #[test]
    fn disabled_interner_always_creates() {
        let interner = interner(&TypesConfig::default().with_interning(false));
        let a = interner.intern((1, "a".into()), |_| "v".to_string());
        let b = interner.intern((1, "a".into()), |_| "v".to_string());
        assert!(!Arc::ptr_eq(&a, &b));
        assert!(interner.is_empty());
    }

    #[test]
    fn values_share_by_digest() {
        let values: ValueInterner<String> = Interner::new("Test", &TypesConfig::default());
        let digest = Digest::from_bytes([7; 32]);
        let a = values.intern_value(digest, "a".to_string());
        let b = values.intern_value(digest, "a".to_string());
        assert!(Arc::ptr_eq(&a, &b));

        // same digest, different value: the live entry stays, the value is not shared
        let c = values.intern_value(digest, "c".to_string());
        assert_eq!(*c, "c");
        assert!(!Arc::ptr_eq(&a, &c));
        assert!(Arc::ptr_eq(&a, &values.intern_value(digest, "a".to_string())));
    }

    #[test]
    fn strings_are_shared() {
        let strings = StringInterner::new("url", &TypesConfig::default());
        let a = strings.intern_str("http://example.org/ext");
        let b = strings.intern_str("http://example.org/ext");
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(&*a, "http://example.org/ext");
    }
}
