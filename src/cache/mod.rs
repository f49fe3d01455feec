//! Fixed-expiry cache
//!
//! Entries expire a fixed duration after insertion; reads never extend
//! their lifetime.

use std::{
    hash::Hash,
    time::{Duration, Instant},
};

use dashmap::DashMap;

use crate::core::traits::TtlCache;

struct Entry<V> {
    value: V,
    expires_at: Instant,
}

pub struct ExpiringCache<K, V> {
    entries: DashMap<K, Entry<V>>,
}

impl<K, V> Default for ExpiringCache<K, V>
where
    K: Eq + Hash,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V> ExpiringCache<K, V>
where
    K: Eq + Hash,
{
    pub fn new() -> Self {
        Self {
            entries: DashMap::new(),
        }
    }

    /// Number of stored entries, expired ones included until purged
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Evict every expired entry
    pub fn purge_expired(&self) {
        let now = Instant::now();
        self.entries.retain(|_, entry| entry.expires_at > now);
    }
}

impl<K, V> TtlCache<K, V> for ExpiringCache<K, V>
where
    K: Eq + Hash + Send + Sync,
    V: Clone + Send + Sync,
{
    fn get(&self, key: &K) -> Option<V> {
        let now = Instant::now();
        // The read guard must be released before removing the entry.
        let found = self
            .entries
            .get(key)
            .map(|entry| (entry.expires_at > now).then(|| entry.value.clone()));

        match found {
            Some(Some(value)) => Some(value),
            Some(None) => {
                self.entries
                    .remove_if(key, |_, entry| entry.expires_at <= Instant::now());
                None
            }
            None => None,
        }
    }

    fn set(&self, key: K, value: V, ttl: Duration) {
        self.entries.insert(
            key,
            Entry {
                value,
                expires_at: Instant::now() + ttl,
            },
        );
    }
}
