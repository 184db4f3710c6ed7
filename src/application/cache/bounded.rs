//! Bounded per-key cache with idle expiry.
//!
//! Entries live in a dense arena of slots; a hash index maps each key to its
//! slot. Removal swaps the last slot into the hole and patches its index
//! entry, so the arena never has gaps.
//!
//! Two eviction policies apply:
//!
//! - **Idle TTL**: [`BoundedCache::evict_idle`] drops every entry not touched
//!   within the TTL. Callers run it from a periodic sweep.
//! - **Least recently touched**: inserting into a full cache evicts the entry
//!   with the oldest touch time first.

use std::collections::HashMap;
use std::hash::Hash;

#[derive(Debug, Clone)]
struct Slot<K, V> {
    key: K,
    value: V,
    touched_ms: i64,
}

/// Arena-backed cache bounded by capacity and idle time.
#[derive(Debug, Clone)]
pub struct BoundedCache<K, V> {
    slots: Vec<Slot<K, V>>,
    index: HashMap<K, usize>,
    capacity: usize,
    idle_ttl_ms: i64,
}

impl<K, V> BoundedCache<K, V>
where
    K: Clone + Eq + Hash,
{
    /// Create a cache holding at most `capacity` entries (minimum 1).
    #[must_use]
    pub fn new(capacity: usize, idle_ttl_ms: i64) -> Self {
        let capacity = capacity.max(1);
        Self {
            slots: Vec::new(),
            index: HashMap::new(),
            capacity,
            idle_ttl_ms,
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    #[must_use]
    pub const fn capacity(&self) -> usize {
        self.capacity
    }

    #[must_use]
    pub fn contains_key(&self, key: &K) -> bool {
        self.index.contains_key(key)
    }

    /// Read an entry without touching it.
    #[must_use]
    pub fn peek(&self, key: &K) -> Option<&V> {
        self.index.get(key).map(|&i| &self.slots[i].value)
    }

    /// Mutable access without touching.
    pub fn peek_mut(&mut self, key: &K) -> Option<&mut V> {
        let &i = self.index.get(key)?;
        Some(&mut self.slots[i].value)
    }

    /// Last touch time of an entry.
    #[must_use]
    pub fn touched_at(&self, key: &K) -> Option<i64> {
        self.index.get(key).map(|&i| self.slots[i].touched_ms)
    }

    /// Mutable access that refreshes the entry's touch time.
    pub fn get_mut(&mut self, key: &K, now_ms: i64) -> Option<&mut V> {
        let &i = self.index.get(key)?;
        let slot = &mut self.slots[i];
        slot.touched_ms = now_ms;
        Some(&mut slot.value)
    }

    /// Refresh an entry's touch time. Returns false if absent.
    pub fn touch(&mut self, key: &K, now_ms: i64) -> bool {
        self.get_mut(key, now_ms).is_some()
    }

    /// Insert or replace an entry.
    ///
    /// Returns the entry evicted to make room, if any.
    pub fn insert(&mut self, key: K, value: V, now_ms: i64) -> Option<(K, V)> {
        if let Some(&i) = self.index.get(&key) {
            let slot = &mut self.slots[i];
            slot.value = value;
            slot.touched_ms = now_ms;
            return None;
        }

        let evicted = if self.slots.len() >= self.capacity {
            self.evict_least_recent()
        } else {
            None
        };
        self.index.insert(key.clone(), self.slots.len());
        self.slots.push(Slot {
            key,
            value,
            touched_ms: now_ms,
        });
        evicted
    }

    /// Touch an entry, inserting `make()` first if it is absent.
    pub fn get_or_insert_with(&mut self, key: K, now_ms: i64, make: impl FnOnce() -> V) -> &mut V {
        let i = match self.index.get(&key) {
            Some(&i) => i,
            None => {
                self.insert(key, make(), now_ms);
                self.slots.len() - 1
            }
        };
        let slot = &mut self.slots[i];
        slot.touched_ms = now_ms;
        &mut slot.value
    }

    pub fn remove(&mut self, key: &K) -> Option<V> {
        let i = self.index.remove(key)?;
        let slot = self.slots.swap_remove(i);
        if let Some(moved) = self.slots.get(i) {
            self.index.insert(moved.key.clone(), i);
        }
        Some(slot.value)
    }

    /// Remove every entry idle for longer than the TTL; returns their keys.
    pub fn evict_idle(&mut self, now_ms: i64) -> Vec<K> {
        let cutoff = now_ms.saturating_sub(self.idle_ttl_ms);
        let stale: Vec<K> = self
            .slots
            .iter()
            .filter(|slot| slot.touched_ms < cutoff)
            .map(|slot| slot.key.clone())
            .collect();
        for key in &stale {
            self.remove(key);
        }
        stale
    }

    pub fn keys(&self) -> impl Iterator<Item = &K> {
        self.slots.iter().map(|slot| &slot.key)
    }

    pub fn clear(&mut self) {
        self.slots.clear();
        self.index.clear();
    }

    // Linear scan; only runs when the cache is full.
    fn evict_least_recent(&mut self) -> Option<(K, V)> {
        let oldest = self
            .slots
            .iter()
            .min_by_key(|slot| slot.touched_ms)
            .map(|slot| slot.key.clone())?;
        let value = self.remove(&oldest)?;
        Some((oldest, value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_and_peek() {
        let mut cache = BoundedCache::new(4, 1_000);
        cache.insert("a", 1, 0);
        cache.insert("b", 2, 0);

        assert_eq!(cache.peek(&"a"), Some(&1));
        assert_eq!(cache.peek(&"b"), Some(&2));
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn replacing_keeps_one_slot() {
        let mut cache = BoundedCache::new(4, 1_000);
        cache.insert("a", 1, 0);
        cache.insert("a", 5, 10);

        assert_eq!(cache.len(), 1);
        assert_eq!(cache.peek(&"a"), Some(&5));
        assert_eq!(cache.touched_at(&"a"), Some(10));
    }

    #[test]
    fn full_cache_evicts_least_recently_touched() {
        let mut cache = BoundedCache::new(2, 1_000);
        cache.insert("a", 1, 0);
        cache.insert("b", 2, 5);
        cache.touch(&"a", 10);

        let evicted = cache.insert("c", 3, 20);

        assert_eq!(evicted, Some(("b", 2)));
        assert!(cache.contains_key(&"a"));
        assert!(cache.contains_key(&"c"));
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn removal_keeps_index_consistent() {
        let mut cache = BoundedCache::new(8, 1_000);
        for (i, key) in ["a", "b", "c", "d"].into_iter().enumerate() {
            cache.insert(key, i, 0);
        }

        assert_eq!(cache.remove(&"a"), Some(0));
        assert_eq!(cache.remove(&"c"), Some(2));

        assert_eq!(cache.peek(&"b"), Some(&1));
        assert_eq!(cache.peek(&"d"), Some(&3));
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn evict_idle_drops_only_stale_entries() {
        let mut cache = BoundedCache::new(8, 600);
        cache.insert("old", 1, 0);
        cache.insert("fresh", 2, 500);

        let evicted = cache.evict_idle(1_000);

        assert_eq!(evicted, vec!["old"]);
        assert!(!cache.contains_key(&"old"));
        assert!(cache.contains_key(&"fresh"));
    }

    #[test]
    fn get_or_insert_with_touches_existing() {
        let mut cache: BoundedCache<&str, Vec<i32>> = BoundedCache::new(4, 1_000);
        cache.get_or_insert_with("a", 0, Vec::new).push(1);
        cache.get_or_insert_with("a", 50, Vec::new).push(2);

        assert_eq!(cache.peek(&"a"), Some(&vec![1, 2]));
        assert_eq!(cache.touched_at(&"a"), Some(50));
    }

    #[test]
    fn never_exceeds_capacity() {
        let mut cache = BoundedCache::new(3, 1_000);
        for i in 0..50_i64 {
            cache.insert(i, i, i);
            assert!(cache.len() <= 3);
        }
        let mut keys: Vec<i64> = cache.keys().copied().collect();
        keys.sort_unstable();
        assert_eq!(keys, vec![47, 48, 49]);
    }
}
