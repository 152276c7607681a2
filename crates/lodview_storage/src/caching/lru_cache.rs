use crate::SmallKeyBuildHasher;

use core::hash::{BuildHasher, Hash};
use std::collections::HashMap;
use std::sync::Arc;

/// The number of bytes an entry holds onto, used to enforce an optional byte budget.
pub trait CacheWeight {
    fn weight_bytes(&self) -> usize;
}

impl<T> CacheWeight for Arc<T>
where
    T: CacheWeight,
{
    #[inline]
    fn weight_bytes(&self) -> usize {
        T::weight_bytes(self)
    }
}

/// Upper limits on what an `LruCache` may hold.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct CacheLimits {
    /// Maximum number of entries. Zero disables caching entirely.
    pub capacity: usize,
    /// Maximum total `CacheWeight` of all entries, if any.
    pub byte_budget: Option<usize>,
}

/// A bounded cache that evicts the Least Recently Used entry whenever an insertion exceeds its `CacheLimits`.
///
/// LRU order is updated on insertion and by `get_touch`.
///
/// An entry that alone exceeds the byte budget is never stored.
#[derive(Clone, Debug)]
pub struct LruCache<K, V, H> {
    store: HashMap<K, (V, usize), H>,
    order: LruList<K>,
    limits: CacheLimits,
    total_bytes: usize,
}

/// An `LruCache` using the aHash algorithm.
pub type SmallKeyLruCache<K, V> = LruCache<K, V, SmallKeyBuildHasher>;

impl<K, V, H> LruCache<K, V, H>
where
    K: Hash + Eq,
    H: Default,
{
    pub fn new(limits: CacheLimits) -> Self {
        Self::with_hasher(limits, Default::default())
    }
}

impl<K, V, H> LruCache<K, V, H>
where
    K: Hash + Eq,
{
    pub fn with_hasher(limits: CacheLimits, hasher_builder: H) -> Self {
        LruCache {
            store: HashMap::with_hasher(hasher_builder),
            order: LruList::new(),
            limits,
            total_bytes: 0,
        }
    }
}

impl<K, V, H> LruCache<K, V, H>
where
    K: Hash + Eq + Clone,
    V: CacheWeight,
    H: BuildHasher,
{
    /// Borrow the value for `key` and mark it as most recently used.
    #[inline]
    pub fn get_touch(&mut self, key: &K) -> Option<&V> {
        let Self { store, order, .. } = self;
        store.get(key).map(|(val, i)| {
            order.move_to_front(*i);

            val
        })
    }

    /// Inserts `new_val` for `key` as the most recently used entry, then evicts least recently used entries until the
    /// limits hold again. Returns every entry that was displaced, including a replaced value for `key`.
    pub fn insert(&mut self, key: K, new_val: V) -> Vec<(K, V)> {
        let mut displaced = Vec::new();

        if let Some(old_val) = self.remove(&key) {
            displaced.push((key.clone(), old_val));
        }

        let weight = new_val.weight_bytes();
        let too_heavy = self.limits.byte_budget.map_or(false, |budget| weight > budget);
        if self.limits.capacity == 0 || too_heavy {
            displaced.push((key, new_val));

            return displaced;
        }

        let i = self.order.push_front(key.clone());
        self.store.insert(key, (new_val, i));
        self.total_bytes += weight;

        while self.is_over_limits() {
            match self.remove_lru() {
                Some(evicted) => displaced.push(evicted),
                None => break,
            }
        }

        displaced
    }

    /// Removes the entry for `key`, returning its value.
    #[inline]
    pub fn remove(&mut self, key: &K) -> Option<V> {
        self.store.remove(key).map(|(val, i)| {
            self.order.remove(i);
            self.total_bytes -= val.weight_bytes();

            val
        })
    }

    /// Removes the least-recently used entry.
    #[inline]
    pub fn remove_lru(&mut self) -> Option<(K, V)> {
        let key = self.order.pop_back()?;
        let (val, _) = self.store.remove(&key)?;
        self.total_bytes -= val.weight_bytes();

        Some((key, val))
    }

    /// Delete all entries.
    #[inline]
    pub fn clear(&mut self) {
        self.store.clear();
        self.order.clear();
        self.total_bytes = 0;
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.store.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.store.is_empty()
    }

    /// The sum of `CacheWeight` over all entries.
    #[inline]
    pub fn total_bytes(&self) -> usize {
        self.total_bytes
    }

    fn is_over_limits(&self) -> bool {
        self.len() > self.limits.capacity
            || self
                .limits
                .byte_budget
                .map_or(false, |budget| self.total_bytes > budget)
    }
}

/// Doubly-linked list using Vec as storage.
#[derive(Clone, Debug)]
struct LruList<T> {
    entries: Vec<ListEntry<T>>,
}

#[derive(Clone, Debug)]
struct ListEntry<T> {
    value: Option<T>,
    next: usize,
    prev: usize,
}

/// Free and occupied cells are each linked into a cyclic list with one auxiliary cell.
/// Cell #0 is on the list of free cells, element #1 is on the list of occupied cells.
impl<T> LruList<T> {
    const FREE: usize = 0;
    const OCCUPIED: usize = 1;

    fn new() -> LruList<T> {
        let mut list = LruList {
            entries: Vec::with_capacity(2),
        };
        list.clear();

        list
    }

    fn unlink(&mut self, index: usize) {
        let prev = self.entries[index].prev;
        let next = self.entries[index].next;
        self.entries[prev].next = next;
        self.entries[next].prev = prev;
    }

    fn link_after(&mut self, index: usize, prev: usize) {
        let next = self.entries[prev].next;
        self.entries[index].prev = prev;
        self.entries[index].next = next;
        self.entries[prev].next = index;
        self.entries[next].prev = index;
    }

    fn move_to_front(&mut self, index: usize) {
        self.unlink(index);
        self.link_after(index, Self::OCCUPIED);
    }

    fn push_front(&mut self, value: T) -> usize {
        if self.entries[Self::FREE].next == Self::FREE {
            self.entries.push(ListEntry {
                value: None,
                next: Self::FREE,
                prev: Self::FREE,
            });
            self.entries[Self::FREE].next = self.entries.len() - 1;
        }
        let index = self.entries[Self::FREE].next;
        self.entries[index].value = Some(value);
        self.unlink(index);
        self.link_after(index, Self::OCCUPIED);

        index
    }

    fn remove(&mut self, index: usize) -> Option<T> {
        self.unlink(index);
        self.link_after(index, Self::FREE);

        self.entries[index].value.take()
    }

    fn pop_back(&mut self) -> Option<T> {
        let index = self.entries[Self::OCCUPIED].prev;
        if index == Self::OCCUPIED {
            return None;
        }

        self.remove(index)
    }

    fn clear(&mut self) {
        self.entries.clear();
        for sentinel in [Self::FREE, Self::OCCUPIED] {
            self.entries.push(ListEntry {
                value: None,
                next: sentinel,
                prev: sentinel,
            });
        }
    }
}

// ████████╗███████╗███████╗████████╗███████╗
// ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝
//    ██║   █████╗  ███████╗   ██║   ███████╗
//    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║
//    ██║   ███████╗███████║   ██║   ███████║
//    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Clone, Copy, Debug, Eq, PartialEq)]
    struct Blob(usize);

    impl CacheWeight for Blob {
        fn weight_bytes(&self) -> usize {
            self.0
        }
    }

    fn cache(capacity: usize, byte_budget: Option<usize>) -> SmallKeyLruCache<i32, Blob> {
        SmallKeyLruCache::new(CacheLimits {
            capacity,
            byte_budget,
        })
    }

    #[test]
    fn get_after_insert_and_remove() {
        let mut cache = cache(4, None);
        assert_eq!(cache.get_touch(&1), None);

        cache.insert(1, Blob(2));
        assert_eq!(cache.get_touch(&1), Some(&Blob(2)));
        assert_eq!(cache.len(), 1);

        assert_eq!(cache.remove(&1), Some(Blob(2)));
        assert_eq!(cache.get_touch(&1), None);
        assert!(cache.is_empty());
        assert_eq!(cache.total_bytes(), 0);
    }

    #[test]
    fn capacity_evicts_lru() {
        let mut cache = cache(3, None);

        assert!(cache.insert(1, Blob(1)).is_empty());
        assert!(cache.insert(2, Blob(1)).is_empty());
        assert!(cache.insert(3, Blob(1)).is_empty());
        // Re-inserting 1 makes 2 the least recently used.
        assert_eq!(cache.insert(1, Blob(5)), vec![(1, Blob(1))]);

        assert_eq!(cache.insert(4, Blob(1)), vec![(2, Blob(1))]);
        assert_eq!(cache.len(), 3);
        assert_eq!(cache.remove(&2), None);
    }

    #[test]
    fn remove_lru_pops_oldest_first() {
        let mut cache = cache(2, None);

        cache.insert(1, Blob(0));
        cache.insert(2, Blob(0));

        assert_eq!(cache.remove_lru(), Some((1, Blob(0))));
        assert_eq!(cache.remove_lru(), Some((2, Blob(0))));
        assert_eq!(cache.remove_lru(), None);
    }

    #[test]
    fn get_touch_affects_lru_order() {
        let mut cache = cache(2, None);

        cache.insert(1, Blob(0));
        cache.insert(2, Blob(0));
        cache.get_touch(&1);

        assert_eq!(cache.insert(3, Blob(0)), vec![(2, Blob(0))]);
    }

    #[test]
    fn byte_budget_evicts_until_under_budget() {
        let mut cache = cache(10, Some(100));

        cache.insert(1, Blob(40));
        cache.insert(2, Blob(40));
        assert_eq!(cache.total_bytes(), 80);

        assert_eq!(cache.insert(3, Blob(70)), vec![(1, Blob(40)), (2, Blob(40))]);
        assert_eq!(cache.total_bytes(), 70);
    }

    #[test]
    fn oversized_entry_is_not_stored() {
        let mut cache = cache(10, Some(100));
        cache.insert(1, Blob(10));

        assert_eq!(cache.insert(2, Blob(101)), vec![(2, Blob(101))]);
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.get_touch(&1), Some(&Blob(10)));
    }

    #[test]
    fn zero_capacity_stores_nothing() {
        let mut cache = cache(0, None);

        assert_eq!(cache.insert(1, Blob(1)), vec![(1, Blob(1))]);
        assert!(cache.is_empty());
    }

    #[test]
    fn list_cells_are_reused_after_clear() {
        let mut cache = cache(2, None);

        for i in 0..10 {
            cache.insert(i, Blob(1));
        }
        cache.clear();
        cache.insert(42, Blob(3));

        assert_eq!(cache.len(), 1);
        assert_eq!(cache.total_bytes(), 3);
        assert_eq!(cache.remove_lru(), Some((42, Blob(3))));
    }
}
