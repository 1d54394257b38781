//! `LruDirectory` — the bounded fingerprint-to-entry map of §4.5.
//!
//! Backed by a `HashMap` plus an intrusive doubly linked access-order list
//! threaded through a slab (`Vec<Option<Node>>`), so promote-on-read and
//! evict-on-insert are both O(1) rather than paying `Vec` removal costs.
//! The whole structure sits behind one `RwLock`: reads that are already at
//! the head take the read-lock fast path and skip promotion entirely, since
//! the order is already correct.

use crate::entry::StreamingEntry;
use crate::fingerprint::Fingerprint;
use crate::invariants::debug_assert_lru_consistent;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

struct Node {
    key: Fingerprint,
    entry: Arc<StreamingEntry>,
    prev: Option<usize>,
    next: Option<usize>,
}

struct Inner {
    map: HashMap<Fingerprint, usize>,
    nodes: Vec<Option<Node>>,
    free: Vec<usize>,
    head: Option<usize>,
    tail: Option<usize>,
}

impl Inner {
    fn unlink(&mut self, index: usize) {
        let (prev, next) = {
            let node = self.nodes[index].as_ref().unwrap();
            (node.prev, node.next)
        };
        match prev {
            Some(p) => self.nodes[p].as_mut().unwrap().next = next,
            None => self.head = next,
        }
        match next {
            Some(n) => self.nodes[n].as_mut().unwrap().prev = prev,
            None => self.tail = prev,
        }
    }

    fn push_front(&mut self, index: usize) {
        let old_head = self.head;
        {
            let node = self.nodes[index].as_mut().unwrap();
            node.prev = None;
            node.next = old_head;
        }
        if let Some(h) = old_head {
            self.nodes[h].as_mut().unwrap().prev = Some(index);
        }
        self.head = Some(index);
        if self.tail.is_none() {
            self.tail = Some(index);
        }
    }

    fn promote(&mut self, index: usize) {
        if self.head == Some(index) {
            return;
        }
        self.unlink(index);
        self.push_front(index);
    }

    fn evict_tail(&mut self) {
        let Some(tail) = self.tail else { return };
        self.unlink(tail);
        let node = self.nodes[tail].take().unwrap();
        log::debug!("evicting least-recently-used entry to make room");
        self.map.remove(&node.key);
        self.free.push(tail);
    }
}

/// Bounded LRU map from request fingerprint to the [`StreamingEntry`] being
/// written or already complete for it.
pub struct LruDirectory {
    capacity: usize,
    inner: RwLock<Inner>,
}

impl LruDirectory {
    /// Creates an empty directory that holds at most `capacity` entries.
    ///
    /// # Panics
    ///
    /// Panics if `capacity` is zero.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "lru directory capacity must be positive");
        Self {
            capacity,
            inner: RwLock::new(Inner {
                map: HashMap::with_capacity(capacity),
                nodes: Vec::with_capacity(capacity),
                free: Vec::new(),
                head: None,
                tail: None,
            }),
        }
    }

    /// Looks up `key`, promoting it to most-recently-used on a hit.
    #[must_use]
    pub fn get(&self, key: &Fingerprint) -> Option<Arc<StreamingEntry>> {
        {
            let inner = self.inner.read().unwrap();
            let &index = inner.map.get(key)?;
            if inner.head == Some(index) {
                return Some(Arc::clone(&inner.nodes[index].as_ref().unwrap().entry));
            }
        }
        let mut inner = self.inner.write().unwrap();
        let Some(&index) = inner.map.get(key) else {
            return None;
        };
        inner.promote(index);
        Some(Arc::clone(&inner.nodes[index].as_ref().unwrap().entry))
    }

    /// Inserts `entry` under `key` as the new most-recently-used item,
    /// evicting the least-recently-used entry first if the directory is at
    /// capacity and `key` is not already present.
    pub fn insert(&self, key: Fingerprint, entry: Arc<StreamingEntry>) {
        let mut inner = self.inner.write().unwrap();

        if let Some(&index) = inner.map.get(&key) {
            inner.nodes[index].as_mut().unwrap().entry = entry;
            inner.promote(index);
            return;
        }

        if inner.map.len() >= self.capacity {
            inner.evict_tail();
        }

        let index = match inner.free.pop() {
            Some(i) => i,
            None => {
                inner.nodes.push(None);
                inner.nodes.len() - 1
            }
        };
        inner.nodes[index] = Some(Node {
            key: key.clone(),
            entry,
            prev: None,
            next: None,
        });
        inner.map.insert(key, index);
        inner.push_front(index);

        debug_assert_lru_consistent!(inner.map.len(), {
            let mut n = 0;
            let mut cur = inner.head;
            while let Some(i) = cur {
                n += 1;
                cur = inner.nodes[i].as_ref().unwrap().next;
            }
            n
        }, self.capacity);
    }

    /// Current number of entries held.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.read().unwrap().map.len()
    }

    /// Returns `true` if the directory holds no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry() -> Arc<StreamingEntry> {
        Arc::new(StreamingEntry::new(4))
    }

    #[test]
    fn insert_then_get_round_trips() {
        let dir = LruDirectory::new(2);
        let key = vec![1, 2, 3];
        let e = entry();
        dir.insert(key.clone(), Arc::clone(&e));
        assert!(Arc::ptr_eq(&dir.get(&key).unwrap(), &e));
    }

    #[test]
    fn get_on_missing_key_is_none() {
        let dir = LruDirectory::new(2);
        assert!(dir.get(&vec![9]).is_none());
    }

    #[test]
    fn eviction_removes_least_recently_used() {
        let dir = LruDirectory::new(2);
        dir.insert(vec![1], entry());
        dir.insert(vec![2], entry());
        dir.insert(vec![3], entry()); // evicts key 1
        assert!(dir.get(&vec![1]).is_none());
        assert!(dir.get(&vec![2]).is_some());
        assert!(dir.get(&vec![3]).is_some());
        assert_eq!(dir.len(), 2);
    }

    #[test]
    fn get_promotes_and_protects_from_eviction() {
        let dir = LruDirectory::new(2);
        dir.insert(vec![1], entry());
        dir.insert(vec![2], entry());
        dir.get(&vec![1]); // promote 1, making 2 the LRU victim
        dir.insert(vec![3], entry());
        assert!(dir.get(&vec![2]).is_none());
        assert!(dir.get(&vec![1]).is_some());
        assert!(dir.get(&vec![3]).is_some());
    }

    #[test]
    fn reinserting_existing_key_does_not_grow_directory() {
        let dir = LruDirectory::new(2);
        let key = vec![1];
        dir.insert(key.clone(), entry());
        dir.insert(key.clone(), entry());
        assert_eq!(dir.len(), 1);
    }

    #[test]
    fn freed_slots_are_reused_after_eviction() {
        let dir = LruDirectory::new(1);
        dir.insert(vec![1], entry());
        dir.insert(vec![2], entry());
        dir.insert(vec![3], entry());
        assert_eq!(dir.len(), 1);
        assert!(dir.get(&vec![3]).is_some());
    }
}
