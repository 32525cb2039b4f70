//! Cache Shard with LRU Eviction
//!
//! A shard is one partition of the key space. It owns a hash map from key to
//! recency position and a doubly linked recency list over the same keys,
//! both guarded by a single mutex. Front of the list is the most recently
//! touched entry, back is the least; when a bounded shard overflows, the
//! back entry is evicted.
//!
//! ## Recency List Representation
//!
//! The list is a slab: a `Vec` of nodes linked by index, with a free list of
//! recycled slots. The map stores the slab index of each key's node, so
//! move-to-front, push-front and tail-removal are all O(1) and no `unsafe`
//! pointer juggling is needed. An index stays valid until its entry is
//! removed, at which point the slot is cleared and recycled.

use bytes::Bytes;
use std::collections::HashMap;
use std::mem;
use std::sync::Mutex;

/// Sentinel index marking the absence of a link.
const NIL: usize = usize::MAX;

#[derive(Debug)]
struct Node {
    key: Bytes,
    value: Bytes,
    prev: usize,
    next: usize,
}

/// Doubly linked recency order backed by a slab of nodes.
#[derive(Debug)]
struct RecencyList {
    slots: Vec<Node>,
    free: Vec<usize>,
    head: usize,
    tail: usize,
}

impl RecencyList {
    fn new() -> Self {
        Self {
            slots: Vec::new(),
            free: Vec::new(),
            head: NIL,
            tail: NIL,
        }
    }

    /// Inserts a new node at the front and returns its slot index.
    fn push_front(&mut self, key: Bytes, value: Bytes) -> usize {
        let node = Node {
            key,
            value,
            prev: NIL,
            next: self.head,
        };
        let idx = match self.free.pop() {
            Some(idx) => {
                self.slots[idx] = node;
                idx
            }
            None => {
                self.slots.push(node);
                self.slots.len() - 1
            }
        };
        if self.head != NIL {
            self.slots[self.head].prev = idx;
        } else {
            self.tail = idx;
        }
        self.head = idx;
        idx
    }

    /// Detaches a node from its neighbours without freeing the slot.
    fn unlink(&mut self, idx: usize) {
        let (prev, next) = (self.slots[idx].prev, self.slots[idx].next);
        if prev != NIL {
            self.slots[prev].next = next;
        } else {
            self.head = next;
        }
        if next != NIL {
            self.slots[next].prev = prev;
        } else {
            self.tail = prev;
        }
    }

    fn move_to_front(&mut self, idx: usize) {
        if self.head == idx {
            return;
        }
        self.unlink(idx);
        self.slots[idx].prev = NIL;
        self.slots[idx].next = self.head;
        if self.head != NIL {
            self.slots[self.head].prev = idx;
        } else {
            self.tail = idx;
        }
        self.head = idx;
    }

    /// Removes a node, recycles its slot and returns the key it held.
    fn remove(&mut self, idx: usize) -> Bytes {
        self.unlink(idx);
        self.free.push(idx);
        let node = &mut self.slots[idx];
        node.prev = NIL;
        node.next = NIL;
        // Clear the slot so recycled entries do not pin old payloads.
        mem::take(&mut node.value);
        mem::take(&mut node.key)
    }

    fn tail_index(&self) -> Option<usize> {
        (self.tail != NIL).then_some(self.tail)
    }

    fn value(&self, idx: usize) -> &Bytes {
        &self.slots[idx].value
    }

    fn set_value(&mut self, idx: usize, value: Bytes) {
        self.slots[idx].value = value;
    }
}

#[derive(Debug)]
struct ShardInner {
    entries: HashMap<Bytes, usize>,
    recency: RecencyList,
    max_items: usize,
}

/// A single partition of the cache.
///
/// All operations take the shard's mutex for their full duration. A plain
/// `Mutex` rather than a reader/writer lock: a hit on `get` reorders the
/// recency list, so even reads must be serialised with writers.
///
/// Shard operations have no failure modes; memory exhaustion aborts the
/// process like any other allocation failure.
#[derive(Debug)]
pub struct Shard {
    inner: Mutex<ShardInner>,
}

impl Shard {
    /// Creates an empty shard. `max_items == 0` means unbounded.
    pub fn new(max_items: usize) -> Self {
        Self {
            inner: Mutex::new(ShardInner {
                entries: HashMap::new(),
                recency: RecencyList::new(),
                max_items,
            }),
        }
    }

    /// Looks up a key, promoting it to most recently used on a hit.
    ///
    /// The returned value is an independent handle: the caller cannot mutate
    /// what stays stored, and later writes to the key cannot tear it.
    pub fn get(&self, key: &[u8]) -> Option<Bytes> {
        let mut inner = self.inner.lock().unwrap();
        let idx = *inner.entries.get(key)?;
        inner.recency.move_to_front(idx);
        Some(inner.recency.value(idx).clone())
    }

    /// Inserts or replaces a key, promoting it to most recently used.
    ///
    /// When the shard is bounded and the insert pushes it over capacity, the
    /// least recently used entry is evicted. A set grows the shard by at
    /// most one, so a single eviction restores the bound.
    pub fn set(&self, key: Bytes, value: Bytes) {
        let mut inner = self.inner.lock().unwrap();

        if let Some(idx) = inner.entries.get(&key).copied() {
            inner.recency.set_value(idx, value);
            inner.recency.move_to_front(idx);
            return;
        }

        let idx = inner.recency.push_front(key.clone(), value);
        inner.entries.insert(key, idx);

        if inner.max_items > 0 && inner.entries.len() > inner.max_items {
            if let Some(tail) = inner.recency.tail_index() {
                let evicted = inner.recency.remove(tail);
                inner.entries.remove(&evicted);
            }
        }
    }

    /// Removes a key. Removing an absent key is a no-op.
    pub fn delete(&self, key: &[u8]) {
        let mut inner = self.inner.lock().unwrap();
        if let Some(idx) = inner.entries.remove(key) {
            inner.recency.remove(idx);
        }
    }

    /// Number of entries currently stored. Introspection only.
    pub fn len(&self) -> usize {
        self.inner.lock().unwrap().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Keys in most-to-least recently used order, for tests and debugging.
    #[cfg(test)]
    fn recency_order(&self) -> Vec<Bytes> {
        let inner = self.inner.lock().unwrap();
        let mut out = Vec::with_capacity(inner.entries.len());
        let mut cur = inner.recency.head;
        while cur != NIL {
            out.push(inner.recency.slots[cur].key.clone());
            cur = inner.recency.slots[cur].next;
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn b(s: &'static str) -> Bytes {
        Bytes::from_static(s.as_bytes())
    }

    #[test]
    fn set_then_get_roundtrip() {
        let shard = Shard::new(0);
        shard.set(b("foo"), b("hello"));
        assert_eq!(shard.get(b"foo"), Some(b("hello")));
        assert_eq!(shard.len(), 1);
    }

    #[test]
    fn get_miss_leaves_shard_untouched() {
        let shard = Shard::new(0);
        shard.set(b("a"), b("1"));
        assert_eq!(shard.get(b"missing"), None);
        assert_eq!(shard.len(), 1);
        assert_eq!(shard.recency_order(), vec![b("a")]);
    }

    #[test]
    fn set_replaces_existing_value() {
        let shard = Shard::new(0);
        shard.set(b("k"), b("old"));
        shard.set(b("k"), b("new"));
        assert_eq!(shard.get(b"k"), Some(b("new")));
        assert_eq!(shard.len(), 1);
    }

    #[test]
    fn repeated_set_is_idempotent() {
        let shard = Shard::new(0);
        shard.set(b("k"), b("v"));
        shard.set(b("k"), b("v"));
        assert_eq!(shard.len(), 1);
        assert_eq!(shard.get(b"k"), Some(b("v")));
    }

    #[test]
    fn delete_is_idempotent() {
        let shard = Shard::new(0);
        shard.set(b("k"), b("v"));
        shard.delete(b"k");
        shard.delete(b"k");
        assert_eq!(shard.get(b"k"), None);
        assert_eq!(shard.len(), 0);
    }

    #[test]
    fn empty_value_is_storable() {
        let shard = Shard::new(0);
        shard.set(b("k"), Bytes::new());
        assert_eq!(shard.get(b"k"), Some(Bytes::new()));
    }

    #[test]
    fn eviction_removes_least_recent() {
        let shard = Shard::new(2);
        shard.set(b("a"), b("1"));
        shard.set(b("b"), b("1"));
        shard.set(b("c"), b("1"));
        assert_eq!(shard.get(b"a"), None);
        assert_eq!(shard.get(b"b"), Some(b("1")));
        assert_eq!(shard.get(b"c"), Some(b("1")));
        assert_eq!(shard.len(), 2);
    }

    #[test]
    fn get_promotes_entry_ahead_of_eviction() {
        let shard = Shard::new(2);
        shard.set(b("a"), b("1"));
        shard.set(b("b"), b("1"));
        // Touching `a` makes `b` the eviction candidate.
        assert!(shard.get(b"a").is_some());
        shard.set(b("c"), b("1"));
        assert_eq!(shard.get(b"a"), Some(b("1")));
        assert_eq!(shard.get(b"b"), None);
        assert_eq!(shard.get(b"c"), Some(b("1")));
    }

    #[test]
    fn replacing_set_promotes_without_eviction() {
        let shard = Shard::new(2);
        shard.set(b("a"), b("1"));
        shard.set(b("b"), b("1"));
        shard.set(b("a"), b("2"));
        assert_eq!(shard.len(), 2);
        assert_eq!(shard.recency_order(), vec![b("a"), b("b")]);
    }

    #[test]
    fn size_never_exceeds_bound() {
        let shard = Shard::new(8);
        for i in 0..1000 {
            shard.set(Bytes::from(format!("key-{}", i)), b("v"));
            assert!(shard.len() <= 8);
        }
    }

    #[test]
    fn capacity_one_keeps_only_newest() {
        let shard = Shard::new(1);
        shard.set(b("a"), b("1"));
        shard.set(b("b"), b("2"));
        assert_eq!(shard.get(b"a"), None);
        assert_eq!(shard.get(b"b"), Some(b("2")));
        assert_eq!(shard.len(), 1);
    }

    #[test]
    fn unbounded_shard_never_evicts() {
        let shard = Shard::new(0);
        for i in 0..500 {
            shard.set(Bytes::from(format!("key-{}", i)), b("v"));
        }
        assert_eq!(shard.len(), 500);
    }

    #[test]
    fn slots_are_recycled_after_removal() {
        let shard = Shard::new(0);
        for round in 0..10 {
            for i in 0..16 {
                shard.set(Bytes::from(format!("k{}", i)), b("v"));
            }
            for i in 0..16 {
                shard.delete(format!("k{}", i).as_bytes());
            }
            assert_eq!(shard.len(), 0, "round {}", round);
        }
        // Every slot was freed, so the slab stays at one generation's size.
        let inner = shard.inner.lock().unwrap();
        assert_eq!(inner.recency.slots.len(), 16);
        assert_eq!(inner.recency.free.len(), 16);
    }

    #[test]
    fn recency_order_tracks_touches() {
        let shard = Shard::new(0);
        shard.set(b("a"), b("1"));
        shard.set(b("b"), b("1"));
        shard.set(b("c"), b("1"));
        assert_eq!(shard.recency_order(), vec![b("c"), b("b"), b("a")]);
        shard.get(b"a");
        assert_eq!(shard.recency_order(), vec![b("a"), b("c"), b("b")]);
        shard.delete(b"c");
        assert_eq!(shard.recency_order(), vec![b("a"), b("b")]);
    }

    #[test]
    fn map_and_recency_list_stay_in_sync() {
        let shard = Shard::new(4);
        for i in 0..100 {
            shard.set(Bytes::from(format!("k{}", i % 10)), b("v"));
            if i % 3 == 0 {
                shard.delete(format!("k{}", (i + 1) % 10).as_bytes());
            }
            let inner = shard.inner.lock().unwrap();
            let listed = {
                let mut n = 0;
                let mut cur = inner.recency.head;
                while cur != NIL {
                    n += 1;
                    cur = inner.recency.slots[cur].next;
                }
                n
            };
            assert_eq!(inner.entries.len(), listed);
        }
    }
}
