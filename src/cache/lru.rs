//! LRU Tracker Module
//!
//! Implements Least Recently Used tracking for cache eviction.

// == Handle ==
/// Stable position of a key inside the tracker.
///
/// Returned by [`LruTracker::push_front`] and valid until the key is removed
/// or evicted. Slots are reused after removal.
pub type Handle = usize;

#[derive(Debug)]
struct Node {
    key: String,
    prev: Option<Handle>,
    next: Option<Handle>,
}

// == LRU Tracker ==
/// Tracks access order for LRU eviction strategy.
///
/// Keys live in a doubly linked list threaded through a slab:
/// - Head = Most recently used
/// - Tail = Least recently used
///
/// Every operation is O(1). Freed slots go on a free list so the slab never
/// grows past the peak number of tracked keys.
#[derive(Debug, Default)]
pub struct LruTracker {
    nodes: Vec<Option<Node>>,
    free: Vec<Handle>,
    head: Option<Handle>,
    tail: Option<Handle>,
    len: usize,
}

impl LruTracker {
    // == Constructor ==
    /// Creates a new empty LRU tracker.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a tracker with room for `capacity` keys before reallocating.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            nodes: Vec::with_capacity(capacity),
            ..Self::default()
        }
    }

    // == Push Front ==
    /// Starts tracking a new key as the most recently used one.
    ///
    /// The caller is responsible for not pushing a key that is already
    /// tracked; the store guarantees this through its map.
    pub fn push_front(&mut self, key: &str) -> Handle {
        let node = Node {
            key: key.to_string(),
            prev: None,
            next: None,
        };
        let handle = match self.free.pop() {
            Some(slot) => {
                self.nodes[slot] = Some(node);
                slot
            }
            None => {
                self.nodes.push(Some(node));
                self.nodes.len() - 1
            }
        };
        self.link_front(handle);
        self.len += 1;
        handle
    }

    // == Touch ==
    /// Marks a key as recently used (moves to front).
    pub fn touch(&mut self, handle: Handle) {
        if self.head == Some(handle) || !self.is_live(handle) {
            return;
        }
        self.unlink(handle);
        self.link_front(handle);
    }

    // == Remove ==
    /// Stops tracking the key at `handle`, returning it.
    pub fn remove(&mut self, handle: Handle) -> Option<String> {
        if !self.is_live(handle) {
            return None;
        }
        self.unlink(handle);
        let node = self.nodes[handle].take()?;
        self.free.push(handle);
        self.len -= 1;
        Some(node.key)
    }

    // == Evict Oldest ==
    /// Returns and removes the least recently used key.
    ///
    /// Returns None if tracker is empty.
    pub fn evict_oldest(&mut self) -> Option<String> {
        let tail = self.tail?;
        self.remove(tail)
    }

    // == Peek Oldest ==
    /// Returns the least recently used key without removing it.
    pub fn peek_oldest(&self) -> Option<&str> {
        self.tail.and_then(|t| self.node(t)).map(|n| n.key.as_str())
    }

    // == Length ==
    /// Returns the number of tracked keys.
    pub fn len(&self) -> usize {
        self.len
    }

    // == Is Empty ==
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    // == Iter ==
    /// Iterates keys from most to least recently used.
    pub fn iter(&self) -> impl Iterator<Item = &str> + '_ {
        let mut cursor = self.head;
        std::iter::from_fn(move || {
            let node = self.node(cursor?)?;
            cursor = node.next;
            Some(node.key.as_str())
        })
    }

    fn node(&self, handle: Handle) -> Option<&Node> {
        self.nodes.get(handle).and_then(Option::as_ref)
    }

    fn is_live(&self, handle: Handle) -> bool {
        self.node(handle).is_some()
    }

    fn unlink(&mut self, handle: Handle) {
        let (prev, next) = match self.node(handle) {
            Some(n) => (n.prev, n.next),
            None => return,
        };

        match prev {
            Some(p) => {
                if let Some(n) = self.nodes[p].as_mut() {
                    n.next = next;
                }
            }
            None => self.head = next,
        }
        match next {
            Some(nx) => {
                if let Some(n) = self.nodes[nx].as_mut() {
                    n.prev = prev;
                }
            }
            None => self.tail = prev,
        }

        if let Some(n) = self.nodes[handle].as_mut() {
            n.prev = None;
            n.next = None;
        }
    }

    fn link_front(&mut self, handle: Handle) {
        let old_head = self.head;
        if let Some(n) = self.nodes[handle].as_mut() {
            n.prev = None;
            n.next = old_head;
        }
        if let Some(h) = old_head {
            if let Some(n) = self.nodes[h].as_mut() {
                n.prev = Some(handle);
            }
        }
        self.head = Some(handle);
        if self.tail.is_none() {
            self.tail = Some(handle);
        }
    }
}
