//! Eviction Order Module
//!
//! Tracks eviction priority with an index-stable doubly-linked list.
//!
//! Nodes live in a `Vec` arena and link to each other by index, so a key's
//! slot stays valid until it is unlinked. Touching a key and popping the
//! least valuable key are both O(1).

const NIL: usize = usize::MAX;

#[derive(Debug)]
struct Node<K> {
    key: K,
    prev: usize,
    next: usize,
}

// == Eviction Order ==
/// Orders keys from least to most valuable.
///
/// - Head = least recently touched (next victim)
/// - Tail = most recently touched
///
/// Keys touched at the same moment cannot exist, so ties reduce to
/// insertion order: a key appended earlier sits closer to the head.
#[derive(Debug)]
pub struct EvictionOrder<K> {
    /// Node arena; `None` marks a free slot
    slots: Vec<Option<Node<K>>>,
    /// Recyclable slot indices
    free: Vec<usize>,
    head: usize,
    tail: usize,
    len: usize,
}

impl<K> Default for EvictionOrder<K> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K> EvictionOrder<K> {
    // == Constructor ==
    /// Creates a new empty order.
    pub fn new() -> Self {
        Self {
            slots: Vec::new(),
            free: Vec::new(),
            head: NIL,
            tail: NIL,
            len: 0,
        }
    }

    // == Push Back ==
    /// Appends a key as the most valuable and returns its slot.
    pub fn push_back(&mut self, key: K) -> usize {
        let node = Node {
            key,
            prev: self.tail,
            next: NIL,
        };
        let slot = match self.free.pop() {
            Some(slot) => {
                self.slots[slot] = Some(node);
                slot
            }
            None => {
                self.slots.push(Some(node));
                self.slots.len() - 1
            }
        };

        if let Some(tail) = self.node_mut(self.tail) {
            tail.next = slot;
        } else {
            self.head = slot;
        }
        self.tail = slot;
        self.len += 1;
        slot
    }

    // == Touch ==
    /// Moves the key in `slot` to the most valuable position.
    ///
    /// Unknown slots are ignored.
    pub fn touch(&mut self, slot: usize) {
        if slot == self.tail || self.node(slot).is_none() {
            return;
        }
        self.detach(slot);

        let old_tail = self.tail;
        if let Some(node) = self.node_mut(slot) {
            node.prev = old_tail;
            node.next = NIL;
        }
        if let Some(tail) = self.node_mut(old_tail) {
            tail.next = slot;
        } else {
            self.head = slot;
        }
        self.tail = slot;
    }

    // == Remove ==
    /// Unlinks the key in `slot` and returns it.
    pub fn remove(&mut self, slot: usize) -> Option<K> {
        self.node(slot)?;
        self.detach(slot);
        let node = self.slots[slot].take()?;
        self.free.push(slot);
        self.len -= 1;
        Some(node.key)
    }

    // == Front ==
    /// Returns the slot and key of the least valuable entry.
    pub fn front(&self) -> Option<(usize, &K)> {
        self.node(self.head).map(|node| (self.head, &node.key))
    }

    // == Pop Front ==
    /// Removes and returns the least valuable key.
    pub fn pop_front(&mut self) -> Option<K> {
        let head = self.head;
        self.remove(head)
    }

    // == Iterate ==
    /// Iterates keys from least to most valuable.
    pub fn iter(&self) -> Iter<'_, K> {
        Iter {
            order: self,
            cursor: self.head,
        }
    }

    // == Clear ==
    /// Drops every node.
    pub fn clear(&mut self) {
        self.slots.clear();
        self.free.clear();
        self.head = NIL;
        self.tail = NIL;
        self.len = 0;
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

    fn node(&self, slot: usize) -> Option<&Node<K>> {
        self.slots.get(slot).and_then(Option::as_ref)
    }

    fn node_mut(&mut self, slot: usize) -> Option<&mut Node<K>> {
        self.slots.get_mut(slot).and_then(Option::as_mut)
    }

    /// Splices `slot` out of the list, leaving its own links stale.
    fn detach(&mut self, slot: usize) {
        let (prev, next) = match self.node(slot) {
            Some(node) => (node.prev, node.next),
            None => return,
        };
        match self.node_mut(prev) {
            Some(node) => node.next = next,
            None => self.head = next,
        }
        match self.node_mut(next) {
            Some(node) => node.prev = prev,
            None => self.tail = prev,
        }
    }
}

/// Iterator over keys from least to most valuable.
pub struct Iter<'a, K> {
    order: &'a EvictionOrder<K>,
    cursor: usize,
}

impl<'a, K> Iterator for Iter<'a, K> {
    type Item = &'a K;

    fn next(&mut self) -> Option<Self::Item> {
        let node = self.order.node(self.cursor)?;
        self.cursor = node.next;
        Some(&node.key)
    }
}
