//! The nodes making up the skiplist, and the iterators over them.

use std::marker::PhantomData;
use std::{iter, mem, ptr};

/// The ordering key of a node: the hash shared by every value stored in it.
pub type Key = u64;

// ////////////////////////////////////////////////////////////////////////////
// SkipNode
// ////////////////////////////////////////////////////////////////////////////

/// SkipNodes make up the [`HashSkipList`][crate::HashSkipList]. The list
/// owns the head node (which holds no values) and each node has ownership
/// of the next node through `links[0]`.
///
/// Each node carries the hash key it is ordered by and the multiset of
/// values hashing to that key. The head is the only node without a key; it
/// orders below every real key, so a value hashing to `0` can never match
/// it. A null link is the end marker terminating a level.
///
/// A node has a `level` which corresponds to how 'high' the node reaches:
/// a node of level `n` has `n + 1` links to next nodes, stored in a vector.
/// Only the link at level 0 is owning. Each node also links to the
/// immediately previous node so the list can be walked backwards.
#[derive(Debug)]
pub struct SkipNode<V> {
    /// The hash key; `None` only for the head node.
    pub key: Option<Key>,
    /// The multiset of values hashing to `key`; empty only for the head.
    pub values: Vec<V>,
    /// How high the node reaches.
    pub level: usize,
    /// The immediately previous element.
    pub prev: *mut SkipNode<V>,
    /// Vector of links to the next node participating in the respective
    /// level. This vector *must* be of length `self.level + 1`. `links[0]`
    /// stores a pointer to the next node, which will have to be dropped.
    pub links: Vec<*mut SkipNode<V>>,
    // Owns self.links[0]
    _phantom_link: PhantomData<SkipNode<V>>,
}

// ///////////////////////////////////////////////
// Inherent methods
// ///////////////////////////////////////////////

impl<V> SkipNode<V> {
    /// Create a new head node.
    pub fn head(total_levels: usize) -> Self {
        SkipNode {
            key: None,
            values: Vec::new(),
            level: total_levels - 1,
            prev: ptr::null_mut(),
            links: iter::repeat(ptr::null_mut()).take(total_levels).collect(),
            _phantom_link: PhantomData,
        }
    }

    /// Create a new SkipNode for the given key, seeded with one value.
    /// All pointers default to null.
    pub fn new(key: Key, value: V, level: usize) -> Self {
        SkipNode {
            key: Some(key),
            values: vec![value],
            level,
            prev: ptr::null_mut(),
            links: iter::repeat(ptr::null_mut()).take(level + 1).collect(),
            _phantom_link: PhantomData,
        }
    }

    /// Consumes the node, returning its key and values. The head yields
    /// `None`.
    pub fn into_inner(mut self) -> Option<(Key, Vec<V>)> {
        let key = self.key.take()?;
        Some((key, mem::take(&mut self.values)))
    }

    /// Returns `true` if the node is a head-node.
    pub fn is_head(&self) -> bool {
        self.prev.is_null()
    }

    /// The next node in base-level order, if any.
    pub fn next_ref(&self) -> Option<&Self> {
        self.next_at(0)
    }

    /// The next node in base-level order, if any.
    pub fn next_mut(&mut self) -> Option<&mut Self> {
        // SAFETY: all links either point to a live node or are null.
        unsafe { self.links[0].as_mut() }
    }

    fn next_at(&self, level: usize) -> Option<&Self> {
        // SAFETY: all links either point to a live node or are null.
        unsafe { self.links[level].cast_const().as_ref() }
    }

    /// Takes the next node and sets its prev link to null.
    ///
    /// SAFETY: please make sure no link at level 1 or greater becomes
    /// dangling.
    pub unsafe fn take_tail(&mut self) -> Option<Box<Self>> {
        let next = self.links[0];
        if next.is_null() {
            None
        } else {
            // SAFETY: links[0] is owned by this node and points to a live
            // node.
            let mut next = unsafe { Box::from_raw(next) };
            next.prev = ptr::null_mut();
            self.links[0] = ptr::null_mut();
            Some(next)
        }
    }

    /// Replace the next node, returning the old one.
    ///
    /// SAFETY: please make sure all links are fixed.
    pub unsafe fn replace_tail(&mut self, mut new_next: Box<Self>) -> Option<Box<Self>> {
        // SAFETY: the caller fixes links at other levels.
        let mut old_next = unsafe { self.take_tail() };
        if let Some(old_next) = old_next.as_mut() {
            old_next.prev = ptr::null_mut();
        }
        new_next.prev = self as *mut _;
        self.links[0] = Box::into_raw(new_next);
        old_next
    }

    // /////////////////////////////
    // Descent
    // /////////////////////////////

    /// Move to the next node at the given level if the given predicate is
    /// true. The predicate takes references to the current node and the
    /// next node.
    ///
    /// Returns `Err(self)` if no move is possible, so the methods can be
    /// used in loops without `self` staying borrowed in the failure branch.
    pub fn next_if_at_level(
        &self,
        level: usize,
        predicate: impl FnOnce(&Self, &Self) -> bool,
    ) -> Result<&Self, &Self> {
        match self.next_at(level) {
            Some(next) if predicate(self, next) => Ok(next),
            _ => Err(self),
        }
    }

    /// Move to the next node at the given level if the given predicate is
    /// true. The predicate takes references to the current node and the
    /// next node.
    pub fn next_if_at_level_mut(
        &mut self,
        level: usize,
        predicate: impl FnOnce(&Self, &Self) -> bool,
    ) -> Result<&mut Self, &mut Self> {
        // SAFETY: all links either point to a live node or are null.
        let next = unsafe { self.links[level].as_mut() };
        match next {
            Some(next) if predicate(self, next) => Ok(next),
            _ => Err(self),
        }
    }

    /// Keep moving at the specified level as long as pred is true.
    /// pred takes reference to current node and next node.
    pub fn advance_while_at_level(
        &self,
        level: usize,
        mut pred: impl FnMut(&Self, &Self) -> bool,
    ) -> &Self {
        let mut current = self;
        loop {
            match current.next_if_at_level(level, &mut pred) {
                Ok(node) => current = node,
                Err(node) => return node,
            }
        }
    }

    /// Keep moving at the specified level as long as pred is true.
    /// pred takes reference to current node and next node.
    pub fn advance_while_at_level_mut(
        &mut self,
        level: usize,
        mut pred: impl FnMut(&Self, &Self) -> bool,
    ) -> &mut Self {
        let mut current = self;
        loop {
            match current.next_if_at_level_mut(level, &mut pred) {
                Ok(node) => current = node,
                Err(node) => return node,
            }
        }
    }

    /// Move to the last node reachable from this node.
    pub fn last(&self) -> &Self {
        (0..=self.level).rev().fold(self, |node, level| {
            node.advance_while_at_level(level, |_, _| true)
        })
    }

    /// Move to the last node reachable from this node.
    pub fn last_mut(&mut self) -> &mut Self {
        (0..=self.level).rev().fold(self, |node, level| {
            node.advance_while_at_level_mut(level, |_, _| true)
        })
    }

    /// Returns the last node whose key is less than or equal to the given
    /// key, or the starting node itself (usually the head) if no node
    /// qualifies.
    ///
    /// Descends from the highest level to level 0, advancing while the next
    /// node's key does not exceed the target. On return, at every level the
    /// next node's key (if any) is strictly greater than the target.
    pub fn find_last_le(&self, key: Key) -> &Self {
        (0..=self.level).rev().fold(self, |node, level| {
            node.advance_while_at_level(level, |_, next| {
                next.key.is_some_and(|next_key| next_key <= key)
            })
        })
    }

    /// Returns the last node whose key is less than or equal to the given
    /// key, or the starting node itself if no node qualifies.
    pub fn find_last_le_mut(&mut self, key: Key) -> &mut Self {
        (0..=self.level).rev().fold(self, |node, level| {
            node.advance_while_at_level_mut(level, |_, next| {
                next.key.is_some_and(|next_key| next_key <= key)
            })
        })
    }

    /// Find the node with exactly the given key. Never matches the head.
    pub fn find_key(&self, key: Key) -> Option<&Self> {
        let candidate = self.find_last_le(key);
        if candidate.key == Some(key) {
            Some(candidate)
        } else {
            None
        }
    }

    /// Find the node with exactly the given key. Never matches the head.
    pub fn find_key_mut(&mut self, key: Key) -> Option<&mut Self> {
        let candidate = self.find_last_le_mut(key);
        if candidate.key == Some(key) {
            Some(candidate)
        } else {
            None
        }
    }

    // /////////////////////////////
    // Pointer Manipulations
    // /////////////////////////////

    /// Splice a freshly created node into its key-ordered position,
    /// relinking every level the new node participates in.
    ///
    /// The caller must ensure no node with the same key is already present.
    ///
    /// # Panics
    ///
    /// Only the head may insert nodes, and the new node's level may not
    /// exceed the head's.
    pub fn insert(&mut self, new_node: Box<Self>) -> &mut Self {
        assert!(self.is_head(), "Only the head may insert nodes!");
        assert!(
            self.level >= new_node.level,
            "You may not insert nodes with level higher than the head!"
        );
        let key = new_node.key.expect("new node must carry a key");
        // SAFETY: there is nothing before the head and the descent starts
        // at the head's highest level, so every affected link is fixed on
        // the way back up.
        unsafe { self.insert_at(self.level, new_node, key) }
    }

    /// Recursive insertion helper.
    ///
    /// Finds the strict predecessor at the current level, recurses to fix
    /// all links below, then wires this level if the new node reaches it.
    ///
    /// SAFETY: this function only fixes links at or after `self`, and only
    /// fixes links at or below `level`.
    unsafe fn insert_at(&mut self, level: usize, mut new_node: Box<Self>, key: Key) -> &mut Self {
        let prev_node = self.advance_while_at_level_mut(level, |_, next| {
            next.key.is_some_and(|next_key| next_key < key)
        });
        let prev_node_p = prev_node as *mut Self;
        if level == 0 {
            // {take|replace}_tail take care of the links and prev pointers
            // at level 0.
            // SAFETY: the unwinding callers take care of links at other
            // levels.
            unsafe {
                if let Some(tail) = prev_node.take_tail() {
                    new_node.replace_tail(tail);
                }
                prev_node.replace_tail(new_node);
                prev_node.next_mut().unwrap()
            }
        } else {
            // SAFETY: the recursive call fixes all links below this level.
            let inserted = unsafe { prev_node.insert_at(level - 1, new_node, key) };
            // insert_at borrows `prev_node` for the rest of the call, so a
            // fresh reference is needed.
            // SAFETY: it can never alias with `inserted`.
            let prev_node = unsafe { &mut *prev_node_p };
            if level <= inserted.level {
                inserted.links[level] = prev_node.links[level];
                prev_node.links[level] = inserted as *mut _;
            }
            inserted
        }
    }

    /// Unlink and return the node with the given key, repointing every
    /// level that referenced it. Returns `None`, leaving the structure
    /// untouched, if no node has that key.
    ///
    /// # Panics
    ///
    /// Only the head may remove nodes.
    pub fn remove(&mut self, key: Key) -> Option<Box<Self>> {
        assert!(self.is_head(), "Only the head may remove nodes!");
        // SAFETY: there is nothing before the head and the descent starts
        // at the head's highest level, so every affected link is fixed on
        // the way back up.
        unsafe { self.remove_at(self.level, key) }
    }

    /// Recursive removal helper.
    ///
    /// Finds the strict predecessor at the current level, recurses to
    /// detach the node below, then repoints this level if the removed node
    /// participated in it. Nothing is mutated until level 0 confirms the
    /// key is present.
    ///
    /// SAFETY: this function only fixes links at or after `self`, and only
    /// fixes links at or below `level`.
    unsafe fn remove_at(&mut self, level: usize, key: Key) -> Option<Box<Self>> {
        let prev_node = self.advance_while_at_level_mut(level, |_, next| {
            next.key.is_some_and(|next_key| next_key < key)
        });
        let prev_node_p = prev_node as *mut Self;
        if level == 0 {
            if prev_node.next_ref()?.key != Some(key) {
                return None;
            }
            // SAFETY: the unwinding callers take care of links at other
            // levels.
            unsafe {
                let mut removed = prev_node.take_tail()?;
                if let Some(new_tail) = removed.take_tail() {
                    prev_node.replace_tail(new_tail);
                }
                Some(removed)
            }
        } else {
            // SAFETY: the recursive call fixes all links below this level.
            let removed = unsafe { prev_node.remove_at(level - 1, key)? };
            // SAFETY: a fresh reference; it never aliases `removed`, which
            // is already detached from level 0.
            let prev_node = unsafe { &mut *prev_node_p };
            if level <= removed.level {
                debug_assert!(ptr::eq(prev_node.links[level], &*removed));
                prev_node.links[level] = removed.links[level];
            }
            Some(removed)
        }
    }

    // /////////////////////////////
    // Integrity
    // /////////////////////////////

    /// Checks the integrity of the list hanging off this head: strictly
    /// increasing keys on the base level, consistent prev links, correctly
    /// sized link vectors, and each upper level visiting exactly the nodes
    /// that participate in it.
    #[allow(dead_code)]
    pub fn check(&self) {
        assert!(self.is_head());
        assert!(self.key.is_none());
        assert!(self.values.is_empty());
        assert_eq!(self.links.len(), self.level + 1);

        // Base-level census.
        let mut expected: Vec<(Key, usize)> = Vec::new();
        let mut node = self;
        while let Some(next) = node.next_ref() {
            assert!(ptr::eq(next.prev, node), "prev link mismatch");
            assert!(next.level <= self.level, "node reaches above the head");
            assert_eq!(next.links.len(), next.level + 1);
            assert!(!next.values.is_empty(), "interior node holds no values");
            let key = next.key.expect("interior node carries no key");
            if let Some(&(prev_key, _)) = expected.last() {
                assert!(prev_key < key, "base level keys not strictly increasing");
            }
            expected.push((key, next.level));
            node = next;
        }

        // Every upper level must link precisely the participating nodes,
        // in the same order.
        for level in 1..=self.level {
            let mut participants = expected
                .iter()
                .filter(|&&(_, node_level)| node_level >= level)
                .map(|&(key, _)| key);
            let mut node = self;
            while let Some(next) = node.next_at(level) {
                assert_eq!(participants.next(), next.key, "level {level} chain mismatch");
                node = next;
            }
            assert_eq!(participants.next(), None, "level {level} chain too short");
        }
    }
}

impl<V> Drop for SkipNode<V> {
    fn drop(&mut self) {
        // SAFETY: all nodes are going to be dropped; it's okay that links
        // above level 0 become dangling.
        unsafe {
            let mut node = self.take_tail();
            while let Some(mut node_inner) = node {
                node = node_inner.take_tail();
            }
        }
    }
}

// ////////////////////////////////////////////////////////////////////////////
// Entry
// ////////////////////////////////////////////////////////////////////////////

/// A borrowed view of one node: its hash key and the multiset of values
/// stored under it.
#[derive(Clone, Copy, Debug)]
pub struct Entry<'a, V> {
    key: Key,
    values: &'a [V],
}

impl<'a, V> Entry<'a, V> {
    pub(crate) fn new(node: &'a SkipNode<V>) -> Self {
        Entry {
            key: node.key.expect("entries only view interior nodes"),
            values: &node.values,
        }
    }

    /// The hash key shared by every value in this entry.
    #[must_use]
    pub fn key(&self) -> Key {
        self.key
    }

    /// The values hashing to this entry's key, in unspecified order.
    #[must_use]
    pub fn values(&self) -> &'a [V] {
        self.values
    }

    /// The number of values stored under this key. Always at least 1.
    #[must_use]
    pub fn count(&self) -> usize {
        self.values.len()
    }

    /// Whether this entry's multiset contains the given value.
    pub fn contains(&self, value: &V) -> bool
    where
        V: PartialEq,
    {
        self.values.contains(value)
    }
}

// /////////////////////////////////
// Iterators
// /////////////////////////////////
// The iterators only pop from front and back. There's no need for a dummy
// head in the iterator, so the members are named first and last instead of
// head/end to avoid confusion.

/// Iterator over the entries of a list, in ascending key order.
pub struct Iter<'a, V> {
    pub(crate) first: Option<&'a SkipNode<V>>,
    pub(crate) last: Option<&'a SkipNode<V>>,
    pub(crate) size: usize,
}

impl<'a, V> Iterator for Iter<'a, V> {
    type Item = Entry<'a, V>;

    fn next(&mut self) -> Option<Self::Item> {
        let current_node = self.first?;
        let last_node = self.last?;
        if ptr::eq(current_node, last_node) {
            self.first = None;
            self.last = None;
        } else {
            self.first = current_node.next_ref();
        }
        self.size -= 1;
        Some(Entry::new(current_node))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.size, Some(self.size))
    }
}

impl<V> DoubleEndedIterator for Iter<'_, V> {
    fn next_back(&mut self) -> Option<Self::Item> {
        let last_node = self.last?;
        let first_node = self.first?;
        if ptr::eq(first_node, last_node) {
            self.first = None;
            self.last = None;
        } else {
            // SAFETY: the iterator is not empty yet, so last has a
            // predecessor.
            self.last = unsafe { last_node.prev.cast_const().as_ref() };
        }
        self.size -= 1;
        Some(Entry::new(last_node))
    }
}

/// Consuming iterator, yielding each key together with its values.
pub struct IntoIter<V> {
    pub(crate) first: Option<Box<SkipNode<V>>>,
    pub(crate) last: *mut SkipNode<V>,
    pub(crate) size: usize,
}

impl<V> Iterator for IntoIter<V> {
    type Item = (Key, Vec<V>);

    fn next(&mut self) -> Option<Self::Item> {
        let mut popped_node = self.first.take()?;
        self.size -= 1;
        // SAFETY: no need to fix links at upper levels inside iterators.
        self.first = unsafe { popped_node.take_tail() };
        if self.first.is_none() {
            self.last = ptr::null_mut();
        }
        popped_node.into_inner()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.size, Some(self.size))
    }
}

impl<V> DoubleEndedIterator for IntoIter<V> {
    fn next_back(&mut self) -> Option<Self::Item> {
        self.first.as_ref()?;
        assert!(
            !self.last.is_null(),
            "IntoIter.first is set but IntoIter.last is null"
        );

        // SAFETY: we already checked self.last is not null.
        let new_last = unsafe { (*self.last).prev };
        let popped_node = if new_last.is_null() {
            self.first.take()?
        } else {
            // SAFETY: new_last is not null and there's no need to fix links
            // at upper levels inside iterators.
            unsafe { (*new_last).take_tail()? }
        };
        self.last = new_last;
        self.size -= 1;
        popped_node.into_inner()
    }
}

// ////////////////////////////////////////////////////////////////////////////
// Tests
// ////////////////////////////////////////////////////////////////////////////

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::{Key, SkipNode};

    /// Build a head with `total` levels and splice in one node per
    /// (key, level) pair, in the order given.
    fn new_list(total: usize, nodes: &[(Key, usize)]) -> Box<SkipNode<Key>> {
        let mut head = Box::new(SkipNode::head(total));
        for &(key, level) in nodes {
            head.insert(Box::new(SkipNode::new(key, key, level)));
        }
        head
    }

    #[test]
    fn insert_orders_keys() {
        let head = new_list(4, &[(30, 1), (10, 0), (40, 3), (20, 2)]);
        head.check();

        let mut keys = Vec::new();
        let mut node: &SkipNode<Key> = &head;
        while let Some(next) = node.next_ref() {
            keys.push(next.key.unwrap());
            node = next;
        }
        assert_eq!(keys, vec![10, 20, 30, 40]);
    }

    #[test]
    fn find_last_le_boundaries() {
        let head = new_list(4, &[(10, 0), (20, 2), (30, 1), (40, 3)]);

        assert_eq!(head.find_last_le(5).key, None); // head itself
        assert_eq!(head.find_last_le(10).key, Some(10));
        assert_eq!(head.find_last_le(15).key, Some(10));
        assert_eq!(head.find_last_le(40).key, Some(40));
        assert_eq!(head.find_last_le(u64::MAX).key, Some(40));
    }

    #[test]
    fn find_key_is_exact() {
        let head = new_list(4, &[(10, 0), (20, 2), (30, 1)]);

        assert_eq!(head.find_key(20).and_then(|node| node.key), Some(20));
        assert!(head.find_key(15).is_none());
        assert!(head.find_key(0).is_none());
    }

    #[test]
    fn remove_relinks_all_levels() {
        let mut head = new_list(4, &[(10, 0), (20, 3), (30, 1), (40, 2)]);

        // 20 participates in every level; removing it must repoint them
        // all.
        let removed = head.remove(20).unwrap();
        assert_eq!(removed.key, Some(20));
        head.check();

        assert!(head.find_key(20).is_none());
        assert_eq!(head.find_last_le(25).key, Some(10));
    }

    #[test]
    fn remove_missing_is_noop() {
        let mut head = new_list(4, &[(10, 0), (30, 1)]);
        assert!(head.remove(20).is_none());
        head.check();
        assert_eq!(head.find_key(10).and_then(|node| node.key), Some(10));
        assert_eq!(head.find_key(30).and_then(|node| node.key), Some(30));
    }

    #[test]
    #[should_panic = "level higher than the head"]
    fn insert_above_head_level_panics() {
        let mut head: SkipNode<Key> = SkipNode::head(2);
        head.insert(Box::new(SkipNode::new(1, 1, 5)));
    }

    #[test]
    fn drop_long_chain_is_iterative() {
        // Descending keys keep each splice O(1); a deep recursion in Drop
        // would overflow the stack here.
        let nodes: Vec<_> = (0..100_000).rev().map(|i| (i, 0)).collect();
        let _head = new_list(1, &nodes);
    }
}
