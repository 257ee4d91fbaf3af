//! A skiplist storing a multiset of values keyed by their hash.

use std::{
    cmp,
    collections::hash_map::RandomState,
    fmt,
    hash::{BuildHasher, Hash},
    iter, ptr,
};

use crate::{
    level_generator::{Binomial, LevelGenerator, binomial::BinomialError},
    skipnode::{Entry, IntoIter, Iter, Key, SkipNode},
};

/// The default number of levels.
pub const DEFAULT_MAX_LEVEL: usize = 16;

/// The default probability that a node present in one level is also present
/// in the next.
pub const DEFAULT_PROBABILITY: f64 = 0.5;

// ////////////////////////////////////////////////////////////////////////////
// HashSkipList
// ////////////////////////////////////////////////////////////////////////////

/// A skiplist-backed multiset keyed by value hashes.
///
/// Every value is stored under the `u64` produced by hashing it with the
/// list's [`BuildHasher`] (a randomly seeded [`RandomState`] by default).
/// Values sharing a hash are grouped in a single node, so collisions are
/// the supported grouping case rather than an error, and inserting a value
/// twice stores it twice.
///
/// Lookup, insertion and removal all descend the levels from the top and
/// take expected `O(log(n))` node visits; the worst case under degenerate
/// leveling is `O(n)`. The structural balance relies entirely on the
/// randomized level assignment of [`Binomial`] — there is no rebalancing.
///
/// The list is move-only: it can be transferred but not cloned, as copying
/// would require deep-cloning every node and relinking all levels.
///
/// # Examples
///
/// ```
/// use hash_skiplist::HashSkipList;
///
/// let mut list = HashSkipList::new();
/// list.insert(5_u64);
/// list.insert(5);
/// list.insert(12);
///
/// assert_eq!(list.len(), 2);
/// assert_eq!(list.count(&5), 2);
/// assert!(list.find(&12).is_some());
/// ```
pub struct HashSkipList<V, S = RandomState> {
    head: Box<SkipNode<V>>,
    len: usize,
    num_values: usize,
    level_generator: Binomial,
    hash_builder: S,
}

// ///////////////////////////////////////////////
// Inherent methods
// ///////////////////////////////////////////////

impl<V> HashSkipList<V> {
    /// Create a new skiplist with [`DEFAULT_MAX_LEVEL`] levels and a
    /// promotion probability of [`DEFAULT_PROBABILITY`].
    ///
    /// # Examples
    ///
    /// ```
    /// use hash_skiplist::HashSkipList;
    ///
    /// let mut list: HashSkipList<i64> = HashSkipList::new();
    /// ```
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::with_hasher(RandomState::new())
    }

    /// Create a new skiplist with the given number of levels and promotion
    /// probability.
    ///
    /// # Errors
    ///
    /// `max_level` must be at least 1 and `probability` strictly between
    /// 0 and 1; violations are reported here rather than deferred into
    /// later operations.
    ///
    /// # Examples
    ///
    /// ```
    /// use hash_skiplist::HashSkipList;
    ///
    /// let mut list: HashSkipList<i64> = HashSkipList::with_config(4, 0.5).unwrap();
    /// assert!(HashSkipList::<i64>::with_config(0, 0.5).is_err());
    /// ```
    #[inline]
    pub fn with_config(max_level: usize, probability: f64) -> Result<Self, BinomialError> {
        Self::with_config_and_hasher(max_level, probability, RandomState::new())
    }

    /// Constructs a new, empty skiplist with the optimal number of levels
    /// for the intended capacity. Specifically, it uses
    /// `floor(log2(capacity))` levels, ensuring that only *a few* nodes
    /// occupy the highest level.
    ///
    /// # Examples
    ///
    /// ```
    /// use hash_skiplist::HashSkipList;
    ///
    /// let mut list = HashSkipList::with_capacity(100);
    /// list.extend(0..100_u64);
    /// ```
    #[inline]
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        #[allow(
            clippy::cast_possible_truncation,
            clippy::cast_precision_loss,
            clippy::cast_sign_loss
        )]
        let levels = cmp::max(1, (capacity as f64).log2().floor() as usize);
        Self::with_config(levels, DEFAULT_PROBABILITY)
            .expect("capacity-derived configuration is valid")
    }
}

impl<V, S> HashSkipList<V, S> {
    /// Create a new skiplist with the default configuration and the given
    /// hasher, which fixes how values are keyed.
    pub fn with_hasher(hash_builder: S) -> Self {
        let generator = Binomial::new(DEFAULT_MAX_LEVEL, DEFAULT_PROBABILITY)
            .expect("default configuration is valid");
        Self::with_generator(generator, hash_builder)
    }

    /// Create a new skiplist with the given configuration and hasher.
    ///
    /// # Errors
    ///
    /// The same configuration requirements as
    /// [`with_config`][HashSkipList::with_config] apply.
    pub fn with_config_and_hasher(
        max_level: usize,
        probability: f64,
        hash_builder: S,
    ) -> Result<Self, BinomialError> {
        Ok(Self::with_generator(
            Binomial::new(max_level, probability)?,
            hash_builder,
        ))
    }

    /// Assemble a skiplist from an explicit level generator and hasher.
    ///
    /// This is the fully deterministic construction path: a
    /// [seeded][Binomial::seeded] generator together with a fixed hasher
    /// makes the list's internal structure reproducible.
    pub fn with_generator(generator: Binomial, hash_builder: S) -> Self {
        HashSkipList {
            head: Box::new(SkipNode::head(generator.total())),
            len: 0,
            num_values: 0,
            level_generator: generator,
            hash_builder,
        }
    }

    /// The number of levels the list can use, fixed at construction.
    #[inline]
    #[must_use]
    pub fn max_level(&self) -> usize {
        self.level_generator.total()
    }

    /// The level promotion probability, fixed at construction.
    #[inline]
    #[must_use]
    pub fn probability(&self) -> f64 {
        self.level_generator.probability()
    }

    /// Returns the number of distinct keys in the skiplist. Values sharing
    /// a hash count once.
    ///
    /// # Examples
    ///
    /// ```
    /// use hash_skiplist::HashSkipList;
    ///
    /// let mut list = HashSkipList::new();
    /// list.insert(7_u64);
    /// list.insert(7);
    /// assert_eq!(list.len(), 1);
    /// ```
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.len
    }

    /// Returns `true` if the skiplist contains no values.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Returns the total number of stored values, counting duplicates.
    #[inline]
    #[must_use]
    pub fn num_values(&self) -> usize {
        self.num_values
    }

    /// Clears the skiplist, removing all values.
    ///
    /// # Examples
    ///
    /// ```
    /// use hash_skiplist::HashSkipList;
    ///
    /// let mut list = HashSkipList::new();
    /// list.extend(0..10_u64);
    /// list.clear();
    /// assert!(list.is_empty());
    /// ```
    #[inline]
    pub fn clear(&mut self) {
        self.len = 0;
        self.num_values = 0;
        *self.head = SkipNode::head(self.level_generator.total());
    }

    /// Creates an iterator over the entries of the skiplist, in ascending
    /// key order.
    ///
    /// The iterator is double-ended; it walks the base level only and any
    /// structural change to the list invalidates it (which the borrow
    /// checker enforces).
    ///
    /// # Examples
    ///
    /// ```
    /// use hash_skiplist::HashSkipList;
    ///
    /// let mut list = HashSkipList::new();
    /// list.extend(0..10_u64);
    /// for entry in list.iter() {
    ///     println!("{}: {:?}", entry.key(), entry.values());
    /// }
    /// ```
    pub fn iter(&self) -> Iter<'_, V> {
        if self.is_empty() {
            Iter {
                first: None,
                last: None,
                size: 0,
            }
        } else {
            Iter {
                first: self.head.next_ref(),
                last: Some(self.head.last()),
                size: self.len,
            }
        }
    }

    /// The entry with the smallest key, or `None` if the list is empty.
    #[inline]
    pub fn front(&self) -> Option<Entry<'_, V>> {
        self.iter().next()
    }

    /// The entry with the largest key, or `None` if the list is empty.
    #[inline]
    pub fn back(&self) -> Option<Entry<'_, V>> {
        self.iter().next_back()
    }

    /// Get an owning iterator over the entries of the skiplist, yielding
    /// each key together with its values in ascending key order.
    #[allow(clippy::should_implement_trait)]
    #[must_use]
    pub fn into_iter(mut self) -> IntoIter<V> {
        let mut last = self.head.last_mut() as *mut SkipNode<V>;
        if ptr::eq(last, self.head.as_ref()) {
            last = ptr::null_mut();
        }
        let size = self.len;
        // SAFETY: self.head is no longer used; it's okay that its links
        // become dangling.
        let first = unsafe { self.head.take_tail() };
        IntoIter { first, last, size }
    }

    /// The entry stored under the given raw key, if any.
    pub fn entry(&self, key: Key) -> Option<Entry<'_, V>> {
        self.head.find_key(key).map(Entry::new)
    }
}

impl<V, S> HashSkipList<V, S>
where
    V: Hash,
    S: BuildHasher,
{
    /// The key a value is stored under.
    fn key_of(&self, value: &V) -> Key {
        self.hash_builder.hash_one(value)
    }

    /// Insert the value into the skiplist.
    ///
    /// If a node for the value's hash already exists, the value joins that
    /// node's multiset and no structural change occurs. Otherwise a new
    /// node is created with a freshly drawn level and spliced in.
    ///
    /// # Examples
    ///
    /// ```
    /// use hash_skiplist::HashSkipList;
    ///
    /// let mut list = HashSkipList::new();
    /// list.insert(0_u64);
    /// list.insert(5);
    /// assert_eq!(list.len(), 2);
    /// assert!(!list.is_empty());
    /// ```
    pub fn insert(&mut self, value: V) {
        let key = self.key_of(&value);
        if let Some(node) = self.head.find_key_mut(key) {
            node.values.push(value);
            self.num_values += 1;
            return;
        }
        let level = self.level_generator.random();
        self.head.insert(Box::new(SkipNode::new(key, value, level)));
        self.len += 1;
        self.num_values += 1;
    }

    /// Find the entry for the given value's hash.
    ///
    /// The lookup is by hash only: the entry groups every value colliding
    /// on that hash, so inspect [`Entry::values`] (or use
    /// [`contains`][HashSkipList::contains]) for the specific value.
    ///
    /// # Examples
    ///
    /// ```
    /// use hash_skiplist::HashSkipList;
    ///
    /// let mut list = HashSkipList::new();
    /// list.insert("hello");
    /// let entry = list.find(&"hello").unwrap();
    /// assert!(entry.contains(&"hello"));
    /// assert!(list.find(&"absent").is_none());
    /// ```
    pub fn find(&self, value: &V) -> Option<Entry<'_, V>> {
        self.entry(self.key_of(value))
    }

    /// Returns `true` if the value itself (not merely its hash) is stored.
    ///
    /// # Examples
    ///
    /// ```
    /// use hash_skiplist::HashSkipList;
    ///
    /// let mut list = HashSkipList::new();
    /// list.extend(0..10_u64);
    /// assert!(list.contains(&4));
    /// assert!(!list.contains(&15));
    /// ```
    pub fn contains(&self, value: &V) -> bool
    where
        V: PartialEq,
    {
        self.find(value).is_some_and(|entry| entry.contains(value))
    }

    /// The number of occurrences of the given value.
    pub fn count(&self, value: &V) -> usize
    where
        V: PartialEq,
    {
        self.find(value).map_or(0, |entry| {
            entry
                .values()
                .iter()
                .filter(|existing| *existing == value)
                .count()
        })
    }

    /// Remove one occurrence of the value, returning it.
    ///
    /// When the last occurrence under a key is removed, the node is
    /// unlinked from every level it participates in and released. Erasing
    /// an absent value is a no-op returning `None`, which makes `erase`
    /// idempotent.
    ///
    /// # Examples
    ///
    /// ```
    /// use hash_skiplist::HashSkipList;
    ///
    /// let mut list = HashSkipList::new();
    /// list.insert(4_u64);
    /// assert_eq!(list.erase(&4), Some(4));
    /// assert_eq!(list.erase(&4), None);
    /// ```
    pub fn erase(&mut self, value: &V) -> Option<V>
    where
        V: PartialEq,
    {
        let key = self.key_of(value);
        let (removed, now_empty) = {
            let node = self.head.find_key_mut(key)?;
            let index = node.values.iter().position(|existing| existing == value)?;
            let removed = node.values.swap_remove(index);
            (removed, node.values.is_empty())
        };
        self.num_values -= 1;
        // The node was just found, so the unlink cannot miss.
        if now_empty && self.head.remove(key).is_some() {
            self.len -= 1;
        }
        Some(removed)
    }
}

// ///////////////////////////////////////////////
// Internal methods
// ///////////////////////////////////////////////

impl<V, S> HashSkipList<V, S> {
    /// Checks the integrity of the skiplist.
    #[allow(dead_code)]
    fn check(&self) {
        self.head.check();
        assert_eq!(self.len, self.iter().count());
        assert_eq!(
            self.num_values,
            self.iter().map(|entry| entry.count()).sum::<usize>()
        );
    }
}

// ///////////////////////////////////////////////
// Trait implementation
// ///////////////////////////////////////////////

// The raw node links opt the type out of the auto traits; the list owns
// every node exclusively, so it may cross threads whenever its contents
// can.
unsafe impl<V: Send, S: Send> Send for HashSkipList<V, S> {}
unsafe impl<V: Sync, S: Sync> Sync for HashSkipList<V, S> {}

impl<V, S: Default> Default for HashSkipList<V, S> {
    fn default() -> Self {
        Self::with_hasher(S::default())
    }
}

impl<V, S> Extend<V> for HashSkipList<V, S>
where
    V: Hash,
    S: BuildHasher,
{
    #[inline]
    fn extend<I: iter::IntoIterator<Item = V>>(&mut self, iterable: I) {
        for element in iterable {
            self.insert(element);
        }
    }
}

impl<V> iter::FromIterator<V> for HashSkipList<V>
where
    V: Hash,
{
    #[inline]
    fn from_iter<I>(iter: I) -> Self
    where
        I: iter::IntoIterator<Item = V>,
    {
        let mut list = HashSkipList::new();
        list.extend(iter);
        list
    }
}

impl<V, S> iter::IntoIterator for HashSkipList<V, S> {
    type Item = (Key, Vec<V>);
    type IntoIter = IntoIter<V>;

    fn into_iter(self) -> IntoIter<V> {
        self.into_iter()
    }
}

impl<'a, V, S> iter::IntoIterator for &'a HashSkipList<V, S> {
    type Item = Entry<'a, V>;
    type IntoIter = Iter<'a, V>;

    fn into_iter(self) -> Iter<'a, V> {
        self.iter()
    }
}

impl<V, S> fmt::Debug for HashSkipList<V, S>
where
    V: fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map()
            .entries(self.iter().map(|entry| (entry.key(), entry.values())))
            .finish()
    }
}

// ////////////////////////////////////////////////////////////////////////////
// Tests
// ////////////////////////////////////////////////////////////////////////////
