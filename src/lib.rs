//! A skiplist-backed multiset keyed by value hashes, allowing elements to be
//! efficiently looked up, inserted and removed in `O(log(n))` on average.
//!
//! Every value is keyed by its hash, and all values sharing a hash are
//! grouped into a single node, so the list behaves as a multiset: hash
//! collisions are the supported grouping case, not an error. Conceptually,
//! the structure resembles something like:
//!
//! ```text
//! <head> ----------------> [20] ------------------------------------------->
//! <head> ----------------> [20] ----------------> [71] -------------------->
//! <head> ----------------> [20] --------> [56] -> [71] ------------> [93] ->
//! <head> -> [07] -> [14] -> [20] -> [32] -> [56] -> [71] -> [85] -> [93] ->
//! ```
//!
//! where each node `[k]` holds every value hashing to `k` together with
//! references to nodes further along the list, allowing the search to
//! effectively skip ahead. The number of levels a node occupies is drawn
//! from a [binomial distribution](level_generator::Binomial) at creation
//! time; the list performs no rebalancing beyond that randomized choice.
//!
//! # Examples
//!
//! ```
//! use hash_skiplist::HashSkipList;
//!
//! let mut list = HashSkipList::new();
//! list.insert("alpha");
//! list.insert("beta");
//! list.insert("alpha");
//!
//! // Two distinct keys, three stored values.
//! assert_eq!(list.len(), 2);
//! assert_eq!(list.num_values(), 3);
//! assert_eq!(list.count(&"alpha"), 2);
//!
//! assert_eq!(list.erase(&"alpha"), Some("alpha"));
//! assert_eq!(list.count(&"alpha"), 1);
//! ```

mod hash_skiplist;
pub mod level_generator;
mod skipnode;

pub use crate::{
    hash_skiplist::{DEFAULT_MAX_LEVEL, DEFAULT_PROBABILITY, HashSkipList},
    level_generator::{LevelGenerator, binomial::Binomial, binomial::BinomialError},
    skipnode::{Entry, IntoIter, Iter, Key},
};
