//! Skiplists use a probabilistic distribution of nodes over the internal
//! levels, whereby the lowest level (level 0) contains all the nodes, and
//! each level `n > 0` contains a random subset of the nodes on level
//! `n - 1`.
//!
//! Here the level of each new node is drawn from a binomial distribution:
//! with `t` total levels, the node participates in `1 + B` levels where `B`
//! counts successes over `t - 1` trials of probability `p`. It is very
//! unlikely that this will need to be changed as the default should
//! suffice, but if need be custom level generators can be implemented.

pub mod binomial;

pub use binomial::Binomial;

/// Upon the insertion of a new node in the list, the node is replicated to
/// high levels with a certain probability as determined by a
/// [`LevelGenerator`].
pub trait LevelGenerator {
    /// The total number of levels that are assumed to exist.
    #[must_use]
    fn total(&self) -> usize;

    /// Generate a random level for a new node in the range `[0, total)`.
    ///
    /// This function should _never_ return a level greater or equal to
    /// [`total`][LevelGenerator::total].
    #[must_use]
    fn random(&mut self) -> usize;
}
