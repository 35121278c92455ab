//! Common bound aliases used across graph code.
//!
//! These traits have blanket impls, so any type satisfying the underlying
//! bounds will automatically implement them. They are zero-cost and only
//! reduce duplication in `where` clauses.

/// Canonical bound set for node keys.
///
/// Rationale:
/// - `Copy` for cheap pass-by-value in tight loops
/// - `Eq + Hash` for the `HashMap`-backed node map
/// - `Ord` for deterministic parent iteration (sorted parent sets)
/// - `Debug` for diagnostics and invariant checks
pub trait NodeKey: Copy + Eq + std::hash::Hash + Ord + std::fmt::Debug {}
impl<T> NodeKey for T where T: Copy + Eq + std::hash::Hash + Ord + std::fmt::Debug {}

/// Minimal bound we expect for node payloads: evaluation callbacks receive
/// cloned parent snapshots. Keep this deliberately small to avoid
/// over-constraining higher layers.
pub trait PayloadLike: Clone {}
impl<T: Clone> PayloadLike for T {}
