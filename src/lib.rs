#![cfg_attr(docsrs, feature(doc_cfg))]
//! # dirty-dag
//!
//! dirty-dag is an in-process incremental dependency graph for Rust. Nodes
//! carry caller-supplied ids and arbitrary payloads; edges carry version
//! cursors that record how much of each producer a dependent has consumed.
//! Evaluation walks a cached, deduplicated ancestor order and fires a
//! callback only for the entries whose producers actually moved, serially
//! or on a rayon pool.
//!
//! ## Features
//! - Mutable DAG over plain `Copy + Ord + Hash` ids, with cycle-refusing
//!   edge insertion and subgraph removal that preserves shared ancestors
//! - Per-edge version cursors, so dirtiness is tracked per dependency
//!   rather than per node
//! - Lazily built, cached evaluation orders shared by all engines
//! - Sequential (`evaluate`/`clean`) and fork-join (`evaluate_mt`/
//!   `clean_mt`/`clean_many_mt`) evaluation over the same orders
//! - Batch classification of targets into independent and overlapping sets
//! - Debug-build invariant checking after every structural mutation
//!
//! ## Determinism
//!
//! Parent sets iterate in id order and evaluation orders are built by a
//! deterministic promote-to-tail walk, so equal mutation histories yield
//! equal orders and equal sequential callback sequences. Tests that
//! randomize graph shapes fix their `SmallRng` seeds.
//!
//! ## Usage
//! Add `dirty-dag` as a dependency in your `Cargo.toml`:
//!
//! ```toml
//! [dependencies]
//! dirty-dag = "0.3.2"
//! # The "parallel" feature (rayon engines) is on by default:
//! # default-features = false # to drop it
//! ```
//!
//! ## Shared payloads
//! When payloads are large, instantiate the graph with `T = Arc<Data>`.
//! Producer snapshots handed to callbacks clone the `Arc` handle (cheap)
//! without copying `Data`; writers can use [`std::sync::Arc::make_mut`] on
//! their own entry. Avoid wrappers that convert between `Data` and
//! `Arc<Data>` on the fly; they add allocations and defeat sharing.

pub mod debug_invariants;
pub mod error;
pub mod eval;
pub mod graph;

pub use debug_invariants::DebugInvariants;

/// A convenient prelude to import the most-used traits & types:
pub mod prelude {
    pub use crate::debug_invariants::DebugInvariants;
    pub use crate::error::GraphError;
    pub use crate::eval::ParentView;
    pub use crate::eval::independence::Independence;
    pub use crate::graph::bounds::{NodeKey, PayloadLike};
    pub use crate::graph::cache::InvalidateCache;
    pub use crate::graph::key::NodeId;
    pub use crate::graph::store::DepGraph;
    pub use crate::graph::version::Version;
}
