//! Graph structure: node records, structural mutation, the dirty-versioning
//! protocol, and cached evaluation orders.

pub mod bounds;
pub mod cache;
pub mod eval_order;
pub mod key;
pub(crate) mod node;
pub mod store;
pub mod version;

pub use cache::InvalidateCache;
pub use key::NodeId;
pub use store::DepGraph;
pub use version::Version;
