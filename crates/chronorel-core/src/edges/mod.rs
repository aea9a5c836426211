//! Interval edge store and temporal query engine
//!
//! Membership is persisted as interval edges: one row per continuous period
//! during which a member belonged to an owner's association. An edge with no
//! end time is open — current membership.

mod edge;
pub(crate) mod ops;
mod store;

pub use edge::MembershipEdge;
pub use store::EdgeStore;
