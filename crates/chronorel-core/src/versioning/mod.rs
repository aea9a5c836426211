//! Version ledger and compactor
//!
//! Each effective mutation on a version-enabled association records a
//! snapshot: the member count at that instant plus the added/removed deltas.
//! Snapshots can be deleted out of order; deleting a non-last snapshot
//! triggers the reflow pass that re-splices the underlying edges so history
//! before and after the deleted snapshot stays correct.

mod compactor;
mod store;
mod version;

pub use store::VersionLedger;
pub use version::VersionSnapshot;

pub(crate) use store::ops as version_ops;
