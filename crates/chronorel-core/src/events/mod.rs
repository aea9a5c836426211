//! Event surface for membership changes
//!
//! This module provides:
//! - Typed change actions mirroring the mutation protocol (pre/post add,
//!   remove, clear)
//! - Event payloads carrying the affected member ids and transaction time
//! - An event bus for internal pub/sub; the core does not depend on any
//!   subscriber existing

mod bus;
mod event;

pub use bus::{EventBus, EventSubscriber};
pub use event::{ChangeAction, MembershipChangeEvent};
