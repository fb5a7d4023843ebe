//! Background Tasks Module
//!
//! Contains background tasks that run for the lifetime of a node.
//!
//! # Tasks
//! - TTL Sweep: purges a bounded share of expired cache entries per tick
//! - Membership: applies registry join/leave events to the peer picker

mod membership;
mod sweep;

pub use membership::spawn_membership_task;
pub use sweep::{spawn_sweep_task, SweepHandle};
