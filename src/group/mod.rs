//! Group Module
//!
//! Named read-through caches, their loader seam and request deduplication.

mod getter;
#[allow(clippy::module_inception)]
mod group;
mod registry;
mod singleflight;

pub use getter::{Getter, GetterFn, Loaded};
pub use group::Group;
pub use registry::GroupRegistry;
pub use singleflight::SingleFlight;
