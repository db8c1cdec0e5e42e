//! Targeting helpers
//!
//! Pure geometry and ordering used by behaviors: area shapes, distance-sorted
//! target sets, chain hop queues and orbit rings. Nothing in here touches the
//! host or the factory.

pub mod chain;
pub mod orbit;
pub mod query;
pub mod shape;

pub use chain::ChainQueue;
pub use orbit::{OrbitRing, OrbitShape};
pub use query::{sort_by_distance, TargetSet};
pub use shape::{facing_or_default, fan_vertices, point_in_polygon, rotate_deg, AreaShape};
