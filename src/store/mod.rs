//! Persistence operations. Every write to the database goes through this
//! module; callers pass either the pool or an open transaction.

mod audit;
mod bug;
mod graph;
mod org;

pub use audit::*;
pub use bug::*;
pub use graph::*;
pub use org::*;
