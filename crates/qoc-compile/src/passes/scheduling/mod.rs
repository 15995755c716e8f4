//! Scheduling passes.

mod block;
mod list;

pub use block::{BlockMerge, BlockMergeReport};
pub use list::{ListScheduler, Schedule, schedule};

/// Tolerance for comparing start and finish times.
pub(super) const TIME_EPSILON: f64 = 1e-9;
