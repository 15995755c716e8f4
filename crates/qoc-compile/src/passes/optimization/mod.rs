//! Optimization passes.

mod cancel;
mod diagonal;

#[cfg(test)]
mod tests;

pub use cancel::{CancellationReport, SimpleCancellation};
pub use diagonal::{DiagonalMerge, DiagonalMergeReport};
