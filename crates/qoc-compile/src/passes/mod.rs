//! Built-in compilation passes.
//!
//! Passes are organized by concern:
//! - [`analysis`]: commutation analysis, which every structural pass needs
//! - [`optimization`]: cancellation and diagonal fusion
//! - [`scheduling`]: the list scheduler and width-bounded block merging
//! - [`verification`]: structural checks run at the end of a pipeline

pub mod analysis;
pub mod optimization;
pub mod scheduling;
pub mod verification;

pub use analysis::CommutationAnalysis;
pub use optimization::{CancellationReport, DiagonalMerge, DiagonalMergeReport, SimpleCancellation};
pub use scheduling::{BlockMerge, BlockMergeReport, ListScheduler, Schedule};
pub use verification::{IntegrityVerification, VerificationResult};
