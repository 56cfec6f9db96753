//! Mix Engine Module
//!
//! Background execution of mix jobs:
//! - Job status state machine with generation guard
//! - Cooperative cancellation token
//! - Single-job runner with preemption

pub mod cancel;
pub mod runner;
pub mod status;

pub use cancel::CancellationToken;
pub use runner::MixJobRunner;
pub use status::{JobState, JobTracker, MixStatus};
