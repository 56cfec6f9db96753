//! Job Status State Machine
//!
//! Tracks the lifecycle of the current mix job:
//!
//! ```text
//! Idle -> Running -> { Completed, Cancelled, Failed }
//! ```
//!
//! Starting a new job while one is running moves the old one through
//! `Cancelled` first. Each start bumps a generation counter; a job may only
//! report while its generation is current.

use std::fmt;
use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::registry::OutputSlot;
use crate::spectral::Plane;

/// Lifecycle states of a mix job
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobState {
    /// No job has run since the last reset
    #[default]
    Idle,
    /// A job is stepping through its checkpoints or composing
    Running,
    /// The last job finished and stored its result
    Completed,
    /// The last job was cancelled or preempted
    Cancelled,
    /// The last job hit an error; see `error`
    Failed,
}

impl JobState {
    /// Whether the state ends a job
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            JobState::Completed | JobState::Cancelled | JobState::Failed
        )
    }
}

impl fmt::Display for JobState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JobState::Idle => write!(f, "Idle"),
            JobState::Running => write!(f, "Running"),
            JobState::Completed => write!(f, "Completed"),
            JobState::Cancelled => write!(f, "Cancelled"),
            JobState::Failed => write!(f, "Failed"),
        }
    }
}

/// Snapshot returned to pollers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MixStatus {
    pub job_id: Option<Uuid>,
    pub state: JobState,
    pub running: bool,
    /// 0 to 100
    pub progress: u8,
    /// Base64 PNG preview of the composite
    pub result: Option<String>,
    pub error: Option<String>,
    pub target_output: OutputSlot,
    pub started_at: Option<DateTime<Utc>>,
    pub duration_ms: Option<u64>,
}

/// Mutable job status guarded by the runner's lock
///
/// Every transition method that a worker calls takes the worker's
/// generation and is ignored when that generation is stale.
#[derive(Debug, Default)]
pub struct JobTracker {
    generation: u64,
    job_id: Option<Uuid>,
    state: JobState,
    progress: u8,
    result: Option<String>,
    /// Unnormalized raster behind `result`
    result_array: Option<Arc<Plane<f64>>>,
    error: Option<String>,
    target_output: OutputSlot,
    started_at: Option<DateTime<Utc>>,
    started: Option<Instant>,
    duration_ms: Option<u64>,
}

impl JobTracker {
    pub fn new() -> Self {
        Self::default()
    }

    // ========================================================================
    // Foreground Transitions
    // ========================================================================

    /// Begin a new job and return its generation
    ///
    /// A still-running job loses its generation and can no longer report.
    pub fn begin(&mut self, job_id: Uuid, target: OutputSlot) -> u64 {
        self.generation += 1;
        self.job_id = Some(job_id);
        self.state = JobState::Running;
        self.progress = 0;
        self.result = None;
        self.result_array = None;
        self.error = None;
        self.target_output = target;
        self.started_at = Some(Utc::now());
        self.started = Some(Instant::now());
        self.duration_ms = None;
        self.generation
    }

    /// Cancel the running job, if any
    ///
    /// Bumps the generation so the job can no longer report.
    /// Returns false when nothing was running.
    pub fn cancel(&mut self) -> bool {
        if self.state != JobState::Running {
            return false;
        }
        self.generation += 1;
        self.state = JobState::Cancelled;
        self.progress = 0;
        self.finish_timer();
        true
    }

    /// Forget the last job entirely
    pub fn reset(&mut self) {
        let generation = self.generation + 1;
        *self = Self {
            generation,
            ..Self::default()
        };
    }

    // ========================================================================
    // Worker Transitions
    // ========================================================================

    /// True while `generation` belongs to the running job
    pub fn is_current(&self, generation: u64) -> bool {
        self.generation == generation && self.state == JobState::Running
    }

    /// Report heartbeat progress; values never move backwards
    pub fn set_progress(&mut self, generation: u64, progress: u8) -> bool {
        if !self.is_current(generation) {
            return false;
        }
        self.progress = self.progress.max(progress.min(100));
        true
    }

    /// Mark the job completed with an optional preview and raw raster
    pub fn complete(
        &mut self,
        generation: u64,
        preview: Option<String>,
        raster: Option<Plane<f64>>,
    ) -> bool {
        if !self.is_current(generation) {
            return false;
        }
        self.state = JobState::Completed;
        self.progress = 100;
        self.result = preview;
        self.result_array = raster.map(Arc::new);
        self.finish_timer();
        true
    }

    /// Mark the job failed
    pub fn fail(&mut self, generation: u64, message: String) -> bool {
        if !self.is_current(generation) {
            return false;
        }
        self.state = JobState::Failed;
        self.progress = 100;
        self.result = None;
        self.result_array = None;
        self.error = Some(message);
        self.finish_timer();
        true
    }

    /// Mark the job cancelled after it observed its token
    pub fn cancelled(&mut self, generation: u64) -> bool {
        if !self.is_current(generation) {
            return false;
        }
        self.state = JobState::Cancelled;
        self.progress = 0;
        self.finish_timer();
        true
    }

    // ========================================================================
    // Queries
    // ========================================================================

    pub fn state(&self) -> JobState {
        self.state
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn is_running(&self) -> bool {
        self.state == JobState::Running
    }

    pub fn result_array(&self) -> Option<Arc<Plane<f64>>> {
        self.result_array.clone()
    }

    pub fn snapshot(&self) -> MixStatus {
        let duration_ms = self.duration_ms.or_else(|| {
            self.started
                .filter(|_| self.state == JobState::Running)
                .map(|t| t.elapsed().as_millis() as u64)
        });
        MixStatus {
            job_id: self.job_id,
            state: self.state,
            running: self.is_running(),
            progress: self.progress,
            result: self.result.clone(),
            error: self.error.clone(),
            target_output: self.target_output,
            started_at: self.started_at,
            duration_ms,
        }
    }

    fn finish_timer(&mut self) {
        self.duration_ms = self.started.map(|t| t.elapsed().as_millis() as u64);
    }
}

// ============================================================================
// Unit Tests
// ============================================================================
