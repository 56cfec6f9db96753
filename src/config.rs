//! Mixer configuration
//!
//! Tunables for the background job: the synthetic progress heartbeat, how
//! long a new job waits for the one it preempts, and how the inverse
//! transform becomes a real raster. Loaded from JSON; every field has a
//! default.

use std::fs;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{MixError, Result};
use crate::mixer::Reconstruction;

/// Default progress reported as soon as a job starts
const DEFAULT_INITIAL_PROGRESS: u8 = 10;

/// Default delay between heartbeat checkpoints
const DEFAULT_STEP_DELAY_MS: u64 = 50;

/// Default bounded wait for a preempted job to stop
const DEFAULT_CANCEL_WAIT_MS: u64 = 100;

/// Synthetic progress heartbeat
///
/// The checkpoints are pacing for the UI, not sub-task completion. They are
/// also the only points where a job observes cancellation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PacingPolicy {
    pub initial_progress: u8,
    pub checkpoints: Vec<u8>,
    pub step_delay_ms: u64,
}

impl Default for PacingPolicy {
    fn default() -> Self {
        Self {
            initial_progress: DEFAULT_INITIAL_PROGRESS,
            checkpoints: vec![20, 30, 40, 50, 60, 70, 80, 90],
            step_delay_ms: DEFAULT_STEP_DELAY_MS,
        }
    }
}

impl PacingPolicy {
    /// No delay between checkpoints
    pub fn immediate() -> Self {
        Self {
            step_delay_ms: 0,
            ..Self::default()
        }
    }

    pub fn step_delay(&self) -> Duration {
        Duration::from_millis(self.step_delay_ms)
    }

    /// Check the progress values increase strictly and stay below 100
    pub fn validate(&self) -> Result<()> {
        if self.initial_progress == 0 || self.initial_progress >= 100 {
            return Err(MixError::Config {
                reason: format!(
                    "initial_progress must be in 1..100, got {}",
                    self.initial_progress
                ),
            });
        }
        let mut previous = self.initial_progress;
        for &checkpoint in &self.checkpoints {
            if checkpoint <= previous || checkpoint >= 100 {
                return Err(MixError::Config {
                    reason: format!(
                        "checkpoint {} must be above {} and below 100",
                        checkpoint, previous
                    ),
                });
            }
            previous = checkpoint;
        }
        Ok(())
    }
}

/// Configuration for a mixer session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MixerConfig {
    pub pacing: PacingPolicy,
    pub cancel_wait_ms: u64,
    pub reconstruction: Reconstruction,
}

impl Default for MixerConfig {
    fn default() -> Self {
        Self {
            pacing: PacingPolicy::default(),
            cancel_wait_ms: DEFAULT_CANCEL_WAIT_MS,
            reconstruction: Reconstruction::default(),
        }
    }
}

impl MixerConfig {
    /// Load and validate a JSON config file
    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }

    pub fn from_json_str(text: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Write the config as pretty JSON
    pub fn save(&self, path: &Path) -> Result<()> {
        fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        self.pacing.validate()
    }

    pub fn cancel_wait(&self) -> Duration {
        Duration::from_millis(self.cancel_wait_ms)
    }
}
