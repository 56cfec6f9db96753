//! Mixer Session
//!
//! The single entry point a front end talks to: uploads into the registry,
//! mix jobs through the runner, status polling, views and reset. One session
//! owns one registry and one runner.

use std::fmt;
use std::str::FromStr;
use std::sync::{Arc, PoisonError};
use std::time::Duration;

use log::info;
use serde_json::Value;
use uuid::Uuid;

use crate::config::MixerConfig;
use crate::engine::{MixJobRunner, MixStatus};
use crate::error::{MixError, Result};
use crate::mixer::MixRequest;
use crate::registry::{ImageRegistry, InputSlot, OutputSlot, SharedRegistry};
use crate::spectral::{Plane, SpectralImage, ViewKind};

/// Which stored image a view is rendered from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewTarget {
    Input(InputSlot),
    Output(OutputSlot),
}

impl FromStr for ViewTarget {
    type Err = MixError;

    /// `"1"`..`"4"` name inputs, `"output_1"`/`"output_2"` name outputs
    fn from_str(s: &str) -> Result<Self> {
        if s.starts_with("output") {
            s.parse().map(ViewTarget::Output)
        } else {
            s.parse().map(ViewTarget::Input)
        }
    }
}

impl fmt::Display for ViewTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ViewTarget::Input(slot) => write!(f, "input {}", slot),
            ViewTarget::Output(slot) => write!(f, "{}", slot),
        }
    }
}

/// Registry plus job runner behind one facade
pub struct MixerSession {
    registry: SharedRegistry,
    runner: MixJobRunner,
}

impl MixerSession {
    pub fn new(config: MixerConfig) -> Self {
        let registry = ImageRegistry::shared();
        let runner = MixJobRunner::new(Arc::clone(&registry), config);
        Self { registry, runner }
    }

    pub fn registry(&self) -> SharedRegistry {
        Arc::clone(&self.registry)
    }

    pub fn runner(&self) -> &MixJobRunner {
        &self.runner
    }

    /// Decode `bytes` and store them in the input slot named `slot_id`
    ///
    /// # Errors
    /// `MixError::InvalidSlot` for a bad identifier, `MixError::Decode` for
    /// bytes that are not an image. Nothing is stored on error.
    pub fn upload_image(&self, slot_id: &str, bytes: &[u8]) -> Result<InputSlot> {
        let slot: InputSlot = slot_id.parse()?;
        let image = SpectralImage::load(bytes)?;
        self.registry
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .set_input(slot, image);
        Ok(slot)
    }

    /// Start a mix, preempting any running one
    pub fn start_mix(&self, request: MixRequest) -> Result<Uuid> {
        self.runner.start(request)
    }

    /// Parse a wire-format request body and start it
    pub fn start_mix_json(&self, body: &Value) -> Result<Uuid> {
        let request = MixRequest::from_json(body)?;
        self.start_mix(request)
    }

    pub fn cancel_mix(&self) {
        self.runner.cancel();
    }

    pub fn poll_status(&self) -> MixStatus {
        self.runner.status()
    }

    /// Real-valued result of the last completed mix, before 8-bit scaling
    pub fn result_array(&self) -> Option<Arc<Plane<f64>>> {
        self.runner.result_array()
    }

    /// Block until the current job thread exits or `timeout` passes
    pub fn wait_for_mix(&self, timeout: Duration) -> MixStatus {
        self.runner.wait_for_completion(timeout);
        self.runner.status()
    }

    /// Render one view of a stored image as a base64 PNG
    ///
    /// Returns `Ok(None)` when the slot is empty or lacks the data for the
    /// view.
    pub fn get_view(&self, target: ViewTarget, kind: ViewKind) -> Result<Option<String>> {
        let image = {
            let registry = self.registry.read().unwrap_or_else(PoisonError::into_inner);
            match target {
                ViewTarget::Input(slot) => registry.get_input(slot),
                ViewTarget::Output(slot) => registry.get_output(slot),
            }
        };
        match image {
            Some(image) => image.encode_view(kind),
            None => Ok(None),
        }
    }

    /// `get_view` with both identifiers in wire form
    pub fn get_view_str(&self, target: &str, kind: &str) -> Result<Option<String>> {
        self.get_view(target.parse()?, kind.parse()?)
    }

    /// Cancel any job and empty every slot
    pub fn reset(&self) {
        self.runner.reset();
        self.registry
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clear_all();
        info!("Mixer session reset");
    }
}

impl Default for MixerSession {
    fn default() -> Self {
        Self::new(MixerConfig::default())
    }
}
