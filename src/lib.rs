//! ftmix - Frequency-Domain Image Mixing Engine
//!
//! Combines the Fourier spectra of up to four grayscale images into a
//! composite, with per-image weights and rectangular masks over the
//! frequency plane. Mixing runs on a background job that reports progress
//! and can be cancelled or preempted.
//!
//! # Architecture
//!
//! - `spectral`: raster plus centered spectrum, and the views derived from it
//! - `registry`: four input slots kept at a common size, two output slots
//! - `mixer`: request types, mask construction and the compositor
//! - `engine`: the single-job runner and its status
//! - `session`: the facade a front end calls

pub mod cli;
pub mod config;
pub mod engine;
pub mod error;
pub mod mixer;
pub mod registry;
pub mod session;
pub mod spectral;

pub use config::{MixerConfig, PacingPolicy};
pub use engine::{JobState, MixJobRunner, MixStatus};
pub use error::{MixError, Result};
pub use mixer::{MaskConfig, MixMode, MixOutcome, MixRequest, SlotWeights, SpectralCompositor};
pub use registry::{ImageRegistry, InputSlot, OutputSlot};
pub use session::{MixerSession, ViewTarget};
pub use spectral::{SpectralImage, ViewKind};
