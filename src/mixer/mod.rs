//! Mixer Module
//!
//! Weighted spectral composition:
//! - Mix requests and their JSON wire format
//! - Rectangular frequency-plane masks
//! - The compositor that blends slot spectra into one image

pub mod compositor;
pub mod mask;
pub mod request;

pub use compositor::{Composite, MixOutcome, Reconstruction, SpectralCompositor};
pub use mask::{build_basic, build_region, mask_for, Mask, MaskSet};
pub use request::{
    BasicMask, MaskConfig, MixMode, MixRequest, RegionMask, RegionRole, SlotWeights,
};
