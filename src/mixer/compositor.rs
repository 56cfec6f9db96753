//! Spectral Compositor
//!
//! Blends the spectra of up to four images into one composite:
//! 1. Pick the component pair for the mode (magnitude/phase or real/imag)
//! 2. Mask each slot's components
//! 3. Accumulate weighted sums, normalize by the weight totals
//! 4. Rebuild a spectrum and invert it back to the spatial domain
//!
//! Slots that cannot contribute (missing spectrum, wrong shape) are skipped
//! with a warning; partial input is normal during interactive use.

use log::{debug, warn};
use serde::{Deserialize, Serialize};

use super::mask::MaskSet;
use super::request::{MixMode, MixRequest};
use crate::error::{MixError, Result};
use crate::registry::{InputSlot, InputSnapshot};
use crate::spectral::view::to_gray_image;
use crate::spectral::{encode_png_base64, ifft2, ifftshift, Complex64, Plane, SpectralImage};

/// Floor for weight totals before dividing
pub const WEIGHT_EPSILON: f64 = 1e-6;

/// Phasor sums at or below this magnitude count as zero
pub const PHASOR_EPSILON: f64 = 1e-8;

/// How the complex inverse transform becomes a real raster
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Reconstruction {
    /// Keep the real part (signed, may show ringing)
    #[default]
    RealPart,
    /// Keep the modulus (non-negative)
    Magnitude,
}

/// Result of a successful composition
#[derive(Debug, Clone)]
pub struct Composite {
    /// Unnormalized spatial result; the authoritative numeric output
    pub raster: Plane<f64>,
    /// Centered spectrum the raster was reconstructed from
    pub spectrum: Plane<Complex64>,
    /// Base64 PNG of the raster, min-max normalized to 8 bits
    pub preview: String,
    /// Slots that contributed
    pub contributors: Vec<InputSlot>,
}

impl Composite {
    /// Wrap the normalized raster as an image for an output slot
    pub fn to_spectral_image(&self) -> Result<SpectralImage> {
        Ok(SpectralImage::from_raster(to_gray_image(&self.raster)?))
    }
}

/// What a composition produced
#[derive(Debug, Clone)]
pub enum MixOutcome {
    /// No slot held an image, or none had a non-zero weight
    Empty,
    Mixed(Composite),
}

impl MixOutcome {
    pub fn is_empty(&self) -> bool {
        matches!(self, MixOutcome::Empty)
    }

    /// The composite, or `EmptyMixResult` for callers that need one
    pub fn into_composite(self) -> Result<Composite> {
        match self {
            MixOutcome::Mixed(composite) => Ok(composite),
            MixOutcome::Empty => Err(MixError::EmptyMixResult),
        }
    }
}

/// Weighted spectral mixer
#[derive(Debug, Clone, Copy, Default)]
pub struct SpectralCompositor {
    reconstruction: Reconstruction,
}

impl SpectralCompositor {
    pub fn new(reconstruction: Reconstruction) -> Self {
        Self { reconstruction }
    }

    pub fn reconstruction(&self) -> Reconstruction {
        self.reconstruction
    }

    /// Compose the images in `inputs` according to `request`
    ///
    /// `request.target` is ignored here; the job runner routes the result.
    ///
    /// # Errors
    /// `CompositionFailure` if the reconstruction contains non-finite values.
    pub fn compose(&self, inputs: &InputSnapshot, request: &MixRequest) -> Result<MixOutcome> {
        let Some((height, width)) = inputs
            .iter()
            .flatten()
            .find_map(|img| img.spectrum().map(|s| s.shape()))
        else {
            debug!("No input carries a spectrum; nothing to mix");
            return Ok(MixOutcome::Empty);
        };

        let masks = MaskSet::build(&request.masks, height, width);
        let mut acc_a = Plane::filled(height, width, 0.0_f64);
        let mut acc_b = Plane::filled(height, width, Complex64::new(0.0, 0.0));
        let mut sum_wa = 0.0;
        let mut sum_wb = 0.0;
        let mut contributors = Vec::new();

        for slot in InputSlot::ALL {
            let Some(img) = &inputs[slot.index()] else {
                continue;
            };
            let (wa, wb) = request.weights.normalized(slot);
            if wa == 0.0 && wb == 0.0 {
                continue;
            }
            let Some(spectrum) = img.spectrum() else {
                warn!("Slot {} has weights but no spectrum; skipping", slot);
                continue;
            };
            if spectrum.shape() != (height, width) {
                warn!(
                    "Slot {} is {:?}, expected {:?}; skipping",
                    slot,
                    spectrum.shape(),
                    (height, width)
                );
                continue;
            }

            let mask = masks.get(slot).as_slice();
            let a = acc_a.as_mut_slice();
            let b = acc_b.as_mut_slice();
            for (i, c) in spectrum.as_slice().iter().enumerate() {
                let m = mask[i];
                match request.mode {
                    MixMode::MagnitudePhase => {
                        a[i] += wa * c.norm() * m;
                        b[i] += wb * Complex64::from_polar(1.0, c.arg() * m);
                    }
                    MixMode::RealImag => {
                        // Imaginary sums ride in the real lane of acc_b
                        a[i] += wa * c.re * m;
                        b[i] += Complex64::new(wb * c.im * m, 0.0);
                    }
                }
            }
            sum_wa += wa;
            sum_wb += wb;
            contributors.push(slot);
        }

        if contributors.is_empty() {
            debug!("No slot contributed to the mix");
            return Ok(MixOutcome::Empty);
        }
        debug!(
            "Mixing {} slot(s) in {} mode, sum_wa={:.2}, sum_wb={:.2}",
            contributors.len(),
            request.mode,
            sum_wa,
            sum_wb
        );

        let norm_a = 1.0 / sum_wa.max(WEIGHT_EPSILON);
        let norm_b = 1.0 / sum_wb.max(WEIGHT_EPSILON);

        let spectrum = match request.mode {
            MixMode::MagnitudePhase => {
                let degenerate = acc_b.as_slice().iter().all(|p| p.norm() <= PHASOR_EPSILON);
                acc_a
                    .zip_map(&acc_b, |&magnitude, &phasor| {
                        let phase = if degenerate || phasor.norm() <= PHASOR_EPSILON {
                            0.0
                        } else {
                            (phasor * norm_b).arg()
                        };
                        Complex64::from_polar(magnitude * norm_a, phase)
                    })
                    .ok_or_else(shape_mismatch)?
            }
            MixMode::RealImag => acc_a
                .zip_map(&acc_b, |&re, &im| Complex64::new(re * norm_a, im.re * norm_b))
                .ok_or_else(shape_mismatch)?,
        };

        let spatial = ifft2(&ifftshift(&spectrum));
        let raster = match self.reconstruction {
            Reconstruction::RealPart => spatial.map(|c| c.re),
            Reconstruction::Magnitude => spatial.map(|c| c.norm()),
        };
        if raster.as_slice().iter().any(|v| !v.is_finite()) {
            return Err(MixError::CompositionFailure {
                reason: "reconstruction produced non-finite values".to_string(),
            });
        }

        let preview = encode_png_base64(&to_gray_image(&raster)?)?;
        Ok(MixOutcome::Mixed(Composite {
            raster,
            spectrum,
            preview,
            contributors,
        }))
    }
}

fn shape_mismatch() -> MixError {
    MixError::CompositionFailure {
        reason: "accumulator shapes diverged".to_string(),
    }
}
