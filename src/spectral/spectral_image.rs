//! Spectral Image
//!
//! A grayscale raster paired with its centered 2-D Fourier transform.
//! The spectrum is recomputed whenever the raster changes, so the two
//! fields never disagree.

use image::imageops::{self, FilterType};
use image::GrayImage;
use rustfft::num_complex::Complex64;

use super::fft::{fft2, fftshift};
use super::plane::Plane;
use super::view::{encode_png_base64, log_scale, to_gray_image, ViewKind};
use crate::error::{MixError, Result};

/// Grayscale raster plus its centered spectrum
#[derive(Debug, Clone, Default)]
pub struct SpectralImage {
    /// Spatial samples in [0, 255]
    raster: Option<GrayImage>,
    /// Centered DFT of `raster`, or a directly assigned spectrum
    spectrum: Option<Plane<Complex64>>,
}

impl SpectralImage {
    /// Create an image with neither raster nor spectrum
    pub fn empty() -> Self {
        Self::default()
    }

    /// Decode encoded image bytes (PNG, JPEG) into a grayscale raster
    ///
    /// # Errors
    /// Returns `MixError::Decode` when the bytes are not a valid image or
    /// decode to a zero-sized raster.
    pub fn load(bytes: &[u8]) -> Result<Self> {
        let decoded = image::load_from_memory(bytes).map_err(|e| MixError::Decode {
            reason: e.to_string(),
            source: Some(e),
        })?;
        let raster = decoded.to_luma8();
        if raster.width() == 0 || raster.height() == 0 {
            return Err(MixError::Decode {
                reason: "image has zero width or height".to_string(),
                source: None,
            });
        }
        Ok(Self::from_raster(raster))
    }

    /// Wrap an existing raster and compute its spectrum
    pub fn from_raster(raster: GrayImage) -> Self {
        let spectrum = centered_spectrum(&raster);
        Self {
            raster: Some(raster),
            spectrum: Some(spectrum),
        }
    }

    /// Create an image that only carries a spectrum
    ///
    /// Raster-based views are unavailable on the result.
    pub fn from_spectrum(spectrum: Plane<Complex64>) -> Self {
        Self {
            raster: None,
            spectrum: Some(spectrum),
        }
    }

    pub fn raster(&self) -> Option<&GrayImage> {
        self.raster.as_ref()
    }

    pub fn spectrum(&self) -> Option<&Plane<Complex64>> {
        self.spectrum.as_ref()
    }

    /// True when neither a raster nor a spectrum is present
    pub fn is_empty(&self) -> bool {
        self.raster.is_none() && self.spectrum.is_none()
    }

    /// `(height, width)` of the raster, falling back to the spectrum shape
    pub fn dimensions(&self) -> Option<(usize, usize)> {
        match (&self.raster, &self.spectrum) {
            (Some(raster), _) => Some((raster.height() as usize, raster.width() as usize)),
            (None, Some(spectrum)) => Some(spectrum.shape()),
            (None, None) => None,
        }
    }

    /// Resample the raster to `height x width` and recompute the spectrum
    ///
    /// No-op when the raster is absent or already has those dimensions.
    pub fn resize(&mut self, height: usize, width: usize) {
        let Some(raster) = self.raster.as_ref() else {
            return;
        };
        if raster.height() as usize == height && raster.width() as usize == width {
            return;
        }
        let resized = imageops::resize(raster, width as u32, height as u32, FilterType::Triangle);
        self.spectrum = Some(centered_spectrum(&resized));
        self.raster = Some(resized);
    }

    pub fn magnitude(&self) -> Option<Plane<f64>> {
        self.spectrum.as_ref().map(|s| s.map(|c| c.norm()))
    }

    pub fn phase(&self) -> Option<Plane<f64>> {
        self.spectrum.as_ref().map(|s| s.map(|c| c.arg()))
    }

    pub fn real(&self) -> Option<Plane<f64>> {
        self.spectrum.as_ref().map(|s| s.map(|c| c.re))
    }

    pub fn imaginary(&self) -> Option<Plane<f64>> {
        self.spectrum.as_ref().map(|s| s.map(|c| c.im))
    }

    /// Render one view as a base64 PNG, parsing the kind from its wire name
    ///
    /// # Errors
    /// `MixError::UnknownViewKind` for an unrecognised `kind`.
    pub fn encode_view_str(&self, kind: &str) -> Result<Option<String>> {
        self.encode_view(kind.parse()?)
    }

    /// Render one view as a normalized 8-bit base64 PNG
    ///
    /// Returns `Ok(None)` when the data the view needs is absent.
    pub fn encode_view(&self, kind: ViewKind) -> Result<Option<String>> {
        if kind == ViewKind::Original {
            return self
                .raster
                .as_ref()
                .map(encode_png_base64)
                .transpose();
        }

        let component = match kind {
            ViewKind::Magnitude => self.magnitude(),
            ViewKind::Phase => self.phase(),
            ViewKind::Real => self.real(),
            ViewKind::Imaginary => self.imaginary(),
            ViewKind::Original => None,
        };
        let Some(component) = component else {
            return Ok(None);
        };

        let scaled = if kind.is_log_scaled() {
            log_scale(&component)
        } else {
            component
        };
        let gray = to_gray_image(&scaled)?;
        encode_png_base64(&gray).map(Some)
    }
}

/// Centered DFT of an 8-bit raster
fn centered_spectrum(raster: &GrayImage) -> Plane<Complex64> {
    let (w, h) = raster.dimensions();
    let samples = Plane::from_fn(h as usize, w as usize, |y, x| {
        Complex64::new(raster.get_pixel(x as u32, y as u32).0[0] as f64, 0.0)
    });
    fftshift(&fft2(&samples))
}
