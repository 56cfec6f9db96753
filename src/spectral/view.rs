//! View kinds and the PNG/base64 preview encoding shared by images and mixes.

use std::fmt;
use std::io::Cursor;
use std::str::FromStr;

use base64::{engine::general_purpose, Engine as _};
use image::{GrayImage, ImageFormat};
use serde::{Deserialize, Serialize};

use super::plane::Plane;
use crate::error::{MixError, Result};

/// Offset added before taking the log of a spectral component
pub const LOG_EPSILON: f64 = 1e-9;

/// Which rendering of a [`SpectralImage`](super::SpectralImage) to produce
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ViewKind {
    /// The spatial raster itself
    Original,
    /// Log-scaled spectral magnitude
    Magnitude,
    /// Spectral phase, linear scale
    Phase,
    /// Log-scaled absolute real part
    Real,
    /// Log-scaled absolute imaginary part
    Imaginary,
}

impl ViewKind {
    pub const ALL: [ViewKind; 5] = [
        ViewKind::Original,
        ViewKind::Magnitude,
        ViewKind::Phase,
        ViewKind::Real,
        ViewKind::Imaginary,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ViewKind::Original => "original",
            ViewKind::Magnitude => "magnitude",
            ViewKind::Phase => "phase",
            ViewKind::Real => "real",
            ViewKind::Imaginary => "imaginary",
        }
    }

    /// Whether the view is shown on a `20·ln(x + ε)` scale
    pub fn is_log_scaled(&self) -> bool {
        matches!(
            self,
            ViewKind::Magnitude | ViewKind::Real | ViewKind::Imaginary
        )
    }
}

impl fmt::Display for ViewKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ViewKind {
    type Err = MixError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "original" => Ok(ViewKind::Original),
            "magnitude" | "mag" => Ok(ViewKind::Magnitude),
            "phase" => Ok(ViewKind::Phase),
            "real" => Ok(ViewKind::Real),
            "imaginary" | "imag" => Ok(ViewKind::Imaginary),
            other => Err(MixError::UnknownViewKind {
                kind: other.to_string(),
            }),
        }
    }
}

/// `20·ln(|v| + ε)` applied cell by cell
pub fn log_scale(plane: &Plane<f64>) -> Plane<f64> {
    plane.map(|v| 20.0 * (v.abs() + LOG_EPSILON).ln())
}

/// Min-max normalize a real plane into an 8-bit grayscale image
pub fn to_gray_image(plane: &Plane<f64>) -> Result<GrayImage> {
    let (h, w) = plane.shape();
    GrayImage::from_raw(w as u32, h as u32, plane.normalize_to_u8()).ok_or_else(|| {
        MixError::Encode {
            reason: format!("cannot build {}x{} grayscale buffer", w, h),
        }
    })
}

/// Encode a grayscale image as PNG bytes
pub fn encode_png(image: &GrayImage) -> Result<Vec<u8>> {
    let mut buf = Cursor::new(Vec::new());
    image
        .write_to(&mut buf, ImageFormat::Png)
        .map_err(|e| MixError::Encode {
            reason: e.to_string(),
        })?;
    Ok(buf.into_inner())
}

/// Encode a grayscale image as a base64 PNG string
pub fn encode_png_base64(image: &GrayImage) -> Result<String> {
    Ok(general_purpose::STANDARD.encode(encode_png(image)?))
}

/// Decode a base64 PNG preview back to raw PNG bytes
pub fn decode_base64(preview: &str) -> Result<Vec<u8>> {
    general_purpose::STANDARD
        .decode(preview)
        .map_err(|e| MixError::Decode {
            reason: format!("invalid base64 preview: {}", e),
            source: None,
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case("original", ViewKind::Original)]
    #[test_case("mag", ViewKind::Magnitude)]
    #[test_case("magnitude", ViewKind::Magnitude)]
    #[test_case("phase", ViewKind::Phase)]
    #[test_case("real", ViewKind::Real)]
    #[test_case("imag", ViewKind::Imaginary)]
    fn test_parse_view_kind(input: &str, expected: ViewKind) {
        assert_eq!(input.parse::<ViewKind>().unwrap(), expected);
    }

    #[test]
    fn test_unknown_view_kind() {
        let err = "histogram".parse::<ViewKind>().unwrap_err();
        assert_eq!(err.error_code(), "UNKNOWN_VIEW_KIND");
    }

    #[test]
    fn test_png_base64_roundtrip() {
        let plane = Plane::from_fn(4, 8, |y, x| (y * 8 + x) as f64);
        let gray = to_gray_image(&plane).unwrap();
        let preview = encode_png_base64(&gray).unwrap();
        let bytes = decode_base64(&preview).unwrap();
        let decoded = image::load_from_memory(&bytes).unwrap().to_luma8();
        assert_eq!(decoded.dimensions(), (8, 4));
        assert_eq!(decoded.get_pixel(0, 0).0[0], 0);
        assert_eq!(decoded.get_pixel(7, 3).0[0], 255);
    }

    #[test]
    fn test_log_scale_of_zero_is_finite() {
        let plane = Plane::filled(1, 1, 0.0);
        let scaled = log_scale(&plane);
        assert!(scaled.as_slice()[0].is_finite());
    }
}
