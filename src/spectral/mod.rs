//! Spectral Module
//!
//! Dual spatial/spectral image representation:
//! - Dense 2-D planes and the 2-D DFT
//! - Grayscale images with their centered spectrum
//! - Normalized 8-bit previews of each component

pub mod fft;
pub mod spectral_image;
pub mod plane;
pub mod view;

pub use spectral_image::SpectralImage;
pub use fft::{fft2, fftshift, ifft2, ifftshift};
pub use plane::Plane;
pub use view::{decode_base64, encode_png, encode_png_base64, ViewKind};

pub use rustfft::num_complex::Complex64;
