//! Mask Builder
//!
//! Rectangular 0/1 windows over the spectral plane. Percentages that place
//! a rectangle partly or fully outside the plane are clipped, never an
//! error; a zero-area rectangle gives an all-zero mask.

use super::request::{MaskConfig, RegionMask, RegionRole};
use crate::registry::InputSlot;
use crate::spectral::Plane;

/// 0/1 weighting window, same shape as the spectrum it applies to
pub type Mask = Plane<f64>;

/// Half-open pixel rectangle `[top, bottom) x [left, right)`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PixelRect {
    pub top: usize,
    pub bottom: usize,
    pub left: usize,
    pub right: usize,
}

impl PixelRect {
    /// Clip a possibly out-of-bounds span on both axes
    fn clipped(y: i64, h: i64, x: i64, w: i64, height: usize, width: usize) -> Self {
        let clip = |start: i64, extent: i64, limit: usize| {
            let limit = limit as i64;
            let lo = start.clamp(0, limit);
            let hi = start.saturating_add(extent.max(0)).clamp(0, limit);
            (lo as usize, hi.max(lo) as usize)
        };
        let (top, bottom) = clip(y, h, height);
        let (left, right) = clip(x, w, width);
        Self {
            top,
            bottom,
            left,
            right,
        }
    }

    pub fn area(&self) -> usize {
        (self.bottom - self.top) * (self.right - self.left)
    }

    pub fn contains(&self, row: usize, col: usize) -> bool {
        (self.top..self.bottom).contains(&row) && (self.left..self.right).contains(&col)
    }
}

/// Pixel count covered by `percent` of `extent`, floored
fn percent_of(extent: usize, percent: f64) -> i64 {
    if !percent.is_finite() {
        return 0;
    }
    (extent as f64 * percent / 100.0).floor() as i64
}

/// Centered rectangle covering `size_percent` of each axis
pub fn basic_rect(height: usize, width: usize, size_percent: f64) -> PixelRect {
    let size = if size_percent.is_finite() {
        size_percent.clamp(0.0, 100.0)
    } else {
        0.0
    };
    let rh = percent_of(height, size);
    let rw = percent_of(width, size);
    let top = (height / 2) as i64 - rh / 2;
    let left = (width / 2) as i64 - rw / 2;
    PixelRect::clipped(top, rh, left, rw, height, width)
}

/// Rectangle at `(x%, y%)` with extent `(width%, height%)`
pub fn region_rect(height: usize, width: usize, region: &RegionMask) -> PixelRect {
    PixelRect::clipped(
        percent_of(height, region.y_percent),
        percent_of(height, region.height_percent),
        percent_of(width, region.x_percent),
        percent_of(width, region.width_percent),
        height,
        width,
    )
}

fn rect_mask(height: usize, width: usize, rect: PixelRect) -> Mask {
    Plane::from_fn(height, width, |y, x| if rect.contains(y, x) { 1.0 } else { 0.0 })
}

/// Centered mask with ones inside the rectangle
pub fn build_basic(height: usize, width: usize, size_percent: f64) -> Mask {
    rect_mask(height, width, basic_rect(height, width, size_percent))
}

/// Positioned mask with ones inside the region's rectangle
///
/// The region's role is not applied here; see [`mask_for`].
pub fn build_region(height: usize, width: usize, region: &RegionMask) -> Mask {
    rect_mask(height, width, region_rect(height, width, region))
}

/// Pixel-wise `1 - mask`
pub fn complement(mask: &Mask) -> Mask {
    mask.map(|v| 1.0 - v)
}

/// Whether `slot` contributes through the complement of its rectangle
pub fn is_outer(config: &MaskConfig, slot: InputSlot) -> bool {
    match config {
        MaskConfig::Basic(basic) => !basic.applies_inner,
        MaskConfig::Region { regions } => regions[slot.index()]
            .map(|r| r.role == RegionRole::Outer)
            .unwrap_or(false),
    }
}

/// Precomputed effective masks for one mix
///
/// Basic mode builds one window and shares it; region mode builds one per
/// slot, with the full-keep window for slots without an entry.
#[derive(Debug, Clone)]
pub struct MaskSet {
    masks: Vec<Mask>,
    shared: bool,
}

impl MaskSet {
    pub fn build(config: &MaskConfig, height: usize, width: usize) -> Self {
        match config {
            MaskConfig::Basic(basic) => {
                let mask = build_basic(height, width, basic.size_percent);
                let mask = if basic.applies_inner {
                    mask
                } else {
                    complement(&mask)
                };
                Self {
                    masks: vec![mask],
                    shared: true,
                }
            }
            MaskConfig::Region { regions } => {
                let masks = InputSlot::ALL
                    .iter()
                    .map(|&slot| {
                        let region = regions[slot.index()].unwrap_or_default();
                        let mask = build_region(height, width, &region);
                        if is_outer(config, slot) {
                            complement(&mask)
                        } else {
                            mask
                        }
                    })
                    .collect();
                Self {
                    masks,
                    shared: false,
                }
            }
        }
    }

    /// The effective (possibly complemented) mask for `slot`
    pub fn get(&self, slot: InputSlot) -> &Mask {
        if self.shared {
            &self.masks[0]
        } else {
            &self.masks[slot.index()]
        }
    }
}

/// The effective mask one slot contributes through
pub fn mask_for(config: &MaskConfig, slot: InputSlot, height: usize, width: usize) -> Mask {
    MaskSet::build(config, height, width).get(slot).clone()
}
