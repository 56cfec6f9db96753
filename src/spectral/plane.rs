//! Dense 2-D grid used for spectra, masks and derived component views.

use crate::error::{MixError, Result};

/// Row-major 2-D array of `height * width` elements
#[derive(Debug, Clone, PartialEq)]
pub struct Plane<T> {
    height: usize,
    width: usize,
    data: Vec<T>,
}

impl<T: Clone> Plane<T> {
    /// Create a plane with every cell set to `value`
    pub fn filled(height: usize, width: usize, value: T) -> Self {
        Self {
            height,
            width,
            data: vec![value; height * width],
        }
    }
}

impl<T> Plane<T> {
    /// Wrap an existing row-major buffer
    ///
    /// Fails when `data.len()` does not equal `height * width`.
    pub fn from_vec(height: usize, width: usize, data: Vec<T>) -> Result<Self> {
        if data.len() != height * width {
            return Err(MixError::CompositionFailure {
                reason: format!(
                    "plane buffer has {} cells, expected {}x{}",
                    data.len(),
                    height,
                    width
                ),
            });
        }
        Ok(Self {
            height,
            width,
            data,
        })
    }

    /// Build a plane by evaluating `f(row, col)` for every cell
    pub fn from_fn(height: usize, width: usize, mut f: impl FnMut(usize, usize) -> T) -> Self {
        let mut data = Vec::with_capacity(height * width);
        for y in 0..height {
            for x in 0..width {
                data.push(f(y, x));
            }
        }
        Self {
            height,
            width,
            data,
        }
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn width(&self) -> usize {
        self.width
    }

    /// `(height, width)`
    pub fn shape(&self) -> (usize, usize) {
        (self.height, self.width)
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn get(&self, row: usize, col: usize) -> Option<&T> {
        if row < self.height && col < self.width {
            self.data.get(row * self.width + col)
        } else {
            None
        }
    }

    pub fn get_mut(&mut self, row: usize, col: usize) -> Option<&mut T> {
        if row < self.height && col < self.width {
            self.data.get_mut(row * self.width + col)
        } else {
            None
        }
    }

    pub fn as_slice(&self) -> &[T] {
        &self.data
    }

    pub fn as_mut_slice(&mut self) -> &mut [T] {
        &mut self.data
    }

    pub fn into_vec(self) -> Vec<T> {
        self.data
    }

    /// Apply `f` to every cell, producing a new plane of the same shape
    pub fn map<U>(&self, f: impl FnMut(&T) -> U) -> Plane<U> {
        Plane {
            height: self.height,
            width: self.width,
            data: self.data.iter().map(f).collect(),
        }
    }

    /// Combine two planes of identical shape cell by cell
    ///
    /// Returns `None` when the shapes differ.
    pub fn zip_map<U, V>(&self, other: &Plane<U>, mut f: impl FnMut(&T, &U) -> V) -> Option<Plane<V>> {
        if self.shape() != other.shape() {
            return None;
        }
        Some(Plane {
            height: self.height,
            width: self.width,
            data: self
                .data
                .iter()
                .zip(other.data.iter())
                .map(|(a, b)| f(a, b))
                .collect(),
        })
    }
}

impl Plane<f64> {
    /// Smallest and largest finite value, or `None` for an empty plane
    pub fn min_max(&self) -> Option<(f64, f64)> {
        self.data
            .iter()
            .copied()
            .filter(|v| v.is_finite())
            .fold(None, |acc, v| match acc {
                None => Some((v, v)),
                Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
            })
    }

    /// Min-max normalize into `[0, 255]` bytes
    ///
    /// A constant plane maps to all zeros.
    pub fn normalize_to_u8(&self) -> Vec<u8> {
        let Some((lo, hi)) = self.min_max() else {
            return vec![0; self.data.len()];
        };
        let span = hi - lo;
        self.data
            .iter()
            .map(|&v| {
                if span <= f64::EPSILON || !v.is_finite() {
                    0
                } else {
                    (((v - lo) / span) * 255.0).round().clamp(0.0, 255.0) as u8
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_vec_rejects_wrong_length() {
        assert!(Plane::from_vec(2, 3, vec![0.0; 5]).is_err());
        assert!(Plane::from_vec(2, 3, vec![0.0; 6]).is_ok());
    }

    #[test]
    fn test_from_fn_is_row_major() {
        let plane = Plane::from_fn(2, 3, |y, x| y * 10 + x);
        assert_eq!(plane.as_slice(), &[0, 1, 2, 10, 11, 12]);
        assert_eq!(plane.get(1, 2), Some(&12));
        assert_eq!(plane.get(2, 0), None);
    }

    #[test]
    fn test_zip_map_shape_mismatch() {
        let a = Plane::filled(2, 2, 1.0);
        let b = Plane::filled(2, 3, 1.0);
        assert!(a.zip_map(&b, |x, y| x + y).is_none());
        let c = a.zip_map(&a, |x, y| x + y).unwrap();
        assert_eq!(c.as_slice(), &[2.0; 4]);
    }

    #[test]
    fn test_normalize_spans_full_range() {
        let plane = Plane::from_vec(1, 3, vec![-1.0, 0.0, 1.0]).unwrap();
        assert_eq!(plane.normalize_to_u8(), vec![0, 128, 255]);
    }

    #[test]
    fn test_normalize_constant_plane_is_zero() {
        let plane = Plane::filled(2, 2, 42.0);
        assert_eq!(plane.normalize_to_u8(), vec![0; 4]);
    }
}
