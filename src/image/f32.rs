//! Single-channel slice cut out of a scalar representation.
//!
//! Values are in the native units of the representation the slice came
//! from. NaN marks voxels without a value and is skipped by `min_max`.
use super::traits::ImageView;

#[derive(Clone, Debug, PartialEq)]
pub struct ImageF32 {
    /// Extent along the slice's first in-plane axis
    pub w: usize,
    /// Extent along the slice's second in-plane axis
    pub h: usize,
    /// Row-major samples, `w * h` of them
    pub data: Vec<f32>,
}

impl ImageF32 {
    /// NaN-filled slice, so unset pixels read as "no value".
    pub fn new(w: usize, h: usize) -> Self {
        Self {
            w,
            h,
            data: vec![f32::NAN; w * h],
        }
    }

    #[inline]
    pub fn get(&self, x: usize, y: usize) -> f32 {
        self.data[y * self.w + x]
    }

    #[inline]
    pub fn set(&mut self, x: usize, y: usize, v: f32) {
        self.data[y * self.w + x] = v;
    }

    /// Smallest and largest finite value, or `None` for an all-NaN slice.
    pub fn min_max(&self) -> Option<(f32, f32)> {
        self.data
            .iter()
            .copied()
            .filter(|v| v.is_finite())
            .fold(None, |acc, v| match acc {
                None => Some((v, v)),
                Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
            })
    }
}

impl ImageView for ImageF32 {
    type Pixel = f32;

    fn width(&self) -> usize {
        self.w
    }
    fn height(&self) -> usize {
        self.h
    }
    fn row(&self, y: usize) -> &[f32] {
        &self.data[y * self.w..(y + 1) * self.w]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unset_pixels_are_ignored_by_min_max() {
        let mut slice = ImageF32::new(3, 2);
        assert_eq!(slice.min_max(), None);
        slice.set(2, 1, -4.0);
        slice.set(0, 0, 9.5);
        assert_eq!(slice.min_max(), Some((-4.0, 9.5)));
    }

    #[test]
    fn rows_cover_the_raster_in_order() {
        let mut slice = ImageF32::new(2, 3);
        for y in 0..3 {
            for x in 0..2 {
                slice.set(x, y, (10 * y + x) as f32);
            }
        }
        let rows: Vec<&[f32]> = slice.rows().collect();
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[2], &[20.0, 21.0]);
        assert_eq!(slice.rows().size_hint(), (3, Some(3)));
    }
}
