//! Owned multi-component volume with shareable voxel storage.
//!
//! Voxels are interleaved: all components of one voxel are adjacent, then x,
//! y, z and time vary in that order. The storage lives behind a
//! `SharedBuffer`, so component views and the flattened view alias the same
//! samples as the parent image.
use crate::error::WrapperError;
use crate::geometry::{ImageGeometry, ImageRegion};
use nalgebra::Vector3;
use std::cell::{Ref, RefCell, RefMut};
use std::fmt::Debug;
use std::rc::Rc;

/// Scalar type a vector image can store per component.
pub trait ComponentValue: Copy + Debug + Default + PartialOrd + Send + Sync + 'static {
    const TYPE_NAME: &'static str;

    fn to_f64(self) -> f64;
}

macro_rules! impl_integer_component {
    ($($t:ty),*) => {
        $(
            impl ComponentValue for $t {
                const TYPE_NAME: &'static str = stringify!($t);

                #[inline]
                fn to_f64(self) -> f64 {
                    self as f64
                }
            }
        )*
    };
}

impl_integer_component!(u8, i8, u16, i16);

impl ComponentValue for f32 {
    const TYPE_NAME: &'static str = "f32";

    #[inline]
    fn to_f64(self) -> f64 {
        self as f64
    }
}

/// Reference-counted voxel storage. Cloning the handle aliases the samples.
///
/// Borrowing follows `RefCell` rules: the wrapper is single-threaded and
/// never holds a borrow across calls.
#[derive(Debug)]
pub struct SharedBuffer<T>(Rc<RefCell<Vec<T>>>);

impl<T> Clone for SharedBuffer<T> {
    fn clone(&self) -> Self {
        Self(Rc::clone(&self.0))
    }
}

impl<T> SharedBuffer<T> {
    pub fn new(data: Vec<T>) -> Self {
        Self(Rc::new(RefCell::new(data)))
    }

    pub fn len(&self) -> usize {
        self.0.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn borrow(&self) -> Ref<'_, [T]> {
        Ref::map(self.0.borrow(), |v| v.as_slice())
    }

    /// Mutable access to the samples. The length is fixed once loaded.
    pub fn borrow_mut(&self) -> RefMut<'_, [T]> {
        RefMut::map(self.0.borrow_mut(), |v| v.as_mut_slice())
    }

    pub fn ptr_eq(&self, other: &SharedBuffer<T>) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

}

/// Layout of an interleaved vector volume.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct VectorLayout {
    pub size: [usize; 3],
    pub time_points: usize,
    pub components: usize,
}

impl VectorLayout {
    pub fn voxels_per_time_point(&self) -> usize {
        self.size.iter().product()
    }

    pub fn voxel_count(&self) -> usize {
        self.voxels_per_time_point() * self.time_points
    }

    pub fn sample_count(&self) -> usize {
        self.voxel_count() * self.components
    }

    /// Linear voxel number of `idx` at time point `t`.
    #[inline]
    pub fn voxel_number(&self, idx: [usize; 3], t: usize) -> usize {
        let [nx, ny, nz] = self.size;
        ((t * nz + idx[2]) * ny + idx[1]) * nx + idx[0]
    }

    /// Offset of component 0 of voxel `idx` at time point `t`.
    #[inline]
    pub fn sample_offset(&self, idx: [usize; 3], t: usize) -> usize {
        self.voxel_number(idx, t) * self.components
    }

    pub fn contains(&self, idx: [usize; 3]) -> bool {
        (0..3).all(|d| idx[d] < self.size[d])
    }
}

/// N-component 3-D (optionally time-resolved) voxel volume.
#[derive(Clone, Debug)]
pub struct VectorImage<T> {
    buffer: SharedBuffer<T>,
    layout: VectorLayout,
    geometry: ImageGeometry,
}

impl<T: ComponentValue> VectorImage<T> {
    /// Wrap interleaved samples. Fails when the sample count does not match
    /// the layout or the layout is degenerate.
    pub fn new(
        size: [usize; 3],
        time_points: usize,
        components: usize,
        geometry: ImageGeometry,
        data: Vec<T>,
    ) -> Result<Self, WrapperError> {
        if components == 0 {
            return Err(WrapperError::EmptyComponents);
        }
        if size.iter().any(|&n| n == 0) || time_points == 0 {
            return Err(WrapperError::InvalidDimensions([
                size[0],
                size[1],
                size[2],
                time_points,
            ]));
        }
        let layout = VectorLayout {
            size,
            time_points,
            components,
        };
        if data.len() != layout.sample_count() {
            return Err(WrapperError::BufferSizeMismatch {
                expected: layout.sample_count(),
                found: data.len(),
            });
        }
        Ok(Self {
            buffer: SharedBuffer::new(data),
            layout,
            geometry,
        })
    }

    /// Build a single time point volume from a per-voxel generator.
    pub fn from_fn<F>(
        size: [usize; 3],
        components: usize,
        geometry: ImageGeometry,
        mut f: F,
    ) -> Result<Self, WrapperError>
    where
        F: FnMut([usize; 3], usize) -> T,
    {
        let mut data = Vec::with_capacity(size.iter().product::<usize>() * components);
        for z in 0..size[2] {
            for y in 0..size[1] {
                for x in 0..size[0] {
                    for c in 0..components {
                        data.push(f([x, y, z], c));
                    }
                }
            }
        }
        Self::new(size, 1, components, geometry, data)
    }

    pub fn buffer(&self) -> &SharedBuffer<T> {
        &self.buffer
    }

    pub fn layout(&self) -> VectorLayout {
        self.layout
    }

    pub fn size(&self) -> [usize; 3] {
        self.layout.size
    }

    pub fn components(&self) -> usize {
        self.layout.components
    }

    pub fn time_points(&self) -> usize {
        self.layout.time_points
    }

    pub fn geometry(&self) -> &ImageGeometry {
        &self.geometry
    }

    pub fn set_geometry(&mut self, geometry: ImageGeometry) {
        self.geometry = geometry;
    }

    fn checked_offset(&self, idx: [usize; 3], t: usize) -> Result<usize, WrapperError> {
        if self.layout.contains(idx) && t < self.layout.time_points {
            Ok(self.layout.sample_offset(idx, t))
        } else {
            Err(WrapperError::IndexOutOfRange {
                index: idx,
                time_point: t,
                size: self.layout.size,
            })
        }
    }

    /// All components of one voxel.
    pub fn pixel(&self, idx: [usize; 3], t: usize) -> Result<Vec<T>, WrapperError> {
        let off = self.checked_offset(idx, t)?;
        Ok(self.buffer.borrow()[off..off + self.layout.components].to_vec())
    }

    /// Overwrite the leading components of one voxel. Extra values are
    /// ignored.
    pub fn set_pixel(&self, idx: [usize; 3], t: usize, values: &[T]) -> Result<(), WrapperError> {
        let off = self.checked_offset(idx, t)?;
        let n = self.layout.components.min(values.len());
        self.buffer.borrow_mut()[off..off + n].copy_from_slice(&values[..n]);
        Ok(())
    }

    /// Independent copy of the samples inside `region` at time point `t`.
    /// The copy's origin is moved to the region corner.
    pub fn copy_region(&self, region: &ImageRegion, t: usize) -> Result<Self, WrapperError> {
        if !region.is_inside(self.layout.size) || region.voxel_count() == 0 {
            return Err(WrapperError::InvalidDimensions([
                region.size[0],
                region.size[1],
                region.size[2],
                1,
            ]));
        }
        let nc = self.layout.components;
        let src = self.buffer.borrow();
        let mut data = Vec::with_capacity(region.voxel_count() * nc);
        for z in 0..region.size[2] {
            for y in 0..region.size[1] {
                let row = [region.index[0], region.index[1] + y, region.index[2] + z];
                let start = self.layout.sample_offset(row, t);
                data.extend_from_slice(&src[start..start + region.size[0] * nc]);
            }
        }
        let corner = Vector3::new(
            region.index[0] as f64,
            region.index[1] as f64,
            region.index[2] as f64,
        );
        let mut geometry = self.geometry.clone();
        geometry.origin = self.geometry.index_to_physical(corner);
        Self::new(region.size, 1, nc, geometry, data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_wrong_sample_count() {
        let err = VectorImage::<u8>::new([2, 2, 1], 1, 3, ImageGeometry::default(), vec![0; 11])
            .unwrap_err();
        assert!(matches!(
            err,
            WrapperError::BufferSizeMismatch {
                expected: 12,
                found: 11
            }
        ));
    }

    #[test]
    fn clones_alias_storage() {
        let img = VectorImage::<i16>::from_fn([2, 2, 2], 2, ImageGeometry::default(), |_, c| {
            c as i16
        })
        .unwrap();
        let alias = img.clone();
        img.set_pixel([1, 1, 1], 0, &[7, 8]).unwrap();
        assert_eq!(alias.pixel([1, 1, 1], 0).unwrap(), vec![7, 8]);
        assert!(img.buffer().ptr_eq(alias.buffer()));
    }

    #[test]
    fn voxel_access_is_bounds_checked() {
        let img = VectorImage::<u8>::from_fn([3, 3, 2], 2, ImageGeometry::default(), |idx, c| {
            (idx[0] + 3 * idx[1] + 10 * c) as u8
        })
        .unwrap();
        // x past its axis must not wrap into the next row
        assert!(matches!(
            img.pixel([3, 0, 0], 0),
            Err(WrapperError::IndexOutOfRange { .. })
        ));
        assert!(img.pixel([100, 0, 0], 0).is_err());
        assert!(img.pixel([0, 0, 0], 1).is_err());
        assert!(img.set_pixel([0, 3, 0], 0, &[1, 2]).is_err());
        assert_eq!(img.pixel([2, 2, 1], 0).unwrap(), vec![8, 18]);
    }

    #[test]
    fn type_names_follow_rust_spelling() {
        assert_eq!(<u8 as ComponentValue>::TYPE_NAME, "u8");
        assert_eq!(<i16 as ComponentValue>::TYPE_NAME, "i16");
        assert_eq!((-3i8).to_f64(), -3.0);
    }

    #[test]
    fn region_copy_moves_origin() {
        let mut geom = ImageGeometry::default();
        geom.spacing = Vector3::new(2.0, 1.0, 1.0);
        let img = VectorImage::<f32>::from_fn([4, 3, 2], 1, geom, |idx, _| {
            (idx[0] + 10 * idx[1] + 100 * idx[2]) as f32
        })
        .unwrap();
        let region = ImageRegion::new([1, 1, 1], [2, 2, 1]);
        let sub = img.copy_region(&region, 0).unwrap();
        assert_eq!(sub.size(), [2, 2, 1]);
        assert_eq!(sub.pixel([0, 0, 0], 0).unwrap(), vec![111.0]);
        assert_eq!(sub.pixel([1, 1, 0], 0).unwrap(), vec![122.0]);
        assert_eq!(sub.geometry().origin, Vector3::new(2.0, 1.0, 1.0));
    }
}
