//! Geometric frames shared between a vector image and its scalar views.
//!
//! `ReferenceSpace` is the voxel grid the display slices in. `ImageGeometry`
//! is the header geometry of one image (spacing, origin, direction).
//! `SpatialTransform` is an affine map applied between the image and the
//! reference space. All of them are replaced wholesale; there are no partial
//! setters.

use nalgebra::{Matrix3, Matrix4, Vector3};
use serde::{Deserialize, Serialize};

const ORTHOGONAL_TOL: f64 = 1e-6;

/// Physical header geometry of an image: spacing, origin and direction.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ImageGeometry {
    pub spacing: Vector3<f64>,
    pub origin: Vector3<f64>,
    pub direction: Matrix3<f64>,
}

impl ImageGeometry {
    pub fn new(spacing: Vector3<f64>, origin: Vector3<f64>, direction: Matrix3<f64>) -> Self {
        Self {
            spacing,
            origin,
            direction,
        }
    }

    /// Physical position of a continuous voxel index.
    pub fn index_to_physical(&self, index: Vector3<f64>) -> Vector3<f64> {
        self.origin + self.direction * index.component_mul(&self.spacing)
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.spacing.iter().any(|s| !s.is_finite() || *s <= 0.0) {
            return Err(format!("non-positive spacing {:?}", self.spacing.as_slice()));
        }
        if self.direction.determinant().abs() < 1e-12 {
            return Err("singular direction matrix".to_string());
        }
        Ok(())
    }
}

impl Default for ImageGeometry {
    fn default() -> Self {
        Self {
            spacing: Vector3::repeat(1.0),
            origin: Vector3::zeros(),
            direction: Matrix3::identity(),
        }
    }
}

/// Voxel grid shared by a wrapper and every representation it owns.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ReferenceSpace {
    pub size: [usize; 3],
    pub geometry: ImageGeometry,
}

impl ReferenceSpace {
    pub fn new(size: [usize; 3], geometry: ImageGeometry) -> Self {
        Self { size, geometry }
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.size.iter().any(|&n| n == 0) {
            return Err(format!("empty reference grid {:?}", self.size));
        }
        self.geometry.validate()
    }
}

/// Affine spatial transform in homogeneous coordinates.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SpatialTransform {
    pub matrix: Matrix4<f64>,
}

impl SpatialTransform {
    pub fn identity() -> Self {
        Self {
            matrix: Matrix4::identity(),
        }
    }

    pub fn from_parts(linear: Matrix3<f64>, offset: Vector3<f64>) -> Self {
        let mut matrix = Matrix4::identity();
        matrix.fixed_view_mut::<3, 3>(0, 0).copy_from(&linear);
        matrix.fixed_view_mut::<3, 1>(0, 3).copy_from(&offset);
        Self { matrix }
    }

    pub fn linear(&self) -> Matrix3<f64> {
        self.matrix.fixed_view::<3, 3>(0, 0).into_owned()
    }

    pub fn offset(&self) -> Vector3<f64> {
        self.matrix.fixed_view::<3, 1>(0, 3).into_owned()
    }

    pub fn is_identity_linear(&self) -> bool {
        (self.linear() - Matrix3::identity()).amax() <= ORTHOGONAL_TOL
    }
}

impl Default for SpatialTransform {
    fn default() -> Self {
        Self::identity()
    }
}

/// Whether slicing `image` in `reference` under `transform` walks the image
/// along its own voxel axes.
pub fn is_slicing_orthogonal(
    image: &ImageGeometry,
    reference: &ReferenceSpace,
    transform: &SpatialTransform,
) -> bool {
    transform.is_identity_linear()
        && (image.direction - reference.geometry.direction).amax() <= ORTHOGONAL_TOL
}

/// Geometry of the 2-D viewport a display window renders for one axis.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ViewportGeometry {
    pub size: [usize; 2],
    pub spacing: [f64; 2],
    pub origin: Vector3<f64>,
    pub direction: Matrix3<f64>,
}

impl Default for ViewportGeometry {
    fn default() -> Self {
        Self {
            size: [1, 1],
            spacing: [1.0, 1.0],
            origin: Vector3::zeros(),
            direction: Matrix3::identity(),
        }
    }
}

/// Anatomical orientation of the three display windows, as three-letter
/// RAI codes (one per window).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisplayGeometry {
    pub display_to_anatomy: [String; 3],
}

impl Default for DisplayGeometry {
    fn default() -> Self {
        Self {
            display_to_anatomy: ["RPS".to_string(), "AIR".to_string(), "RIP".to_string()],
        }
    }
}

/// Axis-aligned voxel region `[index, index + size)`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageRegion {
    pub index: [usize; 3],
    pub size: [usize; 3],
}

impl ImageRegion {
    pub fn new(index: [usize; 3], size: [usize; 3]) -> Self {
        Self { index, size }
    }

    pub fn whole(size: [usize; 3]) -> Self {
        Self {
            index: [0; 3],
            size,
        }
    }

    pub fn contains(&self, idx: [usize; 3]) -> bool {
        (0..3).all(|d| idx[d] >= self.index[d] && idx[d] < self.index[d] + self.size[d])
    }

    pub fn is_inside(&self, size: [usize; 3]) -> bool {
        (0..3).all(|d| self.index[d] + self.size[d] <= size[d])
    }

    pub fn voxel_count(&self) -> usize {
        self.size.iter().product()
    }
}

/// Raster-order walk over a region (x fastest), starting at any index inside
/// it. Mirrors how a region iterator advances past the end of a row.
pub struct RegionWalker {
    region: ImageRegion,
    current: Option<[usize; 3]>,
}

impl RegionWalker {
    pub fn starting_at(region: ImageRegion, start: [usize; 3]) -> Self {
        let current = region.contains(start).then_some(start);
        Self { region, current }
    }
}

impl Iterator for RegionWalker {
    type Item = [usize; 3];

    fn next(&mut self) -> Option<[usize; 3]> {
        let here = self.current?;
        let mut next = here;
        let mut d = 0;
        loop {
            if d == 3 {
                self.current = None;
                break;
            }
            next[d] += 1;
            if next[d] < self.region.index[d] + self.region.size[d] {
                self.current = Some(next);
                break;
            }
            next[d] = self.region.index[d];
            d += 1;
        }
        Some(here)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn walker_wraps_rows_inside_region() {
        let region = ImageRegion::new([1, 1, 0], [2, 2, 1]);
        let visited: Vec<_> = RegionWalker::starting_at(region, [2, 1, 0]).collect();
        assert_eq!(visited, vec![[2, 1, 0], [1, 2, 0], [2, 2, 0]]);
    }

    #[test]
    fn walker_outside_region_is_empty() {
        let region = ImageRegion::new([0, 0, 0], [2, 2, 2]);
        assert_eq!(RegionWalker::starting_at(region, [5, 0, 0]).count(), 0);
    }

    #[test]
    fn rotation_breaks_orthogonality() {
        let geom = ImageGeometry::default();
        let reference = ReferenceSpace::new([4, 4, 4], geom.clone());
        assert!(is_slicing_orthogonal(
            &geom,
            &reference,
            &SpatialTransform::identity()
        ));
        let rot = nalgebra::Rotation3::from_axis_angle(&Vector3::z_axis(), 0.3);
        let oblique = SpatialTransform::from_parts(*rot.matrix(), Vector3::zeros());
        assert!(!is_slicing_orthogonal(&geom, &reference, &oblique));
        let shifted = SpatialTransform::from_parts(Matrix3::identity(), Vector3::new(3.0, 0.0, 0.0));
        assert!(is_slicing_orthogonal(&geom, &reference, &shifted));
    }

    #[test]
    fn geometry_rejects_zero_spacing() {
        let mut geom = ImageGeometry::default();
        geom.spacing.x = 0.0;
        assert!(geom.validate().is_err());
    }
}
