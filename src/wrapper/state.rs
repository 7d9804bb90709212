use crate::geometry::{DisplayGeometry, ImageGeometry, ReferenceSpace, SpatialTransform, ViewportGeometry};
use crate::types::NativeMapping;

/// Geometric and intensity-mapping state shared by a wrapper and every
/// representation it owns. The parent's copy is authoritative; each
/// representation mirrors it and is only updated by the parent.
#[derive(Clone, Debug, PartialEq)]
pub struct WrapperState {
    pub slice_index: [usize; 3],
    pub time_point: usize,
    pub viewports: [ViewportGeometry; 3],
    pub display_geometry: DisplayGeometry,
    pub image_geometry: ImageGeometry,
    pub reference_space: ReferenceSpace,
    pub transform: SpatialTransform,
    pub native_mapping: NativeMapping,
}

impl Default for WrapperState {
    fn default() -> Self {
        Self {
            slice_index: [0; 3],
            time_point: 0,
            viewports: Default::default(),
            display_geometry: DisplayGeometry::default(),
            image_geometry: ImageGeometry::default(),
            reference_space: ReferenceSpace::new([1, 1, 1], ImageGeometry::default()),
            transform: SpatialTransform::identity(),
            native_mapping: NativeMapping::IDENTITY,
        }
    }
}

impl WrapperState {
    /// Keep the cursor and time point inside an image of the given extent.
    pub(crate) fn clamp_to(&mut self, size: [usize; 3], time_points: usize) {
        for (s, n) in self.slice_index.iter_mut().zip(size) {
            *s = (*s).min(n.saturating_sub(1));
        }
        self.time_point = self.time_point.min(time_points.saturating_sub(1));
    }

    pub fn is_slicing_orthogonal(&self) -> bool {
        crate::geometry::is_slicing_orthogonal(
            &self.image_geometry,
            &self.reference_space,
            &self.transform,
        )
    }
}
