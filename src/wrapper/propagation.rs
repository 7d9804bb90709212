//! Mutators that keep every cached representation in step with the parent.
//!
//! Each mutator updates the parent's own state first, then applies the same
//! change to every representation in key order. Representations never own
//! this state independently.
use super::representation::HasImageGeometry;
use super::VectorImageWrapper;
use crate::error::WrapperError;
use crate::events::ChangeKind;
use crate::geometry::{DisplayGeometry, ReferenceSpace, SpatialTransform, ViewportGeometry};
use crate::image::ComponentValue;
use crate::types::NativeMapping;
use nalgebra::Matrix3;

impl<T: ComponentValue> VectorImageWrapper<T> {
    pub fn set_slice_index(&mut self, cursor: [usize; 3]) {
        self.state.slice_index = cursor;
        self.events.emit(ChangeKind::SliceIndex(cursor));
        for rep in self.reps.values_mut() {
            rep.set_slice_index(cursor);
        }
    }

    /// Select the time point of a 4-D image. Out-of-range values are clamped.
    pub fn set_time_point_index(&mut self, t: usize) {
        let last = self.image.as_ref().map_or(0, |img| img.time_points() - 1);
        let t = t.min(last);
        self.state.time_point = t;
        self.events.emit(ChangeKind::TimePoint(t));
        for rep in self.reps.values_mut() {
            rep.set_time_point(t);
        }
    }

    /// Viewport geometry of display window `axis` (0..3). Other axes are
    /// rejected before any state changes.
    pub fn set_display_viewport_geometry(
        &mut self,
        axis: usize,
        geometry: ViewportGeometry,
    ) -> Result<(), WrapperError> {
        if axis >= self.state.viewports.len() {
            return Err(WrapperError::InvalidAxis(axis));
        }
        self.state.viewports[axis] = geometry.clone();
        self.events.emit(ChangeKind::ViewportGeometry(axis));
        for rep in self.reps.values_mut() {
            rep.set_display_viewport_geometry(axis, geometry.clone());
        }
        Ok(())
    }

    pub fn set_display_geometry(&mut self, geometry: DisplayGeometry) {
        self.state.display_geometry = geometry.clone();
        self.events.emit(ChangeKind::DisplayGeometry);
        for rep in self.reps.values_mut() {
            rep.set_display_geometry(geometry.clone());
        }
    }

    pub fn set_direction_matrix(&mut self, direction: Matrix3<f64>) {
        self.state.image_geometry.direction = direction;
        if let Some(image) = self.image.as_mut() {
            let mut geometry = image.geometry().clone();
            geometry.direction = direction;
            image.set_geometry(geometry);
        }
        self.events.emit(ChangeKind::DirectionMatrix);
        for rep in self.reps.values_mut() {
            rep.set_direction_matrix(direction);
        }
    }

    /// Adopt the spacing, origin and direction of another image.
    pub fn copy_image_coordinate_transform(&mut self, source: &dyn HasImageGeometry) {
        let geometry = source.image_geometry().clone();
        self.state.image_geometry = geometry.clone();
        if let Some(image) = self.image.as_mut() {
            image.set_geometry(geometry.clone());
        }
        self.events.emit(ChangeKind::CoordinateTransform);
        for rep in self.reps.values_mut() {
            rep.copy_image_coordinate_transform(geometry.clone());
        }
    }

    /// Replace the reference space and the spatial transform together.
    pub fn set_spatial_transform(
        &mut self,
        reference_space: ReferenceSpace,
        transform: SpatialTransform,
    ) {
        self.state.reference_space = reference_space.clone();
        self.state.transform = transform.clone();
        self.events.emit(ChangeKind::SpatialTransform);
        for rep in self.reps.values_mut() {
            rep.set_spatial_transform(reference_space.clone(), transform.clone());
        }
    }

    pub fn native_mapping(&self) -> NativeMapping {
        self.state.native_mapping
    }

    /// Components take the mapping verbatim; derived views keep the identity
    /// and recompute from it as their source mapping. The histogram reports
    /// in the new units from its next update.
    pub fn set_native_mapping(&mut self, mapping: NativeMapping) {
        self.state.native_mapping = mapping;
        self.engine.set_intensity_transform(mapping);
        self.events.emit(ChangeKind::NativeMapping);
        for rep in self.reps.values_mut() {
            if rep.kind().is_derived() {
                rep.set_source_native_mapping(mapping);
            } else {
                rep.set_native_mapping(mapping);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::super::VectorImageWrapper;
    use crate::error::WrapperError;
    use crate::geometry::{ImageGeometry, ReferenceSpace, SpatialTransform, ViewportGeometry};
    use crate::image::VectorImage;
    use crate::types::{NativeMapping, ScalarRepKey};

    fn loaded(time_points: usize) -> VectorImageWrapper<i16> {
        let n = 2 * 2 * 2 * time_points * 2;
        let data: Vec<i16> = (0..n as i16).collect();
        let image =
            VectorImage::new([2, 2, 2], time_points, 2, ImageGeometry::default(), data).unwrap();
        let mut w = VectorImageWrapper::default();
        w.update_wrapped_images(
            image,
            ReferenceSpace::new([2, 2, 2], ImageGeometry::default()),
            SpatialTransform::identity(),
        )
        .unwrap();
        w
    }

    #[test]
    fn time_point_is_clamped_and_propagated() {
        let mut w = loaded(3);
        w.set_time_point_index(9);
        assert_eq!(w.state().time_point, 2);
        assert!(w.scalar_representations().all(|(_, r)| r.time_point() == 2));
        let comp = w.component_wrapper(1).unwrap();
        // voxel 0 of time point 2 is voxel number 16, component 1 -> sample 33
        assert_eq!(comp.raw_value([0, 0, 0]), Some(33));
    }

    #[test]
    fn viewport_axis_out_of_range_changes_nothing() {
        let mut w = loaded(1);
        let rx = w.subscribe();
        let geometry = ViewportGeometry {
            size: [64, 64],
            ..Default::default()
        };
        assert!(matches!(
            w.set_display_viewport_geometry(3, geometry.clone()),
            Err(WrapperError::InvalidAxis(3))
        ));
        assert!(rx.try_recv().is_err());
        assert!(w.state().viewports.iter().all(|v| v != &geometry));

        w.set_display_viewport_geometry(2, geometry.clone()).unwrap();
        assert_eq!(w.state().viewports[2], geometry);
    }

    #[test]
    fn derived_views_recompute_on_mapping_change() {
        let mut w = loaded(1);
        let before = w
            .scalar_representation_by_key(ScalarRepKey::MAX)
            .unwrap()
            .voxel_value([1, 0, 0])
            .unwrap();
        assert_eq!(before, 3.0);
        w.set_native_mapping(NativeMapping::new(2.0, 1.0));
        let max = w.scalar_representation_by_key(ScalarRepKey::MAX).unwrap();
        assert_eq!(max.voxel_value([1, 0, 0]), Some(7.0));
        assert_eq!(max.native_mapping(), NativeMapping::IDENTITY);
        assert_eq!(
            max.source_native_mapping(),
            Some(NativeMapping::new(2.0, 1.0))
        );
    }
}
