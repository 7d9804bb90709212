//! Scalar views of a vector image.
//!
//! A component representation aliases the parent's voxel storage and reads
//! one channel out of it. A derived representation owns a materialized
//! buffer holding a per-voxel reduction (magnitude, max, mean) of the
//! native-mapped components.
use super::state::WrapperState;
use crate::display::{ColorMap, DisplayPixel, IntensityCurve, ScalarDisplayMapping};
use crate::error::WrapperError;
use crate::events::{ChangeForwarder, ChangeKind};
use crate::geometry::{
    DisplayGeometry, ImageGeometry, ReferenceSpace, SpatialTransform, ViewportGeometry,
};
use crate::image::{ComponentValue, ImageF32, SharedBuffer, VectorLayout};
use crate::reduction::Reduction;
use crate::types::{NativeMapping, RepresentationId, ScalarRepKey, ScalarRepKind, WrapperId};
use nalgebra::Matrix3;
use rayon::prelude::*;
use std::ops::Deref;
use std::rc::Rc;

/// Anything that carries image header geometry a wrapper can copy.
pub trait HasImageGeometry {
    fn image_geometry(&self) -> &ImageGeometry;
}

#[derive(Debug)]
pub(crate) enum RepresentationSource<T> {
    Component {
        buffer: SharedBuffer<T>,
        index: usize,
    },
    Derived {
        reduction: Reduction,
        source: SharedBuffer<T>,
        values: Vec<f32>,
    },
}

/// Reduce every voxel of `source` after mapping its components to native
/// units.
pub(crate) fn materialize<T: ComponentValue>(
    source: &SharedBuffer<T>,
    components: usize,
    reduction: Reduction,
    mapping: NativeMapping,
) -> Vec<f32> {
    let samples = source.borrow();
    let mut values = Vec::with_capacity(samples.len() / components);
    samples
        .par_chunks_exact(components)
        .map(|px| reduction.apply(px.iter().map(|v| mapping.map(v.to_f64()))) as f32)
        .collect_into_vec(&mut values);
    values
}

/// Single-channel view bound to one cache key of a vector image wrapper.
#[derive(Debug)]
pub struct ScalarRepresentation<T> {
    id: RepresentationId,
    key: ScalarRepKey,
    parent: WrapperId,
    layout: VectorLayout,
    source: RepresentationSource<T>,
    state: WrapperState,
    display: ScalarDisplayMapping,
    events: ChangeForwarder,
}

impl<T: ComponentValue> ScalarRepresentation<T> {
    pub(crate) fn new(
        key: ScalarRepKey,
        parent: WrapperId,
        layout: VectorLayout,
        source: RepresentationSource<T>,
        state: WrapperState,
        events: ChangeForwarder,
    ) -> Self {
        Self {
            id: RepresentationId::fresh(),
            key,
            parent,
            layout,
            source,
            state,
            display: ScalarDisplayMapping::default(),
            events,
        }
    }

    pub fn id(&self) -> RepresentationId {
        self.id
    }

    pub fn key(&self) -> ScalarRepKey {
        self.key
    }

    pub fn kind(&self) -> ScalarRepKind {
        self.key.kind
    }

    /// Identity of the wrapper that owns this representation.
    pub fn parent(&self) -> WrapperId {
        self.parent
    }

    pub fn size(&self) -> [usize; 3] {
        self.layout.size
    }

    pub fn component_index(&self) -> Option<usize> {
        match &self.source {
            RepresentationSource::Component { index, .. } => Some(*index),
            RepresentationSource::Derived { .. } => None,
        }
    }

    pub fn reduction(&self) -> Option<Reduction> {
        match &self.source {
            RepresentationSource::Component { .. } => None,
            RepresentationSource::Derived { reduction, .. } => Some(*reduction),
        }
    }

    /// Whether this view reads straight from `buffer`.
    pub fn aliases(&self, buffer: &SharedBuffer<T>) -> bool {
        match &self.source {
            RepresentationSource::Component { buffer: own, .. } => own.ptr_eq(buffer),
            RepresentationSource::Derived { .. } => false,
        }
    }

    pub fn slice_index(&self) -> [usize; 3] {
        self.state.slice_index
    }

    pub fn time_point(&self) -> usize {
        self.state.time_point
    }

    pub fn viewport_geometry(&self, axis: usize) -> &ViewportGeometry {
        &self.state.viewports[axis]
    }

    pub fn display_geometry(&self) -> &DisplayGeometry {
        &self.state.display_geometry
    }

    pub fn direction(&self) -> &Matrix3<f64> {
        &self.state.image_geometry.direction
    }

    pub fn reference_space(&self) -> &ReferenceSpace {
        &self.state.reference_space
    }

    pub fn transform(&self) -> &SpatialTransform {
        &self.state.transform
    }

    pub fn is_slicing_orthogonal(&self) -> bool {
        self.state.is_slicing_orthogonal()
    }

    /// Mapping from this view's stored values to native units. Components
    /// use the parent's mapping; derived views store native values already.
    pub fn native_mapping(&self) -> NativeMapping {
        match self.source {
            RepresentationSource::Component { .. } => self.state.native_mapping,
            RepresentationSource::Derived { .. } => NativeMapping::IDENTITY,
        }
    }

    /// Upstream mapping a derived view was computed with.
    pub fn source_native_mapping(&self) -> Option<NativeMapping> {
        match self.source {
            RepresentationSource::Component { .. } => None,
            RepresentationSource::Derived { .. } => Some(self.state.native_mapping),
        }
    }

    #[inline]
    fn value_at(&self, voxel: usize) -> f64 {
        match &self.source {
            RepresentationSource::Component { buffer, index } => {
                let raw = buffer.borrow()[voxel * self.layout.components + index];
                self.state.native_mapping.map(raw.to_f64())
            }
            RepresentationSource::Derived { values, .. } => values[voxel] as f64,
        }
    }

    /// Native value at `idx` for the current time point.
    pub fn voxel_value(&self, idx: [usize; 3]) -> Option<f64> {
        self.layout
            .contains(idx)
            .then(|| self.value_at(self.layout.voxel_number(idx, self.state.time_point)))
    }

    /// Native value under the cursor and how it would be displayed.
    pub fn voxel_under_cursor(&self) -> Option<(f64, DisplayPixel)> {
        let v = self.voxel_value(self.state.slice_index)?;
        Some((v, self.display.map(v)))
    }

    /// Native value range over the current time point.
    pub fn value_range(&self) -> Option<(f64, f64)> {
        let n = self.layout.voxels_per_time_point();
        let base = n * self.state.time_point;
        (base..base + n)
            .map(|v| self.value_at(v))
            .filter(|v| v.is_finite())
            .fold(None, |acc, v| match acc {
                None => Some((v, v)),
                Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
            })
    }

    /// Cut the slice through the cursor perpendicular to voxel axis `axis`.
    pub fn extract_slice(&self, axis: usize) -> Result<ImageF32, WrapperError> {
        if axis > 2 {
            return Err(WrapperError::InvalidAxis(axis));
        }
        let (u, v) = match axis {
            0 => (1, 2),
            1 => (0, 2),
            _ => (0, 1),
        };
        let size = self.layout.size;
        let mut out = ImageF32::new(size[u], size[v]);
        let mut idx = self.state.slice_index;
        for y in 0..size[v] {
            for x in 0..size[u] {
                idx[u] = x;
                idx[v] = y;
                let value = self
                    .voxel_value(idx)
                    .ok_or(WrapperError::IndexOutOfRange {
                        index: idx,
                        time_point: self.state.time_point,
                        size,
                    })?;
                out.set(x, y, value as f32);
            }
        }
        Ok(out)
    }

    pub fn display_mapping(&self) -> &ScalarDisplayMapping {
        &self.display
    }

    /// Curves are passed in explicitly; several representations may hold the
    /// same `Rc`.
    pub fn set_intensity_curve(&mut self, curve: Rc<IntensityCurve>) {
        self.display.curve = curve;
        self.events.emit(ChangeKind::DisplayMapping);
    }

    pub fn set_color_map(&mut self, color_map: ColorMap) {
        self.display.color_map = color_map;
        self.events.emit(ChangeKind::DisplayMapping);
    }

    pub fn set_display_window(&mut self, window: (f64, f64)) {
        self.display.window = window;
        self.events.emit(ChangeKind::DisplayMapping);
    }

    /// Reset the display window to the current value range.
    pub(crate) fn initialize_display_window(&mut self) {
        if let Some(range) = self.value_range() {
            self.display.window = range;
        }
    }

    // Mutators below are driven only by the owning wrapper.

    pub(crate) fn set_slice_index(&mut self, cursor: [usize; 3]) {
        self.state.slice_index = cursor;
        self.events.emit(ChangeKind::SliceIndex(cursor));
    }

    pub(crate) fn set_time_point(&mut self, t: usize) {
        self.state.time_point = t;
        self.events.emit(ChangeKind::TimePoint(t));
    }

    pub(crate) fn set_display_viewport_geometry(&mut self, axis: usize, geom: ViewportGeometry) {
        self.state.viewports[axis] = geom;
        self.events.emit(ChangeKind::ViewportGeometry(axis));
    }

    pub(crate) fn set_display_geometry(&mut self, geom: DisplayGeometry) {
        self.state.display_geometry = geom;
        self.events.emit(ChangeKind::DisplayGeometry);
    }

    pub(crate) fn set_direction_matrix(&mut self, direction: Matrix3<f64>) {
        self.state.image_geometry.direction = direction;
        self.events.emit(ChangeKind::DirectionMatrix);
    }

    pub(crate) fn copy_image_coordinate_transform(&mut self, geometry: ImageGeometry) {
        self.state.image_geometry = geometry;
        self.events.emit(ChangeKind::CoordinateTransform);
    }

    pub(crate) fn set_spatial_transform(
        &mut self,
        reference_space: ReferenceSpace,
        transform: SpatialTransform,
    ) {
        self.state.reference_space = reference_space;
        self.state.transform = transform;
        self.events.emit(ChangeKind::SpatialTransform);
    }

    /// Component views take the mapping as their own.
    pub(crate) fn set_native_mapping(&mut self, mapping: NativeMapping) {
        debug_assert!(!self.key.kind.is_derived());
        self.state.native_mapping = mapping;
        self.events.emit(ChangeKind::NativeMapping);
    }

    /// Derived views keep the identity mapping but recompute their values
    /// from the new upstream mapping.
    pub(crate) fn set_source_native_mapping(&mut self, mapping: NativeMapping) {
        debug_assert!(self.key.kind.is_derived());
        self.state.native_mapping = mapping;
        self.rematerialize();
        self.events.emit(ChangeKind::NativeMapping);
    }

    /// Recompute derived values after the upstream samples changed.
    pub(crate) fn rematerialize(&mut self) {
        let components = self.layout.components;
        let mapping = self.state.native_mapping;
        if let RepresentationSource::Derived {
            reduction,
            source,
            values,
        } = &mut self.source
        {
            *values = materialize(source, components, *reduction, mapping);
        }
    }

    pub(crate) fn pixels_modified(&mut self) {
        self.rematerialize();
        self.events.emit(ChangeKind::PixelsModified);
    }
}

impl<T> HasImageGeometry for ScalarRepresentation<T> {
    fn image_geometry(&self) -> &ImageGeometry {
        &self.state.image_geometry
    }
}

/// Typed handle on a component representation.
#[derive(Clone, Copy, Debug)]
pub struct ComponentWrapper<'a, T> {
    rep: &'a ScalarRepresentation<T>,
    index: usize,
}

impl<'a, T: ComponentValue> ComponentWrapper<'a, T> {
    /// `None` if `rep` is a derived view.
    pub fn from_representation(rep: &'a ScalarRepresentation<T>) -> Option<Self> {
        rep.component_index().map(|index| Self { rep, index })
    }

    pub fn index(&self) -> usize {
        self.index
    }

    /// Stored (unmapped) value at `idx` for the current time point.
    pub fn raw_value(&self, idx: [usize; 3]) -> Option<T> {
        let RepresentationSource::Component { buffer, index } = &self.rep.source else {
            return None;
        };
        let layout = self.rep.layout;
        layout.contains(idx).then(|| {
            buffer.borrow()[layout.sample_offset(idx, self.rep.state.time_point) + index]
        })
    }

    pub fn representation(&self) -> &'a ScalarRepresentation<T> {
        self.rep
    }
}

impl<'a, T> Deref for ComponentWrapper<'a, T> {
    type Target = ScalarRepresentation<T>;

    fn deref(&self) -> &Self::Target {
        self.rep
    }
}
