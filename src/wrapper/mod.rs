//! Wrapper around a loaded multi-component volume.
//!
//! `VectorImageWrapper` owns the image, a cache of scalar representations
//! keyed by [`ScalarRepKey`], a flattened view feeding the range/histogram
//! engine, and the change channel consumers subscribe to. The cache is
//! rebuilt in full by [`VectorImageWrapper::update_wrapped_images`]; all
//! later mutations are fanned out to the cached views (see `propagation`).
//!
//! The wrapper is single-threaded: it is neither `Send` nor `Sync`, and the
//! numeric passes it runs block the caller while fanning out to rayon.

mod export;
mod factory;
mod propagation;
pub mod representation;
pub mod state;

pub use export::CastToFloatPipeline;
pub use representation::{ComponentWrapper, HasImageGeometry, ScalarRepresentation};
pub use state::WrapperState;

use crate::config::WrapperConfig;
use crate::display::{DisplayPixel, MultiChannelDisplayMapping, MultiChannelDisplayMode};
use crate::error::WrapperError;
use crate::events::{ChangeBroadcaster, ChangeKind, WrapperChangeEvent};
use crate::geometry::{ImageGeometry, ImageRegion, ReferenceSpace, SpatialTransform};
use crate::image::{ComponentValue, VectorImage};
use crate::reduction::Reduction;
use crate::stats::{accumulate_run_length, FlattenedView, RangeHistogramEngine, ScalarHistogram};
use crate::types::{ScalarRepKey, ScalarRepKind, WrapperId};
use factory::{create_component_wrapper, create_derived_wrapper, ParentLink};
use log::debug;
use std::collections::BTreeMap;
use std::sync::mpsc::Receiver;
use std::time::Instant;

pub struct VectorImageWrapper<T> {
    id: WrapperId,
    config: WrapperConfig,
    image: Option<VectorImage<T>>,
    state: WrapperState,
    reps: BTreeMap<ScalarRepKey, ScalarRepresentation<T>>,
    engine: RangeHistogramEngine<T>,
    display: MultiChannelDisplayMapping,
    events: ChangeBroadcaster,
}

impl<T: ComponentValue> Default for VectorImageWrapper<T> {
    fn default() -> Self {
        Self::new(WrapperConfig::default())
    }
}

impl<T: ComponentValue> VectorImageWrapper<T> {
    pub fn new(config: WrapperConfig) -> Self {
        let engine = RangeHistogramEngine::new(config.histogram_bins);
        Self {
            id: WrapperId::fresh(),
            config,
            image: None,
            state: WrapperState::default(),
            reps: BTreeMap::new(),
            engine,
            display: MultiChannelDisplayMapping::new(
                MultiChannelDisplayMode::scalar(ScalarRepKey::component(0)),
                (0.0, 1.0),
            ),
            events: ChangeBroadcaster::new(),
        }
    }

    pub fn id(&self) -> WrapperId {
        self.id
    }

    pub fn config(&self) -> &WrapperConfig {
        &self.config
    }

    pub fn is_initialized(&self) -> bool {
        self.image.is_some()
    }

    pub fn image(&self) -> Option<&VectorImage<T>> {
        self.image.as_ref()
    }

    fn image_or_err(&self) -> Result<&VectorImage<T>, WrapperError> {
        self.image.as_ref().ok_or(WrapperError::NotInitialized)
    }

    pub fn number_of_components(&self) -> usize {
        self.image.as_ref().map_or(0, |img| img.components())
    }

    pub fn state(&self) -> &WrapperState {
        &self.state
    }

    /// Receive every change of this wrapper and of its representations.
    pub fn subscribe(&self) -> Receiver<WrapperChangeEvent> {
        self.events.subscribe()
    }

    /// Replace the wrapped volume and rebuild every scalar representation.
    ///
    /// The new cache is assembled on the side and swapped in only once all
    /// views were built, so a failure leaves the previous image and cache
    /// untouched.
    pub fn update_wrapped_images(
        &mut self,
        image: VectorImage<T>,
        reference_space: ReferenceSpace,
        transform: SpatialTransform,
    ) -> Result<(), WrapperError> {
        let start = Instant::now();
        image
            .geometry()
            .validate()
            .map_err(WrapperError::InvalidReferenceSpace)?;

        let mut state = self.state.clone();
        state.image_geometry = image.geometry().clone();
        state.reference_space = reference_space.clone();
        state.transform = transform.clone();
        state.clamp_to(image.size(), image.time_points());

        let link = ParentLink {
            id: self.id,
            state: &state,
            events: &self.events,
        };
        let mut reps = BTreeMap::new();
        for i in 0..image.components() {
            let rep = create_component_wrapper(&link, &image, i, &reference_space, &transform)?;
            reps.insert(rep.key(), rep);
        }
        for reduction in Reduction::ALL {
            let rep =
                create_derived_wrapper(&link, &image, reduction, &reference_space, &transform)?;
            reps.insert(rep.key(), rep);
        }

        let flat = FlattenedView::new(image.buffer());
        self.state = state;
        self.reps = reps;
        self.image = Some(image);
        self.engine.set_input(flat);
        self.engine.set_number_of_bins(self.config.histogram_bins);
        self.engine.set_intensity_transform(self.state.native_mapping);

        // Display initialization queries the representations, so it runs last.
        self.initialize_display_mapping();

        debug!(
            "VectorImageWrapper rebuilt {} representations in {:.3} ms",
            self.reps.len(),
            start.elapsed().as_secs_f64() * 1000.0
        );
        self.events.emit(ChangeKind::ImageReplaced);
        Ok(())
    }

    fn initialize_display_mapping(&mut self) {
        let nc = self.number_of_components();
        let mode = if nc == 3 && self.config.rgb_for_three_components {
            MultiChannelDisplayMode::rgb()
        } else {
            MultiChannelDisplayMode::scalar(ScalarRepKey::component(0))
        };
        let mapping = self.state.native_mapping;
        let window = self
            .engine
            .min_max()
            .map(|(lo, hi)| {
                let (a, b) = (mapping.map(lo), mapping.map(hi));
                (a.min(b), a.max(b))
            })
            .unwrap_or((0.0, 1.0));
        self.display = MultiChannelDisplayMapping::new(mode, window);
        for rep in self.reps.values_mut() {
            rep.initialize_display_window();
        }
    }

    // --- Scalar representation cache ---------------------------------------

    pub fn scalar_representation(
        &self,
        kind: ScalarRepKind,
        index: usize,
    ) -> Option<&ScalarRepresentation<T>> {
        self.reps.get(&ScalarRepKey::new(kind, index))
    }

    pub fn scalar_representation_by_key(&self, key: ScalarRepKey) -> Option<&ScalarRepresentation<T>> {
        self.reps.get(&key)
    }

    /// Mutable access for display-side configuration (curves, color maps).
    pub fn scalar_representation_mut(
        &mut self,
        key: ScalarRepKey,
    ) -> Option<&mut ScalarRepresentation<T>> {
        self.reps.get_mut(&key)
    }

    /// Key under which `rep` is cached, by identity.
    pub fn find_scalar_representation(&self, rep: &ScalarRepresentation<T>) -> Option<ScalarRepKey> {
        self.reps
            .iter()
            .find(|(_, cached)| std::ptr::eq(*cached, rep))
            .map(|(key, _)| *key)
    }

    pub fn component_wrapper(&self, index: usize) -> Option<ComponentWrapper<'_, T>> {
        self.reps
            .get(&ScalarRepKey::component(index))
            .and_then(ComponentWrapper::from_representation)
    }

    /// Cached views in key order: components by index, then magnitude, max
    /// and average.
    pub fn scalar_representations(
        &self,
    ) -> impl Iterator<Item = (ScalarRepKey, &ScalarRepresentation<T>)> + '_ {
        self.reps.iter().map(|(k, v)| (*k, v))
    }

    pub fn scalar_representation_keys(&self) -> Vec<ScalarRepKey> {
        self.reps.keys().copied().collect()
    }

    /// The representation the display mapping selects, or the configured
    /// fallback (max by default) when the image is shown as a vector.
    pub fn default_scalar_representation(&self) -> Option<&ScalarRepresentation<T>> {
        let key = self
            .display
            .scalar_representation()
            .unwrap_or_else(|| self.config.fallback_key());
        self.reps.get(&key)
    }

    // --- Display ----------------------------------------------------------

    pub fn display_mapping(&self) -> &MultiChannelDisplayMapping {
        &self.display
    }

    pub fn set_display_mode(&mut self, mode: MultiChannelDisplayMode) {
        self.display.mode = mode;
        self.events.emit(ChangeKind::DisplayMapping);
    }

    /// Values under the cursor and their appearance. In vector display all
    /// components are sampled; otherwise the selected scalar view answers.
    /// A cursor outside the image is reported, never wrapped or clamped.
    pub fn voxel_under_cursor_value_and_appearance(
        &self,
    ) -> Result<(Vec<f64>, DisplayPixel), WrapperError> {
        let image = self.image_or_err()?;
        if self.display.mode.shows_vector(image.components()) {
            let mapping = self.state.native_mapping;
            let values: Vec<f64> = image
                .pixel(self.state.slice_index, self.state.time_point)?
                .into_iter()
                .map(|v| mapping.map(v.to_f64()))
                .collect();
            let appearance = self.display.map_rgb(&values);
            return Ok((values, appearance));
        }
        let key = self.display.mode.selected;
        let rep = self
            .reps
            .get(&key)
            .ok_or(WrapperError::UnknownRepresentation(key))?;
        let (value, appearance) = rep.voxel_under_cursor().ok_or_else(|| {
            WrapperError::IndexOutOfRange {
                index: self.state.slice_index,
                time_point: self.state.time_point,
                size: image.size(),
            }
        })?;
        Ok((vec![value], appearance))
    }

    // --- Statistics ------------------------------------------------------

    /// Recompute and return the histogram of all samples. A non-zero
    /// `bins` changes the bin count first. The reference stays valid until
    /// the next recomputation.
    pub fn histogram(&mut self, bins: usize) -> Result<&ScalarHistogram, WrapperError> {
        self.image_or_err()?;
        self.engine.set_number_of_bins(bins);
        self.engine.update()
    }

    /// Last computed histogram, if any.
    pub fn cached_histogram(&self) -> Option<&ScalarHistogram> {
        self.engine.histogram()
    }

    pub fn histogram_bins(&self) -> usize {
        self.engine.number_of_bins()
    }

    /// Smallest raw sample over all components.
    pub fn image_min(&mut self) -> Option<f64> {
        self.engine.min_max().map(|(lo, _)| lo)
    }

    /// Largest raw sample over all components.
    pub fn image_max(&mut self) -> Option<f64> {
        self.engine.min_max().map(|(_, hi)| hi)
    }

    pub fn is_slicing_orthogonal(&self) -> bool {
        self.state.is_slicing_orthogonal()
    }

    /// Per-component sum and sum of squares over a run of voxels. Under
    /// oblique slicing every output slot is set to NaN instead.
    pub fn run_length_intensity_statistics(
        &self,
        region: &ImageRegion,
        start: [usize; 3],
        run_length: usize,
        out_sum: &mut [f64],
        out_sumsq: &mut [f64],
    ) -> Result<(), WrapperError> {
        let image = self.image_or_err()?;
        accumulate_run_length(
            image,
            self.state.time_point,
            self.is_slicing_orthogonal(),
            region,
            start,
            run_length,
            out_sum,
            out_sumsq,
        );
        Ok(())
    }

    /// Call after writing voxels through the shared buffer. Cached ranges
    /// are dropped and derived views recomputed.
    pub fn pixels_modified(&mut self) {
        self.engine.invalidate();
        for rep in self.reps.values_mut() {
            rep.pixels_modified();
        }
        self.events.emit(ChangeKind::PixelsModified);
    }

    /// Independent copy of a region at the current time point.
    pub fn deep_copy_region(&self, region: &ImageRegion) -> Result<VectorImage<T>, WrapperError> {
        self.image_or_err()?
            .copy_region(region, self.state.time_point)
    }
}

impl<T> HasImageGeometry for VectorImageWrapper<T> {
    fn image_geometry(&self) -> &ImageGeometry {
        &self.state.image_geometry
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_channel() -> VectorImage<u8> {
        VectorImage::from_fn([3, 3, 2], 2, ImageGeometry::default(), |idx, c| {
            (idx[0] + c * 10) as u8
        })
        .unwrap()
    }

    fn loaded() -> VectorImageWrapper<u8> {
        let mut w = VectorImageWrapper::default();
        let reference = ReferenceSpace::new([3, 3, 2], ImageGeometry::default());
        w.update_wrapped_images(two_channel(), reference, SpatialTransform::identity())
            .unwrap();
        w
    }

    #[test]
    fn uninitialized_wrapper_reports_errors() {
        let mut w = VectorImageWrapper::<u8>::default();
        assert!(matches!(w.histogram(0), Err(WrapperError::NotInitialized)));
        assert!(w.default_scalar_representation().is_none());
        assert_eq!(w.number_of_components(), 0);
    }

    #[test]
    fn failed_rebuild_keeps_previous_cache() {
        let mut w = loaded();
        let before = w.scalar_representation_keys();
        let bad_reference = ReferenceSpace::new([0, 3, 2], ImageGeometry::default());
        let err = w
            .update_wrapped_images(two_channel(), bad_reference, SpatialTransform::identity())
            .unwrap_err();
        assert!(matches!(err, WrapperError::InvalidReferenceSpace(_)));
        assert_eq!(w.scalar_representation_keys(), before);
        assert_eq!(w.state().reference_space.size, [3, 3, 2]);
    }

    #[test]
    fn two_channel_default_is_first_component() {
        let w = loaded();
        let rep = w.default_scalar_representation().unwrap();
        assert_eq!(rep.key(), ScalarRepKey::component(0));
    }

    #[test]
    fn rgb_mode_falls_back_to_max() {
        let mut w = loaded();
        w.set_display_mode(MultiChannelDisplayMode::rgb());
        assert_eq!(
            w.default_scalar_representation().unwrap().key(),
            ScalarRepKey::MAX
        );
    }

    #[test]
    fn image_min_max_span_all_components() {
        let mut w = loaded();
        assert_eq!(w.image_min(), Some(0.0));
        assert_eq!(w.image_max(), Some(12.0));
    }
}
