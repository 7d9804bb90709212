use super::timing::TimingBreakdown;
use crate::image::ComponentValue;
use crate::stats::ScalarHistogram;
use crate::types::{NativeMapping, ScalarRepKey};
use crate::wrapper::VectorImageWrapper;
use serde::Serialize;

/// Summary of one cached scalar representation.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RepresentationReport {
    pub key: ScalarRepKey,
    pub slice_index: [usize; 3],
    pub native_mapping: NativeMapping,
    pub value_range: Option<(f64, f64)>,
    pub value_under_cursor: Option<f64>,
}

/// Summary of a loaded wrapper.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WrapperReport {
    pub pixel_type: &'static str,
    pub size: [usize; 3],
    pub time_points: usize,
    pub components: usize,
    pub native_mapping: NativeMapping,
    pub slicing_orthogonal: bool,
    pub image_min: Option<f64>,
    pub image_max: Option<f64>,
    pub default_representation: Option<ScalarRepKey>,
    pub representations: Vec<RepresentationReport>,
    pub histogram: Option<ScalarHistogram>,
    pub timing: TimingBreakdown,
}

impl WrapperReport {
    /// Collect a report. Uses the histogram last computed by the wrapper.
    pub fn collect<T: ComponentValue>(
        wrapper: &mut VectorImageWrapper<T>,
        timing: TimingBreakdown,
    ) -> Self {
        let image_min = wrapper.image_min();
        let image_max = wrapper.image_max();
        let (size, time_points) = wrapper
            .image()
            .map_or(([0; 3], 0), |img| (img.size(), img.time_points()));
        let representations = wrapper
            .scalar_representations()
            .map(|(key, rep)| RepresentationReport {
                key,
                slice_index: rep.slice_index(),
                native_mapping: rep.native_mapping(),
                value_range: rep.value_range(),
                value_under_cursor: rep.voxel_value(rep.slice_index()),
            })
            .collect();
        Self {
            pixel_type: T::TYPE_NAME,
            size,
            time_points,
            components: wrapper.number_of_components(),
            native_mapping: wrapper.native_mapping(),
            slicing_orthogonal: wrapper.is_slicing_orthogonal(),
            image_min,
            image_max,
            default_representation: wrapper.default_scalar_representation().map(|r| r.key()),
            representations,
            histogram: wrapper.cached_histogram().cloned(),
            timing,
        }
    }
}
