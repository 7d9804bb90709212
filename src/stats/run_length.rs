use crate::geometry::{ImageRegion, RegionWalker};
use crate::image::{ComponentValue, VectorImage};

/// Add the per-component sum and sum of squares of `run_length` voxels,
/// walked in raster order through `region` from `start`, to `out_sum` and
/// `out_sumsq`.
///
/// The walk is only meaningful when slicing is orthogonal. Otherwise every
/// output slot receives NaN, which callers must check before using the
/// values. Raw (unmapped) values are accumulated.
#[allow(clippy::too_many_arguments)]
pub fn accumulate_run_length<T: ComponentValue>(
    image: &VectorImage<T>,
    time_point: usize,
    orthogonal: bool,
    region: &ImageRegion,
    start: [usize; 3],
    run_length: usize,
    out_sum: &mut [f64],
    out_sumsq: &mut [f64],
) {
    let nc = image.components().min(out_sum.len()).min(out_sumsq.len());
    if !orthogonal {
        for c in 0..nc {
            out_sum[c] += f64::NAN;
            out_sumsq[c] += f64::NAN;
        }
        return;
    }

    let layout = image.layout();
    let samples = image.buffer().borrow();
    for idx in RegionWalker::starting_at(*region, start)
        .take(run_length)
        .filter(|idx| layout.contains(*idx))
    {
        let off = layout.sample_offset(idx, time_point);
        for (c, v) in samples[off..off + nc].iter().enumerate() {
            let v = v.to_f64();
            out_sum[c] += v;
            out_sumsq[c] += v * v;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::ImageGeometry;

    fn ramp() -> VectorImage<u8> {
        VectorImage::from_fn([4, 2, 1], 1, ImageGeometry::default(), |idx, _| {
            (idx[0] + 4 * idx[1]) as u8
        })
        .unwrap()
    }

    #[test]
    fn run_wraps_to_next_row_of_region() {
        let img = ramp();
        let region = ImageRegion::whole([4, 2, 1]);
        let (mut sum, mut sumsq) = ([0.0], [0.0]);
        accumulate_run_length(&img, 0, true, &region, [2, 0, 0], 4, &mut sum, &mut sumsq);
        // voxels 2, 3, 4, 5
        assert_eq!(sum, [14.0]);
        assert_eq!(sumsq, [4.0 + 9.0 + 16.0 + 25.0]);
    }

    #[test]
    fn outputs_accumulate_across_calls() {
        let img = ramp();
        let region = ImageRegion::whole([4, 2, 1]);
        let (mut sum, mut sumsq) = ([1.0], [1.0]);
        accumulate_run_length(&img, 0, true, &region, [1, 0, 0], 1, &mut sum, &mut sumsq);
        assert_eq!((sum[0], sumsq[0]), (2.0, 2.0));
    }

    #[test]
    fn oblique_slicing_poisons_every_slot() {
        let img = VectorImage::<u8>::from_fn([2, 2, 1], 3, ImageGeometry::default(), |_, _| 1)
            .unwrap();
        let region = ImageRegion::whole([2, 2, 1]);
        let (mut sum, mut sumsq) = ([0.0; 3], [0.0; 3]);
        accumulate_run_length(&img, 0, false, &region, [0, 0, 0], 2, &mut sum, &mut sumsq);
        assert!(sum.iter().chain(sumsq.iter()).all(|v| v.is_nan()));
    }
}
