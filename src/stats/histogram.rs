use super::flat::FlattenedView;
use crate::error::WrapperError;
use crate::image::ComponentValue;
use crate::types::NativeMapping;
use log::debug;
use rayon::prelude::*;
use serde::Serialize;
use std::time::Instant;

const CHUNK: usize = 1 << 16;

/// Binned intensity histogram. Range and bin edges are in native units.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScalarHistogram {
    pub min: f64,
    pub max: f64,
    pub bin_width: f64,
    pub counts: Vec<u64>,
}

impl ScalarHistogram {
    pub fn number_of_bins(&self) -> usize {
        self.counts.len()
    }

    pub fn total(&self) -> u64 {
        self.counts.iter().sum()
    }

    pub fn max_frequency(&self) -> u64 {
        self.counts.iter().copied().max().unwrap_or(0)
    }

    /// Bin a native value falls into, clamped to the histogram range.
    pub fn bin_of(&self, value: f64) -> usize {
        let n = self.counts.len();
        if n == 0 || self.bin_width.is_nan() || self.bin_width <= 0.0 {
            return 0;
        }
        let b = ((value - self.min) / self.bin_width).floor();
        (b.max(0.0) as usize).min(n - 1)
    }
}

fn raw_min_max<T: ComponentValue>(samples: &[T]) -> Option<(f64, f64)> {
    samples
        .par_chunks(CHUNK)
        .filter_map(|chunk| {
            chunk
                .iter()
                .map(|v| v.to_f64())
                .filter(|v| !v.is_nan())
                .fold(None, |acc: Option<(f64, f64)>, v| match acc {
                    None => Some((v, v)),
                    Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
                })
        })
        .reduce_with(|a, b| (a.0.min(b.0), a.1.max(b.1)))
}

fn raw_counts<T: ComponentValue>(samples: &[T], range: (f64, f64), bins: usize) -> Vec<u64> {
    let (lo, hi) = range;
    let span = hi - lo;
    samples
        .par_chunks(CHUNK)
        .map(|chunk| {
            let mut local = vec![0u64; bins];
            for v in chunk.iter().map(|v| v.to_f64()).filter(|v| !v.is_nan()) {
                let b = if span > 0.0 {
                    (((v - lo) / span) * bins as f64) as usize
                } else {
                    0
                };
                local[b.min(bins - 1)] += 1;
            }
            local
        })
        .reduce(
            || vec![0u64; bins],
            |mut acc, part| {
                for (a, p) in acc.iter_mut().zip(part) {
                    *a += p;
                }
                acc
            },
        )
}

/// Lazy min/max + histogram computer over a flattened view.
///
/// The raw range is cached until the input changes or is invalidated. Bins
/// are recomputed only by [`RangeHistogramEngine::update`].
#[derive(Debug)]
pub struct RangeHistogramEngine<T> {
    input: Option<FlattenedView<T>>,
    bins: usize,
    transform: NativeMapping,
    range: Option<(f64, f64)>,
    histogram: Option<ScalarHistogram>,
}

impl<T: ComponentValue> RangeHistogramEngine<T> {
    pub fn new(bins: usize) -> Self {
        Self {
            input: None,
            bins: bins.max(1),
            transform: NativeMapping::IDENTITY,
            range: None,
            histogram: None,
        }
    }

    pub fn set_input(&mut self, view: FlattenedView<T>) {
        self.input = Some(view);
        self.invalidate();
    }

    pub fn input(&self) -> Option<&FlattenedView<T>> {
        self.input.as_ref()
    }

    pub fn number_of_bins(&self) -> usize {
        self.bins
    }

    /// Zero is ignored.
    pub fn set_number_of_bins(&mut self, bins: usize) {
        if bins > 0 && bins != self.bins {
            self.bins = bins;
            self.histogram = None;
        }
    }

    pub fn set_intensity_transform(&mut self, mapping: NativeMapping) {
        if mapping != self.transform {
            self.transform = mapping;
            self.histogram = None;
        }
    }

    /// Forget the cached range and bins; the samples changed.
    pub fn invalidate(&mut self) {
        self.range = None;
        self.histogram = None;
    }

    /// Raw (unmapped) min and max of the samples, computed on first use.
    pub fn min_max(&mut self) -> Option<(f64, f64)> {
        if self.range.is_none() {
            let view = self.input.as_ref()?;
            let start = Instant::now();
            self.range = view.with_samples(raw_min_max);
            debug!(
                "RangeHistogramEngine min/max over {} samples in {:.3} ms -> {:?}",
                view.len(),
                start.elapsed().as_secs_f64() * 1000.0,
                self.range
            );
        }
        self.range
    }

    /// Last computed histogram, without recomputing.
    pub fn histogram(&self) -> Option<&ScalarHistogram> {
        self.histogram.as_ref()
    }

    /// Recompute the bins over the current range and return them.
    pub fn update(&mut self) -> Result<&ScalarHistogram, WrapperError> {
        let (lo, hi) = self.min_max().unwrap_or((0.0, 0.0));
        let view = self.input.as_ref().ok_or(WrapperError::NotInitialized)?;
        let bins = self.bins;
        let start = Instant::now();
        let mut counts = view.with_samples(|s| raw_counts(s, (lo, hi), bins));

        let (mut nlo, mut nhi) = (self.transform.map(lo), self.transform.map(hi));
        if nlo > nhi {
            std::mem::swap(&mut nlo, &mut nhi);
            counts.reverse();
        }
        debug!(
            "RangeHistogramEngine binned {} samples into {bins} bins in {:.3} ms",
            view.len(),
            start.elapsed().as_secs_f64() * 1000.0
        );
        Ok(self.histogram.insert(ScalarHistogram {
            min: nlo,
            max: nhi,
            bin_width: (nhi - nlo) / bins as f64,
            counts,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::image::SharedBuffer;

    fn engine_over(data: Vec<u8>, bins: usize) -> (RangeHistogramEngine<u8>, SharedBuffer<u8>) {
        let buffer = SharedBuffer::new(data);
        let mut engine = RangeHistogramEngine::new(bins);
        engine.set_input(FlattenedView::new(&buffer));
        (engine, buffer)
    }

    #[test]
    fn bins_cover_range() {
        let (mut engine, _buf) = engine_over(vec![0, 10, 20, 30, 40, 40], 4);
        let hist = engine.update().unwrap();
        assert_eq!(hist.min, 0.0);
        assert_eq!(hist.max, 40.0);
        assert_eq!(hist.counts, vec![1, 1, 1, 3]);
        assert_eq!(hist.total(), 6);
    }

    #[test]
    fn constant_data_lands_in_first_bin() {
        let (mut engine, _buf) = engine_over(vec![5; 10], 3);
        let hist = engine.update().unwrap();
        assert_eq!(hist.counts, vec![10, 0, 0]);
    }

    #[test]
    fn negative_scale_reverses_bins() {
        let (mut engine, _buf) = engine_over(vec![0, 0, 0, 10], 2);
        engine.set_intensity_transform(NativeMapping::new(-1.0, 0.0));
        let hist = engine.update().unwrap();
        assert_eq!((hist.min, hist.max), (-10.0, 0.0));
        assert_eq!(hist.counts, vec![1, 3]);
    }

    #[test]
    fn range_is_cached_until_invalidated() {
        let (mut engine, buffer) = engine_over(vec![1, 2, 3], 2);
        assert_eq!(engine.min_max(), Some((1.0, 3.0)));
        buffer.borrow_mut()[0] = 0;
        assert_eq!(engine.min_max(), Some((1.0, 3.0)));
        engine.invalidate();
        assert_eq!(engine.min_max(), Some((0.0, 3.0)));
    }

    #[test]
    fn zero_bins_keep_previous_setting() {
        let (mut engine, _buf) = engine_over(vec![1, 2], 7);
        engine.set_number_of_bins(0);
        assert_eq!(engine.number_of_bins(), 7);
    }

    #[test]
    fn bin_lookup_clamps() {
        let hist = ScalarHistogram {
            min: 0.0,
            max: 10.0,
            bin_width: 2.5,
            counts: vec![0; 4],
        };
        assert_eq!(hist.bin_of(-1.0), 0);
        assert_eq!(hist.bin_of(5.0), 2);
        assert_eq!(hist.bin_of(99.0), 3);
    }
}
