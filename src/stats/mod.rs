//! Statistics over the raw samples of a vector image.
//!
//! `FlattenedView` reinterprets the interleaved storage as one long run of
//! scalars. `RangeHistogramEngine` computes min/max and a binned histogram on
//! top of it, lazily. `run_length` accumulates per-component sums along a
//! contiguous run of voxels.

pub mod flat;
pub mod histogram;
pub mod run_length;

pub use flat::FlattenedView;
pub use histogram::{RangeHistogramEngine, ScalarHistogram};
pub use run_length::accumulate_run_length;
