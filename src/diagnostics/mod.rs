//! Serializable summaries of a wrapper, written by the tools as JSON.

pub mod report;
pub mod timing;

pub use report::{RepresentationReport, WrapperReport};
pub use timing::{StageTiming, TimingBreakdown};
