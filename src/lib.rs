#![doc = include_str!("../README.md")]

// Public modules (stable-ish surface)
pub mod config;
pub mod diagnostics;
pub mod error;
pub mod image;
pub mod types;
pub mod wrapper;

// Building blocks – public, but mostly of interest to the wrapper itself.
pub mod display;
pub mod events;
pub mod geometry;
pub mod reduction;
pub mod stats;

// --- High-level re-exports -------------------------------------------------

pub use crate::config::WrapperConfig;
pub use crate::error::WrapperError;
pub use crate::image::VectorImage;
pub use crate::types::{NativeMapping, ScalarRepKey, ScalarRepKind};
pub use crate::wrapper::{ScalarRepresentation, VectorImageWrapper};

// --- Prelude ---------------------------------------------------------------

/// Small prelude for quick experiments.
///
/// ```no_run
/// use vector_image_wrapper::prelude::*;
///
/// # fn main() -> Result<(), WrapperError> {
/// let size = [16usize, 16, 8];
/// let image = VectorImage::<u8>::from_fn(size, 3, ImageGeometry::default(), |idx, c| {
///     (idx[0] * (c + 1)) as u8
/// })?;
/// let reference = ReferenceSpace::new(size, ImageGeometry::default());
///
/// let mut wrapper = VectorImageWrapper::default();
/// wrapper.update_wrapped_images(image, reference, SpatialTransform::identity())?;
/// wrapper.set_slice_index([4, 4, 2]);
///
/// let hist = wrapper.histogram(32)?;
/// println!("bins={} total={}", hist.number_of_bins(), hist.total());
/// # Ok(())
/// # }
/// ```
pub mod prelude {
    pub use crate::geometry::{ImageGeometry, ReferenceSpace, SpatialTransform};
    pub use crate::{
        NativeMapping, ScalarRepKey, ScalarRepKind, VectorImage, VectorImageWrapper, WrapperError,
    };
}
