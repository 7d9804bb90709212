use vector_image_wrapper::geometry::{ImageGeometry, ReferenceSpace, SpatialTransform};
use vector_image_wrapper::image::ComponentValue;
use vector_image_wrapper::{VectorImage, VectorImageWrapper};

/// Volume where component `c` holds `values[c]` at every voxel.
pub fn constant_components(size: [usize; 3], values: &[f32]) -> VectorImage<f32> {
    assert!(!values.is_empty(), "need at least one component value");
    VectorImage::from_fn(size, values.len(), ImageGeometry::default(), |_, c| values[c])
        .expect("valid synthetic volume")
}

/// Volume with a distinct, position-dependent value in every sample.
pub fn ramp_u16(size: [usize; 3], components: usize) -> VectorImage<u16> {
    VectorImage::from_fn(size, components, ImageGeometry::default(), |idx, c| {
        (idx[0] + size[0] * (idx[1] + size[1] * idx[2]) + 1000 * c) as u16
    })
    .expect("valid synthetic volume")
}

/// Wrap `image` in its own reference space with an identity transform.
pub fn wrap<T: ComponentValue>(image: VectorImage<T>) -> VectorImageWrapper<T> {
    super::init_logging();
    let reference = ReferenceSpace::new(image.size(), image.geometry().clone());
    let mut wrapper = VectorImageWrapper::default();
    wrapper
        .update_wrapped_images(image, reference, SpatialTransform::identity())
        .expect("rebuild succeeds");
    wrapper
}
