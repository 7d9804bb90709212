use vector_image_wrapper::geometry::{ImageGeometry, ReferenceSpace, SpatialTransform};
use vector_image_wrapper::{ScalarRepKey, VectorImage, VectorImageWrapper};

fn main() {
    // Demo stub: builds a synthetic RGB volume and queries the wrapper
    let size = [64usize, 64, 16];
    let image = match VectorImage::<u8>::from_fn(size, 3, ImageGeometry::default(), |idx, c| {
        ((idx[c] * 255) / size[c].max(2).saturating_sub(1)) as u8
    }) {
        Ok(img) => img,
        Err(err) => {
            eprintln!("Error: {err}");
            std::process::exit(1);
        }
    };

    let mut wrapper = VectorImageWrapper::default();
    let reference = ReferenceSpace::new(size, ImageGeometry::default());
    if let Err(err) = wrapper.update_wrapped_images(image, reference, SpatialTransform::identity())
    {
        eprintln!("Error: {err}");
        std::process::exit(1);
    }
    wrapper.set_slice_index([32, 32, 8]);

    let magnitude = wrapper
        .scalar_representation_by_key(ScalarRepKey::MAGNITUDE)
        .and_then(|rep| rep.voxel_value([32, 32, 8]));
    let representations = wrapper.scalar_representation_keys().len();
    match wrapper.histogram(0) {
        Ok(hist) => println!(
            "representations={} magnitude={:?} bins={} total={}",
            representations,
            magnitude,
            hist.number_of_bins(),
            hist.total()
        ),
        Err(err) => eprintln!("Error: {err}"),
    }
}
