mod common;

use common::synthetic_volume::{ramp_u16, wrap};
use nalgebra::{Rotation3, Vector3};
use vector_image_wrapper::geometry::{ImageGeometry, ReferenceSpace, SpatialTransform};
use vector_image_wrapper::image::io::{read_float_vector_image, IoHints};
use vector_image_wrapper::error::IoStage;
use vector_image_wrapper::{NativeMapping, VectorImage, VectorImageWrapper, WrapperError};

fn oblique_geometry() -> ImageGeometry {
    let rot = Rotation3::from_axis_angle(&Vector3::z_axis(), 0.3);
    ImageGeometry::new(
        Vector3::new(0.8, 1.25, 2.5),
        Vector3::new(-12.0, 40.5, 7.0),
        *rot.matrix(),
    )
}

fn assert_geometry_close(a: &ImageGeometry, b: &ImageGeometry) {
    assert!((a.spacing - b.spacing).amax() < 1e-5, "{a:?} vs {b:?}");
    assert!((a.origin - b.origin).amax() < 1e-4, "{a:?} vs {b:?}");
    assert!((a.direction - b.direction).amax() < 1e-5, "{a:?} vs {b:?}");
}

#[test]
fn float_export_round_trips_values_and_geometry() {
    let dir = tempfile::tempdir().unwrap();
    let mut image = ramp_u16([5, 4, 3], 3);
    image.set_geometry(oblique_geometry());
    let wrapper = wrap(image);

    for name in ["vec.nii", "vec.nii.gz"] {
        let path = dir.path().join(name);
        wrapper
            .write_to_file_as_float(&path, &IoHints::default())
            .unwrap();
        let loaded = read_float_vector_image(&path).unwrap();

        let source = wrapper.image().unwrap();
        assert_eq!(loaded.size(), source.size());
        assert_eq!(loaded.components(), 3);
        assert_eq!(loaded.time_points(), 1);
        for idx in [[0, 0, 0], [4, 3, 2], [2, 1, 1]] {
            let expected: Vec<f32> = source.pixel(idx, 0).unwrap().iter().map(|&v| v as f32).collect();
            assert_eq!(loaded.pixel(idx, 0).unwrap(), expected, "{name} at {idx:?}");
        }
        assert_geometry_close(loaded.geometry(), source.geometry());
    }
}

#[test]
fn export_applies_native_mapping() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("mapped.nii");
    let mut wrapper = wrap(ramp_u16([3, 2, 2], 2));
    wrapper.set_native_mapping(NativeMapping::new(0.25, -100.0));
    wrapper
        .write_to_file_as_float(&path, &IoHints::default())
        .unwrap();

    let loaded = read_float_vector_image(&path).unwrap();
    // raw [2, 1, 1] is 2 + 3 * 3 = 11 and 1011
    assert_eq!(loaded.pixel([2, 1, 1], 0).unwrap(), vec![-97.25, 152.75]);
}

#[test]
fn four_dimensional_volumes_keep_their_time_points() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("series.nii.gz");
    let data: Vec<i16> = (0..2 * 2 * 1 * 3 * 2).map(|v| v as i16 - 5).collect();
    let image = VectorImage::new([2, 2, 1], 3, 2, ImageGeometry::default(), data).unwrap();
    let wrapper = wrap(image);
    wrapper
        .write_to_file_as_float(&path, &IoHints::default())
        .unwrap();

    let loaded = read_float_vector_image(&path).unwrap();
    assert_eq!(loaded.time_points(), 3);
    assert_eq!(loaded.components(), 2);
    // voxel 0 of time point 2 is voxel number 8 -> samples 16 and 17
    assert_eq!(loaded.pixel([0, 0, 0], 2).unwrap(), vec![11.0, 12.0]);
}

#[test]
fn progress_is_monotone_and_completes() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("progress.nii");
    let wrapper = wrap(ramp_u16([4, 4, 4], 4));
    let mut seen = Vec::new();
    wrapper
        .write_to_file_as_float_with_progress(&path, &IoHints::default(), &mut |p| seen.push(p))
        .unwrap();

    assert_eq!(seen.first(), Some(&0.0));
    assert_eq!(seen.last(), Some(&1.0));
    assert!(seen.windows(2).all(|w| w[0] <= w[1]), "{seen:?}");
}

#[test]
fn unknown_extension_is_rejected_without_writing() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("volume.txt");
    let wrapper = wrap(ramp_u16([2, 2, 2], 2));
    let err = wrapper
        .write_to_file_as_float(&path, &IoHints::default())
        .unwrap_err();
    assert!(matches!(err, WrapperError::UnsupportedFormat { .. }), "{err}");
    assert!(!path.exists());
}

#[test]
fn exporting_an_empty_wrapper_fails() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("empty.nii");
    let wrapper = VectorImageWrapper::<u8>::default();
    let err = wrapper
        .write_to_file_as_float(&path, &IoHints::default())
        .unwrap_err();
    assert!(matches!(err, WrapperError::NotInitialized));
}

#[test]
fn reloaded_volume_can_be_wrapped_again() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("again.nii");
    wrap(ramp_u16([3, 3, 2], 2))
        .write_to_file_as_float(&path, &IoHints::default())
        .unwrap();

    let loaded = read_float_vector_image(&path).unwrap();
    let reference = ReferenceSpace::new(loaded.size(), loaded.geometry().clone());
    let mut wrapper = VectorImageWrapper::default();
    wrapper
        .update_wrapped_images(loaded, reference, SpatialTransform::identity())
        .unwrap();
    assert_eq!(wrapper.scalar_representation_keys().len(), 2 + 3);
    assert_eq!(wrapper.image_max(), Some(1000.0 + 17.0));
}

#[test]
fn truncated_file_fails_to_decode() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("cut.nii");
    wrap(ramp_u16([4, 4, 2], 2))
        .write_to_file_as_float(&path, &IoHints::default())
        .unwrap();
    let bytes = std::fs::read(&path).unwrap();
    std::fs::write(&path, &bytes[..bytes.len() / 2]).unwrap();

    let err = read_float_vector_image(&path).unwrap_err();
    assert!(
        matches!(err, WrapperError::Io { stage: IoStage::Decode, .. }),
        "{err}"
    );
}
