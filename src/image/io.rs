//! I/O adapter for vector volumes, slices and JSON reports.
//!
//! - `create_image_io`: pick a codec handle for a path and a set of hints.
//! - `read_float_vector_image`: load a float vector volume from disk.
//! - `save_slice_png`: write an `ImageF32` slice to an 8-bit PNG, windowed
//!   to its own value range.
//! - `write_json_file`: pretty-print a serializable value to disk.
use super::nifti;
use super::{ImageF32, ImageView, VectorImage};
use crate::error::{IoStage, WrapperError};
use image::{GrayImage, Luma};
use log::warn;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Codec families the adapter knows how to produce.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageFormat {
    Nifti,
}

/// Metadata registry handed to the I/O adapter alongside a file name.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct IoHints {
    /// Force a format instead of guessing it from the extension.
    pub format: Option<ImageFormat>,
    /// Override the `.gz` extension rule.
    pub compress: Option<bool>,
    /// Free-text description stored in the file header.
    pub description: Option<String>,
}

/// Writer/reader handle produced by the adapter for one file.
pub trait ImageIo {
    fn path(&self) -> &Path;

    fn format(&self) -> ImageFormat;

    fn write_float_vector(
        &self,
        image: &VectorImage<f32>,
        progress: &mut dyn FnMut(f64),
    ) -> Result<(), WrapperError>;

    fn read_float_vector(&self) -> Result<VectorImage<f32>, WrapperError>;
}

struct NiftiIo {
    path: PathBuf,
    compress: bool,
    description: String,
}

impl ImageIo for NiftiIo {
    fn path(&self) -> &Path {
        &self.path
    }

    fn format(&self) -> ImageFormat {
        ImageFormat::Nifti
    }

    fn write_float_vector(
        &self,
        image: &VectorImage<f32>,
        progress: &mut dyn FnMut(f64),
    ) -> Result<(), WrapperError> {
        ensure_parent_dir(&self.path)
            .map_err(|e| WrapperError::io(&self.path, IoStage::Write, e))?;
        nifti::write_float_vector(&self.path, image, self.compress, &self.description, progress)
    }

    fn read_float_vector(&self) -> Result<VectorImage<f32>, WrapperError> {
        nifti::read_float_vector(&self.path)
    }
}

fn file_name_lower(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().to_ascii_lowercase())
        .unwrap_or_default()
}

fn guess_format(path: &Path) -> Option<ImageFormat> {
    let name = file_name_lower(path);
    (name.ends_with(".nii") || name.ends_with(".nii.gz")).then_some(ImageFormat::Nifti)
}

/// Create a codec handle for `path`. Hints win over the extension.
pub fn create_image_io(path: &Path, hints: &IoHints) -> Result<Box<dyn ImageIo>, WrapperError> {
    let format = hints
        .format
        .or_else(|| guess_format(path))
        .ok_or_else(|| WrapperError::UnsupportedFormat {
            path: path.to_path_buf(),
        })?;
    let gz_extension = file_name_lower(path).ends_with(".gz");
    let compress = hints.compress.unwrap_or(gz_extension);
    if compress != gz_extension {
        warn!(
            "compression hint ({compress}) disagrees with the extension of {}",
            path.display()
        );
    }
    match format {
        ImageFormat::Nifti => Ok(Box::new(NiftiIo {
            path: path.to_path_buf(),
            compress,
            description: hints.description.clone().unwrap_or_default(),
        })),
    }
}

/// Load a float vector volume, choosing the codec from the extension.
pub fn read_float_vector_image(path: &Path) -> Result<VectorImage<f32>, WrapperError> {
    create_image_io(path, &IoHints::default())?.read_float_vector()
}

/// Save a slice to an 8-bit grayscale PNG, stretching its finite range to
/// [0, 255].
pub fn save_slice_png(slice: &ImageF32, path: &Path) -> Result<(), String> {
    ensure_parent_dir(path)?;
    let (lo, hi) = slice.min_max().unwrap_or((0.0, 1.0));
    let span = if hi > lo { hi - lo } else { 1.0 };
    let mut out = GrayImage::new(slice.w as u32, slice.h as u32);
    for (y, row) in slice.rows().enumerate() {
        for (x, &px) in row.iter().enumerate() {
            let v = if px.is_finite() {
                ((px - lo) / span * 255.0).clamp(0.0, 255.0)
            } else {
                0.0
            };
            out.put_pixel(x as u32, y as u32, Luma([v as u8]));
        }
    }
    out.save(path)
        .map_err(|e| format!("Failed to save {}: {e}", path.display()))
}

/// Serialize a value as pretty JSON to `path`, creating parent directories.
pub fn write_json_file<T: Serialize>(path: &Path, value: &T) -> Result<(), String> {
    ensure_parent_dir(path)?;
    let json = serde_json::to_string_pretty(value)
        .map_err(|e| format!("Failed to serialize JSON for {}: {e}", path.display()))?;
    fs::write(path, json).map_err(|e| format!("Failed to write JSON {}: {e}", path.display()))
}

fn ensure_parent_dir(path: &Path) -> Result<(), String> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)
                .map_err(|e| format!("Failed to create {}: {e}", parent.display()))?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_follows_extension() {
        let io = create_image_io(Path::new("out/vol.nii.gz"), &IoHints::default()).unwrap();
        assert_eq!(io.format(), ImageFormat::Nifti);
        assert!(matches!(
            create_image_io(Path::new("vol.mha"), &IoHints::default()),
            Err(WrapperError::UnsupportedFormat { .. })
        ));
    }

    #[test]
    fn hints_override_extension() {
        let hints = IoHints {
            format: Some(ImageFormat::Nifti),
            ..Default::default()
        };
        assert!(create_image_io(Path::new("vol.raw"), &hints).is_ok());
    }
}
