use crate::types::ScalarRepKey;
use std::fmt;
use std::path::PathBuf;

/// Stage of an I/O operation, reported alongside the failing path.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum IoStage {
    Cast,
    Write,
    Read,
    Decode,
}

impl fmt::Display for IoStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            IoStage::Cast => "cast to float",
            IoStage::Write => "write",
            IoStage::Read => "read",
            IoStage::Decode => "decode",
        };
        f.write_str(name)
    }
}

#[derive(Debug)]
pub enum WrapperError {
    /// A vector image must carry at least one component per voxel.
    EmptyComponents,
    BufferSizeMismatch {
        expected: usize,
        found: usize,
    },
    InvalidDimensions([usize; 4]),
    /// Voxel index (or time point) outside the image extent.
    IndexOutOfRange {
        index: [usize; 3],
        time_point: usize,
        size: [usize; 3],
    },
    /// Axis number other than 0, 1 or 2.
    InvalidAxis(usize),
    InvalidReferenceSpace(String),
    /// The wrapper has not been given an image yet.
    NotInitialized,
    UnknownRepresentation(ScalarRepKey),
    Io {
        path: PathBuf,
        stage: IoStage,
        message: String,
    },
    UnsupportedFormat {
        path: PathBuf,
    },
}

impl WrapperError {
    pub(crate) fn io(path: impl Into<PathBuf>, stage: IoStage, message: impl Into<String>) -> Self {
        WrapperError::Io {
            path: path.into(),
            stage,
            message: message.into(),
        }
    }
}

impl fmt::Display for WrapperError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WrapperError::EmptyComponents => {
                write!(f, "vector image must have at least one component")
            }
            WrapperError::BufferSizeMismatch { expected, found } => write!(
                f,
                "voxel buffer holds {found} samples, expected {expected}"
            ),
            WrapperError::InvalidDimensions(dims) => {
                write!(f, "invalid image dimensions {dims:?}")
            }
            WrapperError::IndexOutOfRange {
                index,
                time_point,
                size,
            } => write!(
                f,
                "voxel {index:?} at time point {time_point} lies outside image of size {size:?}"
            ),
            WrapperError::InvalidAxis(axis) => write!(f, "axis {axis} is not one of 0, 1, 2"),
            WrapperError::InvalidReferenceSpace(reason) => {
                write!(f, "invalid reference space: {reason}")
            }
            WrapperError::NotInitialized => write!(f, "wrapper holds no image"),
            WrapperError::UnknownRepresentation(key) => {
                write!(f, "no scalar representation registered under {key}")
            }
            WrapperError::Io {
                path,
                stage,
                message,
            } => write!(f, "{} failed for {}: {message}", stage, path.display()),
            WrapperError::UnsupportedFormat { path } => {
                write!(f, "no image codec available for {}", path.display())
            }
        }
    }
}

impl std::error::Error for WrapperError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn io_error_mentions_path_and_stage() {
        let err = WrapperError::io("/tmp/out.nii", IoStage::Write, "disk full");
        let msg = err.to_string();
        assert!(msg.contains("/tmp/out.nii"), "{msg}");
        assert!(msg.contains("write"), "{msg}");
        assert!(msg.contains("disk full"), "{msg}");
    }
}
