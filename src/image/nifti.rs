//! NIfTI-1 codec for float vector volumes.
//!
//! The writer emits single-file `n+1` images with datatype FLOAT32 and vector
//! intent from a hand-built header. Reading goes through the `nifti` crate.
//! Components are stored as separate planes (x fastest, then y, z, t and the
//! component), while `VectorImage` keeps them interleaved, so both directions
//! transpose. Orientation goes through the sform, converting between the LPS
//! convention of `ImageGeometry` and the RAS convention of the file.
use crate::error::{IoStage, WrapperError};
use crate::geometry::ImageGeometry;
use crate::image::vector::VectorImage;
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use nalgebra::{Matrix3, Vector3};
use nifti::volume::ndarray::IntoNdArray;
use nifti::{InMemNiftiObject, NiftiHeader, NiftiObject};
use std::fs::{self, File};
use std::io::{BufWriter, Cursor, Write};
use std::path::Path;

const HEADER_SIZE: usize = 348;
const VOX_OFFSET: usize = 352;
const DT_FLOAT32: i16 = 16;
const INTENT_VECTOR: i16 = 1007;
const NIFTI_UNITS_MM_SEC: u8 = 2 | 8;
const MAGIC_SINGLE_FILE: &[u8; 4] = b"n+1\0";

/// Flip between LPS and RAS (x and y negate).
fn lps_ras_flip() -> Matrix3<f64> {
    Matrix3::from_diagonal(&Vector3::new(-1.0, -1.0, 1.0))
}

fn put_i16(buf: &mut [u8], offset: usize, v: i16) {
    buf[offset..offset + 2].copy_from_slice(&v.to_le_bytes());
}

fn put_f32(buf: &mut [u8], offset: usize, v: f32) {
    buf[offset..offset + 4].copy_from_slice(&v.to_le_bytes());
}

fn encode_header(image: &VectorImage<f32>, description: &str) -> Result<[u8; HEADER_SIZE], String> {
    let layout = image.layout();
    let dims = [
        layout.size[0],
        layout.size[1],
        layout.size[2],
        layout.time_points,
        layout.components,
    ];
    let mut dim = [1i16; 8];
    dim[0] = 5;
    for (slot, &n) in dim[1..6].iter_mut().zip(dims.iter()) {
        *slot = i16::try_from(n).map_err(|_| format!("dimension {n} exceeds NIfTI-1 limit"))?;
    }

    let mut header = [0u8; HEADER_SIZE];
    header[0..4].copy_from_slice(&(HEADER_SIZE as i32).to_le_bytes());
    for (i, &d) in dim.iter().enumerate() {
        put_i16(&mut header, 40 + i * 2, d);
    }
    put_i16(&mut header, 68, INTENT_VECTOR);
    put_i16(&mut header, 70, DT_FLOAT32);
    put_i16(&mut header, 72, 32);

    let geom = image.geometry();
    let pixdim: [f32; 8] = [
        1.0,
        geom.spacing.x as f32,
        geom.spacing.y as f32,
        geom.spacing.z as f32,
        1.0,
        1.0,
        1.0,
        1.0,
    ];
    for (i, &p) in pixdim.iter().enumerate() {
        put_f32(&mut header, 76 + i * 4, p);
    }
    put_f32(&mut header, 108, VOX_OFFSET as f32);
    put_f32(&mut header, 112, 1.0);
    put_f32(&mut header, 116, 0.0);
    header[123] = NIFTI_UNITS_MM_SEC;

    let descrip = description.as_bytes();
    let n = descrip.len().min(79);
    header[148..148 + n].copy_from_slice(&descrip[..n]);

    // sform_code = 1 (scanner anatomical)
    put_i16(&mut header, 254, 1);
    let flip = lps_ras_flip();
    let linear = flip * geom.direction * Matrix3::from_diagonal(&geom.spacing);
    let origin = flip * geom.origin;
    for row in 0..3 {
        let base = 280 + row * 16;
        for col in 0..3 {
            put_f32(&mut header, base + col * 4, linear[(row, col)] as f32);
        }
        put_f32(&mut header, base + 12, origin[row] as f32);
    }

    header[344..348].copy_from_slice(MAGIC_SINGLE_FILE);
    Ok(header)
}

/// Write `image` to `path`, gzip-compressed when `compress` is set.
pub fn write_float_vector(
    path: &Path,
    image: &VectorImage<f32>,
    compress: bool,
    description: &str,
    progress: &mut dyn FnMut(f64),
) -> Result<(), WrapperError> {
    let header =
        encode_header(image, description).map_err(|e| WrapperError::io(path, IoStage::Write, e))?;
    let file = File::create(path)
        .map_err(|e| WrapperError::io(path, IoStage::Write, e.to_string()))?;
    let sink = BufWriter::new(file);
    let io_err = |e: std::io::Error| WrapperError::io(path, IoStage::Write, e.to_string());

    if compress {
        let mut encoder = GzEncoder::new(sink, Compression::default());
        write_payload(&mut encoder, &header, image, progress).map_err(io_err)?;
        let mut inner = encoder.finish().map_err(io_err)?;
        inner.flush().map_err(io_err)?;
    } else {
        let mut sink = sink;
        write_payload(&mut sink, &header, image, progress).map_err(io_err)?;
        sink.flush().map_err(io_err)?;
    }
    progress(1.0);
    Ok(())
}

fn write_payload<W: Write>(
    out: &mut W,
    header: &[u8; HEADER_SIZE],
    image: &VectorImage<f32>,
    progress: &mut dyn FnMut(f64),
) -> std::io::Result<()> {
    out.write_all(header)?;
    out.write_all(&[0u8; VOX_OFFSET - HEADER_SIZE])?;

    let layout = image.layout();
    let nc = layout.components;
    let samples = image.buffer().borrow();
    let mut plane = Vec::with_capacity(layout.voxel_count() * 4);
    for c in 0..nc {
        plane.clear();
        for voxel in samples.chunks_exact(nc) {
            plane.extend_from_slice(&voxel[c].to_le_bytes());
        }
        out.write_all(&plane)?;
        progress((c + 1) as f64 / nc as f64);
    }
    Ok(())
}

/// Read a single-file NIfTI-1 vector volume. Gzip input is detected from
/// the magic bytes. Any stored datatype is accepted and converted to `f32`
/// with the header's scaling applied.
pub fn read_float_vector(path: &Path) -> Result<VectorImage<f32>, WrapperError> {
    let raw = fs::read(path).map_err(|e| WrapperError::io(path, IoStage::Read, e.to_string()))?;
    let object = if is_gzip(&raw) {
        InMemNiftiObject::from_reader(GzDecoder::new(Cursor::new(raw.as_slice())))
    } else {
        InMemNiftiObject::from_reader(Cursor::new(raw.as_slice()))
    }
    .map_err(|e| WrapperError::io(path, IoStage::Decode, e.to_string()))?;
    from_nifti_object(object).map_err(|e| WrapperError::io(path, IoStage::Decode, e))
}

fn is_gzip(bytes: &[u8]) -> bool {
    bytes.len() >= 2 && bytes[0] == 0x1f && bytes[1] == 0x8b
}

/// Interleave the NIfTI volume (x, y, z, t, component) into a vector image.
fn from_nifti_object(object: InMemNiftiObject) -> Result<VectorImage<f32>, String> {
    let geometry = header_geometry(object.header());
    let array = object
        .into_volume()
        .into_ndarray::<f32>()
        .map_err(|e| format!("failed to convert voxel data: {e}"))?;

    let shape = array.shape().to_vec();
    if shape.len() > 5 && shape[5..].iter().any(|&n| n > 1) {
        return Err(format!(
            "unsupported NIfTI shape {shape:?}, only x, y, z, time and vector axes are read"
        ));
    }
    let mut dims = [1usize; 5];
    for (slot, &n) in dims.iter_mut().zip(&shape) {
        *slot = n;
    }
    let size = [dims[0], dims[1], dims[2]];
    let (time_points, components) = (dims[3], dims[4]);

    let nd = shape.len();
    let mut data = vec![0f32; array.len()];
    for (idx, &v) in array.indexed_iter() {
        let at = |d: usize| if d < nd { idx[d] } else { 0 };
        let voxel = ((at(3) * size[2] + at(2)) * size[1] + at(1)) * size[0] + at(0);
        data[voxel * components + at(4)] = v;
    }
    VectorImage::new(size, time_points, components, geometry, data).map_err(|e| e.to_string())
}

/// Geometry from the sform when present, otherwise from `pixdim` alone.
fn header_geometry(header: &NiftiHeader) -> ImageGeometry {
    let pixdim = Vector3::new(
        header.pixdim[1] as f64,
        header.pixdim[2] as f64,
        header.pixdim[3] as f64,
    );
    if header.sform_code <= 0 {
        let spacing = pixdim.map(|s| if s > 0.0 { s } else { 1.0 });
        return ImageGeometry::new(spacing, Vector3::zeros(), Matrix3::identity());
    }

    let rows = [header.srow_x, header.srow_y, header.srow_z];
    let mut linear = Matrix3::zeros();
    let mut origin = Vector3::zeros();
    for (r, srow) in rows.iter().enumerate() {
        for c in 0..3 {
            linear[(r, c)] = srow[c] as f64;
        }
        origin[r] = srow[3] as f64;
    }
    let flip = lps_ras_flip();
    let linear = flip * linear;
    let origin = flip * origin;

    let mut spacing = Vector3::zeros();
    let mut direction = Matrix3::identity();
    for col in 0..3 {
        let axis = linear.column(col);
        let norm = axis.norm();
        if norm > 0.0 {
            spacing[col] = norm;
            direction.set_column(col, &(axis / norm));
        } else {
            spacing[col] = 1.0;
        }
    }
    ImageGeometry::new(spacing, origin, direction)
}
