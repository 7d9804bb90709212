use super::VectorImageWrapper;
use crate::error::{IoStage, WrapperError};
use crate::image::io::{create_image_io, IoHints};
use crate::image::{ComponentValue, VectorImage};
use crate::types::NativeMapping;
use log::debug;
use rayon::prelude::*;
use std::path::Path;
use std::time::Instant;

/// Transient pipeline casting a vector image to native-mapped `f32`.
///
/// Lives for one export call. Its output buffer is released on drop, whether
/// the export succeeded or not.
pub struct CastToFloatPipeline<'a, T> {
    name: &'static str,
    source: &'a VectorImage<T>,
    mapping: NativeMapping,
    output: Option<VectorImage<f32>>,
}

impl<'a, T: ComponentValue> CastToFloatPipeline<'a, T> {
    pub fn new(name: &'static str, source: &'a VectorImage<T>, mapping: NativeMapping) -> Self {
        Self {
            name,
            source,
            mapping,
            output: None,
        }
    }

    /// Run the cast once; later calls return the same output.
    pub fn execute(&mut self) -> Result<&VectorImage<f32>, String> {
        if self.output.is_none() {
            let start = Instant::now();
            let mapping = self.mapping;
            let mut data = Vec::new();
            self.source
                .buffer()
                .borrow()
                .par_iter()
                .map(|v| mapping.map(v.to_f64()) as f32)
                .collect_into_vec(&mut data);
            let layout = self.source.layout();
            let image = VectorImage::new(
                layout.size,
                layout.time_points,
                layout.components,
                self.source.geometry().clone(),
                data,
            )
            .map_err(|e| e.to_string())?;
            debug!(
                "{}: cast {} samples to f32 in {:.3} ms",
                self.name,
                layout.sample_count(),
                start.elapsed().as_secs_f64() * 1000.0
            );
            self.output = Some(image);
        }
        self.output
            .as_ref()
            .ok_or_else(|| format!("{}: pipeline produced no output", self.name))
    }
}

impl<T> Drop for CastToFloatPipeline<'_, T> {
    fn drop(&mut self) {
        if self.output.take().is_some() {
            debug!("{}: released cast pipeline", self.name);
        }
    }
}

impl<T: ComponentValue> VectorImageWrapper<T> {
    /// Write the whole vector image, native-mapped and cast to `f32`.
    pub fn write_to_file_as_float(&self, path: &Path, hints: &IoHints) -> Result<(), WrapperError> {
        self.write_to_file_as_float_with_progress(path, hints, &mut |_| {})
    }

    /// Like [`Self::write_to_file_as_float`], reporting write progress in
    /// `[0, 1]` on the calling thread.
    pub fn write_to_file_as_float_with_progress(
        &self,
        path: &Path,
        hints: &IoHints,
        progress: &mut dyn FnMut(f64),
    ) -> Result<(), WrapperError> {
        let image = self.image_or_err()?;
        let io = create_image_io(path, hints)?;
        progress(0.0);

        let mut pipeline =
            CastToFloatPipeline::new("write_to_file_as_float", image, self.state.native_mapping);
        let float_image = pipeline
            .execute()
            .map_err(|e| WrapperError::io(path, IoStage::Cast, e))?;
        io.write_float_vector(float_image, progress)?;
        debug!("wrote float vector image to {}", path.display());
        Ok(())
    }
}
