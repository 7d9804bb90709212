use std::env;
use std::path::Path;
use vector_image_wrapper::config::{load_tool_config, VectorStatsConfig};
use vector_image_wrapper::diagnostics::{TimingBreakdown, WrapperReport};
use vector_image_wrapper::geometry::{ReferenceSpace, SpatialTransform};
use vector_image_wrapper::image::io::{read_float_vector_image, save_slice_png, write_json_file};
use vector_image_wrapper::VectorImageWrapper;

fn main() {
    if let Err(err) = run() {
        eprintln!("Error: {err}");
        std::process::exit(1);
    }
}

fn run() -> Result<(), String> {
    let config_path = env::args().nth(1).ok_or_else(usage)?;
    let config = load_tool_config(Path::new(&config_path))?;
    let mut timing = TimingBreakdown::default();

    let image = timing
        .measure("read", || read_float_vector_image(&config.input))
        .map_err(|e| e.to_string())?;
    let reference = ReferenceSpace::new(image.size(), image.geometry().clone());

    let mut wrapper = VectorImageWrapper::<f32>::new(config.wrapper.clone());
    timing
        .measure("rebuild", || {
            wrapper.update_wrapped_images(image, reference, SpatialTransform::identity())
        })
        .map_err(|e| e.to_string())?;
    if let Some(mapping) = config.native_mapping {
        wrapper.set_native_mapping(mapping);
    }
    if let Some(cursor) = config.slice_index {
        wrapper.set_slice_index(cursor);
    }
    timing
        .measure("histogram", || wrapper.histogram(config.histogram_bins).map(|_| ()))
        .map_err(|e| e.to_string())?;

    export_outputs(&config, &wrapper, &mut timing)?;

    let report = WrapperReport::collect(&mut wrapper, timing);
    write_json_file(&config.output.report_json, &report)?;
    println!(
        "Saved report for {} representations to {}",
        report.representations.len(),
        config.output.report_json.display()
    );
    Ok(())
}

fn export_outputs(
    config: &VectorStatsConfig,
    wrapper: &VectorImageWrapper<f32>,
    timing: &mut TimingBreakdown,
) -> Result<(), String> {
    if let Some(path) = &config.output.float_export {
        timing
            .measure("export", || {
                wrapper.write_to_file_as_float(path, &config.output.export_hints)
            })
            .map_err(|e| e.to_string())?;
        println!("Saved float volume to {}", path.display());
    }

    if let Some(path) = &config.output.slice_png {
        let rep = match config.output.slice_representation {
            Some(key) => wrapper.scalar_representation_by_key(key),
            None => wrapper.default_scalar_representation(),
        }
        .ok_or("Requested scalar representation does not exist")?;
        let slice = rep.extract_slice(2).map_err(|e| e.to_string())?;
        save_slice_png(&slice, path)?;
        println!("Saved {} slice to {}", rep.key(), path.display());
    }
    Ok(())
}

fn usage() -> String {
    "Usage: vector_stats <config.json>".to_string()
}
