use super::wrapper::WrapperConfig;
use crate::image::io::IoHints;
use crate::types::{NativeMapping, ScalarRepKey};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

/// Configuration of the `vector_stats` tool.
#[derive(Debug, Deserialize)]
pub struct VectorStatsConfig {
    #[serde(rename = "input")]
    pub input: PathBuf,
    #[serde(default)]
    pub wrapper: WrapperConfig,
    #[serde(default)]
    pub native_mapping: Option<NativeMapping>,
    /// Bins requested for the report; `0` keeps the wrapper default.
    #[serde(default)]
    pub histogram_bins: usize,
    #[serde(default)]
    pub slice_index: Option<[usize; 3]>,
    pub output: VectorStatsOutputConfig,
}

#[derive(Debug, Deserialize)]
pub struct VectorStatsOutputConfig {
    #[serde(rename = "report_json")]
    pub report_json: PathBuf,
    /// Re-export the volume as float through the wrapper's export path.
    #[serde(default)]
    pub float_export: Option<PathBuf>,
    #[serde(default)]
    pub export_hints: IoHints,
    /// PNG of the axial slice through the cursor of one representation.
    #[serde(default)]
    pub slice_png: Option<PathBuf>,
    #[serde(default)]
    pub slice_representation: Option<ScalarRepKey>,
}

pub fn load_tool_config(path: &Path) -> Result<VectorStatsConfig, String> {
    let data = fs::read_to_string(path)
        .map_err(|e| format!("Failed to read config {}: {e}", path.display()))?;
    serde_json::from_str(&data)
        .map_err(|e| format!("Failed to parse config {}: {e}", path.display()))
}
