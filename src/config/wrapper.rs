use crate::types::{ScalarRepKey, ScalarRepKind};
use serde::Deserialize;
use std::fs;
use std::path::Path;

/// Default number of histogram bins set on every rebuild.
pub const DEFAULT_HISTOGRAM_BINS: usize = 40;

/// Knobs of a vector image wrapper.
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct WrapperConfig {
    /// Bin count applied whenever a new image is loaded.
    pub histogram_bins: usize,
    /// Representation reported as default when the display mapping does not
    /// pick one (RGB display). Higher layers may override it.
    pub fallback_scalar_representation: ScalarRepKind,
    /// Show three-component images as RGB after loading.
    pub rgb_for_three_components: bool,
}

impl Default for WrapperConfig {
    fn default() -> Self {
        Self {
            histogram_bins: DEFAULT_HISTOGRAM_BINS,
            fallback_scalar_representation: ScalarRepKind::Max,
            rgb_for_three_components: true,
        }
    }
}

impl WrapperConfig {
    pub fn fallback_key(&self) -> ScalarRepKey {
        ScalarRepKey::new(self.fallback_scalar_representation, 0)
    }
}

pub fn load_wrapper_config(path: &Path) -> Result<WrapperConfig, String> {
    let contents = fs::read_to_string(path)
        .map_err(|e| format!("Failed to read config {}: {e}", path.display()))?;
    serde_json::from_str(&contents)
        .map_err(|e| format!("Failed to parse config {}: {e}", path.display()))
}
