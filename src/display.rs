//! Passive display configuration consumed by representations.
//!
//! The presentation layer owns these objects; the wrapper only evaluates
//! them to report how a voxel would appear.
use crate::types::ScalarRepKey;
use serde::{Deserialize, Serialize};
use std::rc::Rc;

/// RGBA appearance of one voxel.
pub type DisplayPixel = [u8; 4];

/// Monotone piecewise-linear curve on the unit square.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct IntensityCurve {
    points: Vec<(f64, f64)>,
}

impl IntensityCurve {
    /// Build from control points. Points are sorted by `x`; fewer than two
    /// points fall back to the identity curve.
    pub fn new(mut points: Vec<(f64, f64)>) -> Self {
        points.retain(|(x, y)| x.is_finite() && y.is_finite());
        points.sort_by(|a, b| a.0.total_cmp(&b.0));
        if points.len() < 2 {
            return Self::default();
        }
        Self { points }
    }

    pub fn points(&self) -> &[(f64, f64)] {
        &self.points
    }

    pub fn evaluate(&self, t: f64) -> f64 {
        let first = self.points[0];
        let last = self.points[self.points.len() - 1];
        if t <= first.0 {
            return first.1.clamp(0.0, 1.0);
        }
        if t >= last.0 {
            return last.1.clamp(0.0, 1.0);
        }
        for w in self.points.windows(2) {
            let ((x0, y0), (x1, y1)) = (w[0], w[1]);
            if t <= x1 {
                let span = x1 - x0;
                let a = if span > 0.0 { (t - x0) / span } else { 1.0 };
                return (y0 + a * (y1 - y0)).clamp(0.0, 1.0);
            }
        }
        last.1.clamp(0.0, 1.0)
    }
}

impl Default for IntensityCurve {
    fn default() -> Self {
        Self {
            points: vec![(0.0, 0.0), (1.0, 1.0)],
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColorMap {
    #[default]
    Grayscale,
    Hot,
    Jet,
}

fn to_u8(v: f64) -> u8 {
    (v.clamp(0.0, 1.0) * 255.0).round() as u8
}

impl ColorMap {
    pub fn map(self, t: f64) -> DisplayPixel {
        let t = t.clamp(0.0, 1.0);
        let (r, g, b) = match self {
            ColorMap::Grayscale => (t, t, t),
            ColorMap::Hot => (3.0 * t, 3.0 * t - 1.0, 3.0 * t - 2.0),
            ColorMap::Jet => (
                1.5 - (4.0 * t - 3.0).abs(),
                1.5 - (4.0 * t - 2.0).abs(),
                1.5 - (4.0 * t - 1.0).abs(),
            ),
        };
        [to_u8(r), to_u8(g), to_u8(b), 255]
    }
}

fn normalize(value: f64, range: (f64, f64)) -> f64 {
    let (lo, hi) = range;
    if !value.is_finite() {
        return 0.0;
    }
    if hi > lo {
        (value - lo) / (hi - lo)
    } else if value >= hi {
        1.0
    } else {
        0.0
    }
}

/// Display mapping of a single scalar representation.
///
/// The curve is held through an `Rc` so the presentation layer may hand the
/// same curve to several representations; it is never shared implicitly.
#[derive(Clone, Debug)]
pub struct ScalarDisplayMapping {
    pub curve: Rc<IntensityCurve>,
    pub color_map: ColorMap,
    /// Native intensity window mapped onto the curve domain.
    pub window: (f64, f64),
}

impl ScalarDisplayMapping {
    pub fn map(&self, value: f64) -> DisplayPixel {
        self.color_map
            .map(self.curve.evaluate(normalize(value, self.window)))
    }
}

impl Default for ScalarDisplayMapping {
    fn default() -> Self {
        Self {
            curve: Rc::new(IntensityCurve::default()),
            color_map: ColorMap::default(),
            window: (0.0, 1.0),
        }
    }
}

/// How a multi-component image is presented.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MultiChannelDisplayMode {
    pub use_rgb: bool,
    pub render_as_grid: bool,
    pub selected: ScalarRepKey,
}

impl MultiChannelDisplayMode {
    pub fn rgb() -> Self {
        Self {
            use_rgb: true,
            render_as_grid: false,
            selected: ScalarRepKey::component(0),
        }
    }

    pub fn scalar(selected: ScalarRepKey) -> Self {
        Self {
            use_rgb: false,
            render_as_grid: false,
            selected,
        }
    }

    /// Whether voxels are shown as a color vector rather than through a
    /// scalar representation.
    pub fn shows_vector(&self, components: usize) -> bool {
        self.use_rgb || (self.render_as_grid && components == 3)
    }
}

/// Display mapping of the vector image as a whole.
#[derive(Clone, Debug)]
pub struct MultiChannelDisplayMapping {
    pub mode: MultiChannelDisplayMode,
    pub curve: Rc<IntensityCurve>,
    /// Native intensity window shared by all channels in RGB mode.
    pub window: (f64, f64),
}

impl MultiChannelDisplayMapping {
    pub fn new(mode: MultiChannelDisplayMode, window: (f64, f64)) -> Self {
        Self {
            mode,
            curve: Rc::new(IntensityCurve::default()),
            window,
        }
    }

    /// Representation explicitly chosen for display, if the mode picks one.
    pub fn scalar_representation(&self) -> Option<ScalarRepKey> {
        (!self.mode.use_rgb && !self.mode.render_as_grid).then_some(self.mode.selected)
    }

    /// Map the first three channels to R, G and B. Missing channels stay 0.
    pub fn map_rgb(&self, values: &[f64]) -> DisplayPixel {
        let mut out = [0, 0, 0, 255];
        for (slot, &v) in out.iter_mut().zip(values.iter()).take(3) {
            *slot = to_u8(self.curve.evaluate(normalize(v, self.window)));
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn curve_interpolates_and_clamps() {
        let curve = IntensityCurve::new(vec![(1.0, 1.0), (0.0, 0.0), (0.5, 0.25)]);
        assert!((curve.evaluate(0.25) - 0.125).abs() < 1e-12);
        assert_eq!(curve.evaluate(-3.0), 0.0);
        assert_eq!(curve.evaluate(3.0), 1.0);
    }

    #[test]
    fn degenerate_curve_is_identity() {
        let curve = IntensityCurve::new(vec![(0.3, 0.3)]);
        assert_eq!(curve, IntensityCurve::default());
    }

    #[test]
    fn grayscale_window_maps_ends() {
        let mapping = ScalarDisplayMapping {
            window: (10.0, 20.0),
            ..Default::default()
        };
        assert_eq!(mapping.map(10.0), [0, 0, 0, 255]);
        assert_eq!(mapping.map(20.0), [255, 255, 255, 255]);
    }

    #[test]
    fn rgb_mapping_uses_first_three_channels() {
        let mapping = MultiChannelDisplayMapping::new(MultiChannelDisplayMode::rgb(), (0.0, 2.0));
        assert_eq!(mapping.map_rgb(&[0.0, 1.0, 2.0, 2.0]), [0, 128, 255, 255]);
        assert_eq!(mapping.scalar_representation(), None);
    }
}
