//! Per-voxel reductions from a component vector to one scalar.
//!
//! The set is closed: one tag per derived representation kind, and a single
//! function table keyed by that tag.
use crate::types::ScalarRepKind;
use serde::Serialize;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Reduction {
    /// Euclidean norm of the component vector.
    Magnitude,
    /// Largest component.
    Max,
    /// Arithmetic mean of the components.
    Mean,
}

type ReduceFn = fn(&mut dyn Iterator<Item = f64>) -> f64;

fn magnitude(values: &mut dyn Iterator<Item = f64>) -> f64 {
    values.map(|v| v * v).sum::<f64>().sqrt()
}

fn max(values: &mut dyn Iterator<Item = f64>) -> f64 {
    values.fold(f64::NEG_INFINITY, f64::max)
}

fn mean(values: &mut dyn Iterator<Item = f64>) -> f64 {
    let (sum, n) = values.fold((0.0, 0usize), |(s, n), v| (s + v, n + 1));
    if n == 0 {
        0.0
    } else {
        sum / n as f64
    }
}

const TABLE: [(Reduction, ReduceFn); 3] = [
    (Reduction::Magnitude, magnitude),
    (Reduction::Max, max),
    (Reduction::Mean, mean),
];

impl Reduction {
    pub const ALL: [Reduction; 3] = [Reduction::Magnitude, Reduction::Max, Reduction::Mean];

    /// Reduction backing a derived representation kind. `None` for
    /// components, which are extracted rather than reduced.
    pub fn for_kind(kind: ScalarRepKind) -> Option<Reduction> {
        match kind {
            ScalarRepKind::Component => None,
            ScalarRepKind::Magnitude => Some(Reduction::Magnitude),
            ScalarRepKind::Max => Some(Reduction::Max),
            ScalarRepKind::Average => Some(Reduction::Mean),
        }
    }

    pub fn kind(self) -> ScalarRepKind {
        match self {
            Reduction::Magnitude => ScalarRepKind::Magnitude,
            Reduction::Max => ScalarRepKind::Max,
            Reduction::Mean => ScalarRepKind::Average,
        }
    }

    fn function(self) -> ReduceFn {
        TABLE
            .iter()
            .find(|(tag, _)| *tag == self)
            .map(|(_, f)| *f)
            .unwrap_or(mean)
    }

    /// Reduce one voxel's components (already in native units).
    pub fn apply<I>(self, values: I) -> f64
    where
        I: IntoIterator<Item = f64>,
    {
        let mut iter = values.into_iter();
        (self.function())(&mut iter)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reductions_on_known_vector() {
        let v = [3.0, 4.0, -1.0];
        assert!((Reduction::Magnitude.apply(v) - 26f64.sqrt()).abs() < 1e-12);
        assert_eq!(Reduction::Max.apply(v), 4.0);
        assert!((Reduction::Mean.apply(v) - 2.0).abs() < 1e-12);
    }

    #[test]
    fn kinds_map_both_ways() {
        for r in Reduction::ALL {
            assert_eq!(Reduction::for_kind(r.kind()), Some(r));
        }
        assert_eq!(Reduction::for_kind(ScalarRepKind::Component), None);
    }
}
