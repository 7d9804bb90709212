use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// Classification of a scalar representation derived from a vector image.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ScalarRepKind {
    Component,
    Magnitude,
    Max,
    Average,
}

impl ScalarRepKind {
    /// Kinds that are computed from all components rather than sliced out.
    pub const DERIVED: [ScalarRepKind; 3] = [
        ScalarRepKind::Magnitude,
        ScalarRepKind::Max,
        ScalarRepKind::Average,
    ];

    pub fn is_derived(self) -> bool {
        !matches!(self, ScalarRepKind::Component)
    }
}

impl fmt::Display for ScalarRepKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ScalarRepKind::Component => "component",
            ScalarRepKind::Magnitude => "magnitude",
            ScalarRepKind::Max => "max",
            ScalarRepKind::Average => "average",
        };
        f.write_str(name)
    }
}

/// Cache key of a scalar representation.
///
/// `index` is the component index for [`ScalarRepKind::Component`] and is
/// always zero for the derived kinds; use [`ScalarRepKey::new`] to get the
/// normalized form.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ScalarRepKey {
    pub kind: ScalarRepKind,
    pub index: usize,
}

impl ScalarRepKey {
    pub const MAGNITUDE: ScalarRepKey = ScalarRepKey {
        kind: ScalarRepKind::Magnitude,
        index: 0,
    };
    pub const MAX: ScalarRepKey = ScalarRepKey {
        kind: ScalarRepKind::Max,
        index: 0,
    };
    pub const AVERAGE: ScalarRepKey = ScalarRepKey {
        kind: ScalarRepKind::Average,
        index: 0,
    };

    pub fn new(kind: ScalarRepKind, index: usize) -> Self {
        let index = if kind.is_derived() { 0 } else { index };
        Self { kind, index }
    }

    pub fn component(index: usize) -> Self {
        Self {
            kind: ScalarRepKind::Component,
            index,
        }
    }

    pub fn derived(kind: ScalarRepKind) -> Self {
        Self::new(kind, 0)
    }
}

impl fmt::Display for ScalarRepKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            ScalarRepKind::Component => write!(f, "component[{}]", self.index),
            kind => write!(f, "{kind}"),
        }
    }
}

/// Affine map from stored raw values to native (physical) units:
/// `native = scale * raw + shift`.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct NativeMapping {
    pub scale: f64,
    pub shift: f64,
}

impl NativeMapping {
    pub const IDENTITY: NativeMapping = NativeMapping {
        scale: 1.0,
        shift: 0.0,
    };

    pub fn new(scale: f64, shift: f64) -> Self {
        Self { scale, shift }
    }

    #[inline]
    pub fn map(&self, raw: f64) -> f64 {
        raw * self.scale + self.shift
    }

    pub fn is_identity(&self) -> bool {
        self.scale == 1.0 && self.shift == 0.0
    }
}

impl Default for NativeMapping {
    fn default() -> Self {
        Self::IDENTITY
    }
}

/// Opaque identity of a vector image wrapper.
///
/// Representations keep this as their only link back to the parent.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
pub struct WrapperId(u64);

/// Opaque identity of a single scalar representation instance.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
pub struct RepresentationId(u64);

static NEXT_ID: AtomicU64 = AtomicU64::new(1);

fn next_id() -> u64 {
    NEXT_ID.fetch_add(1, Ordering::Relaxed)
}

impl WrapperId {
    pub(crate) fn fresh() -> Self {
        Self(next_id())
    }
}

impl RepresentationId {
    pub(crate) fn fresh() -> Self {
        Self(next_id())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn derived_keys_ignore_index() {
        let key = ScalarRepKey::new(ScalarRepKind::Max, 7);
        assert_eq!(key, ScalarRepKey::MAX);
        let comp = ScalarRepKey::new(ScalarRepKind::Component, 2);
        assert_eq!(comp.index, 2);
    }

    #[test]
    fn keys_order_components_before_derived() {
        let mut keys = vec![
            ScalarRepKey::AVERAGE,
            ScalarRepKey::component(1),
            ScalarRepKey::MAGNITUDE,
            ScalarRepKey::component(0),
            ScalarRepKey::MAX,
        ];
        keys.sort();
        assert_eq!(
            keys,
            vec![
                ScalarRepKey::component(0),
                ScalarRepKey::component(1),
                ScalarRepKey::MAGNITUDE,
                ScalarRepKey::MAX,
                ScalarRepKey::AVERAGE,
            ]
        );
    }

    #[test]
    fn native_mapping_is_affine() {
        let m = NativeMapping::new(2.5, -10.0);
        assert_eq!(m.map(12.0), 20.0);
        assert!(!m.is_identity());
        assert!(NativeMapping::default().is_identity());
    }
}
