use serde::Serialize;
use std::time::Instant;

/// Wall-clock time spent in one named step.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StageTiming {
    pub label: String,
    pub elapsed_ms: f64,
}

/// Ordered list of step timings plus their total.
#[derive(Clone, Debug, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TimingBreakdown {
    pub total_ms: f64,
    pub stages: Vec<StageTiming>,
}

impl TimingBreakdown {
    pub fn push(&mut self, label: impl Into<String>, elapsed_ms: f64) {
        self.total_ms += elapsed_ms;
        self.stages.push(StageTiming {
            label: label.into(),
            elapsed_ms,
        });
    }

    /// Run `f`, record how long it took under `label`, and pass its result
    /// through.
    pub fn measure<R>(&mut self, label: impl Into<String>, f: impl FnOnce() -> R) -> R {
        let start = Instant::now();
        let out = f();
        self.push(label, start.elapsed().as_secs_f64() * 1000.0);
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn measure_accumulates_total() {
        let mut timing = TimingBreakdown::default();
        let v = timing.measure("a", || 2 + 2);
        timing.push("b", 1.5);
        assert_eq!(v, 4);
        assert_eq!(timing.stages.len(), 2);
        assert!(timing.total_ms >= 1.5);
    }
}
