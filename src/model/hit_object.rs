use serde::{Deserialize, Serialize};

/// A single object in the chart: a tap note or a hold note.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HitObject {
    /// 0-based lane index.
    pub lane: usize,
    /// Time the object must be hit, in milliseconds.
    pub start_time_ms: f64,
    /// End time for hold notes. `None` for taps.
    #[serde(default)]
    pub end_time_ms: Option<f64>,
    /// Which beat subdivision the object aligns to. Grid metadata only.
    #[serde(default)]
    pub snap_index: usize,
}

impl HitObject {
    /// Create a tap note.
    pub fn tap(lane: usize, time_ms: f64) -> Self {
        Self {
            lane,
            start_time_ms: time_ms,
            end_time_ms: None,
            snap_index: 0,
        }
    }

    /// Create a hold note spanning `start_ms..end_ms`.
    pub fn hold(lane: usize, start_ms: f64, end_ms: f64) -> Self {
        Self {
            lane,
            start_time_ms: start_ms,
            end_time_ms: Some(end_ms),
            snap_index: 0,
        }
    }

    /// Returns true if this is a hold note.
    pub fn is_hold(&self) -> bool {
        self.end_time_ms.is_some()
    }

    /// Hold duration in milliseconds. Zero for taps.
    pub fn duration_ms(&self) -> f64 {
        self.end_time_ms
            .map_or(0.0, |end| end - self.start_time_ms)
    }
}
