use serde::{Deserialize, Serialize};

/// Beat subdivisions of the snap grid, in classification order.
pub const SNAP_DIVISORS: [u32; 8] = [1, 2, 3, 4, 6, 8, 12, 16];

/// Quantization tolerance when classifying a time onto the grid.
const SNAP_TOLERANCE_MS: f64 = 2.0;

/// A timing point. Defines the beat grid from its start time until the next
/// point takes over.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimingPoint {
    pub start_time_ms: f64,
    pub bpm: f64,
    /// Beats per measure.
    #[serde(default = "default_signature")]
    pub signature: u32,
}

fn default_signature() -> u32 {
    4
}

impl TimingPoint {
    /// Create a timing point with a 4/4 signature.
    pub fn new(start_time_ms: f64, bpm: f64) -> Self {
        Self {
            start_time_ms,
            bpm,
            signature: default_signature(),
        }
    }

    /// Length of one beat in milliseconds.
    pub fn millis_per_beat(&self) -> f64 {
        60_000.0 / self.bpm
    }

    /// Length of one measure in milliseconds.
    pub fn millis_per_measure(&self) -> f64 {
        self.millis_per_beat() * f64::from(self.signature)
    }
}

/// Find the timing point governing `time_ms`.
///
/// Times before the first point are governed by the first point. Returns
/// `None` only for an empty list.
pub fn timing_point_at(points: &[TimingPoint], time_ms: f64) -> Option<&TimingPoint> {
    if points.is_empty() {
        return None;
    }
    let pos = points.partition_point(|p| p.start_time_ms <= time_ms);
    Some(&points[pos.saturating_sub(1)])
}

/// Classify `time_ms` onto the beat-snap grid of its governing timing point.
///
/// Returns an index into [`SNAP_DIVISORS`], or `SNAP_DIVISORS.len()` when the
/// time sits on none of the standard subdivisions (or no timing point
/// exists). Snap indices are grid metadata for rendering and never feed the
/// judge path.
pub fn beat_snap_index(points: &[TimingPoint], time_ms: f64) -> usize {
    let Some(point) = timing_point_at(points, time_ms) else {
        return SNAP_DIVISORS.len();
    };

    let offset = time_ms - point.start_time_ms;
    let millis_per_beat = point.millis_per_beat();

    for (index, divisor) in SNAP_DIVISORS.iter().enumerate() {
        let step = millis_per_beat / f64::from(*divisor);
        let nearest = (offset / step).round() * step;
        if (offset - nearest).abs() <= SNAP_TOLERANCE_MS {
            return index;
        }
    }

    SNAP_DIVISORS.len()
}
