use std::path::Path;

use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::model::hit_object::HitObject;
use crate::model::timing::{self, TimingPoint};

/// A parsed chart: the read-only input to a play session.
///
/// Objects and timing points are ordered by start time. The chart never
/// changes once loaded; play sessions borrow it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Chart {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub artist: String,
    /// Number of lanes (4 or 7 in the shipped modes).
    pub key_count: usize,
    pub objects: Vec<HitObject>,
    #[serde(default)]
    pub timing_points: Vec<TimingPoint>,
}

impl Chart {
    /// Create an empty chart with the given lane count.
    pub fn new(key_count: usize) -> Self {
        Self {
            title: String::new(),
            artist: String::new(),
            key_count,
            objects: Vec::new(),
            timing_points: Vec::new(),
        }
    }

    /// Load a chart document from a JSON file.
    pub fn load(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read chart file: {}", path.display()))?;
        let chart = Self::from_json(&json)?;
        chart.validate()?;
        Ok(chart)
    }

    /// Deserialize from a JSON string.
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).context("Failed to deserialize chart")
    }

    /// Serialize to a JSON string.
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string(self).context("Failed to serialize chart")
    }

    /// Check the structural invariants: lanes in range, objects and timing
    /// points ordered by start time, hold ends after their starts.
    pub fn validate(&self) -> Result<()> {
        if self.key_count == 0 {
            bail!("chart has zero lanes");
        }
        for (index, obj) in self.objects.iter().enumerate() {
            if obj.lane >= self.key_count {
                bail!(
                    "object {index} is on lane {} but the chart has {} lanes",
                    obj.lane,
                    self.key_count
                );
            }
            if let Some(end) = obj.end_time_ms {
                if end <= obj.start_time_ms {
                    bail!("object {index} ends at or before its start");
                }
            }
            if index > 0 && obj.start_time_ms < self.objects[index - 1].start_time_ms {
                bail!("object {index} is out of order");
            }
        }
        for (index, point) in self.timing_points.iter().enumerate() {
            if index > 0 && point.start_time_ms < self.timing_points[index - 1].start_time_ms {
                bail!("timing point {index} is out of order");
            }
        }
        Ok(())
    }

    /// Content hash used to associate replays with this chart.
    pub fn sha256(&self) -> Result<String> {
        let json = self.to_json()?;
        let digest = Sha256::digest(json.as_bytes());
        Ok(format!("{digest:x}"))
    }

    /// Number of objects.
    pub fn object_count(&self) -> usize {
        self.objects.len()
    }

    /// Number of hold notes.
    pub fn hold_count(&self) -> usize {
        self.objects.iter().filter(|o| o.is_hold()).count()
    }

    /// Number of judgements a full clear of this chart produces. Taps
    /// resolve once; holds resolve twice, head and tail.
    pub fn judgement_count(&self) -> usize {
        self.objects.len() + self.hold_count()
    }

    /// The timing point governing `time_ms`, if any.
    pub fn timing_point_at(&self, time_ms: f64) -> Option<&TimingPoint> {
        timing::timing_point_at(&self.timing_points, time_ms)
    }

    /// Snap-grid classification for `time_ms`.
    pub fn beat_snap_index(&self, time_ms: f64) -> usize {
        timing::beat_snap_index(&self.timing_points, time_ms)
    }

    /// Recompute every object's snap index from the timing grid.
    pub fn assign_snap_indices(&mut self) {
        let points = std::mem::take(&mut self.timing_points);
        for obj in &mut self.objects {
            obj.snap_index = timing::beat_snap_index(&points, obj.start_time_ms);
        }
        self.timing_points = points;
    }
}
