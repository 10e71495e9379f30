use crate::model::Chart;
use crate::replay::frame::{KeyPressState, ReplayFrame};

/// How long a flawless player holds a tap note before letting go.
const TAP_HOLD_MS: f64 = 50.0;

/// How far before its first input a synthesized replay opens with an empty
/// baseline frame.
const BASELINE_LEAD_MS: f64 = 1_000.0;

/// A recorded play: ordered key-state frames over a fixed lane count.
///
/// Immutable once constructed. Play sessions and the virtual player borrow
/// it read-only; only cursors move.
#[derive(Debug, Clone, PartialEq)]
pub struct Replay {
    key_count: usize,
    frames: Vec<ReplayFrame>,
}

impl Replay {
    /// Build a replay from an ordered frame sequence, recomputing the
    /// per-frame song-time deltas.
    pub fn new(key_count: usize, mut frames: Vec<ReplayFrame>) -> Self {
        let mut previous = frames.first().map_or(0.0, |f| f.time_ms);
        for frame in &mut frames {
            frame.delta_ms = frame.time_ms - previous;
            previous = frame.time_ms;
        }
        Self { key_count, frames }
    }

    /// Number of lanes this replay was recorded with.
    pub fn key_count(&self) -> usize {
        self.key_count
    }

    /// The full frame sequence.
    pub fn frames(&self) -> &[ReplayFrame] {
        &self.frames
    }

    /// A single frame by index.
    pub fn frame(&self, index: usize) -> Option<&ReplayFrame> {
        self.frames.get(index)
    }

    /// Number of frames.
    pub fn len(&self) -> usize {
        self.frames.len()
    }

    /// Whether the replay holds no frames at all.
    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// Index of the last frame at or before `time_ms`. Ties take the latest
    /// frame. `None` when `time_ms` precedes the whole sequence.
    pub fn last_frame_at(&self, time_ms: f64) -> Option<usize> {
        let pos = self.frames.partition_point(|f| f.time_ms <= time_ms);
        pos.checked_sub(1)
    }

    /// Build the frame sequence a flawless player would produce for `chart`:
    /// a press edge at every object start and a release at the hold end, or
    /// shortly after the start for taps. Simultaneous edges share a frame.
    pub fn perfect(chart: &Chart) -> Self {
        // Press/release interval per object, grouped by lane.
        let mut lanes: Vec<Vec<(f64, f64)>> = vec![Vec::new(); chart.key_count];
        for obj in &chart.objects {
            let release = obj
                .end_time_ms
                .unwrap_or(obj.start_time_ms + TAP_HOLD_MS);
            lanes[obj.lane].push((obj.start_time_ms, release));
        }

        // Pull a release back when it would swallow the next press in the
        // same lane, so every object keeps its own press edge.
        for lane in &mut lanes {
            lane.sort_by(|a, b| a.0.total_cmp(&b.0));
            for i in 0..lane.len().saturating_sub(1) {
                let next_press = lane[i + 1].0;
                if lane[i].1 >= next_press {
                    lane[i].1 = (next_press - 1.0).max(lane[i].0);
                }
            }
        }

        struct Edge {
            time_ms: f64,
            lane: usize,
            press: bool,
        }

        let mut edges: Vec<Edge> = Vec::new();
        for (lane, intervals) in lanes.iter().enumerate() {
            for &(press_ms, release_ms) in intervals {
                edges.push(Edge {
                    time_ms: press_ms,
                    lane,
                    press: true,
                });
                edges.push(Edge {
                    time_ms: release_ms,
                    lane,
                    press: false,
                });
            }
        }
        // Releases sort ahead of presses at equal times.
        edges.sort_by(|a, b| {
            a.time_ms
                .total_cmp(&b.time_ms)
                .then(a.press.cmp(&b.press))
                .then(a.lane.cmp(&b.lane))
        });

        let mut frames: Vec<ReplayFrame> = Vec::new();
        if let Some(first) = edges.first() {
            frames.push(ReplayFrame::new(
                first.time_ms - BASELINE_LEAD_MS,
                KeyPressState::EMPTY,
            ));
        }

        let mut keys = KeyPressState::EMPTY;
        let mut index = 0;
        while index < edges.len() {
            let time_ms = edges[index].time_ms;
            while index < edges.len() && edges[index].time_ms == time_ms {
                let edge = &edges[index];
                keys = if edge.press {
                    keys.with_lane(edge.lane)
                } else {
                    keys.without_lane(edge.lane)
                };
                index += 1;
            }
            frames.push(ReplayFrame::new(time_ms, keys));
        }

        Self::new(chart.key_count, frames)
    }
}
