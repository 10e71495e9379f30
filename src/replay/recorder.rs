use crate::replay::frame::{KeyPressState, ReplayFrame};
use crate::replay::replay::Replay;

/// Records a live session's sampled key state into replay frames.
///
/// The gameplay input layer calls [`sample`](Self::sample) once per tick with
/// the full key state; a frame is appended whenever the state changed, plus
/// an initial baseline frame so playback always has a predecessor to diff
/// against.
#[derive(Debug)]
pub struct ReplayRecorder {
    key_count: usize,
    frames: Vec<ReplayFrame>,
    last_keys: KeyPressState,
}

impl ReplayRecorder {
    /// Create a recorder for `key_count` lanes.
    pub fn new(key_count: usize) -> Self {
        Self {
            key_count,
            frames: Vec::new(),
            last_keys: KeyPressState::EMPTY,
        }
    }

    /// Number of lanes being recorded.
    pub fn key_count(&self) -> usize {
        self.key_count
    }

    /// Frames captured so far.
    pub fn frames(&self) -> &[ReplayFrame] {
        &self.frames
    }

    /// Record one sampled key state at `song_time_ms`.
    ///
    /// The first sample is always kept as the baseline; later samples are
    /// kept only when the key state changed.
    pub fn sample(&mut self, capture_time_ms: f64, song_time_ms: f64, keys: KeyPressState) {
        if !self.frames.is_empty() && keys == self.last_keys {
            return;
        }
        let previous_time = self.frames.last().map_or(song_time_ms, |f| f.time_ms);
        self.frames.push(ReplayFrame {
            capture_time_ms,
            time_ms: song_time_ms,
            delta_ms: song_time_ms - previous_time,
            keys,
        });
        self.last_keys = keys;
    }

    /// Finish recording and hand back the replay.
    pub fn finish(self) -> Replay {
        Replay::new(self.key_count, self.frames)
    }
}
