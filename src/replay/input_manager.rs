use tracing::debug;

use crate::play::ScoreProcessor;
use crate::replay::frame::KeyPressState;
use crate::replay::replay::Replay;
use crate::replay::virtual_player::JudgementStat;

/// Where a session's input comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SessionMode {
    /// Input is a loaded recording rather than the player's hands.
    pub watching_replay: bool,
    /// Input is synthesized from the chart.
    pub autoplay: bool,
}

impl SessionMode {
    /// Live human play.
    pub fn live() -> Self {
        Self::default()
    }

    /// Watching a loaded recording.
    pub fn replay() -> Self {
        Self {
            watching_replay: true,
            autoplay: false,
        }
    }

    /// Synthetic flawless playback.
    pub fn autoplay() -> Self {
        Self {
            watching_replay: false,
            autoplay: true,
        }
    }

    /// Whether gameplay input is driven by a frame sequence at all.
    pub fn consumes_replay(self) -> bool {
        self.watching_replay || self.autoplay
    }
}

/// Drives a session from a replay's frame sequence, in lockstep with the
/// advancing audio position.
///
/// Owns only cursor state; the replay and the precomputed judgement stream
/// are borrowed per call, so the render loop that owns them also owns the
/// pace. Each tick applies every judgement whose time has come, then derives
/// at most one frame's worth of press/release edges.
#[derive(Debug)]
pub struct ReplayInputManager {
    mode: SessionMode,
    /// Next frame to diff against its predecessor. Starts at 1 and never
    /// decreases outside of an explicit skip.
    current_frame: usize,
    /// Next statistic to apply. Never decreases.
    next_stat: usize,
    unique_presses: Vec<bool>,
    unique_releases: Vec<bool>,
}

impl ReplayInputManager {
    /// Create a manager for `key_count` lanes.
    pub fn new(key_count: usize, mode: SessionMode) -> Self {
        Self {
            mode,
            current_frame: 1,
            next_stat: 0,
            unique_presses: vec![false; key_count],
            unique_releases: vec![false; key_count],
        }
    }

    /// The session mode this manager was created with.
    pub fn mode(&self) -> SessionMode {
        self.mode
    }

    /// Index of the next frame to consume.
    pub fn current_frame(&self) -> usize {
        self.current_frame
    }

    /// Number of statistics applied so far.
    pub fn applied_stat_count(&self) -> usize {
        self.next_stat
    }

    /// Per-lane press edges detected by the tick just processed.
    pub fn unique_presses(&self) -> &[bool] {
        &self.unique_presses
    }

    /// Per-lane release edges detected by the tick just processed.
    pub fn unique_releases(&self) -> &[bool] {
        &self.unique_releases
    }

    /// Clear the per-tick edge flags. The consumer calls this after reading
    /// them, before the next tick.
    pub fn clear_unique_flags(&mut self) {
        self.unique_presses.fill(false);
        self.unique_releases.fill(false);
    }

    /// One reconciliation step, invoked once per render tick.
    ///
    /// First applies every due statistic to `score` (notifying `observer`
    /// after each), then derives press/release edges from the next frame if
    /// the audio clock has reached it. Running out of frames or statistics
    /// is a steady no-op state.
    pub fn handle_input(
        &mut self,
        replay: &Replay,
        stats: &[JudgementStat],
        audio_position_ms: f64,
        score: &mut ScoreProcessor,
        observer: &mut dyn FnMut(&JudgementStat),
    ) {
        self.apply_due_stats(stats, audio_position_ms, score, observer);

        if !self.mode.consumes_replay() {
            return;
        }
        let Some(frame) = replay.frame(self.current_frame) else {
            return;
        };
        if audio_position_ms < frame.time_ms {
            return;
        }

        let previous = self
            .current_frame
            .checked_sub(1)
            .and_then(|index| replay.frame(index))
            .map_or(KeyPressState::EMPTY, |f| f.keys);

        for lane in 0..self.unique_presses.len() {
            let was = previous.is_pressed(lane);
            let is = frame.keys.is_pressed(lane);
            if is && !was {
                self.unique_presses[lane] = true;
            } else if was && !is {
                self.unique_releases[lane] = true;
            }
        }

        self.current_frame += 1;
    }

    /// Relocate the frame cursor after a seek to `target_ms`.
    ///
    /// Lands on the last frame at or before the target; in autoplay the
    /// cursor sits one frame past it, since the edge implied at that exact
    /// frame has already fired. Seeking before the first frame leaves the
    /// cursor untouched.
    pub fn handle_skip(&mut self, replay: &Replay, target_ms: f64) {
        let Some(index) = replay.last_frame_at(target_ms) else {
            return;
        };
        self.current_frame = if self.mode.autoplay { index + 1 } else { index };
        debug!(
            target_ms,
            frame = self.current_frame,
            "relocated replay cursor"
        );
    }

    fn apply_due_stats(
        &mut self,
        stats: &[JudgementStat],
        audio_position_ms: f64,
        score: &mut ScoreProcessor,
        observer: &mut dyn FnMut(&JudgementStat),
    ) {
        while let Some(stat) = stats.get(self.next_stat) {
            if stat.song_position_ms > audio_position_ms {
                break;
            }
            score.calculate_score(stat.judgement);
            observer(stat);
            self.next_stat += 1;
        }
    }
}
