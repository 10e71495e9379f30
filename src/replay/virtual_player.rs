use tracing::debug;

use crate::model::Chart;
use crate::play::{Judgement, JudgementWindows, ScoreProcessor};
use crate::replay::error::ReplayError;
use crate::replay::frame::KeyPressState;
use crate::replay::replay::Replay;

/// One resolved entry of the precomputed statistics stream.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct JudgementStat {
    /// Time at which the judgement became final.
    pub song_position_ms: f64,
    pub judgement: Judgement,
    /// Which chart object this entry resolves.
    pub object_index: usize,
    /// True when this entry resolves a hold tail rather than a head or tap.
    pub release: bool,
}

/// A resolution found by a sweep, before emission.
#[derive(Debug, Clone, Copy)]
struct PendingResolution {
    song_position_ms: f64,
    judgement: Judgement,
    object_index: usize,
    release: bool,
}

/// Plays a whole replay against a chart offline, with no live clock,
/// producing the full ordered judgement stream.
///
/// Playback is a pure function of the chart and replay: the same pair always
/// yields the same stream, which is what lets a live session apply the
/// precomputed judgements and trust them to match what the recorded play
/// earned.
#[derive(Debug)]
pub struct VirtualReplayPlayer<'a> {
    chart: &'a Chart,
    replay: &'a Replay,
    windows: JudgementWindows,
    score: ScoreProcessor,
    stats: Vec<JudgementStat>,
    /// Per object: head (or tap) resolved.
    head_resolved: Vec<bool>,
    /// Object indices per lane, in chart order.
    lane_objects: Vec<Vec<usize>>,
    /// Per lane: position of the first possibly-unresolved object.
    lane_cursor: Vec<usize>,
    /// Per lane: hold currently held, waiting for its release.
    active_holds: Vec<Option<usize>>,
    previous_keys: KeyPressState,
    ghost_taps: u32,
    played: bool,
}

impl<'a> VirtualReplayPlayer<'a> {
    /// Create a player with the standard windows. Fails when the chart and
    /// replay disagree on lane count or the replay's frames run backwards.
    pub fn new(chart: &'a Chart, replay: &'a Replay) -> Result<Self, ReplayError> {
        Self::with_windows(chart, replay, JudgementWindows::standard())
    }

    /// Create a player with explicit windows.
    pub fn with_windows(
        chart: &'a Chart,
        replay: &'a Replay,
        windows: JudgementWindows,
    ) -> Result<Self, ReplayError> {
        if chart.key_count != replay.key_count() {
            return Err(ReplayError::ConfigurationMismatch {
                chart_keys: chart.key_count,
                replay_keys: replay.key_count(),
            });
        }
        for (index, pair) in replay.frames().windows(2).enumerate() {
            if pair[1].time_ms < pair[0].time_ms {
                return Err(ReplayError::UnorderedFrames { index: index + 1 });
            }
        }

        let mut lane_objects = vec![Vec::new(); chart.key_count];
        for (index, obj) in chart.objects.iter().enumerate() {
            lane_objects[obj.lane].push(index);
        }

        let capacity = chart.judgement_count();
        Ok(Self {
            chart,
            replay,
            windows,
            score: ScoreProcessor::new(capacity as u32),
            stats: Vec::with_capacity(capacity),
            head_resolved: vec![false; chart.objects.len()],
            lane_objects,
            lane_cursor: vec![0; chart.key_count],
            active_holds: vec![None; chart.key_count],
            previous_keys: KeyPressState::EMPTY,
            ghost_taps: 0,
            played: false,
        })
    }

    /// Process every frame in order, exactly once. A second call is a no-op.
    ///
    /// The empty replay is degenerate and produces an empty stream; nothing
    /// is swept as missed because no frame was ever played.
    pub fn play_all_frames(&mut self) {
        if self.played {
            return;
        }
        self.played = true;

        if self.replay.is_empty() {
            return;
        }

        for frame_index in 0..self.replay.len() {
            let frame = self.replay.frames()[frame_index];
            self.sweep_elapsed(frame.time_ms);

            for lane in 0..self.chart.key_count {
                let was = self.previous_keys.is_pressed(lane);
                let is = frame.keys.is_pressed(lane);
                if is && !was {
                    self.handle_press(lane, frame.time_ms);
                } else if was && !is {
                    self.handle_release(lane, frame.time_ms);
                }
            }
            self.previous_keys = frame.keys;
        }

        self.final_sweep();

        debug!(
            stats = self.stats.len(),
            ghost_taps = self.ghost_taps,
            "virtual playback complete"
        );
    }

    /// The precomputed statistics stream.
    pub fn stats(&self) -> &[JudgementStat] {
        &self.stats
    }

    /// The internal score processor fed during playback.
    pub fn score(&self) -> &ScoreProcessor {
        &self.score
    }

    /// Presses that reached no object at all.
    pub fn ghost_taps(&self) -> u32 {
        self.ghost_taps
    }

    /// Consume the player, keeping the stream and final score.
    pub fn into_parts(self) -> (Vec<JudgementStat>, ScoreProcessor) {
        (self.stats, self.score)
    }

    /// Resolve everything whose window has fully elapsed before `now`:
    /// unhit heads past the miss window, and held tails past the release
    /// window.
    fn sweep_elapsed(&mut self, now_ms: f64) {
        let mut due: Vec<PendingResolution> = Vec::new();

        for lane in 0..self.chart.key_count {
            // Skip the resolved prefix once and for all.
            while self.lane_cursor[lane] < self.lane_objects[lane].len()
                && self.head_resolved[self.lane_objects[lane][self.lane_cursor[lane]]]
            {
                self.lane_cursor[lane] += 1;
            }

            for position in self.lane_cursor[lane]..self.lane_objects[lane].len() {
                let object_index = self.lane_objects[lane][position];
                if self.head_resolved[object_index] {
                    continue;
                }
                let obj = &self.chart.objects[object_index];
                let final_at = obj.start_time_ms + self.windows.miss_window();
                if final_at >= now_ms {
                    // Objects are in start order, nothing later is due.
                    break;
                }
                self.head_resolved[object_index] = true;
                due.push(PendingResolution {
                    song_position_ms: final_at,
                    judgement: Judgement::Miss,
                    object_index,
                    release: false,
                });
                if obj.is_hold() {
                    // An abandoned head takes the tail with it.
                    due.push(PendingResolution {
                        song_position_ms: final_at,
                        judgement: Judgement::Miss,
                        object_index,
                        release: true,
                    });
                }
            }

            if let Some(object_index) = self.active_holds[lane] {
                let end_ms = self.chart.objects[object_index]
                    .end_time_ms
                    .unwrap_or_default();
                let final_at = end_ms + self.windows.release_window();
                if final_at < now_ms {
                    // Held past the last release window without letting go.
                    self.active_holds[lane] = None;
                    due.push(PendingResolution {
                        song_position_ms: final_at,
                        judgement: Judgement::Okay,
                        object_index,
                        release: true,
                    });
                }
            }
        }

        due.sort_by(|a, b| {
            a.song_position_ms
                .total_cmp(&b.song_position_ms)
                .then(a.object_index.cmp(&b.object_index))
                .then(a.release.cmp(&b.release))
        });
        for resolution in due {
            self.emit(resolution);
        }
    }

    /// After the last frame nothing can be hit any more; resolve every
    /// object still pending.
    fn final_sweep(&mut self) {
        self.sweep_elapsed(f64::INFINITY);
    }

    fn handle_press(&mut self, lane: usize, time_ms: f64) {
        let mut best: Option<(usize, f64)> = None;
        for position in self.lane_cursor[lane]..self.lane_objects[lane].len() {
            let object_index = self.lane_objects[lane][position];
            if self.head_resolved[object_index] {
                continue;
            }
            let start = self.chart.objects[object_index].start_time_ms;
            if start > time_ms + self.windows.miss_window() {
                break;
            }
            let diff_abs = (start - time_ms).abs();
            if diff_abs > self.windows.miss_window() {
                continue;
            }
            if best.is_none_or(|(_, best_diff)| diff_abs < best_diff) {
                best = Some((object_index, diff_abs));
            }
        }

        let Some((object_index, diff_abs)) = best else {
            self.ghost_taps += 1;
            return;
        };

        let judgement = self
            .windows
            .judge_press(diff_abs)
            .unwrap_or(Judgement::Miss);
        self.head_resolved[object_index] = true;
        self.emit(PendingResolution {
            song_position_ms: time_ms,
            judgement,
            object_index,
            release: false,
        });

        if self.chart.objects[object_index].is_hold() {
            if judgement == Judgement::Miss {
                // A head that barely grazed the window cannot be held.
                self.emit(PendingResolution {
                    song_position_ms: time_ms,
                    judgement: Judgement::Miss,
                    object_index,
                    release: true,
                });
            } else {
                self.active_holds[lane] = Some(object_index);
            }
        }
    }

    fn handle_release(&mut self, lane: usize, time_ms: f64) {
        let Some(object_index) = self.active_holds[lane].take() else {
            return;
        };
        let end_ms = self.chart.objects[object_index]
            .end_time_ms
            .unwrap_or_default();
        let diff_abs = (end_ms - time_ms).abs();
        // A release earlier than every widened window drops the hold.
        let judgement = self
            .windows
            .judge_release(diff_abs)
            .unwrap_or(Judgement::Miss);
        self.emit(PendingResolution {
            song_position_ms: time_ms,
            judgement,
            object_index,
            release: true,
        });
    }

    fn emit(&mut self, resolution: PendingResolution) {
        debug_assert!(
            self.stats
                .last()
                .is_none_or(|s| s.song_position_ms <= resolution.song_position_ms),
            "judgement stream must not move backwards"
        );
        self.score.calculate_score(resolution.judgement);
        self.stats.push(JudgementStat {
            song_position_ms: resolution.song_position_ms,
            judgement: resolution.judgement,
            object_index: resolution.object_index,
            release: resolution.release,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::HitObject;
    use crate::replay::frame::ReplayFrame;

    fn chart_4k(objects: Vec<HitObject>) -> Chart {
        let mut chart = Chart::new(4);
        chart.objects = objects;
        chart
    }

    fn frames(edges: &[(f64, u32)]) -> Vec<ReplayFrame> {
        edges
            .iter()
            .map(|&(time_ms, bits)| ReplayFrame::new(time_ms, KeyPressState::from_bits(bits)))
            .collect()
    }

    fn play(chart: &Chart, replay: &Replay) -> Vec<JudgementStat> {
        let mut player = VirtualReplayPlayer::new(chart, replay).unwrap();
        player.play_all_frames();
        player.stats().to_vec()
    }

    #[test]
    fn lane_count_mismatch_fails_at_construction() {
        let chart = chart_4k(vec![HitObject::tap(0, 1_000.0)]);
        let replay = Replay::new(7, frames(&[(0.0, 0)]));
        let err = VirtualReplayPlayer::new(&chart, &replay).unwrap_err();
        assert_eq!(
            err,
            ReplayError::ConfigurationMismatch {
                chart_keys: 4,
                replay_keys: 7
            }
        );
    }

    #[test]
    fn unordered_frames_fail_at_construction() {
        let chart = chart_4k(vec![]);
        let replay = Replay::new(4, frames(&[(100.0, 0), (50.0, 1)]));
        let err = VirtualReplayPlayer::new(&chart, &replay).unwrap_err();
        assert_eq!(err, ReplayError::UnorderedFrames { index: 1 });
    }

    #[test]
    fn empty_replay_produces_empty_stream() {
        let chart = chart_4k(vec![HitObject::tap(0, 1_000.0)]);
        let replay = Replay::new(4, Vec::new());
        assert!(play(&chart, &replay).is_empty());
    }

    #[test]
    fn exact_press_grades_marvelous() {
        let chart = chart_4k(vec![HitObject::tap(0, 1_000.0)]);
        let replay = Replay::new(
            4,
            frames(&[(0.0, 0b0), (1_000.0, 0b1), (1_050.0, 0b0)]),
        );
        let stats = play(&chart, &replay);
        assert_eq!(stats.len(), 1);
        assert_eq!(stats[0].judgement, Judgement::Marvelous);
        assert_eq!(stats[0].song_position_ms, 1_000.0);
        assert_eq!(stats[0].object_index, 0);
        assert!(!stats[0].release);
    }

    #[test]
    fn late_press_grades_by_offset() {
        // 100ms late is within the Good window.
        let chart = chart_4k(vec![HitObject::tap(1, 1_000.0)]);
        let replay = Replay::new(
            4,
            frames(&[(0.0, 0b00), (1_100.0, 0b10), (1_150.0, 0b00)]),
        );
        let stats = play(&chart, &replay);
        assert_eq!(stats.len(), 1);
        assert_eq!(stats[0].judgement, Judgement::Good);
    }

    #[test]
    fn unhit_object_misses_when_window_elapses() {
        let chart = chart_4k(vec![HitObject::tap(0, 1_000.0)]);
        // Frames exist but never press lane 0 in range.
        let replay = Replay::new(4, frames(&[(0.0, 0b0), (5_000.0, 0b0)]));
        let stats = play(&chart, &replay);
        assert_eq!(stats.len(), 1);
        assert_eq!(stats[0].judgement, Judgement::Miss);
        // Final at start + miss window.
        assert_eq!(stats[0].song_position_ms, 1_164.0);
    }

    #[test]
    fn ghost_tap_produces_no_entry() {
        let chart = chart_4k(vec![HitObject::tap(0, 10_000.0)]);
        let replay = Replay::new(
            4,
            frames(&[(0.0, 0b0), (1_000.0, 0b1), (1_050.0, 0b0), (20_000.0, 0b0)]),
        );
        let mut player = VirtualReplayPlayer::new(&chart, &replay).unwrap();
        player.play_all_frames();
        assert_eq!(player.ghost_taps(), 1);
        // The object itself still misses later.
        assert_eq!(player.stats().len(), 1);
        assert_eq!(player.stats()[0].judgement, Judgement::Miss);
    }

    #[test]
    fn hold_resolves_head_and_tail() {
        let chart = chart_4k(vec![HitObject::hold(0, 1_000.0, 2_000.0)]);
        let replay = Replay::new(
            4,
            frames(&[(0.0, 0b0), (1_000.0, 0b1), (2_000.0, 0b0)]),
        );
        let stats = play(&chart, &replay);
        assert_eq!(stats.len(), 2);

        assert_eq!(stats[0].judgement, Judgement::Marvelous);
        assert!(!stats[0].release);
        assert_eq!(stats[0].object_index, 0);

        assert_eq!(stats[1].judgement, Judgement::Marvelous);
        assert!(stats[1].release);
        assert_eq!(stats[1].object_index, 0);
        assert_eq!(stats[1].song_position_ms, 2_000.0);
    }

    #[test]
    fn early_hold_release_within_window_grades_by_offset() {
        let chart = chart_4k(vec![HitObject::hold(0, 1_000.0, 2_000.0)]);
        // Released 100ms early: within 1.5x Great (114ms).
        let replay = Replay::new(
            4,
            frames(&[(0.0, 0b0), (1_000.0, 0b1), (1_900.0, 0b0)]),
        );
        let stats = play(&chart, &replay);
        assert_eq!(stats[1].judgement, Judgement::Great);
        assert!(stats[1].release);
    }

    #[test]
    fn very_early_hold_release_fails_the_tail() {
        let chart = chart_4k(vec![HitObject::hold(0, 1_000.0, 2_000.0)]);
        let replay = Replay::new(
            4,
            frames(&[(0.0, 0b0), (1_000.0, 0b1), (1_300.0, 0b0)]),
        );
        let stats = play(&chart, &replay);
        assert_eq!(stats.len(), 2);
        assert_eq!(stats[1].judgement, Judgement::Miss);
        assert!(stats[1].release);
        assert_eq!(stats[1].song_position_ms, 1_300.0);
    }

    #[test]
    fn overheld_tail_resolves_okay_when_release_window_elapses() {
        let chart = chart_4k(vec![HitObject::hold(0, 1_000.0, 2_000.0)]);
        // Held far past the end and released only much later.
        let replay = Replay::new(
            4,
            frames(&[(0.0, 0b0), (1_000.0, 0b1), (4_000.0, 0b0)]),
        );
        let stats = play(&chart, &replay);
        assert_eq!(stats.len(), 2);
        assert_eq!(stats[1].judgement, Judgement::Okay);
        assert!(stats[1].release);
        // Final at end + widest release window.
        assert_eq!(stats[1].song_position_ms, 2_000.0 + 164.0 * 1.5);
    }

    #[test]
    fn missed_hold_head_takes_the_tail_with_it() {
        let chart = chart_4k(vec![HitObject::hold(0, 1_000.0, 2_000.0)]);
        let replay = Replay::new(4, frames(&[(0.0, 0b0), (5_000.0, 0b0)]));
        let stats = play(&chart, &replay);
        assert_eq!(stats.len(), 2);
        assert_eq!(stats[0].judgement, Judgement::Miss);
        assert!(!stats[0].release);
        assert_eq!(stats[1].judgement, Judgement::Miss);
        assert!(stats[1].release);
        assert_eq!(stats[0].song_position_ms, stats[1].song_position_ms);
    }

    #[test]
    fn hold_held_to_the_end_of_the_replay_resolves_okay() {
        let chart = chart_4k(vec![HitObject::hold(0, 1_000.0, 2_000.0)]);
        // The replay ends while the key is still down.
        let replay = Replay::new(4, frames(&[(0.0, 0b0), (1_000.0, 0b1)]));
        let stats = play(&chart, &replay);
        assert_eq!(stats.len(), 2);
        assert_eq!(stats[1].judgement, Judgement::Okay);
    }

    #[test]
    fn press_matches_nearest_object_in_lane() {
        let chart = chart_4k(vec![
            HitObject::tap(0, 1_000.0),
            HitObject::tap(0, 1_120.0),
        ]);
        // Press at 1100: 100ms late for the first, 20ms early for the
        // second. The nearer (second) object takes the hit.
        let replay = Replay::new(
            4,
            frames(&[(0.0, 0b0), (1_100.0, 0b1), (1_150.0, 0b0), (5_000.0, 0b0)]),
        );
        let stats = play(&chart, &replay);
        assert_eq!(stats.len(), 2);
        assert_eq!(stats[0].object_index, 1);
        assert_eq!(stats[0].judgement, Judgement::Perfect);
        // The skipped first object misses once its window elapses.
        assert_eq!(stats[1].object_index, 0);
        assert_eq!(stats[1].judgement, Judgement::Miss);
    }

    #[test]
    fn stream_is_ordered_and_complete() {
        let chart = chart_4k(vec![
            HitObject::tap(0, 500.0),
            HitObject::hold(1, 700.0, 1_400.0),
            HitObject::tap(2, 900.0),
            HitObject::tap(0, 1_600.0),
        ]);
        let replay = Replay::new(
            4,
            frames(&[
                (0.0, 0b000),
                (500.0, 0b001),
                (560.0, 0b000),
                (705.0, 0b010),
                (1_395.0, 0b000),
                (1_650.0, 0b001),
                (1_700.0, 0b000),
                (5_000.0, 0b000),
            ]),
        );
        let stats = play(&chart, &replay);
        // Tap + hold head + hold tail + missed tap + hit tap.
        assert_eq!(stats.len(), chart.judgement_count());
        for pair in stats.windows(2) {
            assert!(pair[0].song_position_ms <= pair[1].song_position_ms);
        }
    }

    #[test]
    fn playback_is_deterministic() {
        let chart = chart_4k(vec![
            HitObject::tap(0, 500.0),
            HitObject::hold(1, 700.0, 1_400.0),
            HitObject::tap(2, 900.0),
        ]);
        let replay = Replay::new(
            4,
            frames(&[
                (0.0, 0b000),
                (505.0, 0b001),
                (550.0, 0b000),
                (700.0, 0b010),
                (1_390.0, 0b000),
                (1_500.0, 0b000),
            ]),
        );

        let first = play(&chart, &replay);
        let second = play(&chart, &replay);
        assert_eq!(first, second);
    }

    #[test]
    fn play_all_frames_is_single_shot() {
        let chart = chart_4k(vec![HitObject::tap(0, 1_000.0)]);
        let replay = Replay::new(
            4,
            frames(&[(0.0, 0b0), (1_000.0, 0b1), (1_050.0, 0b0)]),
        );
        let mut player = VirtualReplayPlayer::new(&chart, &replay).unwrap();
        player.play_all_frames();
        let after_first = player.stats().to_vec();
        player.play_all_frames();
        assert_eq!(player.stats(), after_first.as_slice());
    }
}
