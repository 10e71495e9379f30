use tracing::{debug, info};

use crate::model::Chart;
use crate::play::{HitObjectManager, ScoreProcessor};
use crate::replay::{
    JudgementStat, Replay, ReplayError, ReplayInputManager, SessionMode, VirtualReplayPlayer,
};

/// Callback invoked after each judgement is applied to the live score.
pub type JudgementObserver = Box<dyn FnMut(&JudgementStat)>;

/// One gameplay or replay-watching session.
///
/// Construction validates the configuration and precomputes the judgement
/// stream; from then on the render loop drives everything through
/// [`tick`](Self::tick) with the advancing audio position. Abandoning the
/// session is just dropping it.
pub struct GameplaySession {
    chart: Chart,
    replay: Replay,
    stats: Vec<JudgementStat>,
    score: ScoreProcessor,
    input: ReplayInputManager,
    objects: HitObjectManager,
    mode: SessionMode,
    observer: Option<JudgementObserver>,
}

impl std::fmt::Debug for GameplaySession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GameplaySession")
            .field("chart", &self.chart)
            .field("replay", &self.replay)
            .field("stats", &self.stats)
            .field("score", &self.score)
            .field("input", &self.input)
            .field("objects", &self.objects)
            .field("mode", &self.mode)
            .field("observer", &self.observer.as_ref().map(|_| "<closure>"))
            .finish()
    }
}

impl GameplaySession {
    /// Create a session.
    ///
    /// In autoplay mode the supplied replay is ignored and a flawless one is
    /// synthesized from the chart. Lane-count mismatches and unordered
    /// frames fail here, before any frame is processed; nothing fails
    /// mid-tick.
    pub fn new(chart: Chart, replay: Replay, mode: SessionMode) -> Result<Self, ReplayError> {
        let replay = if mode.autoplay {
            Replay::perfect(&chart)
        } else {
            replay
        };

        let mut player = VirtualReplayPlayer::new(&chart, &replay)?;
        player.play_all_frames();
        let (stats, precomputed_score) = player.into_parts();
        debug!(
            objects = chart.object_count(),
            frames = replay.len(),
            stats = stats.len(),
            accuracy = precomputed_score.accuracy(),
            "session precomputation complete"
        );

        let score = ScoreProcessor::new(chart.judgement_count() as u32);
        let input = ReplayInputManager::new(chart.key_count, mode);
        let objects = HitObjectManager::new(&chart);

        Ok(Self {
            chart,
            replay,
            stats,
            score,
            input,
            objects,
            mode,
            observer: None,
        })
    }

    /// Register the judgement-applied observer for the presentation layer.
    pub fn set_observer(&mut self, observer: JudgementObserver) {
        self.observer = Some(observer);
    }

    /// Advance one render tick at the given audio position.
    ///
    /// Applies due judgements to the live score, derives edge events, feeds
    /// both to the hit object manager, notifies the observer and clears the
    /// step-scoped edge flags.
    pub fn tick(&mut self, audio_position_ms: f64) {
        let mut applied: Vec<JudgementStat> = Vec::new();
        self.input.handle_input(
            &self.replay,
            &self.stats,
            audio_position_ms,
            &mut self.score,
            &mut |stat| applied.push(*stat),
        );

        for lane in 0..self.chart.key_count {
            if self.input.unique_presses()[lane] {
                self.objects.on_press(lane);
            }
            if self.input.unique_releases()[lane] {
                self.objects.on_release(lane);
            }
        }
        self.input.clear_unique_flags();

        for stat in &applied {
            self.objects.on_judgement(stat);
            if let Some(observer) = self.observer.as_mut() {
                observer(stat);
            }
        }
    }

    /// Relocate the replay cursor after a seek.
    pub fn skip_to(&mut self, target_ms: f64) {
        self.input.handle_skip(&self.replay, target_ms);
    }

    /// Whether every statistic has been applied and every frame consumed.
    pub fn is_finished(&self) -> bool {
        self.input.applied_stat_count() >= self.stats.len()
            && (!self.mode.consumes_replay() || self.input.current_frame() >= self.replay.len())
    }

    /// The chart being played.
    pub fn chart(&self) -> &Chart {
        &self.chart
    }

    /// The replay driving this session.
    pub fn replay(&self) -> &Replay {
        &self.replay
    }

    /// The precomputed judgement stream.
    pub fn statistics(&self) -> &[JudgementStat] {
        &self.stats
    }

    /// The live score accumulators.
    pub fn score(&self) -> &ScoreProcessor {
        &self.score
    }

    /// The hit object lifecycle state.
    pub fn objects(&self) -> &HitObjectManager {
        &self.objects
    }

    /// The session mode.
    pub fn mode(&self) -> SessionMode {
        self.mode
    }

    /// Log a one-line summary of the finished session.
    pub fn log_summary(&self) {
        info!(
            score = self.score.score(),
            accuracy = self.score.accuracy(),
            max_combo = self.score.max_combo(),
            "session complete"
        );
    }
}
