use serde::Serialize;

use crate::play::judgement::Judgement;

/// Standardized score for a flawless run.
pub const MAX_SCORE: u32 = 1_000_000;

/// Score tracker for a play session.
///
/// `calculate_score` is the single mutation point. It is called exactly once
/// per resolved hit-object entry, in time order, and has no idea whether the
/// judgement came from live input, a watched replay or autoplay. Identical
/// judgement sequences therefore produce identical accumulator states.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoreProcessor {
    counts: [u32; Judgement::COUNT],
    combo: u32,
    max_combo: u32,
    /// Expected length of the full judgement stream.
    total_entries: u32,
}

impl ScoreProcessor {
    /// Create a processor expecting `total_entries` judgements in total.
    pub fn new(total_entries: u32) -> Self {
        Self {
            counts: [0; Judgement::COUNT],
            combo: 0,
            max_combo: 0,
            total_entries,
        }
    }

    /// Apply one judgement to the accumulators.
    pub fn calculate_score(&mut self, judgement: Judgement) {
        self.counts[judgement.index()] += 1;

        if judgement.continues_combo() {
            self.combo += 1;
            if self.combo > self.max_combo {
                self.max_combo = self.combo;
            }
        } else {
            self.combo = 0;
        }
    }

    /// Reset every accumulator to its initial value.
    pub fn reset(&mut self) {
        self.counts = [0; Judgement::COUNT];
        self.combo = 0;
        self.max_combo = 0;
    }

    /// Count for a single tier.
    pub fn count(&self, judgement: Judgement) -> u32 {
        self.counts[judgement.index()]
    }

    /// Per-tier counts, indexed by `Judgement::index`.
    pub fn counts(&self) -> &[u32; Judgement::COUNT] {
        &self.counts
    }

    /// Current combo streak.
    pub fn combo(&self) -> u32 {
        self.combo
    }

    /// Longest combo streak so far.
    pub fn max_combo(&self) -> u32 {
        self.max_combo
    }

    /// Number of judgements applied so far.
    pub fn judged_count(&self) -> u32 {
        self.counts.iter().sum()
    }

    /// Expected length of the full judgement stream.
    pub fn total_entries(&self) -> u32 {
        self.total_entries
    }

    /// Weighted accuracy in percent, clamped at zero.
    pub fn accuracy(&self) -> f64 {
        let judged = self.judged_count();
        if judged == 0 {
            return 100.0;
        }
        let weighted: f64 = self
            .counts
            .iter()
            .zip(ALL_TIERS)
            .map(|(count, tier)| f64::from(*count) * tier.accuracy_weight())
            .sum();
        (weighted / (f64::from(judged) * 100.0) * 100.0).max(0.0)
    }

    /// Standardized score, scaled so a flawless run reaches [`MAX_SCORE`].
    /// Negative-weight tiers contribute nothing rather than subtracting.
    pub fn score(&self) -> u32 {
        if self.total_entries == 0 {
            return 0;
        }
        let earned: f64 = self
            .counts
            .iter()
            .zip(ALL_TIERS)
            .map(|(count, tier)| f64::from(*count) * tier.accuracy_weight().max(0.0))
            .sum();
        let possible = f64::from(self.total_entries) * 100.0;
        (f64::from(MAX_SCORE) * earned / possible).round() as u32
    }
}

const ALL_TIERS: [Judgement; Judgement::COUNT] = [
    Judgement::Marvelous,
    Judgement::Perfect,
    Judgement::Great,
    Judgement::Good,
    Judgement::Okay,
    Judgement::Miss,
];
