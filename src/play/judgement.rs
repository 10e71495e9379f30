use serde::{Deserialize, Serialize};

/// Accuracy tier assigned to one resolved hit object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Judgement {
    Marvelous,
    Perfect,
    Great,
    Good,
    Okay,
    Miss,
}

impl Judgement {
    /// Number of tiers.
    pub const COUNT: usize = 6;

    /// Returns the index for this tier (for array indexing).
    pub fn index(self) -> usize {
        match self {
            Self::Marvelous => 0,
            Self::Perfect => 1,
            Self::Great => 2,
            Self::Good => 3,
            Self::Okay => 4,
            Self::Miss => 5,
        }
    }

    /// Returns true if this tier continues the combo streak.
    pub fn continues_combo(self) -> bool {
        !matches!(self, Self::Okay | Self::Miss)
    }

    /// Accuracy weight in percent.
    pub fn accuracy_weight(self) -> f64 {
        match self {
            Self::Marvelous => 100.0,
            Self::Perfect => 98.25,
            Self::Great => 65.0,
            Self::Good => 25.0,
            Self::Okay => -100.0,
            Self::Miss => -50.0,
        }
    }
}

/// Per-tier timing windows in milliseconds.
///
/// A press offset within `marvelous` of the object grades Marvelous, within
/// `perfect` grades Perfect, and so on out to `miss`, beyond which the press
/// does not reach the object at all. Hold releases judge against the same
/// cascade widened by `release_multiplier`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JudgementWindows {
    pub marvelous: f64,
    pub perfect: f64,
    pub great: f64,
    pub good: f64,
    pub okay: f64,
    pub miss: f64,
    pub release_multiplier: f64,
}

impl JudgementWindows {
    /// The standard window set.
    pub fn standard() -> Self {
        Self {
            marvelous: 18.0,
            perfect: 43.0,
            great: 76.0,
            good: 106.0,
            okay: 127.0,
            miss: 164.0,
            release_multiplier: 1.5,
        }
    }

    /// Scale every window by `factor`, keeping the release multiplier.
    pub fn scaled(&self, factor: f64) -> Self {
        Self {
            marvelous: self.marvelous * factor,
            perfect: self.perfect * factor,
            great: self.great * factor,
            good: self.good * factor,
            okay: self.okay * factor,
            miss: self.miss * factor,
            release_multiplier: self.release_multiplier,
        }
    }

    /// Classify a press offset. `None` when the press is outside every
    /// window and does not touch the object.
    pub fn judge_press(&self, diff_abs: f64) -> Option<Judgement> {
        if diff_abs <= self.marvelous {
            Some(Judgement::Marvelous)
        } else if diff_abs <= self.perfect {
            Some(Judgement::Perfect)
        } else if diff_abs <= self.great {
            Some(Judgement::Great)
        } else if diff_abs <= self.good {
            Some(Judgement::Good)
        } else if diff_abs <= self.okay {
            Some(Judgement::Okay)
        } else if diff_abs <= self.miss {
            Some(Judgement::Miss)
        } else {
            None
        }
    }

    /// Classify a hold release offset against the widened windows. `None`
    /// when the release is outside every widened window.
    pub fn judge_release(&self, diff_abs: f64) -> Option<Judgement> {
        self.scaled(self.release_multiplier).judge_press(diff_abs)
    }

    /// Width of the widest press window. A press beyond this can never
    /// reach an object, and an unhit object is resolvable once this much
    /// time has passed its start.
    pub fn miss_window(&self) -> f64 {
        self.miss
    }

    /// Width of the widest release window.
    pub fn release_window(&self) -> f64 {
        self.miss * self.release_multiplier
    }
}

impl Default for JudgementWindows {
    fn default() -> Self {
        Self::standard()
    }
}
