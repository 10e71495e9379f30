use serde::{Deserialize, Serialize};

/// Pressed-key bit-set for one frame. Bit N is lane N; charts up to 32
/// lanes are representable, far beyond the shipped 4 and 7 key modes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct KeyPressState(u32);

impl KeyPressState {
    /// No keys held.
    pub const EMPTY: Self = Self(0);

    /// Build from a raw bit pattern.
    pub fn from_bits(bits: u32) -> Self {
        Self(bits)
    }

    /// The raw bit pattern.
    pub fn bits(self) -> u32 {
        self.0
    }

    /// Copy with `lane` pressed.
    pub fn with_lane(self, lane: usize) -> Self {
        Self(self.0 | (1 << lane))
    }

    /// Copy with `lane` released.
    pub fn without_lane(self, lane: usize) -> Self {
        Self(self.0 & !(1 << lane))
    }

    /// Whether `lane` is held in this state.
    pub fn is_pressed(self, lane: usize) -> bool {
        self.0 & (1 << lane) != 0
    }

    /// Whether no key is held.
    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Lane indices held in this state, ascending.
    pub fn active_lanes(self, key_count: usize) -> impl Iterator<Item = usize> {
        (0..key_count).filter(move |lane| self.is_pressed(*lane))
    }
}

/// One recorded input sample.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ReplayFrame {
    /// Wall clock at capture. Informational only, never judged against.
    #[serde(default)]
    pub capture_time_ms: f64,
    /// Position in the song's timeline. Non-decreasing across a replay.
    pub time_ms: f64,
    /// Cached delta since the previous frame. Recomputable.
    #[serde(default)]
    pub delta_ms: f64,
    /// Key state at this instant.
    pub keys: KeyPressState,
}

impl ReplayFrame {
    /// Create a frame with no capture timestamp.
    pub fn new(time_ms: f64, keys: KeyPressState) -> Self {
        Self {
            capture_time_ms: 0.0,
            time_ms,
            delta_ms: 0.0,
            keys,
        }
    }
}
