use crate::model::Chart;
use crate::play::judgement::Judgement;
use crate::replay::JudgementStat;

/// Visual lifecycle state of one chart object.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObjectState {
    /// Not yet resolved; still falling toward the receptor.
    Upcoming,
    /// Hold head hit; the body is being held.
    Held,
    /// Fully resolved and gone from the playfield.
    Removed,
}

/// Tracks which objects are on screen, held or gone, plus receptor
/// highlights.
///
/// A weak consumer of the reconciliation step: it reacts to edge flags and
/// applied judgements but never drives scoring and never touches the
/// cursors.
#[derive(Debug)]
pub struct HitObjectManager {
    /// Lane per object, in chart order.
    object_lanes: Vec<usize>,
    /// Whether each object is a hold.
    holds: Vec<bool>,
    /// Start time per object, for visibility queries.
    start_times: Vec<f64>,
    states: Vec<ObjectState>,
    /// Receptor highlight per lane.
    lane_active: Vec<bool>,
}

impl HitObjectManager {
    /// Create a manager mirroring `chart`'s objects.
    pub fn new(chart: &Chart) -> Self {
        Self {
            object_lanes: chart.objects.iter().map(|o| o.lane).collect(),
            holds: chart.objects.iter().map(|o| o.is_hold()).collect(),
            start_times: chart.objects.iter().map(|o| o.start_time_ms).collect(),
            states: vec![ObjectState::Upcoming; chart.objects.len()],
            lane_active: vec![false; chart.key_count],
        }
    }

    /// React to a press edge: light the lane's receptor.
    pub fn on_press(&mut self, lane: usize) {
        if let Some(active) = self.lane_active.get_mut(lane) {
            *active = true;
        }
    }

    /// React to a release edge: dim the lane's receptor.
    pub fn on_release(&mut self, lane: usize) {
        if let Some(active) = self.lane_active.get_mut(lane) {
            *active = false;
        }
    }

    /// React to an applied judgement: move the object through its
    /// lifecycle.
    pub fn on_judgement(&mut self, stat: &JudgementStat) {
        let Some(state) = self.states.get_mut(stat.object_index) else {
            return;
        };
        if stat.release || !self.holds[stat.object_index] {
            *state = ObjectState::Removed;
        } else if stat.judgement == Judgement::Miss {
            // A dead head never enters the held phase; the tail entry
            // arrives separately and removes the object.
            *state = ObjectState::Upcoming;
        } else {
            *state = ObjectState::Held;
        }
    }

    /// Lifecycle state of one object.
    pub fn state(&self, object_index: usize) -> Option<ObjectState> {
        self.states.get(object_index).copied()
    }

    /// Whether the lane's receptor is lit.
    pub fn is_lane_active(&self, lane: usize) -> bool {
        self.lane_active.get(lane).copied().unwrap_or(false)
    }

    /// Object of the hold currently held in `lane`, if any.
    pub fn held_object_in_lane(&self, lane: usize) -> Option<usize> {
        self.states
            .iter()
            .enumerate()
            .find(|&(index, state)| {
                *state == ObjectState::Held && self.object_lanes[index] == lane
            })
            .map(|(index, _)| index)
    }

    /// Indices of unresolved objects starting inside the given window, for
    /// the playfield to draw.
    pub fn visible_objects(
        &self,
        from_ms: f64,
        to_ms: f64,
    ) -> impl Iterator<Item = usize> + '_ {
        self.states
            .iter()
            .enumerate()
            .filter(move |&(index, state)| {
                *state != ObjectState::Removed
                    && self.start_times[index] >= from_ms
                    && self.start_times[index] <= to_ms
            })
            .map(|(index, _)| index)
    }
}
