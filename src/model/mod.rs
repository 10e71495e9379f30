// Chart object model consumed by play sessions.

pub mod chart;
pub mod hit_object;
pub mod timing;

pub use chart::Chart;
pub use hit_object::HitObject;
pub use timing::{SNAP_DIVISORS, TimingPoint, beat_snap_index, timing_point_at};
