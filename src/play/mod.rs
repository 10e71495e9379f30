mod hit_object_manager;
mod judgement;
mod score_processor;

pub use hit_object_manager::{HitObjectManager, ObjectState};
pub use judgement::{Judgement, JudgementWindows};
pub use score_processor::{MAX_SCORE, ScoreProcessor};
