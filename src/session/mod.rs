mod gameplay_session;

pub use gameplay_session::{GameplaySession, JudgementObserver};
