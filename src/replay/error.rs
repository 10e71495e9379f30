use thiserror::Error;

/// Fatal configuration conditions raised once at session construction.
/// Nothing in this module errors mid-tick; exhausted cursors are steady
/// no-op states.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ReplayError {
    #[error("chart has {chart_keys} lanes but the replay was recorded with {replay_keys}")]
    ConfigurationMismatch {
        chart_keys: usize,
        replay_keys: usize,
    },

    #[error("replay frame {index} moves backwards in song time")]
    UnorderedFrames { index: usize },
}
