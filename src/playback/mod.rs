pub mod commands;
pub mod engine;
pub mod hub;

pub use commands::{PlaybackCommand, PlaybackEvent, SurfaceNotice, SurfaceRole};
pub use engine::{PlaybackEngine, PlaybackHandle};
pub use hub::SurfaceHub;

/// Playback state
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PlaybackState {
    Idle,
    Running,
}

/// Extra delay after showing a word that contains a period
pub const PUNCTUATION_PAUSE_MS: u64 = 200;
