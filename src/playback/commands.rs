use tokio::sync::mpsc;

use crate::core::TokenSequence;

/// Which surface issued a command or receives delivery
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SurfaceRole {
    /// Main control window
    Primary,
    /// Word display window
    Secondary,
}

/// Control commands accepted by the playback engine
#[derive(Debug)]
pub enum PlaybackCommand {
    /// Replace the held token sequence without touching playback state
    Load { sequence: TokenSequence },

    /// Load a sequence and begin playback at the given per-word rate
    Start {
        sequence: TokenSequence,
        rate_ms: u64,
        origin: SurfaceRole,
    },

    /// Begin playback over the already-held sequence at the current rate
    Resume { origin: SurfaceRole },

    /// Halt playback, keeping the cursor for a later resume
    Stop { origin: SurfaceRole },

    /// Change the per-word delay used for future scheduling
    SetRate { rate_ms: u64 },

    /// Register a surface for event delivery
    Attach {
        role: SurfaceRole,
        events: mpsc::UnboundedSender<PlaybackEvent>,
        notices: Option<mpsc::UnboundedSender<SurfaceNotice>>,
    },

    /// Remove a surface from delivery
    Detach { role: SurfaceRole },
}

/// Events emitted by the engine, delivered to every attached surface in
/// emission order
#[derive(Debug, Clone, PartialEq)]
pub enum PlaybackEvent {
    /// Playback entered Running at the given per-word rate
    Started { rate_ms: u64 },

    /// A word is being shown
    Word {
        text: String,
        index: usize,
        total: usize,
    },

    /// The sequence ran out; playback returned to Idle
    Finished,

    /// Playback was halted by a stop command
    Stopped,
}

/// Direct notification to the primary surface when the secondary surface
/// drives playback, so its controls track remote start/stop independent of
/// the event stream
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SurfaceNotice {
    Started,
    Stopped,
}
