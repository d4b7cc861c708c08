//! Outward notifications emitted on the player's event bus.

use super::error::PlayerError;
use super::playback::PlaybackState;

// === Playback ===

/// Unified playback state changed (content or ad, whichever owns the renderer).
#[derive(Clone, Debug, PartialEq)]
pub struct PlaybackStateChanged {
    pub from: PlaybackState,
    pub to: PlaybackState,
}

/// Content media time, fired on every backend tick.
#[derive(Clone, Debug, PartialEq)]
pub struct CurrentTimeChanged(pub f64);

/// Content duration changed. `None` for live or not-yet-known streams.
#[derive(Clone, Debug, PartialEq)]
pub struct TotalTimeChanged(pub Option<f64>);

#[derive(Clone, Debug, PartialEq)]
pub struct BufferedTimeChanged(pub f64);

/// Why content playback is finishing.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FinishReason {
    PlaybackEnded,
    PlaybackError,
}

/// Fired right before the state switches to `Finished` or `Error`.
#[derive(Clone, Debug, PartialEq)]
pub struct WillFinish(pub FinishReason);

/// Fired right after the state switched to `Finished` or `Error`.
#[derive(Clone, Debug, PartialEq)]
pub struct DidFinish(pub FinishReason);

/// Renderer failure. Re-emitted for every intent issued while in `Error`.
#[derive(Clone, Debug, PartialEq)]
pub struct PlaybackFailed(pub PlayerError);

#[derive(Clone, Debug, PartialEq)]
pub struct DidMinimize;

// === Controls overlay ===

#[derive(Clone, Debug, PartialEq)]
pub struct ControlsWillShow;

#[derive(Clone, Debug, PartialEq)]
pub struct ControlsDidShow;

#[derive(Clone, Debug, PartialEq)]
pub struct ControlsWillHide;

#[derive(Clone, Debug, PartialEq)]
pub struct ControlsDidHide;

/// A custom top-bar button was pressed.
#[derive(Clone, Debug, PartialEq)]
pub struct ActionButtonPressed(pub String);

// === Ads ===

#[derive(Clone, Debug, PartialEq)]
pub struct AdBreakStarted;

#[derive(Clone, Debug, PartialEq)]
pub struct AdBreakEnded {
    pub skipped: bool,
}

/// Ad request or ad playback failed; content continues regardless.
#[derive(Clone, Debug, PartialEq)]
pub struct AdError(pub PlayerError);
