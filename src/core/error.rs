//! Error taxonomy for the player core.
//!
//! Only renderer failures are fatal to a session. Ad failures are recovered
//! locally by falling back to content, and out-of-range seeks are clamped
//! instead of being reported at all.

/// Errors surfaced by the player core.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PlayerError {
    /// Backend failed to load or decode the content stream.
    #[error("renderer failed: {0}")]
    Renderer(String),

    /// Ad request or ad response parsing failed.
    #[error("ad request failed: {0}")]
    AdRequest(String),

    /// Ad started but could not be played to completion.
    #[error("ad playback failed: {0}")]
    AdPlayback(String),

    /// `load_stream` was called without a URL.
    #[error("stream url is empty")]
    EmptyStreamUrl,
}

impl PlayerError {
    /// True if the error ends the current session (only `reset` recovers).
    pub fn is_fatal(&self) -> bool {
        matches!(self, PlayerError::Renderer(_))
    }
}
