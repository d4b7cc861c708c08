//! Player core - playback machine, overlay, ad coordination
//!
//! These modules form the control surface, independent of any UI toolkit
//! or media pipeline.

pub mod auto_hide;
pub mod backend;
pub mod controls;
pub mod coordinator;
pub mod error;
pub mod event_bus;
pub mod overlay;
pub mod playback;
pub mod player_events;
pub mod playhead;

// Re-exports for convenience
pub use backend::{AdEvent, AdProvider, ControlEvent, EventSink, RendererBackend, RendererEvent};
pub use controls::{ActionButton, ControlsModel, PrimaryButton};
pub use coordinator::{AdPhase, AdProgress, PlayerController};
pub use error::PlayerError;
pub use event_bus::EventBus;
pub use overlay::{ChromeState, OverlayController};
pub use playback::{PlaybackMachine, PlaybackState, TimelinePosition};
pub use playhead::ContentPlayhead;
