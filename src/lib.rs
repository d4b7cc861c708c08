//! mediaframe - embeddable video player control surface
//!
//! Re-exports all modules for use by binary targets.

// Core (playback, overlay, ads, events)
pub mod core;

// App modules
pub mod cli;
pub mod config;
pub mod sim;

// Re-export commonly used types from core
pub use crate::core::event_bus::{BoxedEvent, EventBus, SubscriptionId, downcast_event};
pub use crate::core::{AdEvent, AdProvider, PlaybackState, PlayerController, PlayerError, RendererBackend, RendererEvent};
pub use config::PlayerSettings;
