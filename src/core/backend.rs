//! Backend seams: renderer and ad provider traits plus the event channel.
//!
//! Backends may live on any thread. They never call into the player; they post
//! events through the [`EventSink`] handed to them, and the control thread
//! drains the channel with `PlayerController::pump`.
//!
//! Every sink is stamped with the session epoch it was created for. `reset`
//! bumps the epoch, so events still in flight from the previous session are
//! dropped on arrival instead of corrupting the new one.

use super::playback::PlaybackInput;
use super::playhead::ContentPlayhead;
use crossbeam_channel::{Receiver, Sender, TryRecvError, unbounded};
use log::trace;

/// Events the content renderer reports. Times are raw backend values in
/// seconds; NaN, infinite and negative values mean unknown.
#[derive(Debug, Clone, PartialEq)]
pub enum RendererEvent {
    Ready { total: f64 },
    BufferingStarted,
    BufferingEnded,
    TimeUpdated(f64),
    BufferedUpdated(f64),
    DurationChanged(f64),
    SeekCompleted,
    Ended,
    Failed(String),
}

impl From<RendererEvent> for PlaybackInput {
    fn from(ev: RendererEvent) -> Self {
        match ev {
            RendererEvent::Ready { total } => PlaybackInput::Ready { total: Some(total) },
            RendererEvent::BufferingStarted => PlaybackInput::BufferingStarted,
            RendererEvent::BufferingEnded => PlaybackInput::BufferingEnded,
            RendererEvent::TimeUpdated(t) => PlaybackInput::TimeUpdated(t),
            RendererEvent::BufferedUpdated(t) => PlaybackInput::BufferedUpdated(t),
            RendererEvent::DurationChanged(t) => PlaybackInput::DurationChanged(Some(t)),
            RendererEvent::SeekCompleted => PlaybackInput::SeekCompleted,
            RendererEvent::Ended => PlaybackInput::Ended,
            RendererEvent::Failed(reason) => PlaybackInput::Failed(reason),
        }
    }
}

/// Ad lifecycle events reported by the ad provider.
#[derive(Debug, Clone, PartialEq)]
pub enum AdEvent {
    /// Ad response parsed. `preroll` is true if a break is due before content.
    AdsLoaded { preroll: bool },
    AdBreakStarted,
    AdBreakEnded,
    AdBreakSkipped,
    AdRequestFailed(String),
    AdProgress { current: f64, duration: f64 },
    AdPaused,
    AdResumed,
    AdPlaybackFailed(String),
}

/// Anything a backend can post to the control thread.
#[derive(Debug, Clone, PartialEq)]
pub enum ControlEvent {
    Renderer(RendererEvent),
    Ad(AdEvent),
}

#[derive(Debug)]
pub(crate) struct Envelope {
    pub epoch: u64,
    pub event: ControlEvent,
}

/// Sending half handed to backends. Cheap to clone, usable from any thread.
#[derive(Debug, Clone)]
pub struct EventSink {
    tx: Sender<Envelope>,
    epoch: u64,
}

impl EventSink {
    /// Session epoch this sink belongs to.
    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    /// Post a renderer event. Returns false if the player is gone.
    pub fn renderer(&self, event: RendererEvent) -> bool {
        self.send(ControlEvent::Renderer(event))
    }

    /// Post an ad event. Returns false if the player is gone.
    pub fn ad(&self, event: AdEvent) -> bool {
        self.send(ControlEvent::Ad(event))
    }

    pub fn send(&self, event: ControlEvent) -> bool {
        let sent = self.tx.send(Envelope { epoch: self.epoch, event }).is_ok();
        if !sent {
            trace!("Event dropped, control queue closed");
        }
        sent
    }
}

/// Receiving half owned by the coordinator.
#[derive(Debug)]
pub(crate) struct ControlQueue {
    tx: Sender<Envelope>,
    rx: Receiver<Envelope>,
}

impl ControlQueue {
    pub fn new() -> Self {
        let (tx, rx) = unbounded();
        Self { tx, rx }
    }

    pub fn sink(&self, epoch: u64) -> EventSink {
        EventSink {
            tx: self.tx.clone(),
            epoch,
        }
    }

    /// Next queued envelope, without blocking.
    pub fn try_next(&self) -> Option<Envelope> {
        match self.rx.try_recv() {
            Ok(env) => Some(env),
            Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => None,
        }
    }

    pub fn len(&self) -> usize {
        self.rx.len()
    }
}

/// Media decode/render pipeline driving the content surface.
///
/// Commands are fire-and-forget; outcomes arrive as [`RendererEvent`]s through
/// the sink passed to `load`.
pub trait RendererBackend: Send {
    fn load(&mut self, url: &str, sink: EventSink);
    fn play(&mut self);
    fn pause(&mut self);
    fn seek(&mut self, t: f64);
    /// Drop the current stream and stop posting events for it.
    fn reset(&mut self);

    /// Pipeline clock, in seconds. NaN or negative when unknown.
    ///
    /// The player tracks time from events and reads this only when a break
    /// starts before the first `TimeUpdated`. Embedders may poll all three
    /// queries for diagnostics.
    fn current_time(&self) -> f64;
    fn total_time(&self) -> f64;
    fn buffered_time(&self) -> f64;
}

/// Third-party ad SDK.
///
/// The provider plays ads on its own surface and reports the break lifecycle
/// as [`AdEvent`]s. It can read the content playhead but never move it.
pub trait AdProvider: Send {
    fn request_ads(&mut self, tag: &str, playhead: ContentPlayhead, sink: EventSink);
    fn pause_ad(&mut self);
    fn resume_ad(&mut self);
    /// Content reached its end. Providers use this for post-rolls.
    fn content_completed(&mut self);
    /// Abandon the request and any running break.
    fn cancel(&mut self);
}
