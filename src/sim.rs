//! Scriptable in-process backends.
//!
//! Each sim is a cheap handle around shared state: give one clone to the
//! player as its backend and keep another to inspect recorded calls and to
//! post events as if they came from a real pipeline or ad SDK.

use crate::core::backend::{AdEvent, AdProvider, EventSink, RendererBackend, RendererEvent};
use crate::core::playhead::ContentPlayhead;
use log::{debug, warn};
use std::sync::{Arc, Mutex, MutexGuard};

/// Commands received by [`SimRenderer`].
#[derive(Debug, Clone, PartialEq)]
pub enum RendererCall {
    Load(String),
    Play,
    Pause,
    Seek(f64),
    Reset,
}

/// Commands received by [`SimAdProvider`].
#[derive(Debug, Clone, PartialEq)]
pub enum AdCall {
    RequestAds(String),
    PauseAd,
    ResumeAd,
    ContentCompleted,
    Cancel,
}

#[derive(Debug, Default)]
struct RendererState {
    calls: Vec<RendererCall>,
    sink: Option<EventSink>,
    current: f64,
    total: f64,
    buffered: f64,
}

#[derive(Debug, Clone, Default)]
pub struct SimRenderer {
    inner: Arc<Mutex<RendererState>>,
}

impl SimRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, RendererState> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Post an event through the sink of the last `load`.
    /// Returns false if nothing is loaded or the player is gone.
    pub fn emit(&self, event: RendererEvent) -> bool {
        let mut state = self.state();
        match &event {
            RendererEvent::TimeUpdated(t) => state.current = *t,
            RendererEvent::BufferedUpdated(t) => state.buffered = *t,
            RendererEvent::Ready { total } | RendererEvent::DurationChanged(total) => state.total = *total,
            _ => {}
        }
        match &state.sink {
            Some(sink) => sink.renderer(event),
            None => {
                warn!("SimRenderer: {:?} emitted before load", event);
                false
            }
        }
    }

    pub fn calls(&self) -> Vec<RendererCall> {
        self.state().calls.clone()
    }

    /// Recorded calls since the previous `take_calls`.
    pub fn take_calls(&self) -> Vec<RendererCall> {
        std::mem::take(&mut self.state().calls)
    }

    /// Sink handed over by the most recent `load`, if any.
    pub fn sink(&self) -> Option<EventSink> {
        self.state().sink.clone()
    }
}

impl RendererBackend for SimRenderer {
    fn load(&mut self, url: &str, sink: EventSink) {
        debug!("SimRenderer: load {} (epoch {})", url, sink.epoch());
        let mut state = self.state();
        state.calls.push(RendererCall::Load(url.to_string()));
        state.sink = Some(sink);
        state.current = 0.0;
        state.total = f64::NAN;
        state.buffered = 0.0;
    }

    fn play(&mut self) {
        self.state().calls.push(RendererCall::Play);
    }

    fn pause(&mut self) {
        self.state().calls.push(RendererCall::Pause);
    }

    fn seek(&mut self, t: f64) {
        let mut state = self.state();
        state.calls.push(RendererCall::Seek(t));
        state.current = t;
    }

    fn reset(&mut self) {
        let mut state = self.state();
        state.calls.push(RendererCall::Reset);
        state.sink = None;
    }

    fn current_time(&self) -> f64 {
        self.state().current
    }

    fn total_time(&self) -> f64 {
        self.state().total
    }

    fn buffered_time(&self) -> f64 {
        self.state().buffered
    }
}

#[derive(Debug, Default)]
struct AdState {
    calls: Vec<AdCall>,
    sink: Option<EventSink>,
    playhead: Option<ContentPlayhead>,
}

#[derive(Debug, Clone, Default)]
pub struct SimAdProvider {
    inner: Arc<Mutex<AdState>>,
}

impl SimAdProvider {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, AdState> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Post an event through the sink of the last `request_ads`.
    pub fn emit(&self, event: AdEvent) -> bool {
        match &self.state().sink {
            Some(sink) => sink.ad(event),
            None => {
                warn!("SimAdProvider: {:?} emitted without a request", event);
                false
            }
        }
    }

    pub fn calls(&self) -> Vec<AdCall> {
        self.state().calls.clone()
    }

    /// Content time as seen by the provider.
    pub fn playhead_time(&self) -> Option<f64> {
        self.state().playhead.as_ref().and_then(ContentPlayhead::current_time)
    }

    pub fn sink(&self) -> Option<EventSink> {
        self.state().sink.clone()
    }
}

impl AdProvider for SimAdProvider {
    fn request_ads(&mut self, tag: &str, playhead: ContentPlayhead, sink: EventSink) {
        debug!("SimAdProvider: request {} (epoch {})", tag, sink.epoch());
        let mut state = self.state();
        state.calls.push(AdCall::RequestAds(tag.to_string()));
        state.sink = Some(sink);
        state.playhead = Some(playhead);
    }

    fn pause_ad(&mut self) {
        self.state().calls.push(AdCall::PauseAd);
    }

    fn resume_ad(&mut self) {
        self.state().calls.push(AdCall::ResumeAd);
    }

    fn content_completed(&mut self) {
        self.state().calls.push(AdCall::ContentCompleted);
    }

    fn cancel(&mut self) {
        let mut state = self.state();
        state.calls.push(AdCall::Cancel);
        state.sink = None;
    }
}
