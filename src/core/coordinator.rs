//! Top-level player: arbitrates content and ads over one renderer.
//!
//! `PlayerController` owns the playback machine, the overlay controller and
//! the ad session. It is the only place that talks to the backends and the
//! only emitter on the event bus, so consumers see one coherent stream of
//! state, time and controls notifications.
//!
//! # Ad breaks
//!
//! While a break is active the content machine is frozen: renderer events are
//! deferred, the content playhead stops moving and `playback_state()` reports
//! the ad's state instead. When the break ends, content resumes only if it was
//! playing (or about to autoplay) before, then deferred events are replayed in
//! arrival order.
//!
//! # Threading
//!
//! Everything here runs on the control thread. Backends post events through
//! an [`EventSink`]; call [`PlayerController::pump`] to apply them.

use super::backend::{AdEvent, AdProvider, ControlEvent, ControlQueue, EventSink, RendererBackend, RendererEvent};
use super::controls::ControlsModel;
use super::error::PlayerError;
use super::event_bus::EventBus;
use super::overlay::{OverlayController, OverlayEffect};
use super::playback::{PlaybackEffect, PlaybackInput, PlaybackMachine, PlaybackState, RendererCommand, media_time};
use super::player_events::*;
use super::playhead::ContentPlayhead;
use crate::config::PlayerSettings;
use log::{debug, info, trace, warn};
use std::time::Instant;

/// Where the ad lifecycle of the current session stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdPhase {
    /// No ad work for this session.
    Idle,
    /// Ads requested, content autoplay held until the response resolves.
    Pending,
    /// Ads loaded, a break may start at any time.
    Armed,
    /// A break owns the renderer surface.
    Active,
}

/// Progress of the running ad, in seconds.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AdProgress {
    pub current: f64,
    pub duration: f64,
}

#[derive(Debug, Clone, PartialEq)]
struct AdBreak {
    /// Content was playing or about to autoplay when the break began.
    resume_playing: bool,
    frozen_time: Option<f64>,
    /// Unified state while the ad plays.
    state: PlaybackState,
    progress: Option<AdProgress>,
}

#[derive(Debug, Clone, PartialEq)]
enum AdSession {
    Idle,
    Pending { autoplay: bool },
    Armed,
    Active(AdBreak),
}

pub struct PlayerController {
    settings: PlayerSettings,
    bus: EventBus,
    renderer: Box<dyn RendererBackend>,
    ad_provider: Option<Box<dyn AdProvider>>,
    machine: PlaybackMachine,
    overlay: OverlayController,
    ads: AdSession,
    playhead: ContentPlayhead,
    queue: ControlQueue,
    epoch: u64,
    /// Renderer events that arrived during an ad break.
    deferred: Vec<RendererEvent>,
}

impl std::fmt::Debug for PlayerController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PlayerController")
            .field("state", &self.playback_state())
            .field("content_state", &self.machine.state())
            .field("ad_phase", &self.ad_phase())
            .field("epoch", &self.epoch)
            .field("deferred", &self.deferred.len())
            .finish()
    }
}

impl PlayerController {
    pub fn new(renderer: Box<dyn RendererBackend>, settings: PlayerSettings) -> Self {
        let overlay = OverlayController::new(&settings);
        Self {
            settings,
            bus: EventBus::new(),
            renderer,
            ad_provider: None,
            machine: PlaybackMachine::new(),
            overlay,
            ads: AdSession::Idle,
            playhead: ContentPlayhead::new(),
            queue: ControlQueue::new(),
            epoch: 0,
            deferred: Vec::new(),
        }
    }

    /// Notification bus. Subscribe for immediate callbacks or `poll` in batches.
    pub fn events(&self) -> &EventBus {
        &self.bus
    }

    pub fn settings(&self) -> &PlayerSettings {
        &self.settings
    }

    /// Sink for the current session. Events posted after `reset` are dropped.
    pub fn sink(&self) -> EventSink {
        self.queue.sink(self.epoch)
    }

    /// Install the ad SDK. Ads are requested from it on the next `load_stream`.
    ///
    /// Replacing a provider mid-session cancels the old one's work: a held
    /// autoplay is released and a running break ends as if it had finished.
    pub fn register_ad_provider(&mut self, provider: Box<dyn AdProvider>) {
        let Some(mut old) = self.ad_provider.replace(provider) else {
            return;
        };
        info!("Replacing ad provider in {:?}", self.ad_phase());
        if self.ads == AdSession::Idle {
            return;
        }
        old.cancel();
        match self.ads {
            AdSession::Pending { autoplay } => {
                self.ads = AdSession::Idle;
                if autoplay {
                    self.run(PlaybackInput::Play);
                }
            }
            AdSession::Active(_) => {
                self.end_break(false);
                self.ads = AdSession::Idle;
            }
            AdSession::Armed | AdSession::Idle => self.ads = AdSession::Idle,
        }
    }

    // ========== Session ==========

    /// Start a new session. An already loaded session is reset first.
    ///
    /// With an ad tag and a registered provider, ads are requested while
    /// content loads and autoplay is held until the ad response resolves.
    pub fn load_stream(&mut self, url: &str, ad_tag: Option<&str>) -> Result<(), PlayerError> {
        let url = url.trim();
        if url.is_empty() {
            return Err(PlayerError::EmptyStreamUrl);
        }
        if self.machine.state() != PlaybackState::Unknown {
            self.reset();
        }

        info!("Loading stream {}", url);
        self.run(PlaybackInput::Load(url.to_string()));

        let tag = ad_tag.map(str::trim).filter(|t| !t.is_empty());
        if let Some(tag) = tag
            && let Some(provider) = self.ad_provider.as_mut()
        {
            info!("Requesting ads: {}", tag);
            self.ads = AdSession::Pending {
                autoplay: self.settings.autoplay,
            };
            provider.request_ads(tag, self.playhead.clone(), self.queue.sink(self.epoch));
        } else {
            if let Some(tag) = tag {
                warn!("Ad tag {} ignored, no ad provider registered", tag);
            }
            self.start_content();
        }
        Ok(())
    }

    /// Drop the session: cancel ad work, reset the renderer, forget queued
    /// events and start over with fresh machines.
    pub fn reset(&mut self) {
        info!("Resetting player session (epoch {} -> {})", self.epoch, self.epoch + 1);
        self.epoch += 1;
        self.renderer.reset();
        if self.ads != AdSession::Idle
            && let Some(provider) = self.ad_provider.as_mut()
        {
            provider.cancel();
        }
        self.ads = AdSession::Idle;
        self.deferred.clear();
        self.machine = PlaybackMachine::new();
        self.overlay = OverlayController::new(&self.settings);
        self.playhead = ContentPlayhead::new();
    }

    // ========== Intents ==========

    pub fn play(&mut self) {
        match &mut self.ads {
            AdSession::Active(_) => {
                if let Some(provider) = self.ad_provider.as_mut() {
                    provider.resume_ad();
                }
            }
            AdSession::Pending { autoplay } => {
                debug!("Play held until the ad request resolves");
                *autoplay = true;
            }
            AdSession::Idle | AdSession::Armed => self.run(PlaybackInput::Play),
        }
    }

    pub fn pause(&mut self) {
        match &mut self.ads {
            AdSession::Active(_) => {
                if let Some(provider) = self.ad_provider.as_mut() {
                    provider.pause_ad();
                }
            }
            AdSession::Pending { autoplay } => {
                *autoplay = false;
                self.run(PlaybackInput::Pause);
            }
            AdSession::Idle | AdSession::Armed => self.run(PlaybackInput::Pause),
        }
    }

    pub fn replay(&mut self) {
        if self.is_ad_displayed() {
            debug!("Replay ignored during an ad break");
            return;
        }
        self.run(PlaybackInput::Replay);
    }

    /// Seek content. Out-of-range targets are clamped; ignored during ads.
    pub fn seek(&mut self, t: f64) {
        if self.is_ad_displayed() {
            debug!("Seek to {} ignored during an ad break", t);
            return;
        }
        self.run(PlaybackInput::Seek(t));
    }

    pub fn minimize(&mut self) {
        info!("Player minimized");
        self.bus.emit(DidMinimize);
    }

    // ========== Controls ==========

    pub fn start_scrubbing(&mut self) {
        let fx = self.overlay.start_scrubbing(Instant::now());
        self.emit_overlay(fx);
    }

    pub fn end_scrubbing(&mut self) {
        self.overlay.end_scrubbing(Instant::now());
    }

    pub fn set_controls_visibility(&mut self, visible: bool, animated: bool) {
        let now = Instant::now();
        let fx = if visible {
            self.overlay.show(animated, now)
        } else {
            self.overlay.hide(animated, now)
        };
        self.emit_overlay(fx);
    }

    pub fn toggle_controls(&mut self) {
        let fx = self.overlay.toggle(Instant::now());
        self.emit_overlay(fx);
    }

    /// User activity on the surface keeps the controls up a little longer.
    pub fn reset_auto_hide_timer(&mut self) {
        self.overlay.reset_auto_hide_timer(Instant::now());
    }

    pub fn set_auto_hide_enabled(&mut self, enabled: bool) {
        self.overlay.set_auto_hide_enabled(enabled, Instant::now());
    }

    pub fn set_title(&mut self, title: Option<String>) {
        self.overlay.controls_mut().set_title(title);
    }

    pub fn set_logo(&mut self, logo: Option<String>) {
        self.overlay.controls_mut().set_logo(logo);
    }

    pub fn add_action_button(&mut self, name: impl Into<String>, image: impl Into<String>) {
        self.overlay.controls_mut().add_action_button(name, image);
    }

    /// Returns false if the button is unknown or controls are suppressed by an ad.
    pub fn press_action_button(&mut self, name: &str) -> bool {
        if !self.overlay.controls_interactive() {
            debug!("Action button {} ignored during an ad break", name);
            return false;
        }
        if !self.overlay.controls().has_action_button(name) {
            warn!("Unknown action button {}", name);
            return false;
        }
        self.bus.emit(ActionButtonPressed(name.to_string()));
        true
    }

    // ========== Event loop ==========

    pub fn tick(&mut self) {
        self.tick_at(Instant::now());
    }

    /// Drive overlay animations and auto-hide.
    pub fn tick_at(&mut self, now: Instant) {
        let fx = self.overlay.tick_at(now);
        self.emit_overlay(fx);
    }

    /// Backend events waiting for the next `pump`, stale ones included.
    pub fn pending_events(&self) -> usize {
        self.queue.len()
    }

    /// Apply every queued backend event. Returns how many were applied.
    pub fn pump(&mut self) -> usize {
        let mut applied = 0;
        while let Some(env) = self.queue.try_next() {
            if env.epoch != self.epoch {
                trace!("Discarding {:?} from stale epoch {}", env.event, env.epoch);
                continue;
            }
            match env.event {
                ControlEvent::Renderer(ev) => self.handle_renderer_event(ev),
                ControlEvent::Ad(ev) => self.handle_ad_event(ev),
            }
            applied += 1;
        }
        applied
    }

    pub fn handle_renderer_event(&mut self, event: RendererEvent) {
        if self.is_ad_displayed() {
            trace!("Deferring {:?} until the ad break ends", event);
            // Only the latest of a run of clock updates matters
            let coalesced = match (self.deferred.last_mut(), &event) {
                (Some(RendererEvent::TimeUpdated(t)), RendererEvent::TimeUpdated(next))
                | (Some(RendererEvent::BufferedUpdated(t)), RendererEvent::BufferedUpdated(next)) => {
                    *t = *next;
                    true
                }
                _ => false,
            };
            if !coalesced {
                self.deferred.push(event);
            }
            return;
        }
        self.run(event.into());
    }

    pub fn handle_ad_event(&mut self, event: AdEvent) {
        trace!("Ad event {:?} in {:?}", event, self.ad_phase());
        match event {
            AdEvent::AdsLoaded { preroll } => self.ads_loaded(preroll),
            AdEvent::AdBreakStarted => self.begin_break(),
            AdEvent::AdBreakEnded => self.end_break(false),
            AdEvent::AdBreakSkipped => self.end_break(true),
            AdEvent::AdRequestFailed(reason) => self.ad_request_failed(reason),
            AdEvent::AdProgress { current, duration } => {
                if let AdSession::Active(brk) = &mut self.ads {
                    brk.progress = Some(AdProgress { current, duration });
                }
            }
            AdEvent::AdPaused => self.set_ad_state(PlaybackState::Paused),
            AdEvent::AdResumed => self.set_ad_state(PlaybackState::Playing),
            AdEvent::AdPlaybackFailed(reason) => {
                let err = PlayerError::AdPlayback(reason);
                warn!("{}, returning to content", err);
                self.bus.emit(AdError(err));
                if self.is_ad_displayed() {
                    self.end_break(false);
                }
            }
        }
    }

    // ========== Queries ==========

    /// Unified state: the ad's while a break is active, content's otherwise.
    pub fn playback_state(&self) -> PlaybackState {
        match &self.ads {
            AdSession::Active(brk) => brk.state,
            _ => self.machine.state(),
        }
    }

    pub fn content_state(&self) -> PlaybackState {
        self.machine.state()
    }

    /// Content time. Frozen at the pre-break position while an ad plays.
    pub fn current_time(&self) -> Option<f64> {
        match &self.ads {
            AdSession::Active(brk) => brk.frozen_time,
            _ => self.machine.position().current(),
        }
    }

    pub fn total_time(&self) -> Option<f64> {
        self.machine.position().total()
    }

    pub fn buffered_time(&self) -> Option<f64> {
        let pos = self.machine.position();
        match (pos.buffered(), pos.current()) {
            (Some(b), Some(cur)) => Some(b.max(cur)),
            (b, _) => b,
        }
    }

    pub fn is_ad_displayed(&self) -> bool {
        matches!(self.ads, AdSession::Active(_))
    }

    pub fn ad_phase(&self) -> AdPhase {
        match self.ads {
            AdSession::Idle => AdPhase::Idle,
            AdSession::Pending { .. } => AdPhase::Pending,
            AdSession::Armed => AdPhase::Armed,
            AdSession::Active(_) => AdPhase::Active,
        }
    }

    pub fn ad_progress(&self) -> Option<AdProgress> {
        match &self.ads {
            AdSession::Active(brk) => brk.progress,
            _ => None,
        }
    }

    pub fn is_video_finished(&self) -> bool {
        self.machine.state() == PlaybackState::Finished
    }

    pub fn failure(&self) -> Option<&PlayerError> {
        self.machine.failure()
    }

    pub fn url(&self) -> Option<&str> {
        self.machine.url()
    }

    /// Read-only content playhead, as handed to the ad provider.
    pub fn playhead(&self) -> ContentPlayhead {
        self.playhead.clone()
    }

    pub fn controls(&self) -> &ControlsModel {
        self.overlay.controls()
    }

    pub fn overlay(&self) -> &OverlayController {
        &self.overlay
    }

    // ========== Internals ==========

    fn start_content(&mut self) {
        if self.settings.autoplay {
            self.run(PlaybackInput::Play);
        }
    }

    fn run(&mut self, input: PlaybackInput) {
        let fx = self.machine.handle(input);
        self.apply(fx);
    }

    /// Forward machine effects to the bus, the overlay and the renderer, in order.
    fn apply(&mut self, fx: Vec<PlaybackEffect>) {
        let now = Instant::now();
        for effect in fx {
            match effect {
                PlaybackEffect::StateChanged { from, to } => {
                    self.bus.emit(PlaybackStateChanged { from, to });
                    let ofx = self.overlay.playback_state_changed(to, now);
                    self.emit_overlay(ofx);
                    if to == PlaybackState::Error {
                        self.abandon_ads();
                    }
                }
                PlaybackEffect::CurrentTimeChanged(t) => {
                    self.playhead.set(Some(t));
                    self.overlay.controls_mut().set_media_time(t);
                    self.bus.emit(CurrentTimeChanged(t));
                }
                PlaybackEffect::TotalTimeChanged(total) => {
                    self.overlay.controls_mut().set_total_time(total);
                    self.bus.emit(TotalTimeChanged(total));
                }
                PlaybackEffect::BufferedTimeChanged(t) => {
                    self.overlay.controls_mut().set_downloaded_time(Some(t));
                    self.bus.emit(BufferedTimeChanged(t));
                }
                PlaybackEffect::WillFinish(reason) => self.bus.emit(WillFinish(reason)),
                PlaybackEffect::DidFinish(reason) => {
                    self.bus.emit(DidFinish(reason));
                    if reason == FinishReason::PlaybackEnded
                        && self.ads == AdSession::Armed
                        && let Some(provider) = self.ad_provider.as_mut()
                    {
                        debug!("Content completed, notifying ad provider");
                        provider.content_completed();
                    }
                }
                PlaybackEffect::Failed(err) => self.bus.emit(PlaybackFailed(err)),
                PlaybackEffect::Command(cmd) => self.send_command(cmd),
            }
        }
    }

    fn send_command(&mut self, cmd: RendererCommand) {
        trace!("Renderer <- {:?}", cmd);
        match cmd {
            RendererCommand::Load(url) => {
                let sink = self.queue.sink(self.epoch);
                self.renderer.load(&url, sink);
            }
            RendererCommand::Play => self.renderer.play(),
            RendererCommand::Pause => self.renderer.pause(),
            RendererCommand::Seek(t) => self.renderer.seek(t),
        }
    }

    fn emit_overlay(&self, fx: Vec<OverlayEffect>) {
        for effect in fx {
            match effect {
                OverlayEffect::WillShow => self.bus.emit(ControlsWillShow),
                OverlayEffect::DidShow => self.bus.emit(ControlsDidShow),
                OverlayEffect::WillHide => self.bus.emit(ControlsWillHide),
                OverlayEffect::DidHide => self.bus.emit(ControlsDidHide),
            }
        }
    }

    fn ads_loaded(&mut self, preroll: bool) {
        match self.ads {
            AdSession::Pending { autoplay } => {
                if preroll {
                    debug!("Pre-roll due, content start stays held");
                    return;
                }
                info!("Ads armed, no pre-roll");
                self.ads = AdSession::Armed;
                if autoplay {
                    self.run(PlaybackInput::Play);
                }
            }
            _ => warn!("AdsLoaded ignored in {:?}", self.ad_phase()),
        }
    }

    fn ad_request_failed(&mut self, reason: String) {
        let err = PlayerError::AdRequest(reason);
        warn!("{}, continuing with content", err);
        self.bus.emit(AdError(err));
        match self.ads {
            AdSession::Pending { autoplay } => {
                self.ads = AdSession::Idle;
                if autoplay {
                    self.run(PlaybackInput::Play);
                }
            }
            AdSession::Active(_) => self.end_break(false),
            AdSession::Idle | AdSession::Armed => {}
        }
    }

    fn begin_break(&mut self) {
        let autoplay = match self.ads {
            AdSession::Pending { autoplay } => autoplay,
            AdSession::Armed => false,
            AdSession::Active(_) => {
                warn!("Ad break started while another is active, ignored");
                return;
            }
            AdSession::Idle => {
                warn!("Ad break started without an ad request, ignored");
                return;
            }
        };

        let content = self.machine.state();
        let resume_playing = autoplay || self.machine.play_intent();
        // Silent pause: the content machine keeps its state until the break ends
        if self.machine.play_intent() && matches!(content, PlaybackState::Playing | PlaybackState::Buffering) {
            self.renderer.pause();
        }

        let frozen_time = self
            .machine
            .position()
            .current()
            .or_else(|| media_time(self.renderer.current_time()));
        info!(
            "Ad break started (content {:?} at {:?}, resume: {})",
            content, frozen_time, resume_playing
        );
        self.ads = AdSession::Active(AdBreak {
            resume_playing,
            frozen_time,
            state: PlaybackState::Playing,
            progress: None,
        });
        self.overlay.set_ad_displayed(true, Instant::now());
        self.bus.emit(AdBreakStarted);
        if content != PlaybackState::Playing {
            self.bus.emit(PlaybackStateChanged {
                from: content,
                to: PlaybackState::Playing,
            });
        }
    }

    fn end_break(&mut self, skipped: bool) {
        let brk = match &self.ads {
            AdSession::Active(brk) => brk.clone(),
            _ => {
                warn!("Ad break end ignored, no break active");
                return;
            }
        };
        self.ads = AdSession::Armed;
        info!(
            "Ad break {} (resume content: {})",
            if skipped { "skipped" } else { "ended" },
            brk.resume_playing
        );

        self.overlay.set_ad_displayed(false, Instant::now());
        self.bus.emit(AdBreakEnded { skipped });

        let content = self.machine.state();
        if brk.state != content {
            self.bus.emit(PlaybackStateChanged {
                from: brk.state,
                to: content,
            });
        }
        if brk.resume_playing {
            if matches!(content, PlaybackState::Playing | PlaybackState::Buffering) {
                self.renderer.play();
            } else {
                self.run(PlaybackInput::Play);
            }
        }

        let deferred = std::mem::take(&mut self.deferred);
        if !deferred.is_empty() {
            debug!("Replaying {} renderer events deferred during the break", deferred.len());
        }
        for event in deferred {
            self.handle_renderer_event(event);
        }
    }

    fn set_ad_state(&mut self, state: PlaybackState) {
        if let AdSession::Active(brk) = &mut self.ads {
            if brk.state != state {
                let from = brk.state;
                brk.state = state;
                self.bus.emit(PlaybackStateChanged { from, to: state });
            }
        } else {
            trace!("Ad state {:?} ignored, no break active", state);
        }
    }

    /// Fatal content failure: no point in further ad work this session.
    fn abandon_ads(&mut self) {
        if self.ads == AdSession::Idle {
            return;
        }
        debug!("Cancelling ad work after playback failure");
        if let Some(provider) = self.ad_provider.as_mut() {
            provider.cancel();
        }
        self.ads = AdSession::Idle;
    }
}
