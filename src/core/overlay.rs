//! Overlay visibility controller: chrome show/hide, auto-hide and scrub override.
//!
//! Independent of what is playing. The coordinator feeds it content state
//! changes and ad suppression; the embedder feeds it user gestures.
//!
//! # Notification order
//!
//! Every transition emits `WillShow, DidShow` or `WillHide, DidHide`. Animated
//! transitions split the pair across `tick_at` calls; interrupting an animation
//! completes the pending `Did*` before the opposite `Will*`, so pairs are never
//! skipped or interleaved.
//!
//! # Auto-hide policy
//!
//! The timer is (re)armed when the chrome becomes shown, on explicit `show`,
//! on `end_scrubbing` and on every content state change, never on time ticks.
//! It fires only while shown, idle and content is `Playing`.

use super::auto_hide::DebouncedDeadline;
use super::controls::ControlsModel;
use super::playback::PlaybackState;
use crate::config::PlayerSettings;
use log::{debug, trace};
use std::time::Instant;

/// Visibility of the chrome, including in-flight animations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChromeState {
    Shown,
    Hiding,
    Hidden,
    Showing,
}

/// What the user can currently do with the controls.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Interaction {
    Idle,
    /// User is dragging the seek control. Auto-hide suppressed, hide refused.
    Scrubbing,
    /// An ad owns the surface. Controls are non-interactive.
    AdDisplayed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OverlayEffect {
    WillShow,
    DidShow,
    WillHide,
    DidHide,
}

#[derive(Debug, Clone)]
pub struct OverlayController {
    chrome: ChromeState,
    interaction: Interaction,
    auto_hide_enabled: bool,
    content_state: PlaybackState,
    auto_hide: DebouncedDeadline,
    animation: DebouncedDeadline,
    controls: ControlsModel,
}

impl Default for OverlayController {
    fn default() -> Self {
        Self::new(&PlayerSettings::default())
    }
}

impl OverlayController {
    /// Controls start shown with auto-hide configured from settings.
    pub fn new(settings: &PlayerSettings) -> Self {
        let mut controls = ControlsModel::new();
        controls.refresh(PlaybackState::Unknown, false, false);
        Self {
            chrome: ChromeState::Shown,
            interaction: Interaction::Idle,
            auto_hide_enabled: settings.auto_hide_enabled,
            content_state: PlaybackState::Unknown,
            auto_hide: DebouncedDeadline::new(settings.auto_hide_delay()),
            animation: DebouncedDeadline::new(settings.animation_duration()),
            controls,
        }
    }

    pub fn chrome(&self) -> ChromeState {
        self.chrome
    }

    /// Shown or animating towards shown.
    pub fn is_shown(&self) -> bool {
        matches!(self.chrome, ChromeState::Shown | ChromeState::Showing)
    }

    /// Shown and not suppressed by an ad.
    pub fn is_visible(&self) -> bool {
        self.is_shown() && self.interaction != Interaction::AdDisplayed
    }

    pub fn is_scrubbing(&self) -> bool {
        self.interaction == Interaction::Scrubbing
    }

    pub fn controls_interactive(&self) -> bool {
        self.interaction != Interaction::AdDisplayed
    }

    pub fn auto_hide_enabled(&self) -> bool {
        self.auto_hide_enabled
    }

    pub fn auto_hide_pending(&self) -> bool {
        self.auto_hide.is_pending()
    }

    pub fn controls(&self) -> &ControlsModel {
        &self.controls
    }

    pub fn controls_mut(&mut self) -> &mut ControlsModel {
        &mut self.controls
    }

    pub fn set_auto_hide_enabled(&mut self, enabled: bool, now: Instant) {
        self.auto_hide_enabled = enabled;
        self.rearm(now);
    }

    pub fn show(&mut self, animated: bool, now: Instant) -> Vec<OverlayEffect> {
        let mut fx = Vec::new();
        match self.chrome {
            ChromeState::Shown | ChromeState::Showing => {}
            ChromeState::Hiding => {
                self.finish_animation(&mut fx);
                self.begin_show(animated, now, &mut fx);
            }
            ChromeState::Hidden => self.begin_show(animated, now, &mut fx),
        }
        self.rearm(now);
        fx
    }

    pub fn hide(&mut self, animated: bool, now: Instant) -> Vec<OverlayEffect> {
        let mut fx = Vec::new();
        if self.interaction == Interaction::Scrubbing {
            debug!("Hide refused while scrubbing");
            return fx;
        }
        match self.chrome {
            ChromeState::Hidden | ChromeState::Hiding => {}
            ChromeState::Showing => {
                self.finish_animation(&mut fx);
                self.begin_hide(animated, now, &mut fx);
            }
            ChromeState::Shown => self.begin_hide(animated, now, &mut fx),
        }
        fx
    }

    pub fn toggle(&mut self, now: Instant) -> Vec<OverlayEffect> {
        if self.is_shown() {
            self.hide(true, now)
        } else {
            self.show(true, now)
        }
    }

    /// Forces the chrome shown and suspends auto-hide until `end_scrubbing`.
    pub fn start_scrubbing(&mut self, now: Instant) -> Vec<OverlayEffect> {
        if self.interaction == Interaction::AdDisplayed {
            debug!("Scrub start ignored while an ad is displayed");
            return Vec::new();
        }
        self.interaction = Interaction::Scrubbing;
        let fx = self.show(false, now);
        self.auto_hide.cancel();
        self.refresh_controls();
        fx
    }

    pub fn end_scrubbing(&mut self, now: Instant) {
        if self.interaction != Interaction::Scrubbing {
            return;
        }
        self.interaction = Interaction::Idle;
        self.refresh_controls();
        self.rearm(now);
    }

    pub fn reset_auto_hide_timer(&mut self, now: Instant) {
        self.rearm(now);
    }

    /// Content state changed. Finished and failed sessions keep the chrome up.
    pub fn playback_state_changed(&mut self, state: PlaybackState, now: Instant) -> Vec<OverlayEffect> {
        self.content_state = state;
        self.refresh_controls();
        if matches!(state, PlaybackState::Finished | PlaybackState::Error) {
            return self.show(true, now);
        }
        self.rearm(now);
        Vec::new()
    }

    /// Ad started or ended. Visibility requests stay accepted meanwhile.
    pub fn set_ad_displayed(&mut self, displayed: bool, now: Instant) {
        if displayed {
            self.interaction = Interaction::AdDisplayed;
            self.auto_hide.cancel();
        } else if self.interaction == Interaction::AdDisplayed {
            self.interaction = Interaction::Idle;
            self.rearm(now);
        }
        self.refresh_controls();
    }

    /// Drive animation completion and auto-hide expiry.
    pub fn tick_at(&mut self, now: Instant) -> Vec<OverlayEffect> {
        let mut fx = Vec::new();
        if self.animation.tick_at(now) {
            self.finish_animation(&mut fx);
        }
        if self.auto_hide.tick_at(now) {
            if self.is_shown()
                && self.interaction == Interaction::Idle
                && self.content_state == PlaybackState::Playing
            {
                trace!("Auto-hiding controls");
                fx.extend(self.hide(true, now));
            } else {
                trace!("Auto-hide expired without effect ({:?}, {:?})", self.content_state, self.interaction);
            }
        }
        fx
    }

    fn begin_show(&mut self, animated: bool, now: Instant, fx: &mut Vec<OverlayEffect>) {
        fx.push(OverlayEffect::WillShow);
        if animated {
            self.chrome = ChromeState::Showing;
            self.animation.schedule_at(now);
        } else {
            self.chrome = ChromeState::Shown;
            fx.push(OverlayEffect::DidShow);
        }
    }

    fn begin_hide(&mut self, animated: bool, now: Instant, fx: &mut Vec<OverlayEffect>) {
        self.auto_hide.cancel();
        fx.push(OverlayEffect::WillHide);
        if animated {
            self.chrome = ChromeState::Hiding;
            self.animation.schedule_at(now);
        } else {
            self.chrome = ChromeState::Hidden;
            fx.push(OverlayEffect::DidHide);
        }
    }

    fn finish_animation(&mut self, fx: &mut Vec<OverlayEffect>) {
        self.animation.cancel();
        match self.chrome {
            ChromeState::Showing => {
                self.chrome = ChromeState::Shown;
                fx.push(OverlayEffect::DidShow);
            }
            ChromeState::Hiding => {
                self.chrome = ChromeState::Hidden;
                fx.push(OverlayEffect::DidHide);
            }
            ChromeState::Shown | ChromeState::Hidden => {}
        }
    }

    /// Restart auto-hide if eligible, otherwise make sure nothing stale is pending.
    fn rearm(&mut self, now: Instant) {
        if self.auto_hide_enabled && self.interaction == Interaction::Idle && self.is_shown() {
            self.auto_hide.schedule_at(now);
        } else {
            self.auto_hide.cancel();
        }
    }

    fn refresh_controls(&mut self) {
        self.controls.refresh(
            self.content_state,
            self.interaction == Interaction::Scrubbing,
            self.interaction == Interaction::AdDisplayed,
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn settings() -> PlayerSettings {
        PlayerSettings {
            auto_hide_delay_ms: 3000,
            animation_ms: 200,
            ..PlayerSettings::default()
        }
    }

    fn playing_overlay(now: Instant) -> OverlayController {
        let mut o = OverlayController::new(&settings());
        o.playback_state_changed(PlaybackState::Playing, now);
        o
    }

    fn secs(s: u64) -> Duration {
        Duration::from_secs(s)
    }

    #[test]
    fn starts_shown_without_pending_timer() {
        let o = OverlayController::new(&settings());
        assert_eq!(o.chrome(), ChromeState::Shown);
        assert!(o.auto_hide_enabled());
        assert!(!o.auto_hide_pending());
    }

    #[test]
    fn show_and_hide_are_idempotent() {
        let now = Instant::now();
        let mut o = OverlayController::new(&settings());
        assert!(o.show(false, now).is_empty());
        assert_eq!(o.hide(false, now), vec![OverlayEffect::WillHide, OverlayEffect::DidHide]);
        assert!(o.hide(false, now).is_empty());
        assert!(o.hide(true, now).is_empty());
    }

    #[test]
    fn animated_show_completes_on_tick() {
        let now = Instant::now();
        let mut o = OverlayController::new(&settings());
        o.hide(false, now);

        assert_eq!(o.show(true, now), vec![OverlayEffect::WillShow]);
        assert_eq!(o.chrome(), ChromeState::Showing);
        assert!(o.tick_at(now + Duration::from_millis(100)).is_empty());
        assert_eq!(o.tick_at(now + Duration::from_millis(250)), vec![OverlayEffect::DidShow]);
        assert_eq!(o.chrome(), ChromeState::Shown);
    }

    #[test]
    fn interrupted_animation_completes_pair_first() {
        let now = Instant::now();
        let mut o = OverlayController::new(&settings());
        assert_eq!(o.hide(true, now), vec![OverlayEffect::WillHide]);
        assert_eq!(
            o.show(true, now),
            vec![OverlayEffect::DidHide, OverlayEffect::WillShow]
        );
        assert_eq!(o.tick_at(now + secs(1)), vec![OverlayEffect::DidShow]);
    }

    #[test]
    fn auto_hides_while_playing() {
        let now = Instant::now();
        let mut o = playing_overlay(now);
        assert!(o.auto_hide_pending());
        assert!(o.tick_at(now + secs(2)).is_empty());
        assert_eq!(o.tick_at(now + secs(4)), vec![OverlayEffect::WillHide]);
        assert_eq!(o.tick_at(now + secs(5)), vec![OverlayEffect::DidHide]);
        assert!(!o.is_shown());
    }

    #[test]
    fn no_auto_hide_when_paused() {
        let now = Instant::now();
        let mut o = OverlayController::new(&settings());
        o.playback_state_changed(PlaybackState::Paused, now);
        assert!(o.tick_at(now + secs(10)).is_empty());
        assert!(o.is_shown());
    }

    #[test]
    fn state_change_restarts_timer() {
        let now = Instant::now();
        let mut o = playing_overlay(now);
        o.playback_state_changed(PlaybackState::Buffering, now + secs(2));
        o.playback_state_changed(PlaybackState::Playing, now + secs(2));
        assert!(o.tick_at(now + secs(4)).is_empty());
        assert_eq!(o.tick_at(now + secs(6)), vec![OverlayEffect::WillHide]);
    }

    #[test]
    fn scrubbing_suppresses_auto_hide() {
        let now = Instant::now();
        let mut o = playing_overlay(now);
        o.hide(false, now);

        assert_eq!(o.start_scrubbing(now), vec![OverlayEffect::WillShow, OverlayEffect::DidShow]);
        assert!(o.controls().spinner_visible());
        assert!(o.tick_at(now + secs(60)).is_empty());
        assert!(o.hide(false, now + secs(60)).is_empty());
        assert!(o.is_shown());

        let end = now + secs(61);
        o.end_scrubbing(end);
        assert!(o.auto_hide_pending());
        assert_eq!(o.tick_at(end + secs(4)), vec![OverlayEffect::WillHide]);
    }

    #[test]
    fn ad_suppresses_controls_but_accepts_requests() {
        let now = Instant::now();
        let mut o = playing_overlay(now);
        o.set_ad_displayed(true, now);
        assert!(!o.controls_interactive());
        assert!(!o.is_visible());
        assert!(!o.auto_hide_pending());

        // Requests are still tracked for when the ad ends
        assert_eq!(o.hide(false, now), vec![OverlayEffect::WillHide, OverlayEffect::DidHide]);
        assert!(o.start_scrubbing(now).is_empty());
        o.end_scrubbing(now);
        assert!(!o.auto_hide_pending());

        o.set_ad_displayed(false, now);
        assert!(o.controls_interactive());
        assert!(!o.is_shown());
    }

    #[test]
    fn ad_start_cancels_scrub() {
        let now = Instant::now();
        let mut o = playing_overlay(now);
        o.start_scrubbing(now);
        o.set_ad_displayed(true, now);
        assert!(!o.is_scrubbing());
        o.set_ad_displayed(false, now);
        assert!(o.auto_hide_pending());
    }

    #[test]
    fn finished_and_error_keep_overlay_up() {
        let now = Instant::now();
        let mut o = playing_overlay(now);
        o.hide(false, now);

        assert_eq!(
            o.playback_state_changed(PlaybackState::Error, now),
            vec![OverlayEffect::WillShow]
        );
        assert_eq!(o.tick_at(now + secs(1)), vec![OverlayEffect::DidShow]);
        assert!(o.tick_at(now + secs(30)).is_empty());
        assert!(o.is_shown());
    }

    #[test]
    fn toggle_flips_visibility() {
        let now = Instant::now();
        let mut o = OverlayController::new(&settings());
        assert_eq!(o.toggle(now), vec![OverlayEffect::WillHide]);
        assert_eq!(
            o.toggle(now),
            vec![OverlayEffect::DidHide, OverlayEffect::WillShow]
        );
    }

    #[test]
    fn disabled_auto_hide_never_arms() {
        let now = Instant::now();
        let mut o = OverlayController::new(&PlayerSettings {
            auto_hide_enabled: false,
            ..settings()
        });
        o.playback_state_changed(PlaybackState::Playing, now);
        assert!(!o.auto_hide_pending());
        assert!(o.tick_at(now + secs(60)).is_empty());
    }
}
