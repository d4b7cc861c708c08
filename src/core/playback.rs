//! Content playback state machine.
//!
//! **Architecture**: the machine does NOT own the renderer. Every input returns
//! a list of [`PlaybackEffect`]s: notifications for the embedder and
//! [`RendererCommand`]s the owner must forward to the backend. This keeps the
//! transition table pure and lets the coordinator withhold effects while an ad
//! owns the renderer.
//!
//! # Transition Table
//!
//! - `Unknown/Loading --ready--> ReadyToPlay` (then `Playing` if play was requested early)
//! - `ReadyToPlay/Paused --play--> Playing`, `Playing --pause--> Paused`
//! - `Playing --bufferingStarted--> Buffering --bufferingEnded--> Playing | Paused`
//! - loaded states `--seek--> Seeking --seekCompleted--> Playing | Paused`
//! - `Playing/Buffering --ended--> Finished --replay--> Seeking(0) --> Playing`
//! - any `--failed--> Error` (sticky until the machine is recreated)
//!
//! # Notifications
//!
//! State changes are edge-triggered. Time updates are level-triggered: one
//! `CurrentTimeChanged` per backend tick, no coalescing.

use super::error::PlayerError;
use super::player_events::FinishReason;
use log::{debug, error, trace};

/// Authoritative playback state of one timeline owner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum PlaybackState {
    #[default]
    Unknown,
    Loading,
    ReadyToPlay,
    Playing,
    Paused,
    Buffering,
    Seeking,
    Finished,
    Error,
}

impl PlaybackState {
    pub fn is_playing(&self) -> bool {
        matches!(self, PlaybackState::Playing)
    }

    /// True once the stream reported ready and has not failed.
    pub fn is_loaded(&self) -> bool {
        matches!(
            self,
            PlaybackState::ReadyToPlay
                | PlaybackState::Playing
                | PlaybackState::Paused
                | PlaybackState::Buffering
                | PlaybackState::Seeking
                | PlaybackState::Finished
        )
    }
}

/// Normalize a backend time value. NaN, infinite and negative values are unknown.
pub fn media_time(t: f64) -> Option<f64> {
    (t.is_finite() && t >= 0.0).then_some(t)
}

/// Current/total/buffered time of a timeline, in seconds.
///
/// Invariants: `0 <= current <= total` when both are known and
/// `buffered >= current` when known.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct TimelinePosition {
    current: Option<f64>,
    total: Option<f64>,
    buffered: Option<f64>,
}

impl TimelinePosition {
    pub fn current(&self) -> Option<f64> {
        self.current
    }

    pub fn total(&self) -> Option<f64> {
        self.total
    }

    pub fn buffered(&self) -> Option<f64> {
        self.buffered
    }

    /// Clamp a requested time into `[0, total]` (`[0, inf)` if total is unknown).
    pub fn clamp(&self, t: f64) -> f64 {
        let t = if t.is_nan() { 0.0 } else { t.max(0.0) };
        match self.total {
            Some(total) => t.min(total),
            None => t,
        }
    }

    /// Returns true if the stored value changed.
    fn set_current(&mut self, t: f64) -> bool {
        let t = self.clamp(t);
        let changed = self.current != Some(t);
        self.current = Some(t);
        if let Some(b) = self.buffered
            && b < t
        {
            self.buffered = Some(t);
        }
        changed
    }

    /// Returns true if the stored total changed. Pulls `current` back inside.
    fn set_total(&mut self, total: Option<f64>) -> bool {
        let changed = self.total != total;
        self.total = total;
        if let (Some(cur), Some(total)) = (self.current, total)
            && cur > total
        {
            self.current = Some(total);
        }
        changed
    }

    fn set_buffered(&mut self, t: f64) -> bool {
        let t = match self.current {
            Some(cur) => t.max(cur),
            None => t,
        };
        let changed = self.buffered != Some(t);
        self.buffered = Some(t);
        changed
    }
}

/// Commands the machine asks its owner to forward to the renderer backend.
#[derive(Debug, Clone, PartialEq)]
pub enum RendererCommand {
    Load(String),
    Play,
    Pause,
    Seek(f64),
}

/// User intents and renderer events consumed by the machine.
#[derive(Debug, Clone, PartialEq)]
pub enum PlaybackInput {
    // Intents
    Load(String),
    Play,
    Pause,
    Replay,
    Seek(f64),

    // Renderer events
    Ready { total: Option<f64> },
    BufferingStarted,
    BufferingEnded,
    TimeUpdated(f64),
    BufferedUpdated(f64),
    DurationChanged(Option<f64>),
    SeekCompleted,
    Ended,
    Failed(String),
}

impl PlaybackInput {
    fn is_intent(&self) -> bool {
        matches!(
            self,
            PlaybackInput::Load(_)
                | PlaybackInput::Play
                | PlaybackInput::Pause
                | PlaybackInput::Replay
                | PlaybackInput::Seek(_)
        )
    }
}

/// Output of one transition, in emission order.
#[derive(Debug, Clone, PartialEq)]
pub enum PlaybackEffect {
    StateChanged { from: PlaybackState, to: PlaybackState },
    CurrentTimeChanged(f64),
    TotalTimeChanged(Option<f64>),
    BufferedTimeChanged(f64),
    WillFinish(FinishReason),
    DidFinish(FinishReason),
    Failed(PlayerError),
    Command(RendererCommand),
}

/// Playback state machine for one content session.
#[derive(Debug, Clone, Default)]
pub struct PlaybackMachine {
    state: PlaybackState,
    position: TimelinePosition,
    /// User wants playback running. Decides where buffering and seeks land.
    play_intent: bool,
    failure: Option<PlayerError>,
    url: Option<String>,
}

impl PlaybackMachine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> PlaybackState {
        self.state
    }

    pub fn position(&self) -> &TimelinePosition {
        &self.position
    }

    pub fn play_intent(&self) -> bool {
        self.play_intent
    }

    pub fn failure(&self) -> Option<&PlayerError> {
        self.failure.as_ref()
    }

    pub fn url(&self) -> Option<&str> {
        self.url.as_deref()
    }

    /// Apply one input and return the resulting effects.
    pub fn handle(&mut self, input: PlaybackInput) -> Vec<PlaybackEffect> {
        let mut fx = Vec::new();

        if let Some(err) = &self.failure {
            if input.is_intent() {
                debug!("Intent {:?} ignored, playback failed: {}", input, err);
                fx.push(PlaybackEffect::Failed(err.clone()));
            } else {
                trace!("Renderer event {:?} ignored in Error", input);
            }
            return fx;
        }

        match input {
            PlaybackInput::Load(url) => self.load(url, &mut fx),
            PlaybackInput::Play => self.play(&mut fx),
            PlaybackInput::Pause => self.pause(&mut fx),
            PlaybackInput::Replay => self.replay(&mut fx),
            PlaybackInput::Seek(t) => self.seek(t, &mut fx),
            PlaybackInput::Ready { total } => self.ready(total, &mut fx),
            PlaybackInput::BufferingStarted => {
                if self.state == PlaybackState::Playing {
                    self.enter(PlaybackState::Buffering, &mut fx);
                }
            }
            PlaybackInput::BufferingEnded => {
                if self.state == PlaybackState::Buffering {
                    let to = if self.play_intent { PlaybackState::Playing } else { PlaybackState::Paused };
                    self.enter(to, &mut fx);
                }
            }
            PlaybackInput::TimeUpdated(t) => {
                // Ticks between a seek request and its completion report the old position
                if self.state == PlaybackState::Seeking {
                    trace!("Stale time tick {} ignored while seeking", t);
                } else if let Some(t) = media_time(t) {
                    self.position.set_current(t);
                    fx.push(PlaybackEffect::CurrentTimeChanged(self.position.clamp(t)));
                }
            }
            PlaybackInput::BufferedUpdated(t) => {
                if let Some(t) = media_time(t)
                    && self.position.set_buffered(t)
                    && let Some(b) = self.position.buffered()
                {
                    fx.push(PlaybackEffect::BufferedTimeChanged(b));
                }
            }
            PlaybackInput::DurationChanged(total) => self.update_total(total, &mut fx),
            PlaybackInput::SeekCompleted => {
                if self.state == PlaybackState::Seeking {
                    if self.play_intent {
                        self.enter(PlaybackState::Playing, &mut fx);
                        fx.push(PlaybackEffect::Command(RendererCommand::Play));
                    } else {
                        self.enter(PlaybackState::Paused, &mut fx);
                    }
                }
            }
            PlaybackInput::Ended => self.ended(&mut fx),
            PlaybackInput::Failed(reason) => self.fail(reason, &mut fx),
        }
        fx
    }

    /// Edge-triggered state change.
    fn enter(&mut self, to: PlaybackState, fx: &mut Vec<PlaybackEffect>) {
        if self.state == to {
            return;
        }
        let from = self.state;
        self.state = to;
        trace!("Playback state {:?} -> {:?}", from, to);
        fx.push(PlaybackEffect::StateChanged { from, to });
    }

    fn load(&mut self, url: String, fx: &mut Vec<PlaybackEffect>) {
        self.position = TimelinePosition::default();
        self.play_intent = false;
        self.url = Some(url.clone());
        self.enter(PlaybackState::Loading, fx);
        fx.push(PlaybackEffect::Command(RendererCommand::Load(url)));
    }

    fn play(&mut self, fx: &mut Vec<PlaybackEffect>) {
        match self.state {
            PlaybackState::Unknown | PlaybackState::Loading | PlaybackState::Seeking => {
                self.play_intent = true;
            }
            PlaybackState::ReadyToPlay | PlaybackState::Paused => {
                self.play_intent = true;
                self.enter(PlaybackState::Playing, fx);
                fx.push(PlaybackEffect::Command(RendererCommand::Play));
            }
            PlaybackState::Buffering => {
                if !self.play_intent {
                    self.play_intent = true;
                    fx.push(PlaybackEffect::Command(RendererCommand::Play));
                }
            }
            PlaybackState::Finished => self.replay(fx),
            PlaybackState::Playing | PlaybackState::Error => {}
        }
    }

    fn pause(&mut self, fx: &mut Vec<PlaybackEffect>) {
        match self.state {
            PlaybackState::Unknown | PlaybackState::Loading | PlaybackState::Seeking => {
                self.play_intent = false;
            }
            PlaybackState::Playing => {
                self.play_intent = false;
                self.enter(PlaybackState::Paused, fx);
                fx.push(PlaybackEffect::Command(RendererCommand::Pause));
            }
            PlaybackState::Buffering => {
                if self.play_intent {
                    self.play_intent = false;
                    fx.push(PlaybackEffect::Command(RendererCommand::Pause));
                }
            }
            PlaybackState::ReadyToPlay
            | PlaybackState::Paused
            | PlaybackState::Finished
            | PlaybackState::Error => {}
        }
    }

    fn replay(&mut self, fx: &mut Vec<PlaybackEffect>) {
        if !self.state.is_loaded() {
            debug!("Replay ignored in {:?}", self.state);
            return;
        }
        self.play_intent = true;
        self.begin_seek(0.0, fx);
    }

    fn seek(&mut self, t: f64, fx: &mut Vec<PlaybackEffect>) {
        if !self.state.is_loaded() {
            debug!("Seek to {} ignored in {:?}", t, self.state);
            return;
        }
        let target = self.position.clamp(t);
        if self.position.current() == Some(target) {
            trace!("Seek to {} is a no-op (already there)", target);
            return;
        }
        if self.state == PlaybackState::Finished {
            self.play_intent = false;
        }
        self.begin_seek(target, fx);
    }

    fn begin_seek(&mut self, target: f64, fx: &mut Vec<PlaybackEffect>) {
        let target = self.position.clamp(target);
        if self.position.set_current(target) {
            fx.push(PlaybackEffect::CurrentTimeChanged(target));
        }
        self.enter(PlaybackState::Seeking, fx);
        fx.push(PlaybackEffect::Command(RendererCommand::Seek(target)));
    }

    fn ready(&mut self, total: Option<f64>, fx: &mut Vec<PlaybackEffect>) {
        if !matches!(self.state, PlaybackState::Unknown | PlaybackState::Loading) {
            trace!("Duplicate ready ignored in {:?}", self.state);
            return;
        }
        self.update_total(total, fx);
        if self.position.current().is_none() {
            self.position.set_current(0.0);
            fx.push(PlaybackEffect::CurrentTimeChanged(0.0));
        }
        self.enter(PlaybackState::ReadyToPlay, fx);
        if self.play_intent {
            self.enter(PlaybackState::Playing, fx);
            fx.push(PlaybackEffect::Command(RendererCommand::Play));
        }
    }

    fn update_total(&mut self, total: Option<f64>, fx: &mut Vec<PlaybackEffect>) {
        let total = total.and_then(media_time);
        let before = self.position.current();
        if self.position.set_total(total) {
            fx.push(PlaybackEffect::TotalTimeChanged(total));
        }
        if let Some(cur) = self.position.current()
            && before != Some(cur)
        {
            fx.push(PlaybackEffect::CurrentTimeChanged(cur));
        }
    }

    fn ended(&mut self, fx: &mut Vec<PlaybackEffect>) {
        if !matches!(self.state, PlaybackState::Playing | PlaybackState::Buffering) {
            trace!("End of stream ignored in {:?}", self.state);
            return;
        }
        if let Some(total) = self.position.total()
            && self.position.set_current(total)
        {
            fx.push(PlaybackEffect::CurrentTimeChanged(total));
        }
        self.play_intent = false;
        fx.push(PlaybackEffect::WillFinish(FinishReason::PlaybackEnded));
        self.enter(PlaybackState::Finished, fx);
        fx.push(PlaybackEffect::DidFinish(FinishReason::PlaybackEnded));
    }

    fn fail(&mut self, reason: String, fx: &mut Vec<PlaybackEffect>) {
        let err = PlayerError::Renderer(reason);
        error!("Playback failed in {:?}: {}", self.state, err);
        self.play_intent = false;
        fx.push(PlaybackEffect::WillFinish(FinishReason::PlaybackError));
        self.failure = Some(err.clone());
        self.enter(PlaybackState::Error, fx);
        fx.push(PlaybackEffect::Failed(err));
        fx.push(PlaybackEffect::DidFinish(FinishReason::PlaybackError));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state_changes(fx: &[PlaybackEffect]) -> Vec<(PlaybackState, PlaybackState)> {
        fx.iter()
            .filter_map(|e| match e {
                PlaybackEffect::StateChanged { from, to } => Some((*from, *to)),
                _ => None,
            })
            .collect()
    }

    fn commands(fx: &[PlaybackEffect]) -> Vec<RendererCommand> {
        fx.iter()
            .filter_map(|e| match e {
                PlaybackEffect::Command(c) => Some(c.clone()),
                _ => None,
            })
            .collect()
    }

    fn ready_machine(total: f64) -> PlaybackMachine {
        let mut m = PlaybackMachine::new();
        m.handle(PlaybackInput::Load("a.mp4".into()));
        m.handle(PlaybackInput::Ready { total: Some(total) });
        m
    }

    #[test]
    fn load_then_ready() {
        let mut m = PlaybackMachine::new();
        let fx = m.handle(PlaybackInput::Load("a.mp4".into()));
        assert_eq!(m.state(), PlaybackState::Loading);
        assert_eq!(commands(&fx), vec![RendererCommand::Load("a.mp4".into())]);

        let fx = m.handle(PlaybackInput::Ready { total: Some(60.0) });
        assert_eq!(m.state(), PlaybackState::ReadyToPlay);
        assert!(fx.contains(&PlaybackEffect::TotalTimeChanged(Some(60.0))));
        assert_eq!(m.position().current(), Some(0.0));
        assert!(commands(&fx).is_empty());
    }

    #[test]
    fn play_requested_while_loading_starts_on_ready() {
        let mut m = PlaybackMachine::new();
        m.handle(PlaybackInput::Load("a.mp4".into()));
        assert!(m.handle(PlaybackInput::Play).is_empty());
        assert_eq!(m.state(), PlaybackState::Loading);

        let fx = m.handle(PlaybackInput::Ready { total: Some(10.0) });
        assert_eq!(
            state_changes(&fx),
            vec![
                (PlaybackState::Loading, PlaybackState::ReadyToPlay),
                (PlaybackState::ReadyToPlay, PlaybackState::Playing)
            ]
        );
        assert_eq!(commands(&fx), vec![RendererCommand::Play]);
    }

    #[test]
    fn play_pause_alternate_without_duplicates() {
        let mut m = ready_machine(30.0);
        let intents = [
            PlaybackInput::Play,
            PlaybackInput::Play,
            PlaybackInput::Pause,
            PlaybackInput::Pause,
            PlaybackInput::Play,
            PlaybackInput::Pause,
        ];
        let mut changes = Vec::new();
        for intent in intents {
            changes.extend(state_changes(&m.handle(intent)));
        }
        assert_eq!(
            changes,
            vec![
                (PlaybackState::ReadyToPlay, PlaybackState::Playing),
                (PlaybackState::Playing, PlaybackState::Paused),
                (PlaybackState::Paused, PlaybackState::Playing),
                (PlaybackState::Playing, PlaybackState::Paused),
            ]
        );
    }

    #[test]
    fn buffering_resumes_according_to_intent() {
        let mut m = ready_machine(30.0);
        m.handle(PlaybackInput::Play);
        m.handle(PlaybackInput::BufferingStarted);
        assert_eq!(m.state(), PlaybackState::Buffering);
        m.handle(PlaybackInput::BufferingEnded);
        assert_eq!(m.state(), PlaybackState::Playing);

        m.handle(PlaybackInput::BufferingStarted);
        let fx = m.handle(PlaybackInput::Pause);
        assert_eq!(commands(&fx), vec![RendererCommand::Pause]);
        assert_eq!(m.state(), PlaybackState::Buffering);
        m.handle(PlaybackInput::BufferingEnded);
        assert_eq!(m.state(), PlaybackState::Paused);
    }

    #[test]
    fn buffering_while_paused_is_ignored() {
        let mut m = ready_machine(30.0);
        assert!(m.handle(PlaybackInput::BufferingStarted).is_empty());
        assert_eq!(m.state(), PlaybackState::ReadyToPlay);
    }

    #[test]
    fn seek_clamps_into_range() {
        let mut m = ready_machine(20.0);
        let fx = m.handle(PlaybackInput::Seek(99.0));
        assert_eq!(m.position().current(), Some(20.0));
        assert_eq!(commands(&fx), vec![RendererCommand::Seek(20.0)]);

        m.handle(PlaybackInput::SeekCompleted);
        m.handle(PlaybackInput::Seek(-5.0));
        assert_eq!(m.position().current(), Some(0.0));
    }

    #[test]
    fn seek_twice_to_same_target_notifies_once() {
        let mut m = ready_machine(20.0);
        let first = m.handle(PlaybackInput::Seek(50.0));
        let second = m.handle(PlaybackInput::Seek(42.0));

        let time_changes = first
            .iter()
            .chain(second.iter())
            .filter(|e| matches!(e, PlaybackEffect::CurrentTimeChanged(_)))
            .count();
        assert_eq!(time_changes, 1);
        assert_eq!(state_changes(&first).len(), 1);
        assert!(second.is_empty());
    }

    #[test]
    fn seek_lands_on_prior_playing_intent() {
        let mut m = ready_machine(20.0);
        m.handle(PlaybackInput::Play);
        m.handle(PlaybackInput::Seek(5.0));
        assert_eq!(m.state(), PlaybackState::Seeking);
        let fx = m.handle(PlaybackInput::SeekCompleted);
        assert_eq!(m.state(), PlaybackState::Playing);
        assert_eq!(commands(&fx), vec![RendererCommand::Play]);

        m.handle(PlaybackInput::Pause);
        m.handle(PlaybackInput::Seek(8.0));
        m.handle(PlaybackInput::SeekCompleted);
        assert_eq!(m.state(), PlaybackState::Paused);
    }

    #[test]
    fn seek_before_load_is_ignored() {
        let mut m = PlaybackMachine::new();
        assert!(m.handle(PlaybackInput::Seek(3.0)).is_empty());
        m.handle(PlaybackInput::Load("a.mp4".into()));
        assert!(m.handle(PlaybackInput::Seek(3.0)).is_empty());
        assert_eq!(m.state(), PlaybackState::Loading);
    }

    #[test]
    fn stale_ticks_ignored_while_seeking() {
        let mut m = ready_machine(20.0);
        m.handle(PlaybackInput::Play);
        m.handle(PlaybackInput::Seek(15.0));
        assert!(m.handle(PlaybackInput::TimeUpdated(2.0)).is_empty());
        assert_eq!(m.position().current(), Some(15.0));
    }

    #[test]
    fn every_tick_reports_time() {
        let mut m = ready_machine(20.0);
        m.handle(PlaybackInput::Play);
        let a = m.handle(PlaybackInput::TimeUpdated(1.0));
        let b = m.handle(PlaybackInput::TimeUpdated(1.0));
        assert_eq!(a, vec![PlaybackEffect::CurrentTimeChanged(1.0)]);
        assert_eq!(b, vec![PlaybackEffect::CurrentTimeChanged(1.0)]);
    }

    #[test]
    fn buffered_never_behind_current() {
        let mut m = ready_machine(20.0);
        m.handle(PlaybackInput::TimeUpdated(6.0));
        m.handle(PlaybackInput::BufferedUpdated(4.0));
        assert_eq!(m.position().buffered(), Some(6.0));
        m.handle(PlaybackInput::BufferedUpdated(12.0));
        assert_eq!(m.position().buffered(), Some(12.0));
    }

    #[test]
    fn unknown_duration_for_live_streams() {
        let mut m = PlaybackMachine::new();
        m.handle(PlaybackInput::Load("live.m3u8".into()));
        m.handle(PlaybackInput::Ready { total: Some(f64::INFINITY) });
        assert_eq!(m.position().total(), None);
        m.handle(PlaybackInput::Seek(500.0));
        assert_eq!(m.position().current(), Some(500.0));
    }

    #[test]
    fn end_of_stream_finishes_in_order() {
        let mut m = ready_machine(20.0);
        m.handle(PlaybackInput::Play);
        let fx = m.handle(PlaybackInput::Ended);
        assert_eq!(
            fx,
            vec![
                PlaybackEffect::CurrentTimeChanged(20.0),
                PlaybackEffect::WillFinish(FinishReason::PlaybackEnded),
                PlaybackEffect::StateChanged {
                    from: PlaybackState::Playing,
                    to: PlaybackState::Finished
                },
                PlaybackEffect::DidFinish(FinishReason::PlaybackEnded),
            ]
        );
    }

    #[test]
    fn replay_from_finished() {
        let mut m = ready_machine(20.0);
        m.handle(PlaybackInput::Play);
        m.handle(PlaybackInput::Ended);

        let fx = m.handle(PlaybackInput::Replay);
        assert_eq!(m.state(), PlaybackState::Seeking);
        assert_eq!(m.position().current(), Some(0.0));
        assert_eq!(commands(&fx), vec![RendererCommand::Seek(0.0)]);

        m.handle(PlaybackInput::SeekCompleted);
        assert_eq!(m.state(), PlaybackState::Playing);
    }

    #[test]
    fn play_from_finished_replays() {
        let mut m = ready_machine(20.0);
        m.handle(PlaybackInput::Play);
        m.handle(PlaybackInput::Ended);
        m.handle(PlaybackInput::Play);
        assert_eq!(m.state(), PlaybackState::Seeking);
        assert!(m.play_intent());
    }

    #[test]
    fn error_is_sticky_and_reemitted() {
        let mut m = ready_machine(20.0);
        m.handle(PlaybackInput::Play);
        let fx = m.handle(PlaybackInput::Failed("decode".into()));
        assert_eq!(m.state(), PlaybackState::Error);
        assert_eq!(fx.first(), Some(&PlaybackEffect::WillFinish(FinishReason::PlaybackError)));
        assert_eq!(fx.last(), Some(&PlaybackEffect::DidFinish(FinishReason::PlaybackError)));

        let err = PlayerError::Renderer("decode".into());
        for intent in [PlaybackInput::Play, PlaybackInput::Pause, PlaybackInput::Seek(3.0)] {
            assert_eq!(m.handle(intent), vec![PlaybackEffect::Failed(err.clone())]);
        }
        assert!(m.handle(PlaybackInput::Ready { total: Some(1.0) }).is_empty());
        assert_eq!(m.state(), PlaybackState::Error);
    }

    #[test]
    fn media_time_rejects_sentinels() {
        assert_eq!(media_time(f64::NAN), None);
        assert_eq!(media_time(f64::INFINITY), None);
        assert_eq!(media_time(-1.0), None);
        assert_eq!(media_time(2.5), Some(2.5));
    }
}
