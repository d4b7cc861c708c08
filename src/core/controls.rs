//! Headless model of the player chrome: what the controls should display.
//!
//! The embedder renders this however it likes. The overlay controller keeps
//! it in sync with playback state, scrubbing and ad suppression.

use super::playback::PlaybackState;

/// The play/pause/replay button shows exactly one of these at a time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PrimaryButton {
    #[default]
    Play,
    Pause,
    Replay,
}

/// Custom button in the top bar, identified by name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionButton {
    pub name: String,
    /// Opaque image reference, resolved by the embedder.
    pub image: String,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct ControlsModel {
    primary: PrimaryButton,
    spinner: bool,
    seekbar_enabled: bool,
    top_bar_enabled: bool,
    media_time: f64,
    total_time: Option<f64>,
    downloaded_time: Option<f64>,
    title: Option<String>,
    logo: Option<String>,
    action_buttons: Vec<ActionButton>,
}

impl ControlsModel {
    pub fn new() -> Self {
        Self {
            top_bar_enabled: true,
            ..Default::default()
        }
    }

    /// Recompute the derived widgets from content state and interaction.
    pub fn refresh(&mut self, state: PlaybackState, scrubbing: bool, ad_displayed: bool) {
        self.primary = match state {
            PlaybackState::Playing | PlaybackState::Buffering => PrimaryButton::Pause,
            PlaybackState::Finished => PrimaryButton::Replay,
            // Keep whatever was shown before the seek started
            PlaybackState::Seeking => self.primary,
            PlaybackState::Unknown
            | PlaybackState::Loading
            | PlaybackState::ReadyToPlay
            | PlaybackState::Paused
            | PlaybackState::Error => PrimaryButton::Play,
        };
        self.spinner = scrubbing
            || matches!(
                state,
                PlaybackState::Loading | PlaybackState::Buffering | PlaybackState::Seeking
            );
        self.seekbar_enabled = state.is_loaded() && !ad_displayed;
        self.top_bar_enabled = !ad_displayed;
    }

    pub fn primary_button(&self) -> PrimaryButton {
        self.primary
    }

    pub fn spinner_visible(&self) -> bool {
        self.spinner
    }

    pub fn seekbar_enabled(&self) -> bool {
        self.seekbar_enabled
    }

    pub fn top_bar_enabled(&self) -> bool {
        self.top_bar_enabled
    }

    pub fn media_time(&self) -> f64 {
        self.media_time
    }

    pub fn set_media_time(&mut self, t: f64) {
        self.media_time = t;
    }

    pub fn total_time(&self) -> Option<f64> {
        self.total_time
    }

    pub fn set_total_time(&mut self, t: Option<f64>) {
        self.total_time = t;
    }

    pub fn downloaded_time(&self) -> Option<f64> {
        self.downloaded_time
    }

    pub fn set_downloaded_time(&mut self, t: Option<f64>) {
        self.downloaded_time = t;
    }

    pub fn title(&self) -> Option<&str> {
        self.title.as_deref()
    }

    pub fn set_title(&mut self, title: Option<String>) {
        self.title = title;
    }

    pub fn logo(&self) -> Option<&str> {
        self.logo.as_deref()
    }

    pub fn set_logo(&mut self, logo: Option<String>) {
        self.logo = logo;
    }

    pub fn action_buttons(&self) -> &[ActionButton] {
        &self.action_buttons
    }

    /// Add a button to the right of the top bar. Re-adding a name replaces its image.
    pub fn add_action_button(&mut self, name: impl Into<String>, image: impl Into<String>) {
        let name = name.into();
        let image = image.into();
        match self.action_buttons.iter_mut().find(|b| b.name == name) {
            Some(existing) => existing.image = image,
            None => self.action_buttons.push(ActionButton { name, image }),
        }
    }

    pub fn has_action_button(&self, name: &str) -> bool {
        self.action_buttons.iter().any(|b| b.name == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn primary_button_follows_state() {
        let mut c = ControlsModel::new();
        c.refresh(PlaybackState::Playing, false, false);
        assert_eq!(c.primary_button(), PrimaryButton::Pause);

        c.refresh(PlaybackState::Seeking, false, false);
        assert_eq!(c.primary_button(), PrimaryButton::Pause);
        assert!(c.spinner_visible());

        c.refresh(PlaybackState::Finished, false, false);
        assert_eq!(c.primary_button(), PrimaryButton::Replay);

        c.refresh(PlaybackState::Paused, false, false);
        assert_eq!(c.primary_button(), PrimaryButton::Play);
        assert!(!c.spinner_visible());
    }

    #[test]
    fn scrubbing_shows_spinner() {
        let mut c = ControlsModel::new();
        c.refresh(PlaybackState::Paused, true, false);
        assert!(c.spinner_visible());
    }

    #[test]
    fn ads_disable_seekbar_and_top_bar() {
        let mut c = ControlsModel::new();
        c.refresh(PlaybackState::Playing, false, false);
        assert!(c.seekbar_enabled());
        assert!(c.top_bar_enabled());

        c.refresh(PlaybackState::Playing, false, true);
        assert!(!c.seekbar_enabled());
        assert!(!c.top_bar_enabled());
    }

    #[test]
    fn seekbar_disabled_before_load() {
        let mut c = ControlsModel::new();
        c.refresh(PlaybackState::Loading, false, false);
        assert!(!c.seekbar_enabled());
    }

    #[test]
    fn action_buttons_keep_order_and_replace_by_name() {
        let mut c = ControlsModel::new();
        c.add_action_button("share", "share.png");
        c.add_action_button("like", "like.png");
        c.add_action_button("share", "share2.png");

        let names: Vec<&str> = c.action_buttons().iter().map(|b| b.name.as_str()).collect();
        assert_eq!(names, vec!["share", "like"]);
        assert_eq!(c.action_buttons()[0].image, "share2.png");
        assert!(c.has_action_button("like"));
        assert!(!c.has_action_button("cast"));
    }
}
