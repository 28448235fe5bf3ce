//! View-mode and theme state of the widget chrome.
//!
//! Independent of the conversation: nothing here touches the chat log.

use std::sync::Arc;

use serde::Serialize;

use crate::error::PreferenceError;

use super::preferences::PreferenceStore;

/// Storage key holding `"true"` or `"false"`.
pub const THEME_STORAGE_KEY: &str = "darkMode";

/// Every control that mirrors the theme value.
pub const THEME_CONTROL_IDS: [&str; 2] = ["themeSwitch", "themeSwitch2"];

/// Which pane is visible.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ViewMode {
    /// Conversation pane.
    #[default]
    Chat,
    /// Settings pane.
    Settings,
}

/// Visual theme.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    /// Default theme.
    #[default]
    Light,
    /// Dark theme.
    Dark,
}

impl Theme {
    /// Theme for a switch position.
    #[must_use]
    pub fn from_enabled(dark: bool) -> Self {
        if dark { Self::Dark } else { Self::Light }
    }

    /// Parse a stored value. Anything but exactly `"true"` is light.
    #[must_use]
    pub fn from_stored(value: Option<&str>) -> Self {
        Self::from_enabled(value == Some("true"))
    }

    /// Whether the dark switch is on.
    #[must_use]
    pub fn is_dark(self) -> bool {
        matches!(self, Self::Dark)
    }

    /// CSS class applied to the widget root.
    #[must_use]
    pub fn class(self) -> &'static str {
        match self {
            Self::Light => "light-theme",
            Self::Dark => "dark-theme",
        }
    }

    /// Value written to durable storage.
    #[must_use]
    pub fn stored_value(self) -> &'static str {
        if self.is_dark() { "true" } else { "false" }
    }
}

/// A theme switch and its checked state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ThemeControl {
    /// DOM id of the switch.
    pub id: &'static str,
    /// Whether it is checked.
    pub checked: bool,
}

/// View and theme state machine for one widget instance.
#[derive(Debug, Clone)]
pub struct ChromeController {
    view: ViewMode,
    theme: Theme,
    controls: Vec<ThemeControl>,
    store: Arc<dyn PreferenceStore>,
}

impl ChromeController {
    /// Initialize from durable storage. Read failures fall back to light.
    pub fn load(store: Arc<dyn PreferenceStore>) -> Self {
        let stored = match store.get(THEME_STORAGE_KEY) {
            Ok(value) => value,
            Err(e) => {
                tracing::warn!(
                    name: "chrome.theme.read_failed",
                    error = %e,
                    "Could not read theme preference, using light theme"
                );
                None
            }
        };
        let theme = Theme::from_stored(stored.as_deref());

        let mut chrome = Self {
            view: ViewMode::Chat,
            theme,
            controls: THEME_CONTROL_IDS
                .into_iter()
                .map(|id| ThemeControl { id, checked: false })
                .collect(),
            store,
        };
        chrome.apply_theme(theme);
        chrome
    }

    /// Currently active pane.
    #[must_use]
    pub fn view(&self) -> ViewMode {
        self.view
    }

    /// Whether `mode` is the active pane.
    #[must_use]
    pub fn is_active(&self, mode: ViewMode) -> bool {
        self.view == mode
    }

    /// Show the chat pane.
    pub fn select_chat(&mut self) {
        self.view = ViewMode::Chat;
    }

    /// Show the settings pane.
    pub fn select_settings(&mut self) {
        self.view = ViewMode::Settings;
    }

    /// Current theme.
    #[must_use]
    pub fn theme(&self) -> Theme {
        self.theme
    }

    /// Theme switches in render order.
    #[must_use]
    pub fn controls(&self) -> &[ThemeControl] {
        &self.controls
    }

    fn apply_theme(&mut self, theme: Theme) {
        self.theme = theme;
        for control in &mut self.controls {
            control.checked = theme.is_dark();
        }
    }

    /// Apply the theme, sync every switch, and persist the choice.
    ///
    /// The visual state changes even when persisting fails.
    pub fn toggle_theme(&mut self, enabled: bool) -> Result<(), PreferenceError> {
        let theme = Theme::from_enabled(enabled);
        self.apply_theme(theme);
        self.store.set(THEME_STORAGE_KEY, theme.stored_value())
    }
}
