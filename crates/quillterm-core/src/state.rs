//! Shared server state behind the control plane.

use std::sync::RwLock;

use crate::background::BackgroundSupervisor;
use crate::config::{Config, ThemeRegistry};
use crate::terminal::TerminalBridge;

/// Everything the RPC dispatcher and HTTP API operate on. Handlers
/// synchronize on the individual fields they touch, never on the state as
/// a whole.
pub struct ControlState {
    pub background: BackgroundSupervisor,
    pub terminal: TerminalBridge,
    themes: RwLock<ThemeRegistry>,
    status: RwLock<String>,
}

impl ControlState {
    #[must_use]
    pub fn new(config: &Config) -> Self {
        let mut themes = ThemeRegistry::new(&config.theme.name);
        themes.apply_overrides(&config.theme);
        Self {
            background: BackgroundSupervisor::new(&config.background).with_shell(config.shell()),
            terminal: TerminalBridge::new(),
            themes: RwLock::new(themes),
            status: RwLock::new(config.general.status_message.clone()),
        }
    }

    #[must_use]
    pub fn status_message(&self) -> String {
        self.status
            .read()
            .map(|s| s.clone())
            .unwrap_or_default()
    }

    pub fn set_status_message(&self, message: impl Into<String>) {
        if let Ok(mut status) = self.status.write() {
            *status = message.into();
        }
    }

    #[must_use]
    pub fn current_theme(&self) -> String {
        self.themes
            .read()
            .map(|t| t.current().to_string())
            .unwrap_or_default()
    }

    #[must_use]
    pub fn theme_names(&self) -> Vec<String> {
        self.themes.read().map(|t| t.names()).unwrap_or_default()
    }

    pub fn set_theme(&self, name: &str) -> Result<(), String> {
        match self.themes.write() {
            Ok(mut themes) => themes.set_current(name),
            Err(_) => Err("theme registry unavailable".to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_and_theme_round_trip() {
        let state = ControlState::new(&Config::default());
        assert_eq!(state.status_message(), "Ready");
        state.set_status_message("building");
        assert_eq!(state.status_message(), "building");

        assert_eq!(state.current_theme(), "default-dark");
        state.set_theme("snazzy").unwrap();
        assert_eq!(state.current_theme(), "snazzy");
        assert!(state.set_theme("bogus").is_err());
    }
}
