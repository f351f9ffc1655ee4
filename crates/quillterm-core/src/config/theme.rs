use serde::{Deserialize, Serialize};

use super::ThemeRef;

/// Terminal color theme
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Theme {
    pub name: String,
    pub colors: ThemeColors,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThemeColors {
    pub background: RgbColor,
    pub foreground: RgbColor,
    pub cursor: RgbColor,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RgbColor {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl RgbColor {
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    pub fn from_hex(hex: &str) -> Option<Self> {
        let hex = hex.strip_prefix('#').unwrap_or(hex);
        if hex.len() != 6 || !hex.is_ascii() {
            return None;
        }
        let r = u8::from_str_radix(&hex[0..2], 16).ok()?;
        let g = u8::from_str_radix(&hex[2..4], 16).ok()?;
        let b = u8::from_str_radix(&hex[4..6], 16).ok()?;
        Some(Self { r, g, b })
    }
}

impl Default for Theme {
    fn default() -> Self {
        Self {
            name: "default-dark".to_string(),
            colors: ThemeColors {
                background: RgbColor::new(0x27, 0x29, 0x35),
                foreground: RgbColor::new(0xef, 0xf0, 0xea),
                cursor: RgbColor::new(0xe9, 0xe9, 0xe9),
            },
        }
    }
}

fn builtin_themes() -> Vec<Theme> {
    vec![
        Theme::default(),
        Theme {
            name: "default-light".to_string(),
            colors: ThemeColors {
                background: RgbColor::new(0xfa, 0xfa, 0xfa),
                foreground: RgbColor::new(0x2b, 0x2b, 0x2b),
                cursor: RgbColor::new(0x2b, 0x2b, 0x2b),
            },
        },
        Theme {
            name: "snazzy".to_string(),
            colors: ThemeColors {
                background: RgbColor::new(0x28, 0x2a, 0x36),
                foreground: RgbColor::new(0xef, 0xf0, 0xeb),
                cursor: RgbColor::new(0x97, 0x97, 0x9b),
            },
        },
        Theme {
            name: "solarized-dark".to_string(),
            colors: ThemeColors {
                background: RgbColor::new(0x00, 0x2b, 0x36),
                foreground: RgbColor::new(0x83, 0x94, 0x96),
                cursor: RgbColor::new(0x93, 0xa1, 0xa1),
            },
        },
    ]
}

/// Named theme store with a current selection.
#[derive(Debug, Clone)]
pub struct ThemeRegistry {
    themes: Vec<Theme>,
    current: String,
}

impl ThemeRegistry {
    pub fn new(initial: &str) -> Self {
        let themes = builtin_themes();
        let current = if themes.iter().any(|t| t.name == initial) {
            initial.to_string()
        } else {
            Theme::default().name
        };
        Self { themes, current }
    }

    pub fn current(&self) -> &str {
        &self.current
    }

    pub fn names(&self) -> Vec<String> {
        self.themes.iter().map(|t| t.name.clone()).collect()
    }

    pub fn get(&self, name: &str) -> Option<&Theme> {
        self.themes.iter().find(|t| t.name == name)
    }

    /// Apply per-color hex overrides from config to the current theme.
    /// Values that do not parse as `#rrggbb` are ignored.
    pub fn apply_overrides(&mut self, overrides: &ThemeRef) {
        let current = self.current.clone();
        let Some(theme) = self.themes.iter_mut().find(|t| t.name == current) else {
            return;
        };
        for (slot, value) in [
            (&mut theme.colors.background, &overrides.background),
            (&mut theme.colors.foreground, &overrides.foreground),
            (&mut theme.colors.cursor, &overrides.cursor),
        ] {
            if let Some(color) = value.as_deref().and_then(RgbColor::from_hex) {
                *slot = color;
            }
        }
    }

    /// Switch the current theme. Unknown names are rejected so callers can
    /// report the available set.
    pub fn set_current(&mut self, name: &str) -> Result<(), String> {
        if self.themes.iter().any(|t| t.name == name) {
            self.current = name.to_string();
            Ok(())
        } else {
            Err(format!(
                "unknown theme: {name}. Available themes: {}",
                self.names().join(", ")
            ))
        }
    }
}

impl Default for ThemeRegistry {
    fn default() -> Self {
        Self::new("default-dark")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hex_parsing() {
        assert_eq!(
            RgbColor::from_hex("#272935"),
            Some(RgbColor::new(0x27, 0x29, 0x35))
        );
        assert_eq!(RgbColor::from_hex("27"), None);
        assert_eq!(RgbColor::from_hex("zzzzzz"), None);
        // 6 bytes but not ascii; must reject, not panic mid-codepoint.
        assert_eq!(RgbColor::from_hex("€€"), None);
    }

    #[test]
    fn config_overrides_recolor_the_current_theme() {
        let mut registry = ThemeRegistry::new("default-dark");
        registry.apply_overrides(&ThemeRef {
            name: "default-dark".to_string(),
            background: Some("#101010".to_string()),
            foreground: None,
            cursor: Some("not-a-color".to_string()),
        });
        let theme = registry.get("default-dark").unwrap();
        assert_eq!(theme.colors.background, RgbColor::new(0x10, 0x10, 0x10));
        // Missing and unparseable overrides leave the base colors alone.
        assert_eq!(theme.colors.foreground, RgbColor::new(0xef, 0xf0, 0xea));
        assert_eq!(theme.colors.cursor, RgbColor::new(0xe9, 0xe9, 0xe9));
    }

    #[test]
    fn registry_set_and_list() {
        let mut registry = ThemeRegistry::default();
        assert_eq!(registry.current(), "default-dark");
        registry.set_current("snazzy").unwrap();
        assert_eq!(registry.current(), "snazzy");
        assert!(registry.set_current("no-such-theme").is_err());
        assert_eq!(registry.current(), "snazzy");
        assert!(registry.names().contains(&"solarized-dark".to_string()));
    }

    #[test]
    fn unknown_initial_falls_back() {
        let registry = ThemeRegistry::new("does-not-exist");
        assert_eq!(registry.current(), "default-dark");
    }
}
