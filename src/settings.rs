//! Window settings record exchanged with the host's window layer
//!
//! The engine never applies these; it only validates and stores them on
//! behalf of the host.

use std::fmt::Debug;
use std::sync::{Mutex, PoisonError};

use serde::{Deserialize, Serialize};

use crate::error::ConfigResult;

pub const MIN_OPACITY: f64 = 0.1;
pub const MAX_OPACITY: f64 = 1.0;
pub const MIN_SPLIT_PANE: f64 = 0.1;
pub const MAX_SPLIT_PANE: f64 = 0.9;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, uniffi::Record)]
pub struct WindowPosition {
    pub x: i32,
    pub y: i32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, uniffi::Record)]
pub struct WindowSize {
    pub width: u32,
    pub height: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, uniffi::Record)]
#[serde(rename_all = "camelCase", default)]
pub struct WindowSettings {
    pub always_on_top: bool,
    pub click_through: bool,
    pub opacity: f64,
    /// Fraction of the width given to the editor pane
    pub split_pane_size: f64,
    pub position: Option<WindowPosition>,
    pub size: Option<WindowSize>,
}

impl WindowSettings {
    /// Parse a saved settings record; missing keys take their defaults
    ///
    /// # Errors
    ///
    /// Returns an error if the text is not a valid settings record
    pub fn from_toml_str(text: &str) -> ConfigResult<Self> {
        Ok(toml::from_str::<Self>(text)?.normalized())
    }

    /// # Errors
    ///
    /// Returns an error if the record cannot be written as TOML
    pub fn to_toml_string(&self) -> ConfigResult<String> {
        Ok(toml::to_string(self)?)
    }

    pub fn set_opacity(&mut self, opacity: f64) {
        self.opacity = clamp_or(opacity, MIN_OPACITY, MAX_OPACITY, MAX_OPACITY);
    }

    pub fn set_split_pane_size(&mut self, size: f64) {
        self.split_pane_size = clamp_or(size, MIN_SPLIT_PANE, MAX_SPLIT_PANE, 0.5);
    }

    /// Copy with every bounded field pulled into range
    #[must_use]
    pub fn normalized(mut self) -> Self {
        self.set_opacity(self.opacity);
        self.set_split_pane_size(self.split_pane_size);
        self
    }
}

impl Default for WindowSettings {
    fn default() -> Self {
        Self {
            always_on_top: false,
            click_through: false,
            opacity: 1.0,
            split_pane_size: 0.5,
            position: None,
            size: None,
        }
    }
}

// NaN falls back to the default instead of poisoning the stored value
fn clamp_or(value: f64, min: f64, max: f64, fallback: f64) -> f64 {
    if value.is_nan() {
        fallback
    } else {
        value.clamp(min, max)
    }
}

/// Get/set access to persisted window settings
pub trait SettingsStore: Send + Sync + Debug {
    fn get(&self) -> WindowSettings;

    /// Store `settings`, normalized
    fn set(&self, settings: WindowSettings);
}

/// Settings store that keeps the record in memory
#[derive(Debug, Default)]
pub struct MemorySettingsStore {
    settings: Mutex<WindowSettings>,
}

impl MemorySettingsStore {
    #[must_use]
    pub fn new(settings: WindowSettings) -> Self {
        Self {
            settings: Mutex::new(settings.normalized()),
        }
    }
}

impl SettingsStore for MemorySettingsStore {
    fn get(&self) -> WindowSettings {
        self.settings
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn set(&self, settings: WindowSettings) {
        *self.settings.lock().unwrap_or_else(PoisonError::into_inner) = settings.normalized();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let settings = WindowSettings::default();
        assert!(!settings.always_on_top);
        assert!((settings.opacity - 1.0).abs() < f64::EPSILON);
        assert!((settings.split_pane_size - 0.5).abs() < f64::EPSILON);
        assert!(settings.position.is_none());
    }

    #[test]
    fn test_opacity_is_clamped() {
        let mut settings = WindowSettings::default();
        settings.set_opacity(0.0);
        assert!((settings.opacity - MIN_OPACITY).abs() < f64::EPSILON);
        settings.set_opacity(3.0);
        assert!((settings.opacity - MAX_OPACITY).abs() < f64::EPSILON);
        settings.set_opacity(f64::NAN);
        assert!((settings.opacity - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_split_pane_is_clamped() {
        let mut settings = WindowSettings::default();
        settings.set_split_pane_size(0.95);
        assert!((settings.split_pane_size - MAX_SPLIT_PANE).abs() < f64::EPSILON);
        settings.set_split_pane_size(0.3);
        assert!((settings.split_pane_size - 0.3).abs() < f64::EPSILON);
    }

    #[test]
    fn test_store_normalizes_on_set() {
        let store = MemorySettingsStore::default();
        store.set(WindowSettings {
            opacity: 0.01,
            position: Some(WindowPosition { x: 10, y: -4 }),
            ..WindowSettings::default()
        });

        let stored = store.get();
        assert!((stored.opacity - MIN_OPACITY).abs() < f64::EPSILON);
        assert_eq!(stored.position, Some(WindowPosition { x: 10, y: -4 }));
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let settings = WindowSettings::from_toml_str("alwaysOnTop = true\nopacity = 0.0").unwrap();
        assert!(settings.always_on_top);
        assert!((settings.opacity - MIN_OPACITY).abs() < f64::EPSILON);
        assert!((settings.split_pane_size - 0.5).abs() < f64::EPSILON);
    }

    #[test]
    fn test_toml_keeps_geometry() {
        let settings = WindowSettings {
            click_through: true,
            position: Some(WindowPosition { x: -20, y: 40 }),
            size: Some(WindowSize {
                width: 1280,
                height: 800,
            }),
            ..WindowSettings::default()
        };

        let text = settings.to_toml_string().unwrap();
        assert!(text.contains("clickThrough = true"));
        assert_eq!(WindowSettings::from_toml_str(&text).unwrap(), settings);
    }

    #[test]
    fn test_malformed_toml_is_rejected() {
        assert!(WindowSettings::from_toml_str("opacity = \"high\"").is_err());
    }
}
