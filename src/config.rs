//! Stage configuration.
//!
//! Timing contracts, input thresholds, responsive breakpoints and the section
//! table. Every field has a default, so an empty TOML document is valid.
//!
//! ```toml
//! scroll_delay_ms = 800
//! fade_out_ms = 300
//!
//! [breakpoints]
//! mobile_max = 640
//!
//! [sections.booking]
//! hide_on_call = ["booking_button"]
//! show_on_call = ["navigation"]
//! ```

use std::fs;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::engine::SectionTable;
use crate::error::ConfigError;

/// Width thresholds (px) for the responsive sub-state.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Breakpoints {
    /// Widths up to and including this are Mobile.
    pub mobile_max: f64,
    /// Widths up to and including this (above mobile) are Tablet.
    pub tablet_max: f64,
}

impl Default for Breakpoints {
    fn default() -> Self {
        Self {
            mobile_max: 768.0,
            tablet_max: 1024.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StageConfig {
    /// Minimum time between two committed transitions driven by input.
    pub scroll_delay_ms: u64,
    /// Delay between requesting fade-out and committing the new section.
    pub fade_out_ms: u64,
    /// Delay between requesting fade-in and ending the transition.
    pub fade_in_ms: u64,
    /// Vertical touch travel needed to count as a swipe.
    pub swipe_threshold_px: f64,
    /// Hide delay used by components that do not set their own.
    pub default_hide_delay_ms: u64,
    pub breakpoints: Breakpoints,
    pub sections: SectionTable,
}

impl Default for StageConfig {
    fn default() -> Self {
        Self {
            scroll_delay_ms: 1000,
            fade_out_ms: 300,
            fade_in_ms: 50,
            swipe_threshold_px: 50.0,
            default_hide_delay_ms: 300,
            breakpoints: Breakpoints::default(),
            sections: SectionTable::default(),
        }
    }
}

impl StageConfig {
    /// Parse and validate a TOML document.
    pub fn from_toml_str(raw: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let raw = fs::read_to_string(path)?;
        Self::from_toml_str(&raw)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.sections.validate()
    }

    pub fn scroll_delay(&self) -> Duration {
        Duration::from_millis(self.scroll_delay_ms)
    }

    pub fn fade_out(&self) -> Duration {
        Duration::from_millis(self.fade_out_ms)
    }

    pub fn fade_in(&self) -> Duration {
        Duration::from_millis(self.fade_in_ms)
    }

    pub fn default_hide_delay(&self) -> Duration {
        Duration::from_millis(self.default_hide_delay_ms)
    }
}
