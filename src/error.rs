//! Error types.
//!
//! Nothing in pageflow is fatal. Navigation entry points return
//! [`NavigationError`] so callers can tell "moved" from "no-op", and config
//! loading returns [`ConfigError`].

use thiserror::Error;

use crate::types::{ComponentId, SectionId};

/// An identifier string that names no known section or component.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UnknownId {
    #[error("unknown section id `{0}`")]
    Section(String),
    #[error("unknown component id `{0}`")]
    Component(String),
}

/// Why a navigation attempt did not move.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NavigationError {
    #[error("section index {index} out of range (0..{len})")]
    OutOfRange { index: usize, len: usize },
    #[error("section `{0}` is already active")]
    AlreadyActive(SectionId),
    #[error("a section transition is already in flight")]
    InFlight,
    #[error("scroll cooldown has not elapsed")]
    CooldownActive,
    #[error("scrolling is disabled")]
    ScrollDisabled,
    #[error("no section beyond `{0}`")]
    Boundary(SectionId),
    #[error(transparent)]
    UnknownSection(#[from] UnknownId),
    #[error("preload for `{section}` failed: {message}")]
    Preload { section: SectionId, message: String },
}

impl NavigationError {
    /// Expected, frequent rejections that should never reach the user.
    pub fn is_precondition(&self) -> bool {
        matches!(
            self,
            Self::InFlight | Self::CooldownActive | Self::ScrollDisabled | Self::Boundary(_)
        )
    }
}

/// Invalid configuration or section table.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("section `{section}` both hides and shows `{component}` on entry")]
    OverlappingLists {
        section: SectionId,
        component: ComponentId,
    },
    #[error("section `{section}` lists manual component `{component}` in its entry/exit lists")]
    ManualOverlap {
        section: SectionId,
        component: ComponentId,
    },
}

/// Rejected section-component registration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistrationError {
    #[error("`{component}` is not a manual component of section `{section}`")]
    NotManual {
        section: SectionId,
        component: ComponentId,
    },
}
