//! # pageflow
//!
//! Reactive section navigation and floating-widget visibility for
//! full-viewport, sectioned sites.
//!
//! Built on [spark-signals](https://github.com/RLabs-Inc/spark-signals) for
//! fine-grained reactivity and a single-threaded tokio `LocalSet` for timers.
//!
//! ## Architecture
//!
//! A fixed sequence of sections is shown one at a time. A handful of floating
//! widgets (navigation, chat button, booking button, ...) live outside the
//! section content; which of them are visible depends on the active section,
//! the pointer, timers, open modals and explicit caller requests.
//!
//! ```text
//! input ──▶ InputNormalizer ──▶ Navigator ──▶ PolicyEngine ──▶ ComponentRegistry
//!                                  │ (cooldown,         (section table)     │ (override channel,
//!                                  │  in-flight gate)                        │  lock gate)
//!                                  ▼                                         ▼
//!                               Viewport ◀──── pointer ──── Visibility (per component mode)
//! ```
//!
//! Everything is owned by one [`Stage`], constructed at startup and passed by
//! reference to whatever needs it.
//!
//! ## Modules
//!
//! - [`types`] - Section and component ids, geometry, visibility modes
//! - [`state`] - Viewport state, visibility primitive, lock table, timers
//! - [`engine`] - Component registry, section policy, modal lock/restore
//! - [`navigation`] - Navigator and input normalizer
//! - [`config`] - TOML-loadable stage configuration
//! - [`stage`] - The application context

pub mod config;
pub mod engine;
pub mod error;
pub mod navigation;
pub mod stage;
pub mod state;
pub mod types;

// Re-export commonly used items
pub use types::*;

pub use config::{Breakpoints, StageConfig};

pub use engine::{
    ComponentRegistry, ModalManager, ModalSnapshot, PolicyEngine, SectionComponentOptions,
    SectionConfig, SectionEvent, SectionPhase, SectionTable,
};

pub use error::{ConfigError, NavigationError, RegistrationError, UnknownId};

pub use navigation::{
    InputEvent, InputNormalizer, KeyboardEvent, Modifiers, NavState, NavigationCallbacks,
    NavigationTimings, Navigator,
};

pub use stage::{InputOutcome, Stage};

pub use state::{CycleTiming, LockEntry, Viewport, Visibility, VisibilityOptions, VisibilitySlot};
