//! State Module - Reactive runtime state
//!
//! - **Viewport** - Scroll, section, mouse and responsive sub-states
//! - **Visibility** - Per-component visibility primitive and its modes
//! - **Lock** - Pinned override values with exact restoration
//! - **Timer** - Tracked, cancellable delayed actions

pub mod lock;
pub mod timer;
pub mod viewport;
pub mod visibility;

pub use lock::{LockEntry, LockTable};
pub use timer::TimerSlot;
pub use viewport::{
    Breakpoint, MouseState, ResponsiveState, ScrollState, SectionElement, SectionState, Viewport,
};
pub use visibility::{CycleTiming, Visibility, VisibilityOptions, VisibilitySlot};
