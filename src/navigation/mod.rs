//! Navigation - Section transitions and the input that drives them
//!
//! - **Navigator** - Idle/Transitioning state machine, cooldown gate, jumps
//! - **Input** - Wheel, keyboard and swipe reduced to one direction

pub mod input;
pub mod navigator;

pub use input::{InputEvent, InputNormalizer, KeyState, KeyboardEvent, Modifiers};
pub use navigator::{NavState, NavigationCallbacks, NavigationTimings, Navigator};
