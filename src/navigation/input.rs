//! Scroll Input Normalizer - Wheel, keyboard and touch reduced to a direction
//!
//! Three event sources feed navigation. Each is reduced to a single
//! [`Direction`] here; gating against the navigator's cooldown happens in the
//! caller, so every source passes through the same gate.
//!
//! # Keys
//!
//! | Key                    | Direction |
//! |------------------------|-----------|
//! | ArrowDown, PageDown    | Down      |
//! | Space                  | Down      |
//! | ArrowUp, PageUp        | Up        |
//! | Shift+Space            | Up        |
//!
//! Swipes count only when vertical travel exceeds the configured threshold.

use std::cell::Cell;

use tokio::time::Instant;

use crate::state::Viewport;
use crate::types::{Direction, Point};

// =============================================================================
// TYPES
// =============================================================================

/// Keyboard modifier state
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Modifiers {
    pub ctrl: bool,
    pub alt: bool,
    pub shift: bool,
    pub meta: bool,
}

impl Modifiers {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn shift() -> Self {
        Self { shift: true, ..Self::default() }
    }
}

/// Key event state (press, repeat, release)
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum KeyState {
    #[default]
    Press,
    Repeat,
    Release,
}

/// Keyboard event
#[derive(Clone, Debug, PartialEq)]
pub struct KeyboardEvent {
    /// Key name as reported by the host (e.g., "ArrowUp", " ", "PageDown")
    pub key: String,
    pub modifiers: Modifiers,
    pub state: KeyState,
}

impl KeyboardEvent {
    /// Create a simple key press event
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            modifiers: Modifiers::default(),
            state: KeyState::Press,
        }
    }

    /// Create a key press with modifiers
    pub fn with_modifiers(key: impl Into<String>, modifiers: Modifiers) -> Self {
        Self {
            key: key.into(),
            modifiers,
            state: KeyState::Press,
        }
    }

    pub fn is_press(&self) -> bool {
        self.state == KeyState::Press
    }
}

/// Raw input from the host.
#[derive(Clone, Debug, PartialEq)]
pub enum InputEvent {
    /// Wheel movement; positive `delta_y` scrolls down.
    Wheel { delta_y: f64 },
    Key(KeyboardEvent),
    TouchStart(Point),
    TouchEnd(Point),
}

// =============================================================================
// NORMALIZER
// =============================================================================

pub struct InputNormalizer {
    viewport: Viewport,
    swipe_threshold: f64,
    touch_start: Cell<Option<Point>>,
}

impl InputNormalizer {
    pub fn new(viewport: Viewport, swipe_threshold: f64) -> Self {
        Self {
            viewport,
            swipe_threshold,
            touch_start: Cell::new(None),
        }
    }

    pub fn swipe_threshold(&self) -> f64 {
        self.swipe_threshold
    }

    /// Reduce `event` to a direction, recording it in the scroll state.
    ///
    /// Returns `None` for events that carry no direction (zero wheel delta,
    /// unmapped keys, key releases, short swipes, touch start).
    pub fn normalize(&self, event: &InputEvent, now: Instant) -> Option<Direction> {
        let (direction, delta) = match event {
            InputEvent::Wheel { delta_y } => (wheel_direction(*delta_y)?, *delta_y),
            InputEvent::Key(key) => {
                let direction = key_direction(key)?;
                (direction, direction.step() as f64)
            }
            InputEvent::TouchStart(point) => {
                self.touch_start.set(Some(*point));
                self.viewport.set_touch(true);
                return None;
            }
            InputEvent::TouchEnd(end) => {
                let start = self.touch_start.take()?;
                let travel = start.y - end.y;
                (swipe_direction(travel, self.swipe_threshold)?, travel)
            }
        };

        self.viewport.record_scroll(direction, delta, now);
        Some(direction)
    }
}

/// Sign of the wheel delta. Zero carries no direction.
pub fn wheel_direction(delta_y: f64) -> Option<Direction> {
    if delta_y > 0.0 {
        Some(Direction::Down)
    } else if delta_y < 0.0 {
        Some(Direction::Up)
    } else {
        None
    }
}

/// Only presses count; auto-repeat of a held key never navigates.
pub fn key_direction(event: &KeyboardEvent) -> Option<Direction> {
    if !event.is_press() {
        return None;
    }
    match event.key.as_str() {
        "ArrowDown" | "PageDown" => Some(Direction::Down),
        "ArrowUp" | "PageUp" => Some(Direction::Up),
        " " | "Space" | "Spacebar" => Some(if event.modifiers.shift {
            Direction::Up
        } else {
            Direction::Down
        }),
        _ => None,
    }
}

/// `travel` is start.y - end.y: finger moving up (positive) scrolls down.
pub fn swipe_direction(travel: f64, threshold: f64) -> Option<Direction> {
    if travel.abs() <= threshold {
        return None;
    }
    Some(if travel > 0.0 { Direction::Down } else { Direction::Up })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Breakpoints;

    fn setup() -> InputNormalizer {
        InputNormalizer::new(Viewport::new(Breakpoints::default()), 50.0)
    }

    #[test]
    fn test_wheel_sign() {
        let input = setup();
        let now = Instant::now();
        assert_eq!(
            input.normalize(&InputEvent::Wheel { delta_y: 120.0 }, now),
            Some(Direction::Down)
        );
        assert_eq!(
            input.normalize(&InputEvent::Wheel { delta_y: -3.0 }, now),
            Some(Direction::Up)
        );
        assert_eq!(input.normalize(&InputEvent::Wheel { delta_y: 0.0 }, now), None);
    }

    #[test]
    fn test_key_mapping() {
        let cases = [
            (KeyboardEvent::new("ArrowDown"), Some(Direction::Down)),
            (KeyboardEvent::new("PageDown"), Some(Direction::Down)),
            (KeyboardEvent::new(" "), Some(Direction::Down)),
            (KeyboardEvent::new("ArrowUp"), Some(Direction::Up)),
            (KeyboardEvent::new("PageUp"), Some(Direction::Up)),
            (KeyboardEvent::with_modifiers(" ", Modifiers::shift()), Some(Direction::Up)),
            (KeyboardEvent::new("Enter"), None),
            (KeyboardEvent::new("ArrowLeft"), None),
        ];
        for (event, expected) in cases {
            assert_eq!(key_direction(&event), expected, "{}", event.key);
        }
    }

    #[test]
    fn test_key_release_ignored() {
        let mut event = KeyboardEvent::new("ArrowDown");
        event.state = KeyState::Release;
        assert_eq!(key_direction(&event), None);
    }

    #[test]
    fn test_key_repeat_ignored() {
        let mut event = KeyboardEvent::new("PageDown");
        event.state = KeyState::Repeat;
        assert_eq!(key_direction(&event), None);

        let input = setup();
        assert_eq!(input.normalize(&InputEvent::Key(event), Instant::now()), None);
        assert_eq!(input.viewport.scroll().direction, None);
    }

    #[test]
    fn test_swipe_threshold() {
        let input = setup();
        let now = Instant::now();

        input.normalize(&InputEvent::TouchStart(Point::new(100.0, 400.0)), now);
        assert_eq!(
            input.normalize(&InputEvent::TouchEnd(Point::new(100.0, 360.0)), now),
            None,
            "40px is below the threshold"
        );

        input.normalize(&InputEvent::TouchStart(Point::new(100.0, 400.0)), now);
        assert_eq!(
            input.normalize(&InputEvent::TouchEnd(Point::new(100.0, 300.0)), now),
            Some(Direction::Down)
        );

        input.normalize(&InputEvent::TouchStart(Point::new(100.0, 300.0)), now);
        assert_eq!(
            input.normalize(&InputEvent::TouchEnd(Point::new(100.0, 420.0)), now),
            Some(Direction::Up)
        );
    }

    #[test]
    fn test_touch_end_without_start() {
        let input = setup();
        assert_eq!(
            input.normalize(&InputEvent::TouchEnd(Point::new(0.0, 0.0)), Instant::now()),
            None
        );
    }

    #[test]
    fn test_records_scroll_state() {
        let input = setup();
        input.normalize(&InputEvent::Wheel { delta_y: 80.0 }, Instant::now());

        let scroll = input.viewport.scroll();
        assert_eq!(scroll.direction, Some(Direction::Down));
        assert!(scroll.is_scrolling);
        assert!(scroll.last_scroll_time.is_some());
    }
}
