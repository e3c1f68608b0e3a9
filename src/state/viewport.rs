//! Viewport State - Session-wide scroll, section, mouse and responsive state
//!
//! One `Viewport` exists per stage. Each sub-state is a signal holding a whole
//! value; updates read the current value, modify a copy and write it back.
//!
//! # Sub-states
//!
//! - **Scroll** - direction, velocity and timing of the last scroll input
//! - **Section** - current/previous/target section and transition progress
//! - **Mouse** - pointer position and button state
//! - **Responsive** - viewport size and breakpoint
//!
//! Pointer movement is also dispatched to registered handlers, which is how
//! proximity-driven components follow the cursor.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;

use spark_signals::{signal, Signal};
use tokio::time::Instant;

use crate::config::Breakpoints;
use crate::types::{Direction, Point, SectionId};

// =============================================================================
// TYPES
// =============================================================================

#[derive(Debug, Clone, PartialEq, Default)]
pub struct ScrollState {
    pub x: f64,
    pub y: f64,
    pub direction: Option<Direction>,
    pub is_scrolling: bool,
    pub is_disabled: bool,
    /// Pixels per millisecond between the last two scroll inputs.
    pub velocity: f64,
    pub last_scroll_time: Option<Instant>,
}

/// Where a section's element sits, as reported by the renderer.
#[derive(Debug, Clone, PartialEq)]
pub struct SectionElement {
    pub anchor: String,
    pub offset_top: f64,
    pub height: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SectionState {
    pub current: SectionId,
    pub previous: Option<SectionId>,
    pub target: Option<SectionId>,
    /// True from commit of a new section until its fade-in completes.
    pub is_navigating: bool,
    pub navigation_progress: f32,
    pub section_elements: BTreeMap<SectionId, SectionElement>,
}

impl Default for SectionState {
    fn default() -> Self {
        Self {
            current: SectionId::first(),
            previous: None,
            target: None,
            is_navigating: false,
            navigation_progress: 0.0,
            section_elements: BTreeMap::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct MouseState {
    pub position: Option<Point>,
    pub is_down: bool,
    pub last_move: Option<Instant>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Breakpoint {
    Mobile,
    Tablet,
    #[default]
    Desktop,
}

impl Breakpoint {
    pub fn for_width(width: f64, breakpoints: &Breakpoints) -> Self {
        if width <= breakpoints.mobile_max {
            Self::Mobile
        } else if width <= breakpoints.tablet_max {
            Self::Tablet
        } else {
            Self::Desktop
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct ResponsiveState {
    pub width: f64,
    pub height: f64,
    pub breakpoint: Breakpoint,
    pub is_touch: bool,
}

/// Handler for pointer movement.
pub type PointerHandler = Rc<dyn Fn(Point)>;

#[derive(Default)]
struct PointerHandlers {
    handlers: Vec<(usize, PointerHandler)>,
    next_id: usize,
}

// =============================================================================
// VIEWPORT
// =============================================================================

/// Shared handle to the viewport state. Clones refer to the same state.
#[derive(Clone)]
pub struct Viewport {
    scroll: Signal<ScrollState>,
    section: Signal<SectionState>,
    mouse: Signal<MouseState>,
    responsive: Signal<ResponsiveState>,
    breakpoints: Breakpoints,
    pointer_handlers: Rc<RefCell<PointerHandlers>>,
}

fn update<T: Clone + PartialEq + 'static>(sig: &Signal<T>, f: impl FnOnce(&mut T)) {
    let mut value = sig.get();
    f(&mut value);
    sig.set(value);
}

impl Viewport {
    pub fn new(breakpoints: Breakpoints) -> Self {
        Self {
            scroll: signal(ScrollState::default()),
            section: signal(SectionState::default()),
            mouse: signal(MouseState::default()),
            responsive: signal(ResponsiveState::default()),
            breakpoints,
            pointer_handlers: Rc::new(RefCell::new(PointerHandlers::default())),
        }
    }

    // -------------------------------------------------------------------------
    // Snapshots and signals
    // -------------------------------------------------------------------------

    pub fn scroll(&self) -> ScrollState {
        self.scroll.get()
    }

    pub fn section(&self) -> SectionState {
        self.section.get()
    }

    pub fn mouse(&self) -> MouseState {
        self.mouse.get()
    }

    pub fn responsive(&self) -> ResponsiveState {
        self.responsive.get()
    }

    pub fn scroll_signal(&self) -> Signal<ScrollState> {
        self.scroll.clone()
    }

    pub fn section_signal(&self) -> Signal<SectionState> {
        self.section.clone()
    }

    pub fn current_section(&self) -> SectionId {
        self.section.get().current
    }

    pub fn previous_section(&self) -> Option<SectionId> {
        self.section.get().previous
    }

    pub fn is_navigating(&self) -> bool {
        self.section.get().is_navigating
    }

    // -------------------------------------------------------------------------
    // Scroll
    // -------------------------------------------------------------------------

    pub fn is_scroll_disabled(&self) -> bool {
        self.scroll.get().is_disabled
    }

    pub fn set_scroll_disabled(&self, disabled: bool) {
        update(&self.scroll, |s| s.is_disabled = disabled);
    }

    /// Record one scroll input of `delta` pixels.
    pub fn record_scroll(&self, direction: Direction, delta: f64, now: Instant) {
        update(&self.scroll, |s| {
            let elapsed_ms = s
                .last_scroll_time
                .map(|last| now.saturating_duration_since(last).as_secs_f64() * 1000.0)
                .unwrap_or(0.0)
                .max(1.0);
            s.velocity = delta.abs() / elapsed_ms;
            s.y += delta;
            s.direction = Some(direction);
            s.is_scrolling = true;
            s.last_scroll_time = Some(now);
        });
    }

    pub fn end_scroll(&self) {
        update(&self.scroll, |s| {
            s.is_scrolling = false;
            s.velocity = 0.0;
        });
    }

    // -------------------------------------------------------------------------
    // Section
    // -------------------------------------------------------------------------

    pub fn begin_navigation(&self, target: SectionId) {
        update(&self.section, |s| {
            s.target = Some(target);
            s.navigation_progress = 0.0;
        });
    }

    /// Make `to` current. `previous` is written here and nowhere else.
    pub fn commit_section(&self, to: SectionId) {
        update(&self.section, |s| {
            s.previous = Some(s.current);
            s.current = to;
            s.target = None;
            s.is_navigating = true;
            s.navigation_progress = 0.5;
        });
    }

    pub fn finish_navigation(&self) {
        update(&self.section, |s| {
            s.is_navigating = false;
            s.navigation_progress = 1.0;
        });
    }

    pub fn abort_navigation(&self) {
        update(&self.section, |s| {
            s.target = None;
            s.navigation_progress = 0.0;
        });
    }

    pub fn register_section_element(&self, section: SectionId, element: SectionElement) {
        update(&self.section, |s| {
            s.section_elements.insert(section, element);
        });
    }

    pub fn section_element(&self, section: SectionId) -> Option<SectionElement> {
        self.section.get().section_elements.get(&section).cloned()
    }

    // -------------------------------------------------------------------------
    // Mouse
    // -------------------------------------------------------------------------

    pub fn pointer(&self) -> Option<Point> {
        self.mouse.get().position
    }

    /// Record a pointer move and notify every pointer handler.
    pub fn pointer_moved(&self, position: Point, now: Instant) {
        update(&self.mouse, |m| {
            m.position = Some(position);
            m.last_move = Some(now);
        });

        // Clone out so handlers may unregister themselves
        let handlers: Vec<PointerHandler> = self
            .pointer_handlers
            .borrow()
            .handlers
            .iter()
            .map(|(_, h)| h.clone())
            .collect();
        for handler in handlers {
            handler(position);
        }
    }

    pub fn set_pointer_down(&self, down: bool) {
        update(&self.mouse, |m| m.is_down = down);
    }

    /// Subscribe to pointer movement. Returns the unsubscribe function.
    pub fn on_pointer_move<F>(&self, handler: F) -> impl FnOnce() + use<F>
    where
        F: Fn(Point) + 'static,
    {
        let id = {
            let mut reg = self.pointer_handlers.borrow_mut();
            let id = reg.next_id;
            reg.next_id += 1;
            reg.handlers.push((id, Rc::new(handler)));
            id
        };

        let registry = self.pointer_handlers.clone();
        move || {
            registry.borrow_mut().handlers.retain(|(hid, _)| *hid != id);
        }
    }

    pub fn pointer_listener_count(&self) -> usize {
        self.pointer_handlers.borrow().handlers.len()
    }

    // -------------------------------------------------------------------------
    // Responsive
    // -------------------------------------------------------------------------

    pub fn resize(&self, width: f64, height: f64) {
        let breakpoint = Breakpoint::for_width(width, &self.breakpoints);
        update(&self.responsive, |r| {
            r.width = width;
            r.height = height;
            r.breakpoint = breakpoint;
        });
    }

    pub fn set_touch(&self, is_touch: bool) {
        update(&self.responsive, |r| r.is_touch = is_touch);
    }
}
