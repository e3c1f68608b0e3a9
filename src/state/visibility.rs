//! Visibility Primitive - Per-component reactive visibility
//!
//! Each floating component has a raw `visible` flag computed by its mode, and
//! an override channel that, when set, supersedes it:
//!
//! ```text
//! displayed = override ?? visible
//! ```
//!
//! # Modes
//!
//! - **Manual** - only `show` / `hide` / `toggle` change the raw flag
//! - **TimeCycle** - alternates on two independent delays
//! - **AreaProximity** - shown while the pointer is within a radius, hidden a
//!   delay after it leaves
//! - **TriggerOnly** - `trigger()` shows, the hide delay hides again
//!
//! `show`, `hide` and `toggle` cancel every pending timer first, so a stale
//! timer can never overwrite a newer intent.
//!
//! # Example
//!
//! ```ignore
//! let highlight = registry.register_component(
//!     ComponentId::Highlight,
//!     VisibilityOptions::area(Area::new(Point::new(500.0, 500.0), 100.0)),
//! );
//!
//! viewport.pointer_moved(Point::new(550.0, 500.0), Instant::now());
//! assert!(highlight.displayed());
//! ```

use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};
use std::time::Duration;

use spark_signals::{derived, signal, Derived, Signal};

use super::lock::LockTable;
use super::timer::TimerSlot;
use super::viewport::Viewport;
use crate::types::{Area, Cleanup, ComponentFlags, ComponentId, Point, VisibilityMode};

/// Shortest cycle phase. Keeps a zero-length phase from spinning.
const MIN_CYCLE_PHASE: Duration = Duration::from_millis(1);

// =============================================================================
// OPTIONS
// =============================================================================

/// Phase lengths for TimeCycle mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CycleTiming {
    pub visible_for: Duration,
    pub hidden_for: Duration,
}

impl Default for CycleTiming {
    fn default() -> Self {
        Self {
            visible_for: Duration::from_secs(5),
            hidden_for: Duration::from_secs(5),
        }
    }
}

/// Mount-time configuration of a component.
#[derive(Debug, Clone, PartialEq)]
pub struct VisibilityOptions {
    pub mode: VisibilityMode,
    pub initial_visible: bool,
    /// Delay before hiding in AreaProximity and TriggerOnly modes.
    /// `None` uses the stage default.
    pub hide_delay: Option<Duration>,
    pub cycle: CycleTiming,
    /// Required for AreaProximity mode.
    pub area: Option<Area>,
}

impl Default for VisibilityOptions {
    fn default() -> Self {
        Self {
            mode: VisibilityMode::Manual,
            initial_visible: false,
            hide_delay: None,
            cycle: CycleTiming::default(),
            area: None,
        }
    }
}

impl VisibilityOptions {
    pub fn manual(initial_visible: bool) -> Self {
        Self {
            initial_visible,
            ..Self::default()
        }
    }

    pub fn time_cycle(visible_for: Duration, hidden_for: Duration) -> Self {
        Self {
            mode: VisibilityMode::TimeCycle,
            initial_visible: true,
            cycle: CycleTiming {
                visible_for,
                hidden_for,
            },
            ..Self::default()
        }
    }

    pub fn area(area: Area) -> Self {
        Self {
            mode: VisibilityMode::AreaProximity,
            area: Some(area),
            ..Self::default()
        }
    }

    pub fn trigger_only() -> Self {
        Self {
            mode: VisibilityMode::TriggerOnly,
            ..Self::default()
        }
    }

    pub fn with_hide_delay(mut self, delay: Duration) -> Self {
        self.hide_delay = Some(delay);
        self
    }

    pub fn with_initial_visible(mut self, visible: bool) -> Self {
        self.initial_visible = visible;
        self
    }
}

// =============================================================================
// SLOT - Reactive channels, one per ComponentId for the registry's lifetime
// =============================================================================

/// The reactive channels of one component.
///
/// Slots outlive mounts, so subscriptions taken before a component mounts
/// (or across a remount) keep working.
#[derive(Clone)]
pub struct VisibilitySlot {
    id: ComponentId,
    visible: Signal<bool>,
    override_value: Signal<Option<bool>>,
    displayed: Derived<bool>,
    mounted: Signal<bool>,
    flags: Rc<Cell<ComponentFlags>>,
}

impl VisibilitySlot {
    pub fn new(id: ComponentId) -> Self {
        let visible = signal(false);
        let override_value: Signal<Option<bool>> = signal(None);

        let v = visible.clone();
        let o = override_value.clone();
        let displayed = derived(move || o.get().unwrap_or_else(|| v.get()));

        Self {
            id,
            visible,
            override_value,
            displayed,
            mounted: signal(false),
            flags: Rc::new(Cell::new(ComponentFlags::NONE)),
        }
    }

    pub fn id(&self) -> ComponentId {
        self.id
    }

    /// Published value: override if set, raw flag otherwise.
    pub fn displayed(&self) -> bool {
        self.displayed.get()
    }

    pub fn visible(&self) -> bool {
        self.visible.get()
    }

    pub fn override_value(&self) -> Option<bool> {
        self.override_value.get()
    }

    pub fn is_mounted(&self) -> bool {
        self.mounted.get()
    }

    pub fn flags(&self) -> ComponentFlags {
        self.flags.get()
    }

    pub fn set_flag(&self, flag: ComponentFlags, on: bool) {
        let mut flags = self.flags.get();
        flags.set(flag, on);
        self.flags.set(flags);
    }

    /// Write the override channel through the lock gate.
    pub(crate) fn write_override(&self, locks: &LockTable, value: Option<bool>) {
        self.override_value.set(locks.gate(self.id, value));
    }

    /// Write the override channel directly. Only lock/unlock may do this.
    pub(crate) fn force_override(&self, value: Option<bool>) {
        self.override_value.set(value);
    }

    pub(crate) fn set_visible(&self, visible: bool) {
        self.visible.set(visible);
    }

    pub(crate) fn set_mounted(&self, mounted: bool) {
        self.mounted.set(mounted);
    }
}

// =============================================================================
// VISIBILITY HANDLE
// =============================================================================

struct Inner {
    mode: VisibilityMode,
    hide_delay: Duration,
    cycle: CycleTiming,
    area: Option<Area>,
    near: bool,
    cycling: bool,
    hide_timer: TimerSlot,
    show_timer: TimerSlot,
    pointer_cleanup: Option<Cleanup>,
    viewport: Viewport,
    destroyed: bool,
}

/// Handle to a mounted component's visibility. Clones share state.
#[derive(Clone)]
pub struct Visibility {
    slot: VisibilitySlot,
    locks: LockTable,
    inner: Rc<RefCell<Inner>>,
}

/// Non-owning handle captured by timers and pointer handlers.
struct WeakVisibility {
    slot: VisibilitySlot,
    locks: LockTable,
    inner: Weak<RefCell<Inner>>,
}

impl WeakVisibility {
    fn upgrade(&self) -> Option<Visibility> {
        self.inner.upgrade().map(|inner| Visibility {
            slot: self.slot.clone(),
            locks: self.locks.clone(),
            inner,
        })
    }
}

impl Visibility {
    /// Mount a component on `slot` and start its mode.
    pub fn new(
        slot: VisibilitySlot,
        locks: LockTable,
        viewport: Viewport,
        options: VisibilityOptions,
        default_hide_delay: Duration,
    ) -> Self {
        let handle = Self {
            slot,
            locks,
            inner: Rc::new(RefCell::new(Inner {
                mode: VisibilityMode::Manual,
                hide_delay: options.hide_delay.unwrap_or(default_hide_delay),
                cycle: options.cycle,
                area: None,
                near: false,
                cycling: false,
                hide_timer: TimerSlot::new(),
                show_timer: TimerSlot::new(),
                pointer_cleanup: None,
                viewport,
                destroyed: false,
            })),
        };

        handle.slot.set_visible(options.initial_visible);
        handle.slot.set_mounted(true);

        match options.mode {
            VisibilityMode::Manual => {}
            VisibilityMode::TriggerOnly => handle.inner.borrow_mut().mode = VisibilityMode::TriggerOnly,
            VisibilityMode::TimeCycle => handle.start_time_cycle(),
            VisibilityMode::AreaProximity => match options.area {
                Some(area) => handle.enable_area_mode(area),
                None => tracing::warn!(
                    component = %handle.id(),
                    "area mode requested without an area; staying manual"
                ),
            },
        }

        handle
    }

    fn downgrade(&self) -> WeakVisibility {
        WeakVisibility {
            slot: self.slot.clone(),
            locks: self.locks.clone(),
            inner: Rc::downgrade(&self.inner),
        }
    }

    pub fn id(&self) -> ComponentId {
        self.slot.id()
    }

    pub fn slot(&self) -> &VisibilitySlot {
        &self.slot
    }

    pub fn mode(&self) -> VisibilityMode {
        self.inner.borrow().mode
    }

    pub fn is_visible(&self) -> bool {
        self.slot.visible()
    }

    pub fn displayed(&self) -> bool {
        self.slot.displayed()
    }

    pub fn override_value(&self) -> Option<bool> {
        self.slot.override_value()
    }

    pub fn is_cycling(&self) -> bool {
        self.inner.borrow().cycling
    }

    pub fn is_destroyed(&self) -> bool {
        self.inner.borrow().destroyed
    }

    /// Whether a hide or show timer is waiting to fire.
    pub fn has_pending_timer(&self) -> bool {
        let inner = self.inner.borrow();
        inner.hide_timer.is_pending() || inner.show_timer.is_pending()
    }

    // -------------------------------------------------------------------------
    // Manual control
    // -------------------------------------------------------------------------

    pub fn show(&self) {
        self.cancel_timers();
        self.slot.set_visible(true);
    }

    pub fn hide(&self) {
        self.cancel_timers();
        self.slot.set_visible(false);
    }

    pub fn toggle(&self) {
        self.cancel_timers();
        self.slot.set_visible(!self.slot.visible());
    }

    /// Write the override channel. `None` reverts to the raw flag.
    ///
    /// While the component is locked the locked value is written instead.
    pub fn set_show_component(&self, value: Option<bool>) {
        self.slot.write_override(&self.locks, value);
    }

    /// Show now and hide again after the hide delay.
    pub fn trigger(&self) {
        self.show();
        let delay = self.inner.borrow().hide_delay;
        self.schedule_hide(delay);
    }

    fn cancel_timers(&self) {
        let mut inner = self.inner.borrow_mut();
        inner.hide_timer.cancel();
        inner.show_timer.cancel();
        inner.cycling = false;
    }

    fn schedule_hide(&self, delay: Duration) {
        if delay.is_zero() {
            self.slot.set_visible(false);
            return;
        }

        let weak = self.downgrade();
        let mut inner = self.inner.borrow_mut();
        if inner.destroyed {
            return;
        }
        inner.hide_timer.schedule(delay, move || {
            if let Some(handle) = weak.upgrade() {
                handle.slot.set_visible(false);
            }
        });
    }

    // -------------------------------------------------------------------------
    // TimeCycle
    // -------------------------------------------------------------------------

    /// Start alternating. Leaves AreaProximity mode if it was active.
    pub fn start_time_cycle(&self) {
        self.disable_area_mode();
        self.cancel_timers();
        {
            let mut inner = self.inner.borrow_mut();
            if inner.destroyed {
                return;
            }
            inner.mode = VisibilityMode::TimeCycle;
            inner.cycling = true;
        }
        self.schedule_cycle_step();
    }

    pub fn stop_time_cycle(&self) {
        self.cancel_timers();
        let mut inner = self.inner.borrow_mut();
        if inner.mode == VisibilityMode::TimeCycle {
            inner.mode = VisibilityMode::Manual;
        }
    }

    fn schedule_cycle_step(&self) {
        let visible = self.slot.visible();
        let weak = self.downgrade();
        let tick = move || {
            if let Some(handle) = weak.upgrade() {
                handle.cycle_tick();
            }
        };

        let mut inner = self.inner.borrow_mut();
        if !inner.cycling || inner.destroyed {
            return;
        }
        if visible {
            let delay = inner.cycle.visible_for.max(MIN_CYCLE_PHASE);
            inner.hide_timer.schedule(delay, tick);
        } else {
            let delay = inner.cycle.hidden_for.max(MIN_CYCLE_PHASE);
            inner.show_timer.schedule(delay, tick);
        }
    }

    fn cycle_tick(&self) {
        if !self.inner.borrow().cycling {
            return;
        }
        self.slot.set_visible(!self.slot.visible());
        self.schedule_cycle_step();
    }

    // -------------------------------------------------------------------------
    // AreaProximity
    // -------------------------------------------------------------------------

    /// Follow the pointer around `area`. Leaves TimeCycle mode if it was active.
    pub fn enable_area_mode(&self, area: Area) {
        self.disable_area_mode();
        self.cancel_timers();

        let viewport = {
            let inner = self.inner.borrow();
            if inner.destroyed {
                return;
            }
            inner.viewport.clone()
        };

        let weak = self.downgrade();
        let unsubscribe = viewport.on_pointer_move(move |point| {
            if let Some(handle) = weak.upgrade() {
                handle.on_pointer(point);
            }
        });

        {
            let mut inner = self.inner.borrow_mut();
            inner.mode = VisibilityMode::AreaProximity;
            inner.area = Some(area);
            inner.near = false;
            inner.pointer_cleanup = Some(Box::new(unsubscribe));
        }

        if let Some(point) = viewport.pointer() {
            self.on_pointer(point);
        }
    }

    /// Stop following the pointer. Pending timers are left alone.
    pub fn disable_area_mode(&self) {
        let cleanup = {
            let mut inner = self.inner.borrow_mut();
            if inner.mode == VisibilityMode::AreaProximity {
                inner.mode = VisibilityMode::Manual;
            }
            inner.area = None;
            inner.near = false;
            inner.pointer_cleanup.take()
        };
        if let Some(cleanup) = cleanup {
            cleanup();
        }
    }

    /// Re-centre the proximity area and re-evaluate against the last pointer.
    pub fn move_area(&self, center: Point) {
        let viewport = {
            let mut inner = self.inner.borrow_mut();
            match inner.area.as_mut() {
                Some(area) => area.center = center,
                None => return,
            }
            inner.viewport.clone()
        };
        if let Some(point) = viewport.pointer() {
            self.on_pointer(point);
        }
    }

    fn on_pointer(&self, point: Point) {
        let (was_near, near, delay) = {
            let mut inner = self.inner.borrow_mut();
            let Some(area) = inner.area else {
                return;
            };
            let near = area.contains(point);
            let was_near = inner.near;
            inner.near = near;
            (was_near, near, inner.hide_delay)
        };

        match (was_near, near) {
            (false, true) => self.show(),
            // Delayed so the pointer can cross the edge without flicker
            (true, false) => self.schedule_hide(delay),
            _ => {}
        }
    }

    // -------------------------------------------------------------------------
    // Mode switching and teardown
    // -------------------------------------------------------------------------

    /// Switch mode, cancelling timers first. AreaProximity needs an area.
    pub fn set_mode(&self, mode: VisibilityMode, area: Option<Area>) -> bool {
        let area = area.or_else(|| self.inner.borrow().area);
        match mode {
            VisibilityMode::TimeCycle => self.start_time_cycle(),
            VisibilityMode::AreaProximity => match area {
                Some(area) => self.enable_area_mode(area),
                None => {
                    tracing::warn!(component = %self.id(), "area mode requires an area");
                    return false;
                }
            },
            VisibilityMode::Manual | VisibilityMode::TriggerOnly => {
                self.disable_area_mode();
                self.cancel_timers();
                self.inner.borrow_mut().mode = mode;
            }
        }
        true
    }

    /// Cancel every timer and remove every listener.
    pub fn destroy(&self) {
        let cleanup = {
            let mut inner = self.inner.borrow_mut();
            inner.destroyed = true;
            inner.cycling = false;
            inner.hide_timer.cancel();
            inner.show_timer.cancel();
            inner.area = None;
            inner.pointer_cleanup.take()
        };
        if let Some(cleanup) = cleanup {
            cleanup();
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================
