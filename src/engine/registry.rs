//! Component Registry - Mounted components, override writes and locks
//!
//! Owns one `VisibilitySlot` per `ComponentId` for the whole session and the
//! `Visibility` handle of each mounted component. Every write to a
//! component's override channel goes through here (or through the handle),
//! and therefore through the lock gate.
//!
//! # API
//!
//! - `register_component(id, options)` / `unregister_component(id)` - mount/unmount
//! - `show_component` / `hide_component` / `reset_component_visibility` - override writes
//! - `lock_visibility` / `unlock_visibility` / `is_visibility_locked` - pinning
//! - `subscribe` / `subscribe_all` - replay current value, then every change
//! - `schedule_hide` / `cancel_scheduled_hide` - one delayed hide per component
//!
//! Any override write cancels the component's scheduled hide, so a hide
//! requested earlier never lands on top of a later show.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::{Rc, Weak};
use std::time::Duration;

use spark_signals::effect;

use crate::state::{
    LockTable, TimerSlot, Viewport, Visibility, VisibilityOptions, VisibilitySlot,
};
use crate::types::{Cleanup, ComponentFlags, ComponentId, Targets};

// =============================================================================
// Registry State
// =============================================================================

struct RegistryInner {
    /// Indexed by `ComponentId::index()`. Never changes after construction.
    slots: Vec<VisibilitySlot>,
    mounted: RefCell<BTreeMap<ComponentId, Visibility>>,
    /// Delayed override hides, at most one per component.
    pending_hides: RefCell<BTreeMap<ComponentId, TimerSlot>>,
    locks: LockTable,
    viewport: Viewport,
    default_hide_delay: Duration,
}

/// Shared registry handle. Clones refer to the same registry.
#[derive(Clone)]
pub struct ComponentRegistry {
    inner: Rc<RegistryInner>,
}

impl ComponentRegistry {
    pub fn new(viewport: Viewport, default_hide_delay: Duration) -> Self {
        Self {
            inner: Rc::new(RegistryInner {
                slots: ComponentId::ALL.into_iter().map(VisibilitySlot::new).collect(),
                mounted: RefCell::new(BTreeMap::new()),
                pending_hides: RefCell::new(BTreeMap::new()),
                locks: LockTable::new(),
                viewport,
                default_hide_delay,
            }),
        }
    }

    pub fn slot(&self, id: ComponentId) -> &VisibilitySlot {
        &self.inner.slots[id.index()]
    }

    pub fn locks(&self) -> &LockTable {
        &self.inner.locks
    }

    pub fn viewport(&self) -> &Viewport {
        &self.inner.viewport
    }

    // =========================================================================
    // Mount / Unmount
    // =========================================================================

    /// Mount `id`, replacing (and destroying) any handle already mounted.
    pub fn register_component(&self, id: ComponentId, options: VisibilityOptions) -> Visibility {
        let previous = self.inner.mounted.borrow_mut().remove(&id);
        if let Some(previous) = previous {
            tracing::warn!(component = %id, "component registered twice; replacing");
            previous.destroy();
        }

        let handle = Visibility::new(
            self.slot(id).clone(),
            self.inner.locks.clone(),
            self.inner.viewport.clone(),
            options,
            self.inner.default_hide_delay,
        );

        // A component mounted while locked shows its locked value at once
        if let Some(entry) = self.inner.locks.entry(id) {
            self.slot(id).force_override(Some(entry.locked_value));
        }

        self.inner.mounted.borrow_mut().insert(id, handle.clone());
        tracing::debug!(component = %id, mode = ?handle.mode(), "component mounted");
        handle
    }

    /// Unmount `id`. Returns false if it was not mounted.
    pub fn unregister_component(&self, id: ComponentId) -> bool {
        let removed = self.inner.mounted.borrow_mut().remove(&id);
        match removed {
            Some(handle) => {
                handle.destroy();
                self.slot(id).set_mounted(false);
                tracing::debug!(component = %id, "component unmounted");
                true
            }
            None => {
                tracing::debug!(component = %id, "unregister of component that is not mounted");
                false
            }
        }
    }

    pub fn handle(&self, id: ComponentId) -> Option<Visibility> {
        self.inner.mounted.borrow().get(&id).cloned()
    }

    pub fn is_mounted(&self, id: ComponentId) -> bool {
        self.inner.mounted.borrow().contains_key(&id)
    }

    pub fn mounted_ids(&self) -> Vec<ComponentId> {
        self.inner.mounted.borrow().keys().copied().collect()
    }

    fn resolve(&self, targets: Targets) -> Vec<ComponentId> {
        match targets {
            Targets::All => self.mounted_ids(),
            Targets::Only(ids) => ids,
        }
    }

    /// Unmount everything.
    pub fn destroy_all(&self) {
        for id in self.mounted_ids() {
            self.unregister_component(id);
        }
    }

    // =========================================================================
    // Override Writes
    // =========================================================================

    pub fn show_component(&self, targets: impl Into<Targets>) {
        self.write_override(targets.into(), Some(true));
    }

    pub fn hide_component(&self, targets: impl Into<Targets>) {
        self.write_override(targets.into(), Some(false));
    }

    pub fn set_component_visibility(&self, targets: impl Into<Targets>, visible: bool) {
        self.write_override(targets.into(), Some(visible));
    }

    /// Clear the override so the computed value shows through.
    pub fn reset_component_visibility(&self, targets: impl Into<Targets>) {
        self.write_override(targets.into(), None);
    }

    fn write_override(&self, targets: Targets, value: Option<bool>) {
        for id in self.resolve(targets) {
            self.cancel_scheduled_hide(id);
            self.slot(id).write_override(&self.inner.locks, value);
        }
    }

    pub fn displayed(&self, id: ComponentId) -> bool {
        self.slot(id).displayed()
    }

    // =========================================================================
    // Delayed Hides
    // =========================================================================

    /// Hide `id` after `delay` unless it is busy by then. Replaces any hide
    /// already scheduled for `id`; the next override write cancels it.
    pub fn schedule_hide(&self, id: ComponentId, delay: Duration) {
        if delay.is_zero() {
            hide_unless_busy(self, id);
            return;
        }

        let weak = Rc::downgrade(&self.inner);
        let mut pending = self.inner.pending_hides.borrow_mut();
        pending.entry(id).or_default().schedule(delay, move || {
            if let Some(registry) = upgrade(&weak) {
                // Writes the slot directly; `hide_component` would cancel this timer
                if registry.is_interacting(id) {
                    tracing::debug!(component = %id, "skipping delayed hide of busy component");
                    return;
                }
                registry.slot(id).write_override(&registry.inner.locks, Some(false));
            }
        });
    }

    pub fn cancel_scheduled_hide(&self, id: ComponentId) {
        if let Some(timer) = self.inner.pending_hides.borrow_mut().get_mut(&id) {
            timer.cancel();
        }
    }

    pub fn has_scheduled_hide(&self, id: ComponentId) -> bool {
        self.inner
            .pending_hides
            .borrow()
            .get(&id)
            .is_some_and(TimerSlot::is_pending)
    }

    // =========================================================================
    // Interaction Flags
    // =========================================================================

    pub fn set_interacting(&self, id: ComponentId, interacting: bool) {
        self.slot(id).set_flag(ComponentFlags::INTERACTING, interacting);
    }

    pub fn set_hovered(&self, id: ComponentId, hovered: bool) {
        self.slot(id).set_flag(ComponentFlags::HOVERED, hovered);
    }

    /// Whether section policy must leave `id` alone.
    pub fn is_interacting(&self, id: ComponentId) -> bool {
        self.slot(id).flags().is_busy()
    }

    // =========================================================================
    // Locks
    // =========================================================================

    /// Pin the override of every target to `value`.
    ///
    /// The first lock of an id records the override it replaced; re-locking
    /// keeps that record.
    pub fn lock_visibility(&self, targets: impl Into<Targets>, value: bool) {
        let ids = self.resolve(targets.into());
        if ids.is_empty() {
            tracing::debug!("lock requested with no targets");
        }
        for id in ids {
            let slot = self.slot(id);
            self.inner.locks.lock(id, value, slot.override_value());
            slot.force_override(Some(value));
        }
    }

    /// Release every target, restoring `explicit` if given, otherwise the
    /// override recorded at lock time. Returns how many locks were released.
    ///
    /// Targets without a lock are skipped; independent callers may race to
    /// release the same id.
    pub fn unlock_visibility(&self, targets: impl Into<Targets>, explicit: Option<bool>) -> usize {
        let ids = match targets.into() {
            Targets::All => self.inner.locks.locked_ids(),
            Targets::Only(ids) => ids,
        };

        let mut released = 0;
        for id in ids {
            match self.inner.locks.unlock(id) {
                Some(entry) => {
                    self.cancel_scheduled_hide(id);
                    self.slot(id).force_override(explicit.or(entry.original_value));
                    released += 1;
                }
                None => tracing::debug!(component = %id, "unlock without lock; ignoring"),
            }
        }
        released
    }

    /// True only if every target is locked.
    pub fn is_visibility_locked(&self, targets: impl Into<Targets>) -> bool {
        let ids = self.resolve(targets.into());
        self.inner.locks.are_all_locked(&ids)
    }

    pub fn is_locked(&self, id: ComponentId) -> bool {
        self.inner.locks.is_locked(id)
    }

    // =========================================================================
    // Subscriptions
    // =========================================================================

    /// Call `callback` with the displayed value of `id` now and on every change.
    pub fn subscribe(&self, id: ComponentId, callback: impl Fn(bool) + 'static) -> Cleanup {
        let slot = self.slot(id).clone();
        let stop = effect(move || callback(slot.displayed()));
        Box::new(stop)
    }

    /// Call `callback` with the displayed value of every mounted component now
    /// and whenever any of them changes or a component mounts or unmounts.
    pub fn subscribe_all(
        &self,
        callback: impl Fn(&BTreeMap<ComponentId, bool>) + 'static,
    ) -> Cleanup {
        let slots = self.inner.slots.clone();
        let stop = effect(move || {
            let snapshot: BTreeMap<ComponentId, bool> = slots
                .iter()
                .filter(|slot| slot.is_mounted())
                .map(|slot| (slot.id(), slot.displayed()))
                .collect();
            callback(&snapshot);
        });
        Box::new(stop)
    }
}

fn upgrade(weak: &Weak<RegistryInner>) -> Option<ComponentRegistry> {
    weak.upgrade().map(|inner| ComponentRegistry { inner })
}

/// Hide `id` through the override channel unless it is being interacted with.
pub(crate) fn hide_unless_busy(registry: &ComponentRegistry, id: ComponentId) {
    if registry.is_interacting(id) {
        tracing::debug!(component = %id, "skipping hide of busy component");
        return;
    }
    registry.hide_component(id);
}

// =============================================================================
// TESTS
// =============================================================================
