//! Modal Lock/Restore - Pin every widget hidden while an overlay is open
//!
//! `lock_modal` snapshots the displayed value of every mounted component, locks
//! them all hidden and disables scroll navigation. `restore_modal` releases
//! each lock with the snapshot value, so whatever other code wrote while the
//! modal was open, the widgets come back exactly as they were.
//!
//! Like the focus trap stack it resembles, restore and cleanup tolerate being
//! called for a modal that is not open; teardown order is never guaranteed.

use std::cell::RefCell;
use std::collections::{BTreeMap, HashMap};
use std::rc::Rc;

use super::registry::ComponentRegistry;
use crate::types::ComponentId;

/// Displayed values captured when a modal opened.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModalSnapshot {
    pub modal_id: String,
    pub saved_states: BTreeMap<ComponentId, bool>,
    /// Whether scroll navigation was disabled before the modal opened.
    pub scroll_was_disabled: bool,
}

/// Shared modal manager. Clones refer to the same snapshots.
#[derive(Clone)]
pub struct ModalManager {
    registry: ComponentRegistry,
    snapshots: Rc<RefCell<HashMap<String, ModalSnapshot>>>,
}

impl ModalManager {
    pub fn new(registry: ComponentRegistry) -> Self {
        Self {
            registry,
            snapshots: Rc::new(RefCell::new(HashMap::new())),
        }
    }

    /// Snapshot, hide and lock every mounted component; disable scrolling.
    ///
    /// Opening a modal that is already open keeps the first snapshot.
    pub fn lock_modal(&self, modal_id: &str) {
        if self.snapshots.borrow().contains_key(modal_id) {
            tracing::debug!(modal = modal_id, "modal already locked; keeping first snapshot");
            return;
        }

        let viewport = self.registry.viewport();
        let saved_states: BTreeMap<ComponentId, bool> = self
            .registry
            .mounted_ids()
            .into_iter()
            .map(|id| (id, self.registry.displayed(id)))
            .collect();
        let ids: Vec<ComponentId> = saved_states.keys().copied().collect();

        let snapshot = ModalSnapshot {
            modal_id: modal_id.to_string(),
            saved_states,
            scroll_was_disabled: viewport.is_scroll_disabled(),
        };
        self.snapshots
            .borrow_mut()
            .insert(modal_id.to_string(), snapshot);

        self.registry.lock_visibility(ids, false);
        viewport.set_scroll_disabled(true);
        tracing::info!(modal = modal_id, "modal locked");
    }

    /// Release every lock taken by `modal_id`, restoring the snapshot values.
    ///
    /// Returns false (and does nothing) if no snapshot exists.
    pub fn restore_modal(&self, modal_id: &str) -> bool {
        let Some(snapshot) = self.snapshots.borrow_mut().remove(modal_id) else {
            tracing::debug!(modal = modal_id, "restore without snapshot; ignoring");
            return false;
        };

        for (&id, &value) in &snapshot.saved_states {
            // The snapshot wins over whatever the lock entry recorded
            if self.registry.unlock_visibility(id, Some(value)) == 0 {
                self.registry.set_component_visibility(id, value);
            }
        }

        // Another open modal keeps scrolling disabled
        let other_open = !self.snapshots.borrow().is_empty();
        if !other_open {
            self.registry
                .viewport()
                .set_scroll_disabled(snapshot.scroll_was_disabled);
        }

        tracing::info!(modal = modal_id, "modal restored");
        true
    }

    /// Discard the snapshot for `modal_id` without restoring anything.
    pub fn cleanup_modal(&self, modal_id: &str) {
        self.snapshots.borrow_mut().remove(modal_id);
    }

    pub fn is_open(&self, modal_id: &str) -> bool {
        self.snapshots.borrow().contains_key(modal_id)
    }

    pub fn snapshot(&self, modal_id: &str) -> Option<ModalSnapshot> {
        self.snapshots.borrow().get(modal_id).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Breakpoints;
    use crate::state::{Viewport, VisibilityOptions};
    use std::time::Duration;
    use ComponentId::*;

    fn setup() -> (ModalManager, ComponentRegistry) {
        let registry =
            ComponentRegistry::new(Viewport::new(Breakpoints::default()), Duration::from_millis(300));
        registry.register_component(Navigation, VisibilityOptions::manual(true));
        registry.register_component(Highlight, VisibilityOptions::manual(false));
        registry.register_component(ChatButton, VisibilityOptions::manual(true));
        (ModalManager::new(registry.clone()), registry)
    }

    #[test]
    fn test_lock_captures_and_hides() {
        let (modals, registry) = setup();
        modals.lock_modal("demo");

        let snapshot = modals.snapshot("demo").unwrap();
        assert_eq!(snapshot.saved_states.get(&Navigation), Some(&true));
        assert_eq!(snapshot.saved_states.get(&Highlight), Some(&false));

        for id in [Navigation, Highlight, ChatButton] {
            assert!(!registry.displayed(id));
            assert!(registry.is_locked(id));
        }
        assert!(registry.viewport().is_scroll_disabled());
    }

    #[test]
    fn test_restore_ignores_writes_while_open() {
        let (modals, registry) = setup();
        modals.lock_modal("demo");

        registry.show_component(Highlight);
        registry.hide_component(Navigation);
        registry.reset_component_visibility(ChatButton);

        assert!(modals.restore_modal("demo"));
        assert!(registry.displayed(Navigation));
        assert!(!registry.displayed(Highlight));
        assert!(registry.displayed(ChatButton));
        assert!(!registry.is_locked(Navigation));
        assert!(!registry.viewport().is_scroll_disabled());
    }

    #[test]
    fn test_snapshot_wins_over_lock_entry() {
        let (modals, registry) = setup();
        // Another subsystem locked Highlight visible before the modal opened
        registry.lock_visibility(Highlight, true);
        modals.lock_modal("demo");
        assert!(!registry.displayed(Highlight));

        modals.restore_modal("demo");
        assert!(registry.displayed(Highlight), "snapshot value was true");
    }

    #[test]
    fn test_double_close_is_noop() {
        let (modals, registry) = setup();
        modals.lock_modal("demo");
        assert!(modals.restore_modal("demo"));

        registry.hide_component(Navigation);
        assert!(!modals.restore_modal("demo"));
        assert!(!registry.displayed(Navigation));
    }

    #[test]
    fn test_restore_after_unrelated_unlock() {
        let (modals, registry) = setup();
        modals.lock_modal("demo");
        // Unrelated teardown released the lock first
        registry.unlock_visibility(Navigation, Some(false));

        modals.restore_modal("demo");
        assert!(registry.displayed(Navigation));
    }

    #[test]
    fn test_cleanup_discards_snapshot() {
        let (modals, registry) = setup();
        modals.lock_modal("demo");
        modals.cleanup_modal("demo");
        assert!(!modals.is_open("demo"));
        assert!(!modals.restore_modal("demo"));
        assert!(registry.is_locked(Navigation));
        modals.cleanup_modal("demo");
    }

    #[test]
    fn test_scroll_state_restored() {
        let (modals, registry) = setup();
        registry.viewport().set_scroll_disabled(true);
        modals.lock_modal("demo");
        modals.restore_modal("demo");
        assert!(registry.viewport().is_scroll_disabled());
    }
}
