//! Lock Table - Pinned override values with exact restoration
//!
//! A lock pins a component's override channel to `locked_value`. While an
//! entry exists, every override write for that component is replaced by the
//! locked value. The entry remembers the override that existed when the first
//! lock was taken, so the matching unlock can put it back.
//!
//! This module only stores entries. Applying values to components is the
//! component registry's job (`engine::registry`).

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;

use crate::types::ComponentId;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LockEntry {
    pub locked: bool,
    pub locked_value: bool,
    /// Override value at the moment the first lock was taken.
    pub original_value: Option<bool>,
}

/// Shared lock table. Clones refer to the same entries.
#[derive(Debug, Clone, Default)]
pub struct LockTable {
    entries: Rc<RefCell<BTreeMap<ComponentId, LockEntry>>>,
}

impl LockTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Lock `id` to `value`.
    ///
    /// `current_override` is recorded as the original value only if `id` is not
    /// already locked; re-locking keeps the first original and updates the
    /// locked value.
    pub fn lock(&self, id: ComponentId, value: bool, current_override: Option<bool>) -> LockEntry {
        let mut entries = self.entries.borrow_mut();
        let entry = entries.entry(id).or_insert(LockEntry {
            locked: true,
            locked_value: value,
            original_value: current_override,
        });
        entry.locked_value = value;
        *entry
    }

    /// Remove the entry for `id`, returning it if there was one.
    pub fn unlock(&self, id: ComponentId) -> Option<LockEntry> {
        self.entries.borrow_mut().remove(&id)
    }

    pub fn entry(&self, id: ComponentId) -> Option<LockEntry> {
        self.entries.borrow().get(&id).copied()
    }

    pub fn is_locked(&self, id: ComponentId) -> bool {
        self.entries.borrow().get(&id).is_some_and(|e| e.locked)
    }

    /// True only if every id in `ids` is locked. An empty set is not locked.
    pub fn are_all_locked(&self, ids: &[ComponentId]) -> bool {
        !ids.is_empty() && ids.iter().all(|id| self.is_locked(*id))
    }

    /// Value that a write of `requested` to `id` actually produces.
    pub fn gate(&self, id: ComponentId, requested: Option<bool>) -> Option<bool> {
        match self.entry(id) {
            Some(entry) if entry.locked => Some(entry.locked_value),
            _ => requested,
        }
    }

    pub fn locked_ids(&self) -> Vec<ComponentId> {
        self.entries.borrow().keys().copied().collect()
    }

    pub fn clear(&self) {
        self.entries.borrow_mut().clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ComponentId::*;

    #[test]
    fn test_lock_records_original() {
        let locks = LockTable::new();
        let entry = locks.lock(Navigation, false, Some(true));
        assert_eq!(
            entry,
            LockEntry {
                locked: true,
                locked_value: false,
                original_value: Some(true),
            }
        );
        assert!(locks.is_locked(Navigation));
        assert!(!locks.is_locked(ChatButton));
    }

    #[test]
    fn test_relock_keeps_first_original() {
        let locks = LockTable::new();
        locks.lock(Navigation, false, None);
        // Second caller sees the forced value as "current"
        let entry = locks.lock(Navigation, true, Some(false));
        assert_eq!(entry.original_value, None);
        assert!(entry.locked_value);
    }

    #[test]
    fn test_unlock_missing_is_none() {
        let locks = LockTable::new();
        assert_eq!(locks.unlock(Highlight), None);
        locks.lock(Highlight, false, Some(false));
        assert!(locks.unlock(Highlight).is_some());
        assert_eq!(locks.unlock(Highlight), None);
    }

    #[test]
    fn test_gate_replaces_writes() {
        let locks = LockTable::new();
        assert_eq!(locks.gate(ChatButton, Some(true)), Some(true));
        locks.lock(ChatButton, false, None);
        assert_eq!(locks.gate(ChatButton, Some(true)), Some(false));
        assert_eq!(locks.gate(ChatButton, None), Some(false));
    }

    #[test]
    fn test_aggregate_query() {
        let locks = LockTable::new();
        locks.lock(Navigation, false, None);
        assert!(locks.are_all_locked(&[Navigation]));
        assert!(!locks.are_all_locked(&[Navigation, ChatButton]));
        assert!(!locks.are_all_locked(&[]));
        locks.lock(ChatButton, false, None);
        assert!(locks.are_all_locked(&[Navigation, ChatButton]));
        assert_eq!(locks.locked_ids(), vec![Navigation, ChatButton]);
    }
}
