//! Exclusive locks binding a view to the one entity it may mutate.

use crate::ids::{GroupId, ItemId, ViewId};
use std::collections::HashMap;

/// An entity a view can hold a lock on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LockTarget {
    Item(ItemId),
    View(ViewId),
    Group(GroupId),
}

/// An entity that can be the target of a lock.
pub trait Lockable {
    fn lock_target(&self) -> LockTarget;

    /// Whether a view may take this entity at all.
    fn is_lockable(&self) -> bool {
        true
    }
}

/// Both directions of the holder/target relation, kept in step.
///
/// A view holds at most one target and a target is held by at most one view.
#[derive(Debug, Default)]
pub struct LockTable {
    by_holder: HashMap<ViewId, LockTarget>,
    by_target: HashMap<LockTarget, ViewId>,
}

impl LockTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Lock `target` for `view`. Fails if the target is held or the view
    /// already holds something.
    pub fn try_lock(&mut self, view: ViewId, target: LockTarget) -> bool {
        if self.by_target.contains_key(&target) || self.by_holder.contains_key(&view) {
            return false;
        }
        self.by_holder.insert(view, target);
        self.by_target.insert(target, view);
        log::debug!("{view} locked {target:?}");
        true
    }

    /// Release whatever `view` holds. Calling it again is a no-op.
    pub fn unlock(&mut self, view: ViewId) -> Option<LockTarget> {
        let target = self.by_holder.remove(&view)?;
        self.by_target.remove(&target);
        log::debug!("{view} released {target:?}");
        Some(target)
    }

    /// Drop the lock on `target`, returning the view that held it.
    pub fn release_target(&mut self, target: LockTarget) -> Option<ViewId> {
        let view = self.by_target.remove(&target)?;
        self.by_holder.remove(&view);
        Some(view)
    }

    pub fn is_locked(&self, target: LockTarget) -> bool {
        self.by_target.contains_key(&target)
    }

    pub fn holder(&self, target: LockTarget) -> Option<ViewId> {
        self.by_target.get(&target).copied()
    }

    pub fn held_by(&self, view: ViewId) -> Option<LockTarget> {
        self.by_holder.get(&view).copied()
    }

    pub fn len(&self) -> usize {
        self.by_holder.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_holder.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_one_of_many_succeeds() {
        let mut locks = LockTable::new();
        let target = LockTarget::Item(ItemId(5));
        let wins = (1..=16)
            .filter(|&v| locks.try_lock(ViewId(v), target))
            .count();
        assert_eq!(wins, 1);
        assert_eq!(locks.holder(target), Some(ViewId(1)));
    }

    #[test]
    fn test_view_holds_at_most_one() {
        let mut locks = LockTable::new();
        assert!(locks.try_lock(ViewId(1), LockTarget::Item(ItemId(1))));
        assert!(!locks.try_lock(ViewId(1), LockTarget::Item(ItemId(2))));
        assert!(!locks.is_locked(LockTarget::Item(ItemId(2))));
    }

    #[test]
    fn test_unlock_is_idempotent() {
        let mut locks = LockTable::new();
        let target = LockTarget::View(ViewId(3));
        locks.try_lock(ViewId(3), target);
        assert_eq!(locks.unlock(ViewId(3)), Some(target));
        assert_eq!(locks.unlock(ViewId(3)), None);
        assert!(!locks.is_locked(target));
        assert!(locks.is_empty());
    }

    #[test]
    fn test_release_target_clears_both_sides() {
        let mut locks = LockTable::new();
        let target = LockTarget::Group(GroupId(1));
        locks.try_lock(ViewId(2), target);
        assert_eq!(locks.release_target(target), Some(ViewId(2)));
        assert_eq!(locks.held_by(ViewId(2)), None);
        assert!(locks.try_lock(ViewId(2), LockTarget::View(ViewId(2))));
    }
}
