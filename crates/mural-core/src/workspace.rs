//! The z-ordered item collection and its mutations.

use crate::dispatch::Dispatcher;
use crate::hitbox::{GeometryError, Hittable};
use crate::ids::{IdCounter, ItemId, ViewId};
use crate::item::{Item, ItemDescriptor, ItemKind, ItemSpec};
use crate::lock::{LockTable, LockTarget, Lockable};
use crate::protocol::{ItemPatch, ServerMessage};
use kurbo::Point;
use std::collections::HashMap;

/// Authoritative item model.
///
/// `z_order[0]` is the topmost item; hit-testing scans from the top down.
#[derive(Debug, Default)]
pub struct Workspace {
    items: HashMap<ItemId, Item>,
    z_order: Vec<ItemId>,
    ids: IdCounter,
}

impl Workspace {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.z_order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.z_order.is_empty()
    }

    pub fn get(&self, id: ItemId) -> Option<&Item> {
        self.items.get(&id)
    }

    /// Item ids, topmost first.
    pub fn z_order(&self) -> &[ItemId] {
        &self.z_order
    }

    fn z_of(&self, id: ItemId) -> Option<usize> {
        self.z_order.iter().position(|&other| other == id)
    }

    pub fn describe(&self, id: ItemId, locks: &LockTable) -> Option<ItemDescriptor> {
        let item = self.items.get(&id)?;
        let z = self.z_of(id)?;
        Some(item.describe(z, locks.holder(LockTarget::Item(id))))
    }

    /// Every item, topmost first.
    pub fn snapshot(&self, locks: &LockTable) -> Vec<ItemDescriptor> {
        self.z_order
            .iter()
            .enumerate()
            .filter_map(|(z, id)| {
                let item = self.items.get(id)?;
                Some(item.describe(z, locks.holder(LockTarget::Item(*id))))
            })
            .collect()
    }

    /// Topmost item under `point`, ignoring locks.
    pub fn find_item_at(&self, point: Point) -> Option<ItemId> {
        self.z_order
            .iter()
            .copied()
            .find(|id| self.items.get(id).is_some_and(|item| item.contains_point(point)))
    }

    /// Topmost unlocked item under `point`.
    pub fn find_free_item_at(&self, point: Point, locks: &LockTable) -> Option<ItemId> {
        self.z_order.iter().copied().find(|id| {
            !locks.is_locked(LockTarget::Item(*id))
                && self.items.get(id).is_some_and(|item| item.contains_point(point))
        })
    }

    /// Resolve the pointer at `point` to a lock for `view`.
    ///
    /// A free lockable item under the point is locked and raised. Otherwise
    /// `fallback` is tried, and if that is held too, the view itself.
    pub fn obtain_lock(
        &mut self,
        point: Point,
        view: ViewId,
        fallback: LockTarget,
        locks: &mut LockTable,
        dispatcher: &mut Dispatcher,
    ) -> LockTarget {
        if let Some(id) = self.find_free_item_at(point, locks) {
            let target = self
                .items
                .get(&id)
                .filter(|item| item.is_lockable())
                .map(Lockable::lock_target);
            if let Some(target) = target {
                if locks.try_lock(view, target) {
                    dispatcher.broadcast(ServerMessage::UdItem {
                        id,
                        patch: ItemPatch::locked_by(Some(view)),
                    });
                    if !self.items.get(&id).is_some_and(|item| item.lock_z) {
                        self.raise_item(id, dispatcher);
                    }
                    return target;
                }
            }
        }

        if locks.try_lock(view, fallback) {
            return fallback;
        }
        let own = LockTarget::View(view);
        if !locks.try_lock(view, own) {
            log::debug!("{view} could not lock itself, holder is {:?}", locks.holder(own));
        }
        own
    }

    /// Move an item to the top. No-op when it already is.
    pub fn raise_item(&mut self, id: ItemId, dispatcher: &mut Dispatcher) -> bool {
        let Some(index) = self.z_of(id) else {
            log::warn!("Cannot raise unknown {id}");
            return false;
        };
        if index == 0 {
            return false;
        }
        self.z_order.remove(index);
        self.z_order.insert(0, id);
        dispatcher.broadcast(ServerMessage::UdItem {
            id,
            patch: ItemPatch::z(0),
        });
        true
    }

    pub fn bring_to_top(&mut self, id: ItemId, dispatcher: &mut Dispatcher) -> bool {
        self.raise_item(id, dispatcher)
    }

    /// Validate and insert a new item at the top of the z-order.
    pub fn spawn(
        &mut self,
        spec: ItemSpec,
        dispatcher: &mut Dispatcher,
    ) -> Result<ItemId, GeometryError> {
        spec.validate()?;
        let id: ItemId = self.ids.next();
        let item = Item::from_spec(id, spec);
        let render = item.render.clone();

        let mut descriptor = item.describe(0, None);
        descriptor.render = None;
        let message = match &item.kind {
            ItemKind::Item => ServerMessage::AddItem { item: descriptor },
            ItemKind::Element { .. } => ServerMessage::AddElement { item: descriptor },
            ItemKind::Image { .. } => ServerMessage::AddImage { item: descriptor },
        };

        self.items.insert(id, item);
        self.z_order.insert(0, id);
        dispatcher.broadcast(message);
        if let Some(render) = render {
            dispatcher.broadcast(ServerMessage::SetRender { id, render });
        }
        log::debug!("Spawned {id}");
        Ok(id)
    }

    /// Remove an item, dropping any lock held on it.
    pub fn remove_item(
        &mut self,
        id: ItemId,
        locks: &mut LockTable,
        dispatcher: &mut Dispatcher,
    ) -> bool {
        if self.items.remove(&id).is_none() {
            log::warn!("Cannot remove unknown {id}");
            return false;
        }
        self.z_order.retain(|&other| other != id);
        if let Some(holder) = locks.release_target(LockTarget::Item(id)) {
            log::debug!("Released {holder}'s lock on removed {id}");
        }
        dispatcher.broadcast(ServerMessage::RmItem { id });
        true
    }

    pub fn set_render(
        &mut self,
        id: ItemId,
        render: serde_json::Value,
        dispatcher: &mut Dispatcher,
    ) -> bool {
        let Some(item) = self.items.get_mut(&id) else {
            log::warn!("Cannot set render of unknown {id}");
            return false;
        };
        item.render = Some(render.clone());
        dispatcher.broadcast(ServerMessage::SetRender { id, render });
        true
    }

    /// Mutate an item in place and publish whatever changed.
    pub fn update_item<F>(
        &mut self,
        id: ItemId,
        locks: &LockTable,
        dispatcher: &mut Dispatcher,
        f: F,
    ) -> bool
    where
        F: FnOnce(&mut Item),
    {
        let Some(before) = self.describe(id, locks) else {
            log::warn!("Cannot update unknown {id}");
            return false;
        };
        let Some(item) = self.items.get_mut(&id) else {
            return false;
        };
        f(item);
        let Some(after) = self.describe(id, locks) else {
            return false;
        };
        let patch = ItemPatch::diff(&before, &after);
        if !patch.is_empty() {
            dispatcher.broadcast(ServerMessage::UdItem { id, patch });
        }
        true
    }
}
