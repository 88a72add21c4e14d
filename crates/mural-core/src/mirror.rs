//! Client-side replica of the scene, rebuilt from server messages.

use crate::dispatch::{Audience, Envelope, Observer};
use crate::ids::{ItemId, ViewId};
use crate::item::ItemDescriptor;
use crate::protocol::ServerMessage;
use crate::view::{ShadowView, ViewDescriptor};
use std::collections::BTreeMap;

/// What one participant knows about the shared scene.
#[derive(Debug, Clone, Default)]
pub struct Mirror {
    view_id: Option<ViewId>,
    /// Topmost first.
    items: Vec<ItemDescriptor>,
    views: BTreeMap<ViewId, ViewDescriptor>,
}

impl Mirror {
    pub fn new() -> Self {
        Self::default()
    }

    /// The view this replica belongs to, once its snapshot arrived.
    pub fn view_id(&self) -> Option<ViewId> {
        self.view_id
    }

    pub fn items(&self) -> &[ItemDescriptor] {
        &self.items
    }

    pub fn item(&self, id: ItemId) -> Option<&ItemDescriptor> {
        self.items.iter().find(|item| item.id == id)
    }

    /// Every known view, ordered by id.
    pub fn views(&self) -> Vec<ViewDescriptor> {
        self.views.values().cloned().collect()
    }

    pub fn own_view(&self) -> Option<&ViewDescriptor> {
        self.view_id.and_then(|id| self.views.get(&id))
    }

    /// Every view other than our own.
    pub fn shadows(&self) -> Vec<ShadowView> {
        self.views
            .values()
            .filter(|view| Some(view.id) != self.view_id)
            .map(ShadowView::from)
            .collect()
    }

    fn renumber(&mut self) {
        for (z, item) in self.items.iter_mut().enumerate() {
            item.z = z;
        }
    }

    fn position(&self, id: ItemId) -> Option<usize> {
        self.items.iter().position(|item| item.id == id)
    }

    fn insert_item(&mut self, item: ItemDescriptor) {
        if let Some(index) = self.position(item.id) {
            self.items.remove(index);
        }
        let z = item.z.min(self.items.len());
        self.items.insert(z, item);
        self.renumber();
    }

    pub fn apply(&mut self, message: &ServerMessage) {
        match message {
            ServerMessage::AddItem { item }
            | ServerMessage::AddElement { item }
            | ServerMessage::AddImage { item } => self.insert_item(item.clone()),
            ServerMessage::UdItem { id, patch } => {
                let Some(index) = self.position(*id) else {
                    log::warn!("Update for unknown {id}");
                    return;
                };
                patch.apply_to(&mut self.items[index]);
                if let Some(z) = patch.z {
                    let item = self.items.remove(index);
                    self.items.insert(z.min(self.items.len()), item);
                    self.renumber();
                }
            }
            ServerMessage::RmItem { id } => {
                if let Some(index) = self.position(*id) {
                    self.items.remove(index);
                    self.renumber();
                }
            }
            ServerMessage::SetRender { id, render } => match self.position(*id) {
                Some(index) => self.items[index].render = Some(render.clone()),
                None => log::warn!("Render for unknown {id}"),
            },
            ServerMessage::AddView { view } => {
                self.views.insert(view.id, view.clone());
            }
            ServerMessage::UdView { id, patch } => match self.views.get_mut(id) {
                Some(view) => patch.apply_to(view),
                None => log::warn!("Update for unknown {id}"),
            },
            ServerMessage::RmView { id } => {
                self.views.remove(id);
            }
            ServerMessage::FullSnapshot {
                view_id,
                items,
                views,
            } => {
                self.view_id = Some(*view_id);
                self.items = items.clone();
                self.renumber();
                self.views = views.iter().map(|view| (view.id, view.clone())).collect();
            }
            ServerMessage::Error { reason } => {
                log::warn!("Server rejected a message: {reason}");
            }
        }
    }
}

/// A mirror attached to a dispatcher follows the first view whose snapshot
/// it sees, and only applies what that view would receive.
impl Observer for Mirror {
    fn notify(&mut self, envelope: &Envelope) {
        let wanted = match (self.view_id, envelope.audience) {
            (Some(own), audience) => audience.includes(own),
            (None, Audience::All) => true,
            (None, Audience::Only(_)) => {
                matches!(envelope.message, ServerMessage::FullSnapshot { .. })
            }
            (None, Audience::Except(_)) => false,
        };
        if wanted {
            self.apply(&envelope.message);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::item::ItemKind;
    use crate::protocol::ItemPatch;

    fn item(id: u64) -> ItemDescriptor {
        ItemDescriptor {
            id: ItemId(id),
            kind: ItemKind::Item,
            x: 0.0,
            y: 0.0,
            rotation: 0.0,
            scale: 1.0,
            hitbox: None,
            interactions: Default::default(),
            lock_z: false,
            render: None,
            locked_by: None,
            z: 0,
        }
    }

    fn ids(mirror: &Mirror) -> Vec<u64> {
        mirror.items().iter().map(|item| item.id.0).collect()
    }

    #[test]
    fn test_add_and_raise() {
        let mut mirror = Mirror::new();
        for id in 1..=3 {
            mirror.apply(&ServerMessage::AddItem { item: item(id) });
        }
        assert_eq!(ids(&mirror), vec![3, 2, 1]);

        mirror.apply(&ServerMessage::UdItem {
            id: ItemId(1),
            patch: ItemPatch::z(0),
        });
        assert_eq!(ids(&mirror), vec![1, 3, 2]);
        assert_eq!(mirror.items()[2].z, 2);
    }

    #[test]
    fn test_remove_and_render() {
        let mut mirror = Mirror::new();
        mirror.apply(&ServerMessage::AddItem { item: item(1) });
        mirror.apply(&ServerMessage::SetRender {
            id: ItemId(1),
            render: serde_json::json!({"fill": "red"}),
        });
        assert!(mirror.item(ItemId(1)).unwrap().render.is_some());
        mirror.apply(&ServerMessage::RmItem { id: ItemId(1) });
        assert!(mirror.items().is_empty());
    }

    #[test]
    fn test_snapshot_sets_identity_and_shadows() {
        let view = |id: u64| ViewDescriptor {
            id: ViewId(id),
            x: 0.0,
            y: 0.0,
            rotation: 0.0,
            scale: 1.0,
            width: 100.0,
            height: 100.0,
            group: None,
        };
        let mut mirror = Mirror::new();
        mirror.apply(&ServerMessage::FullSnapshot {
            view_id: ViewId(2),
            items: vec![item(5)],
            views: vec![view(1), view(2)],
        });
        assert_eq!(mirror.view_id(), Some(ViewId(2)));
        assert_eq!(mirror.own_view().map(|v| v.id), Some(ViewId(2)));
        let shadows = mirror.shadows();
        assert_eq!(shadows.len(), 1);
        assert_eq!(shadows[0].id, ViewId(1));

        mirror.apply(&ServerMessage::RmView { id: ViewId(1) });
        assert!(mirror.shadows().is_empty());
    }

    #[test]
    fn test_observer_filters_by_audience() {
        let mut mirror = Mirror::new();
        mirror.notify(&Envelope {
            audience: Audience::Except(ViewId(9)),
            message: ServerMessage::AddItem { item: item(1) },
        });
        assert!(mirror.items().is_empty());

        mirror.notify(&Envelope {
            audience: Audience::Only(ViewId(3)),
            message: ServerMessage::FullSnapshot {
                view_id: ViewId(3),
                items: vec![],
                views: vec![],
            },
        });
        mirror.notify(&Envelope {
            audience: Audience::Only(ViewId(4)),
            message: ServerMessage::AddItem { item: item(2) },
        });
        mirror.notify(&Envelope {
            audience: Audience::Except(ViewId(4)),
            message: ServerMessage::AddItem { item: item(3) },
        });
        assert_eq!(ids(&mirror), vec![3]);
    }
}
