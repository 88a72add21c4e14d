//! Connected views and the groups that bind them together.

use crate::dispatch::Dispatcher;
use crate::ids::{GroupId, IdCounter, Identifiable, ViewId};
use crate::lock::{LockTable, LockTarget};
use crate::protocol::{ServerMessage, ViewPatch};
use crate::transform::{ScaleMode, Transform, Transformable, is_valid_factor};
use crate::view::{ShadowView, View, ViewDescriptor, ViewGroup};
use kurbo::Point;
use std::collections::HashMap;

/// One step applied to a view or a whole group.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ViewOp {
    MoveBy(f64, f64),
    RotateBy(f64, Option<Point>),
    ScaleBy(f64, Option<Point>),
}

impl ViewOp {
    fn apply<T: Transformable>(&self, target: &mut T) {
        match *self {
            ViewOp::MoveBy(dx, dy) => {
                target.move_by(dx, dy);
            }
            ViewOp::RotateBy(radians, pivot) => {
                target.rotate_by(radians, pivot);
            }
            ViewOp::ScaleBy(factor, pivot) => {
                target.scale_by(factor, pivot);
            }
        }
    }

    /// Apply to a bare transform as a view would, skipping invalid steps.
    fn apply_to(&self, transform: &mut Transform) {
        match *self {
            ViewOp::MoveBy(dx, dy) => {
                transform.move_by(dx, dy);
            }
            ViewOp::RotateBy(radians, pivot) if radians.is_finite() => {
                transform.rotate_by(radians, pivot);
            }
            ViewOp::ScaleBy(factor, pivot) if is_valid_factor(factor) => {
                transform.scale_by(factor, pivot, ScaleMode::DivideBy);
            }
            ViewOp::RotateBy(..) | ViewOp::ScaleBy(..) => {}
        }
    }

    /// Pin a default pivot to `origin` so members follow the group's pivot.
    fn anchored(self, origin: Point) -> Self {
        match self {
            ViewOp::RotateBy(radians, None) => ViewOp::RotateBy(radians, Some(origin)),
            ViewOp::ScaleBy(factor, None) => ViewOp::ScaleBy(factor, Some(origin)),
            op => op,
        }
    }
}

#[derive(Debug, Default)]
pub struct Registry {
    views: HashMap<ViewId, View>,
    groups: HashMap<GroupId, ViewGroup>,
    group_names: HashMap<String, GroupId>,
    view_ids: IdCounter,
    group_ids: IdCounter,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn view(&self, id: ViewId) -> Option<&View> {
        self.views.get(&id)
    }

    pub(crate) fn view_mut(&mut self, id: ViewId) -> Option<&mut View> {
        self.views.get_mut(&id)
    }

    pub fn group(&self, id: GroupId) -> Option<&ViewGroup> {
        self.groups.get(&id)
    }

    pub fn group_named(&self, name: &str) -> Option<&ViewGroup> {
        self.group_names.get(name).and_then(|id| self.groups.get(id))
    }

    pub fn len(&self) -> usize {
        self.views.len()
    }

    pub fn is_empty(&self) -> bool {
        self.views.is_empty()
    }

    /// Every view, ordered by id.
    pub fn describe_all(&self) -> Vec<ViewDescriptor> {
        let mut views: Vec<_> = self.views.values().map(View::describe).collect();
        views.sort_by_key(|view| view.id);
        views
    }

    fn group_for(&mut self, name: &str) -> GroupId {
        if let Some(id) = self.group_names.get(name) {
            return *id;
        }
        let id: GroupId = self.group_ids.next();
        self.groups.insert(id, ViewGroup::new(id, name.to_string()));
        self.group_names.insert(name.to_string(), id);
        log::info!("Created view group {name:?} as {id}");
        id
    }

    /// Register a new view. A grouped view starts at its group's transform.
    pub fn spawn_view(&mut self, width: f64, height: f64, group: Option<&str>) -> ViewId {
        let id: ViewId = self.view_ids.next();
        let mut view = View::new(id, width, height);
        if let Some(name) = group {
            let group_id = self.group_for(name);
            if let Some(group) = self.groups.get_mut(&group_id) {
                group.members_mut().insert(id);
                view.set_transform(*group.transform());
                view.set_group(Some(group_id));
            }
        }
        self.views.insert(id, view);
        id
    }

    /// Detach a view from its group, clearing its gesture state and any lock
    /// it held on the group.
    pub fn remove_from_group(&mut self, id: ViewId, locks: &mut LockTable) -> bool {
        let Some(view) = self.views.get_mut(&id) else {
            return false;
        };
        let Some(group_id) = view.group() else {
            return false;
        };
        view.set_group(None);
        view.gestures.clear();
        if let Some(group) = self.groups.get_mut(&group_id) {
            group.members_mut().remove(&id);
        }
        if locks.held_by(id) == Some(LockTarget::Group(group_id)) {
            locks.unlock(id);
        }
        true
    }

    /// Drop a view, leaving its group first. Locks held *on* the view are
    /// released; a lock held *by* it is the caller's to release.
    pub fn remove_view(&mut self, id: ViewId, locks: &mut LockTable) -> Option<View> {
        self.remove_from_group(id, locks);
        let mut view = self.views.remove(&id)?;
        view.gestures.clear();
        locks.release_target(LockTarget::View(id));
        Some(view)
    }

    pub fn resize_view(
        &mut self,
        id: ViewId,
        width: f64,
        height: f64,
        dispatcher: &mut Dispatcher,
    ) -> bool {
        if !(width.is_finite() && height.is_finite() && width > 0.0 && height > 0.0) {
            log::warn!("Ignoring resize of {id} to {width}x{height}");
            return false;
        }
        self.update_views(&[id], dispatcher, |view| view.resize(width, height))
    }

    /// Accumulated scale of a view or group, for bounds checks.
    pub fn scale_of(&self, target: LockTarget) -> Option<f64> {
        match target {
            LockTarget::View(id) => self.views.get(&id).map(|v| v.transform().scale),
            LockTarget::Group(id) => self.groups.get(&id).map(|g| g.transform().scale),
            LockTarget::Item(_) => None,
        }
    }

    /// Apply `ops` in order to a view, or to a group and then each of its
    /// members. Each affected view is published once.
    pub fn apply(
        &mut self,
        target: LockTarget,
        ops: &[ViewOp],
        dispatcher: &mut Dispatcher,
    ) -> bool {
        match target {
            LockTarget::View(id) => self.update_views(&[id], dispatcher, |view| {
                for op in ops {
                    op.apply(view);
                }
            }),
            LockTarget::Group(id) => {
                let Some(group) = self.groups.get_mut(&id) else {
                    log::warn!("Cannot transform unknown {id}");
                    return false;
                };
                let mut anchored = Vec::with_capacity(ops.len());
                for op in ops {
                    let op = op.anchored(group.transform().position());
                    op.apply(group);
                    anchored.push(op);
                }
                let members: Vec<ViewId> = group.members().iter().copied().collect();
                self.update_views(&members, dispatcher, |view| {
                    for op in &anchored {
                        op.apply(view);
                    }
                })
            }
            LockTarget::Item(id) => {
                log::warn!("Registry cannot transform {id}");
                false
            }
        }
    }

    /// Whether applying `ops` to `target` would leave every affected
    /// transform finite.
    pub fn keeps_finite(&self, target: LockTarget, ops: &[ViewOp]) -> bool {
        let (grouped, mut transforms): (bool, Vec<Transform>) = match target {
            LockTarget::View(id) => {
                let view = self.views.get(&id).map(|view| *view.transform());
                (false, view.into_iter().collect())
            }
            LockTarget::Group(id) => {
                let Some(group) = self.groups.get(&id) else {
                    return true;
                };
                let members = group
                    .members()
                    .iter()
                    .filter_map(|member| self.views.get(member))
                    .map(|view| *view.transform());
                (true, std::iter::once(*group.transform()).chain(members).collect())
            }
            LockTarget::Item(_) => return true,
        };
        for op in ops {
            let op = match transforms.first() {
                Some(group) if grouped => op.anchored(group.position()),
                _ => *op,
            };
            for transform in &mut transforms {
                op.apply_to(transform);
            }
        }
        transforms.iter().all(Transform::is_finite)
    }

    fn update_views<F>(&mut self, ids: &[ViewId], dispatcher: &mut Dispatcher, f: F) -> bool
    where
        F: Fn(&mut View),
    {
        let mut any = false;
        for id in ids {
            let Some(view) = self.views.get_mut(id) else {
                log::warn!("Cannot update unknown {id}");
                continue;
            };
            let before = view.describe();
            f(view);
            let patch = ViewPatch::diff(&before, &view.describe());
            if !patch.is_empty() {
                dispatcher.broadcast(ServerMessage::UdView { id: *id, patch });
            }
            any = true;
        }
        any
    }

    /// Projections of every other live view.
    pub fn shadows_for(&self, id: ViewId) -> Vec<ShadowView> {
        let mut shadows: Vec<_> = self
            .views
            .values()
            .filter(|view| view.id() != id)
            .map(|view| ShadowView::from(&view.describe()))
            .collect();
        shadows.sort_by_key(|shadow| shadow.id);
        shadows
    }

    pub fn group_transform(&self, id: GroupId) -> Option<Transform> {
        self.groups.get(&id).map(|group| *group.transform())
    }
}
