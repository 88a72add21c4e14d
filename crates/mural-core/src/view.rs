//! Views (participant viewports) and view groups.

use crate::gesture::GestureController;
use crate::hitbox::{Hitbox, Hittable};
use crate::ids::{GroupId, Identifiable, ViewId};
use crate::lock::{LockTarget, Lockable};
use crate::transform::{ScaleMode, Transform, Transformable};
use kurbo::{Point, Vec2};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// A participant's window onto the shared space.
///
/// The view's position is the world point shown at its top-left corner. A
/// larger scale shows less of the world.
#[derive(Debug, Clone)]
pub struct View {
    id: ViewId,
    transform: Transform,
    width: f64,
    height: f64,
    group: Option<GroupId>,
    pub(crate) gestures: GestureController,
}

impl View {
    pub(crate) fn new(id: ViewId, width: f64, height: f64) -> Self {
        Self {
            id,
            transform: Transform::default(),
            width,
            height,
            group: None,
            gestures: GestureController::new(),
        }
    }

    pub fn width(&self) -> f64 {
        self.width
    }

    pub fn height(&self) -> f64 {
        self.height
    }

    pub fn effective_width(&self) -> f64 {
        self.width / self.transform.scale
    }

    pub fn effective_height(&self) -> f64 {
        self.height / self.transform.scale
    }

    pub fn group(&self) -> Option<GroupId> {
        self.group
    }

    pub(crate) fn set_group(&mut self, group: Option<GroupId>) {
        self.group = group;
    }

    pub(crate) fn resize(&mut self, width: f64, height: f64) {
        self.width = width;
        self.height = height;
    }

    pub(crate) fn set_transform(&mut self, transform: Transform) {
        self.transform = transform;
    }

    pub fn gestures(&self) -> &GestureController {
        &self.gestures
    }

    /// Map a point in this view's screen frame into the world.
    pub fn to_world(&self, screen: Point) -> Point {
        self.transform.view_to_world(screen)
    }

    /// Map a screen displacement into a world displacement.
    pub fn delta_to_world(&self, delta: Vec2) -> Vec2 {
        self.transform.view_delta_to_world(delta)
    }

    /// The lock a pointer falls back to when it lands on no free item.
    pub fn fallback_target(&self) -> LockTarget {
        match self.group {
            Some(group) => LockTarget::Group(group),
            None => LockTarget::View(self.id),
        }
    }

    pub fn describe(&self) -> ViewDescriptor {
        ViewDescriptor {
            id: self.id,
            x: self.transform.x,
            y: self.transform.y,
            rotation: self.transform.rotation,
            scale: self.transform.scale,
            width: self.width,
            height: self.height,
            group: self.group,
        }
    }
}

impl Identifiable for View {
    type Id = ViewId;

    fn id(&self) -> ViewId {
        self.id
    }
}

impl Transformable for View {
    fn transform(&self) -> &Transform {
        &self.transform
    }

    fn transform_mut(&mut self) -> &mut Transform {
        &mut self.transform
    }

    fn scale_mode(&self) -> ScaleMode {
        ScaleMode::DivideBy
    }
}

impl Lockable for View {
    fn lock_target(&self) -> LockTarget {
        LockTarget::View(self.id)
    }
}

impl Hittable for View {
    fn hitbox(&self) -> Option<&Hitbox> {
        None
    }

    fn origin(&self) -> Point {
        self.transform.position()
    }

    /// Whether the world point is visible in this view.
    fn contains_point(&self, point: Point) -> bool {
        let screen = self.transform.world_to_view(point);
        (0.0..=self.width).contains(&screen.x) && (0.0..=self.height).contains(&screen.y)
    }
}

/// A set of views constrained to move together.
#[derive(Debug, Clone)]
pub struct ViewGroup {
    id: GroupId,
    name: String,
    transform: Transform,
    members: BTreeSet<ViewId>,
}

impl ViewGroup {
    pub(crate) fn new(id: GroupId, name: String) -> Self {
        Self {
            id,
            name,
            transform: Transform::default(),
            members: BTreeSet::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn members(&self) -> &BTreeSet<ViewId> {
        &self.members
    }

    pub(crate) fn members_mut(&mut self) -> &mut BTreeSet<ViewId> {
        &mut self.members
    }
}

impl Identifiable for ViewGroup {
    type Id = GroupId;

    fn id(&self) -> GroupId {
        self.id
    }
}

impl Transformable for ViewGroup {
    fn transform(&self) -> &Transform {
        &self.transform
    }

    fn transform_mut(&mut self) -> &mut Transform {
        &mut self.transform
    }

    fn scale_mode(&self) -> ScaleMode {
        ScaleMode::DivideBy
    }
}

impl Lockable for ViewGroup {
    fn lock_target(&self) -> LockTarget {
        LockTarget::Group(self.id)
    }
}

/// Wire form of a view.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ViewDescriptor {
    pub id: ViewId,
    pub x: f64,
    pub y: f64,
    pub rotation: f64,
    pub scale: f64,
    pub width: f64,
    pub height: f64,
    #[serde(default)]
    pub group: Option<GroupId>,
}

/// Read-only projection of another participant's viewport.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ShadowView {
    pub id: ViewId,
    pub x: f64,
    pub y: f64,
    pub rotation: f64,
    pub scale: f64,
    pub effective_width: f64,
    pub effective_height: f64,
}

impl From<&ViewDescriptor> for ShadowView {
    fn from(view: &ViewDescriptor) -> Self {
        Self {
            id: view.id,
            x: view.x,
            y: view.y,
            rotation: view.rotation,
            scale: view.scale,
            effective_width: view.width / view.scale,
            effective_height: view.height / view.scale,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::FRAC_PI_2;

    #[test]
    fn test_effective_size() {
        let mut view = View::new(ViewId(1), 800.0, 600.0);
        view.scale_by(2.0, None);
        assert!((view.effective_width() - 400.0).abs() < f64::EPSILON);
        assert!((view.effective_height() - 300.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_to_world() {
        let mut view = View::new(ViewId(1), 800.0, 600.0);
        view.move_to(Some(100.0), Some(100.0));
        assert_eq!(view.to_world(Point::new(10.0, 20.0)), Point::new(110.0, 120.0));

        view.scale_by(2.0, None);
        assert_eq!(view.to_world(Point::new(10.0, 20.0)), Point::new(105.0, 110.0));
    }

    #[test]
    fn test_rotated_view_contains() {
        let mut view = View::new(ViewId(1), 100.0, 50.0);
        assert!(view.contains_point(Point::new(90.0, 40.0)));
        view.rotate_by(FRAC_PI_2, None);
        assert!(!view.contains_point(Point::new(90.0, 40.0)));
        assert!(view.contains_point(Point::new(-40.0, 90.0)));
    }

    #[test]
    fn test_fallback_prefers_group() {
        let mut view = View::new(ViewId(3), 10.0, 10.0);
        assert_eq!(view.fallback_target(), LockTarget::View(ViewId(3)));
        view.set_group(Some(GroupId(1)));
        assert_eq!(view.fallback_target(), LockTarget::Group(GroupId(1)));
    }

    #[test]
    fn test_shadow_projection() {
        let mut view = View::new(ViewId(2), 800.0, 400.0);
        view.scale_by(4.0, None);
        let shadow = ShadowView::from(&view.describe());
        assert_eq!(shadow.id, ViewId(2));
        assert!((shadow.effective_width - 200.0).abs() < f64::EPSILON);
        assert!((shadow.effective_height - 100.0).abs() < f64::EPSILON);
    }
}
