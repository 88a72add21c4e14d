//! Per-view pointer tracking and gesture classification.
//!
//! Pointer positions are kept in the view's own (screen) frame. The engine is
//! responsible for mapping a [`Gesture`] into world space and applying it to
//! whatever the view has locked.

use kurbo::{Point, Vec2};
use std::collections::BTreeMap;
use std::f64::consts::PI;

/// Client-assigned pointer identifier.
pub type PointerId = u32;

/// Pointer vectors shorter than this are too short to derive an angle from.
const MIN_SPAN: f64 = 1e-6;

/// A combined pan/rotate/pinch step, in view coordinates.
///
/// Applying it means rotating by `rotation` and scaling by `scale` about
/// `pivot`, then translating by `translation`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Manipulation {
    pub translation: Vec2,
    pub rotation: f64,
    pub scale: f64,
    pub pivot: Point,
}

impl Manipulation {
    /// A pure translation.
    pub fn drag(delta: Vec2) -> Self {
        Self {
            translation: delta,
            rotation: 0.0,
            scale: 1.0,
            pivot: Point::ZERO,
        }
    }

    pub fn is_identity(&self) -> bool {
        self.translation == Vec2::ZERO && self.rotation == 0.0 && self.scale == 1.0
    }

    /// False when extreme pointer positions overflowed a component.
    pub fn is_finite(&self) -> bool {
        self.translation.is_finite()
            && self.rotation.is_finite()
            && self.scale.is_finite()
            && self.pivot.is_finite()
    }
}

/// Result of feeding a pointer update to the controller.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Gesture {
    /// A single pointer moved.
    Drag(Vec2),
    /// One of several pointers moved.
    Manipulate(Manipulation),
}

impl Gesture {
    pub fn into_manipulation(self) -> Manipulation {
        match self {
            Gesture::Drag(delta) => Manipulation::drag(delta),
            Gesture::Manipulate(manipulation) => manipulation,
        }
    }
}

/// Bring an angle difference into `(-PI, PI]`.
fn wrap_angle(mut radians: f64) -> f64 {
    while radians <= -PI {
        radians += 2.0 * PI;
    }
    while radians > PI {
        radians -= 2.0 * PI;
    }
    radians
}

/// Derive the similarity that takes segment `(moved_from, anchor)` onto
/// `(moved_to, anchor)`.
pub fn pinch(moved_from: Point, moved_to: Point, anchor: Point) -> Manipulation {
    let before = moved_from - anchor;
    let after = moved_to - anchor;
    let old_mid = moved_from.midpoint(anchor);
    let new_mid = moved_to.midpoint(anchor);
    let translation = new_mid - old_mid;

    if before.hypot() < MIN_SPAN || after.hypot() < MIN_SPAN {
        return Manipulation {
            pivot: old_mid,
            ..Manipulation::drag(translation)
        };
    }

    Manipulation {
        translation,
        rotation: wrap_angle(after.atan2() - before.atan2()),
        scale: after.hypot() / before.hypot(),
        pivot: old_mid,
    }
}

/// Tracks the active pointers of one view.
#[derive(Debug, Clone, Default)]
pub struct GestureController {
    pointers: BTreeMap<PointerId, Point>,
}

impl GestureController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn active_pointers(&self) -> usize {
        self.pointers.len()
    }

    pub fn is_idle(&self) -> bool {
        self.pointers.is_empty()
    }

    pub fn pointer_down(&mut self, pointer: PointerId, position: Point) {
        self.pointers.insert(pointer, position);
    }

    /// Record a move and classify it. Unknown pointers are ignored.
    pub fn pointer_move(&mut self, pointer: PointerId, position: Point) -> Option<Gesture> {
        let previous = self.pointers.insert(pointer, position);
        let Some(previous) = previous else {
            self.pointers.remove(&pointer);
            return None;
        };
        if previous == position {
            return None;
        }

        let anchor = self
            .pointers
            .iter()
            .find(|(id, _)| **id != pointer)
            .map(|(_, point)| *point);

        Some(match anchor {
            None => Gesture::Drag(position - previous),
            Some(anchor) => Gesture::Manipulate(pinch(previous, position, anchor)),
        })
    }

    /// Apply a final update from the recorded position, then forget the pointer.
    pub fn pointer_up(&mut self, pointer: PointerId, position: Point) -> Option<Gesture> {
        if !self.pointers.contains_key(&pointer) {
            return None;
        }
        let gesture = self.pointer_move(pointer, position);
        self.pointers.remove(&pointer);
        gesture
    }

    /// Forget every pointer.
    pub fn clear(&mut self) {
        self.pointers.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::FRAC_PI_2;

    #[test]
    fn test_pinch_spread_doubles_scale() {
        let mut gestures = GestureController::new();
        gestures.pointer_down(1, Point::new(0.0, 0.0));
        gestures.pointer_down(2, Point::new(10.0, 0.0));

        let Some(Gesture::Manipulate(m)) = gestures.pointer_move(2, Point::new(20.0, 0.0)) else {
            panic!("expected a manipulation");
        };
        assert!((m.scale - 2.0).abs() < 1e-12);
        assert!(m.rotation.abs() < 1e-12);
        assert_eq!(m.pivot, Point::new(5.0, 0.0));
        assert_eq!(m.translation, Vec2::new(5.0, 0.0));
    }

    #[test]
    fn test_pinch_maps_both_pointers() {
        let from = Point::new(3.0, 4.0);
        let to = Point::new(-2.0, 9.0);
        let anchor = Point::new(10.0, -1.0);
        let m = pinch(from, to, anchor);

        let apply = |p: Point| {
            let offset = (p - m.pivot) * m.scale;
            let rotated = kurbo::Affine::rotate(m.rotation) * offset.to_point();
            m.pivot + rotated.to_vec2() + m.translation
        };
        assert!((apply(from) - to).hypot() < 1e-9);
        assert!((apply(anchor) - anchor).hypot() < 1e-9);
    }

    #[test]
    fn test_quarter_turn() {
        let m = pinch(Point::new(10.0, 0.0), Point::new(0.0, 10.0), Point::ZERO);
        assert!((m.rotation - FRAC_PI_2).abs() < 1e-12);
        assert!((m.scale - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_rotation_wraps() {
        let m = pinch(Point::new(-10.0, 0.1), Point::new(-10.0, -0.1), Point::ZERO);
        assert!(m.rotation.abs() < 0.1);
    }

    #[test]
    fn test_single_pointer_drags() {
        let mut gestures = GestureController::new();
        gestures.pointer_down(7, Point::new(5.0, 5.0));
        assert_eq!(
            gestures.pointer_move(7, Point::new(8.0, 1.0)),
            Some(Gesture::Drag(Vec2::new(3.0, -4.0)))
        );
        assert_eq!(gestures.pointer_move(7, Point::new(8.0, 1.0)), None);
    }

    #[test]
    fn test_pointer_up_applies_final_update() {
        let mut gestures = GestureController::new();
        gestures.pointer_down(1, Point::ZERO);
        assert_eq!(
            gestures.pointer_up(1, Point::new(2.0, 0.0)),
            Some(Gesture::Drag(Vec2::new(2.0, 0.0)))
        );
        assert!(gestures.is_idle());
        assert_eq!(gestures.pointer_up(1, Point::new(9.0, 0.0)), None);
    }

    #[test]
    fn test_unknown_pointer_ignored() {
        let mut gestures = GestureController::new();
        assert_eq!(gestures.pointer_move(3, Point::new(1.0, 1.0)), None);
        assert!(gestures.is_idle());
    }

    #[test]
    fn test_anchor_is_lowest_other_pointer() {
        let mut gestures = GestureController::new();
        gestures.pointer_down(4, Point::new(0.0, 0.0));
        gestures.pointer_down(9, Point::new(100.0, 100.0));
        gestures.pointer_down(6, Point::new(10.0, 0.0));
        let Some(Gesture::Manipulate(m)) = gestures.pointer_move(6, Point::new(20.0, 0.0)) else {
            panic!("expected a manipulation");
        };
        // Paired with pointer 4, not 9.
        assert!((m.scale - 2.0).abs() < 1e-12);
        assert_eq!(gestures.active_pointers(), 3);
    }
}
