//! Items: the manipulable objects of the shared space.

use crate::hitbox::{GeometryError, Hitbox, Hittable};
use crate::ids::{Identifiable, ItemId, ViewId};
use crate::lock::{LockTarget, Lockable};
use crate::transform::{Transform, Transformable, is_valid_factor};
use kurbo::Point;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Gesture components an item responds to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Interaction {
    Drag,
    Rotate,
    Pinch,
    Click,
}

/// What an item stands for on the client side.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ItemKind {
    /// Drawn from its render descriptor.
    #[default]
    Item,
    /// A markup element with a tag name and attributes.
    Element {
        tag: String,
        #[serde(default)]
        attributes: BTreeMap<String, String>,
    },
    /// An image loaded from `src`.
    Image {
        src: String,
        #[serde(default)]
        width: Option<f64>,
        #[serde(default)]
        height: Option<f64>,
    },
}

fn default_scale() -> f64 {
    1.0
}

/// Everything needed to spawn an item. Ids are assigned by the workspace.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemSpec {
    #[serde(default)]
    pub kind: ItemKind,
    #[serde(default)]
    pub x: f64,
    #[serde(default)]
    pub y: f64,
    #[serde(default)]
    pub rotation: f64,
    #[serde(default = "default_scale")]
    pub scale: f64,
    #[serde(default)]
    pub hitbox: Option<Hitbox>,
    #[serde(default)]
    pub interactions: BTreeSet<Interaction>,
    /// Keep the item at its layer when it is grabbed.
    #[serde(default)]
    pub lock_z: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub render: Option<serde_json::Value>,
}

impl Default for ItemSpec {
    fn default() -> Self {
        Self {
            kind: ItemKind::Item,
            x: 0.0,
            y: 0.0,
            rotation: 0.0,
            scale: 1.0,
            hitbox: None,
            interactions: BTreeSet::new(),
            lock_z: false,
            render: None,
        }
    }
}

impl ItemSpec {
    /// Place the item at `(x, y)`.
    pub fn at(mut self, x: f64, y: f64) -> Self {
        self.x = x;
        self.y = y;
        self
    }

    /// Register the given interactions.
    pub fn with_interactions(
        mut self,
        interactions: impl IntoIterator<Item = Interaction>,
    ) -> Self {
        self.interactions.extend(interactions);
        self
    }

    /// Stop the item from being raised when grabbed.
    pub fn lock_z(mut self) -> Self {
        self.lock_z = true;
        self
    }

    /// Register every interaction.
    pub fn interactive(self) -> Self {
        self.with_interactions([
            Interaction::Drag,
            Interaction::Rotate,
            Interaction::Pinch,
            Interaction::Click,
        ])
    }

    pub fn validate(&self) -> Result<(), GeometryError> {
        for (name, value) in [("x", self.x), ("y", self.y), ("rotation", self.rotation)] {
            if !value.is_finite() {
                return Err(GeometryError::NonFinite(name));
            }
        }
        if !is_valid_factor(self.scale) {
            return Err(GeometryError::NonPositiveScale(self.scale));
        }
        if let Some(hitbox) = &self.hitbox {
            hitbox.validate()?;
        }
        Ok(())
    }
}

/// An item living in the workspace.
///
/// The hitbox is kept in the same rotation/scale state as the transform;
/// z-order and lock state live in the workspace and lock table.
#[derive(Debug, Clone)]
pub struct Item {
    id: ItemId,
    pub kind: ItemKind,
    transform: Transform,
    hitbox: Option<Hitbox>,
    pub interactions: BTreeSet<Interaction>,
    pub lock_z: bool,
    pub render: Option<serde_json::Value>,
}

impl Item {
    /// Build an item from a validated spec, folding the spec's rotation and
    /// scale into the hitbox.
    pub(crate) fn from_spec(id: ItemId, spec: ItemSpec) -> Self {
        let mut item = Self {
            id,
            kind: spec.kind,
            transform: Transform::at(spec.x, spec.y),
            hitbox: spec.hitbox,
            interactions: spec.interactions,
            lock_z: spec.lock_z,
            render: spec.render,
        };
        if spec.rotation != 0.0 {
            item.rotate_by(spec.rotation, None);
        }
        if spec.scale != 1.0 {
            item.scale_by(spec.scale, None);
        }
        item
    }

    pub fn handles(&self, interaction: Interaction) -> bool {
        self.interactions.contains(&interaction)
    }

    pub fn describe(&self, z: usize, locked_by: Option<ViewId>) -> ItemDescriptor {
        ItemDescriptor {
            id: self.id,
            kind: self.kind.clone(),
            x: self.transform.x,
            y: self.transform.y,
            rotation: self.transform.rotation,
            scale: self.transform.scale,
            hitbox: self.hitbox.clone(),
            interactions: self.interactions.clone(),
            lock_z: self.lock_z,
            render: self.render.clone(),
            locked_by,
            z,
        }
    }
}

impl Identifiable for Item {
    type Id = ItemId;

    fn id(&self) -> ItemId {
        self.id
    }
}

impl Transformable for Item {
    fn transform(&self) -> &Transform {
        &self.transform
    }

    fn transform_mut(&mut self) -> &mut Transform {
        &mut self.transform
    }

    fn rotated(&mut self, radians: f64) {
        if let Some(hitbox) = &mut self.hitbox {
            hitbox.rotate(radians);
        }
    }

    fn scaled(&mut self, factor: f64) {
        if let Some(hitbox) = &mut self.hitbox {
            hitbox.scale(factor);
        }
    }
}

impl Lockable for Item {
    fn lock_target(&self) -> LockTarget {
        LockTarget::Item(self.id)
    }

    /// Items with no registered interaction cannot be grabbed.
    fn is_lockable(&self) -> bool {
        !self.interactions.is_empty()
    }
}

impl Hittable for Item {
    fn hitbox(&self) -> Option<&Hitbox> {
        self.hitbox.as_ref()
    }

    fn origin(&self) -> Point {
        self.transform.position()
    }
}

/// Wire form of an item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemDescriptor {
    pub id: ItemId,
    pub kind: ItemKind,
    pub x: f64,
    pub y: f64,
    pub rotation: f64,
    pub scale: f64,
    #[serde(default)]
    pub hitbox: Option<Hitbox>,
    #[serde(default)]
    pub interactions: BTreeSet<Interaction>,
    #[serde(default)]
    pub lock_z: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub render: Option<serde_json::Value>,
    #[serde(default)]
    pub locked_by: Option<ViewId>,
    /// Position in the z-order, 0 being topmost.
    pub z: usize,
}
