//! Wire messages exchanged between the engine and its clients.
//!
//! Both directions are JSON objects tagged with a SCREAMING_SNAKE_CASE `type`.

use crate::gesture::PointerId;
use crate::hitbox::{GeometryError, Hitbox};
use crate::ids::{ItemId, ViewId};
use crate::item::{ItemDescriptor, ItemSpec};
use crate::view::ViewDescriptor;
use serde::{Deserialize, Deserializer, Serialize};
use thiserror::Error;

/// Errors raised while decoding or admitting client messages.
#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("Invalid join request: {0}")]
    Join(&'static str),
    #[error("Malformed message: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("View has not joined")]
    NotJoined,
    #[error("View already joined")]
    AlreadyJoined,
    #[error("Pointer position must be finite, got ({0}, {1})")]
    NonFinitePointer(f64, f64),
    #[error("Invalid geometry: {0}")]
    Geometry(#[from] GeometryError),
}

/// Keep an explicit `null` distinct from an absent field.
fn present<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

/// Changed fields of an item. Absent fields are unchanged.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ItemPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub x: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub y: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rotation: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scale: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hitbox: Option<Hitbox>,
    /// `Some(None)` means the lock was released.
    #[serde(default, deserialize_with = "present", skip_serializing_if = "Option::is_none")]
    pub locked_by: Option<Option<ViewId>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub z: Option<usize>,
}

fn changed<T: PartialEq + Clone>(before: &T, after: &T) -> Option<T> {
    (before != after).then(|| after.clone())
}

impl ItemPatch {
    /// Collect the fields that differ between two descriptors of one item.
    pub fn diff(before: &ItemDescriptor, after: &ItemDescriptor) -> Self {
        Self {
            x: changed(&before.x, &after.x),
            y: changed(&before.y, &after.y),
            rotation: changed(&before.rotation, &after.rotation),
            scale: changed(&before.scale, &after.scale),
            hitbox: changed(&before.hitbox, &after.hitbox).flatten(),
            locked_by: changed(&before.locked_by, &after.locked_by),
            z: changed(&before.z, &after.z),
        }
    }

    pub fn locked_by(holder: Option<ViewId>) -> Self {
        Self {
            locked_by: Some(holder),
            ..Self::default()
        }
    }

    pub fn z(z: usize) -> Self {
        Self {
            z: Some(z),
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Write the patch onto a descriptor. Z-order is left to the caller.
    pub fn apply_to(&self, item: &mut ItemDescriptor) {
        if let Some(x) = self.x {
            item.x = x;
        }
        if let Some(y) = self.y {
            item.y = y;
        }
        if let Some(rotation) = self.rotation {
            item.rotation = rotation;
        }
        if let Some(scale) = self.scale {
            item.scale = scale;
        }
        if let Some(hitbox) = &self.hitbox {
            item.hitbox = Some(hitbox.clone());
        }
        if let Some(locked_by) = self.locked_by {
            item.locked_by = locked_by;
        }
    }
}

/// Changed fields of a view. Absent fields are unchanged.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ViewPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub x: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub y: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rotation: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scale: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<f64>,
}

impl ViewPatch {
    pub fn diff(before: &ViewDescriptor, after: &ViewDescriptor) -> Self {
        Self {
            x: changed(&before.x, &after.x),
            y: changed(&before.y, &after.y),
            rotation: changed(&before.rotation, &after.rotation),
            scale: changed(&before.scale, &after.scale),
            width: changed(&before.width, &after.width),
            height: changed(&before.height, &after.height),
        }
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    pub fn apply_to(&self, view: &mut ViewDescriptor) {
        if let Some(x) = self.x {
            view.x = x;
        }
        if let Some(y) = self.y {
            view.y = y;
        }
        if let Some(rotation) = self.rotation {
            view.rotation = rotation;
        }
        if let Some(scale) = self.scale {
            view.scale = scale;
        }
        if let Some(width) = self.width {
            view.width = width;
        }
        if let Some(height) = self.height {
            view.height = height;
        }
    }
}

/// Messages sent from the engine to clients.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ServerMessage {
    AddItem {
        item: ItemDescriptor,
    },
    AddElement {
        item: ItemDescriptor,
    },
    AddImage {
        item: ItemDescriptor,
    },
    UdItem {
        id: ItemId,
        patch: ItemPatch,
    },
    RmItem {
        id: ItemId,
    },
    SetRender {
        id: ItemId,
        render: serde_json::Value,
    },
    AddView {
        view: ViewDescriptor,
    },
    UdView {
        id: ViewId,
        patch: ViewPatch,
    },
    RmView {
        id: ViewId,
    },
    FullSnapshot {
        view_id: ViewId,
        items: Vec<ItemDescriptor>,
        views: Vec<ViewDescriptor>,
    },
    Error {
        reason: String,
    },
}

impl ServerMessage {
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

/// The mandatory first message of a connection.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct JoinRequest {
    #[serde(default)]
    pub width: Option<f64>,
    #[serde(default)]
    pub height: Option<f64>,
    #[serde(default)]
    pub group: Option<String>,
}

impl JoinRequest {
    pub fn new(width: f64, height: f64) -> Self {
        Self {
            width: Some(width),
            height: Some(height),
            group: None,
        }
    }

    pub fn in_group(mut self, group: impl Into<String>) -> Self {
        self.group = Some(group.into());
        self
    }

    /// Check the viewport dimensions, returning `(width, height)`.
    pub fn dimensions(&self) -> Result<(f64, f64), ProtocolError> {
        let width = self.width.ok_or(ProtocolError::Join("missing width"))?;
        let height = self.height.ok_or(ProtocolError::Join("missing height"))?;
        if !width.is_finite() || !height.is_finite() || width <= 0.0 || height <= 0.0 {
            return Err(ProtocolError::Join("viewport must have a positive size"));
        }
        Ok((width, height))
    }
}

/// Messages sent from clients to the engine. Pointer coordinates are in the
/// sender's view frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ClientMessage {
    Join(JoinRequest),
    PointerDown { pointer_id: PointerId, x: f64, y: f64 },
    PointerMove { pointer_id: PointerId, x: f64, y: f64 },
    PointerUp { pointer_id: PointerId, x: f64, y: f64 },
    Resize { width: f64, height: f64 },
    Release,
    Spawn { spec: ItemSpec },
    Remove { id: ItemId },
    BringToTop { id: ItemId },
    Leave,
}

impl ClientMessage {
    pub fn from_json(text: &str) -> Result<Self, ProtocolError> {
        Ok(serde_json::from_str(text)?)
    }
}
