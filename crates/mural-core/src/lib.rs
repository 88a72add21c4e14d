//! Mural Core Library
//!
//! Platform-agnostic shared-scene synchronization engine: many participants,
//! each with their own viewport, manipulating items in one shared 2D space.
//! No async and no I/O; hosts feed [`ClientMessage`]s into an [`Engine`] and
//! forward the [`Envelope`]s it queues.

pub mod dispatch;
pub mod engine;
pub mod gesture;
pub mod hitbox;
pub mod ids;
pub mod item;
pub mod lock;
pub mod mirror;
pub mod predefined;
pub mod protocol;
pub mod registry;
pub mod transform;
pub mod view;
pub mod workspace;

pub use dispatch::{Audience, Dispatcher, Envelope, Observer};
pub use engine::{Engine, EngineConfig};
pub use gesture::{Gesture, GestureController, Manipulation, PointerId};
pub use hitbox::{GeometryError, Hitbox, HitboxShape, Hittable};
pub use ids::{GroupId, Identifiable, ItemId, ViewId};
pub use item::{Interaction, Item, ItemDescriptor, ItemKind, ItemSpec};
pub use lock::{LockTable, LockTarget, Lockable};
pub use mirror::Mirror;
pub use protocol::{ClientMessage, ItemPatch, JoinRequest, ProtocolError, ServerMessage, ViewPatch};
pub use registry::{Registry, ViewOp};
pub use transform::{ScaleMode, Transform, Transformable};
pub use view::{ShadowView, View, ViewDescriptor, ViewGroup};
pub use workspace::Workspace;
