//! Inbound message handling for one shared scene.
//!
//! An [`Engine`] owns the whole model. Every client message is handled to
//! completion inside one [`Engine::handle`] call; each mutation is committed
//! before its notification is queued on the dispatcher.

use crate::dispatch::{Dispatcher, Envelope};
use crate::gesture::{Gesture, Manipulation, PointerId};
use crate::hitbox::GeometryError;
use crate::ids::{ItemId, ViewId};
use crate::item::{Interaction, Item, ItemDescriptor, ItemSpec};
use crate::lock::{LockTable, LockTarget};
use crate::protocol::{ClientMessage, ItemPatch, JoinRequest, ProtocolError, ServerMessage};
use crate::registry::{Registry, ViewOp};
use crate::transform::{Transform, Transformable};
use crate::view::ViewDescriptor;
use crate::workspace::Workspace;
use kurbo::{Point, Vec2};
use serde::{Deserialize, Serialize};

/// Tunables of an engine instance.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Smallest accumulated scale a pinch may produce.
    pub min_scale: f64,
    /// Largest accumulated scale a pinch may produce.
    pub max_scale: f64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            min_scale: 0.1,
            max_scale: 10.0,
        }
    }
}

impl EngineConfig {
    pub fn allows_scale(&self, scale: f64) -> bool {
        (self.min_scale..=self.max_scale).contains(&scale)
    }

    /// How far `scale` lies outside the allowed range.
    fn overshoot(&self, scale: f64) -> f64 {
        if scale < self.min_scale {
            self.min_scale - scale
        } else if scale > self.max_scale {
            scale - self.max_scale
        } else {
            0.0
        }
    }

    /// Accept a step that lands in range, or one that brings an
    /// out-of-range scale closer to it.
    pub fn allows_step(&self, scale: f64, factor: f64) -> bool {
        let next = scale * factor;
        self.allows_scale(next) || self.overshoot(next) < self.overshoot(scale)
    }
}

fn pointer_position(x: f64, y: f64) -> Result<Point, ProtocolError> {
    let position = Point::new(x, y);
    if position.is_finite() {
        Ok(position)
    } else {
        Err(ProtocolError::NonFinitePointer(x, y))
    }
}

/// Apply the components of `m` that `item` registered for.
fn manipulate(
    item: &mut Item,
    m: &Manipulation,
    pivot: Point,
    translation: Vec2,
    config: &EngineConfig,
) {
    if m.rotation != 0.0 && item.handles(Interaction::Rotate) {
        item.rotate_by(m.rotation, Some(pivot));
    }
    if m.scale != 1.0
        && item.handles(Interaction::Pinch)
        && config.allows_step(item.transform().scale, m.scale)
    {
        item.scale_by(m.scale, Some(pivot));
    }
    if translation != Vec2::ZERO && item.handles(Interaction::Drag) {
        item.move_by(translation.x, translation.y);
    }
}

#[derive(Debug, Default)]
pub struct Engine {
    config: EngineConfig,
    workspace: Workspace,
    registry: Registry,
    locks: LockTable,
    dispatcher: Dispatcher,
}

impl Engine {
    pub fn new(config: EngineConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn workspace(&self) -> &Workspace {
        &self.workspace
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn locks(&self) -> &LockTable {
        &self.locks
    }

    pub fn dispatcher_mut(&mut self) -> &mut Dispatcher {
        &mut self.dispatcher
    }

    /// Drain queued outbound messages.
    pub fn take_outgoing(&mut self) -> Vec<Envelope> {
        self.dispatcher.take_outgoing()
    }

    /// Items, topmost first.
    pub fn items(&self) -> Vec<ItemDescriptor> {
        self.workspace.snapshot(&self.locks)
    }

    /// Views, ordered by id.
    pub fn views(&self) -> Vec<ViewDescriptor> {
        self.registry.describe_all()
    }

    /// Spawn an item on behalf of the host application.
    pub fn spawn(&mut self, spec: ItemSpec) -> Result<ItemId, GeometryError> {
        self.workspace.spawn(spec, &mut self.dispatcher)
    }

    pub fn remove(&mut self, id: ItemId) -> bool {
        self.workspace.remove_item(id, &mut self.locks, &mut self.dispatcher)
    }

    pub fn set_render(&mut self, id: ItemId, render: serde_json::Value) -> bool {
        self.workspace.set_render(id, render, &mut self.dispatcher)
    }

    /// Admit a new view. It receives the full scene; everyone else learns
    /// about it.
    pub fn join(&mut self, request: &JoinRequest) -> Result<ViewId, ProtocolError> {
        let (width, height) = request.dimensions()?;
        let id = self.registry.spawn_view(width, height, request.group.as_deref());
        let snapshot = ServerMessage::FullSnapshot {
            view_id: id,
            items: self.items(),
            views: self.views(),
        };
        self.dispatcher.send_to(id, snapshot);
        if let Some(view) = self.registry.view(id) {
            self.dispatcher
                .broadcast_except(id, ServerMessage::AddView { view: view.describe() });
        }
        log::info!("{id} joined ({width}x{height}, group {:?})", request.group);
        Ok(id)
    }

    /// Drop a view: clear its gestures, release its lock and retire its shadow.
    pub fn leave(&mut self, view: ViewId) -> bool {
        if self.registry.view(view).is_none() {
            return false;
        }
        self.release(view);
        self.registry.remove_view(view, &mut self.locks);
        self.dispatcher.broadcast(ServerMessage::RmView { id: view });
        log::info!("{view} left");
        true
    }

    pub fn handle(&mut self, view: ViewId, message: ClientMessage) -> Result<(), ProtocolError> {
        if self.registry.view(view).is_none() {
            return Err(ProtocolError::NotJoined);
        }
        match message {
            ClientMessage::Join(_) => return Err(ProtocolError::AlreadyJoined),
            ClientMessage::PointerDown { pointer_id, x, y } => {
                self.pointer_down(view, pointer_id, pointer_position(x, y)?);
            }
            ClientMessage::PointerMove { pointer_id, x, y } => {
                let position = pointer_position(x, y)?;
                let gesture = self
                    .registry
                    .view_mut(view)
                    .and_then(|v| v.gestures.pointer_move(pointer_id, position));
                self.apply_gesture(view, gesture);
            }
            ClientMessage::PointerUp { pointer_id, x, y } => {
                let position = pointer_position(x, y)?;
                let gesture = self
                    .registry
                    .view_mut(view)
                    .and_then(|v| v.gestures.pointer_up(pointer_id, position));
                self.apply_gesture(view, gesture);
            }
            ClientMessage::Resize { width, height } => {
                self.registry.resize_view(view, width, height, &mut self.dispatcher);
            }
            ClientMessage::Release => {
                self.release(view);
            }
            ClientMessage::Spawn { spec } => {
                self.spawn(spec)?;
            }
            ClientMessage::Remove { id } => {
                self.remove(id);
            }
            ClientMessage::BringToTop { id } => {
                self.workspace.bring_to_top(id, &mut self.dispatcher);
            }
            ClientMessage::Leave => {
                self.leave(view);
            }
        }
        Ok(())
    }

    /// Release whatever `view` holds.
    pub fn release(&mut self, view: ViewId) -> Option<LockTarget> {
        let target = self.locks.unlock(view)?;
        if let LockTarget::Item(id) = target {
            if self.workspace.get(id).is_some() {
                self.dispatcher.broadcast(ServerMessage::UdItem {
                    id,
                    patch: ItemPatch::locked_by(None),
                });
            }
        }
        Some(target)
    }

    fn pointer_down(&mut self, view: ViewId, pointer: PointerId, position: Point) {
        let Some(v) = self.registry.view_mut(view) else {
            return;
        };
        v.gestures.pointer_down(pointer, position);
        if self.locks.held_by(view).is_some() {
            return;
        }
        let world = v.to_world(position);
        let fallback = v.fallback_target();
        let target = self
            .workspace
            .obtain_lock(world, view, fallback, &mut self.locks, &mut self.dispatcher);
        log::debug!("{view} grabbed {target:?} at {world:?}");
    }

    fn apply_gesture(&mut self, view: ViewId, gesture: Option<Gesture>) {
        let Some(gesture) = gesture else {
            return;
        };
        let Some(target) = self.locks.held_by(view) else {
            return;
        };
        let manipulation = gesture.into_manipulation();
        if manipulation.is_identity() {
            return;
        }
        if !manipulation.is_finite() {
            log::warn!("{view} dropped a non-finite gesture step {manipulation:?}");
            return;
        }
        match target {
            LockTarget::Item(id) => self.manipulate_item(view, id, manipulation),
            LockTarget::View(_) | LockTarget::Group(_) => {
                self.manipulate_viewport(view, target, manipulation)
            }
        }
    }

    /// Items follow the pointers, limited to the interactions they registered.
    fn manipulate_item(&mut self, view: ViewId, id: ItemId, m: Manipulation) {
        let Some(v) = self.registry.view(view) else {
            return;
        };
        let pivot = v.to_world(m.pivot);
        let translation = v.delta_to_world(m.translation);
        let config = self.config;

        let Some(mut trial) = self.workspace.get(id).cloned() else {
            return;
        };
        manipulate(&mut trial, &m, pivot, translation, &config);
        if !trial.transform().is_finite() {
            log::warn!("Dropping step that would move {id} out of range");
            return;
        }
        self.workspace
            .update_item(id, &self.locks, &mut self.dispatcher, |item| {
                manipulate(item, &m, pivot, translation, &config);
            });
    }

    /// Views and groups move opposite to the pointers so the content under
    /// the pointers follows them.
    fn manipulate_viewport(&mut self, view: ViewId, target: LockTarget, m: Manipulation) {
        let Some(v) = self.registry.view(view) else {
            return;
        };
        let pivot = v.to_world(m.pivot);
        let current = *v.transform();

        let mut ops = Vec::with_capacity(3);
        let mut after = Transform {
            rotation: current.rotation,
            scale: current.scale,
            ..Transform::default()
        };
        if m.rotation != 0.0 {
            ops.push(ViewOp::RotateBy(-m.rotation, Some(pivot)));
            after.rotation -= m.rotation;
        }
        let scale = self.registry.scale_of(target).unwrap_or(current.scale);
        if m.scale != 1.0 && self.config.allows_step(scale, m.scale) {
            ops.push(ViewOp::ScaleBy(m.scale, Some(pivot)));
            after.scale *= m.scale;
        }
        // The translation is measured in the frame the view ends up in.
        let translation = after.view_delta_to_world(m.translation);
        if translation != Vec2::ZERO {
            ops.push(ViewOp::MoveBy(-translation.x, -translation.y));
        }
        if !self.registry.keeps_finite(target, &ops) {
            log::warn!("Dropping step that would move {target:?} out of range");
            return;
        }
        self.registry.apply(target, &ops, &mut self.dispatcher);
    }
}
