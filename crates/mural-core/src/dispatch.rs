//! Outbound message routing.
//!
//! Mutations queue [`Envelope`]s on the [`Dispatcher`]; the host drains them
//! with [`Dispatcher::take_outgoing`] and forwards each to the connections its
//! [`Audience`] names. Registered [`Observer`]s see every envelope as it is
//! queued.

use crate::ids::ViewId;
use crate::protocol::ServerMessage;
use std::sync::{Arc, Mutex};

/// Who a message is meant for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Audience {
    All,
    Only(ViewId),
    Except(ViewId),
}

impl Audience {
    pub fn includes(&self, view: ViewId) -> bool {
        match self {
            Audience::All => true,
            Audience::Only(target) => *target == view,
            Audience::Except(skipped) => *skipped != view,
        }
    }
}

/// A message and its audience.
#[derive(Debug, Clone, PartialEq)]
pub struct Envelope {
    pub audience: Audience,
    pub message: ServerMessage,
}

/// Synchronous listener for queued messages.
pub trait Observer {
    fn notify(&mut self, envelope: &Envelope);
}

impl<T: Observer> Observer for Arc<Mutex<T>> {
    fn notify(&mut self, envelope: &Envelope) {
        match self.lock() {
            Ok(mut inner) => inner.notify(envelope),
            Err(_) => log::error!("Observer mutex poisoned, dropping {:?}", envelope.audience),
        }
    }
}

#[derive(Default)]
pub struct Dispatcher {
    outgoing: Vec<Envelope>,
    observers: Vec<Box<dyn Observer + Send>>,
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("outgoing", &self.outgoing.len())
            .field("observers", &self.observers.len())
            .finish()
    }
}

impl Dispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&mut self, observer: Box<dyn Observer + Send>) {
        self.observers.push(observer);
    }

    pub fn send(&mut self, audience: Audience, message: ServerMessage) {
        let envelope = Envelope { audience, message };
        for observer in &mut self.observers {
            observer.notify(&envelope);
        }
        self.outgoing.push(envelope);
    }

    pub fn broadcast(&mut self, message: ServerMessage) {
        self.send(Audience::All, message);
    }

    pub fn send_to(&mut self, view: ViewId, message: ServerMessage) {
        self.send(Audience::Only(view), message);
    }

    pub fn broadcast_except(&mut self, view: ViewId, message: ServerMessage) {
        self.send(Audience::Except(view), message);
    }

    /// Take all queued messages, oldest first.
    pub fn take_outgoing(&mut self) -> Vec<Envelope> {
        std::mem::take(&mut self.outgoing)
    }

    pub fn pending(&self) -> usize {
        self.outgoing.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ids::ItemId;

    #[derive(Default)]
    struct Counter {
        seen: usize,
    }

    impl Observer for Counter {
        fn notify(&mut self, _envelope: &Envelope) {
            self.seen += 1;
        }
    }

    #[test]
    fn test_audience() {
        let a = ViewId(1);
        let b = ViewId(2);
        assert!(Audience::All.includes(a));
        assert!(Audience::Only(a).includes(a));
        assert!(!Audience::Only(a).includes(b));
        assert!(!Audience::Except(a).includes(a));
        assert!(Audience::Except(a).includes(b));
    }

    #[test]
    fn test_take_outgoing_drains_in_order() {
        let mut dispatcher = Dispatcher::new();
        dispatcher.broadcast(ServerMessage::RmItem { id: ItemId(1) });
        dispatcher.send_to(ViewId(3), ServerMessage::RmItem { id: ItemId(2) });
        let out = dispatcher.take_outgoing();
        assert_eq!(out.len(), 2);
        assert_eq!(out[0].audience, Audience::All);
        assert_eq!(out[1].audience, Audience::Only(ViewId(3)));
        assert_eq!(dispatcher.pending(), 0);
    }

    #[test]
    fn test_observers_notified() {
        let counter = Arc::new(Mutex::new(Counter::default()));
        let mut dispatcher = Dispatcher::new();
        dispatcher.subscribe(Box::new(counter.clone()));
        dispatcher.broadcast(ServerMessage::RmItem { id: ItemId(1) });
        dispatcher.broadcast_except(ViewId(1), ServerMessage::RmItem { id: ItemId(2) });
        assert_eq!(counter.lock().unwrap().seen, 2);
    }
}
