//! Type-erased, same-tick publish/subscribe between systems

use std::any::{Any, TypeId};
use std::collections::HashMap;

use crate::ecs::{Entity, Registry};

/// Marker trait for event payloads.
///
/// Events are ephemeral: a value exists only for the duration of a single
/// `emit` call and is never stored across ticks.
pub trait EventPayload: 'static {}

type HandlerList<E> = Vec<Box<dyn FnMut(&E, &mut Registry)>>;

/// Synchronous publish/subscribe channel keyed by event type.
///
/// `emit` invokes every subscriber for the event's type in subscription
/// order, on the same call stack, before returning. Handlers receive the
/// registry as an explicit argument; structural mutations they make (kills,
/// creations) are deferred by the registry itself until the next flush.
///
/// Subscriptions live for a single tick by convention: the driver resets
/// the bus and re-runs every system's `subscribe` hook each tick. There is
/// no finer-grained unsubscribe.
#[derive(Default)]
pub struct EventBus {
    channels: HashMap<TypeId, Box<dyn Any>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler for events of type `E`.
    pub fn subscribe<E: EventPayload>(
        &mut self,
        handler: impl FnMut(&E, &mut Registry) + 'static,
    ) {
        let handlers = self
            .channels
            .entry(TypeId::of::<E>())
            .or_insert_with(|| Box::new(HandlerList::<E>::new()));
        let handlers = handlers
            .downcast_mut::<HandlerList<E>>()
            .expect("handler list type matches its event type id");
        handlers.push(Box::new(handler));
    }

    /// Invoke every subscriber for `E`, in subscription order. Handlers run
    /// synchronously on the emitter's call stack; there is no queue and no
    /// error propagation back to the emitter.
    ///
    /// A handler never sees the bus itself, only the event and the
    /// registry, so the emit-from-handler recursion hazard is
    /// unrepresentable here.
    pub fn emit<E: EventPayload>(&mut self, event: E, registry: &mut Registry) {
        let Some(channel) = self.channels.get_mut(&TypeId::of::<E>()) else {
            return;
        };
        let Some(handlers) = channel.downcast_mut::<HandlerList<E>>() else {
            return;
        };
        for handler in handlers.iter_mut() {
            handler(&event, registry);
        }
    }

    /// Number of subscribers currently registered for `E`.
    pub fn subscriber_count<E: EventPayload>(&self) -> usize {
        self.channels
            .get(&TypeId::of::<E>())
            .and_then(|c| c.downcast_ref::<HandlerList<E>>())
            .map(|h| h.len())
            .unwrap_or(0)
    }

    /// Drop every subscription. The driver calls this at the top of each
    /// tick before systems re-subscribe.
    pub fn reset(&mut self) {
        self.channels.clear();
    }
}

/// Two entities whose colliders overlapped this tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CollisionEvent {
    pub a: Entity,
    pub b: Entity,
}

impl EventPayload for CollisionEvent {}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use super::*;

    struct Ping(u32);
    impl EventPayload for Ping {}

    struct Pong;
    impl EventPayload for Pong {}

    #[test]
    fn test_fan_out_in_subscription_order() {
        let mut bus = EventBus::new();
        let mut registry = Registry::new();
        let seen = Rc::new(RefCell::new(Vec::new()));

        for label in ["first", "second", "third"] {
            let seen = Rc::clone(&seen);
            bus.subscribe::<Ping>(move |event, _| {
                seen.borrow_mut().push((label, event.0));
            });
        }
        assert_eq!(bus.subscriber_count::<Ping>(), 3);

        bus.emit(Ping(7), &mut registry);
        assert_eq!(
            *seen.borrow(),
            vec![("first", 7), ("second", 7), ("third", 7)]
        );
    }

    #[test]
    fn test_emit_without_subscribers_is_a_no_op() {
        let mut bus = EventBus::new();
        let mut registry = Registry::new();
        bus.emit(Ping(1), &mut registry);
        bus.emit(Pong, &mut registry);
    }

    #[test]
    fn test_reset_clears_subscriptions() {
        let mut bus = EventBus::new();
        let mut registry = Registry::new();
        let count = Rc::new(RefCell::new(0));

        let c = Rc::clone(&count);
        bus.subscribe::<Ping>(move |_, _| *c.borrow_mut() += 1);
        bus.emit(Ping(0), &mut registry);
        bus.reset();
        bus.emit(Ping(0), &mut registry);

        assert_eq!(*count.borrow(), 1);
        assert_eq!(bus.subscriber_count::<Ping>(), 0);
    }

    #[test]
    fn test_handlers_only_see_their_event_type() {
        let mut bus = EventBus::new();
        let mut registry = Registry::new();
        let pings = Rc::new(RefCell::new(0));

        let p = Rc::clone(&pings);
        bus.subscribe::<Ping>(move |_, _| *p.borrow_mut() += 1);
        bus.emit(Pong, &mut registry);
        bus.emit(Ping(0), &mut registry);

        assert_eq!(*pings.borrow(), 1);
    }

    #[test]
    fn test_handlers_survive_dispatch() {
        let mut bus = EventBus::new();
        let mut registry = Registry::new();
        let count = Rc::new(RefCell::new(0));

        let c = Rc::clone(&count);
        bus.subscribe::<Ping>(move |_, _| *c.borrow_mut() += 1);
        bus.emit(Ping(0), &mut registry);
        bus.emit(Ping(0), &mut registry);

        assert_eq!(*count.borrow(), 2);
        assert_eq!(bus.subscriber_count::<Ping>(), 1);
    }
}
