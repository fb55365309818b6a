//! Synchronous publish/subscribe message bus.
//!
//! Systems talk to each other by dispatching [`Message`]s on a
//! [`MessageBus`]. Every handler registered for the message's kind runs to
//! completion, in registration order, before [`MessageBus::dispatch`] returns.
//!
//! # Re-entrancy
//!
//! Handlers are `Fn` closures held behind `Rc`, and the listener table is not
//! borrowed while they run. A handler may therefore dispatch further messages
//! or register new listeners. Listeners added during a dispatch only see later
//! dispatches. Unbounded recursion is the caller's problem.
//!
//! # Example
//!
//! ```
//! use std::cell::Cell;
//! use std::rc::Rc;
//! use tessera_ecs::message::{Message, MessageBus};
//!
//! struct Scored(u32);
//!
//! impl Message for Scored {
//!     fn kind(&self) -> &str {
//!         "Scored"
//!     }
//! }
//!
//! let bus = MessageBus::new();
//! let total = Rc::new(Cell::new(0));
//! let sink = total.clone();
//! bus.listen_for::<Scored, _>("Scored", move |msg| sink.set(sink.get() + msg.0));
//!
//! bus.dispatch(&Scored(3));
//! bus.dispatch(&Scored(4));
//! assert_eq!(total.get(), 7);
//! ```

use std::any::Any;
use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

// ---------------------------------------------------------------------------
// Message
// ---------------------------------------------------------------------------

/// Upcast helper so trait objects (messages, systems) can be downcast to
/// their concrete type.
pub trait AsAny {
    /// `self` as `&dyn Any`.
    fn as_any(&self) -> &dyn Any;

    /// `self` as `&mut dyn Any`.
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

impl<T: Any> AsAny for T {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// A payload broadcast on the bus. Immutable by convention.
pub trait Message: AsAny {
    /// The routing key. Handlers are looked up by this string.
    fn kind(&self) -> &str;
}

impl<'a> dyn Message + 'a {
    /// Downcast to a concrete message type.
    pub fn downcast_ref<M: Message + 'static>(&self) -> Option<&M> {
        self.as_any().downcast_ref::<M>()
    }
}

// ---------------------------------------------------------------------------
// ListenerId
// ---------------------------------------------------------------------------

/// Handle returned by [`MessageBus::listen`], used to unsubscribe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

type Handler = Rc<dyn Fn(&dyn Message)>;

struct Listener {
    id: ListenerId,
    handler: Handler,
}

// ---------------------------------------------------------------------------
// MessageBus
// ---------------------------------------------------------------------------

/// Routes messages to the handlers registered for their kind.
pub struct MessageBus {
    listeners: RefCell<HashMap<String, Vec<Listener>>>,
    next_id: Cell<u64>,
}

impl Default for MessageBus {
    fn default() -> Self {
        Self::new()
    }
}

impl MessageBus {
    /// An empty bus.
    pub fn new() -> Self {
        Self {
            listeners: RefCell::new(HashMap::new()),
            next_id: Cell::new(0),
        }
    }

    /// Register `handler` for messages of `kind`.
    ///
    /// Handlers for the same kind run in the order they were registered.
    pub fn listen<F>(&self, kind: &str, handler: F) -> ListenerId
    where
        F: Fn(&dyn Message) + 'static,
    {
        let id = ListenerId(self.next_id.get());
        self.next_id.set(id.0 + 1);
        self.listeners
            .borrow_mut()
            .entry(kind.to_owned())
            .or_default()
            .push(Listener {
                id,
                handler: Rc::new(handler),
            });
        id
    }

    /// Register a typed handler for messages of `kind`.
    ///
    /// Payloads of `kind` that are not an `M` are ignored by this handler.
    pub fn listen_for<M, F>(&self, kind: &str, handler: F) -> ListenerId
    where
        M: Message + 'static,
        F: Fn(&M) + 'static,
    {
        self.listen(kind, move |message| {
            if let Some(typed) = message.downcast_ref::<M>() {
                handler(typed);
            }
        })
    }

    /// Remove a handler. Returns `false` if it was not registered.
    pub fn unlisten(&self, id: ListenerId) -> bool {
        let mut listeners = self.listeners.borrow_mut();
        for handlers in listeners.values_mut() {
            if let Some(index) = handlers.iter().position(|l| l.id == id) {
                handlers.remove(index);
                return true;
            }
        }
        false
    }

    /// Deliver `message` to every handler registered for its kind.
    ///
    /// A kind with no handlers is not an error. A panicking handler unwinds
    /// through `dispatch`; handlers after it do not run.
    pub fn dispatch(&self, message: &dyn Message) {
        // Snapshot so handlers can touch the bus while we iterate.
        let handlers: Vec<Handler> = match self.listeners.borrow().get(message.kind()) {
            Some(listeners) => listeners.iter().map(|l| l.handler.clone()).collect(),
            None => return,
        };
        for handler in handlers {
            handler(message);
        }
    }

    /// Drop every registered handler.
    pub fn clear(&self) {
        self.listeners.borrow_mut().clear();
    }

    /// Number of handlers registered for `kind`.
    pub fn listener_count(&self, kind: &str) -> usize {
        self.listeners.borrow().get(kind).map_or(0, Vec::len)
    }
}

impl fmt::Debug for MessageBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let listeners = self.listeners.borrow();
        let mut kinds: Vec<(&str, usize)> = listeners
            .iter()
            .map(|(kind, handlers)| (kind.as_str(), handlers.len()))
            .collect();
        kinds.sort_unstable();
        f.debug_struct("MessageBus").field("listeners", &kinds).finish()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    struct Ping(u32);

    impl Message for Ping {
        fn kind(&self) -> &str {
            "Ping"
        }
    }

    struct Pong;

    impl Message for Pong {
        fn kind(&self) -> &str {
            "Pong"
        }
    }

    fn recorder() -> (Rc<RefCell<Vec<String>>>, Rc<RefCell<Vec<String>>>) {
        let log = Rc::new(RefCell::new(Vec::new()));
        (log.clone(), log)
    }

    // -- 1. Routing --

    #[test]
    fn dispatch_without_listeners_is_noop() {
        let bus = MessageBus::new();
        bus.dispatch(&Ping(1));
        assert_eq!(bus.listener_count("Ping"), 0);
    }

    #[test]
    fn handlers_run_in_registration_order() {
        let bus = MessageBus::new();
        let (log, sink) = recorder();
        for name in ["first", "second", "third"] {
            let sink = sink.clone();
            bus.listen("Ping", move |_| sink.borrow_mut().push(name.to_owned()));
        }

        bus.dispatch(&Ping(0));
        assert_eq!(*log.borrow(), vec!["first", "second", "third"]);
    }

    #[test]
    fn handlers_only_see_their_kind() {
        let bus = MessageBus::new();
        let (log, sink) = recorder();
        bus.listen("Pong", move |m| sink.borrow_mut().push(m.kind().to_owned()));

        bus.dispatch(&Ping(0));
        assert!(log.borrow().is_empty());
        bus.dispatch(&Pong);
        assert_eq!(*log.borrow(), vec!["Pong"]);
    }

    #[test]
    fn typed_listener_downcasts() {
        let bus = MessageBus::new();
        let seen = Rc::new(Cell::new(0));
        let sink = seen.clone();
        bus.listen_for::<Ping, _>("Ping", move |m| sink.set(m.0));

        bus.dispatch(&Ping(42));
        assert_eq!(seen.get(), 42);
    }

    #[test]
    fn trait_object_downcasts_to_its_own_type() {
        let message: &dyn Message = &Ping(7);
        assert_eq!(message.downcast_ref::<Ping>().map(|p| p.0), Some(7));
        assert!(message.downcast_ref::<Pong>().is_none());
    }

    #[test]
    fn typed_listener_ignores_foreign_payload() {
        let bus = MessageBus::new();
        let calls = Rc::new(Cell::new(0));
        let sink = calls.clone();
        bus.listen_for::<Ping, _>("Pong", move |_| sink.set(sink.get() + 1));

        bus.dispatch(&Pong);
        assert_eq!(calls.get(), 0);
    }

    // -- 2. Re-entrancy --

    #[test]
    fn handler_can_dispatch() {
        let bus = Rc::new(MessageBus::new());
        let (log, sink) = recorder();

        let inner = bus.clone();
        let ping_sink = sink.clone();
        bus.listen("Ping", move |_| {
            ping_sink.borrow_mut().push("ping".to_owned());
            inner.dispatch(&Pong);
        });
        bus.listen("Pong", move |_| sink.borrow_mut().push("pong".to_owned()));

        bus.dispatch(&Ping(0));
        assert_eq!(*log.borrow(), vec!["ping", "pong"]);
    }

    #[test]
    fn listener_added_during_dispatch_sees_only_later_dispatches() {
        let bus = Rc::new(MessageBus::new());
        let calls = Rc::new(Cell::new(0));

        let inner = bus.clone();
        let counter = calls.clone();
        let registered = Rc::new(Cell::new(false));
        bus.listen("Ping", move |_| {
            if !registered.get() {
                registered.set(true);
                let counter = counter.clone();
                inner.listen("Ping", move |_| counter.set(counter.get() + 1));
            }
        });

        bus.dispatch(&Ping(0));
        assert_eq!(calls.get(), 0);
        bus.dispatch(&Ping(0));
        assert_eq!(calls.get(), 1);
    }

    // -- 3. Unsubscribe and reset --

    #[test]
    fn unlisten_removes_one_handler() {
        let bus = MessageBus::new();
        let calls = Rc::new(Cell::new(0));
        let a = calls.clone();
        let b = calls.clone();
        let first = bus.listen("Ping", move |_| a.set(a.get() + 1));
        bus.listen("Ping", move |_| b.set(b.get() + 10));

        assert!(bus.unlisten(first));
        assert!(!bus.unlisten(first));

        bus.dispatch(&Ping(0));
        assert_eq!(calls.get(), 10);
    }

    #[test]
    fn clear_drops_everything() {
        let bus = MessageBus::new();
        bus.listen("Ping", |_| {});
        bus.listen("Pong", |_| {});
        bus.clear();
        assert_eq!(bus.listener_count("Ping"), 0);
        assert_eq!(bus.listener_count("Pong"), 0);
    }

    #[test]
    #[should_panic(expected = "handler failed")]
    fn handler_panic_propagates() {
        let bus = MessageBus::new();
        bus.listen("Ping", |_| panic!("handler failed"));
        bus.dispatch(&Ping(0));
    }
}
