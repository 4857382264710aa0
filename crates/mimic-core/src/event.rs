//! Event handler bookkeeping.
//!
//! Subscriptions are kept per event name in subscription order. Handlers
//! compare by identity, so removing a handler removes the most recent
//! subscription of that same handler object for the same target.

use std::{fmt, sync::Arc};

use dashmap::DashMap;

use crate::value::Value;

type HandlerFn = Arc<dyn Fn(&[Value]) + Send + Sync>;

/// A subscribable event handler with identity semantics.
#[derive(Clone)]
pub struct EventHandler {
    f: HandlerFn,
}

impl EventHandler {
    /// Wrap a closure as a handler.
    pub fn new(f: impl Fn(&[Value]) + Send + Sync + 'static) -> Self {
        Self { f: Arc::new(f) }
    }

    /// Identity of this handler, stable across clones.
    pub fn id(&self) -> usize {
        Arc::as_ptr(&self.f).cast::<()>() as usize
    }

    /// Invoke the handler.
    pub fn call(&self, args: &[Value]) {
        (self.f)(args);
    }
}

impl PartialEq for EventHandler {
    fn eq(&self, other: &Self) -> bool {
        std::ptr::addr_eq(Arc::as_ptr(&self.f), Arc::as_ptr(&other.f))
    }
}

impl Eq for EventHandler {}

impl fmt::Debug for EventHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EventHandler({:#x})", self.id())
    }
}

/// A handler attached to an event, optionally bound to a target object.
#[derive(Debug, Clone)]
pub struct Subscription {
    /// Object the handler is bound to
    pub target: Option<Value>,
    /// The handler
    pub handler: EventHandler,
}

impl Subscription {
    fn is(&self, target: Option<&Value>, handler: &EventHandler) -> bool {
        let same_target = match (&self.target, target) {
            (None, None) => true,
            (Some(a), Some(b)) => a.value_eq(b),
            _ => false,
        };
        same_target && self.handler == *handler
    }
}

/// Live subscriptions of one mock, keyed by event name.
#[derive(Debug, Default)]
pub(crate) struct EventHandlers {
    subscriptions: DashMap<String, Vec<Subscription>>,
}

impl EventHandlers {
    pub(crate) fn add(&self, name: &str, target: Option<Value>, handler: EventHandler) {
        self.subscriptions
            .entry(name.to_string())
            .or_default()
            .push(Subscription { target, handler });
    }

    /// Remove the most recent matching subscription. `false` if none.
    pub(crate) fn remove(&self, name: &str, target: Option<&Value>, handler: &EventHandler) -> bool {
        let Some(mut subscriptions) = self.subscriptions.get_mut(name) else {
            return false;
        };

        match subscriptions.iter().rposition(|s| s.is(target, handler)) {
            Some(position) => {
                subscriptions.remove(position);
                true
            },
            None => false,
        }
    }

    /// Invoke every handler of `name` in subscription order.
    ///
    /// The handler list is snapshotted first, so handlers may subscribe or
    /// unsubscribe while being raised.
    pub(crate) fn raise(&self, name: &str, args: &[Value]) -> usize {
        let handlers: Vec<EventHandler> = match self.subscriptions.get(name) {
            Some(subscriptions) => subscriptions.iter().map(|s| s.handler.clone()).collect(),
            None => return 0,
        };

        for handler in &handlers {
            handler.call(args);
        }
        handlers.len()
    }

    pub(crate) fn subscriptions(&self, name: &str) -> Vec<Subscription> {
        self.subscriptions.get(name).map(|s| s.value().clone()).unwrap_or_default()
    }

    pub(crate) fn clear(&self) {
        self.subscriptions.clear();
    }
}
