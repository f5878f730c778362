//! Priority-ordered extension points
//!
//! Each extension point (pre/post resolve, pre/post commit, view-granted
//! overrides) is an [`EventBus`] over its own event type. Listeners receive the
//! event mutably, may rewrite it, and return [`ControlFlow::Break`] to stop the
//! chain.
//!
//! Listeners run in ascending priority order (lower = earlier); listeners that
//! share a priority run in registration order.

use std::fmt;
use std::ops::ControlFlow;

/// Default listener priority
pub const DEFAULT_PRIORITY: i32 = 100;

type Listener<E> = Box<dyn Fn(&mut E) -> ControlFlow<()>>;

struct RegisteredListener<E> {
    priority: i32,
    listener: Listener<E>,
}

/// Publish/subscribe point for a single event type
pub struct EventBus<E> {
    listeners: Vec<RegisteredListener<E>>,
}

impl<E> EventBus<E> {
    /// Creates a bus with no listeners
    pub fn new() -> Self {
        Self {
            listeners: Vec::new(),
        }
    }

    /// Registers a listener at the given priority
    pub fn subscribe<F>(&mut self, priority: i32, listener: F)
    where
        F: Fn(&mut E) -> ControlFlow<()> + 'static,
    {
        // Stable: FIFO for same priority
        let pos = self
            .listeners
            .iter()
            .position(|l| l.priority > priority)
            .unwrap_or(self.listeners.len());

        self.listeners.insert(
            pos,
            RegisteredListener {
                priority,
                listener: Box::new(listener),
            },
        );
    }

    /// Dispatches the event to every listener in priority order
    ///
    /// Returns `true` if a listener stopped propagation.
    pub fn dispatch(&self, event: &mut E) -> bool {
        for registered in &self.listeners {
            if (registered.listener)(event).is_break() {
                return true;
            }
        }
        false
    }

    /// Number of registered listeners
    pub fn len(&self) -> usize {
        self.listeners.len()
    }

    /// Returns `true` if no listeners are registered
    pub fn is_empty(&self) -> bool {
        self.listeners.is_empty()
    }
}

impl<E> Default for EventBus<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E> fmt::Debug for EventBus<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBus")
            .field("listeners", &self.listeners.len())
            .finish()
    }
}
