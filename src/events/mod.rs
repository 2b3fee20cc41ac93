//! In-process event bus
//!
//! String-topic publish/subscribe with synchronous, registration-ordered
//! fan-out. Handlers are identified by a [`HandlerId`] so components can
//! guarantee unsubscription on their teardown path.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

/// Well-known topic names produced and consumed by the core.
pub mod topics {
    /// A level transition finished and the new scene is fully initialized.
    pub const LEVEL_LOADED: &str = "level_loaded";
    /// The player rested at a checkpoint (regular enemies respawn).
    pub const CHECKPOINT_REST: &str = "checkpoint_rest";
    /// A checkpoint was activated (save written, effects may play).
    pub const CHECKPOINT_ACTIVATED: &str = "checkpoint_activated";
    /// Any enemy was defeated.
    pub const ENEMY_DEFEATED: &str = "enemy_defeated";
    /// A save snapshot was written to disk.
    pub const GAME_SAVED: &str = "game_saved";
    /// A save snapshot was fully applied after a load.
    pub const GAME_LOADED: &str = "game_loaded";
    /// Player health was restored to full.
    pub const PLAYER_HEALTH_RESTORED: &str = "player_health_restored";
    /// Player took damage.
    pub const PLAYER_DAMAGED: &str = "player_damaged";
    /// Player health reached zero.
    pub const PLAYER_DIED: &str = "player_died";

    /// Per-key change notification published by the persistent store.
    pub fn state_changed(key: &str) -> String {
        format!("state_changed.{key}")
    }
}

/// Identifies one subscription for later removal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HandlerId(u64);

type Handler = Rc<RefCell<dyn FnMut()>>;

struct Subscription {
    id: HandlerId,
    handler: Handler,
}

#[derive(Default)]
struct BusInner {
    next_id: u64,
    subscribers: HashMap<String, Vec<Subscription>>,
}

/// Synchronous topic bus.
///
/// Dispatch order is registration order. Publishing is re-entrant: a
/// handler may publish, subscribe, or unsubscribe while running. Handlers
/// must not synchronously re-enter the component that is mid-publish (the
/// registry itself is released before handlers run, but a handler that
/// borrows the publishing service will still collide with the caller's
/// outstanding borrow).
#[derive(Default)]
pub struct EventBus {
    inner: RefCell<BusInner>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler for `topic`. Returns the id needed to
    /// unsubscribe.
    pub fn subscribe(&self, topic: impl Into<String>, handler: impl FnMut() + 'static) -> HandlerId {
        let mut inner = self.inner.borrow_mut();
        inner.next_id += 1;
        let id = HandlerId(inner.next_id);
        inner
            .subscribers
            .entry(topic.into())
            .or_default()
            .push(Subscription {
                id,
                handler: Rc::new(RefCell::new(handler)),
            });
        id
    }

    /// Remove one subscription. Removing an id that is already gone is a
    /// no-op.
    pub fn unsubscribe(&self, topic: &str, id: HandlerId) {
        let mut inner = self.inner.borrow_mut();
        if let Some(subs) = inner.subscribers.get_mut(topic) {
            subs.retain(|s| s.id != id);
            if subs.is_empty() {
                inner.subscribers.remove(topic);
            }
        }
    }

    /// Invoke every handler registered for `topic`, in registration order.
    pub fn publish(&self, topic: &str) {
        // Snapshot the handler list first so handlers can mutate the
        // registry (or publish again) without poisoning the borrow.
        let handlers: Vec<Handler> = match self.inner.borrow().subscribers.get(topic) {
            Some(subs) => subs.iter().map(|s| Rc::clone(&s.handler)).collect(),
            None => return,
        };

        log::debug!("publish `{}` to {} handler(s)", topic, handlers.len());
        for handler in handlers {
            (&mut *handler.borrow_mut())();
        }
    }

    /// Number of live subscriptions for a topic.
    pub fn subscriber_count(&self, topic: &str) -> usize {
        self.inner
            .borrow()
            .subscribers
            .get(topic)
            .map_or(0, |subs| subs.len())
    }
}
