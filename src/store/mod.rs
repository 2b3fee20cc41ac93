//! Persistent key/value store
//!
//! Typed world-state flags (doors opened, switches thrown, bosses downed)
//! shared across levels and written into the save file. Keys are opaque
//! strings chosen by callers. Every write publishes a
//! `state_changed.<key>` notification; handlers of that topic must treat
//! it as a signal to re-query later, not to mutate the store synchronously.

use std::collections::HashMap;
use std::rc::Rc;

use crate::events::{topics, EventBus};

/// Four independent typed namespaces, each keyed by caller-chosen strings.
pub struct PersistentStore {
    bools: HashMap<String, bool>,
    ints: HashMap<String, i32>,
    floats: HashMap<String, f32>,
    strings: HashMap<String, String>,
    bus: Rc<EventBus>,
}

impl PersistentStore {
    pub fn new(bus: Rc<EventBus>) -> Self {
        Self {
            bools: HashMap::new(),
            ints: HashMap::new(),
            floats: HashMap::new(),
            strings: HashMap::new(),
            bus,
        }
    }

    /// Set a boolean flag (e.g. a door opened, a boss defeated).
    pub fn set_bool(&mut self, key: &str, value: bool) {
        self.bools.insert(key.to_string(), value);
        log::debug!("state `{key}` set to {value}");
        self.bus.publish(&topics::state_changed(key));
    }

    /// Missing keys read as `false`.
    pub fn get_bool(&self, key: &str) -> bool {
        self.bools.get(key).copied().unwrap_or(false)
    }

    pub fn set_int(&mut self, key: &str, value: i32) {
        self.ints.insert(key.to_string(), value);
        self.bus.publish(&topics::state_changed(key));
    }

    /// Missing keys read as `0`.
    pub fn get_int(&self, key: &str) -> i32 {
        self.ints.get(key).copied().unwrap_or(0)
    }

    /// Add `delta` to an integer state, creating it at zero first.
    pub fn increment_int(&mut self, key: &str, delta: i32) {
        let value = self.get_int(key) + delta;
        self.set_int(key, value);
    }

    pub fn set_float(&mut self, key: &str, value: f32) {
        self.floats.insert(key.to_string(), value);
        self.bus.publish(&topics::state_changed(key));
    }

    /// Missing keys read as `0.0`.
    pub fn get_float(&self, key: &str) -> f32 {
        self.floats.get(key).copied().unwrap_or(0.0)
    }

    pub fn set_string(&mut self, key: &str, value: impl Into<String>) {
        self.strings.insert(key.to_string(), value.into());
        self.bus.publish(&topics::state_changed(key));
    }

    /// Missing keys read as the empty string.
    pub fn get_string(&self, key: &str) -> String {
        self.strings.get(key).cloned().unwrap_or_default()
    }

    /// Whether any namespace holds the key.
    pub fn has_state(&self, key: &str) -> bool {
        self.bools.contains_key(key)
            || self.ints.contains_key(key)
            || self.floats.contains_key(key)
            || self.strings.contains_key(key)
    }

    /// Drop every state in every namespace.
    pub fn clear_all(&mut self) {
        self.bools.clear();
        self.ints.clear();
        self.floats.clear();
        self.strings.clear();
        log::info!("all persistent states cleared");
    }

    // Full-namespace accessors used by the save coordinator.

    pub fn bool_states(&self) -> &HashMap<String, bool> {
        &self.bools
    }

    pub fn int_states(&self) -> &HashMap<String, i32> {
        &self.ints
    }

    pub fn float_states(&self) -> &HashMap<String, f32> {
        &self.floats
    }

    pub fn string_states(&self) -> &HashMap<String, String> {
        &self.strings
    }

    /// Replace all four namespaces wholesale from a loaded snapshot.
    ///
    /// Intentionally silent: restoration is not a gameplay change, and
    /// Restorable objects re-read their keys right after the load path
    /// runs.
    pub fn load_states(
        &mut self,
        bools: HashMap<String, bool>,
        ints: HashMap<String, i32>,
        floats: HashMap<String, f32>,
        strings: HashMap<String, String>,
    ) {
        self.bools = bools;
        self.ints = ints;
        self.floats = floats;
        self.strings = strings;
        log::info!("persistent states restored from snapshot");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::collections::HashMap;

    fn store() -> PersistentStore {
        PersistentStore::new(Rc::new(EventBus::new()))
    }

    #[test]
    fn missing_keys_read_as_defaults() {
        let s = store();
        assert!(!s.get_bool("door_a"));
        assert_eq!(s.get_int("kills"), 0);
        assert_eq!(s.get_float("timer"), 0.0);
        assert_eq!(s.get_string("last_words"), "");
        assert!(!s.has_state("door_a"));
    }

    #[test]
    fn namespaces_are_independent() {
        let mut s = store();
        s.set_bool("key", true);
        s.set_int("key", 7);
        assert!(s.get_bool("key"));
        assert_eq!(s.get_int("key"), 7);
        assert_eq!(s.get_float("key"), 0.0);
    }

    #[test]
    fn writes_publish_change_notifications() {
        let bus = Rc::new(EventBus::new());
        let hits = Rc::new(RefCell::new(0));
        {
            let hits = Rc::clone(&hits);
            bus.subscribe(topics::state_changed("gate_open"), move || {
                *hits.borrow_mut() += 1
            });
        }

        let mut s = PersistentStore::new(Rc::clone(&bus));
        s.set_bool("gate_open", true);
        s.set_bool("gate_open", true);
        s.set_bool("unrelated", true);

        assert_eq!(*hits.borrow(), 2);
    }

    #[test]
    fn increment_creates_then_adds() {
        let mut s = store();
        s.increment_int("kills", 1);
        s.increment_int("kills", 2);
        assert_eq!(s.get_int("kills"), 3);
    }

    #[test]
    fn load_states_replaces_wholesale_without_notifications() {
        let bus = Rc::new(EventBus::new());
        let hits = Rc::new(RefCell::new(0));
        {
            let hits = Rc::clone(&hits);
            bus.subscribe(topics::state_changed("door_a"), move || {
                *hits.borrow_mut() += 1
            });
        }

        let mut s = PersistentStore::new(Rc::clone(&bus));
        s.set_bool("stale", true);

        let mut bools = HashMap::new();
        bools.insert("door_a".to_string(), true);
        s.load_states(bools, HashMap::new(), HashMap::new(), HashMap::new());

        assert!(s.get_bool("door_a"));
        assert!(!s.get_bool("stale"));
        assert_eq!(*hits.borrow(), 0);
    }
}
