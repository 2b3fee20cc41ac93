//! Level transitions
//!
//! An explicit state machine with injectable completion signals in place
//! of implicit coroutine suspension. The engine drives the signals
//! (unload finished, load finished, scene initialized); the loader
//! enforces ordering: world-state restoration and spawn processing never
//! run against a half-initialized scene.

use std::collections::HashMap;

use glam::Vec3;

use crate::store::PersistentStore;

/// World-state objects restored after a scene finishes loading. Reads its
/// own persisted key from the store; must be safe to call redundantly.
pub trait Restorable {
    fn restore_state(&mut self, store: &PersistentStore);
}

/// Engine-side collaborator executing the loader's effects.
pub trait SceneDirector {
    /// Optional visual transition effect. Fire-and-forget.
    fn begin_transition_effect(&mut self) {}
    fn unload_scene(&mut self, scene: &str);
    fn load_scene(&mut self, scene: &str);
    fn place_player(&mut self, position: Vec3);
}

/// Phases of a level transition. A new request is rejected unless the
/// loader is `Idle`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionPhase {
    Idle,
    Unloading,
    Loading,
    Ready,
}

struct PendingTransition {
    target: String,
    spawn_position: Vec3,
}

pub struct LevelLoader {
    phase: TransitionPhase,
    current_scene: Option<String>,
    pending: Option<PendingTransition>,
    /// The load signal arrived; still waiting on scene initialization.
    load_complete: bool,
    /// Bootstrap scenes that are never unloaded.
    persistent_scenes: Vec<String>,
    /// Restorable world-state objects per scene. Dropped when their scene
    /// unloads; the engine re-registers them during scene startup.
    restorables: HashMap<String, Vec<Box<dyn Restorable>>>,
    player_spawn_position: Vec3,
}

impl LevelLoader {
    pub fn new() -> Self {
        Self {
            phase: TransitionPhase::Idle,
            current_scene: None,
            pending: None,
            load_complete: false,
            persistent_scenes: vec!["bootstrap".to_string(), "persistent".to_string()],
            restorables: HashMap::new(),
            player_spawn_position: Vec3::ZERO,
        }
    }

    pub fn with_persistent_scenes(scenes: Vec<String>) -> Self {
        Self {
            persistent_scenes: scenes,
            ..Self::new()
        }
    }

    pub fn phase(&self) -> TransitionPhase {
        self.phase
    }

    pub fn is_transitioning(&self) -> bool {
        self.phase != TransitionPhase::Idle
    }

    pub fn current_scene(&self) -> Option<&str> {
        self.current_scene.as_deref()
    }

    pub fn player_spawn_position(&self) -> Vec3 {
        self.player_spawn_position
    }

    /// Register a restorable world-state object under its scene.
    pub fn register_restorable(&mut self, scene: &str, object: Box<dyn Restorable>) {
        self.restorables.entry(scene.to_string()).or_default().push(object);
    }

    pub fn restorable_count(&self, scene: &str) -> usize {
        self.restorables.get(scene).map_or(0, Vec::len)
    }

    /// Begin a transition. Returns `false` (logged, no state touched) if
    /// one is already in flight; a second request is rejected, not
    /// queued.
    pub fn transition_to_level(
        &mut self,
        target: &str,
        spawn_position: Vec3,
        director: &mut dyn SceneDirector,
    ) -> bool {
        if self.phase != TransitionPhase::Idle {
            log::warn!(
                "transition to `{target}` rejected: already {:?}",
                self.phase
            );
            return false;
        }

        director.begin_transition_effect();
        self.pending = Some(PendingTransition {
            target: target.to_string(),
            spawn_position,
        });
        self.load_complete = false;

        match &self.current_scene {
            Some(current) if !self.is_persistent(current) => {
                log::info!("unloading `{current}`");
                self.phase = TransitionPhase::Unloading;
                let current = current.clone();
                director.unload_scene(&current);
            }
            _ => {
                log::info!("loading `{target}`");
                self.phase = TransitionPhase::Loading;
                director.load_scene(target);
            }
        }
        true
    }

    /// Signal: the previous scene finished unloading.
    pub fn on_unload_complete(&mut self, director: &mut dyn SceneDirector) {
        if self.phase != TransitionPhase::Unloading {
            log::warn!("unload-complete signal while {:?}; ignoring", self.phase);
            return;
        }
        if let Some(unloaded) = self.current_scene.take() {
            self.restorables.remove(&unloaded);
        }

        // `pending` is always set while a transition is in flight.
        if let Some(pending) = &self.pending {
            log::info!("loading `{}`", pending.target);
            self.phase = TransitionPhase::Loading;
            let target = pending.target.clone();
            director.load_scene(&target);
        }
    }

    /// Signal: the target scene's assets are loaded. Initialization of
    /// its objects has not necessarily run yet.
    pub fn on_load_complete(&mut self) {
        if self.phase != TransitionPhase::Loading || self.load_complete {
            log::warn!("load-complete signal while {:?}; ignoring", self.phase);
            return;
        }
        self.load_complete = true;
    }

    /// Signal: the target scene's objects finished their own startup.
    /// Restores world state, places the player, and completes the
    /// transition. Returns the loaded scene name so the owning context
    /// can publish the level-loaded notification once this borrow ends.
    pub fn on_scene_initialized(
        &mut self,
        store: &PersistentStore,
        director: &mut dyn SceneDirector,
    ) -> Option<String> {
        if self.phase != TransitionPhase::Loading || !self.load_complete {
            log::warn!(
                "scene-initialized signal while {:?} (load_complete={}); ignoring",
                self.phase,
                self.load_complete
            );
            return None;
        }

        let pending = self.pending.take()?;
        self.phase = TransitionPhase::Ready;
        self.current_scene = Some(pending.target.clone());

        if let Some(objects) = self.restorables.get_mut(&pending.target) {
            for object in objects.iter_mut() {
                object.restore_state(store);
            }
            log::info!(
                "restored {} world-state object(s) in `{}`",
                objects.len(),
                pending.target
            );
        }

        director.place_player(pending.spawn_position);
        self.player_spawn_position = pending.spawn_position;

        self.phase = TransitionPhase::Idle;
        self.load_complete = false;
        log::info!("transition to `{}` complete", pending.target);
        Some(pending.target)
    }

    fn is_persistent(&self, scene: &str) -> bool {
        self.persistent_scenes.iter().any(|s| s == scene)
    }
}

impl Default for LevelLoader {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::EventBus;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[derive(Default)]
    struct RecordingDirector {
        log: Vec<String>,
    }

    impl SceneDirector for RecordingDirector {
        fn begin_transition_effect(&mut self) {
            self.log.push("effect".to_string());
        }
        fn unload_scene(&mut self, scene: &str) {
            self.log.push(format!("unload:{scene}"));
        }
        fn load_scene(&mut self, scene: &str) {
            self.log.push(format!("load:{scene}"));
        }
        fn place_player(&mut self, position: Vec3) {
            self.log.push(format!("place:{}", position.z));
        }
    }

    struct DoorState {
        key: String,
        open: bool,
    }

    impl Restorable for DoorState {
        fn restore_state(&mut self, store: &PersistentStore) {
            self.open = store.get_bool(&self.key);
        }
    }

    fn store() -> PersistentStore {
        PersistentStore::new(Rc::new(EventBus::new()))
    }

    #[test]
    fn first_transition_skips_unload() {
        let mut loader = LevelLoader::new();
        let mut director = RecordingDirector::default();

        assert!(loader.transition_to_level("crypt", Vec3::ZERO, &mut director));
        assert_eq!(loader.phase(), TransitionPhase::Loading);
        assert_eq!(director.log, vec!["effect", "load:crypt"]);
    }

    #[test]
    fn full_transition_runs_steps_in_order() {
        let mut loader = LevelLoader::new();
        let mut director = RecordingDirector::default();
        let store = store();

        loader.transition_to_level("crypt", Vec3::ZERO, &mut director);
        loader.on_load_complete();
        assert_eq!(
            loader.on_scene_initialized(&store, &mut director),
            Some("crypt".to_string())
        );
        assert_eq!(loader.current_scene(), Some("crypt"));
        assert!(!loader.is_transitioning());

        // Second transition unloads the first scene.
        loader.transition_to_level("cathedral", Vec3::new(0.0, 0.0, 4.0), &mut director);
        assert_eq!(loader.phase(), TransitionPhase::Unloading);
        loader.on_unload_complete(&mut director);
        loader.on_load_complete();
        loader.on_scene_initialized(&store, &mut director);

        assert_eq!(
            director.log,
            vec![
                "effect",
                "load:crypt",
                "place:0",
                "effect",
                "unload:crypt",
                "load:cathedral",
                "place:4",
            ]
        );
    }

    #[test]
    fn concurrent_request_is_rejected_not_queued() {
        let mut loader = LevelLoader::new();
        let mut director = RecordingDirector::default();
        let store = store();

        assert!(loader.transition_to_level("crypt", Vec3::ZERO, &mut director));
        assert!(!loader.transition_to_level("cathedral", Vec3::ZERO, &mut director));

        loader.on_load_complete();
        let done = loader.on_scene_initialized(&store, &mut director);
        // The in-flight transition was not corrupted by the second call.
        assert_eq!(done, Some("crypt".to_string()));
    }

    #[test]
    fn out_of_order_signals_are_noops() {
        let mut loader = LevelLoader::new();
        let mut director = RecordingDirector::default();
        let store = store();

        // Nothing in flight: every signal is ignored.
        loader.on_unload_complete(&mut director);
        loader.on_load_complete();
        assert_eq!(loader.on_scene_initialized(&store, &mut director), None);

        // Scene-initialized before load-complete is ignored too.
        loader.transition_to_level("crypt", Vec3::ZERO, &mut director);
        assert_eq!(loader.on_scene_initialized(&store, &mut director), None);
        assert_eq!(loader.phase(), TransitionPhase::Loading);
    }

    #[test]
    fn persistent_scenes_are_never_unloaded() {
        let mut loader = LevelLoader::with_persistent_scenes(vec!["hub".to_string()]);
        let mut director = RecordingDirector::default();
        let store = store();

        loader.transition_to_level("hub", Vec3::ZERO, &mut director);
        loader.on_load_complete();
        loader.on_scene_initialized(&store, &mut director);

        loader.transition_to_level("crypt", Vec3::ZERO, &mut director);
        // Straight to loading: `hub` is persistent.
        assert_eq!(loader.phase(), TransitionPhase::Loading);
        assert!(!director.log.iter().any(|e| e.starts_with("unload:")));
    }

    #[test]
    fn restorables_run_on_scene_initialized() {
        let mut loader = LevelLoader::new();
        let mut director = RecordingDirector::default();

        let bus = Rc::new(EventBus::new());
        let mut store = PersistentStore::new(bus);
        store.set_bool("crypt_gate_open", true);

        // Shared handle so the test can observe the restored state.
        let door = Rc::new(RefCell::new(DoorState {
            key: "crypt_gate_open".to_string(),
            open: false,
        }));

        struct SharedDoor(Rc<RefCell<DoorState>>);
        impl Restorable for SharedDoor {
            fn restore_state(&mut self, store: &PersistentStore) {
                self.0.borrow_mut().restore_state(store);
            }
        }

        loader.register_restorable("crypt", Box::new(SharedDoor(Rc::clone(&door))));
        assert_eq!(loader.restorable_count("crypt"), 1);
        loader.transition_to_level("crypt", Vec3::ZERO, &mut director);
        loader.on_load_complete();
        loader.on_scene_initialized(&store, &mut director);

        assert!(door.borrow().open);
    }
}
