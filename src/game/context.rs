//! Owning context
//!
//! Explicitly constructed services wired together at process start and
//! torn down on drop. No global lookup: every component receives its
//! collaborators as handles. Bus subscriptions are made here in a fixed
//! order: on the load path, snapshot application (store restore, boss
//! restore, session-death reset, spawn processing) runs before the
//! manager's own level-loaded spawn pass because the coordinator handler
//! is registered first and dispatch is registration-ordered.

use std::cell::RefCell;
use std::path::PathBuf;
use std::rc::Rc;

use glam::Vec3;
use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::checkpoint::CheckpointTrigger;
use crate::data::ArchetypeLibrary;
use crate::enemy::WorldProbe;
use crate::events::{topics, EventBus, HandlerId};
use crate::level::{LevelLoader, Restorable, SceneDirector};
use crate::lifecycle::{ConfigError, EnemyLifecycleManager, SpawnPoint};
use crate::player::{PlayerHealth, SkillLoadout};
use crate::save::{SaveCoordinator, SaveError};
use crate::store::PersistentStore;

pub struct GameContext {
    bus: Rc<EventBus>,
    store: Rc<RefCell<PersistentStore>>,
    manager: Rc<RefCell<EnemyLifecycleManager>>,
    loader: Rc<RefCell<LevelLoader>>,
    coordinator: Rc<RefCell<SaveCoordinator>>,
    player: Rc<RefCell<PlayerHealth>>,
    skills: Rc<RefCell<SkillLoadout>>,
    archetypes: ArchetypeLibrary,
    rng: StdRng,
    subscriptions: Vec<(String, HandlerId)>,
}

impl GameContext {
    /// Build the context with the default save path and built-in
    /// archetypes.
    pub fn new() -> Self {
        Self::with_save_path(crate::save::default_save_path())
    }

    /// Build the context with an explicit save file location.
    pub fn with_save_path(save_path: PathBuf) -> Self {
        let bus = Rc::new(EventBus::new());
        let mut context = Self {
            store: Rc::new(RefCell::new(PersistentStore::new(Rc::clone(&bus)))),
            manager: Rc::new(RefCell::new(EnemyLifecycleManager::new(Rc::clone(&bus)))),
            loader: Rc::new(RefCell::new(LevelLoader::new())),
            coordinator: Rc::new(RefCell::new(SaveCoordinator::with_path(
                save_path,
                Rc::clone(&bus),
            ))),
            player: Rc::new(RefCell::new(PlayerHealth::default())),
            skills: Rc::new(RefCell::new(SkillLoadout::new())),
            archetypes: ArchetypeLibrary::builtin(),
            rng: StdRng::from_entropy(),
            bus,
            subscriptions: Vec::new(),
        };
        context.wire();
        context
    }

    /// Wire the core's own bus consumption. Registration order matters:
    /// see the module docs.
    fn wire(&mut self) {
        // 1. Load path: apply the pending snapshot once the destination
        //    level is fully loaded. No-op on ordinary transitions.
        let id = {
            let coordinator = Rc::clone(&self.coordinator);
            let store = Rc::clone(&self.store);
            let manager = Rc::clone(&self.manager);
            let player = Rc::clone(&self.player);
            let skills = Rc::clone(&self.skills);
            let bus = Rc::clone(&self.bus);
            self.bus.subscribe(topics::LEVEL_LOADED, move || {
                let pending = coordinator.borrow_mut().take_pending_snapshot();
                if let Some(snapshot) = pending {
                    SaveCoordinator::apply(
                        &snapshot,
                        &mut store.borrow_mut(),
                        &mut manager.borrow_mut(),
                        &mut player.borrow_mut(),
                        &mut skills.borrow_mut(),
                        &bus,
                    );
                }
            })
        };
        self.subscriptions.push((topics::LEVEL_LOADED.to_string(), id));

        // 2. Every completed transition populates the new level's
        //    enemies. Idempotent, so running right after a snapshot apply
        //    spawns nothing twice.
        let id = {
            let manager = Rc::clone(&self.manager);
            let store = Rc::clone(&self.store);
            let loader = Rc::clone(&self.loader);
            self.bus.subscribe(topics::LEVEL_LOADED, move || {
                let scene = loader.borrow().current_scene().map(str::to_string);
                if let Some(scene) = scene {
                    manager.borrow_mut().process_spawns_for_level(&scene, &store.borrow());
                }
            })
        };
        self.subscriptions.push((topics::LEVEL_LOADED.to_string(), id));

        // 3. Checkpoint rest respawns the active scene's regulars.
        let id = {
            let manager = Rc::clone(&self.manager);
            let loader = Rc::clone(&self.loader);
            self.bus.subscribe(topics::CHECKPOINT_REST, move || {
                let scene = loader.borrow().current_scene().map(str::to_string);
                if let Some(scene) = scene {
                    manager.borrow_mut().on_checkpoint_rest(&scene);
                }
            })
        };
        self.subscriptions.push((topics::CHECKPOINT_REST.to_string(), id));
    }

    pub fn bus(&self) -> Rc<EventBus> {
        Rc::clone(&self.bus)
    }

    pub fn store(&self) -> Rc<RefCell<PersistentStore>> {
        Rc::clone(&self.store)
    }

    pub fn manager(&self) -> Rc<RefCell<EnemyLifecycleManager>> {
        Rc::clone(&self.manager)
    }

    pub fn loader(&self) -> Rc<RefCell<LevelLoader>> {
        Rc::clone(&self.loader)
    }

    pub fn coordinator(&self) -> Rc<RefCell<SaveCoordinator>> {
        Rc::clone(&self.coordinator)
    }

    pub fn player(&self) -> Rc<RefCell<PlayerHealth>> {
        Rc::clone(&self.player)
    }

    pub fn skills(&self) -> Rc<RefCell<SkillLoadout>> {
        Rc::clone(&self.skills)
    }

    pub fn archetypes(&self) -> &ArchetypeLibrary {
        &self.archetypes
    }

    pub fn archetypes_mut(&mut self) -> &mut ArchetypeLibrary {
        &mut self.archetypes
    }

    /// Register a spawn point for a scene, with the archetype looked up
    /// in the library. Configuration errors exclude the point and are
    /// returned to the caller; they never crash the process.
    pub fn register_spawn_point(
        &self,
        archetype_id: &str,
        unique_id: &str,
        scene_id: &str,
        position: Vec3,
    ) -> Result<(), ConfigError> {
        let point =
            SpawnPoint::from_library(&self.archetypes, archetype_id, unique_id, scene_id, position)?;
        self.manager.borrow_mut().register_spawn_point(point)
    }

    /// Unregister a scene's spawn points as it unloads.
    pub fn unregister_scene(&self, scene: &str) {
        self.manager.borrow_mut().unregister_scene(scene);
    }

    /// Register a restorable world-state object for a scene.
    pub fn register_restorable(&self, scene: &str, object: Box<dyn Restorable>) {
        self.loader.borrow_mut().register_restorable(scene, object);
    }

    /// Begin a level transition. Returns `false` if one is in flight.
    pub fn transition_to_level(
        &self,
        target: &str,
        spawn_position: Vec3,
        director: &mut dyn SceneDirector,
    ) -> bool {
        self.loader
            .borrow_mut()
            .transition_to_level(target, spawn_position, director)
    }

    /// Engine signal: previous scene unloaded.
    pub fn notify_unload_complete(&self, director: &mut dyn SceneDirector) {
        self.loader.borrow_mut().on_unload_complete(director);
    }

    /// Engine signal: target scene's assets loaded.
    pub fn notify_load_complete(&self) {
        self.loader.borrow_mut().on_load_complete();
    }

    /// Engine signal: target scene's objects finished startup. Completes
    /// the transition and publishes the level-loaded notification after
    /// the loader borrow ends.
    pub fn notify_scene_initialized(&self, director: &mut dyn SceneDirector) {
        let completed = self
            .loader
            .borrow_mut()
            .on_scene_initialized(&self.store.borrow(), director);
        if completed.is_some() {
            self.bus.publish(topics::LEVEL_LOADED);
        }
    }

    /// Per-frame update. Entity simulation is suspended while a level
    /// transition is in flight; nothing may touch a half-initialized
    /// scene.
    pub fn update(&mut self, dt: f32, probe: &dyn WorldProbe) {
        let scene = {
            let loader = self.loader.borrow();
            if loader.is_transitioning() {
                return;
            }
            match loader.current_scene() {
                Some(scene) => scene.to_string(),
                None => return,
            }
        };
        self.manager
            .borrow_mut()
            .update_entities(&scene, dt, probe, &mut self.rng);
    }

    /// Route damage to an enemy by id. On a kill, the defeat is recorded
    /// through the correct channel and `enemy_defeated` is published.
    pub fn apply_damage(&self, id: &str, amount: f32) -> bool {
        self.manager
            .borrow_mut()
            .apply_damage(id, amount, &mut self.store.borrow_mut())
    }

    /// Checkpoint rest: heal the player, write the save file, publish
    /// the rest topics. Atomic relative to per-frame logic.
    pub fn rest_at_checkpoint(&self, checkpoint: &CheckpointTrigger) -> Result<(), SaveError> {
        self.player.borrow_mut().restore_to_full(&self.bus);

        let snapshot = SaveCoordinator::build_snapshot(
            checkpoint.id(),
            checkpoint.scene_name(),
            checkpoint.spawn_position(),
            &self.player.borrow(),
            &self.skills.borrow(),
            &self.store.borrow(),
            &self.manager.borrow(),
        );
        self.coordinator.borrow_mut().save(snapshot)?;

        self.bus.publish(topics::CHECKPOINT_ACTIVATED);
        self.bus.publish(topics::CHECKPOINT_REST);
        Ok(())
    }

    /// Load the save file and begin the transition to its checkpoint
    /// scene. Returns `false`, with no state mutated, when there is no
    /// usable save data (fresh game) or a transition is already running.
    pub fn load_game(&self, director: &mut dyn SceneDirector) -> bool {
        let snapshot = match self.coordinator.borrow_mut().load() {
            Some(snapshot) => snapshot,
            None => {
                log::warn!("no save data available; starting fresh");
                return false;
            }
        };
        if snapshot.scene_name.is_empty() {
            log::warn!("save snapshot has no scene name; ignoring");
            return false;
        }

        let accepted = self.loader.borrow_mut().transition_to_level(
            &snapshot.scene_name,
            snapshot.spawn_position,
            director,
        );
        if accepted {
            // Applied by the level-loaded handler once the destination
            // scene is fully initialized.
            self.coordinator.borrow_mut().mark_pending_restore();
        }
        accepted
    }

    pub fn save_file_exists(&self) -> bool {
        self.coordinator.borrow().save_file_exists()
    }
}

impl Default for GameContext {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for GameContext {
    fn drop(&mut self) {
        // Teardown path: no dangling handler may outlive the context.
        for (topic, id) in self.subscriptions.drain(..) {
            self.bus.unsubscribe(&topic, id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;
    use std::fs;
    use std::path::PathBuf;

    const SCENE: &str = "ashen_courtyard";

    #[derive(Default)]
    struct InstantDirector;

    impl SceneDirector for InstantDirector {
        fn unload_scene(&mut self, _scene: &str) {}
        fn load_scene(&mut self, _scene: &str) {}
        fn place_player(&mut self, _position: Vec3) {}
    }

    struct StaticProbe;

    impl WorldProbe for StaticProbe {
        fn player_position(&self) -> Option<Vec3> {
            Some(Vec3::new(0.0, 0.0, 5.0))
        }
        fn line_of_sight(&self, _from: Vec3, _to: Vec3) -> bool {
            true
        }
        fn obstructed(&self, _origin: Vec3, _direction: Vec3, _distance: f32) -> bool {
            false
        }
    }

    fn temp_save_path(tag: &str) -> PathBuf {
        env::temp_dir().join(format!("veilgate_ctx_{tag}_{}.json", std::process::id()))
    }

    fn context(tag: &str) -> GameContext {
        let path = temp_save_path(tag);
        let _ = fs::remove_file(&path);
        GameContext::with_save_path(path)
    }

    /// Drive the loader through a full transition with injected signals.
    fn enter_scene(context: &GameContext, scene: &str) {
        let mut director = InstantDirector;
        assert!(context.transition_to_level(scene, Vec3::ZERO, &mut director));
        let phase = context.loader().borrow().phase();
        if phase == crate::level::TransitionPhase::Unloading {
            context.notify_unload_complete(&mut director);
        }
        context.notify_load_complete();
        context.notify_scene_initialized(&mut director);
    }

    fn populate(context: &GameContext) {
        context
            .register_spawn_point("ashen_husk", "goblin_1", SCENE, Vec3::ZERO)
            .expect("register goblin_1");
        context
            .register_spawn_point("gatekeeper", "boss_ogre", SCENE, Vec3::new(10.0, 0.0, 0.0))
            .expect("register boss_ogre");
    }

    #[test]
    fn level_loaded_populates_the_scene() {
        let context = context("populate");
        populate(&context);
        enter_scene(&context, SCENE);

        assert_eq!(context.manager().borrow().live_enemy_count(SCENE), 2);
    }

    #[test]
    fn rest_respawns_session_dead_regulars_only() {
        let context = context("rest");
        populate(&context);
        enter_scene(&context, SCENE);

        assert!(context.apply_damage("goblin_1", 1000.0));
        assert_eq!(context.manager().borrow().live_enemy_count(SCENE), 1);

        let checkpoint = CheckpointTrigger::new("cp_gate", SCENE, Vec3::ZERO);
        checkpoint.activate(&context).expect("rest");

        let manager = context.manager();
        let manager = manager.borrow();
        assert!(manager.session_dead().is_empty());
        assert_eq!(manager.live_enemy_count(SCENE), 2);
    }

    #[test]
    fn updates_are_suspended_mid_transition() {
        let mut ctx = context("suspend");
        populate(&ctx);
        enter_scene(&ctx, SCENE);

        let mut director = InstantDirector;
        assert!(ctx.transition_to_level("elsewhere", Vec3::ZERO, &mut director));
        // Mid-transition updates must not advance entities.
        ctx.update(1.0, &StaticProbe);
        let state = ctx
            .manager()
            .borrow()
            .spawn_point(SCENE, "goblin_1")
            .and_then(|p| p.entity().map(|e| e.state()))
            .expect("goblin alive");
        assert_eq!(state, crate::enemy::EnemyState::Idle);
    }

    // Boss permanence across a save/load cycle into a fresh process
    // (modelled as a second context sharing the save file).
    #[test]
    fn boss_defeat_survives_save_and_reload() {
        let path = temp_save_path("boss_cycle");
        let _ = fs::remove_file(&path);

        {
            let context = GameContext::with_save_path(path.clone());
            populate(&context);
            enter_scene(&context, SCENE);

            assert!(context.apply_damage("boss_ogre", 100_000.0));
            assert!(context.store().borrow().get_bool("BossDefeated_boss_ogre"));

            let checkpoint = CheckpointTrigger::new("cp_gate", SCENE, Vec3::ZERO);
            checkpoint.activate(&context).expect("save at rest");
        }

        let fresh = GameContext::with_save_path(path.clone());
        populate(&fresh);

        let mut director = InstantDirector;
        assert!(fresh.load_game(&mut director));
        fresh.notify_load_complete();
        fresh.notify_scene_initialized(&mut director);

        assert!(fresh.store().borrow().get_bool("BossDefeated_boss_ogre"));
        let manager = fresh.manager();
        let manager = manager.borrow();
        assert!(manager.session_dead().is_empty());
        // Only the regular respawned; the boss stays down.
        assert_eq!(manager.live_enemy_count(SCENE), 1);
        assert!(manager
            .spawn_point(SCENE, "goblin_1")
            .is_some_and(|p| p.has_live_entity()));

        let _ = fs::remove_file(&path);
    }

    #[test]
    fn load_with_no_save_is_fresh_game() {
        let context = context("fresh");
        let mut director = InstantDirector;

        assert!(!context.load_game(&mut director));
        // No transition started, no state mutated.
        assert!(!context.loader().borrow().is_transitioning());
        assert!(context.manager().borrow().session_dead().is_empty());
    }

    #[test]
    fn session_deaths_are_cleared_by_load_not_by_transition() {
        let path = temp_save_path("session_clear");
        let _ = fs::remove_file(&path);

        let context = GameContext::with_save_path(path.clone());
        populate(&context);
        enter_scene(&context, SCENE);

        let checkpoint = CheckpointTrigger::new("cp_gate", SCENE, Vec3::ZERO);
        checkpoint.activate(&context).expect("save");

        context.apply_damage("goblin_1", 1000.0);
        assert_eq!(context.manager().borrow().session_dead().len(), 1);

        // An ordinary transition back into the scene keeps the session
        // death; only a load-from-save clears it.
        enter_scene(&context, SCENE);
        assert_eq!(context.manager().borrow().session_dead().len(), 1);
        assert_eq!(context.manager().borrow().live_enemy_count(SCENE), 1);

        let mut director = InstantDirector;
        assert!(context.load_game(&mut director));
        let phase = context.loader().borrow().phase();
        if phase == crate::level::TransitionPhase::Unloading {
            context.notify_unload_complete(&mut director);
        }
        context.notify_load_complete();
        context.notify_scene_initialized(&mut director);

        assert!(context.manager().borrow().session_dead().is_empty());
        assert_eq!(context.manager().borrow().live_enemy_count(SCENE), 2);

        let _ = fs::remove_file(&path);
    }

    #[test]
    fn drop_unsubscribes_all_handlers() {
        let bus = {
            let context = context("teardown");
            context.bus()
        };
        assert_eq!(bus.subscriber_count(topics::LEVEL_LOADED), 0);
        assert_eq!(bus.subscriber_count(topics::CHECKPOINT_REST), 0);
    }
}
