//! Enemy lifecycle manager
//!
//! Registry of spawn points per scene, the session-scoped death set for
//! regular enemies, the permanent defeated-boss list, and the decision
//! procedure for whether a spawn point should produce an entity right
//! now.
//!
//! The two death channels are disjoint by construction: regular enemies
//! are read exclusively from the session set, bosses exclusively from
//! the `BossDefeated_<id>` store key. [`EnemyLifecycleManager::apply_damage`]
//! is the single entry point that records a defeat, so list and store can
//! never diverge.

use std::collections::{HashMap, HashSet};
use std::rc::Rc;

use rand::Rng;

use super::spawn_point::SpawnPoint;
use super::ConfigError;
use crate::enemy::WorldProbe;
use crate::events::{topics, EventBus};
use crate::store::PersistentStore;

/// Store-key prefix for the permanent boss channel.
pub const BOSS_DEFEATED_PREFIX: &str = "BossDefeated_";

/// The persistent store key recording a boss's permanent defeat.
pub fn boss_defeated_key(id: &str) -> String {
    format!("{BOSS_DEFEATED_PREFIX}{id}")
}

pub struct EnemyLifecycleManager {
    /// Spawn points per scene, in registration order.
    spawn_points: HashMap<String, Vec<SpawnPoint>>,
    /// Every registered id, for global uniqueness checks.
    registered_ids: HashSet<String>,
    /// Regular enemies defeated this session. Cleared on load-from-save,
    /// drained per scene on checkpoint rest.
    session_dead: HashSet<String>,
    /// Defeated bosses in insertion order. Serialization only; the source
    /// of truth is the store's `BossDefeated_<id>` key.
    defeated_bosses: Vec<String>,
    bus: Rc<EventBus>,
}

impl EnemyLifecycleManager {
    pub fn new(bus: Rc<EventBus>) -> Self {
        Self {
            spawn_points: HashMap::new(),
            registered_ids: HashSet::new(),
            session_dead: HashSet::new(),
            defeated_bosses: Vec::new(),
            bus,
        }
    }

    /// Register a spawn point under its scene. An empty or duplicate id
    /// rejects the point without touching the registry.
    pub fn register_spawn_point(&mut self, point: SpawnPoint) -> Result<(), ConfigError> {
        if point.unique_id().is_empty() {
            log::warn!("rejecting spawn point with empty id in `{}`", point.scene_id());
            return Err(ConfigError::MissingId {
                scene: point.scene_id().to_string(),
            });
        }
        if !self.registered_ids.insert(point.unique_id().to_string()) {
            log::warn!("rejecting duplicate spawn point id `{}`", point.unique_id());
            return Err(ConfigError::DuplicateId {
                id: point.unique_id().to_string(),
            });
        }

        self.spawn_points
            .entry(point.scene_id().to_string())
            .or_default()
            .push(point);
        Ok(())
    }

    /// Remove one spawn point. Called as its owning scene unloads.
    pub fn unregister_spawn_point(&mut self, scene: &str, id: &str) {
        let mut removed = false;
        if let Some(points) = self.spawn_points.get_mut(scene) {
            let before = points.len();
            points.retain(|p| p.unique_id() != id);
            removed = points.len() != before;
            if points.is_empty() {
                self.spawn_points.remove(scene);
            }
        }
        if removed {
            self.registered_ids.remove(id);
        }
    }

    /// Remove every spawn point registered under a scene.
    pub fn unregister_scene(&mut self, scene: &str) {
        if let Some(points) = self.spawn_points.remove(scene) {
            for point in &points {
                self.registered_ids.remove(point.unique_id());
            }
            log::debug!("unregistered {} spawn point(s) for `{scene}`", points.len());
        }
    }

    /// The single authoritative entry point for populating a level.
    /// Idempotent: spawn points reset live instances in place, so a
    /// second pass produces no duplicates.
    pub fn process_spawns_for_level(&mut self, scene: &str, store: &PersistentStore) {
        let Some(points) = self.spawn_points.get_mut(scene) else {
            log::warn!("spawn processing requested for unregistered scene `{scene}`; ignoring");
            return;
        };

        let mut spawned = 0;
        for point in points.iter_mut() {
            let blocked = if point.respawns() {
                self.session_dead.contains(point.unique_id())
            } else {
                store.get_bool(&boss_defeated_key(point.unique_id()))
            };
            if !blocked {
                point.spawn();
                spawned += 1;
            }
        }
        log::info!(
            "processed spawns for `{scene}`: {spawned} of {} point(s) populated",
            points.len()
        );
    }

    /// Checkpoint rest: respawn the scene's session-dead regulars and
    /// drop their ids from the set. Boss points are never touched.
    pub fn on_checkpoint_rest(&mut self, scene: &str) {
        let Some(points) = self.spawn_points.get_mut(scene) else {
            log::warn!("checkpoint rest in unregistered scene `{scene}`; ignoring");
            return;
        };

        let mut respawned = 0;
        for point in points.iter_mut() {
            if point.respawns() && self.session_dead.remove(point.unique_id()) {
                point.spawn();
                respawned += 1;
            }
        }
        log::info!("checkpoint rest: respawned {respawned} regular enemies in `{scene}`");
    }

    /// Apply damage to the entity with the given id, wherever it lives.
    /// On a kill, records the defeat through exactly one of the two
    /// channels and publishes the defeat topic. Returns `true` when this
    /// call killed the entity.
    pub fn apply_damage(&mut self, id: &str, amount: f32, store: &mut PersistentStore) -> bool {
        let mut hit = None;
        for points in self.spawn_points.values_mut() {
            if let Some(point) = points.iter_mut().find(|p| p.unique_id() == id) {
                if let Some(entity) = point.entity_mut() {
                    let died = entity.take_damage(amount);
                    hit = Some((died, entity.respawns()));
                }
                break;
            }
        }

        let Some((died, respawns)) = hit else {
            log::warn!("damage applied to unknown or despawned enemy `{id}`");
            return false;
        };

        if died {
            if respawns {
                self.record_regular_death(id);
            } else {
                self.record_boss_defeat(id, store);
            }
            self.bus.publish(topics::ENEMY_DEFEATED);
        }
        died
    }

    /// Record a regular enemy's session death. Idempotent.
    pub fn record_regular_death(&mut self, id: &str) {
        self.session_dead.insert(id.to_string());
        log::debug!("session death recorded for `{id}`");
    }

    /// Record a boss defeat: list entry and store flag written together,
    /// so the two never diverge.
    pub fn record_boss_defeat(&mut self, id: &str, store: &mut PersistentStore) {
        if !self.defeated_bosses.iter().any(|b| b == id) {
            self.defeated_bosses.push(id.to_string());
        }
        store.set_bool(&boss_defeated_key(id), true);
        log::info!("boss `{id}` permanently defeated");
    }

    /// Empty the session death set. Called exactly once per
    /// load-from-save, before spawn processing for the destination level.
    pub fn clear_session_deaths(&mut self) {
        self.session_dead.clear();
        log::debug!("session death records cleared");
    }

    /// Restore the boss channel to match a loaded snapshot: replace the
    /// list, rewrite every store flag, and deactivate any live instance
    /// of a listed boss.
    pub fn restore_boss_list(&mut self, ids: &[String], store: &mut PersistentStore) {
        self.defeated_bosses = ids.to_vec();
        for id in ids {
            store.set_bool(&boss_defeated_key(id), true);
            for points in self.spawn_points.values_mut() {
                if let Some(point) = points.iter_mut().find(|p| p.unique_id() == id.as_str()) {
                    if let Some(entity) = point.entity_mut() {
                        entity.deactivate();
                    }
                }
            }
        }
        log::info!("restored {} defeated boss(es) from snapshot", ids.len());
    }

    /// Per-frame update for every live entity in a scene.
    pub fn update_entities(
        &mut self,
        scene: &str,
        dt: f32,
        probe: &dyn WorldProbe,
        rng: &mut impl Rng,
    ) {
        if let Some(points) = self.spawn_points.get_mut(scene) {
            for point in points.iter_mut() {
                if let Some(entity) = point.entity_mut() {
                    entity.update(dt, probe, rng);
                }
            }
        }
    }

    /// Drop every live regular-enemy instance in a scene. Bosses are
    /// left alone.
    pub fn despawn_scene_regulars(&mut self, scene: &str) {
        if let Some(points) = self.spawn_points.get_mut(scene) {
            for point in points.iter_mut() {
                if point.respawns() {
                    point.despawn();
                }
            }
        }
    }

    /// Number of live (spawned, undefeated) entities in a scene.
    pub fn live_enemy_count(&self, scene: &str) -> usize {
        self.spawn_points
            .get(scene)
            .map_or(0, |points| points.iter().filter(|p| p.has_live_entity()).count())
    }

    pub fn spawn_point(&self, scene: &str, id: &str) -> Option<&SpawnPoint> {
        self.spawn_points
            .get(scene)
            .and_then(|points| points.iter().find(|p| p.unique_id() == id))
    }

    pub fn session_dead(&self) -> &HashSet<String> {
        &self.session_dead
    }

    pub fn defeated_bosses(&self) -> &[String] {
        &self.defeated_bosses
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::ArchetypeLibrary;
    use glam::Vec3;
    use std::cell::RefCell;

    const SCENE: &str = "ashen_courtyard";

    fn fixture() -> (EnemyLifecycleManager, PersistentStore) {
        let bus = Rc::new(EventBus::new());
        (
            EnemyLifecycleManager::new(Rc::clone(&bus)),
            PersistentStore::new(bus),
        )
    }

    fn add_point(manager: &mut EnemyLifecycleManager, archetype: &str, id: &str) {
        let library = ArchetypeLibrary::builtin();
        let point = SpawnPoint::from_library(&library, archetype, id, SCENE, Vec3::ZERO)
            .expect("builtin archetype");
        manager.register_spawn_point(point).expect("register");
    }

    #[test]
    fn empty_and_duplicate_ids_are_rejected() {
        let (mut manager, _store) = fixture();
        let library = ArchetypeLibrary::builtin();

        let nameless = SpawnPoint::from_library(&library, "ashen_husk", "", SCENE, Vec3::ZERO)
            .expect("builtin archetype");
        assert!(matches!(
            manager.register_spawn_point(nameless),
            Err(ConfigError::MissingId { .. })
        ));

        add_point(&mut manager, "ashen_husk", "husk_1");
        let duplicate = SpawnPoint::from_library(&library, "ashen_husk", "husk_1", SCENE, Vec3::ZERO)
            .expect("builtin archetype");
        assert!(matches!(
            manager.register_spawn_point(duplicate),
            Err(ConfigError::DuplicateId { .. })
        ));

        // The rejected duplicate must not shadow the original.
        let (_, store) = fixture();
        manager.process_spawns_for_level(SCENE, &store);
        assert_eq!(manager.live_enemy_count(SCENE), 1);
    }

    #[test]
    fn processing_twice_spawns_no_duplicates() {
        let (mut manager, store) = fixture();
        add_point(&mut manager, "ashen_husk", "husk_1");
        add_point(&mut manager, "gatekeeper", "boss_gate");

        manager.process_spawns_for_level(SCENE, &store);
        manager.process_spawns_for_level(SCENE, &store);
        assert_eq!(manager.live_enemy_count(SCENE), 2);
    }

    #[test]
    fn unregistered_scene_is_a_defensive_noop() {
        let (mut manager, store) = fixture();
        manager.process_spawns_for_level("nowhere", &store);
        manager.on_checkpoint_rest("nowhere");
    }

    // Scenario: a regular enemy dies, stays dead through spawn
    // processing, and returns on checkpoint rest.
    #[test]
    fn regular_death_until_rest() {
        let (mut manager, mut store) = fixture();
        add_point(&mut manager, "ashen_husk", "goblin_1");
        manager.process_spawns_for_level(SCENE, &store);

        assert!(manager.apply_damage("goblin_1", 1000.0, &mut store));
        assert!(manager.session_dead().contains("goblin_1"));
        assert_eq!(manager.live_enemy_count(SCENE), 0);

        manager.process_spawns_for_level(SCENE, &store);
        assert_eq!(manager.live_enemy_count(SCENE), 0);

        manager.on_checkpoint_rest(SCENE);
        assert!(manager.session_dead().is_empty());
        assert_eq!(manager.live_enemy_count(SCENE), 1);
    }

    // Scenario: a boss defeat lands in the store and survives rest.
    #[test]
    fn boss_defeat_is_permanent_across_rest() {
        let (mut manager, mut store) = fixture();
        add_point(&mut manager, "gatekeeper", "boss_ogre");
        manager.process_spawns_for_level(SCENE, &store);

        assert!(manager.apply_damage("boss_ogre", 10_000.0, &mut store));
        assert!(store.get_bool("BossDefeated_boss_ogre"));
        assert_eq!(manager.defeated_bosses(), ["boss_ogre".to_string()]);

        manager.on_checkpoint_rest(SCENE);
        manager.process_spawns_for_level(SCENE, &store);
        assert_eq!(manager.live_enemy_count(SCENE), 0);
    }

    #[test]
    fn boss_defeat_never_touches_the_session_set() {
        let (mut manager, mut store) = fixture();
        add_point(&mut manager, "gatekeeper", "boss_gate");
        manager.process_spawns_for_level(SCENE, &store);

        manager.apply_damage("boss_gate", 10_000.0, &mut store);
        assert!(manager.session_dead().is_empty());
    }

    #[test]
    fn regular_death_never_touches_the_store() {
        let (mut manager, mut store) = fixture();
        add_point(&mut manager, "ashen_husk", "husk_1");
        manager.process_spawns_for_level(SCENE, &store);

        manager.apply_damage("husk_1", 1000.0, &mut store);
        assert!(!store.has_state("BossDefeated_husk_1"));
        assert!(!store.has_state("EnemyDead_husk_1"));
    }

    #[test]
    fn lethal_damage_twice_records_once() {
        let bus = Rc::new(EventBus::new());
        let defeats = Rc::new(RefCell::new(0));
        {
            let defeats = Rc::clone(&defeats);
            bus.subscribe(topics::ENEMY_DEFEATED, move || *defeats.borrow_mut() += 1);
        }

        let mut manager = EnemyLifecycleManager::new(Rc::clone(&bus));
        let mut store = PersistentStore::new(Rc::clone(&bus));
        add_point(&mut manager, "ashen_husk", "husk_1");
        manager.process_spawns_for_level(SCENE, &store);

        assert!(manager.apply_damage("husk_1", 1000.0, &mut store));
        assert!(!manager.apply_damage("husk_1", 1000.0, &mut store));
        assert_eq!(*defeats.borrow(), 1);
    }

    #[test]
    fn restore_boss_list_rewrites_store_and_deactivates() {
        let (mut manager, mut store) = fixture();
        add_point(&mut manager, "gatekeeper", "boss_gate");
        manager.process_spawns_for_level(SCENE, &store);
        assert_eq!(manager.live_enemy_count(SCENE), 1);

        let ids = vec!["boss_gate".to_string(), "boss_elsewhere".to_string()];
        manager.restore_boss_list(&ids, &mut store);

        assert!(store.get_bool("BossDefeated_boss_gate"));
        assert!(store.get_bool("BossDefeated_boss_elsewhere"));
        assert_eq!(manager.defeated_bosses(), ids.as_slice());
        assert_eq!(manager.live_enemy_count(SCENE), 0);

        manager.process_spawns_for_level(SCENE, &store);
        assert_eq!(manager.live_enemy_count(SCENE), 0);
    }

    #[test]
    fn unregistering_frees_the_id_for_reuse() {
        let (mut manager, store) = fixture();
        add_point(&mut manager, "ashen_husk", "husk_1");

        manager.unregister_spawn_point(SCENE, "husk_1");
        manager.process_spawns_for_level(SCENE, &store);

        // The id can be registered again once its point is gone.
        add_point(&mut manager, "ashen_husk", "husk_1");
        manager.process_spawns_for_level(SCENE, &store);
        assert_eq!(manager.live_enemy_count(SCENE), 1);
    }

    #[test]
    fn unregister_scene_drops_every_point() {
        let (mut manager, store) = fixture();
        add_point(&mut manager, "ashen_husk", "husk_1");
        add_point(&mut manager, "gatekeeper", "boss_gate");

        manager.unregister_scene(SCENE);
        manager.process_spawns_for_level(SCENE, &store);
        assert_eq!(manager.live_enemy_count(SCENE), 0);

        // Both ids are free again.
        add_point(&mut manager, "ashen_husk", "husk_1");
        add_point(&mut manager, "gatekeeper", "boss_gate");
    }

    #[test]
    fn despawn_scene_regulars_leaves_bosses() {
        let (mut manager, store) = fixture();
        add_point(&mut manager, "ashen_husk", "husk_1");
        add_point(&mut manager, "gatekeeper", "boss_gate");
        manager.process_spawns_for_level(SCENE, &store);

        manager.despawn_scene_regulars(SCENE);
        assert_eq!(manager.live_enemy_count(SCENE), 1);
        assert!(manager
            .spawn_point(SCENE, "boss_gate")
            .is_some_and(|p| p.has_live_entity()));
    }

    #[test]
    fn rest_leaves_living_regulars_alone() {
        let (mut manager, mut store) = fixture();
        add_point(&mut manager, "ashen_husk", "husk_1");
        add_point(&mut manager, "ashen_husk", "husk_2");
        manager.process_spawns_for_level(SCENE, &store);

        // Wound one, kill the other.
        manager.apply_damage("husk_1", 10.0, &mut store);
        manager.apply_damage("husk_2", 1000.0, &mut store);
        manager.on_checkpoint_rest(SCENE);

        let wounded = manager
            .spawn_point(SCENE, "husk_1")
            .and_then(|p| p.entity())
            .expect("husk_1 alive");
        // Rest respawns the dead; it does not heal the living in place.
        assert_eq!(wounded.current_health(), wounded.max_health() - 10.0);
        assert_eq!(manager.live_enemy_count(SCENE), 2);
    }
}
