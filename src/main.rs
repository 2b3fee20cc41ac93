//! Veilgate - headless demo
//!
//! Drives the lifecycle core through a short scripted session: load a
//! level, fight, rest at a checkpoint, kill the boss, then reload the
//! save to show what persists.

use anyhow::Result;
use glam::Vec3;

use veilgate::checkpoint::CheckpointTrigger;
use veilgate::enemy::WorldProbe;
use veilgate::game::GameContext;
use veilgate::level::{Restorable, SceneDirector, TransitionPhase};
use veilgate::store::PersistentStore;

const SCENE: &str = "ashen_courtyard";

/// Stand-in engine: every scene operation completes instantly, so the
/// loader's signals are fed back right after the request.
#[derive(Default)]
struct HeadlessDirector;

impl SceneDirector for HeadlessDirector {
    fn begin_transition_effect(&mut self) {
        log::info!("[engine] transition effect started");
    }
    fn unload_scene(&mut self, scene: &str) {
        log::info!("[engine] unloading scene `{scene}`");
    }
    fn load_scene(&mut self, scene: &str) {
        log::info!("[engine] loading scene `{scene}`");
    }
    fn place_player(&mut self, position: Vec3) {
        log::info!("[engine] player placed at {position:?}");
    }
}

/// Open world with the player standing in front of the enemies.
struct OpenFieldProbe;

impl WorldProbe for OpenFieldProbe {
    fn player_position(&self) -> Option<Vec3> {
        Some(Vec3::new(0.0, 0.0, 8.0))
    }
    fn line_of_sight(&self, _from: Vec3, _to: Vec3) -> bool {
        true
    }
    fn obstructed(&self, _origin: Vec3, _direction: Vec3, _distance: f32) -> bool {
        false
    }
}

/// A gate whose open/closed state lives in the persistent store.
struct CourtyardGate;

impl Restorable for CourtyardGate {
    fn restore_state(&mut self, store: &PersistentStore) {
        let open = store.get_bool("courtyard_gate_open");
        log::info!("[gate] restored: {}", if open { "open" } else { "closed" });
    }
}

/// Run a full transition, feeding the loader's signals immediately.
fn enter_scene(context: &GameContext, scene: &str, spawn: Vec3, director: &mut HeadlessDirector) {
    if !context.transition_to_level(scene, spawn, director) {
        return;
    }
    drive_signals(context, director);
}

fn drive_signals(context: &GameContext, director: &mut HeadlessDirector) {
    let phase = context.loader().borrow().phase();
    if phase == TransitionPhase::Unloading {
        context.notify_unload_complete(director);
    }
    context.notify_load_complete();
    context.notify_scene_initialized(director);
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    log::info!("Starting Veilgate demo v{}", env!("CARGO_PKG_VERSION"));

    let save_path = std::env::temp_dir().join("veilgate_demo_save.json");
    let _ = std::fs::remove_file(&save_path);

    let mut context = GameContext::with_save_path(save_path.clone());
    let mut director = HeadlessDirector;
    let probe = OpenFieldProbe;

    // Scene setup: two regulars and a boss, plus a restorable gate.
    context.register_spawn_point("ashen_husk", "husk_east", SCENE, Vec3::new(-4.0, 0.0, 0.0))?;
    context.register_spawn_point("veil_stalker", "stalker_west", SCENE, Vec3::new(4.0, 0.0, 0.0))?;
    context.register_spawn_point("gatekeeper", "gatekeeper_main", SCENE, Vec3::new(0.0, 0.0, -6.0))?;
    context.register_restorable(SCENE, Box::new(CourtyardGate));

    enter_scene(&context, SCENE, Vec3::new(0.0, 0.0, 10.0), &mut director);
    log::info!(
        "live enemies after load: {}",
        context.manager().borrow().live_enemy_count(SCENE)
    );

    // A few frames of simulation: the enemies spot the player and attack.
    for _ in 0..60 {
        context.update(1.0 / 60.0, &probe);
    }

    // Cut down a regular, open the gate, then rest.
    context.apply_damage("husk_east", 1_000.0);
    context.store().borrow_mut().set_bool("courtyard_gate_open", true);

    let checkpoint = CheckpointTrigger::new("cp_courtyard", SCENE, Vec3::new(0.0, 0.0, 10.0));
    checkpoint.activate(&context)?;
    log::info!(
        "after rest: {} live enemies, session deaths: {}",
        context.manager().borrow().live_enemy_count(SCENE),
        context.manager().borrow().session_dead().len()
    );

    // Bring down the boss; its defeat is permanent.
    context.apply_damage("gatekeeper_main", 100_000.0);
    checkpoint.activate(&context)?;

    // Reload the save: the gate stays open, the boss stays down, the
    // regulars return.
    if context.load_game(&mut director) {
        drive_signals(&context, &mut director);
    }
    log::info!(
        "after reload: {} live enemies, boss down: {}",
        context.manager().borrow().live_enemy_count(SCENE),
        context.store().borrow().get_bool("BossDefeated_gatekeeper_main")
    );

    let _ = std::fs::remove_file(&save_path);
    Ok(())
}
