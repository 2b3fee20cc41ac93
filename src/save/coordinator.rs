//! Save/load coordination
//!
//! Builds snapshots from the live services, writes and reads the save
//! file, and applies a loaded snapshot back through the other components
//! in a strict order. A missing or unreadable save is "no data", never a
//! fatal error.

use std::fs;
use std::path::{Path, PathBuf};
use std::rc::Rc;
use std::time::{SystemTime, UNIX_EPOCH};

use glam::Vec3;
use thiserror::Error;

use super::snapshot::SaveSnapshot;
use crate::events::{topics, EventBus};
use crate::lifecycle::EnemyLifecycleManager;
use crate::player::{PlayerHealth, SkillLoadout};
use crate::store::PersistentStore;

/// Save file I/O errors. Load converts these to "no data"; only save
/// surfaces them to the caller.
#[derive(Debug, Error)]
pub enum SaveError {
    #[error("save io: {0}")]
    Io(#[from] std::io::Error),
    #[error("save parse: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Directory holding the save file.
pub fn save_directory() -> PathBuf {
    use directories::ProjectDirs;

    if let Some(proj_dirs) = ProjectDirs::from("com", "veilgate", "Veilgate") {
        proj_dirs.data_local_dir().to_path_buf()
    } else {
        // Fallback to current directory
        PathBuf::from("./saves")
    }
}

/// Default on-disk location of the single save slot.
pub fn default_save_path() -> PathBuf {
    save_directory().join("savegame.json")
}

pub struct SaveCoordinator {
    save_path: PathBuf,
    /// Most recently written or read snapshot.
    current: Option<SaveSnapshot>,
    /// Set while a load-triggered transition is in flight; the snapshot
    /// is applied when the level-loaded notification arrives.
    pending_restore: bool,
    bus: Rc<EventBus>,
}

impl SaveCoordinator {
    pub fn new(bus: Rc<EventBus>) -> Self {
        Self::with_path(default_save_path(), bus)
    }

    pub fn with_path(save_path: PathBuf, bus: Rc<EventBus>) -> Self {
        log::debug!("save file path: {}", save_path.display());
        Self {
            save_path,
            current: None,
            pending_restore: false,
            bus,
        }
    }

    pub fn save_path(&self) -> &Path {
        &self.save_path
    }

    pub fn save_file_exists(&self) -> bool {
        self.save_path.exists()
    }

    pub fn current(&self) -> Option<&SaveSnapshot> {
        self.current.as_ref()
    }

    /// Gather a snapshot from the live services.
    pub fn build_snapshot(
        checkpoint_id: &str,
        scene_name: &str,
        spawn_position: Vec3,
        player: &PlayerHealth,
        skills: &SkillLoadout,
        store: &PersistentStore,
        manager: &EnemyLifecycleManager,
    ) -> SaveSnapshot {
        SaveSnapshot {
            checkpoint_id: checkpoint_id.to_string(),
            scene_name: scene_name.to_string(),
            spawn_position,
            max_hp: player.max_hp(),
            skill_upgrades: skills.all_upgrades().clone(),
            bool_states: store.bool_states().clone(),
            int_states: store.int_states().clone(),
            float_states: store.float_states().clone(),
            string_states: store.string_states().clone(),
            defeated_bosses: manager.defeated_bosses().to_vec(),
            timestamp: unix_timestamp(),
        }
    }

    /// Write a snapshot to disk. Full-document overwrite.
    pub fn save(&mut self, snapshot: SaveSnapshot) -> Result<(), SaveError> {
        if let Some(dir) = self.save_path.parent() {
            fs::create_dir_all(dir)?;
        }
        let json = serde_json::to_string_pretty(&snapshot)?;
        fs::write(&self.save_path, json)?;

        log::info!(
            "game saved: checkpoint `{}`, scene `{}`",
            snapshot.checkpoint_id,
            snapshot.scene_name
        );
        self.current = Some(snapshot);
        self.bus.publish(topics::GAME_SAVED);
        Ok(())
    }

    /// Read the save file. Absent, unreadable, or structurally invalid
    /// files all mean "no data": the caller treats that as a fresh game.
    pub fn load(&mut self) -> Option<SaveSnapshot> {
        if !self.save_path.exists() {
            log::warn!("no save file at {}", self.save_path.display());
            return None;
        }

        let text = match fs::read_to_string(&self.save_path) {
            Ok(text) => text,
            Err(e) => {
                log::warn!("failed to read save file: {e}");
                return None;
            }
        };
        match serde_json::from_str::<SaveSnapshot>(&text) {
            Ok(snapshot) => {
                log::info!(
                    "game loaded: checkpoint `{}`, scene `{}`",
                    snapshot.checkpoint_id,
                    snapshot.scene_name
                );
                self.current = Some(snapshot.clone());
                Some(snapshot)
            }
            Err(e) => {
                log::warn!("save file is not valid: {e}");
                None
            }
        }
    }

    /// Remove the save file, if present.
    pub fn delete_save(&mut self) -> Result<(), SaveError> {
        if self.save_path.exists() {
            fs::remove_file(&self.save_path)?;
            self.current = None;
            log::info!("save file deleted");
        }
        Ok(())
    }

    /// Arm the pending restore; the owning context applies the current
    /// snapshot when the destination level finishes loading.
    pub fn mark_pending_restore(&mut self) {
        self.pending_restore = true;
    }

    /// Take the snapshot awaiting application, if the restore is armed.
    pub fn take_pending_snapshot(&mut self) -> Option<SaveSnapshot> {
        if self.pending_restore {
            self.pending_restore = false;
            self.current.clone()
        } else {
            None
        }
    }

    /// Apply a loaded snapshot through the other services, in the order
    /// the restore path requires: store first, then the boss channel,
    /// then session-death reset and spawn processing, then the player
    /// and skill collaborators.
    pub fn apply(
        snapshot: &SaveSnapshot,
        store: &mut PersistentStore,
        manager: &mut EnemyLifecycleManager,
        player: &mut PlayerHealth,
        skills: &mut SkillLoadout,
        bus: &EventBus,
    ) {
        store.load_states(
            snapshot.bool_states.clone(),
            snapshot.int_states.clone(),
            snapshot.float_states.clone(),
            snapshot.string_states.clone(),
        );
        manager.restore_boss_list(&snapshot.defeated_bosses, store);
        manager.clear_session_deaths();
        manager.process_spawns_for_level(&snapshot.scene_name, store);

        player.set_max_hp(snapshot.max_hp);
        player.restore_to_full(bus);
        skills.apply_from_save(&snapshot.skill_upgrades);

        log::info!("save data fully applied");
        bus.publish(topics::GAME_LOADED);
    }
}

fn unix_timestamp() -> String {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs().to_string())
        .unwrap_or_default()
}
