//! Save snapshot
//!
//! The serializable aggregate written to and read from the save file.
//! Every field is defaulted on read, so a partially-populated snapshot
//! (e.g. from a forward-incompatible save) still loads without throwing.

use std::collections::HashMap;

use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::player::SKILL_SLOTS;

/// One full save document. Writes are whole-document overwrites; there is
/// no incremental patching.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SaveSnapshot {
    /// Checkpoint the player last rested at.
    pub checkpoint_id: String,
    /// Scene to load into on restore.
    pub scene_name: String,
    /// Where to place the player after the scene loads.
    pub spawn_position: Vec3,
    /// Player max HP.
    pub max_hp: i32,
    /// Applied upgrade names, one list per skill slot.
    pub skill_upgrades: [Vec<String>; SKILL_SLOTS],
    /// Full copies of the persistent store namespaces.
    pub bool_states: HashMap<String, bool>,
    pub int_states: HashMap<String, i32>,
    pub float_states: HashMap<String, f32>,
    pub string_states: HashMap<String, String>,
    /// Defeated bosses in insertion order.
    pub defeated_bosses: Vec<String>,
    /// Unix seconds at save time.
    pub timestamp: String,
}

impl Default for SaveSnapshot {
    fn default() -> Self {
        Self {
            checkpoint_id: String::new(),
            scene_name: String::new(),
            spawn_position: Vec3::ZERO,
            max_hp: 100,
            skill_upgrades: Default::default(),
            bool_states: HashMap::new(),
            int_states: HashMap::new(),
            float_states: HashMap::new(),
            string_states: HashMap::new(),
            defeated_bosses: Vec::new(),
            timestamp: String::new(),
        }
    }
}
