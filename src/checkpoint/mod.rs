//! Checkpoints
//!
//! A checkpoint binds an id to a scene and a respawn position. Activating
//! one heals the player, writes the save file, and publishes the rest
//! topics; the lifecycle manager consumes the rest event to respawn the
//! scene's session-dead regulars.

use glam::Vec3;

use crate::game::GameContext;
use crate::save::SaveError;

pub struct CheckpointTrigger {
    id: String,
    scene_name: String,
    spawn_position: Vec3,
}

impl CheckpointTrigger {
    pub fn new(id: impl Into<String>, scene_name: impl Into<String>, spawn_position: Vec3) -> Self {
        Self {
            id: id.into(),
            scene_name: scene_name.into(),
            spawn_position,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn scene_name(&self) -> &str {
        &self.scene_name
    }

    pub fn spawn_position(&self) -> Vec3 {
        self.spawn_position
    }

    /// Rest here: heal, save, respawn the level's regular enemies.
    pub fn activate(&self, context: &GameContext) -> Result<(), SaveError> {
        log::info!(
            "checkpoint `{}` activated (scene `{}`)",
            self.id,
            self.scene_name
        );
        context.rest_at_checkpoint(self)
    }
}
