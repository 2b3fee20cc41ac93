//! Spawn points
//!
//! A per-scene descriptor binding a stable identifier to an archetype
//! and a world position. Owns at most one live entity at a time: calling
//! spawn while an instance exists resets it in place instead of creating
//! a duplicate.

use glam::Vec3;

use super::ConfigError;
use crate::data::{ArchetypeDef, ArchetypeLibrary};
use crate::enemy::EnemyEntity;

pub struct SpawnPoint {
    unique_id: String,
    scene_id: String,
    position: Vec3,
    archetype: ArchetypeDef,
    entity: Option<EnemyEntity>,
}

impl SpawnPoint {
    pub fn new(
        unique_id: impl Into<String>,
        scene_id: impl Into<String>,
        position: Vec3,
        archetype: ArchetypeDef,
    ) -> Self {
        Self {
            unique_id: unique_id.into(),
            scene_id: scene_id.into(),
            position,
            archetype,
            entity: None,
        }
    }

    /// Build a spawn point whose archetype is looked up by id.
    pub fn from_library(
        library: &ArchetypeLibrary,
        archetype_id: &str,
        unique_id: impl Into<String>,
        scene_id: impl Into<String>,
        position: Vec3,
    ) -> Result<Self, ConfigError> {
        let unique_id = unique_id.into();
        let archetype = library
            .get(archetype_id)
            .ok_or_else(|| ConfigError::UnknownArchetype {
                id: unique_id.clone(),
                archetype: archetype_id.to_string(),
            })?
            .clone();
        Ok(Self::new(unique_id, scene_id, position, archetype))
    }

    pub fn unique_id(&self) -> &str {
        &self.unique_id
    }

    pub fn scene_id(&self) -> &str {
        &self.scene_id
    }

    pub fn position(&self) -> Vec3 {
        self.position
    }

    /// Derived from the archetype: `true` for regular enemies, `false`
    /// for bosses.
    pub fn respawns(&self) -> bool {
        self.archetype.respawns
    }

    /// Produce a live entity at this point. If one already exists it is
    /// reset in place and repositioned (identity preserved); otherwise a
    /// fresh instance is built from the archetype and assigned this
    /// point's id.
    pub fn spawn(&mut self) -> &mut EnemyEntity {
        match self.entity {
            Some(ref mut entity) => {
                entity.reset(self.position);
                entity
            }
            None => {
                log::debug!(
                    "spawning `{}` ({}) at {:?}",
                    self.unique_id,
                    self.archetype.name,
                    self.position
                );
                self.entity
                    .insert(EnemyEntity::from_def(&self.archetype, self.unique_id.clone(), self.position))
            }
        }
    }

    /// Drop the owned instance, if any.
    pub fn despawn(&mut self) {
        self.entity = None;
    }

    pub fn entity(&self) -> Option<&EnemyEntity> {
        self.entity.as_ref()
    }

    pub fn entity_mut(&mut self) -> Option<&mut EnemyEntity> {
        self.entity.as_mut()
    }

    /// Whether an owned instance exists and has not been defeated.
    pub fn has_live_entity(&self) -> bool {
        self.entity.as_ref().is_some_and(|e| !e.is_dead())
    }
}
