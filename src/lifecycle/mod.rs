//! Enemy lifecycle
//!
//! Spawn points, the per-scene registry, and the two-tier death model:
//! session-scoped death for regular enemies, permanent store-backed
//! defeat for bosses.

pub mod manager;
pub mod spawn_point;

pub use manager::{boss_defeated_key, EnemyLifecycleManager, BOSS_DEFEATED_PREFIX};
pub use spawn_point::SpawnPoint;

use thiserror::Error;

/// Spawn-point configuration errors, raised at registration time. The
/// offending point is excluded; the process keeps running.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("spawn point in scene `{scene}` has no unique id")]
    MissingId { scene: String },
    #[error("spawn point id `{id}` is already registered")]
    DuplicateId { id: String },
    #[error("spawn point `{id}` references unknown archetype `{archetype}`")]
    UnknownArchetype { id: String, archetype: String },
}
