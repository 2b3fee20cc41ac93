//! Enemy behavior
//!
//! The per-instance state machine, attack archetypes, and the perception
//! seam that keeps the machine independent of the engine's physics.

pub mod archetype;
pub mod entity;
pub mod perception;

pub use archetype::{Archetype, VolleyPattern};
pub use entity::{EnemyEntity, EnemyState, EvadeTuning};
pub use perception::{player_visible, SightParams, WorldProbe};
