//! Player detection
//!
//! Sight is a three-stage test: distance against the sight radius, angle
//! against the forward cone, then an unobstructed line-of-sight query.
//! The world itself (player location, walls, invisible walls) is behind
//! the [`WorldProbe`] seam so the state machine stays engine-agnostic.

use glam::Vec3;
use serde::{Deserialize, Serialize};

/// Height above the ground at which sight and obstruction rays originate.
pub const EYE_HEIGHT: f32 = 0.5;

/// World queries the enemy state machine needs but cannot answer itself.
pub trait WorldProbe {
    /// Current player position, or `None` if no player exists in the world.
    fn player_position(&self) -> Option<Vec3>;

    /// Whether the segment from `from` to `to` is free of sight blockers.
    fn line_of_sight(&self, from: Vec3, to: Vec3) -> bool;

    /// Short ray probe for walls in front of a moving entity.
    fn obstructed(&self, origin: Vec3, direction: Vec3, distance: f32) -> bool;
}

/// Detection tuning carried by an archetype definition.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct SightParams {
    /// Maximum detection distance.
    pub range: f32,
    /// Full width of the forward vision cone, in degrees.
    pub fov_degrees: f32,
}

impl Default for SightParams {
    fn default() -> Self {
        Self {
            range: 20.0,
            fov_degrees: 90.0,
        }
    }
}

/// Full visibility test: range, then cone, then line of sight.
pub fn player_visible(
    probe: &dyn WorldProbe,
    position: Vec3,
    facing: Vec3,
    sight: &SightParams,
    player: Vec3,
) -> bool {
    let to_player = player - position;
    let distance = to_player.length();
    if distance > sight.range {
        return false;
    }

    let direction = to_player.normalize_or_zero();
    if direction == Vec3::ZERO {
        // Player is standing inside the entity.
        return true;
    }

    let forward = {
        let f = facing.normalize_or_zero();
        if f == Vec3::ZERO {
            Vec3::Z
        } else {
            f
        }
    };
    let angle = forward.angle_between(direction).to_degrees();
    if angle > sight.fov_degrees / 2.0 {
        return false;
    }

    probe.line_of_sight(position + Vec3::Y * EYE_HEIGHT, player)
}
