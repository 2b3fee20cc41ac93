//! Enemy state machine
//!
//! Per-instance behavior: detection, attack, evade, death. Death
//! processing runs exactly once, inside the same call that drops health
//! to zero; the owner (the lifecycle manager) routes the defeat record
//! into the session or persistent channel.

use glam::{Quat, Vec3};
use rand::Rng;
use serde::{Deserialize, Serialize};

use super::archetype::Archetype;
use super::perception::{self, SightParams, WorldProbe, EYE_HEIGHT};
use crate::data::ArchetypeDef;

/// Distance of the forward wall probe used while evading.
const WALL_PROBE_DISTANCE: f32 = 1.0;

/// Evade-phase tuning carried by an archetype definition.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct EvadeTuning {
    /// Minimum drawn evade duration, seconds.
    pub duration_min: f32,
    /// Maximum drawn evade duration, seconds.
    pub duration_max: f32,
    /// Interval between redirect checks, seconds.
    pub redirect_interval: f32,
    /// Redirect probability at the start of the phase.
    pub redirect_probability_initial: f32,
    /// Redirect probability as elapsed time approaches the drawn duration.
    pub redirect_probability_max: f32,
}

impl Default for EvadeTuning {
    fn default() -> Self {
        Self {
            duration_min: 2.0,
            duration_max: 5.0,
            redirect_interval: 1.0,
            redirect_probability_initial: 0.1,
            redirect_probability_max: 0.8,
        }
    }
}

/// Enemy behavioral states. `Dead` is terminal until an external
/// [`EnemyEntity::reset`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnemyState {
    Idle,
    Attacking,
    Evading,
    Dead,
}

#[derive(Default)]
struct EvadeBookkeeping {
    direction: Vec3,
    duration: f32,
    elapsed: f32,
    since_redirect: f32,
    redirect_probability: f32,
}

/// One live enemy instance, owned by its spawn point.
pub struct EnemyEntity {
    unique_id: String,
    name: String,
    max_health: f32,
    current_health: f32,
    respawns: bool,
    state: EnemyState,

    position: Vec3,
    facing: Vec3,
    velocity: Vec3,
    move_speed: f32,

    sight: SightParams,
    evade_tuning: EvadeTuning,
    evade: EvadeBookkeeping,

    pattern: Box<dyn Archetype>,
    missing_player_logged: bool,
}

impl EnemyEntity {
    /// Build a fresh instance from an archetype definition. Health starts
    /// at max, state at Idle.
    pub fn from_def(def: &ArchetypeDef, unique_id: impl Into<String>, position: Vec3) -> Self {
        Self {
            unique_id: unique_id.into(),
            name: def.name.clone(),
            max_health: def.max_health,
            current_health: def.max_health,
            respawns: def.respawns,
            state: EnemyState::Idle,
            position,
            facing: Vec3::Z,
            velocity: Vec3::ZERO,
            move_speed: def.move_speed,
            sight: def.sight,
            evade_tuning: def.evade,
            evade: EvadeBookkeeping::default(),
            pattern: def.attack.build(),
            missing_player_logged: false,
        }
    }

    pub fn unique_id(&self) -> &str {
        &self.unique_id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn state(&self) -> EnemyState {
        self.state
    }

    pub fn is_dead(&self) -> bool {
        self.state == EnemyState::Dead
    }

    pub fn respawns(&self) -> bool {
        self.respawns
    }

    pub fn current_health(&self) -> f32 {
        self.current_health
    }

    pub fn max_health(&self) -> f32 {
        self.max_health
    }

    pub fn position(&self) -> Vec3 {
        self.position
    }

    /// Advance the state machine by `dt` seconds. No-op while dead.
    pub fn update(&mut self, dt: f32, probe: &dyn WorldProbe, rng: &mut impl Rng) {
        if self.state == EnemyState::Dead {
            return;
        }

        let player = match probe.player_position() {
            Some(p) => p,
            None => {
                // No player in the world: degrade to inert idling rather
                // than fault.
                if !self.missing_player_logged {
                    log::warn!("enemy `{}`: player not found, staying idle", self.unique_id);
                    self.missing_player_logged = true;
                }
                if self.state != EnemyState::Idle {
                    self.halt();
                    self.pattern.on_attack_end();
                    self.set_state(EnemyState::Idle);
                }
                return;
            }
        };

        let visible =
            perception::player_visible(probe, self.position, self.facing, &self.sight, player);

        match self.state {
            EnemyState::Idle => {
                if visible {
                    self.set_state(EnemyState::Attacking);
                }
            }
            EnemyState::Attacking => {
                if !visible {
                    // Player slipped out of sight mid-attack; the pattern
                    // is told so it can reset its counters.
                    self.halt();
                    self.pattern.on_attack_end();
                    self.set_state(EnemyState::Idle);
                } else {
                    self.pattern.execute_attack(dt, self.position, player);
                    if self.pattern.is_attack_finished() {
                        self.prepare_evade(player, rng);
                        self.pattern.on_attack_end();
                        self.set_state(EnemyState::Evading);
                    }
                }
            }
            EnemyState::Evading => {
                if !visible {
                    self.halt();
                    self.set_state(EnemyState::Idle);
                } else {
                    self.update_evade(dt, probe, player, rng);
                    if self.evade.elapsed >= self.evade.duration {
                        self.halt();
                        self.set_state(EnemyState::Attacking);
                    }
                }
            }
            EnemyState::Dead => unreachable!("dead entities return early"),
        }

        self.position += self.velocity * dt;
    }

    /// Apply damage; returns `true` only on the call that kills the
    /// entity. Damaging a dead entity is a no-op.
    pub fn take_damage(&mut self, amount: f32) -> bool {
        if self.state == EnemyState::Dead {
            return false;
        }

        self.current_health = (self.current_health - amount).max(0.0);
        log::debug!(
            "enemy `{}` took {amount} damage: {}/{}",
            self.unique_id,
            self.current_health,
            self.max_health
        );

        if self.current_health <= 0.0 {
            self.halt();
            self.set_state(EnemyState::Dead);
            log::info!("enemy `{}` defeated", self.unique_id);
            true
        } else {
            false
        }
    }

    /// Force the entity into the dead state without a defeat record.
    /// Used when a loaded snapshot says a boss is already gone.
    pub fn deactivate(&mut self) {
        if self.state != EnemyState::Dead {
            self.halt();
            self.current_health = 0.0;
            self.state = EnemyState::Dead;
            log::debug!("enemy `{}` deactivated", self.unique_id);
        }
    }

    /// Restore to full health and Idle, clearing evade bookkeeping and
    /// the pattern's internal counters. Valid from any state, including
    /// Dead. Only the owning spawn point calls this.
    pub fn reset(&mut self, position: Vec3) {
        self.current_health = self.max_health;
        self.position = position;
        self.facing = Vec3::Z;
        self.velocity = Vec3::ZERO;
        self.evade = EvadeBookkeeping::default();
        self.pattern.on_attack_end();
        self.state = EnemyState::Idle;
        log::debug!("enemy `{}` reset at {position:?}", self.unique_id);
    }

    fn set_state(&mut self, state: EnemyState) {
        log::debug!("enemy `{}`: {:?} -> {:?}", self.unique_id, self.state, state);
        self.state = state;
        self.pattern.on_state_change(state);
    }

    fn halt(&mut self) {
        self.velocity = Vec3::ZERO;
    }

    /// Draw the evade duration and pick the initial flee heading.
    fn prepare_evade(&mut self, player: Vec3, rng: &mut impl Rng) {
        let t = &self.evade_tuning;
        self.evade.duration = rng.gen_range(t.duration_min..=t.duration_max);
        self.evade.elapsed = 0.0;
        self.evade.since_redirect = 0.0;
        self.evade.redirect_probability = t.redirect_probability_initial;
        self.choose_evade_direction(player, rng);
    }

    /// New heading: the player-to-entity vector rotated by a uniformly
    /// random angle about the vertical axis. Biases away from the player
    /// with unpredictable lateral drift.
    fn choose_evade_direction(&mut self, player: Vec3, rng: &mut impl Rng) {
        let away = {
            let v = (self.position - player).normalize_or_zero();
            if v == Vec3::ZERO {
                Vec3::Z
            } else {
                v
            }
        };
        let angle: f32 = rng.gen_range(0.0..360.0);
        let mut direction = Quat::from_rotation_y(angle.to_radians()) * away;
        direction.y = 0.0;
        self.evade.direction = direction.normalize_or_zero();
        self.evade.since_redirect = 0.0;
    }

    fn update_evade(&mut self, dt: f32, probe: &dyn WorldProbe, player: Vec3, rng: &mut impl Rng) {
        self.evade.elapsed += dt;
        self.evade.since_redirect += dt;

        let t = self.evade_tuning;
        let progress = if self.evade.duration > 0.0 {
            (self.evade.elapsed / self.evade.duration).clamp(0.0, 1.0)
        } else {
            1.0
        };
        self.evade.redirect_probability = lerp(
            t.redirect_probability_initial,
            t.redirect_probability_max,
            progress,
        );

        if self.evade.since_redirect >= t.redirect_interval {
            if rng.gen::<f32>() < self.evade.redirect_probability {
                self.choose_evade_direction(player, rng);
            }
            self.evade.since_redirect = 0.0;
        }

        let mut direction = self.evade.direction;
        direction.y = 0.0;
        direction = direction.normalize_or_zero();

        // Walls force an immediate redirect, outside the probabilistic
        // schedule.
        if probe.obstructed(self.position + Vec3::Y * EYE_HEIGHT, direction, WALL_PROBE_DISTANCE) {
            self.choose_evade_direction(player, rng);
            direction = self.evade.direction;
        }

        if direction != Vec3::ZERO {
            self.facing = direction;
        }
        self.velocity.x = direction.x * self.move_speed;
        self.velocity.z = direction.z * self.move_speed;
    }
}

fn lerp(a: f32, b: f32, t: f32) -> f32 {
    a + (b - a) * t
}
