//! Attack archetypes
//!
//! The behavioral template an enemy runs while attacking, held by
//! composition inside the state machine. The archetype decides what an
//! attack run is and when it has finished; the state machine only asks.

use glam::Vec3;

use super::entity::EnemyState;

/// Per-kind attack behavior.
pub trait Archetype {
    /// Advance the attack routine by `dt`. Called once per update while
    /// the owner is in the attacking state.
    fn execute_attack(&mut self, dt: f32, origin: Vec3, player: Vec3);

    /// Whether the current attack run is complete. Evaluated once per
    /// update after [`Archetype::execute_attack`].
    fn is_attack_finished(&self) -> bool;

    /// The attack run ended, completed or interrupted. Clear internal
    /// counters and timers here.
    fn on_attack_end(&mut self);

    /// The owner changed state. Hook for animation/audio layers.
    fn on_state_change(&mut self, _state: EnemyState) {}
}

/// Fires volleys at a fixed cadence; the run ends after a set count.
///
/// Projectile spawning belongs to the combat layer; this pattern tracks
/// the timing and completion predicate only.
pub struct VolleyPattern {
    cadence: f32,
    volleys_per_run: u32,
    since_last: f32,
    fired: u32,
}

impl VolleyPattern {
    pub fn new(cadence: f32, volleys_per_run: u32) -> Self {
        Self {
            cadence,
            volleys_per_run,
            // First volley fires on the first update of a run.
            since_last: cadence,
            fired: 0,
        }
    }

    /// Volleys fired in the current run.
    pub fn fired(&self) -> u32 {
        self.fired
    }

    fn fire_volley(&mut self, origin: Vec3, player: Vec3) {
        self.fired += 1;
        log::debug!(
            "volley {} of {} from {:?} toward {:?}",
            self.fired,
            self.volleys_per_run,
            origin,
            player
        );
    }
}

impl Archetype for VolleyPattern {
    fn execute_attack(&mut self, dt: f32, origin: Vec3, player: Vec3) {
        self.since_last += dt;
        if self.since_last >= self.cadence {
            self.fire_volley(origin, player);
            self.since_last = 0.0;
        }
    }

    fn is_attack_finished(&self) -> bool {
        self.fired >= self.volleys_per_run
    }

    fn on_attack_end(&mut self) {
        self.fired = 0;
        self.since_last = self.cadence;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_volley_fires_immediately() {
        let mut pattern = VolleyPattern::new(0.6, 5);
        pattern.execute_attack(0.016, Vec3::ZERO, Vec3::Z);
        assert_eq!(pattern.fired(), 1);
    }

    #[test]
    fn run_finishes_after_configured_count() {
        let mut pattern = VolleyPattern::new(0.5, 3);
        // Half-second steps: one volley each.
        for _ in 0..3 {
            pattern.execute_attack(0.5, Vec3::ZERO, Vec3::Z);
        }
        assert!(pattern.is_attack_finished());
    }

    #[test]
    fn attack_end_resets_counters() {
        let mut pattern = VolleyPattern::new(0.5, 2);
        pattern.execute_attack(0.5, Vec3::ZERO, Vec3::Z);
        pattern.on_attack_end();
        assert_eq!(pattern.fired(), 0);
        assert!(!pattern.is_attack_finished());

        // The next run starts with an immediate volley again.
        pattern.execute_attack(0.016, Vec3::ZERO, Vec3::Z);
        assert_eq!(pattern.fired(), 1);
    }
}
