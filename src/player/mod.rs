//! Player collaborators
//!
//! The slices of player state the persistence core owns an interface to:
//! max-HP (saved and restored through the snapshot) and the per-slot
//! skill upgrade lists. Movement, combat, and cooldown UI live outside
//! this crate.

use crate::events::{topics, EventBus};

/// Number of skill slots.
pub const SKILL_SLOTS: usize = 4;

/// Player hit points. Max HP persists across saves; current HP is
/// session-local and refilled at checkpoints and on load.
pub struct PlayerHealth {
    max_hp: i32,
    current_hp: i32,
}

impl PlayerHealth {
    pub fn new(max_hp: i32) -> Self {
        Self {
            max_hp,
            current_hp: max_hp,
        }
    }

    pub fn max_hp(&self) -> i32 {
        self.max_hp
    }

    pub fn current_hp(&self) -> i32 {
        self.current_hp
    }

    pub fn is_dead(&self) -> bool {
        self.current_hp <= 0
    }

    /// Raise or lower the cap; current HP is clamped down if needed.
    pub fn set_max_hp(&mut self, max_hp: i32) {
        self.max_hp = max_hp;
        self.current_hp = self.current_hp.min(max_hp);
    }

    /// Refill to max and announce it.
    pub fn restore_to_full(&mut self, bus: &EventBus) {
        self.current_hp = self.max_hp;
        log::debug!("player health restored: {}/{}", self.current_hp, self.max_hp);
        bus.publish(topics::PLAYER_HEALTH_RESTORED);
    }

    /// Apply damage; returns `true` if this reduced health to zero.
    pub fn take_damage(&mut self, amount: i32, bus: &EventBus) -> bool {
        self.current_hp = (self.current_hp - amount).max(0);
        bus.publish(topics::PLAYER_DAMAGED);

        if self.current_hp == 0 {
            bus.publish(topics::PLAYER_DIED);
            true
        } else {
            false
        }
    }
}

impl Default for PlayerHealth {
    fn default() -> Self {
        Self::new(100)
    }
}

/// Applied skill upgrades, one ordered list per slot. The upgrade names
/// are opaque to this crate; the skill system interprets them.
#[derive(Debug, Clone, Default)]
pub struct SkillLoadout {
    upgrades: [Vec<String>; SKILL_SLOTS],
}

impl SkillLoadout {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an applied upgrade. Out-of-range slots are logged and
    /// dropped rather than panicking.
    pub fn record_upgrade(&mut self, slot: usize, upgrade: impl Into<String>) {
        let Some(list) = self.upgrades.get_mut(slot) else {
            log::warn!("skill upgrade recorded for invalid slot {slot}");
            return;
        };
        list.push(upgrade.into());
    }

    pub fn applied_upgrades(&self, slot: usize) -> &[String] {
        self.upgrades.get(slot).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn all_upgrades(&self) -> &[Vec<String>; SKILL_SLOTS] {
        &self.upgrades
    }

    /// Replace every slot from a loaded snapshot.
    pub fn apply_from_save(&mut self, upgrades: &[Vec<String>; SKILL_SLOTS]) {
        self.upgrades = upgrades.clone();
        let total: usize = self.upgrades.iter().map(Vec::len).sum();
        log::info!("applied {total} skill upgrade(s) from save");
    }

    pub fn clear(&mut self) {
        self.upgrades = Default::default();
    }
}
