//! Archetype definitions
//!
//! Stat blocks and attack specs for every enemy kind, with the built-in
//! set the game ships. External RON files can override these (see
//! `loader`).

use serde::{Deserialize, Serialize};

use crate::enemy::archetype::{Archetype, VolleyPattern};
use crate::enemy::{EvadeTuning, SightParams};

/// Everything needed to construct an enemy of one kind.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArchetypeDef {
    /// Stable archetype identifier referenced by spawn points.
    pub id: String,
    /// Display name.
    pub name: String,
    pub max_health: f32,
    /// `true` for regular enemies, `false` for bosses.
    pub respawns: bool,
    pub move_speed: f32,
    #[serde(default)]
    pub sight: SightParams,
    #[serde(default)]
    pub evade: EvadeTuning,
    pub attack: AttackSpec,
}

/// Serializable description of an attack behavior.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum AttackSpec {
    /// Fixed-cadence volleys; the run ends after `volleys` shots.
    Volley { cadence: f32, volleys: u32 },
}

impl AttackSpec {
    /// Build the runtime behavior this spec describes.
    pub fn build(&self) -> Box<dyn Archetype> {
        match self {
            AttackSpec::Volley { cadence, volleys } => {
                Box::new(VolleyPattern::new(*cadence, *volleys))
            }
        }
    }
}

/// The built-in archetype set.
pub fn default_archetypes() -> Vec<ArchetypeDef> {
    vec![
        ArchetypeDef {
            id: "ashen_husk".to_string(),
            name: "Ashen Husk".to_string(),
            max_health: 50.0,
            respawns: true,
            move_speed: 5.0,
            sight: SightParams::default(),
            evade: EvadeTuning::default(),
            attack: AttackSpec::Volley {
                cadence: 0.6,
                volleys: 5,
            },
        },
        ArchetypeDef {
            id: "veil_stalker".to_string(),
            name: "Veil Stalker".to_string(),
            max_health: 35.0,
            respawns: true,
            move_speed: 7.5,
            sight: SightParams {
                range: 25.0,
                fov_degrees: 120.0,
            },
            evade: EvadeTuning {
                duration_min: 1.5,
                duration_max: 3.5,
                ..EvadeTuning::default()
            },
            attack: AttackSpec::Volley {
                cadence: 0.4,
                volleys: 8,
            },
        },
        ArchetypeDef {
            id: "chained_watcher".to_string(),
            name: "Chained Watcher".to_string(),
            max_health: 90.0,
            respawns: true,
            move_speed: 3.0,
            sight: SightParams {
                range: 15.0,
                fov_degrees: 70.0,
            },
            evade: EvadeTuning::default(),
            attack: AttackSpec::Volley {
                cadence: 1.0,
                volleys: 3,
            },
        },
        ArchetypeDef {
            id: "gatekeeper".to_string(),
            name: "The Gatekeeper".to_string(),
            max_health: 400.0,
            respawns: false,
            move_speed: 4.0,
            sight: SightParams {
                range: 30.0,
                fov_degrees: 360.0,
            },
            evade: EvadeTuning {
                duration_min: 2.0,
                duration_max: 4.0,
                redirect_probability_initial: 0.2,
                ..EvadeTuning::default()
            },
            attack: AttackSpec::Volley {
                cadence: 0.5,
                volleys: 10,
            },
        },
        ArchetypeDef {
            id: "sovereign_of_thorns".to_string(),
            name: "Sovereign of Thorns".to_string(),
            max_health: 650.0,
            respawns: false,
            move_speed: 5.5,
            sight: SightParams {
                range: 40.0,
                fov_degrees: 360.0,
            },
            evade: EvadeTuning {
                duration_min: 1.0,
                duration_max: 2.5,
                redirect_probability_initial: 0.3,
                redirect_probability_max: 0.9,
                ..EvadeTuning::default()
            },
            attack: AttackSpec::Volley {
                cadence: 0.3,
                volleys: 16,
            },
        },
    ]
}
