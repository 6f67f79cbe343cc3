use serde::{Deserialize, Serialize};
use slotmap::new_key_type;

use crate::error::ConfigError;

new_key_type! {
    /// Generational handle to a body owned by the world's registry.
    ///
    /// Handles of destroyed bodies stay safe to hold: lookups simply fail once
    /// the slot has been reclaimed.
    pub struct BodyId;
}

/// What a body landed on during the previous tick.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum GroundContact {
    /// Resting on the tile grid (ground speed is zero).
    Tile,
    /// Resting on another body; friction is applied relative to its velocity.
    Body(BodyId),
}

/// Which bodies a query visits.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum QueryScope {
    #[default]
    All,
    /// Only bodies flagged to collide with solids.
    Collidable,
}

// ---------------------------------------------------------------------------
// Serde default functions
// ---------------------------------------------------------------------------

const fn default_max_speed() -> f32 {
    1.0
}
const fn default_contact_epsilon() -> f32 {
    0.001
}
const fn default_push_apart_accel() -> f32 {
    0.001
}
const fn default_push_apart_min_distance() -> f32 {
    0.01
}
const fn default_true() -> bool {
    true
}
const fn default_one() -> f32 {
    1.0
}
const fn default_friction() -> f32 {
    0.8
}

/// World-level configuration for the fixed-step simulation.
///
/// All velocities are in world units per tick; gravity is an acceleration in
/// units per tick squared along Y (negative pulls down).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PhysicsConfig {
    /// Vertical acceleration applied to bodies with mass every tick.
    #[serde(default)]
    pub gravity: f32,
    /// Per-axis velocity clamp. Keeps bodies from skipping through thin colliders.
    #[serde(default = "default_max_speed")]
    pub max_speed: f32,
    /// Extra distance a resolved body is pushed past the contact boundary.
    #[serde(default = "default_contact_epsilon")]
    pub contact_epsilon: f32,
    /// Impulse applied to separate bodies that started the tick overlapping.
    #[serde(default = "default_push_apart_accel")]
    pub push_apart_accel: f32,
    /// Below this center distance a stuck pair is separated in a random direction.
    #[serde(default = "default_push_apart_min_distance")]
    pub push_apart_min_distance: f32,
    /// When false bodies only integrate; no contact resolution runs.
    #[serde(default = "default_true")]
    pub enable_solver: bool,
    /// Seed for the separation-direction RNG.
    #[serde(default)]
    pub seed: u64,
    /// Enable wall-clock timing in [`StepStats`] (adds small overhead when true).
    #[serde(default)]
    pub enable_timing: bool,

    // Defaults handed to bodies built with `Body::from_config`.
    #[serde(default = "default_one")]
    pub default_mass: f32,
    #[serde(default = "default_one")]
    pub default_damping: f32,
    #[serde(default = "default_one")]
    pub default_angle_damping: f32,
    #[serde(default)]
    pub default_elasticity: f32,
    #[serde(default = "default_friction")]
    pub default_friction: f32,
}

impl Default for PhysicsConfig {
    fn default() -> Self {
        Self {
            gravity: 0.0,
            max_speed: default_max_speed(),
            contact_epsilon: default_contact_epsilon(),
            push_apart_accel: default_push_apart_accel(),
            push_apart_min_distance: default_push_apart_min_distance(),
            enable_solver: true,
            seed: 0,
            enable_timing: false,
            default_mass: 1.0,
            default_damping: 1.0,
            default_angle_damping: 1.0,
            default_elasticity: 0.0,
            default_friction: default_friction(),
        }
    }
}

impl PhysicsConfig {
    /// Convenience constructor for the common case of only tuning gravity.
    pub fn with_gravity(gravity: f32) -> Self {
        Self { gravity, ..Self::default() }
    }

    /// Check that every field is usable by the solver.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.gravity.is_finite() {
            return Err(ConfigError::NonFinite { field: "gravity", value: self.gravity });
        }
        if !(self.max_speed > 0.0 && self.max_speed.is_finite()) {
            return Err(ConfigError::InvalidMaxSpeed(self.max_speed));
        }
        for (field, value) in [
            ("contact_epsilon", self.contact_epsilon),
            ("push_apart_accel", self.push_apart_accel),
            ("push_apart_min_distance", self.push_apart_min_distance),
            ("default_mass", self.default_mass),
        ] {
            if !(value >= 0.0 && value.is_finite()) {
                return Err(ConfigError::Negative { field, value });
            }
        }
        for (field, value) in [
            ("default_damping", self.default_damping),
            ("default_angle_damping", self.default_angle_damping),
            ("default_elasticity", self.default_elasticity),
            ("default_friction", self.default_friction),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(ConfigError::OutOfUnitRange { field, value });
            }
        }
        Ok(())
    }
}

/// Counters and timing for the last completed `step`.
#[derive(Copy, Clone, Debug, Default)]
pub struct StepStats {
    pub tick: u64,
    /// Bodies that ran velocity integration (parented bodies excluded).
    pub bodies_integrated: usize,
    /// Bodies whose transform was copied from a parent.
    pub bodies_attached: usize,
    /// Collidable pairs that passed the skip filters and were overlap tested.
    pub pairs_tested: usize,
    /// Pairs resolved by repositioning along one or both axes.
    pub solid_contacts: usize,
    /// Pairs that started the tick overlapping and were pushed apart.
    pub stuck_separations: usize,
    /// Bodies pushed back out of the tile grid.
    pub tile_contacts: usize,
    /// Bodies compacted out after being destroyed.
    pub bodies_removed: usize,

    pub step_ms: f64,
    pub integrate_ms: f64,
    pub solids_ms: f64,
    pub tiles_ms: f64,
}
