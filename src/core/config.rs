use crate::error::PhysicsError;
use crate::math::Vector2;
use crate::Result;

#[cfg(feature = "serialize")]
use serde::{Serialize, Deserialize};

/// Default fixed timestep: finer than the render rate so small, bouncy or
/// destructible bodies resolve cleanly
pub const DEFAULT_FIXED_TIMESTEP: f32 = 1.0 / 250.0;

/// Configuration parameters for the physics simulation
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serialize", derive(Serialize, Deserialize))]
pub struct SimulationConfig {
    /// The interval the kernel is advanced by on every accumulator tick
    pub fixed_timestep: f32,

    /// World gravity
    pub gravity: Vector2,

    /// Velocity iterations per kernel sub-step
    pub velocity_iterations: u32,

    /// Position correction iterations per kernel sub-step
    pub position_iterations: u32,

    /// Closing speed below which contacts do not bounce
    pub restitution_threshold: f32,

    /// Upper bound on shapes gathered by one sensor-overlap query
    pub max_sensor_overlaps: usize,

    /// Break-force curve and fragment limits
    pub fracture: FractureConfig,

    /// Force-field tuning
    pub force_fields: ForceFieldConfig,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            fixed_timestep: DEFAULT_FIXED_TIMESTEP,
            gravity: Vector2::new(0.0, -10.0),
            velocity_iterations: 8,
            position_iterations: 3,
            restitution_threshold: 1.0,
            max_sensor_overlaps: 64,
            fracture: FractureConfig::default(),
            force_fields: ForceFieldConfig::default(),
        }
    }
}

impl SimulationConfig {
    /// Checks the configuration for values the simulation cannot run with
    pub fn validate(&self) -> Result<()> {
        if !(self.fixed_timestep > 0.0 && self.fixed_timestep.is_finite()) {
            return Err(PhysicsError::InvalidParameter(format!(
                "fixed timestep must be positive, got {}",
                self.fixed_timestep
            )));
        }
        if self.velocity_iterations == 0 {
            return Err(PhysicsError::InvalidParameter("velocity iterations must be at least 1".into()));
        }
        self.fracture.validate()
    }
}

/// Tuning of the hardness curve and fragment generation.
///
/// The hardness constants are balance values: `break_speed(strength) =
/// base_break_speed * hardness_multiplier^(strength - reference_strength)`.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serialize", derive(Serialize, Deserialize))]
pub struct FractureConfig {
    /// Break speed of a body whose strength equals `reference_strength`
    pub base_break_speed: f32,

    /// Growth of the break speed per strength point
    pub hardness_multiplier: f32,

    pub reference_strength: f32,

    /// Brittleness above which the largest fragment is split again
    pub secondary_brittleness_threshold: f32,

    /// Rotation of each secondary split line per unit of brittleness, in radians
    pub secondary_angle_scale: f32,

    /// Fragments smaller than this vanish
    pub min_fragment_area: f32,

    /// Parent brittleness required for fragments to stay destructible
    pub recursive_brittleness_threshold: f32,

    /// Fragment area required for fragments to stay destructible
    pub min_recursive_fragment_area: f32,

    /// Hard cap on fragments per fracture
    pub max_fragments: usize,
}

impl Default for FractureConfig {
    fn default() -> Self {
        Self {
            base_break_speed: 2.0,
            hardness_multiplier: 1.3,
            reference_strength: 4.0,
            secondary_brittleness_threshold: 0.3,
            secondary_angle_scale: std::f32::consts::FRAC_PI_2,
            min_fragment_area: 0.01,
            recursive_brittleness_threshold: 0.1,
            min_recursive_fragment_area: 0.05,
            max_fragments: crate::destruction::MAX_FRAGMENTS,
        }
    }
}

impl FractureConfig {
    pub fn validate(&self) -> Result<()> {
        if self.base_break_speed <= 0.0 || self.hardness_multiplier <= 0.0 {
            return Err(PhysicsError::InvalidParameter(
                "break speed curve must use positive base and multiplier".into(),
            ));
        }
        if !(2..=crate::destruction::MAX_FRAGMENTS).contains(&self.max_fragments) {
            return Err(PhysicsError::InvalidParameter(format!(
                "max fragments must be within 2..={}, got {}",
                crate::destruction::MAX_FRAGMENTS,
                self.max_fragments
            )));
        }
        Ok(())
    }
}

/// Tuning shared by all force fields
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serialize", derive(Serialize, Deserialize))]
pub struct ForceFieldConfig {
    /// Height of the band above a linear field in which bodies are damped but not pushed
    pub surface_margin: f32,

    /// Damping multiplier for bodies inside a field
    pub in_field_damping_scale: f32,

    /// Damping multiplier for bodies in the surface band
    pub surface_damping_scale: f32,

    /// Body type tag whose force is scaled by `heavy_force_multiplier`
    pub heavy_type: String,

    /// Force multiplier for bodies tagged `heavy_type`; negative values invert the push
    pub heavy_force_multiplier: f32,
}

impl Default for ForceFieldConfig {
    fn default() -> Self {
        Self {
            surface_margin: 0.25,
            in_field_damping_scale: 1.0,
            surface_damping_scale: 0.35,
            heavy_type: "heavy".to_string(),
            heavy_force_multiplier: -0.5,
        }
    }
}
