use std::collections::{BTreeSet, HashMap};

use crate::core::config::ForceFieldConfig;
use crate::core::{BodyId, BodyTypeRegistry};
use crate::kernel::{BodyType, KernelBodyHandle, KernelShapeHandle, PhysicsKernel};
use crate::math::{lerp, Aabb, Vector2, EPSILON};
use crate::Result;

/// Defines the type of force field
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ForceFieldType {
    /// Uniform push inside an axis-aligned region
    Linear {
        force: Vector2,
        bounds: Aabb,
    },

    /// Push along the outward radial direction, interpolated from center to edge
    Radial {
        center: Vector2,
        radius: f32,
        force_at_center: f32,
        force_at_edge: f32,
    },
}

/// Where a body's center of mass sits relative to a linear field
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldZone {
    /// Inside the field bounds: pushed and damped
    Inside,

    /// In the band just above the field: damped only
    Surface,

    Outside,
}

/// A sensor volume that perturbs the velocity of overlapping dynamic bodies
/// once per fixed step.
///
/// Backed by a static kernel body carrying a single sensor shape; destroying
/// the field destroys that body.
#[derive(Debug, Clone)]
pub struct ForceField {
    field_type: ForceFieldType,

    /// Velocity damping coefficient, 0 disables damping
    damping: f32,

    pub(crate) body: KernelBodyHandle,
    pub(crate) sensor: KernelShapeHandle,
}

impl ForceField {
    pub(crate) fn new(field_type: ForceFieldType, body: KernelBodyHandle, sensor: KernelShapeHandle) -> Self {
        Self {
            field_type,
            damping: 0.0,
            body,
            sensor,
        }
    }

    #[inline]
    pub fn field_type(&self) -> ForceFieldType {
        self.field_type
    }

    #[inline]
    pub fn damping(&self) -> f32 {
        self.damping
    }

    pub(crate) fn set_damping(&mut self, damping: f32) {
        self.damping = damping.max(0.0);
    }

    /// Replaces the force of a linear field; returns false for radial fields
    pub(crate) fn set_force(&mut self, new_force: Vector2) -> bool {
        match &mut self.field_type {
            ForceFieldType::Linear { force, .. } => {
                *force = new_force;
                true
            }
            ForceFieldType::Radial { .. } => false,
        }
    }

    /// Replaces the strength profile of a radial field; returns false for linear fields
    pub(crate) fn set_radial_params(&mut self, new_radius: f32, at_center: f32, at_edge: f32) -> bool {
        match &mut self.field_type {
            ForceFieldType::Radial { radius, force_at_center, force_at_edge, .. } => {
                *radius = new_radius;
                *force_at_center = at_center;
                *force_at_edge = at_edge;
                true
            }
            ForceFieldType::Linear { .. } => false,
        }
    }

    /// Applies the field to every dynamic body overlapping its sensor
    pub(crate) fn apply<K: PhysicsKernel>(
        &self,
        kernel: &mut K,
        lookup: &HashMap<KernelBodyHandle, BodyId>,
        types: &BodyTypeRegistry,
        config: &ForceFieldConfig,
        max_overlaps: usize,
        dt: f32,
    ) -> Result<usize> {
        let mut visitors = BTreeSet::new();
        for shape in kernel.sensor_overlaps(self.sensor, max_overlaps)? {
            let body = kernel.shape_body(shape)?;
            if body != self.body && kernel.body_type(body)? == BodyType::Dynamic {
                visitors.insert(body);
            }
        }

        let mut affected = 0;
        for body in visitors {
            let com = kernel.world_center(body)?;
            let velocity = kernel.linear_velocity(body)?;
            let angular = kernel.angular_velocity(body)?;

            let response = match self.field_type {
                ForceFieldType::Linear { force, bounds } => {
                    let heavy = lookup
                        .get(&body)
                        .map_or(false, |id| types.has(*id, &config.heavy_type));
                    let multiplier = if heavy { config.heavy_force_multiplier } else { 1.0 };
                    let zone = linear_zone(&bounds, com, config.surface_margin);
                    linear_response(velocity, angular, force * multiplier, self.damping, zone, config, dt)
                }
                ForceFieldType::Radial { center, radius, force_at_center, force_at_edge } => {
                    let push = radial_force(center, radius, force_at_center, force_at_edge, com);
                    let velocity = velocity + push * dt;
                    let keep = damping_factor(self.damping, config.in_field_damping_scale, dt);
                    Some((velocity * keep, angular * keep))
                }
            };

            if let Some((velocity, angular)) = response {
                kernel.set_linear_velocity(body, velocity)?;
                kernel.set_angular_velocity(body, angular)?;
                affected += 1;
            }
        }

        Ok(affected)
    }
}

/// Classifies a center of mass against a linear field's bounds.
///
/// The surface band spans `margin` above the top edge (+y) and the full width of the field.
pub fn linear_zone(bounds: &Aabb, com: Vector2, margin: f32) -> FieldZone {
    if bounds.contains_point(com) {
        return FieldZone::Inside;
    }
    let in_band = com.x >= bounds.min.x
        && com.x <= bounds.max.x
        && com.y > bounds.max.y
        && com.y <= bounds.max.y + margin;
    if in_band {
        FieldZone::Surface
    } else {
        FieldZone::Outside
    }
}

/// Fraction of velocity kept after one step of damping
#[inline]
pub fn damping_factor(damping: f32, scale: f32, dt: f32) -> f32 {
    if damping > 0.0 {
        (1.0 - damping * scale * dt).max(0.0)
    } else {
        1.0
    }
}

/// New linear and angular velocity of a body in a linear field, or `None`
/// when the body is outside the field and its surface band
pub fn linear_response(
    velocity: Vector2,
    angular: f32,
    force: Vector2,
    damping: f32,
    zone: FieldZone,
    config: &ForceFieldConfig,
    dt: f32,
) -> Option<(Vector2, f32)> {
    match zone {
        FieldZone::Inside => {
            let keep = damping_factor(damping, config.in_field_damping_scale, dt);
            Some(((velocity + force * dt) * keep, angular * keep))
        }
        FieldZone::Surface if damping > 0.0 => {
            let keep = damping_factor(damping, config.surface_damping_scale, dt);
            Some((velocity * keep, angular * keep))
        }
        _ => None,
    }
}

/// Acceleration a radial field imparts at `point`.
///
/// Magnitude goes linearly from `force_at_center` to `force_at_edge` with the
/// normalized distance from `center`; no force at the exact center.
pub fn radial_force(center: Vector2, radius: f32, force_at_center: f32, force_at_edge: f32, point: Vector2) -> Vector2 {
    let offset = point - center;
    let distance = offset.length();
    if distance < EPSILON {
        return Vector2::zero();
    }
    let t = if radius > EPSILON { (distance / radius).clamp(0.0, 1.0) } else { 1.0 };
    offset * (lerp(force_at_center, force_at_edge, t) / distance)
}
