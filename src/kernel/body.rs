use crate::kernel::KernelShapeHandle;
use crate::kernel::shape::MassData;
use crate::math::{Transform, Vector2};

#[cfg(feature = "serialize")]
use serde::{Serialize, Deserialize};

/// Type of body, determining how it behaves in the simulation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serialize", derive(Serialize, Deserialize))]
pub enum BodyType {
    /// Never moves; infinite mass
    Static,

    /// Moved by its velocity only; infinite mass
    Kinematic,

    /// Fully simulated
    Dynamic,
}

/// Describes a body to create
#[derive(Debug, Clone, Copy)]
pub struct BodyDef {
    pub body_type: BodyType,
    pub position: Vector2,
    pub angle: f32,
    pub linear_velocity: Vector2,
    pub angular_velocity: f32,
}

impl BodyDef {
    pub fn new(body_type: BodyType, position: Vector2, angle: f32) -> Self {
        Self {
            body_type,
            position,
            angle,
            linear_velocity: Vector2::zero(),
            angular_velocity: 0.0,
        }
    }
}

/// Kernel-side body state. Velocities refer to the center of mass.
#[derive(Debug, Clone)]
pub(crate) struct KernelBody {
    pub body_type: BodyType,

    /// World-space center of mass
    pub center: Vector2,

    /// Center of mass in the body frame
    pub local_center: Vector2,

    pub angle: f32,
    pub linear_velocity: Vector2,
    pub angular_velocity: f32,

    pub mass: f32,
    pub inv_mass: f32,
    pub inv_inertia: f32,

    pub force: Vector2,
    pub torque: f32,

    pub shapes: Vec<KernelShapeHandle>,
}

impl KernelBody {
    pub fn new(def: &BodyDef) -> Self {
        let mut body = Self {
            body_type: def.body_type,
            center: def.position,
            local_center: Vector2::zero(),
            angle: def.angle,
            linear_velocity: Vector2::zero(),
            angular_velocity: 0.0,
            mass: 0.0,
            inv_mass: 0.0,
            inv_inertia: 0.0,
            force: Vector2::zero(),
            torque: 0.0,
            shapes: Vec::new(),
        };

        if def.body_type != BodyType::Static {
            body.linear_velocity = def.linear_velocity;
            body.angular_velocity = def.angular_velocity;
        }

        body.reset_mass(&[]);
        body
    }

    #[inline]
    pub fn is_dynamic(&self) -> bool {
        self.body_type == BodyType::Dynamic
    }

    /// Transform of the body origin
    pub fn transform(&self) -> Transform {
        let origin = self.center - self.local_center.rotate(self.angle);
        Transform::new(origin, self.angle)
    }

    pub fn set_transform(&mut self, position: Vector2, angle: f32) {
        self.angle = angle;
        self.center = position + self.local_center.rotate(angle);
    }

    /// Velocity of a world-space point attached to the body
    #[inline]
    pub fn point_velocity(&self, point: Vector2) -> Vector2 {
        self.linear_velocity + Vector2::cross_scalar(self.angular_velocity, point - self.center)
    }

    /// Recomputes mass properties from the solid shapes, keeping the origin fixed
    pub fn reset_mass(&mut self, parts: &[MassData]) {
        let origin = self.transform().position;

        self.mass = 0.0;
        self.inv_mass = 0.0;
        self.inv_inertia = 0.0;
        self.local_center = Vector2::zero();

        if self.body_type != BodyType::Dynamic {
            self.center = origin;
            return;
        }

        let mut weighted_center = Vector2::zero();
        let mut inertia = 0.0;
        for part in parts {
            self.mass += part.mass;
            weighted_center += part.center * part.mass;
            inertia += part.inertia_about_origin;
        }

        if self.mass > 0.0 {
            self.local_center = weighted_center / self.mass;
            inertia -= self.mass * self.local_center.length_squared();
        } else {
            // Massless dynamic bodies still move
            self.mass = 1.0;
        }

        self.inv_mass = 1.0 / self.mass;
        self.inv_inertia = if inertia > 0.0 { 1.0 / inertia } else { 0.0 };
        self.center = origin + self.local_center.rotate(self.angle);
    }

    pub fn integrate_velocity(&mut self, gravity: Vector2, dt: f32) {
        if !self.is_dynamic() {
            return;
        }

        self.linear_velocity += (gravity + self.force * self.inv_mass) * dt;
        self.angular_velocity += self.torque * self.inv_inertia * dt;
    }

    pub fn integrate_position(&mut self, dt: f32) {
        if self.body_type == BodyType::Static {
            return;
        }

        self.center += self.linear_velocity * dt;
        self.angle += self.angular_velocity * dt;
    }

    pub fn clear_forces(&mut self) {
        self.force = Vector2::zero();
        self.torque = 0.0;
    }
}
