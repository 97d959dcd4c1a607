use nalgebra as na;

use crate::kernel::body::KernelBody;
use crate::kernel::KernelBodyHandle;
use crate::math::Vector2;

/// Position error feedback for the point constraint
const JOINT_BAUMGARTE: f32 = 0.2;

/// Describes a joint to create
#[derive(Debug, Clone, Copy)]
pub enum JointDef {
    /// Pins two bodies together at a shared world-space anchor
    Revolute {
        body_a: KernelBodyHandle,
        body_b: KernelBodyHandle,
        anchor: Vector2,
    },

    /// Drags a point of `body` towards a target with a soft spring.
    /// `ground` is a static body acting as the other side of the joint.
    Mouse {
        ground: KernelBodyHandle,
        body: KernelBodyHandle,
        target: Vector2,
        max_force: f32,
        hertz: f32,
        damping_ratio: f32,
    },
}

impl JointDef {
    pub fn bodies(&self) -> (KernelBodyHandle, KernelBodyHandle) {
        match *self {
            Self::Revolute { body_a, body_b, .. } => (body_a, body_b),
            Self::Mouse { ground, body, .. } => (ground, body),
        }
    }
}

#[derive(Debug, Clone)]
pub(crate) enum Joint {
    Revolute {
        body_a: KernelBodyHandle,
        body_b: KernelBodyHandle,
        local_anchor_a: Vector2,
        local_anchor_b: Vector2,
    },
    Mouse {
        ground: KernelBodyHandle,
        body: KernelBodyHandle,
        local_anchor: Vector2,
        target: Vector2,
        max_force: f32,
        hertz: f32,
        damping_ratio: f32,
        impulse: Vector2,
    },
}

impl Joint {
    pub fn bodies(&self) -> (KernelBodyHandle, KernelBodyHandle) {
        match self {
            Self::Revolute { body_a, body_b, .. } => (*body_a, *body_b),
            Self::Mouse { ground, body, .. } => (*ground, *body),
        }
    }

    pub fn reset_impulse(&mut self) {
        if let Self::Mouse { impulse, .. } = self {
            *impulse = Vector2::zero();
        }
    }

    /// One velocity iteration. `a` and `b` follow the order of [`Joint::bodies`].
    pub fn solve_velocity(&mut self, a: &mut KernelBody, b: &mut KernelBody, dt: f32) {
        match self {
            Self::Revolute { local_anchor_a, local_anchor_b, .. } => {
                let r_a = a.transform().rotate(*local_anchor_a - a.local_center);
                let r_b = b.transform().rotate(*local_anchor_b - b.local_center);
                let error = (b.center + r_b) - (a.center + r_a);

                let cdot = b.point_velocity(b.center + r_b) - a.point_velocity(a.center + r_a);
                let bias = error * (JOINT_BAUMGARTE / dt);

                let k = point_mass_matrix(a, r_a, b, r_b);
                let Some(k_inv) = k.try_inverse() else {
                    return;
                };

                let rhs = -(cdot + bias).to_nalgebra();
                let impulse = Vector2::from_nalgebra(&(k_inv * rhs));
                apply_pair_impulse(a, r_a, b, r_b, impulse);
            }
            Self::Mouse { local_anchor, target, max_force, hertz, damping_ratio, impulse, .. } => {
                if !b.is_dynamic() || b.mass <= 0.0 {
                    return;
                }

                let omega = 2.0 * std::f32::consts::PI * *hertz;
                let damping = 2.0 * b.mass * *damping_ratio * omega;
                let stiffness = b.mass * omega * omega;
                let gamma_inv = dt * (damping + dt * stiffness);
                let gamma = if gamma_inv > 0.0 { 1.0 / gamma_inv } else { 0.0 };
                let beta = dt * stiffness * gamma;

                let r = b.transform().rotate(*local_anchor - b.local_center);
                let error = (b.center + r) - *target;
                let cdot = b.point_velocity(b.center + r);

                let mut k = body_point_mass(b, r);
                k[(0, 0)] += gamma;
                k[(1, 1)] += gamma;
                let Some(k_inv) = k.try_inverse() else {
                    return;
                };

                let rhs = -(cdot + error * beta + *impulse * gamma).to_nalgebra();
                let delta = Vector2::from_nalgebra(&(k_inv * rhs));

                let old = *impulse;
                *impulse += delta;
                let max_impulse = dt * *max_force;
                if impulse.length_squared() > max_impulse * max_impulse {
                    *impulse = impulse.normalize() * max_impulse;
                }
                let applied = *impulse - old;

                b.linear_velocity += applied * b.inv_mass;
                b.angular_velocity += b.inv_inertia * r.cross(&applied);
            }
        }
    }
}

/// Effective mass matrix of a point on a single body
fn body_point_mass(body: &KernelBody, r: Vector2) -> na::Matrix2<f32> {
    let m = body.inv_mass;
    let i = body.inv_inertia;
    na::Matrix2::new(
        m + i * r.y * r.y, -i * r.x * r.y,
        -i * r.x * r.y, m + i * r.x * r.x,
    )
}

#[inline]
fn point_mass_matrix(a: &KernelBody, r_a: Vector2, b: &KernelBody, r_b: Vector2) -> na::Matrix2<f32> {
    body_point_mass(a, r_a) + body_point_mass(b, r_b)
}

fn apply_pair_impulse(a: &mut KernelBody, r_a: Vector2, b: &mut KernelBody, r_b: Vector2, impulse: Vector2) {
    a.linear_velocity -= impulse * a.inv_mass;
    a.angular_velocity -= a.inv_inertia * r_a.cross(&impulse);
    b.linear_velocity += impulse * b.inv_mass;
    b.angular_velocity += b.inv_inertia * r_b.cross(&impulse);
}
