//! The rigid-body kernel the world facade drives.
//!
//! [`PhysicsKernel`] is the contract the facade relies on: body, shape and joint
//! lifecycle, transform and velocity access, per-step begin-touch contact and
//! sensor events, AABB and sensor-overlap queries, and hull computation.
//! [`SimpleKernel`] is the bundled implementation.

mod body;
mod shape;
mod collision;
mod joint;
mod simple;

pub use self::body::{BodyDef, BodyType};
pub use self::shape::{Material, ShapeDef, ShapeFlags, ShapeGeometry};
pub use self::joint::JointDef;
pub use self::simple::SimpleKernel;

use crate::math::{Aabb, Transform, Vector2};
use crate::Result;

/// Opaque kernel handle for a body
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct KernelBodyHandle(pub(crate) u32);

/// Opaque kernel handle for a shape attached to a body
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct KernelShapeHandle(pub(crate) u32);

/// Opaque kernel handle for a joint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct KernelJointHandle(pub(crate) u32);

/// Two shapes started touching during the last step
#[derive(Debug, Clone, Copy)]
pub struct ContactBeginEvent {
    pub shape_a: KernelShapeHandle,
    pub shape_b: KernelShapeHandle,
    pub body_a: KernelBodyHandle,
    pub body_b: KernelBodyHandle,

    /// World-space contact point
    pub point: Vector2,

    /// Contact normal, pointing from body B towards body A
    pub normal: Vector2,

    /// Velocity of body A at the contact point, before the contact was resolved
    pub velocity_a: Vector2,

    /// Velocity of body B at the contact point, before the contact was resolved
    pub velocity_b: Vector2,
}

/// A shape entered or left a sensor shape during the last step
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SensorTouchEvent {
    pub sensor_shape: KernelShapeHandle,
    pub visitor_shape: KernelShapeHandle,
}

/// Services the world facade needs from a rigid-body kernel.
///
/// Handle lookups fail with [`crate::error::PhysicsError::ResourceNotFound`]
/// when the handle was never issued or has been destroyed.
pub trait PhysicsKernel: Send + 'static {
    fn set_gravity(&mut self, gravity: Vector2);

    fn gravity(&self) -> Vector2;

    fn create_body(&mut self, def: &BodyDef) -> KernelBodyHandle;

    /// Destroys a body together with its shapes and any joint attached to it
    fn destroy_body(&mut self, body: KernelBodyHandle) -> Result<()>;

    fn body_type(&self, body: KernelBodyHandle) -> Result<BodyType>;

    /// Transform of the body origin
    fn transform(&self, body: KernelBodyHandle) -> Result<Transform>;

    fn set_transform(&mut self, body: KernelBodyHandle, position: Vector2, angle: f32) -> Result<()>;

    /// World-space center of mass
    fn world_center(&self, body: KernelBodyHandle) -> Result<Vector2>;

    fn linear_velocity(&self, body: KernelBodyHandle) -> Result<Vector2>;

    fn set_linear_velocity(&mut self, body: KernelBodyHandle, velocity: Vector2) -> Result<()>;

    fn angular_velocity(&self, body: KernelBodyHandle) -> Result<f32>;

    fn set_angular_velocity(&mut self, body: KernelBodyHandle, velocity: f32) -> Result<()>;

    /// Force at the center of mass, consumed by the next step
    fn apply_force(&mut self, body: KernelBodyHandle, force: Vector2) -> Result<()>;

    /// Torque, consumed by the next step
    fn apply_torque(&mut self, body: KernelBodyHandle, torque: f32) -> Result<()>;

    /// Instantaneous impulse at the center of mass
    fn apply_linear_impulse(&mut self, body: KernelBodyHandle, impulse: Vector2) -> Result<()>;

    fn create_shape(&mut self, body: KernelBodyHandle, def: &ShapeDef) -> Result<KernelShapeHandle>;

    fn shape_body(&self, shape: KernelShapeHandle) -> Result<KernelBodyHandle>;

    fn body_shapes(&self, body: KernelBodyHandle) -> Result<Vec<KernelShapeHandle>>;

    /// Shape geometry in the owning body's local frame
    fn shape_geometry(&self, shape: KernelShapeHandle) -> Result<ShapeGeometry>;

    fn shape_material(&self, shape: KernelShapeHandle) -> Result<Material>;

    fn shape_flags(&self, shape: KernelShapeHandle) -> Result<ShapeFlags>;

    /// World-space bounds of a shape
    fn shape_aabb(&self, shape: KernelShapeHandle) -> Result<Aabb>;

    fn create_joint(&mut self, def: &JointDef) -> Result<KernelJointHandle>;

    fn destroy_joint(&mut self, joint: KernelJointHandle) -> Result<()>;

    fn joint_bodies(&self, joint: KernelJointHandle) -> Result<(KernelBodyHandle, KernelBodyHandle)>;

    fn set_mouse_target(&mut self, joint: KernelJointHandle, target: Vector2) -> Result<()>;

    /// Advances the simulation by `dt`, split into `sub_steps` solver passes
    fn step(&mut self, dt: f32, sub_steps: u32);

    /// Contacts that began during the last step
    fn contact_begin_events(&self) -> &[ContactBeginEvent];

    /// Sensor overlaps that began during the last step
    fn sensor_begin_events(&self) -> &[SensorTouchEvent];

    /// Sensor overlaps that ended during the last step
    fn sensor_end_events(&self) -> &[SensorTouchEvent];

    /// Shapes whose bounds overlap `aabb`
    fn query_aabb(&self, aabb: &Aabb) -> Vec<KernelShapeHandle>;

    /// Shapes currently overlapping a sensor shape, at most `max_count` of them
    fn sensor_overlaps(&self, sensor: KernelShapeHandle, max_count: usize) -> Result<Vec<KernelShapeHandle>>;

    /// Convex hull of a point set; empty when the points are degenerate
    fn compute_hull(&self, points: &[Vector2]) -> Vec<Vector2> {
        crate::geometry::convex_hull(points)
    }
}
