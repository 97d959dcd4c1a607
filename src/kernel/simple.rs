use std::collections::{BTreeMap, BTreeSet};

use crate::error::PhysicsError;
use crate::geometry::LINEAR_SLOP;
use crate::kernel::body::{BodyDef, BodyType, KernelBody};
use crate::kernel::collision::{self, Manifold};
use crate::kernel::joint::{Joint, JointDef};
use crate::kernel::shape::{Material, ShapeDef, ShapeFlags, ShapeGeometry, WorldGeometry};
use crate::kernel::{
    ContactBeginEvent, KernelBodyHandle, KernelJointHandle, KernelShapeHandle, PhysicsKernel,
    SensorTouchEvent,
};
use crate::math::{Aabb, Transform, Vector2};
use crate::Result;

/// Fraction of the remaining penetration removed per position iteration
const POSITION_BAUMGARTE: f32 = 0.2;

/// Largest positional correction applied to a single contact in one iteration
const MAX_LINEAR_CORRECTION: f32 = 0.2;

#[derive(Debug, Clone)]
struct KernelShape {
    body: KernelBodyHandle,
    geometry: ShapeGeometry,
    material: Material,
    flags: ShapeFlags,
}

#[derive(Debug, Clone)]
struct ContactConstraint {
    body_a: usize,
    body_b: usize,
    normal: Vector2,
    point: Vector2,
    penetration: f32,
    friction: f32,
    velocity_bias: f32,
    normal_mass: f32,
    tangent_mass: f32,
    normal_impulse: f32,
    tangent_impulse: f32,
}

/// A compact 2D rigid-body kernel.
///
/// Circles, convex polygons and segments; single-point contacts resolved by a
/// sequential impulse solver with positional correction; revolute and mouse
/// joints. Bodies live in a map ordered by handle, so iteration order is
/// creation order and two kernels fed the same calls evolve identically.
#[derive(Debug)]
pub struct SimpleKernel {
    gravity: Vector2,
    velocity_iterations: u32,
    position_iterations: u32,
    restitution_threshold: f32,

    bodies: BTreeMap<KernelBodyHandle, KernelBody>,
    shapes: BTreeMap<KernelShapeHandle, KernelShape>,
    joints: BTreeMap<KernelJointHandle, Joint>,
    next_body: u32,
    next_shape: u32,
    next_joint: u32,

    touching: BTreeSet<(KernelShapeHandle, KernelShapeHandle)>,
    sensor_contacts: BTreeSet<(KernelShapeHandle, KernelShapeHandle)>,

    contact_begin: Vec<ContactBeginEvent>,
    sensor_begin: Vec<SensorTouchEvent>,
    sensor_end: Vec<SensorTouchEvent>,
}

impl Default for SimpleKernel {
    fn default() -> Self {
        Self::new(Vector2::new(0.0, -10.0))
    }
}

impl SimpleKernel {
    /// Creates an empty kernel with the given gravity
    pub fn new(gravity: Vector2) -> Self {
        Self {
            gravity,
            velocity_iterations: 8,
            position_iterations: 3,
            restitution_threshold: 1.0,
            bodies: BTreeMap::new(),
            shapes: BTreeMap::new(),
            joints: BTreeMap::new(),
            next_body: 0,
            next_shape: 1,
            next_joint: 1,
            touching: BTreeSet::new(),
            sensor_contacts: BTreeSet::new(),
            contact_begin: Vec::new(),
            sensor_begin: Vec::new(),
            sensor_end: Vec::new(),
        }
    }

    /// Sets solver iteration counts and the closing speed below which restitution is ignored
    pub fn with_solver(mut self, velocity_iterations: u32, position_iterations: u32, restitution_threshold: f32) -> Self {
        self.velocity_iterations = velocity_iterations.max(1);
        self.position_iterations = position_iterations;
        self.restitution_threshold = restitution_threshold.max(0.0);
        self
    }

    fn body(&self, handle: KernelBodyHandle) -> Result<&KernelBody> {
        self.bodies
            .get(&handle)
            .ok_or_else(|| PhysicsError::ResourceNotFound(format!("Kernel body {:?} not found", handle)))
    }

    fn body_mut(&mut self, handle: KernelBodyHandle) -> Result<&mut KernelBody> {
        self.bodies
            .get_mut(&handle)
            .ok_or_else(|| PhysicsError::ResourceNotFound(format!("Kernel body {:?} not found", handle)))
    }

    fn shape(&self, handle: KernelShapeHandle) -> Result<&KernelShape> {
        self.shapes
            .get(&handle)
            .ok_or_else(|| PhysicsError::ResourceNotFound(format!("Kernel shape {:?} not found", handle)))
    }

    fn world_geometry(&self, shape: &KernelShape) -> Option<WorldGeometry> {
        let body = self.bodies.get(&shape.body)?;
        Some(shape.geometry.to_world(&body.transform()))
    }

    fn update_mass(&mut self, handle: KernelBodyHandle) -> Result<()> {
        let parts: Vec<_> = self
            .shapes
            .values()
            .filter(|s| s.body == handle && !s.flags.contains(ShapeFlags::SENSOR))
            .map(|s| s.geometry.mass_data(s.material.density))
            .collect();
        self.body_mut(handle)?.reset_mass(&parts);
        Ok(())
    }

    fn sub_step(&mut self, dt: f32) {
        let gravity = self.gravity;
        for body in self.bodies.values_mut() {
            body.integrate_velocity(gravity, dt);
        }

        // Solver constraints index into this creation-ordered snapshot of the live bodies
        let order: Vec<KernelBodyHandle> = self.bodies.keys().copied().collect();
        let mut contacts = self.collide(&order);

        for joint in self.joints.values_mut() {
            joint.reset_impulse();
        }

        let mut dense: Vec<KernelBody> = std::mem::take(&mut self.bodies).into_values().collect();
        let slot = |handle: KernelBodyHandle| order.binary_search(&handle).ok();

        for _ in 0..self.velocity_iterations {
            for joint in self.joints.values_mut() {
                let (a, b) = joint.bodies();
                let (Some(i), Some(j)) = (slot(a), slot(b)) else { continue };
                if let Some((body_a, body_b)) = pair_mut(&mut dense, i, j) {
                    joint.solve_velocity(body_a, body_b, dt);
                }
            }

            for contact in contacts.iter_mut() {
                if let Some((a, b)) = pair_mut(&mut dense, contact.body_a, contact.body_b) {
                    solve_contact(contact, a, b);
                }
            }
        }

        for body in dense.iter_mut() {
            body.integrate_position(dt);
        }

        for _ in 0..self.position_iterations {
            for contact in contacts.iter_mut() {
                if let Some((a, b)) = pair_mut(&mut dense, contact.body_a, contact.body_b) {
                    correct_position(contact, a, b);
                }
            }
        }

        self.bodies = order.into_iter().zip(dense).collect();
    }

    /// Narrow phase over every candidate pair; records begin-touch events and builds solver constraints
    fn collide(&mut self, order: &[KernelBodyHandle]) -> Vec<ContactConstraint> {
        let candidates: Vec<(KernelShapeHandle, &KernelShape, WorldGeometry, Aabb)> = self
            .shapes
            .iter()
            .filter(|(_, s)| !s.flags.contains(ShapeFlags::SENSOR))
            .filter_map(|(h, s)| {
                let geometry = self.world_geometry(s)?;
                let aabb = geometry.aabb();
                Some((*h, s, geometry, aabb))
            })
            .collect();

        let connected: BTreeSet<(KernelBodyHandle, KernelBodyHandle)> = self
            .joints
            .values()
            .map(|j| ordered(j.bodies()))
            .collect();

        let mut touching = BTreeSet::new();
        let mut begin_events = Vec::new();
        let mut constraints = Vec::new();

        for (i, (handle_a, shape_a, geom_a, aabb_a)) in candidates.iter().enumerate() {
            for (handle_b, shape_b, geom_b, aabb_b) in candidates.iter().skip(i + 1) {
                if shape_a.body == shape_b.body || !aabb_a.intersects(aabb_b) {
                    continue;
                }
                if connected.contains(&ordered((shape_a.body, shape_b.body))) {
                    continue;
                }

                let (Some(body_a), Some(body_b)) = (self.bodies.get(&shape_a.body), self.bodies.get(&shape_b.body))
                else {
                    continue;
                };
                let (Ok(index_a), Ok(index_b)) = (order.binary_search(&shape_a.body), order.binary_search(&shape_b.body))
                else {
                    continue;
                };
                if !body_a.is_dynamic() && !body_b.is_dynamic() {
                    continue;
                }

                let Some(manifold) = collision::collide(geom_a, geom_b) else {
                    continue;
                };

                let key = (*handle_a, *handle_b);
                touching.insert(key);

                let velocity_a = body_a.point_velocity(manifold.point);
                let velocity_b = body_b.point_velocity(manifold.point);

                let wants_events = shape_a.flags.contains(ShapeFlags::CONTACT_EVENTS)
                    && shape_b.flags.contains(ShapeFlags::CONTACT_EVENTS);
                if wants_events && !self.touching.contains(&key) {
                    begin_events.push(ContactBeginEvent {
                        shape_a: *handle_a,
                        shape_b: *handle_b,
                        body_a: shape_a.body,
                        body_b: shape_b.body,
                        point: manifold.point,
                        normal: manifold.normal,
                        velocity_a,
                        velocity_b,
                    });
                }

                constraints.push(prepare_contact(
                    &manifold,
                    (index_a, body_a, &shape_a.material),
                    (index_b, body_b, &shape_b.material),
                    self.restitution_threshold,
                ));
            }
        }

        self.touching = touching;
        self.contact_begin.extend(begin_events);
        constraints
    }

    fn sensor_visitors(&self, sensor_handle: KernelShapeHandle, sensor: &KernelShape, events_only: bool) -> Vec<KernelShapeHandle> {
        let Some(sensor_geometry) = self.world_geometry(sensor) else {
            return Vec::new();
        };

        self.shapes
            .iter()
            .filter(|(h, s)| {
                **h != sensor_handle
                    && s.body != sensor.body
                    && !s.flags.contains(ShapeFlags::SENSOR)
                    && (!events_only || s.flags.contains(ShapeFlags::SENSOR_EVENTS))
            })
            .filter(|(_, s)| {
                self.body(s.body)
                    .map(|b| b.body_type != BodyType::Static)
                    .unwrap_or(false)
            })
            .filter_map(|(h, s)| {
                let geometry = self.world_geometry(s)?;
                collision::overlaps(&sensor_geometry, &geometry).then_some(*h)
            })
            .collect()
    }

    fn update_sensors(&mut self) {
        let mut current = BTreeSet::new();
        for (handle, shape) in self.shapes.iter() {
            let is_reporting_sensor = shape.flags.contains(ShapeFlags::SENSOR | ShapeFlags::SENSOR_EVENTS);
            if !is_reporting_sensor {
                continue;
            }
            for visitor in self.sensor_visitors(*handle, shape, true) {
                current.insert((*handle, visitor));
            }
        }

        for &(sensor_shape, visitor_shape) in current.difference(&self.sensor_contacts) {
            self.sensor_begin.push(SensorTouchEvent { sensor_shape, visitor_shape });
        }
        for &(sensor_shape, visitor_shape) in self.sensor_contacts.difference(&current) {
            self.sensor_end.push(SensorTouchEvent { sensor_shape, visitor_shape });
        }

        self.sensor_contacts = current;
    }

    fn forget_shape(&mut self, handle: KernelShapeHandle) {
        self.shapes.remove(&handle);
        self.touching.retain(|(a, b)| *a != handle && *b != handle);
        self.sensor_contacts.retain(|(a, b)| *a != handle && *b != handle);
    }
}

impl PhysicsKernel for SimpleKernel {
    fn set_gravity(&mut self, gravity: Vector2) {
        self.gravity = gravity;
    }

    fn gravity(&self) -> Vector2 {
        self.gravity
    }

    fn create_body(&mut self, def: &BodyDef) -> KernelBodyHandle {
        let handle = KernelBodyHandle(self.next_body);
        self.next_body += 1;
        self.bodies.insert(handle, KernelBody::new(def));
        handle
    }

    fn destroy_body(&mut self, body: KernelBodyHandle) -> Result<()> {
        let shapes = self.body(body)?.shapes.clone();

        let attached: Vec<KernelJointHandle> = self
            .joints
            .iter()
            .filter(|(_, j)| {
                let (a, b) = j.bodies();
                a == body || b == body
            })
            .map(|(h, _)| *h)
            .collect();
        for joint in attached {
            self.joints.remove(&joint);
        }

        for shape in shapes {
            self.forget_shape(shape);
        }

        self.bodies.remove(&body);
        Ok(())
    }

    fn body_type(&self, body: KernelBodyHandle) -> Result<BodyType> {
        Ok(self.body(body)?.body_type)
    }

    fn transform(&self, body: KernelBodyHandle) -> Result<Transform> {
        Ok(self.body(body)?.transform())
    }

    fn set_transform(&mut self, body: KernelBodyHandle, position: Vector2, angle: f32) -> Result<()> {
        self.body_mut(body)?.set_transform(position, angle);
        Ok(())
    }

    fn world_center(&self, body: KernelBodyHandle) -> Result<Vector2> {
        Ok(self.body(body)?.center)
    }

    fn linear_velocity(&self, body: KernelBodyHandle) -> Result<Vector2> {
        Ok(self.body(body)?.linear_velocity)
    }

    fn set_linear_velocity(&mut self, body: KernelBodyHandle, velocity: Vector2) -> Result<()> {
        let body = self.body_mut(body)?;
        if body.body_type != BodyType::Static {
            body.linear_velocity = velocity;
        }
        Ok(())
    }

    fn angular_velocity(&self, body: KernelBodyHandle) -> Result<f32> {
        Ok(self.body(body)?.angular_velocity)
    }

    fn set_angular_velocity(&mut self, body: KernelBodyHandle, velocity: f32) -> Result<()> {
        let body = self.body_mut(body)?;
        if body.body_type != BodyType::Static {
            body.angular_velocity = velocity;
        }
        Ok(())
    }

    fn apply_force(&mut self, body: KernelBodyHandle, force: Vector2) -> Result<()> {
        let body = self.body_mut(body)?;
        if body.is_dynamic() {
            body.force += force;
        }
        Ok(())
    }

    fn apply_torque(&mut self, body: KernelBodyHandle, torque: f32) -> Result<()> {
        let body = self.body_mut(body)?;
        if body.is_dynamic() {
            body.torque += torque;
        }
        Ok(())
    }

    fn apply_linear_impulse(&mut self, body: KernelBodyHandle, impulse: Vector2) -> Result<()> {
        let body = self.body_mut(body)?;
        if body.is_dynamic() {
            body.linear_velocity += impulse * body.inv_mass;
        }
        Ok(())
    }

    fn create_shape(&mut self, body: KernelBodyHandle, def: &ShapeDef) -> Result<KernelShapeHandle> {
        if !def.geometry.is_valid() {
            return Err(PhysicsError::InvalidParameter(format!("Degenerate shape geometry {:?}", def.geometry)));
        }

        let handle = KernelShapeHandle(self.next_shape);
        self.body_mut(body)?.shapes.push(handle);
        self.next_shape += 1;

        self.shapes.insert(handle, KernelShape {
            body,
            geometry: def.geometry.clone(),
            material: def.material,
            flags: def.flags,
        });

        if !def.is_sensor() {
            self.update_mass(body)?;
        }

        Ok(handle)
    }

    fn shape_body(&self, shape: KernelShapeHandle) -> Result<KernelBodyHandle> {
        Ok(self.shape(shape)?.body)
    }

    fn body_shapes(&self, body: KernelBodyHandle) -> Result<Vec<KernelShapeHandle>> {
        Ok(self.body(body)?.shapes.clone())
    }

    fn shape_geometry(&self, shape: KernelShapeHandle) -> Result<ShapeGeometry> {
        Ok(self.shape(shape)?.geometry.clone())
    }

    fn shape_material(&self, shape: KernelShapeHandle) -> Result<Material> {
        Ok(self.shape(shape)?.material)
    }

    fn shape_flags(&self, shape: KernelShapeHandle) -> Result<ShapeFlags> {
        Ok(self.shape(shape)?.flags)
    }

    fn shape_aabb(&self, shape: KernelShapeHandle) -> Result<Aabb> {
        let shape = self.shape(shape)?;
        let transform = self.body(shape.body)?.transform();
        Ok(shape.geometry.to_world(&transform).aabb())
    }

    fn create_joint(&mut self, def: &JointDef) -> Result<KernelJointHandle> {
        let joint = match *def {
            JointDef::Revolute { body_a, body_b, anchor } => Joint::Revolute {
                body_a,
                body_b,
                local_anchor_a: self.body(body_a)?.transform().inverse_apply(anchor),
                local_anchor_b: self.body(body_b)?.transform().inverse_apply(anchor),
            },
            JointDef::Mouse { ground, body, target, max_force, hertz, damping_ratio } => {
                self.body(ground)?;
                Joint::Mouse {
                    ground,
                    body,
                    local_anchor: self.body(body)?.transform().inverse_apply(target),
                    target,
                    max_force,
                    hertz,
                    damping_ratio,
                    impulse: Vector2::zero(),
                }
            }
        };

        let handle = KernelJointHandle(self.next_joint);
        self.next_joint += 1;
        self.joints.insert(handle, joint);
        Ok(handle)
    }

    fn destroy_joint(&mut self, joint: KernelJointHandle) -> Result<()> {
        self.joints
            .remove(&joint)
            .map(|_| ())
            .ok_or_else(|| PhysicsError::ResourceNotFound(format!("Kernel joint {:?} not found", joint)))
    }

    fn joint_bodies(&self, joint: KernelJointHandle) -> Result<(KernelBodyHandle, KernelBodyHandle)> {
        self.joints
            .get(&joint)
            .map(Joint::bodies)
            .ok_or_else(|| PhysicsError::ResourceNotFound(format!("Kernel joint {:?} not found", joint)))
    }

    fn set_mouse_target(&mut self, joint: KernelJointHandle, new_target: Vector2) -> Result<()> {
        match self.joints.get_mut(&joint) {
            Some(Joint::Mouse { target, .. }) => {
                *target = new_target;
                Ok(())
            }
            Some(_) => Err(PhysicsError::InvalidParameter(format!("Kernel joint {:?} is not a mouse joint", joint))),
            None => Err(PhysicsError::ResourceNotFound(format!("Kernel joint {:?} not found", joint))),
        }
    }

    fn step(&mut self, dt: f32, sub_steps: u32) {
        self.contact_begin.clear();
        self.sensor_begin.clear();
        self.sensor_end.clear();

        if dt <= 0.0 {
            return;
        }

        let count = sub_steps.max(1);
        let h = dt / count as f32;
        for _ in 0..count {
            self.sub_step(h);
        }

        for body in self.bodies.values_mut() {
            body.clear_forces();
        }

        self.update_sensors();
    }

    fn contact_begin_events(&self) -> &[ContactBeginEvent] {
        &self.contact_begin
    }

    fn sensor_begin_events(&self) -> &[SensorTouchEvent] {
        &self.sensor_begin
    }

    fn sensor_end_events(&self) -> &[SensorTouchEvent] {
        &self.sensor_end
    }

    fn query_aabb(&self, aabb: &Aabb) -> Vec<KernelShapeHandle> {
        self.shapes
            .iter()
            .filter_map(|(h, s)| {
                let geometry = self.world_geometry(s)?;
                geometry.aabb().intersects(aabb).then_some(*h)
            })
            .collect()
    }

    fn sensor_overlaps(&self, sensor: KernelShapeHandle, max_count: usize) -> Result<Vec<KernelShapeHandle>> {
        let shape = self.shape(sensor)?;
        let mut visitors = self.sensor_visitors(sensor, shape, false);
        visitors.truncate(max_count);
        Ok(visitors)
    }
}

#[inline]
fn ordered<T: Ord>((a, b): (T, T)) -> (T, T) {
    if a <= b { (a, b) } else { (b, a) }
}

/// Two distinct mutable slots at once
fn pair_mut<T>(slots: &mut [T], i: usize, j: usize) -> Option<(&mut T, &mut T)> {
    if i == j || i >= slots.len() || j >= slots.len() {
        return None;
    }

    let (lo, hi) = if i < j { (i, j) } else { (j, i) };
    let (left, right) = slots.split_at_mut(hi);
    let first = &mut left[lo];
    let second = &mut right[0];

    if i < j { Some((first, second)) } else { Some((second, first)) }
}

fn prepare_contact(
    manifold: &Manifold,
    (index_a, a, material_a): (usize, &KernelBody, &Material),
    (index_b, b, material_b): (usize, &KernelBody, &Material),
    restitution_threshold: f32,
) -> ContactConstraint {
    let n = manifold.normal;
    let t = n.perpendicular();
    let r_a = manifold.point - a.center;
    let r_b = manifold.point - b.center;

    let effective_mass = |axis: Vector2| {
        let ra_x = r_a.cross(&axis);
        let rb_x = r_b.cross(&axis);
        let k = a.inv_mass + b.inv_mass + a.inv_inertia * ra_x * ra_x + b.inv_inertia * rb_x * rb_x;
        if k > 0.0 { 1.0 / k } else { 0.0 }
    };

    let restitution = material_a.restitution.max(material_b.restitution);
    let friction = material_a.friction.min(material_b.friction);

    let relative = a.point_velocity(manifold.point) - b.point_velocity(manifold.point);
    let normal_speed = relative.dot(&n);
    let velocity_bias = if normal_speed < -restitution_threshold {
        -restitution * normal_speed
    } else {
        0.0
    };

    ContactConstraint {
        body_a: index_a,
        body_b: index_b,
        normal: n,
        point: manifold.point,
        penetration: manifold.penetration,
        friction,
        velocity_bias,
        normal_mass: effective_mass(n),
        tangent_mass: effective_mass(t),
        normal_impulse: 0.0,
        tangent_impulse: 0.0,
    }
}

fn apply_contact_impulse(c: &ContactConstraint, a: &mut KernelBody, b: &mut KernelBody, impulse: Vector2) {
    let r_a = c.point - a.center;
    let r_b = c.point - b.center;
    a.linear_velocity += impulse * a.inv_mass;
    a.angular_velocity += a.inv_inertia * r_a.cross(&impulse);
    b.linear_velocity -= impulse * b.inv_mass;
    b.angular_velocity -= b.inv_inertia * r_b.cross(&impulse);
}

fn solve_contact(c: &mut ContactConstraint, a: &mut KernelBody, b: &mut KernelBody) {
    let n = c.normal;
    let t = n.perpendicular();

    let relative = a.point_velocity(c.point) - b.point_velocity(c.point);
    let lambda = -c.normal_mass * (relative.dot(&n) - c.velocity_bias);
    let accumulated = (c.normal_impulse + lambda).max(0.0);
    let lambda = accumulated - c.normal_impulse;
    c.normal_impulse = accumulated;
    apply_contact_impulse(c, a, b, n * lambda);

    let relative = a.point_velocity(c.point) - b.point_velocity(c.point);
    let lambda_t = -c.tangent_mass * relative.dot(&t);
    let max_friction = c.friction * c.normal_impulse;
    let accumulated_t = (c.tangent_impulse + lambda_t).clamp(-max_friction, max_friction);
    let lambda_t = accumulated_t - c.tangent_impulse;
    c.tangent_impulse = accumulated_t;
    apply_contact_impulse(c, a, b, t * lambda_t);
}

fn correct_position(c: &mut ContactConstraint, a: &mut KernelBody, b: &mut KernelBody) {
    let total = a.inv_mass + b.inv_mass;
    if total <= 0.0 {
        return;
    }

    let correction = ((c.penetration - LINEAR_SLOP).max(0.0) * POSITION_BAUMGARTE).min(MAX_LINEAR_CORRECTION);
    if correction <= 0.0 {
        return;
    }

    a.center += c.normal * (correction * a.inv_mass / total);
    b.center -= c.normal * (correction * b.inv_mass / total);
    c.penetration -= correction;
}
