use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread;
use std::time::Duration;

use tracing::{trace, warn};

use crate::core::debug::DebugShape;
use crate::core::events::{LentCallbacks, StepEvent};
use crate::core::state::WorldState;
use crate::core::stepping::InFlightGuard;
use crate::core::{
    BodyId, CollisionHitEvent, ForceFieldId, FractureEvent, JointId, SensorEvent, SimulationConfig,
};
use crate::destruction::{self, DestructibleProperties};
use crate::forces::ForceField;
use crate::kernel::{BodyDef, BodyType, Material, PhysicsKernel, ShapeDef, ShapeGeometry, SimpleKernel};
use crate::math::{Transform, Vector2};
use crate::render::{FragmentLayerSink, LayerId};
use crate::Result;

/// Poll interval of [`PhysicsWorld::wait_for_step_complete`]
const STEP_POLL_INTERVAL: Duration = Duration::from_micros(200);

struct Shared<K: PhysicsKernel> {
    state: Mutex<WorldState<K>>,

    /// Held for a whole step, callbacks included, so steps never interleave
    stepping: Mutex<()>,

    /// Set while an async step is running; checked without taking the lock
    step_in_progress: AtomicBool,
}

impl<K: PhysicsKernel> Shared<K> {
    fn lock(&self) -> MutexGuard<'_, WorldState<K>> {
        // A panicking callback must not wedge the world
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn step(&self, dt: f32, sub_steps: u32) {
        let _stepping = self.stepping.lock().unwrap_or_else(PoisonError::into_inner);
        self.with_dispatch(|state| state.step(dt, sub_steps));
    }

    /// Runs `f` under the world lock, then feeds the events it raised to the
    /// callbacks with the lock released and publishes them to the polled lists
    fn with_dispatch<T>(&self, f: impl FnOnce(&mut WorldState<K>) -> T) -> T {
        let mut state = self.lock();
        let value = f(&mut state);
        let events = state.take_undelivered();
        if events.is_empty() || state.callbacks.is_empty() {
            state.publish(events);
            return value;
        }

        let lent = state.callbacks.lend();
        drop(state);

        let mut dispatch = Dispatch {
            shared: self,
            lent: Some(lent),
            events,
        };
        dispatch.run();
        value
    }
}

/// Callbacks on loan for one dispatch. Dropping it, on unwind too, returns
/// the callbacks and publishes the events.
struct Dispatch<'a, K: PhysicsKernel> {
    shared: &'a Shared<K>,
    lent: Option<LentCallbacks>,
    events: Vec<StepEvent>,
}

impl<K: PhysicsKernel> Dispatch<'_, K> {
    fn run(&mut self) {
        if let Some(lent) = self.lent.as_mut() {
            lent.dispatch(&self.events);
        }
    }
}

impl<K: PhysicsKernel> Drop for Dispatch<'_, K> {
    fn drop(&mut self) {
        let mut state = self.shared.lock();
        if let Some(lent) = self.lent.take() {
            state.callbacks.give_back(lent);
        }
        state.publish(std::mem::take(&mut self.events));
    }
}

/// Unwraps the result of a facade call whose failure means the caller broke
/// the API contract (unknown ID, bad timestep, bad vertex count)
#[track_caller]
fn contract<T>(result: Result<T>) -> T {
    match result {
        Ok(value) => value,
        Err(err) => panic!("{}", err),
    }
}

/// The physics world: bodies, joints, force fields and destructibles on top of
/// a rigid-body kernel.
///
/// Every method takes the world mutex for its duration, so a `PhysicsWorld` can
/// be cloned and shared between threads; clones refer to the same world.
/// Event callbacks run with the mutex released.
/// Passing an ID that is not (or no longer) in the world panics.
pub struct PhysicsWorld<K: PhysicsKernel = SimpleKernel> {
    shared: Arc<Shared<K>>,
}

impl<K: PhysicsKernel> Clone for PhysicsWorld<K> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl PhysicsWorld<SimpleKernel> {
    /// Creates a new physics world with default settings
    pub fn new() -> Self {
        Self::with_config(SimulationConfig::default())
    }

    /// Creates a new physics world with the given configuration.
    ///
    /// Panics if the configuration does not validate.
    pub fn with_config(config: SimulationConfig) -> Self {
        let kernel = SimpleKernel::new(config.gravity).with_solver(
            config.velocity_iterations,
            config.position_iterations,
            config.restitution_threshold,
        );
        Self::with_kernel(kernel, config)
    }
}

impl Default for PhysicsWorld<SimpleKernel> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: PhysicsKernel> PhysicsWorld<K> {
    /// Creates a world driving the given kernel
    pub fn with_kernel(kernel: K, config: SimulationConfig) -> Self {
        contract(config.validate());
        Self {
            shared: Arc::new(Shared {
                state: Mutex::new(WorldState::new(kernel, config)),
                stepping: Mutex::new(()),
                step_in_progress: AtomicBool::new(false),
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, WorldState<K>> {
        self.shared.lock()
    }

    /// Destroys every body, joint and force field; keeps configuration and callbacks
    pub fn reset(&self) {
        self.lock().reset();
    }

    pub fn config(&self) -> SimulationConfig {
        self.lock().config.clone()
    }

    pub fn set_gravity(&self, gravity: Vector2) {
        self.lock().set_gravity(gravity);
    }

    pub fn gravity(&self) -> Vector2 {
        self.lock().config.gravity
    }

    /// Sets the interval the kernel advances by per tick. Panics unless positive.
    pub fn set_fixed_timestep(&self, fixed_timestep: f32) {
        contract(self.lock().set_fixed_timestep(fixed_timestep));
    }

    pub fn fixed_timestep(&self) -> f32 {
        self.lock().accumulator.fixed_timestep()
    }

    pub fn body_count(&self) -> usize {
        self.lock().bodies.len()
    }

    pub fn joint_count(&self) -> usize {
        self.lock().joints.len()
    }

    pub fn contains_body(&self, body: BodyId) -> bool {
        self.lock().bodies.contains(body)
    }

    // Bodies

    /// Creates a body without shapes
    pub fn create_body(&self, body_type: BodyType, x: f32, y: f32, angle: f32) -> BodyId {
        self.lock()
            .create_body(&BodyDef::new(body_type, Vector2::new(x, y), angle))
    }

    /// Destroys a body with its shapes, attached joints, tags and destructible record
    pub fn destroy_body(&self, body: BodyId) {
        contract(self.lock().destroy_body(body));
    }

    pub fn body_type(&self, body: BodyId) -> BodyType {
        let state = self.lock();
        contract(state.body_handle(body).and_then(|h| state.kernel.body_type(h)))
    }

    pub fn transform(&self, body: BodyId) -> Transform {
        contract(self.lock().transform(body))
    }

    /// Position of the body origin
    pub fn position(&self, body: BodyId) -> Vector2 {
        self.transform(body).position
    }

    pub fn set_position(&self, body: BodyId, position: Vector2) {
        let mut state = self.lock();
        let angle = contract(state.transform(body)).angle;
        contract(state.set_transform(body, position, angle));
    }

    pub fn angle(&self, body: BodyId) -> f32 {
        self.transform(body).angle
    }

    pub fn set_angle(&self, body: BodyId, angle: f32) {
        let mut state = self.lock();
        let position = contract(state.transform(body)).position;
        contract(state.set_transform(body, position, angle));
    }

    pub fn set_transform(&self, body: BodyId, position: Vector2, angle: f32) {
        contract(self.lock().set_transform(body, position, angle));
    }

    /// World-space center of mass
    pub fn world_center(&self, body: BodyId) -> Vector2 {
        let state = self.lock();
        contract(state.body_handle(body).and_then(|h| state.kernel.world_center(h)))
    }

    pub fn linear_velocity(&self, body: BodyId) -> Vector2 {
        let state = self.lock();
        contract(state.body_handle(body).and_then(|h| state.kernel.linear_velocity(h)))
    }

    pub fn set_linear_velocity(&self, body: BodyId, velocity: Vector2) {
        let mut state = self.lock();
        let handle = contract(state.body_handle(body));
        contract(state.kernel.set_linear_velocity(handle, velocity));
    }

    pub fn angular_velocity(&self, body: BodyId) -> f32 {
        let state = self.lock();
        contract(state.body_handle(body).and_then(|h| state.kernel.angular_velocity(h)))
    }

    pub fn set_angular_velocity(&self, body: BodyId, velocity: f32) {
        let mut state = self.lock();
        let handle = contract(state.body_handle(body));
        contract(state.kernel.set_angular_velocity(handle, velocity));
    }

    /// Applies a force at the center of mass for the next tick
    pub fn apply_force(&self, body: BodyId, force: Vector2) {
        let mut state = self.lock();
        let handle = contract(state.body_handle(body));
        contract(state.kernel.apply_force(handle, force));
    }

    pub fn apply_linear_impulse(&self, body: BodyId, impulse: Vector2) {
        let mut state = self.lock();
        let handle = contract(state.body_handle(body));
        contract(state.kernel.apply_linear_impulse(handle, impulse));
    }

    pub fn apply_torque(&self, body: BodyId, torque: f32) {
        let mut state = self.lock();
        let handle = contract(state.body_handle(body));
        contract(state.kernel.apply_torque(handle, torque));
    }

    /// Associates a render layer with a body; fragments of a fractured body
    /// only get layers when the body has one
    pub fn set_body_layer(&self, body: BodyId, layer: Option<LayerId>) {
        contract(self.lock().set_body_layer(body, layer));
    }

    pub fn body_layer(&self, body: BodyId) -> Option<LayerId> {
        contract(self.lock().bodies.get(body).map(|r| r.layer))
    }

    // Fixtures

    /// Adds a solid box of the given full size, centered on the body origin
    pub fn add_box_fixture(&self, body: BodyId, width: f32, height: f32, material: Material) {
        let def = ShapeDef::solid(ShapeGeometry::rectangle(width, height), material);
        contract(self.lock().add_shape(body, def));
    }

    pub fn add_circle_fixture(&self, body: BodyId, center: Vector2, radius: f32, material: Material) {
        let def = ShapeDef::solid(ShapeGeometry::Circle { center, radius }, material);
        contract(self.lock().add_shape(body, def));
    }

    /// Adds a convex polygon of 3 to 8 vertices in the body frame
    pub fn add_polygon_fixture(&self, body: BodyId, vertices: &[Vector2], material: Material) {
        let def = ShapeDef::solid(ShapeGeometry::Polygon { vertices: vertices.to_vec() }, material);
        contract(self.lock().add_shape(body, def));
    }

    pub fn add_segment_fixture(&self, body: BodyId, a: Vector2, b: Vector2, material: Material) {
        let def = ShapeDef::solid(ShapeGeometry::Segment { a, b }, material);
        contract(self.lock().add_shape(body, def));
    }

    /// Adds a sensor-only box; it reports overlaps but never collides
    pub fn add_box_sensor(&self, body: BodyId, width: f32, height: f32) {
        let def = ShapeDef::sensor(ShapeGeometry::rectangle(width, height));
        contract(self.lock().add_shape(body, def));
    }

    pub fn add_circle_sensor(&self, body: BodyId, center: Vector2, radius: f32) {
        let def = ShapeDef::sensor(ShapeGeometry::Circle { center, radius });
        contract(self.lock().add_shape(body, def));
    }

    pub fn add_polygon_sensor(&self, body: BodyId, vertices: &[Vector2]) {
        let def = ShapeDef::sensor(ShapeGeometry::Polygon { vertices: vertices.to_vec() });
        contract(self.lock().add_shape(body, def));
    }

    // Joints

    /// Pins two bodies together at a world-space anchor
    pub fn create_revolute_joint(&self, a: BodyId, b: BodyId, anchor: Vector2) -> JointId {
        contract(self.lock().create_revolute_joint(a, b, anchor))
    }

    /// Drags `body` towards `target`. The static ground anchor is created on first use.
    pub fn create_mouse_joint(&self, body: BodyId, target: Vector2, max_force: f32) -> JointId {
        contract(self.lock().create_mouse_joint(body, target, max_force))
    }

    pub fn set_mouse_target(&self, joint: JointId, target: Vector2) {
        contract(self.lock().set_mouse_target(joint, target));
    }

    pub fn destroy_joint(&self, joint: JointId) {
        contract(self.lock().destroy_joint(joint));
    }

    pub fn contains_joint(&self, joint: JointId) -> bool {
        self.lock().joints.contains(joint)
    }

    // Body types

    /// Tags a body; returns false if it already had the tag
    pub fn add_body_type(&self, body: BodyId, body_type: &str) -> bool {
        let mut state = self.lock();
        contract(state.bodies.get(body).map(|_| ()));
        state.types.add(body, body_type)
    }

    pub fn remove_body_type(&self, body: BodyId, body_type: &str) -> bool {
        let mut state = self.lock();
        contract(state.bodies.get(body).map(|_| ()));
        state.types.remove(body, body_type)
    }

    pub fn clear_body_types(&self, body: BodyId) {
        let mut state = self.lock();
        contract(state.bodies.get(body).map(|_| ()));
        state.types.clear_body(body);
    }

    pub fn body_has_type(&self, body: BodyId, body_type: &str) -> bool {
        let state = self.lock();
        contract(state.bodies.get(body).map(|_| ()));
        state.types.has(body, body_type)
    }

    /// Tags of a body in insertion order
    pub fn body_types(&self, body: BodyId) -> Vec<String> {
        let state = self.lock();
        contract(state.bodies.get(body).map(|_| ()));
        state.types.types(body).to_vec()
    }

    // Destruction

    pub fn set_body_destructible(&self, body: BodyId, properties: DestructibleProperties) {
        let mut state = self.lock();
        contract(state.bodies.get(body).map(|_| ()));
        state.destructibles.insert(body, properties);
    }

    pub fn body_destructible(&self, body: BodyId) -> Option<DestructibleProperties> {
        let state = self.lock();
        contract(state.bodies.get(body).map(|_| ()));
        state.destructibles.get(&body).cloned()
    }

    pub fn clear_body_destructible(&self, body: BodyId) {
        let mut state = self.lock();
        contract(state.bodies.get(body).map(|_| ()));
        state.destructibles.remove(&body);
    }

    /// Impact speed at or above which a body of `strength` breaks
    pub fn break_speed(&self, strength: f32) -> f32 {
        destruction::break_speed(strength, &self.lock().config.fracture)
    }

    /// Breaks a destructible body as if hit at `point` along `normal`.
    /// Returns false when the body is not destructible.
    ///
    /// The fragments are spawned immediately and the event is appended to the
    /// current fracture list; the body itself is destroyed before this returns.
    pub fn fracture_body(&self, body: BodyId, point: Vector2, normal: Vector2, approach_speed: f32) -> bool {
        self.shared.with_dispatch(|state| {
            contract(state.bodies.get(body).map(|_| ()));
            let breakable = state.destructibles.get(&body).map_or(false, |p| p.is_destructible);
            if !breakable {
                return false;
            }
            contract(state.fracture_body(body, point, normal, approach_speed));
            state.flush_pending_destruction();
            true
        })
    }

    /// Receives layer requests for fracture fragments
    pub fn set_layer_sink(&self, sink: impl FragmentLayerSink + 'static) {
        self.lock().layer_sink = Some(Box::new(sink));
    }

    pub fn clear_layer_sink(&self) {
        self.lock().layer_sink = None;
    }

    // Events

    /// Collision hits of the last `step` call
    pub fn collision_hit_events(&self) -> Vec<CollisionHitEvent> {
        self.lock().events.collisions().to_vec()
    }

    /// Sensor events of the last `step` call
    pub fn sensor_events(&self) -> Vec<SensorEvent> {
        self.lock().events.sensors().to_vec()
    }

    /// Fractures of the last `step` call
    pub fn fracture_events(&self) -> Vec<FractureEvent> {
        self.lock().events.fractures().to_vec()
    }

    /// Called for every collision hit, on the thread running the step.
    ///
    /// Callbacks run once the step has finished simulating, with the world
    /// unlocked and before the events show up in the polled lists. They may
    /// call back into the world (through a clone), except for [`PhysicsWorld::step`]
    /// which would wait on itself.
    pub fn set_collision_callback(&self, callback: impl FnMut(&CollisionHitEvent) + Send + 'static) {
        self.lock().callbacks.collision.set(Some(Box::new(callback)));
    }

    pub fn clear_collision_callback(&self) {
        self.lock().callbacks.collision.set(None);
    }

    /// Called for every sensor event; see [`PhysicsWorld::set_collision_callback`]
    pub fn set_sensor_callback(&self, callback: impl FnMut(&SensorEvent) + Send + 'static) {
        self.lock().callbacks.sensor.set(Some(Box::new(callback)));
    }

    pub fn clear_sensor_callback(&self) {
        self.lock().callbacks.sensor.set(None);
    }

    /// Called for every fracture, before the event shows up in [`PhysicsWorld::fracture_events`].
    /// The broken body is already gone; its fragments exist.
    pub fn set_fracture_callback(&self, callback: impl FnMut(&FractureEvent) + Send + 'static) {
        self.lock().callbacks.fracture.set(Some(Box::new(callback)));
    }

    pub fn clear_fracture_callback(&self) {
        self.lock().callbacks.fracture.set(None);
    }

    // Force fields

    /// Creates a linear field over a convex polygon (world coordinates, 3 to 8 vertices)
    pub fn create_force_field(&self, vertices: &[Vector2], force: Vector2) -> ForceFieldId {
        contract(self.lock().create_force_field(vertices, force))
    }

    pub fn create_radial_force_field(
        &self,
        center_x: f32,
        center_y: f32,
        radius: f32,
        force_at_center: f32,
        force_at_edge: f32,
    ) -> ForceFieldId {
        contract(self.lock().create_radial_force_field(
            Vector2::new(center_x, center_y),
            radius,
            force_at_center,
            force_at_edge,
        ))
    }

    pub fn destroy_force_field(&self, field: ForceFieldId) {
        contract(self.lock().destroy_force_field(field));
    }

    /// Panics unless the field is linear
    pub fn set_force_field_force(&self, field: ForceFieldId, force: Vector2) {
        contract(self.lock().set_force_field_force(field, force));
    }

    /// Sets the velocity damping coefficient; 0 disables damping
    pub fn set_force_field_damping(&self, field: ForceFieldId, damping: f32) {
        contract(self.lock().set_force_field_damping(field, damping));
    }

    /// Panics unless the field is radial
    pub fn set_radial_force_field_params(
        &self,
        field: ForceFieldId,
        radius: f32,
        force_at_center: f32,
        force_at_edge: f32,
    ) {
        contract(self.lock().set_radial_force_field_params(field, radius, force_at_center, force_at_edge));
    }

    pub fn force_field(&self, field: ForceFieldId) -> ForceField {
        contract(self.lock().fields.get(field).cloned())
    }

    pub fn force_field_count(&self) -> usize {
        self.lock().fields.len()
    }

    // Stepping

    /// Advances the simulation by `dt` seconds in fixed ticks; leftover time
    /// carries over to the next call
    pub fn step(&self, dt: f32, sub_steps: u32) {
        self.shared.step(dt, sub_steps);
    }

    /// Starts `step` on a background thread. Returns false without doing
    /// anything if an async step is already running.
    pub fn step_async(&self, dt: f32, sub_steps: u32) -> bool {
        if self
            .shared
            .step_in_progress
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            trace!("async step already in flight");
            return false;
        }

        let shared = Arc::clone(&self.shared);
        let spawned = thread::Builder::new()
            .name("physics-step".into())
            .spawn(move || {
                let _guard = InFlightGuard::new(&shared.step_in_progress);
                shared.step(dt, sub_steps);
            });

        if let Err(err) = spawned {
            warn!(%err, "failed to spawn physics step thread, stepping inline");
            let _guard = InFlightGuard::new(&self.shared.step_in_progress);
            self.shared.step(dt, sub_steps);
        }
        true
    }

    /// Whether no async step is running
    pub fn is_step_complete(&self) -> bool {
        !self.shared.step_in_progress.load(Ordering::Acquire)
    }

    /// Blocks until the running async step, if any, has finished
    pub fn wait_for_step_complete(&self) {
        while !self.is_step_complete() {
            thread::sleep(STEP_POLL_INTERVAL);
        }
    }

    // Queries

    /// First dynamic body whose shape contains `point`
    pub fn query_body_at_point(&self, point: Vector2) -> Option<BodyId> {
        self.lock().query_body_at_point(point)
    }

    /// World-space outlines of all shapes as of the last step
    pub fn debug_shapes(&self) -> Vec<DebugShape> {
        self.lock().debug_shapes.clone()
    }
}
