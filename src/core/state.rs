use std::collections::HashMap;

use tracing::{debug, info, trace, warn};

use crate::core::debug::{DebugOutline, DebugShape};
use crate::core::pipeline;
use crate::core::stepping::StepAccumulator;
use crate::core::events::{EventCallbacks, StepEvent};
use crate::core::{BodyId, BodyTypeRegistry, ForceFieldId, HandleTable, JointId, SimulationConfig, StepEvents};
use crate::destruction::DestructibleProperties;
use crate::error::PhysicsError;
use crate::forces::{ForceField, ForceFieldType};
use crate::geometry::{self, MAX_POLYGON_VERTICES};
use crate::kernel::{
    BodyDef, BodyType, JointDef, KernelBodyHandle, KernelJointHandle, KernelShapeHandle, PhysicsKernel, ShapeDef,
    ShapeFlags, ShapeGeometry,
};
use crate::math::{Aabb, Transform, Vector2};
use crate::render::{FragmentLayerSink, LayerId};
use crate::Result;

/// Half size of the box used to find candidate shapes under a point
const POINT_QUERY_EXTENT: f32 = 0.001;

/// Spring stiffness of mouse joints, in hertz
const MOUSE_HERTZ: f32 = 5.0;
const MOUSE_DAMPING_RATIO: f32 = 0.7;

#[derive(Debug, Clone, Copy)]
pub(crate) struct BodyRecord {
    pub handle: KernelBodyHandle,
    pub layer: Option<LayerId>,
}

#[derive(Debug, Clone, Copy)]
pub(crate) struct JointRecord {
    pub handle: KernelJointHandle,
    pub bodies: (KernelBodyHandle, KernelBodyHandle),
}

/// Everything the world mutex guards
pub(crate) struct WorldState<K: PhysicsKernel> {
    pub(crate) kernel: K,
    pub(crate) config: SimulationConfig,
    pub(crate) accumulator: StepAccumulator,

    pub(crate) bodies: HandleTable<BodyId, BodyRecord>,
    pub(crate) body_lookup: HashMap<KernelBodyHandle, BodyId>,
    pub(crate) joints: HandleTable<JointId, JointRecord>,
    pub(crate) fields: HandleTable<ForceFieldId, ForceField>,

    /// Static anchor for mouse joints, created on first use
    pub(crate) ground: Option<KernelBodyHandle>,

    pub(crate) events: StepEvents,

    /// Events of the running step that the callbacks have not seen yet
    pub(crate) undelivered: Vec<StepEvent>,

    pub(crate) types: BodyTypeRegistry,
    pub(crate) destructibles: HashMap<BodyId, DestructibleProperties>,

    /// Bodies broken this tick, destroyed once the event pass is over
    pub(crate) pending_destruction: Vec<BodyId>,

    pub(crate) callbacks: EventCallbacks,
    pub(crate) layer_sink: Option<Box<dyn FragmentLayerSink>>,

    pub(crate) debug_shapes: Vec<DebugShape>,
}

impl<K: PhysicsKernel> WorldState<K> {
    pub(crate) fn new(mut kernel: K, config: SimulationConfig) -> Self {
        kernel.set_gravity(config.gravity);
        info!(
            fixed_timestep = config.fixed_timestep,
            gravity = %config.gravity,
            "physics world created"
        );

        Self {
            kernel,
            accumulator: StepAccumulator::new(config.fixed_timestep),
            config,
            bodies: HandleTable::new(),
            body_lookup: HashMap::new(),
            joints: HandleTable::new(),
            fields: HandleTable::new(),
            ground: None,
            events: StepEvents::new(),
            undelivered: Vec::new(),
            types: BodyTypeRegistry::new(),
            destructibles: HashMap::new(),
            pending_destruction: Vec::new(),
            callbacks: EventCallbacks::default(),
            layer_sink: None,
            debug_shapes: Vec::new(),
        }
    }

    /// Destroys every body, joint and force field. Configuration, callbacks
    /// and the layer sink are kept; IDs keep counting.
    pub(crate) fn reset(&mut self) {
        let field_bodies: Vec<_> = self.fields.iter().map(|(_, f)| f.body).collect();
        let bodies: Vec<_> = self.bodies.iter().map(|(_, r)| r.handle).collect();
        for handle in bodies.into_iter().chain(field_bodies).chain(self.ground.take()) {
            if let Err(err) = self.kernel.destroy_body(handle) {
                warn!(?handle, %err, "failed to destroy kernel body during reset");
            }
        }

        self.bodies.clear();
        self.body_lookup.clear();
        self.joints.clear();
        self.fields.clear();
        self.events.clear();
        self.undelivered.clear();
        self.types.clear();
        self.destructibles.clear();
        self.pending_destruction.clear();
        self.debug_shapes.clear();
        self.accumulator.reset();
        info!("physics world reset");
    }

    pub(crate) fn set_fixed_timestep(&mut self, fixed_timestep: f32) -> Result<()> {
        if !(fixed_timestep > 0.0 && fixed_timestep.is_finite()) {
            return Err(PhysicsError::InvalidParameter(format!(
                "fixed timestep must be positive, got {}",
                fixed_timestep
            )));
        }
        self.config.fixed_timestep = fixed_timestep;
        self.accumulator.set_fixed_timestep(fixed_timestep);
        Ok(())
    }

    pub(crate) fn set_gravity(&mut self, gravity: Vector2) {
        self.config.gravity = gravity;
        self.kernel.set_gravity(gravity);
    }

    // Bodies

    pub(crate) fn body_handle(&self, body: BodyId) -> Result<KernelBodyHandle> {
        Ok(self.bodies.get(body)?.handle)
    }

    pub(crate) fn register_body(&mut self, handle: KernelBodyHandle) -> BodyId {
        let id = self.bodies.insert(BodyRecord { handle, layer: None });
        self.body_lookup.insert(handle, id);
        id
    }

    pub(crate) fn create_body(&mut self, def: &BodyDef) -> BodyId {
        let handle = self.kernel.create_body(def);
        let id = self.register_body(handle);
        debug!(%id, body_type = ?def.body_type, position = %def.position, "body created");
        id
    }

    pub(crate) fn destroy_body(&mut self, body: BodyId) -> Result<()> {
        let record = *self.bodies.get(body)?;
        self.bodies.remove(body);
        self.body_lookup.remove(&record.handle);

        // The kernel takes attached joints down with the body
        let attached: Vec<JointId> = self
            .joints
            .iter()
            .filter(|(_, j)| j.bodies.0 == record.handle || j.bodies.1 == record.handle)
            .map(|(id, _)| id)
            .collect();
        for joint in attached {
            self.joints.remove(joint);
        }

        self.types.clear_body(body);
        self.destructibles.remove(&body);
        self.pending_destruction.retain(|pending| *pending != body);

        self.kernel.destroy_body(record.handle)?;
        debug!(id = %body, "body destroyed");
        Ok(())
    }

    pub(crate) fn transform(&self, body: BodyId) -> Result<Transform> {
        self.kernel.transform(self.body_handle(body)?)
    }

    pub(crate) fn set_transform(&mut self, body: BodyId, position: Vector2, angle: f32) -> Result<()> {
        let handle = self.body_handle(body)?;
        self.kernel.set_transform(handle, position, angle)
    }

    pub(crate) fn set_body_layer(&mut self, body: BodyId, layer: Option<LayerId>) -> Result<()> {
        self.bodies.get_mut(body)?.layer = layer;
        Ok(())
    }

    // Fixtures

    pub(crate) fn add_shape(&mut self, body: BodyId, def: ShapeDef) -> Result<()> {
        let handle = self.body_handle(body)?;
        let def = match def.geometry {
            ShapeGeometry::Polygon { vertices } => ShapeDef {
                geometry: ShapeGeometry::Polygon { vertices: checked_polygon(&vertices)? },
                ..def
            },
            _ => def,
        };
        self.kernel.create_shape(handle, &def)?;
        trace!(id = %body, sensor = def.is_sensor(), "shape added");
        Ok(())
    }

    // Joints

    pub(crate) fn create_joint(&mut self, def: JointDef) -> Result<JointId> {
        let handle = self.kernel.create_joint(&def)?;
        let id = self.joints.insert(JointRecord { handle, bodies: def.bodies() });
        debug!(%id, "joint created");
        Ok(id)
    }

    pub(crate) fn create_revolute_joint(&mut self, a: BodyId, b: BodyId, anchor: Vector2) -> Result<JointId> {
        let body_a = self.body_handle(a)?;
        let body_b = self.body_handle(b)?;
        self.create_joint(JointDef::Revolute { body_a, body_b, anchor })
    }

    pub(crate) fn create_mouse_joint(&mut self, body: BodyId, target: Vector2, max_force: f32) -> Result<JointId> {
        let body = self.body_handle(body)?;
        let ground = self.ground_body();
        self.create_joint(JointDef::Mouse {
            ground,
            body,
            target,
            max_force,
            hertz: MOUSE_HERTZ,
            damping_ratio: MOUSE_DAMPING_RATIO,
        })
    }

    fn ground_body(&mut self) -> KernelBodyHandle {
        if let Some(ground) = self.ground {
            return ground;
        }
        let ground = self
            .kernel
            .create_body(&BodyDef::new(BodyType::Static, Vector2::zero(), 0.0));
        self.ground = Some(ground);
        ground
    }

    pub(crate) fn set_mouse_target(&mut self, joint: JointId, target: Vector2) -> Result<()> {
        let handle = self.joints.get(joint)?.handle;
        self.kernel.set_mouse_target(handle, target)
    }

    pub(crate) fn destroy_joint(&mut self, joint: JointId) -> Result<()> {
        let record = *self.joints.get(joint)?;
        self.joints.remove(joint);
        self.kernel.destroy_joint(record.handle)?;
        debug!(id = %joint, "joint destroyed");
        Ok(())
    }

    // Force fields

    pub(crate) fn create_force_field(&mut self, vertices: &[Vector2], force: Vector2) -> Result<ForceFieldId> {
        let vertices = checked_polygon(vertices)?;
        let bounds = geometry::bounding_box(&vertices)
            .ok_or_else(|| PhysicsError::InvalidParameter("force field polygon is empty".into()))?;

        let body = self
            .kernel
            .create_body(&BodyDef::new(BodyType::Static, Vector2::zero(), 0.0));
        let sensor = match self
            .kernel
            .create_shape(body, &ShapeDef::sensor(ShapeGeometry::Polygon { vertices }))
        {
            Ok(sensor) => sensor,
            Err(err) => {
                self.kernel.destroy_body(body)?;
                return Err(err);
            }
        };

        let id = self
            .fields
            .insert(ForceField::new(ForceFieldType::Linear { force, bounds }, body, sensor));
        debug!(%id, %force, "linear force field created");
        Ok(id)
    }

    pub(crate) fn create_radial_force_field(
        &mut self,
        center: Vector2,
        radius: f32,
        force_at_center: f32,
        force_at_edge: f32,
    ) -> Result<ForceFieldId> {
        let field_type = ForceFieldType::Radial { center, radius, force_at_center, force_at_edge };
        let (body, sensor) = self.radial_sensor(center, radius)?;
        let id = self.fields.insert(ForceField::new(field_type, body, sensor));
        debug!(%id, %center, radius, "radial force field created");
        Ok(id)
    }

    fn radial_sensor(&mut self, center: Vector2, radius: f32) -> Result<(KernelBodyHandle, KernelShapeHandle)> {
        if !(radius > 0.0 && radius.is_finite()) {
            return Err(PhysicsError::InvalidParameter(format!(
                "radial force field radius must be positive, got {}",
                radius
            )));
        }
        let body = self
            .kernel
            .create_body(&BodyDef::new(BodyType::Static, center, 0.0));
        let geometry = ShapeGeometry::Circle { center: Vector2::zero(), radius };
        let sensor = self.kernel.create_shape(body, &ShapeDef::sensor(geometry))?;
        Ok((body, sensor))
    }

    pub(crate) fn destroy_force_field(&mut self, field: ForceFieldId) -> Result<()> {
        let body = self.fields.get(field)?.body;
        self.fields.remove(field);
        self.kernel.destroy_body(body)?;
        debug!(id = %field, "force field destroyed");
        Ok(())
    }

    pub(crate) fn set_force_field_force(&mut self, field: ForceFieldId, force: Vector2) -> Result<()> {
        if !self.fields.get_mut(field)?.set_force(force) {
            return Err(PhysicsError::InvalidParameter(format!("{} is not a linear force field", field)));
        }
        Ok(())
    }

    pub(crate) fn set_force_field_damping(&mut self, field: ForceFieldId, damping: f32) -> Result<()> {
        self.fields.get_mut(field)?.set_damping(damping);
        Ok(())
    }

    pub(crate) fn set_radial_force_field_params(
        &mut self,
        field: ForceFieldId,
        radius: f32,
        force_at_center: f32,
        force_at_edge: f32,
    ) -> Result<()> {
        let current = self.fields.get(field)?;
        let ForceFieldType::Radial { center, radius: old_radius, .. } = current.field_type() else {
            return Err(PhysicsError::InvalidParameter(format!("{} is not a radial force field", field)));
        };
        let old_body = current.body;

        // The sensor circle is rebuilt when the reach changes
        if radius != old_radius {
            let (body, sensor) = self.radial_sensor(center, radius)?;
            self.kernel.destroy_body(old_body)?;
            let f = self.fields.get_mut(field)?;
            f.body = body;
            f.sensor = sensor;
        }

        self.fields
            .get_mut(field)?
            .set_radial_params(radius, force_at_center, force_at_edge);
        Ok(())
    }

    fn apply_force_fields(&mut self, dt: f32) {
        for id in self.fields.ids() {
            let Ok(field) = self.fields.get(id) else { continue };
            match field.apply(
                &mut self.kernel,
                &self.body_lookup,
                &self.types,
                &self.config.force_fields,
                self.config.max_sensor_overlaps,
                dt,
            ) {
                Ok(affected) if affected > 0 => trace!(%id, affected, "force field applied"),
                Ok(_) => {}
                Err(err) => warn!(%id, %err, "force field application failed"),
            }
        }
    }

    // Stepping

    /// Advances the simulation by `dt`, one kernel tick per whole fixed timestep
    pub(crate) fn step(&mut self, dt: f32, sub_steps: u32) {
        self.events.clear();

        let ticks = self.accumulator.accumulate(dt);
        let fixed = self.accumulator.fixed_timestep();
        for _ in 0..ticks {
            self.tick(fixed, sub_steps.max(1));
        }

        self.refresh_debug_shapes();
        trace!(
            dt,
            ticks,
            remainder = self.accumulator.remainder(),
            events = self.undelivered.len(),
            "step finished"
        );
    }

    /// Hands out the events raised since the last call, for callback dispatch
    pub(crate) fn take_undelivered(&mut self) -> Vec<StepEvent> {
        std::mem::take(&mut self.undelivered)
    }

    /// Makes dispatched events visible to the polled lists
    pub(crate) fn publish(&mut self, events: Vec<StepEvent>) {
        for event in events {
            self.events.push(event);
        }
    }

    fn tick(&mut self, dt: f32, sub_steps: u32) {
        self.kernel.step(dt, sub_steps);
        self.apply_force_fields(dt);

        let hits = pipeline::collision_hits(&self.kernel, &self.body_lookup);
        let sensors = pipeline::sensor_events(&self.kernel, &self.body_lookup);
        self.undelivered.extend(hits.iter().copied().map(StepEvent::Collision));
        self.undelivered.extend(sensors.into_iter().map(StepEvent::Sensor));

        self.process_fractures(&hits);
        self.flush_pending_destruction();
    }

    // Queries

    /// First dynamic body whose shape contains `point`
    pub(crate) fn query_body_at_point(&self, point: Vector2) -> Option<BodyId> {
        let probe = Aabb::from_center_half_extents(point, Vector2::new(POINT_QUERY_EXTENT, POINT_QUERY_EXTENT));
        self.kernel.query_aabb(&probe).into_iter().find_map(|shape| {
            let body = self.kernel.shape_body(shape).ok()?;
            if self.kernel.body_type(body).ok()? != BodyType::Dynamic {
                return None;
            }
            let local = self.kernel.transform(body).ok()?.inverse_apply(point);
            if !self.kernel.shape_geometry(shape).ok()?.contains_local_point(local) {
                return None;
            }
            self.body_lookup.get(&body).copied()
        })
    }

    fn refresh_debug_shapes(&mut self) {
        let mut shapes = Vec::new();

        let owners = self
            .bodies
            .ids()
            .into_iter()
            .filter_map(|id| Some((Some(id), self.bodies.get(id).ok()?.handle)))
            .chain(self.fields.ids().into_iter().filter_map(|id| Some((None, self.fields.get(id).ok()?.body))));

        for (owner, handle) in owners {
            let (Ok(xf), Ok(body_shapes)) = (self.kernel.transform(handle), self.kernel.body_shapes(handle)) else {
                continue;
            };
            for shape in body_shapes {
                let (Ok(geometry), Ok(flags)) = (self.kernel.shape_geometry(shape), self.kernel.shape_flags(shape)) else {
                    continue;
                };
                shapes.push(DebugShape {
                    body: owner,
                    is_sensor: flags.contains(ShapeFlags::SENSOR),
                    outline: DebugOutline::from_geometry(&geometry, &xf),
                });
            }
        }

        self.debug_shapes = shapes;
    }
}

/// Validates a polygon's vertex count and winds it counter-clockwise
pub(crate) fn checked_polygon(vertices: &[Vector2]) -> Result<Vec<Vector2>> {
    if !(3..=MAX_POLYGON_VERTICES).contains(&vertices.len()) {
        return Err(PhysicsError::InvalidParameter(format!(
            "polygon needs 3 to {} vertices, got {}",
            MAX_POLYGON_VERTICES,
            vertices.len()
        )));
    }
    Ok(geometry::ensure_counter_clockwise(vertices))
}
