//! Fragment spawning for destructible bodies.

use tracing::{debug, trace, warn};

use crate::core::events::StepEvent;
use crate::core::state::WorldState;
use crate::core::{BodyId, CollisionHitEvent, Fragment, FractureEvent};
use crate::destruction::{break_speed, fragment_uvs, split_for_impact};
use crate::kernel::{BodyDef, BodyType, Material, PhysicsKernel, ShapeDef, ShapeGeometry};
use crate::math::Vector2;
use crate::Result;

impl<K: PhysicsKernel> WorldState<K> {
    /// Breaks every destructible body hit hard enough during the last tick
    pub(crate) fn process_fractures(&mut self, hits: &[CollisionHitEvent]) {
        for hit in hits {
            for body in [hit.body_a, hit.body_b].into_iter().flatten() {
                let Some(props) = self.destructibles.get(&body) else { continue };
                if !props.is_destructible || self.pending_destruction.contains(&body) {
                    continue;
                }

                let threshold = break_speed(props.strength, &self.config.fracture);
                if hit.approach_speed < threshold {
                    trace!(id = %body, speed = hit.approach_speed, threshold, "impact below break speed");
                    continue;
                }

                if let Err(err) = self.fracture_body(body, hit.point, hit.normal, hit.approach_speed) {
                    warn!(id = %body, %err, "fracture failed");
                }
            }
        }
    }

    /// Splits a body at an impact, spawns the fragments and queues the body for destruction
    pub(crate) fn fracture_body(
        &mut self,
        body: BodyId,
        point: Vector2,
        normal: Vector2,
        approach_speed: f32,
    ) -> Result<()> {
        let props = match self.destructibles.get(&body) {
            Some(props) => props.clone(),
            None => return Ok(()),
        };
        let record = *self.bodies.get(body)?;
        let xf = self.kernel.transform(record.handle)?;
        let linear_velocity = self.kernel.linear_velocity(record.handle)?;
        let angular_velocity = self.kernel.angular_velocity(record.handle)?;
        let material = match self.kernel.body_shapes(record.handle)?.first() {
            Some(shape) => self.kernel.shape_material(*shape)?,
            None => Material::default(),
        };
        let tags = self.types.types(body).to_vec();

        let pieces = split_for_impact(
            props.vertices(),
            xf.inverse_apply(point),
            xf.inverse_rotate(normal),
            props.brittleness,
            &self.config.fracture,
        );

        let root_bounds = props.effective_root_bounds();
        let recursive = props.brittleness >= self.config.fracture.recursive_brittleness_threshold;
        let mut fragments = Vec::with_capacity(pieces.len());

        for piece in pieces {
            let position = xf.apply(piece.centroid);
            let handle = self.kernel.create_body(&BodyDef {
                linear_velocity,
                angular_velocity,
                ..BodyDef::new(BodyType::Dynamic, position, xf.angle)
            });

            let hull = self.kernel.compute_hull(&piece.vertices);
            if hull.len() < 3 {
                trace!(parent = %body, area = piece.area, "degenerate fragment dropped");
                self.kernel.destroy_body(handle)?;
                continue;
            }
            let geometry = ShapeGeometry::Polygon { vertices: hull.clone() };
            if let Err(err) = self.kernel.create_shape(handle, &ShapeDef::solid(geometry, material)) {
                trace!(parent = %body, %err, "fragment shape rejected");
                self.kernel.destroy_body(handle)?;
                continue;
            }

            let id = self.register_body(handle);
            for tag in &tags {
                self.types.add(id, tag);
            }

            let child = props
                .for_fragment(&hull, piece.centroid)
                .unwrap_or_else(|_| props.clone());
            let root_offset = props.root_offset + piece.centroid;
            let mut fragment = Fragment {
                body: id,
                layer: None,
                uvs: fragment_uvs(&hull, root_offset, &root_bounds, props.texture_uv),
                normal_uvs: fragment_uvs(&hull, root_offset, &root_bounds, props.normal_uv),
                vertices: hull,
                area: piece.area,
                position,
            };

            if let (Some(sink), Some(parent_layer)) = (self.layer_sink.as_mut(), record.layer) {
                if let Some(layer) = sink.create_fragment_layer(parent_layer, &fragment, &child) {
                    sink.attach_layer(layer, id);
                    fragment.layer = Some(layer);
                    self.bodies.get_mut(id)?.layer = Some(layer);
                }
            }

            if recursive && piece.area >= self.config.fracture.min_recursive_fragment_area {
                self.destructibles.insert(id, child);
            }

            fragments.push(fragment);
        }

        let event = FractureEvent {
            original_body: body,
            original_layer: record.layer,
            fragments,
            impact_point: point,
            impact_normal: normal,
            approach_speed,
        };
        debug!(
            id = %body,
            fragments = event.fragment_count(),
            approach_speed,
            "body fractured"
        );

        self.undelivered.push(StepEvent::Fracture(event));
        self.pending_destruction.push(body);
        Ok(())
    }

    /// Destroys bodies broken during the last tick, along with their layers
    pub(crate) fn flush_pending_destruction(&mut self) {
        for body in std::mem::take(&mut self.pending_destruction) {
            let layer = match self.bodies.get(body) {
                Ok(record) => record.layer,
                Err(_) => continue,
            };
            if let (Some(sink), Some(layer)) = (self.layer_sink.as_mut(), layer) {
                sink.destroy_layer(layer);
            }
            if let Err(err) = self.destroy_body(body) {
                warn!(id = %body, %err, "failed to destroy fractured body");
            }
        }
    }
}
