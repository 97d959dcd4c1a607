//! Turns the kernel's per-step touch events into world events keyed by [`BodyId`].

use std::collections::HashMap;

use crate::core::{BodyId, CollisionHitEvent, SensorEvent, SensorEventType};
use crate::kernel::{KernelBodyHandle, PhysicsKernel, SensorTouchEvent};

/// Contacts that began during the last kernel step with the bodies closing.
///
/// Contacts where neither side is a world body are skipped.
pub(crate) fn collision_hits<K: PhysicsKernel>(
    kernel: &K,
    lookup: &HashMap<KernelBodyHandle, BodyId>,
) -> Vec<CollisionHitEvent> {
    kernel
        .contact_begin_events()
        .iter()
        .filter_map(|contact| {
            let approach_speed = -(contact.velocity_a - contact.velocity_b).dot(&contact.normal);
            if approach_speed <= 0.0 {
                return None;
            }

            let body_a = lookup.get(&contact.body_a).copied();
            let body_b = lookup.get(&contact.body_b).copied();
            if body_a.is_none() && body_b.is_none() {
                return None;
            }

            Some(CollisionHitEvent {
                body_a,
                body_b,
                point: contact.point,
                normal: contact.normal,
                approach_speed,
            })
        })
        .collect()
}

/// Sensor begin and end events of the last kernel step, in that order.
///
/// Only overlaps where both the sensor and the visitor are world bodies are reported.
pub(crate) fn sensor_events<K: PhysicsKernel>(
    kernel: &K,
    lookup: &HashMap<KernelBodyHandle, BodyId>,
) -> Vec<SensorEvent> {
    let begins = kernel
        .sensor_begin_events()
        .iter()
        .filter_map(|touch| sensor_event(kernel, lookup, touch, SensorEventType::Begin));
    let ends = kernel
        .sensor_end_events()
        .iter()
        .filter_map(|touch| sensor_event(kernel, lookup, touch, SensorEventType::End));
    begins.chain(ends).collect()
}

fn sensor_event<K: PhysicsKernel>(
    kernel: &K,
    lookup: &HashMap<KernelBodyHandle, BodyId>,
    touch: &SensorTouchEvent,
    event_type: SensorEventType,
) -> Option<SensorEvent> {
    let sensor_handle = kernel.shape_body(touch.sensor_shape).ok()?;
    let visitor_handle = kernel.shape_body(touch.visitor_shape).ok()?;
    let sensor_body = *lookup.get(&sensor_handle)?;
    let visitor_body = *lookup.get(&visitor_handle)?;

    Some(SensorEvent {
        event_type,
        sensor_body,
        visitor_body,
        visitor_position: kernel.transform(visitor_handle).ok()?.position,
        visitor_velocity: kernel.linear_velocity(visitor_handle).ok()?,
    })
}
