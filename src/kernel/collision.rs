use crate::kernel::shape::WorldGeometry;
use crate::math::{Vector2, EPSILON};

/// Tolerance used to gather the deepest incident vertices into one contact point
const INCIDENT_TOLERANCE: f32 = 0.01;

/// Single-point contact between two shapes
#[derive(Debug, Clone, Copy)]
pub(crate) struct Manifold {
    /// Points from shape B towards shape A
    pub normal: Vector2,
    pub point: Vector2,
    pub penetration: f32,
}

/// Narrow phase for any pair of world geometries
pub(crate) fn collide(a: &WorldGeometry, b: &WorldGeometry) -> Option<Manifold> {
    match (a, b) {
        (
            WorldGeometry::Circle { center: ca, radius: ra },
            WorldGeometry::Circle { center: cb, radius: rb },
        ) => collide_circles(*ca, *ra, *cb, *rb),
        (WorldGeometry::Circle { center, radius }, WorldGeometry::Polygon { vertices }) => {
            collide_polygon_circle(vertices, *center, *radius)
        }
        (WorldGeometry::Polygon { vertices }, WorldGeometry::Circle { center, radius }) => {
            collide_polygon_circle(vertices, *center, *radius).map(|m| Manifold {
                normal: -m.normal,
                ..m
            })
        }
        (WorldGeometry::Polygon { vertices: va }, WorldGeometry::Polygon { vertices: vb }) => {
            collide_polygons(va, vb)
        }
    }
}

/// Boolean overlap test used by sensors
#[inline]
pub(crate) fn overlaps(a: &WorldGeometry, b: &WorldGeometry) -> bool {
    a.aabb().intersects(&b.aabb()) && collide(a, b).is_some()
}

fn collide_circles(ca: Vector2, ra: f32, cb: Vector2, rb: f32) -> Option<Manifold> {
    let d = ca - cb;
    let distance = d.length();
    let radii = ra + rb;
    if distance >= radii {
        return None;
    }

    let normal = if distance > EPSILON { d / distance } else { Vector2::unit_y() };
    Some(Manifold {
        normal,
        point: cb + normal * rb,
        penetration: radii - distance,
    })
}

/// Returns a manifold whose normal points from the polygon towards the circle
fn collide_polygon_circle(vertices: &[Vector2], center: Vector2, radius: f32) -> Option<Manifold> {
    let n = vertices.len();
    if n < 2 {
        return None;
    }

    // Closest boundary point
    let mut closest = vertices[0];
    let mut closest_distance_sq = f32::MAX;
    for i in 0..n {
        let a = vertices[i];
        let b = vertices[(i + 1) % n];
        let p = closest_point_on_segment(center, a, b);
        let d = p.distance_squared(&center);
        if d < closest_distance_sq {
            closest_distance_sq = d;
            closest = p;
        }
    }

    if n >= 3 && contains_convex(vertices, center) {
        // Center is inside: push out through the face of least penetration
        let mut best_normal = Vector2::unit_y();
        let mut best_separation = f32::MIN;
        for i in 0..n {
            let a = vertices[i];
            let b = vertices[(i + 1) % n];
            let normal = edge_normal(a, b);
            let separation = (center - a).dot(&normal);
            if separation > best_separation {
                best_separation = separation;
                best_normal = normal;
            }
        }
        return Some(Manifold {
            normal: best_normal,
            point: center - best_normal * best_separation,
            penetration: radius - best_separation,
        });
    }

    let distance = closest_distance_sq.sqrt();
    if distance >= radius {
        return None;
    }

    let normal = if distance > EPSILON {
        (center - closest) / distance
    } else {
        (center - crate::geometry::polygon_centroid(vertices)).normalize()
    };

    Some(Manifold {
        normal,
        point: closest,
        penetration: radius - distance,
    })
}

/// Separating axis test over the edge normals of both point sets
fn collide_polygons(va: &[Vector2], vb: &[Vector2]) -> Option<Manifold> {
    let mut best_overlap = f32::MAX;
    let mut best_axis = Vector2::unit_y();
    let mut reference_is_a = true;

    for (vertices, from_a) in [(va, true), (vb, false)] {
        let n = vertices.len();
        let edges = if n == 2 { 1 } else { n };
        for i in 0..edges {
            let axis = edge_normal(vertices[i], vertices[(i + 1) % n]);
            if axis.is_zero() {
                continue;
            }
            let (min_a, max_a) = project(va, axis);
            let (min_b, max_b) = project(vb, axis);
            let overlap = (max_a - min_b).min(max_b - min_a);
            if overlap <= 0.0 {
                return None;
            }
            if overlap < best_overlap {
                best_overlap = overlap;
                best_axis = axis;
                reference_is_a = from_a;
            }
        }
    }

    let center_a = crate::geometry::polygon_centroid(va);
    let center_b = crate::geometry::polygon_centroid(vb);
    let mut normal = best_axis;
    if (center_a - center_b).dot(&normal) < 0.0 {
        normal = -normal;
    }

    // The incident shape's deepest vertices approximate the contact point
    let point = if reference_is_a {
        deepest_average(vb, normal)
    } else {
        deepest_average(va, -normal)
    };

    Some(Manifold {
        normal,
        point,
        penetration: best_overlap,
    })
}

/// Average of the vertices furthest along `direction`
fn deepest_average(vertices: &[Vector2], direction: Vector2) -> Vector2 {
    let max = vertices
        .iter()
        .map(|v| v.dot(&direction))
        .fold(f32::MIN, f32::max);

    let mut sum = Vector2::zero();
    let mut count = 0.0;
    for v in vertices {
        if v.dot(&direction) >= max - INCIDENT_TOLERANCE {
            sum += *v;
            count += 1.0;
        }
    }

    if count > 0.0 { sum / count } else { vertices[0] }
}

fn project(vertices: &[Vector2], axis: Vector2) -> (f32, f32) {
    vertices.iter().fold((f32::MAX, f32::MIN), |(min, max), v| {
        let d = v.dot(&axis);
        (min.min(d), max.max(d))
    })
}

/// Outward normal of a counter-clockwise edge
#[inline]
fn edge_normal(a: Vector2, b: Vector2) -> Vector2 {
    let edge = b - a;
    Vector2::new(edge.y, -edge.x).normalize()
}

fn closest_point_on_segment(p: Vector2, a: Vector2, b: Vector2) -> Vector2 {
    let ab = b - a;
    let length_sq = ab.length_squared();
    if length_sq <= EPSILON {
        return a;
    }
    let t = ((p - a).dot(&ab) / length_sq).clamp(0.0, 1.0);
    a + ab * t
}

fn contains_convex(vertices: &[Vector2], point: Vector2) -> bool {
    let n = vertices.len();
    (0..n).all(|i| {
        let a = vertices[i];
        let b = vertices[(i + 1) % n];
        (b - a).cross(&(point - a)) >= 0.0
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square(center: Vector2, half: f32) -> WorldGeometry {
        WorldGeometry::Polygon {
            vertices: vec![
                center + Vector2::new(-half, -half),
                center + Vector2::new(half, -half),
                center + Vector2::new(half, half),
                center + Vector2::new(-half, half),
            ],
        }
    }

    #[test]
    fn circle_touching_box_face() {
        let circle = WorldGeometry::Circle { center: Vector2::new(0.7, 0.0), radius: 0.25 };
        let m = collide(&circle, &square(Vector2::zero(), 0.5)).expect("contact");
        assert!((m.normal.x - 1.0).abs() < 1e-5);
        assert!((m.point.x - 0.5).abs() < 1e-5);
        assert!(m.point.y.abs() < 1e-5);
    }

    #[test]
    fn stacked_boxes_normal_points_up_to_a() {
        let top = square(Vector2::new(0.0, 0.95), 0.5);
        let bottom = square(Vector2::zero(), 0.5);
        let m = collide(&top, &bottom).expect("contact");
        assert!((m.normal.y - 1.0).abs() < 1e-5);
        assert!((m.penetration - 0.05).abs() < 1e-4);
    }

    #[test]
    fn separated_shapes_do_not_collide() {
        assert!(collide(&square(Vector2::new(3.0, 0.0), 0.5), &square(Vector2::zero(), 0.5)).is_none());
    }
}
