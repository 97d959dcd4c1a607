use crate::math::{Aabb, Vector2, EPSILON};

/// Maximum number of vertices a polygon shape may carry
pub const MAX_POLYGON_VERTICES: usize = 8;

/// Signed shoelace area; positive for counter-clockwise winding
pub fn signed_area(points: &[Vector2]) -> f32 {
    if points.len() < 3 {
        return 0.0;
    }

    let mut twice_area = 0.0;
    for (i, a) in points.iter().enumerate() {
        let b = points[(i + 1) % points.len()];
        twice_area += a.cross(&b);
    }

    twice_area * 0.5
}

/// Unsigned shoelace area
#[inline]
pub fn polygon_area(points: &[Vector2]) -> f32 {
    signed_area(points).abs()
}

/// Area-weighted centroid of a simple polygon.
///
/// Falls back to the vertex average when the polygon has no measurable area.
pub fn polygon_centroid(points: &[Vector2]) -> Vector2 {
    if points.is_empty() {
        return Vector2::zero();
    }

    let area = signed_area(points);
    if area.abs() <= EPSILON {
        let sum = points.iter().fold(Vector2::zero(), |acc, p| acc + *p);
        return sum / points.len() as f32;
    }

    // Accumulate relative to the first vertex to limit round-off on far-away polygons
    let origin = points[0];
    let mut center = Vector2::zero();
    for i in 0..points.len() {
        let a = points[i] - origin;
        let b = points[(i + 1) % points.len()] - origin;
        center += (a + b) * a.cross(&b);
    }

    origin + center / (6.0 * area)
}

/// Bounding box of a point set
#[inline]
pub fn bounding_box(points: &[Vector2]) -> Option<Aabb> {
    Aabb::from_points(points)
}

/// Even-odd point containment test; works for convex and simple concave polygons
pub fn point_in_polygon(point: Vector2, points: &[Vector2]) -> bool {
    if points.len() < 3 {
        return false;
    }

    let mut inside = false;
    let mut j = points.len() - 1;
    for i in 0..points.len() {
        let (pi, pj) = (points[i], points[j]);
        if (pi.y > point.y) != (pj.y > point.y) {
            let x_cross = (pj.x - pi.x) * (point.y - pi.y) / (pj.y - pi.y) + pi.x;
            if point.x < x_cross {
                inside = !inside;
            }
        }
        j = i;
    }

    inside
}

/// Returns the polygon with counter-clockwise winding
pub fn ensure_counter_clockwise(points: &[Vector2]) -> Vec<Vector2> {
    let mut out = points.to_vec();
    if signed_area(&out) < 0.0 {
        out.reverse();
    }
    out
}

/// Splits a convex polygon along the line through `line_point` whose normal is `line_normal`.
///
/// Each vertex is classified by its signed distance to the line. Vertices on the
/// positive side go to the first output, the rest to the second; an edge that
/// crosses the line contributes its interpolated intersection to both outputs.
/// Either output may come back with fewer than three vertices when the line
/// misses the polygon.
pub fn split_polygon(
    points: &[Vector2],
    line_point: Vector2,
    line_normal: Vector2,
) -> (Vec<Vector2>, Vec<Vector2>) {
    let mut front = Vec::with_capacity(points.len() + 2);
    let mut back = Vec::with_capacity(points.len() + 2);

    if points.len() < 3 {
        return (front, back);
    }

    let distance = |p: &Vector2| (*p - line_point).dot(&line_normal);

    for i in 0..points.len() {
        let current = points[i];
        let next = points[(i + 1) % points.len()];
        let d_current = distance(&current);
        let d_next = distance(&next);

        if d_current >= 0.0 {
            front.push(current);
        } else {
            back.push(current);
        }

        let crosses = (d_current > 0.0 && d_next < 0.0) || (d_current < 0.0 && d_next > 0.0);
        if crosses {
            let t = d_current / (d_current - d_next);
            let intersection = current.lerp(&next, t);
            front.push(intersection);
            back.push(intersection);
        } else if d_current == 0.0 {
            // A vertex lying exactly on the line belongs to both sides
            back.push(current);
        }
    }

    (front, back)
}

/// Whether a polygon is usable as a fragment: at least three vertices and at least `min_area`
#[inline]
pub fn is_valid_fragment(points: &[Vector2], min_area: f32) -> bool {
    points.len() >= 3 && polygon_area(points) >= min_area.max(EPSILON)
}
