use crate::geometry::polygon::{signed_area, MAX_POLYGON_VERTICES};
use crate::math::Vector2;

/// Points closer than this are welded before the hull is built
pub const LINEAR_SLOP: f32 = 0.005;

/// Computes the counter-clockwise convex hull of a point set (Andrew's monotone chain).
///
/// Near-duplicate points are welded and collinear points removed. When the hull has
/// more than [`MAX_POLYGON_VERTICES`] vertices, the vertices contributing the least
/// area are dropped until it fits. An empty vector is returned when fewer than three
/// non-collinear points remain.
pub fn convex_hull(points: &[Vector2]) -> Vec<Vector2> {
    let mut welded: Vec<Vector2> = Vec::with_capacity(points.len());
    for p in points {
        if !p.x.is_finite() || !p.y.is_finite() {
            continue;
        }
        if welded.iter().all(|q| q.distance_squared(p) > LINEAR_SLOP * LINEAR_SLOP) {
            welded.push(*p);
        }
    }

    if welded.len() < 3 {
        return Vec::new();
    }

    welded.sort_by(|a, b| {
        a.x.partial_cmp(&b.x)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then(a.y.partial_cmp(&b.y).unwrap_or(std::cmp::Ordering::Equal))
    });

    let turn = |o: Vector2, a: Vector2, b: Vector2| (a - o).cross(&(b - o));

    let mut hull: Vec<Vector2> = Vec::with_capacity(welded.len() * 2);
    for p in welded.iter() {
        while hull.len() >= 2 && turn(hull[hull.len() - 2], hull[hull.len() - 1], *p) <= 0.0 {
            hull.pop();
        }
        hull.push(*p);
    }

    let lower_len = hull.len() + 1;
    for p in welded.iter().rev().skip(1) {
        while hull.len() >= lower_len && turn(hull[hull.len() - 2], hull[hull.len() - 1], *p) <= 0.0 {
            hull.pop();
        }
        hull.push(*p);
    }
    hull.pop();

    remove_collinear(&mut hull);

    while hull.len() > MAX_POLYGON_VERTICES {
        drop_least_significant_vertex(&mut hull);
    }

    if hull.len() < 3 || signed_area(&hull) <= LINEAR_SLOP * LINEAR_SLOP {
        return Vec::new();
    }

    hull
}

fn remove_collinear(hull: &mut Vec<Vector2>) {
    let mut i = 0;
    while hull.len() >= 3 && i < hull.len() {
        let prev = hull[(i + hull.len() - 1) % hull.len()];
        let next = hull[(i + 1) % hull.len()];
        let edge = next - prev;
        let length = edge.length();
        let distance = if length > 0.0 {
            (hull[i] - prev).cross(&edge).abs() / length
        } else {
            0.0
        };
        if distance < LINEAR_SLOP * 0.5 {
            hull.remove(i);
        } else {
            i += 1;
        }
    }
}

fn drop_least_significant_vertex(hull: &mut Vec<Vector2>) {
    let n = hull.len();
    let mut best = 0;
    let mut best_area = f32::MAX;
    for i in 0..n {
        let prev = hull[(i + n - 1) % n];
        let next = hull[(i + 1) % n];
        let area = (hull[i] - prev).cross(&(next - prev)).abs();
        if area < best_area {
            best_area = area;
            best = i;
        }
    }
    hull.remove(best);
}
