use phys_shatter::geometry::{
    convex_hull, ensure_counter_clockwise, point_in_polygon, polygon_area, polygon_centroid, signed_area,
    split_polygon, MAX_POLYGON_VERTICES,
};
use phys_shatter::math::{Aabb, Transform, Vector2};
use std::f32::consts::PI;
use approx::assert_relative_eq;

#[test]
fn test_vector2_operations() {
    let v1 = Vector2::new(1.0, 2.0);
    let v2 = Vector2::new(4.0, 5.0);

    let sum = v1 + v2;
    assert_eq!(sum, Vector2::new(5.0, 7.0));

    let diff = v2 - v1;
    assert_eq!(diff, Vector2::new(3.0, 3.0));

    let scaled = v1 * 2.0;
    assert_eq!(scaled, Vector2::new(2.0, 4.0));

    assert_eq!(v1.dot(&v2), 14.0);
    // 2D cross product is the z component of the 3D one
    assert_eq!(v1.cross(&v2), 1.0 * 5.0 - 2.0 * 4.0);

    let length = v1.length();
    assert_relative_eq!(length, 5.0f32.sqrt());
    let normalized = v1.normalize();
    assert_relative_eq!(normalized.length(), 1.0);
    assert_relative_eq!(normalized.x, v1.x / length);

    assert!(Vector2::zero().normalize().is_zero());
}

#[test]
fn test_vector2_rotation() {
    let v = Vector2::unit_x();

    let quarter = v.rotate(PI / 2.0);
    assert_relative_eq!(quarter.x, 0.0, epsilon = 1e-6);
    assert_relative_eq!(quarter.y, 1.0, epsilon = 1e-6);

    assert_eq!(v.perpendicular(), Vector2::unit_y());
    assert_relative_eq!(Vector2::new(0.0, -1.0).angle(), -PI / 2.0);
}

#[test]
fn test_transform_operations() {
    let t = Transform::new(Vector2::new(1.0, 2.0), PI / 2.0);

    let p = t.apply(Vector2::new(1.0, 0.0));
    assert_relative_eq!(p.x, 1.0, epsilon = 1e-6);
    assert_relative_eq!(p.y, 3.0, epsilon = 1e-6);

    let back = t.inverse_apply(p);
    assert_relative_eq!(back.x, 1.0, epsilon = 1e-6);
    assert_relative_eq!(back.y, 0.0, epsilon = 1e-6);

    // Directions ignore translation
    let d = t.rotate(Vector2::unit_x());
    assert_relative_eq!(d.x, 0.0, epsilon = 1e-6);
    assert_relative_eq!(d.y, 1.0, epsilon = 1e-6);
    let d = t.inverse_rotate(d);
    assert_relative_eq!(d.x, 1.0, epsilon = 1e-6);

    assert_eq!(Transform::default(), Transform::identity());
}

#[test]
fn test_aabb_operations() {
    let aabb = Aabb::new(Vector2::new(-1.0, -2.0), Vector2::new(3.0, 2.0));

    assert_eq!(aabb.center(), Vector2::new(1.0, 0.0));
    assert_eq!(aabb.width(), 4.0);
    assert_eq!(aabb.height(), 4.0);
    assert!(aabb.contains_point(Vector2::new(0.0, 0.0)));
    assert!(!aabb.contains_point(Vector2::new(4.0, 0.0)));

    let other = Aabb::new(Vector2::new(2.0, 1.0), Vector2::new(5.0, 5.0));
    assert!(aabb.intersects(&other));
    let merged = aabb.merge(&other);
    assert_eq!(merged.min, Vector2::new(-1.0, -2.0));
    assert_eq!(merged.max, Vector2::new(5.0, 5.0));

    let moved = aabb.translated(Vector2::new(10.0, 0.0));
    assert!(!moved.intersects(&aabb));

    let flat = Aabb::new(Vector2::new(0.0, 1.0), Vector2::new(2.0, 1.0)).with_min_extent(0.5);
    assert_relative_eq!(flat.height(), 0.5);
    assert_relative_eq!(flat.width(), 2.0);
    assert_relative_eq!(flat.center().y, 1.0);

    assert!(Aabb::from_points(&[]).is_none());
}

#[test]
fn test_polygon_measures() {
    let clockwise = vec![
        Vector2::new(0.0, 0.0),
        Vector2::new(0.0, 2.0),
        Vector2::new(2.0, 2.0),
        Vector2::new(2.0, 0.0),
    ];
    assert!(signed_area(&clockwise) < 0.0);
    assert_relative_eq!(polygon_area(&clockwise), 4.0);

    let ccw = ensure_counter_clockwise(&clockwise);
    assert!(signed_area(&ccw) > 0.0);

    let centroid = polygon_centroid(&ccw);
    assert_relative_eq!(centroid.x, 1.0, epsilon = 1e-6);
    assert_relative_eq!(centroid.y, 1.0, epsilon = 1e-6);

    assert!(point_in_polygon(Vector2::new(1.0, 1.5), &ccw));
    assert!(!point_in_polygon(Vector2::new(3.0, 1.0), &ccw));
}

#[test]
fn test_split_polygon() {
    let square = vec![
        Vector2::new(0.0, 0.0),
        Vector2::new(2.0, 0.0),
        Vector2::new(2.0, 2.0),
        Vector2::new(0.0, 2.0),
    ];

    // Diagonal cut through opposite corners
    let (front, back) = split_polygon(&square, Vector2::zero(), Vector2::new(1.0, -1.0).normalize());
    assert_relative_eq!(polygon_area(&front), 2.0, epsilon = 1e-5);
    assert_relative_eq!(polygon_area(&back), 2.0, epsilon = 1e-5);

    // A line that misses leaves one side empty
    let (front, back) = split_polygon(&square, Vector2::new(5.0, 0.0), Vector2::unit_x());
    assert!(front.is_empty());
    assert_eq!(back.len(), 4);
}

#[test]
fn test_convex_hull() {
    let points = vec![
        Vector2::new(0.0, 0.0),
        Vector2::new(1.0, 1.0),
        Vector2::new(2.0, 0.0),
        Vector2::new(2.0, 2.0),
        Vector2::new(0.0, 2.0),
        Vector2::new(1.0, 0.0),
        Vector2::new(0.001, 0.0),
    ];
    let hull = convex_hull(&points);
    assert_eq!(hull.len(), 4);
    assert!(signed_area(&hull) > 0.0);
    assert_relative_eq!(polygon_area(&hull), 4.0, epsilon = 1e-5);

    // Collinear input has no hull
    assert!(convex_hull(&[Vector2::zero(), Vector2::unit_x(), Vector2::new(2.0, 0.0)]).is_empty());

    let circle: Vec<Vector2> = (0..32)
        .map(|i| Vector2::unit_x().rotate(i as f32 / 32.0 * 2.0 * PI))
        .collect();
    let hull = convex_hull(&circle);
    assert!(hull.len() <= MAX_POLYGON_VERTICES);
    assert!(polygon_area(&hull) > 2.0);
}
