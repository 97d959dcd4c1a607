use crate::core::config::FractureConfig;
use crate::destruction::UvRect;
use crate::geometry::{self, split_polygon};
use crate::math::{Aabb, Vector2, EPSILON};

/// Minimum impact speed that breaks a body of the given strength.
///
/// Exponential hardness curve: every strength point above the reference level
/// multiplies the required speed by `hardness_multiplier`.
pub fn break_speed(strength: f32, config: &FractureConfig) -> f32 {
    config.base_break_speed * config.hardness_multiplier.powf(strength - config.reference_strength)
}

/// One piece of a fractured polygon
#[derive(Debug, Clone, PartialEq)]
pub struct FracturePiece {
    /// Centroid in the parent body frame
    pub centroid: Vector2,

    /// Polygon relative to `centroid`, counter-clockwise
    pub vertices: Vec<Vector2>,

    pub area: f32,
}

impl FracturePiece {
    fn from_polygon(polygon: &[Vector2]) -> Self {
        let centroid = geometry::polygon_centroid(polygon);
        Self {
            centroid,
            vertices: polygon.iter().map(|v| *v - centroid).collect(),
            area: geometry::polygon_area(polygon),
        }
    }

    /// The polygon back in the parent body frame
    pub fn parent_vertices(&self) -> Vec<Vector2> {
        self.vertices.iter().map(|v| *v + self.centroid).collect()
    }
}

fn usable(polygon: &[Vector2]) -> bool {
    polygon.len() >= 3 && geometry::polygon_area(polygon) > EPSILON
}

/// Splits a polygon in two along `normal`, first through `point`, then through
/// the centroid if the line through `point` misses the polygon
fn split_through(polygon: &[Vector2], point: Vector2, normal: Vector2) -> Option<(Vec<Vector2>, Vec<Vector2>)> {
    let (front, back) = split_polygon(polygon, point, normal);
    if usable(&front) && usable(&back) {
        return Some((front, back));
    }

    let centroid = geometry::polygon_centroid(polygon);
    let (front, back) = split_polygon(polygon, centroid, normal);
    if usable(&front) && usable(&back) {
        return Some((front, back));
    }
    None
}

/// Computes the fragments produced by an impact.
///
/// `polygon` is the body's current polygon and `point`/`normal` the impact in the
/// same frame. The crack runs along the impact direction, through the impact
/// point. Brittle bodies crack further: the largest piece is split again along
/// lines rotated by `brittleness * secondary_angle_scale` per extra split.
/// Pieces below `min_fragment_area` are dropped and at most `max_fragments`
/// are returned, so the result may be empty.
pub fn split_for_impact(
    polygon: &[Vector2],
    point: Vector2,
    normal: Vector2,
    brittleness: f32,
    config: &FractureConfig,
) -> Vec<FracturePiece> {
    let impact_dir = if normal.is_zero() { Vector2::unit_x() } else { normal.normalize() };
    let crack_normal = impact_dir.perpendicular();

    let mut pieces: Vec<Vec<Vector2>> = match split_through(polygon, point, crack_normal) {
        Some((front, back)) => vec![front, back],
        None if usable(polygon) => vec![polygon.to_vec()],
        None => Vec::new(),
    };

    if brittleness > config.secondary_brittleness_threshold && pieces.len() >= 2 {
        let span = (1.0 - config.secondary_brittleness_threshold).max(EPSILON);
        let extra = ((brittleness - config.secondary_brittleness_threshold) / span * 6.0).ceil() as usize;

        for k in 0..extra {
            if pieces.len() >= config.max_fragments {
                break;
            }

            let largest = pieces
                .iter()
                .enumerate()
                .max_by(|(_, a), (_, b)| {
                    geometry::polygon_area(a)
                        .partial_cmp(&geometry::polygon_area(b))
                        .unwrap_or(std::cmp::Ordering::Equal)
                })
                .map(|(i, _)| i);
            let Some(largest) = largest else { break };

            let target = &pieces[largest];
            let centroid = geometry::polygon_centroid(target);
            let angle = brittleness * config.secondary_angle_scale * (k + 1) as f32;
            let (front, back) = split_polygon(target, centroid, crack_normal.rotate(angle));
            if !usable(&front) || !usable(&back) {
                break;
            }
            pieces[largest] = front;
            pieces.push(back);
        }
    }

    pieces
        .iter()
        .filter(|p| geometry::is_valid_fragment(p, config.min_fragment_area))
        .take(config.max_fragments)
        .map(|p| FracturePiece::from_polygon(p))
        .collect()
}

/// Texture coordinates of a fragment polygon.
///
/// `vertices` are relative to the fragment origin, which sits at `root_offset` in
/// the root object's frame. Each vertex is normalized against `root_bounds` (v
/// grows downwards) and mapped into `rect`.
pub fn fragment_uvs(
    vertices: &[Vector2],
    root_offset: Vector2,
    root_bounds: &Aabb,
    rect: Option<UvRect>,
) -> Vec<Vector2> {
    let rect = rect.unwrap_or_default();
    let width = root_bounds.width().max(EPSILON);
    let height = root_bounds.height().max(EPSILON);

    vertices
        .iter()
        .map(|v| {
            let p = *v + root_offset;
            let u = (p.x - root_bounds.min.x) / width;
            let v = 1.0 - (p.y - root_bounds.min.y) / height;
            rect.map(Vector2::new(u, v))
        })
        .collect()
}

/// Inverse of [`fragment_uvs`] for a single coordinate: the point in the root frame
pub fn root_point_from_uv(uv: Vector2, root_bounds: &Aabb, rect: Option<UvRect>) -> Vector2 {
    let n = rect.unwrap_or_default().unmap(uv);
    Vector2::new(
        root_bounds.min.x + n.x * root_bounds.width(),
        root_bounds.min.y + (1.0 - n.y) * root_bounds.height(),
    )
}
