use crate::core::BodyId;
use crate::kernel::ShapeGeometry;
use crate::math::{Transform, Vector2};

/// World-space outline of one shape, for debug drawing
#[derive(Debug, Clone, PartialEq)]
pub enum DebugOutline {
    Polygon(Vec<Vector2>),
    Circle { center: Vector2, radius: f32 },
    Segment { a: Vector2, b: Vector2 },
}

impl DebugOutline {
    pub(crate) fn from_geometry(geometry: &ShapeGeometry, xf: &Transform) -> Self {
        match geometry {
            ShapeGeometry::Circle { center, radius } => Self::Circle {
                center: xf.apply(*center),
                radius: *radius,
            },
            ShapeGeometry::Polygon { vertices } => {
                Self::Polygon(vertices.iter().map(|v| xf.apply(*v)).collect())
            }
            ShapeGeometry::Segment { a, b } => Self::Segment {
                a: xf.apply(*a),
                b: xf.apply(*b),
            },
        }
    }
}

/// A cached debug outline as of the last completed step
#[derive(Debug, Clone, PartialEq)]
pub struct DebugShape {
    /// Owning body; `None` for force-field volumes
    pub body: Option<BodyId>,
    pub is_sensor: bool,
    pub outline: DebugOutline,
}
