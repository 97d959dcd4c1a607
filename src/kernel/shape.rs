use bitflags::bitflags;

use crate::geometry::{self, MAX_POLYGON_VERTICES};
use crate::math::{Aabb, Transform, Vector2};

#[cfg(feature = "serialize")]
use serde::{Serialize, Deserialize};

/// Surface and mass properties of a shape
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serialize", derive(Serialize, Deserialize))]
pub struct Material {
    /// Mass per unit area
    pub density: f32,

    /// Coulomb friction coefficient
    pub friction: f32,

    /// Coefficient of restitution (bounciness), 0-1
    pub restitution: f32,
}

impl Material {
    /// Creates a new material with the specified properties
    pub fn new(density: f32, friction: f32, restitution: f32) -> Self {
        Self {
            density,
            friction,
            restitution,
        }
    }

    /// Low friction, some bounce
    pub fn ice() -> Self {
        Self::new(0.9, 0.05, 0.4)
    }

    /// Grippy and bouncy
    pub fn rubber() -> Self {
        Self::new(1.2, 0.8, 0.7)
    }

    pub fn wood() -> Self {
        Self::new(0.7, 0.6, 0.2)
    }

    pub fn glass() -> Self {
        Self::new(2.5, 0.4, 0.1)
    }

    pub fn stone() -> Self {
        Self::new(2.4, 0.9, 0.1)
    }
}

impl Default for Material {
    fn default() -> Self {
        Self {
            density: 1.0,
            friction: 0.6,
            restitution: 0.0,
        }
    }
}

bitflags! {
    /// Per-shape behavior switches
    #[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
    pub struct ShapeFlags: u32 {
        /// Shape detects overlaps but never produces a contact response
        const SENSOR = 0x01;

        /// Shape reports begin-touch contact events
        const CONTACT_EVENTS = 0x02;

        /// Shape reports (or, for sensors, is reported in) sensor events
        const SENSOR_EVENTS = 0x04;
    }
}

/// Shape geometry, expressed in the owning body's local frame
#[derive(Debug, Clone, PartialEq)]
pub enum ShapeGeometry {
    Circle {
        center: Vector2,
        radius: f32,
    },

    /// Convex, counter-clockwise, 3 to 8 vertices
    Polygon {
        vertices: Vec<Vector2>,
    },

    Segment {
        a: Vector2,
        b: Vector2,
    },
}

/// Mass, local centroid and rotational inertia about the local origin
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct MassData {
    pub mass: f32,
    pub center: Vector2,
    pub inertia_about_origin: f32,
}

/// Shape geometry placed in world space, ready for the narrow phase
#[derive(Debug, Clone)]
pub(crate) enum WorldGeometry {
    Circle { center: Vector2, radius: f32 },

    /// Convex point set; segments are carried as two-vertex polygons
    Polygon { vertices: Vec<Vector2> },
}

impl ShapeGeometry {
    /// Axis-aligned box centered on the local origin
    pub fn rectangle(width: f32, height: f32) -> Self {
        let hw = width * 0.5;
        let hh = height * 0.5;
        Self::Polygon {
            vertices: vec![
                Vector2::new(-hw, -hh),
                Vector2::new(hw, -hh),
                Vector2::new(hw, hh),
                Vector2::new(-hw, hh),
            ],
        }
    }

    /// Whether the geometry can be simulated
    pub fn is_valid(&self) -> bool {
        match self {
            Self::Circle { radius, .. } => *radius > 0.0 && radius.is_finite(),
            Self::Polygon { vertices } => {
                (3..=MAX_POLYGON_VERTICES).contains(&vertices.len()) && geometry::signed_area(vertices) > 0.0
            }
            Self::Segment { a, b } => a.distance_squared(b) > 0.0,
        }
    }

    pub(crate) fn mass_data(&self, density: f32) -> MassData {
        match self {
            Self::Circle { center, radius } => {
                let mass = density * std::f32::consts::PI * radius * radius;
                MassData {
                    mass,
                    center: *center,
                    inertia_about_origin: mass * (0.5 * radius * radius + center.length_squared()),
                }
            }
            Self::Polygon { vertices } => polygon_mass(vertices, density),
            Self::Segment { a, b } => MassData {
                mass: 0.0,
                center: (*a + *b) * 0.5,
                inertia_about_origin: 0.0,
            },
        }
    }

    pub(crate) fn to_world(&self, xf: &Transform) -> WorldGeometry {
        match self {
            Self::Circle { center, radius } => WorldGeometry::Circle {
                center: xf.apply(*center),
                radius: *radius,
            },
            Self::Polygon { vertices } => WorldGeometry::Polygon {
                vertices: vertices.iter().map(|v| xf.apply(*v)).collect(),
            },
            Self::Segment { a, b } => WorldGeometry::Polygon {
                vertices: vec![xf.apply(*a), xf.apply(*b)],
            },
        }
    }

    /// Point containment in the local frame; segments contain nothing
    pub fn contains_local_point(&self, point: Vector2) -> bool {
        match self {
            Self::Circle { center, radius } => point.distance_squared(center) <= radius * radius,
            Self::Polygon { vertices } => geometry::point_in_polygon(point, vertices),
            Self::Segment { .. } => false,
        }
    }
}

impl WorldGeometry {
    pub(crate) fn aabb(&self) -> Aabb {
        match self {
            Self::Circle { center, radius } => {
                Aabb::from_center_half_extents(*center, Vector2::new(*radius, *radius))
            }
            Self::Polygon { vertices } => {
                Aabb::from_points(vertices).unwrap_or_else(|| Aabb::new(Vector2::zero(), Vector2::zero()))
            }
        }
    }
}

fn polygon_mass(vertices: &[Vector2], density: f32) -> MassData {
    // Triangle fan about the first vertex
    let origin = vertices[0];
    let mut area = 0.0;
    let mut center = Vector2::zero();
    let mut inertia = 0.0;

    for i in 1..vertices.len().saturating_sub(1) {
        let e1 = vertices[i] - origin;
        let e2 = vertices[i + 1] - origin;
        let d = e1.cross(&e2);
        let tri_area = 0.5 * d;
        area += tri_area;
        center += (e1 + e2) * (tri_area / 3.0);

        let int_x2 = e1.x * e1.x + e2.x * e1.x + e2.x * e2.x;
        let int_y2 = e1.y * e1.y + e2.y * e1.y + e2.y * e2.y;
        inertia += (0.25 / 3.0 * d) * (int_x2 + int_y2);
    }

    if area <= 0.0 {
        return MassData {
            mass: 0.0,
            center: origin,
            inertia_about_origin: 0.0,
        };
    }

    let mass = density * area;
    let local_center = center / area;
    let world_center = origin + local_center;

    // Inertia about `origin`, shifted to the centroid and then to the body origin
    let inertia_centroid = density * inertia - mass * local_center.length_squared();
    MassData {
        mass,
        center: world_center,
        inertia_about_origin: inertia_centroid + mass * world_center.length_squared(),
    }
}

/// Describes a shape to attach to a body
#[derive(Debug, Clone)]
pub struct ShapeDef {
    pub geometry: ShapeGeometry,
    pub material: Material,
    pub flags: ShapeFlags,
}

impl ShapeDef {
    /// A solid shape with contact and sensor events enabled
    pub fn solid(geometry: ShapeGeometry, material: Material) -> Self {
        Self {
            geometry,
            material,
            flags: ShapeFlags::CONTACT_EVENTS | ShapeFlags::SENSOR_EVENTS,
        }
    }

    /// A sensor-only trigger volume
    pub fn sensor(geometry: ShapeGeometry) -> Self {
        Self {
            geometry,
            material: Material::default(),
            flags: ShapeFlags::SENSOR | ShapeFlags::SENSOR_EVENTS,
        }
    }

    #[inline]
    pub fn is_sensor(&self) -> bool {
        self.flags.contains(ShapeFlags::SENSOR)
    }
}
