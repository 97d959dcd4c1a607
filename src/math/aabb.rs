use crate::math::Vector2;

#[cfg(feature = "serialize")]
use serde::{Serialize, Deserialize};

/// Axis-aligned bounding box in 2D
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serialize", derive(Serialize, Deserialize))]
pub struct Aabb {
    /// Minimum corner of the AABB
    pub min: Vector2,

    /// Maximum corner of the AABB
    pub max: Vector2,
}

impl Aabb {
    /// Creates a new AABB from minimum and maximum points
    #[inline]
    pub fn new(min: Vector2, max: Vector2) -> Self {
        Self { min, max }
    }

    /// Creates an AABB centered at a position with the given half extents
    #[inline]
    pub fn from_center_half_extents(center: Vector2, half_extents: Vector2) -> Self {
        Self {
            min: center - half_extents,
            max: center + half_extents,
        }
    }

    /// Creates an AABB from a set of points
    pub fn from_points(points: &[Vector2]) -> Option<Self> {
        let (first, rest) = points.split_first()?;

        let mut min = *first;
        let mut max = *first;

        for point in rest {
            min.x = min.x.min(point.x);
            min.y = min.y.min(point.y);

            max.x = max.x.max(point.x);
            max.y = max.y.max(point.y);
        }

        Some(Self { min, max })
    }

    /// Returns the center of the AABB
    #[inline]
    pub fn center(&self) -> Vector2 {
        (self.min + self.max) * 0.5
    }

    #[inline]
    pub fn width(&self) -> f32 {
        self.max.x - self.min.x
    }

    #[inline]
    pub fn height(&self) -> f32 {
        self.max.y - self.min.y
    }

    /// Checks if this AABB contains a point (boundary inclusive)
    #[inline]
    pub fn contains_point(&self, point: Vector2) -> bool {
        point.x >= self.min.x && point.x <= self.max.x &&
        point.y >= self.min.y && point.y <= self.max.y
    }

    /// Checks if this AABB intersects with another AABB
    #[inline]
    pub fn intersects(&self, other: &Self) -> bool {
        self.min.x <= other.max.x && self.max.x >= other.min.x &&
        self.min.y <= other.max.y && self.max.y >= other.min.y
    }

    /// Returns the smallest AABB containing both this AABB and another
    #[inline]
    pub fn merge(&self, other: &Self) -> Self {
        Self {
            min: Vector2::new(self.min.x.min(other.min.x), self.min.y.min(other.min.y)),
            max: Vector2::new(self.max.x.max(other.max.x), self.max.y.max(other.max.y)),
        }
    }

    /// Returns a copy translated by `offset`
    #[inline]
    pub fn translated(&self, offset: Vector2) -> Self {
        Self {
            min: self.min + offset,
            max: self.max + offset,
        }
    }

    /// Returns a copy whose width and height are at least `min_extent`, growing around the center
    pub fn with_min_extent(&self, min_extent: f32) -> Self {
        let center = self.center();
        let half = Vector2::new(
            self.width().max(min_extent) * 0.5,
            self.height().max(min_extent) * 0.5,
        );
        Self::from_center_half_extents(center, half)
    }
}
