use crate::math::Vector2;
use nalgebra as na;

#[cfg(feature = "serialize")]
use serde::{Serialize, Deserialize};

/// A rigid 2D transform: translation followed by rotation about the origin
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serialize", derive(Serialize, Deserialize))]
pub struct Transform {
    /// Position of the local origin in world space
    pub position: Vector2,

    /// Rotation in radians, counter-clockwise
    pub angle: f32,
}

impl Transform {
    /// Creates a new transform
    #[inline]
    pub fn new(position: Vector2, angle: f32) -> Self {
        Self { position, angle }
    }

    /// Creates a new identity transform
    #[inline]
    pub fn identity() -> Self {
        Self {
            position: Vector2::zero(),
            angle: 0.0,
        }
    }

    /// Converts to a nalgebra isometry
    #[inline]
    pub fn to_isometry(&self) -> na::Isometry2<f32> {
        na::Isometry2::new(self.position.to_nalgebra(), self.angle)
    }

    /// Rotates a direction from local space into world space
    #[inline]
    pub fn rotate(&self, v: Vector2) -> Vector2 {
        let r = na::Rotation2::new(self.angle);
        Vector2::from_nalgebra(&(r * v.to_nalgebra()))
    }

    /// Rotates a direction from world space into local space
    #[inline]
    pub fn inverse_rotate(&self, v: Vector2) -> Vector2 {
        let r = na::Rotation2::new(self.angle);
        Vector2::from_nalgebra(&(r.inverse() * v.to_nalgebra()))
    }

    /// Transforms a point from local space into world space
    #[inline]
    pub fn apply(&self, local: Vector2) -> Vector2 {
        let p = self.to_isometry() * na::Point2::new(local.x, local.y);
        Vector2::new(p.x, p.y)
    }

    /// Transforms a point from world space into local space
    #[inline]
    pub fn inverse_apply(&self, world: Vector2) -> Vector2 {
        let p = self.to_isometry().inverse_transform_point(&na::Point2::new(world.x, world.y));
        Vector2::new(p.x, p.y)
    }
}

impl Default for Transform {
    fn default() -> Self {
        Self::identity()
    }
}
