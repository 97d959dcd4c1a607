//! Destructible bodies: per-body fracture parameters, the hardness curve,
//! polygon fracture and fragment texture mapping.
//!
//! Everything here is pure geometry; spawning fragment bodies happens in the
//! world, which owns the kernel.

pub mod properties;
pub mod fracture;

pub use self::properties::{DestructibleProperties, UvRect, MIN_BOUNDS_EXTENT};
pub use self::fracture::{break_speed, fragment_uvs, root_point_from_uv, split_for_impact, FracturePiece};

/// Hard cap on fragments produced by one fracture
pub const MAX_FRAGMENTS: usize = 8;
