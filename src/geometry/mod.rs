//! Polygon utilities used by the kernel shapes and the fracture engine.

mod polygon;
mod convex_hull;

pub use polygon::{
    signed_area, polygon_area, polygon_centroid, bounding_box, point_in_polygon,
    ensure_counter_clockwise, split_polygon, is_valid_fragment, MAX_POLYGON_VERTICES,
};
pub use convex_hull::{convex_hull, LINEAR_SLOP};
