use crate::error::PhysicsError;
use crate::geometry::{self, MAX_POLYGON_VERTICES};
use crate::math::{Aabb, Vector2};
use crate::Result;

#[cfg(feature = "serialize")]
use serde::{Serialize, Deserialize};

/// Bounding boxes narrower than this are widened so UV normalization never divides by zero
pub const MIN_BOUNDS_EXTENT: f32 = 1.0e-4;

/// A sub-rectangle of a texture, in UV space
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serialize", derive(Serialize, Deserialize))]
pub struct UvRect {
    pub min: Vector2,
    pub max: Vector2,
}

impl UvRect {
    /// The whole texture
    pub const FULL: Self = Self {
        min: Vector2::new(0.0, 0.0),
        max: Vector2::new(1.0, 1.0),
    };

    pub fn new(min: Vector2, max: Vector2) -> Self {
        Self { min, max }
    }

    /// Maps normalized `[0, 1]` coordinates into this rectangle
    #[inline]
    pub fn map(&self, normalized: Vector2) -> Vector2 {
        Vector2::new(
            self.min.x + normalized.x * (self.max.x - self.min.x),
            self.min.y + normalized.y * (self.max.y - self.min.y),
        )
    }

    /// Inverse of [`UvRect::map`]
    #[inline]
    pub fn unmap(&self, uv: Vector2) -> Vector2 {
        let width = self.max.x - self.min.x;
        let height = self.max.y - self.min.y;
        Vector2::new(
            if width != 0.0 { (uv.x - self.min.x) / width } else { 0.0 },
            if height != 0.0 { (uv.y - self.min.y) / height } else { 0.0 },
        )
    }
}

impl Default for UvRect {
    fn default() -> Self {
        Self::FULL
    }
}

/// Per-body fracture parameters.
///
/// Each fragment receives its own copy; there is no link back to the parent.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serialize", derive(Serialize, Deserialize))]
pub struct DestructibleProperties {
    /// Mohs-like hardness, typically 1-10
    pub strength: f32,

    /// 0-1; drives secondary splits and whether fragments stay destructible
    pub brittleness: f32,

    pub is_destructible: bool,

    /// Current polygon in the body frame, counter-clockwise, 3 to 8 vertices
    vertices: Vec<Vector2>,

    /// Bounds of `vertices`, clamped to a minimum extent
    bounds: Aabb,

    /// Bounds of the pre-fracture object, in that object's frame
    pub root_bounds: Option<Aabb>,

    /// Position of this body's origin in the root object's frame
    pub root_offset: Vector2,

    pub texture: Option<u64>,
    pub normal_map: Option<u64>,
    pub pipeline: Option<u64>,

    /// Atlas sub-rectangle for the texture
    pub texture_uv: Option<UvRect>,

    /// Atlas sub-rectangle for the normal map
    pub normal_uv: Option<UvRect>,
}

impl DestructibleProperties {
    /// Creates destructible properties for a polygon given in the body frame
    pub fn new(strength: f32, brittleness: f32, vertices: &[Vector2]) -> Result<Self> {
        if !(3..=MAX_POLYGON_VERTICES).contains(&vertices.len()) {
            return Err(PhysicsError::InvalidParameter(format!(
                "destructible polygon needs 3 to {} vertices, got {}",
                MAX_POLYGON_VERTICES,
                vertices.len()
            )));
        }

        let vertices = geometry::ensure_counter_clockwise(vertices);
        let bounds = clamped_bounds(&vertices);

        Ok(Self {
            strength,
            brittleness: brittleness.clamp(0.0, 1.0),
            is_destructible: true,
            vertices,
            bounds,
            root_bounds: None,
            root_offset: Vector2::zero(),
            texture: None,
            normal_map: None,
            pipeline: None,
            texture_uv: None,
            normal_uv: None,
        })
    }

    /// Axis-aligned box centered on the body origin
    pub fn rectangle(strength: f32, brittleness: f32, width: f32, height: f32) -> Result<Self> {
        let hw = width * 0.5;
        let hh = height * 0.5;
        Self::new(strength, brittleness, &[
            Vector2::new(-hw, -hh),
            Vector2::new(hw, -hh),
            Vector2::new(hw, hh),
            Vector2::new(-hw, hh),
        ])
    }

    pub fn with_texture(mut self, texture: u64) -> Self {
        self.texture = Some(texture);
        self
    }

    pub fn with_normal_map(mut self, normal_map: u64) -> Self {
        self.normal_map = Some(normal_map);
        self
    }

    pub fn with_pipeline(mut self, pipeline: u64) -> Self {
        self.pipeline = Some(pipeline);
        self
    }

    pub fn with_texture_uv(mut self, rect: UvRect) -> Self {
        self.texture_uv = Some(rect);
        self
    }

    pub fn with_normal_uv(mut self, rect: UvRect) -> Self {
        self.normal_uv = Some(rect);
        self
    }

    /// Marks the polygon as a piece of a larger object whose bounds are `root_bounds`,
    /// with this body's origin at `root_offset` in the root frame
    pub fn with_root(mut self, root_bounds: Aabb, root_offset: Vector2) -> Self {
        self.root_bounds = Some(root_bounds.with_min_extent(MIN_BOUNDS_EXTENT));
        self.root_offset = root_offset;
        self
    }

    #[inline]
    pub fn vertices(&self) -> &[Vector2] {
        &self.vertices
    }

    #[inline]
    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    #[inline]
    pub fn bounds(&self) -> Aabb {
        self.bounds
    }

    /// Bounds used for UV mapping: the root bounds, or this polygon's own bounds
    /// translated into the root frame when no root is recorded
    pub fn effective_root_bounds(&self) -> Aabb {
        self.root_bounds
            .unwrap_or_else(|| self.bounds.translated(self.root_offset))
    }

    /// Properties for a fragment whose polygon is `vertices` (relative to the
    /// fragment's own origin) and whose origin sits at `origin` in this body's frame
    pub fn for_fragment(&self, vertices: &[Vector2], origin: Vector2) -> Result<Self> {
        let mut child = Self::new(self.strength, self.brittleness, vertices)?;
        child.root_bounds = Some(self.effective_root_bounds());
        child.root_offset = self.root_offset + origin;
        child.texture = self.texture;
        child.normal_map = self.normal_map;
        child.pipeline = self.pipeline;
        child.texture_uv = self.texture_uv;
        child.normal_uv = self.normal_uv;
        Ok(child)
    }
}

fn clamped_bounds(vertices: &[Vector2]) -> Aabb {
    geometry::bounding_box(vertices)
        .unwrap_or_else(|| Aabb::new(Vector2::zero(), Vector2::zero()))
        .with_min_extent(MIN_BOUNDS_EXTENT)
}
