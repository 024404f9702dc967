//! Common geometry types for the kernel abstraction layer.
//!
//! These types are kernel-agnostic and used to communicate between
//! the plan interpreter and the kernel implementation.

use serde::{Deserialize, Serialize};

/// A 2D point in sketch space.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point2D {
    pub x: f64,
    pub y: f64,
}

impl Point2D {
    pub const ORIGIN: Point2D = Point2D { x: 0.0, y: 0.0 };

    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

impl From<[f64; 2]> for Point2D {
    fn from(arr: [f64; 2]) -> Self {
        Self::new(arr[0], arr[1])
    }
}

/// A 3D point in world space.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point3D {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Point3D {
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    pub fn to_array(&self) -> [f64; 3] {
        [self.x, self.y, self.z]
    }
}

/// A 3D vector/direction.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Vector3D {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Vector3D {
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    pub fn unit_z() -> Self {
        Self::new(0.0, 0.0, 1.0)
    }

    /// In-plane offset to `p`, lifted by `z` along the extrusion axis.
    pub fn from_placement(p: Point2D, z: f64) -> Self {
        Self::new(p.x, p.y, z)
    }

    /// Normalize to unit length.
    pub fn normalize(&self) -> Self {
        let len = (self.x * self.x + self.y * self.y + self.z * self.z).sqrt();
        if len < 1e-10 {
            Self::unit_z() // Default to Z-up if zero vector
        } else {
            Self::new(self.x / len, self.y / len, self.z / len)
        }
    }

    pub fn is_zero(&self) -> bool {
        self.x == 0.0 && self.y == 0.0 && self.z == 0.0
    }
}

/// A closed 2D profile, centred on its local origin.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ProfileShape {
    Circle { radius: f64 },
    Rectangle { width: f64, height: f64 },
}

impl ProfileShape {
    /// Name of the plan action that produces this shape.
    pub fn action_name(&self) -> &'static str {
        match self {
            Self::Circle { .. } => "create_circle",
            Self::Rectangle { .. } => "create_rectangle",
        }
    }

    /// Counter-clockwise corner loop of a rectangle; `None` for circles.
    pub fn corners(&self) -> Option<[Point2D; 4]> {
        match *self {
            Self::Rectangle { width, height } => {
                let (hw, hh) = (width / 2.0, height / 2.0);
                Some([
                    Point2D::new(-hw, -hh),
                    Point2D::new(hw, -hh),
                    Point2D::new(hw, hh),
                    Point2D::new(-hw, hh),
                ])
            }
            Self::Circle { .. } => None,
        }
    }
}

/// Parameters for extrusion operations.
#[derive(Debug, Clone)]
pub struct ExtrudeParams {
    /// Extrusion distance (height).
    pub distance: f64,
    /// Direction vector (the sketch plane normal).
    pub direction: Vector3D,
}

impl Default for ExtrudeParams {
    fn default() -> Self {
        Self {
            distance: 10.0,
            direction: Vector3D::unit_z(),
        }
    }
}

impl ExtrudeParams {
    pub fn linear(distance: f64) -> Self {
        Self {
            distance,
            ..Default::default()
        }
    }
}

/// Axis-aligned bounds of a tessellated solid.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub min: Point3D,
    pub max: Point3D,
}

impl BoundingBox {
    pub fn size(&self) -> Vector3D {
        Vector3D::new(
            self.max.x - self.min.x,
            self.max.y - self.min.y,
            self.max.z - self.min.z,
        )
    }
}

/// Output triangle mesh from tessellation.
#[derive(Debug, Clone, Default)]
pub struct TriangleMesh {
    /// Vertex positions.
    pub positions: Vec<Point3D>,
    /// Triangle indices (each triple refers to positions).
    pub triangles: Vec<(u32, u32, u32)>,
    /// Per-triangle topological face ID.
    pub face_ids: Vec<u32>,
}

impl TriangleMesh {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_vertex(&mut self, pos: Point3D) -> u32 {
        let idx = self.positions.len() as u32;
        self.positions.push(pos);
        idx
    }

    /// Add a triangle with an associated topological face ID.
    pub fn add_triangle_with_face(&mut self, i0: u32, i1: u32, i2: u32, face_id: u32) {
        self.triangles.push((i0, i1, i2));
        self.face_ids.push(face_id);
    }

    pub fn is_empty(&self) -> bool {
        self.triangles.is_empty()
    }

    /// Number of distinct topological faces the triangles belong to.
    pub fn face_count(&self) -> usize {
        let mut ids = self.face_ids.clone();
        ids.sort_unstable();
        ids.dedup();
        ids.len()
    }

    /// Bounds over all vertices referenced by a triangle.
    pub fn bounds(&self) -> Option<BoundingBox> {
        if self.triangles.is_empty() {
            return None;
        }

        let mut min = [f64::INFINITY; 3];
        let mut max = [f64::NEG_INFINITY; 3];
        for &(i0, i1, i2) in &self.triangles {
            for idx in [i0, i1, i2] {
                let p = self.positions.get(idx as usize)?.to_array();
                for k in 0..3 {
                    min[k] = min[k].min(p[k]);
                    max[k] = max[k].max(p[k]);
                }
            }
        }

        Some(BoundingBox {
            min: Point3D::new(min[0], min[1], min[2]),
            max: Point3D::new(max[0], max[1], max[2]),
        })
    }
}
