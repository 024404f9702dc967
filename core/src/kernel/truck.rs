//! Truck-based implementation of the geometry kernel.
//!
//! This module provides a CAD kernel implementation using the Truck library,
//! which is licensed under Apache-2.0 (MIT-compatible).

use super::types::*;
use super::{GeometryKernel, KernelOpError, KernelResult};

// Use truck's pre-exported types which come from cgmath64
use truck_meshalgo::tessellation::{MeshableShape, MeshedShape};
use truck_modeling::{builder, Face, Point3, Rad, Solid, Vector3, Vertex, Wire};
use truck_polymesh::stl::{self, StlType};

/// Truck-based CAD kernel implementation.
pub struct TruckKernel {
    /// Tessellation tolerance for mesh generation.
    pub tolerance: f64,
    /// Tolerance handed to truck-shapeops for boolean operations.
    pub boolean_tolerance: f64,
}

impl TruckKernel {
    pub fn new() -> Self {
        Self {
            tolerance: 0.01, // 0.01mm precision
            boolean_tolerance: 0.05,
        }
    }

    pub fn with_tolerance(tolerance: f64) -> Self {
        Self {
            tolerance,
            ..Self::new()
        }
    }
}

impl Default for TruckKernel {
    fn default() -> Self {
        Self::new()
    }
}

fn to_truck_vector(v: Vector3D) -> Vector3 {
    Vector3::new(v.x, v.y, v.z)
}

impl GeometryKernel for TruckKernel {
    type Profile = Face;
    type Solid = Solid;

    fn make_profile(&self, shape: &ProfileShape) -> KernelResult<Self::Profile> {
        let wire = match *shape {
            ProfileShape::Circle { radius } => {
                if !(radius > 0.0 && radius.is_finite()) {
                    return Err(KernelOpError::InvalidGeometry(format!(
                        "Circle radius must be positive, got {}",
                        radius
                    )));
                }
                self.build_circle_wire(radius)
            }
            ProfileShape::Rectangle { width, height } => {
                if !(width > 0.0 && height > 0.0 && width.is_finite() && height.is_finite()) {
                    return Err(KernelOpError::InvalidGeometry(format!(
                        "Rectangle sides must be positive, got {} x {}",
                        width, height
                    )));
                }
                let corners = shape.corners().ok_or_else(|| {
                    KernelOpError::InvalidGeometry("Rectangle has no corner loop".into())
                })?;
                self.build_wire_from_points(&corners)?
            }
        };

        builder::try_attach_plane(&[wire])
            .map_err(|e| KernelOpError::OperationFailed(format!("Failed to create face: {:?}", e)))
    }

    fn extrude(&self, profile: &Self::Profile, params: &ExtrudeParams) -> KernelResult<Self::Solid> {
        if !(params.distance > 0.0 && params.distance.is_finite()) {
            return Err(KernelOpError::InvalidGeometry(format!(
                "Extrusion distance must be positive, got {}",
                params.distance
            )));
        }

        // Calculate extrusion vector
        let dir = params.direction.normalize();
        let extrusion_vec = Vector3::new(
            dir.x * params.distance,
            dir.y * params.distance,
            dir.z * params.distance,
        );

        // Sweep to create solid
        Ok(builder::tsweep(profile, extrusion_vec))
    }

    fn translate(&self, solid: &Self::Solid, offset: Vector3D) -> KernelResult<Self::Solid> {
        if offset.is_zero() {
            return Ok(solid.clone());
        }
        Ok(builder::translated(solid, to_truck_vector(offset)))
    }

    // === Boolean Operations ===

    fn boolean_union(&self, solid_a: &Self::Solid, solid_b: &Self::Solid) -> KernelResult<Self::Solid> {
        truck_shapeops::or(solid_a, solid_b, self.boolean_tolerance)
            .ok_or_else(|| KernelOpError::OperationFailed("Boolean union failed".into()))
    }

    fn boolean_subtract(&self, solid_a: &Self::Solid, solid_b: &Self::Solid) -> KernelResult<Self::Solid> {
        // Subtraction is: A - B = A AND (NOT B)
        // Solid::not() mutates in place, so we clone first
        let mut complement_b = solid_b.clone();
        complement_b.not();
        truck_shapeops::and(solid_a, &complement_b, self.boolean_tolerance)
            .ok_or_else(|| KernelOpError::OperationFailed("Boolean subtraction failed".into()))
    }

    // === Mesh Output ===

    fn tessellate(&self, solid: &Self::Solid) -> KernelResult<TriangleMesh> {
        // triangulation returns a Solid<Point3, PolylineCurve, Option<PolygonMesh>>
        // where each face has an Option<PolygonMesh> instead of Surface
        let meshed_solid = solid.triangulation(self.tolerance);

        let mut mesh = TriangleMesh::new();
        let mut vertex_offset: u32 = 0;
        let mut face_id: u32 = 0;

        for shell in meshed_solid.boundaries() {
            for face in shell.face_iter() {
                if let Some(polygon_mesh) = face.surface() {
                    let positions = polygon_mesh.positions();
                    for pos in positions.iter() {
                        mesh.add_vertex(Point3D::new(pos.x, pos.y, pos.z));
                    }

                    // All triangles in this loop belong to the same topological face
                    for tri in polygon_mesh.tri_faces() {
                        mesh.add_triangle_with_face(
                            vertex_offset + tri[0].pos as u32,
                            vertex_offset + tri[1].pos as u32,
                            vertex_offset + tri[2].pos as u32,
                            face_id,
                        );
                    }

                    vertex_offset += positions.len() as u32;
                }
                face_id += 1;
            }
        }

        if mesh.is_empty() {
            return Err(KernelOpError::TessellationFailed(
                "Solid produced no triangles".into(),
            ));
        }

        Ok(mesh)
    }

    fn encode_mesh(&self, solid: &Self::Solid) -> KernelResult<Vec<u8>> {
        let polygon = solid.triangulation(self.tolerance).to_polygon();

        let mut bytes = Vec::new();
        stl::write(&polygon, &mut bytes, StlType::Binary)
            .map_err(|e| KernelOpError::EncodingFailed(e.to_string()))?;
        Ok(bytes)
    }
}

impl TruckKernel {
    /// Build a closed truck Wire from 2D points (as 3D with z=0).
    fn build_wire_from_points(&self, points: &[Point2D]) -> KernelResult<Wire> {
        if points.len() < 3 {
            return Err(KernelOpError::InvalidGeometry(
                "Wire requires at least 3 points".into(),
            ));
        }

        let mut vertices: Vec<Vertex> = points
            .iter()
            .map(|p| builder::vertex(Point3::new(p.x, p.y, 0.0)))
            .collect();

        // Close the loop
        vertices.push(vertices[0].clone());

        let edges = vertices
            .windows(2)
            .map(|pair| builder::line(&pair[0], &pair[1]));
        Ok(Wire::from_iter(edges))
    }

    /// Build a circular wire around the sketch origin using rsweep (rotational
    /// sweep of a vertex). This creates a true circle edge, so the extruded
    /// side is a single cylindrical face.
    fn build_circle_wire(&self, radius: f64) -> Wire {
        let v: Vertex = builder::vertex(Point3::new(radius, 0.0, 0.0));

        // Truck requires angle > 2π for closed shapes (2π ≈ 6.28, so use 7.0)
        builder::rsweep(
            &v,
            Point3::new(0.0, 0.0, 0.0),
            Vector3::new(0.0, 0.0, 1.0), // Axis perpendicular to XY plane
            Rad(7.0),
        )
    }
}
