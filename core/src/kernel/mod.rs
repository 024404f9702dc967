//! Kernel abstraction layer for CAD geometry operations.
//!
//! The plan interpreter only talks to the [`GeometryKernel`] trait, so the
//! Truck implementation can be swapped (or faked in tests) without touching
//! the build logic.

pub mod types;
mod truck;


pub use truck::TruckKernel;
pub use types::*;

use thiserror::Error;

/// Errors that can occur during kernel operations.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum KernelOpError {
    #[error("Invalid geometry: {0}")]
    InvalidGeometry(String),

    #[error("Operation failed: {0}")]
    OperationFailed(String),

    #[error("Tessellation failed: {0}")]
    TessellationFailed(String),

    #[error("Mesh encoding failed: {0}")]
    EncodingFailed(String),
}

/// Result type for kernel operations.
pub type KernelResult<T> = Result<T, KernelOpError>;

/// Abstract interface for the geometry operations a construction plan needs.
///
/// Profiles live in the XY plane and are extruded along +Z. Implementations
/// must be usable from several threads at once; every operation takes `&self`
/// and returns fresh values.
pub trait GeometryKernel: Send + Sync {
    /// The kernel's 2D profile representation.
    type Profile: Clone;

    /// The kernel's internal solid representation.
    type Solid: Clone;

    /// Build a profile centred on the sketch origin.
    fn make_profile(&self, shape: &ProfileShape) -> KernelResult<Self::Profile>;

    /// Extrude a profile along a direction to create a solid.
    fn extrude(&self, profile: &Self::Profile, params: &ExtrudeParams) -> KernelResult<Self::Solid>;

    /// Return a copy of `solid` moved by `offset`.
    fn translate(&self, solid: &Self::Solid, offset: Vector3D) -> KernelResult<Self::Solid>;

    // === Boolean Operations ===

    /// Compute the union of two solids (A ∪ B).
    fn boolean_union(&self, solid_a: &Self::Solid, solid_b: &Self::Solid) -> KernelResult<Self::Solid>;

    /// Compute the difference of two solids (A - B).
    fn boolean_subtract(&self, solid_a: &Self::Solid, solid_b: &Self::Solid) -> KernelResult<Self::Solid>;

    // === Mesh Output ===

    /// Convert a solid to a triangle mesh.
    fn tessellate(&self, solid: &Self::Solid) -> KernelResult<TriangleMesh>;

    /// Encode a solid as a binary STL document.
    fn encode_mesh(&self, solid: &Self::Solid) -> KernelResult<Vec<u8>>;
}
