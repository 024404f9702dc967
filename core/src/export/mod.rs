//! Mesh export: binary STL bytes plus the descriptor a transport needs.

use thiserror::Error;
use tracing::debug;

use crate::kernel::{GeometryKernel, KernelOpError};

pub const STL_CONTENT_TYPE: &str = "model/stl";
pub const STL_FILE_NAME: &str = "model.stl";

/// Length of a binary STL with zero triangles: 80-byte header plus count.
pub const EMPTY_STL_LEN: usize = 84;
const STL_TRIANGLE_LEN: usize = 50;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum ExportError {
    #[error("mesh export produced no geometry ({len} bytes)")]
    EmptyGeometry { len: usize },

    #[error("mesh declares {declared} triangles but carries {len} bytes")]
    MalformedMesh { declared: u32, len: usize },

    #[error("mesh export failed: {0}")]
    Kernel(#[from] KernelOpError),
}

/// Encoded mesh ready to be sent.
#[derive(Debug, Clone, PartialEq)]
pub struct MeshPayload {
    pub bytes: Vec<u8>,
    pub content_type: &'static str,
    pub file_name: &'static str,
    pub triangle_count: u32,
}

impl MeshPayload {
    /// `Content-Disposition` value offering the mesh as a download.
    pub fn content_disposition(&self) -> String {
        format!("attachment; filename=\"{}\"", self.file_name)
    }
}

/// Check that `bytes` is a non-empty binary STL; returns its triangle count.
pub fn validate_stl(bytes: &[u8]) -> Result<u32, ExportError> {
    let len = bytes.len();
    if len <= EMPTY_STL_LEN {
        return Err(ExportError::EmptyGeometry { len });
    }

    let mut count = [0u8; 4];
    count.copy_from_slice(&bytes[80..EMPTY_STL_LEN]);
    let declared = u32::from_le_bytes(count);
    if declared == 0 {
        return Err(ExportError::EmptyGeometry { len });
    }
    if EMPTY_STL_LEN + declared as usize * STL_TRIANGLE_LEN != len {
        return Err(ExportError::MalformedMesh { declared, len });
    }
    Ok(declared)
}

/// Encode `solid` through the kernel and reject degenerate output.
/// The solid is left untouched.
pub fn export<K: GeometryKernel>(kernel: &K, solid: &K::Solid) -> Result<MeshPayload, ExportError> {
    let bytes = kernel.encode_mesh(solid)?;
    let triangle_count = validate_stl(&bytes)?;
    debug!(triangles = triangle_count, bytes = bytes.len(), "encoded STL");

    Ok(MeshPayload {
        bytes,
        content_type: STL_CONTENT_TYPE,
        file_name: STL_FILE_NAME,
        triangle_count,
    })
}
