//! End-to-end build: request document → steps → solid → STL.

use serde_json::Value;
use thiserror::Error;
use tracing::info;

use crate::builder::{BuildError, BuildOptions, Interpreter, SkippedStep};
use crate::export::{self, ExportError, MeshPayload};
use crate::kernel::{GeometryKernel, TruckKernel};
use crate::plan::{self, InputError, RawStepEntry};

#[derive(Debug, Error, Clone, PartialEq)]
pub enum ModelError {
    #[error(transparent)]
    Input(#[from] InputError),

    #[error(transparent)]
    Build(#[from] BuildError),

    #[error(transparent)]
    Export(#[from] ExportError),
}

#[derive(Debug, Clone)]
pub struct ModelOutput {
    pub payload: MeshPayload,
    pub skipped: Vec<SkippedStep>,
}

/// Owns a kernel and the build options; every call evaluates one plan
/// against fresh state.
pub struct ModelBuilder<K: GeometryKernel> {
    kernel: K,
    options: BuildOptions,
}

impl ModelBuilder<TruckKernel> {
    pub fn truck() -> Self {
        Self::new(TruckKernel::new())
    }
}

impl<K: GeometryKernel> ModelBuilder<K> {
    pub fn new(kernel: K) -> Self {
        Self::with_options(kernel, BuildOptions::default())
    }

    pub fn with_options(kernel: K, options: BuildOptions) -> Self {
        Self { kernel, options }
    }

    /// Build from a request document (`{ "modeling_plan": [...] }`).
    pub fn build(&self, document: &Value) -> Result<ModelOutput, ModelError> {
        let entries = plan::parse_plan(document)?;
        self.build_entries(&entries)
    }

    /// Build from raw request bytes.
    pub fn build_from_slice(&self, body: &[u8]) -> Result<ModelOutput, ModelError> {
        let entries = plan::parse_plan_bytes(body)?;
        self.build_entries(&entries)
    }

    pub fn build_entries(&self, entries: &[RawStepEntry]) -> Result<ModelOutput, ModelError> {
        if entries.is_empty() {
            return Err(InputError::EmptyPlan.into());
        }

        let steps = plan::normalize_all(entries);
        let outcome = Interpreter::with_options(&self.kernel, self.options.clone())
            .interpret(&steps)?;
        let payload = export::export(&self.kernel, &outcome.solid)?;

        info!(
            entries = entries.len(),
            skipped = outcome.skipped.len(),
            triangles = payload.triangle_count,
            "model built"
        );
        Ok(ModelOutput {
            payload,
            skipped: outcome.skipped,
        })
    }
}
