//! Plan interpreter: a single-pass state machine that applies canonical
//! steps, in order, to one [`BuildState`].
//!
//! Profiles are sketched in the XY plane and extruded along +Z. The last
//! explicit placement is remembered across steps and positions every
//! extrusion and cutting tool that follows it.

#[cfg(test)]
mod tests_interpreter;

use serde::Serialize;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::kernel::{ExtrudeParams, GeometryKernel, KernelOpError, Point2D, Vector3D};
use crate::plan::{SkipReason, Step};

/// Depth used by a cut that does not name one, in length units.
pub const DEFAULT_CUT_DEPTH: f64 = 1000.0;

/// Extra length added to each end of a cutting tool. Keeps the tool's caps
/// off the body's faces when a cut depth equals the body's thickness.
pub const CUT_CLEARANCE: f64 = 0.5;

/// What a second `Extrude` does to the body built so far.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExtrudePolicy {
    /// The new extrusion replaces the running solid.
    #[default]
    Overwrite,
    /// The new extrusion is unioned into the running solid.
    Union,
}

impl FromStr for ExtrudePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "overwrite" => Ok(Self::Overwrite),
            "union" => Ok(Self::Union),
            other => Err(format!("unknown extrude policy '{}'", other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct BuildOptions {
    pub extrude_policy: ExtrudePolicy,
    /// Half-height of the cutting tool when a cut gives no depth.
    pub cut_fallback_depth: f64,
    /// Added to the tool's half-height on both ends.
    pub cut_clearance: f64,
}

impl Default for BuildOptions {
    fn default() -> Self {
        Self {
            extrude_policy: ExtrudePolicy::Overwrite,
            cut_fallback_depth: DEFAULT_CUT_DEPTH,
            cut_clearance: CUT_CLEARANCE,
        }
    }
}

/// Fatal interpretation errors. Positions are 1-based plan positions.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum BuildError {
    #[error("step {position} ({action}): no sketch has been defined yet")]
    MissingSketch { position: usize, action: &'static str },

    #[error("step {position} ({action}): there is no solid to cut; extrude a sketch first")]
    MissingSolid { position: usize, action: &'static str },

    #[error("plan finished without producing a solid; add an extrude step")]
    NoSolidProduced,

    #[error("step {position} ({action}): {source}")]
    Kernel {
        position: usize,
        action: &'static str,
        #[source]
        source: KernelOpError,
    },
}

impl BuildError {
    /// Plan position and action of the offending step, if any.
    pub fn step(&self) -> Option<(usize, &'static str)> {
        match self {
            Self::MissingSketch { position, action }
            | Self::MissingSolid { position, action }
            | Self::Kernel { position, action, .. } => Some((*position, *action)),
            Self::NoSolidProduced => None,
        }
    }
}

/// A plan entry that was ignored. Serializes as
/// `{"position": 2, "reason": "missing_field", "field": "depth"}`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SkippedStep {
    pub position: usize,
    #[serde(skip_serializing)]
    pub raw: String,
    #[serde(flatten)]
    pub reason: SkipReason,
}

impl fmt::Display for SkippedStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "step {} skipped ({}): {}", self.position, self.reason, self.raw)
    }
}

/// Result of a successful interpretation.
#[derive(Debug, Clone)]
pub struct BuildOutcome<S> {
    pub solid: S,
    pub skipped: Vec<SkippedStep>,
}

/// Working memory of one plan evaluation.
pub struct BuildState<K: GeometryKernel> {
    pub current_sketch: Option<K::Profile>,
    pub last_placement: Point2D,
    pub final_solid: Option<K::Solid>,
    pub skipped: Vec<SkippedStep>,
}

impl<K: GeometryKernel> Default for BuildState<K> {
    fn default() -> Self {
        Self {
            current_sketch: None,
            last_placement: Point2D::ORIGIN,
            final_solid: None,
            skipped: Vec::new(),
        }
    }
}

impl<K: GeometryKernel> BuildState<K> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply one step. `position` is the step's 1-based place in the plan.
    pub fn apply(
        &mut self,
        kernel: &K,
        options: &BuildOptions,
        position: usize,
        step: &Step,
    ) -> Result<(), BuildError> {
        let action = step.action_name();
        let kernel_err = |source| BuildError::Kernel {
            position,
            action,
            source,
        };

        match step {
            Step::DefineProfile { shape, placement } => {
                let profile = kernel.make_profile(shape).map_err(kernel_err)?;
                self.current_sketch = Some(profile);
                if let Some(p) = placement {
                    self.last_placement = *p;
                }
                debug!(position, action, placement = ?self.last_placement, "sketch defined");
            }
            Step::Extrude { depth } => {
                let sketch = self
                    .current_sketch
                    .as_ref()
                    .ok_or(BuildError::MissingSketch { position, action })?;

                let body = kernel
                    .extrude(sketch, &ExtrudeParams::linear(*depth))
                    .and_then(|s| {
                        kernel.translate(&s, Vector3D::from_placement(self.last_placement, 0.0))
                    })
                    .map_err(kernel_err)?;

                let solid = match (self.final_solid.take(), options.extrude_policy) {
                    (Some(previous), ExtrudePolicy::Union) => {
                        kernel.boolean_union(&previous, &body).map_err(kernel_err)?
                    }
                    (Some(_), ExtrudePolicy::Overwrite) => {
                        warn!(position, "extrude replaces the previously built solid");
                        body
                    }
                    (None, _) => body,
                };
                self.final_solid = Some(solid);
                debug!(position, action, depth, "extruded sketch");
            }
            Step::CutThroughAll { depth } => {
                let sketch = self
                    .current_sketch
                    .as_ref()
                    .ok_or(BuildError::MissingSketch { position, action })?;
                let solid = self
                    .final_solid
                    .as_ref()
                    .ok_or(BuildError::MissingSolid { position, action })?;

                // Tool spans [-h, h] along Z with h = depth + clearance, so no
                // cap is coplanar with a body face of height `depth`.
                let h = depth.unwrap_or(options.cut_fallback_depth) + options.cut_clearance;
                let tool = kernel
                    .extrude(sketch, &ExtrudeParams::linear(2.0 * h))
                    .and_then(|t| {
                        kernel.translate(&t, Vector3D::from_placement(self.last_placement, -h))
                    })
                    .map_err(kernel_err)?;

                let cut = kernel.boolean_subtract(solid, &tool).map_err(kernel_err)?;
                self.final_solid = Some(cut);
                debug!(position, action, tool_half_height = h, "cut through solid");
            }
            Step::Unrecognized { raw, reason } => {
                if reason.is_validation_error() {
                    warn!(position, %reason, raw = %raw, "skipping invalid step");
                } else {
                    warn!(position, %reason, raw = %raw, "skipping unrecognized step");
                }
                self.skipped.push(SkippedStep {
                    position,
                    raw: raw.clone(),
                    reason: reason.clone(),
                });
            }
        }

        Ok(())
    }

    /// Consume the state at the end of the plan.
    pub fn finish(self) -> Result<BuildOutcome<K::Solid>, BuildError> {
        let solid = self.final_solid.ok_or(BuildError::NoSolidProduced)?;
        Ok(BuildOutcome {
            solid,
            skipped: self.skipped,
        })
    }
}

/// Runs plans against a kernel. Holds no per-plan state, so one interpreter
/// can serve any number of evaluations.
pub struct Interpreter<'k, K: GeometryKernel> {
    kernel: &'k K,
    options: BuildOptions,
}

impl<'k, K: GeometryKernel> Interpreter<'k, K> {
    pub fn new(kernel: &'k K) -> Self {
        Self::with_options(kernel, BuildOptions::default())
    }

    pub fn with_options(kernel: &'k K, options: BuildOptions) -> Self {
        Self { kernel, options }
    }

    /// Apply `steps` in order to a fresh state. Stops at the first error.
    pub fn interpret(&self, steps: &[Step]) -> Result<BuildOutcome<K::Solid>, BuildError> {
        let mut state = BuildState::<K>::new();
        for (i, step) in steps.iter().enumerate() {
            state.apply(self.kernel, &self.options, i + 1, step)?;
        }

        let outcome = state.finish()?;
        info!(
            steps = steps.len(),
            skipped = outcome.skipped.len(),
            "plan interpreted"
        );
        Ok(outcome)
    }
}
