// Interpreter transitions checked against a recording kernel, so every
// geometry call (and its arguments) can be asserted on.

use super::*;
use crate::kernel::{KernelResult, ProfileShape, TriangleMesh};
use std::sync::Mutex;

#[derive(Debug, Clone, PartialEq)]
enum Call {
    MakeProfile(ProfileShape),
    Extrude(f64),
    Translate(Vector3D),
    Union,
    Subtract,
}

/// Axis-aligned stand-in for a solid.
#[derive(Debug, Clone, PartialEq)]
struct BoxSolid {
    min: [f64; 3],
    max: [f64; 3],
    cuts: usize,
}

#[derive(Default)]
struct RecordingKernel {
    calls: Mutex<Vec<Call>>,
    fail_subtract: bool,
}

impl RecordingKernel {
    fn failing_subtract() -> Self {
        Self {
            fail_subtract: true,
            ..Default::default()
        }
    }

    fn record(&self, call: Call) {
        self.calls.lock().unwrap().push(call);
    }

    fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    fn translations(&self) -> Vec<Vector3D> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::Translate(v) => Some(v),
                _ => None,
            })
            .collect()
    }
}

impl GeometryKernel for RecordingKernel {
    type Profile = ProfileShape;
    type Solid = BoxSolid;

    fn make_profile(&self, shape: &ProfileShape) -> KernelResult<ProfileShape> {
        self.record(Call::MakeProfile(*shape));
        Ok(*shape)
    }

    fn extrude(&self, profile: &ProfileShape, params: &ExtrudeParams) -> KernelResult<BoxSolid> {
        self.record(Call::Extrude(params.distance));
        let (hx, hy) = match *profile {
            ProfileShape::Circle { radius } => (radius, radius),
            ProfileShape::Rectangle { width, height } => (width / 2.0, height / 2.0),
        };
        Ok(BoxSolid {
            min: [-hx, -hy, 0.0],
            max: [hx, hy, params.distance],
            cuts: 0,
        })
    }

    fn translate(&self, solid: &BoxSolid, offset: Vector3D) -> KernelResult<BoxSolid> {
        self.record(Call::Translate(offset));
        let d = [offset.x, offset.y, offset.z];
        let mut moved = solid.clone();
        for k in 0..3 {
            moved.min[k] += d[k];
            moved.max[k] += d[k];
        }
        Ok(moved)
    }

    fn boolean_union(&self, a: &BoxSolid, b: &BoxSolid) -> KernelResult<BoxSolid> {
        self.record(Call::Union);
        let mut joined = a.clone();
        for k in 0..3 {
            joined.min[k] = a.min[k].min(b.min[k]);
            joined.max[k] = a.max[k].max(b.max[k]);
        }
        Ok(joined)
    }

    fn boolean_subtract(&self, a: &BoxSolid, _b: &BoxSolid) -> KernelResult<BoxSolid> {
        self.record(Call::Subtract);
        if self.fail_subtract {
            return Err(KernelOpError::OperationFailed("Boolean subtraction failed".into()));
        }
        let mut cut = a.clone();
        cut.cuts += 1;
        Ok(cut)
    }

    fn tessellate(&self, _solid: &BoxSolid) -> KernelResult<TriangleMesh> {
        Ok(TriangleMesh::new())
    }

    fn encode_mesh(&self, _solid: &BoxSolid) -> KernelResult<Vec<u8>> {
        Ok(Vec::new())
    }
}

fn rect(width: f64, height: f64) -> Step {
    Step::DefineProfile {
        shape: ProfileShape::Rectangle { width, height },
        placement: None,
    }
}

fn circle_at(radius: f64, placement: Option<(f64, f64)>) -> Step {
    Step::DefineProfile {
        shape: ProfileShape::Circle { radius },
        placement: placement.map(|(x, y)| Point2D::new(x, y)),
    }
}

fn extrude(depth: f64) -> Step {
    Step::Extrude { depth }
}

fn cut() -> Step {
    Step::CutThroughAll { depth: None }
}

#[test]
fn test_profile_then_extrude_spans_depth() {
    let kernel = RecordingKernel::default();
    let outcome = Interpreter::new(&kernel)
        .interpret(&[rect(40.0, 20.0), extrude(10.0)])
        .unwrap();

    assert_eq!(outcome.solid.min, [-20.0, -10.0, 0.0]);
    assert_eq!(outcome.solid.max, [20.0, 10.0, 10.0]);
    assert!(outcome.skipped.is_empty());
}

#[test]
fn test_reference_plan_drills_hole_at_placement() {
    let kernel = RecordingKernel::default();
    let outcome = Interpreter::new(&kernel)
        .interpret(&[rect(40.0, 20.0), extrude(10.0), circle_at(3.0, Some((10.0, 5.0))), cut()])
        .unwrap();

    assert_eq!(outcome.solid.cuts, 1);
    assert_eq!(
        kernel.calls(),
        vec![
            Call::MakeProfile(ProfileShape::Rectangle { width: 40.0, height: 20.0 }),
            Call::Extrude(10.0),
            Call::Translate(Vector3D::new(0.0, 0.0, 0.0)),
            Call::MakeProfile(ProfileShape::Circle { radius: 3.0 }),
            Call::Extrude(2.0 * (DEFAULT_CUT_DEPTH + CUT_CLEARANCE)),
            Call::Translate(Vector3D::new(10.0, 5.0, -(DEFAULT_CUT_DEPTH + CUT_CLEARANCE))),
            Call::Subtract,
        ]
    );
}

#[test]
fn test_cut_uses_last_explicit_placement() {
    let kernel = RecordingKernel::default();
    let steps = [
        circle_at(1.0, Some((7.0, -2.0))),
        rect(30.0, 30.0),
        extrude(5.0),
        circle_at(2.0, None),
        cut(),
    ];
    Interpreter::new(&kernel).interpret(&steps).unwrap();

    let moves = kernel.translations();
    assert_eq!(
        moves.last(),
        Some(&Vector3D::new(7.0, -2.0, -(DEFAULT_CUT_DEPTH + CUT_CLEARANCE)))
    );
}

#[test]
fn test_cut_defaults_to_origin_without_any_placement() {
    let kernel = RecordingKernel::default();
    Interpreter::new(&kernel)
        .interpret(&[rect(10.0, 10.0), extrude(5.0), circle_at(1.0, None), cut()])
        .unwrap();

    assert_eq!(
        kernel.translations().last(),
        Some(&Vector3D::new(0.0, 0.0, -(DEFAULT_CUT_DEPTH + CUT_CLEARANCE)))
    );
}

#[test]
fn test_cut_with_explicit_depth_straddles_symmetrically() {
    let kernel = RecordingKernel::default();
    Interpreter::new(&kernel)
        .interpret(&[
            rect(10.0, 10.0),
            extrude(5.0),
            circle_at(1.0, Some((1.0, 1.0))),
            Step::CutThroughAll { depth: Some(7.0) },
        ])
        .unwrap();

    let calls = kernel.calls();
    assert!(calls.contains(&Call::Extrude(15.0)));
    assert_eq!(calls[calls.len() - 2], Call::Translate(Vector3D::new(1.0, 1.0, -7.5)));
}

#[test]
fn test_cut_depth_equal_to_thickness_clears_both_faces() {
    let kernel = RecordingKernel::default();
    Interpreter::new(&kernel)
        .interpret(&[
            rect(40.0, 20.0),
            extrude(10.0),
            circle_at(3.0, Some((10.0, 5.0))),
            Step::CutThroughAll { depth: Some(10.0) },
        ])
        .unwrap();

    let calls = kernel.calls();
    let tool_height = match calls[calls.len() - 3] {
        Call::Extrude(h) => h,
        ref other => panic!("expected tool extrusion, got {:?}", other),
    };
    let tool_bottom = kernel.translations().last().unwrap().z;
    let tool_top = tool_bottom + tool_height;
    assert!(tool_bottom < 0.0);
    assert!(tool_top > 10.0);
}

#[test]
fn test_fallback_depth_is_configurable() {
    let kernel = RecordingKernel::default();
    let options = BuildOptions {
        cut_fallback_depth: 50.0,
        cut_clearance: 0.0,
        ..Default::default()
    };
    Interpreter::with_options(&kernel, options)
        .interpret(&[rect(10.0, 10.0), extrude(5.0), cut()])
        .unwrap();

    assert!(kernel.calls().contains(&Call::Extrude(100.0)));
}

#[test]
fn test_cut_first_is_missing_sketch() {
    let kernel = RecordingKernel::default();
    let err = Interpreter::new(&kernel)
        .interpret(&[cut(), rect(1.0, 1.0), extrude(1.0)])
        .unwrap_err();

    assert_eq!(
        err,
        BuildError::MissingSketch {
            position: 1,
            action: "cut_through_all"
        }
    );
    assert!(kernel.calls().is_empty());
}

#[test]
fn test_cut_without_solid_is_missing_solid() {
    let kernel = RecordingKernel::default();
    let err = Interpreter::new(&kernel)
        .interpret(&[circle_at(1.0, None), cut()])
        .unwrap_err();

    assert_eq!(
        err,
        BuildError::MissingSolid {
            position: 2,
            action: "cut_through_all"
        }
    );
    assert_eq!(err.step(), Some((2, "cut_through_all")));
}

#[test]
fn test_extrude_without_sketch() {
    let kernel = RecordingKernel::default();
    let err = Interpreter::new(&kernel).interpret(&[extrude(3.0)]).unwrap_err();
    assert_eq!(
        err,
        BuildError::MissingSketch {
            position: 1,
            action: "extrude"
        }
    );
}

#[test]
fn test_profiles_only_produce_no_solid() {
    let kernel = RecordingKernel::default();
    let err = Interpreter::new(&kernel)
        .interpret(&[rect(1.0, 2.0), circle_at(1.0, Some((3.0, 3.0)))])
        .unwrap_err();
    assert_eq!(err, BuildError::NoSolidProduced);
    assert_eq!(err.step(), None);
}

#[test]
fn test_unrecognized_steps_are_skipped() {
    let kernel = RecordingKernel::default();
    let outcome = Interpreter::new(&kernel)
        .interpret(&[
            rect(4.0, 4.0),
            Step::Unrecognized {
                raw: "Make it friendly".into(),
                reason: SkipReason::NoPatternMatch,
            },
            extrude(2.0),
        ])
        .unwrap();

    assert_eq!(
        outcome.skipped,
        vec![SkippedStep {
            position: 2,
            raw: "Make it friendly".into(),
            reason: SkipReason::NoPatternMatch,
        }]
    );
    assert_eq!(outcome.solid.max[2], 2.0);
}

#[test]
fn test_new_profile_replaces_sketch() {
    let kernel = RecordingKernel::default();
    let outcome = Interpreter::new(&kernel)
        .interpret(&[circle_at(1.0, None), rect(8.0, 2.0), extrude(1.0)])
        .unwrap();
    assert_eq!(outcome.solid.max, [4.0, 1.0, 1.0]);
}

#[test]
fn test_repeated_extrude_overwrites_by_default() {
    let kernel = RecordingKernel::default();
    let outcome = Interpreter::new(&kernel)
        .interpret(&[rect(10.0, 10.0), extrude(10.0), circle_at(1.0, None), extrude(3.0)])
        .unwrap();

    // Only the last extrusion survives.
    assert_eq!(outcome.solid.min, [-1.0, -1.0, 0.0]);
    assert_eq!(outcome.solid.max, [1.0, 1.0, 3.0]);
    assert!(!kernel.calls().contains(&Call::Union));
}

#[test]
fn test_repeated_extrude_unions_when_configured() {
    let kernel = RecordingKernel::default();
    let options = BuildOptions {
        extrude_policy: ExtrudePolicy::Union,
        ..Default::default()
    };
    let outcome = Interpreter::with_options(&kernel, options)
        .interpret(&[rect(10.0, 10.0), extrude(10.0), circle_at(1.0, Some((20.0, 0.0))), extrude(3.0)])
        .unwrap();

    assert_eq!(outcome.solid.min, [-5.0, -5.0, 0.0]);
    assert_eq!(outcome.solid.max, [21.0, 5.0, 10.0]);
    assert_eq!(kernel.calls().iter().filter(|c| **c == Call::Union).count(), 1);
}

#[test]
fn test_kernel_failure_aborts_plan() {
    let kernel = RecordingKernel::failing_subtract();
    let err = Interpreter::new(&kernel)
        .interpret(&[rect(10.0, 10.0), extrude(2.0), circle_at(1.0, None), cut(), extrude(9.0)])
        .unwrap_err();

    assert!(matches!(
        err,
        BuildError::Kernel { position: 4, action: "cut_through_all", .. }
    ));
    // Nothing after the failing step ran.
    assert_eq!(kernel.calls().last(), Some(&Call::Subtract));
}

#[test]
fn test_evaluations_do_not_share_state() {
    let kernel = RecordingKernel::default();
    let interpreter = Interpreter::new(&kernel);
    interpreter
        .interpret(&[circle_at(1.0, Some((50.0, 50.0))), extrude(1.0)])
        .unwrap();

    let second = interpreter
        .interpret(&[rect(2.0, 2.0), extrude(1.0), circle_at(0.5, None), cut()])
        .unwrap();
    assert_eq!(second.solid.min, [-1.0, -1.0, 0.0]);
    assert_eq!(
        kernel.translations().last(),
        Some(&Vector3D::new(0.0, 0.0, -DEFAULT_CUT_DEPTH))
    );
}

#[test]
fn test_extrude_policy_from_str() {
    assert_eq!("Union".parse::<ExtrudePolicy>(), Ok(ExtrudePolicy::Union));
    assert_eq!(" overwrite ".parse::<ExtrudePolicy>(), Ok(ExtrudePolicy::Overwrite));
    assert!("merge".parse::<ExtrudePolicy>().is_err());
}

#[test]
fn test_skipped_step_serializes_reason_inline() {
    let skipped = SkippedStep {
        position: 2,
        raw: r#"{"kind":"extrude"}"#.into(),
        reason: SkipReason::MissingField { field: "depth".into() },
    };
    assert_eq!(
        serde_json::to_value(&skipped).unwrap(),
        serde_json::json!({ "position": 2, "reason": "missing_field", "field": "depth" })
    );
}
