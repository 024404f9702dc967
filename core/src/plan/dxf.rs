//! Drawing import: turns a 2D DXF part drawing into a `modeling_plan`.
//!
//! The plate outline is the first `LWPOLYLINE` on the `OUTLINE` layer; its
//! bounding box becomes a rectangle extruded to the plate depth. Every
//! `CIRCLE` on the `CUTOUTS` layer becomes a circle profile followed by a
//! through-cut. Coordinates keep the drawing's frame: the rectangle is
//! placed at the outline's centre and each hole at its own centre.

use std::io::Cursor;
use std::sync::OnceLock;

use ::dxf::entities::EntityType;
use ::dxf::Drawing;
use regex::Regex;
use serde_json::{json, Value};
use thiserror::Error;
use tracing::{debug, info};

use super::PLAN_KEY;

pub const OUTLINE_LAYER: &str = "OUTLINE";
pub const CUTOUTS_LAYER: &str = "CUTOUTS";

/// Plate depth when the file name carries no `_<N>mm` suffix.
pub const DEFAULT_PLATE_DEPTH: f64 = 10.0;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum DxfPlanError {
    #[error("could not read DXF drawing: {0}")]
    Unreadable(String),

    #[error("no LWPOLYLINE found on the OUTLINE layer")]
    MissingOutline,

    #[error("outline bounds are degenerate ({width} x {height})")]
    DegenerateOutline { width: f64, height: f64 },
}

/// Plate depth encoded in a file name such as `bracket_6mm.dxf`.
pub fn plate_depth_from_file_name(file_name: &str) -> f64 {
    static SUFFIX: OnceLock<Regex> = OnceLock::new();
    let suffix = SUFFIX.get_or_init(|| Regex::new(r"_(\d+)mm").expect("depth suffix pattern compiles"));

    suffix
        .captures(file_name)
        .and_then(|caps| caps.get(1)?.as_str().parse::<f64>().ok())
        .filter(|depth| *depth > 0.0)
        .unwrap_or(DEFAULT_PLATE_DEPTH)
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct Bounds {
    min_x: f64,
    min_y: f64,
    max_x: f64,
    max_y: f64,
}

impl Bounds {
    fn of(points: impl IntoIterator<Item = (f64, f64)>) -> Option<Self> {
        points.into_iter().fold(None, |acc, (x, y)| {
            Some(match acc {
                None => Bounds { min_x: x, min_y: y, max_x: x, max_y: y },
                Some(b) => Bounds {
                    min_x: b.min_x.min(x),
                    min_y: b.min_y.min(y),
                    max_x: b.max_x.max(x),
                    max_y: b.max_y.max(y),
                },
            })
        })
    }
}

fn on_layer(layer: &str, wanted: &str) -> bool {
    layer.trim().eq_ignore_ascii_case(wanted)
}

/// Convert DXF bytes into a request document `{ "modeling_plan": [...] }`.
pub fn plan_from_dxf(bytes: &[u8], file_name: &str) -> Result<Value, DxfPlanError> {
    let drawing = Drawing::load(&mut Cursor::new(bytes))
        .map_err(|e| DxfPlanError::Unreadable(e.to_string()))?;
    let depth = plate_depth_from_file_name(file_name);

    let outline = drawing
        .entities()
        .filter(|e| on_layer(&e.common.layer, OUTLINE_LAYER))
        .find_map(|e| match &e.specific {
            EntityType::LwPolyline(poly) => Bounds::of(poly.vertices.iter().map(|v| (v.x, v.y))),
            _ => None,
        })
        .ok_or(DxfPlanError::MissingOutline)?;

    let width = outline.max_x - outline.min_x;
    let height = outline.max_y - outline.min_y;
    if width <= 0.0 || height <= 0.0 {
        return Err(DxfPlanError::DegenerateOutline { width, height });
    }

    let mut plan = vec![
        json!({
            "step": 1,
            "action": "create_rectangle",
            "width": width,
            "height": height,
            "x": (outline.min_x + outline.max_x) / 2.0,
            "y": (outline.min_y + outline.max_y) / 2.0,
        }),
        json!({ "step": 2, "action": "extrude", "depth": depth }),
    ];

    for entity in drawing.entities().filter(|e| on_layer(&e.common.layer, CUTOUTS_LAYER)) {
        match &entity.specific {
            EntityType::Circle(circle) => {
                let step = plan.len() + 1;
                plan.push(json!({
                    "step": step,
                    "action": "create_circle",
                    "diameter": circle.radius * 2.0,
                    "x": circle.center.x,
                    "y": circle.center.y,
                }));
                plan.push(json!({ "step": step + 1, "action": "cut_through_all" }));
            }
            other => debug!(entity = ?other, "ignoring non-circle cutout"),
        }
    }

    info!(
        file_name,
        width,
        height,
        depth,
        cutouts = (plan.len() - 2) / 2,
        "converted drawing to plan"
    );
    Ok(json!({ PLAN_KEY: plan }))
}
