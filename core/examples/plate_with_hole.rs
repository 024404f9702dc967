use modeler_core::ModelBuilder;
use serde_json::json;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let plan = json!({
        "modeling_plan": [
            { "kind": "create_rectangle", "width": 40, "height": 20 },
            { "kind": "extrude", "depth": 10 },
            { "kind": "create_circle", "diameter": 6, "x": 10, "y": 5 },
            { "kind": "cut_through_all" }
        ]
    });

    let output = ModelBuilder::truck().build(&plan)?;
    std::fs::write(output.payload.file_name, &output.payload.bytes)?;
    println!(
        "Wrote {} ({} triangles, {} bytes)",
        output.payload.file_name,
        output.payload.triangle_count,
        output.payload.bytes.len()
    );
    Ok(())
}
