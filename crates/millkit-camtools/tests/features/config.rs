use millkit_camtools::{Chunk, GridSpec, HeightField, ToolpathPipeline};
use millkit_core::{
    CutterKind, HierarchyMode, MovementType, OperationContext, ProgressReporter, ToolpathError,
};
use nalgebra::Point2;

#[test]
fn test_context_from_json_drives_pipeline() {
    let json = r#"{
        "cutter": { "kind": { "type": "v_bit", "tip_angle": 90.0 }, "diameter": 0.4 },
        "movement": { "kind": "meander", "stay_low": false },
        "step_along": 0.05,
        "start_z": 0.0,
        "end_z": -0.5,
        "step_down": 0.25,
        "hierarchy": "proximity"
    }"#;
    let ctx = OperationContext::from_json(json).unwrap();
    assert_eq!(ctx.cutter.kind, CutterKind::VBit { tip_angle: 90.0 });
    assert_eq!(ctx.movement.kind, MovementType::Meander);
    assert_eq!(ctx.hierarchy, HierarchyMode::Proximity);
    assert!(ctx.movement.protect_vertical);

    let grid = GridSpec::new(Point2::new(0.0, 0.0), Point2::new(2.0, 2.0), 0.05).unwrap();
    let surface = HeightField::flat(grid, -0.5);
    let pattern = vec![Chunk::from_xy(&[(0.5, 1.0), (1.5, 1.0)])];
    let mut pipeline = ToolpathPipeline::new(ctx).unwrap();
    let output = pipeline
        .run(&surface, &pattern, None, None, &ProgressReporter::silent())
        .unwrap();

    // Two layers, the shallow one first; meander reverses the second pass.
    assert_eq!(output.chunks.len(), 2);
    assert_eq!(output.chunks[0].points()[0].z(), -0.25);
    assert_eq!(output.chunks[1].points()[0].z(), -0.5);
    assert_eq!(output.chunks[1].first().unwrap().x(), 1.5);
}

#[test]
fn test_invalid_json_context_rejected() {
    let json = r#"{ "step_over": -1.0 }"#;
    assert!(matches!(OperationContext::from_json(json), Err(ToolpathError::Parameter(_))));
    assert!(matches!(OperationContext::from_json("{"), Err(ToolpathError::Serialization(_))));
}
