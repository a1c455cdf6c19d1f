use millkit_camtools::{
    connect_low, generate_profile, simulate_offset, Chunk, ChunkPoint, GridSpec, HeightField, SurfaceQuery,
};
use millkit_core::{CutterDescriptor, OperationContext, ProgressReporter, Warnings};
use nalgebra::Point2;

fn pass(x0: f64, x1: f64, y: f64, z: f64) -> Chunk {
    Chunk::new(vec![ChunkPoint::new(x0, y, z), ChunkPoint::new(x1, y, z)])
}

#[test]
fn test_merge_only_below_threshold() {
    let grid = GridSpec::new(Point2::new(0.0, 0.0), Point2::new(10.0, 10.0), 0.1).unwrap();
    let surface = HeightField::flat(grid, -1.0);
    let ctx = OperationContext::new()
        .with_depth_range(0.0, -2.0)
        .with_step_over(0.5)
        .with_step_along(0.1);
    // Threshold is 3 * step-over.
    let chunks = vec![
        pass(1.0, 4.0, 5.0, -1.0),
        pass(5.5, 8.0, 5.0, -1.0),
        pass(8.0, 9.0, 6.0, -1.0),
    ];
    let merged = connect_low(chunks, &surface, None, &ctx);
    assert_eq!(merged.len(), 2);
    assert_eq!(merged[0].first().unwrap().x(), 1.0);
    assert_eq!(merged[1].first().unwrap().x(), 5.5);
    assert_eq!(merged[1].last().unwrap().x(), 9.0);
}

#[test]
fn test_bridge_never_below_offset_image() {
    let grid = GridSpec::new(Point2::new(0.0, 0.0), Point2::new(10.0, 10.0), 0.1).unwrap();
    let surface = HeightField::from_sampler(grid, |x, _y| Some(if (4.0..6.0).contains(&x) { 0.0 } else { -2.0 }));
    let profile = generate_profile(&CutterDescriptor::ball(1.0), 0.1, None, &mut Warnings::new()).unwrap();
    let offset = simulate_offset(&surface, &profile, false, &ProgressReporter::silent()).unwrap();
    let ctx = OperationContext::new()
        .with_depth_range(0.0, -2.0)
        .with_merge_distance(7.0)
        .with_step_along(0.1);

    let left = offset.surface_z(2.0, 5.0);
    let right = offset.surface_z(8.0, 5.0);
    let chunks = vec![pass(1.0, 2.0, 5.0, left), pass(8.0, 9.0, 5.0, right)];
    let merged = connect_low(chunks, &offset, None, &ctx);
    assert_eq!(merged.len(), 1);

    let points = merged[0].points();
    assert!(points.len() > 4);
    for p in &points[2..points.len() - 2] {
        assert!(p.z() >= offset.surface_z(p.x(), p.y()), "bridge gouges at x = {}", p.x());
        assert!(p.z() >= ctx.end_z);
    }
    assert!(points.iter().any(|p| p.z() >= 0.0));
}

#[test]
fn test_pipeline_keeps_ambient_hole_uncut() {
    use millkit_camtools::{Region, ToolpathPipeline};

    let grid = GridSpec::new(Point2::new(0.0, 0.0), Point2::new(2.0, 1.0), 0.01).unwrap();
    let surface = HeightField::flat(grid, -0.5);
    let ambient = Region::rectangle(Point2::new(0.0, 0.0), Point2::new(2.0, 1.0))
        .unwrap()
        .with_hole(&[(0.9, 0.3), (1.1, 0.3), (1.1, 0.7), (0.9, 0.7)])
        .unwrap();
    let ctx = OperationContext::new()
        .with_cutter(CutterDescriptor::flat(0.1))
        .with_pixel_size(0.01)
        .with_depth_range(0.0, -1.0)
        .with_step_down(1.0)
        .with_step_along(0.02);
    let pattern = vec![Chunk::from_xy(&[(0.2, 0.5), (1.8, 0.5)])];

    let mut pipeline = ToolpathPipeline::new(ctx).unwrap();
    let output = pipeline
        .run(&surface, &pattern, Some(&ambient), None, &ProgressReporter::silent())
        .unwrap();

    assert_eq!(output.chunks.len(), 2);
    let inside_hole = output
        .chunks
        .iter()
        .flat_map(|c| c.points())
        .filter(|p| p.x() > 0.9 + 1e-9 && p.x() < 1.1 - 1e-9)
        .count();
    assert_eq!(inside_hole, 0);
    assert!(output.chunks[0].last().unwrap().x() <= 0.9 + 1e-9);
    assert!(output.chunks[1].first().unwrap().x() >= 1.1 - 1e-9);
}
