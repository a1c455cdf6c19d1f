use millkit_camtools::{
    decompose, generate_profile, simulate_offset, simulate_padded_offset, Chunk, ChunkSampler, GridSpec,
    HeightField, ToolpathPipeline, NO_SURFACE,
};
use millkit_core::{CutterDescriptor, OperationContext, ProgressReporter, Warnings};
use nalgebra::Point2;

fn unit_surface() -> HeightField {
    let grid = GridSpec::new(Point2::new(0.0, 0.0), Point2::new(1.0, 1.0), 0.01).unwrap();
    HeightField::flat(grid, 0.0)
}

#[test]
fn test_flat_offset_has_sentinel_border_only() {
    let surface = unit_surface();
    let profile = generate_profile(&CutterDescriptor::flat(0.1), 0.01, None, &mut Warnings::new()).unwrap();
    let offset = simulate_offset(&surface, &profile, false, &ProgressReporter::silent()).unwrap();

    let reach = profile.center();
    assert_eq!(reach, 5);
    for j in 0..offset.height() {
        for i in 0..offset.width() {
            let border = i < reach || j < reach || i + reach >= offset.width() || j + reach >= offset.height();
            let expected = if border { NO_SURFACE } else { 0.0 };
            assert_eq!(offset.get(i, j), expected, "cell ({i}, {j})");
        }
    }
}

#[test]
fn test_straight_pass_samples_flat_chunk() {
    let surface = unit_surface();
    let profile = generate_profile(&CutterDescriptor::flat(0.1), 0.01, None, &mut Warnings::new()).unwrap();
    let offset = simulate_padded_offset(&surface, &profile, false, &ProgressReporter::silent()).unwrap();
    // The floor sits below the part, so any unevaluated cell would show up
    // as a point at -1.
    let layers = decompose(0.0, -1.0, 1.0, true).unwrap();

    let mut pattern = Chunk::from_xy(&[(0.0, 0.0), (1.0, 0.0)]);
    pattern.refine(0.1);
    let sampled = ChunkSampler::new(&offset, &layers, -1.0)
        .sample(&[pattern], &ProgressReporter::silent())
        .unwrap();

    assert_eq!(sampled.chunk_count(), 1);
    let chunk = sampled.arena.get(sampled.layers[0][0]);
    assert_eq!(chunk.len(), 11);
    assert!(chunk.points().iter().all(|p| p.z() == 0.0));
}

fn flat_pass_pipeline(from: (f64, f64), to: (f64, f64)) -> Vec<(f64, f64, f64)> {
    let ctx = OperationContext::new()
        .with_cutter(CutterDescriptor::flat(0.1))
        .with_pixel_size(0.01)
        .with_step_along(0.1)
        .with_depth_range(0.0, -1.0)
        .with_step_down(1.0);
    let mut pipeline = ToolpathPipeline::new(ctx).unwrap();
    let pattern = vec![Chunk::from_xy(&[from, to])];
    let output = pipeline
        .run(&unit_surface(), &pattern, None, None, &ProgressReporter::silent())
        .unwrap();
    assert_eq!(output.chunks.len(), 1);
    output.chunks[0].points().iter().map(|p| (p.x(), p.y(), p.z())).collect()
}

#[test]
fn test_pipeline_collapses_pass_to_endpoints() {
    let points = flat_pass_pipeline((0.0, 0.0), (1.0, 0.0));
    assert_eq!(points, vec![(0.0, 0.0, 0.0), (1.0, 0.0, 0.0)]);
}

#[test]
fn test_pass_ending_at_grid_edge_stays_on_surface() {
    let points = flat_pass_pipeline((0.0, 0.5), (1.0, 0.5));
    assert_eq!(points, vec![(0.0, 0.5, 0.0), (1.0, 0.5, 0.0)]);
}
