use millkit_camtools::{Chunk, ChunkArena, ChunkId, ChunkSorter, GridSpec, HeightField, ToolpathPipeline};
use millkit_core::{
    CutterDescriptor, HierarchyMode, OperationContext, ProgressReporter, StarvationPolicy, Warnings,
};
use nalgebra::{Point2, Point3};

fn square(min: f64, max: f64) -> Chunk {
    Chunk::closed_from_xy(&[(min, min), (max, min), (max, max), (min, max)])
}

fn within(chunk: &Chunk, lo: f64, hi: f64) -> bool {
    chunk
        .points()
        .iter()
        .all(|p| (lo..=hi).contains(&p.x()) && (lo..=hi).contains(&p.y()))
}

#[test]
fn test_island_cut_before_surrounding_contour() {
    let ctx = OperationContext::new()
        .with_cutter(CutterDescriptor::flat(0.5))
        .with_pixel_size(0.1)
        .with_depth_range(0.0, -1.0)
        .with_step_down(1.0)
        .with_stay_low(false)
        .with_hierarchy(HierarchyMode::Containment);
    let grid = GridSpec::new(Point2::new(-2.0, -2.0), Point2::new(12.0, 12.0), 0.1).unwrap();
    let surface = HeightField::flat(grid, -1.0);
    let pattern = vec![square(0.0, 10.0), square(4.0, 6.0)];

    let mut pipeline = ToolpathPipeline::new(ctx).unwrap();
    let output = pipeline
        .run(&surface, &pattern, None, None, &ProgressReporter::silent())
        .unwrap();

    assert_eq!(output.chunks.len(), 2);
    assert!(within(&output.chunks[0], 4.0, 6.0));
    assert!(within(&output.chunks[1], 0.0, 10.0));
    assert!(output.chunks.iter().all(|c| c.is_closed()));
    // Entered at its corner nearest the origin, the island reduces to its
    // corners plus the closing point.
    assert_eq!(output.chunks[0].len(), 5);
    assert_eq!(output.chunks[0].first().unwrap().xy(), Point2::new(4.0, 4.0));
}

#[test]
fn test_without_hierarchy_nearest_comes_first() {
    let ctx = OperationContext::new()
        .with_cutter(CutterDescriptor::flat(0.5))
        .with_pixel_size(0.1)
        .with_depth_range(0.0, -1.0)
        .with_step_down(1.0)
        .with_stay_low(false);
    let grid = GridSpec::new(Point2::new(-2.0, -2.0), Point2::new(12.0, 12.0), 0.1).unwrap();
    let surface = HeightField::flat(grid, -1.0);
    let pattern = vec![square(4.0, 6.0), square(0.0, 10.0)];

    let mut pipeline = ToolpathPipeline::new(ctx).unwrap();
    let output = pipeline
        .run(&surface, &pattern, None, None, &ProgressReporter::silent())
        .unwrap();
    assert!(within(&output.chunks[0], 0.0, 10.0));
    assert_eq!(output.chunks[0].first().unwrap().xy(), Point2::new(0.0, 0.0));
}

#[test]
fn test_progress_reports_sorting_stage() {
    use millkit_core::Stage;
    use std::sync::{Arc, Mutex};

    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = seen.clone();
    let reporter = ProgressReporter::silent().with_callback(Box::new(move |stage, pct| {
        sink.lock().unwrap().push((stage, pct));
    }));

    let mut arena = ChunkArena::from_chunks((0..10).map(|i| square(i as f64 * 3.0, i as f64 * 3.0 + 1.0)).collect());
    assert!(arena.add_relation(ChunkId(0), ChunkId(9)));
    let order = ChunkSorter::new(false, StarvationPolicy::Fail)
        .order(&mut arena, Point3::new(0.0, 0.0, 0.0), &mut Warnings::new(), &reporter)
        .unwrap();
    assert_eq!(order.len(), 10);

    let seen = seen.lock().unwrap();
    assert_eq!(seen.first(), Some(&(Stage::Sorting, 0)));
    assert_eq!(seen.last(), Some(&(Stage::Sorting, 100)));
    assert!(seen.windows(2).all(|w| w[0].1 < w[1].1));
}
