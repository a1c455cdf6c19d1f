use millkit_camtools::{
    generate_profile, reflect_about_min, simulate_offset, Chunk, GridSpec, HeightField, OffsetCache,
    ToolpathPipeline,
};
use millkit_core::{CutterDescriptor, OperationContext, ProgressReporter, Warnings};
use nalgebra::Point2;

fn grid() -> GridSpec {
    GridSpec::new(Point2::new(0.0, 0.0), Point2::new(1.0, 1.0), 0.05).unwrap()
}

/// Saddle-free slope from Z = 0 at the origin down to Z = -1 at (1, 1).
fn part() -> HeightField {
    HeightField::from_sampler(grid(), |x, y| Some(-(x * y)))
}

fn reflected() -> HeightField {
    HeightField::from_sampler(grid(), |x, y| Some(-2.0 + x * y))
}

#[test]
fn test_reflection_about_min() {
    let surface = part();
    assert_eq!(surface.min_z(), Some(-1.0));
    assert_eq!(surface.max_z(), Some(0.0));
    assert_eq!(reflect_about_min(&surface), reflected());
}

#[test]
fn test_inverse_offset_matches_reflected_surface() {
    let profile = generate_profile(&CutterDescriptor::ball(0.2), 0.05, None, &mut Warnings::new()).unwrap();
    let reporter = ProgressReporter::silent();
    let mut cache = OffsetCache::new();

    let inverse = cache.get_or_compute(&part(), &profile, true, &reporter).unwrap().clone();
    let expected = simulate_offset(&reflected(), &profile, false, &reporter).unwrap();
    assert_eq!(inverse, expected);
}

#[test]
fn test_inverse_pipeline_matches_reflected_pipeline() {
    let base = OperationContext::new()
        .with_cutter(CutterDescriptor::ball(0.2))
        .with_pixel_size(0.05)
        .with_depth_range(0.0, -2.0)
        .with_step_down(0.5)
        .with_step_along(0.05);
    let pattern = vec![
        Chunk::from_xy(&[(0.2, 0.3), (0.8, 0.3)]),
        Chunk::from_xy(&[(0.8, 0.6), (0.2, 0.6)]),
    ];
    let reporter = ProgressReporter::silent();

    let mut inverse = ToolpathPipeline::new(base.clone().with_inverse(true)).unwrap();
    let a = inverse.run(&part(), &pattern, None, None, &reporter).unwrap();
    let mut plain = ToolpathPipeline::new(base).unwrap();
    let b = plain.run(&reflected(), &pattern, None, None, &reporter).unwrap();

    assert_eq!(a.chunks.len(), b.chunks.len());
    for (x, y) in a.chunks.iter().zip(&b.chunks) {
        assert_eq!(x.points(), y.points());
    }
}
