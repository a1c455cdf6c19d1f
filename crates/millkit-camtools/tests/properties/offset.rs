use millkit_camtools::{generate_profile, simulate_offset, GridSpec, HeightField};
use millkit_core::{CutterDescriptor, ProgressReporter, Warnings};
use nalgebra::Point2;
use proptest::prelude::*;

fn field(grid: GridSpec, values: &[f64]) -> HeightField {
    let samples = values.iter().copied().cycle().take(grid.cell_count()).collect();
    HeightField::from_depth_buffer(grid, samples).unwrap()
}

fn cutters() -> impl Strategy<Value = CutterDescriptor> {
    prop_oneof![
        (0.1f64..0.6).prop_map(CutterDescriptor::flat),
        (0.1f64..0.6).prop_map(CutterDescriptor::ball),
        (0.1f64..0.6, 30.0f64..150.0).prop_map(|(d, a)| CutterDescriptor::v_bit(d, a)),
    ]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn raising_a_cell_never_lowers_the_offset(
        values in prop::collection::vec(-2.0f64..0.0, 1..40),
        cutter in cutters(),
        cell in 0usize..400,
        raise in 0.0f64..3.0,
    ) {
        let grid = GridSpec::new(Point2::new(0.0, 0.0), Point2::new(1.5, 1.5), 0.05).unwrap();
        let base = field(grid, &values);
        let mut raised_values: Vec<f64> = base.heights().to_vec();
        let k = cell % raised_values.len();
        raised_values[k] += raise;
        let raised = HeightField::from_depth_buffer(grid, raised_values).unwrap();

        let profile = generate_profile(&cutter, grid.pixel_size, None, &mut Warnings::new()).unwrap();
        let reporter = ProgressReporter::silent();
        let low = simulate_offset(&base, &profile, false, &reporter).unwrap();
        let high = simulate_offset(&raised, &profile, false, &reporter).unwrap();

        for (a, b) in low.heights().iter().zip(high.heights()) {
            prop_assert!(b >= a, "offset dropped from {} to {}", a, b);
        }
    }

    #[test]
    fn offset_never_below_surface(
        values in prop::collection::vec(-2.0f64..0.0, 1..40),
        cutter in cutters(),
    ) {
        let grid = GridSpec::new(Point2::new(0.0, 0.0), Point2::new(1.5, 1.5), 0.05).unwrap();
        let surface = field(grid, &values);
        let profile = generate_profile(&cutter, grid.pixel_size, None, &mut Warnings::new()).unwrap();
        let offset = simulate_offset(&surface, &profile, false, &ProgressReporter::silent()).unwrap();
        let reach = profile.center();
        for j in reach..grid.height - reach {
            for i in reach..grid.width - reach {
                prop_assert!(offset.get(i, j) >= surface.get(i, j));
            }
        }
    }
}
