use millkit_camtools::{optimize_points, ChunkOptimizer, ChunkPoint};
use proptest::prelude::*;

fn paths() -> impl Strategy<Value = Vec<ChunkPoint>> {
    prop::collection::vec((-5.0f64..5.0, -5.0f64..5.0, -3.0f64..0.0), 0..30)
        .prop_map(|coords| coords.into_iter().map(|(x, y, z)| ChunkPoint::new(x, y, z)).collect())
}

proptest! {
    #[test]
    fn optimizing_twice_changes_nothing(
        path in paths(),
        tolerance in prop_oneof![Just(0.0), 0.0001f64..1.0],
        limit in prop::option::of(0.5f64..45.0),
    ) {
        let protect = limit.map(f64::to_radians);
        let once = optimize_points(&path, tolerance, protect);
        let twice = optimize_points(&once, tolerance, protect);
        prop_assert_eq!(once, twice);
    }

    #[test]
    fn endpoints_and_order_preserved(path in paths(), tolerance in 0.0f64..1.0) {
        let out = optimize_points(&path, tolerance, None);
        prop_assert!(out.len() <= path.len());
        prop_assert_eq!(out.first(), path.first());
        prop_assert_eq!(out.last(), path.last());
        // Without protection only existing points survive, in order.
        let mut cursor = path.iter();
        for kept in &out {
            prop_assert!(cursor.any(|p| p == kept));
        }
    }

    #[test]
    fn closed_chunks_keep_closing_point(path in paths(), limit in 0.5f64..45.0) {
        prop_assume!(path.len() >= 3);
        let mut ring = path.clone();
        ring.push(path[0]);
        let out = ChunkOptimizer::new(0.01, Some(limit.to_radians())).optimize_points(&ring, true);
        prop_assert_eq!(out.first(), out.last());
    }
}
