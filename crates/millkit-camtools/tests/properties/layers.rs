use millkit_camtools::decompose;
use proptest::prelude::*;

proptest! {
    #[test]
    fn layers_cover_range_contiguously(
        start in -20.0f64..20.0,
        depth in 0.0f64..30.0,
        step in 0.05f64..10.0,
    ) {
        let end = start - depth;
        let layers = decompose(start, end, step, true).unwrap();
        prop_assert!(!layers.is_empty());
        prop_assert_eq!(layers[0].start_z, start);
        prop_assert_eq!(layers[layers.len() - 1].end_z, end);
        for pair in layers.windows(2) {
            prop_assert_eq!(pair[0].end_z, pair[1].start_z);
        }
        if layers.len() > 1 {
            for layer in &layers {
                prop_assert!(layer.thickness() > 1e-9);
                prop_assert!(layer.thickness() <= step + 1e-9);
            }
        }
    }

    #[test]
    fn single_layer_without_layering(start in -20.0f64..20.0, depth in 0.0f64..30.0) {
        let layers = decompose(start, start - depth, 1.0, false).unwrap();
        prop_assert_eq!(layers.len(), 1);
        prop_assert_eq!(layers[0].start_z, start);
        prop_assert_eq!(layers[0].end_z, start - depth);
    }
}
