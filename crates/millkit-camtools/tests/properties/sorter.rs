use millkit_camtools::{Chunk, ChunkArena, ChunkId, ChunkSorter};
use millkit_core::{ProgressReporter, StarvationPolicy, Warnings};
use nalgebra::Point3;
use proptest::prelude::*;

fn arena() -> impl Strategy<Value = ChunkArena> {
    (1usize..25).prop_flat_map(|n| {
        (
            prop::collection::vec((0.0f64..50.0, 0.0f64..50.0, 0.1f64..5.0, any::<bool>()), n),
            prop::collection::vec((0..n, 0..n), 0..n * 2),
        )
            .prop_map(|(shapes, edges)| {
                let chunks = shapes
                    .into_iter()
                    .map(|(x, y, len, closed)| {
                        if closed {
                            Chunk::closed_from_xy(&[(x, y), (x + len, y), (x + len, y + len)])
                        } else {
                            Chunk::from_xy(&[(x, y), (x + len, y)])
                        }
                    })
                    .collect();
                let mut arena = ChunkArena::from_chunks(chunks);
                for (parent, child) in edges {
                    arena.add_relation(ChunkId(parent), ChunkId(child));
                }
                arena
            })
    })
}

proptest! {
    #[test]
    fn children_sequenced_before_parents(mut arena in arena(), reversible in any::<bool>()) {
        let relations: Vec<(ChunkId, ChunkId)> = arena
            .iter()
            .flat_map(|(id, chunk)| chunk.children().iter().map(move |&child| (id, child)))
            .collect();
        let n = arena.len();

        let order = ChunkSorter::new(reversible, StarvationPolicy::Fail)
            .order(&mut arena, Point3::new(0.0, 0.0, 5.0), &mut Warnings::new(), &ProgressReporter::silent())
            .unwrap();

        prop_assert_eq!(order.len(), n);
        let mut position = vec![usize::MAX; n];
        for (index, id) in order.iter().enumerate() {
            prop_assert_eq!(position[id.0], usize::MAX, "chunk {} sequenced twice", id.0);
            position[id.0] = index;
        }
        for (parent, child) in relations {
            prop_assert!(position[child.0] < position[parent.0]);
        }
        prop_assert!(arena.iter().all(|(_, c)| c.is_sorted()));
    }
}
