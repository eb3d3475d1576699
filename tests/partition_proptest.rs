use proptest::prelude::*;
use superstep::{
    concurrency::{
        aligned_range_partition, degree_partition, range_partition, Concurrency, Partition,
    },
    graph::CsrGraph,
};

fn concurrency(n: usize) -> Concurrency {
    Concurrency::new(n).unwrap()
}

/// Partitions must be non-empty, in order, disjoint and cover `[0, node_count)`.
fn assert_tiles(partitions: &[Partition], node_count: u64) {
    let mut next = 0;
    for p in partitions {
        assert_eq!(p.start_node(), next, "gap or overlap at {next}");
        assert!(p.node_count() > 0, "empty partition at {next}");
        next = p.end_node();
    }
    assert_eq!(next, node_count);
}

#[test]
fn range_partition_respects_min_batch_size() {
    let partitions = range_partition(concurrency(8), 100, Some(30));
    assert_eq!(
        partitions.iter().map(Partition::node_count).collect::<Vec<_>>(),
        vec![30, 30, 30, 10]
    );
}

#[test]
fn degree_partition_isolates_hub() {
    // Node 2 alone carries most of the degree.
    let degrees = [1u64, 1, 50, 1, 1, 1];
    let total: u64 = degrees.iter().sum();
    let partitions = degree_partition(6, total, |n| degrees[n as usize], concurrency(4), None);
    let hub = partitions.iter().find(|p| p.partition().contains(2)).unwrap();
    assert_eq!(hub.partition().node_count(), 1);
    assert_eq!(hub.degree_sum(), 50);
}

#[test]
fn empty_graph_has_no_partitions() {
    assert!(range_partition(concurrency(4), 0, None).is_empty());
    assert!(degree_partition(0, 0, |_| 0, concurrency(4), None).is_empty());
}

#[test]
fn graph_degree_partition_covers_nodes() {
    let graph = CsrGraph::from_edges(5, &[(0, 1), (0, 2), (0, 3), (1, 2), (4, 0)]);
    let partitions = superstep::concurrency::degree_partition_graph(&graph, concurrency(2), None);
    let plain: Vec<Partition> = partitions.iter().copied().map(Partition::from).collect();
    assert_tiles(&plain, 5);
    assert_eq!(partitions.iter().map(|p| p.degree_sum()).sum::<u64>(), 5);
}

proptest! {
    #[test]
    fn range_partitions_tile(n in 0u64..10_000, c in 1usize..64, min in proptest::option::of(1u64..500)) {
        let partitions = range_partition(concurrency(c), n, min);
        assert_tiles(&partitions, n);
        prop_assert!(partitions.len() <= c.max(1));
        prop_assert_eq!(&partitions, &range_partition(concurrency(c), n, min));
    }

    #[test]
    fn aligned_partitions_tile_on_boundaries(n in 0u64..10_000, c in 1usize..64, shift in 0u32..8) {
        let align = 1u64 << shift;
        let partitions = aligned_range_partition(concurrency(c), n, align);
        assert_tiles(&partitions, n);
        for p in &partitions {
            prop_assert_eq!(p.start_node() % align, 0);
        }
    }

    #[test]
    fn degree_partitions_tile(degrees in proptest::collection::vec(0u64..100, 0..500), c in 1usize..16) {
        let n = degrees.len() as u64;
        let total: u64 = degrees.iter().sum();
        let partitions = degree_partition(n, total, |i| degrees[i as usize], concurrency(c), None);
        let plain: Vec<Partition> = partitions.iter().copied().map(Partition::from).collect();
        assert_tiles(&plain, n);

        let target = total.div_ceil(c as u64).max(1);
        for p in &partitions {
            let nodes = p.partition().nodes();
            let sum: u64 = nodes.clone().map(|i| degrees[i as usize]).sum();
            prop_assert_eq!(p.degree_sum(), sum);
            // Only a single node may overshoot the target.
            prop_assert!(sum <= target || p.partition().node_count() == 1);
        }
    }
}
