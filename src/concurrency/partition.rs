//! Splitting a node id space into balanced work units.
//!
//! Every function here returns partitions that tile `[0, node_count)` exactly: they
//! are contiguous, pairwise disjoint, in ascending order, and their node counts sum
//! to `node_count`. Results depend only on the arguments.

use core::ops::Range;

use serde::{Deserialize, Serialize};

use super::Concurrency;
use crate::graph::GraphView;

/// A contiguous range of node ids.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Partition {
    start_node: u64,
    node_count: u64,
}

impl Partition {
    /// Creates the partition `[start_node, start_node + node_count)`.
    pub const fn new(start_node: u64, node_count: u64) -> Self {
        Self {
            start_node,
            node_count,
        }
    }

    /// First node id.
    #[inline]
    pub const fn start_node(&self) -> u64 {
        self.start_node
    }

    /// Number of nodes.
    #[inline]
    pub const fn node_count(&self) -> u64 {
        self.node_count
    }

    /// One past the last node id.
    #[inline]
    pub const fn end_node(&self) -> u64 {
        self.start_node + self.node_count
    }

    /// The node ids as a range.
    #[inline]
    pub fn nodes(&self) -> Range<u64> {
        self.start_node..self.end_node()
    }

    /// Returns `true` if `node` lies in this partition.
    #[inline]
    pub fn contains(&self, node: u64) -> bool {
        node >= self.start_node && node < self.end_node()
    }
}

/// A partition that also carries the summed degree of its nodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DegreePartition {
    partition: Partition,
    degree_sum: u64,
}

impl DegreePartition {
    /// Creates a degree partition.
    pub const fn new(start_node: u64, node_count: u64, degree_sum: u64) -> Self {
        Self {
            partition: Partition::new(start_node, node_count),
            degree_sum,
        }
    }

    /// The node range.
    #[inline]
    pub const fn partition(&self) -> Partition {
        self.partition
    }

    /// Sum of the degrees of all nodes in the partition.
    #[inline]
    pub const fn degree_sum(&self) -> u64 {
        self.degree_sum
    }

    /// First node id.
    #[inline]
    pub const fn start_node(&self) -> u64 {
        self.partition.start_node
    }

    /// Number of nodes.
    #[inline]
    pub const fn node_count(&self) -> u64 {
        self.partition.node_count
    }
}

impl From<DegreePartition> for Partition {
    fn from(p: DegreePartition) -> Self {
        p.partition
    }
}

/// Splits `[0, node_count)` into at most `concurrency` contiguous ranges of nearly
/// equal size.
///
/// No range is smaller than `min_batch_size` except the last one; when
/// `node_count / concurrency` falls below it, fewer and larger ranges are produced.
pub fn range_partition(
    concurrency: Concurrency,
    node_count: u64,
    min_batch_size: Option<u64>,
) -> Vec<Partition> {
    let per_worker = node_count.div_ceil(concurrency.get() as u64);
    let batch = per_worker.max(min_batch_size.unwrap_or(1)).max(1);
    chunked(node_count, batch)
}

/// Like [`range_partition`], but every boundary is a multiple of `align_to`.
///
/// Useful when writers of neighboring partitions must not share a word or a page.
///
/// # Panics
/// Panics if `align_to == 0`.
pub fn aligned_range_partition(
    concurrency: Concurrency,
    node_count: u64,
    align_to: u64,
) -> Vec<Partition> {
    assert!(align_to != 0, "align_to must be > 0");
    let per_worker = node_count.div_ceil(concurrency.get() as u64);
    let batch = per_worker.div_ceil(align_to).max(1) * align_to;
    chunked(node_count, batch)
}

/// Splits `[0, node_count)` so that every partition carries roughly
/// `total_degree / concurrency` degree.
///
/// Node ids are walked in order while their degrees accumulate; a new partition
/// starts whenever adding the next node would push the running sum past the target
/// (`max(ceil(total_degree / concurrency), min_batch_size)`). A node whose degree alone
/// exceeds the target gets a partition of its own. No partition is empty.
pub fn degree_partition(
    node_count: u64,
    total_degree: u64,
    degree_of: impl Fn(u64) -> u64,
    concurrency: Concurrency,
    min_batch_size: Option<u64>,
) -> Vec<DegreePartition> {
    if node_count == 0 {
        return Vec::new();
    }
    let target = total_degree
        .div_ceil(concurrency.get() as u64)
        .max(min_batch_size.unwrap_or(1))
        .max(1);

    let mut partitions = Vec::with_capacity(concurrency.get());
    let mut start = 0u64;
    let mut sum = 0u64;
    for node in 0..node_count {
        let degree = degree_of(node);
        if node > start && sum.saturating_add(degree) > target {
            partitions.push(DegreePartition::new(start, node - start, sum));
            start = node;
            sum = 0;
        }
        sum = sum.saturating_add(degree);
    }
    partitions.push(DegreePartition::new(start, node_count - start, sum));
    partitions
}

/// [`degree_partition`] over the out-degrees of `graph`.
pub fn degree_partition_graph<G: GraphView + ?Sized>(
    graph: &G,
    concurrency: Concurrency,
    min_batch_size: Option<u64>,
) -> Vec<DegreePartition> {
    degree_partition(
        graph.node_count(),
        graph.relationship_count(),
        |node| graph.degree(node),
        concurrency,
        min_batch_size,
    )
}

fn chunked(node_count: u64, batch: u64) -> Vec<Partition> {
    let mut partitions = Vec::with_capacity(node_count.div_ceil(batch) as usize);
    let mut start = 0u64;
    while start < node_count {
        let len = batch.min(node_count - start);
        partitions.push(Partition::new(start, len));
        start += len;
    }
    partitions
}
