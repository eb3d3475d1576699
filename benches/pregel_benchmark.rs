use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use superstep::{
    concurrency::{Concurrency, WorkerPool},
    graph::CsrGraph,
    pregel::{
        ComputeContext, Messages, NodeSchema, Partitioning, Pregel, PregelComputation,
        PregelConfig, Reducer, Sum, ValueType,
    },
};

struct PageRank;

impl PregelComputation for PageRank {
    type Message = f64;

    fn schema(&self) -> NodeSchema {
        NodeSchema::new().add("rank", ValueType::Double)
    }

    fn compute(&self, ctx: &mut ComputeContext<'_, f64>, messages: Messages<'_, f64>) {
        let n = ctx.node_count() as f64;
        let rank = if ctx.is_initial_superstep() {
            1.0 / n
        } else {
            0.15 / n + 0.85 * messages.sum::<f64>()
        };
        ctx.set_double_value("rank", rank);
        let degree = ctx.degree();
        if degree > 0 {
            ctx.send_to_neighbors(rank / degree as f64);
        }
    }

    fn reducer(&self) -> Option<Box<dyn Reducer<f64>>> {
        Some(Box::new(Sum))
    }
}

/// Same program without a reducer, exercising the queue messenger.
struct QueuedPageRank;

impl PregelComputation for QueuedPageRank {
    type Message = f64;

    fn schema(&self) -> NodeSchema {
        PageRank.schema()
    }

    fn compute(&self, ctx: &mut ComputeContext<'_, f64>, messages: Messages<'_, f64>) {
        PageRank.compute(ctx, messages);
    }
}

/// A deterministic pseudo-random graph with `n` nodes and `n * avg_degree` edges.
fn random_graph(n: u64, avg_degree: u64) -> CsrGraph {
    let mut state = 0x9E37_79B9_7F4A_7C15u64;
    let mut next = move || {
        state ^= state << 13;
        state ^= state >> 7;
        state ^= state << 17;
        state
    };
    let edges: Vec<(u64, u64)> = (0..n * avg_degree).map(|_| (next() % n, next() % n)).collect();
    CsrGraph::from_edges(n, &edges)
}

fn bench_page_rank(c: &mut Criterion) {
    let mut group = c.benchmark_group("Pregel PageRank");
    group.sample_size(10);

    let graph = random_graph(100_000, 8);
    let pool = WorkerPool::with_available_parallelism().unwrap();

    for threads in [1usize, 4] {
        let config = PregelConfig::default()
            .with_max_iterations(10)
            .with_min_batch_size(1_000)
            .with_concurrency(Concurrency::new(threads).unwrap())
            .with_partitioning(Partitioning::Degree);

        group.bench_with_input(BenchmarkId::new("reducing", threads), &config, |b, config| {
            b.iter(|| {
                Pregel::new(&graph, PageRank, config.clone(), &pool)
                    .unwrap()
                    .run()
                    .unwrap()
            })
        });

        group.bench_with_input(BenchmarkId::new("queue", threads), &config, |b, config| {
            b.iter(|| {
                Pregel::new(&graph, QueuedPageRank, config.clone(), &pool)
                    .unwrap()
                    .run()
                    .unwrap()
            })
        });
    }

    group.finish();
}

criterion_group!(benches, bench_page_rank);
criterion_main!(benches);
