use std::sync::OnceLock;

use superstep::{
    concurrency::{Concurrency, ProgressCounter, TaskError, TerminationFlag, WorkerPool},
    graph::CsrGraph,
    pregel::{
        ComputeContext, EngineState, InitContext, MasterComputeContext, Messages, NodeSchema,
        Outcome, Partitioning, Pregel, PregelComputation, PregelConfig, PregelError, Reducer,
        Sum, ValueType, Visibility,
    },
};

fn pool() -> &'static WorkerPool {
    static POOL: OnceLock<WorkerPool> = OnceLock::new();
    POOL.get_or_init(|| WorkerPool::new(4).unwrap())
}

/// Several small partitions so that every test exercises more than one task.
fn parallel_config() -> PregelConfig {
    PregelConfig::default()
        .with_concurrency(Concurrency::new(4).unwrap())
        .with_min_batch_size(1)
        .with_partitioning(Partitioning::Range)
}

struct HaltImmediately;

impl PregelComputation for HaltImmediately {
    type Message = i64;

    fn schema(&self) -> NodeSchema {
        NodeSchema::new()
    }

    fn compute(&self, ctx: &mut ComputeContext<'_, i64>, _messages: Messages<'_, i64>) {
        ctx.vote_to_halt();
    }
}

#[test]
fn single_node_converges_after_first_superstep() {
    let graph = CsrGraph::from_edges(1, &[]);
    let mut engine = Pregel::new(&graph, HaltImmediately, PregelConfig::default(), pool()).unwrap();
    assert_eq!(engine.state(), EngineState::NotStarted);

    let result = engine.run().unwrap();
    assert_eq!(result.outcome(), Outcome::Converged);
    assert_eq!(result.ran_iterations(), 1);
    assert_eq!(engine.state(), EngineState::Converged);
}

#[test]
fn engine_runs_only_once() {
    let graph = CsrGraph::from_edges(1, &[]);
    let mut engine = Pregel::new(&graph, HaltImmediately, PregelConfig::default(), pool()).unwrap();
    engine.run().unwrap();
    assert!(matches!(
        engine.run(),
        Err(PregelError::AlreadyRan(EngineState::Converged))
    ));
}

/// Node 0 messages node 1 in superstep 0; everyone halts immediately.
struct WakeUp;

impl PregelComputation for WakeUp {
    type Message = i64;

    fn schema(&self) -> NodeSchema {
        NodeSchema::new()
            .add("received", ValueType::Long)
            .add("woken_at", ValueType::Long)
    }

    fn compute(&self, ctx: &mut ComputeContext<'_, i64>, messages: Messages<'_, i64>) {
        if ctx.is_initial_superstep() && ctx.node_id() == 0 {
            ctx.send_to(1, 42);
        }
        if !messages.is_empty() {
            ctx.set_long_value("received", messages.sum());
            ctx.set_long_value("woken_at", i64::from(ctx.superstep()));
        }
        ctx.vote_to_halt();
    }
}

#[test]
fn halted_node_is_reactivated_by_a_message() {
    let graph = CsrGraph::from_edges(2, &[(0, 1)]);
    let mut engine = Pregel::new(&graph, WakeUp, parallel_config(), pool()).unwrap();
    let result = engine.run().unwrap();

    assert_eq!(result.outcome(), Outcome::Converged);
    assert_eq!(result.ran_iterations(), 2);
    let values = result.node_values();
    assert_eq!(values.long_value("received", 1), 42);
    assert_eq!(values.long_value("woken_at", 1), 1);
    assert_eq!(values.long_value("received", 0), 0);
}

/// Never halts; counts how often each node computed.
struct Restless;

impl PregelComputation for Restless {
    type Message = i64;

    fn schema(&self) -> NodeSchema {
        NodeSchema::new().add("calls", ValueType::Long)
    }

    fn compute(&self, ctx: &mut ComputeContext<'_, i64>, _messages: Messages<'_, i64>) {
        let calls = ctx.long_value("calls");
        ctx.set_long_value("calls", calls + 1);
    }
}

#[test]
fn iteration_cap_stops_the_computation() {
    let graph = CsrGraph::from_edges(10, &[]);
    let config = parallel_config().with_max_iterations(5);
    let progress = ProgressCounter::new("restless", 50);
    let mut engine = Pregel::new(&graph, Restless, config, pool())
        .unwrap()
        .with_progress(&progress);
    let result = engine.run().unwrap();

    assert_eq!(result.outcome(), Outcome::MaxIterationsReached);
    assert_eq!(result.ran_iterations(), 5);
    assert!(result.node_values().long_properties("calls").iter().all(|c| c == 5));
    assert_eq!(progress.completed(), 50);
}

/// Stops through the master computation after superstep 2.
struct MasterStops;

impl PregelComputation for MasterStops {
    type Message = i64;

    fn schema(&self) -> NodeSchema {
        Restless.schema()
    }

    fn compute(&self, ctx: &mut ComputeContext<'_, i64>, messages: Messages<'_, i64>) {
        Restless.compute(ctx, messages);
    }

    fn master_compute(&self, ctx: &mut MasterComputeContext<'_>) -> bool {
        let mut total = 0;
        let calls = ctx.node_values().long_properties("calls");
        ctx.for_each_node(|node| {
            total += calls.get(node);
            true
        });
        assert_eq!(total, ctx.node_count() as i64 * (i64::from(ctx.superstep()) + 1));
        ctx.superstep() == 2
    }
}

#[test]
fn master_compute_can_converge_early() {
    let graph = CsrGraph::from_edges(6, &[]);
    let mut engine = Pregel::new(&graph, MasterStops, parallel_config(), pool()).unwrap();
    let result = engine.run().unwrap();
    assert_eq!(result.outcome(), Outcome::Converged);
    assert_eq!(result.ran_iterations(), 3);
}

#[test]
fn terminated_before_start_reports_cancelled() {
    let graph = CsrGraph::from_edges(3, &[]);
    let termination = TerminationFlag::running();
    termination.terminate();
    let mut engine = Pregel::new(&graph, Restless, parallel_config(), pool())
        .unwrap()
        .with_termination(termination);
    let result = engine.run().unwrap();
    assert_eq!(result.outcome(), Outcome::Cancelled);
    assert_eq!(result.ran_iterations(), 0);
    assert_eq!(engine.state(), EngineState::Cancelled);
}

/// Raises the termination flag from inside superstep 2.
struct CancelsItself {
    termination: TerminationFlag,
}

impl PregelComputation for CancelsItself {
    type Message = i64;

    fn schema(&self) -> NodeSchema {
        NodeSchema::new()
    }

    fn compute(&self, ctx: &mut ComputeContext<'_, i64>, _messages: Messages<'_, i64>) {
        if ctx.superstep() == 2 && ctx.node_id() == 0 {
            self.termination.terminate();
        }
    }
}

#[test]
fn cancellation_during_a_superstep() {
    let graph = CsrGraph::from_edges(100, &[]);
    let termination = TerminationFlag::running();
    let computation = CancelsItself {
        termination: termination.clone(),
    };
    let mut engine = Pregel::new(&graph, computation, parallel_config(), pool())
        .unwrap()
        .with_termination(termination);
    let result = engine.run().unwrap();
    assert_eq!(result.outcome(), Outcome::Cancelled);
    assert_eq!(result.ran_iterations(), 2);
}

#[test]
fn progress_counts_only_visited_nodes_when_cancelled() {
    let graph = CsrGraph::from_edges(100, &[]);
    let termination = TerminationFlag::running();
    let computation = CancelsItself {
        termination: termination.clone(),
    };
    let config = PregelConfig::default()
        .with_concurrency(Concurrency::new(1).unwrap())
        .with_partitioning(Partitioning::Range);
    let progress = ProgressCounter::new("cancelled", 300);
    let mut engine = Pregel::new(&graph, computation, config, pool())
        .unwrap()
        .with_termination(termination)
        .with_progress(&progress);
    let result = engine.run().unwrap();
    assert_eq!(result.outcome(), Outcome::Cancelled);
    // Two full supersteps, then node 0 of superstep 2 before the stop is seen.
    assert_eq!(progress.completed(), 201);
}

/// Every leaf sends its id + 1 to the hub; a reducer sums them.
struct SumAtHub;

impl PregelComputation for SumAtHub {
    type Message = i64;

    fn schema(&self) -> NodeSchema {
        NodeSchema::new()
            .add("total", ValueType::Long)
            .add("deliveries", ValueType::Long)
    }

    fn compute(&self, ctx: &mut ComputeContext<'_, i64>, messages: Messages<'_, i64>) {
        if ctx.is_initial_superstep() {
            let message = ctx.node_id() as i64 + 1;
            ctx.send_to_neighbors(message);
        } else {
            ctx.set_long_value("deliveries", messages.len() as i64);
            ctx.set_long_value("total", messages.sum());
        }
        ctx.vote_to_halt();
    }

    fn reducer(&self) -> Option<Box<dyn Reducer<i64>>> {
        Some(Box::new(Sum))
    }
}

#[test]
fn reducer_folds_messages_per_target() {
    let edges: Vec<(u64, u64)> = (1..=20).map(|leaf| (leaf, 0)).collect();
    let graph = CsrGraph::from_edges(21, &edges);
    let mut engine = Pregel::new(&graph, SumAtHub, parallel_config(), pool()).unwrap();
    let result = engine.run().unwrap();

    let values = result.node_values();
    assert_eq!(values.long_value("deliveries", 0), 1);
    assert_eq!(values.long_value("total", 0), (2..=21).sum::<i64>());
    assert_eq!(result.ran_iterations(), 2);
}

/// Initializes values before superstep 0 and keeps a private scratch column.
struct WithInit;

impl PregelComputation for WithInit {
    type Message = f64;

    fn schema(&self) -> NodeSchema {
        NodeSchema::new()
            .add("seed", ValueType::Double)
            .add_with_visibility("scratch", ValueType::Long, Visibility::Private)
    }

    fn init(&self, ctx: &mut InitContext<'_>) {
        ctx.set_double_value("seed", ctx.node_id() as f64 * 0.5);
        ctx.set_long_value("scratch", 7);
    }

    fn compute(&self, ctx: &mut ComputeContext<'_, f64>, _messages: Messages<'_, f64>) {
        assert_eq!(ctx.long_value("scratch"), 7);
        let seed = ctx.double_value("seed");
        ctx.set_double_value("seed", seed + 1.0);
        ctx.vote_to_halt();
    }
}

#[test]
fn init_runs_before_compute_and_private_values_are_dropped() {
    let graph = CsrGraph::from_edges(5, &[]);
    let mut engine = Pregel::new(&graph, WithInit, parallel_config(), pool()).unwrap();
    let result = engine.run().unwrap();
    let values = result.into_node_values();
    assert_eq!(
        values.double_properties("seed").to_vec(),
        vec![1.0, 1.5, 2.0, 2.5, 3.0]
    );
    assert!(values.try_long_properties("scratch").is_err());
}

struct Explodes;

impl PregelComputation for Explodes {
    type Message = i64;

    fn schema(&self) -> NodeSchema {
        NodeSchema::new()
    }

    fn compute(&self, ctx: &mut ComputeContext<'_, i64>, _messages: Messages<'_, i64>) {
        assert!(ctx.node_id() != 3, "node 3 exploded");
    }
}

#[test]
fn panicking_compute_fails_the_run() {
    let graph = CsrGraph::from_edges(8, &[]);
    let mut engine = Pregel::new(&graph, Explodes, parallel_config(), pool()).unwrap();
    match engine.run() {
        Err(PregelError::Task(TaskError::Panicked { message, .. })) => {
            assert_eq!(message, "node 3 exploded");
        }
        other => panic!("unexpected {other:?}"),
    }
    assert_eq!(engine.state(), EngineState::Failed);
}

#[test]
fn invalid_config_is_rejected() {
    let graph = CsrGraph::from_edges(1, &[]);
    let config = PregelConfig::default().with_max_iterations(0);
    assert!(matches!(
        Pregel::new(&graph, HaltImmediately, config, pool()),
        Err(PregelError::InvalidConfig(_))
    ));
}

#[test]
fn empty_graph_converges() {
    let graph = CsrGraph::from_edges(0, &[]);
    let mut engine = Pregel::new(&graph, Restless, PregelConfig::default(), pool()).unwrap();
    let result = engine.run().unwrap();
    assert_eq!(result.outcome(), Outcome::Converged);
}
