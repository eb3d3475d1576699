//! The superstep driver.

use core::{
    convert::Infallible,
    sync::atomic::{AtomicBool, Ordering},
};

use super::{
    computation::PregelComputation,
    config::{Partitioning, PregelConfig},
    context::{ComputeContext, InitContext, MasterComputeContext},
    error::PregelError,
    messenger::Messenger,
    node_value::NodeValue,
};
use crate::{
    concurrency::{
        degree_partition_graph, range_partition, AtomicBitSet, NoProgress, Partition,
        ProgressSink, RunCompletion, StopSignal, TaskRunner, TerminationFlag, WorkerPool,
    },
    graph::GraphView,
    tracing_helpers::{debug_log, info_log},
};

/// Lifecycle of a [`Pregel`] engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineState {
    /// `run` has not been called.
    NotStarted,
    /// Superstep `superstep` is executing.
    Running {
        /// Zero-based superstep number.
        superstep: u32,
    },
    /// Every node voted to halt and no message was sent, or the master computation
    /// asked to stop.
    Converged,
    /// The iteration cap was reached first.
    MaxIterationsReached,
    /// The termination flag was raised.
    Cancelled,
    /// A task panicked; the error was returned by `run`.
    Failed,
}

/// How a computation ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// The computation reached a fixpoint.
    Converged,
    /// The computation ran `max_iterations` supersteps without converging.
    MaxIterationsReached,
    /// The computation was cancelled; node values reflect a partial superstep.
    Cancelled,
}

impl From<Outcome> for EngineState {
    fn from(outcome: Outcome) -> Self {
        match outcome {
            Outcome::Converged => Self::Converged,
            Outcome::MaxIterationsReached => Self::MaxIterationsReached,
            Outcome::Cancelled => Self::Cancelled,
        }
    }
}

/// The result of [`Pregel::run`].
#[derive(Debug)]
pub struct PregelResult {
    node_values: NodeValue,
    ran_iterations: u32,
    outcome: Outcome,
}

impl PregelResult {
    /// The public node properties.
    pub fn node_values(&self) -> &NodeValue {
        &self.node_values
    }

    /// Takes the public node properties.
    pub fn into_node_values(self) -> NodeValue {
        self.node_values
    }

    /// Number of supersteps that completed.
    pub fn ran_iterations(&self) -> u32 {
        self.ran_iterations
    }

    /// How the computation ended.
    pub fn outcome(&self) -> Outcome {
        self.outcome
    }

    /// Returns `true` if the computation converged.
    pub fn did_converge(&self) -> bool {
        self.outcome == Outcome::Converged
    }
}

/// A bulk-synchronous engine running one [`PregelComputation`] over a borrowed
/// graph.
///
/// An engine runs once. Node properties and both message buffers are owned by the
/// engine for the duration of [`run`](Self::run); the public properties are handed
/// back in the [`PregelResult`].
pub struct Pregel<'g, C: PregelComputation> {
    graph: &'g dyn GraphView,
    computation: C,
    config: PregelConfig,
    pool: &'g WorkerPool,
    termination: TerminationFlag,
    progress: &'g dyn ProgressSink,
    state: EngineState,
}

impl<'g, C: PregelComputation> Pregel<'g, C> {
    /// Creates an engine for `computation` on `graph`, executing on `pool`.
    ///
    /// # Errors
    /// Returns [`PregelError::InvalidConfig`] if `config` does not validate.
    pub fn new<G: GraphView>(
        graph: &'g G,
        computation: C,
        config: PregelConfig,
        pool: &'g WorkerPool,
    ) -> Result<Self, PregelError> {
        config.validate()?;
        Ok(Self {
            graph,
            computation,
            config,
            pool,
            termination: TerminationFlag::running(),
            progress: &NoProgress,
            state: EngineState::NotStarted,
        })
    }

    /// Uses `termination` for cancellation. Keep a clone to cancel the run.
    #[must_use]
    pub fn with_termination(mut self, termination: TerminationFlag) -> Self {
        self.termination = termination;
        self
    }

    /// Reports the nodes processed by every partition task to `progress`.
    #[must_use]
    pub fn with_progress(mut self, progress: &'g dyn ProgressSink) -> Self {
        self.progress = progress;
        self
    }

    /// Current lifecycle state.
    pub fn state(&self) -> EngineState {
        self.state
    }

    /// The configuration the engine runs with.
    pub fn config(&self) -> &PregelConfig {
        &self.config
    }

    /// Runs supersteps until convergence, the iteration cap or cancellation.
    ///
    /// # Errors
    /// Returns [`PregelError::AlreadyRan`] on a second call and
    /// [`PregelError::Task`] if compute code panicked.
    pub fn run(&mut self) -> Result<PregelResult, PregelError> {
        if self.state != EngineState::NotStarted {
            return Err(PregelError::AlreadyRan(self.state));
        }

        let graph = self.graph;
        let progress = self.progress;
        let computation = &self.computation;
        let node_count = graph.node_count();
        let values = NodeValue::new(computation.schema(), node_count);
        let votes = AtomicBitSet::new(node_count);
        let mut messenger = Messenger::new(node_count, computation.reducer());
        let partitions = partitions(graph, &self.config);
        let runner = TaskRunner::new(self.pool, self.config.concurrency, self.termination.clone());
        debug_log!(
            node_count,
            partitions = partitions.len(),
            max_iterations = self.config.max_iterations,
            "starting pregel computation"
        );

        let mut superstep = 0u32;
        let outcome = loop {
            if self.termination.is_terminated() {
                break Outcome::Cancelled;
            }
            self.state = EngineState::Running { superstep };
            messenger.prepare(partitions.len());

            let any_sent = AtomicBool::new(false);
            let completion = {
                let messenger = &messenger;
                let values = &values;
                let votes = &votes;
                let any_sent = &any_sent;
                let tasks: Vec<_> = partitions
                    .iter()
                    .enumerate()
                    .map(|(slot, partition)| {
                        let nodes = partition.nodes();
                        move |stop: &StopSignal| -> Result<(), Infallible> {
                            let mut outbox = messenger.outbox();
                            let mut sent = false;
                            let mut processed = 0u64;
                            for node in nodes {
                                if stop.should_stop() {
                                    break;
                                }
                                processed += 1;
                                if superstep == 0 {
                                    computation.init(&mut InitContext {
                                        node_id: node,
                                        graph,
                                        values,
                                    });
                                }
                                // A halted node only wakes up for incoming messages.
                                if votes.get(node) {
                                    if !messenger.has_messages(node) {
                                        continue;
                                    }
                                    votes.clear(node);
                                }
                                let mut ctx = ComputeContext {
                                    node_id: node,
                                    superstep,
                                    graph,
                                    values,
                                    votes,
                                    outbox: &mut outbox,
                                    sent: &mut sent,
                                };
                                computation.compute(&mut ctx, messenger.messages(node));
                            }
                            progress.log_progress(processed);
                            if sent {
                                any_sent.store(true, Ordering::Relaxed);
                            }
                            messenger.deposit(slot, outbox);
                            Ok(())
                        }
                    })
                    .collect();
                runner.run(tasks)
            };

            match completion {
                Ok(RunCompletion::Finished) => {}
                Ok(RunCompletion::Cancelled) => break Outcome::Cancelled,
                Err(error) => {
                    self.state = EngineState::Failed;
                    return Err(error.into());
                }
            }

            messenger.swap();
            let any_sent = any_sent.into_inner();
            let all_halted = votes.all_set();
            let master_halt = computation.master_compute(&mut MasterComputeContext {
                superstep,
                graph,
                values: &values,
            });
            superstep += 1;
            debug_log!(superstep, any_sent, all_halted, "superstep finished");

            if master_halt || (all_halted && !any_sent) {
                break Outcome::Converged;
            }
            if superstep >= self.config.max_iterations {
                break Outcome::MaxIterationsReached;
            }
        };

        self.state = outcome.into();
        info_log!(ran_iterations = superstep, ?outcome, "pregel computation finished");
        Ok(PregelResult {
            node_values: values.retain_public(),
            ran_iterations: superstep,
            outcome,
        })
    }
}

fn partitions(graph: &dyn GraphView, config: &PregelConfig) -> Vec<Partition> {
    let by_degree = match config.partitioning {
        Partitioning::Range => false,
        Partitioning::Degree => true,
        Partitioning::Auto => graph.relationship_count() > 0,
    };
    if by_degree {
        degree_partition_graph(graph, config.concurrency, Some(config.min_batch_size))
            .into_iter()
            .map(Partition::from)
            .collect()
    } else {
        range_partition(config.concurrency, graph.node_count(), Some(config.min_batch_size))
    }
}
