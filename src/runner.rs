//! The executor.
//!
//! A [`Runner`] plans a pipeline snapshot and evaluates it either one node at a
//! time ([`ExecMode::Sequential`]) or wave by wave on a rayon pool
//! ([`ExecMode::Parallel`]), where operators also spread element-wise work over
//! the pool. Every run gets fresh aggregator counters and re-reads its sources.
//! The first error aborts the run; sinks that already ran keep what they wrote.

use crate::aggregators::AggregatorSet;
use crate::collection::{PCollection, RFBound};
use crate::error::{ConstructionError, PipelineError, Result};
use crate::node::{ExecContext, Node, NodeKind};
use crate::node_id::NodeId;
use crate::pipeline::Pipeline;
use crate::planner::{Plan, PlanStep, build_plan};
use crate::type_token::{Partition, into_vec};
use rayon::prelude::*;
use std::collections::{BTreeMap, HashMap};
use std::time::{Duration, Instant};
use tracing::{debug, info, trace};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ExecMode {
    Sequential,
    /// `threads`: size of a dedicated pool (`None` uses rayon's global pool).
    /// `partitions`: chunks per barrier (`None` uses the runner default).
    Parallel {
        threads: Option<usize>,
        partitions: Option<usize>,
    },
}

pub struct Runner {
    pub mode: ExecMode,
    pub default_partitions: usize,
}

impl Default for Runner {
    fn default() -> Self {
        Self {
            mode: ExecMode::Parallel {
                threads: None,
                partitions: None,
            },
            default_partitions: 2 * num_cpus::get().max(2),
        }
    }
}

/// Outcome of a successful run.
#[derive(Clone, Debug)]
pub struct RunResult {
    aggregators: BTreeMap<String, u64>,
    elapsed: Duration,
    steps_executed: usize,
}

impl RunResult {
    /// Final value of aggregator `name` (zero if it never counted).
    pub fn aggregator(&self, name: &str) -> u64 {
        self.aggregators.get(name).copied().unwrap_or(0)
    }

    /// All final aggregator values, sorted by name.
    pub fn aggregators(&self) -> &BTreeMap<String, u64> {
        &self.aggregators
    }

    pub fn elapsed(&self) -> Duration {
        self.elapsed
    }

    pub fn steps_executed(&self) -> usize {
        self.steps_executed
    }
}

/// Live streams of one run, released as their consumers finish.
struct Slots {
    data: HashMap<NodeId, Partition>,
    remaining: HashMap<NodeId, usize>,
}

impl Slots {
    fn new(plan: &Plan) -> Self {
        Self {
            data: HashMap::new(),
            remaining: plan
                .steps
                .iter()
                .map(|s| (s.node.id, s.consumers))
                .collect(),
        }
    }

    fn inputs(&self, node: &Node) -> Result<Vec<Partition>> {
        node.inputs
            .iter()
            .map(|id| {
                self.data
                    .get(id)
                    .cloned()
                    .ok_or(PipelineError::UnknownNode(*id))
            })
            .collect()
    }

    /// Store a finished node's output and release inputs nobody else needs.
    fn finish(&mut self, step: &PlanStep, output: Option<Partition>) {
        if let Some(out) = output.filter(|_| step.consumers > 0) {
            self.data.insert(step.node.id, out);
        }
        for id in &step.node.inputs {
            let Some(left) = self.remaining.get_mut(id) else {
                continue;
            };
            *left = left.saturating_sub(1);
            if *left == 0 && self.data.remove(id).is_some() {
                trace!(node = id.raw(), "released stream");
            }
        }
    }
}

impl Runner {
    /// Evaluate everything on one thread.
    #[must_use]
    pub fn sequential() -> Self {
        Self {
            mode: ExecMode::Sequential,
            ..Self::default()
        }
    }

    /// Evaluate on a pool of `threads` workers (`None` for rayon's global pool).
    #[must_use]
    pub fn parallel(threads: Option<usize>) -> Self {
        Self {
            mode: ExecMode::Parallel {
                threads,
                partitions: None,
            },
            ..Self::default()
        }
    }

    /// Run every node of `p`, including all sinks and assertions.
    ///
    /// # Errors
    /// The first error raised by any node.
    pub fn run(&self, p: &Pipeline) -> Result<RunResult> {
        let plan = build_plan(p.snapshot(), None)?;
        let aggregators = AggregatorSet::with_names(p.aggregator_names());
        let started = Instant::now();
        self.execute(&plan, &aggregators)?;
        let result = RunResult {
            aggregators: aggregators.snapshot(),
            elapsed: started.elapsed(),
            steps_executed: plan.len(),
        };
        info!(
            pipeline = p.id(),
            steps = result.steps_executed,
            elapsed_ms = result.elapsed.as_millis() as u64,
            "pipeline finished"
        );
        for (name, value) in &result.aggregators {
            info!(aggregator = %name, value, "final aggregator value");
        }
        Ok(result)
    }

    /// Run only the ancestors of `target` and return its contents.
    ///
    /// # Errors
    /// `CrossGraphReference` if `target` was built on another pipeline,
    /// `UnknownNode` if it is not a materialized stream of `p`, `TypeMismatch`
    /// if it does not hold `T`, or the first error raised while computing it.
    pub fn run_collect<T: RFBound>(&self, p: &Pipeline, target: &PCollection<T>) -> Result<Vec<T>> {
        let (expected, found) = (p.id(), target.pipeline.id());
        if found != expected {
            let transform = target
                .pipeline
                .transform_names()
                .into_iter()
                .nth(target.id.index())
                .unwrap_or_default();
            return Err(ConstructionError::CrossGraphReference {
                transform,
                expected,
                found,
            }
            .into());
        }
        let target = target.id;
        let plan = build_plan(p.snapshot(), Some(target))?;
        let aggregators = AggregatorSet::with_names(p.aggregator_names());
        let started = Instant::now();
        let mut slots = self.execute(&plan, &aggregators)?;
        debug!(
            pipeline = p.id(),
            steps = plan.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "collected stream"
        );
        let name = plan
            .steps
            .last()
            .map_or_else(String::new, |s| s.node.name.clone());
        let out = slots
            .data
            .remove(&target)
            .ok_or(PipelineError::UnknownNode(target))?;
        into_vec::<T>(out, &name)
    }

    fn execute(&self, plan: &Plan, aggregators: &AggregatorSet) -> Result<Slots> {
        match self.mode {
            ExecMode::Sequential => exec_seq(plan, aggregators, self.default_partitions),
            ExecMode::Parallel {
                threads,
                partitions,
            } => {
                let parts = partitions.unwrap_or(self.default_partitions);
                match threads {
                    Some(t) => {
                        let pool = rayon::ThreadPoolBuilder::new().num_threads(t).build()?;
                        pool.install(|| exec_waves(plan, aggregators, parts))
                    }
                    None => exec_waves(plan, aggregators, parts),
                }
            }
        }
    }
}

/// Evaluate one node against its materialized inputs.
fn eval(node: &Node, inputs: &[Partition], ctx: &ExecContext<'_>) -> Result<Option<Partition>> {
    let started = Instant::now();
    let out = match &node.kind {
        NodeKind::Source(op) => Some(op.read(ctx)?),
        NodeKind::FlatMap(op)
        | NodeKind::Map(op)
        | NodeKind::GroupByKey(op)
        | NodeKind::Combine(op)
        | NodeKind::Flatten(op) => Some(op.apply(inputs, ctx)?),
        NodeKind::Assert(op) | NodeKind::Sink(op) => {
            let input = inputs
                .first()
                .ok_or_else(|| PipelineError::UnknownNode(node.id))?;
            op.consume(input, ctx)?;
            None
        }
    };
    debug!(
        step = %node.name,
        kind = node.kind.label(),
        elements = ?out.as_ref().and_then(|p| node.output_len(p)),
        elapsed_us = started.elapsed().as_micros() as u64,
        "step finished"
    );
    Ok(out)
}

fn exec_seq(plan: &Plan, aggregators: &AggregatorSet, partitions: usize) -> Result<Slots> {
    let mut slots = Slots::new(plan);
    for step in &plan.steps {
        let inputs = slots.inputs(&step.node)?;
        let ctx = ExecContext::new(&step.node.name, false, partitions, aggregators);
        let out = eval(&step.node, &inputs, &ctx)?;
        drop(inputs);
        slots.finish(step, out);
    }
    Ok(slots)
}

fn exec_waves(plan: &Plan, aggregators: &AggregatorSet, partitions: usize) -> Result<Slots> {
    let mut slots = Slots::new(plan);
    for (wave, members) in plan.waves.iter().enumerate() {
        let batch: Vec<(&PlanStep, Vec<Partition>)> = members
            .iter()
            .map(|&i| {
                let step = &plan.steps[i];
                Ok((step, slots.inputs(&step.node)?))
            })
            .collect::<Result<_>>()?;
        trace!(wave, nodes = batch.len(), "starting wave");

        let results: Vec<Result<Option<Partition>>> = batch
            .par_iter()
            .map(|(step, inputs)| {
                let ctx = ExecContext::new(&step.node.name, true, partitions, aggregators);
                eval(&step.node, inputs, &ctx)
            })
            .collect();
        drop(batch);

        // Report the earliest failing node in plan order.
        let mut outputs = Vec::with_capacity(results.len());
        for r in results {
            outputs.push(r?);
        }
        for (&i, out) in members.iter().zip(outputs) {
            slots.finish(&plan.steps[i], out);
        }
    }
    Ok(slots)
}
