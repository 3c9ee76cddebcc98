//! Execution planning.
//!
//! The planner turns a snapshot of the pipeline graph into a [`Plan`]:
//!
//! 1. **Order** -- nodes keep their insertion order, which is already
//!    topological because inputs always precede the node that reads them.
//! 2. **Prune** -- when a target stream is requested (`collect_*`), only its
//!    ancestors are kept; unrelated sinks and assertions do not run.
//! 3. **Count consumers** -- every kept node records how many kept nodes read
//!    it, so the runner can drop a stream right after its last reader.
//! 4. **Group into waves** -- a node's wave is one more than the highest wave
//!    among its inputs. Nodes of one wave never depend on each other and may
//!    run concurrently.

use crate::error::{PipelineError, Result};
use crate::node::Node;
use crate::node_id::NodeId;
use std::collections::HashMap;
use std::fmt::{Display, Formatter, Result as FormatResult};

/// One node of the plan with its scheduling metadata.
#[derive(Clone)]
pub struct PlanStep {
    pub node: Node,
    /// Number of plan steps reading this node's output (plus one for a target).
    pub consumers: usize,
    /// Dependency depth; sources are wave 0.
    pub wave: usize,
}

/// A validated, ordered execution plan.
#[derive(Clone)]
pub struct Plan {
    /// Steps in topological order.
    pub steps: Vec<PlanStep>,
    /// Indices into `steps`, grouped by wave.
    pub waves: Vec<Vec<usize>>,
    /// Stream returned to the caller instead of being released, if any.
    pub target: Option<NodeId>,
}

impl Plan {
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Number of barrier steps (group-by-key and combine).
    pub fn barriers(&self) -> usize {
        self.steps.iter().filter(|s| s.node.kind.is_barrier()).count()
    }
}

/// Build a plan from a graph snapshot, optionally pruned to the ancestors of `target`.
///
/// # Errors
/// `UnknownNode` if `target` or any input does not belong to the snapshot.
pub fn build_plan(nodes: Vec<Node>, target: Option<NodeId>) -> Result<Plan> {
    for (i, node) in nodes.iter().enumerate() {
        if let Some(bad) = node.inputs.iter().find(|inp| inp.index() >= i) {
            return Err(PipelineError::UnknownNode(*bad));
        }
    }

    let keep: Vec<bool> = match target {
        None => vec![true; nodes.len()],
        Some(t) => {
            if t.index() >= nodes.len() || nodes[t.index()].kind.is_terminal() {
                return Err(PipelineError::UnknownNode(t));
            }
            let mut keep = vec![false; nodes.len()];
            keep[t.index()] = true;
            for i in (0..=t.index()).rev() {
                if keep[i] {
                    for inp in &nodes[i].inputs {
                        keep[inp.index()] = true;
                    }
                }
            }
            keep
        }
    };

    let mut consumers: HashMap<NodeId, usize> = HashMap::new();
    let mut waves_of: HashMap<NodeId, usize> = HashMap::new();
    let mut steps = Vec::new();
    for node in nodes.into_iter().zip(keep).filter_map(|(n, k)| k.then_some(n)) {
        let wave = node
            .inputs
            .iter()
            .filter_map(|inp| waves_of.get(inp))
            .max()
            .map_or(0, |w| w + 1);
        for inp in &node.inputs {
            *consumers.entry(*inp).or_insert(0) += 1;
        }
        waves_of.insert(node.id, wave);
        steps.push(PlanStep {
            node,
            consumers: 0,
            wave,
        });
    }
    for step in &mut steps {
        step.consumers = consumers.get(&step.node.id).copied().unwrap_or(0)
            + usize::from(Some(step.node.id) == target);
    }

    let wave_count = steps.iter().map(|s| s.wave + 1).max().unwrap_or(0);
    let mut waves = vec![Vec::new(); wave_count];
    for (i, step) in steps.iter().enumerate() {
        waves[step.wave].push(i);
    }

    Ok(Plan {
        steps,
        waves,
        target,
    })
}

impl Display for Plan {
    fn fmt(&self, f: &mut Formatter<'_>) -> FormatResult {
        let names: HashMap<NodeId, &str> = self
            .steps
            .iter()
            .map(|s| (s.node.id, s.node.name.as_str()))
            .collect();
        let count = |pred: fn(&PlanStep) -> bool| self.steps.iter().filter(|s| pred(s)).count();

        writeln!(f, "╔═══════════════════════════════════════════════════════════════╗")?;
        writeln!(f, "║                       EXECUTION PLAN                          ║")?;
        writeln!(f, "╚═══════════════════════════════════════════════════════════════╝")?;
        writeln!(f)?;

        writeln!(f, "┌─ SUMMARY ────────────────────────────────────────────────────┐")?;
        writeln!(f, "│ Transforms:        {:>10}", self.steps.len())?;
        writeln!(f, "│ Sources:           {:>10}", count(|s| s.node.inputs.is_empty()))?;
        writeln!(f, "│ Barrier Ops:       {:>10}", self.barriers())?;
        writeln!(f, "│ Terminal Ops:      {:>10}", count(|s| s.node.kind.is_terminal()))?;
        writeln!(f, "│ Waves:             {:>10}", self.waves.len())?;
        if let Some(name) = self.target.and_then(|t| names.get(&t)) {
            writeln!(f, "│ Collecting:        {name}")?;
        }
        writeln!(f, "└──────────────────────────────────────────────────────────────┘")?;
        writeln!(f)?;

        writeln!(f, "┌─ EXECUTION STEPS ────────────────────────────────────────────┐")?;
        if self.is_empty() {
            writeln!(f, "│ (no transforms)")?;
        }
        for (i, step) in self.steps.iter().enumerate() {
            let barrier_marker = if step.node.kind.is_barrier() { " [BARRIER]" } else { "" };
            let target_marker = if Some(step.node.id) == self.target { " [TARGET]" } else { "" };
            writeln!(f, "│")?;
            writeln!(
                f,
                "│ Step {} (wave {}): {} '{}'{}{}",
                i + 1,
                step.wave,
                step.node.kind.label(),
                step.node.name,
                barrier_marker,
                target_marker
            )?;
            if !step.node.inputs.is_empty() {
                let inputs: Vec<&str> = step
                    .node
                    .inputs
                    .iter()
                    .map(|id| names.get(id).copied().unwrap_or("?"))
                    .collect();
                writeln!(f, "│   Inputs: {}", inputs.join(", "))?;
            }
            if let Some(tag) = &step.node.output {
                writeln!(f, "│   Output: {} ({} consumer(s))", tag.name, step.consumers)?;
            }
        }
        writeln!(f, "│")?;
        writeln!(f, "└──────────────────────────────────────────────────────────────┘")?;
        Ok(())
    }
}
