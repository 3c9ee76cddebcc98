use crate::aggregators::Aggregator;
use crate::error::{ConstructionError, Result};
use crate::node::{Node, NodeKind};
use crate::node_id::NodeId;
use crate::planner::{Plan, build_plan};
use crate::runner::{RunResult, Runner};
use crate::type_token::{TypeTag, VecOps, vec_ops_for};
use std::collections::{BTreeSet, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

static NEXT_PIPELINE_ID: AtomicU64 = AtomicU64::new(0);

/// The container for a computation graph.
///
/// Building a pipeline only records transforms; nothing executes until
/// [`Pipeline::run`] (or a [`Runner`]) is called. Clones share the same graph.
pub struct Pipeline {
    pub(crate) inner: Arc<Mutex<PipelineInner>>,
}

pub struct PipelineInner {
    pub id: u64,
    /// Nodes in insertion order; `nodes[i].id.index() == i`.
    pub nodes: Vec<Node>,
    pub names: HashSet<String>,
    pub aggregators: BTreeSet<String>,
    /// Composite labels currently being expanded, outermost first.
    pub scope: Vec<String>,
}

impl Default for Pipeline {
    fn default() -> Self {
        Self {
            inner: Arc::new(Mutex::new(PipelineInner {
                id: NEXT_PIPELINE_ID.fetch_add(1, Ordering::Relaxed),
                nodes: Vec::new(),
                names: HashSet::new(),
                aggregators: BTreeSet::new(),
                scope: Vec::new(),
            })),
        }
    }
}

/// Allow `Pipeline` cloning.
impl Clone for Pipeline {
    fn clone(&self) -> Self {
        Pipeline {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl Pipeline {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, PipelineInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Process-unique identifier of this graph.
    pub fn id(&self) -> u64 {
        self.lock().id
    }

    /// Number of transforms in the graph.
    pub fn len(&self) -> usize {
        self.lock().nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Fully qualified transform names in insertion order.
    pub fn transform_names(&self) -> Vec<String> {
        self.lock().nodes.iter().map(|n| n.name.clone()).collect()
    }

    /// Names of all aggregators declared by transforms of this pipeline.
    pub fn aggregator_names(&self) -> Vec<String> {
        self.lock().aggregators.iter().cloned().collect()
    }

    /// Copy of the current graph. Nodes are cheap to clone (their logic is shared).
    pub fn snapshot(&self) -> Vec<Node> {
        self.lock().nodes.clone()
    }

    /// Execution plan for the whole graph.
    ///
    /// # Errors
    /// If the graph is inconsistent.
    pub fn plan(&self) -> Result<Plan> {
        build_plan(self.snapshot(), None)
    }

    /// Human-readable execution plan.
    ///
    /// # Errors
    /// If the graph is inconsistent.
    pub fn explain(&self) -> Result<String> {
        Ok(self.plan()?.to_string())
    }

    /// Run the pipeline with the default [`Runner`].
    ///
    /// # Errors
    /// The first error raised by any transform; see [`PipelineError`](crate::PipelineError).
    pub fn run(&self) -> Result<RunResult> {
        Runner::default().run(self)
    }

    /// Append a node whose output is a stream of `T`.
    pub(crate) fn insert_node<T: Send + Sync + 'static>(
        &self,
        name: &str,
        inputs: Vec<NodeId>,
        kind: NodeKind,
    ) -> Result<NodeId> {
        self.push_node(name, inputs, kind, Some((TypeTag::of::<T>(), vec_ops_for::<T>())))
    }

    /// Append a terminal node (no output stream).
    pub(crate) fn insert_terminal(
        &self,
        name: &str,
        inputs: Vec<NodeId>,
        kind: NodeKind,
    ) -> Result<NodeId> {
        self.push_node(name, inputs, kind, None)
    }

    fn push_node(
        &self,
        name: &str,
        inputs: Vec<NodeId>,
        kind: NodeKind,
        output: Option<(TypeTag, Arc<dyn VecOps>)>,
    ) -> Result<NodeId> {
        let mut g = self.lock();
        let full = qualify(&g.scope, name);
        if g.names.contains(&full) {
            return Err(ConstructionError::DuplicateName { name: full }.into());
        }
        let id = NodeId::new(g.nodes.len() as u64);
        let (output, vec_ops) = match output {
            Some((tag, ops)) => (Some(tag), Some(ops)),
            None => (None, None),
        };
        g.names.insert(full.clone());
        g.nodes.push(Node {
            id,
            name: full,
            inputs,
            kind,
            output,
            vec_ops,
        });
        Ok(id)
    }

    /// Fully qualified form of `name` under the current composite scope.
    pub(crate) fn qualified_name(&self, name: &str) -> String {
        qualify(&self.lock().scope, name)
    }

    pub(crate) fn declare_aggregators(&self, aggregators: &[Aggregator]) {
        let mut g = self.lock();
        for a in aggregators {
            g.aggregators.insert(a.name().to_string());
        }
    }

    /// Run `f` with `label` pushed onto the name scope.
    pub(crate) fn with_scope<R>(&self, label: &str, f: impl FnOnce() -> R) -> R {
        self.lock().scope.push(label.to_string());
        let _guard = ScopeGuard(self);
        f()
    }
}

/// Pops the innermost name scope when dropped, including during unwinding.
struct ScopeGuard<'a>(&'a Pipeline);

impl Drop for ScopeGuard<'_> {
    fn drop(&mut self) {
        self.0.lock().scope.pop();
    }
}

fn qualify(scope: &[String], name: &str) -> String {
    if scope.is_empty() {
        name.to_string()
    } else {
        format!("{}/{}", scope.join("/"), name)
    }
}
