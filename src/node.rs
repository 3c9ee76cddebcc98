//! Graph nodes and the operator traits the runner evaluates.
//!
//! A [`Node`] is immutable once appended to a pipeline. Its [`NodeKind`] is a
//! closed set of transform kinds; each kind holds its typed logic behind one of
//! the object-safe traits below, so the runner can evaluate any node without
//! knowing element types.

use crate::aggregators::AggregatorSet;
use crate::error::{PipelineError, Result};
use crate::node_id::NodeId;
use crate::type_token::{Partition, TypeTag, VecOps};
use serde::Serialize;
use std::any::Any;
use std::fmt::Display;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

/// Per-node view of the running executor handed to every operator.
pub struct ExecContext<'a> {
    pub(crate) transform: &'a str,
    pub(crate) parallel: bool,
    pub(crate) partitions: usize,
    pub(crate) aggregators: &'a AggregatorSet,
}

impl<'a> ExecContext<'a> {
    pub(crate) fn new(
        transform: &'a str,
        parallel: bool,
        partitions: usize,
        aggregators: &'a AggregatorSet,
    ) -> Self {
        Self {
            transform,
            parallel,
            partitions: partitions.max(1),
            aggregators,
        }
    }

    /// Fully qualified name of the transform being evaluated.
    pub fn transform(&self) -> &str {
        self.transform
    }

    /// Whether element-wise work may be spread over the worker pool.
    pub fn parallel(&self) -> bool {
        self.parallel
    }

    /// Build an `ElementProcessing` error for `element`.
    pub(crate) fn element_error<T: Serialize>(
        &self,
        element: &T,
        message: impl Display,
    ) -> PipelineError {
        let element = serde_json::to_string(element)
            .unwrap_or_else(|_| "<unserializable element>".to_string());
        PipelineError::ElementProcessing {
            transform: self.transform.to_string(),
            element,
            message: message.to_string(),
        }
    }

    /// Call user code for `element`; a returned error or a panic becomes
    /// `ElementProcessing` for this transform.
    pub(crate) fn guard<T, O, E>(
        &self,
        element: &T,
        f: impl FnOnce() -> std::result::Result<O, E>,
    ) -> Result<O>
    where
        T: Serialize,
        E: Display,
    {
        match panic::catch_unwind(AssertUnwindSafe(f)) {
            Ok(Ok(out)) => Ok(out),
            Ok(Err(e)) => Err(self.element_error(element, e)),
            Err(payload) => Err(self.element_error(element, panic_message(payload.as_ref()))),
        }
    }

    /// Split `len` items into roughly `partitions` contiguous chunks.
    pub(crate) fn chunk_len(&self, len: usize) -> usize {
        len.div_ceil(self.partitions).max(1)
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    let text = payload
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("non-string payload");
    format!("panicked: {text}")
}

/// Produces the first stream of a branch (reads an endpoint or an in-memory vec).
pub trait SourceOp: Send + Sync {
    fn read(&self, ctx: &ExecContext<'_>) -> Result<Partition>;
}

/// Turns materialized input partitions into one output partition.
pub trait DynOp: Send + Sync {
    fn apply(&self, inputs: &[Partition], ctx: &ExecContext<'_>) -> Result<Partition>;
}

/// Consumes a materialized stream without producing one.
pub trait SinkOp: Send + Sync {
    fn consume(&self, input: &Partition, ctx: &ExecContext<'_>) -> Result<()>;
}

/// The closed set of transform kinds a pipeline can hold.
#[derive(Clone)]
pub enum NodeKind {
    Source(Arc<dyn SourceOp>),
    /// Zero or more outputs per input (includes filters and ParDo).
    FlatMap(Arc<dyn DynOp>),
    /// Exactly one output per input.
    Map(Arc<dyn DynOp>),
    /// Barrier: `(K, V)` pairs to `(K, Vec<V>)` groups.
    GroupByKey(Arc<dyn DynOp>),
    /// Per-group reduction with an associative, commutative `CombineFn`.
    Combine(Arc<dyn DynOp>),
    /// Concatenation of several streams of the same type.
    Flatten(Arc<dyn DynOp>),
    /// Terminal comparison of a stream against expectations.
    Assert(Arc<dyn SinkOp>),
    /// Terminal write to an external endpoint.
    Sink(Arc<dyn SinkOp>),
}

impl NodeKind {
    /// Short label used in plans and logs.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Source(_) => "Source",
            Self::FlatMap(_) => "FlatMap",
            Self::Map(_) => "Map",
            Self::GroupByKey(_) => "GroupByKey",
            Self::Combine(_) => "Combine",
            Self::Flatten(_) => "Flatten",
            Self::Assert(_) => "Assert",
            Self::Sink(_) => "Sink",
        }
    }

    /// Barriers need their whole input before producing anything.
    pub fn is_barrier(&self) -> bool {
        matches!(self, Self::GroupByKey(_) | Self::Combine(_))
    }

    /// Terminal nodes produce no stream.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Assert(_) | Self::Sink(_))
    }
}

/// One transform in the pipeline graph.
#[derive(Clone)]
pub struct Node {
    pub id: NodeId,
    /// Fully qualified, pipeline-unique name.
    pub name: String,
    /// Upstream nodes, in the order the transform consumes them.
    pub inputs: Vec<NodeId>,
    pub kind: NodeKind,
    /// Element type of the produced stream (`None` for terminal nodes).
    pub output: Option<TypeTag>,
    pub(crate) vec_ops: Option<Arc<dyn VecOps>>,
}

impl Node {
    /// Number of elements in `partition` if it holds this node's output type.
    pub(crate) fn output_len(&self, partition: &Partition) -> Option<usize> {
        self.vec_ops.as_ref()?.len(partition.as_ref())
    }
}
