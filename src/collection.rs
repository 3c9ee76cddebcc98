//! Typed stream handles and the element-wise transforms.
//!
//! A [`PCollection<T>`] names the not-yet-computed output of one node. Every
//! transform method appends exactly one node to the pipeline and returns a new
//! handle; a handle can feed any number of downstream transforms.

use crate::error::Result;
use crate::node::{DynOp, ExecContext, NodeKind};
use crate::node_id::NodeId;
use crate::pipeline::Pipeline;
use crate::runner::{ExecMode, Runner};
use crate::type_token::{Partition, downcast_vec};
use rayon::prelude::*;
use serde::{Serialize, de::DeserializeOwned};
use std::convert::Infallible;
use std::fmt::Display;
use std::marker::PhantomData;
use std::sync::Arc;

/// Bound every element type must satisfy.
pub trait RFBound: 'static + Send + Sync + Clone + Serialize + DeserializeOwned {}
impl<T> RFBound for T where T: 'static + Send + Sync + Clone + Serialize + DeserializeOwned {}

/// Handle to a stream of `T` produced by one node of a pipeline.
pub struct PCollection<T> {
    pub(crate) pipeline: Pipeline,
    pub(crate) id: NodeId,
    pub(crate) _t: PhantomData<T>,
}

impl<T> Clone for PCollection<T> {
    fn clone(&self) -> Self {
        Self {
            pipeline: self.pipeline.clone(),
            id: self.id,
            _t: PhantomData,
        }
    }
}

impl<T> std::fmt::Debug for PCollection<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PCollection").field("id", &self.id).finish()
    }
}

/// A reusable, composite transform (a named group of primitive transforms).
///
/// Apply it with [`PCollection::apply`]; every node it creates is named under
/// the label passed there, e.g. `CountWords/split`.
pub trait PTransform<I, O> {
    /// Append this transform's nodes downstream of `input`.
    ///
    /// # Errors
    /// Construction errors from the appended nodes.
    fn expand(&self, input: &PCollection<I>) -> Result<PCollection<O>>;
}

/// ---- Stateless DynOps ----
pub(crate) struct TryMapOp<I, O, E, F>(pub(crate) F, pub(crate) PhantomData<fn(I) -> (O, E)>);

impl<I, O, E, F> DynOp for TryMapOp<I, O, E, F>
where
    I: RFBound,
    O: RFBound,
    E: Display,
    F: Send + Sync + Fn(&I) -> std::result::Result<O, E> + 'static,
{
    fn apply(&self, inputs: &[Partition], ctx: &ExecContext<'_>) -> Result<Partition> {
        let v = downcast_vec::<I>(&inputs[0], ctx.transform())?;
        let one = |i: &I| ctx.guard(i, || (self.0)(i));
        let out: Vec<O> = if ctx.parallel() {
            v.par_iter().map(one).collect::<Result<_>>()?
        } else {
            v.iter().map(one).collect::<Result<_>>()?
        };
        Ok(Arc::new(out) as Partition)
    }
}

pub(crate) struct TryFlatMapOp<I, O, E, F>(pub(crate) F, pub(crate) PhantomData<fn(I) -> (O, E)>);

impl<I, O, E, F> DynOp for TryFlatMapOp<I, O, E, F>
where
    I: RFBound,
    O: RFBound,
    E: Display,
    F: Send + Sync + Fn(&I) -> std::result::Result<Vec<O>, E> + 'static,
{
    fn apply(&self, inputs: &[Partition], ctx: &ExecContext<'_>) -> Result<Partition> {
        let v = downcast_vec::<I>(&inputs[0], ctx.transform())?;
        let one = |i: &I| ctx.guard(i, || (self.0)(i));
        let nested: Vec<Vec<O>> = if ctx.parallel() {
            v.par_iter().map(one).collect::<Result<_>>()?
        } else {
            v.iter().map(one).collect::<Result<_>>()?
        };
        let out: Vec<O> = nested.into_iter().flatten().collect();
        Ok(Arc::new(out) as Partition)
    }
}

impl<T: RFBound> PCollection<T> {
    /// Id of the node producing this stream.
    pub fn node_id(&self) -> NodeId {
        self.id
    }

    /// The pipeline this stream belongs to.
    pub fn pipeline(&self) -> &Pipeline {
        &self.pipeline
    }

    /// Append a single-input node downstream of `self`.
    pub(crate) fn then<O: RFBound>(&self, name: &str, kind: NodeKind) -> Result<PCollection<O>> {
        let id = self.pipeline.insert_node::<O>(name, vec![self.id], kind)?;
        Ok(PCollection {
            pipeline: self.pipeline.clone(),
            id,
            _t: PhantomData,
        })
    }

    /// Exactly one output per input.
    ///
    /// A panic inside `f` fails the run with `ElementProcessing`, as an error
    /// returned from [`try_map`](Self::try_map) would; prefer `try_map` for
    /// expected failures.
    ///
    /// # Errors
    /// `DuplicateName` if `name` is already used.
    pub fn map<O, F>(&self, name: &str, f: F) -> Result<PCollection<O>>
    where
        O: RFBound,
        F: 'static + Send + Sync + Fn(&T) -> O,
    {
        self.try_map(name, move |t: &T| Ok::<O, Infallible>(f(t)))
    }

    /// Like [`map`](Self::map), but a returned error aborts the run with
    /// `ElementProcessing` naming this transform and the offending element.
    ///
    /// # Errors
    /// `DuplicateName` if `name` is already used.
    pub fn try_map<O, E, F>(&self, name: &str, f: F) -> Result<PCollection<O>>
    where
        O: RFBound,
        E: 'static + Display,
        F: 'static + Send + Sync + Fn(&T) -> std::result::Result<O, E>,
    {
        let op: Arc<dyn DynOp> = Arc::new(TryMapOp::<T, O, E, F>(f, PhantomData));
        self.then(name, NodeKind::Map(op))
    }

    /// Zero or more outputs per input.
    ///
    /// # Errors
    /// `DuplicateName` if `name` is already used.
    pub fn flat_map<O, F>(&self, name: &str, f: F) -> Result<PCollection<O>>
    where
        O: RFBound,
        F: 'static + Send + Sync + Fn(&T) -> Vec<O>,
    {
        self.try_flat_map(name, move |t: &T| Ok::<Vec<O>, Infallible>(f(t)))
    }

    /// Fallible [`flat_map`](Self::flat_map).
    ///
    /// # Errors
    /// `DuplicateName` if `name` is already used.
    pub fn try_flat_map<O, E, F>(&self, name: &str, f: F) -> Result<PCollection<O>>
    where
        O: RFBound,
        E: 'static + Display,
        F: 'static + Send + Sync + Fn(&T) -> std::result::Result<Vec<O>, E>,
    {
        let op: Arc<dyn DynOp> = Arc::new(TryFlatMapOp::<T, O, E, F>(f, PhantomData));
        self.then(name, NodeKind::FlatMap(op))
    }

    /// Keep elements matching `pred`.
    ///
    /// # Errors
    /// `DuplicateName` if `name` is already used.
    pub fn filter<F>(&self, name: &str, pred: F) -> Result<PCollection<T>>
    where
        F: 'static + Send + Sync + Fn(&T) -> bool,
    {
        self.flat_map(name, move |t: &T| if pred(t) { vec![t.clone()] } else { Vec::new() })
    }

    /// Expand a composite transform with its nodes named under `label`.
    ///
    /// # Errors
    /// Construction errors raised while expanding.
    pub fn apply<O, X>(&self, label: &str, transform: &X) -> Result<PCollection<O>>
    where
        O: RFBound,
        X: PTransform<T, O> + ?Sized,
    {
        self.pipeline.with_scope(label, || transform.expand(self))
    }

    /// Run this stream's ancestors sequentially and return its contents.
    ///
    /// # Errors
    /// The first error raised while computing the stream.
    pub fn collect_seq(&self) -> Result<Vec<T>> {
        Runner {
            mode: ExecMode::Sequential,
            ..Default::default()
        }
        .run_collect::<T>(&self.pipeline, self)
    }

    /// Run this stream's ancestors on the worker pool and return its contents.
    ///
    /// # Errors
    /// The first error raised while computing the stream.
    pub fn collect_par(&self, threads: Option<usize>, partitions: Option<usize>) -> Result<Vec<T>> {
        Runner {
            mode: ExecMode::Parallel {
                threads,
                partitions,
            },
            ..Default::default()
        }
        .run_collect::<T>(&self.pipeline, self)
    }
}
