//! ParDo: per-element processing with side-channel aggregators.
//!
//! A [`DoFn`] sees one element at a time through a [`ProcessContext`], may emit
//! any number of outputs, and may bump aggregators. Returning an error aborts
//! the run with `ElementProcessing`.

use crate::aggregators::{Aggregator, AggregatorSet};
use crate::collection::{PCollection, RFBound};
use crate::error::Result;
use crate::node::{DynOp, ExecContext, NodeKind};
use crate::type_token::{Partition, downcast_vec};
use rayon::prelude::*;
use std::marker::PhantomData;
use std::sync::Arc;

/// Per-element function of a ParDo.
pub trait DoFn<I, O>: Send + Sync + 'static {
    /// Process one element.
    ///
    /// # Errors
    /// Any error aborts the run and is reported with the element and transform name.
    fn process(&self, element: &I, ctx: &mut ProcessContext<'_, O>) -> anyhow::Result<()>;

    /// Aggregators this function increments; they are registered with the pipeline.
    fn aggregators(&self) -> Vec<Aggregator> {
        Vec::new()
    }
}

/// Output buffer and aggregator access for one element.
pub struct ProcessContext<'a, O> {
    out: Vec<O>,
    aggregators: &'a AggregatorSet,
}

impl<'a, O> ProcessContext<'a, O> {
    fn new(aggregators: &'a AggregatorSet) -> Self {
        Self {
            out: Vec::new(),
            aggregators,
        }
    }

    /// Emit one output element.
    pub fn emit(&mut self, value: O) {
        self.out.push(value);
    }

    /// Add `value` to `aggregator` for this run.
    pub fn aggregate_to(&self, aggregator: &Aggregator, value: u64) {
        self.aggregators.add(aggregator, value);
    }
}

struct ParDoOp<I, O, D>(D, PhantomData<fn(I) -> O>);

impl<I, O, D> ParDoOp<I, O, D>
where
    I: RFBound,
    O: RFBound,
    D: DoFn<I, O>,
{
    fn process_one(&self, element: &I, ctx: &ExecContext<'_>) -> Result<Vec<O>> {
        let mut pc = ProcessContext::new(ctx.aggregators);
        ctx.guard(element, || {
            self.0
                .process(element, &mut pc)
                .map_err(|e| format!("{e:#}"))
        })?;
        Ok(pc.out)
    }
}

impl<I, O, D> DynOp for ParDoOp<I, O, D>
where
    I: RFBound,
    O: RFBound,
    D: DoFn<I, O>,
{
    fn apply(&self, inputs: &[Partition], ctx: &ExecContext<'_>) -> Result<Partition> {
        let v = downcast_vec::<I>(&inputs[0], ctx.transform())?;
        let nested: Vec<Vec<O>> = if ctx.parallel() {
            v.par_iter()
                .map(|i| self.process_one(i, ctx))
                .collect::<Result<_>>()?
        } else {
            v.iter()
                .map(|i| self.process_one(i, ctx))
                .collect::<Result<_>>()?
        };
        Ok(Arc::new(nested.into_iter().flatten().collect::<Vec<O>>()) as Partition)
    }
}

/// DoFn behind [`PCollection::filter_counted`].
struct CountingFilter<P> {
    pred: P,
    matched: Aggregator,
    unmatched: Aggregator,
}

impl<T, P> DoFn<T, T> for CountingFilter<P>
where
    T: RFBound,
    P: Fn(&T) -> bool + Send + Sync + 'static,
{
    fn process(&self, element: &T, ctx: &mut ProcessContext<'_, T>) -> anyhow::Result<()> {
        if (self.pred)(element) {
            ctx.aggregate_to(&self.matched, 1);
            ctx.emit(element.clone());
        } else {
            ctx.aggregate_to(&self.unmatched, 1);
        }
        Ok(())
    }

    fn aggregators(&self) -> Vec<Aggregator> {
        vec![self.matched.clone(), self.unmatched.clone()]
    }
}

impl<T: RFBound> PCollection<T> {
    /// Apply a [`DoFn`] to every element.
    ///
    /// # Errors
    /// `DuplicateName` if `name` is already used.
    pub fn par_do<O, D>(&self, name: &str, dofn: D) -> Result<PCollection<O>>
    where
        O: RFBound,
        D: DoFn<T, O>,
    {
        let declared = dofn.aggregators();
        let op: Arc<dyn DynOp> = Arc::new(ParDoOp::<T, O, D>(dofn, PhantomData));
        let out = self.then(name, NodeKind::FlatMap(op))?;
        self.pipeline.declare_aggregators(&declared);
        Ok(out)
    }

    /// Keep elements matching `pred`, counting matches into `matched` and the
    /// rest into `unmatched`. A non-match is never an error.
    ///
    /// # Errors
    /// `DuplicateName` if `name` is already used.
    pub fn filter_counted<P>(
        &self,
        name: &str,
        pred: P,
        matched: &Aggregator,
        unmatched: &Aggregator,
    ) -> Result<PCollection<T>>
    where
        P: Fn(&T) -> bool + Send + Sync + 'static,
    {
        self.par_do(
            name,
            CountingFilter {
                pred,
                matched: matched.clone(),
                unmatched: unmatched.clone(),
            },
        )
    }
}
