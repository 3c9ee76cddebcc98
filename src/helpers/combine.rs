use crate::combiners::CombineFn;
use crate::error::Result;
use crate::node::{DynOp, ExecContext, NodeKind};
use crate::type_token::{Partition, downcast_vec};
use crate::{PCollection, RFBound};
use rayon::prelude::*;
use std::hash::Hash;
use std::marker::PhantomData;
use std::sync::Arc;

/// Groups at least this large are combined in chunks when running in parallel.
const CHUNKED_GROUP_MIN: usize = 4096;

/// Fold `values` into one accumulator.
pub(crate) fn accumulate<C, V, A, O>(comb: &C, values: &[V]) -> A
where
    C: CombineFn<V, A, O>,
    V: Clone,
{
    let mut acc = comb.create();
    for v in values {
        comb.add_input(&mut acc, v.clone());
    }
    acc
}

/// Combine `values` as independently accumulated chunks merged together.
pub(crate) fn accumulate_chunked<C, V, A, O>(comb: &C, values: &[V], chunk: usize) -> A
where
    C: CombineFn<V, A, O>,
    V: Clone + Sync,
    A: Send,
{
    values
        .par_chunks(chunk.max(1))
        .map(|c| accumulate::<C, V, A, O>(comb, c))
        .reduce(
            || comb.create(),
            |mut a, b| {
                comb.merge(&mut a, b);
                a
            },
        )
}

struct CombineGroupsOp<K, V, A, O, C> {
    comb: C,
    _t: PhantomData<fn(K, V) -> (A, O)>,
}

impl<K, V, A, O, C> CombineGroupsOp<K, V, A, O, C>
where
    K: RFBound,
    V: RFBound,
    A: Send + 'static,
    O: RFBound,
    C: CombineFn<V, A, O>,
{
    fn combine_one(&self, (k, vs): &(K, Vec<V>), ctx: &ExecContext<'_>) -> (K, O) {
        let acc = if ctx.parallel() && vs.len() >= CHUNKED_GROUP_MIN {
            accumulate_chunked::<C, V, A, O>(&self.comb, vs, ctx.chunk_len(vs.len()))
        } else {
            accumulate::<C, V, A, O>(&self.comb, vs)
        };
        (k.clone(), self.comb.finish(acc))
    }
}

impl<K, V, A, O, C> DynOp for CombineGroupsOp<K, V, A, O, C>
where
    K: RFBound,
    V: RFBound,
    A: Send + 'static,
    O: RFBound,
    C: CombineFn<V, A, O>,
{
    fn apply(&self, inputs: &[Partition], ctx: &ExecContext<'_>) -> Result<Partition> {
        let groups = downcast_vec::<(K, Vec<V>)>(&inputs[0], ctx.transform())?;
        let out: Vec<(K, O)> = if ctx.parallel() {
            groups.par_iter().map(|g| self.combine_one(g, ctx)).collect()
        } else {
            groups.iter().map(|g| self.combine_one(g, ctx)).collect()
        };
        Ok(Arc::new(out) as Partition)
    }
}

impl<K, V> PCollection<(K, Vec<V>)>
where
    K: RFBound,
    V: RFBound,
{
    /// Reduce each group's values to one output with `comb`.
    ///
    /// # Errors
    /// `DuplicateName` if `name` is already used.
    pub fn combine_grouped<C, A, O>(&self, name: &str, comb: C) -> Result<PCollection<(K, O)>>
    where
        C: CombineFn<V, A, O>,
        A: Send + 'static,
        O: RFBound,
    {
        let op: Arc<dyn DynOp> = Arc::new(CombineGroupsOp::<K, V, A, O, C> {
            comb,
            _t: PhantomData,
        });
        self.then(name, NodeKind::Combine(op))
    }
}

impl<K: RFBound + Eq + Hash, V: RFBound> PCollection<(K, V)> {
    /// Group by key then combine: appends `name/group` and `name/combine`.
    ///
    /// # Errors
    /// `DuplicateName` if either node name is already used.
    pub fn combine_per_key<C, A, O>(&self, name: &str, comb: C) -> Result<PCollection<(K, O)>>
    where
        C: CombineFn<V, A, O>,
        A: Send + 'static,
        O: RFBound,
    {
        self.pipeline.with_scope(name, || {
            self.group_by_key("group")?.combine_grouped("combine", comb)
        })
    }
}
