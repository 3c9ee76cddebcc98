use crate::error::Result;
use crate::node::{DynOp, ExecContext, NodeKind};
use crate::type_token::{Partition, downcast_vec};
use crate::{PCollection, RFBound};
use rayon::prelude::*;
use std::collections::HashMap;
use std::hash::Hash;
use std::marker::PhantomData;
use std::sync::Arc;

impl<T: RFBound> PCollection<T> {
    /// Derive a key and produce (K, T)
    ///
    /// # Errors
    /// `DuplicateName` if `name` is already used.
    pub fn key_by<K, F>(&self, name: &str, key_fn: F) -> Result<PCollection<(K, T)>>
    where
        K: RFBound + Eq + Hash,
        F: 'static + Send + Sync + Fn(&T) -> K,
    {
        self.map(name, move |t: &T| (key_fn(t), t.clone()))
    }
}

impl<K: RFBound + Eq + Hash, V: RFBound> PCollection<(K, V)> {
    /// Transform values while keeping keys.
    ///
    /// # Errors
    /// `DuplicateName` if `name` is already used.
    pub fn map_values<O, F>(&self, name: &str, f: F) -> Result<PCollection<(K, O)>>
    where
        O: RFBound,
        F: 'static + Send + Sync + Fn(&V) -> O,
    {
        self.map(name, move |kv: &(K, V)| (kv.0.clone(), f(&kv.1)))
    }

    /// Group values by key: (K, V) -> (K, Vec<V>)
    ///
    /// Equal keys always end up in exactly one group. Groups come out in the
    /// order their key was first seen, which is stable for a given input order
    /// but carries no meaning.
    ///
    /// # Errors
    /// `DuplicateName` if `name` is already used.
    pub fn group_by_key(&self, name: &str) -> Result<PCollection<(K, Vec<V>)>> {
        let op: Arc<dyn DynOp> = Arc::new(GroupByKeyOp::<K, V>(PhantomData));
        self.then(name, NodeKind::GroupByKey(op))
    }
}

/// Groups in first-seen key order.
struct Groups<K, V> {
    index: HashMap<K, usize>,
    groups: Vec<(K, Vec<V>)>,
}

impl<K: Eq + Hash + Clone, V> Groups<K, V> {
    fn new() -> Self {
        Self {
            index: HashMap::new(),
            groups: Vec::new(),
        }
    }

    fn push_all(&mut self, key: &K, values: impl IntoIterator<Item = V>) {
        let slot = match self.index.get(key) {
            Some(&i) => i,
            None => {
                self.index.insert(key.clone(), self.groups.len());
                self.groups.push((key.clone(), Vec::new()));
                self.groups.len() - 1
            }
        };
        self.groups[slot].1.extend(values);
    }
}

struct GroupByKeyOp<K, V>(PhantomData<fn() -> (K, V)>);

impl<K, V> DynOp for GroupByKeyOp<K, V>
where
    K: RFBound + Eq + Hash,
    V: RFBound,
{
    fn apply(&self, inputs: &[Partition], ctx: &ExecContext<'_>) -> Result<Partition> {
        let kv = downcast_vec::<(K, V)>(&inputs[0], ctx.transform())?;

        let local = |chunk: &[(K, V)]| {
            let mut g = Groups::new();
            for (k, v) in chunk {
                g.push_all(k, [v.clone()]);
            }
            g
        };

        let merged = if ctx.parallel() && kv.len() > 1 {
            // Two-phase: local groups per chunk, merged in chunk order.
            let locals: Vec<Groups<K, V>> = kv.par_chunks(ctx.chunk_len(kv.len())).map(local).collect();
            let mut acc = Groups::new();
            for part in locals {
                for (k, vs) in part.groups {
                    acc.push_all(&k, vs);
                }
            }
            acc
        } else {
            local(kv.as_slice())
        };
        Ok(Arc::new(merged.groups) as Partition)
    }
}
