use crate::error::{ConstructionError, Result};
use crate::node::{DynOp, ExecContext, NodeKind};
use crate::type_token::{Partition, downcast_vec};
use crate::{PCollection, Pipeline, RFBound};
use std::marker::PhantomData;
use std::sync::Arc;

struct FlattenOp<T>(PhantomData<fn() -> T>);

impl<T: RFBound> DynOp for FlattenOp<T> {
    fn apply(&self, inputs: &[Partition], ctx: &ExecContext<'_>) -> Result<Partition> {
        let mut out: Vec<T> = Vec::new();
        for input in inputs {
            out.extend(downcast_vec::<T>(input, ctx.transform())?.iter().cloned());
        }
        Ok(Arc::new(out) as Partition)
    }
}

impl Pipeline {
    /// Concatenate several streams of the same type into one.
    ///
    /// # Errors
    /// - `NoInputs` when `inputs` is empty
    /// - `CrossGraphReference` when an input belongs to another pipeline
    /// - `DuplicateName` if `name` is already used
    pub fn flatten<T: RFBound>(&self, name: &str, inputs: &[&PCollection<T>]) -> Result<PCollection<T>> {
        if inputs.is_empty() {
            return Err(ConstructionError::NoInputs {
                transform: self.qualified_name(name),
            }
            .into());
        }
        let expected = self.id();
        for input in inputs {
            let found = input.pipeline.id();
            if found != expected {
                return Err(ConstructionError::CrossGraphReference {
                    transform: self.qualified_name(name),
                    expected,
                    found,
                }
                .into());
            }
        }
        let op: Arc<dyn DynOp> = Arc::new(FlattenOp::<T>(PhantomData));
        let ids = inputs.iter().map(|c| c.id).collect();
        let id = self.insert_node::<T>(name, ids, NodeKind::Flatten(op))?;
        Ok(PCollection {
            pipeline: self.clone(),
            id,
            _t: PhantomData,
        })
    }
}
