//! Standard library helpers for constructing `PCollection`s.
//!
//! These helpers create in-memory sources directly from native Rust data
//! structures like `Vec<T>` or iterators. They're ideal for tests, demos, or
//! pipelines where data is small and self-contained.
//!
//! ### Example
//! ```
//! use beamlet::*;
//!
//! # fn main() -> anyhow::Result<()> {
//! let p = Pipeline::new();
//! let numbers = from_iter(&p, "numbers", 1..=5)?;
//! let squared = numbers.map("square", |n: &i32| n * n)?;
//! assert_eq!(squared.collect_seq()?, vec![1, 4, 9, 16, 25]);
//! # Ok(())
//! # }
//! ```

use crate::error::Result;
use crate::node::{ExecContext, NodeKind, SourceOp};
use crate::type_token::Partition;
use crate::{PCollection, Pipeline, RFBound};
use std::marker::PhantomData;
use std::sync::Arc;

/// In-memory source; every run sees the same shared vector.
struct VecSource<T> {
    data: Partition,
    _t: PhantomData<fn() -> T>,
}

impl<T: RFBound> SourceOp for VecSource<T> {
    fn read(&self, _ctx: &ExecContext<'_>) -> Result<Partition> {
        Ok(Arc::clone(&self.data))
    }
}

/// Create a [`PCollection<T>`] from a pre-existing [`Vec<T>`].
///
/// # Errors
/// `DuplicateName` if `name` is already used.
pub fn from_vec<T>(p: &Pipeline, name: &str, data: Vec<T>) -> Result<PCollection<T>>
where
    T: RFBound,
{
    let source = VecSource::<T> {
        data: Arc::new(data),
        _t: PhantomData,
    };
    let id = p.insert_node::<T>(name, Vec::new(), NodeKind::Source(Arc::new(source)))?;
    Ok(PCollection {
        pipeline: p.clone(),
        id,
        _t: PhantomData,
    })
}

/// Create a [`PCollection<T>`] from any iterator or collection implementing [`IntoIterator`].
///
/// # Errors
/// `DuplicateName` if `name` is already used.
pub fn from_iter<T, I>(p: &Pipeline, name: &str, iter: I) -> Result<PCollection<T>>
where
    T: RFBound,
    I: IntoIterator<Item = T>,
{
    from_vec(p, name, iter.into_iter().collect::<Vec<T>>())
}
