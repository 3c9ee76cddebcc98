//! Assertion sinks: compare a stream's full contents against expectations
//! while the pipeline runs.
//!
//! An assertion is a terminal node. It sees the whole materialized stream and
//! fails the run with [`PipelineError::AssertionFailed`] when its matcher
//! reports a [`Mismatch`].
//!
//! ```
//! use beamlet::*;
//!
//! # fn main() -> anyhow::Result<()> {
//! let p = Pipeline::new();
//! let words = from_vec(&p, "words", vec!["b".to_string(), "a".to_string()])?;
//! words.assert_equals("check", vec!["a".to_string(), "b".to_string()])?;
//! p.run()?;
//! # Ok(())
//! # }
//! ```

use crate::collection::{PCollection, RFBound};
use crate::error::{Mismatch, PipelineError, Result};
use crate::node::{ExecContext, NodeKind, SinkOp};
use crate::type_token::{Partition, downcast_vec};
use std::fmt::Debug;
use std::marker::PhantomData;
use std::sync::Arc;
use tracing::debug;

fn render<T: Debug>(items: &[T]) -> Vec<String> {
    items.iter().map(|t| format!("{t:?}")).collect()
}

/// Matcher comparing contents with `expected` as multisets: order is ignored,
/// duplicates count.
pub fn equal_to<T>(expected: Vec<T>) -> impl Fn(&[T]) -> Result<(), Mismatch> + Send + Sync + 'static
where
    T: PartialEq + Debug + Send + Sync + 'static,
{
    move |actual: &[T]| {
        let mut used = vec![false; actual.len()];
        let mut missing = Vec::new();
        for e in &expected {
            let hit = (0..actual.len()).find(|&i| !used[i] && actual[i] == *e);
            match hit {
                Some(i) => used[i] = true,
                None => missing.push(format!("{e:?}")),
            }
        }
        let unexpected: Vec<String> = actual
            .iter()
            .zip(&used)
            .filter(|(_, hit)| !**hit)
            .map(|(a, _)| format!("{a:?}"))
            .collect();
        if missing.is_empty() && unexpected.is_empty() {
            return Ok(());
        }
        Err(Mismatch {
            actual: render(actual),
            expected: render(&expected),
            missing,
            unexpected,
            reason: None,
        })
    }
}

/// Matcher accepting only an empty stream.
pub fn is_empty<T>() -> impl Fn(&[T]) -> Result<(), Mismatch> + Send + Sync + 'static
where
    T: Debug + 'static,
{
    |actual: &[T]| {
        if actual.is_empty() {
            Ok(())
        } else {
            Err(Mismatch {
                actual: render(actual),
                unexpected: render(actual),
                ..Mismatch::default()
            })
        }
    }
}

struct AssertOp<T, M> {
    matcher: M,
    _t: PhantomData<fn(T)>,
}

impl<T, M> SinkOp for AssertOp<T, M>
where
    T: RFBound,
    M: Fn(&[T]) -> Result<(), Mismatch> + Send + Sync + 'static,
{
    fn consume(&self, input: &Partition, ctx: &ExecContext<'_>) -> Result<()> {
        let actual = downcast_vec::<T>(input, ctx.transform())?;
        (self.matcher)(actual).map_err(|mismatch| PipelineError::AssertionFailed {
            transform: ctx.transform().to_string(),
            mismatch,
        })?;
        debug!(transform = ctx.transform(), elements = actual.len(), "assertion passed");
        Ok(())
    }
}

impl<T: RFBound> PCollection<T> {
    /// Check the stream's full contents with `matcher` when the pipeline runs.
    ///
    /// # Errors
    /// `DuplicateName` if `name` is already used.
    pub fn assert_that<M>(&self, name: &str, matcher: M) -> Result<()>
    where
        M: Fn(&[T]) -> Result<(), Mismatch> + Send + Sync + 'static,
    {
        let op = AssertOp::<T, M> {
            matcher,
            _t: PhantomData,
        };
        self.pipeline
            .insert_terminal(name, vec![self.id], NodeKind::Assert(Arc::new(op)))?;
        Ok(())
    }

    /// Shorthand for `assert_that(name, equal_to(expected))`.
    ///
    /// # Errors
    /// `DuplicateName` if `name` is already used.
    pub fn assert_equals(&self, name: &str, expected: Vec<T>) -> Result<()>
    where
        T: PartialEq + Debug,
    {
        self.assert_that(name, equal_to(expected))
    }
}
