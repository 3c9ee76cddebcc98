//! Combiners for [`combine_grouped`](crate::PCollection::combine_grouped) and
//! [`combine_per_key`](crate::PCollection::combine_per_key).
//!
//! A [`CombineFn`] reduces the values of one key through an accumulator:
//!
//! - [`Sum<T>`] -- sum of values.
//! - [`Count`] -- number of values.
//! - [`Min<T>`] / [`Max<T>`] -- smallest / largest value (`None` for an empty group).
//!
//! The runner may split a group into chunks, build one accumulator per chunk and
//! merge them in any order, so `add_input` and `merge` must be associative and
//! commutative.
//!
//! # Examples
//! ```
//! use beamlet::*;
//!
//! # fn main() -> anyhow::Result<()> {
//! let p = Pipeline::new();
//! let sales = from_vec(&p, "sales", vec![
//!     ("a".to_string(), 100u64),
//!     ("b".to_string(), 200),
//!     ("a".to_string(), 150),
//! ])?;
//! let mut totals = sales.combine_per_key("total", Sum::<u64>::new())?.collect_seq()?;
//! totals.sort();
//! assert_eq!(totals, vec![("a".to_string(), 250), ("b".to_string(), 200)]);
//! # Ok(())
//! # }
//! ```

mod basic;

pub use basic::{Count, Max, Min, Sum};

/// An associative, commutative reduction over the values of one key.
///
/// - `V`: input value type
/// - `A`: accumulator type
/// - `O`: output type
pub trait CombineFn<V, A, O>: Send + Sync + 'static {
    /// Fresh, empty accumulator.
    fn create(&self) -> A;
    /// Fold one value into `acc`.
    fn add_input(&self, acc: &mut A, v: V);
    /// Fold another partial accumulator into `acc`.
    fn merge(&self, acc: &mut A, other: A);
    /// Turn the final accumulator into the output.
    fn finish(&self, acc: A) -> O;
}
