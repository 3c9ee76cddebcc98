//! Type tags and type-erased partition helpers.
//!
//! This module provides:
//! - [`Partition`]: the materialized contents of one stream during a run, a
//!   `Vec<T>` behind an `Arc<dyn Any>` so several consumers can share it.
//! - [`TypeTag`]: a lightweight runtime type identifier attached to every node so
//!   the planner and error messages can name element types without generics.
//! - [`VecOps`]: a type-erased view of `Vec<T>` used by the runner to report
//!   partition sizes. Concrete implementations come from [`vec_ops_for`].

use crate::error::{PipelineError, Result};
use std::any::{Any, TypeId, type_name};
use std::marker::PhantomData;
use std::sync::Arc;

/// A materialized stream carried between nodes at runtime.
///
/// Nodes downcast it to the expected `Vec<T>` when applying their work.
pub type Partition = Arc<dyn Any + Send + Sync>;

/// A lightweight runtime type tag for debugging and assertions.
///
/// ```
/// use beamlet::type_token::TypeTag;
/// let tag = TypeTag::of::<u32>();
/// assert_eq!(tag.name, "u32");
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct TypeTag {
    /// Stable Rust type identifier.
    pub id: TypeId,
    /// Human-readable type name (best-effort).
    pub name: &'static str,
}

impl TypeTag {
    /// Construct a tag for `T`.
    pub fn of<T: 'static>() -> Self {
        Self {
            id: TypeId::of::<T>(),
            name: type_name::<T>(),
        }
    }
}

/// Type-erased helpers for `Vec<T>`.
///
/// Implementations must return `None` when the provided `data` does not match
/// the concrete `Vec<T>` the implementor expects.
pub trait VecOps: Send + Sync {
    /// Return the number of elements if `data` is a `Vec<T>`, otherwise `None`.
    fn len(&self, data: &dyn Any) -> Option<usize>;
}

/// Concrete `VecOps` for a specific `T`.
pub struct VecOpsImpl<T: Send + Sync + 'static>(PhantomData<T>);

impl<T: Send + Sync + 'static> VecOps for VecOpsImpl<T> {
    fn len(&self, data: &dyn Any) -> Option<usize> {
        data.downcast_ref::<Vec<T>>().map(Vec::len)
    }
}

/// Create a type-erased `VecOps` for `Vec<T>`.
///
/// ```
/// use beamlet::type_token::{vec_ops_for, VecOps};
/// use std::any::Any;
///
/// let ops = vec_ops_for::<i64>();
/// let data: Box<dyn Any + Send + Sync> = Box::new(vec![1i64, 2, 3]);
/// assert_eq!(ops.len(data.as_ref()), Some(3));
/// ```
pub fn vec_ops_for<T: Send + Sync + 'static>() -> Arc<dyn VecOps> {
    Arc::new(VecOpsImpl::<T>(PhantomData))
}

/// Borrow a partition as `Vec<T>`, reporting a type mismatch against `transform`.
pub(crate) fn downcast_vec<'a, T: 'static>(
    partition: &'a Partition,
    transform: &str,
) -> Result<&'a Vec<T>> {
    partition
        .downcast_ref::<Vec<T>>()
        .ok_or_else(|| PipelineError::TypeMismatch {
            transform: transform.to_string(),
            expected: type_name::<Vec<T>>(),
        })
}

/// Take a partition back as an owned `Vec<T>`, cloning only when it is still shared.
pub(crate) fn into_vec<T: Clone + Send + Sync + 'static>(
    partition: Partition,
    transform: &str,
) -> Result<Vec<T>> {
    let typed = partition
        .downcast::<Vec<T>>()
        .map_err(|_| PipelineError::TypeMismatch {
            transform: transform.to_string(),
            expected: type_name::<Vec<T>>(),
        })?;
    Ok(Arc::try_unwrap(typed).unwrap_or_else(|shared| (*shared).clone()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wrong_element_type_is_a_type_mismatch() {
        let part: Partition = Arc::new(vec![1u32, 2]);
        assert!(matches!(
            downcast_vec::<String>(&part, "nums"),
            Err(PipelineError::TypeMismatch { .. })
        ));
        assert!(matches!(
            into_vec::<String>(part.clone(), "nums"),
            Err(PipelineError::TypeMismatch { .. })
        ));
        assert_eq!(into_vec::<u32>(part, "nums").unwrap(), vec![1, 2]);
    }
}
