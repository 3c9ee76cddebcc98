//! Testing utilities for Beamlet pipelines.
//!
//! - [`TestPipeline`]: a [`Pipeline`] wrapper with graph introspection
//! - Order-insensitive assertions for collected outputs
//! - Fixtures: a King Lear excerpt with known word counts
//!
//! ```
//! use beamlet::*;
//! use beamlet::testing::*;
//!
//! # fn main() -> anyhow::Result<()> {
//! let p = TestPipeline::new();
//! let out = from_vec(&p, "nums", vec![3, 1, 2])?
//!     .map("double", |x: &i32| x * 2)?
//!     .collect_par(Some(2), None)?;
//! assert_collections_unordered_equal(&out, &[2, 4, 6]);
//! assert_eq!(p.node_count(), 2);
//! # Ok(())
//! # }
//! ```

use crate::Pipeline;
use std::fmt::Debug;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// A test-focused wrapper around [`Pipeline`].
#[derive(Clone, Default)]
pub struct TestPipeline {
    pipeline: Pipeline,
}

impl TestPipeline {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of transforms in the graph.
    #[must_use]
    pub fn node_count(&self) -> usize {
        self.pipeline.len()
    }

    /// Print every transform with its kind and inputs.
    pub fn debug_print_graph(&self) {
        println!("Pipeline #{} graph:", self.pipeline.id());
        for node in self.pipeline.snapshot() {
            let inputs: Vec<u64> = node.inputs.iter().map(|i| i.raw()).collect();
            println!(
                "  {:>3} {:<10} {} <- {inputs:?}",
                node.id.raw(),
                node.kind.label(),
                node.name
            );
        }
    }
}

// Allow TestPipeline to be used wherever Pipeline is expected
impl std::ops::Deref for TestPipeline {
    type Target = Pipeline;

    fn deref(&self) -> &Self::Target {
        &self.pipeline
    }
}

impl AsRef<Pipeline> for TestPipeline {
    fn as_ref(&self) -> &Pipeline {
        &self.pipeline
    }
}

/// Assert that two collections hold the same elements with the same
/// multiplicities, in any order.
///
/// # Panics
///
/// Panics if the sorted collections differ.
pub fn assert_collections_unordered_equal<T: Debug + Ord + Clone>(actual: &[T], expected: &[T]) {
    let mut a = actual.to_vec();
    let mut e = expected.to_vec();
    a.sort();
    e.sort();
    assert_eq!(
        a, e,
        "Collection content mismatch (order ignored):\n  Expected: {expected:?}\n  Actual: {actual:?}"
    );
}

/// Assert that two collections of key-value pairs are equal after sorting by key.
///
/// # Panics
///
/// Panics if the collections differ after sorting.
pub fn assert_kv_collections_equal<K, V>(mut actual: Vec<(K, V)>, mut expected: Vec<(K, V)>)
where
    K: Debug + Ord,
    V: Debug + PartialEq,
{
    actual.sort_by(|a, b| a.0.cmp(&b.0));
    expected.sort_by(|a, b| a.0.cmp(&b.0));
    assert_eq!(actual, expected, "Key-value collections differ after sorting by key");
}

/// A few lines of King Lear: `Flourish` appears three times and `stomach` once.
pub const KING_LEAR_EXCERPT: &str = "\
Flourish. Enter KING LEAR, CORNWALL, ALBANY, GONERIL, REGAN, CORDELIA, and Attendants
Sennet. Flourish. Exeunt all but EDMUND
I'll answer that with my stomach, madam
Flourish of trumpets. Enter the King and his train
Unhappy that I am, I cannot heave
My heart into my mouth";

/// [`KING_LEAR_EXCERPT`] split into lines.
#[must_use]
pub fn king_lear_lines() -> Vec<String> {
    KING_LEAR_EXCERPT.lines().map(str::to_string).collect()
}

/// Write `contents` to `dir/name` and return the path.
///
/// # Errors
/// Any I/O error creating the file.
pub fn write_fixture(dir: &Path, name: &str, contents: &str) -> io::Result<PathBuf> {
    let path = dir.join(name);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(&path, contents)?;
    Ok(path)
}

/// Read a text sink's output back as lines.
///
/// # Errors
/// Any I/O error reading the file.
pub fn read_output_lines(path: &Path) -> io::Result<Vec<String>> {
    Ok(fs::read_to_string(path)?
        .lines()
        .map(str::to_string)
        .collect())
}
