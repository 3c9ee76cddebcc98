//! Error kinds raised while building or running a pipeline.
//!
//! Construction problems ([`ConstructionError`]) are reported by the builder
//! methods before anything runs. Everything else is reported by the runner and
//! aborts the whole run; nothing is retried.

use crate::node_id::NodeId;
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Result type used throughout the crate.
pub type Result<T, E = PipelineError> = std::result::Result<T, E>;

/// Errors detected while the pipeline graph is being built.
#[derive(Error, Debug)]
pub enum ConstructionError {
    /// A transform with the same fully qualified name already exists.
    #[error("duplicate transform name '{name}'")]
    DuplicateName { name: String },

    /// A stream handle from another pipeline was passed to a transform.
    #[error("transform '{transform}' references a stream of pipeline #{found}, expected pipeline #{expected}")]
    CrossGraphReference {
        transform: String,
        expected: u64,
        found: u64,
    },

    /// A multi-input transform was given no inputs.
    #[error("transform '{transform}' requires at least one input")]
    NoInputs { transform: String },

    /// A regular expression supplied to a transform does not compile.
    #[error("invalid pattern '{pattern}': {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },
}

/// Errors surfaced by building or running a pipeline.
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error(transparent)]
    Construction(#[from] ConstructionError),

    /// A user function failed on one element.
    #[error("transform '{transform}' failed on element {element}: {message}")]
    ElementProcessing {
        transform: String,
        element: String,
        message: String,
    },

    /// An assertion sink saw contents different from what it expected.
    #[error("assertion '{transform}' failed: {mismatch}")]
    AssertionFailed {
        transform: String,
        mismatch: Mismatch,
    },

    #[error("source '{}' not found or unreadable: {source}", .path.display())]
    SourceNotFound {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed writing sink '{}': {source}", .path.display())]
    SinkWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A transform received a partition of an unexpected element type.
    #[error("transform '{transform}' expected input of type {expected}")]
    TypeMismatch {
        transform: String,
        expected: &'static str,
    },

    #[error("node {0:?} is not part of the pipeline")]
    UnknownNode(NodeId),

    #[error("could not build worker pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
}

impl PipelineError {
    /// True for errors raised while building the graph.
    #[must_use]
    pub fn is_construction(&self) -> bool {
        matches!(self, Self::Construction(_))
    }

    /// True for a failed assertion sink.
    #[must_use]
    pub fn is_assertion_failure(&self) -> bool {
        matches!(self, Self::AssertionFailed { .. })
    }
}

/// Difference between the contents an assertion saw and what it expected.
///
/// Elements are kept as their `Debug` renderings so the report stays readable
/// without a type parameter.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Mismatch {
    pub actual: Vec<String>,
    pub expected: Vec<String>,
    /// Expected elements absent from the actual contents (with multiplicity).
    pub missing: Vec<String>,
    /// Actual elements that were not expected (with multiplicity).
    pub unexpected: Vec<String>,
    /// Free-form explanation from a custom matcher.
    pub reason: Option<String>,
}

impl Mismatch {
    /// A mismatch explained by a reason rather than an expected multiset.
    pub fn because(actual: Vec<String>, reason: impl Into<String>) -> Self {
        Self {
            actual,
            reason: Some(reason.into()),
            ..Self::default()
        }
    }
}

impl fmt::Display for Mismatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(reason) = &self.reason {
            return write!(f, "{reason}; got [{}]", self.actual.join(", "));
        }
        write!(
            f,
            "expected [{}], got [{}]",
            self.expected.join(", "),
            self.actual.join(", ")
        )?;
        if !self.missing.is_empty() {
            write!(f, "; missing [{}]", self.missing.join(", "))?;
        }
        if !self.unexpected.is_empty() {
            write!(f, "; unexpected [{}]", self.unexpected.join(", "))?;
        }
        Ok(())
    }
}
