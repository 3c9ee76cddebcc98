//! # Beamlet
//!
//! A small, in-process **batch pipeline engine** in the style of Apache Beam,
//! plus the "word count with debugging" program built on it.
//!
//! ## Key Features
//!
//! - **Deferred execution** - building a pipeline only records a graph; a [`Runner`] executes it
//! - **Element-wise transforms** - map, flat_map, filter, and fallible variants
//! - **Keyed transforms** - key_by, map_values, group_by_key, combine_grouped, combine_per_key
//! - **ParDo with aggregators** - [`DoFn`]s that emit outputs and bump named counters
//! - **Multi-input flatten** - concatenate several streams of one type
//! - **Assertion sinks** - check a stream's contents as part of the run
//! - **Text I/O** - globbed, optionally gzip-compressed line files
//! - **Sequential and parallel execution** - identical results, rayon for the latter
//!
//! ## Quick Start
//!
//! ```
//! use beamlet::*;
//!
//! # fn main() -> anyhow::Result<()> {
//! let p = Pipeline::new();
//! let lines = from_vec(&p, "lines", vec![
//!     "hello world".to_string(),
//!     "hello rust".to_string(),
//! ])?;
//!
//! let counts = lines
//!     .flat_map("split", |line: &String| {
//!         line.split_whitespace().map(str::to_string).collect::<Vec<_>>()
//!     })?
//!     .map("pair", |w: &String| (w.clone(), 1u64))?
//!     .combine_per_key("count", Sum::<u64>::new())?;
//!
//! counts.assert_equals("check", vec![
//!     ("hello".to_string(), 2),
//!     ("world".to_string(), 1),
//!     ("rust".to_string(), 1),
//! ])?;
//! p.run()?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Core Concepts
//!
//! ### Pipeline
//!
//! A [`Pipeline`] owns the computation graph. Every transform has a unique,
//! fully qualified name; composite transforms ([`PTransform`]) prefix the
//! names of the nodes they create with their label.
//!
//! ### PCollection
//!
//! A [`PCollection<T>`] is a typed handle to a stream that does not exist
//! until the pipeline runs. Handles are cheap to clone and can feed any number
//! of downstream transforms.
//!
//! ### Execution
//!
//! - [`Pipeline::run`] / [`Runner::run`] execute the whole graph, sinks included
//! - [`collect_seq`](PCollection::collect_seq) / [`collect_par`](PCollection::collect_par)
//!   execute only the ancestors of one stream and return its contents
//!
//! The first error aborts the run; nothing is retried.
//!
//! ## Module Overview
//!
//! - [`pipeline`] / [`collection`] - graph construction and element-wise transforms
//! - [`dofn`] / [`aggregators`] - ParDo and named counters
//! - [`combiners`] - the [`CombineFn`] trait and built-in combiners
//! - [`assertions`] - assertion sinks and matchers
//! - [`io`] - text sources and sinks
//! - [`planner`] / [`runner`] - planning and execution
//! - [`wordcount`] / [`cli`] - the word count debugging program
//! - [`testing`] - helpers for tests of pipelines

pub mod aggregators;
pub mod assertions;
pub mod cli;
pub mod collection;
pub mod combiners;
pub mod dofn;
pub mod error;
pub mod helpers;
pub mod io;
pub mod node;
pub mod node_id;
pub mod pipeline;
pub mod planner;
pub mod runner;
pub mod testing;
pub mod type_token;
pub mod wordcount;

// General re-exports
pub use aggregators::Aggregator;
pub use assertions::{equal_to, is_empty};
pub use collection::{PCollection, PTransform, RFBound};
pub use combiners::{CombineFn, Count, Max, Min, Sum};
pub use dofn::{DoFn, ProcessContext};
pub use error::{ConstructionError, Mismatch, PipelineError, Result};
pub use helpers::*;
pub use io::{Compression, TextSink, TextSource, read_text, read_text_with};
pub use node_id::NodeId;
pub use pipeline::Pipeline;
pub use planner::Plan;
pub use runner::{ExecMode, RunResult, Runner};
pub use type_token::Partition;
