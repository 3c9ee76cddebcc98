//! Named counters incremented as a side effect of element processing.
//!
//! An [`Aggregator`] is only a name. DoFns declare the aggregators they use, the
//! pipeline records those names, and for each run the runner creates a fresh
//! [`AggregatorSet`] holding one atomic counter per declared name. DoFns reach
//! the counters through their [`ProcessContext`](crate::dofn::ProcessContext);
//! there is no global counter state.
//!
//! ```
//! use beamlet::*;
//!
//! # fn main() -> anyhow::Result<()> {
//! let p = Pipeline::new();
//! let evens = Aggregator::new("evens");
//! let odds = Aggregator::new("odds");
//! from_vec(&p, "numbers", vec![1u32, 2, 3, 4, 5])?
//!     .filter_counted("even", |n: &u32| n % 2 == 0, &evens, &odds)?;
//!
//! let result = p.run()?;
//! assert_eq!(result.aggregator("evens"), 2);
//! assert_eq!(result.aggregator("odds"), 3);
//! # Ok(())
//! # }
//! ```

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use tracing::warn;

/// Handle to a named counter.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Aggregator {
    name: Arc<str>,
}

impl Aggregator {
    pub fn new(name: impl AsRef<str>) -> Self {
        Self {
            name: Arc::from(name.as_ref()),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl fmt::Debug for Aggregator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Aggregator({})", self.name)
    }
}

/// Counters for one run.
///
/// Declared names are plain atomics and never lock. Names that were not declared
/// up front still count, through a mutex-guarded overflow map.
#[derive(Default)]
pub struct AggregatorSet {
    declared: HashMap<String, AtomicU64>,
    undeclared: Mutex<HashMap<String, u64>>,
}

impl AggregatorSet {
    /// Create zeroed counters for `names`.
    pub fn with_names<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            declared: names
                .into_iter()
                .map(|n| (n.into(), AtomicU64::new(0)))
                .collect(),
            undeclared: Mutex::new(HashMap::new()),
        }
    }

    /// Add `value` to the counter behind `aggregator`.
    pub fn add(&self, aggregator: &Aggregator, value: u64) {
        if let Some(counter) = self.declared.get(aggregator.name()) {
            counter.fetch_add(value, Ordering::Relaxed);
            return;
        }
        let mut extra = self
            .undeclared
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        let slot = extra.entry(aggregator.name().to_string()).or_insert_with(|| {
            warn!(aggregator = aggregator.name(), "aggregator used without being declared");
            0
        });
        *slot += value;
    }

    /// Current value of `name` (zero when never touched).
    pub fn get(&self, name: &str) -> u64 {
        if let Some(counter) = self.declared.get(name) {
            return counter.load(Ordering::Relaxed);
        }
        self.undeclared
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
            .copied()
            .unwrap_or(0)
    }

    /// All counters, sorted by name.
    pub fn snapshot(&self) -> BTreeMap<String, u64> {
        let mut out: BTreeMap<String, u64> = self
            .declared
            .iter()
            .map(|(name, counter)| (name.clone(), counter.load(Ordering::Relaxed)))
            .collect();
        let extra = self
            .undeclared
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        for (name, value) in extra.iter() {
            *out.entry(name.clone()).or_insert(0) += value;
        }
        out
    }
}
