//! Word count with debugging aids.
//!
//! Reads text, counts every word, keeps only words matching a filter pattern
//! while counting matches and non-matches in two aggregators, checks the
//! filtered counts against expectations, and writes them as `word: count`
//! lines.
//!
//! Transform names:
//!
//! ```text
//! read -> CountWords/split -> CountWords/pair_with_one -> CountWords/group
//!      -> CountWords/count -> FilterText -> assert
//!                                        \-> format -> write
//! ```

use crate::aggregators::Aggregator;
use crate::collection::{PCollection, PTransform};
use crate::combiners::Sum;
use crate::dofn::{DoFn, ProcessContext};
use crate::error::{ConstructionError, Result};
use crate::io::read_text;
use crate::pipeline::Pipeline;
use crate::runner::{RunResult, Runner};
use regex::Regex;
use std::path::PathBuf;
use tracing::{debug, info};

pub const DEFAULT_INPUT: &str = "gs://dataflow-samples/shakespeare/kinglear.txt";
/// ASCII letters and apostrophes.
pub const DEFAULT_TOKEN_PATTERN: &str = r"[A-Za-z']+";
/// Letters of any script and apostrophes.
pub const UNICODE_TOKEN_PATTERN: &str = r"[\p{L}']+";
pub const DEFAULT_FILTER_PATTERN: &str = "Flourish|stomach";

pub const MATCHED_WORDS: &str = "matched_words";
pub const UNMATCHED_WORDS: &str = "unmatched_words";

/// Filtered counts expected for King Lear with the default filter.
pub fn default_expectations() -> Vec<(String, u64)> {
    vec![("Flourish".to_string(), 3), ("stomach".to_string(), 1)]
}

fn compile(pattern: &str, source_pattern: &str) -> Result<Regex> {
    Regex::new(pattern).map_err(|source| {
        ConstructionError::InvalidPattern {
            pattern: source_pattern.to_string(),
            source,
        }
        .into()
    })
}

/// Splits lines into words: every maximal match of its pattern is one word.
#[derive(Clone, Debug)]
pub struct Tokenizer {
    regex: Regex,
}

impl Tokenizer {
    /// # Errors
    /// `InvalidPattern` if `pattern` does not compile.
    pub fn new(pattern: &str) -> Result<Self> {
        Ok(Self {
            regex: compile(pattern, pattern)?,
        })
    }

    /// Tokenizer accepting letters of any script.
    ///
    /// # Errors
    /// `InvalidPattern` if the regex engine was built without Unicode classes.
    pub fn unicode() -> Result<Self> {
        Self::new(UNICODE_TOKEN_PATTERN)
    }

    pub fn tokens(&self, line: &str) -> Vec<String> {
        self.regex
            .find_iter(line)
            .map(|m| m.as_str().to_string())
            .collect()
    }
}

/// Composite: lines of text to `(word, count)` pairs.
#[derive(Clone, Debug)]
pub struct CountWords {
    tokenizer: Tokenizer,
}

impl CountWords {
    pub fn new(tokenizer: Tokenizer) -> Self {
        Self { tokenizer }
    }
}

impl PTransform<String, (String, u64)> for CountWords {
    fn expand(&self, input: &PCollection<String>) -> Result<PCollection<(String, u64)>> {
        let tokenizer = self.tokenizer.clone();
        input
            .flat_map("split", move |line: &String| tokenizer.tokens(line))?
            .map("pair_with_one", |word: &String| (word.clone(), 1u64))?
            .group_by_key("group")?
            .combine_grouped("count", Sum::<u64>::new())
    }
}

/// Keeps `(word, count)` pairs whose word matches a pattern at its start.
pub struct FilterTextFn {
    pattern: Regex,
    matched: Aggregator,
    unmatched: Aggregator,
}

impl FilterTextFn {
    /// # Errors
    /// `InvalidPattern` if `pattern` does not compile.
    pub fn new(pattern: &str) -> Result<Self> {
        Ok(Self {
            pattern: compile(&format!("^(?:{pattern})"), pattern)?,
            matched: Aggregator::new(MATCHED_WORDS),
            unmatched: Aggregator::new(UNMATCHED_WORDS),
        })
    }

    pub fn matches(&self, word: &str) -> bool {
        self.pattern.is_match(word)
    }
}

impl DoFn<(String, u64), (String, u64)> for FilterTextFn {
    fn process(
        &self,
        element: &(String, u64),
        ctx: &mut ProcessContext<'_, (String, u64)>,
    ) -> anyhow::Result<()> {
        let (word, _) = element;
        if self.matches(word) {
            info!("Matched {word}");
            ctx.aggregate_to(&self.matched, 1);
            ctx.emit(element.clone());
        } else {
            debug!("Did not match {word}");
            ctx.aggregate_to(&self.unmatched, 1);
        }
        Ok(())
    }

    fn aggregators(&self) -> Vec<Aggregator> {
        vec![self.matched.clone(), self.unmatched.clone()]
    }
}

/// `("Flourish", 3)` becomes `"Flourish: 3"`.
pub fn format_count((word, count): &(String, u64)) -> String {
    format!("{word}: {count}")
}

/// Everything the word count program can be told.
#[derive(Clone, Debug)]
pub struct WordCountOptions {
    pub input: String,
    pub output: PathBuf,
    pub token_pattern: String,
    pub filter_pattern: String,
    /// Expected filtered counts; `None` skips the assertion.
    pub expectations: Option<Vec<(String, u64)>>,
}

impl WordCountOptions {
    pub fn new(input: impl Into<String>, output: impl Into<PathBuf>) -> Self {
        Self {
            input: input.into(),
            output: output.into(),
            token_pattern: DEFAULT_TOKEN_PATTERN.to_string(),
            filter_pattern: DEFAULT_FILTER_PATTERN.to_string(),
            expectations: Some(default_expectations()),
        }
    }
}

/// Append the word count program to `p` and return the filtered counts.
///
/// # Errors
/// `InvalidPattern` for a bad tokenizer or filter pattern, or `DuplicateName`
/// if `p` already holds transforms with the same names.
pub fn build_pipeline(p: &Pipeline, opts: &WordCountOptions) -> Result<PCollection<(String, u64)>> {
    let count_words = CountWords::new(Tokenizer::new(&opts.token_pattern)?);
    let filter = FilterTextFn::new(&opts.filter_pattern)?;

    let filtered = read_text(p, "read", opts.input.clone())?
        .apply("CountWords", &count_words)?
        .par_do("FilterText", filter)?;

    if let Some(expected) = &opts.expectations {
        filtered.assert_equals("assert", expected.clone())?;
    }
    filtered
        .map("format", format_count)?
        .write_text("write", opts.output.clone())?;
    Ok(filtered)
}

/// Build the program on a fresh pipeline and run it with `runner`.
///
/// # Errors
/// Any construction or run error.
pub fn run(opts: &WordCountOptions, runner: &Runner) -> Result<RunResult> {
    let p = Pipeline::new();
    build_pipeline(&p, opts)?;
    runner.run(&p)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filter_is_anchored_at_word_start() {
        let f = FilterTextFn::new(DEFAULT_FILTER_PATTERN).unwrap();
        assert!(f.matches("Flourish"));
        assert!(f.matches("stomachs"));
        assert!(!f.matches("unstomach"));
        assert!(!f.matches("flourish"));
    }

    #[test]
    fn tokenizer_keeps_apostrophes() {
        let t = Tokenizer::new(DEFAULT_TOKEN_PATTERN).unwrap();
        assert_eq!(t.tokens("I'll go--now, Lear!"), vec!["I'll", "go", "now", "Lear"]);
        let u = Tokenizer::unicode().unwrap();
        assert_eq!(u.tokens("café über"), vec!["café", "über"]);
    }

    #[test]
    fn bad_patterns_are_construction_errors() {
        let err = Tokenizer::new("[a-").unwrap_err();
        assert!(err.is_construction());
        assert!(FilterTextFn::new("(").is_err());
    }
}
