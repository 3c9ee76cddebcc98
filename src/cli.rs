//! Command-line surface of the `wordcount` binary.

use crate::runner::{ExecMode, Runner};
use crate::wordcount::{
    self, DEFAULT_FILTER_PATTERN, DEFAULT_INPUT, DEFAULT_TOKEN_PATTERN, WordCountOptions,
};
use anyhow::{Context, Result, anyhow};
use clap::{ArgAction, Parser};
use std::path::PathBuf;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

/// Count words, keep those matching a pattern, check and write the counts.
#[derive(Parser, Debug)]
#[command(name = "wordcount", version, about)]
pub struct Cli {
    /// Input file or glob pattern to process
    #[arg(long, default_value = DEFAULT_INPUT)]
    pub input: String,

    /// Output file to write results to
    #[arg(long)]
    pub output: PathBuf,

    /// Regex whose matches are the words of a line
    #[arg(long, default_value = DEFAULT_TOKEN_PATTERN)]
    pub token_pattern: String,

    /// Regex a word must match (at its start) to be kept
    #[arg(long, default_value = DEFAULT_FILTER_PATTERN)]
    pub filter_pattern: String,

    /// Expected filtered count; repeat for several words [default: Flourish=3 stomach=1]
    #[arg(long = "expect", value_name = "WORD=COUNT", value_parser = parse_expectation)]
    pub expect: Vec<(String, u64)>,

    /// Skip the assertion on the filtered counts
    #[arg(long, conflicts_with = "expect")]
    pub no_assert: bool,

    /// Run on the worker pool instead of a single thread
    #[arg(long)]
    pub parallel: bool,

    /// Worker threads (implies --parallel)
    #[arg(long, value_name = "N")]
    pub threads: Option<usize>,

    /// Print the execution plan before running
    #[arg(long)]
    pub explain: bool,

    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = ArgAction::Count)]
    pub verbose: u8,
}

fn parse_expectation(s: &str) -> Result<(String, u64)> {
    let (word, count) = s
        .split_once('=')
        .ok_or_else(|| anyhow!("expected WORD=COUNT, got '{s}'"))?;
    let count = count
        .parse()
        .with_context(|| format!("invalid count in '{s}'"))?;
    Ok((word.to_string(), count))
}

impl Cli {
    pub fn options(&self) -> WordCountOptions {
        let expectations = if self.no_assert {
            None
        } else if self.expect.is_empty() {
            Some(wordcount::default_expectations())
        } else {
            Some(self.expect.clone())
        };
        WordCountOptions {
            input: self.input.clone(),
            output: self.output.clone(),
            token_pattern: self.token_pattern.clone(),
            filter_pattern: self.filter_pattern.clone(),
            expectations,
        }
    }

    pub fn runner(&self) -> Runner {
        if self.parallel || self.threads.is_some() {
            Runner {
                mode: ExecMode::Parallel {
                    threads: self.threads,
                    partitions: None,
                },
                ..Runner::default()
            }
        } else {
            Runner::sequential()
        }
    }
}

/// Install the global `tracing` subscriber. `RUST_LOG` overrides `verbose`.
pub fn init_logging(verbose: u8) -> Result<()> {
    let level = match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(verbose >= 2)
        .with_thread_ids(verbose >= 2)
        .try_init()
        .map_err(|e| anyhow!("failed to install log subscriber: {e}"))?;
    debug!("wordcount started with verbosity level: {verbose}");
    Ok(())
}

/// Build and run the program described by `cli`.
pub fn run(cli: &Cli) -> Result<()> {
    let opts = cli.options();
    let p = crate::Pipeline::new();
    wordcount::build_pipeline(&p, &opts).context("failed to build pipeline")?;
    if cli.explain {
        println!("{}", p.explain()?);
    }
    let result = cli.runner().run(&p).context("pipeline failed")?;
    info!(
        output = %opts.output.display(),
        matched = result.aggregator(wordcount::MATCHED_WORDS),
        unmatched = result.aggregator(wordcount::UNMATCHED_WORDS),
        "wordcount finished"
    );
    Ok(())
}
