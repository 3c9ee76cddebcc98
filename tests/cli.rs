use anyhow::Result;
use beamlet::ExecMode;
use beamlet::cli::{Cli, run};
use beamlet::testing::*;
use beamlet::wordcount::{DEFAULT_FILTER_PATTERN, DEFAULT_INPUT, default_expectations};
use clap::Parser;
use clap::error::ErrorKind;

#[test]
fn output_is_required() {
    let err = Cli::try_parse_from(["wordcount", "--input", "in.txt"]).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::MissingRequiredArgument);
}

#[test]
fn defaults_match_the_debugging_program() -> Result<()> {
    let cli = Cli::try_parse_from(["wordcount", "--output", "out.txt"])?;
    assert_eq!(cli.input, DEFAULT_INPUT);
    assert_eq!(cli.filter_pattern, DEFAULT_FILTER_PATTERN);
    assert_eq!(cli.options().expectations, Some(default_expectations()));
    assert_eq!(cli.runner().mode, ExecMode::Sequential);
    Ok(())
}

#[test]
fn expectations_and_modes_are_configurable() -> Result<()> {
    let cli = Cli::try_parse_from([
        "wordcount",
        "--output",
        "out.txt",
        "--expect",
        "Flourish=3",
        "--expect",
        "leaf=1",
        "--threads",
        "2",
        "-vv",
    ])?;
    assert_eq!(
        cli.options().expectations,
        Some(vec![("Flourish".to_string(), 3), ("leaf".to_string(), 1)])
    );
    assert_eq!(
        cli.runner().mode,
        ExecMode::Parallel {
            threads: Some(2),
            partitions: None
        }
    );
    assert_eq!(cli.verbose, 2);

    let cli = Cli::try_parse_from(["wordcount", "--output", "o", "--no-assert"])?;
    assert_eq!(cli.options().expectations, None);

    assert!(Cli::try_parse_from(["wordcount", "--output", "o", "--expect", "nope"]).is_err());
    Ok(())
}

#[test]
fn run_writes_counts() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let input = write_fixture(dir.path(), "kinglear.txt", KING_LEAR_EXCERPT)?;
    let output = dir.path().join("counts.txt");
    let cli = Cli::try_parse_from([
        "wordcount".to_string(),
        "--input".to_string(),
        input.to_string_lossy().into_owned(),
        "--output".to_string(),
        output.to_string_lossy().into_owned(),
        "--parallel".to_string(),
    ])?;
    run(&cli)?;

    let mut lines = read_output_lines(&output)?;
    lines.sort();
    assert_eq!(lines, vec!["Flourish: 3", "stomach: 1"]);
    Ok(())
}
