use anyhow::Result;
use beamlet::testing::*;
use beamlet::wordcount::*;
use beamlet::*;
use std::collections::HashMap;

fn count_words(p: &Pipeline, lines: Vec<String>) -> beamlet::Result<PCollection<(String, u64)>> {
    let tokenizer = Tokenizer::new(DEFAULT_TOKEN_PATTERN)?;
    from_vec(p, "lines", lines)?.apply("CountWords", &CountWords::new(tokenizer))
}

#[test]
fn counts_equal_tokenizer_matches() -> Result<()> {
    let lines = king_lear_lines();
    let tokenizer = Tokenizer::new(DEFAULT_TOKEN_PATTERN)?;
    let mut expected: HashMap<String, u64> = HashMap::new();
    for line in &lines {
        for word in tokenizer.tokens(line) {
            *expected.entry(word).or_insert(0) += 1;
        }
    }

    let p = Pipeline::new();
    let counts = count_words(&p, lines)?.collect_seq()?;
    let actual: HashMap<String, u64> = counts.into_iter().collect();
    assert_eq!(actual, expected);
    // Case-sensitive: "King" and "KING" are different words.
    assert_eq!(actual.get("KING"), Some(&1));
    assert_eq!(actual.get("King"), Some(&1));
    assert_eq!(actual.get("I'll"), Some(&1));
    Ok(())
}

#[test]
fn filter_example_from_one_line() -> Result<()> {
    let p = Pipeline::new();
    let filtered = count_words(&p, vec!["Flourish Flourish stomach Flourish leaf".to_string()])?
        .par_do("FilterText", FilterTextFn::new(DEFAULT_FILTER_PATTERN)?)?;
    filtered.assert_equals("assert", default_expectations())?;

    let result = p.run()?;
    assert_eq!(result.aggregator(MATCHED_WORDS), 2);
    assert_eq!(result.aggregator(UNMATCHED_WORDS), 1);
    assert_kv_collections_equal(filtered.collect_seq()?, default_expectations());
    Ok(())
}

#[test]
fn wrong_expectation_fails_the_run() -> Result<()> {
    let p = Pipeline::new();
    let filtered = count_words(&p, vec!["Flourish Flourish stomach Flourish leaf".to_string()])?
        .par_do("FilterText", FilterTextFn::new(DEFAULT_FILTER_PATTERN)?)?;
    filtered.assert_equals(
        "assert",
        vec![("Flourish".to_string(), 2), ("stomach".to_string(), 1)],
    )?;
    assert!(p.run().unwrap_err().is_assertion_failure());
    Ok(())
}

#[test]
fn format_count_renders_word_and_count() {
    assert_eq!(format_count(&("Flourish".to_string(), 3)), "Flourish: 3");
}

#[test]
fn full_program_on_excerpt() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let input = write_fixture(dir.path(), "kinglear.txt", KING_LEAR_EXCERPT)?;
    let output = dir.path().join("out/counts.txt");
    let opts = WordCountOptions::new(input.to_string_lossy(), &output);

    for runner in [Runner::sequential(), Runner::parallel(Some(2))] {
        let result = run(&opts, &runner)?;
        assert_eq!(result.aggregator(MATCHED_WORDS), 2);
        assert!(result.aggregator(UNMATCHED_WORDS) > 20);

        let mut lines = read_output_lines(&output)?;
        lines.sort();
        assert_eq!(lines, vec!["Flourish: 3", "stomach: 1"]);
    }
    Ok(())
}

#[test]
fn program_transform_names() -> Result<()> {
    let p = Pipeline::new();
    build_pipeline(&p, &WordCountOptions::new("in.txt", "out.txt"))?;
    assert_eq!(
        p.transform_names(),
        vec![
            "read",
            "CountWords/split",
            "CountWords/pair_with_one",
            "CountWords/group",
            "CountWords/count",
            "FilterText",
            "assert",
            "format",
            "write",
        ]
    );
    assert_eq!(p.aggregator_names(), vec![MATCHED_WORDS, UNMATCHED_WORDS]);
    Ok(())
}

#[test]
fn expectation_mismatch_on_real_input_is_reported() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let input = write_fixture(dir.path(), "short.txt", "Flourish once\n")?;
    let opts = WordCountOptions::new(input.to_string_lossy(), dir.path().join("out.txt"));
    let err = run(&opts, &Runner::sequential()).unwrap_err();
    assert!(err.is_assertion_failure());

    let lenient = WordCountOptions {
        expectations: None,
        ..opts
    };
    run(&lenient, &Runner::sequential())?;
    assert_eq!(read_output_lines(&lenient.output)?, vec!["Flourish: 1"]);
    Ok(())
}

#[test]
fn invalid_patterns_fail_at_build_time() {
    let p = Pipeline::new();
    let mut opts = WordCountOptions::new("in.txt", "out.txt");
    opts.filter_pattern = "(unclosed".to_string();
    let err = build_pipeline(&p, &opts).unwrap_err();
    assert!(matches!(
        err,
        PipelineError::Construction(ConstructionError::InvalidPattern { .. })
    ));
    assert!(p.is_empty());
}
