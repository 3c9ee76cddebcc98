use anyhow::Result;
use beamlet::*;

fn counts(p: &Pipeline) -> beamlet::Result<PCollection<(String, u64)>> {
    from_vec(
        p,
        "counts",
        vec![("stomach".to_string(), 1), ("Flourish".to_string(), 3)],
    )
}

#[test]
fn equal_multisets_pass_in_any_order() -> Result<()> {
    let p = Pipeline::new();
    counts(&p)?.assert_equals(
        "check",
        vec![("Flourish".to_string(), 3), ("stomach".to_string(), 1)],
    )?;
    p.run()?;
    Ok(())
}

#[test]
fn wrong_count_fails_with_details() -> Result<()> {
    let p = Pipeline::new();
    counts(&p)?.assert_equals(
        "check",
        vec![("Flourish".to_string(), 2), ("stomach".to_string(), 1)],
    )?;

    match p.run() {
        Err(PipelineError::AssertionFailed { transform, mismatch }) => {
            assert_eq!(transform, "check");
            assert_eq!(mismatch.missing, vec![r#"("Flourish", 2)"#]);
            assert_eq!(mismatch.unexpected, vec![r#"("Flourish", 3)"#]);
            assert_eq!(mismatch.actual.len(), 2);
            assert!(mismatch.to_string().contains("missing"));
        }
        other => panic!("expected AssertionFailed, got {other:?}"),
    }
    Ok(())
}

#[test]
fn duplicates_matter() -> Result<()> {
    let p = Pipeline::new();
    from_vec(&p, "nums", vec![1u32, 1, 2])?.assert_equals("check", vec![1, 2])?;
    let err = p.run().unwrap_err();
    match err {
        PipelineError::AssertionFailed { mismatch, .. } => {
            assert!(mismatch.missing.is_empty());
            assert_eq!(mismatch.unexpected, vec!["1"]);
        }
        other => panic!("expected AssertionFailed, got {other:?}"),
    }
    Ok(())
}

#[test]
fn custom_and_empty_matchers() -> Result<()> {
    let p = Pipeline::new();
    let nums = from_vec(&p, "nums", vec![2u32, 4, 6])?;
    nums.assert_that("all_even", |xs: &[u32]| {
        if xs.iter().all(|x| x % 2 == 0) {
            Ok(())
        } else {
            Err(Mismatch::because(
                xs.iter().map(u32::to_string).collect(),
                "odd element present",
            ))
        }
    })?;
    nums.filter("odd", |x: &u32| x % 2 == 1)?
        .assert_that("no_odds", is_empty())?;
    p.run()?;

    let q = Pipeline::new();
    from_vec(&q, "nums", vec![1u32])?.assert_that("empty", is_empty())?;
    assert!(q.run().unwrap_err().is_assertion_failure());
    Ok(())
}

#[test]
fn assertion_on_empty_stream_with_expectations_fails() -> Result<()> {
    let p = Pipeline::new();
    from_vec(&p, "nums", Vec::<u32>::new())?.assert_that("check", equal_to(vec![1u32]))?;
    match p.run().unwrap_err() {
        PipelineError::AssertionFailed { mismatch, .. } => {
            assert_eq!(mismatch.missing, vec!["1"]);
            assert!(mismatch.actual.is_empty());
        }
        other => panic!("expected AssertionFailed, got {other:?}"),
    }
    Ok(())
}
