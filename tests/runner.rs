use anyhow::Result;
use beamlet::testing::*;
use beamlet::*;
use std::fs;

fn sorted<T: Ord>(mut v: Vec<T>) -> Vec<T> {
    v.sort();
    v
}

fn word_pipeline(p: &Pipeline) -> beamlet::Result<PCollection<(String, u64)>> {
    from_vec(p, "lines", king_lear_lines())?
        .flat_map("split", |l: &String| {
            l.split(|c: char| !c.is_alphabetic())
                .filter(|w| !w.is_empty())
                .map(str::to_string)
                .collect::<Vec<_>>()
        })?
        .map("pair", |w: &String| (w.clone(), 1u64))?
        .combine_per_key("count", Sum::<u64>::new())
}

#[test]
fn sequential_and_parallel_agree() -> Result<()> {
    let p = Pipeline::new();
    let counts = word_pipeline(&p)?;

    let seq = sorted(counts.collect_seq()?);
    let par = sorted(counts.collect_par(Some(3), Some(5))?);
    let global = sorted(Runner::parallel(None).run_collect::<(String, u64)>(&p, &counts)?);
    assert_eq!(seq, par);
    assert_eq!(seq, global);
    assert!(seq.contains(&("Flourish".to_string(), 3)));
    Ok(())
}

#[test]
fn repeated_runs_are_identical() -> Result<()> {
    let p = Pipeline::new();
    let seen = Aggregator::new("seen");
    let none = Aggregator::new("none");
    let counts = word_pipeline(&p)?.filter_counted("all", |_| true, &seen, &none)?;

    let first = sorted(counts.collect_seq()?);
    let second = sorted(counts.collect_seq()?);
    assert_eq!(first, second);

    let r1 = p.run()?;
    let r2 = p.run()?;
    assert_eq!(r1.aggregators(), r2.aggregators());
    assert_eq!(r1.aggregator("seen"), first.len() as u64);
    assert_eq!(r1.steps_executed(), p.len());
    Ok(())
}

#[test]
fn collect_runs_only_ancestors() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let out = dir.path().join("never.txt");

    let p = Pipeline::new();
    let nums = from_vec(&p, "nums", vec![1u32, 2, 3])?;
    nums.map("fmt", |n: &u32| n.to_string())?.write_text("write", &out)?;
    nums.assert_equals("wrong", vec![9])?;

    assert_eq!(nums.collect_seq()?, vec![1, 2, 3]);
    assert!(!out.exists());
    Ok(())
}

#[test]
fn failure_stops_later_sinks_in_sequential_mode() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let before = dir.path().join("before.txt");
    let after = dir.path().join("after.txt");

    let p = Pipeline::new();
    let words = from_vec(&p, "words", vec!["a".to_string(), "b".to_string()])?;
    words.write_text("write_before", &before)?;
    let checked = words.try_map("check", |w: &String| {
        if w == "b" { Err("bad word") } else { Ok(w.clone()) }
    })?;
    checked.write_text("write_after", &after)?;

    let err = Runner::sequential().run(&p).unwrap_err();
    assert!(matches!(err, PipelineError::ElementProcessing { ref transform, .. } if transform == "check"));
    assert_eq!(fs::read_to_string(&before)?, "a\nb\n");
    assert!(!after.exists());
    Ok(())
}

#[test]
fn assertion_failure_aborts_run() -> Result<()> {
    let p = Pipeline::new();
    from_vec(&p, "nums", vec![1u32, 2])?.assert_equals("check", vec![1, 2, 3])?;
    let err = p.run().unwrap_err();
    assert!(err.is_assertion_failure());
    Ok(())
}

#[test]
fn collecting_another_pipelines_stream_is_rejected() -> Result<()> {
    let p = Pipeline::new();
    let other = Pipeline::new();
    from_vec(&p, "a", vec![1u32])?;
    from_vec(&p, "b", vec![42u32])?;
    from_vec(&other, "x", vec![7u32])?;
    // Same index as `b` in `p`.
    let y = from_vec(&other, "y", vec![8u32])?;

    let err = Runner::sequential().run_collect(&p, &y).unwrap_err();
    match err {
        PipelineError::Construction(ConstructionError::CrossGraphReference {
            transform,
            expected,
            found,
        }) => {
            assert_eq!(transform, "y");
            assert_eq!(expected, p.id());
            assert_eq!(found, other.id());
        }
        e => panic!("unexpected error: {e}"),
    }
    assert_eq!(Runner::sequential().run_collect(&other, &y)?, vec![8]);
    Ok(())
}
