use anyhow::Result;
use beamlet::testing::*;
use beamlet::*;

#[test]
fn map_filter_flat_map_chain() -> Result<()> {
    let p = TestPipeline::new();
    let lines = from_vec(
        &p,
        "lines",
        vec![
            "The quick brown fox".to_string(),
            "jumps over the lazy dog".to_string(),
        ],
    )?;

    let out = lines
        .flat_map("split", |s: &String| {
            s.split_whitespace().map(str::to_lowercase).collect::<Vec<_>>()
        })?
        .filter("long", |w: &String| w.len() >= 4)?
        .collect_seq()?;

    // Expansion order within one input is kept.
    assert_eq!(out, vec!["quick", "brown", "jumps", "over", "lazy"]);
    Ok(())
}

#[test]
fn flat_map_may_emit_nothing() -> Result<()> {
    let p = Pipeline::new();
    let out = from_vec(&p, "nums", vec![1u32, 2, 3])?
        .flat_map("none", |_: &u32| Vec::<u32>::new())?
        .collect_seq()?;
    assert!(out.is_empty());
    Ok(())
}

#[test]
fn failing_map_reports_transform_and_element() -> Result<()> {
    let p = Pipeline::new();
    let out = from_vec(&p, "nums", vec![1i32, 2, -3, 4])?.try_map("sqrt", |x: &i32| {
        if *x < 0 {
            Err(format!("negative input {x}"))
        } else {
            Ok(f64::from(*x).sqrt())
        }
    })?;

    for result in [out.collect_seq(), out.collect_par(Some(2), Some(2))] {
        match result {
            Err(PipelineError::ElementProcessing {
                transform,
                element,
                message,
            }) => {
                assert_eq!(transform, "sqrt");
                assert_eq!(element, "-3");
                assert_eq!(message, "negative input -3");
            }
            other => panic!("expected ElementProcessing, got {other:?}"),
        }
    }
    Ok(())
}

#[test]
fn panicking_map_fails_the_run_with_the_element() -> Result<()> {
    let p = Pipeline::new();
    let out = from_vec(&p, "nums", vec![1u32, 0])?.map("div", |x: &u32| 10 / x)?;

    for result in [out.collect_seq(), out.collect_par(Some(2), Some(2))] {
        match result {
            Err(PipelineError::ElementProcessing {
                transform,
                element,
                message,
            }) => {
                assert_eq!(transform, "div");
                assert_eq!(element, "0");
                assert!(message.starts_with("panicked:"), "{message}");
            }
            other => panic!("expected ElementProcessing, got {other:?}"),
        }
    }
    Ok(())
}

#[test]
fn group_by_key_collapses_equal_keys() -> Result<()> {
    let p = Pipeline::new();
    let words = from_vec(
        &p,
        "words",
        ["a", "b", "a", "c", "b", "a"].map(String::from).to_vec(),
    )?;
    let grouped = words
        .key_by("key", |w: &String| w.clone())?
        .map_values("len", |w: &String| w.len())?
        .group_by_key("group")?;

    let out = grouped.collect_seq()?;
    let sizes: Vec<(String, usize)> = out.into_iter().map(|(k, vs)| (k, vs.len())).collect();
    assert_kv_collections_equal(
        sizes,
        vec![("a".into(), 3), ("b".into(), 2), ("c".into(), 1)],
    );
    Ok(())
}

#[test]
fn group_by_key_is_independent_of_input_order() -> Result<()> {
    let pairs: Vec<(u32, u64)> = (0..500u64).map(|i| ((i % 7) as u32, i)).collect();
    let mut reversed = pairs.clone();
    reversed.reverse();

    let sums = |data: Vec<(u32, u64)>| -> Result<Vec<(u32, u64)>> {
        let p = Pipeline::new();
        let mut out = from_vec(&p, "pairs", data)?
            .group_by_key("group")?
            .map("sum", |(k, vs): &(u32, Vec<u64>)| (*k, vs.iter().sum::<u64>()))?
            .collect_par(None, Some(4))?;
        out.sort();
        Ok(out)
    };
    assert_eq!(sums(pairs)?, sums(reversed)?);
    Ok(())
}

struct Tagger {
    seen: Aggregator,
}

impl DoFn<String, (String, usize)> for Tagger {
    fn process(&self, word: &String, ctx: &mut ProcessContext<'_, (String, usize)>) -> anyhow::Result<()> {
        ctx.aggregate_to(&self.seen, 1);
        if word.is_empty() {
            anyhow::bail!("empty word");
        }
        ctx.emit((word.clone(), word.len()));
        ctx.emit((word.to_uppercase(), word.len()));
        Ok(())
    }

    fn aggregators(&self) -> Vec<Aggregator> {
        vec![self.seen.clone()]
    }
}

#[test]
fn par_do_emits_and_declares_aggregators() -> Result<()> {
    let p = Pipeline::new();
    let tagged = from_vec(&p, "words", vec!["ab".to_string(), "c".to_string()])?.par_do(
        "tag",
        Tagger {
            seen: Aggregator::new("seen"),
        },
    )?;
    assert_eq!(p.aggregator_names(), vec!["seen"]);
    assert_eq!(
        tagged.collect_seq()?,
        vec![
            ("ab".to_string(), 2),
            ("AB".to_string(), 2),
            ("c".to_string(), 1),
            ("C".to_string(), 1),
        ]
    );
    Ok(())
}

#[test]
fn par_do_error_aborts_with_element() -> Result<()> {
    let p = Pipeline::new();
    from_vec(&p, "words", vec!["ok".to_string(), String::new()])?.par_do(
        "tag",
        Tagger {
            seen: Aggregator::new("seen"),
        },
    )?;
    match p.run() {
        Err(PipelineError::ElementProcessing {
            transform,
            element,
            message,
        }) => {
            assert_eq!(transform, "tag");
            assert_eq!(element, "\"\"");
            assert_eq!(message, "empty word");
        }
        other => panic!("expected ElementProcessing, got {other:?}"),
    }
    Ok(())
}

#[test]
fn filter_counted_counts_both_sides() -> Result<()> {
    let p = Pipeline::new();
    let evens = Aggregator::new("evens");
    let odds = Aggregator::new("odds");
    from_iter(&p, "nums", 1..=9u32)?
        .filter_counted("even", |n: &u32| n % 2 == 0, &evens, &odds)?
        .assert_equals("check", vec![2, 4, 6, 8])?;

    let result = p.run()?;
    assert_eq!(result.aggregator("evens"), 4);
    assert_eq!(result.aggregator("odds"), 5);
    Ok(())
}
