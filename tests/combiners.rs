use anyhow::Result;
use beamlet::testing::*;
use beamlet::*;

fn sales(p: &Pipeline) -> beamlet::Result<PCollection<(String, u64)>> {
    from_vec(
        p,
        "sales",
        vec![
            ("a".to_string(), 100),
            ("b".to_string(), 200),
            ("a".to_string(), 150),
            ("c".to_string(), 5),
            ("a".to_string(), 1),
        ],
    )
}

#[test]
fn builtin_combiners_per_key() -> Result<()> {
    let p = Pipeline::new();
    let s = sales(&p)?;

    assert_kv_collections_equal(
        s.combine_per_key("sum", Sum::<u64>::new())?.collect_seq()?,
        vec![("a".into(), 251), ("b".into(), 200), ("c".into(), 5)],
    );
    assert_kv_collections_equal(
        s.combine_per_key("count", Count)?.collect_seq()?,
        vec![("a".into(), 3), ("b".into(), 1), ("c".into(), 1)],
    );
    assert_kv_collections_equal(
        s.combine_per_key("min", Min::<u64>::new())?.collect_seq()?,
        vec![("a".into(), Some(1)), ("b".into(), Some(200)), ("c".into(), Some(5))],
    );
    assert_kv_collections_equal(
        s.combine_per_key("max", Max::<u64>::new())?.collect_seq()?,
        vec![("a".into(), Some(150)), ("b".into(), Some(200)), ("c".into(), Some(5))],
    );
    Ok(())
}

/// Average as (sum, count); merge is associative and commutative.
struct Mean;

impl CombineFn<u64, (u64, u64), f64> for Mean {
    fn create(&self) -> (u64, u64) {
        (0, 0)
    }

    fn add_input(&self, acc: &mut (u64, u64), v: u64) {
        acc.0 += v;
        acc.1 += 1;
    }

    fn merge(&self, acc: &mut (u64, u64), other: (u64, u64)) {
        acc.0 += other.0;
        acc.1 += other.1;
    }

    fn finish(&self, acc: (u64, u64)) -> f64 {
        if acc.1 == 0 { 0.0 } else { acc.0 as f64 / acc.1 as f64 }
    }
}

#[test]
fn custom_combine_fn_on_grouped_values() -> Result<()> {
    let p = Pipeline::new();
    let means = sales(&p)?
        .group_by_key("group")?
        .combine_grouped("mean", Mean)?
        .collect_seq()?;
    let mut means: Vec<(String, u64)> = means.into_iter().map(|(k, m)| (k, m as u64)).collect();
    means.sort();
    assert_eq!(
        means,
        vec![("a".to_string(), 83), ("b".to_string(), 200), ("c".to_string(), 5)]
    );
    Ok(())
}

#[test]
fn partitioned_combine_matches_direct() -> Result<()> {
    // Large enough to be split into chunks in parallel mode.
    let data: Vec<(u32, u64)> = (0..50_000u64).map(|i| ((i % 3) as u32, i)).collect();
    let p = Pipeline::new();
    let sums = from_vec(&p, "data", data.clone())?.combine_per_key("sum", Sum::<u64>::new())?;

    let mut direct: Vec<(u32, u64)> = (0..3u32)
        .map(|k| (k, data.iter().filter(|(dk, _)| *dk == k).map(|(_, v)| v).sum()))
        .collect();
    direct.sort();

    for partitions in [1, 2, 7, 64] {
        let mut par = sums.collect_par(Some(4), Some(partitions))?;
        par.sort();
        assert_eq!(par, direct, "partitions = {partitions}");
    }
    let mut seq = sums.collect_seq()?;
    seq.sort();
    assert_eq!(seq, direct);
    Ok(())
}

#[test]
fn combine_per_key_names_its_parts() -> Result<()> {
    let p = Pipeline::new();
    sales(&p)?.combine_per_key("total", Sum::<u64>::new())?;
    assert_eq!(p.transform_names(), vec!["sales", "total/group", "total/combine"]);
    Ok(())
}
