use std::fmt::Display;

use jane_eyre::eyre::{self, OptionExt};

use crate::layout::RunValue;

/// Statistics over the runs that have a value for one item.
#[derive(Debug, PartialEq)]
pub struct Summary<T> {
    pub n: usize,
    pub missing: usize,
    pub mean: T,
    pub stdev: T,
    pub min: T,
    pub max: T,
}

impl Summary<f64> {
    pub fn of(values: &[RunValue]) -> eyre::Result<Self> {
        let xs = values.iter().filter_map(RunValue::value).collect::<Vec<f64>>();
        let n = xs.len();
        let mean = xs.iter().sum::<f64>() / (n as f64);
        let stdev = if n > 1 {
            (xs.iter().map(|x| (x - mean).powf(2.0)).sum::<f64>() / ((n - 1) as f64)).sqrt()
        } else {
            0.0
        };
        let min = xs
            .iter()
            .cloned()
            .min_by(|p, q| p.total_cmp(q))
            .ok_or_eyre("No minimum")?;
        let max = xs
            .iter()
            .cloned()
            .max_by(|p, q| p.total_cmp(q))
            .ok_or_eyre("No maximum")?;

        Ok(Summary {
            n,
            missing: values.iter().filter(|v| v.is_missing()).count(),
            mean,
            stdev,
            min,
            max,
        })
    }
}

/// Durations are milliseconds as written by the runtime.
impl Display for Summary<f64> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let dp = |x: f64| {
            if x >= 1000.0 {
                0
            } else if x >= 100.0 {
                1
            } else if x >= 10.0 {
                2
            } else {
                3
            }
        };
        write!(
            f,
            "n={}, μ={:.*}ms, s={:.*}ms, min={:.*}ms, max={:.*}ms",
            self.n,
            dp(self.mean),
            self.mean,
            dp(self.stdev),
            self.stdev,
            dp(self.min),
            self.min,
            dp(self.max),
            self.max,
        )?;
        if self.missing > 0 {
            write!(f, ", missing={}", self.missing)?;
        }

        Ok(())
    }
}

#[test]
fn test_summary() -> eyre::Result<()> {
    let summary = Summary::of(&[
        RunValue::Present(2.0),
        RunValue::Missing,
        RunValue::Present(4.0),
        RunValue::Present(0.0),
    ])?;
    assert_eq!(summary.n, 3);
    assert_eq!(summary.missing, 1);
    assert_eq!(summary.mean, 2.0);
    assert_eq!(summary.stdev, 2.0);
    assert_eq!((summary.min, summary.max), (0.0, 4.0));
    assert_eq!(
        summary.to_string(),
        "n=3, μ=2.000ms, s=2.000ms, min=0.000ms, max=4.000ms, missing=1"
    );

    assert_eq!(Summary::of(&[RunValue::Present(12.5)])?.stdev, 0.0);
    assert!(Summary::of(&[RunValue::Missing]).is_err());
    Ok(())
}
