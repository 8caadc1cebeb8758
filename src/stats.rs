//! Summary statistics over latency samples.

use serde::Serialize;

/// Reduced view of a latency sample array.
///
/// All values are in microseconds; conversion to milliseconds happens at
/// the presentation layer only. Derived from the skip-trimmed samples,
/// printed once, never persisted.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SummaryStats {
    pub mean_us: f64,
    pub stdev_us: f64,
    /// 95% confidence interval half-width.
    pub ci95_us: f64,
    pub q1_us: u64,
    pub median_us: u64,
    pub q3_us: u64,
}

impl SummaryStats {
    fn zero() -> Self {
        Self {
            mean_us: 0.0,
            stdev_us: 0.0,
            ci95_us: 0.0,
            q1_us: 0,
            median_us: 0,
            q3_us: 0,
        }
    }
}

/// Reduce `latencies[skip_samples..]` to summary statistics.
///
/// The caller applies skipping at run granularity by passing
/// `nb_skip * nb_bloc`. Mean and population standard deviation come from a
/// single sum / sum-of-squares pass, with the variance clamped at zero to
/// guard against floating-point cancellation. The confidence interval uses
/// the historical `2 * stdev / sqrt(n)` approximation of the 1.96 z-score.
/// Quartiles are positional: the trimmed samples are sorted ascending and
/// indexed at `n/4`, `n/2` and `3n/4` with floor division, no
/// interpolation.
pub fn summarize(latencies: &[u64], skip_samples: usize) -> SummaryStats {
    let trimmed = &latencies[skip_samples.min(latencies.len())..];
    let n = trimmed.len();
    if n == 0 {
        return SummaryStats::zero();
    }

    let mut sum = 0.0_f64;
    let mut sum_sq = 0.0_f64;
    for &sample in trimmed {
        let x = sample as f64;
        sum += x;
        sum_sq += x * x;
    }
    let count = n as f64;
    let mean = sum / count;
    let variance = (sum_sq / count - mean * mean).max(0.0);
    let stdev = variance.sqrt();
    let ci95 = 2.0 * stdev / count.sqrt();

    let mut sorted = trimmed.to_vec();
    sorted.sort_unstable();

    SummaryStats {
        mean_us: mean,
        stdev_us: stdev,
        ci95_us: ci95,
        q1_us: sorted[n / 4],
        median_us: sorted[n / 2],
        q3_us: sorted[3 * n / 4],
    }
}
