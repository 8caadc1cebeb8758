//! Persisting raw samples and rendering the summary line.
//!
//! Three plain-text logs, one value per line and index-aligned across
//! files: integer microsecond latencies, operation-start timestamps and
//! operation-end timestamps. Logs are only written after a fully successful
//! measurement, so a fatal mid-run error never leaves partial files behind.

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

use chrono::{DateTime, Offset, TimeZone};

use crate::stats::SummaryStats;

pub const LATENCY_LOG: &str = "log.txt";
pub const START_LOG: &str = "log_epoch_start.txt";
pub const END_LOG: &str = "log_epoch_end.txt";

/// Overwrite `path` with one integer microsecond latency per line.
pub fn write_latencies(path: &Path, latencies_us: &[u64]) -> io::Result<()> {
    let mut out = BufWriter::new(File::create(path)?);
    for micros in latencies_us {
        writeln!(out, "{micros}")?;
    }
    out.flush()
}

/// Overwrite `path` with one formatted timestamp per line.
pub fn write_timestamps<Tz>(path: &Path, timestamps: &[DateTime<Tz>]) -> io::Result<()>
where
    Tz: TimeZone,
    Tz::Offset: std::fmt::Display,
{
    let mut out = BufWriter::new(File::create(path)?);
    for ts in timestamps {
        writeln!(out, "{}", format_timestamp(ts))?;
    }
    out.flush()
}

/// ISO-8601-like local time with microsecond precision and a fixed-hour UTC
/// offset whose minute field is forced to `00`, e.g.
/// `2024-01-15T10:30:00.123456+02:00`.
pub fn format_timestamp<Tz>(ts: &DateTime<Tz>) -> String
where
    Tz: TimeZone,
    Tz::Offset: std::fmt::Display,
{
    let offset_hours = ts.offset().fix().local_minus_utc() / 3600;
    format!(
        "{}{:+03}:00",
        ts.format("%Y-%m-%dT%H:%M:%S%.6f"),
        offset_hours
    )
}

/// The single summary line printed to stdout, all values converted to
/// milliseconds at this presentation boundary.
pub fn summary_line(stats: &SummaryStats) -> String {
    format!(
        "Mean: {:.7} ms     95% CI: ±{:.7} ms     Q1: {:.7} ms     Median: {:.7} ms     Q3: {:.7} ms",
        stats.mean_us / 1e3,
        stats.ci95_us / 1e3,
        stats.q1_us as f64 / 1e3,
        stats.median_us as f64 / 1e3,
        stats.q3_us as f64 / 1e3,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, FixedOffset};

    fn sample_instant(offset_hours: i32) -> DateTime<FixedOffset> {
        FixedOffset::east_opt(offset_hours * 3600)
            .unwrap()
            .with_ymd_and_hms(2024, 1, 15, 10, 30, 0)
            .unwrap()
            + Duration::microseconds(123_456)
    }

    #[test]
    fn timestamp_format_positive_offset() {
        let ts = sample_instant(2);
        assert_eq!(format_timestamp(&ts), "2024-01-15T10:30:00.123456+02:00");
    }

    #[test]
    fn timestamp_format_negative_offset() {
        let ts = sample_instant(-5);
        assert_eq!(format_timestamp(&ts), "2024-01-15T10:30:00.123456-05:00");
    }

    #[test]
    fn timestamp_format_utc() {
        let ts = sample_instant(0);
        assert_eq!(format_timestamp(&ts), "2024-01-15T10:30:00.123456+00:00");
    }

    #[test]
    fn summary_line_reports_milliseconds() {
        let stats = SummaryStats {
            mean_us: 1500.0,
            stdev_us: 100.0,
            ci95_us: 20.0,
            q1_us: 1000,
            median_us: 1500,
            q3_us: 2000,
        };
        let line = summary_line(&stats);
        assert_eq!(
            line,
            "Mean: 1.5000000 ms     95% CI: ±0.0200000 ms     Q1: 1.0000000 ms     \
             Median: 1.5000000 ms     Q3: 2.0000000 ms"
        );
    }
}
