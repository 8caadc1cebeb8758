//! Log persistence and summary formatting tests.

use std::fs;

use chrono::{Duration, Local};
use iolat::report::{self, format_timestamp};
use iolat::stats::summarize;
use tempfile::TempDir;

#[test]
fn latency_log_holds_one_integer_per_line() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("log.txt");
    let latencies = vec![120u64, 340, 0, 99_999];

    report::write_latencies(&path, &latencies).unwrap();

    let content = fs::read_to_string(&path).unwrap();
    let parsed: Vec<u64> = content
        .lines()
        .map(|line| line.parse().expect("latency lines are integers"))
        .collect();
    assert_eq!(parsed, latencies);
}

#[test]
fn latency_log_is_overwritten_not_appended() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("log.txt");

    report::write_latencies(&path, &[1, 2, 3]).unwrap();
    report::write_latencies(&path, &[7]).unwrap();

    let content = fs::read_to_string(&path).unwrap();
    assert_eq!(content, "7\n");
}

#[test]
fn timestamp_logs_are_index_aligned_with_the_latency_log() {
    let dir = TempDir::new().unwrap();
    let base = Local::now();
    let starts: Vec<_> = (0..5).map(|i| base + Duration::milliseconds(i)).collect();
    let ends: Vec<_> = starts
        .iter()
        .map(|s| *s + Duration::microseconds(400))
        .collect();
    let latencies = vec![400u64; 5];

    let lat_path = dir.path().join("log.txt");
    let start_path = dir.path().join("log_epoch_start.txt");
    let end_path = dir.path().join("log_epoch_end.txt");
    report::write_latencies(&lat_path, &latencies).unwrap();
    report::write_timestamps(&start_path, &starts).unwrap();
    report::write_timestamps(&end_path, &ends).unwrap();

    let count = |p: &std::path::Path| fs::read_to_string(p).unwrap().lines().count();
    assert_eq!(count(&lat_path), 5);
    assert_eq!(count(&start_path), 5);
    assert_eq!(count(&end_path), 5);
}

#[test]
fn timestamp_lines_carry_microseconds_and_a_fixed_offset() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("stamps.txt");
    report::write_timestamps(&path, &[Local::now()]).unwrap();

    let content = fs::read_to_string(&path).unwrap();
    let line = content.lines().next().unwrap();

    // 2024-01-15T10:30:00.123456+02:00 is 32 characters.
    assert_eq!(line.len(), 32, "unexpected shape: {line}");
    assert_eq!(&line[10..11], "T");
    assert_eq!(&line[19..20], ".");
    assert!(line.ends_with(":00"));
    let sign = &line[26..27];
    assert!(sign == "+" || sign == "-", "missing offset sign: {line}");
    assert_eq!(line, format_timestamp(&chrono::DateTime::parse_from_rfc3339(line).unwrap()));
}

#[test]
fn summary_line_has_all_five_statistics() {
    let stats = summarize(&[100, 200, 300, 400, 500], 0);
    let line = report::summary_line(&stats);
    for label in ["Mean:", "95% CI:", "Q1:", "Median:", "Q3:"] {
        assert!(line.contains(label), "missing {label} in {line:?}");
    }
    assert!(line.ends_with(" ms"));
}

#[test]
fn summary_stats_serialize_to_json() {
    let stats = summarize(&[100, 200, 300], 0);
    let json = serde_json::to_string(&stats).unwrap();
    for key in ["mean_us", "stdev_us", "ci95_us", "q1_us", "median_us", "q3_us"] {
        assert!(json.contains(key), "missing {key} in {json}");
    }
}
