use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use serde::Serialize;

use crate::error::CliResult;
use crate::metrics::{format_time, StitchingMetrics};

pub const CSV_HEADER: [&str; 20] = [
    "Dataset",
    "Size Category",
    "Algorithm",
    "Reference Resolution",
    "Registered Resolution",
    "Keypoints (Reference)",
    "Keypoints (Registered)",
    "Matches",
    "Inliers",
    "Window Size (L)",
    "Detection Time Ref (s)",
    "Detection Time Reg (s)",
    "Descriptor Time Ref (s)",
    "Descriptor Time Reg (s)",
    "Matching Time (s)",
    "Homography Time (s)",
    "Warping Time (s)",
    "Total Stitching Time (s)",
    "Success",
    "Failure Reason",
];

const TABLE_WIDTH: usize = 120;

/// Doubles embedded quotes; the caller adds the surrounding quotes.
pub fn escape_csv(field: &str) -> String {
    field.replace('"', "\"\"")
}

/// One CSV line, every field quoted.
pub fn csv_row(m: &StitchingMetrics) -> String {
    let fields = [
        m.dataset_name.clone(),
        m.size_category_label(),
        m.algorithm_name.clone(),
        m.reference_resolution(),
        m.registered_resolution(),
        m.num_keypoints_reference.to_string(),
        m.num_keypoints_registered.to_string(),
        m.num_matches.to_string(),
        m.num_inliers.to_string(),
        m.window_sizes.clone(),
        format_time(m.detection_time_reference),
        format_time(m.detection_time_registered),
        format_time(m.descriptor_time_reference),
        format_time(m.descriptor_time_registered),
        format_time(m.matching_time),
        format_time(m.homography_time),
        format_time(m.warping_time),
        format_time(m.total_stitching_time),
        if m.stitching_success { "Yes" } else { "No" }.to_string(),
        m.failure_label(),
    ];

    fields
        .iter()
        .map(|f| format!("\"{}\"", escape_csv(f)))
        .collect::<Vec<_>>()
        .join(",")
}

/// Writes the header and one row per run, truncating `path`.
pub fn write_csv(path: impl AsRef<Path>, results: &[StitchingMetrics]) -> CliResult<()> {
    let mut out = BufWriter::new(File::create(path.as_ref())?);
    writeln!(out, "{}", CSV_HEADER.join(","))?;
    for m in results {
        writeln!(out, "{}", csv_row(m))?;
    }
    out.flush()?;
    log::info!("Wrote {} rows to {}", results.len(), path.as_ref().display());
    Ok(())
}

pub fn write_json(path: impl AsRef<Path>, results: &[StitchingMetrics]) -> CliResult<()> {
    let out = BufWriter::new(File::create(path.as_ref())?);
    serde_json::to_writer_pretty(out, results)?;
    log::info!("Wrote JSON results to {}", path.as_ref().display());
    Ok(())
}

fn truncated(s: &str, max_chars: usize) -> String {
    s.chars().take(max_chars).collect()
}

/// Rows of the console summary table, without the framing lines.
pub fn summary_table_rows(results: &[StitchingMetrics]) -> Vec<String> {
    let mut rows = Vec::with_capacity(results.len() + 1);
    rows.push(format!(
        "{:<15}{:<10}{:<12}{:<14}{:<12}{:<12}{:<10}{:<10}{:<12}{:<12}",
        "Dataset",
        "Size",
        "Algorithm",
        "Resolution",
        "Keypts Ref",
        "Keypts Reg",
        "Matches",
        "Inliers",
        "Window(L)",
        "Time(s)"
    ));

    for m in results {
        let count = |n: usize| {
            if m.stitching_success {
                n.to_string()
            } else {
                "x".to_string()
            }
        };
        let time = if m.stitching_success {
            format_time(m.total_stitching_time)
        } else {
            "Failed".to_string()
        };
        rows.push(format!(
            "{:<15}{:<10}{:<12}{:<14}{:<12}{:<12}{:<10}{:<10}{:<12}{:<12}",
            truncated(&m.dataset_name, 14),
            m.size_category_label(),
            m.algorithm_name,
            m.reference_resolution(),
            count(m.num_keypoints_reference),
            count(m.num_keypoints_registered),
            count(m.num_matches),
            count(m.num_inliers),
            m.window_sizes,
            time
        ));
    }
    rows
}

pub fn print_summary_table(results: &[StitchingMetrics]) {
    let rows = summary_table_rows(results);
    println!("\n{}", "=".repeat(TABLE_WIDTH));
    println!("BENCHMARK SUMMARY");
    println!("{}", "=".repeat(TABLE_WIDTH));
    if let Some((header, body)) = rows.split_first() {
        println!("{}", header);
        println!("{}", "-".repeat(TABLE_WIDTH));
        for row in body {
            println!("{}", row);
        }
    }
    println!("{}", "=".repeat(TABLE_WIDTH));
}

/// Aggregate over every run of one detector.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DetectorSummary {
    pub algorithm_name: String,
    pub runs: usize,
    pub successes: usize,
    /// Mean over successful runs only; `None` when there were none.
    pub mean_total_time: Option<f64>,
    pub mean_inliers: Option<f64>,
    pub mean_reprojection_error: Option<f64>,
}

impl DetectorSummary {
    pub fn success_rate(&self) -> f64 {
        if self.runs == 0 {
            0.0
        } else {
            self.successes as f64 / self.runs as f64
        }
    }
}

fn mean(values: impl Iterator<Item = f64>) -> Option<f64> {
    let (sum, n) = values.fold((0.0, 0usize), |(s, n), v| (s + v, n + 1));
    (n > 0).then(|| sum / n as f64)
}

/// Per-detector aggregates in order of first appearance.
pub fn summarize_by_detector(results: &[StitchingMetrics]) -> Vec<DetectorSummary> {
    let mut names: Vec<&str> = Vec::new();
    for m in results {
        if !names.contains(&m.algorithm_name.as_str()) {
            names.push(&m.algorithm_name);
        }
    }

    names
        .into_iter()
        .map(|name| {
            let runs: Vec<&StitchingMetrics> = results.iter().filter(|m| m.algorithm_name == name).collect();
            let ok: Vec<&StitchingMetrics> = runs.iter().copied().filter(|m| m.stitching_success).collect();
            DetectorSummary {
                algorithm_name: name.to_string(),
                runs: runs.len(),
                successes: ok.len(),
                mean_total_time: mean(ok.iter().map(|m| m.total_stitching_time)),
                mean_inliers: mean(ok.iter().map(|m| m.num_inliers as f64)),
                mean_reprojection_error: mean(ok.iter().filter_map(|m| m.reprojection_error)),
            }
        })
        .collect()
}

pub fn print_detector_summary(results: &[StitchingMetrics]) {
    let summaries = summarize_by_detector(results);
    if summaries.is_empty() {
        return;
    }

    let opt = |v: Option<f64>| v.map(format_time).unwrap_or_else(|| "-".to_string());

    println!("\n{:<12}{:<10}{:<12}{:<14}{:<14}{:<14}", "Algorithm", "Runs", "Success", "Mean Time(s)", "Mean Inliers", "Mean Err(px)");
    println!("{}", "-".repeat(76));
    for s in &summaries {
        println!(
            "{:<12}{:<10}{:<12}{:<14}{:<14}{:<14}",
            s.algorithm_name,
            s.runs,
            format!("{:.0}%", s.success_rate() * 100.0),
            opt(s.mean_total_time),
            opt(s.mean_inliers),
            opt(s.mean_reprojection_error)
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::FailureReason;
    use lp_core::SizeCategory;

    fn success(dataset: &str, alg: &str, time: f64, inliers: usize) -> StitchingMetrics {
        let mut m = StitchingMetrics::new(dataset, alg);
        m.size_category = Some(SizeCategory::Small);
        m.reference_width = 640;
        m.reference_height = 480;
        m.registered_width = 640;
        m.registered_height = 480;
        m.num_keypoints_reference = 1200;
        m.num_keypoints_registered = 1100;
        m.num_matches = 300;
        m.num_inliers = inliers;
        m.window_sizes = "16,32".into();
        m.total_stitching_time = time;
        m.stitching_success = true;
        m
    }

    #[test]
    fn test_escape_csv() {
        assert_eq!(escape_csv("plain"), "plain");
        assert_eq!(escape_csv("say \"hi\""), "say \"\"hi\"\"");
    }

    #[test]
    fn test_csv_row_quotes_every_field() {
        let mut m = success("boat", "LP-SIFT", 1.5, 120);
        m.detection_time_reference = 0.123;
        let row = csv_row(&m);
        assert!(row.starts_with("\"boat\",\"Small\",\"LP-SIFT\",\"640x480\",\"640x480\",\"1200\",\"1100\",\"300\",\"120\",\"16,32\",\"0.12\""));
        assert!(row.ends_with("\"1.50\",\"Yes\",\"\""));
    }

    #[test]
    fn test_csv_row_failure() {
        let mut m = StitchingMetrics::new("wall", "LP-ORB");
        m.fail(FailureReason::Exception("bad \"data\"".into()));
        let row = csv_row(&m);
        assert!(row.ends_with("\"No\",\"Exception: bad \"\"data\"\"\""));
    }

    #[test]
    fn test_write_csv() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.csv");
        write_csv(&path, &[success("a", "LP-SIFT", 1.0, 10), success("b", "LP-SIFT", 2.0, 20)]).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("Dataset,Size Category,Algorithm,"));
        assert!(lines[0].ends_with("Success,Failure Reason"));
        assert!(lines[1].starts_with("\"a\""));
    }

    #[test]
    fn test_write_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.json");
        write_json(&path, &[success("a", "LP-SIFT", 1.0, 10)]).unwrap();

        let value: serde_json::Value = serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(value[0]["dataset_name"], "a");
        assert_eq!(value[0]["num_inliers"], 10);
        assert_eq!(value[0]["stitching_success"], true);
        assert!(value[0].get("homography").is_some());
    }

    #[test]
    fn test_summary_table_marks_failures() {
        let mut failed = StitchingMetrics::new("a-very-long-dataset-name", "LP-ORB");
        failed.num_keypoints_reference = 7;
        failed.fail(FailureReason::EmptyDescriptors);
        let rows = summary_table_rows(&[success("boat", "LP-SIFT", 1.234, 50), failed]);

        assert_eq!(rows.len(), 3);
        assert!(rows[0].starts_with("Dataset        Size      Algorithm"));
        assert!(rows[1].starts_with("boat           Small     LP-SIFT     640x480       1200"));
        assert!(rows[1].trim_end().ends_with("1.23"));
        assert!(rows[2].starts_with("a-very-long-da "));
        assert!(rows[2].contains("x           x"));
        assert!(rows[2].trim_end().ends_with("Failed"));
    }

    #[test]
    fn test_summarize_by_detector_uses_successful_runs() {
        let mut failed = StitchingMetrics::new("c", "LP-SIFT");
        failed.total_stitching_time = 100.0;
        failed.fail(FailureReason::HomographyFailed);

        let results = vec![
            success("a", "LP-SIFT", 1.0, 10),
            success("a", "LP-ORB", 3.0, 5),
            success("b", "LP-SIFT", 2.0, 30),
            failed,
        ];
        let summaries = summarize_by_detector(&results);
        assert_eq!(summaries.len(), 2);

        let sift = &summaries[0];
        assert_eq!(sift.algorithm_name, "LP-SIFT");
        assert_eq!(sift.runs, 3);
        assert_eq!(sift.successes, 2);
        approx::assert_relative_eq!(sift.mean_total_time.unwrap(), 1.5);
        approx::assert_relative_eq!(sift.mean_inliers.unwrap(), 20.0);
        approx::assert_relative_eq!(sift.success_rate(), 2.0 / 3.0);
        assert_eq!(sift.mean_reprojection_error, None);

        assert_eq!(summaries[1].algorithm_name, "LP-ORB");
        assert_eq!(summaries[1].successes, 1);
    }

    #[test]
    fn test_summary_of_all_failures() {
        let mut failed = StitchingMetrics::new("a", "FAST-BRIEF");
        failed.fail(FailureReason::EmptyKeypoints);
        let summaries = summarize_by_detector(&[failed]);
        assert_eq!(summaries[0].success_rate(), 0.0);
        assert_eq!(summaries[0].mean_total_time, None);
    }
}
