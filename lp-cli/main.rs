use std::path::{Path, PathBuf};

use argh::FromArgs;
use image::Rgba;
use imageproc::drawing::draw_hollow_circle_mut;

use lp_cli::{
    parse_set_filter, print_detector_summary, print_summary_table, write_csv, write_json, BenchmarkConfig,
    BenchmarkRunner, CliResult, ConfigError, DetectorFilter, DetectorKind, Feature2D, ImageSet, PeakConfig,
    PeakDetectorBuilder, StitchingMetrics, WindowPolicy,
};
use lp_core::{default_threads, init_thread_pool};
use lp_peak::parse_window_sizes;

/// Local-peak feature detection and stitching benchmark.
#[derive(FromArgs)]
struct Args {
    /// worker threads (defaults to the number of CPUs)
    #[argh(option)]
    threads: Option<usize>,

    #[argh(subcommand)]
    command: Command,
}

#[derive(FromArgs)]
#[argh(subcommand)]
enum Command {
    Bench(BenchArgs),
    Pair(PairArgs),
}

#[derive(FromArgs)]
#[argh(subcommand, name = "bench")]
/// Run every detector on every image set under a directory.
struct BenchArgs {
    /// directory holding one subdirectory per image set
    #[argh(positional)]
    image_dir: PathBuf,

    /// CSV report path
    #[argh(option, short = 'o')]
    output: Option<PathBuf>,

    /// also write the results as JSON
    #[argh(option)]
    json: Option<PathBuf>,

    /// directory for stitched images
    #[argh(option)]
    stitched_dir: Option<PathBuf>,

    /// only run this image set (repeatable)
    #[argh(option)]
    set: Vec<String>,

    /// only run this detector: FAST-BRIEF, LP-SIFT or LP-ORB (repeatable)
    #[argh(option)]
    detector: Vec<String>,

    /// per-set detector list, SET=DETECTOR[,DETECTOR...] (repeatable)
    #[argh(option)]
    only: Vec<String>,

    /// comma-separated window sizes, e.g. 16,32,64
    #[argh(option)]
    window_sizes: Option<String>,

    /// pick window sizes from each reference image's size category
    #[argh(switch)]
    by_size_category: bool,

    /// keep only peaks unique in their 3x3 neighbourhood
    #[argh(switch)]
    unique_peaks: bool,

    /// sort keypoints by descending response
    #[argh(switch)]
    sort_by_response: bool,

    /// peak detector configuration (.toml or .json)
    #[argh(option)]
    config: Option<PathBuf>,

    /// keep only mutual nearest-neighbour matches
    #[argh(switch)]
    cross_check: bool,

    /// keypoint limit per image before a run is reported as failed
    #[argh(option)]
    max_keypoints: Option<usize>,

    /// detector whose homography the others are compared against
    #[argh(option)]
    baseline: Option<String>,
}

#[derive(FromArgs)]
#[argh(subcommand, name = "pair")]
/// Run one detector on a single reference/registered pair.
struct PairArgs {
    /// reference image
    #[argh(positional)]
    reference: PathBuf,

    /// registered image
    #[argh(positional)]
    registered: PathBuf,

    /// detector name (default LP-SIFT)
    #[argh(option, default = "String::from(\"LP-SIFT\")")]
    detector: String,

    /// comma-separated window sizes
    #[argh(option)]
    window_sizes: Option<String>,

    /// keep only peaks unique in their 3x3 neighbourhood
    #[argh(switch)]
    unique_peaks: bool,

    /// peak detector configuration (.toml or .json)
    #[argh(option)]
    config: Option<PathBuf>,

    /// keep only mutual nearest-neighbour matches
    #[argh(switch)]
    cross_check: bool,

    /// directory for the stitched image
    #[argh(option)]
    stitched_dir: Option<PathBuf>,

    /// save the reference image with its keypoints drawn
    #[argh(option)]
    keypoints: Option<PathBuf>,
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args: Args = argh::from_env();
    if let Err(e) = run(args) {
        log::error!("{}", e);
        std::process::exit(1);
    }
}

fn run(args: Args) -> CliResult<()> {
    init_thread_pool(args.threads.unwrap_or_else(default_threads))?;
    match args.command {
        Command::Bench(bench) => run_bench(bench),
        Command::Pair(pair) => run_pair(pair),
    }
}

fn peak_config(
    config: Option<&PathBuf>,
    window_sizes: Option<&str>,
    unique_peaks: bool,
    sort_by_response: bool,
) -> CliResult<PeakConfig> {
    let base = match config {
        Some(path) => PeakConfig::load(path).map_err(ConfigError::from)?,
        None => PeakConfig::default(),
    };

    let mut builder = PeakDetectorBuilder::from_config(base);
    if let Some(arg) = window_sizes {
        let sizes = parse_window_sizes(arg).ok_or_else(|| ConfigError::InvalidWindowSizes(arg.to_string()))?;
        builder = builder.window_sizes(sizes);
    }
    if unique_peaks {
        builder = builder.unique_peaks(true);
    }
    if sort_by_response {
        builder = builder.sort_by_response(true);
    }
    log::debug!("{}", builder.summary());

    let cfg = builder.to_config();
    cfg.validate().map_err(ConfigError::from)?;
    Ok(cfg)
}

fn run_bench(args: BenchArgs) -> CliResult<()> {
    let csv_path = args.output.clone().ok_or(ConfigError::MissingOutput)?;
    let cfg = bench_config(&args)?;

    let mut runner = BenchmarkRunner::new(cfg);
    let results = runner.run_on_directory(&args.image_dir)?;

    print_summary_table(&results);
    print_detector_summary(&results);

    write_csv(&csv_path, &results)?;
    if let Some(json) = &args.json {
        write_json(json, &results)?;
    }
    println!("\nResults saved to {}", csv_path.display());
    Ok(())
}

/// Benchmark settings from the command line; an explicit `--window-sizes`
/// list wins over `--by-size-category`.
fn bench_config(args: &BenchArgs) -> CliResult<BenchmarkConfig> {
    let mut filter = DetectorFilter {
        global: args
            .detector
            .iter()
            .map(|d| d.parse::<DetectorKind>())
            .collect::<Result<_, _>>()?,
        ..DetectorFilter::default()
    };
    for arg in &args.only {
        let (set, detectors) = parse_set_filter(arg)?;
        filter = filter.only(&set, detectors);
    }

    let baseline = match &args.baseline {
        Some(name) => Some(name.parse::<DetectorKind>()?.name().to_string()),
        None => BenchmarkConfig::default().baseline,
    };

    let peak = peak_config(
        args.config.as_ref(),
        args.window_sizes.as_deref(),
        args.unique_peaks,
        args.sort_by_response,
    )?;

    let window_sizes = args.window_sizes.as_ref().map(|_| peak.window_sizes.clone());

    Ok(BenchmarkConfig {
        max_keypoints: args.max_keypoints.unwrap_or(lp_cli::MAX_KEYPOINTS_BF),
        cross_check: args.cross_check,
        output_dir: args.stitched_dir.clone(),
        peak,
        window_sizes,
        window_policy: if args.by_size_category {
            WindowPolicy::BySizeCategory
        } else {
            WindowPolicy::Fixed
        },
        baseline,
        sets: args.set.clone(),
        detectors: filter,
        ..BenchmarkConfig::default()
    })
}

fn run_pair(args: PairArgs) -> CliResult<()> {
    let kind: DetectorKind = args.detector.parse()?;
    let peak = peak_config(args.config.as_ref(), args.window_sizes.as_deref(), args.unique_peaks, false)?;
    let window_sizes = peak.window_sizes.clone();

    let reference = image::open(&args.reference)?;
    let registered = image::open(&args.registered)?;
    let set = ImageSet::from_images("pair", reference, registered);

    let detector = kind.build(&peak)?;
    if let Some(path) = &args.keypoints {
        save_keypoints(detector.as_ref(), &set, path)?;
    }

    if let Some(dir) = &args.stitched_dir {
        std::fs::create_dir_all(dir)?;
    }
    let cfg = BenchmarkConfig {
        cross_check: args.cross_check,
        output_dir: args.stitched_dir.clone(),
        peak,
        ..BenchmarkConfig::default()
    };
    let mut runner = BenchmarkRunner::new(cfg);
    let norm = detector.default_norm();
    runner.add_detector(kind.name(), detector, norm);

    for m in runner.run_all_detectors(&set, &window_sizes) {
        println!("{}", pair_summary(&m));
    }
    Ok(())
}

fn pair_summary(m: &StitchingMetrics) -> String {
    if !m.stitching_success {
        return format!("{}: failed ({})", m.algorithm_name, m.failure_label());
    }

    let detect_ms = (m.detection_time_reference + m.detection_time_registered) * 1000.0;
    let match_ms = m.matching_time * 1000.0;
    let inlier_pct = if m.num_matches > 0 {
        100.0 * m.num_inliers as f64 / m.num_matches as f64
    } else {
        0.0
    };
    let total_kps = m.num_keypoints_reference + m.num_keypoints_registered;
    let kps_per_ms = if detect_ms > 0.0 { total_kps as f64 / detect_ms } else { 0.0 };

    format!(
        "{}: {}/{} keypoints, {} matches, {:.1}% inliers, detect {:.2} ms, match {:.2} ms, {:.1} keypoints/ms",
        m.algorithm_name,
        m.num_keypoints_reference,
        m.num_keypoints_registered,
        m.num_matches,
        inlier_pct,
        detect_ms,
        match_ms,
        kps_per_ms
    )
}

fn save_keypoints(detector: &dyn Feature2D, set: &ImageSet, path: &Path) -> CliResult<()> {
    let keypoints = detector.detect(&set.reference_gray)?;
    let mut output = image::DynamicImage::ImageRgb8(set.reference.clone()).into_rgba8();

    for kp in &keypoints {
        draw_hollow_circle_mut(&mut output, (kp.x as i32, kp.y as i32), 3, Rgba([255, 0, 0, 255]));
    }

    output.save(path)?;
    println!("Saved {} keypoints drawn on {}", keypoints.len(), path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bench_args(extra: &[&str]) -> BenchArgs {
        let mut argv = vec!["images", "-o", "out.csv"];
        argv.extend_from_slice(extra);
        BenchArgs::from_args(&["bench"], &argv).unwrap()
    }

    #[test]
    fn test_explicit_window_sizes_win_over_size_category() {
        let cfg = bench_config(&bench_args(&["--window-sizes", "24,48", "--by-size-category"])).unwrap();
        assert_eq!(cfg.window_sizes, Some(vec![24, 48]));
        assert_eq!(cfg.window_policy, WindowPolicy::BySizeCategory);

        let runner = BenchmarkRunner::new(cfg);
        assert_eq!(runner.window_sizes_for(4000, 3000), vec![24, 48]);
    }

    #[test]
    fn test_size_category_without_explicit_list() {
        let cfg = bench_config(&bench_args(&["--by-size-category"])).unwrap();
        assert_eq!(cfg.window_sizes, None);
        assert_eq!(BenchmarkRunner::new(cfg).window_sizes_for(4000, 3000), vec![256, 512]);
    }

    #[test]
    fn test_bench_filters_and_baseline() {
        let cfg = bench_config(&bench_args(&[
            "--detector",
            "lp-sift",
            "--only",
            "boat=LP-ORB",
            "--baseline",
            "lp_orb",
        ]))
        .unwrap();
        assert_eq!(cfg.detectors.detectors_for("wall"), vec![DetectorKind::LpSift]);
        assert_eq!(cfg.detectors.detectors_for("boat"), vec![DetectorKind::LpOrb]);
        assert_eq!(cfg.baseline.as_deref(), Some("LP-ORB"));
    }
}
