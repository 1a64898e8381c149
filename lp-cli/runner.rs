use std::any::Any;
use std::collections::BTreeMap;
use std::io::Write;
use std::panic::{self, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Instant;

use image::RgbImage;
use lp_core::{CoreResult, Feature2D, NormType};
use lp_peak::{join_window_sizes, suggested_window_sizes, PeakConfig};

use crate::dataset::{list_image_sets, load_image_set, ImageSet};
use crate::error::{CliResult, ConfigError};
use crate::features::{FastBrief, LpOrb, LpSift};
use crate::homography::{estimate_homography_ransac, homography_delta, RansacConfig};
use crate::matcher::BruteForceMatcher;
use crate::metrics::{format_time, size_category, FailureReason, StitchingMetrics};
use crate::stitch::warp_and_blend;

/// Largest keypoint count per image accepted by the exact matcher.
pub const MAX_KEYPOINTS_BF: usize = 50_000;

/// Correspondences required before attempting a homography.
pub const MIN_MATCHES: usize = 4;

/// Built-in detectors the runner can register.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum DetectorKind {
    FastBrief,
    LpSift,
    LpOrb,
}

impl DetectorKind {
    /// Registration order; the first entry doubles as the default baseline.
    pub const ALL: [DetectorKind; 3] = [DetectorKind::FastBrief, DetectorKind::LpSift, DetectorKind::LpOrb];

    pub fn name(self) -> &'static str {
        match self {
            DetectorKind::FastBrief => FastBrief::NAME,
            DetectorKind::LpSift => LpSift::NAME,
            DetectorKind::LpOrb => LpOrb::NAME,
        }
    }

    /// Instantiates the detector; local-peak detectors take `peak`.
    pub fn build(self, peak: &PeakConfig) -> CoreResult<Box<dyn Feature2D>> {
        let detector: Box<dyn Feature2D> = match self {
            DetectorKind::FastBrief => Box::new(FastBrief::default()),
            DetectorKind::LpSift => Box::new(LpSift::new(peak.clone())?),
            DetectorKind::LpOrb => Box::new(LpOrb::new(peak.clone())?),
        };
        Ok(detector)
    }
}

impl std::fmt::Display for DetectorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for DetectorKind {
    type Err = ConfigError;

    /// Case-insensitive; `_` is accepted for `-`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().replace('_', "-");
        DetectorKind::ALL
            .into_iter()
            .find(|k| k.name().eq_ignore_ascii_case(&wanted))
            .ok_or_else(|| ConfigError::UnknownDetector(s.to_string()))
    }
}

/// Which detectors run on which image set.
///
/// A per-set entry replaces the global list for that set; an empty global list
/// means every detector.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DetectorFilter {
    pub global: Vec<DetectorKind>,
    pub per_set: BTreeMap<String, Vec<DetectorKind>>,
}

impl DetectorFilter {
    pub fn only(mut self, set: &str, detectors: Vec<DetectorKind>) -> Self {
        self.per_set.insert(set.to_string(), detectors);
        self
    }

    pub fn detectors_for(&self, set: &str) -> Vec<DetectorKind> {
        let chosen = match self.per_set.get(set) {
            Some(list) => list.as_slice(),
            None => self.global.as_slice(),
        };
        if chosen.is_empty() {
            return DetectorKind::ALL.to_vec();
        }
        // Registration order, no duplicates
        DetectorKind::ALL.into_iter().filter(|k| chosen.contains(k)).collect()
    }
}

/// Parses `SET=DETECTOR[,DETECTOR...]`.
pub fn parse_set_filter(arg: &str) -> Result<(String, Vec<DetectorKind>), ConfigError> {
    let (set, list) = arg
        .split_once('=')
        .ok_or_else(|| ConfigError::MalformedFilter(arg.to_string()))?;
    let set = set.trim();
    if set.is_empty() || list.trim().is_empty() {
        return Err(ConfigError::MalformedFilter(arg.to_string()));
    }

    let detectors = list
        .split(',')
        .map(|name| {
            if name.trim().is_empty() {
                Err(ConfigError::MalformedFilter(arg.to_string()))
            } else {
                name.parse::<DetectorKind>()
            }
        })
        .collect::<Result<Vec<_>, _>>()?;
    Ok((set.to_string(), detectors))
}

/// How window sizes are chosen per image set.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum WindowPolicy {
    /// The configured list for every set.
    #[default]
    Fixed,
    /// Suggested sizes for the reference image's size category.
    BySizeCategory,
}

#[derive(Debug, Clone)]
pub struct BenchmarkConfig {
    pub max_keypoints: usize,
    pub min_matches: usize,
    pub ransac: RansacConfig,
    pub cross_check: bool,
    /// Stitched images are written here when set.
    pub output_dir: Option<PathBuf>,
    pub peak: PeakConfig,
    /// Explicit window sizes; when non-empty they override both
    /// `peak.window_sizes` and the policy.
    pub window_sizes: Option<Vec<usize>>,
    pub window_policy: WindowPolicy,
    /// Detector whose homography the others are compared against, per set.
    pub baseline: Option<String>,
    /// Image sets to run; empty means all.
    pub sets: Vec<String>,
    pub detectors: DetectorFilter,
}

impl Default for BenchmarkConfig {
    fn default() -> Self {
        Self {
            max_keypoints: MAX_KEYPOINTS_BF,
            min_matches: MIN_MATCHES,
            ransac: RansacConfig::default(),
            cross_check: false,
            output_dir: None,
            peak: PeakConfig::default(),
            window_sizes: None,
            window_policy: WindowPolicy::Fixed,
            baseline: Some(FastBrief::NAME.to_string()),
            sets: Vec::new(),
            detectors: DetectorFilter::default(),
        }
    }
}

/// A registered detector and the norm used to match its descriptors.
pub struct DetectorEntry {
    pub name: String,
    pub detector: Box<dyn Feature2D>,
    pub norm: NormType,
}

pub struct BenchmarkRunner {
    cfg: BenchmarkConfig,
    detectors: Vec<DetectorEntry>,
}

impl BenchmarkRunner {
    pub fn new(cfg: BenchmarkConfig) -> Self {
        Self {
            cfg,
            detectors: Vec::new(),
        }
    }

    pub fn config(&self) -> &BenchmarkConfig {
        &self.cfg
    }

    pub fn add_detector(&mut self, name: &str, detector: Box<dyn Feature2D>, norm: NormType) {
        self.detectors.push(DetectorEntry {
            name: name.to_string(),
            detector,
            norm,
        });
    }

    pub fn clear_detectors(&mut self) {
        self.detectors.clear();
    }

    pub fn detector_names(&self) -> Vec<&str> {
        self.detectors.iter().map(|d| d.name.as_str()).collect()
    }

    pub fn window_sizes_for(&self, width: u32, height: u32) -> Vec<usize> {
        if let Some(sizes) = self.cfg.window_sizes.as_ref().filter(|s| !s.is_empty()) {
            return sizes.clone();
        }
        match self.cfg.window_policy {
            WindowPolicy::Fixed => self.cfg.peak.window_sizes.clone(),
            WindowPolicy::BySizeCategory => suggested_window_sizes(width as usize, height as usize),
        }
    }

    /// Replaces the registered detectors with the filtered built-ins for `set`.
    pub fn register_detectors(&mut self, set: &str, window_sizes: &[usize]) -> CoreResult<()> {
        self.clear_detectors();
        let peak = PeakConfig {
            window_sizes: window_sizes.to_vec(),
            ..self.cfg.peak.clone()
        };
        for kind in self.cfg.detectors.detectors_for(set) {
            let detector = kind.build(&peak)?;
            let norm = detector.default_norm();
            self.add_detector(kind.name(), detector, norm);
        }
        Ok(())
    }

    /// One detect → describe → match → homography → warp run.
    ///
    /// Never fails: every failure, including a panic inside the detector, is
    /// recorded in the returned metrics.
    pub fn run_single_benchmark(&self, set: &ImageSet, entry: &DetectorEntry, window_sizes: &[usize]) -> StitchingMetrics {
        let mut m = StitchingMetrics::new(&set.name, &entry.name);
        m.window_sizes = join_window_sizes(window_sizes);
        (m.reference_width, m.reference_height) = set.reference.dimensions();
        (m.registered_width, m.registered_height) = set.registered.dimensions();
        m.size_category = Some(size_category(m.reference_width, m.reference_height));

        let total = Instant::now();
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| self.run_stages(set, entry, &mut m)));
        m.total_stitching_time = total.elapsed().as_secs_f64();

        let result = outcome.unwrap_or_else(|payload| Err(FailureReason::Exception(panic_message(payload.as_ref()))));
        match result {
            Ok(stitched) => {
                m.stitching_success = true;
                if let Some(dir) = &self.cfg.output_dir {
                    self.save_stitched(dir, &set.name, &entry.name, &stitched);
                }
            }
            Err(reason) => {
                log::debug!("{} on {}: {}", entry.name, set.name, reason);
                m.fail(reason);
            }
        }
        m
    }

    fn run_stages(&self, set: &ImageSet, entry: &DetectorEntry, m: &mut StitchingMetrics) -> Result<RgbImage, FailureReason> {
        let detector = entry.detector.as_ref();

        // Each stage's time is stored before its error is propagated.
        let t = Instant::now();
        let detected = detector.detect(&set.reference_gray);
        m.detection_time_reference = t.elapsed().as_secs_f64();
        let mut kps_ref = detected.map_err(exception)?;
        m.num_keypoints_reference = kps_ref.len();

        let t = Instant::now();
        let detected = detector.detect(&set.registered_gray);
        m.detection_time_registered = t.elapsed().as_secs_f64();
        let mut kps_reg = detected.map_err(exception)?;
        m.num_keypoints_registered = kps_reg.len();

        if kps_ref.is_empty() || kps_reg.is_empty() {
            return Err(FailureReason::EmptyKeypoints);
        }
        if kps_ref.len() > self.cfg.max_keypoints || kps_reg.len() > self.cfg.max_keypoints {
            return Err(FailureReason::TooManyKeypoints {
                reference: kps_ref.len(),
                registered: kps_reg.len(),
                limit: self.cfg.max_keypoints,
            });
        }

        let t = Instant::now();
        let computed = detector.compute(&set.reference_gray, &mut kps_ref);
        m.descriptor_time_reference = t.elapsed().as_secs_f64();
        let desc_ref = computed.map_err(exception)?;

        let t = Instant::now();
        let computed = detector.compute(&set.registered_gray, &mut kps_reg);
        m.descriptor_time_registered = t.elapsed().as_secs_f64();
        let desc_reg = computed.map_err(exception)?;

        // Extractors may drop keypoints
        m.num_keypoints_reference = kps_ref.len();
        m.num_keypoints_registered = kps_reg.len();

        if desc_ref.is_empty() || desc_reg.is_empty() {
            return Err(FailureReason::EmptyDescriptors);
        }

        let t = Instant::now();
        let matched = BruteForceMatcher::new(entry.norm)
            .with_cross_check(self.cfg.cross_check)
            .match_descriptors(&desc_ref, &desc_reg);
        m.matching_time = t.elapsed().as_secs_f64();
        let matches = matched.map_err(exception)?;
        m.num_matches = matches.len();

        if matches.len() < self.cfg.min_matches {
            return Err(FailureReason::InsufficientMatches {
                minimum: self.cfg.min_matches,
            });
        }

        let (src, dst): (Vec<[f64; 2]>, Vec<[f64; 2]>) = matches
            .iter()
            .map(|mt| {
                let a = &kps_ref[mt.query_idx];
                let b = &kps_reg[mt.train_idx];
                ([a.x as f64, a.y as f64], [b.x as f64, b.y as f64])
            })
            .unzip();

        let t = Instant::now();
        let estimate = estimate_homography_ransac(&src, &dst, &self.cfg.ransac);
        m.homography_time = t.elapsed().as_secs_f64();

        let estimate = estimate.map_err(|err| {
            log::debug!("homography for {} on {}: {}", entry.name, set.name, err);
            FailureReason::HomographyFailed
        })?;
        m.num_inliers = estimate.n_inliers;
        m.reprojection_error = Some(estimate.mean_error);
        m.homography = Some(estimate.h);

        // The registered image stays fixed; the reference is warped onto it.
        let t = Instant::now();
        let stitched = warp_and_blend(&set.registered, &set.reference, &estimate.h);
        m.warping_time = t.elapsed().as_secs_f64();

        stitched.map_err(exception)
    }

    fn save_stitched(&self, dir: &Path, dataset: &str, algorithm: &str, stitched: &RgbImage) {
        let path = dir.join(format!("{}_{}_stitched.jpg", dataset, algorithm));
        if let Err(e) = stitched.save(&path) {
            log::warn!("Could not save {}: {}", path.display(), e);
        }
    }

    /// Runs every registered detector on `set` and fills in homography deltas
    /// against the baseline detector's first successful run on this set.
    pub fn run_all_detectors(&self, set: &ImageSet, window_sizes: &[usize]) -> Vec<StitchingMetrics> {
        let mut results = Vec::with_capacity(self.detectors.len());
        let mut baseline = None;

        for entry in &self.detectors {
            print!("  Running {}...", entry.name);
            let _ = std::io::stdout().flush();

            let mut m = self.run_single_benchmark(set, entry, window_sizes);

            if m.stitching_success {
                println!(
                    " Done ({}s, {}/{} keypoints)",
                    format_time(m.total_stitching_time),
                    m.num_keypoints_reference,
                    m.num_keypoints_registered
                );
                if let Some(h) = m.homography {
                    if let Some(base) = &baseline {
                        m.homography_delta = Some(homography_delta(&h, base));
                    } else if self.cfg.baseline.as_deref() == Some(entry.name.as_str()) {
                        baseline = Some(h);
                    }
                }
            } else {
                println!(" Failed: {}", m.failure_label());
            }

            results.push(m);
        }
        results
    }

    /// Runs every (filtered) image set under `dir` in name order.
    ///
    /// Sets whose images cannot be loaded, or whose detectors cannot be built,
    /// are skipped with a warning.
    pub fn run_on_directory(&mut self, dir: impl AsRef<Path>) -> CliResult<Vec<StitchingMetrics>> {
        if let Some(out) = &self.cfg.output_dir {
            std::fs::create_dir_all(out)?;
        }

        let mut all = Vec::new();
        for path in list_image_sets(dir)? {
            let name = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            if !self.cfg.sets.is_empty() && !self.cfg.sets.contains(&name) {
                continue;
            }

            println!("\nProcessing: {}", name);
            let set = match load_image_set(&path) {
                Ok(set) => set,
                Err(e) => {
                    log::warn!("Could not load images from {}: {}", path.display(), e);
                    continue;
                }
            };

            let (rw, rh) = set.reference.dimensions();
            let (gw, gh) = set.registered.dimensions();
            println!("  Reference: {}x{}, Registered: {}x{}", rw, rh, gw, gh);

            let window_sizes = self.window_sizes_for(rw, rh);
            println!("  Using window sizes L = {}", join_window_sizes(&window_sizes));

            if let Err(e) = self.register_detectors(&name, &window_sizes) {
                log::warn!("Could not set up detectors for {}: {}", name, e);
                continue;
            }
            all.extend(self.run_all_detectors(&set, &window_sizes));
        }
        Ok(all)
    }
}

fn exception(err: impl std::fmt::Display) -> FailureReason {
    FailureReason::Exception(err.to_string())
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
