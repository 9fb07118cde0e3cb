//! Visual regression testing with screenshot comparison

use std::path::{Path, PathBuf};
use image::{GenericImageView, Pixel, Rgba, RgbaImage};
use sha2::{Digest, Sha256};
use tracing::{debug, info, warn};

use crate::error::{E2eError, E2eResult};

/// Result of a visual comparison
#[derive(Debug, Clone)]
pub struct VisualDiff {
    /// Whether the images match (within threshold)
    pub matches: bool,

    /// Percentage of pixels that differ
    pub diff_percent: f64,

    /// Number of different pixels
    pub diff_pixels: u64,

    /// Total pixels compared
    pub total_pixels: u64,

    /// Path to the diff image (if generated)
    pub diff_image_path: Option<PathBuf>,

    /// Hash of the actual screenshot
    pub actual_hash: String,

    /// Hash of the baseline screenshot
    pub baseline_hash: String,
}

/// Visual regression testing utilities
pub struct VisualTester {
    /// Directory containing baseline screenshots
    baseline_dir: PathBuf,

    /// Directory for actual screenshots
    actual_dir: PathBuf,

    /// Directory for diff images
    diff_dir: PathBuf,

    /// Default threshold (0.0 - 100.0 percent)
    threshold: f64,

    /// Whether to auto-update baselines when missing
    auto_update: bool,
}

impl VisualTester {
    /// Create a new visual tester
    pub fn new(config: VisualConfig) -> E2eResult<Self> {
        std::fs::create_dir_all(&config.baseline_dir)?;
        std::fs::create_dir_all(&config.actual_dir)?;
        std::fs::create_dir_all(&config.diff_dir)?;

        Ok(Self {
            baseline_dir: config.baseline_dir,
            actual_dir: config.actual_dir,
            diff_dir: config.diff_dir,
            threshold: config.threshold,
            auto_update: config.auto_update,
        })
    }

    /// Compare a screenshot against its baseline
    pub fn compare(&self, name: &str, threshold: Option<f64>) -> E2eResult<VisualDiff> {
        let threshold = threshold.unwrap_or(self.threshold);

        let actual_path = self.actual_dir.join(format!("{}.png", name));
        let baseline_path = self.baseline_dir.join(format!("{}.png", name));

        if !actual_path.exists() {
            return Err(E2eError::VisualRegression(format!(
                "Actual screenshot not found: {}",
                actual_path.display()
            )));
        }

        if !baseline_path.exists() {
            if self.auto_update {
                info!("Creating baseline for '{}' (auto-update enabled)", name);
                std::fs::copy(&actual_path, &baseline_path)?;

                let hash = hash_file(&actual_path)?;
                return Ok(VisualDiff {
                    matches: true,
                    diff_percent: 0.0,
                    diff_pixels: 0,
                    total_pixels: 0,
                    diff_image_path: None,
                    actual_hash: hash.clone(),
                    baseline_hash: hash,
                });
            }
            return Err(E2eError::BaselineNotFound(
                baseline_path.to_string_lossy().to_string(),
            ));
        }

        let actual_hash = hash_file(&actual_path)?;
        let baseline_hash = hash_file(&baseline_path)?;

        // Quick hash comparison
        if actual_hash == baseline_hash {
            debug!("Screenshots match exactly (same hash)");
            let img = image::open(&actual_path)?;
            return Ok(VisualDiff {
                matches: true,
                diff_percent: 0.0,
                diff_pixels: 0,
                total_pixels: (img.width() as u64) * (img.height() as u64),
                diff_image_path: None,
                actual_hash,
                baseline_hash,
            });
        }

        let actual = image::open(&actual_path)?.to_rgba8();
        let baseline = image::open(&baseline_path)?.to_rgba8();

        if actual.dimensions() != baseline.dimensions() {
            warn!(
                "Screenshot dimensions differ: actual {:?} vs baseline {:?}",
                actual.dimensions(),
                baseline.dimensions()
            );
        }

        let outcome = diff_images(&actual, &baseline);
        let diff_percent = if outcome.total_pixels == 0 {
            0.0
        } else {
            (outcome.diff_pixels as f64 / outcome.total_pixels as f64) * 100.0
        };
        let matches = diff_percent <= threshold;

        // Save diff image if there are differences
        let diff_image_path = if outcome.diff_pixels > 0 {
            let path = self.diff_dir.join(format!("{}-diff.png", name));
            outcome.image.save(&path)?;
            Some(path)
        } else {
            None
        };

        if !matches {
            warn!(
                "Visual regression detected in '{}': {:.2}% pixels differ (threshold: {:.2}%)",
                name, diff_percent, threshold
            );
        }

        Ok(VisualDiff {
            matches,
            diff_percent,
            diff_pixels: outcome.diff_pixels,
            total_pixels: outcome.total_pixels,
            diff_image_path,
            actual_hash,
            baseline_hash,
        })
    }

    /// Update the baseline with the actual screenshot
    pub fn update_baseline(&self, name: &str) -> E2eResult<()> {
        let actual_path = self.actual_dir.join(format!("{}.png", name));
        let baseline_path = self.baseline_dir.join(format!("{}.png", name));

        if !actual_path.exists() {
            return Err(E2eError::VisualRegression(format!(
                "Cannot update baseline: actual screenshot not found: {}",
                actual_path.display()
            )));
        }

        std::fs::copy(&actual_path, &baseline_path)?;
        info!("Updated baseline for '{}'", name);

        Ok(())
    }

    /// List all baselines
    pub fn list_baselines(&self) -> E2eResult<Vec<String>> {
        let mut baselines = Vec::new();

        for entry in std::fs::read_dir(&self.baseline_dir)? {
            let entry = entry?;
            let path = entry.path();

            if path.extension().map(|e| e == "png").unwrap_or(false) {
                if let Some(name) = path.file_stem() {
                    baselines.push(name.to_string_lossy().to_string());
                }
            }
        }

        baselines.sort();
        Ok(baselines)
    }

    /// Clean up old diff images
    pub fn clean_diffs(&self) -> E2eResult<()> {
        for entry in std::fs::read_dir(&self.diff_dir)? {
            let entry = entry?;
            std::fs::remove_file(entry.path())?;
        }
        Ok(())
    }
}

struct DiffOutcome {
    diff_pixels: u64,
    total_pixels: u64,
    image: RgbaImage,
}

/// Pixel-by-pixel comparison over the union of both image sizes. Area
/// covered by only one image counts as differing, so a screenshot that
/// grew or shrank fails loudly instead of silently comparing a corner.
fn diff_images(actual: &RgbaImage, baseline: &RgbaImage) -> DiffOutcome {
    let width = actual.width().max(baseline.width());
    let height = actual.height().max(baseline.height());
    let total_pixels = (width as u64) * (height as u64);

    let mut image = RgbaImage::new(width, height);
    let mut diff_pixels = 0u64;

    for y in 0..height {
        for x in 0..width {
            let a = pixel_at(actual, x, y);
            let b = pixel_at(baseline, x, y);

            match (a, b) {
                (Some(a), Some(b)) if !pixel_differs(a, b) => {
                    // Keep matching pixels but dim them so diffs stand out
                    let c = a.channels();
                    image.put_pixel(x, y, Rgba([c[0] / 2, c[1] / 2, c[2] / 2, 128]));
                }
                _ => {
                    diff_pixels += 1;
                    image.put_pixel(x, y, Rgba([255, 0, 0, 255]));
                }
            }
        }
    }

    DiffOutcome {
        diff_pixels,
        total_pixels,
        image,
    }
}

fn pixel_at(img: &RgbaImage, x: u32, y: u32) -> Option<&Rgba<u8>> {
    (x < img.width() && y < img.height()).then(|| img.get_pixel(x, y))
}

/// Check if two pixels differ significantly
fn pixel_differs(a: &Rgba<u8>, b: &Rgba<u8>) -> bool {
    // Allow small color differences (anti-aliasing, compression)
    const TOLERANCE: i32 = 5;

    a.channels()
        .iter()
        .zip(b.channels())
        .any(|(a, b)| (*a as i32 - *b as i32).abs() > TOLERANCE)
}

/// Hash a file using SHA256
fn hash_file(path: &Path) -> E2eResult<String> {
    let data = std::fs::read(path)?;
    let mut hasher = Sha256::new();
    hasher.update(&data);
    Ok(hex::encode(hasher.finalize()))
}

/// Configuration for visual testing
#[derive(Debug, Clone)]
pub struct VisualConfig {
    pub baseline_dir: PathBuf,
    pub actual_dir: PathBuf,
    pub diff_dir: PathBuf,
    pub threshold: f64,
    pub auto_update: bool,
}

impl Default for VisualConfig {
    fn default() -> Self {
        let root = crate::server::workspace_root();
        Self {
            baseline_dir: root.join("test-results/baselines"),
            actual_dir: root.join("test-results/screenshots"),
            diff_dir: root.join("test-results/diffs"),
            threshold: 0.5,
            auto_update: false,
        }
    }
}
