//! Watermark processor: option handling, progress reporting and file I/O.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use image::{ImageFormat, RgbaImage};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::detection::{self, DETECTION_THRESHOLD};
use crate::error::{Error, Result};
use crate::inpaint::{self, FillMode};
use crate::overlay;
use crate::region::Region;

/// Options controlling watermark processing behavior.
#[derive(Debug, Clone)]
pub struct ProcessOptions {
    /// Skip detection and fill all four corner probes.
    pub force: bool,
    /// Confidence a probe must exceed to be reported (0.0-1.0).
    pub threshold: f64,
    /// How the inpainting pass samples neighbourhoods.
    pub fill_mode: FillMode,
    /// Caller-supplied regions used instead of detection.
    pub regions: Vec<Region>,
    /// Also write a copy with highlighted regions next to the output.
    pub overlay: bool,
    /// Enable verbose logging.
    pub verbose: bool,
    /// Suppress non-error output.
    pub quiet: bool,
}

impl Default for ProcessOptions {
    fn default() -> Self {
        Self {
            force: false,
            threshold: DETECTION_THRESHOLD,
            fill_mode: FillMode::default(),
            regions: Vec::new(),
            overlay: false,
            verbose: false,
            quiet: false,
        }
    }
}

impl ProcessOptions {
    /// Check option values that cannot be expressed in the type system.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidThreshold`] if `threshold` is outside `[0, 1]`.
    pub fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.threshold) {
            return Err(Error::InvalidThreshold(self.threshold));
        }
        Ok(())
    }
}

/// Processing milestones reported to progress callbacks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    /// Decoding the input file.
    Loading,
    /// Scanning the corner probes.
    Detecting,
    /// Inpainting the selected regions.
    Removing,
    /// Finished.
    Complete,
}

impl Stage {
    /// Rough completion percentage at the start of this stage.
    #[must_use]
    pub fn percent(self) -> u8 {
        match self {
            Self::Loading => 20,
            Self::Detecting => 40,
            Self::Removing => 70,
            Self::Complete => 100,
        }
    }
}

/// Result of processing a single image file.
#[derive(Debug, Serialize)]
pub struct ProcessResult {
    /// Path of the processed file.
    pub path: PathBuf,
    /// Whether processing succeeded.
    pub success: bool,
    /// Whether the file was skipped (nothing to remove).
    pub skipped: bool,
    /// Regions that were filled.
    pub regions: Vec<Region>,
    /// Human-readable status message.
    pub message: String,
}

impl ProcessResult {
    fn new(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
            success: false,
            skipped: false,
            regions: Vec::new(),
            message: String::new(),
        }
    }

    /// Serialize the result as a single-line JSON object.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Json`] if serialization fails.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Highest confidence among the filled regions, or 0 if none.
    #[must_use]
    pub fn confidence(&self) -> f64 {
        self.regions
            .iter()
            .map(|r| r.confidence)
            .fold(0.0, f64::max)
    }
}

/// Stateless front end tying detection, inpainting and file handling together.
///
/// The processor owns no pixel data; every call works on the image it is
/// given and returns a new buffer.
#[derive(Debug, Clone, Copy, Default)]
pub struct WatermarkProcessor;

impl WatermarkProcessor {
    /// Create a processor.
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Regions to fill for `image` under `opts`.
    ///
    /// Caller-supplied regions take precedence and are clipped to the image.
    /// With `force`, all four probes are returned with their scores.
    /// Otherwise the probes scoring above `opts.threshold` are returned.
    #[must_use]
    #[allow(clippy::unused_self)] // method on `self` for API consistency
    pub fn detect(&self, image: &RgbaImage, opts: &ProcessOptions) -> Vec<Region> {
        let (w, h) = image.dimensions();
        if !opts.regions.is_empty() {
            return opts.regions.iter().filter_map(|r| r.clip(w, h)).collect();
        }
        if opts.force {
            return detection::analyze_probes(image)
                .into_iter()
                .map(|(_, region, _)| region)
                .collect();
        }
        detection::detect_with_threshold(image, opts.threshold)
    }

    /// Return a copy of `image` with `regions` inpainted.
    #[must_use]
    #[allow(clippy::unused_self)]
    pub fn remove(&self, image: &RgbaImage, regions: &[Region], mode: FillMode) -> RgbaImage {
        inpaint::remove_with_mode(image, regions, mode)
    }

    /// Detect and remove watermarks from a decoded image.
    ///
    /// `progress` is called at the start of each stage. When no region is
    /// selected the returned image is an unmodified copy.
    pub fn process_image<F>(
        &self,
        image: &RgbaImage,
        opts: &ProcessOptions,
        mut progress: F,
    ) -> (RgbaImage, Vec<Region>)
    where
        F: FnMut(Stage),
    {
        progress(Stage::Detecting);
        let regions = self.detect(image, opts);
        for region in &regions {
            debug!(%region, area = region.area(), "selected region");
        }

        let cleaned = if regions.is_empty() {
            image.clone()
        } else {
            progress(Stage::Removing);
            self.remove(image, &regions, opts.fill_mode)
        };

        progress(Stage::Complete);
        (cleaned, regions)
    }

    /// Process a single image file: load, detect, remove, save.
    ///
    /// Returns a [`ProcessResult`] indicating success, skip, or failure.
    #[must_use]
    pub fn process_file(&self, input: &Path, output: &Path, opts: &ProcessOptions) -> ProcessResult {
        self.process_file_with_progress(input, output, opts, |_| {})
    }

    /// Like [`process_file`](Self::process_file), reporting each [`Stage`].
    pub fn process_file_with_progress<F>(
        &self,
        input: &Path,
        output: &Path,
        opts: &ProcessOptions,
        mut progress: F,
    ) -> ProcessResult
    where
        F: FnMut(Stage),
    {
        let mut result = ProcessResult::new(input);

        if let Err(e) = opts.validate() {
            result.message = e.to_string();
            return result;
        }

        progress(Stage::Loading);
        let image = match load_image(input) {
            Ok(img) => img,
            Err(e) => {
                warn!(path = %input.display(), error = %e, "load failed");
                result.message = format!("Failed to load: {e}");
                return result;
            }
        };

        let (w, h) = image.dimensions();
        if w == 0 || h == 0 {
            result.skipped = true;
            result.success = true;
            result.message = format!("Image has no pixels ({w}x{h})");
            return result;
        }

        let (cleaned, regions) = self.process_image(&image, opts, &mut progress);
        if regions.is_empty() {
            result.skipped = true;
            result.success = true;
            result.message = if opts.regions.is_empty() {
                format!(
                    "No watermark detected (threshold {:.0}%)",
                    opts.threshold * 100.0
                )
            } else {
                format!("Supplied regions lie outside the image ({w}x{h})")
            };
            return result;
        }
        result.regions = regions;

        if let Some(parent) = output.parent() {
            if let Err(e) = ensure_dir(parent) {
                result.message = format!("Failed to create output directory: {e}");
                return result;
            }
        }

        if let Err(e) = save_image(&cleaned, output) {
            warn!(path = %output.display(), error = %e, "save failed");
            result.message = format!("Failed to save: {e}");
            return result;
        }

        if opts.overlay {
            let highlighted = overlay::highlight_regions(&image, &result.regions);
            let path = overlay_path(output);
            if let Err(e) = save_image(&highlighted, &path) {
                result.message = format!("Failed to save overlay: {e}");
                return result;
            }
            debug!(path = %path.display(), "wrote overlay");
        }

        info!(
            path = %input.display(),
            regions = result.regions.len(),
            "watermark removed"
        );
        result.success = true;
        result.message = format!(
            "Watermark removed ({} region{})",
            result.regions.len(),
            if result.regions.len() == 1 { "" } else { "s" }
        );
        result
    }

    /// Process all supported images in a directory.
    ///
    /// Uses parallel iteration when the `cli` feature is enabled (via rayon).
    /// Outputs keep their file name; lossy inputs get `.png` appended.
    /// Inputs whose output name is already taken fail instead of overwriting.
    /// Returns a [`ProcessResult`] for each image found.
    #[must_use]
    pub fn process_directory(
        &self,
        input_dir: &Path,
        output_dir: &Path,
        opts: &ProcessOptions,
    ) -> Vec<ProcessResult> {
        let entries: Vec<PathBuf> = match std::fs::read_dir(input_dir) {
            Ok(rd) => rd
                .filter_map(std::result::Result::ok)
                .filter(|e| e.file_type().map(|ft| ft.is_file()).unwrap_or(false))
                .map(|e| e.path())
                .filter(|p| is_supported_image(p))
                .collect(),
            Err(e) => {
                let mut result = ProcessResult::new(input_dir);
                result.message = format!("Failed to read directory: {e}");
                return vec![result];
            }
        };
        debug!(count = entries.len(), dir = %input_dir.display(), "found images");

        if let Err(e) = ensure_dir(output_dir) {
            let mut result = ProcessResult::new(output_dir);
            result.message = format!("Failed to create output directory: {e}");
            return vec![result];
        }

        let jobs = assign_outputs(entries, output_dir);
        let process_one = |(input_path, output_path): &(PathBuf, Option<PathBuf>)| {
            match output_path {
                Some(output_path) => self.process_file(input_path, output_path, opts),
                None => {
                    let mut result = ProcessResult::new(input_path);
                    result.message = "Output name collides with an earlier file".to_string();
                    result
                }
            }
        };

        #[cfg(feature = "cli")]
        {
            use rayon::prelude::*;
            jobs.par_iter().map(process_one).collect()
        }

        #[cfg(not(feature = "cli"))]
        {
            jobs.iter().map(process_one).collect()
        }
    }
}

/// Decode an image file into RGBA pixels.
///
/// # Errors
///
/// Returns [`Error::Decode`] if the file cannot be opened or decoded.
pub fn load_image(path: &Path) -> Result<RgbaImage> {
    let img = image::open(path).map_err(|source| Error::Decode {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(img.to_rgba8())
}

/// Check if a file has a supported input image extension.
#[must_use]
pub fn is_supported_image(path: &Path) -> bool {
    match path.extension().and_then(|e| e.to_str()) {
        Some(ext) => matches!(
            ext.to_lowercase().as_str(),
            "jpg" | "jpeg" | "png" | "webp" | "bmp" | "gif" | "tif" | "tiff"
        ),
        None => false,
    }
}

fn is_lossless_extension(path: &Path) -> bool {
    match path.extension().and_then(|e| e.to_str()) {
        Some(ext) => matches!(
            ext.to_lowercase().as_str(),
            "png" | "webp" | "bmp" | "tif" | "tiff"
        ),
        None => false,
    }
}

/// Save an RGBA image in a lossless format chosen by extension.
///
/// # Errors
///
/// Returns [`Error::LossyFormat`] for JPEG and AVIF targets,
/// [`Error::UnsupportedFormat`] for anything else that is not PNG, BMP,
/// TIFF or WebP, and an I/O or encoding error if writing fails.
pub fn save_image(img: &RgbaImage, path: &Path) -> Result<()> {
    let format =
        ImageFormat::from_path(path).map_err(|e| Error::UnsupportedFormat(e.to_string()))?;

    match format {
        ImageFormat::Png | ImageFormat::Bmp | ImageFormat::Tiff | ImageFormat::WebP => {
            img.save_with_format(path, format)?;
        }
        ImageFormat::Jpeg | ImageFormat::Avif => {
            return Err(Error::LossyFormat(format!("{format:?}")));
        }
        _ => {
            return Err(Error::UnsupportedFormat(format!("{format:?}")));
        }
    }

    Ok(())
}

/// Create `dir` and its parents if missing. An empty path is the current directory.
fn ensure_dir(dir: &Path) -> Result<()> {
    if dir.as_os_str().is_empty() || dir.is_dir() {
        return Ok(());
    }
    std::fs::create_dir_all(dir)?;
    Ok(())
}

/// File name for a cleaned copy: unchanged for lossless inputs, `.png`
/// appended otherwise (`photo.jpg` becomes `photo.jpg.png`).
fn lossless_file_name(input: &Path) -> PathBuf {
    let name = input.file_name().unwrap_or_default();
    if is_lossless_extension(input) {
        PathBuf::from(name)
    } else {
        let mut name = name.to_os_string();
        name.push(".png");
        PathBuf::from(name)
    }
}

/// Pair each input with its output path in `output_dir`.
///
/// Inputs are sorted so the assignment is stable; an input whose output
/// name was already taken gets `None`.
fn assign_outputs(mut inputs: Vec<PathBuf>, output_dir: &Path) -> Vec<(PathBuf, Option<PathBuf>)> {
    inputs.sort();
    let mut taken = HashSet::new();
    inputs
        .into_iter()
        .map(|input| {
            let output = output_dir.join(lossless_file_name(&input));
            let output = taken.insert(output.clone()).then_some(output);
            (input, output)
        })
        .collect()
}

/// Generate a default output path from an input path.
///
/// Example: `"photo.png"` becomes `"photo_cleaned.png"`; lossy inputs
/// such as `"photo.jpg"` become `"photo_cleaned.png"`.
#[must_use]
pub fn default_output_path(input: &Path) -> PathBuf {
    let stem = input.file_stem().unwrap_or_default().to_string_lossy();
    let ext = if is_lossless_extension(input) {
        input.extension().unwrap_or_default().to_string_lossy()
    } else {
        "png".into()
    };
    let parent = input.parent().unwrap_or(Path::new("."));
    parent.join(format!("{stem}_cleaned.{ext}"))
}

/// Path of the highlighted copy written next to `output`.
///
/// Example: `"out/photo_cleaned.png"` becomes `"out/photo_cleaned_regions.png"`.
#[must_use]
pub fn overlay_path(output: &Path) -> PathBuf {
    let stem = output.file_stem().unwrap_or_default().to_string_lossy();
    let parent = output.parent().unwrap_or(Path::new("."));
    parent.join(format!("{stem}_regions.png"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::region::ProbeCorner;
    use image::Rgba;

    #[test]
    fn default_output_path_appends_cleaned_suffix() {
        let p = default_output_path(Path::new("/tmp/photo.png"));
        assert_eq!(p, PathBuf::from("/tmp/photo_cleaned.png"));

        let p = default_output_path(Path::new("image.webp"));
        assert_eq!(
            p.file_name().unwrap().to_str().unwrap(),
            "image_cleaned.webp"
        );
    }

    #[test]
    fn default_output_path_switches_lossy_to_png() {
        let p = default_output_path(Path::new("/tmp/photo.jpg"));
        assert_eq!(p, PathBuf::from("/tmp/photo_cleaned.png"));
    }

    #[test]
    fn overlay_path_sits_next_to_output() {
        let p = overlay_path(Path::new("/out/photo_cleaned.png"));
        assert_eq!(p, PathBuf::from("/out/photo_cleaned_regions.png"));
    }

    #[test]
    fn lossless_file_name_keeps_or_switches_extension() {
        assert_eq!(
            lossless_file_name(Path::new("/in/a.tiff")),
            PathBuf::from("a.tiff")
        );
        assert_eq!(
            lossless_file_name(Path::new("/in/b.JPEG")),
            PathBuf::from("b.JPEG.png")
        );
    }

    #[test]
    fn assign_outputs_keeps_shared_stems_apart() {
        let jobs = assign_outputs(
            vec![PathBuf::from("/in/photo.png"), PathBuf::from("/in/photo.jpg")],
            Path::new("/out"),
        );
        assert_eq!(jobs[0].0, PathBuf::from("/in/photo.jpg"));
        assert_eq!(jobs[0].1, Some(PathBuf::from("/out/photo.jpg.png")));
        assert_eq!(jobs[1].1, Some(PathBuf::from("/out/photo.png")));
    }

    #[test]
    fn assign_outputs_rejects_later_collisions() {
        let jobs = assign_outputs(
            vec![PathBuf::from("/in/a.jpg.png"), PathBuf::from("/in/a.jpg")],
            Path::new("/out"),
        );
        assert_eq!(jobs[0].1, Some(PathBuf::from("/out/a.jpg.png")));
        assert_eq!(jobs[1].1, None);
    }

    #[test]
    fn ensure_dir_reports_io_errors() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("plain.txt");
        std::fs::write(&file, b"x").unwrap();

        assert!(ensure_dir(Path::new("")).is_ok());
        assert!(ensure_dir(&dir.path().join("a").join("b")).is_ok());
        assert!(dir.path().join("a").join("b").is_dir());
        assert!(matches!(ensure_dir(&file.join("sub")), Err(Error::Io(_))));
    }

    #[test]
    fn is_supported_image_accepts_common_formats() {
        assert!(is_supported_image(Path::new("photo.jpg")));
        assert!(is_supported_image(Path::new("photo.JPEG")));
        assert!(is_supported_image(Path::new("photo.png")));
        assert!(is_supported_image(Path::new("photo.webp")));
        assert!(is_supported_image(Path::new("photo.bmp")));
        assert!(is_supported_image(Path::new("photo.gif")));
        assert!(is_supported_image(Path::new("photo.tif")));
    }

    #[test]
    fn is_supported_image_rejects_unsupported_formats() {
        assert!(!is_supported_image(Path::new("photo.txt")));
        assert!(!is_supported_image(Path::new("photo.svg")));
        assert!(!is_supported_image(Path::new("photo")));
    }

    #[test]
    fn save_image_rejects_lossy_and_unknown_formats() {
        let img = RgbaImage::new(2, 2);
        let dir = std::env::temp_dir();
        assert!(matches!(
            save_image(&img, &dir.join("never_written.jpg")),
            Err(Error::LossyFormat(_))
        ));
        assert!(matches!(
            save_image(&img, &dir.join("never_written.xyz")),
            Err(Error::UnsupportedFormat(_))
        ));
    }

    #[test]
    fn validate_rejects_out_of_range_threshold() {
        let opts = ProcessOptions {
            threshold: 1.5,
            ..ProcessOptions::default()
        };
        assert!(matches!(opts.validate(), Err(Error::InvalidThreshold(_))));
        assert!(ProcessOptions::default().validate().is_ok());
    }

    #[test]
    fn stage_percentages_increase() {
        let stages = [Stage::Loading, Stage::Detecting, Stage::Removing, Stage::Complete];
        assert!(stages.windows(2).all(|w| w[0].percent() < w[1].percent()));
        assert_eq!(Stage::Complete.percent(), 100);
    }

    #[test]
    fn explicit_regions_override_detection_and_are_clipped() {
        let img = RgbaImage::from_pixel(50, 40, Rgba([10, 200, 30, 255]));
        let opts = ProcessOptions {
            regions: vec![Region::new(40, 30, 20, 20), Region::new(60, 0, 5, 5)],
            ..ProcessOptions::default()
        };
        let regions = WatermarkProcessor::new().detect(&img, &opts);
        assert_eq!(regions, vec![Region::new(40, 30, 10, 10)]);
    }

    #[test]
    fn force_selects_all_probes() {
        let img = RgbaImage::from_pixel(200, 150, Rgba([10, 200, 30, 255]));
        let opts = ProcessOptions {
            force: true,
            ..ProcessOptions::default()
        };
        let regions = WatermarkProcessor::new().detect(&img, &opts);
        let rects: Vec<Region> = ProbeCorner::ALL.iter().map(|c| c.rect(200, 150)).collect();
        assert_eq!(regions.len(), 4);
        for (got, want) in regions.iter().zip(&rects) {
            assert_eq!((got.x, got.y), (want.x, want.y));
        }
    }

    #[test]
    fn process_image_reports_stages_in_order() {
        let img = RgbaImage::new(200, 150);
        let mut stages = Vec::new();
        let (_, regions) =
            WatermarkProcessor::new().process_image(&img, &ProcessOptions::default(), |s| {
                stages.push(s);
            });
        assert!(!regions.is_empty());
        assert_eq!(stages, vec![Stage::Detecting, Stage::Removing, Stage::Complete]);
    }

    #[test]
    fn process_image_without_regions_skips_removal() {
        let img = RgbaImage::from_pixel(200, 150, Rgba([10, 200, 30, 255]));
        let mut stages = Vec::new();
        let (cleaned, regions) =
            WatermarkProcessor::new().process_image(&img, &ProcessOptions::default(), |s| {
                stages.push(s);
            });
        assert!(regions.is_empty());
        assert_eq!(cleaned, img);
        assert_eq!(stages, vec![Stage::Detecting, Stage::Complete]);
    }

    #[test]
    fn result_serializes_regions() {
        let mut result = ProcessResult::new(Path::new("shot.png"));
        result.success = true;
        result.regions = vec![Region::new(120, 90, 80, 60).with_confidence(0.9)];
        let json: serde_json::Value = serde_json::from_str(&result.to_json().unwrap()).unwrap();
        assert_eq!(json["path"], "shot.png");
        assert_eq!(json["regions"][0]["x"], 120);
        assert_eq!(json["regions"][0]["height"], 60);
        assert!((json["regions"][0]["confidence"].as_f64().unwrap() - 0.9).abs() < 1e-12);
    }

    #[test]
    fn result_confidence_is_max_of_regions() {
        let mut result = ProcessResult::new(Path::new("x.png"));
        assert!(result.confidence().abs() < f64::EPSILON);
        result.regions = vec![
            Region::new(0, 0, 1, 1).with_confidence(0.75),
            Region::new(0, 0, 1, 1).with_confidence(0.9),
        ];
        assert!((result.confidence() - 0.9).abs() < f64::EPSILON);
    }
}
