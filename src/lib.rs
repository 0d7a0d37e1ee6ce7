//! Detect corner watermarks with pixel statistics and erase them by
//! local-average inpainting.
//!
//! Four fixed 80x60 probes, one per image corner, are scored from the share
//! of transparent, grayscale and edge-like pixels they contain. Probes above
//! the confidence threshold are reported as [`Region`]s and can be filled
//! with the mean colour of each pixel's 11x11 neighbourhood.
//!
//! # Quick Start
//!
//! ```no_run
//! use corner_watermark_removal::{detect, remove};
//!
//! let img = image::open("photo.png").unwrap().to_rgba8();
//! let regions = detect(&img);
//! let cleaned = remove(&img, &regions);
//! cleaned.save("cleaned.png").unwrap();
//! ```
//!
//! # Detection
//!
//! Regions come back in probe order (bottom-right, bottom-left, top-right,
//! top-left) with their confidence, ready to draw as overlays.
//!
//! ```no_run
//! use corner_watermark_removal::detect;
//!
//! let img = image::open("photo.png").unwrap().to_rgba8();
//! for region in detect(&img) {
//!     println!("{region}");
//! }
//! ```

#![deny(missing_docs)]

pub mod detection;
mod engine;
pub mod error;
pub mod inpaint;
pub mod overlay;
pub mod region;

pub use detection::{detect, detect_with_threshold, DETECTION_THRESHOLD};
pub use engine::{
    default_output_path, is_supported_image, load_image, overlay_path, save_image,
    ProcessOptions, ProcessResult, Stage, WatermarkProcessor,
};
pub use error::{Error, Result};
pub use inpaint::{remove, remove_with_mode, FillMode};
pub use region::{ProbeCorner, Region};
