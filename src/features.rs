//! Photometric features of wallpaper images.
//!
//! Two numbers describe a wallpaper for brightness classification:
//! - **kurtosis**: excess kurtosis of the pixel intensity distribution. Dark
//!   images with a few bright spots score high, evenly lit images low.
//! - **lightness**: HSL lightness of the image's average colour, in `[0, 1]`.

use image::ImageError;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Values below this variance are treated as a flat image.
const FLAT_VARIANCE: f64 = 1e-12;

/// Features extracted from one image.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Features {
    pub kurtosis: f64,
    pub lightness: f64,
}

/// Why features could not be extracted. Always recoverable: the scanner skips
/// the file and moves on.
#[derive(Debug, Error)]
pub enum FeatureError {
    #[error("Cannot read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Cannot decode {}: {source}", path.display())]
    Decode {
        path: PathBuf,
        #[source]
        source: ImageError,
    },

    #[error("{} has no pixels", .0.display())]
    EmptyImage(PathBuf),
}

/// Turns an image file into [`Features`].
pub trait FeatureExtractor {
    /// Extract features from the image at `path`.
    ///
    /// # Errors
    ///
    /// Returns a [`FeatureError`] for unreadable, corrupt or unsupported files.
    fn extract(&self, path: &Path) -> Result<Features, FeatureError>;
}

/// Default extractor: decodes the whole image and computes the statistics
/// over every RGB sample.
#[derive(Debug, Default, Clone, Copy)]
pub struct ImageStatistics;

impl FeatureExtractor for ImageStatistics {
    fn extract(&self, path: &Path) -> Result<Features, FeatureError> {
        let img = image::open(path).map_err(|err| match err {
            ImageError::IoError(source) => FeatureError::Io { path: path.to_path_buf(), source },
            source => FeatureError::Decode { path: path.to_path_buf(), source },
        })?;

        let rgb = img.to_rgb8();
        rgb_statistics(rgb.as_raw()).ok_or_else(|| FeatureError::EmptyImage(path.to_path_buf()))
    }
}

/// Compute features from interleaved 8-bit RGB samples.
///
/// Returns `None` for an empty buffer.
#[must_use]
pub fn rgb_statistics(samples: &[u8]) -> Option<Features> {
    let pixels = samples.len() / 3;
    if pixels == 0 {
        return None;
    }
    let samples = &samples[..pixels * 3];

    let mut channel_sums = [0.0f64; 3];
    let mut total = 0.0;
    for px in samples.chunks_exact(3) {
        for (sum, &value) in channel_sums.iter_mut().zip(px) {
            let v = f64::from(value) / 255.0;
            *sum += v;
            total += v;
        }
    }

    let n = samples.len() as f64;
    let mean = total / n;
    let (m2, m4) = samples.iter().fold((0.0, 0.0), |(m2, m4), &value| {
        let d = f64::from(value) / 255.0 - mean;
        let d2 = d * d;
        (m2 + d2, m4 + d2 * d2)
    });
    let (m2, m4) = (m2 / n, m4 / n);

    let kurtosis = if m2 < FLAT_VARIANCE { 0.0 } else { m4 / (m2 * m2) - 3.0 };

    let average = channel_sums.map(|sum| sum / pixels as f64);
    let max = average.iter().copied().fold(f64::MIN, f64::max);
    let min = average.iter().copied().fold(f64::MAX, f64::min);

    Some(Features { kurtosis, lightness: (max + min) / 2.0 })
}
