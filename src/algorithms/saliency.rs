//! Local heuristic landmark extraction.
//!
//! Finds the visually dominant subject of a photo without any trained
//! model: luminance contrast against the frame mean plus local gradient
//! energy form a saliency map, which is smoothed, thresholded and reduced
//! to its weighted centroid.

use async_trait::async_trait;
use image::imageops::{self, FilterType};
use image::GrayImage;
use ndarray::{Array1, Array2};
use rayon::prelude::*;
use std::sync::Arc;
use tracing::{debug, trace};

use crate::config::{ImageConfig, LocalExtractorConfig};
use crate::data::load_image;
use crate::error::{AlignError, AlignResult};
use crate::pipeline::{ExtractorFactory, ImageHandle, Landmark, SignalExtractor};

pub const SUBJECT_CENTROID: &str = "subject_centroid";

/// Reusable saliency resources, built once per process.
pub struct SaliencyModel {
    config: LocalExtractorConfig,
    kernel: Array1<f32>,
}

impl SaliencyModel {
    pub fn new(config: LocalExtractorConfig) -> AlignResult<Self> {
        config
            .validate()
            .map_err(|errors| AlignError::ContractViolation(errors.join("; ")))?;
        let kernel = gaussian_kernel(config.smoothing_sigma);
        debug!(
            working_size = config.working_size,
            kernel_len = kernel.len(),
            "Saliency model built"
        );
        Ok(Self { config, kernel })
    }

    /// Locate the subject centroid, or `None` when nothing stands out.
    pub fn locate(&self, image: &GrayImage) -> Option<Landmark> {
        let working = self.downscale(image);
        let (width, height) = working.dimensions();
        let luma = to_array(&working);

        let (mean, std) = mean_std(luma.iter().copied());
        if std < self.config.min_contrast {
            trace!(std, min_contrast = self.config.min_contrast, "Image too flat");
            return None;
        }

        let saliency = self.smooth(&saliency_map(&luma, mean));
        let (s_mean, s_std) = mean_std(saliency.iter().copied());
        let threshold = s_mean + self.config.threshold_sigma * s_std;

        let mut sum_w = 0.0f64;
        let mut sum_x = 0.0f64;
        let mut sum_y = 0.0f64;
        let mut foreground = 0usize;
        for ((y, x), &s) in saliency.indexed_iter() {
            if s > threshold {
                let w = (s - threshold) as f64;
                sum_w += w;
                sum_x += w * (x as f64 + 0.5);
                sum_y += w * (y as f64 + 0.5);
                foreground += 1;
            }
        }

        let fraction = foreground as f32 / (width * height) as f32;
        if sum_w <= 0.0 || fraction < self.config.min_foreground_fraction {
            trace!(fraction, "Foreground too small");
            return None;
        }

        let cx = (sum_x / sum_w) as f32;
        let cy = (sum_y / sum_w) as f32;
        debug!(cx, cy, fraction, "Subject centroid located");
        Landmark::from_pixel(SUBJECT_CENTROID, cx, cy, width, height).ok()
    }

    fn downscale(&self, image: &GrayImage) -> GrayImage {
        let (width, height) = image.dimensions();
        let longest = width.max(height);
        if longest <= self.config.working_size {
            return image.clone();
        }
        let scale = self.config.working_size as f32 / longest as f32;
        let new_width = ((width as f32 * scale).round() as u32).max(1);
        let new_height = ((height as f32 * scale).round() as u32).max(1);
        imageops::resize(image, new_width, new_height, FilterType::Triangle)
    }

    /// Separable Gaussian blur with clamped borders
    fn smooth(&self, map: &Array2<f32>) -> Array2<f32> {
        if self.kernel.len() <= 1 {
            return map.clone();
        }
        let (height, width) = map.dim();
        let radius = (self.kernel.len() / 2) as isize;
        let kernel = &self.kernel;

        let mut horizontal: Array2<f32> = Array2::zeros((height, width));
        for y in 0..height {
            for x in 0..width {
                let mut acc = 0.0f32;
                for (k, weight) in kernel.iter().enumerate() {
                    let sx = clamp_index(x as isize + k as isize - radius, width);
                    acc += weight * map[[y, sx]];
                }
                horizontal[[y, x]] = acc;
            }
        }

        let mut out: Array2<f32> = Array2::zeros((height, width));
        for y in 0..height {
            for x in 0..width {
                let mut acc = 0.0f32;
                for (k, weight) in kernel.iter().enumerate() {
                    let sy = clamp_index(y as isize + k as isize - radius, height);
                    acc += weight * horizontal[[sy, x]];
                }
                out[[y, x]] = acc;
            }
        }
        out
    }
}

/// Normalized 1D Gaussian kernel covering three standard deviations
fn gaussian_kernel(sigma: f32) -> Array1<f32> {
    if sigma <= 0.0 {
        return Array1::from_elem(1, 1.0);
    }
    let radius = (3.0 * sigma).ceil() as isize;
    let mut kernel = Array1::from_iter(
        (-radius..=radius).map(|i| (-((i * i) as f32) / (2.0 * sigma * sigma)).exp()),
    );
    let sum = kernel.sum();
    kernel.mapv_inplace(|v| v / sum);
    kernel
}

fn clamp_index(i: isize, len: usize) -> usize {
    i.clamp(0, len as isize - 1) as usize
}

fn to_array(image: &GrayImage) -> Array2<f32> {
    let (width, height) = image.dimensions();
    Array2::from_shape_fn((height as usize, width as usize), |(y, x)| {
        image.get_pixel(x as u32, y as u32)[0] as f32
    })
}

fn mean_std(values: impl Iterator<Item = f32>) -> (f32, f32) {
    let mut count = 0usize;
    let mut sum = 0.0f64;
    let mut sum_sq = 0.0f64;
    for v in values {
        count += 1;
        sum += v as f64;
        sum_sq += (v as f64) * (v as f64);
    }
    if count == 0 {
        return (0.0, 0.0);
    }
    let mean = sum / count as f64;
    let variance = (sum_sq / count as f64 - mean * mean).max(0.0);
    (mean as f32, variance.sqrt() as f32)
}

/// Contrast against the frame mean plus central-difference gradient magnitude
fn saliency_map(luma: &Array2<f32>, mean: f32) -> Array2<f32> {
    let (height, width) = luma.dim();
    let rows: Vec<f32> = (0..height)
        .into_par_iter()
        .flat_map_iter(|y| {
            (0..width).map(move |x| {
                let left = luma[[y, clamp_index(x as isize - 1, width)]];
                let right = luma[[y, clamp_index(x as isize + 1, width)]];
                let up = luma[[clamp_index(y as isize - 1, height), x]];
                let down = luma[[clamp_index(y as isize + 1, height), x]];
                let gx = (right - left) * 0.5;
                let gy = (down - up) * 0.5;
                (luma[[y, x]] - mean).abs() + (gx * gx + gy * gy).sqrt()
            })
        })
        .collect();

    // rows holds exactly height * width values in row-major order
    Array2::from_shape_vec((height, width), rows).unwrap_or_else(|_| Array2::zeros((height, width)))
}

/// Extractor backed by [`SaliencyModel`], running on the blocking pool.
pub struct SaliencyExtractor {
    model: Arc<SaliencyModel>,
    limits: ImageConfig,
}

impl SaliencyExtractor {
    pub fn new(model: Arc<SaliencyModel>, limits: ImageConfig) -> Self {
        Self { model, limits }
    }
}

#[async_trait]
impl SignalExtractor for SaliencyExtractor {
    fn name(&self) -> &str {
        "saliency"
    }

    async fn extract(&self, image: &ImageHandle) -> AlignResult<Option<Landmark>> {
        let model = Arc::clone(&self.model);
        let limits = self.limits.clone();
        let handle = image.clone();

        tokio::task::spawn_blocking(move || -> AlignResult<Option<Landmark>> {
            let gray = load_image(&handle, &limits)?;
            Ok(model.locate(&gray))
        })
        .await
        .map_err(|e| AlignError::DetectorUnavailable(format!("extraction task failed: {e}")))?
    }
}

/// Builds the local saliency extractor.
pub struct LocalSaliencyFactory {
    config: LocalExtractorConfig,
    limits: ImageConfig,
}

impl LocalSaliencyFactory {
    pub fn new(config: LocalExtractorConfig, limits: ImageConfig) -> Self {
        Self { config, limits }
    }
}

#[async_trait]
impl ExtractorFactory for LocalSaliencyFactory {
    fn backend(&self) -> &str {
        "local"
    }

    async fn initialize(&self) -> AlignResult<Arc<dyn SignalExtractor>> {
        let model = Arc::new(SaliencyModel::new(self.config.clone())?);
        Ok(Arc::new(SaliencyExtractor::new(model, self.limits.clone())))
    }
}
