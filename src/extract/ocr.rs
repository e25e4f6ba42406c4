//! Image text extraction
//!
//! Boundary to the OCR engine. Images are normalized before recognition:
//! oversized photos are downscaled, converted to grayscale, upscaled toward
//! a 300 DPI estimate and binarized. Tesseract reads phone photos of book
//! pages far more reliably after this pipeline.

use async_trait::async_trait;
use image::{imageops::FilterType, DynamicImage, GrayImage};
use uuid::Uuid;

/// Largest dimension fed to the OCR engine.
const MAX_DIMENSION: u32 = 2000;

/// Target DPI for the upscale step, against an assumed 72 DPI source.
const TARGET_DPI: f32 = 300.0;
const ASSUMED_DPI: f32 = 72.0;

/// Binarization bias below the mean intensity.
const THRESHOLD_BIAS: u8 = 4;

/// Text extraction errors
#[derive(Debug, thiserror::Error)]
pub enum ExtractError {
    #[error("OCR engine not available: {0}")]
    EngineUnavailable(String),

    #[error("OCR processing failed: {0}")]
    Processing(String),
}

/// Text extraction backend
#[async_trait]
pub trait TextExtractor: Send + Sync {
    /// Check whether the extractor can run on this host.
    async fn is_available(&self) -> bool;

    /// Extract raw text from a decoded image.
    ///
    /// May degrade silently: poor-quality input yields poor-quality text
    /// rather than an error. No confidence signal is exposed.
    async fn extract(&self, image: &DynamicImage) -> Result<String, ExtractError>;
}

/// Normalize an image for recognition.
pub fn preprocess(image: &DynamicImage) -> GrayImage {
    let mut gray = image.to_luma8();

    // Phone photos routinely exceed what the engine needs.
    if gray.width().max(gray.height()) > MAX_DIMENSION {
        let shrink = MAX_DIMENSION as f32 / gray.width().max(gray.height()) as f32;
        gray = image::imageops::resize(
            &gray,
            ((gray.width() as f32 * shrink) as u32).max(1),
            ((gray.height() as f32 * shrink) as u32).max(1),
            FilterType::Triangle,
        );
    }

    // Upscale toward the target DPI, capped at 2x and the dimension limit.
    let scale = (TARGET_DPI / ASSUMED_DPI).min(2.0);
    let mut width = (gray.width() as f32 * scale) as u32;
    let mut height = (gray.height() as f32 * scale) as u32;
    if width.max(height) > MAX_DIMENSION {
        let shrink = MAX_DIMENSION as f32 / width.max(height) as f32;
        width = (width as f32 * shrink) as u32;
        height = (height as f32 * shrink) as u32;
    }
    let resized = image::imageops::resize(
        &gray,
        width.max(1),
        height.max(1),
        FilterType::CatmullRom,
    );

    // Binarize around the mean intensity.
    let total: u64 = resized.pixels().map(|p| p.0[0] as u64).sum();
    let count = (resized.width() as u64 * resized.height() as u64).max(1);
    let threshold = (total / count) as u8;
    let threshold = threshold.saturating_sub(THRESHOLD_BIAS);

    let mut binary = resized;
    for pixel in binary.pixels_mut() {
        pixel.0[0] = if pixel.0[0] >= threshold { 255 } else { 0 };
    }
    binary
}

/// Tesseract CLI extractor
pub struct TesseractExtractor {
    language: String,
}

impl TesseractExtractor {
    pub fn new(language: &str) -> Self {
        Self {
            language: language.to_string(),
        }
    }
}

impl Default for TesseractExtractor {
    fn default() -> Self {
        Self::new("eng")
    }
}

#[async_trait]
impl TextExtractor for TesseractExtractor {
    async fn is_available(&self) -> bool {
        std::process::Command::new("tesseract")
            .arg("--version")
            .output()
            .is_ok()
    }

    async fn extract(&self, image: &DynamicImage) -> Result<String, ExtractError> {
        use std::process::Command;

        let processed = preprocess(image);

        let temp_dir = std::env::temp_dir();
        let input_path = temp_dir.join(format!("ocr_input_{}.png", Uuid::new_v4()));
        let output_base = temp_dir.join(format!("ocr_output_{}", Uuid::new_v4()));

        processed
            .save(&input_path)
            .map_err(|e| ExtractError::Processing(format!("failed to write temp image: {e}")))?;

        let output = Command::new("tesseract")
            .arg(&input_path)
            .arg(&output_base)
            .arg("-l")
            .arg(&self.language)
            .arg("--oem")
            .arg("3")
            .arg("--psm")
            .arg("3")
            .output();

        let _ = std::fs::remove_file(&input_path);

        let output = output
            .map_err(|e| ExtractError::EngineUnavailable(format!("failed to run tesseract: {e}")))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(ExtractError::Processing(format!(
                "tesseract failed: {stderr}"
            )));
        }

        let output_file = format!("{}.txt", output_base.display());
        let text = std::fs::read_to_string(&output_file)
            .map_err(|e| ExtractError::Processing(format!("failed to read output: {e}")))?;
        let _ = std::fs::remove_file(&output_file);

        Ok(text.trim().to_string())
    }
}

/// Mock extractor for testing
#[cfg(test)]
pub struct MockExtractor {
    text: String,
    calls: std::sync::atomic::AtomicUsize,
}

#[cfg(test)]
impl MockExtractor {
    pub fn returning(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            calls: std::sync::atomic::AtomicUsize::new(0),
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(std::sync::atomic::Ordering::SeqCst)
    }
}

#[cfg(test)]
#[async_trait]
impl TextExtractor for MockExtractor {
    async fn is_available(&self) -> bool {
        true
    }

    async fn extract(&self, _image: &DynamicImage) -> Result<String, ExtractError> {
        self.calls
            .fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        Ok(self.text.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::RgbImage;

    #[test]
    fn test_preprocess_caps_dimensions() {
        let large = DynamicImage::ImageRgb8(RgbImage::new(4000, 1000));
        let processed = preprocess(&large);
        assert!(processed.width() <= MAX_DIMENSION);
        assert!(processed.height() <= MAX_DIMENSION);
    }

    #[test]
    fn test_preprocess_upscales_small_images() {
        let small = DynamicImage::ImageRgb8(RgbImage::new(100, 50));
        let processed = preprocess(&small);
        assert_eq!(processed.width(), 200);
        assert_eq!(processed.height(), 100);
    }

    #[test]
    fn test_preprocess_binarizes() {
        let mut img = RgbImage::new(10, 10);
        for (x, _, pixel) in img.enumerate_pixels_mut() {
            let value = if x < 5 { 30 } else { 220 };
            *pixel = image::Rgb([value, value, value]);
        }
        let processed = preprocess(&DynamicImage::ImageRgb8(img));
        assert!(processed.pixels().all(|p| p.0[0] == 0 || p.0[0] == 255));
    }
}
