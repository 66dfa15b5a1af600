// ============================================================
// Layer 4 — Image Preprocessor (Decode Stage)
// ============================================================
// Turns one image file into one ImageTensor:
//
//   1. Decode the file (TIFF, PNG, JPEG, ... via the image crate)
//   2. Convert to 8-bit RGB (drops alpha, expands greyscale)
//   3. Resize to the configured square with bilinear filtering
//      (FilterType::Triangle is the image crate's bilinear)
//   4. Divide every channel value by 255 → [0, 1]
//
// Failure policy: a missing, unreadable or undecodable file is a
// DecodeError naming the sample id. There is no zero-tensor
// fallback.
//
// The preprocessor holds only its target size, so it is Send +
// Sync and many samples can be decoded at once (see batcher.rs).
//
// Reference: image crate documentation (imageops::resize)

use image::imageops::{self, FilterType};

use crate::domain::error::{PipelineError, PipelineResult};
use crate::domain::image::ImageTensor;
use crate::domain::sample::ImageRef;

/// Default side length of the square network input.
pub const DEFAULT_IMAGE_SIZE: u32 = 96;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImagePreprocessor {
    height: u32,
    width:  u32,
}

impl Default for ImagePreprocessor {
    fn default() -> Self {
        Self::square(DEFAULT_IMAGE_SIZE)
    }
}

impl ImagePreprocessor {
    /// Square output of `size × size`. A size of 0 is clamped to 1;
    /// callers validate the configured size first.
    pub fn square(size: u32) -> Self {
        let size = size.max(1);
        Self { height: size, width: size }
    }

    /// Decode, resize and normalise the image behind `image`.
    pub fn decode(&self, image: &ImageRef) -> PipelineResult<ImageTensor> {
        let decode_err = |reason: String| PipelineError::Decode {
            id:   image.id.clone(),
            path: image.path.clone(),
            reason,
        };

        let rgb = image::open(&image.path)
            .map_err(|e| decode_err(e.to_string()))?
            .to_rgb8();

        let rgb = if rgb.dimensions() == (self.width, self.height) {
            rgb
        } else {
            imageops::resize(&rgb, self.width, self.height, FilterType::Triangle)
        };

        let data: Vec<f32> = rgb
            .into_raw()
            .into_iter()
            .map(|v| v as f32 / 255.0)
            .collect();

        ImageTensor::from_hwc(self.height as usize, self.width as usize, data)
            .ok_or_else(|| decode_err("decoded buffer has unexpected length".into()))
    }
}
