use anyhow::{Context, Result};
use candle_core::{Device, Tensor};
use image::imageops::FilterType;
use image::RgbImage;
use serde::Deserialize;
use std::path::Path;

use crate::utils::image_utils;

/// Target size of the preprocessed image. Older checkpoint exports write
/// `"size": 384`, newer ones `"size": {"height": .., "width": ..}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum SizeConfig {
    Square(u32),
    Explicit { height: u32, width: u32 },
}

impl SizeConfig {
    pub fn height(&self) -> u32 {
        match self {
            SizeConfig::Square(s) => *s,
            SizeConfig::Explicit { height, .. } => *height,
        }
    }

    pub fn width(&self) -> u32 {
        match self {
            SizeConfig::Square(s) => *s,
            SizeConfig::Explicit { width, .. } => *width,
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_size() -> SizeConfig {
    SizeConfig::Square(384)
}

fn default_rescale_factor() -> f32 {
    1.0 / 255.0
}

fn default_mean() -> Vec<f32> {
    vec![0.5, 0.5, 0.5]
}

/// The subset of `preprocessor_config.json` a ViT-style image processor acts
/// on. Unknown keys are ignored.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ProcessorConfig {
    #[serde(default = "default_true")]
    pub do_resize: bool,
    #[serde(default = "default_size")]
    pub size: SizeConfig,
    #[serde(default = "default_true")]
    pub do_rescale: bool,
    #[serde(default = "default_rescale_factor")]
    pub rescale_factor: f32,
    #[serde(default = "default_true")]
    pub do_normalize: bool,
    #[serde(default = "default_mean")]
    pub image_mean: Vec<f32>,
    #[serde(default = "default_mean")]
    pub image_std: Vec<f32>,
}

impl Default for ProcessorConfig {
    fn default() -> Self {
        Self {
            do_resize: true,
            size: default_size(),
            do_rescale: true,
            rescale_factor: default_rescale_factor(),
            do_normalize: true,
            image_mean: default_mean(),
            image_std: default_mean(),
        }
    }
}

/// Turns an image file into the **B×C×H×W** f32 pixel tensor the vision
/// encoder expects: resize, rescale to [0, 1], channel-wise normalization.
pub struct ImageProcessor {
    config: ProcessorConfig,
}

impl ImageProcessor {
    pub fn new(config: ProcessorConfig) -> Self {
        Self { config }
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let data = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let config: ProcessorConfig = serde_json::from_str(&data)
            .with_context(|| format!("Failed to parse {}", path.display()))?;
        Ok(Self::new(config))
    }

    pub fn config(&self) -> &ProcessorConfig {
        &self.config
    }

    pub fn preprocess(&self, path: &Path, device: &Device) -> Result<Tensor> {
        let img = image_utils::load_rgb_image(path)?;
        self.preprocess_image(&img, device)
    }

    pub fn preprocess_image(&self, img: &RgbImage, device: &Device) -> Result<Tensor> {
        let (height, width) = (self.config.size.height(), self.config.size.width());
        let needs_resize =
            self.config.do_resize && img.dimensions() != (width, height);
        let resized;
        let img = if needs_resize {
            // resample=2 (PIL bilinear) in checkpoint configs
            resized = image::imageops::resize(img, width, height, FilterType::Triangle);
            &resized
        } else {
            img
        };

        let mut tensor = image_utils::rgb_image_to_chw_tensor(img, device)?;

        if self.config.do_rescale {
            tensor = (tensor * self.config.rescale_factor as f64)?;
        }

        if self.config.do_normalize {
            let mean = Tensor::from_slice(self.config.image_mean.as_slice(), (3, 1, 1), device)?;
            let std = Tensor::from_slice(self.config.image_std.as_slice(), (3, 1, 1), device)?;
            tensor = tensor.broadcast_sub(&mean)?.broadcast_div(&std)?;
        }

        Ok(tensor.unsqueeze(0)?)
    }
}
