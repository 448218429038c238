use anyhow::{Context, Result};
use candle_core::{DType, Device, Tensor};
use image::imageops::FilterType;
use image::RgbImage;
use std::path::Path;

/// Opens an image file and normalizes it to 3-channel RGB.
pub fn load_rgb_image(path: impl AsRef<Path>) -> Result<RgbImage> {
    let img = image::ImageReader::open(path.as_ref())
        .with_context(|| format!("Failed to open image: {:?}", path.as_ref()))?
        .decode()
        .context("Image decoding failed")?
        .to_rgb8();
    Ok(img)
}

/// Converts an RGB image into a **C×H×W** f32 tensor with values in
/// [0, 255]. Rescaling to [0, 1] is the processor's job, driven by its
/// checkpoint configuration.
pub fn rgb_image_to_chw_tensor(img: &RgbImage, device: &Device) -> Result<Tensor> {
    let (width, height) = img.dimensions();
    let raw = img.as_raw().clone();
    let tensor = Tensor::from_vec(raw, (height as usize, width as usize, 3), device)?
        .to_dtype(DType::F32)?
        .permute((2, 0, 1))?;
    Ok(tensor)
}

/// Loads an image, resizes it, and returns a **B×C×H×W** tensor (batch=1,
/// channels=3) with values in [0, 1], ready for model input.
pub fn load_and_resize_image_to_tensor(
    path: impl AsRef<Path>,
    target_h: usize,
    target_w: usize,
    filter: FilterType,
    device: &Device,
) -> Result<Tensor> {
    let img = load_rgb_image(path)?;

    let (orig_w, orig_h) = img.dimensions();
    let needs_resize = orig_h as usize != target_h || orig_w as usize != target_w;
    let img = if needs_resize {
        image::imageops::resize(&img, target_w as u32, target_h as u32, filter)
    } else {
        img
    };

    let tensor = (rgb_image_to_chw_tensor(&img, device)? / 255.0)?;
    Ok(tensor.unsqueeze(0)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    #[test]
    fn chw_layout_and_range() -> Result<()> {
        let mut img = RgbImage::new(2, 1);
        img.put_pixel(0, 0, Rgb([255, 0, 0]));
        img.put_pixel(1, 0, Rgb([0, 255, 0]));

        let tensor = rgb_image_to_chw_tensor(&img, &Device::Cpu)?;
        assert_eq!(tensor.dims(), &[3, 1, 2]);

        let values = tensor.flatten_all()?.to_vec1::<f32>()?;
        // channel-major: R plane, then G, then B
        assert_eq!(values, vec![255.0, 0.0, 0.0, 255.0, 0.0, 0.0]);
        Ok(())
    }

    #[test]
    fn load_and_resize_shapes_output() -> Result<()> {
        let img = RgbImage::from_pixel(4, 6, Rgb([128, 128, 128]));
        let path = std::env::temp_dir().join(format!(
            "scrawl-image-utils-{}-resize.png",
            std::process::id()
        ));
        img.save(&path)?;

        let tensor =
            load_and_resize_image_to_tensor(&path, 8, 8, FilterType::Triangle, &Device::Cpu)?;
        std::fs::remove_file(&path).ok();

        assert_eq!(tensor.dims(), &[1, 3, 8, 8]);
        let values = tensor.flatten_all()?.to_vec1::<f32>()?;
        assert!(values.iter().all(|v| (v - 128.0 / 255.0).abs() < 1e-5));
        Ok(())
    }

    #[test]
    fn missing_file_is_an_error() {
        let result = load_rgb_image("/definitely/not/here.png");
        assert!(result.is_err());
    }
}
