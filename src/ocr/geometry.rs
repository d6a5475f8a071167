//! Watermark crop geometry.
//!
//! The crop box is calibrated on one reference width and scaled linearly to
//! whatever resolution the device recorded at.

use anyhow::{bail, Context, Result};
use image::{DynamicImage, GenericImageView, ImageFormat};
use std::io::Cursor;

use crate::config::{CropBox, WatermarkConfig};

/// The watermark crop, decoded and PNG-encoded.
///
/// Some engines want pixels, others want an encoded file; both views are
/// built once per image.
#[derive(Clone)]
pub struct CroppedRegion {
    pub image: DynamicImage,
    pub png: Vec<u8>,
}

impl CroppedRegion {
    pub fn new(image: DynamicImage) -> Result<Self> {
        let mut png = Vec::new();
        image
            .write_to(&mut Cursor::new(&mut png), ImageFormat::Png)
            .context("Failed to encode crop as PNG")?;
        Ok(Self { image, png })
    }

    pub fn dimensions(&self) -> (u32, u32) {
        self.image.dimensions()
    }
}

/// Maps the reference crop box onto an image `actual_width` pixels wide.
///
/// Every coordinate, vertical ones included, is multiplied by
/// `actual_width / reference_width` and truncated toward zero. Equal widths
/// return the reference box untouched.
pub fn scale_crop_box(reference: CropBox, reference_width: u32, actual_width: u32) -> CropBox {
    if actual_width == reference_width || reference_width == 0 {
        return reference;
    }

    let ratio = actual_width as f64 / reference_width as f64;
    let scale = |v: u32| (v as f64 * ratio) as u32;

    CropBox {
        left: scale(reference.left),
        top: scale(reference.top),
        right: scale(reference.right),
        bottom: scale(reference.bottom),
    }
}

/// Clamps a box to image bounds. An empty result is an error.
pub fn clamp_to_image(crop: CropBox, width: u32, height: u32) -> Result<CropBox> {
    let clamped = CropBox {
        left: crop.left.min(width),
        top: crop.top.min(height),
        right: crop.right.min(width),
        bottom: crop.bottom.min(height),
    };

    if clamped.right <= clamped.left || clamped.bottom <= clamped.top {
        bail!(
            "Crop box {:?} falls outside the {}x{} image",
            crop,
            width,
            height
        );
    }

    Ok(clamped)
}

/// Cuts the watermark region out of a decoded frame.
pub fn crop_watermark(img: &DynamicImage, watermark: &WatermarkConfig) -> Result<CroppedRegion> {
    let (width, height) = img.dimensions();
    if width == 0 || height == 0 {
        bail!("Image has no pixels");
    }

    let scaled = scale_crop_box(watermark.crop_box, watermark.reference_width, width);
    let crop = clamp_to_image(scaled, width, height)?;

    let region = img.crop_imm(
        crop.left,
        crop.top,
        crop.right - crop.left,
        crop.bottom - crop.top,
    );

    CroppedRegion::new(region)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageBuffer, Rgba};

    const REFERENCE: CropBox = CropBox {
        left: 16,
        top: 38,
        right: 349,
        bottom: 89,
    };

    #[test]
    fn test_same_width_returns_reference() {
        assert_eq!(scale_crop_box(REFERENCE, 2560, 2560), REFERENCE);
    }

    #[test]
    fn test_half_width_scales_every_coordinate() {
        let scaled = scale_crop_box(REFERENCE, 2560, 1280);
        // 349 / 2 = 174.5 and 89 / 2 = 44.5 truncate down
        assert_eq!(scaled, CropBox::new(8, 19, 174, 44));
    }

    #[test]
    fn test_scaling_is_linear_within_rounding() {
        for (actual, k) in [(1920u32, 0.75f64), (3840, 1.5), (5120, 2.0), (640, 0.25)] {
            let scaled = scale_crop_box(REFERENCE, 2560, actual);
            let pairs = [
                (scaled.left, REFERENCE.left),
                (scaled.top, REFERENCE.top),
                (scaled.right, REFERENCE.right),
                (scaled.bottom, REFERENCE.bottom),
            ];
            for (got, reference) in pairs {
                let expected = reference as f64 * k;
                assert!(
                    (got as f64 - expected).abs() < 1.0,
                    "width {}: {} vs {}",
                    actual,
                    got,
                    expected
                );
            }
        }
    }

    #[test]
    fn test_clamp_trims_overhang() {
        let crop = CropBox::new(90, 5, 150, 60);
        let clamped = clamp_to_image(crop, 100, 50).unwrap();
        assert_eq!(clamped, CropBox::new(90, 5, 100, 50));
    }

    #[test]
    fn test_clamp_rejects_box_outside_image() {
        let crop = CropBox::new(120, 5, 150, 60);
        assert!(clamp_to_image(crop, 100, 50).is_err());
    }

    #[test]
    fn test_crop_watermark_picks_reference_pixels() {
        let img: ImageBuffer<Rgba<u8>, Vec<u8>> =
            ImageBuffer::from_fn(400, 120, |x, y| Rgba([x as u8, y as u8, 0, 255]));
        let watermark = WatermarkConfig {
            reference_width: 400,
            crop_box: CropBox::new(10, 20, 60, 40),
            ..WatermarkConfig::default()
        };

        let region = crop_watermark(&DynamicImage::ImageRgba8(img), &watermark).unwrap();
        assert_eq!(region.dimensions(), (50, 20));

        let top_left = region.image.get_pixel(0, 0);
        assert_eq!(top_left[0], 10);
        assert_eq!(top_left[1], 20);

        // The encoded copy decodes to the same crop
        let decoded = image::load_from_memory(&region.png).unwrap();
        assert_eq!(decoded.dimensions(), (50, 20));
    }

    #[test]
    fn test_crop_watermark_scales_with_width() {
        let img: ImageBuffer<Rgba<u8>, Vec<u8>> = ImageBuffer::new(1280, 720);
        let region =
            crop_watermark(&DynamicImage::ImageRgba8(img), &WatermarkConfig::default()).unwrap();
        assert_eq!(region.dimensions(), (174 - 8, 44 - 19));
    }

    #[test]
    fn test_crop_watermark_rejects_tiny_image() {
        let img: ImageBuffer<Rgba<u8>, Vec<u8>> = ImageBuffer::new(4, 4);
        let watermark = WatermarkConfig {
            reference_width: 4,
            ..WatermarkConfig::default()
        };
        assert!(crop_watermark(&DynamicImage::ImageRgba8(img), &watermark).is_err());
    }
}
