//! Decode, downscale and re-encode uploaded images as JPEG.

use image::{codecs::jpeg::JpegEncoder, imageops::FilterType, DynamicImage};

use crate::error::AppError;

/// Fits the image inside `max_dimension` on both axes (never upscaling) and encodes it as
/// JPEG at `quality`. Alpha is dropped.
pub fn compress(data: &[u8], max_dimension: u32, quality: u8) -> Result<Vec<u8>, AppError> {
    let img = image::load_from_memory(data).map_err(|e| AppError::Validation(format!("invalid image: {}", e)))?;
    let img = if img.width() > max_dimension || img.height() > max_dimension {
        img.resize(max_dimension, max_dimension, FilterType::Lanczos3)
    } else {
        img
    };
    let rgb = DynamicImage::ImageRgb8(img.to_rgb8());

    let mut buffer = Vec::new();
    let encoder = JpegEncoder::new_with_quality(&mut buffer, quality);
    rgb.write_with_encoder(encoder)
        .map_err(|e| AppError::Internal(format!("failed to encode image: {}", e)))?;
    Ok(buffer)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageFormat, Rgba, RgbaImage};
    use std::io::Cursor;

    fn png(width: u32, height: u32) -> Vec<u8> {
        let img = RgbaImage::from_pixel(width, height, Rgba([200, 40, 40, 128]));
        let mut out = Vec::new();
        DynamicImage::ImageRgba8(img)
            .write_to(&mut Cursor::new(&mut out), ImageFormat::Png)
            .unwrap();
        out
    }

    #[test]
    fn large_images_fit_the_bounding_box() {
        let jpeg = compress(&png(1600, 400), 800, 80).unwrap();
        assert_eq!(image::guess_format(&jpeg).unwrap(), ImageFormat::Jpeg);
        let decoded = image::load_from_memory(&jpeg).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (800, 200));
    }

    #[test]
    fn small_images_keep_their_size() {
        let decoded = image::load_from_memory(&compress(&png(120, 90), 800, 80).unwrap()).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (120, 90));
    }

    #[test]
    fn garbage_is_a_validation_error() {
        let err = compress(b"definitely not an image", 800, 80).unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }
}
