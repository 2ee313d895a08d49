// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! Image loading for the vision prompt

use image::{DynamicImage, GenericImageView};
use std::path::Path;
use tracing::debug;

use super::ImagePayload;
use crate::Result;

/// Decode an image and prepare it as a request payload.
///
/// Decoding doubles as validation: unreadable images are an error. Large
/// images are downscaled and everything is re-encoded as JPEG; if that fails
/// the raw bytes are sent instead.
pub fn load_image(path: &Path, max_dimension: u32) -> Result<ImagePayload> {
    let img = image::open(path)?;
    let (width, height) = img.dimensions();
    debug!("Loaded image {:?} ({}x{})", path, width, height);

    match encode_jpeg(&img, max_dimension) {
        Ok(bytes) => Ok(ImagePayload::from_bytes("image/jpeg", &bytes)),
        Err(e) => {
            debug!("JPEG re-encoding failed ({}), sending original bytes", e);
            let raw = std::fs::read(path)?;
            Ok(ImagePayload::from_bytes(mime_for_path(path), &raw))
        }
    }
}

/// Resize to fit `max_dimension` on the longest side, then encode as JPEG
fn encode_jpeg(img: &DynamicImage, max_dimension: u32) -> Result<Vec<u8>> {
    let resized;
    let source = if img.width() > max_dimension || img.height() > max_dimension {
        resized = img.resize(max_dimension, max_dimension, image::imageops::FilterType::Triangle);
        &resized
    } else {
        img
    };

    // JPEG has no alpha channel
    let rgb = DynamicImage::ImageRgb8(source.to_rgb8());

    let mut buffer = Vec::new();
    rgb.write_to(&mut std::io::Cursor::new(&mut buffer), image::ImageFormat::Jpeg)?;
    Ok(buffer)
}

fn mime_for_path(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "bmp" => "image/bmp",
        "webp" => "image/webp",
        _ => "application/octet-stream",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use base64::{engine::general_purpose, Engine as _};

    fn decode_payload(payload: &ImagePayload) -> DynamicImage {
        let bytes = general_purpose::STANDARD.decode(&payload.data).unwrap();
        image::load_from_memory(&bytes).unwrap()
    }

    #[test]
    fn small_png_becomes_jpeg() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("chart.png");
        image::RgbaImage::from_pixel(16, 8, image::Rgba([10, 20, 30, 128]))
            .save(&path)
            .unwrap();

        let payload = load_image(&path, 1024).unwrap();
        assert_eq!(payload.mime_type, "image/jpeg");
        assert_eq!(decode_payload(&payload).dimensions(), (16, 8));
    }

    #[test]
    fn large_image_is_downscaled() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("poster.png");
        image::RgbImage::new(2048, 512).save(&path).unwrap();

        let payload = load_image(&path, 1024).unwrap();
        let (w, h) = decode_payload(&payload).dimensions();
        assert_eq!(w, 1024);
        assert!(h <= 256);
    }

    #[test]
    fn corrupt_image_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("photo.jpg");
        std::fs::write(&path, b"definitely not a jpeg").unwrap();
        assert!(load_image(&path, 1024).is_err());
    }

    #[test]
    fn mime_follows_extension() {
        assert_eq!(mime_for_path(Path::new("a.WEBP")), "image/webp");
        assert_eq!(mime_for_path(Path::new("a.bmp")), "image/bmp");
    }
}
