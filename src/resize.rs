use crate::constants::JPEG_QUALITY;
use crate::error::{Result, ThumbError};
use crate::size::SizeSpec;
use image::codecs::jpeg::JpegEncoder;
use image::imageops::{self, FilterType};
use image::RgbImage;

/// Renders a cover-cropped JPEG thumbnail from raw image bytes.
///
/// # Arguments
/// * `bytes` - Encoded source image in any format the `image` crate decodes
/// * `size` - Exact output dimensions
///
/// # Returns
/// * `Ok(jpeg_bytes)` - JPEG at quality 78 with exactly `size` dimensions
/// * `Err(ThumbError::Decode)` - If the bytes are not a decodable image
pub fn render_thumbnail(bytes: &[u8], size: &SizeSpec) -> Result<Vec<u8>> {
    let img = image::load_from_memory(bytes).map_err(|e| ThumbError::Decode(e.to_string()))?;

    // Alpha, palette and greyscale inputs all collapse to plain RGB.
    let cropped = cover_crop(&img.to_rgb8(), size);
    encode_jpeg(&cropped)
}

/// Scales the source image by the smallest factor that covers the target box
/// in both dimensions, then center-crops to exactly
/// `size.width x size.height`.
///
/// The crop origin uses integer (floor) division, so the same input always
/// produces the same pixels.
pub fn cover_crop(src: &RgbImage, size: &SizeSpec) -> RgbImage {
    let (w, h) = src.dimensions();
    let scale = f64::max(
        size.width as f64 / w as f64,
        size.height as f64 / h as f64,
    );

    // Clamp up to the target box so rounding loss can never leave the resized
    // image smaller than the crop window.
    let new_w = ((w as f64 * scale).round() as u32).max(size.width);
    let new_h = ((h as f64 * scale).round() as u32).max(size.height);
    let resized = imageops::resize(src, new_w, new_h, FilterType::Lanczos3);

    let left = (new_w - size.width) / 2;
    let top = (new_h - size.height) / 2;
    imageops::crop_imm(&resized, left, top, size.width, size.height).to_image()
}

fn encode_jpeg(img: &RgbImage) -> Result<Vec<u8>> {
    let mut out = Vec::new();
    let mut encoder = JpegEncoder::new_with_quality(&mut out, JPEG_QUALITY);
    encoder.encode_image(img)?;
    Ok(out)
}
