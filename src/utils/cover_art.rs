//! Cover art decoding, resizing and embedding
//!
//! Covers are stored as baseline JPEG no larger than 1200x1200 and about
//! 1 MiB, which every common player accepts.

use anyhow::{Context, Result};
use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::{DynamicImage, ImageReader};
use lofty::picture::{MimeType, Picture, PictureType};
use lofty::prelude::*;
use lofty::probe::Probe;
use lofty::tag::Tag;
use std::io::Cursor;
use std::path::Path;
use tracing::debug;

/// Maximum dimension for embedded covers (width or height)
const MAX_COVER_SIZE: u32 = 1200;

const JPEG_QUALITY: u8 = 90;

/// Re-encode with lower quality above this size
const MAX_COVER_BYTES: usize = 1024 * 1024;

/// A cover ready to embed
#[derive(Debug, Clone)]
pub struct ProcessedCover {
    pub jpeg: Vec<u8>,
    pub width: u32,
    pub height: u32,
}

/// Basic facts about an image, used by the review preview
#[derive(Debug, Clone, PartialEq)]
pub struct ImageSummary {
    pub width: u32,
    pub height: u32,
    pub format: String,
    pub bytes: usize,
}

/// Decode, shrink to fit and re-encode cover art as JPEG
pub fn process_cover_art(data: &[u8]) -> Result<ProcessedCover> {
    let img = ImageReader::new(Cursor::new(data))
        .with_guessed_format()
        .context("Failed to guess image format")?
        .decode()
        .context("Failed to decode cover art")?;

    let img = resize_to_fit(img);

    let mut quality = JPEG_QUALITY;
    loop {
        let mut output = Vec::new();
        let mut encoder = JpegEncoder::new_with_quality(&mut output, quality);
        encoder
            .encode_image(&img)
            .context("Failed to encode cover art as JPEG")?;

        if output.len() <= MAX_COVER_BYTES || quality <= 60 {
            debug!(
                "Processed cover art: {}x{} -> {} bytes (quality {})",
                img.width(),
                img.height(),
                output.len(),
                quality
            );
            return Ok(ProcessedCover {
                jpeg: output,
                width: img.width(),
                height: img.height(),
            });
        }

        debug!("Cover art too large ({} bytes), reducing quality", output.len());
        quality -= 10;
    }
}

/// Resize image to fit within MAX_COVER_SIZE while maintaining aspect ratio
fn resize_to_fit(img: DynamicImage) -> DynamicImage {
    let (width, height) = (img.width(), img.height());

    if width <= MAX_COVER_SIZE && height <= MAX_COVER_SIZE {
        return img;
    }

    let (new_width, new_height) = if width > height {
        let ratio = MAX_COVER_SIZE as f64 / width as f64;
        (MAX_COVER_SIZE, (height as f64 * ratio) as u32)
    } else {
        let ratio = MAX_COVER_SIZE as f64 / height as f64;
        ((width as f64 * ratio) as u32, MAX_COVER_SIZE)
    };

    debug!(
        "Resizing cover art: {}x{} -> {}x{}",
        width, height, new_width, new_height
    );

    img.resize(new_width, new_height, FilterType::Lanczos3)
}

/// Replace the front cover in a tag
pub fn set_front_cover(tag: &mut Tag, cover: &ProcessedCover) {
    tag.remove_picture_type(PictureType::CoverFront);
    tag.push_picture(Picture::new_unchecked(
        PictureType::CoverFront,
        Some(MimeType::Jpeg),
        Some("Cover".to_string()),
        cover.jpeg.clone(),
    ));
}

/// Pixel size of the cover embedded in an audio file
///
/// Prefers the front cover and falls back to the first picture of any type.
pub fn embedded_cover_dimensions(audio_path: &Path) -> Result<(u32, u32)> {
    let tagged_file = Probe::open(audio_path)
        .context("Failed to open audio file")?
        .read()
        .context("Failed to read audio file tags")?;

    let pictures: Vec<&Picture> = tagged_file
        .tags()
        .iter()
        .flat_map(|tag| tag.pictures())
        .collect();

    let picture = pictures
        .iter()
        .find(|p| p.pic_type() == PictureType::CoverFront)
        .or_else(|| pictures.first())
        .context("No embedded cover art")?;

    let dimensions = ImageReader::new(Cursor::new(picture.data()))
        .with_guessed_format()
        .context("Failed to guess embedded cover format")?
        .into_dimensions()
        .context("Failed to read embedded cover dimensions")?;

    Ok(dimensions)
}

/// Inspect image bytes without fully decoding them
pub fn describe_image(data: &[u8]) -> Result<ImageSummary> {
    let reader = ImageReader::new(Cursor::new(data))
        .with_guessed_format()
        .context("Failed to guess image format")?;

    let format = reader
        .format()
        .map(|f| format!("{:?}", f).to_uppercase())
        .unwrap_or_else(|| "UNKNOWN".to_string());

    let (width, height) = reader
        .into_dimensions()
        .context("Failed to read image dimensions")?;

    Ok(ImageSummary {
        width,
        height,
        format,
        bytes: data.len(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::ImageFormat;

    fn png_bytes(width: u32, height: u32) -> Vec<u8> {
        let img = DynamicImage::new_rgb8(width, height);
        let mut out = Cursor::new(Vec::new());
        img.write_to(&mut out, ImageFormat::Png).unwrap();
        out.into_inner()
    }

    #[test]
    fn test_resize_small_image() {
        let img = DynamicImage::new_rgb8(500, 500);
        let resized = resize_to_fit(img);
        assert_eq!((resized.width(), resized.height()), (500, 500));
    }

    #[test]
    fn test_resize_large_image() {
        let img = DynamicImage::new_rgb8(3000, 2000);
        let resized = resize_to_fit(img);
        assert_eq!(resized.width(), MAX_COVER_SIZE);
        assert!(resized.height() <= MAX_COVER_SIZE);
    }

    #[test]
    fn test_process_png_to_jpeg() {
        let cover = process_cover_art(&png_bytes(1600, 1600)).unwrap();
        assert_eq!((cover.width, cover.height), (1200, 1200));
        assert_eq!(&cover.jpeg[..2], &[0xFF, 0xD8]);
    }

    #[test]
    fn test_describe_image() {
        let data = png_bytes(64, 32);
        let summary = describe_image(&data).unwrap();
        assert_eq!(summary.width, 64);
        assert_eq!(summary.height, 32);
        assert_eq!(summary.format, "PNG");
        assert_eq!(summary.bytes, data.len());
    }

    #[test]
    fn test_describe_rejects_garbage() {
        assert!(describe_image(b"not an image").is_err());
    }
}
