use std::io::Cursor;

use base64::Engine;
use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::metadata::Orientation;
use image::{DynamicImage, GenericImageView, ImageDecoder, ImageReader};
use thiserror::Error;
use tracing::debug;

use crate::models::TransportImagePart;

/// Longest edge, in pixels, an uploaded photo is allowed to keep.
pub const MAX_DIMENSION: u32 = 1024;

/// JPEG quality (0.8 on a 0..1 scale).
pub const JPEG_QUALITY: u8 = 80;

pub const TRANSPORT_MIME_TYPE: &str = "image/jpeg";

#[derive(Debug, Error)]
pub enum ImageError {
    #[error("failed to decode image: {0}")]
    Decode(String),
    #[error("failed to re-encode image: {0}")]
    EncodeContext(String),
}

/// Decode an uploaded photo, shrink it to fit [`MAX_DIMENSION`] and re-encode it
/// as JPEG so the request payload stays small regardless of the source format.
///
/// EXIF orientation is applied first, so phone photos arrive upright.
pub fn normalize_image(data: &[u8]) -> Result<TransportImagePart, ImageError> {
    let img = decode_upright(data)?;

    let (width, height) = img.dimensions();
    let (target_w, target_h) = fit_within(width, height, MAX_DIMENSION);
    let img = if (target_w, target_h) != (width, height) {
        debug!(
            from = format!("{width}x{height}"),
            to = format!("{target_w}x{target_h}"),
            "Downscaling uploaded photo"
        );
        img.resize_exact(target_w, target_h, FilterType::Triangle)
    } else {
        img
    };

    let jpeg = encode_jpeg(img)?;
    debug!(bytes = jpeg.len(), "Photo re-encoded for transport");

    Ok(TransportImagePart {
        encoded_data: base64::engine::general_purpose::STANDARD.encode(&jpeg),
        mime_type: TRANSPORT_MIME_TYPE.to_string(),
    })
}

fn decode_upright(data: &[u8]) -> Result<DynamicImage, ImageError> {
    let decode_err = |e: image::ImageError| ImageError::Decode(e.to_string());

    let mut decoder = ImageReader::new(Cursor::new(data))
        .with_guessed_format()
        .map_err(|e| ImageError::Decode(e.to_string()))?
        .into_decoder()
        .map_err(decode_err)?;
    let orientation = decoder.orientation().unwrap_or(Orientation::NoTransforms);

    let mut img = DynamicImage::from_decoder(decoder).map_err(decode_err)?;
    if orientation != Orientation::NoTransforms {
        debug!(?orientation, "Applying EXIF orientation");
        img.apply_orientation(orientation);
    }
    Ok(img)
}

/// Target size for an image so neither edge exceeds `max_dim`.
///
/// The longer edge becomes exactly `max_dim` and the other is scaled and rounded;
/// images already inside the bound are returned unchanged (never upscaled).
pub fn fit_within(width: u32, height: u32, max_dim: u32) -> (u32, u32) {
    if width <= max_dim && height <= max_dim {
        return (width, height);
    }
    if width > height {
        let h = (height as f64 * max_dim as f64 / width as f64).round() as u32;
        (max_dim, h.max(1))
    } else {
        let w = (width as f64 * max_dim as f64 / height as f64).round() as u32;
        (w.max(1), max_dim)
    }
}

fn encode_jpeg(img: DynamicImage) -> Result<Vec<u8>, ImageError> {
    // JPEG has no alpha channel
    let rgb = img.to_rgb8();
    let mut buf = Vec::new();
    JpegEncoder::new_with_quality(&mut buf, JPEG_QUALITY)
        .encode_image(&rgb)
        .map_err(|e| ImageError::EncodeContext(e.to_string()))?;
    Ok(buf)
}
