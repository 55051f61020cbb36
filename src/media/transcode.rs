//! Raster image transcoding.
//!
//! The pixel codec sits behind [`ImageCodec`] so a pass can run with a
//! different encoder (or a fake one in tests). [`RasterCodec`] is the
//! default: `image` decodes and writes JPEG, libwebp (through the `webp`
//! crate) writes lossy WebP.

use crate::error::{Error, Result};
use crate::options::CompressOptions;
use image::codecs::jpeg::JpegEncoder;
use image::imageops::{self, FilterType};
use image::{DynamicImage, ExtendedColorType, ImageEncoder, RgbaImage};

/// Output format of a transcode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetFormat {
    /// WebP, keeps alpha
    WebP,
    /// Baseline JPEG, opaque only
    Jpeg,
}

/// Pixel codec capability injected into a pass.
pub trait ImageCodec: Send + Sync {
    /// Decode any supported image into RGBA pixels.
    fn decode(&self, data: &[u8]) -> Result<RgbaImage>;

    /// Encode pixels; `quality` is in `(0, 1]`.
    fn encode(&self, image: &RgbaImage, format: TargetFormat, quality: f32) -> Result<Vec<u8>>;
}

/// Default codec: `image` for decoding and JPEG, libwebp for lossy WebP.
#[derive(Debug, Clone, Copy, Default)]
pub struct RasterCodec;

/// Map a `(0, 1]` quality to the JPEG encoder's 1-100 scale.
pub fn jpeg_quality(quality: f32) -> u8 {
    (quality * 100.0).round().clamp(1.0, 100.0) as u8
}

/// Map a `(0, 1]` quality to libwebp's 0-100 scale.
pub fn webp_quality(quality: f32) -> f32 {
    (quality * 100.0).round().clamp(0.0, 100.0)
}

impl ImageCodec for RasterCodec {
    fn decode(&self, data: &[u8]) -> Result<RgbaImage> {
        let image = image::load_from_memory(data)?;
        if image.width() == 0 || image.height() == 0 {
            return Err(Error::Image("image has no pixels".to_string()));
        }
        Ok(image.to_rgba8())
    }

    fn encode(&self, image: &RgbaImage, format: TargetFormat, quality: f32) -> Result<Vec<u8>> {
        let mut out = Vec::new();
        match format {
            TargetFormat::WebP => {
                let encoded = webp::Encoder::from_rgba(image.as_raw(), image.width(), image.height())
                    .encode_simple(false, webp_quality(quality))
                    .map_err(|e| Error::Image(format!("WebP encoder failed: {e:?}")))?;
                out.extend_from_slice(&encoded);
            }
            TargetFormat::Jpeg => {
                let rgb = DynamicImage::ImageRgba8(image.clone()).to_rgb8();
                JpegEncoder::new_with_quality(&mut out, jpeg_quality(quality)).write_image(
                    rgb.as_raw(),
                    rgb.width(),
                    rgb.height(),
                    ExtendedColorType::Rgb8,
                )?;
            }
        }
        Ok(out)
    }
}

/// Result of compressing one image.
#[derive(Debug, Clone)]
pub struct Compressed {
    /// Encoded bytes
    pub data: Vec<u8>,
    /// Chosen format
    pub format: TargetFormat,
    /// Output width
    pub width: u32,
    /// Output height
    pub height: u32,
}

/// Size that fits `width x height` into `max_width x max_height`.
///
/// Width is constrained first, then height, keeping the aspect ratio with
/// rounding. Images are never scaled up and never below 1 pixel.
pub fn target_dimensions(width: u32, height: u32, max_width: u32, max_height: u32) -> (u32, u32) {
    let (mut w, mut h) = (f64::from(width), f64::from(height));
    let (max_w, max_h) = (f64::from(max_width), f64::from(max_height));

    if w > max_w {
        h = (h * max_w / w).round();
        w = max_w;
    }
    if h > max_h {
        w = (w * max_h / h).round();
        h = max_h;
    }
    ((w as u32).max(1), (h as u32).max(1))
}

/// Whether any pixel is not fully opaque.
pub fn has_transparency(image: &RgbaImage) -> bool {
    image.pixels().any(|p| p.0[3] < 255)
}

/// Decode, scale down and re-encode one image.
///
/// Images with transparency are encoded as lossy WebP, which keeps the alpha
/// channel. Opaque images are encoded
/// both ways and the smaller result wins, WebP on ties. The result is not
/// compared with the input; callers decide whether to keep it.
pub fn compress(codec: &dyn ImageCodec, data: &[u8], options: &CompressOptions) -> Result<Compressed> {
    let decoded = codec.decode(data)?;
    let (width, height) = target_dimensions(
        decoded.width(),
        decoded.height(),
        options.max_width,
        options.max_height,
    );
    let image = if (width, height) == decoded.dimensions() {
        decoded
    } else {
        imageops::resize(&decoded, width, height, FilterType::Lanczos3)
    };

    let webp = codec.encode(&image, TargetFormat::WebP, options.quality)?;
    if has_transparency(&image) {
        return Ok(Compressed {
            data: webp,
            format: TargetFormat::WebP,
            width,
            height,
        });
    }

    let jpeg = codec.encode(&image, TargetFormat::Jpeg, options.quality)?;
    let (data, format) = if webp.len() <= jpeg.len() {
        (webp, TargetFormat::WebP)
    } else {
        (jpeg, TargetFormat::Jpeg)
    };
    Ok(Compressed {
        data,
        format,
        width,
        height,
    })
}
