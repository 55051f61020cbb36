//! Minimal stand-in images.

use super::MediaKind;
use crate::error::Result;
use image::{ImageFormat, Rgb, RgbImage, Rgba, RgbaImage};
use std::io::Cursor;

const SVG_PLACEHOLDER: &str =
    r#"<svg xmlns="http://www.w3.org/2000/svg" width="1" height="1" viewBox="0 0 1 1"/>"#;

/// Bytes of a 1x1 image in the same format family as `kind`.
///
/// Raster formats get a transparent pixel, except JPEG which has no alpha
/// and gets an opaque white one. Metafiles have no placeholder and yield
/// `None`.
pub fn placeholder_for(kind: MediaKind) -> Result<Option<Vec<u8>>> {
    let format = match kind {
        MediaKind::Svg => return Ok(Some(SVG_PLACEHOLDER.as_bytes().to_vec())),
        MediaKind::Wmf | MediaKind::Emf => return Ok(None),
        MediaKind::Jpeg => {
            let mut out = Cursor::new(Vec::new());
            RgbImage::from_pixel(1, 1, Rgb([255, 255, 255])).write_to(&mut out, ImageFormat::Jpeg)?;
            return Ok(Some(out.into_inner()));
        }
        MediaKind::Png => ImageFormat::Png,
        MediaKind::Gif => ImageFormat::Gif,
        MediaKind::Bmp => ImageFormat::Bmp,
        MediaKind::Tiff => ImageFormat::Tiff,
        MediaKind::Webp => ImageFormat::WebP,
    };
    let mut out = Cursor::new(Vec::new());
    RgbaImage::from_pixel(1, 1, Rgba([0, 0, 0, 0])).write_to(&mut out, format)?;
    Ok(Some(out.into_inner()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_raster_placeholders_decode() {
        for (kind, format) in [
            (MediaKind::Png, ImageFormat::Png),
            (MediaKind::Gif, ImageFormat::Gif),
            (MediaKind::Bmp, ImageFormat::Bmp),
            (MediaKind::Tiff, ImageFormat::Tiff),
            (MediaKind::Webp, ImageFormat::WebP),
            (MediaKind::Jpeg, ImageFormat::Jpeg),
        ] {
            let bytes = placeholder_for(kind).unwrap().unwrap();
            assert_eq!(image::guess_format(&bytes).unwrap(), format, "{kind:?}");
            let decoded = image::load_from_memory(&bytes).unwrap();
            assert_eq!((decoded.width(), decoded.height()), (1, 1));
        }
    }

    #[test]
    fn test_png_placeholder_is_transparent() {
        let bytes = placeholder_for(MediaKind::Png).unwrap().unwrap();
        let pixel = image::load_from_memory(&bytes).unwrap().to_rgba8();
        assert_eq!(pixel.get_pixel(0, 0).0[3], 0);
    }

    #[test]
    fn test_vector_placeholders() {
        let svg = placeholder_for(MediaKind::Svg).unwrap().unwrap();
        assert!(crate::xml::parse(std::str::from_utf8(&svg).unwrap()).is_ok());
        assert!(placeholder_for(MediaKind::Wmf).unwrap().is_none());
        assert!(placeholder_for(MediaKind::Emf).unwrap().is_none());
    }
}
