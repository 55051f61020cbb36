//! Embedded media: classification, per-image policy, transcoding and
//! placeholders.

pub mod placeholder;
pub mod transcode;

use crate::options::OptimizeOptions;
use crate::pptx::MEDIA_DIR;
use serde::Serialize;

pub use placeholder::placeholder_for;
pub use transcode::{compress, target_dimensions, Compressed, ImageCodec, RasterCodec, TargetFormat};

/// Image formats found under `ppt/media/`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    /// Portable Network Graphics
    Png,
    /// JPEG
    Jpeg,
    /// GIF, possibly animated
    Gif,
    /// Windows bitmap
    Bmp,
    /// TIFF
    Tiff,
    /// WebP
    Webp,
    /// Windows Metafile
    Wmf,
    /// Enhanced Metafile
    Emf,
    /// Scalable Vector Graphics
    Svg,
}

impl MediaKind {
    /// Classify a path by its extension (case-insensitive).
    pub fn from_path(path: &str) -> Option<Self> {
        let (_, ext) = path.rsplit_once('.')?;
        Some(match ext.to_ascii_lowercase().as_str() {
            "png" => Self::Png,
            "jpg" | "jpeg" => Self::Jpeg,
            "gif" => Self::Gif,
            "bmp" => Self::Bmp,
            "tif" | "tiff" => Self::Tiff,
            "webp" => Self::Webp,
            "wmf" => Self::Wmf,
            "emf" => Self::Emf,
            "svg" => Self::Svg,
            _ => return None,
        })
    }

    /// MIME type.
    pub fn content_type(self) -> &'static str {
        match self {
            Self::Png => "image/png",
            Self::Jpeg => "image/jpeg",
            Self::Gif => "image/gif",
            Self::Bmp => "image/bmp",
            Self::Tiff => "image/tiff",
            Self::Webp => "image/webp",
            Self::Wmf => "image/x-wmf",
            Self::Emf => "image/x-emf",
            Self::Svg => "image/svg+xml",
        }
    }

    /// Vector formats are never rasterized.
    pub fn is_vector(self) -> bool {
        matches!(self, Self::Wmf | Self::Emf | Self::Svg)
    }

    /// Whether [`placeholder_for`] has a stand-in for this format.
    pub fn has_placeholder(self) -> bool {
        !matches!(self, Self::Wmf | Self::Emf)
    }

    /// Whether the raster transcoder may rewrite this format.
    ///
    /// GIF is excluded: decoding keeps only the first animation frame.
    pub fn is_compressible(self) -> bool {
        !self.is_vector() && self != Self::Gif
    }
}

/// Media entries eligible for optimization: known image kinds under
/// `ppt/media/`.
pub fn media_kind_of(path: &str) -> Option<MediaKind> {
    if path.starts_with(MEDIA_DIR) {
        MediaKind::from_path(path)
    } else {
        None
    }
}

/// What happens to one media entry in a pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaAction {
    /// Leave the bytes as they are
    Keep,
    /// Remove the entry
    Delete,
    /// Replace the bytes with a 1x1 image of the same family
    Placeholder,
    /// Re-encode the image
    Compress,
}

/// Pick the action for one media entry.
///
/// `usage_complete` is false when some part could not be scanned; unused
/// media is then not deleted because it may be referenced from that part.
/// `placeholder_all_media` stubs out every kind that has a placeholder,
/// used or not; only a deletion takes precedence over it.
pub fn choose_action(
    kind: MediaKind,
    used: bool,
    usage_complete: bool,
    options: &OptimizeOptions,
) -> MediaAction {
    if !used && options.remove_unused_media && usage_complete {
        if options.use_placeholders {
            return MediaAction::Placeholder;
        }
        return MediaAction::Delete;
    }
    if options.placeholder_all_media && kind.has_placeholder() {
        return MediaAction::Placeholder;
    }
    if options.compress_images.is_some() && kind.is_compressible() {
        return MediaAction::Compress;
    }
    MediaAction::Keep
}
