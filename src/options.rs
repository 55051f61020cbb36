//! Optimization options configuration.

use crate::container::ArchiveOptions;
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};

/// Image recompression settings.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CompressOptions {
    /// Maximum width in pixels; wider images are scaled down
    pub max_width: u32,
    /// Maximum height in pixels; taller images are scaled down
    pub max_height: u32,
    /// Encoder quality in `(0, 1]`
    pub quality: f32,
}

impl Default for CompressOptions {
    fn default() -> Self {
        Self {
            max_width: 1366,
            max_height: 768,
            quality: 0.7,
        }
    }
}

impl CompressOptions {
    /// Set the bounding box images are scaled into.
    pub fn with_max_size(mut self, width: u32, height: u32) -> Self {
        self.max_width = width;
        self.max_height = height;
        self
    }

    /// Set the encoder quality.
    pub fn with_quality(mut self, quality: f32) -> Self {
        self.quality = quality;
        self
    }
}

/// Optimization preset.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OptimizePreset {
    /// Only drop media nothing references
    Minimal,
    /// Drop hidden slides and unused media, recompress images
    #[default]
    Standard,
    /// Standard with a smaller bounding box and lower quality
    Aggressive,
}

/// Options for one optimization pass.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct OptimizeOptions {
    /// Remove slides marked hidden
    pub remove_hidden_slides: bool,

    /// Recompress raster images (None = leave image bytes alone)
    pub compress_images: Option<CompressOptions>,

    /// Remove media no remaining part references
    pub remove_unused_media: bool,

    /// Write placeholder images instead of deleting unused media
    pub use_placeholders: bool,

    /// Replace every image, used or not, with a placeholder
    pub placeholder_all_media: bool,

    /// Deflate level for the output archive (0-9)
    pub compression_level: u8,
}

impl Default for OptimizeOptions {
    fn default() -> Self {
        Self {
            remove_hidden_slides: false,
            compress_images: None,
            remove_unused_media: false,
            use_placeholders: false,
            placeholder_all_media: false,
            compression_level: 9,
        }
    }
}

impl OptimizeOptions {
    /// Create options that leave the package content alone.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create options from a preset.
    pub fn from_preset(preset: OptimizePreset) -> Self {
        match preset {
            OptimizePreset::Minimal => Self {
                remove_unused_media: true,
                ..Default::default()
            },
            OptimizePreset::Standard => Self {
                remove_hidden_slides: true,
                compress_images: Some(CompressOptions::default()),
                remove_unused_media: true,
                ..Default::default()
            },
            OptimizePreset::Aggressive => Self {
                remove_hidden_slides: true,
                compress_images: Some(CompressOptions {
                    max_width: 1280,
                    max_height: 720,
                    quality: 0.5,
                }),
                remove_unused_media: true,
                ..Default::default()
            },
        }
    }

    /// Parse options from a JSON record with camelCase field names.
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| Error::InvalidConfig(e.to_string()))
    }

    /// Remove hidden slides.
    pub fn with_remove_hidden_slides(mut self, enable: bool) -> Self {
        self.remove_hidden_slides = enable;
        self
    }

    /// Recompress images with the given settings.
    pub fn with_compress_images(mut self, compress: CompressOptions) -> Self {
        self.compress_images = Some(compress);
        self
    }

    /// Remove unused media.
    pub fn with_remove_unused_media(mut self, enable: bool) -> Self {
        self.remove_unused_media = enable;
        self
    }

    /// Use placeholders instead of deleting unused media.
    pub fn with_placeholders(mut self, enable: bool) -> Self {
        self.use_placeholders = enable;
        self
    }

    /// Replace all images with placeholders.
    pub fn with_placeholder_all_media(mut self, enable: bool) -> Self {
        self.placeholder_all_media = enable;
        self
    }

    /// Set the output deflate level.
    pub fn with_compression_level(mut self, level: u8) -> Self {
        self.compression_level = level;
        self
    }

    /// Reject out-of-range settings.
    pub fn validate(&self) -> Result<()> {
        if let Some(compress) = &self.compress_images {
            if compress.max_width == 0 || compress.max_height == 0 {
                return Err(Error::InvalidConfig(format!(
                    "maximum image size must be positive, got {}x{}",
                    compress.max_width, compress.max_height
                )));
            }
            if !(compress.quality > 0.0 && compress.quality <= 1.0) {
                return Err(Error::InvalidConfig(format!(
                    "quality must be in (0, 1], got {}",
                    compress.quality
                )));
            }
        }
        if self.compression_level > 9 {
            return Err(Error::InvalidConfig(format!(
                "compression level must be 0-9, got {}",
                self.compression_level
            )));
        }
        Ok(())
    }

    /// Archive settings for the output package.
    pub fn archive_options(&self) -> ArchiveOptions {
        ArchiveOptions {
            compression_level: Some(i64::from(self.compression_level)),
        }
    }
}
