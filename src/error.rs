//! Error types for the pptslim library.

use std::io;
use thiserror::Error;

use crate::pptx::{CONTENT_TYPES_PART, PRESENTATION_PART, PRESENTATION_RELS_PART};

/// Result type alias for pptslim operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while rewriting a package.
///
/// Every variant declares whether it is fatal for a rewrite pass through
/// [`Error::is_recoverable`]. Fatal errors abort the pass before anything is
/// serialized; recoverable ones are logged and reported as warnings.
#[derive(Error, Debug)]
pub enum Error {
    /// I/O error during file operations.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The input bytes are not a readable ZIP archive.
    #[error("Corrupt container: {0}")]
    CorruptContainer(String),

    /// The archive is readable but is not a presentation package.
    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    /// Error writing the output ZIP archive.
    #[error("ZIP archive error: {0}")]
    ZipArchive(String),

    /// Error parsing XML content, without part context.
    #[error("XML parse error: {0}")]
    XmlParse(String),

    /// A package part failed to parse or failed re-validation after rebuild.
    #[error("Malformed XML in {part}: {reason}")]
    MalformedXml {
        /// Package path of the offending part
        part: String,
        /// Parser message
        reason: String,
    },

    /// A mandatory package part is missing.
    #[error("Missing part: {0}")]
    MissingPart(String),

    /// An image could not be transcoded.
    #[error("Failed to encode {path}: {reason}")]
    EncodeFailure {
        /// Package path of the media entry
        path: String,
        /// Codec message
        reason: String,
    },

    /// Image codec error, without media context.
    #[error("Image error: {0}")]
    Image(String),

    /// Rejected optimization options.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Error during text encoding conversion.
    #[error("Encoding error: {0}")]
    Encoding(String),
}

impl Error {
    /// Build a [`Error::MalformedXml`] for `part`.
    pub fn malformed(part: impl Into<String>, reason: impl std::fmt::Display) -> Self {
        Error::MalformedXml {
            part: part.into(),
            reason: reason.to_string(),
        }
    }

    /// Attach part context to a codec-level error.
    ///
    /// `XmlParse` and `Encoding` become `MalformedXml` for `part`; every
    /// other variant is returned unchanged.
    pub fn in_part(self, part: &str) -> Self {
        match self {
            Error::XmlParse(reason) | Error::Encoding(reason) => Error::malformed(part, reason),
            other => other,
        }
    }

    /// Attach media context to a codec-level image error.
    pub fn for_media(self, path: &str) -> Self {
        match self {
            Error::Image(reason) => Error::EncodeFailure {
                path: path.to_string(),
                reason,
            },
            Error::EncodeFailure { reason, .. } => Error::EncodeFailure {
                path: path.to_string(),
                reason,
            },
            other => other,
        }
    }

    /// Whether a rewrite pass may continue after this error.
    ///
    /// Image failures only cost size reduction. Malformed XML is recoverable
    /// unless it hits one of the parts every package needs to open.
    pub fn is_recoverable(&self) -> bool {
        match self {
            Error::EncodeFailure { .. } | Error::Image(_) => true,
            Error::MalformedXml { part, .. } => !is_mandatory_part(part),
            _ => false,
        }
    }
}

/// Parts whose loss or corruption makes the output unopenable.
pub fn is_mandatory_part(path: &str) -> bool {
    matches!(
        path,
        PRESENTATION_PART | PRESENTATION_RELS_PART | CONTENT_TYPES_PART
    )
}

impl From<zip::result::ZipError> for Error {
    fn from(err: zip::result::ZipError) -> Self {
        Error::ZipArchive(err.to_string())
    }
}

impl From<quick_xml::Error> for Error {
    fn from(err: quick_xml::Error) -> Self {
        Error::XmlParse(err.to_string())
    }
}

impl From<quick_xml::events::attributes::AttrError> for Error {
    fn from(err: quick_xml::events::attributes::AttrError) -> Self {
        Error::XmlParse(err.to_string())
    }
}

impl From<image::ImageError> for Error {
    fn from(err: image::ImageError) -> Self {
        Error::Image(err.to_string())
    }
}
