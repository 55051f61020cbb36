//! Format detection for PresentationML packages.

use crate::container::{decode_xml_bytes, Package};
use crate::error::{Error, Result};
use crate::pptx::CONTENT_TYPES_PART;
use std::fs::File;
use std::io::{BufReader, Read, Seek};
use std::path::Path;

/// ZIP file magic bytes: PK\x03\x04
const ZIP_MAGIC: [u8; 4] = [0x50, 0x4B, 0x03, 0x04];

/// Main part content types, most specific first.
const MAIN_CONTENT_TYPES: [(&str, FormatType); 6] = [
    (
        "application/vnd.openxmlformats-officedocument.presentationml.presentation.main+xml",
        FormatType::Pptx,
    ),
    (
        "application/vnd.ms-powerpoint.presentation.macroEnabled.main+xml",
        FormatType::Pptm,
    ),
    (
        "application/vnd.openxmlformats-officedocument.presentationml.slideshow.main+xml",
        FormatType::Ppsx,
    ),
    (
        "application/vnd.ms-powerpoint.slideshow.macroEnabled.main+xml",
        FormatType::Ppsm,
    ),
    (
        "application/vnd.openxmlformats-officedocument.presentationml.template.main+xml",
        FormatType::Potx,
    ),
    (
        "application/vnd.ms-powerpoint.template.macroEnabled.main+xml",
        FormatType::Potm,
    ),
];

/// Content types of other OOXML families, rejected with a clear message.
const OTHER_FAMILIES: [(&str, &str); 2] = [
    ("wordprocessingml.document.main+xml", "Word document"),
    ("spreadsheetml.sheet.main+xml", "Excel workbook"),
];

/// Detected presentation package format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormatType {
    /// Presentation (.pptx)
    Pptx,
    /// Macro-enabled presentation (.pptm)
    Pptm,
    /// Slideshow (.ppsx)
    Ppsx,
    /// Macro-enabled slideshow (.ppsm)
    Ppsm,
    /// Template (.potx)
    Potx,
    /// Macro-enabled template (.potm)
    Potm,
}

impl FormatType {
    /// Returns the file extension for this format.
    pub fn extension(&self) -> &'static str {
        match self {
            FormatType::Pptx => "pptx",
            FormatType::Pptm => "pptm",
            FormatType::Ppsx => "ppsx",
            FormatType::Ppsm => "ppsm",
            FormatType::Potx => "potx",
            FormatType::Potm => "potm",
        }
    }

    /// Returns a human-readable name for this format.
    pub fn name(&self) -> &'static str {
        match self {
            FormatType::Pptx => "PowerPoint Presentation",
            FormatType::Pptm => "PowerPoint Macro-Enabled Presentation",
            FormatType::Ppsx => "PowerPoint Slide Show",
            FormatType::Ppsm => "PowerPoint Macro-Enabled Slide Show",
            FormatType::Potx => "PowerPoint Template",
            FormatType::Potm => "PowerPoint Macro-Enabled Template",
        }
    }
}

impl std::fmt::Display for FormatType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Detect the format type from a file path.
///
/// # Example
///
/// ```no_run
/// use pptslim::detect::detect_format_from_path;
///
/// let format = detect_format_from_path("deck.pptx")?;
/// println!("Detected format: {}", format);
/// # Ok::<(), pptslim::Error>(())
/// ```
pub fn detect_format_from_path(path: impl AsRef<Path>) -> Result<FormatType> {
    let file = File::open(path.as_ref())?;
    detect_format_from_reader(BufReader::new(file))
}

/// Detect the format type from a byte slice.
pub fn detect_format_from_bytes(data: &[u8]) -> Result<FormatType> {
    if !is_zip_file(data) {
        return Err(Error::CorruptContainer("missing ZIP signature".to_string()));
    }
    detect_format_from_reader(std::io::Cursor::new(data))
}

/// Detect the format type from a reader.
pub fn detect_format_from_reader<R: Read + Seek>(reader: R) -> Result<FormatType> {
    let mut archive =
        zip::ZipArchive::new(reader).map_err(|e| Error::CorruptContainer(e.to_string()))?;

    let content_types = match archive.by_name(CONTENT_TYPES_PART) {
        Ok(mut file) => {
            let mut bytes = Vec::new();
            file.read_to_end(&mut bytes)?;
            Some(decode_xml_bytes(&bytes)?)
        }
        Err(_) => None,
    };
    let has_ppt = archive.file_names().any(|n| n.starts_with("ppt/"));
    classify(content_types.as_deref(), has_ppt)
}

/// Detect the format of an already loaded package.
pub fn detect_package_format(package: &Package) -> Result<FormatType> {
    let content_types = package.read_text(CONTENT_TYPES_PART)?;
    let has_ppt = !package.list_files_with_prefix("ppt/").is_empty();
    classify(content_types.as_deref(), has_ppt)
}

fn classify(content_types: Option<&str>, has_ppt: bool) -> Result<FormatType> {
    if let Some(types) = content_types {
        if let Some((_, format)) = MAIN_CONTENT_TYPES
            .iter()
            .find(|(content_type, _)| types.contains(content_type))
        {
            return Ok(*format);
        }
        if let Some((_, family)) = OTHER_FAMILIES
            .iter()
            .find(|(suffix, _)| types.contains(suffix))
        {
            return Err(Error::UnsupportedFormat(format!(
                "{family}, not a presentation"
            )));
        }
    }

    // Fallback: the presentation folder alone
    if has_ppt {
        Ok(FormatType::Pptx)
    } else {
        Err(Error::UnsupportedFormat(
            "no presentation part found".to_string(),
        ))
    }
}

/// Check if data starts with ZIP magic bytes.
pub fn is_zip_file(data: &[u8]) -> bool {
    data.len() >= 4 && data[..4] == ZIP_MAGIC
}
