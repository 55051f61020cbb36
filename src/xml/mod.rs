//! XML part codec.
//!
//! Parts are parsed into an explicit [`XmlElement`] tree, mutated in place and
//! written back through [`rebuild`], which serializes, sanitizes and
//! re-parses the result. A part is only ever written back when that final
//! parse succeeds.

mod sanitize;
mod tree;
mod write;

pub use sanitize::{sanitize, XML_DECLARATION};
pub use tree::{local_part, normalize, parse, root_attribute, XmlElement, XmlNode};
pub use write::{is_xml_char, sanitize_name, serialize, strip_invalid_chars, SerializeOptions};

use crate::error::Result;

/// DrawingML main namespace.
pub const NS_DRAWINGML: &str = "http://schemas.openxmlformats.org/drawingml/2006/main";
/// PresentationML main namespace.
pub const NS_PRESENTATIONML: &str = "http://schemas.openxmlformats.org/presentationml/2006/main";
/// Office document relationships namespace (transitional).
pub const NS_RELATIONSHIPS: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships";
/// Office document relationships namespace (strict).
pub const NS_RELATIONSHIPS_STRICT: &str =
    "http://purl.oclc.org/ooxml/officeDocument/relationships";
/// Package relationships namespace, used by `.rels` parts.
pub const NS_PACKAGE_RELATIONSHIPS: &str =
    "http://schemas.openxmlformats.org/package/2006/relationships";
/// Content types namespace.
pub const NS_CONTENT_TYPES: &str = "http://schemas.openxmlformats.org/package/2006/content-types";

impl SerializeOptions {
    /// Options for `ppt/presentation.xml`.
    pub fn presentation() -> Self {
        Self::default()
            .with_root_name("p:presentation")
            .with_namespace("a", NS_DRAWINGML)
            .with_namespace("r", NS_RELATIONSHIPS)
            .with_namespace("p", NS_PRESENTATIONML)
    }

    /// Options for `.rels` parts.
    pub fn relationships() -> Self {
        Self::default()
            .with_root_name("Relationships")
            .with_namespace("", NS_PACKAGE_RELATIONSHIPS)
    }

    /// Options for `[Content_Types].xml`.
    pub fn content_types() -> Self {
        Self::default()
            .with_root_name("Types")
            .with_namespace("", NS_CONTENT_TYPES)
    }
}

/// Check that `xml` is a single well-formed document.
pub fn validate(xml: &str) -> Result<()> {
    parse(xml).map(|_| ())
}

/// Serialize, sanitize and re-validate a tree.
///
/// Returns the text to write back only when the cleaned output parses.
pub fn rebuild(root: &XmlElement, options: &SerializeOptions) -> Result<String> {
    let serialized = serialize(root, options)?;
    let cleaned = sanitize(&serialized);
    validate(&cleaned)?;
    Ok(cleaned)
}

#[cfg(test)]
mod tests {
    use super::*;

    const PRESENTATION: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<p:presentation xmlns:a="http://schemas.openxmlformats.org/drawingml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships" xmlns:p="http://schemas.openxmlformats.org/presentationml/2006/main" saveSubsetFonts="1">
  <p:sldMasterIdLst><p:sldMasterId id="2147483648" r:id="rId1"/></p:sldMasterIdLst>
  <p:sldIdLst>
    <p:sldId id="256" r:id="rId2"/>
    <p:sldId id="257" r:id="rId3"/>
  </p:sldIdLst>
  <p:sldSz cx="12192000" cy="6858000"/>
</p:presentation>"#;

    #[test]
    fn test_rebuild_round_trip() {
        let tree = parse(PRESENTATION).unwrap();
        let text = rebuild(&tree, &SerializeOptions::presentation()).unwrap();
        assert!(text.starts_with(XML_DECLARATION));
        let back = parse(&text).unwrap();
        assert!(back.structurally_eq(&tree));
    }

    #[test]
    fn test_rebuild_is_idempotent() {
        let tree = parse(PRESENTATION).unwrap();
        let once = rebuild(&tree, &SerializeOptions::presentation()).unwrap();
        let twice = rebuild(&parse(&once).unwrap(), &SerializeOptions::presentation()).unwrap();
        assert_eq!(once, twice);
    }

    #[test]
    fn test_rebuild_adds_missing_namespaces() {
        let tree = parse("<p:presentation><p:sldIdLst/></p:presentation>").unwrap();
        let text = rebuild(&tree, &SerializeOptions::presentation()).unwrap();
        let back = parse(&text).unwrap();
        assert_eq!(back.attribute("xmlns:p"), Some(NS_PRESENTATIONML));
        assert_eq!(back.attribute("xmlns:r"), Some(NS_RELATIONSHIPS));
        assert_eq!(back.attribute("xmlns:a"), Some(NS_DRAWINGML));
    }

    #[test]
    fn test_validate() {
        assert!(validate(PRESENTATION).is_ok());
        assert!(validate("<a><b></a>").is_err());
        assert!(validate("").is_err());
    }
}
