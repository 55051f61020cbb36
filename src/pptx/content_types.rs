//! `[Content_Types].xml` reconciliation.

use super::CONTENT_TYPES_PART;
use crate::container::Package;
use crate::error::{Error, Result};
use crate::xml::{self, SerializeOptions};
use percent_encoding::percent_decode_str;

/// Package path named by an override's `PartName`.
pub fn part_name_to_path(part_name: &str) -> String {
    let trimmed = part_name.strip_prefix('/').unwrap_or(part_name);
    percent_decode_str(trimmed).decode_utf8_lossy().into_owned()
}

/// Drop `Override` entries whose part no longer exists.
///
/// `Default` entries and overrides for existing parts pass through
/// unchanged. The part is only rewritten when something was dropped.
/// Returns the number of overrides removed.
pub fn reconcile(package: &mut Package) -> Result<usize> {
    let text = package
        .read_text(CONTENT_TYPES_PART)?
        .ok_or_else(|| Error::MissingPart(CONTENT_TYPES_PART.to_string()))?;
    let mut root = xml::parse(&text).map_err(|e| e.in_part(CONTENT_TYPES_PART))?;

    let removed = root.retain_elements(|el| {
        if el.local_name() != "Override" {
            return true;
        }
        match el.attribute("PartName") {
            Some(name) => {
                let path = part_name_to_path(name);
                let exists = package.resolve_entry(&path).is_some();
                if !exists {
                    tracing::debug!(part = %path, "dropping content type override");
                }
                exists
            }
            None => true,
        }
    });
    if removed == 0 {
        return Ok(0);
    }

    let rebuilt = xml::rebuild(&root, &SerializeOptions::content_types())
        .map_err(|e| e.in_part(CONTENT_TYPES_PART))?;
    package.write(CONTENT_TYPES_PART, rebuilt);
    Ok(removed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Cursor, Write};
    use zip::write::SimpleFileOptions;

    const TYPES: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"><Default Extension="png" ContentType="image/png"/><Default Extension="xml" ContentType="application/xml"/><Override PartName="/ppt/presentation.xml" ContentType="application/vnd.openxmlformats-officedocument.presentationml.presentation.main+xml"/><Override PartName="/ppt/slides/slide1.xml" ContentType="application/vnd.openxmlformats-officedocument.presentationml.slide+xml"/><Override PartName="/ppt/slides/slide2.xml" ContentType="application/vnd.openxmlformats-officedocument.presentationml.slide+xml"/><Override PartName="/ppt/media/my%20image.PNG" ContentType="image/png"/></Types>"#;

    fn build(files: &[(&str, &str)]) -> Package {
        let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
        for (name, data) in files {
            writer.start_file(*name, SimpleFileOptions::default()).unwrap();
            writer.write_all(data.as_bytes()).unwrap();
        }
        Package::from_bytes(&writer.finish().unwrap().into_inner()).unwrap()
    }

    #[test]
    fn test_part_name_to_path() {
        assert_eq!(part_name_to_path("/ppt/slides/slide1.xml"), "ppt/slides/slide1.xml");
        assert_eq!(part_name_to_path("/ppt/media/a%20b.png"), "ppt/media/a b.png");
    }

    #[test]
    fn test_reconcile_drops_missing_overrides() {
        let mut package = build(&[
            (CONTENT_TYPES_PART, TYPES),
            ("ppt/presentation.xml", "<p:presentation/>"),
            ("ppt/slides/slide1.xml", "<p:sld/>"),
            ("ppt/media/my image.png", ""),
        ]);
        let removed = reconcile(&mut package).unwrap();
        assert_eq!(removed, 1);

        let text = package.read_text(CONTENT_TYPES_PART).unwrap().unwrap();
        assert!(!text.contains("slide2.xml"));
        assert!(text.contains("/ppt/slides/slide1.xml"));
        // Case-insensitive match keeps the override
        assert!(text.contains("my%20image.PNG"));
        assert!(text.contains(r#"<Default Extension="png" ContentType="image/png"/>"#));
        assert!(text.contains(r#"xmlns="http://schemas.openxmlformats.org/package/2006/content-types""#));
    }

    #[test]
    fn test_reconcile_without_changes_leaves_bytes() {
        let mut package = build(&[
            (CONTENT_TYPES_PART, TYPES),
            ("ppt/presentation.xml", ""),
            ("ppt/slides/slide1.xml", ""),
            ("ppt/slides/slide2.xml", ""),
            ("ppt/media/my image.PNG", ""),
        ]);
        assert_eq!(reconcile(&mut package).unwrap(), 0);
        assert_eq!(package.read_binary(CONTENT_TYPES_PART).unwrap(), TYPES.as_bytes());
    }

    #[test]
    fn test_reconcile_errors_are_fatal() {
        let mut package = build(&[("ppt/presentation.xml", "")]);
        let err = reconcile(&mut package).unwrap_err();
        assert!(matches!(err, Error::MissingPart(_)));

        let mut package = build(&[(CONTENT_TYPES_PART, "<Types><Override")]);
        let err = reconcile(&mut package).unwrap_err();
        assert!(matches!(err, Error::MalformedXml { .. }));
        assert!(!err.is_recoverable());
    }
}
