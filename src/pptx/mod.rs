//! PresentationML package rewriting.
//!
//! This module holds the PPTX-specific passes: media usage resolution, the
//! presentation part rewriter, orphaned slide pruning and content-types
//! reconciliation.

pub mod content_types;
pub mod presentation;
pub mod slides;
pub mod usage;

/// Main presentation part.
pub const PRESENTATION_PART: &str = "ppt/presentation.xml";
/// Relationships of the main presentation part.
pub const PRESENTATION_RELS_PART: &str = "ppt/_rels/presentation.xml.rels";
/// Package content-types part.
pub const CONTENT_TYPES_PART: &str = "[Content_Types].xml";
/// Folder holding embedded media.
pub const MEDIA_DIR: &str = "ppt/media/";
/// Folder holding slide parts.
pub const SLIDES_DIR: &str = "ppt/slides/";
/// Folder holding slide layout parts.
pub const SLIDE_LAYOUTS_DIR: &str = "ppt/slideLayouts/";
/// Folder holding slide master parts.
pub const SLIDE_MASTERS_DIR: &str = "ppt/slideMasters/";

/// Whether `path` is a top-level XML part directly inside `dir`.
///
/// `ppt/slides/slide1.xml` is inside `ppt/slides/`;
/// `ppt/slides/_rels/slide1.xml.rels` is not.
pub(crate) fn is_part_in(path: &str, dir: &str) -> bool {
    path.strip_prefix(dir)
        .is_some_and(|name| !name.contains('/') && name.to_ascii_lowercase().ends_with(".xml"))
}

/// Value of a `show` attribute that hides a slide.
pub(crate) fn is_hidden_flag(value: Option<&str>) -> bool {
    matches!(value, Some("0") | Some("false"))
}
