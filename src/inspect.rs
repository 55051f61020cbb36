//! Read-only package summary.

use crate::container::Package;
use crate::detect::{detect_package_format, FormatType};
use crate::error::Result;
use crate::pptx::presentation::PresentationRewriter;
use crate::pptx::usage::{media_candidates, resolve_media_usage, unused_media};
use serde::Serialize;
use std::collections::BTreeSet;
use std::path::Path;

/// What an optimization pass would have to work with.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PackageSummary {
    /// Detected package format
    #[serde(serialize_with = "serialize_format")]
    pub format: FormatType,
    /// Entries in the slide list
    pub slide_count: usize,
    /// Hidden entries in the slide list
    pub hidden_slide_count: usize,
    /// Media entries under `ppt/media/`
    pub media_count: usize,
    /// Total size of those entries
    pub media_bytes: usize,
    /// Media no scanned part references
    pub unused_media: Vec<String>,
    /// Parts that could not be scanned, with the reason
    pub usage_failures: Vec<String>,
}

fn serialize_format<S: serde::Serializer>(
    format: &FormatType,
    serializer: S,
) -> std::result::Result<S::Ok, S::Error> {
    serializer.serialize_str(format.extension())
}

/// Summarize a package held in memory.
pub fn inspect_bytes(data: &[u8]) -> Result<PackageSummary> {
    let package = Package::from_bytes(data)?;
    summarize(&package)
}

/// Summarize a package on disk.
pub fn inspect_file(path: impl AsRef<Path>) -> Result<PackageSummary> {
    let package = Package::open(path)?;
    summarize(&package)
}

fn summarize(package: &Package) -> Result<PackageSummary> {
    let format = detect_package_format(package)?;
    let rewriter = PresentationRewriter::load(package)?;

    let media = media_candidates(package);
    let media_bytes = media
        .iter()
        .filter_map(|path| package.read_binary(path))
        .map(<[u8]>::len)
        .sum();

    let usage = resolve_media_usage(package, &BTreeSet::new());
    let unused = if usage.is_complete() {
        unused_media(package, &usage)
    } else {
        Vec::new()
    };

    Ok(PackageSummary {
        format,
        slide_count: rewriter.slides().len(),
        hidden_slide_count: rewriter.hidden_count(),
        media_count: media.len(),
        media_bytes,
        unused_media: unused,
        usage_failures: usage.failures.iter().map(ToString::to_string).collect(),
    })
}
