//! Media usage resolution.
//!
//! Walks the relationship graph from the presentation part, every slide,
//! slide layout and slide master, collecting the media each part actually
//! references from its content. Parts reached through relationships (notes,
//! themes, charts, diagrams) are scanned the same way.

use super::{is_part_in, PRESENTATION_PART, SLIDES_DIR, SLIDE_LAYOUTS_DIR, SLIDE_MASTERS_DIR};
use crate::container::Package;
use crate::error::Error;
use crate::media::media_kind_of;
use crate::rels::relationship_refs;
use crate::xml;
use rayon::prelude::*;
use std::collections::BTreeSet;

/// Media referenced by the live parts of a package.
#[derive(Debug, Default)]
pub struct MediaUsage {
    /// Canonical paths of referenced media
    pub used: BTreeSet<String>,
    /// Parts (or their `.rels`) that could not be scanned
    pub failures: Vec<Error>,
    /// Number of parts scanned
    pub parts_scanned: usize,
}

impl MediaUsage {
    /// True when every reachable part was scanned.
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }

    /// Whether `path` is referenced.
    pub fn is_used(&self, path: &str) -> bool {
        self.used.contains(path)
    }
}

#[derive(Debug, Default)]
struct PartScan {
    media: Vec<String>,
    follow: Vec<String>,
    failure: Option<Error>,
}

/// Starting parts for a usage walk, leaving out `excluded`.
pub fn usage_roots(package: &Package, excluded: &BTreeSet<String>) -> Vec<String> {
    let mut roots = Vec::new();
    if package.exists(PRESENTATION_PART) && !excluded.contains(PRESENTATION_PART) {
        roots.push(PRESENTATION_PART.to_string());
    }
    roots.extend(package.list_files().into_iter().filter(|path| {
        !excluded.contains(path)
            && (is_part_in(path, SLIDES_DIR)
                || is_part_in(path, SLIDE_LAYOUTS_DIR)
                || is_part_in(path, SLIDE_MASTERS_DIR))
    }));
    roots
}

/// Compute the media referenced by every live part.
///
/// `excluded` holds parts scheduled for deletion in this pass; they are
/// neither used as roots nor followed. Each level of the walk is scanned in
/// parallel.
pub fn resolve_media_usage(package: &Package, excluded: &BTreeSet<String>) -> MediaUsage {
    let mut usage = MediaUsage::default();
    let mut frontier = usage_roots(package, excluded);
    let mut visited: BTreeSet<String> = frontier.iter().cloned().collect();

    while !frontier.is_empty() {
        let scans: Vec<PartScan> = frontier
            .par_iter()
            .map(|part| scan_part(package, part))
            .collect();
        usage.parts_scanned += frontier.len();

        let mut next = Vec::new();
        for scan in scans {
            usage.used.extend(scan.media);
            if let Some(err) = scan.failure {
                tracing::warn!(error = %err, "part contributes no media references");
                usage.failures.push(err);
            }
            for part in scan.follow {
                if !excluded.contains(&part) && visited.insert(part.clone()) {
                    next.push(part);
                }
            }
        }
        frontier = next;
    }

    tracing::debug!(
        used = usage.used.len(),
        scanned = usage.parts_scanned,
        failures = usage.failures.len(),
        "media usage resolved"
    );
    usage
}

fn scan_part(package: &Package, part: &str) -> PartScan {
    let mut scan = PartScan::default();

    let xml = match package.read_text(part) {
        Ok(Some(xml)) => xml,
        Ok(None) => return scan,
        Err(err) => {
            scan.failure = Some(err);
            return scan;
        }
    };
    let root = match xml::parse(&xml) {
        Ok(root) => root,
        Err(err) => {
            scan.failure = Some(err.in_part(part));
            return scan;
        }
    };
    let rels = match package.read_relationships(part) {
        Ok(rels) => rels,
        Err(err) => {
            scan.failure = Some(err);
            return scan;
        }
    };

    for id in relationship_refs(&root) {
        // Ids without a relationship contribute nothing
        let Some(rel) = rels.get(&id) else { continue };
        if !rel.is_media() {
            continue;
        }
        if let Some(target) = rel.resolve(part) {
            let canonical = package.resolve_entry(&target).map(str::to_string).unwrap_or(target);
            scan.media.push(canonical);
        }
    }

    for rel in rels.iter() {
        let Some(target) = rel.resolve(part) else { continue };
        if !target.to_ascii_lowercase().ends_with(".xml") {
            continue;
        }
        if let Some(existing) = package.resolve_entry(&target) {
            scan.follow.push(existing.to_string());
        }
    }
    scan
}

/// Media entries eligible for optimization, in archive order.
pub fn media_candidates(package: &Package) -> Vec<String> {
    package
        .list_files()
        .into_iter()
        .filter(|path| media_kind_of(path).is_some())
        .collect()
}

/// Candidates that `usage` does not reference.
pub fn unused_media(package: &Package, usage: &MediaUsage) -> Vec<String> {
    media_candidates(package)
        .into_iter()
        .filter(|path| !usage.is_used(path))
        .collect()
}
