//! Deletion of slides dropped from the slide list.

use super::presentation::SlideRef;
use super::PRESENTATION_RELS_PART;
use crate::container::Package;
use crate::rels::Relationships;
use std::collections::{BTreeMap, BTreeSet};

/// A dropped slide and the parts that go with it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlideGroup {
    /// Slide part
    pub slide: String,
    /// Slide part, its `.rels`, its notes slide and the notes `.rels`
    pub parts: Vec<String>,
}

fn group_for(package: &Package, slide: &str) -> SlideGroup {
    let mut parts = vec![slide.to_string()];
    let slide_rels = Package::rels_path_for(slide);
    if package.exists(&slide_rels) {
        parts.push(slide_rels);
    }

    // A slide whose rels cannot be read keeps its notes slide
    let notes = package
        .read_relationships(slide)
        .ok()
        .and_then(|rels| {
            rels.iter()
                .find(|rel| rel.is_notes_slide())
                .and_then(|rel| rel.resolve(slide))
        })
        .and_then(|notes| package.resolve_entry(&notes).map(str::to_string));
    if let Some(notes) = notes {
        let notes_rels = Package::rels_path_for(&notes);
        parts.push(notes);
        if package.exists(&notes_rels) {
            parts.push(notes_rels);
        }
    }

    SlideGroup {
        slide: slide.to_string(),
        parts,
    }
}

fn file_name(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}

/// Dropped slides that no remaining part links to.
///
/// A dropped slide stays when a relationship outside the groups being
/// deleted targets it (a hyperlink from a kept slide, say). Keeping one
/// slide makes its own relationships count as referrers, so this runs to a
/// fixpoint. Targets match slide parts ignoring ASCII case. The
/// presentation's relationships are ignored; the rewriter removes those
/// itself.
///
/// Slides left out of the result should stay in the slide list; see
/// [`still_linked`].
pub fn removable_groups(package: &Package, dropped: &[SlideRef]) -> Vec<SlideGroup> {
    let mut groups: Vec<SlideGroup> = dropped
        .iter()
        .filter_map(|slide| slide.path.as_deref())
        .filter_map(|path| package.resolve_entry(path))
        .collect::<BTreeSet<_>>()
        .into_iter()
        .map(|path| group_for(package, path))
        .collect();

    loop {
        let deleting: BTreeSet<&str> = groups
            .iter()
            .flat_map(|g| g.parts.iter().map(String::as_str))
            .collect();
        let candidates: BTreeMap<String, &str> = groups
            .iter()
            .map(|g| (g.slide.to_ascii_lowercase(), g.slide.as_str()))
            .collect();
        let mut referenced: BTreeSet<String> = BTreeSet::new();

        for rels_path in package.list_files() {
            if !rels_path.ends_with(".rels")
                || rels_path == PRESENTATION_RELS_PART
                || deleting.contains(rels_path.as_str())
            {
                continue;
            }
            let Some(owner) = Package::part_for_rels(&rels_path) else {
                continue;
            };
            let Ok(Some(text)) = package.read_text(&rels_path) else {
                continue;
            };
            match Relationships::parse(&text) {
                Ok(rels) => referenced.extend(
                    rels.iter()
                        .filter_map(|rel| rel.resolve(&owner))
                        .filter_map(|target| candidates.get(&target.to_ascii_lowercase()))
                        .map(|slide| slide.to_string()),
                ),
                Err(err) => {
                    // Unreadable referrer: keep anything it might name
                    tracing::warn!(part = %rels_path, error = %err, "cannot check slide links");
                    let text = text.to_ascii_lowercase();
                    referenced.extend(
                        candidates
                            .iter()
                            .filter(|(key, _)| text.contains(file_name(key)))
                            .map(|(_, slide)| slide.to_string()),
                    );
                }
            }
        }

        if referenced.is_empty() {
            break;
        }
        for slide in &referenced {
            tracing::debug!(slide = %slide, "dropped slide is still linked; keeping its part");
        }
        groups.retain(|g| !referenced.contains(&g.slide));
    }
    groups
}

/// Dropped slides whose part exists but is not in `groups`.
///
/// These are still linked from a kept part, so their list entries should
/// stay too; otherwise the package keeps a slide part the presentation no
/// longer lists.
pub fn still_linked(package: &Package, dropped: &[SlideRef], groups: &[SlideGroup]) -> BTreeSet<String> {
    let removable: BTreeSet<String> = groups.iter().map(|g| g.slide.to_ascii_lowercase()).collect();
    dropped
        .iter()
        .filter_map(|slide| slide.path.as_deref())
        .filter_map(|path| package.resolve_entry(path))
        .filter(|path| !removable.contains(&path.to_ascii_lowercase()))
        .map(str::to_string)
        .collect()
}

/// Parts named by `groups`.
pub fn group_parts(groups: &[SlideGroup]) -> BTreeSet<String> {
    groups.iter().flat_map(|g| g.parts.iter().cloned()).collect()
}

/// Delete every part of every group; returns the number of parts removed.
pub fn delete_groups(package: &mut Package, groups: &[SlideGroup]) -> usize {
    groups
        .iter()
        .flat_map(|g| g.parts.iter())
        .filter(|part| package.remove(part))
        .count()
}
