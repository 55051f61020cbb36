//! Relationship parts (`_rels/*.rels`).

use crate::container::Package;
use crate::error::{Error, Result};
use crate::xml::{self, SerializeOptions, XmlElement, NS_RELATIONSHIPS, NS_RELATIONSHIPS_STRICT};
use percent_encoding::percent_decode_str;
use std::collections::BTreeSet;

const OFFICE_REL_BASE: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships/";
const STRICT_REL_BASE: &str = "http://purl.oclc.org/ooxml/officeDocument/relationships/";

/// Image relationship type.
pub const REL_IMAGE: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships/image";
/// Slide relationship type.
pub const REL_SLIDE: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships/slide";
/// Slide layout relationship type.
pub const REL_SLIDE_LAYOUT: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships/slideLayout";
/// Slide master relationship type.
pub const REL_SLIDE_MASTER: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships/slideMaster";
/// Notes slide relationship type.
pub const REL_NOTES_SLIDE: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships/notesSlide";
/// Video relationship type.
pub const REL_VIDEO: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships/video";
/// Audio relationship type.
pub const REL_AUDIO: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships/audio";
/// Office 2007+ embedded media relationship type.
pub const REL_MS_MEDIA: &str = "http://schemas.microsoft.com/office/2007/relationships/media";
/// HD Photo relationship type.
pub const REL_HDPHOTO: &str = "http://schemas.microsoft.com/office/2007/relationships/hdphoto";

/// A relationship entry from a .rels file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Relationship {
    /// Relationship ID (e.g., "rId1")
    pub id: String,
    /// Relationship type URI
    pub rel_type: String,
    /// Target path (relative or absolute)
    pub target: String,
    /// Whether the target is external
    pub external: bool,
}

impl Relationship {
    /// Last segment of an office relationship type, transitional or strict.
    fn office_kind(&self) -> Option<&str> {
        self.rel_type
            .strip_prefix(OFFICE_REL_BASE)
            .or_else(|| self.rel_type.strip_prefix(STRICT_REL_BASE))
    }

    /// Whether this is an image relationship.
    pub fn is_image(&self) -> bool {
        self.office_kind() == Some("image")
    }

    /// Whether this is a slide relationship.
    pub fn is_slide(&self) -> bool {
        self.office_kind() == Some("slide")
    }

    /// Whether this is a notes slide relationship.
    pub fn is_notes_slide(&self) -> bool {
        self.office_kind() == Some("notesSlide")
    }

    /// Whether the target carries media bytes (images, video, audio).
    pub fn is_media(&self) -> bool {
        matches!(self.office_kind(), Some("image" | "video" | "audio"))
            || self.rel_type == REL_MS_MEDIA
            || self.rel_type == REL_HDPHOTO
    }

    /// Package path of the target, or `None` for external targets.
    ///
    /// The target is percent-decoded and any fragment is dropped before it
    /// is resolved against the owner part's directory.
    pub fn resolve(&self, owner_part: &str) -> Option<String> {
        if self.external || self.target.is_empty() {
            return None;
        }
        let target = self.target.split('#').next().unwrap_or_default();
        if target.is_empty() {
            return None;
        }
        let decoded = percent_decode_str(target).decode_utf8_lossy();
        Some(Package::resolve_path(owner_part, &decoded))
    }
}

/// Relationships of one part, in document order.
#[derive(Debug, Clone, Default)]
pub struct Relationships {
    items: Vec<Relationship>,
}

impl Relationships {
    /// Parse a `.rels` part.
    pub fn parse(xml: &str) -> Result<Self> {
        let root = xml::parse(xml)?;
        Ok(Self::from_element(&root))
    }

    /// Collect the `Relationship` children of a parsed `.rels` root.
    pub fn from_element(root: &XmlElement) -> Self {
        let items = root
            .elements()
            .filter(|el| el.local_name() == "Relationship")
            .filter_map(|el| {
                let id = el.attribute("Id").filter(|id| !id.is_empty())?;
                Some(Relationship {
                    id: id.to_string(),
                    rel_type: el.attribute("Type").unwrap_or_default().to_string(),
                    target: el.attribute("Target").unwrap_or_default().to_string(),
                    external: el
                        .attribute("TargetMode")
                        .is_some_and(|mode| mode.eq_ignore_ascii_case("external")),
                })
            })
            .collect();
        Self { items }
    }

    /// Get a relationship by ID.
    pub fn get(&self, id: &str) -> Option<&Relationship> {
        self.items.iter().find(|rel| rel.id == id)
    }

    /// Get relationships by type.
    pub fn get_by_type(&self, rel_type: &str) -> Vec<&Relationship> {
        self.items.iter().filter(|rel| rel.rel_type == rel_type).collect()
    }

    /// Iterate in document order.
    pub fn iter(&self) -> impl Iterator<Item = &Relationship> {
        self.items.iter()
    }

    /// Number of relationships.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Whether there are no relationships.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// Collect relationship ids referenced from a part's content.
///
/// An attribute is a reference when its prefix is bound to the office
/// relationships namespace (transitional or strict). The `r` prefix is
/// treated as bound even without a declaration.
pub fn relationship_refs(root: &XmlElement) -> BTreeSet<String> {
    let mut refs = BTreeSet::new();
    let bound = vec!["r".to_string()];
    collect_refs(root, &bound, &mut refs);
    refs
}

fn collect_refs(element: &XmlElement, inherited: &[String], refs: &mut BTreeSet<String>) {
    let mut scoped: Option<Vec<String>> = None;
    for (name, value) in &element.attributes {
        if let Some(prefix) = name.strip_prefix("xmlns:") {
            let bound = scoped.get_or_insert_with(|| inherited.to_vec());
            bound.retain(|p| p != prefix);
            if value == NS_RELATIONSHIPS || value == NS_RELATIONSHIPS_STRICT {
                bound.push(prefix.to_string());
            }
        }
    }
    let bound = scoped.as_deref().unwrap_or(inherited);

    for (name, value) in &element.attributes {
        if let Some((prefix, _)) = name.split_once(':') {
            if prefix != "xmlns" && bound.iter().any(|p| p == prefix) && !value.is_empty() {
                refs.insert(value.clone());
            }
        }
    }
    for child in element.elements() {
        collect_refs(child, bound, refs);
    }
}

/// Outcome of [`prune_dangling`].
#[derive(Debug, Default)]
pub struct PruneResult {
    /// Relationships removed across all parts
    pub removed: usize,
    /// `.rels` parts left untouched because they failed to parse or rebuild
    pub failures: Vec<Error>,
}

/// Remove relationships whose internal target was deleted.
///
/// Every remaining `.rels` part is checked. Targets are matched against
/// `deleted` ignoring ASCII case, the same way entries are looked up, unless
/// the target still names a live entry. A part is rewritten through the
/// validation gate only when something was removed; a part that fails to
/// parse or rebuild is left as it was.
pub fn prune_dangling(package: &mut Package, deleted: &BTreeSet<String>) -> PruneResult {
    let mut result = PruneResult::default();
    if deleted.is_empty() {
        return result;
    }
    let deleted: BTreeSet<String> = deleted.iter().map(|p| p.to_ascii_lowercase()).collect();

    let rels_parts: Vec<String> = package
        .list_files()
        .into_iter()
        .filter(|path| path.ends_with(".rels"))
        .collect();

    for rels_path in rels_parts {
        let Some(owner) = Package::part_for_rels(&rels_path) else {
            continue;
        };
        match prune_part(package, &rels_path, &owner, &deleted) {
            Ok(Some((text, removed))) => {
                tracing::debug!(part = %rels_path, removed, "pruned dangling relationships");
                package.write(&rels_path, text);
                result.removed += removed;
            }
            Ok(None) => {}
            Err(err) => {
                tracing::warn!(part = %rels_path, error = %err, "left relationships untouched");
                result.failures.push(err);
            }
        }
    }
    result
}

/// `deleted` holds lowercased paths.
fn prune_part(
    package: &Package,
    rels_path: &str,
    owner: &str,
    deleted: &BTreeSet<String>,
) -> Result<Option<(String, usize)>> {
    let Some(xml) = package.read_text(rels_path)? else {
        return Ok(None);
    };
    let mut root = xml::parse(&xml).map_err(|e| e.in_part(rels_path))?;

    let dangling: BTreeSet<String> = Relationships::from_element(&root)
        .iter()
        .filter(|rel| {
            rel.resolve(owner).is_some_and(|target| {
                package.resolve_entry(&target).is_none()
                    && deleted.contains(&target.to_ascii_lowercase())
            })
        })
        .map(|rel| rel.id.clone())
        .collect();
    if dangling.is_empty() {
        return Ok(None);
    }

    let removed = root.retain_elements(|el| {
        !(el.local_name() == "Relationship"
            && el.attribute("Id").is_some_and(|id| dangling.contains(id)))
    });
    let text = xml::rebuild(&root, &SerializeOptions::relationships())
        .map_err(|e| e.in_part(rels_path))?;
    Ok(Some((text, removed)))
}
