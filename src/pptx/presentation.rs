//! Presentation part rewriting.
//!
//! [`PresentationRewriter`] moves through `Loaded -> Filtered -> Serialized`.
//! Filtering that would leave no slide moves it to `Aborted` instead, and
//! nothing is written.

use super::{is_hidden_flag, PRESENTATION_PART, PRESENTATION_RELS_PART};
use crate::container::Package;
use crate::error::{Error, Result};
use crate::rels::{relationship_refs, Relationships};
use crate::xml::{self, SerializeOptions, XmlElement};
use std::collections::BTreeSet;

/// One entry of the presentation's slide list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlideRef {
    /// Numeric slide id (`id` attribute)
    pub id: String,
    /// Relationship id (`r:id` attribute)
    pub rel_id: String,
    /// Resolved slide part, when the relationship exists
    pub path: Option<String>,
    /// Marked hidden on the list entry or the slide part
    pub hidden: bool,
}

/// Rewriter state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RewriteState {
    /// Slide list read
    Loaded,
    /// Hidden slides selected for removal
    Filtered {
        /// Entries that will be removed
        dropped: Vec<SlideRef>,
    },
    /// Every slide is hidden; the part is left alone
    Aborted,
    /// Changes written to the package
    Serialized,
}

/// What [`PresentationRewriter::commit`] changed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CommitSummary {
    /// Slide list entries removed
    pub slides_removed: usize,
    /// Presentation relationships removed
    pub relationships_removed: usize,
}

/// Rewrites `ppt/presentation.xml` and its relationships.
#[derive(Debug)]
pub struct PresentationRewriter {
    root: XmlElement,
    rels_root: XmlElement,
    slides: Vec<SlideRef>,
    state: RewriteState,
}

fn load_part(package: &Package, path: &str, root_name: &str) -> Result<XmlElement> {
    let text = package
        .read_text(path)?
        .ok_or_else(|| Error::MissingPart(path.to_string()))?;
    let root = xml::parse(&text).map_err(|e| e.in_part(path))?;
    if root.name != root_name {
        return Err(Error::malformed(
            path,
            format!("root element is <{}>, expected <{}>", root.name, root_name),
        ));
    }
    Ok(root)
}

impl PresentationRewriter {
    /// Read the presentation part, its relationships and the slide list.
    pub fn load(package: &Package) -> Result<Self> {
        let root = load_part(package, PRESENTATION_PART, "p:presentation")?;
        let rels_root = load_part(package, PRESENTATION_RELS_PART, "Relationships")?;
        let rels = Relationships::from_element(&rels_root);

        let slides: Vec<SlideRef> = root
            .child("sldIdLst")
            .map(|list| {
                list.elements()
                    .filter(|el| el.local_name() == "sldId")
                    .map(|el| {
                        let rel_id = el.attribute("r:id").unwrap_or_default().to_string();
                        let path = rels.get(&rel_id).and_then(|rel| rel.resolve(PRESENTATION_PART));
                        let hidden = is_hidden_flag(el.attribute("show"))
                            || path.as_deref().is_some_and(|p| slide_part_hidden(package, p));
                        SlideRef {
                            id: el.attribute("id").unwrap_or_default().to_string(),
                            rel_id,
                            path,
                            hidden,
                        }
                    })
                    .collect()
            })
            .unwrap_or_default();

        Ok(Self {
            root,
            rels_root,
            slides,
            state: RewriteState::Loaded,
        })
    }

    /// Slide list as read.
    pub fn slides(&self) -> &[SlideRef] {
        &self.slides
    }

    /// Number of hidden slides.
    pub fn hidden_count(&self) -> usize {
        self.slides.iter().filter(|s| s.hidden).count()
    }

    /// Current state.
    pub fn state(&self) -> &RewriteState {
        &self.state
    }

    /// Entries selected for removal (empty unless `Filtered`).
    pub fn dropped(&self) -> &[SlideRef] {
        match &self.state {
            RewriteState::Filtered { dropped } => dropped.as_slice(),
            _ => &[],
        }
    }

    /// Select the hidden slides for removal.
    ///
    /// Moves `Loaded` to `Filtered`, or to `Aborted` when no slide would
    /// remain. Other states are left as they are.
    pub fn filter_hidden(&mut self) -> &RewriteState {
        if self.state == RewriteState::Loaded {
            let dropped: Vec<SlideRef> = self.slides.iter().filter(|s| s.hidden).cloned().collect();
            self.state = if !self.slides.is_empty() && dropped.len() == self.slides.len() {
                tracing::warn!(
                    slides = self.slides.len(),
                    "every slide is hidden; leaving the slide list unchanged"
                );
                RewriteState::Aborted
            } else {
                tracing::debug!(hidden = dropped.len(), "hidden slides selected");
                RewriteState::Filtered { dropped }
            };
        }
        &self.state
    }

    /// Take slides back out of the removal set.
    ///
    /// Entries whose slide part is in `paths` (matched ignoring ASCII case)
    /// stay in the slide list. Returns how many were kept; only `Filtered`
    /// changes.
    pub fn keep_listed(&mut self, paths: &BTreeSet<String>) -> usize {
        let RewriteState::Filtered { dropped } = &mut self.state else {
            return 0;
        };
        let before = dropped.len();
        dropped.retain(|slide| {
            !slide
                .path
                .as_deref()
                .is_some_and(|path| paths.iter().any(|keep| keep.eq_ignore_ascii_case(path)))
        });
        before - dropped.len()
    }

    /// Write the filtered presentation part and relationships.
    ///
    /// Both parts are rebuilt through the validation gate before either is
    /// written; on error neither changes. Writes nothing when no slide was
    /// dropped or the rewrite was aborted.
    pub fn commit(&mut self, package: &mut Package) -> Result<CommitSummary> {
        let dropped = match &self.state {
            RewriteState::Loaded => Vec::new(),
            RewriteState::Filtered { dropped } => dropped.clone(),
            RewriteState::Aborted | RewriteState::Serialized => return Ok(CommitSummary::default()),
        };
        if dropped.is_empty() {
            self.state = RewriteState::Serialized;
            return Ok(CommitSummary::default());
        }

        let ids: BTreeSet<&str> = dropped.iter().map(|s| s.id.as_str()).collect();
        let rel_ids: BTreeSet<&str> = dropped.iter().map(|s| s.rel_id.as_str()).collect();

        let mut root = self.root.clone();
        let mut slides_removed = 0;
        root.visit_mut(&mut |el: &mut XmlElement| match el.local_name() {
            // p:sldIdLst and the p14 section lists
            "sldIdLst" => {
                let removed = el.retain_elements(|entry| {
                    !(entry.local_name() == "sldId"
                        && entry.attribute("id").is_some_and(|id| ids.contains(id)))
                });
                if el.name == "p:sldIdLst" {
                    slides_removed += removed;
                }
            }
            // Custom show slide lists
            "sldLst" => {
                el.retain_elements(|entry| {
                    !(entry.local_name() == "sld"
                        && entry.attribute("r:id").is_some_and(|id| rel_ids.contains(id)))
                });
            }
            _ => {}
        });

        let still_referenced = relationship_refs(&root);
        let mut rels_root = self.rels_root.clone();
        let relationships_removed = rels_root.retain_elements(|el| {
            let Some(id) = el.attribute("Id") else {
                return true;
            };
            !(el.local_name() == "Relationship"
                && rel_ids.contains(id)
                && !still_referenced.contains(id))
        });

        let presentation_text = xml::rebuild(&root, &SerializeOptions::presentation())
            .map_err(|e| e.in_part(PRESENTATION_PART))?;
        let rels_text = xml::rebuild(&rels_root, &SerializeOptions::relationships())
            .map_err(|e| e.in_part(PRESENTATION_RELS_PART))?;

        package.write(PRESENTATION_PART, presentation_text);
        package.write(PRESENTATION_RELS_PART, rels_text);
        self.root = root;
        self.rels_root = rels_root;
        self.state = RewriteState::Serialized;

        tracing::debug!(slides_removed, relationships_removed, "presentation part rewritten");
        Ok(CommitSummary {
            slides_removed,
            relationships_removed,
        })
    }
}

fn slide_part_hidden(package: &Package, path: &str) -> bool {
    match package.read_text(path) {
        Ok(Some(xml)) => is_hidden_flag(xml::root_attribute(&xml, "show").as_deref()),
        _ => false,
    }
}
