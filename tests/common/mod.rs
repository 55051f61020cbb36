//! Synthetic presentation packages for integration tests.

#![allow(dead_code)]

use image::{ImageFormat, Rgba, RgbaImage};
use std::io::{Cursor, Read, Write};
use zip::write::SimpleFileOptions;

pub const REL_SLIDE: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships/slide";
pub const REL_IMAGE: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships/image";
pub const REL_NOTES: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships/notesSlide";
const REL_LAYOUT: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships/slideLayout";
const REL_MASTER: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships/slideMaster";
const REL_OFFICE_DOCUMENT: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument";

const NAMESPACES: &str = r#"xmlns:a="http://schemas.openxmlformats.org/drawingml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships" xmlns:p="http://schemas.openxmlformats.org/presentationml/2006/main""#;
const DECL: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#;

/// One slide of a synthetic deck.
#[derive(Debug, Clone, Default)]
pub struct SlideSpec {
    pub hidden: bool,
    /// Media file names under `ppt/media/` drawn on the slide
    pub images: Vec<String>,
    /// Media file names linked from the slide's rels but not drawn
    pub dangling_images: Vec<String>,
    pub notes: bool,
    /// 1-based slide numbers this slide hyperlinks to
    pub links: Vec<usize>,
}

impl SlideSpec {
    pub fn visible() -> Self {
        Self::default()
    }

    pub fn hidden() -> Self {
        Self {
            hidden: true,
            ..Default::default()
        }
    }

    pub fn with_image(mut self, name: &str) -> Self {
        self.images.push(name.to_string());
        self
    }

    pub fn with_unreferenced_image(mut self, name: &str) -> Self {
        self.dangling_images.push(name.to_string());
        self
    }

    pub fn with_notes(mut self) -> Self {
        self.notes = true;
        self
    }

    pub fn with_link(mut self, slide: usize) -> Self {
        self.links.push(slide);
        self
    }
}

/// Builder for a minimal but well-formed presentation package.
#[derive(Debug, Default)]
pub struct DeckBuilder {
    slides: Vec<SlideSpec>,
    media: Vec<(String, Vec<u8>)>,
    layout_image: Option<String>,
    media_overrides: bool,
    overrides: Vec<(String, Vec<u8>)>,
    removed: Vec<String>,
}

impl DeckBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn slide(mut self, slide: SlideSpec) -> Self {
        self.slides.push(slide);
        self
    }

    pub fn media(mut self, name: &str, bytes: Vec<u8>) -> Self {
        self.media.push((name.to_string(), bytes));
        self
    }

    /// Draw `name` on the slide layout.
    pub fn layout_image(mut self, name: &str) -> Self {
        self.layout_image = Some(name.to_string());
        self
    }

    /// List every media entry as a content-type override too.
    pub fn media_overrides(mut self) -> Self {
        self.media_overrides = true;
        self
    }

    /// Replace the generated content of `path` (or add an extra entry).
    pub fn part(mut self, path: &str, bytes: impl Into<Vec<u8>>) -> Self {
        self.overrides.push((path.to_string(), bytes.into()));
        self
    }

    /// Leave `path` out of the archive.
    pub fn without(mut self, path: &str) -> Self {
        self.removed.push(path.to_string());
        self
    }

    pub fn files(&self) -> Vec<(String, Vec<u8>)> {
        let mut files: Vec<(String, Vec<u8>)> = Vec::new();
        let mut add = |path: String, text: String| files.push((path, text.into_bytes()));

        add("[Content_Types].xml".into(), self.content_types());
        add(
            "_rels/.rels".into(),
            rels(&[("rId1", REL_OFFICE_DOCUMENT, "ppt/presentation.xml".to_string())]),
        );
        add("ppt/presentation.xml".into(), self.presentation());

        let mut pres_rels = vec![(
            "rId1".to_string(),
            REL_MASTER,
            "slideMasters/slideMaster1.xml".to_string(),
        )];
        for i in 0..self.slides.len() {
            pres_rels.push((format!("rId{}", 10 + i), REL_SLIDE, format!("slides/slide{}.xml", i + 1)));
        }
        add("ppt/_rels/presentation.xml.rels".into(), rels_owned(&pres_rels));

        add(
            "ppt/slideMasters/slideMaster1.xml".into(),
            format!(
                r#"{DECL}<p:sldMaster {NAMESPACES}><p:cSld><p:spTree/></p:cSld><p:sldLayoutIdLst><p:sldLayoutId id="2147483649" r:id="rId1"/></p:sldLayoutIdLst></p:sldMaster>"#
            ),
        );
        add(
            "ppt/slideMasters/_rels/slideMaster1.xml.rels".into(),
            rels(&[("rId1", REL_LAYOUT, "../slideLayouts/slideLayout1.xml".to_string())]),
        );

        let layout_tree = self
            .layout_image
            .as_ref()
            .map(|_| picture("rId2"))
            .unwrap_or_default();
        add(
            "ppt/slideLayouts/slideLayout1.xml".into(),
            format!(r#"{DECL}<p:sldLayout {NAMESPACES}><p:cSld><p:spTree>{layout_tree}</p:spTree></p:cSld></p:sldLayout>"#),
        );
        let mut layout_rels = vec![("rId1", REL_MASTER, "../slideMasters/slideMaster1.xml".to_string())];
        if let Some(name) = &self.layout_image {
            layout_rels.push(("rId2", REL_IMAGE, format!("../media/{name}")));
        }
        add("ppt/slideLayouts/_rels/slideLayout1.xml.rels".into(), rels(&layout_rels));

        for (i, slide) in self.slides.iter().enumerate() {
            let n = i + 1;
            let mut tree = String::new();
            let mut slide_rels = vec![(
                "rId1".to_string(),
                REL_LAYOUT,
                "../slideLayouts/slideLayout1.xml".to_string(),
            )];
            for (j, name) in slide.images.iter().enumerate() {
                let id = format!("rId{}", 2 + j);
                tree.push_str(&picture(&id));
                slide_rels.push((id, REL_IMAGE, format!("../media/{name}")));
            }
            for (j, name) in slide.dangling_images.iter().enumerate() {
                slide_rels.push((format!("rId{}", 50 + j), REL_IMAGE, format!("../media/{name}")));
            }
            for (j, target) in slide.links.iter().enumerate() {
                slide_rels.push((format!("rId{}", 80 + j), REL_SLIDE, format!("slide{target}.xml")));
            }
            if slide.notes {
                slide_rels.push((
                    "rId99".to_string(),
                    REL_NOTES,
                    format!("../notesSlides/notesSlide{n}.xml"),
                ));
                add(
                    format!("ppt/notesSlides/notesSlide{n}.xml"),
                    format!(r#"{DECL}<p:notes {NAMESPACES}><p:cSld><p:spTree/></p:cSld></p:notes>"#),
                );
                add(
                    format!("ppt/notesSlides/_rels/notesSlide{n}.xml.rels"),
                    rels(&[("rId1", REL_SLIDE, format!("../slides/slide{n}.xml"))]),
                );
            }

            let show = if slide.hidden { r#" show="0""# } else { "" };
            add(
                format!("ppt/slides/slide{n}.xml"),
                format!(
                    r#"{DECL}<p:sld {NAMESPACES}{show}><p:cSld><p:spTree><p:nvGrpSpPr><p:cNvPr id="1" name="Slide {n}"/></p:nvGrpSpPr>{tree}</p:spTree></p:cSld></p:sld>"#
                ),
            );
            add(format!("ppt/slides/_rels/slide{n}.xml.rels"), rels_owned(&slide_rels));
        }

        for (name, bytes) in &self.media {
            files.push((format!("ppt/media/{name}"), bytes.clone()));
        }

        for (path, bytes) in &self.overrides {
            match files.iter_mut().find(|(p, _)| p == path) {
                Some(entry) => entry.1 = bytes.clone(),
                None => files.push((path.clone(), bytes.clone())),
            }
        }
        files.retain(|(path, _)| !self.removed.contains(path));
        files
    }

    pub fn build(&self) -> Vec<u8> {
        let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
        for (path, bytes) in self.files() {
            writer.start_file(path, SimpleFileOptions::default()).unwrap();
            writer.write_all(&bytes).unwrap();
        }
        writer.finish().unwrap().into_inner()
    }

    fn presentation(&self) -> String {
        let ids: String = (0..self.slides.len())
            .map(|i| format!(r#"<p:sldId id="{}" r:id="rId{}"/>"#, 256 + i, 10 + i))
            .collect();
        format!(
            r#"{DECL}<p:presentation {NAMESPACES} saveSubsetFonts="1"><p:sldMasterIdLst><p:sldMasterId id="2147483648" r:id="rId1"/></p:sldMasterIdLst><p:sldIdLst>{ids}</p:sldIdLst><p:sldSz cx="12192000" cy="6858000"/></p:presentation>"#
        )
    }

    fn content_types(&self) -> String {
        let mut overrides = String::from(
            r#"<Override PartName="/ppt/presentation.xml" ContentType="application/vnd.openxmlformats-officedocument.presentationml.presentation.main+xml"/><Override PartName="/ppt/slideMasters/slideMaster1.xml" ContentType="application/vnd.openxmlformats-officedocument.presentationml.slideMaster+xml"/><Override PartName="/ppt/slideLayouts/slideLayout1.xml" ContentType="application/vnd.openxmlformats-officedocument.presentationml.slideLayout+xml"/>"#,
        );
        for (i, slide) in self.slides.iter().enumerate() {
            let n = i + 1;
            overrides.push_str(&format!(
                r#"<Override PartName="/ppt/slides/slide{n}.xml" ContentType="application/vnd.openxmlformats-officedocument.presentationml.slide+xml"/>"#
            ));
            if slide.notes {
                overrides.push_str(&format!(
                    r#"<Override PartName="/ppt/notesSlides/notesSlide{n}.xml" ContentType="application/vnd.openxmlformats-officedocument.presentationml.notesSlide+xml"/>"#
                ));
            }
        }
        if self.media_overrides {
            for (name, _) in &self.media {
                overrides.push_str(&format!(
                    r#"<Override PartName="/ppt/media/{name}" ContentType="image/png"/>"#
                ));
            }
        }
        format!(
            r#"{DECL}<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"><Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/><Default Extension="xml" ContentType="application/xml"/><Default Extension="png" ContentType="image/png"/><Default Extension="jpeg" ContentType="image/jpeg"/><Default Extension="emf" ContentType="image/x-emf"/>{overrides}</Types>"#
        )
    }
}

fn picture(rel_id: &str) -> String {
    format!(
        r#"<p:pic><p:nvPicPr><p:cNvPr id="4" name="Picture"/><p:cNvPicPr/><p:nvPr/></p:nvPicPr><p:blipFill><a:blip r:embed="{rel_id}"/></p:blipFill></p:pic>"#
    )
}

fn rels(entries: &[(&str, &str, String)]) -> String {
    let owned: Vec<(String, &str, String)> = entries
        .iter()
        .map(|(id, ty, target)| (id.to_string(), *ty, target.clone()))
        .collect();
    rels_owned(&owned)
}

fn rels_owned(entries: &[(String, &str, String)]) -> String {
    let mut out = format!(
        r#"{DECL}<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">"#
    );
    for (id, ty, target) in entries {
        out.push_str(&format!(r#"<Relationship Id="{id}" Type="{ty}" Target="{target}"/>"#));
    }
    out.push_str("</Relationships>");
    out
}

/// Deterministic noise that compresses poorly as PNG.
pub fn noisy_png(width: u32, height: u32) -> Vec<u8> {
    let mut state: u32 = 0x2545_f491;
    let image = RgbaImage::from_fn(width, height, |_, _| {
        state ^= state << 13;
        state ^= state >> 17;
        state ^= state << 5;
        let [r, g, b, _] = state.to_le_bytes();
        Rgba([r, g, b, 255])
    });
    let mut out = Cursor::new(Vec::new());
    image.write_to(&mut out, ImageFormat::Png).unwrap();
    out.into_inner()
}

/// Small PNG with a recognizable body.
pub fn tiny_png() -> Vec<u8> {
    let image = RgbaImage::from_fn(4, 4, |x, y| Rgba([(x * 60) as u8, (y * 60) as u8, 0, 255]));
    let mut out = Cursor::new(Vec::new());
    image.write_to(&mut out, ImageFormat::Png).unwrap();
    out.into_inner()
}

/// Entries of an output archive, in archive order.
pub fn entries(data: &[u8]) -> Vec<(String, Vec<u8>)> {
    let mut archive = zip::ZipArchive::new(Cursor::new(data)).unwrap();
    (0..archive.len())
        .map(|i| {
            let mut file = archive.by_index(i).unwrap();
            let mut bytes = Vec::new();
            file.read_to_end(&mut bytes).unwrap();
            (file.name().to_string(), bytes)
        })
        .collect()
}

pub fn names(data: &[u8]) -> Vec<String> {
    entries(data).into_iter().map(|(name, _)| name).collect()
}

pub fn text_of(data: &[u8], path: &str) -> Option<String> {
    entries(data)
        .into_iter()
        .find(|(name, _)| name == path)
        .map(|(_, bytes)| String::from_utf8(bytes).unwrap())
}

pub fn bytes_of(data: &[u8], path: &str) -> Option<Vec<u8>> {
    entries(data)
        .into_iter()
        .find(|(name, _)| name == path)
        .map(|(_, bytes)| bytes)
}
