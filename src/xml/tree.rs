//! Explicit XML tree and the parser that builds it.

use crate::error::{Error, Result};
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use std::borrow::Cow;

/// A node in an XML part.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum XmlNode {
    /// Child element
    Element(XmlElement),
    /// Character data (CDATA sections are folded in here)
    Text(String),
}

/// An XML element with its qualified name, attributes and children.
///
/// Namespace declarations (`xmlns`, `xmlns:*`) are kept as ordinary
/// attributes so that the prefixes used in element and attribute names stay
/// bound after a rebuild.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct XmlElement {
    /// Qualified name (`prefix:local` or `local`)
    pub name: String,
    /// Attributes in document order
    pub attributes: Vec<(String, String)>,
    /// Child nodes in document order
    pub children: Vec<XmlNode>,
}

impl XmlElement {
    /// Create an element without attributes or children.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Builder-style attribute setter.
    pub fn with_attribute(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.set_attribute(name, value);
        self
    }

    /// Builder-style child element.
    pub fn with_child(mut self, child: XmlElement) -> Self {
        self.children.push(XmlNode::Element(child));
        self
    }

    /// Local part of the element name.
    pub fn local_name(&self) -> &str {
        local_part(&self.name)
    }

    /// Prefix of the element name, if any.
    pub fn prefix(&self) -> Option<&str> {
        self.name.split_once(':').map(|(prefix, _)| prefix)
    }

    /// Value of an attribute by its qualified name.
    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    /// Set an attribute, replacing an existing value in place.
    pub fn set_attribute(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        match self.attributes.iter_mut().find(|(key, _)| *key == name) {
            Some(slot) => slot.1 = value,
            None => self.attributes.push((name, value)),
        }
    }

    /// Remove an attribute, returning its value.
    pub fn remove_attribute(&mut self, name: &str) -> Option<String> {
        let pos = self.attributes.iter().position(|(key, _)| key == name)?;
        Some(self.attributes.remove(pos).1)
    }

    /// Iterate over child elements.
    pub fn elements(&self) -> impl Iterator<Item = &XmlElement> {
        self.children.iter().filter_map(|node| match node {
            XmlNode::Element(el) => Some(el),
            XmlNode::Text(_) => None,
        })
    }

    /// Iterate mutably over child elements.
    pub fn elements_mut(&mut self) -> impl Iterator<Item = &mut XmlElement> {
        self.children.iter_mut().filter_map(|node| match node {
            XmlNode::Element(el) => Some(el),
            XmlNode::Text(_) => None,
        })
    }

    /// First child element with the given local name.
    pub fn child(&self, local: &str) -> Option<&XmlElement> {
        self.elements().find(|el| el.local_name() == local)
    }

    /// First child element with the given local name, mutably.
    pub fn child_mut(&mut self, local: &str) -> Option<&mut XmlElement> {
        self.elements_mut().find(|el| el.local_name() == local)
    }

    /// Keep only the child elements for which `keep` returns true.
    ///
    /// Text nodes are never removed. Returns the number of elements dropped.
    pub fn retain_elements(&mut self, mut keep: impl FnMut(&XmlElement) -> bool) -> usize {
        let before = self.children.len();
        self.children.retain(|node| match node {
            XmlNode::Element(el) => keep(el),
            XmlNode::Text(_) => true,
        });
        before - self.children.len()
    }

    /// Visit this element and all descendant elements, depth first.
    pub fn visit_mut(&mut self, f: &mut impl FnMut(&mut XmlElement)) {
        f(self);
        for child in self.elements_mut() {
            child.visit_mut(f);
        }
    }

    /// Concatenated text of this element and its descendants.
    pub fn text(&self) -> String {
        let mut out = String::new();
        self.collect_text(&mut out);
        out
    }

    fn collect_text(&self, out: &mut String) {
        for node in &self.children {
            match node {
                XmlNode::Text(text) => out.push_str(text),
                XmlNode::Element(el) => el.collect_text(out),
            }
        }
    }

    /// Structural equality ignoring attribute order.
    pub fn structurally_eq(&self, other: &XmlElement) -> bool {
        if self.name != other.name || self.children.len() != other.children.len() {
            return false;
        }
        let mut mine: Vec<_> = self.attributes.iter().collect();
        let mut theirs: Vec<_> = other.attributes.iter().collect();
        mine.sort();
        theirs.sort();
        if mine != theirs {
            return false;
        }
        self.children
            .iter()
            .zip(&other.children)
            .all(|pair| match pair {
                (XmlNode::Text(a), XmlNode::Text(b)) => a == b,
                (XmlNode::Element(a), XmlNode::Element(b)) => a.structurally_eq(b),
                _ => false,
            })
    }
}

/// Local part of a qualified name.
pub fn local_part(name: &str) -> &str {
    name.rsplit_once(':').map(|(_, local)| local).unwrap_or(name)
}

/// Strip a leading byte-order mark and normalize CRLF / CR line endings.
pub fn normalize(xml: &str) -> Cow<'_, str> {
    let body = xml.strip_prefix('\u{FEFF}').unwrap_or(xml);
    if body.contains('\r') {
        Cow::Owned(body.replace("\r\n", "\n").replace('\r', "\n"))
    } else {
        Cow::Borrowed(body)
    }
}

/// Parse an XML document into its root element.
///
/// The XML declaration, comments, processing instructions and DOCTYPE are
/// not kept. Whitespace-only text inside the root is preserved.
pub fn parse(xml: &str) -> Result<XmlElement> {
    let normalized = normalize(xml);
    let mut reader = Reader::from_str(&normalized);
    reader.config_mut().trim_text(false);

    let mut stack: Vec<XmlElement> = Vec::new();
    let mut root: Option<XmlElement> = None;

    loop {
        let event = reader.read_event().map_err(|e| {
            Error::XmlParse(format!("at byte {}: {}", reader.buffer_position(), e))
        })?;

        match event {
            Event::Start(e) => {
                if stack.is_empty() && root.is_some() {
                    return Err(Error::XmlParse("multiple root elements".to_string()));
                }
                stack.push(element_from(&e)?);
            }
            Event::Empty(e) => {
                let element = element_from(&e)?;
                attach(&mut stack, &mut root, element)?;
            }
            Event::End(e) => {
                let element = stack.pop().ok_or_else(|| {
                    Error::XmlParse(format!(
                        "unexpected end tag </{}>",
                        String::from_utf8_lossy(e.name().as_ref())
                    ))
                })?;
                if element.name.as_bytes() != e.name().as_ref() {
                    return Err(Error::XmlParse(format!(
                        "end tag </{}> does not match <{}>",
                        String::from_utf8_lossy(e.name().as_ref()),
                        element.name
                    )));
                }
                attach(&mut stack, &mut root, element)?;
            }
            Event::Text(e) => {
                let text = e.unescape()?;
                push_text(&mut stack, &text)?;
            }
            Event::CData(e) => {
                let raw = e.into_inner();
                push_text(&mut stack, &String::from_utf8_lossy(&raw))?;
            }
            Event::Eof => break,
            // Declaration, comments, PIs and DOCTYPE carry no structure we keep
            _ => {}
        }
    }

    if let Some(open) = stack.last() {
        return Err(Error::XmlParse(format!("unclosed element <{}>", open.name)));
    }
    root.ok_or_else(|| Error::XmlParse("no root element".to_string()))
}

fn element_from(start: &BytesStart<'_>) -> Result<XmlElement> {
    let mut element = XmlElement::new(String::from_utf8_lossy(start.name().as_ref()).into_owned());
    for attr in start.attributes() {
        let attr = attr?;
        let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
        let value = attr.unescape_value()?.into_owned();
        element.attributes.push((key, value));
    }
    Ok(element)
}

fn attach(
    stack: &mut [XmlElement],
    root: &mut Option<XmlElement>,
    element: XmlElement,
) -> Result<()> {
    match stack.last_mut() {
        Some(parent) => {
            parent.children.push(XmlNode::Element(element));
            Ok(())
        }
        None if root.is_none() => {
            *root = Some(element);
            Ok(())
        }
        None => Err(Error::XmlParse("multiple root elements".to_string())),
    }
}

fn push_text(stack: &mut [XmlElement], text: &str) -> Result<()> {
    match stack.last_mut() {
        Some(parent) => {
            if text.is_empty() {
                return Ok(());
            }
            // Adjacent text and CDATA collapse into one node
            if let Some(XmlNode::Text(prev)) = parent.children.last_mut() {
                prev.push_str(text);
            } else {
                parent.children.push(XmlNode::Text(text.to_string()));
            }
            Ok(())
        }
        None if text.trim().is_empty() => Ok(()),
        None => Err(Error::XmlParse("text outside the root element".to_string())),
    }
}

/// Read one attribute of the root element without parsing the rest.
///
/// Returns `None` when the document has no root element, the attribute is
/// absent, or the start tag itself is malformed.
pub fn root_attribute(xml: &str, name: &str) -> Option<String> {
    let normalized = normalize(xml);
    let mut reader = Reader::from_str(&normalized);
    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) | Ok(Event::Empty(e)) => {
                return e
                    .attributes()
                    .flatten()
                    .find(|attr| attr.key.as_ref() == name.as_bytes())
                    .and_then(|attr| attr.unescape_value().ok().map(Cow::into_owned));
            }
            Ok(Event::Eof) | Err(_) => return None,
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SLIDE: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<p:sld xmlns:a="http://schemas.openxmlformats.org/drawingml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships" xmlns:p="http://schemas.openxmlformats.org/presentationml/2006/main" show="0">
  <p:cSld>
    <p:spTree>
      <p:pic>
        <p:blipFill><a:blip r:embed="rId2"/></p:blipFill>
      </p:pic>
      <a:t>Fish &amp; Chips</a:t>
    </p:spTree>
  </p:cSld>
</p:sld>"#;

    #[test]
    fn test_parse_basic_tree() {
        let root = parse(SLIDE).unwrap();
        assert_eq!(root.name, "p:sld");
        assert_eq!(root.local_name(), "sld");
        assert_eq!(root.prefix(), Some("p"));
        assert_eq!(root.attribute("show"), Some("0"));

        let tree = root.child("cSld").and_then(|c| c.child("spTree")).unwrap();
        let blip = tree
            .child("pic")
            .and_then(|p| p.child("blipFill"))
            .and_then(|b| b.child("blip"))
            .unwrap();
        assert_eq!(blip.attribute("r:embed"), Some("rId2"));
        assert_eq!(tree.child("t").unwrap().text(), "Fish & Chips");
    }

    #[test]
    fn test_parse_strips_bom_and_crlf() {
        let xml = "\u{FEFF}<root>\r\n<a>x\r\ny</a>\r\n</root>";
        let root = parse(xml).unwrap();
        assert_eq!(root.child("a").unwrap().text(), "x\ny");
        assert!(matches!(&root.children[0], XmlNode::Text(t) if t == "\n"));
    }

    #[test]
    fn test_parse_cdata_becomes_text() {
        let root = parse("<a>one <![CDATA[<two>]]> three</a>").unwrap();
        assert_eq!(root.children.len(), 1);
        assert_eq!(root.text(), "one <two> three");
    }

    #[test]
    fn test_parse_rejects_malformed() {
        assert!(parse("").is_err());
        assert!(parse("<a><b></a>").is_err());
        assert!(parse("<a>").is_err());
        assert!(parse("<a/><b/>").is_err());
        assert!(parse("<a x=\"1\" x=\"2\"/>").is_err());
        assert!(parse("<a/>trailing").is_err());
        assert!(parse("<Relationships><Relationship Id=\"rId1\"").is_err());
    }

    #[test]
    fn test_retain_and_visit() {
        let mut root = parse("<l>\n<i n=\"1\"/>\n<i n=\"2\"/>\n<i n=\"3\"/>\n</l>").unwrap();
        let dropped = root.retain_elements(|el| el.attribute("n") != Some("2"));
        assert_eq!(dropped, 1);
        assert_eq!(root.elements().count(), 2);

        let mut count = 0;
        root.visit_mut(&mut |_: &mut XmlElement| count += 1);
        assert_eq!(count, 3);
    }

    #[test]
    fn test_attribute_helpers() {
        let mut el = XmlElement::new("p:sldId").with_attribute("id", "256");
        el.set_attribute("id", "257");
        el.set_attribute("r:id", "rId2");
        assert_eq!(el.attributes.len(), 2);
        assert_eq!(el.attribute("id"), Some("257"));
        assert_eq!(el.remove_attribute("r:id"), Some("rId2".to_string()));
        assert_eq!(el.remove_attribute("r:id"), None);
    }

    #[test]
    fn test_structurally_eq_ignores_attribute_order() {
        let a = parse(r#"<a x="1" y="2"><b/>text</a>"#).unwrap();
        let b = parse(r#"<a y="2" x="1"><b/>text</a>"#).unwrap();
        let c = parse(r#"<a y="2" x="1"><b/>other</a>"#).unwrap();
        assert!(a.structurally_eq(&b));
        assert!(!a.structurally_eq(&c));
    }

    #[test]
    fn test_root_attribute() {
        assert_eq!(root_attribute(SLIDE, "show"), Some("0".to_string()));
        assert_eq!(root_attribute(SLIDE, "missing"), None);
        assert_eq!(root_attribute("<p:sld", "show"), None);
    }
}
