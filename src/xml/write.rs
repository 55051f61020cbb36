//! Serialization of [`XmlElement`] trees back to part text.

use super::tree::{XmlElement, XmlNode};
use crate::error::{Error, Result};
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;
use std::borrow::Cow;

/// Options for [`serialize`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SerializeOptions {
    /// Rename the root element
    pub root_name: Option<String>,
    /// Namespace declarations (`xmlns` / `xmlns:prefix`, URI) ensured on the root
    pub namespaces: Vec<(String, String)>,
}

impl SerializeOptions {
    /// Set the root element name.
    pub fn with_root_name(mut self, name: impl Into<String>) -> Self {
        self.root_name = Some(name.into());
        self
    }

    /// Declare a namespace on the root; an empty prefix is the default namespace.
    pub fn with_namespace(mut self, prefix: &str, uri: impl Into<String>) -> Self {
        let attr = if prefix.is_empty() {
            "xmlns".to_string()
        } else {
            format!("xmlns:{prefix}")
        };
        self.namespaces.push((attr, uri.into()));
        self
    }
}

/// Whether `c` may appear in an XML 1.0 document.
pub fn is_xml_char(c: char) -> bool {
    matches!(c,
        '\t' | '\n' | '\r'
        | '\u{20}'..='\u{D7FF}'
        | '\u{E000}'..='\u{FFFD}'
        | '\u{10000}'..='\u{10FFFF}')
}

/// Remove characters that XML 1.0 does not allow.
pub fn strip_invalid_chars(s: &str) -> Cow<'_, str> {
    if s.chars().all(is_xml_char) {
        Cow::Borrowed(s)
    } else {
        Cow::Owned(s.chars().filter(|&c| is_xml_char(c)).collect())
    }
}

fn is_name_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.' | ':')
}

fn is_name_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_'
}

/// Make an element or attribute name well formed.
///
/// Characters outside `[A-Za-z0-9_\-.:]` become `_`; a name that still does
/// not start with a letter or underscore gets an `item_` prefix.
pub fn sanitize_name(name: &str) -> Cow<'_, str> {
    let valid_start = name.chars().next().is_some_and(is_name_start);
    if valid_start && name.chars().all(is_name_char) {
        return Cow::Borrowed(name);
    }
    let replaced: String = name
        .chars()
        .map(|c| if is_name_char(c) { c } else { '_' })
        .collect();
    if replaced.chars().next().is_some_and(is_name_start) {
        Cow::Owned(replaced)
    } else {
        Cow::Owned(format!("item_{replaced}"))
    }
}

/// Serialize a tree with an XML declaration.
pub fn serialize(root: &XmlElement, options: &SerializeOptions) -> Result<String> {
    let mut writer = Writer::new(Vec::new());
    writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), Some("yes"))))?;
    writer.get_mut().push(b'\n');

    let mut attributes = root.attributes.clone();
    for (name, uri) in &options.namespaces {
        if !attributes.iter().any(|(key, _)| key == name) {
            attributes.push((name.clone(), uri.clone()));
        }
    }
    let name = options.root_name.as_deref().unwrap_or(&root.name);
    write_element(&mut writer, name, &attributes, &root.children)?;

    String::from_utf8(writer.into_inner()).map_err(|e| Error::Encoding(e.to_string()))
}

fn write_element(
    writer: &mut Writer<Vec<u8>>,
    name: &str,
    attributes: &[(String, String)],
    children: &[XmlNode],
) -> Result<()> {
    let name = sanitize_name(name);
    let mut start = BytesStart::new(&*name);
    for (key, value) in attributes {
        let key = sanitize_name(key);
        let value = strip_invalid_chars(value);
        start.push_attribute((&*key, &*value));
    }

    if children.is_empty() {
        writer.write_event(Event::Empty(start))?;
        return Ok(());
    }

    writer.write_event(Event::Start(start))?;
    for child in children {
        match child {
            XmlNode::Element(el) => write_element(writer, &el.name, &el.attributes, &el.children)?,
            XmlNode::Text(text) => {
                let text = strip_invalid_chars(text);
                if !text.is_empty() {
                    writer.write_event(Event::Text(BytesText::new(&text)))?;
                }
            }
        }
    }
    writer.write_event(Event::End(BytesEnd::new(&*name)))?;
    Ok(())
}
