//! Text-level cleanup applied to serialized parts before validation.

use super::tree::normalize;
use super::write::is_xml_char;

/// Standard declaration written at the top of every rebuilt part.
pub const XML_DECLARATION: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#;

/// Clean up XML text.
///
/// Strips a leading BOM, normalizes line endings, drops characters XML does
/// not allow, collapses whitespace directly before `>` inside tags and
/// prepends [`XML_DECLARATION`] when the document has none. Comments, CDATA
/// sections, attribute values and character data are left as they are.
pub fn sanitize(xml: &str) -> String {
    let normalized = normalize(xml);
    let cleaned: String = normalized.chars().filter(|&c| is_xml_char(c)).collect();

    let mut out = String::with_capacity(cleaned.len() + XML_DECLARATION.len() + 1);
    if !cleaned.trim_start().starts_with("<?xml") {
        out.push_str(XML_DECLARATION);
        out.push('\n');
    }
    collapse_tag_whitespace(&cleaned, &mut out);
    out
}

fn collapse_tag_whitespace(xml: &str, out: &mut String) {
    let mut rest = xml;
    while let Some(lt) = rest.find('<') {
        out.push_str(&rest[..lt]);
        rest = &rest[lt..];

        // Opaque sections are copied through untouched
        let opaque = [("<!--", "-->"), ("<![CDATA[", "]]>")]
            .into_iter()
            .find(|(open, _)| rest.starts_with(open));
        if let Some((open, close)) = opaque {
            let end = rest[open.len()..]
                .find(close)
                .map(|i| open.len() + i + close.len())
                .unwrap_or(rest.len());
            out.push_str(&rest[..end]);
            rest = &rest[end..];
            continue;
        }

        let consumed = copy_tag(rest, out);
        rest = &rest[consumed..];
    }
    out.push_str(rest);
}

/// Copy one tag starting at `<`, returning the bytes consumed.
fn copy_tag(tag: &str, out: &mut String) -> usize {
    let mut quote: Option<char> = None;
    let mut pending_ws = String::new();

    for (i, c) in tag.char_indices() {
        if let Some(q) = quote {
            out.push(c);
            if c == q {
                quote = None;
            }
            continue;
        }
        match c {
            c if c.is_whitespace() => pending_ws.push(c),
            '>' => {
                pending_ws.clear();
                out.push('>');
                return i + 1;
            }
            _ => {
                out.push_str(&pending_ws);
                pending_ws.clear();
                if c == '"' || c == '\'' {
                    quote = Some(c);
                }
                out.push(c);
            }
        }
    }
    // Unterminated tag: keep it as it was so validation reports it
    out.push_str(&pending_ws);
    tag.len()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_adds_declaration() {
        let out = sanitize("<a/>");
        assert_eq!(out, format!("{XML_DECLARATION}\n<a/>"));

        let existing = "<?xml version=\"1.0\"?><a/>";
        assert_eq!(sanitize(existing), existing);
    }

    #[test]
    fn test_sanitize_collapses_whitespace_in_tags() {
        let out = sanitize("<?xml version=\"1.0\"?><a  x=\"1\"   >\n  text   >\n</a  >");
        assert_eq!(out, "<?xml version=\"1.0\"?><a  x=\"1\">\n  text   >\n</a>");
    }

    #[test]
    fn test_sanitize_keeps_quoted_comment_and_cdata() {
        let xml = "<?xml version=\"1.0\"?><a v=\"x  >\"><!-- keep   > --><![CDATA[ y   > ]]></a>";
        assert_eq!(sanitize(xml), xml);
    }

    #[test]
    fn test_sanitize_strips_bom_crlf_and_invalid_chars() {
        let out = sanitize("\u{FEFF}<?xml version=\"1.0\"?>\r\n<a>x\u{1}y</a>\r\n");
        assert_eq!(out, "<?xml version=\"1.0\"?>\n<a>xy</a>\n");
    }
}
