//! Element tree annotated with byte offsets into the source buffer.
//!
//! The tree is built from a full quick-xml parse, so offsets can never land
//! inside an attribute value, a comment or a CDATA section. Editors use the
//! spans to splice new bytes into the original buffer while copying
//! everything else verbatim.

use crate::error::{Error, Result};
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use std::ops::Range;

/// An element and the byte ranges it occupies
#[derive(Clone, Debug)]
pub struct Element {
    /// Qualified name as written (e.g. "w:endnote")
    pub name: String,
    /// Attributes as (qualified name, unescaped value) pairs
    pub attributes: Vec<(String, String)>,
    /// Whole element, from '<' of the start tag to '>' of the end tag
    pub span: Range<usize>,
    /// Content between the start and end tags (empty for `<x/>`)
    pub inner: Range<usize>,
    /// Child elements in document order
    pub children: Vec<Element>,
    /// Concatenated character data directly inside this element
    text: String,
    self_closing: bool,
}

impl Element {
    fn from_start(start: &BytesStart, span: Range<usize>, self_closing: bool) -> Result<Self> {
        let mut attributes = Vec::new();
        for attr in start.attributes() {
            let attr = attr?;
            attributes.push((
                String::from_utf8_lossy(attr.key.as_ref()).to_string(),
                attr.unescape_value()?.into_owned(),
            ));
        }

        let inner = span.end..span.end;
        Ok(Self {
            name: String::from_utf8_lossy(start.name().as_ref()).to_string(),
            attributes,
            span,
            inner,
            children: Vec::new(),
            text: String::new(),
            self_closing,
        })
    }

    /// Local part of the element name ("endnote" for "w:endnote")
    pub fn local_name(&self) -> &str {
        local_part(&self.name)
    }

    /// Check the local name
    pub fn is(&self, local: &str) -> bool {
        self.local_name() == local
    }

    /// Attribute value by exact qualified name
    pub fn attr(&self, qname: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| k == qname)
            .map(|(_, v)| v.as_str())
    }

    /// Attribute value by local name, ignoring the prefix
    pub fn attr_local(&self, local: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| local_part(k) == local && !k.starts_with("xmlns"))
            .map(|(_, v)| v.as_str())
    }

    /// Check whether this element binds `prefix` to namespace `uri`
    pub fn declares(&self, prefix: &str, uri: &str) -> bool {
        let key = format!("xmlns:{}", prefix);
        self.attr(&key) == Some(uri)
    }

    /// Character data directly inside this element
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Whether the element was written as `<x/>`
    pub fn is_self_closing(&self) -> bool {
        self.self_closing
    }

    /// Direct children with the given local name
    pub fn children_named<'a>(&'a self, local: &'a str) -> impl Iterator<Item = &'a Element> {
        self.children.iter().filter(move |c| c.is(local))
    }

    /// First direct child with the given local name
    pub fn child(&self, local: &str) -> Option<&Element> {
        self.children.iter().find(|c| c.is(local))
    }

    /// All descendants with the given local name, in document order
    pub fn descendants_named<'a>(&'a self, local: &str) -> Vec<&'a Element> {
        let mut out = Vec::new();
        collect_named(self, local, &mut out);
        out
    }

    /// Raw bytes of the start tag (the whole element when self-closing)
    pub fn start_tag<'x>(&self, xml: &'x [u8]) -> &'x [u8] {
        if self.self_closing {
            &xml[self.span.clone()]
        } else {
            &xml[self.span.start..self.inner.start]
        }
    }

    /// Raw bytes of the end tag (empty when self-closing)
    pub fn end_tag<'x>(&self, xml: &'x [u8]) -> &'x [u8] {
        if self.self_closing {
            &[]
        } else {
            &xml[self.inner.end..self.span.end]
        }
    }

    /// Raw bytes of the whole element
    pub fn raw<'x>(&self, xml: &'x [u8]) -> &'x [u8] {
        &xml[self.span.clone()]
    }
}

fn collect_named<'a>(elem: &'a Element, local: &str, out: &mut Vec<&'a Element>) {
    for child in &elem.children {
        if child.is(local) {
            out.push(child);
        }
        collect_named(child, local, out);
    }
}

fn local_part(name: &str) -> &str {
    name.rsplit_once(':').map_or(name, |(_, local)| local)
}

/// Parse XML bytes into an offset-annotated tree and return the root element
pub fn parse(xml: &[u8]) -> Result<Element> {
    let mut reader = Reader::from_reader(xml);
    let mut stack: Vec<Element> = Vec::new();
    let mut root: Option<Element> = None;
    let mut buf = Vec::new();

    loop {
        let event = reader.read_event_into(&mut buf)?;
        let end = reader.buffer_position() as usize;

        match event {
            Event::Start(e) => {
                let start = tag_start(xml, end)?;
                stack.push(Element::from_start(&e, start..end, false)?);
            }
            Event::Empty(e) => {
                let start = tag_start(xml, end)?;
                let elem = Element::from_start(&e, start..end, true)?;
                attach(&mut stack, &mut root, elem)?;
            }
            Event::End(_) => {
                let start = tag_start(xml, end)?;
                let mut elem = stack
                    .pop()
                    .ok_or_else(|| Error::InvalidDocument("unexpected end tag".into()))?;
                elem.inner.end = start;
                elem.span.end = end;
                attach(&mut stack, &mut root, elem)?;
            }
            Event::Text(t) => {
                if let Some(top) = stack.last_mut() {
                    top.text.push_str(&t.unescape()?);
                }
            }
            Event::CData(c) => {
                if let Some(top) = stack.last_mut() {
                    top.text.push_str(std::str::from_utf8(&c)?);
                }
            }
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    if let Some(open) = stack.last() {
        return Err(Error::InvalidDocument(format!(
            "unclosed element <{}>",
            open.name
        )));
    }

    root.ok_or_else(|| Error::InvalidDocument("no root element".into()))
}

/// Offset of the '<' opening the tag that ends just before `end`.
///
/// Well-formed XML never has a raw '<' inside a tag, so the last one
/// before the tag's closing '>' is its start.
fn tag_start(xml: &[u8], end: usize) -> Result<usize> {
    xml[..end.min(xml.len())]
        .iter()
        .rposition(|&b| b == b'<')
        .ok_or_else(|| Error::InvalidDocument("tag without '<'".into()))
}

fn attach(stack: &mut [Element], root: &mut Option<Element>, elem: Element) -> Result<()> {
    match stack.last_mut() {
        Some(parent) => parent.children.push(elem),
        None if root.is_none() => *root = Some(elem),
        None => return Err(Error::InvalidDocument("multiple root elements".into())),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const XML: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<w:endnotes xmlns:w="urn:w" xmlns:r="urn:r"><!-- <w:endnote w:id="9"> -->
  <w:endnote w:id="1"><w:p><w:r><w:t xml:space="preserve">A &amp; B</w:t></w:r></w:p></w:endnote>
  <w:endnote w:id="2" w:note="a&gt;b"><w:p/></w:endnote>
</w:endnotes>"#;

    #[test]
    fn test_spans_match_source() {
        let xml = XML.as_bytes();
        let root = parse(xml).unwrap();

        assert!(root.is("endnotes"));
        assert!(root.declares("r", "urn:r"));
        assert_eq!(root.children.len(), 2);

        let first = &root.children[0];
        assert_eq!(first.attr("w:id"), Some("1"));
        assert!(first.raw(xml).starts_with(b"<w:endnote w:id=\"1\">"));
        assert!(first.raw(xml).ends_with(b"</w:endnote>"));
        assert_eq!(first.start_tag(xml), b"<w:endnote w:id=\"1\">");
        assert_eq!(first.end_tag(xml), b"</w:endnote>");

        let t = first.descendants_named("t");
        assert_eq!(t.len(), 1);
        assert_eq!(t[0].text(), "A & B");
        assert_eq!(&xml[t[0].inner.clone()], b"A &amp; B");
    }

    #[test]
    fn test_comment_does_not_create_elements() {
        let root = parse(XML.as_bytes()).unwrap();
        let ids: Vec<_> = root
            .children_named("endnote")
            .filter_map(|n| n.attr_local("id"))
            .collect();
        assert_eq!(ids, vec!["1", "2"]);
    }

    #[test]
    fn test_self_closing_and_attribute_with_gt() {
        let xml = XML.as_bytes();
        let root = parse(xml).unwrap();
        let second = &root.children[1];
        assert_eq!(second.attr("w:note"), Some("a>b"));

        let p = second.child("p").unwrap();
        assert!(p.is_self_closing());
        assert_eq!(p.raw(xml), b"<w:p/>");
        assert_eq!(p.start_tag(xml), b"<w:p/>");
        assert!(p.end_tag(xml).is_empty());
    }

    #[test]
    fn test_mismatched_tags_error() {
        assert!(parse(b"<a><b></a>").is_err());
        assert!(parse(b"<a><b>").is_err());
        assert!(parse(b"").is_err());
    }
}
