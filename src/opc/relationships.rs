//! Relationships handling for OPC packages
//!
//! Parses and generates `.rels` files

use crate::error::{Error, Result};
use crate::xml::is_xml_char;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, Event};
use quick_xml::{Reader, Writer};

/// Collection of relationships for one source part
#[derive(Clone, Debug, Default)]
pub struct Relationships {
    /// Relationships in document order
    items: Vec<Relationship>,
    /// Set once the table differs from what was loaded
    modified: bool,
}

/// A single relationship
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Relationship {
    /// Relationship ID (e.g., "rId1")
    pub id: String,
    /// Relationship type URI
    pub rel_type: String,
    /// Target path or URL
    pub target: String,
    /// Target mode
    pub target_mode: TargetMode,
}

impl Relationship {
    /// Whether this is an external hyperlink relationship
    pub fn is_external_hyperlink(&self) -> bool {
        self.rel_type == rel_types::HYPERLINK && self.target_mode == TargetMode::External
    }
}

/// Target mode for relationships
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum TargetMode {
    /// Internal target (part within the package)
    #[default]
    Internal,
    /// External target (hyperlink, etc.)
    External,
}

impl Relationships {
    /// Create empty relationships
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse from XML bytes
    pub fn from_xml(xml: &[u8]) -> Result<Self> {
        let mut reader = Reader::from_reader(xml);
        reader.config_mut().trim_text(true);

        let mut rels = Self::new();
        let mut buf = Vec::new();

        loop {
            match reader.read_event_into(&mut buf)? {
                Event::Empty(e) | Event::Start(e) => {
                    if e.name().local_name().as_ref() == b"Relationship" {
                        let rel = parse_relationship(&e)?;
                        if rels.get(&rel.id).is_some() {
                            return Err(Error::InvalidDocument(format!(
                                "duplicate relationship id '{}'",
                                rel.id
                            )));
                        }
                        rels.items.push(rel);
                    }
                }
                Event::Eof => break,
                _ => {}
            }
            buf.clear();
        }

        Ok(rels)
    }

    /// Serialize to XML bytes
    pub fn to_xml(&self) -> Result<Vec<u8>> {
        let mut xml = Writer::new(Vec::new());

        xml.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), Some("yes"))))?;

        let mut rels_elem = BytesStart::new("Relationships");
        rels_elem.push_attribute(("xmlns", NS_RELATIONSHIPS));
        xml.write_event(Event::Start(rels_elem))?;

        for rel in &self.items {
            let mut rel_elem = BytesStart::new("Relationship");
            rel_elem.push_attribute(("Id", rel.id.as_str()));
            rel_elem.push_attribute(("Type", rel.rel_type.as_str()));
            let target: String = rel.target.chars().filter(|&c| is_xml_char(c)).collect();
            rel_elem.push_attribute(("Target", target.as_str()));

            if rel.target_mode == TargetMode::External {
                rel_elem.push_attribute(("TargetMode", "External"));
            }

            xml.write_event(Event::Empty(rel_elem))?;
        }

        xml.write_event(Event::End(BytesEnd::new("Relationships")))?;

        Ok(xml.into_inner())
    }

    /// Get a relationship by ID
    pub fn get(&self, id: &str) -> Option<&Relationship> {
        self.items.iter().find(|r| r.id == id)
    }

    /// Add an external hyperlink relationship and return its new ID
    pub fn add_hyperlink(&mut self, url: &str) -> String {
        let id = self.generate_id();
        self.items.push(Relationship {
            id: id.clone(),
            rel_type: rel_types::HYPERLINK.to_string(),
            target: url.to_string(),
            target_mode: TargetMode::External,
        });
        self.modified = true;
        id
    }

    /// ID of an external hyperlink to `url`, adding one if none exists
    pub fn hyperlink_for(&mut self, url: &str) -> String {
        match self
            .items
            .iter()
            .find(|r| r.is_external_hyperlink() && r.target == url)
        {
            Some(rel) => rel.id.clone(),
            None => self.add_hyperlink(url),
        }
    }

    /// Point an existing relationship at a new target.
    ///
    /// Returns false if no relationship has that ID.
    pub fn set_target(&mut self, id: &str, target: &str) -> bool {
        match self.items.iter_mut().find(|r| r.id == id) {
            Some(rel) => {
                if rel.target != target {
                    rel.target = target.to_string();
                    self.modified = true;
                }
                true
            }
            None => false,
        }
    }

    /// Iterate over all relationships
    pub fn iter(&self) -> impl Iterator<Item = &Relationship> {
        self.items.iter()
    }

    /// Number of relationships
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Check if empty
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Whether the table changed since it was loaded
    pub fn is_modified(&self) -> bool {
        self.modified
    }

    /// Generate an ID one past the highest numeric `rId` suffix
    fn generate_id(&self) -> String {
        let max_id = self
            .items
            .iter()
            .filter_map(|r| r.id.strip_prefix("rId")?.parse::<u64>().ok())
            .max()
            .unwrap_or(0);

        let mut next = max_id + 1;
        loop {
            let id = format!("rId{}", next);
            if self.get(&id).is_none() {
                return id;
            }
            next += 1;
        }
    }
}

/// Parse a single Relationship element
fn parse_relationship(element: &BytesStart) -> Result<Relationship> {
    let mut id = None;
    let mut rel_type = None;
    let mut target = None;
    let mut target_mode = TargetMode::Internal;

    for attr in element.attributes() {
        let attr = attr?;
        let value = attr.unescape_value()?.into_owned();

        match attr.key.local_name().as_ref() {
            b"Id" => id = Some(value),
            b"Type" => rel_type = Some(value),
            b"Target" => target = Some(value),
            b"TargetMode" => {
                if value == "External" {
                    target_mode = TargetMode::External;
                }
            }
            _ => {}
        }
    }

    let missing = |attr: &str| Error::MissingAttribute {
        element: "Relationship".into(),
        attr: attr.into(),
    };

    Ok(Relationship {
        id: id.ok_or_else(|| missing("Id"))?,
        rel_type: rel_type.ok_or_else(|| missing("Type"))?,
        target: target.ok_or_else(|| missing("Target"))?,
        target_mode,
    })
}

// Namespace
const NS_RELATIONSHIPS: &str = "http://schemas.openxmlformats.org/package/2006/relationships";

// Well-known relationship types
pub mod rel_types {
    pub const HYPERLINK: &str =
        "http://schemas.openxmlformats.org/officeDocument/2006/relationships/hyperlink";
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const STYLES: &str =
        "http://schemas.openxmlformats.org/officeDocument/2006/relationships/styles";

    const SAMPLE: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
  <Relationship Id="rId2" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/styles" Target="styles.xml"/>
  <Relationship Id="rId5" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/hyperlink" Target="https://example.com/?a=1&amp;b=2" TargetMode="External"/>
</Relationships>"#;

    #[test]
    fn test_parse_relationships() {
        let rels = Relationships::from_xml(SAMPLE.as_bytes()).unwrap();
        assert_eq!(rels.len(), 2);

        let styles = rels.get("rId2").unwrap();
        assert_eq!(styles.target, "styles.xml");
        assert_eq!(styles.target_mode, TargetMode::Internal);
        assert!(!styles.is_external_hyperlink());

        let link = rels.get("rId5").unwrap();
        assert_eq!(link.target, "https://example.com/?a=1&b=2");
        assert!(link.is_external_hyperlink());
        assert!(!rels.is_modified());
    }

    #[test]
    fn test_roundtrip_is_semantically_equal() {
        let rels = Relationships::from_xml(SAMPLE.as_bytes()).unwrap();
        let xml = rels.to_xml().unwrap();
        let rels2 = Relationships::from_xml(&xml).unwrap();

        let a: Vec<_> = rels.iter().cloned().collect();
        let b: Vec<_> = rels2.iter().cloned().collect();
        assert_eq!(a, b);
        assert!(String::from_utf8(xml)
            .unwrap()
            .starts_with(r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#));
    }

    #[test]
    fn test_add_hyperlink_skips_past_highest_id() {
        let mut xml = String::from(r#"<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">"#);
        for n in (1..=9).chain([20]) {
            xml.push_str(&format!(
                r#"<Relationship Id="rId{n}" Type="{}" Target="t{n}.xml"/>"#,
                STYLES
            ));
        }
        xml.push_str("</Relationships>");

        let mut rels = Relationships::from_xml(xml.as_bytes()).unwrap();
        let id = rels.add_hyperlink("http://x.com");

        assert_eq!(id, "rId21");
        assert!(rels.get("rId21").unwrap().is_external_hyperlink());
        assert!(rels.is_modified());
    }

    #[test]
    fn test_add_hyperlink_empty_table() {
        let mut rels = Relationships::new();
        assert_eq!(rels.add_hyperlink("http://a.example"), "rId1");
        assert_eq!(rels.add_hyperlink("http://b.example"), "rId2");
    }

    #[test]
    fn test_non_numeric_ids_are_ignored() {
        let xml = format!(
            r#"<Relationships><Relationship Id="rIdImage" Type="{t}" Target="a"/><Relationship Id="rId3" Type="{t}" Target="b"/></Relationships>"#,
            t = STYLES
        );
        let mut rels = Relationships::from_xml(xml.as_bytes()).unwrap();
        assert_eq!(rels.add_hyperlink("http://x.com"), "rId4");
    }

    #[test]
    fn test_hyperlink_for_reuses_matching_target() {
        let mut rels = Relationships::from_xml(SAMPLE.as_bytes()).unwrap();
        assert_eq!(rels.hyperlink_for("https://example.com/?a=1&b=2"), "rId5");
        assert!(!rels.is_modified());
        assert_eq!(rels.hyperlink_for("styles.xml"), "rId6");
    }

    #[test]
    fn test_set_target() {
        let mut rels = Relationships::from_xml(SAMPLE.as_bytes()).unwrap();
        assert!(rels.set_target("rId5", "https://example.com/?a=1&b=2"));
        assert!(!rels.is_modified());

        assert!(rels.set_target("rId5", "http://new.example"));
        assert!(rels.is_modified());
        assert_eq!(rels.get("rId5").unwrap().target, "http://new.example");
        assert!(!rels.set_target("rId99", "http://nope"));
    }

    #[test]
    fn test_duplicate_ids_rejected() {
        let xml = format!(
            r#"<Relationships><Relationship Id="rId1" Type="{t}" Target="a"/><Relationship Id="rId1" Type="{t}" Target="b"/></Relationships>"#,
            t = STYLES
        );
        assert!(Relationships::from_xml(xml.as_bytes()).is_err());
    }
}
